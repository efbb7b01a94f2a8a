//! Agent-callable chart tools
//!
//! `plot_bar_chart` and `plot_pie_chart` expose the chart renderer through
//! the tool registry. Each instance is bound to one run directory so
//! concurrent analyses never write into each other's output.

use super::{render_chart, ChartKind, ChartRequest};
use crate::error::{EcoOptimaError, Result};
use crate::tools::{ToolExecutor, ToolResult};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

fn series_schema() -> Value {
    json!({
        "type": "array",
        "description": "Ordered (label, value) pairs to chart",
        "items": {
            "type": "object",
            "properties": {
                "label": { "type": "string", "description": "Tree or category name" },
                "value": {
                    "type": ["number", "string"],
                    "description": "Numeric value; strings such as '12.5 meters' are accepted"
                }
            },
            "required": ["label", "value"]
        }
    })
}

async fn run_chart_tool(kind: ChartKind, output_dir: &Path, args: Value) -> Result<ToolResult> {
    let request: ChartRequest = match serde_json::from_value(args) {
        Ok(request) => request,
        Err(e) => {
            warn!("Rejected {:?} chart arguments: {}", kind, e);
            return Ok(ToolResult::error(format!("Invalid chart arguments: {}", e)));
        }
    };

    match render_chart(kind, &request, Some(output_dir)) {
        Ok(path) => {
            let noun = match kind {
                ChartKind::Bar => "Bar",
                ChartKind::Pie => "Pie",
            };
            let display = path.to_string_lossy().replace('\\', "/");
            Ok(ToolResult::success(format!("{} chart saved to {}", noun, display)).with_artifact(path))
        }
        Err(e) => match e.downcast_ref::<EcoOptimaError>() {
            Some(
                err @ (EcoOptimaError::EmptySeries
                | EcoOptimaError::MissingLabel { .. }
                | EcoOptimaError::NonNumericValue(_)
                | EcoOptimaError::NegativePieValue { .. }),
            ) => {
                debug!("Chart validation failed: {}", err);
                Ok(ToolResult::error(err.to_string()))
            }
            _ => Err(e),
        },
    }
}

/// `plot_bar_chart` tool bound to a run directory
pub struct PlotBarChartTool {
    output_dir: PathBuf,
}

impl PlotBarChartTool {
    /// Tool name advertised to agents
    pub const NAME: &'static str = "plot_bar_chart";

    /// Create a bar chart tool writing into `output_dir`
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

#[async_trait]
impl ToolExecutor for PlotBarChartTool {
    fn tool_definition(&self) -> Value {
        json!({
            "name": Self::NAME,
            "description": "Generate a bar chart from structured tree metrics.",
            "parameters": {
                "type": "object",
                "properties": {
                    "series": series_schema(),
                    "metric_name": { "type": "string", "description": "Metric being charted, e.g. Height" },
                    "title": { "type": "string", "description": "Optional chart title" },
                    "top_n": { "type": "integer", "description": "Keep only the top N entries" },
                    "orientation": { "type": "string", "enum": ["horizontal", "vertical"] }
                },
                "required": ["series", "metric_name"]
            }
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        run_chart_tool(ChartKind::Bar, &self.output_dir, args).await
    }
}

/// `plot_pie_chart` tool bound to a run directory
pub struct PlotPieChartTool {
    output_dir: PathBuf,
}

impl PlotPieChartTool {
    /// Tool name advertised to agents
    pub const NAME: &'static str = "plot_pie_chart";

    /// Create a pie chart tool writing into `output_dir`
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

#[async_trait]
impl ToolExecutor for PlotPieChartTool {
    fn tool_definition(&self) -> Value {
        json!({
            "name": Self::NAME,
            "description": "Generate a pie chart from structured tree metrics.",
            "parameters": {
                "type": "object",
                "properties": {
                    "series": series_schema(),
                    "metric_name": { "type": "string", "description": "Metric being charted" },
                    "title": { "type": "string", "description": "Optional chart title" },
                    "top_n": { "type": "integer", "description": "Slices to keep; the rest become 'Other'" }
                },
                "required": ["series", "metric_name"]
            }
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        run_chart_tool(ChartKind::Pie, &self.output_dir, args).await
    }
}
