//! Tools module for EcoOptima
//!
//! Tool results, the executor trait agents call through, and the registry
//! that maps tool names advertised to the LLM onto local implementations.

use crate::chart::{PlotBarChartTool, PlotPieChartTool};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Local capabilities an agent may be configured with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    /// `plot_bar_chart`
    BarChart,
    /// `plot_pie_chart`
    PieChart,
}

/// Outcome of one tool call, as reported back to the model
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    /// Whether the call succeeded
    pub success: bool,
    /// Text handed back to the model
    pub output: String,
    /// Failure reason, set when `success` is false
    pub error: Option<String>,
    /// Whether `output` was cut to fit the tool output limit
    pub truncated: bool,
    /// File written by the call, if any
    pub artifact: Option<PathBuf>,
}

impl ToolResult {
    /// Successful call with `output` for the model
    pub fn success(output: String) -> Self {
        Self {
            success: true,
            output,
            error: None,
            truncated: false,
            artifact: None,
        }
    }

    /// Failed call; the model sees `Error: <error>`
    pub fn error(error: String) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(error),
            truncated: false,
            artifact: None,
        }
    }

    /// Attach the file the call produced
    pub fn with_artifact(mut self, path: PathBuf) -> Self {
        self.artifact = Some(path);
        self
    }

    /// Cut `output` to at most `max_bytes`, on a char boundary
    pub fn truncate_if_needed(mut self, max_bytes: usize) -> Self {
        if self.output.len() <= max_bytes {
            return self;
        }
        let cut = (0..=max_bytes)
            .rev()
            .find(|i| self.output.is_char_boundary(*i))
            .unwrap_or(0);
        self.output.truncate(cut);
        self.output.push_str("\n... (truncated)");
        self.truncated = true;
        self
    }

    /// Text sent back in the `tool` message
    pub fn to_message(&self) -> String {
        match (&self.error, self.success) {
            (_, true) => self.output.clone(),
            (Some(error), false) => format!("Error: {}", error),
            (None, false) => "Error: tool call failed".to_string(),
        }
    }
}

/// Tool executor trait for implementing tool execution logic
///
/// # Examples
///
/// ```no_run
/// use ecooptima::tools::{ToolExecutor, ToolResult};
/// use ecooptima::error::Result;
/// use async_trait::async_trait;
/// use serde_json::Value;
///
/// struct Echo;
///
/// #[async_trait]
/// impl ToolExecutor for Echo {
///     fn tool_definition(&self) -> Value {
///         serde_json::json!({
///             "name": "echo",
///             "description": "Echoes its input",
///             "parameters": { "type": "object", "properties": {} }
///         })
///     }
///
///     async fn execute(&self, args: Value) -> Result<ToolResult> {
///         Ok(ToolResult::success(args.to_string()))
///     }
/// }
/// ```
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Returns the tool definition in OpenAI function-calling format
    /// (`name`, `description`, `parameters` JSON schema)
    fn tool_definition(&self) -> serde_json::Value;

    /// Executes the tool with the given arguments
    ///
    /// # Errors
    ///
    /// Returns error only for faults the caller cannot hand back to the
    /// model; invalid input should be reported as [`ToolResult::error`].
    async fn execute(&self, args: serde_json::Value) -> Result<ToolResult>;
}

/// Tool registry for managing available tools
///
/// Definitions are returned in name order so requests are reproducible.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn ToolExecutor>>,
}

impl ToolRegistry {
    /// Create a new empty tool registry
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Build a registry holding the given tool kinds, bound to `output_dir`
    pub fn for_kinds(kinds: &[ToolKind], output_dir: &Path) -> Self {
        let mut registry = Self::new();
        for kind in kinds {
            match kind {
                ToolKind::BarChart => registry.register(
                    PlotBarChartTool::NAME,
                    Arc::new(PlotBarChartTool::new(output_dir)),
                ),
                ToolKind::PieChart => registry.register(
                    PlotPieChartTool::NAME,
                    Arc::new(PlotPieChartTool::new(output_dir)),
                ),
            }
        }
        registry
    }

    /// Register a tool executor in the registry
    pub fn register(&mut self, name: impl Into<String>, executor: Arc<dyn ToolExecutor>) {
        self.tools.insert(name.into(), executor);
    }

    /// Get a tool executor by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolExecutor>> {
        self.tools.get(name).cloned()
    }

    /// Get all tool definitions as JSON values
    pub fn all_definitions(&self) -> Vec<serde_json::Value> {
        self.tools
            .values()
            .map(|executor| executor.tool_definition())
            .collect()
    }

    /// Get the number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
