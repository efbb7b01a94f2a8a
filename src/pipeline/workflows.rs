//! Declarative workflow tables
//!
//! A workflow is an optional guardrail followed by an ordered list of
//! stages. Each stage names the agent to run and how its input is built
//! from the user text and the previous stage's output.

use super::prompts;
use crate::agent::AgentSpec;
use crate::providers::OutputSchema;
use crate::tools::ToolKind;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

/// Fixed reply for the unsupported consumer workflow
pub const CONSUMER_NOT_IMPLEMENTED: &str = "The consumer workflow is not implemented yet.";

/// Request mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Run the full workflow
    #[default]
    Analyze,
    /// Answer against the last analysis
    Followup,
}

impl Mode {
    /// Parse a mode, falling back to `Analyze` for anything unrecognized
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "analyze" => Self::Analyze,
            "followup" => Self::Followup,
            other => {
                debug!("Unrecognized mode '{}', using analyze", other);
                Self::Analyze
            }
        }
    }
}

/// Workflow selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Workflow {
    /// Community planning workflow
    #[default]
    Community,
    /// Consumer workflow (unsupported)
    Consumer,
}

impl Workflow {
    /// Parse a workflow, falling back to `Community` for anything unrecognized
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "community" => Self::Community,
            "consumer" => Self::Consumer,
            other => {
                debug!("Unrecognized workflow '{}', using community", other);
                Self::Community
            }
        }
    }

    /// Pipeline table for this workflow, `None` when unsupported
    pub fn pipeline(self) -> Option<PipelineSpec> {
        match self {
            Self::Community => Some(community_pipeline()),
            Self::Consumer => None,
        }
    }
}

/// How a stage's input is assembled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageInput {
    /// The raw user text
    UserText,
    /// The previous stage's output
    PreviousOutput,
    /// The user text followed by the previous stage's output
    UserTextAndPrevious,
}

impl StageInput {
    /// Build the stage input
    pub fn build(self, user_text: &str, previous: Option<&str>) -> String {
        match (self, previous) {
            (Self::UserText, _) | (_, None) => user_text.to_string(),
            (Self::PreviousOutput, Some(previous)) => previous.to_string(),
            (Self::UserTextAndPrevious, Some(previous)) => format!(
                "Original request:\n{}\n\nPrevious stage output:\n{}",
                user_text, previous
            ),
        }
    }
}

/// One step of a workflow
#[derive(Debug, Clone)]
pub struct StageSpec {
    /// Agent to run
    pub agent: AgentSpec,
    /// Input transform
    pub input: StageInput,
}

/// A complete workflow table
#[derive(Debug, Clone)]
pub struct PipelineSpec {
    /// Workflow name for logs
    pub name: String,
    /// Gate run on the user text before any stage
    pub guardrail: Option<AgentSpec>,
    /// Ordered stages
    pub stages: Vec<StageSpec>,
}

/// Schema of the guardrail verdict
pub fn guardrail_schema() -> OutputSchema {
    OutputSchema::new(
        "GuardrailVerdict",
        json!({
            "type": "object",
            "properties": {
                "is_eco_optima": { "type": "boolean" },
                "reasoning": { "type": "string" }
            },
            "required": ["is_eco_optima", "reasoning"],
            "additionalProperties": false
        }),
    )
}

fn triage_schema() -> OutputSchema {
    OutputSchema::new(
        "ProjectVariables",
        json!({
            "type": "object",
            "properties": {
                "user_location": { "type": "string" },
                "project_type": { "type": "string" },
                "scale": { "type": "string" },
                "time_horizon_years": { "type": "string" },
                "budget": { "type": "string" }
            },
            "required": ["user_location", "project_type", "scale", "time_horizon_years", "budget"],
            "additionalProperties": false
        }),
    )
}

fn plant_matrix_schema() -> OutputSchema {
    OutputSchema::new(
        "PlantMatrixResult",
        json!({
            "type": "object",
            "properties": {
                "rankings": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "species": { "type": "string" },
                            "size": { "type": "string" },
                            "survival_probability": { "type": "string" },
                            "maintenance_costs": { "type": "string" }
                        },
                        "required": ["species", "size", "survival_probability", "maintenance_costs"],
                        "additionalProperties": false
                    }
                }
            },
            "required": ["rankings"],
            "additionalProperties": false
        }),
    )
}

/// Guardrail classifier agent
pub fn guardrail_agent() -> AgentSpec {
    AgentSpec::new("Guardrail", prompts::GUARDRAIL).with_output_schema(guardrail_schema())
}

/// Follow-up agent
pub fn conversational_agent() -> AgentSpec {
    AgentSpec::new("Conversational Agent", prompts::with_postfix(prompts::CONVERSATIONAL))
}

/// Guardrail → Triage → Plant Matrix Advisor → Planting Benefits Advisor → Local ROI Advisor
pub fn community_pipeline() -> PipelineSpec {
    PipelineSpec {
        name: "community".to_string(),
        guardrail: Some(guardrail_agent()),
        stages: vec![
            StageSpec {
                agent: AgentSpec::new("Triage Agent", prompts::TRIAGE)
                    .with_output_schema(triage_schema()),
                input: StageInput::UserText,
            },
            StageSpec {
                agent: AgentSpec::new("Plant Matrix Advisor", prompts::PLANT_MATRIX)
                    .with_handoff_description("Specialist agent for plant matrix")
                    .with_output_schema(plant_matrix_schema()),
                input: StageInput::PreviousOutput,
            },
            StageSpec {
                agent: AgentSpec::new(
                    "Planting Benefits Advisor",
                    prompts::with_postfix(prompts::PLANTING_BENEFITS),
                )
                .with_handoff_description("Specialist agent for quantifying planting benefits")
                .with_tools([ToolKind::BarChart, ToolKind::PieChart]),
                input: StageInput::UserTextAndPrevious,
            },
            StageSpec {
                agent: AgentSpec::new("Local ROI Advisor", prompts::with_postfix(prompts::LOCAL_ROI))
                    .with_handoff_description(
                        "Specialist agent for translating planting benefits into local ROI (health, heat)",
                    )
                    .with_tools([ToolKind::BarChart, ToolKind::PieChart]),
                input: StageInput::UserTextAndPrevious,
            },
        ],
    }
}
