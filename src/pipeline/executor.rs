//! Generic sequential pipeline executor
//!
//! Interprets a [`PipelineSpec`]: runs the guardrail on the user text, then
//! each stage in order, threading every stage's output into the next.
//! Follow-ups issue a single conversational call against the session's
//! last analysis.

use super::run_log::RunDirectory;
use super::workflows::{conversational_agent, guardrail_agent, PipelineSpec};
use crate::agent::{Agent, AgentSpec, ConversationState};
use crate::error::{EcoOptimaError, Result};
use crate::tools::ToolRegistry;
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

/// Outcome of a gated operation
///
/// Guardrail rejection is an expected outcome, so it is a value rather
/// than an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Gated<T> {
    /// The input passed the guardrail
    Accepted(T),
    /// The guardrail vetoed the input, with its reasoning
    Rejected(String),
}

impl<T> Gated<T> {
    /// True when the guardrail vetoed the input
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

/// User-visible text for a guardrail rejection
pub fn rejection_message(reasoning: &str) -> String {
    format!("Guardrail blocked this input: {}", reasoning)
}

#[derive(Debug, Deserialize)]
struct GuardrailVerdict {
    is_eco_optima: bool,
    #[serde(default)]
    reasoning: String,
}

/// Result of one analysis
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    /// Final stage output
    pub text: String,
    /// Charts rendered during the run, sorted by file name
    pub charts: Vec<PathBuf>,
}

/// Runs workflow tables and follow-ups against one agent runner
#[derive(Clone)]
pub struct PipelineExecutor {
    agent: Agent,
}

impl PipelineExecutor {
    /// Create an executor
    pub fn new(agent: Agent) -> Self {
        Self { agent }
    }

    /// Run a guardrail agent on `input`
    ///
    /// # Errors
    ///
    /// Upstream errors, or `InvalidStructuredOutput` when the verdict does
    /// not have the expected shape.
    pub async fn check_guardrail(&self, guardrail: &AgentSpec, input: &str) -> Result<Gated<()>> {
        let output = self.agent.run(guardrail, input, &ToolRegistry::new()).await?;
        let value = output.as_structured().cloned().unwrap_or_default();
        let verdict: GuardrailVerdict = serde_json::from_value(value).map_err(|e| {
            EcoOptimaError::InvalidStructuredOutput {
                agent: guardrail.name.clone(),
                message: e.to_string(),
            }
        })?;

        if verdict.is_eco_optima {
            Ok(Gated::Accepted(()))
        } else {
            info!("Guardrail rejected input: {}", verdict.reasoning);
            Ok(Gated::Rejected(verdict.reasoning))
        }
    }

    /// Run an analysis workflow, recording input, output, and charts in `run`
    ///
    /// # Errors
    ///
    /// Upstream errors from any stage abort the run. Run directory I/O
    /// errors propagate.
    pub async fn run_analysis(
        &self,
        spec: &PipelineSpec,
        user_text: &str,
        run: &RunDirectory,
    ) -> Result<Gated<PipelineOutput>> {
        let start_time = Instant::now();
        info!(workflow = %spec.name, run = %run.name(), "Starting analysis");
        run.write_input(user_text)?;

        if let Some(guardrail) = &spec.guardrail {
            if let Gated::Rejected(reasoning) = self.check_guardrail(guardrail, user_text).await? {
                run.write_output(&rejection_message(&reasoning))?;
                return Ok(Gated::Rejected(reasoning));
            }
        }

        let mut previous: Option<String> = None;
        for (index, stage) in spec.stages.iter().enumerate() {
            match &stage.agent.handoff_description {
                Some(handoff) if previous.is_some() => info!(
                    workflow = %spec.name,
                    stage = index + 1,
                    agent = %stage.agent.name,
                    handoff = %handoff,
                    "Handing off to stage"
                ),
                _ => info!(
                    workflow = %spec.name,
                    stage = index + 1,
                    agent = %stage.agent.name,
                    "Running stage"
                ),
            }
            let input = stage.input.build(user_text, previous.as_deref());
            let tools = ToolRegistry::for_kinds(&stage.agent.tools, run.path());
            let output = self.agent.run(&stage.agent, &input, &tools).await?;
            previous = Some(output.to_text());
        }

        let text = previous.unwrap_or_default();
        run.write_output(&text)?;
        let charts = run.charts()?;

        info!(
            workflow = %spec.name,
            charts = charts.len(),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Analysis complete"
        );
        Ok(Gated::Accepted(PipelineOutput { text, charts }))
    }

    /// Answer a follow-up question against the session's last analysis
    ///
    /// # Errors
    ///
    /// `NoPriorContext` when no analysis has completed for the session;
    /// upstream errors otherwise.
    pub async fn run_followup(
        &self,
        user_text: &str,
        state: &ConversationState,
        context_turns: usize,
    ) -> Result<Gated<String>> {
        if !state.has_prior_output() {
            warn!("Follow-up requested without a prior analysis");
            return Err(EcoOptimaError::NoPriorContext.into());
        }

        let gate_input = format!(
            "Previous analysis:\n{}\n\nFollow-up question:\n{}",
            state.last_output(),
            user_text
        );
        if let Gated::Rejected(reasoning) = self.check_guardrail(&guardrail_agent(), &gate_input).await? {
            return Ok(Gated::Rejected(reasoning));
        }

        let payload = json!({
            "latest_workflow_output": state.last_output(),
            "chat_history": state.recent(context_turns),
            "user_question": user_text,
        });
        let payload = serde_json::to_string_pretty(&payload)?;

        let answer = self
            .agent
            .run(&conversational_agent(), &payload, &ToolRegistry::new())
            .await?;
        Ok(Gated::Accepted(answer.to_text()))
    }
}
