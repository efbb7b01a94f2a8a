//! Request dispatch
//!
//! Routes a request to an analysis or a follow-up, updates the session's
//! conversation state, and converts user-facing errors into reply text.
//! The session's lock is held for the whole turn, so two requests for the
//! same session never interleave their history updates.

use super::executor::{rejection_message, Gated, PipelineExecutor};
use super::run_log::RunDirectory;
use super::workflows::{Mode, Workflow, CONSUMER_NOT_IMPLEMENTED};
use crate::agent::ConversationState;
use crate::config::Config;
use crate::error::{EcoOptimaError, Result};
use crate::session::SessionStore;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// A parsed user request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRequest {
    /// Free-text input
    pub text: String,
    /// Analyze or follow up
    pub mode: Mode,
    /// Workflow to run for analyses
    pub workflow: Workflow,
}

/// Reply returned to the façade
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchResponse {
    /// Text shown to the user
    pub result: String,
    /// URLs of charts rendered by this request
    pub img_urls: Vec<String>,
}

/// Outcome of one analysis, independent of any session
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    /// Text shown to the user
    pub text: String,
    /// Whether the text is a completed analysis usable as follow-up context
    pub completed: bool,
    /// Chart files written by the run
    pub charts: Vec<PathBuf>,
    /// Chart URLs under `/response_log`
    pub chart_urls: Vec<String>,
}

/// Dispatches requests against the session store and pipeline executor
pub struct Dispatcher {
    sessions: Arc<SessionStore>,
    executor: PipelineExecutor,
    log_root: PathBuf,
    history_limit: usize,
    context_turns: usize,
}

impl Dispatcher {
    /// Create a dispatcher
    pub fn new(sessions: Arc<SessionStore>, executor: PipelineExecutor, config: &Config) -> Self {
        Self {
            sessions,
            executor,
            log_root: config.output.log_root.clone(),
            history_limit: config.conversation.history_limit,
            context_turns: config.conversation.context_turns,
        }
    }

    /// Session store used by this dispatcher
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Root directory of run output
    pub fn log_root(&self) -> &std::path::Path {
        &self.log_root
    }

    /// Handle one request for `session_id`
    ///
    /// # Errors
    ///
    /// Only faults without a user-facing message propagate (I/O, config);
    /// chart, no-context, and upstream errors become reply text.
    pub async fn respond(&self, session_id: &str, request: &DispatchRequest) -> Result<DispatchResponse> {
        let handle = self.sessions.get_or_create(session_id);
        let mut state = handle.lock().await;
        info!(session = %session_id, mode = ?request.mode, workflow = ?request.workflow, "Dispatching request");

        let response = match request.mode {
            Mode::Analyze => {
                let report = self.analyze(&request.text, request.workflow).await?;
                if report.completed {
                    state.set_last_output(report.text.clone());
                }
                DispatchResponse {
                    result: report.text,
                    img_urls: report.chart_urls,
                }
            }
            Mode::Followup => DispatchResponse {
                result: self.followup(&request.text, &state).await?,
                img_urls: Vec::new(),
            },
        };

        state.push_turn("user", request.text.as_str());
        state.push_turn("assistant", response.result.as_str());
        state.trim(self.history_limit);

        Ok(response)
    }

    /// Run one analysis outside any session
    ///
    /// # Errors
    ///
    /// Same policy as [`Dispatcher::respond`].
    pub async fn analyze(&self, text: &str, workflow: Workflow) -> Result<AnalysisReport> {
        let Some(pipeline) = workflow.pipeline() else {
            info!(?workflow, "Workflow not implemented");
            return Ok(AnalysisReport {
                text: CONSUMER_NOT_IMPLEMENTED.to_string(),
                completed: false,
                charts: Vec::new(),
                chart_urls: Vec::new(),
            });
        };

        let run = RunDirectory::create(&self.log_root)?;
        let outcome = self.executor.run_analysis(&pipeline, text, &run).await;

        let (text, completed) = match outcome {
            Ok(Gated::Accepted(output)) => (output.text, true),
            Ok(Gated::Rejected(reasoning)) => (rejection_message(&reasoning), false),
            Err(e) => (user_facing(e)?, false),
        };

        let charts = if completed { run.charts()? } else { Vec::new() };
        let chart_urls = charts.iter().filter_map(|c| run.chart_url(c)).collect();

        Ok(AnalysisReport {
            text,
            completed,
            charts,
            chart_urls,
        })
    }

    async fn followup(&self, text: &str, state: &ConversationState) -> Result<String> {
        match self.executor.run_followup(text, state, self.context_turns).await {
            Ok(Gated::Accepted(answer)) => Ok(answer),
            Ok(Gated::Rejected(reasoning)) => Ok(rejection_message(&reasoning)),
            Err(e) => user_facing(e),
        }
    }
}

/// Convert an error with a user-facing message into reply text
fn user_facing(error: anyhow::Error) -> Result<String> {
    match error
        .downcast_ref::<EcoOptimaError>()
        .and_then(EcoOptimaError::user_message)
    {
        Some(message) => {
            warn!("Returning error to user: {:#}", error);
            Ok(message)
        }
        None => Err(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Agent;
    use crate::error::NO_PRIOR_CONTEXT_MESSAGE;
    use crate::providers::Message;
    use crate::test_utils::{temp_dir, test_config, tool_call_message, verdict, ScriptedProvider};
    use serde_json::json;

    fn dispatcher(provider: &ScriptedProvider, config: &Config) -> Dispatcher {
        let agent = Agent::new(Arc::new(provider.clone()), &config.agent).unwrap();
        Dispatcher::new(
            Arc::new(SessionStore::new()),
            PipelineExecutor::new(agent),
            config,
        )
    }

    fn request(text: &str, mode: Mode) -> DispatchRequest {
        DispatchRequest {
            text: text.to_string(),
            mode,
            workflow: Workflow::Community,
        }
    }

    fn analysis_script() -> Vec<Message> {
        vec![
            verdict(true, "Tree planting."),
            Message::assistant(r#"{"project_type":"schoolyard"}"#),
            Message::assistant(r#"{"rankings":[]}"#),
            Message::assistant("Planting Benefits Advisor: shade trees cut runoff by a third."),
            tool_call_message(
                "plot_pie_chart",
                json!({"series": [{"name": "Canopy", "value": 60}, {"name": "Lawn", "value": 40}], "metric_name": "Cover"}),
            ),
            Message::assistant("Local ROI Advisor: shade the playground."),
        ]
    }

    #[tokio::test]
    async fn test_analyze_records_output_and_chart_urls() {
        let root = temp_dir();
        let config = test_config(root.path());
        let provider = ScriptedProvider::new(analysis_script());
        let dispatcher = dispatcher(&provider, &config);

        let response = dispatcher
            .respond("s1", &request("Trees for a schoolyard", Mode::Analyze))
            .await
            .unwrap();

        assert_eq!(response.result, "Local ROI Advisor: shade the playground.");
        assert_eq!(response.img_urls.len(), 1);
        assert!(response.img_urls[0].starts_with("/response_log/"));
        assert!(response.img_urls[0].ends_with(".svg"));

        let state = dispatcher.sessions().snapshot("s1").await;
        assert_eq!(state.last_output(), response.result);
        assert_eq!(state.history().len(), 2);
    }

    #[tokio::test]
    async fn test_followup_without_analysis_returns_guidance() {
        let root = temp_dir();
        let config = test_config(root.path());
        let provider = ScriptedProvider::new(vec![]);
        let dispatcher = dispatcher(&provider, &config);

        let response = dispatcher
            .respond("fresh", &request("What about maples?", Mode::Followup))
            .await
            .unwrap();
        assert_eq!(response.result, NO_PRIOR_CONTEXT_MESSAGE);
        assert!(response.img_urls.is_empty());
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_rejection_returns_message_without_charts() {
        let root = temp_dir();
        let config = test_config(root.path());
        let provider = ScriptedProvider::new(vec![verdict(false, "Not about plants.")]);
        let dispatcher = dispatcher(&provider, &config);

        let response = dispatcher
            .respond("s1", &request("what's the capital of France", Mode::Analyze))
            .await
            .unwrap();
        assert_eq!(response.result, "Guardrail blocked this input: Not about plants.");
        assert!(response.img_urls.is_empty());
        assert!(!dispatcher.sessions().snapshot("s1").await.has_prior_output());
    }

    #[tokio::test]
    async fn test_upstream_failure_becomes_retry_text() {
        let root = temp_dir();
        let mut config = test_config(root.path());
        config.agent.max_retries = 1;
        let provider = ScriptedProvider::new(vec![]);
        let dispatcher = dispatcher(&provider, &config);

        let response = dispatcher
            .respond("s1", &request("Oaks or maples?", Mode::Analyze))
            .await
            .unwrap();
        assert!(response.result.contains("temporarily unavailable"));
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_consumer_workflow_not_implemented() {
        let root = temp_dir();
        let config = test_config(root.path());
        let provider = ScriptedProvider::new(vec![]);
        let dispatcher = dispatcher(&provider, &config);

        let response = dispatcher
            .respond(
                "s1",
                &DispatchRequest {
                    text: "Backyard tree".to_string(),
                    mode: Mode::Analyze,
                    workflow: Workflow::Consumer,
                },
            )
            .await
            .unwrap();
        assert_eq!(response.result, CONSUMER_NOT_IMPLEMENTED);
        assert_eq!(provider.call_count(), 0);
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_history_is_trimmed_to_limit() {
        let root = temp_dir();
        let config = test_config(root.path());
        let provider = ScriptedProvider::new(vec![]);
        let dispatcher = dispatcher(&provider, &config);

        for i in 0..10 {
            dispatcher
                .respond("s1", &request(&format!("follow-up {}", i), Mode::Followup))
                .await
                .unwrap();
        }
        let state = dispatcher.sessions().snapshot("s1").await;
        assert_eq!(state.history().len(), 12);
        assert_eq!(state.history()[0].content, "follow-up 4");
    }

    #[tokio::test]
    async fn test_analysis_then_followup_uses_last_output() {
        let root = temp_dir();
        let config = test_config(root.path());
        let mut script = analysis_script();
        script.push(verdict(true, "Follow-up on the plan."));
        script.push(Message::assistant("Conversational Agent: yes, oaks tolerate clay."));
        let provider = ScriptedProvider::new(script);
        let dispatcher = dispatcher(&provider, &config);

        dispatcher
            .respond("s1", &request("Trees for a schoolyard", Mode::Analyze))
            .await
            .unwrap();
        let response = dispatcher
            .respond("s1", &request("Do oaks tolerate clay?", Mode::Followup))
            .await
            .unwrap();

        assert_eq!(response.result, "Conversational Agent: yes, oaks tolerate clay.");
        let payload = provider.call(7)[1].content.clone().unwrap();
        assert!(payload.contains("shade the playground"));
    }

    #[tokio::test]
    async fn test_same_session_requests_do_not_interleave() {
        let root = temp_dir();
        let config = test_config(root.path());
        let provider = ScriptedProvider::new(vec![
            verdict(true, "Follow-up."),
            Message::assistant("Conversational Agent: first answer"),
            verdict(true, "Follow-up."),
            Message::assistant("Conversational Agent: second answer"),
        ])
        .with_delay(std::time::Duration::from_millis(20));
        let dispatcher = Arc::new(dispatcher(&provider, &config));
        dispatcher
            .sessions()
            .get_or_create("s")
            .lock()
            .await
            .set_last_output("Local ROI Advisor: plant oaks");

        let first = {
            let dispatcher = Arc::clone(&dispatcher);
            tokio::spawn(async move {
                dispatcher.respond("s", &request("Which oak?", Mode::Followup)).await
            })
        };
        let second = {
            let dispatcher = Arc::clone(&dispatcher);
            tokio::spawn(async move {
                dispatcher.respond("s", &request("How many?", Mode::Followup)).await
            })
        };
        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();

        let state = dispatcher.sessions().snapshot("s").await;
        let roles: Vec<_> = state.history().iter().map(|t| t.role.as_str()).collect();
        assert_eq!(roles, vec!["user", "assistant", "user", "assistant"]);
        // Each answer directly follows the question that produced it
        assert_eq!(state.history()[1].content, "Conversational Agent: first answer");
        assert_eq!(state.history()[3].content, "Conversational Agent: second answer");
        // Both calls of one turn finish before the other turn's guardrail runs
        let guardrail_inputs: Vec<_> = [0, 2]
            .iter()
            .map(|&i| provider.call(i)[1].content.clone().unwrap())
            .collect();
        assert!(guardrail_inputs[0].contains(&state.history()[0].content));
        assert!(guardrail_inputs[1].contains(&state.history()[2].content));
    }
}
