//! Agent core implementation
//!
//! An [`Agent`] runs one statically configured [`AgentSpec`] against the
//! configured provider:
//! - agents with an output schema make a single structured call
//! - other agents run a tool-calling loop bounded by `max_turns`
//!
//! Every provider round trip is bounded by a timeout and retried with
//! exponential backoff.

use crate::config::AgentConfig;
use crate::error::{EcoOptimaError, Result};
use crate::providers::{CompletionResponse, Message, OutputSchema, Provider, ToolCall};
use crate::tools::{ToolKind, ToolRegistry, ToolResult};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Tool output longer than this is truncated before it goes back to the model
const MAX_TOOL_OUTPUT_BYTES: usize = 16 * 1024;

/// Static configuration of one external agent
#[derive(Debug, Clone)]
pub struct AgentSpec {
    /// Display name; agents start their answers with it
    pub name: String,
    /// System instructions
    pub instructions: String,
    /// Logged when the previous stage hands off to this agent
    pub handoff_description: Option<String>,
    /// Declared output schema, for structured agents
    pub output_schema: Option<OutputSchema>,
    /// Local tools the agent may call
    pub tools: Vec<ToolKind>,
}

impl AgentSpec {
    /// Create a free-text agent without tools
    pub fn new(name: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
            handoff_description: None,
            output_schema: None,
            tools: Vec::new(),
        }
    }

    /// Set the handoff description
    pub fn with_handoff_description(mut self, description: impl Into<String>) -> Self {
        self.handoff_description = Some(description.into());
        self
    }

    /// Require replies conforming to `schema`
    pub fn with_output_schema(mut self, schema: OutputSchema) -> Self {
        self.output_schema = Some(schema);
        self
    }

    /// Allow the agent to call the given tools
    pub fn with_tools(mut self, tools: impl IntoIterator<Item = ToolKind>) -> Self {
        self.tools.extend(tools);
        self
    }
}

/// Result of one agent invocation
#[derive(Debug, Clone, PartialEq)]
pub enum AgentOutput {
    /// Free-text answer
    Text(String),
    /// Value conforming to the agent's declared schema
    Structured(Value),
}

impl AgentOutput {
    /// Render the output as text for the next stage or the end user
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Structured(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
        }
    }

    /// Structured value, if any
    pub fn as_structured(&self) -> Option<&Value> {
        match self {
            Self::Structured(value) => Some(value),
            Self::Text(_) => None,
        }
    }
}

/// Executes agent specs against a provider
///
/// # Examples
///
/// ```ignore
/// use ecooptima::agent::{Agent, AgentSpec};
/// use ecooptima::config::AgentConfig;
/// use ecooptima::tools::ToolRegistry;
///
/// # async fn example(provider: std::sync::Arc<dyn ecooptima::providers::Provider>) -> ecooptima::error::Result<()> {
/// let agent = Agent::new(provider, &AgentConfig::default())?;
/// let spec = AgentSpec::new("Triage Agent", "Classify the planning request.");
/// let output = agent.run(&spec, "Shade trees for a parking lot", &ToolRegistry::new()).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Agent {
    provider: Arc<dyn Provider>,
    max_turns: usize,
    call_timeout: Duration,
    max_retries: u32,
    retry_backoff: Duration,
}

impl Agent {
    /// Creates a new agent runner
    ///
    /// # Errors
    ///
    /// Returns `EcoOptimaError::Config` if `max_turns` or the call timeout is zero
    pub fn new(provider: Arc<dyn Provider>, config: &AgentConfig) -> Result<Self> {
        if config.max_turns == 0 {
            return Err(
                EcoOptimaError::Config("max_turns must be greater than 0".to_string()).into(),
            );
        }
        if config.call_timeout_seconds == 0 {
            return Err(EcoOptimaError::Config(
                "call_timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        Ok(Self {
            provider,
            max_turns: config.max_turns,
            call_timeout: Duration::from_secs(config.call_timeout_seconds),
            max_retries: config.max_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        })
    }

    /// Override the per-call timeout
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Override the initial retry backoff
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Run `spec` on `input`
    ///
    /// `tools` must contain every tool the agent declares; calls to tools the
    /// registry does not hold are answered with an error result.
    ///
    /// # Errors
    ///
    /// Returns `UpstreamTimeout` or `UpstreamFailure` once retries are
    /// exhausted, the provider's own error at once when it is not
    /// retryable, and `InvalidStructuredOutput` when a structured agent
    /// replies with something that is not JSON.
    pub async fn run(&self, spec: &AgentSpec, input: &str, tools: &ToolRegistry) -> Result<AgentOutput> {
        let start_time = Instant::now();
        info!(agent = %spec.name, "Running agent");

        let messages = vec![Message::system(spec.instructions.clone()), Message::user(input)];

        let output = match &spec.output_schema {
            Some(schema) => self.run_structured(spec, &messages, schema).await?,
            None => self.run_tool_loop(spec, messages, tools).await?,
        };

        info!(
            agent = %spec.name,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Agent finished"
        );
        Ok(output)
    }

    async fn run_structured(
        &self,
        spec: &AgentSpec,
        messages: &[Message],
        schema: &OutputSchema,
    ) -> Result<AgentOutput> {
        let response = self.call_provider(&spec.name, messages, &[], Some(schema)).await?;
        let content = response.message.content.unwrap_or_default();

        let value: Value = serde_json::from_str(strip_code_fence(&content)).map_err(|e| {
            warn!(agent = %spec.name, "Structured output did not parse: {}", e);
            EcoOptimaError::InvalidStructuredOutput {
                agent: spec.name.clone(),
                message: e.to_string(),
            }
        })?;

        debug!(agent = %spec.name, "Structured output: {}", value);
        Ok(AgentOutput::Structured(value))
    }

    async fn run_tool_loop(
        &self,
        spec: &AgentSpec,
        mut messages: Vec<Message>,
        tools: &ToolRegistry,
    ) -> Result<AgentOutput> {
        let tool_definitions = tools.all_definitions();

        for iteration in 1..=self.max_turns {
            debug!(agent = %spec.name, "Iteration {}/{}", iteration, self.max_turns);

            let message = self
                .call_provider(&spec.name, &messages, &tool_definitions, None)
                .await?
                .message;

            let tool_calls = message.tool_calls.clone().unwrap_or_default();
            if tool_calls.is_empty() {
                return match message.content {
                    Some(content) => Ok(AgentOutput::Text(content)),
                    None => {
                        warn!(agent = %spec.name, "Provider returned neither content nor tool calls");
                        Err(EcoOptimaError::UpstreamFailure(format!(
                            "{} returned an empty response",
                            spec.name
                        ))
                        .into())
                    }
                };
            }

            debug!(agent = %spec.name, "Executing {} tool calls", tool_calls.len());
            messages.push(message);
            for tool_call in &tool_calls {
                let result = self.execute_tool_call(tools, tool_call).await?;
                messages.push(Message::tool_result(tool_call.id.clone(), result.to_message()));
            }
        }

        warn!(agent = %spec.name, "Maximum turns ({}) exceeded", self.max_turns);
        Err(EcoOptimaError::UpstreamFailure(format!(
            "{} did not produce an answer within {} turns",
            spec.name, self.max_turns
        ))
        .into())
    }

    async fn execute_tool_call(&self, tools: &ToolRegistry, tool_call: &ToolCall) -> Result<ToolResult> {
        let tool_name = &tool_call.function.name;
        debug!("Executing tool: {}", tool_name);

        let Some(executor) = tools.get(tool_name) else {
            warn!("Model requested unknown tool: {}", tool_name);
            return Ok(ToolResult::error(format!("Tool not found: {}", tool_name)));
        };

        let args: Value = match serde_json::from_str(&tool_call.function.arguments) {
            Ok(args) => args,
            Err(e) => {
                return Ok(ToolResult::error(format!(
                    "Failed to parse tool arguments for '{}': {}",
                    tool_name, e
                )))
            }
        };

        let result = executor.execute(args).await.map_err(|e| {
            anyhow::Error::from(EcoOptimaError::Tool(format!(
                "Tool '{}' execution failed: {}",
                tool_name, e
            )))
        })?;

        Ok(result.truncate_if_needed(MAX_TOOL_OUTPUT_BYTES))
    }

    /// One provider round trip with timeout and retries
    async fn call_provider(
        &self,
        agent: &str,
        messages: &[Message],
        tools: &[Value],
        schema: Option<&OutputSchema>,
    ) -> Result<CompletionResponse> {
        let mut attempt: u32 = 0;
        loop {
            let call = async {
                match schema {
                    Some(schema) => self.provider.complete_structured(messages, schema).await,
                    None => self.provider.complete(messages, tools).await,
                }
            };

            let error = match tokio::time::timeout(self.call_timeout, call).await {
                Ok(Ok(response)) => {
                    if let Some(usage) = response.usage {
                        debug!(agent, total_tokens = usage.total_tokens, "Provider call succeeded");
                    }
                    return Ok(response);
                }
                Ok(Err(e)) => match e.downcast_ref::<EcoOptimaError>() {
                    Some(typed) if !typed.is_retryable() => {
                        warn!(agent, "Provider call failed permanently: {}", typed);
                        return Err(e);
                    }
                    _ => EcoOptimaError::UpstreamFailure(format!("{}: {}", agent, e)),
                },
                Err(_) => EcoOptimaError::UpstreamTimeout {
                    seconds: self.call_timeout.as_secs(),
                },
            };

            if attempt >= self.max_retries {
                warn!(agent, attempts = attempt + 1, "Giving up on provider call: {}", error);
                return Err(error.into());
            }

            let delay = self.retry_backoff.saturating_mul(2u32.saturating_pow(attempt));
            warn!(
                agent,
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                "Provider call failed, retrying: {}",
                error
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

/// Remove a surrounding Markdown code fence, if present
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
