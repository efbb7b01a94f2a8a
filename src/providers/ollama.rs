//! Ollama provider
//!
//! Talks to the `/api/chat` endpoint of a local or remote Ollama server.
//! Structured calls pass the agent's JSON schema as the `format` field,
//! which Ollama uses to constrain decoding.

use crate::config::OllamaConfig;
use crate::error::{EcoOptimaError, Result};
use crate::providers::{
    CompletionResponse, FunctionCall, Message, OutputSchema, Provider, TokenUsage, ToolCall,
};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Ollama chat provider
///
/// # Examples
///
/// ```no_run
/// use ecooptima::config::OllamaConfig;
/// use ecooptima::providers::{OllamaProvider, Provider, Message};
///
/// # async fn example() -> ecooptima::error::Result<()> {
/// let provider = OllamaProvider::new(OllamaConfig::default())?;
/// let reply = provider.complete(&[Message::user("Which oak tolerates clay?")], &[]).await?;
/// # Ok(())
/// # }
/// ```
pub struct OllamaProvider {
    client: Client,
    chat_url: String,
    config: OllamaConfig,
}

#[derive(Debug, Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a Value>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(default)]
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
}

/// Ollama tool calls carry arguments as a JSON object and usually no id
#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    id: String,
    function: WireFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    message: WireMessage,
    #[serde(default)]
    prompt_eval_count: usize,
    #[serde(default)]
    eval_count: usize,
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        let tool_calls = message
            .tool_calls
            .iter()
            .flatten()
            .map(|call| WireToolCall {
                id: call.id.clone(),
                function: WireFunction {
                    name: call.function.name.clone(),
                    arguments: serde_json::from_str(&call.function.arguments)
                        .unwrap_or_else(|_| Value::Object(Default::default())),
                },
            })
            .collect();

        Self {
            role: message.role.clone(),
            content: message.content.clone().unwrap_or_default(),
            tool_calls,
        }
    }
}

impl WireMessage {
    /// Convert a reply, assigning ids to tool calls that arrive without one
    fn into_message(self) -> Message {
        if self.tool_calls.is_empty() {
            return Message::assistant(self.content);
        }

        let batch = uuid::Uuid::new_v4().simple().to_string();
        let calls = self
            .tool_calls
            .into_iter()
            .enumerate()
            .map(|(index, call)| ToolCall {
                id: if call.id.is_empty() {
                    format!("call_{}_{}", &batch[..8], index)
                } else {
                    call.id
                },
                function: FunctionCall {
                    name: call.function.name,
                    arguments: call.function.arguments.to_string(),
                },
            })
            .collect();
        Message::assistant_with_tools(calls)
    }
}

/// Wrap a registry tool definition (`name`, `description`, `parameters`)
/// in Ollama's function envelope
fn wrap_tool(definition: &Value) -> Option<Value> {
    let name = definition.get("name")?.as_str()?;
    Some(serde_json::json!({
        "type": "function",
        "function": {
            "name": name,
            "description": definition.get("description").and_then(Value::as_str).unwrap_or_default(),
            "parameters": definition.get("parameters").cloned().unwrap_or(Value::Null),
        }
    }))
}

impl OllamaProvider {
    /// Create a new Ollama provider
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .user_agent(concat!("ecooptima/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| EcoOptimaError::Provider(format!("Failed to create HTTP client: {}", e)))?;

        let chat_url = format!("{}/api/chat", config.host.trim_end_matches('/'));
        tracing::info!(host = %config.host, model = %config.model, "Initialized Ollama provider");

        Ok(Self {
            client,
            chat_url,
            config,
        })
    }

    /// Configured Ollama host
    pub fn host(&self) -> &str {
        &self.config.host
    }

    /// Configured model name
    pub fn model(&self) -> &str {
        &self.config.model
    }

    async fn chat(
        &self,
        messages: &[Message],
        tools: &[Value],
        format: Option<&Value>,
    ) -> Result<CompletionResponse> {
        let body = ChatBody {
            model: &self.config.model,
            messages: messages
                .iter()
                .filter(|m| m.content.is_some() || m.tool_calls.is_some())
                .map(WireMessage::from)
                .collect(),
            tools: tools.iter().filter_map(wrap_tool).collect(),
            format,
            stream: false,
        };
        tracing::debug!(
            messages = body.messages.len(),
            tools = body.tools.len(),
            structured = format.is_some(),
            "Sending Ollama chat request"
        );

        let response = self
            .client
            .post(&self.chat_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| EcoOptimaError::UpstreamFailure(format!("Ollama request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            tracing::error!("Ollama returned {}: {}", status, detail);
            return Err(EcoOptimaError::from_upstream_status(
                status.as_u16(),
                format!("Ollama returned {}: {}", status, detail),
            )
            .into());
        }

        let reply: ChatReply = response.json().await.map_err(|e| {
            EcoOptimaError::UpstreamFailure(format!("Failed to parse Ollama response: {}", e))
        })?;

        let message = reply.message.into_message();
        if reply.prompt_eval_count == 0 && reply.eval_count == 0 {
            return Ok(CompletionResponse::new(message));
        }
        Ok(CompletionResponse::with_usage(
            message,
            TokenUsage::new(reply.prompt_eval_count, reply.eval_count),
        ))
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    async fn complete(&self, messages: &[Message], tools: &[Value]) -> Result<CompletionResponse> {
        self.chat(messages, tools, None).await
    }

    async fn complete_structured(
        &self,
        messages: &[Message],
        schema: &OutputSchema,
    ) -> Result<CompletionResponse> {
        self.chat(messages, &[], Some(&schema.schema)).await
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
