//! OpenAI-compatible chat completions provider
//!
//! Talks to any server exposing `POST {api_base}/chat/completions`, including
//! the hosted OpenAI API and local mocks used in tests. Structured agent
//! output is requested through `response_format: json_schema`.

use crate::config::OpenAIConfig;
use crate::error::{EcoOptimaError, Result};
use crate::providers::{
    CompletionResponse, FunctionCall, Message, OutputSchema, Provider, TokenUsage, ToolCall,
};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// OpenAI-compatible API provider
///
/// # Examples
///
/// ```no_run
/// use ecooptima::config::OpenAIConfig;
/// use ecooptima::providers::{OpenAIProvider, Provider, Message};
///
/// # async fn example() -> ecooptima::error::Result<()> {
/// let provider = OpenAIProvider::new(OpenAIConfig::default())?;
/// let completion = provider.complete(&[Message::user("Hello!")], &[]).await?;
/// # Ok(())
/// # }
/// ```
pub struct OpenAIProvider {
    client: Client,
    chat_url: String,
    config: OpenAIConfig,
}

/// Request structure for the chat completions API
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ChatTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    stream: bool,
}

/// Message structure for the chat completions API
#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ChatToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

/// Tool definition
#[derive(Debug, Serialize)]
struct ChatTool {
    r#type: String,
    function: ChatFunction,
}

/// Function definition for tools
#[derive(Debug, Serialize)]
struct ChatFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

/// Tool call as sent and received on the wire
#[derive(Debug, Serialize, Deserialize)]
struct ChatToolCall {
    id: String,
    #[serde(default = "default_tool_type")]
    r#type: String,
    function: ChatFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

fn default_tool_type() -> String {
    "function".to_string()
}

/// `response_format` block for structured output
#[derive(Debug, Serialize)]
struct ResponseFormat {
    r#type: String,
    json_schema: JsonSchemaFormat,
}

#[derive(Debug, Serialize)]
struct JsonSchemaFormat {
    name: String,
    schema: serde_json::Value,
}

/// Response structure from the chat completions API
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: usize,
    #[serde(default)]
    completion_tokens: usize,
}

impl OpenAIProvider {
    /// Create a new provider instance
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .user_agent(concat!("ecooptima/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| EcoOptimaError::Provider(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!(
            "Initialized OpenAI provider: api_base={}, model={}",
            config.api_base,
            config.model
        );

        let chat_url = format!("{}/chat/completions", config.api_base.trim_end_matches('/'));
        Ok(Self {
            client,
            chat_url,
            config,
        })
    }

    /// Get the configured model name
    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn convert_messages(&self, messages: &[Message]) -> Vec<ChatMessage> {
        messages
            .iter()
            .filter(|m| m.content.is_some() || m.tool_calls.is_some())
            .map(|m| ChatMessage {
                role: m.role.clone(),
                content: m.content.clone(),
                tool_calls: m.tool_calls.as_ref().map(|calls| {
                    calls
                        .iter()
                        .map(|tc| ChatToolCall {
                            id: tc.id.clone(),
                            r#type: "function".to_string(),
                            function: ChatFunctionCall {
                                name: tc.function.name.clone(),
                                arguments: tc.function.arguments.clone(),
                            },
                        })
                        .collect()
                }),
                tool_call_id: m.tool_call_id.clone(),
            })
            .collect()
    }

    fn convert_tools(&self, tools: &[serde_json::Value]) -> Vec<ChatTool> {
        tools
            .iter()
            .filter_map(|t| {
                let obj = t.as_object()?;
                Some(ChatTool {
                    r#type: "function".to_string(),
                    function: ChatFunction {
                        name: obj.get("name")?.as_str()?.to_string(),
                        description: obj.get("description")?.as_str()?.to_string(),
                        parameters: obj.get("parameters")?.clone(),
                    },
                })
            })
            .collect()
    }

    fn convert_response_message(&self, message: ChatMessage) -> Message {
        match message.tool_calls {
            Some(calls) if !calls.is_empty() => Message::assistant_with_tools(
                calls
                    .into_iter()
                    .map(|tc| ToolCall {
                        id: tc.id,
                        function: FunctionCall {
                            name: tc.function.name,
                            arguments: tc.function.arguments,
                        },
                    })
                    .collect(),
            ),
            _ => Message::assistant(message.content.unwrap_or_default()),
        }
    }

    async fn send(
        &self,
        messages: &[Message],
        tools: &[serde_json::Value],
        response_format: Option<ResponseFormat>,
    ) -> Result<CompletionResponse> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: self.convert_messages(messages),
            tools: self.convert_tools(tools),
            response_format,
            stream: false,
        };

        tracing::debug!(
            "Sending chat completion request: {} messages, {} tools, structured={}",
            request.messages.len(),
            request.tools.len(),
            request.response_format.is_some()
        );

        let api_key_env = &self.config.api_key_env;
        let mut builder = self.client.post(&self.chat_url).json(&request);
        match std::env::var(api_key_env) {
            Ok(key) if !key.is_empty() => builder = builder.bearer_auth(key),
            _ => tracing::debug!("{} is not set; sending request without credentials", api_key_env),
        }

        let response = builder.send().await.map_err(|e| {
            tracing::error!("Chat completion request failed: {}", e);
            EcoOptimaError::UpstreamFailure(format!("Chat completion request failed: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Chat completion returned error {}: {}", status, error_text);
            return Err(EcoOptimaError::from_upstream_status(
                status.as_u16(),
                format!("Chat completion returned error {}: {}", status, error_text),
            )
            .into());
        }

        let body: ChatResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse chat completion response: {}", e);
            EcoOptimaError::UpstreamFailure(format!(
                "Failed to parse chat completion response: {}",
                e
            ))
        })?;

        let choice = body.choices.into_iter().next().ok_or_else(|| {
            EcoOptimaError::UpstreamFailure("Chat completion response had no choices".to_string())
        })?;

        let message = self.convert_response_message(choice.message);
        Ok(match body.usage {
            Some(usage) => CompletionResponse::with_usage(
                message,
                TokenUsage::new(usage.prompt_tokens, usage.completion_tokens),
            ),
            None => CompletionResponse::new(message),
        })
    }
}

#[async_trait]
impl Provider for OpenAIProvider {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[serde_json::Value],
    ) -> Result<CompletionResponse> {
        self.send(messages, tools, None).await
    }

    async fn complete_structured(
        &self,
        messages: &[Message],
        schema: &OutputSchema,
    ) -> Result<CompletionResponse> {
        let format = ResponseFormat {
            r#type: "json_schema".to_string(),
            json_schema: JsonSchemaFormat {
                name: schema.name.clone(),
                schema: schema.schema.clone(),
            },
        };
        self.send(messages, &[], Some(format)).await
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> OpenAIProvider {
        OpenAIProvider::new(OpenAIConfig::default()).unwrap()
    }

    #[test]
    fn test_provider_model() {
        assert_eq!(provider().model(), "gpt-5-nano");
    }

    #[test]
    fn test_convert_messages_skips_empty() {
        let mut empty = Message::assistant("x");
        empty.content = None;
        let converted = provider().convert_messages(&[Message::user("Hello"), empty]);
        assert_eq!(converted.len(), 1);
        assert_eq!(converted[0].role, "user");
    }

    #[test]
    fn test_convert_tools_requires_name_and_parameters() {
        let tools = vec![
            serde_json::json!({"name": "plot_bar_chart", "description": "d", "parameters": {}}),
            serde_json::json!({"description": "missing name"}),
        ];
        let converted = provider().convert_tools(&tools);
        assert_eq!(converted.len(), 1);
        assert_eq!(converted[0].function.name, "plot_bar_chart");
    }

    #[test]
    fn test_convert_response_with_tool_calls() {
        let message: ChatMessage = serde_json::from_value(serde_json::json!({
            "role": "assistant",
            "content": null,
            "tool_calls": [{
                "id": "call_1",
                "type": "function",
                "function": {"name": "plot_pie_chart", "arguments": "{\"series\":[]}"}
            }]
        }))
        .unwrap();
        let converted = provider().convert_response_message(message);
        let calls = converted.tool_calls.unwrap();
        assert_eq!(calls[0].function.name, "plot_pie_chart");
    }

    #[test]
    fn test_structured_request_serialization() {
        let request = ChatRequest {
            model: "m".to_string(),
            messages: vec![],
            tools: vec![],
            response_format: Some(ResponseFormat {
                r#type: "json_schema".to_string(),
                json_schema: JsonSchemaFormat {
                    name: "GuardrailVerdict".to_string(),
                    schema: serde_json::json!({"type": "object"}),
                },
            }),
            stream: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["response_format"]["type"], "json_schema");
        assert_eq!(json["response_format"]["json_schema"]["name"], "GuardrailVerdict");
        assert!(json.get("tools").is_none());
    }
}
