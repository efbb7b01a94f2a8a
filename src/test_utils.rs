//! Test utilities for EcoOptima
//!
//! Scripted providers and configuration helpers shared by unit tests.

use crate::config::Config;
use crate::error::{EcoOptimaError, Result};
use crate::providers::{
    CompletionResponse, FunctionCall, Message, OutputSchema, Provider, ToolCall,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Create a temporary directory for testing
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// Default configuration with run output under `log_root` and fast retries
pub fn test_config(log_root: &Path) -> Config {
    let mut config = Config::default();
    config.output.log_root = log_root.to_path_buf();
    config.agent.retry_backoff_ms = 1;
    config
}

/// Assistant reply carrying a single tool call
pub fn tool_call_message(name: &str, arguments: serde_json::Value) -> Message {
    Message::assistant_with_tools(vec![ToolCall {
        id: format!("call_{}", name),
        function: FunctionCall {
            name: name.to_string(),
            arguments: arguments.to_string(),
        },
    }])
}

/// Guardrail verdict reply
pub fn verdict(is_eco_optima: bool, reasoning: &str) -> Message {
    Message::assistant(
        serde_json::json!({ "is_eco_optima": is_eco_optima, "reasoning": reasoning }).to_string(),
    )
}

/// Provider that replays a fixed script of replies
///
/// Each call pops the next reply; an exhausted script fails the call.
/// The messages of every call are recorded for inspection.
#[derive(Clone, Default)]
pub struct ScriptedProvider {
    replies: Arc<Mutex<VecDeque<Message>>>,
    calls: Arc<Mutex<Vec<Vec<Message>>>>,
    delay: Option<Duration>,
}

impl ScriptedProvider {
    /// Create a provider replaying `replies` in order
    pub fn new(replies: Vec<Message>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
            calls: Arc::new(Mutex::new(Vec::new())),
            delay: None,
        }
    }

    /// Sleep for `delay` before answering each call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of calls made so far
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Messages sent in call `index`
    pub fn call(&self, index: usize) -> Vec<Message> {
        self.calls.lock().unwrap()[index].clone()
    }

    fn next(&self, messages: &[Message]) -> Result<CompletionResponse> {
        self.calls.lock().unwrap().push(messages.to_vec());
        match self.replies.lock().unwrap().pop_front() {
            Some(reply) => Ok(CompletionResponse::new(reply)),
            None => Err(EcoOptimaError::UpstreamFailure("script exhausted".to_string()).into()),
        }
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn complete(
        &self,
        messages: &[Message],
        _tools: &[serde_json::Value],
    ) -> Result<CompletionResponse> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.next(messages)
    }

    async fn complete_structured(
        &self,
        messages: &[Message],
        _schema: &OutputSchema,
    ) -> Result<CompletionResponse> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.next(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_provider_replays_in_order() {
        let provider = ScriptedProvider::new(vec![Message::assistant("one"), Message::assistant("two")]);
        let first = provider.complete(&[Message::user("a")], &[]).await.unwrap();
        let second = provider.complete(&[Message::user("b")], &[]).await.unwrap();
        assert_eq!(first.message.content.as_deref(), Some("one"));
        assert_eq!(second.message.content.as_deref(), Some("two"));
        assert!(provider.complete(&[], &[]).await.is_err());
        assert_eq!(provider.call_count(), 3);
        assert_eq!(provider.call(1)[0].content.as_deref(), Some("b"));
    }

    #[test]
    fn test_config_points_at_log_root() {
        let dir = temp_dir();
        let config = test_config(dir.path());
        assert_eq!(config.output.log_root, dir.path());
        assert!(config.validate().is_ok());
    }
}
