//! Provider module for EcoOptima
//!
//! This module contains the LLM provider abstraction and implementations
//! for OpenAI-compatible servers and Ollama.

pub mod base;
pub mod ollama;
pub mod openai;

pub use base::{
    CompletionResponse, FunctionCall, Message, OutputSchema, Provider, TokenUsage, ToolCall,
};
pub use ollama::OllamaProvider;
pub use openai::OpenAIProvider;

use crate::config::ProviderConfig;
use crate::error::{EcoOptimaError, Result};
use std::sync::Arc;

/// Create a provider instance based on configuration
///
/// # Arguments
///
/// * `config` - Provider configuration; `provider_type` selects the backend
///
/// # Errors
///
/// Returns error if provider type is invalid or initialization fails
pub fn create_provider(config: &ProviderConfig) -> Result<Arc<dyn Provider>> {
    match config.provider_type.as_str() {
        "openai" => Ok(Arc::new(OpenAIProvider::new(config.openai.clone())?)),
        "ollama" => Ok(Arc::new(OllamaProvider::new(config.ollama.clone())?)),
        other => Err(EcoOptimaError::Provider(format!("Unknown provider type: {}", other)).into()),
    }
}
