//! EcoOptima - urban-forestry planning assistant library
//!
//! This library routes free-text tree-planting questions through a chain of
//! LLM agents (guardrail, triage, plant matrix, local ROI) and serves the
//! results over HTTP with per-session conversation memory.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `agent`: Agent definitions, the tool-calling run loop, and conversation state
//! - `chart`: Bar and pie chart rendering for tree metrics
//! - `pipeline`: Workflow tables, the pipeline executor, and request dispatch
//! - `providers`: AI provider abstraction and implementations (OpenAI, Ollama)
//! - `server`: HTTP façade
//! - `session`: Per-session conversation store
//! - `tools`: Tool registry exposing charts to agents
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use ecooptima::commands::build_dispatcher;
//! use ecooptima::pipeline::Workflow;
//! use ecooptima::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     config.validate()?;
//!
//!     let dispatcher = build_dispatcher(&config)?;
//!     let report = dispatcher.analyze("Street trees for Cincinnati", Workflow::Community).await?;
//!     println!("{}", report.text);
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod chart;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod providers;
pub mod server;
pub mod session;
pub mod tools;

// Re-export commonly used types
pub use agent::Agent;
pub use config::Config;
pub use error::{EcoOptimaError, Result};
pub use pipeline::Dispatcher;

#[cfg(test)]
pub mod test_utils;
