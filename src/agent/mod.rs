//! Agent module for EcoOptima
//!
//! Static agent configuration, the executor that runs it against a
//! provider, and the per-session conversation state.

pub mod conversation;
pub mod core;

pub use conversation::{ConversationState, Turn};
pub use core::{Agent, AgentOutput, AgentSpec};
