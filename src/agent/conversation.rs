//! Per-session conversation state
//!
//! History is a fixed sliding window of `{role, content}` turns: oldest
//! turns are discarded first and nothing is summarized.

use serde::{Deserialize, Serialize};

/// One exchanged message in a session's history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// `user` or `assistant`
    pub role: String,
    /// Message text
    pub content: String,
}

impl Turn {
    /// Create a turn with an arbitrary role
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    /// Create a user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    /// Create an assistant turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }
}

/// Conversation state owned by one session
///
/// # Examples
///
/// ```
/// use ecooptima::agent::ConversationState;
///
/// let mut state = ConversationState::default();
/// for i in 0..20 {
///     state.push_turn("user", format!("question {}", i));
/// }
/// state.trim(12);
/// assert_eq!(state.history().len(), 12);
/// assert_eq!(state.history()[0].content, "question 8");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    history: Vec<Turn>,
    last_output: String,
}

impl ConversationState {
    /// Append a turn at the end of the history
    pub fn push_turn(&mut self, role: impl Into<String>, content: impl Into<String>) {
        self.history.push(Turn::new(role, content));
    }

    /// Keep only the most recent `keep_last` turns, in their original order
    pub fn trim(&mut self, keep_last: usize) {
        if self.history.len() > keep_last {
            let excess = self.history.len() - keep_last;
            self.history.drain(..excess);
        }
    }

    /// The most recent `k` turns (fewer if the history is shorter)
    pub fn recent(&self, k: usize) -> &[Turn] {
        let start = self.history.len().saturating_sub(k);
        &self.history[start..]
    }

    /// Full stored history, oldest first
    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    /// Output of the last completed analysis, empty if none
    pub fn last_output(&self) -> &str {
        &self.last_output
    }

    /// Record the output of a completed analysis
    pub fn set_last_output(&mut self, output: impl Into<String>) {
        self.last_output = output.into();
    }

    /// Whether a prior analysis exists to answer follow-ups against
    pub fn has_prior_output(&self) -> bool {
        !self.last_output.trim().is_empty()
    }

    /// Drop all history and the last output
    pub fn clear(&mut self) {
        self.history.clear();
        self.last_output.clear();
    }

    /// True when there is neither history nor a prior output
    pub fn is_empty(&self) -> bool {
        self.history.is_empty() && self.last_output.is_empty()
    }
}
