//! Error types for EcoOptima
//!
//! This module defines all error types used throughout the service,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for EcoOptima operations
///
/// Chart validation errors, upstream (LLM) failures, and configuration
/// problems all surface through this enum. Guardrail rejection is not an
/// error; see [`crate::pipeline::Gated`].
#[derive(Error, Debug)]
pub enum EcoOptimaError {
    /// Chart request had no series entries
    #[error("Provide at least one (label, value) pair to chart.")]
    EmptySeries,

    /// A series entry had none of the accepted label keys
    #[error("Each entry must include a label or tree name (entry {index}).")]
    MissingLabel {
        /// Position of the offending entry in the input series
        index: usize,
    },

    /// A series value could not be coerced to a number
    #[error("Could not extract a numeric value from '{0}'.")]
    NonNumericValue(String),

    /// Pie charts cannot draw negative wedges
    #[error("Pie chart values must not be negative: {label} = {value}")]
    NegativePieValue {
        /// Label of the offending entry
        label: String,
        /// Resolved negative value
        value: f64,
    },

    /// A follow-up was requested before any analysis ran for the session
    #[error("No prior analysis context for this session")]
    NoPriorContext,

    /// An external agent call exceeded its time budget
    #[error("Upstream call timed out after {seconds} seconds")]
    UpstreamTimeout {
        /// Configured per-call timeout
        seconds: u64,
    },

    /// An external agent call failed
    #[error("Upstream failure: {0}")]
    UpstreamFailure(String),

    /// The LLM endpoint refused the request itself (bad key, bad request,
    /// unknown model); repeating it cannot succeed
    #[error("Upstream rejected the request ({status}): {message}")]
    UpstreamRejected {
        /// HTTP status of the reply
        status: u16,
        /// Status line and reply body
        message: String,
    },

    /// A structured-output agent replied with something that is not JSON
    #[error("Agent '{agent}' returned invalid structured output: {message}")]
    InvalidStructuredOutput {
        /// Name of the agent whose output failed to parse
        agent: String,
        /// Parser message
        message: String,
    },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider-related errors (API calls, authentication, etc.)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Tool execution errors
    #[error("Tool execution error: {0}")]
    Tool(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Guidance returned when a follow-up arrives with no prior analysis
pub const NO_PRIOR_CONTEXT_MESSAGE: &str =
    "No prior context: run an analysis first, then ask follow-up questions about it.";

/// Reply text when the LLM endpoint refuses the request outright
pub const UPSTREAM_REJECTED_MESSAGE: &str =
    "The planning service rejected the request. Contact the operator.";

impl EcoOptimaError {
    /// Classify a non-success reply from an LLM endpoint
    ///
    /// Client errors other than 408 and 429 become `UpstreamRejected`;
    /// everything else is a transient `UpstreamFailure`.
    pub fn from_upstream_status(status: u16, message: String) -> Self {
        match status {
            408 | 429 => Self::UpstreamFailure(message),
            400..=499 => Self::UpstreamRejected { status, message },
            _ => Self::UpstreamFailure(message),
        }
    }

    /// Whether a retry of the same call could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::UpstreamTimeout { .. } | Self::UpstreamFailure(_)
        )
    }

    /// Text shown to the end user for errors the web facade converts into a
    /// normal response instead of a server error
    ///
    /// Returns `None` for faults that should propagate as HTTP 500.
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::EmptySeries
            | Self::MissingLabel { .. }
            | Self::NonNumericValue(_)
            | Self::NegativePieValue { .. } => Some(format!("Chart error: {}", self)),
            Self::NoPriorContext => Some(NO_PRIOR_CONTEXT_MESSAGE.to_string()),
            Self::UpstreamTimeout { seconds } => Some(format!(
                "The planning service did not answer within {} seconds. Please try again.",
                seconds
            )),
            Self::UpstreamFailure(_) | Self::InvalidStructuredOutput { .. } => Some(
                "The planning service is temporarily unavailable. Please try again.".to_string(),
            ),
            Self::UpstreamRejected { .. } => Some(UPSTREAM_REJECTED_MESSAGE.to_string()),
            _ => None,
        }
    }
}

/// Result type alias for EcoOptima operations
///
/// Uses `anyhow::Error` so callers can attach context; typed variants are
/// recovered with `downcast_ref::<EcoOptimaError>()`.
pub type Result<T> = anyhow::Result<T>;
