//! Agent pipelines
//!
//! Workflow tables, the executor that interprets them, per-run output
//! directories, and the dispatcher the web façade and CLI call into.

pub mod dispatch;
pub mod executor;
pub mod prompts;
pub mod run_log;
pub mod workflows;

pub use dispatch::{AnalysisReport, DispatchRequest, DispatchResponse, Dispatcher};
pub use executor::{rejection_message, Gated, PipelineExecutor, PipelineOutput};
pub use run_log::RunDirectory;
pub use workflows::{Mode, PipelineSpec, StageInput, StageSpec, Workflow};
