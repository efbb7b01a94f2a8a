//! Command handlers for EcoOptima
//!
//! Each submodule implements one CLI subcommand:
//!
//! - `serve`: run the HTTP façade
//! - `analyze`: run one analysis from the terminal
//! - `chart`: render a chart offline from a JSON request file

use crate::agent::Agent;
use crate::config::Config;
use crate::error::Result;
use crate::pipeline::{Dispatcher, PipelineExecutor};
use crate::providers::create_provider;
use crate::session::SessionStore;
use std::sync::Arc;

/// Wire provider, agent runner, executor, and session store together
///
/// # Errors
///
/// Returns error if the provider cannot be created or the agent limits are
/// invalid.
pub fn build_dispatcher(config: &Config) -> Result<Dispatcher> {
    let provider = create_provider(&config.provider)?;
    tracing::info!(provider = provider.name(), "Provider ready");
    let agent = Agent::new(provider, &config.agent)?;
    Ok(Dispatcher::new(
        Arc::new(SessionStore::new()),
        PipelineExecutor::new(agent),
        config,
    ))
}

pub mod serve {
    //! HTTP server command

    use super::*;
    use crate::server::{self, AppState};

    /// Start the web façade and block until shutdown
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (bind address already resolved)
    pub async fn run_serve(config: Config) -> Result<()> {
        std::fs::create_dir_all(&config.output.log_root)?;

        let state = Arc::new(AppState {
            dispatcher: build_dispatcher(&config)?,
            cookie_name: config.server.cookie_name.clone(),
            pages_dir: config.server.pages_dir.clone(),
        });

        server::serve(state, &config.server.bind).await
    }
}

pub mod analyze {
    //! One-shot analysis command

    use super::*;
    use crate::pipeline::Workflow;

    /// Run one analysis outside any session and print the result
    ///
    /// Chart files written by the run are listed after the text.
    pub async fn run_analyze(config: Config, text: String, workflow: String) -> Result<()> {
        let dispatcher = build_dispatcher(&config)?;
        let workflow = Workflow::parse_lenient(&workflow);

        let report = dispatcher.analyze(&text, workflow).await?;
        println!("{}", report.text);

        if !report.charts.is_empty() {
            println!();
            println!("Charts:");
            for chart in &report.charts {
                println!("  {}", chart.display());
            }
        }
        Ok(())
    }
}

pub mod chart {
    //! Offline chart rendering command

    use super::*;
    use crate::chart::{render_chart, ChartKind, ChartRequest};
    use crate::error::EcoOptimaError;
    use std::path::{Path, PathBuf};

    /// Render `input` as a chart of `kind` and return the file path
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed, or the series is
    /// rejected by validation.
    pub fn render_from_file(
        input: &Path,
        kind: ChartKind,
        output_dir: Option<&Path>,
    ) -> Result<PathBuf> {
        let raw = std::fs::read_to_string(input).map_err(|e| {
            EcoOptimaError::Config(format!("Failed to read {}: {}", input.display(), e))
        })?;
        let request: ChartRequest = serde_json::from_str(&raw)?;
        render_chart(kind, &request, output_dir)
    }

    /// CLI entry point: render and print the written path
    pub fn run_chart(input: PathBuf, kind: ChartKind, output_dir: Option<PathBuf>) -> Result<()> {
        let path = render_from_file(&input, kind, output_dir.as_deref())?;
        println!("{}", path.display());
        Ok(())
    }
}
