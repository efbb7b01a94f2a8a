//! Command-line interface definition for EcoOptima
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands to serve the web façade, run a one-shot analysis,
//! and render charts offline.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::chart::ChartKind;

/// EcoOptima - urban-forestry planning assistant
///
/// Routes free-text planning questions through a chain of LLM agents and
/// produces plant-selection and environmental ROI recommendations.
#[derive(Parser, Debug, Clone)]
#[command(name = "ecooptima")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Override the provider from config (openai, ollama)
    #[arg(long, global = true)]
    pub provider: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for EcoOptima
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the HTTP server
    Serve {
        /// Address to bind, e.g. 127.0.0.1:5000
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Run one analysis and print the result
    Analyze {
        /// Planning question to analyze
        #[arg(short, long)]
        text: String,

        /// Workflow to run (community, consumer)
        #[arg(short, long, default_value = "community")]
        workflow: String,
    },

    /// Render a chart from a JSON request file without calling any model
    Chart {
        /// JSON file holding the chart request
        #[arg(short, long)]
        input: PathBuf,

        /// Chart kind
        #[arg(short, long, value_enum, default_value_t = ChartKindArg::Bar)]
        kind: ChartKindArg,

        /// Output directory (defaults to $ECOOPTIMA_LOG_DIR or response_log)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
}

/// Chart kind as accepted on the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKindArg {
    /// Bar chart
    Bar,
    /// Pie chart
    Pie,
}

impl From<ChartKindArg> for ChartKind {
    fn from(arg: ChartKindArg) -> Self {
        match arg {
            ChartKindArg::Bar => ChartKind::Bar,
            ChartKindArg::Pie => ChartKind::Pie,
        }
    }
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            json_logs: false,
            provider: None,
            command: Commands::Serve { bind: None },
        }
    }
}
