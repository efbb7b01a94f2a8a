//! Per-run output directories
//!
//! Every analysis gets `<log_root>/<YYYYmmdd-HHMMSS>-<6 hex>/` holding
//! `input.txt`, `output.txt`, and any charts the agents render.

use crate::chart::list_charts;
use crate::error::{EcoOptimaError, Result};
use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::debug;

const INPUT_FILE: &str = "input.txt";
const OUTPUT_FILE: &str = "output.txt";
const CREATE_ATTEMPTS: usize = 5;

/// A run-scoped output directory
#[derive(Debug, Clone)]
pub struct RunDirectory {
    name: String,
    path: PathBuf,
}

impl RunDirectory {
    /// Create a fresh, uniquely named run directory under `log_root`
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created
    pub fn create(log_root: &Path) -> Result<Self> {
        std::fs::create_dir_all(log_root)?;
        let timestamp = Local::now().format("%Y%m%d-%H%M%S").to_string();

        for _ in 0..CREATE_ATTEMPTS {
            let token = uuid::Uuid::new_v4().simple().to_string();
            let name = format!("{}-{}", timestamp, &token[..6]);
            let path = log_root.join(&name);
            match std::fs::create_dir(&path) {
                Ok(()) => {
                    debug!("Created run directory {}", path.display());
                    return Ok(Self { name, path });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(EcoOptimaError::Io(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("could not allocate a run directory under {}", log_root.display()),
        ))
        .into())
    }

    /// Directory name, relative to the log root
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full directory path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record the user input
    pub fn write_input(&self, text: &str) -> Result<()> {
        std::fs::write(self.path.join(INPUT_FILE), text)?;
        Ok(())
    }

    /// Record the final result
    pub fn write_output(&self, text: &str) -> Result<()> {
        std::fs::write(self.path.join(OUTPUT_FILE), text)?;
        Ok(())
    }

    /// Charts rendered into this run, sorted by file name
    pub fn charts(&self) -> Result<Vec<PathBuf>> {
        list_charts(&self.path)
    }

    /// URL path for a chart file in this run
    pub fn chart_url(&self, chart: &Path) -> Option<String> {
        let file_name = chart.file_name()?.to_str()?;
        Some(format!("/response_log/{}/{}", self.name, file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_names_directory_with_timestamp_and_token() {
        let root = TempDir::new().unwrap();
        let run = RunDirectory::create(root.path()).unwrap();
        assert!(run.path().is_dir());
        let (stamp, token) = run.name().rsplit_once('-').unwrap();
        assert_eq!(stamp.len(), "20250101-120000".len());
        assert_eq!(token.len(), 6);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_concurrent_runs_get_distinct_directories() {
        let root = TempDir::new().unwrap();
        let a = RunDirectory::create(root.path()).unwrap();
        let b = RunDirectory::create(root.path()).unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn test_input_output_and_chart_listing() {
        let root = TempDir::new().unwrap();
        let run = RunDirectory::create(root.path()).unwrap();
        run.write_input("Trees for Over-the-Rhine").unwrap();
        run.write_output("Local ROI Advisor: ...").unwrap();
        std::fs::write(run.path().join("b-chart.svg"), "<svg/>").unwrap();
        std::fs::write(run.path().join("a-chart.svg"), "<svg/>").unwrap();

        assert_eq!(
            std::fs::read_to_string(run.path().join("input.txt")).unwrap(),
            "Trees for Over-the-Rhine"
        );
        let charts = run.charts().unwrap();
        assert_eq!(charts.len(), 2);
        let url = run.chart_url(&charts[0]).unwrap();
        assert_eq!(url, format!("/response_log/{}/a-chart.svg", run.name()));
    }
}
