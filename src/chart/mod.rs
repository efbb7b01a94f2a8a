//! Chart rendering for tree metrics
//!
//! Turns a list of `(label, value)` entries supplied by an agent (or a CLI
//! user) into an SVG bar or pie chart on disk. All validation happens before
//! any file I/O so a rejected request never leaves a partial artifact.
//!
//! Rendering pipeline, shared by both chart kinds:
//!
//! 1. Resolve a label per entry from `label`, `name`, or `tree`
//! 2. Coerce each value to `f64` (numbers as-is, strings by pattern match)
//! 3. Stable sort, descending by value
//! 4. Apply the optional top-N cutoff (bars truncate, pies fold into "Other")
//! 5. Write `<slug>-<YYYYmmdd-HHMMSS>.svg` into the output directory

pub mod svg;
pub mod tool;

use crate::error::{EcoOptimaError, Result};
use chrono::{DateTime, Local};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info};

pub use tool::{PlotBarChartTool, PlotPieChartTool};

/// Keys accepted for an entry's label, in priority order
pub const LABEL_KEYS: [&str; 3] = ["label", "name", "tree"];

/// Environment variable naming the active run's artifact directory
pub const LOG_DIR_ENV: &str = "ECOOPTIMA_LOG_DIR";

/// Directory used when neither an explicit directory nor the env var is set
pub const DEFAULT_OUTPUT_DIR: &str = "response_log";

/// Label of the synthetic pie slice holding everything past the cutoff
pub const OTHER_LABEL: &str = "Other";

const FALLBACK_SLUG: &str = "tree-chart";
const CHART_EXTENSION: &str = "svg";

/// Bar chart orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Categories on the vertical axis, highest value on top
    #[default]
    Horizontal,
    /// Categories on the horizontal axis, labels rotated
    Vertical,
}

/// Kind of chart to render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    /// Bar chart
    Bar,
    /// Pie chart
    Pie,
}

/// A request to chart one metric across a set of labelled entries
///
/// Entries are kept as raw JSON objects because agents name the label
/// field inconsistently and often send values such as `"12.5 meters"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartRequest {
    /// Ordered `(label, value)` entries
    pub series: Vec<Value>,
    /// Name of the metric being charted (e.g. "Height")
    pub metric_name: String,
    /// Optional chart title; defaults to "<metric_name> for selected trees"
    #[serde(default)]
    pub title: Option<String>,
    /// Optional number of top entries to keep
    #[serde(default)]
    pub top_n: Option<usize>,
    /// Bar orientation (ignored for pie charts); `null` means the default
    #[serde(default)]
    pub orientation: Option<Orientation>,
}

impl ChartRequest {
    /// Title used for the chart and its filename
    pub fn effective_title(&self) -> String {
        match self.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => format!("{} for selected trees", self.metric_name),
        }
    }

    /// Requested bar orientation, horizontal unless set
    pub fn orientation(&self) -> Orientation {
        self.orientation.unwrap_or_default()
    }
}

/// A validated chart entry
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPoint {
    /// Category label
    pub label: String,
    /// Numeric value
    pub value: f64,
}

impl SeriesPoint {
    /// Create a new point
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

fn numeric_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("numeric pattern is valid"))
}

fn slug_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^a-zA-Z0-9]+").expect("slug pattern is valid"))
}

/// Extract the first signed decimal number embedded in a string
///
/// # Examples
///
/// ```
/// use ecooptima::chart::coerce_numeric_str;
///
/// assert_eq!(coerce_numeric_str("12.5 meters").unwrap(), 12.5);
/// assert_eq!(coerce_numeric_str("-3 units").unwrap(), -3.0);
/// assert!(coerce_numeric_str("no number here").is_err());
/// ```
pub fn coerce_numeric_str(raw: &str) -> std::result::Result<f64, EcoOptimaError> {
    numeric_pattern()
        .find(raw)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .ok_or_else(|| EcoOptimaError::NonNumericValue(raw.to_string()))
}

/// Coerce a JSON value to `f64`
///
/// Numbers are used as-is; strings go through [`coerce_numeric_str`].
/// Anything else is rejected.
pub fn coerce_numeric(raw: &Value) -> std::result::Result<f64, EcoOptimaError> {
    match raw {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| EcoOptimaError::NonNumericValue(n.to_string())),
        Value::String(s) => coerce_numeric_str(s),
        other => Err(EcoOptimaError::NonNumericValue(other.to_string())),
    }
}

fn resolve_label(entry: &Value, index: usize) -> std::result::Result<String, EcoOptimaError> {
    LABEL_KEYS
        .iter()
        .filter_map(|key| entry.get(*key))
        .find_map(|value| match value {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .ok_or(EcoOptimaError::MissingLabel { index })
}

/// Resolve labels and values, then sort descending by value
///
/// The sort is stable: entries with equal values keep their input order.
///
/// # Errors
///
/// `EmptySeries` for an empty input, `MissingLabel` or `NonNumericValue`
/// for the first entry that cannot be resolved.
pub fn clean_series(series: &[Value]) -> std::result::Result<Vec<SeriesPoint>, EcoOptimaError> {
    if series.is_empty() {
        return Err(EcoOptimaError::EmptySeries);
    }

    let mut points = series
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let label = resolve_label(entry, index)?;
            let value = coerce_numeric(entry.get("value").unwrap_or(&Value::Null))?;
            Ok(SeriesPoint::new(label, value))
        })
        .collect::<std::result::Result<Vec<_>, EcoOptimaError>>()?;

    points.sort_by(|a, b| b.value.total_cmp(&a.value));
    Ok(points)
}

/// Keep only the first `top_n` points (bar charts)
///
/// A cutoff of zero is treated as "no cutoff".
pub fn truncate_top_n(mut points: Vec<SeriesPoint>, top_n: Option<usize>) -> Vec<SeriesPoint> {
    if let Some(n) = top_n.filter(|n| *n > 0) {
        points.truncate(n);
    }
    points
}

/// Keep the first `top_n - 1` points and fold the rest into "Other" (pie charts)
///
/// Only applies when the series is longer than `top_n`.
pub fn collapse_into_other(points: Vec<SeriesPoint>, top_n: Option<usize>) -> Vec<SeriesPoint> {
    match top_n.filter(|n| *n > 0) {
        Some(n) if points.len() > n => {
            let mut kept = points;
            let rest = kept.split_off(n - 1);
            let other: f64 = rest.iter().map(|p| p.value).sum();
            kept.push(SeriesPoint::new(OTHER_LABEL, other));
            kept
        }
        _ => points,
    }
}

/// Filesystem-safe slug of a chart title
///
/// # Examples
///
/// ```
/// use ecooptima::chart::slugify_title;
///
/// assert_eq!(slugify_title("Tree Height Comparison"), "tree-height-comparison");
/// assert_eq!(slugify_title("!!!"), "tree-chart");
/// ```
pub fn slugify_title(title: &str) -> String {
    let slug = slug_pattern()
        .replace_all(title, "-")
        .trim_matches('-')
        .to_lowercase();
    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

/// Two-decimal value label with trailing zeros and point stripped
///
/// # Examples
///
/// ```
/// use ecooptima::chart::format_value;
///
/// assert_eq!(format_value(12.0), "12");
/// assert_eq!(format_value(12.5), "12.5");
/// assert_eq!(format_value(3.14159), "3.14");
/// ```
pub fn format_value(value: f64) -> String {
    let formatted = format!("{:.2}", value);
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

/// Directory charts are written to when the caller has no run directory
///
/// Uses `ECOOPTIMA_LOG_DIR` when set, else `response_log`.
pub fn resolve_output_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(dir) = explicit {
        return dir.to_path_buf();
    }
    std::env::var(LOG_DIR_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
}

/// Write `document` to a new chart file named after `title` and `now`
///
/// Files are created exclusively. Same-second renders of the same title,
/// including concurrent ones, get a numeric suffix instead of overwriting
/// each other.
pub fn create_chart_file(
    dir: &Path,
    title: &str,
    now: DateTime<Local>,
    document: &str,
) -> Result<PathBuf> {
    let stem = format!("{}-{}", slugify_title(title), now.format("%Y%m%d-%H%M%S"));
    let mut attempt = 1;
    loop {
        let path = match attempt {
            1 => dir.join(format!("{}.{}", stem, CHART_EXTENSION)),
            n => dir.join(format!("{}-{}.{}", stem, n, CHART_EXTENSION)),
        };
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all(document.as_bytes())?;
                return Ok(path);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(e.into()),
        }
    }
}

/// Whether a path looks like a rendered chart
pub fn is_chart_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(CHART_EXTENSION))
        .unwrap_or(false)
}

/// List rendered charts in a directory, sorted by file name
pub fn list_charts(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut charts = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && is_chart_file(path))
        .collect::<Vec<_>>();
    charts.sort();
    Ok(charts)
}

fn write_chart(dir: &Path, title: &str, document: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = create_chart_file(dir, title, Local::now(), document)?;
    let resolved = std::fs::canonicalize(&path)?;
    info!("Chart saved to {}", resolved.display());
    Ok(resolved)
}

/// Render a bar chart and return the absolute path of the written file
///
/// # Errors
///
/// Chart validation errors (before any file is written) or I/O errors.
pub fn render_bar_chart(request: &ChartRequest, output_dir: Option<&Path>) -> Result<PathBuf> {
    let points = truncate_top_n(clean_series(&request.series)?, request.top_n);
    let title = request.effective_title();
    debug!(
        "Rendering {:?} bar chart '{}' with {} entries",
        request.orientation(),
        title,
        points.len()
    );

    let document = svg::bar_chart(&points, &request.metric_name, &title, request.orientation());
    write_chart(&resolve_output_dir(output_dir), &title, &document)
}

/// Render a pie chart and return the absolute path of the written file
///
/// # Errors
///
/// Chart validation errors (before any file is written) or I/O errors.
pub fn render_pie_chart(request: &ChartRequest, output_dir: Option<&Path>) -> Result<PathBuf> {
    let points = collapse_into_other(clean_series(&request.series)?, request.top_n);
    if let Some(negative) = points.iter().find(|p| p.value < 0.0) {
        return Err(EcoOptimaError::NegativePieValue {
            label: negative.label.clone(),
            value: negative.value,
        }
        .into());
    }
    let title = request.effective_title();
    debug!("Rendering pie chart '{}' with {} slices", title, points.len());

    let document = svg::pie_chart(&points, &title);
    write_chart(&resolve_output_dir(output_dir), &title, &document)
}

/// Render a chart of the given kind
pub fn render_chart(
    kind: ChartKind,
    request: &ChartRequest,
    output_dir: Option<&Path>,
) -> Result<PathBuf> {
    match kind {
        ChartKind::Bar => render_bar_chart(request, output_dir),
        ChartKind::Pie => render_pie_chart(request, output_dir),
    }
}
