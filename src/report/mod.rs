//! Report generation over the integrated dataset.

pub mod generator;
pub mod insights;

pub use generator::{generate_csv_table, generate_json_report, generate_markdown_report};
pub use insights::{Insights, UserFilter};

use crate::models::CleaningReport;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Metadata about a report run.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    /// Date and time the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Where each table was read from.
    pub users_source: String,
    pub friendships_source: String,
    pub posts_source: String,
    pub reactions_source: String,
    /// Wall-clock time spent loading and building, in seconds.
    pub duration_seconds: f64,
}

/// The complete report.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub cleaning: CleaningReport,
    pub insights: Insights,
}
