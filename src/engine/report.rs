use serde::{Deserialize, Serialize};

use crate::engine::planner::Placement;
use crate::engine::types::{BrandGroupId, UploadType};

pub const EXECUTION_MODE: &str = "monthly";
pub const DRY_RUN_STATUS: &str = "DRY_RUN_SKIPPED";

/// Result for one identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadOutcome {
    #[serde(rename = "type")]
    pub upload_type: UploadType,
    pub io_id: String,
    pub script_id: String,
    pub brand_group_id: BrandGroupId,
    pub brand_group_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub would_upload_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub console_url: Option<String>,
    pub rows_input: usize,
    pub rows_after_dedup: usize,
    pub duplicates_removed: usize,
    pub size_kb: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_duration_ms: Option<u64>,
    pub upload_success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,
}

impl UploadOutcome {
    pub fn apply(&mut self, placement: Placement) {
        match placement {
            Placement::Simulated { would_upload_to } => {
                self.would_upload_to = Some(would_upload_to);
                self.upload_success = false;
                self.dry_run = Some(true);
            }
            Placement::Uploaded {
                path,
                s3_url,
                console_url,
                duration_ms,
            } => {
                self.path = Some(path);
                self.s3_url = Some(s3_url);
                self.console_url = Some(console_url);
                self.upload_duration_ms = Some(duration_ms);
                self.upload_success = true;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionInfo {
    pub mode: String,
    pub upload_type: UploadType,
    pub script_id: String,
    pub timestamp: String,
    pub duration_ms: u64,
    pub year_month: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub files_created: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub would_create_files: Option<usize>,
    pub total_rows_input: usize,
    pub total_rows_after_dedup: usize,
    pub total_duplicates_removed: usize,
    pub total_size_kb: f64,
    pub brands_processed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub mysql_queries_ms: u64,
    pub deduplication_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3_upload_total_ms: Option<u64>,
}

/// Extra detail included when verbose logging is on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugInfo {
    pub identifier_mode: String,
    pub identifiers: Vec<String>,
    pub bucket: String,
    pub bo_database: String,
    pub input_records: usize,
    pub strict_columns: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub execution: ExecutionInfo,
    pub summary: Summary,
    pub uploads: Vec<UploadOutcome>,
    pub metrics: Metrics,
    /// Failure reason per unresolved identifier, in identifier order.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub brand_group_errors: serde_json::Map<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugInfo>,
}

/// Running totals across identifiers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Totals {
    pub rows_input: usize,
    pub rows_after_dedup: usize,
    pub duplicates_removed: usize,
    pub size_kb: f64,
    pub upload_ms: u64,
}

impl Totals {
    pub fn add(&mut self, outcome: &UploadOutcome) {
        self.rows_input += outcome.rows_input;
        self.rows_after_dedup += outcome.rows_after_dedup;
        self.duplicates_removed += outcome.duplicates_removed;
        self.size_kb += outcome.size_kb;
        self.upload_ms += outcome.upload_duration_ms.unwrap_or(0);
    }

    pub fn summary(&self, uploads: &[UploadOutcome], brands: usize, dry_run: bool) -> Summary {
        Summary {
            files_created: if dry_run {
                0
            } else {
                uploads.iter().filter(|u| u.upload_success).count()
            },
            would_create_files: dry_run.then_some(brands),
            total_rows_input: self.rows_input,
            total_rows_after_dedup: self.rows_after_dedup,
            total_duplicates_removed: self.duplicates_removed,
            total_size_kb: self.size_kb,
            brands_processed: brands,
            status: dry_run.then(|| DRY_RUN_STATUS.to_string()),
        }
    }
}
