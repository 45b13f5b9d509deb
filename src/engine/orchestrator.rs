use std::time::Instant;

use chrono::{SecondsFormat, Utc};
use tracing::{debug, info};

use crate::engine::csv_encoder;
use crate::engine::dedup::dedup;
use crate::engine::planner::{UploadPlanner, destination_key};
use crate::engine::report::{
    DebugInfo, EXECUTION_MODE, ExecutionInfo, ExecutionReport, Metrics, Totals, UploadOutcome,
};
use crate::engine::resolver::resolve_all;
use crate::engine::types::{IdentifierMode, Record, UploadType, YearMonth};
use crate::error::UploaderError;
use crate::lookup::LookupConnector;
use crate::storage::ObjectStore;

pub const DEFAULT_BUCKET: &str = "ryze-data-brand-performance";
pub const DEFAULT_BO_DATABASE: &str = "bo";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    pub bucket: String,
    pub bo_database: String,
    pub dry_run: bool,
    pub verbose: bool,
    /// Reject batches whose records do not share the first record's fields.
    pub strict_columns: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_BUCKET.to_string(),
            bo_database: DEFAULT_BO_DATABASE.to_string(),
            dry_run: false,
            verbose: false,
            strict_columns: false,
        }
    }
}

/// Parameters for one invocation.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub upload_type: UploadType,
    pub script_id: String,
    pub identifiers: IdentifierMode,
    pub year_month: YearMonth,
    pub options: PipelineOptions,
}

/// Runs resolution, dedup, encoding and upload for every identifier of a
/// batch, one identifier at a time.
pub struct PipelineOrchestrator<'a> {
    lookup: &'a dyn LookupConnector,
    store: &'a dyn ObjectStore,
}

impl<'a> PipelineOrchestrator<'a> {
    pub fn new(lookup: &'a dyn LookupConnector, store: &'a dyn ObjectStore) -> Self {
        Self { lookup, store }
    }

    /// Process `records` and build the report. Returns an error on a failed
    /// database connect or a failed upload; outcomes gathered before a failed
    /// upload are discarded.
    pub async fn run(
        &self,
        request: &PipelineRequest,
        records: &[Record],
    ) -> Result<ExecutionReport, UploaderError> {
        let start = Instant::now();
        let options = &request.options;
        let identifiers = request.identifiers.identifiers();

        info!(
            upload_type = %request.upload_type,
            script_id = %request.script_id,
            mode = request.identifiers.label(),
            identifiers = identifiers.len(),
            records = records.len(),
            year_month = %request.year_month,
            dry_run = options.dry_run,
            "Starting monthly upload"
        );

        let resolutions = resolve_all(self.lookup, &options.bo_database, identifiers).await?;

        let planner = UploadPlanner::new(self.store, &options.bucket, options.dry_run);
        let mut uploads = Vec::with_capacity(identifiers.len());
        let mut totals = Totals::default();
        let processing_start = Instant::now();

        for identifier in identifiers {
            let brand_group = resolutions.brand_group(identifier);
            let selected = request.identifiers.select(identifier, records);
            let rows_input = selected.len();

            let deduped = dedup(selected);
            let csv = if options.strict_columns {
                csv_encoder::encode_strict(identifier, &deduped.unique)?
            } else {
                csv_encoder::encode(&deduped.unique)
            };
            let size_kb = csv_encoder::size_kb(&csv);

            if options.verbose {
                info!(
                    io_id = %identifier,
                    brand_group_id = %brand_group.id,
                    rows_input,
                    rows_after_dedup = deduped.unique.len(),
                    duplicates_removed = deduped.duplicates_removed,
                    size_kb,
                    "Prepared CSV"
                );
            } else {
                debug!(io_id = %identifier, rows_input, size_kb, "Prepared CSV");
            }

            let key = destination_key(
                request.year_month,
                &brand_group.id,
                identifier,
                &request.script_id,
                request.upload_type,
            );

            let mut outcome = UploadOutcome {
                upload_type: request.upload_type,
                io_id: identifier.clone(),
                script_id: request.script_id.clone(),
                brand_group_id: brand_group.id,
                brand_group_name: brand_group.name,
                path: None,
                would_upload_to: None,
                s3_url: None,
                console_url: None,
                rows_input,
                rows_after_dedup: deduped.unique.len(),
                duplicates_removed: deduped.duplicates_removed,
                size_kb,
                upload_duration_ms: None,
                upload_success: false,
                dry_run: None,
            };
            outcome.apply(planner.place(key, csv).await?);

            totals.add(&outcome);
            uploads.push(outcome);
        }

        let processing_ms = processing_start.elapsed().as_millis() as u64;
        let brand_group_errors: serde_json::Map<String, serde_json::Value> = resolutions
            .errors()
            .map(|(id, reason)| (id.to_string(), reason.into()))
            .collect();
        let summary = totals.summary(&uploads, identifiers.len(), options.dry_run);

        info!(
            brands = identifiers.len(),
            files_created = summary.files_created,
            unresolved = brand_group_errors.len(),
            "Monthly upload complete"
        );

        Ok(ExecutionReport {
            execution: ExecutionInfo {
                mode: EXECUTION_MODE.to_string(),
                upload_type: request.upload_type,
                script_id: request.script_id.clone(),
                timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                duration_ms: start.elapsed().as_millis() as u64,
                year_month: request.year_month.to_string(),
                dry_run: options.dry_run.then_some(true),
            },
            summary,
            uploads,
            metrics: Metrics {
                mysql_queries_ms: resolutions.duration.as_millis() as u64,
                deduplication_ms: processing_ms,
                s3_upload_total_ms: (totals.upload_ms > 0).then_some(totals.upload_ms),
            },
            brand_group_errors,
            debug: options.verbose.then(|| DebugInfo {
                identifier_mode: request.identifiers.label().to_string(),
                identifiers: identifiers.to_vec(),
                bucket: options.bucket.clone(),
                bo_database: options.bo_database.clone(),
                input_records: records.len(),
                strict_columns: options.strict_columns,
            }),
        })
    }
}
