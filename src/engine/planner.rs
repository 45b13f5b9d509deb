use std::time::Instant;

use tracing::info;

use crate::engine::types::{BrandGroupId, UploadType, YearMonth};
use crate::error::UploaderError;
use crate::storage::ObjectStore;

pub const KEY_PREFIX: &str = "AutomationDiscrepancy";
pub const CSV_CONTENT_TYPE: &str = "text/csv";

/// Destination key for one brand group's CSV:
/// `AutomationDiscrepancy/<year>/<month>/<brand_group_id>/<identifier>_<script_id>_<upload_type>.csv`.
pub fn destination_key(
    year_month: YearMonth,
    brand_group_id: &BrandGroupId,
    identifier: &str,
    script_id: &str,
    upload_type: UploadType,
) -> String {
    format!(
        "{}/{}/{}/{}/{}_{}_{}.csv",
        KEY_PREFIX,
        year_month.year_str(),
        year_month.month_str(),
        brand_group_id,
        identifier,
        script_id,
        upload_type
    )
}

pub fn s3_url(bucket: &str, key: &str) -> String {
    format!("s3://{}/{}", bucket, key)
}

pub fn console_url(bucket: &str, key: &str) -> String {
    format!(
        "https://s3.console.aws.amazon.com/s3/object/{}?prefix={}",
        bucket, key
    )
}

/// Where a CSV ended up, or would have.
#[derive(Debug, Clone, PartialEq)]
pub enum Placement {
    Simulated {
        would_upload_to: String,
    },
    Uploaded {
        path: String,
        s3_url: String,
        console_url: String,
        duration_ms: u64,
    },
}

/// Sends encoded CSVs to the store, or only records the key in dry-run mode.
pub struct UploadPlanner<'a> {
    store: &'a dyn ObjectStore,
    bucket: &'a str,
    dry_run: bool,
}

impl<'a> UploadPlanner<'a> {
    pub fn new(store: &'a dyn ObjectStore, bucket: &'a str, dry_run: bool) -> Self {
        Self {
            store,
            bucket,
            dry_run,
        }
    }

    /// Place `csv` at `key`. A failed write is fatal for the invocation.
    pub async fn place(&self, key: String, csv: String) -> Result<Placement, UploaderError> {
        if self.dry_run {
            info!(key = %key, "Dry run, skipping upload");
            return Ok(Placement::Simulated {
                would_upload_to: key,
            });
        }

        let start = Instant::now();
        self.store
            .put_object(self.bucket, &key, csv.into_bytes(), CSV_CONTENT_TYPE)
            .await
            .map_err(|e| UploaderError::Write {
                key: key.clone(),
                message: format!("{:#}", e),
            })?;
        let duration_ms = start.elapsed().as_millis() as u64;

        info!(bucket = %self.bucket, key = %key, duration_ms, "Uploaded CSV");
        Ok(Placement::Uploaded {
            s3_url: s3_url(self.bucket, &key),
            console_url: console_url(self.bucket, &key),
            path: key,
            duration_ms,
        })
    }
}
