use anyhow::{Context as _, Result};
use async_trait::async_trait;

use crate::engine::orchestrator::{DEFAULT_BO_DATABASE, DEFAULT_BUCKET};
use crate::engine::types::{Context, IdentifierMode, NodeOutput, Record, UploadType, YearMonth};
use crate::engine::{PipelineOptions, PipelineOrchestrator, PipelineRequest};
use crate::lookup::mysql::{DEFAULT_MYSQL_PORT, MySqlConnector, MySqlCredentials};
use crate::nodes::Node;
use crate::nodes::interpolate::config_str;
use crate::storage::ObjectStore;
use crate::storage::memory_store::MemoryObjectStore;
use crate::storage::s3_store::{
    S3Credentials, S3ObjectStore, S3Settings, parse_bool, parse_bool_env,
};

pub const NODE_TYPE: &str = "ryze_monthly_upload";

/// Boolean flag from config. Strings such as `"true"` or `"0"` (for example
/// from `${ctx.*}` interpolation) are parsed; anything else is `false`.
fn resolve_bool(config: &serde_json::Value, key: &str, ctx: &Context) -> bool {
    match config.get(key) {
        Some(serde_json::Value::Bool(b)) => *b,
        Some(serde_json::Value::String(_)) => config_str(config, key, ctx)
            .and_then(|value| parse_bool(&value))
            .unwrap_or(false),
        _ => false,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Records from `ctx[source_key]`, which must be an array of objects.
fn resolve_records(ctx: &Context, source_key: &str) -> Result<Vec<Record>> {
    let items = ctx
        .get(source_key)
        .ok_or_else(|| anyhow::anyhow!("Key '{}' not found in context", source_key))?
        .as_array()
        .ok_or_else(|| anyhow::anyhow!("Value at '{}' is not an array", source_key))?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            item.as_object().cloned().ok_or_else(|| {
                anyhow::anyhow!("Item {} in '{}' is not an object", index, source_key)
            })
        })
        .collect()
}

/// Validate the node config and collect the batch. Performs no I/O.
pub fn build_request(
    config: &serde_json::Value,
    ctx: &Context,
) -> Result<(PipelineRequest, Vec<Record>)> {
    build_request_with_env(config, ctx, |name| std::env::var(name).ok())
}

/// [`build_request`] with an explicit environment. `bucket` and
/// `bo_database` fall back to `S3_BUCKET` and `BO_DATABASE` when the config
/// leaves them unset, then to the built-in defaults.
pub fn build_request_with_env(
    config: &serde_json::Value,
    ctx: &Context,
    env: impl Fn(&str) -> Option<String>,
) -> Result<(PipelineRequest, Vec<Record>)> {
    let upload_type: UploadType = config_str(config, "upload_type", ctx)
        .ok_or_else(|| anyhow::anyhow!("{} requires 'upload_type'", NODE_TYPE))?
        .parse()?;
    let script_id = non_empty(config_str(config, "script_id", ctx))
        .ok_or_else(|| anyhow::anyhow!("{} requires 'script_id'", NODE_TYPE))?;
    let io_id = config_str(config, "io_id", ctx);
    let year_month = YearMonth::resolve(config_str(config, "year_month", ctx).as_deref())?;

    let source_key = config_str(config, "source_key", ctx).unwrap_or_else(|| "items".to_string());
    let records = resolve_records(ctx, &source_key)?;
    let identifiers = IdentifierMode::for_upload(upload_type, io_id.as_deref(), &records)?;

    let options = PipelineOptions {
        bucket: non_empty(config_str(config, "bucket", ctx))
            .or_else(|| non_empty(env("S3_BUCKET")))
            .unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
        bo_database: non_empty(config_str(config, "bo_database", ctx))
            .or_else(|| non_empty(env("BO_DATABASE")))
            .unwrap_or_else(|| DEFAULT_BO_DATABASE.to_string()),
        dry_run: resolve_bool(config, "dry_run", ctx),
        verbose: resolve_bool(config, "verbose", ctx),
        strict_columns: resolve_bool(config, "strict_columns", ctx),
    };

    Ok((
        PipelineRequest {
            upload_type,
            script_id,
            identifiers,
            year_month,
            options,
        },
        records,
    ))
}

/// MySQL credentials from config (`mysql_host`, `mysql_port`, `mysql_user`,
/// `mysql_password`), each falling back to its `MYSQL_*` env var.
fn resolve_mysql_credentials(
    config: &serde_json::Value,
    ctx: &Context,
) -> Result<MySqlCredentials> {
    let env = |name: &str| std::env::var(name).ok();
    let port = match config.get("mysql_port").and_then(|v| v.as_u64()) {
        Some(port) => u16::try_from(port).context("mysql_port out of range")?,
        None => match env("MYSQL_PORT") {
            Some(port) => port
                .parse()
                .with_context(|| format!("Invalid MYSQL_PORT '{}'", port))?,
            None => DEFAULT_MYSQL_PORT,
        },
    };

    Ok(MySqlCredentials {
        host: config_str(config, "mysql_host", ctx)
            .or_else(|| env("MYSQL_HOST"))
            .unwrap_or_else(|| "localhost".to_string()),
        port,
        user: config_str(config, "mysql_user", ctx)
            .or_else(|| env("MYSQL_USER"))
            .ok_or_else(|| {
                anyhow::anyhow!("{} requires 'mysql_user' or MYSQL_USER env var", NODE_TYPE)
            })?,
        password: config_str(config, "mysql_password", ctx)
            .or_else(|| env("MYSQL_PASSWORD"))
            .unwrap_or_default(),
    })
}

/// S3 settings from config, each falling back to the environment.
fn resolve_s3_settings(config: &serde_json::Value, ctx: &Context) -> S3Settings {
    let mut settings = S3Settings::from_env();
    if let (Some(access_key_id), Some(secret_access_key)) = (
        config_str(config, "access_key_id", ctx),
        config_str(config, "secret_access_key", ctx),
    ) {
        settings.credentials = Some(S3Credentials {
            access_key_id,
            secret_access_key,
        });
    }
    if let Some(region) = config_str(config, "region", ctx) {
        settings.region = Some(region);
    }
    if let Some(endpoint) = config_str(config, "endpoint_url", ctx) {
        settings.endpoint_url = Some(endpoint);
    }
    settings.force_path_style = config
        .get("force_path_style")
        .and_then(|v| v.as_bool())
        .or_else(|| parse_bool_env("AWS_S3_FORCE_PATH_STYLE"))
        .unwrap_or(false);
    settings
}

/// Deduplicates a batch per brand group, encodes CSVs and publishes them to
/// S3, returning the execution report under `output_key`.
pub struct MonthlyUploadNode;

#[async_trait]
impl Node for MonthlyUploadNode {
    fn node_type(&self) -> &str {
        NODE_TYPE
    }

    fn description(&self) -> &str {
        "Upload monthly data to S3 for discrepancy analysis, one CSV per brand group"
    }

    async fn execute(&self, config: &serde_json::Value, ctx: Context) -> Result<NodeOutput> {
        let (request, records) = build_request(config, &ctx)?;
        let output_key =
            config_str(config, "output_key", &ctx).unwrap_or_else(|| "report".to_string());

        let lookup = MySqlConnector::new(resolve_mysql_credentials(config, &ctx)?);
        // Dry runs never write, so no S3 client is built for them.
        let store: Box<dyn ObjectStore> = if request.options.dry_run {
            Box::new(MemoryObjectStore::new())
        } else {
            Box::new(S3ObjectStore::connect(&resolve_s3_settings(config, &ctx)).await?)
        };

        let report = PipelineOrchestrator::new(&lookup, store.as_ref())
            .run(&request, &records)
            .await?;

        let mut output = NodeOutput::new();
        output.insert(output_key.clone(), serde_json::to_value(&report)?);
        output.insert(
            format!("{}_success", output_key),
            serde_json::Value::Bool(true),
        );
        Ok(output)
    }
}
