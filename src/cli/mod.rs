mod config;
mod input;

pub use config::{MySqlSection, UploaderConfig};
pub use input::load_records;

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use crate::engine::planner::destination_key;
use crate::engine::types::{BrandGroupId, Context, UploadType, YearMonth};
use crate::nodes::NodeRegistry;
use crate::nodes::builtin::monthly_upload_node::NODE_TYPE;

#[derive(Parser)]
#[command(
    name = "ryze-uploader",
    version,
    about = "Monthly discrepancy uploader"
)]
pub struct Cli {
    /// Path to a .env file to load (default: auto-detect .env in cwd)
    #[arg(long, global = true)]
    dotenv: Option<PathBuf>,

    /// Path to a YAML config file (default: auto-detect ryze-uploader.yaml in cwd)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Arguments of the `run` command.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Input records (.json array, .ndjson/.jsonl or .csv)
    pub input: PathBuf,

    /// Translated or Processed
    #[arg(long)]
    pub upload_type: UploadType,

    /// Scraper script ID
    #[arg(long)]
    pub script_id: String,

    /// Brand identifier (required for Translated)
    #[arg(long)]
    pub io_id: Option<String>,

    /// Override the reporting period (YYYY/MM, default: previous month)
    #[arg(long)]
    pub year_month: Option<String>,

    /// Destination bucket (default: config file, then S3_BUCKET)
    #[arg(long)]
    pub bucket: Option<String>,

    /// Database holding the brand-group tables (default: config file, then BO_DATABASE)
    #[arg(long)]
    pub bo_database: Option<String>,

    /// Resolve and encode, but do not upload
    #[arg(long)]
    pub dry_run: bool,

    /// Log per-brand detail and include debug info in the report
    #[arg(short, long)]
    pub verbose: bool,

    /// Fail when records do not share the first record's fields
    #[arg(long)]
    pub strict_columns: bool,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl RunArgs {
    /// Node config for this run: flags first, then values from the config
    /// file for anything left unset. Environment fallbacks are applied by the
    /// node itself, below both.
    pub fn node_config(&self, config: &UploaderConfig) -> serde_json::Value {
        let mut node_config = serde_json::Map::new();
        node_config.insert("upload_type".into(), self.upload_type.to_string().into());
        node_config.insert("script_id".into(), self.script_id.clone().into());
        node_config.insert("dry_run".into(), self.dry_run.into());
        node_config.insert("verbose".into(), self.verbose.into());
        node_config.insert("strict_columns".into(), self.strict_columns.into());
        for (key, value) in [
            ("io_id", &self.io_id),
            ("year_month", &self.year_month),
            ("bucket", &self.bucket),
            ("bo_database", &self.bo_database),
        ] {
            if let Some(value) = value {
                node_config.insert(key.into(), value.clone().into());
            }
        }

        config.apply_defaults(&mut node_config);
        serde_json::Value::Object(node_config)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Deduplicate a batch, encode per-brand CSVs and upload them
    Run(RunArgs),

    /// Print the destination key for a brand group without any I/O
    Plan {
        #[arg(long)]
        upload_type: UploadType,

        #[arg(long)]
        script_id: String,

        #[arg(long)]
        io_id: String,

        #[arg(long)]
        brand_group_id: String,

        #[arg(long)]
        year_month: Option<String>,
    },

    /// List available nodes
    Nodes,
}

pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Load .env file
    load_dotenv(cli.dotenv.as_deref());

    match cli.command {
        Commands::Run(args) => {
            let config = UploaderConfig::load(cli.config.as_deref())?;
            let node_config = args.node_config(&config);
            cmd_run(args.input, node_config, args.output).await
        }
        Commands::Plan {
            upload_type,
            script_id,
            io_id,
            brand_group_id,
            year_month,
        } => cmd_plan(upload_type, script_id, io_id, brand_group_id, year_month),
        Commands::Nodes => cmd_nodes(),
    }
}

/// Load environment variables from a .env file.
/// If an explicit path is given, load from that path (error if missing).
/// Otherwise, auto-detect .env in the current working directory (silently skip if absent).
fn load_dotenv(explicit_path: Option<&std::path::Path>) {
    match explicit_path {
        Some(path) => match dotenvy::from_path(path) {
            Ok(()) => info!("Loaded env from {}", path.display()),
            Err(e) => {
                eprintln!(
                    "Warning: Failed to load dotenv file '{}': {}",
                    path.display(),
                    e
                );
            }
        },
        None => match dotenvy::dotenv() {
            Ok(path) => info!("Loaded env from {}", path.display()),
            Err(dotenvy::Error::Io(_)) => {}
            Err(e) => {
                eprintln!("Warning: Failed to parse .env file: {}", e);
            }
        },
    }
}

async fn cmd_run(
    input: PathBuf,
    node_config: serde_json::Value,
    output: Option<PathBuf>,
) -> Result<()> {
    let records = load_records(&input)?;
    info!(records = records.len(), input = %input.display(), "Loaded input");

    let registry = NodeRegistry::with_builtins();
    let node = registry
        .get(NODE_TYPE)
        .with_context(|| format!("Unknown node type: {}", NODE_TYPE))?;

    let mut ctx = Context::new();
    ctx.insert(
        "items".to_string(),
        serde_json::Value::Array(records.into_iter().map(serde_json::Value::Object).collect()),
    );

    let result = node.execute(&node_config, ctx).await?;
    let report = result
        .get("report")
        .ok_or_else(|| anyhow::anyhow!("Node produced no report"))?;
    let rendered = serde_json::to_string_pretty(report)?;

    match output {
        Some(path) => {
            std::fs::write(&path, rendered)
                .with_context(|| format!("Failed to write report: {}", path.display()))?;
            println!("Report written to {}", path.display());
        }
        None => println!("{}", rendered),
    }
    Ok(())
}

fn cmd_plan(
    upload_type: UploadType,
    script_id: String,
    io_id: String,
    brand_group_id: String,
    year_month: Option<String>,
) -> Result<()> {
    let year_month = YearMonth::resolve(year_month.as_deref())?;
    let brand_group_id = match brand_group_id.parse::<i64>() {
        Ok(id) => BrandGroupId::Number(id),
        Err(_) => BrandGroupId::Text(brand_group_id),
    };
    println!(
        "{}",
        destination_key(year_month, &brand_group_id, &io_id, &script_id, upload_type)
    );
    Ok(())
}

fn cmd_nodes() -> Result<()> {
    let registry = NodeRegistry::with_builtins();
    let nodes = registry.list();

    println!("{:<24} DESCRIPTION", "NODE TYPE");
    println!("{}", "-".repeat(72));

    for (name, desc) in &nodes {
        println!("{:<24} {}", name, desc);
    }

    println!("\nTotal: {} node(s)", nodes.len());
    Ok(())
}
