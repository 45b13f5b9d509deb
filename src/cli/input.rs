use std::path::Path;

use anyhow::{Context as _, Result};

use crate::engine::types::Record;

/// Load input records from a file. `.csv` files are read with a header row
/// (every value becomes a string), `.ndjson`/`.jsonl` hold one object per
/// line, anything else must be a JSON array of objects.
pub fn load_records(path: &Path) -> Result<Vec<Record>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "csv" => load_csv(path),
        "ndjson" | "jsonl" => {
            let contents = read(path)?;
            contents
                .lines()
                .enumerate()
                .filter(|(_, line)| !line.trim().is_empty())
                .map(|(n, line)| {
                    serde_json::from_str::<Record>(line)
                        .with_context(|| format!("Invalid JSON object on line {}", n + 1))
                })
                .collect()
        }
        _ => {
            let contents = read(path)?;
            serde_json::from_str::<Vec<Record>>(&contents).with_context(|| {
                format!("Expected a JSON array of objects in {}", path.display())
            })
        }
    }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file: {}", path.display()))
}

fn load_csv(path: &Path) -> Result<Vec<Record>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open CSV input: {}", path.display()))?;
    let headers = reader.headers()?.clone();

    let mut records = Vec::new();
    for (n, row) in reader.records().enumerate() {
        let row = row.with_context(|| format!("Invalid CSV row {}", n + 1))?;
        let record: Record = headers
            .iter()
            .zip(row.iter())
            .map(|(name, value)| (name.to_string(), serde_json::Value::String(value.to_string())))
            .collect();
        records.push(record);
    }
    Ok(records)
}
