use std::borrow::Cow;

use crate::engine::types::{Record, normalize_number, normalize_value};
use crate::error::UploaderError;

/// Render records as CSV text.
///
/// The header is the first record's field names in their natural order. Every
/// following line holds that record's own values in its own field order;
/// records are assumed to share one field layout. Empty input yields an empty
/// string, and no trailing newline is written.
pub fn encode(records: &[Record]) -> String {
    let Some(first) = records.first() else {
        return String::new();
    };

    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(first.keys().map(String::as_str).collect::<Vec<_>>().join(","));
    for record in records {
        let fields: Vec<Cow<'_, str>> = record.values().map(render_value).collect();
        lines.push(fields.join(","));
    }
    lines.join("\n")
}

/// Like [`encode`], but rejects records whose field set differs from the
/// first record's instead of emitting misaligned rows.
pub fn encode_strict(identifier: &str, records: &[Record]) -> Result<String, UploaderError> {
    if let Some(first) = records.first() {
        let expected: Vec<&String> = first.keys().collect();
        for (index, record) in records.iter().enumerate().skip(1) {
            let found: Vec<&String> = record.keys().collect();
            if found != expected {
                return Err(UploaderError::NonUniformRecords {
                    identifier: identifier.to_string(),
                    index,
                    expected: join_names(&expected),
                    found: join_names(&found),
                });
            }
        }
    }
    Ok(encode(records))
}

fn join_names(names: &[&String]) -> String {
    names
        .iter()
        .map(|name| name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_value(value: &serde_json::Value) -> Cow<'_, str> {
    match value {
        serde_json::Value::String(s) => escape_field(s),
        serde_json::Value::Null => Cow::Borrowed(""),
        serde_json::Value::Bool(b) => Cow::Owned(b.to_string()),
        serde_json::Value::Number(n) => Cow::Owned(normalize_number(n).to_string()),
        // Nested values are written as compact JSON and quoted like strings.
        nested => Cow::Owned(escape_field(&normalize_value(nested).to_string()).into_owned()),
    }
}

/// Quote a field when it contains a comma, a double quote or a newline.
pub fn escape_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// Encoded size in kilobytes, rounded to two decimals.
pub fn size_kb(csv: &str) -> f64 {
    (csv.len() as f64 / 1024.0 * 100.0).round() / 100.0
}
