//! Tests for the host-facing node: registration and config validation.
//! Everything here fails or succeeds before any network I/O.

use ryze_uploader::engine::types::{Context, IdentifierMode, UploadType};
use ryze_uploader::nodes::NodeRegistry;
use ryze_uploader::nodes::builtin::monthly_upload_node::{NODE_TYPE, build_request};
use serde_json::json;

fn ctx_with_items(items: serde_json::Value) -> Context {
    let mut ctx = Context::new();
    ctx.insert("items".to_string(), items);
    ctx
}

#[test]
fn node_is_registered() {
    let reg = NodeRegistry::with_builtins();
    let node = reg.get(NODE_TYPE).expect("node registered");
    assert_eq!(node.node_type(), "ryze_monthly_upload");
    assert_eq!(reg.list().len(), 1);
}

#[tokio::test]
async fn requires_script_id() {
    let node = NodeRegistry::with_builtins().get(NODE_TYPE).unwrap();
    let config = json!({"upload_type": "Translated", "io_id": "abc"});

    let err = node
        .execute(&config, ctx_with_items(json!([])))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("requires 'script_id'"));
}

#[tokio::test]
async fn rejects_unknown_upload_type() {
    let node = NodeRegistry::with_builtins().get(NODE_TYPE).unwrap();
    let config = json!({"upload_type": "translated", "script_id": "1"});

    let err = node
        .execute(&config, ctx_with_items(json!([])))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Invalid upload type 'translated'"));
}

#[tokio::test]
async fn translated_without_io_id_fails_before_io() {
    let node = NodeRegistry::with_builtins().get(NODE_TYPE).unwrap();
    let config = json!({"upload_type": "Translated", "script_id": "1", "io_id": "  "});

    let err = node
        .execute(&config, ctx_with_items(json!([{"a": 1}])))
        .await
        .unwrap_err();
    assert!(err.to_string().starts_with("No IO IDs found."));
}

#[tokio::test]
async fn processed_without_io_id_field_fails_before_io() {
    let node = NodeRegistry::with_builtins().get(NODE_TYPE).unwrap();
    let config = json!({"upload_type": "Processed", "script_id": "1"});

    let err = node
        .execute(&config, ctx_with_items(json!([{"a": 1}, {"io_id": ""}])))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("ensure data contains io_id field"));
}

#[tokio::test]
async fn rejects_bad_year_month() {
    let node = NodeRegistry::with_builtins().get(NODE_TYPE).unwrap();
    let config = json!({
        "upload_type": "Translated",
        "script_id": "1",
        "io_id": "abc",
        "year_month": "11/2025"
    });

    let err = node
        .execute(&config, ctx_with_items(json!([])))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Invalid year/month override"));
}

#[test]
fn items_must_be_objects() {
    let config = json!({"upload_type": "Processed", "script_id": "1"});
    let err = build_request(&config, &ctx_with_items(json!([{"io_id": "a"}, 5]))).unwrap_err();
    assert!(err.to_string().contains("Item 1 in 'items' is not an object"));
}

#[test]
fn missing_source_key_is_reported() {
    let config = json!({"upload_type": "Processed", "script_id": "1", "source_key": "rows"});
    let err = build_request(&config, &ctx_with_items(json!([]))).unwrap_err();
    assert!(err.to_string().contains("Key 'rows' not found in context"));
}

#[test]
fn builds_request_with_interpolation_and_defaults() {
    let mut ctx = ctx_with_items(json!([{"v": 1}, {"v": 2}]));
    ctx.insert("brand".to_string(), json!({"io_id": "eab7e510"}));
    let config = json!({
        "upload_type": "Translated",
        "script_id": 3000,
        "io_id": "${ctx.brand.io_id}",
        "year_month": "2025/11",
        "bucket": "custom-bucket",
        "dry_run": true
    });

    let (request, records) = build_request(&config, &ctx).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(request.upload_type, UploadType::Translated);
    assert_eq!(request.script_id, "3000");
    assert_eq!(
        request.identifiers,
        IdentifierMode::Explicit("eab7e510".to_string())
    );
    assert_eq!(request.year_month.to_string(), "2025/11");
    assert_eq!(request.options.bucket, "custom-bucket");
    assert_eq!(request.options.bo_database, "bo");
    assert!(request.options.dry_run);
    assert!(!request.options.verbose);
    assert!(!request.options.strict_columns);
}

#[test]
fn processed_discovers_identifiers_in_order() {
    let ctx = ctx_with_items(json!([
        {"io_id": "b"},
        {"io_id": "a"},
        {"io_id": "b"},
        {"io_id": 17},
        {"other": true}
    ]));
    let config = json!({"upload_type": "Processed", "script_id": "1", "io_id": "ignored"});

    let (request, _) = build_request(&config, &ctx).unwrap();
    assert_eq!(
        request.identifiers,
        IdentifierMode::Discovered(vec!["b".into(), "a".into(), "17".into()])
    );
}

#[test]
fn string_flags_are_parsed() {
    let mut ctx = ctx_with_items(json!([{"v": 1}]));
    ctx.insert("flags".to_string(), json!({"dry": "true", "verbose": "off"}));
    let config = json!({
        "upload_type": "Translated",
        "script_id": "3000",
        "io_id": "eab7e510",
        "dry_run": "${ctx.flags.dry}",
        "verbose": "${ctx.flags.verbose}",
        "strict_columns": "YES"
    });

    let (request, _) = build_request(&config, &ctx).unwrap();
    assert!(request.options.dry_run);
    assert!(!request.options.verbose);
    assert!(request.options.strict_columns);
}

#[test]
fn unparseable_flag_is_false() {
    let config = json!({
        "upload_type": "Translated",
        "script_id": "3000",
        "io_id": "eab7e510",
        "dry_run": "maybe"
    });
    let (request, _) = build_request(&config, &ctx_with_items(json!([]))).unwrap();
    assert!(!request.options.dry_run);
}
