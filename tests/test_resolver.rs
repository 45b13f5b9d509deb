//! Tests for brand-group resolution.

mod common;

use common::{FakeLookup, Reply, group_row};
use ryze_uploader::engine::resolver::{Resolution, lookup_sql, resolve, resolve_all};
use ryze_uploader::engine::types::{BrandGroup, BrandGroupId, NOT_FOUND_BRAND_GROUP_ID};
use ryze_uploader::error::UploaderError;
use ryze_uploader::lookup::LookupConnector;
use serde_json::json;

#[test]
fn lookup_sql_is_scoped_to_database() {
    let sql = lookup_sql("bo_staging");
    assert!(sql.contains("FROM bo_staging.out_brands AS b"));
    assert!(sql.contains("LEFT JOIN bo_staging.brands_groups AS bg ON b.brands_group_id = bg.id"));
    assert!(sql.contains("WHERE b.mongodb_id = ?"));
    assert!(sql.ends_with("LIMIT 1"));
}

#[tokio::test]
async fn resolves_first_row_with_trimmed_identifier() {
    let lookup = FakeLookup::new().with_group("abc", json!(42), "Acme");
    let mut session = lookup.connect("bo").await.unwrap();

    let resolution = resolve(session.as_mut(), "  abc \n", "bo").await;
    assert_eq!(
        resolution,
        Resolution::Resolved(BrandGroup {
            id: BrandGroupId::Number(42),
            name: "Acme".into()
        })
    );
    assert_eq!(resolution.reason(), None);

    let queries = lookup.queries();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].0, lookup_sql("bo"));
    assert_eq!(queries[0].1, vec!["abc".to_string()]);
}

#[tokio::test]
async fn extra_rows_are_ignored() {
    let lookup = FakeLookup::new().with_reply(
        "abc",
        Reply::Rows(vec![group_row(json!(7), "First"), group_row(json!(8), "Second")]),
    );
    let mut session = lookup.connect("bo").await.unwrap();

    let group = resolve(session.as_mut(), "abc", "bo").await.brand_group();
    assert_eq!(group.id, BrandGroupId::Number(7));
    assert_eq!(group.name, "First");
}

#[tokio::test]
async fn textual_ids_are_kept() {
    let lookup = FakeLookup::new().with_group("abc", json!("bg-9"), "Nine");
    let mut session = lookup.connect("bo").await.unwrap();

    let group = resolve(session.as_mut(), "abc", "bo").await.brand_group();
    assert_eq!(group.id, BrandGroupId::Text("bg-9".into()));
}

#[tokio::test]
async fn missing_row_yields_placeholder_and_reason() {
    let lookup = FakeLookup::new();
    let mut session = lookup.connect("bo").await.unwrap();

    let resolution = resolve(session.as_mut(), " ghost ", "bo").await;
    assert_eq!(resolution.brand_group(), BrandGroup::not_found());
    assert_eq!(
        resolution.reason(),
        Some("No rows returned from query for mongodb_id: 'ghost' (database: bo)")
    );
}

#[tokio::test]
async fn query_error_yields_placeholder_and_reason() {
    let lookup = FakeLookup::new().with_reply("abc", Reply::Fail("connection reset".into()));
    let mut session = lookup.connect("bo").await.unwrap();

    let resolution = resolve(session.as_mut(), "abc", "bo").await;
    assert_eq!(
        resolution.brand_group().id,
        BrandGroupId::Text(NOT_FOUND_BRAND_GROUP_ID.into())
    );
    assert_eq!(resolution.reason(), Some("Database error: connection reset"));
}

#[tokio::test]
async fn null_group_id_is_unresolved() {
    let lookup = FakeLookup::new().with_group("orphan", serde_json::Value::Null, "");
    let mut session = lookup.connect("bo").await.unwrap();

    let resolution = resolve(session.as_mut(), "orphan", "bo").await;
    assert!(resolution.brand_group().is_not_found());
    assert!(resolution.reason().unwrap().contains("'orphan'"));
}

#[tokio::test]
async fn resolve_all_uses_one_connection() {
    let lookup = FakeLookup::new()
        .with_group("a", json!(1), "One")
        .with_reply("b", Reply::Fail("timeout".into()));
    let ids = vec!["a".to_string(), "b".to_string(), "c".to_string()];

    let batch = resolve_all(&lookup, "bo", &ids).await.unwrap();

    assert_eq!(lookup.connects(), vec!["bo".to_string()]);
    assert_eq!(lookup.closes(), 1);
    assert_eq!(lookup.queries().len(), 3);
    assert_eq!(batch.len(), 3);
    assert_eq!(batch.brand_group("a").id, BrandGroupId::Number(1));
    assert!(batch.brand_group("b").is_not_found());
    assert!(batch.brand_group("c").is_not_found());

    let errors: Vec<(&str, &str)> = batch.errors().collect();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0], ("b", "Database error: timeout"));
    assert_eq!(errors[1].0, "c");
}

#[tokio::test]
async fn failed_connect_is_fatal() {
    let lookup = FakeLookup::refusing("access denied for user 'reader'");
    let ids = vec!["a".to_string()];

    match resolve_all(&lookup, "bo", &ids).await {
        Err(UploaderError::Connection { database, message }) => {
            assert_eq!(database, "bo");
            assert!(message.contains("access denied"));
        }
        other => panic!("expected connection error, got {:?}", other),
    }
}
