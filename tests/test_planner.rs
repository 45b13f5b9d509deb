//! Tests for destination keys and the upload step.

use ryze_uploader::engine::planner::{
    CSV_CONTENT_TYPE, Placement, UploadPlanner, console_url, destination_key, s3_url,
};
use ryze_uploader::engine::types::{BrandGroup, BrandGroupId, UploadType, YearMonth};
use ryze_uploader::error::UploaderError;
use ryze_uploader::storage::memory_store::MemoryObjectStore;

fn nov_2025() -> YearMonth {
    YearMonth::parse("2025/11").unwrap()
}

#[test]
fn destination_key_layout() {
    let key = destination_key(
        nov_2025(),
        &BrandGroupId::Number(42),
        "abc",
        "3000",
        UploadType::Translated,
    );
    assert_eq!(key, "AutomationDiscrepancy/2025/11/42/abc_3000_Translated.csv");
}

#[test]
fn destination_key_for_unresolved_group() {
    let key = destination_key(
        YearMonth { year: 2026, month: 2 },
        &BrandGroup::not_found().id,
        "eab7e510",
        "77",
        UploadType::Processed,
    );
    assert_eq!(
        key,
        "AutomationDiscrepancy/2026/02/NotFoundBrandGroupID/eab7e510_77_Processed.csv"
    );
}

#[test]
fn destination_key_is_deterministic() {
    let build = || {
        destination_key(
            nov_2025(),
            &BrandGroupId::Number(1),
            "x",
            "1",
            UploadType::Processed,
        )
    };
    assert_eq!(build(), build());
}

#[test]
fn locators() {
    assert_eq!(s3_url("bkt", "a/b.csv"), "s3://bkt/a/b.csv");
    assert_eq!(
        console_url("bkt", "a/b.csv"),
        "https://s3.console.aws.amazon.com/s3/object/bkt?prefix=a/b.csv"
    );
}

#[tokio::test]
async fn dry_run_never_writes() {
    let store = MemoryObjectStore::new();
    let planner = UploadPlanner::new(&store, "bkt", true);

    let placement = planner
        .place("k/file.csv".to_string(), "a\n1".to_string())
        .await
        .unwrap();

    assert_eq!(
        placement,
        Placement::Simulated {
            would_upload_to: "k/file.csv".to_string()
        }
    );
    assert_eq!(store.put_count(), 0);
}

#[tokio::test]
async fn dry_run_ignores_broken_store() {
    let store = MemoryObjectStore::failing("no network");
    let planner = UploadPlanner::new(&store, "bkt", true);
    assert!(planner.place("k".into(), String::new()).await.is_ok());
}

#[tokio::test]
async fn live_upload_writes_csv() {
    let store = MemoryObjectStore::new();
    let planner = UploadPlanner::new(&store, "bkt", false);

    let placement = planner
        .place("k/file.csv".to_string(), "a\n1".to_string())
        .await
        .unwrap();

    match placement {
        Placement::Uploaded {
            path,
            s3_url,
            console_url,
            ..
        } => {
            assert_eq!(path, "k/file.csv");
            assert_eq!(s3_url, "s3://bkt/k/file.csv");
            assert!(console_url.ends_with("bkt?prefix=k/file.csv"));
        }
        other => panic!("expected upload, got {:?}", other),
    }

    let objects = store.objects();
    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0].bucket, "bkt");
    assert_eq!(objects[0].key, "k/file.csv");
    assert_eq!(objects[0].body, b"a\n1".to_vec());
    assert_eq!(objects[0].content_type, CSV_CONTENT_TYPE);
}

#[tokio::test]
async fn failed_write_is_fatal() {
    let store = MemoryObjectStore::failing("AccessDenied");
    let planner = UploadPlanner::new(&store, "bkt", false);

    let err = planner.place("k".to_string(), "a".to_string()).await.unwrap_err();
    assert!(matches!(err, UploaderError::Write { ref key, .. } if key == "k"));
    assert_eq!(err.to_string(), "S3 Upload Error: AccessDenied");
}
