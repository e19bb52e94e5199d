//! Custom labels across database sessions.
//!
//! Run with: `cargo test --test labels`

mod common;

use common::{range_of, reopen, temp_sqlite, XIANG_YU};
use guji::{AnnotationApi, ApiError, Document, DocumentId, GujiConfig, LabelError, ManualAdd};

#[test]
fn custom_label_survives_reopen() {
    let (dir, sqlite) = temp_sqlite();
    let (color, doc) = {
        let api = AnnotationApi::new(sqlite);
        let doc = api.put_document(&Document::new("項羽本紀", XIANG_YU).with_id("doc:xiangyu")).unwrap();
        let label = api.add_label("氏族").unwrap();
        (label.color, doc)
    };

    let api = AnnotationApi::new(reopen(&dir));
    let saved = api
        .labels_snapshot()
        .into_iter()
        .find(|l| l.value == "氏族")
        .expect("custom label reloaded");
    assert!(saved.is_custom);
    assert_eq!(saved.color, color);

    let (start, end) = range_of(XIANG_YU, "項燕", 0);
    let added = api.add_span(&doc, start, end, "氏族").unwrap();
    assert!(matches!(added, ManualAdd::Added(ref span) if span.label == "氏族"));
}

#[test]
fn removed_label_stays_removed() {
    let (dir, sqlite) = temp_sqlite();
    {
        let api = AnnotationApi::new(sqlite);
        api.put_document(&Document::new("項羽本紀", XIANG_YU).with_id("doc:xiangyu")).unwrap();
        api.add_label("官職").unwrap();
        api.add_label("氏族").unwrap();
        api.remove_label("官職").unwrap();
    }

    let api = AnnotationApi::open(dir.path().join("guji.db"), GujiConfig::default()).unwrap();
    let custom: Vec<_> = api
        .labels_snapshot()
        .into_iter()
        .filter(|l| l.is_custom)
        .map(|l| l.value)
        .collect();
    assert_eq!(custom, vec!["氏族".to_string()]);

    let doc = DocumentId::from_string("doc:xiangyu");
    assert!(matches!(api.add_span(&doc, 0, 2, "官職"), Err(ApiError::UnknownLabel(_))));
}

#[test]
fn label_in_use_after_reopen_cannot_be_removed() {
    let (dir, sqlite) = temp_sqlite();
    {
        let api = AnnotationApi::new(sqlite);
        let doc = api.put_document(&Document::new("項羽本紀", XIANG_YU).with_id("doc:xiangyu")).unwrap();
        api.add_label("氏族").unwrap();
        let (start, end) = range_of(XIANG_YU, "項燕", 0);
        api.add_span(&doc, start, end, "氏族").unwrap();
    }

    let api = AnnotationApi::new(reopen(&dir));
    assert!(matches!(
        api.remove_label("氏族"),
        Err(ApiError::Label(LabelError::InUse { count: 1, .. }))
    ));
}
