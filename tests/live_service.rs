//! Import against a running annotation service.
//!
//! Run with: `GUJI_AI_URL=http://localhost:5004 cargo test --test live_service --features real_llm -- --nocapture`

mod common;

use common::{memory_store, XIANG_YU};
use guji::ai::{AiAnnotationImporter, AnnotationClient, CancellationToken, HttpAnnotationClient};
use guji::annotation::validate;
use guji::DocumentId;
use std::sync::Arc;
use std::time::Duration;

fn live_client() -> HttpAnnotationClient {
    let url = std::env::var("GUJI_AI_URL").unwrap_or_else(|_| guji::ai::http::DEFAULT_BASE_URL.to_string());
    HttpAnnotationClient::new(url).with_timeout(Duration::from_secs(120))
}

#[tokio::test]
#[cfg_attr(not(feature = "real_llm"), ignore = "requires real_llm feature")]
async fn live_import_produces_valid_spans() {
    let client = Arc::new(live_client());
    assert!(client.is_available().await, "annotation service not reachable");

    let store = memory_store();
    let doc = DocumentId::from_string("doc:live");
    let importer = AiAnnotationImporter::new(client, store.clone());
    let report = importer.import(&doc, XIANG_YU, &CancellationToken::new()).await.unwrap();

    println!("{}", report.summary());
    for span in store.list(&doc) {
        println!("  [{}, {}) {} {}", span.start, span.end, span.label, span.text);
        assert!(validate(&span, XIANG_YU));
    }
}
