//! Streamed asset fetch against `data:` URLs, no server needed
#![cfg(target_arch = "wasm32")]

use wasm_bindgen_test::*;

use modelview_core::{CancelToken, LoadError, LoadProgress};
use modelview_web::fetch::fetch_bytes;

wasm_bindgen_test_configure!(run_in_browser);

// "solid t\nendsolid t\n"
const STL_DATA_URL: &str = "data:model/stl;base64,c29saWQgdAplbmRzb2xpZCB0Cg==";

#[wasm_bindgen_test]
async fn test_fetch_reports_progress_up_to_body_length() {
    let mut reports: Vec<LoadProgress> = Vec::new();
    let bytes = fetch_bytes(STL_DATA_URL, &CancelToken::new(), |p| reports.push(p))
        .await
        .unwrap();

    assert_eq!(bytes, b"solid t\nendsolid t\n");
    assert_eq!(reports.first().map(|p| p.loaded), Some(0));
    assert_eq!(reports.last().map(|p| p.loaded), Some(bytes.len() as u64));
    assert!(reports.windows(2).all(|w| w[0].loaded <= w[1].loaded));
}

#[wasm_bindgen_test]
async fn test_cancelled_fetch_returns_no_bytes() {
    let cancel = CancelToken::new();
    cancel.cancel();
    let result = fetch_bytes(STL_DATA_URL, &cancel, |_| {}).await;
    assert!(matches!(result, Err(LoadError::Cancelled)));
}
