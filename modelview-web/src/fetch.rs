/// Browser fetch of the model asset
use js_sys::{Reflect, Uint8Array};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::ReadableStreamDefaultReader;

use modelview_core::{CancelToken, LoadError, LoadProgress};

fn js_err(e: JsValue) -> LoadError {
    LoadError::fetch(format!("{e:?}"))
}

/// `Content-Length` header value, when present and numeric
pub(crate) fn parse_content_length(value: Option<String>) -> Option<u64> {
    value.and_then(|v| v.trim().parse().ok())
}

/// Fetch `url` relative to the page, reporting progress per body chunk.
///
/// Checks `cancel` around every await so a disposed viewer stops early.
pub async fn fetch_bytes(
    url: &str,
    cancel: &CancelToken,
    mut on_progress: impl FnMut(LoadProgress),
) -> Result<Vec<u8>, LoadError> {
    let check_cancel = || {
        if cancel.is_cancelled() {
            Err(LoadError::Cancelled)
        } else {
            Ok(())
        }
    };

    let win = web_sys::window().ok_or_else(|| LoadError::fetch("no window"))?;
    let resp_val = JsFuture::from(win.fetch_with_str(url)).await.map_err(js_err)?;
    check_cancel()?;
    let resp: web_sys::Response = resp_val.dyn_into().map_err(js_err)?;

    if !resp.ok() {
        return Err(LoadError::Http {
            status: resp.status(),
            text: resp.status_text(),
        });
    }

    let total = parse_content_length(resp.headers().get("content-length").map_err(js_err)?);
    on_progress(LoadProgress { loaded: 0, total });

    let Some(body) = resp.body() else {
        // No stream support: read the whole body at once
        let buf_val = JsFuture::from(resp.array_buffer().map_err(js_err)?)
            .await
            .map_err(js_err)?;
        check_cancel()?;
        let bytes = Uint8Array::new(&buf_val).to_vec();
        on_progress(LoadProgress {
            loaded: bytes.len() as u64,
            total: total.or(Some(bytes.len() as u64)),
        });
        return Ok(bytes);
    };

    let reader = ReadableStreamDefaultReader::new(&body).map_err(js_err)?;
    let mut bytes = Vec::with_capacity(total.unwrap_or(0) as usize);
    loop {
        let chunk = JsFuture::from(reader.read()).await.map_err(js_err)?;
        if cancel.is_cancelled() {
            let _ = reader.cancel();
            return Err(LoadError::Cancelled);
        }

        let done = Reflect::get(&chunk, &JsValue::from_str("done"))
            .map_err(js_err)?
            .as_bool()
            .unwrap_or(true);
        if done {
            break;
        }
        let value: Uint8Array = Reflect::get(&chunk, &JsValue::from_str("value"))
            .map_err(js_err)?
            .dyn_into()
            .map_err(js_err)?;

        let start = bytes.len();
        bytes.resize(start + value.length() as usize, 0);
        value.copy_to(&mut bytes[start..]);
        on_progress(LoadProgress {
            loaded: bytes.len() as u64,
            total,
        });
    }

    log::debug!("fetched {} bytes from {url}", bytes.len());
    Ok(bytes)
}
