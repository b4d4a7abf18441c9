/// modelview web - the `<three-d-viewer>` custom element
///
/// Registers the element on module start. Each attached element mounts a
/// viewer rendering `WWS_000.glb` into a canvas inside its shadow root.
///
/// Usage: `<three-d-viewer></three-d-viewer>`

use wasm_bindgen::prelude::*;

pub mod canvas;
pub mod element;
pub mod fetch;

pub use canvas::{CanvasRenderer, RenderError};
pub use element::ModelViewerElement;

/// Tag name the element is registered under
pub const ELEMENT_TAG: &str = "three-d-viewer";

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    // Setup panic hook for better error messages in browser console
    console_error_panic_hook::set_once();

    console_log::init_with_level(log::Level::Debug)
        .map_err(|e| JsValue::from_str(&format!("Failed to init logger: {}", e)))?;

    element::define(ELEMENT_TAG)?;
    log::info!("<{}> registered", ELEMENT_TAG);
    Ok(())
}
