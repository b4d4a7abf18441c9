//! Element lifecycle in a real browser: `wasm-pack test --headless --firefox modelview-web`
#![cfg(target_arch = "wasm32")]

use js_sys::Promise;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use wasm_bindgen_test::*;
use web_sys::{Event, HtmlElement};

use modelview_web::ModelViewerElement;

wasm_bindgen_test_configure!(run_in_browser);

fn host() -> HtmlElement {
    let document = web_sys::window().unwrap().document().unwrap();
    let host: HtmlElement = document.create_element("div").unwrap().dyn_into().unwrap();
    host.style().set_property("display", "block").unwrap();
    host.style().set_property("width", "200px").unwrap();
    host.style().set_property("height", "100px").unwrap();
    document.body().unwrap().append_child(&host).unwrap();
    host
}

async fn next_frame() {
    let promise = Promise::new(&mut |resolve, _| {
        web_sys::window()
            .unwrap()
            .request_animation_frame(&resolve)
            .unwrap();
    });
    JsFuture::from(promise).await.unwrap();
}

#[wasm_bindgen_test]
async fn test_mounted_element_draws_frames() {
    let host = host();
    let element = ModelViewerElement::mount(&host).unwrap();
    next_frame().await;
    next_frame().await;

    assert!(element.frames() > 0.0);
    assert!(element.state().starts_with("Rendering"));
    assert!(host.shadow_root().unwrap().first_child().is_some());
    host.remove();
}

#[wasm_bindgen_test]
async fn test_disposed_element_stays_idle() {
    let host = host();
    let mut element = ModelViewerElement::mount(&host).unwrap();
    next_frame().await;

    element.dispose();
    let frames = element.frames();
    let window = web_sys::window().unwrap();
    window
        .dispatch_event(&Event::new("resize").unwrap())
        .unwrap();
    next_frame().await;
    next_frame().await;

    assert_eq!(element.state(), "Disposed");
    assert_eq!(element.frames(), frames);
    assert!(host.shadow_root().unwrap().first_child().is_none());
    host.remove();
}

#[wasm_bindgen_test]
async fn test_remount_after_dispose_starts_fresh() {
    let host = host();
    let mut first = ModelViewerElement::mount(&host).unwrap();
    first.dispose();

    let second = ModelViewerElement::mount(&host).unwrap();
    next_frame().await;
    assert_eq!(first.state(), "Disposed");
    assert!(second.state().starts_with("Rendering"));
    assert!(second.frames() > 0.0);
    host.remove();
}
