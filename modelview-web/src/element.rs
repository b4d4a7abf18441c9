//! `<three-d-viewer>`: the custom element wrapping one [`Viewer`].
//!
//! Everything the element acquires on mount (frame callback, window resize
//! listener, pointer listeners, in-flight fetch) is released by `dispose`,
//! which the element's disconnected callback calls.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    Document, Event, EventTarget, HtmlCanvasElement, HtmlElement, MouseEvent, Node, ShadowRootInit,
    ShadowRootMode, WheelEvent, Window,
};

use modelview_core::{
    ControlInput, LoadEvent, LoadRequest, PointerButton, SurfaceSize, Viewer, ViewerConfig,
};

use crate::canvas::CanvasRenderer;
use crate::fetch;

type SharedViewer = Rc<RefCell<Viewer<CanvasRenderer>>>;

#[wasm_bindgen(inline_js = r#"
export function define_viewer_element(tag, mount) {
    if (customElements.get(tag)) {
        return;
    }
    customElements.define(tag, class extends HTMLElement {
        connectedCallback() {
            this.viewer = mount(this);
        }
        disconnectedCallback() {
            if (this.viewer) {
                this.viewer.dispose();
                this.viewer.free();
                this.viewer = undefined;
            }
        }
    });
}
"#)]
extern "C" {
    #[wasm_bindgen(catch)]
    fn define_viewer_element(tag: &str, mount: &js_sys::Function) -> Result<(), JsValue>;
}

/// Register the custom element under `tag`
pub fn define(tag: &str) -> Result<(), JsValue> {
    let mount = Closure::<dyn FnMut(HtmlElement) -> JsValue>::new(|host: HtmlElement| {
        match ModelViewerElement::mount(&host) {
            Ok(element) => JsValue::from(element),
            Err(err) => {
                log::error!("failed to initialize viewer: {err:?}");
                JsValue::UNDEFINED
            }
        }
    });
    define_viewer_element(tag, mount.as_ref().unchecked_ref())?;
    // The registry keeps calling it for every future element
    mount.forget();
    Ok(())
}

/// Event listener removed from its target on drop
struct Listener {
    target: EventTarget,
    event: &'static str,
    callback: Closure<dyn FnMut(Event)>,
}

impl Listener {
    fn new(
        target: &EventTarget,
        event: &'static str,
        handler: impl FnMut(Event) + 'static,
    ) -> Result<Self, JsValue> {
        let callback = Closure::<dyn FnMut(Event)>::new(handler);
        target.add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())?;
        Ok(Self {
            target: target.clone(),
            event,
            callback,
        })
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        let callback = self.callback.as_ref().unchecked_ref();
        let _ = self.target.remove_event_listener_with_callback(self.event, callback);
    }
}

/// `requestAnimationFrame` chain with a cancellable pending frame
struct FrameScheduler {
    window: Window,
    callback: Rc<RefCell<Option<Closure<dyn FnMut()>>>>,
    pending: Rc<Cell<Option<i32>>>,
}

impl FrameScheduler {
    fn start(window: &Window, viewer: SharedViewer) -> Result<Self, JsValue> {
        let callback: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
        let pending = Rc::new(Cell::new(None));

        let next = callback.clone();
        let next_pending = pending.clone();
        let win = window.clone();
        *callback.borrow_mut() = Some(Closure::new(move || {
            next_pending.set(None);
            if !viewer.borrow().frame_loop().is_running() {
                return;
            }
            // Request the next frame first, then draw this one
            if let Some(cb) = next.borrow().as_ref() {
                match win.request_animation_frame(cb.as_ref().unchecked_ref()) {
                    Ok(id) => next_pending.set(Some(id)),
                    Err(err) => log::error!("requestAnimationFrame failed: {err:?}"),
                }
            }
            if let Err(err) = viewer.borrow_mut().frame() {
                log::error!("frame failed: {err}");
            }
        }));

        if let Some(cb) = callback.borrow().as_ref() {
            pending.set(Some(window.request_animation_frame(cb.as_ref().unchecked_ref())?));
        }

        Ok(Self {
            window: window.clone(),
            callback,
            pending,
        })
    }

    fn stop(&self) {
        if let Some(id) = self.pending.take() {
            let _ = self.window.cancel_animation_frame(id);
        }
        // Breaks the closure's reference to itself
        self.callback.borrow_mut().take();
    }
}

fn container_size(container: &HtmlElement) -> SurfaceSize {
    SurfaceSize::new(
        container.offset_width().max(0) as u32,
        container.offset_height().max(0) as u32,
    )
}

/// DOM `MouseEvent.button` to a control button
pub(crate) fn pointer_button(button: i16) -> Option<PointerButton> {
    match button {
        0 => Some(PointerButton::Primary),
        1 => Some(PointerButton::Middle),
        2 => Some(PointerButton::Secondary),
        _ => None,
    }
}

fn create<T: JsCast>(document: &Document, tag: &str) -> Result<T, JsValue> {
    document
        .create_element(tag)?
        .dyn_into::<T>()
        .map_err(|_| JsValue::from_str(&format!("<{tag}> has an unexpected type")))
}

fn deliver(viewer: &Weak<RefCell<Viewer<CanvasRenderer>>>, id: u64, event: LoadEvent) {
    if let Some(viewer) = viewer.upgrade() {
        viewer.borrow_mut().handle_load_event(id, event);
    }
}

fn spawn_load(viewer: Weak<RefCell<Viewer<CanvasRenderer>>>, request: LoadRequest) {
    wasm_bindgen_futures::spawn_local(async move {
        let id = request.id;
        let result = fetch::fetch_bytes(&request.url, &request.cancel, |progress| {
            deliver(&viewer, id, LoadEvent::Progress(progress));
        })
        .await;
        deliver(&viewer, id, LoadEvent::from_fetch(result));
    });
}

/// Handle owned by one attached `<three-d-viewer>`
#[wasm_bindgen]
pub struct ModelViewerElement {
    viewer: SharedViewer,
    container: HtmlElement,
    frames: FrameScheduler,
    listeners: Vec<Listener>,
}

#[wasm_bindgen]
impl ModelViewerElement {
    /// Build the viewer inside `host`'s shadow root and start rendering
    #[wasm_bindgen(js_name = mount)]
    pub fn mount(host: &HtmlElement) -> Result<ModelViewerElement, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("No window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("No document"))?;

        let root: Node = match host.shadow_root() {
            Some(root) => root.into(),
            None => host
                .attach_shadow(&ShadowRootInit::new(ShadowRootMode::Open))?
                .into(),
        };

        let container: HtmlElement = create(&document, "div")?;
        let style = container.style();
        style.set_property("width", "100%")?;
        style.set_property("height", "100%")?;
        style.set_property("position", "relative")?;
        style.set_property("display", "flex")?;
        style.set_property("justify-content", "center")?;
        style.set_property("align-items", "center")?;
        root.append_child(&container)?;

        let config = ViewerConfig::default();
        let canvas: HtmlCanvasElement = create(&document, "canvas")?;
        let renderer = CanvasRenderer::new(canvas.clone(), config.renderer.clone())?;
        container.append_child(&canvas)?;
        log::debug!("canvas renderer created and appended to container");

        let viewer: SharedViewer = Rc::new(RefCell::new(Viewer::new(config, renderer)));
        let request = viewer
            .borrow_mut()
            .mount(container_size(&container), window.device_pixel_ratio() as f32);
        if let Some(request) = request {
            spawn_load(Rc::downgrade(&viewer), request);
        }

        let frames = FrameScheduler::start(&window, viewer.clone())?;
        let listeners = Self::listen(&window, &canvas, &container, &viewer)?;

        Ok(ModelViewerElement {
            viewer,
            container,
            frames,
            listeners,
        })
    }

    /// Stop rendering, drop every listener and cancel the pending load
    pub fn dispose(&mut self) {
        self.viewer.borrow_mut().dispose();
        self.frames.stop();
        self.listeners.clear();
        self.container.remove();
    }

    /// Current lifecycle state, for debugging from the console
    #[wasm_bindgen(getter)]
    pub fn state(&self) -> String {
        format!("{:?}", self.viewer.borrow().state())
    }

    /// Frames drawn since mount
    #[wasm_bindgen(getter)]
    pub fn frames(&self) -> f64 {
        self.viewer.borrow().frame_loop().frames() as f64
    }
}

impl ModelViewerElement {
    fn listen(
        window: &Window,
        canvas: &HtmlCanvasElement,
        container: &HtmlElement,
        viewer: &SharedViewer,
    ) -> Result<Vec<Listener>, JsValue> {
        let mut listeners = Vec::new();

        let resize_viewer = viewer.clone();
        let resize_container = container.clone();
        listeners.push(Listener::new(window, "resize", move |_| {
            resize_viewer
                .borrow_mut()
                .resize(container_size(&resize_container));
        })?);

        let down_viewer = viewer.clone();
        listeners.push(Listener::new(canvas, "mousedown", move |event| {
            if let Some(mouse) = event.dyn_ref::<MouseEvent>() {
                if let Some(button) = pointer_button(mouse.button()) {
                    down_viewer.borrow_mut().handle_input(ControlInput::PointerDown {
                        button,
                        x: mouse.offset_x() as f32,
                        y: mouse.offset_y() as f32,
                    });
                }
            }
        })?);

        let move_viewer = viewer.clone();
        listeners.push(Listener::new(canvas, "mousemove", move |event| {
            if let Some(mouse) = event.dyn_ref::<MouseEvent>() {
                move_viewer.borrow_mut().handle_input(ControlInput::PointerMove {
                    x: mouse.offset_x() as f32,
                    y: mouse.offset_y() as f32,
                });
            }
        })?);

        let up_viewer = viewer.clone();
        listeners.push(Listener::new(window, "mouseup", move |_| {
            up_viewer.borrow_mut().handle_input(ControlInput::PointerUp);
        })?);

        let wheel_viewer = viewer.clone();
        listeners.push(Listener::new(canvas, "wheel", move |event| {
            if let Some(wheel) = event.dyn_ref::<WheelEvent>() {
                event.prevent_default();
                wheel_viewer.borrow_mut().handle_input(ControlInput::Wheel {
                    delta_y: wheel.delta_y() as f32,
                });
            }
        })?);

        listeners.push(Listener::new(canvas, "contextmenu", |event| {
            event.prevent_default();
        })?);

        Ok(listeners)
    }
}

impl Drop for ModelViewerElement {
    fn drop(&mut self) {
        self.dispose();
    }
}
