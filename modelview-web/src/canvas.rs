/// Canvas 2D surface for the software renderer
use thiserror::Error;
use wasm_bindgen::{Clamped, JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, ImageData};

use modelview_core::config::RendererConfig;
use modelview_core::{PerspectiveCamera, Renderer, Scene, SoftwareRenderer, SurfaceSize};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("canvas error: {0}")]
    Canvas(String),

    #[error("2d context unavailable")]
    NoContext,
}

impl From<JsValue> for RenderError {
    fn from(value: JsValue) -> Self {
        RenderError::Canvas(format!("{value:?}"))
    }
}

impl From<RenderError> for JsValue {
    fn from(err: RenderError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

/// Blits software-rendered frames onto a `<canvas>`.
///
/// The canvas backing store is sized in device pixels, its CSS box in
/// container pixels.
pub struct CanvasRenderer {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
    frame: SoftwareRenderer,
}

impl CanvasRenderer {
    pub fn new(canvas: HtmlCanvasElement, config: RendererConfig) -> Result<Self, RenderError> {
        let context: CanvasRenderingContext2d = canvas
            .get_context("2d")?
            .ok_or(RenderError::NoContext)?
            .dyn_into()
            .map_err(|_| RenderError::NoContext)?;
        context.set_image_smoothing_enabled(config.antialias);

        Ok(Self {
            canvas,
            context,
            frame: SoftwareRenderer::new(config),
        })
    }

    fn apply_size(&self) {
        let buffer = self.frame.drawing_buffer_size();
        self.canvas.set_width(buffer.width);
        self.canvas.set_height(buffer.height);

        let size = self.frame.size();
        let style = self.canvas.style();
        let _ = style.set_property("width", &format!("{}px", size.width));
        let _ = style.set_property("height", &format!("{}px", size.height));
        let _ = style.set_property("display", "block");
    }
}

impl Renderer for CanvasRenderer {
    type Error = RenderError;

    fn set_pixel_ratio(&mut self, ratio: f32) {
        self.frame.set_pixel_ratio(ratio);
        self.apply_size();
    }

    fn set_size(&mut self, size: SurfaceSize) {
        self.frame.set_size(size);
        self.apply_size();
    }

    fn size(&self) -> SurfaceSize {
        self.frame.size()
    }

    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<(), RenderError> {
        if let Err(never) = self.frame.render(scene, camera) {
            match never {}
        }

        let buffer = self.frame.drawing_buffer_size();
        if buffer.area() == 0 {
            return Ok(());
        }
        let image = ImageData::new_with_u8_clamped_array_and_sh(
            Clamped(self.frame.pixels()),
            buffer.width,
            buffer.height,
        )?;
        self.context.put_image_data(&image, 0.0, 0.0)?;
        Ok(())
    }
}
