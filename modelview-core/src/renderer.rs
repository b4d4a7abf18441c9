//! The rendering seam between the viewer and a concrete output surface.

use std::convert::Infallible;

use crate::camera::{PerspectiveCamera, SurfaceSize};
use crate::config::RendererConfig;
use crate::raster::Raster;
use crate::scene::Scene;

/// A drawable surface the viewer renders into every frame.
///
/// Sizes are in CSS/logical pixels; implementations multiply by the pixel
/// ratio to size their drawing buffer.
pub trait Renderer {
    type Error: std::fmt::Debug + std::fmt::Display;

    fn set_pixel_ratio(&mut self, ratio: f32);

    fn set_size(&mut self, size: SurfaceSize);

    fn size(&self) -> SurfaceSize;

    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<(), Self::Error>;
}

/// Most samples rasterized per frame, enough for a 1080p buffer
pub const MAX_SAMPLES: usize = 1 << 21;

/// Renders into an in-memory RGBA8 buffer, optionally supersampled.
///
/// Large surfaces give up supersampling first, then resolution, so a frame
/// never rasterizes more than [`MAX_SAMPLES`] samples.
pub struct SoftwareRenderer {
    config: RendererConfig,
    pixel_ratio: f32,
    size: SurfaceSize,
    buffer: SurfaceSize,
    samples: u32,
    raster: Raster,
    pixels: Vec<u8>,
}

impl SoftwareRenderer {
    pub fn new(config: RendererConfig) -> Self {
        Self {
            config,
            pixel_ratio: 1.0,
            size: SurfaceSize::default(),
            buffer: SurfaceSize::default(),
            samples: 1,
            raster: Raster::new(SurfaceSize::default()),
            pixels: Vec::new(),
        }
    }

    /// Samples per pixel along each axis
    pub fn samples(&self) -> u32 {
        self.samples
    }

    /// Size of the RGBA buffer in device pixels
    pub fn drawing_buffer_size(&self) -> SurfaceSize {
        self.buffer
    }

    /// Last rendered frame, row-major RGBA8
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    fn resize_buffers(&mut self) {
        let mut buffer = self.size.scaled(self.pixel_ratio);
        let mut samples = if self.config.antialias { 2 } else { 1 };
        if buffer.area() * (samples * samples) as usize > MAX_SAMPLES {
            samples = 1;
        }
        if buffer.area() > MAX_SAMPLES {
            let shrink = (MAX_SAMPLES as f64 / buffer.area() as f64).sqrt();
            buffer = SurfaceSize::new(
                (buffer.width as f64 * shrink).floor() as u32,
                (buffer.height as f64 * shrink).floor() as u32,
            );
        }
        if samples == 1 && self.config.antialias {
            log::debug!(
                "{}x{} at ratio {} rendered into {}x{} without supersampling",
                self.size.width,
                self.size.height,
                self.pixel_ratio,
                buffer.width,
                buffer.height
            );
        }

        self.buffer = buffer;
        self.samples = samples;
        self.raster
            .resize(SurfaceSize::new(buffer.width * samples, buffer.height * samples));
        self.pixels.resize(buffer.area() * 4, 0);
    }

    /// Average each block of samples into one output pixel
    fn resolve(&mut self) {
        let buffer = self.buffer;
        let samples = self.samples;
        let weight = 1.0 / (samples * samples) as f32;

        for y in 0..buffer.height {
            for x in 0..buffer.width {
                let mut sum = nalgebra::Vector3::zeros();
                for sy in 0..samples {
                    for sx in 0..samples {
                        sum += self.raster.color_at(x * samples + sx, y * samples + sy);
                    }
                }
                let rgb = sum * weight;
                let offset = (y as usize * buffer.width as usize + x as usize) * 4;
                self.pixels[offset] = to_byte(rgb.x);
                self.pixels[offset + 1] = to_byte(rgb.y);
                self.pixels[offset + 2] = to_byte(rgb.z);
                self.pixels[offset + 3] = 255;
            }
        }
    }
}

fn to_byte(channel: f32) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}

impl Renderer for SoftwareRenderer {
    type Error = Infallible;

    fn set_pixel_ratio(&mut self, ratio: f32) {
        self.pixel_ratio = if ratio.is_finite() && ratio > 0.0 { ratio } else { 1.0 };
        self.resize_buffers();
    }

    fn set_size(&mut self, size: SurfaceSize) {
        self.size = size;
        self.resize_buffers();
    }

    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<(), Infallible> {
        self.raster.clear(self.config.background);
        self.raster.draw_scene(scene, camera);
        self.resolve();
        Ok(())
    }
}
