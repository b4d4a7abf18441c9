/// ASCII rasterizer for terminal rendering
use crossterm::{
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use std::convert::Infallible;
use std::io::Write;
use modelview_core::{PerspectiveCamera, Raster, Renderer, Scene, SurfaceSize};

/// Character luminosity ramp for shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Vertical pixels per terminal cell; cells are roughly twice as tall as wide
pub const CELL_ROWS: u32 = 2;

/// Renders the viewer into terminal cells.
///
/// The viewer sees a surface of `columns x rows * CELL_ROWS` pixels so that
/// the camera aspect matches what is on screen.
pub struct AsciiRenderer {
    size: SurfaceSize,
    raster: Raster,
    cells: Vec<char>,
}

impl AsciiRenderer {
    pub fn new() -> Self {
        Self {
            size: SurfaceSize::default(),
            raster: Raster::new(SurfaceSize::default()),
            cells: Vec::new(),
        }
    }

    /// Surface size for a terminal of `columns x rows` cells
    pub fn surface_for(columns: u16, rows: u16) -> SurfaceSize {
        SurfaceSize::new(columns as u32, rows as u32 * CELL_ROWS)
    }

    pub fn columns(&self) -> usize {
        self.size.width as usize
    }

    pub fn rows(&self) -> usize {
        (self.size.height / CELL_ROWS) as usize
    }

    /// Character shown in cell `(column, row)` after the last render
    pub fn cell(&self, column: usize, row: usize) -> char {
        self.cells[row * self.columns() + column]
    }

    fn shade_cells(&mut self) {
        let (columns, rows) = (self.columns(), self.rows());
        self.cells.clear();
        self.cells.reserve(columns * rows);

        for row in 0..rows as u32 {
            for column in 0..columns as u32 {
                let mut luminance = 0.0;
                let mut covered = false;
                for sub in 0..CELL_ROWS {
                    let y = row * CELL_ROWS + sub;
                    if self.raster.covered_at(column, y) {
                        covered = true;
                        let c = self.raster.color_at(column, y);
                        luminance += 0.2126 * c.x + 0.7152 * c.y + 0.0722 * c.z;
                    }
                }
                let character = if covered {
                    let brightness = luminance / CELL_ROWS as f32;
                    // Skip the blank so lit-but-dark faces stay visible
                    let steps = (LUMINOSITY_RAMP.len() - 2) as f32;
                    let index = 1 + (brightness * steps).round() as usize;
                    LUMINOSITY_RAMP[index.min(LUMINOSITY_RAMP.len() - 1)]
                } else {
                    ' '
                };
                self.cells.push(character);
            }
        }
    }

    pub fn draw<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for row in 0..self.rows() {
            for column in 0..self.columns() {
                let c = self.cell(column, row);

                // Color based on character intensity
                let color = match c {
                    ' ' | '.' | ':' => Color::DarkGrey,
                    '-' | '=' => Color::Grey,
                    '+' | '*' => Color::White,
                    '#' | '%' | '@' => Color::Cyan,
                    _ => Color::White,
                };

                writer.queue(SetForegroundColor(color))?;
                writer.queue(Print(c))?;
            }
            if row + 1 < self.rows() {
                writer.queue(Print("\r\n"))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

impl Default for AsciiRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for AsciiRenderer {
    type Error = Infallible;

    /// Terminal cells have no sub-cell density to exploit
    fn set_pixel_ratio(&mut self, _ratio: f32) {}

    fn set_size(&mut self, size: SurfaceSize) {
        self.size = size;
        self.raster.resize(size);
        self.cells = vec![' '; self.columns() * self.rows()];
    }

    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<(), Infallible> {
        self.raster.clear(modelview_core::Color::new(0.0, 0.0, 0.0));
        self.raster.draw_scene(scene, camera);
        self.shade_cells();
        Ok(())
    }
}
