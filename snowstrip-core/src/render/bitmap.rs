//! Cell-addressed pixel surface.
//!
//! The strip is a grid of `cell_size × cell_size` blocks separated by
//! `cell_spacing`-pixel gutters. Everything above this module addresses cells
//! (and, for markers, pixels inside a cell); only this module knows the pixel
//! geometry.

use std::io::Cursor;

use image::{ImageBuffer, ImageFormat, Rgba, RgbaImage};

use crate::{Result, config::RenderConfig, render::palette::Rgb};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridGeometry {
    pub grid_width: u32,
    pub grid_height: u32,
    pub cell_size: u32,
    pub cell_spacing: u32,
}

impl GridGeometry {
    pub fn from_config(config: &RenderConfig) -> Self {
        Self {
            grid_width: config.grid_width,
            grid_height: config.grid_height,
            cell_size: config.cell_size,
            cell_spacing: config.cell_spacing,
        }
    }

    pub fn pixel_width(&self) -> u32 {
        self.grid_width * self.cell_size + (self.grid_width + 1) * self.cell_spacing
    }

    pub fn pixel_height(&self) -> u32 {
        self.grid_height * self.cell_size + (self.grid_height + 1) * self.cell_spacing
    }

    /// Pixel coordinate of the top-left corner of a cell along one axis.
    pub fn cell_origin(&self, index: u32) -> u32 {
        self.cell_spacing + index * (self.cell_size + self.cell_spacing)
    }

    fn contains(&self, col: i64, row: i64) -> bool {
        (0..i64::from(self.grid_width)).contains(&col)
            && (0..i64::from(self.grid_height)).contains(&row)
    }
}

#[derive(Debug, Clone)]
pub struct Bitmap {
    geometry: GridGeometry,
    image: RgbaImage,
}

impl Bitmap {
    /// Allocate a surface filled with `background`.
    pub fn new(geometry: GridGeometry, background: Rgb) -> Self {
        let image = ImageBuffer::from_pixel(
            geometry.pixel_width(),
            geometry.pixel_height(),
            rgba(background),
        );
        Self { geometry, image }
    }

    pub fn geometry(&self) -> GridGeometry {
        self.geometry
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Colour of a single pixel, for inspection.
    pub fn pixel(&self, x: u32, y: u32) -> Rgb {
        let Rgba([r, g, b, _]) = *self.image.get_pixel(x, y);
        [r, g, b]
    }

    /// Colour at the top-left pixel of a cell.
    pub fn cell_color(&self, col: u32, row: u32) -> Rgb {
        self.pixel(self.geometry.cell_origin(col), self.geometry.cell_origin(row))
    }

    /// Fill the whole cell with `color`. Cells outside the grid are ignored.
    pub fn paint_cell(&mut self, col: i64, row: i64, color: Rgb) {
        if !self.geometry.contains(col, row) {
            return;
        }
        let x0 = self.geometry.cell_origin(col as u32);
        let y0 = self.geometry.cell_origin(row as u32);
        let px = rgba(color);

        for dy in 0..self.geometry.cell_size {
            for dx in 0..self.geometry.cell_size {
                self.image.put_pixel(x0 + dx, y0 + dy, px);
            }
        }
    }

    /// Fill every cell of `col` from `from_row` down to the last row.
    pub fn paint_column(&mut self, col: i64, from_row: i64, color: Rgb) {
        for row in from_row.max(0)..i64::from(self.geometry.grid_height) {
            self.paint_cell(col, row, color);
        }
    }

    /// Set one pixel at offset (`dx`, `dy`) inside a cell. Offsets past the
    /// cell edge are ignored so markers never bleed into the gutter.
    pub fn paint_dot(&mut self, col: i64, row: i64, dx: u32, dy: u32, color: Rgb) {
        if !self.geometry.contains(col, row)
            || dx >= self.geometry.cell_size
            || dy >= self.geometry.cell_size
        {
            return;
        }
        let x = self.geometry.cell_origin(col as u32) + dx;
        let y = self.geometry.cell_origin(row as u32) + dy;
        self.image.put_pixel(x, y, rgba(color));
    }

    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        self.image.write_to(&mut cursor, ImageFormat::Png)?;
        Ok(cursor.into_inner())
    }
}

fn rgba([r, g, b]: Rgb) -> Rgba<u8> {
    Rgba([r, g, b, 255])
}
