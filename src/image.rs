use std::ops::{Index, IndexMut};

use crate::types::Color;

/// Row-major RGBA raster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    width: usize,
    height: usize,
    pixels: Vec<Color>,
}

impl Image {
    /// Fully transparent image.
    pub fn new(width: usize, height: usize) -> Self {
        Image::filled(width, height, Color::TRANSPARENT)
    }

    pub fn filled(width: usize, height: usize, color: Color) -> Self {
        Image {
            width,
            height,
            pixels: vec![color; width * height],
        }
    }

    /// `None` unless `pixels` holds exactly `width * height` colors.
    pub fn from_pixels(width: usize, height: usize, pixels: Vec<Color>) -> Option<Self> {
        (pixels.len() == width * height).then_some(Image {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    fn offset(&self, row: usize, column: usize) -> Option<usize> {
        (row < self.height && column < self.width).then(|| row * self.width + column)
    }

    pub fn get(&self, row: usize, column: usize) -> Option<Color> {
        self.offset(row, column).map(|offset| self.pixels[offset])
    }

    /// Returns `false` and leaves the image untouched when out of bounds.
    pub fn set(&mut self, row: usize, column: usize, color: Color) -> bool {
        match self.offset(row, column) {
            Some(offset) => {
                self.pixels[offset] = color;
                true
            }
            None => false,
        }
    }
}

impl Index<(usize, usize)> for Image {
    type Output = Color;

    fn index(&self, (row, column): (usize, usize)) -> &Color {
        match self.offset(row, column) {
            Some(offset) => &self.pixels[offset],
            None => panic!(
                "pixel ({}, {}) outside {}x{} image",
                row, column, self.width, self.height
            ),
        }
    }
}

impl IndexMut<(usize, usize)> for Image {
    fn index_mut(&mut self, (row, column): (usize, usize)) -> &mut Color {
        match self.offset(row, column) {
            Some(offset) => &mut self.pixels[offset],
            None => panic!(
                "pixel ({}, {}) outside {}x{} image",
                row, column, self.width, self.height
            ),
        }
    }
}
