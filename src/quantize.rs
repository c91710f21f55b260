//! Color quantization contract and two simple strategies.
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::errors::Result;
use crate::image::Image;
use crate::types::{Color, ColorTable};

/// A color table plus a mapping from any color into it.
///
/// Implementations must be deterministic so encoding is reproducible.
pub trait ColorQuantization: fmt::Debug + Send + Sync {
    fn color_table(&self) -> &ColorTable;

    /// Index of the table entry representing `color`. Alpha is ignored.
    fn index_of(&self, color: Color) -> u8;

    /// Like [`index_of`](Self::index_of) but never answers `reserved`,
    /// unless the table holds nothing else.
    fn index_avoiding(&self, color: Color, reserved: u8) -> u8 {
        let index = self.index_of(color);
        if index != reserved {
            return index;
        }
        nearest(self.color_table(), color, Some(reserved)).unwrap_or(index)
    }
}

/// Produces a quantization for an image.
pub trait QuantizationStrategy {
    fn quantize(&self, image: &Image, max_colors: usize) -> Arc<dyn ColorQuantization>;
}

fn rgb_key(color: Color) -> (u8, u8, u8) {
    (color.red, color.green, color.blue)
}

fn distance(a: Color, b: Color) -> u32 {
    let dr = a.red as i32 - b.red as i32;
    let dg = a.green as i32 - b.green as i32;
    let db = a.blue as i32 - b.blue as i32;
    (dr * dr + dg * dg + db * db) as u32
}

/// Closest entry by squared RGB distance, lowest index on ties.
fn nearest(table: &ColorTable, color: Color, skip: Option<u8>) -> Option<u8> {
    table
        .colors()
        .iter()
        .enumerate()
        .filter(|(index, _)| Some(*index as u8) != skip)
        .min_by_key(|(index, entry)| (distance(**entry, color), *index))
        .map(|(index, _)| index as u8)
}

/// Fixed table: exact matches first, otherwise the nearest entry (lowest
/// index on ties).
#[derive(Debug, Clone)]
pub struct PaletteQuantization {
    table: ColorTable,
    lookup: HashMap<(u8, u8, u8), u8>,
}

impl PaletteQuantization {
    pub fn new(table: ColorTable) -> Self {
        let mut lookup = HashMap::with_capacity(table.len());
        for (index, &color) in table.colors().iter().enumerate() {
            lookup.entry(rgb_key(color)).or_insert(index as u8);
        }
        PaletteQuantization { table, lookup }
    }
}

impl ColorQuantization for PaletteQuantization {
    fn color_table(&self) -> &ColorTable {
        &self.table
    }

    fn index_of(&self, color: Color) -> u8 {
        if let Some(&index) = self.lookup.get(&rgb_key(color)) {
            return index;
        }
        nearest(&self.table, color, None).unwrap_or(0)
    }
}

/// Keeps the most frequent opaque colors of an image.
#[derive(Debug, Default, Clone, Copy)]
pub struct PopularityQuantizer;

impl QuantizationStrategy for PopularityQuantizer {
    fn quantize(&self, image: &Image, max_colors: usize) -> Arc<dyn ColorQuantization> {
        let mut histogram: HashMap<(u8, u8, u8), usize> = HashMap::new();
        for color in image.pixels().iter().filter(|c| !c.is_transparent()) {
            *histogram.entry(rgb_key(*color)).or_default() += 1;
        }
        let mut ranked: Vec<((u8, u8, u8), usize)> = histogram.into_iter().collect();
        ranked.sort_by(|(a, count_a), (b, count_b)| count_b.cmp(count_a).then(a.cmp(b)));

        let limit = max_colors.clamp(1, crate::types::MAX_COLORS);
        let mut colors: Vec<Color> = ranked
            .into_iter()
            .take(limit)
            .map(|((r, g, b), _)| Color::rgb(r, g, b))
            .collect();
        if colors.is_empty() {
            colors.push(Color::BLACK);
        }
        // `limit` caps the table at 256 entries.
        let table = ColorTable::new(colors).unwrap_or_default();
        Arc::new(PaletteQuantization::new(table))
    }
}

/// Wraps a quantization and appends one entry reserved for transparency.
#[derive(Debug)]
pub struct TransparentSlot {
    inner: Arc<dyn ColorQuantization>,
    table: ColorTable,
}

impl TransparentSlot {
    /// Fails when the wrapped table already holds 256 colors.
    pub fn new(inner: Arc<dyn ColorQuantization>) -> Result<Self> {
        let mut colors = inner.color_table().colors().to_vec();
        colors.push(Color::TRANSPARENT);
        let table = ColorTable::new(colors)?;
        Ok(TransparentSlot { inner, table })
    }

    pub fn transparent_index(&self) -> u8 {
        (self.table.len() - 1) as u8
    }
}

impl ColorQuantization for TransparentSlot {
    fn color_table(&self) -> &ColorTable {
        &self.table
    }

    fn index_of(&self, color: Color) -> u8 {
        self.inner.index_of(color)
    }
}
