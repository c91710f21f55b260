//! Serializes an [`Animation`] into GIF89a bytes.
//!
//! See <http://giflib.sourceforge.net/whatsinagif/bits_and_bytes.html> for
//! the block layout.
use std::path::Path;
use std::sync::Arc;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::errors::{GifError, Result};
use crate::interlace::row_order;
use crate::lzw::{Compressed, LzwEncoder};
use crate::packed::PackedField;
use crate::quantize::ColorQuantization;
use crate::types::{
    Animation, ApplicationExtension, ColorTable, Frame, GraphicsControlExtension,
    ImageDescriptor, LogicalScreenDescriptor,
};

const SIGNATURE: &[u8] = b"GIF89a";
const EXTENSION_INTRODUCER: u8 = 0x21;
const GRAPHICS_CONTROL_LABEL: u8 = 0xF9;
const APPLICATION_LABEL: u8 = 0xFF;
const IMAGE_SEPARATOR: u8 = 0x2C;
const BLOCK_TERMINATOR: u8 = 0x00;
const TRAILER: u8 = 0x3B;
const MAX_SUB_BLOCK_LEN: usize = 0xFF;

/// Append-only GIF byte sink.
#[derive(Debug, Default)]
struct GifWriter {
    data: Vec<u8>,
}

impl GifWriter {
    fn append_byte(&mut self, byte: u8) {
        self.data.push(byte);
    }

    fn append_short(&mut self, short: u16) {
        self.data.extend_from_slice(&short.to_le_bytes());
    }

    fn append_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    fn append_packed(&mut self, packed_field: PackedField) {
        self.append_byte(packed_field.byte());
    }

    fn append_header(&mut self) {
        self.append_bytes(SIGNATURE);
    }

    fn append_logical_screen_descriptor(
        &mut self,
        lsd: &LogicalScreenDescriptor,
        global_table: Option<&ColorTable>,
    ) {
        self.append_short(lsd.canvas_width);
        self.append_short(lsd.canvas_height);
        self.append_packed(
            PackedField::new()
                .push_flag(global_table.is_some())
                .push(lsd.color_resolution, 3)
                .push_flag(lsd.sort_flag)
                .push(global_table.map_or(0, ColorTable::size_field), 3),
        );
        self.append_byte(lsd.background_color_index);
        self.append_byte(lsd.pixel_aspect_ratio);
    }

    fn append_color_table(&mut self, table: &ColorTable) {
        log::debug!(
            "Appending color table of {} colors ({} padded)",
            table.len(),
            table.padded_len()
        );
        for color in table.colors() {
            self.append_bytes(&[color.red, color.green, color.blue]);
        }
        let padding = (table.padded_len() - table.len()) * 3;
        self.data.resize(self.data.len() + padding, 0x00);
    }

    fn append_application_extension(&mut self, extension: &ApplicationExtension) {
        match extension {
            ApplicationExtension::Looping { loop_count } => {
                self.append_byte(EXTENSION_INTRODUCER);
                self.append_byte(APPLICATION_LABEL);
                self.append_byte(0x0B);
                self.append_bytes(b"NETSCAPE2.0");
                self.append_byte(0x03);
                self.append_byte(0x01); // loop sub-block id
                self.append_short(*loop_count);
                self.append_byte(BLOCK_TERMINATOR);
            }
        }
    }

    fn append_graphics_control_extension(&mut self, gce: &GraphicsControlExtension) {
        self.append_byte(EXTENSION_INTRODUCER);
        self.append_byte(GRAPHICS_CONTROL_LABEL);
        self.append_byte(0x04);
        self.append_packed(
            PackedField::new()
                .push(0, 3)
                .push(gce.disposal_method as u8, 3)
                .push_flag(gce.user_input_flag)
                .push_flag(gce.transparent_color_flag),
        );
        self.append_short(gce.delay_time);
        self.append_byte(gce.transparent_color_index);
        self.append_byte(BLOCK_TERMINATOR);
    }

    fn append_image_descriptor(
        &mut self,
        descriptor: &ImageDescriptor,
        local_table: Option<&ColorTable>,
    ) {
        self.append_byte(IMAGE_SEPARATOR);
        self.append_short(descriptor.left);
        self.append_short(descriptor.top);
        self.append_short(descriptor.width);
        self.append_short(descriptor.height);
        self.append_packed(
            PackedField::new()
                .push_flag(local_table.is_some())
                .push_flag(descriptor.interlace_flag)
                .push_flag(descriptor.sort_flag)
                .push(0, 2)
                .push(local_table.map_or(0, ColorTable::size_field), 3),
        );
    }

    fn append_sub_blocks(&mut self, payload: &[u8]) {
        for chunk in payload.chunks(MAX_SUB_BLOCK_LEN) {
            self.append_byte(chunk.len() as u8);
            self.append_bytes(chunk);
        }
        self.append_byte(BLOCK_TERMINATOR);
    }

    fn append_image_data(&mut self, compressed: &Compressed) {
        self.append_byte(compressed.min_code_size);
        self.append_sub_blocks(&compressed.data);
    }

    fn append_trailer(&mut self) {
        self.append_byte(TRAILER);
    }
}

/// Where pixels with alpha below 128 go.
#[derive(Debug, Clone, Copy)]
enum TransparentTarget {
    /// The control extension's transparent index; opaque pixels stay off it.
    Reserved(u8),
    /// No transparency declared, fall back to the screen background.
    Background(u8),
}

/// Maps every pixel to a palette index, in stream row order, and LZW
/// encodes the result.
fn compress_frame(
    frame: &Frame,
    quantization: &dyn ColorQuantization,
    transparent: TransparentTarget,
) -> Result<Compressed> {
    let descriptor = &frame.image_descriptor;
    let image = &frame.image;
    if image.width() != descriptor.width as usize || image.height() != descriptor.height as usize {
        return Err(GifError::FrameSizeMismatch {
            width: descriptor.width,
            height: descriptor.height,
            image_width: image.width(),
            image_height: image.height(),
        });
    }

    let color_count = quantization.color_table().padded_len();
    if let TransparentTarget::Background(index) = transparent {
        if index as usize >= color_count && image.pixels().iter().any(|c| c.is_transparent()) {
            return Err(GifError::BackgroundOutOfPalette { index, color_count });
        }
    }

    let mut encoder = LzwEncoder::new(color_count)?;
    for row in row_order(image.height(), descriptor.interlace_flag) {
        for column in 0..image.width() {
            let color = image[(row, column)];
            let index = match transparent {
                TransparentTarget::Reserved(index) | TransparentTarget::Background(index)
                    if color.is_transparent() =>
                {
                    index
                }
                TransparentTarget::Reserved(index) => quantization.index_avoiding(color, index),
                TransparentTarget::Background(_) => quantization.index_of(color),
            };
            encoder.push(index)?;
        }
    }
    Ok(encoder.finish())
}

/// Bytes of one frame: control extension, descriptor, local table and image
/// data. Frames share no state, so these may be produced in any order.
fn encode_frame(
    frame: &Frame,
    lsd: &LogicalScreenDescriptor,
    global_quantization: Option<&Arc<dyn ColorQuantization>>,
) -> Result<Vec<u8>> {
    let local_table = frame.local_quantization.as_ref().map(|q| q.color_table());
    let quantization = frame
        .local_quantization
        .as_ref()
        .or(global_quantization)
        .ok_or(GifError::MissingQuantization)?;
    let transparent = match frame
        .graphics_control_extension
        .and_then(|g| g.transparent_index())
    {
        Some(index) => TransparentTarget::Reserved(index),
        None => TransparentTarget::Background(lsd.background_color_index),
    };

    let mut writer = GifWriter::default();
    if let Some(gce) = &frame.graphics_control_extension {
        writer.append_graphics_control_extension(gce);
    }
    writer.append_image_descriptor(&frame.image_descriptor, local_table);
    if let Some(table) = local_table {
        writer.append_color_table(table);
    }

    let compressed = compress_frame(frame, quantization.as_ref(), transparent)?;
    log::debug!(
        "LZW-encoded a {}x{} frame, min code size {}, {} bytes",
        frame.image.width(),
        frame.image.height(),
        compressed.min_code_size,
        compressed.data.len()
    );
    writer.append_image_data(&compressed);
    Ok(writer.data)
}

#[cfg(not(feature = "parallel"))]
fn encode_frames(animation: &Animation) -> Result<Vec<Vec<u8>>> {
    let global = animation.global_quantization.as_ref();
    animation
        .frames
        .iter()
        .map(|frame| encode_frame(frame, &animation.logical_screen_descriptor, global))
        .collect()
}

// Frame bodies are built concurrently and concatenated in frame order.
#[cfg(feature = "parallel")]
fn encode_frames(animation: &Animation) -> Result<Vec<Vec<u8>>> {
    let global = animation.global_quantization.as_ref();
    animation
        .frames
        .par_iter()
        .map(|frame| encode_frame(frame, &animation.logical_screen_descriptor, global))
        .collect()
}

/// Encodes `animation` into a complete GIF89a byte stream.
pub fn encode(animation: &Animation) -> Result<Vec<u8>> {
    let global_table = animation
        .global_quantization
        .as_ref()
        .map(|q| q.color_table());

    let mut writer = GifWriter::default();
    writer.append_header();
    writer.append_logical_screen_descriptor(&animation.logical_screen_descriptor, global_table);
    if let Some(table) = global_table {
        writer.append_color_table(table);
    }
    for extension in &animation.application_extensions {
        writer.append_application_extension(extension);
    }
    for body in encode_frames(animation)? {
        writer.append_bytes(&body);
    }
    writer.append_trailer();
    Ok(writer.data)
}

/// Encodes `animation` and writes it to `filename`.
pub fn save(animation: &Animation, filename: impl AsRef<Path>) -> Result<()> {
    std::fs::write(filename, encode(animation)?)?;
    Ok(())
}

impl Animation {
    pub fn encoded(&self) -> Result<Vec<u8>> {
        encode(self)
    }
}
