//! Parses a GIF byte buffer into an [`Animation`].
use std::path::Path;
use std::sync::Arc;

mod parser;
pub use parser::{Block, ImageBlock};

use crate::errors::{GifError, Result};
use crate::image::Image;
use crate::interlace::row_order;
use crate::lzw;
use crate::quantize::{ColorQuantization, PaletteQuantization};
use crate::types::{Animation, Color, Frame, GraphicsControlExtension};
use parser::*;

/// Reads a whole file and decodes it.
pub fn load(filename: impl AsRef<Path>) -> Result<Animation> {
    let buffer = std::fs::read(filename)?;
    Animation::from_bytes(&buffer)
}

fn palette(table: crate::types::ColorTable) -> Arc<dyn ColorQuantization> {
    Arc::new(PaletteQuantization::new(table))
}

fn build_frame(
    block: ImageBlock,
    graphics_control_extension: Option<GraphicsControlExtension>,
    global_quantization: Option<&Arc<dyn ColorQuantization>>,
) -> Result<Frame> {
    let descriptor = block.image_descriptor;
    let indices = lzw::decompress(&block.data, block.min_code_size)?;

    let width = descriptor.width as usize;
    let height = descriptor.height as usize;
    let expected = width * height;
    if indices.len() < expected {
        return Err(GifError::MissingPixelData {
            expected,
            actual: indices.len(),
        });
    }
    if indices.len() > expected {
        log::warn!(
            "Ignoring {} surplus pixels in frame data",
            indices.len() - expected
        );
    }

    let local_quantization = block.local_color_table.map(palette);
    let table = match (&local_quantization, global_quantization) {
        (Some(local), _) => local.color_table(),
        (None, Some(global)) => global.color_table(),
        (None, None) => return Err(GifError::MissingColorTable),
    };
    let transparent_index = graphics_control_extension.and_then(|g| g.transparent_index());

    let mut image = Image::new(width, height);
    if width > 0 {
        let rows = row_order(height, descriptor.interlace_flag);
        for (row, line) in rows.into_iter().zip(indices.chunks_exact(width)) {
            for (column, &index) in line.iter().enumerate() {
                let color = if Some(index) == transparent_index {
                    Color::TRANSPARENT
                } else {
                    table
                        .get(index as usize)
                        .ok_or(GifError::ColorIndexOutOfRange(index))?
                };
                image[(row, column)] = color;
            }
        }
    }

    Ok(Frame::from_parts(
        image,
        descriptor,
        graphics_control_extension,
        local_quantization,
    ))
}

impl Animation {
    /// Decodes a complete GIF held in memory.
    pub fn from_bytes(bytes: &[u8]) -> Result<Animation> {
        let (bytes, version) = parse_header(bytes)?;
        let (bytes, logical_screen_descriptor) = parse_logical_screen_descriptor(bytes)?;
        let (mut bytes, global_color_table) =
            parse_global_color_table(bytes, &logical_screen_descriptor)?;
        log::debug!(
            "{:?} {}x{}, global color table: {}",
            version,
            logical_screen_descriptor.canvas_width,
            logical_screen_descriptor.canvas_height,
            global_color_table.as_ref().map_or(0, |t| t.len())
        );

        let global_quantization = global_color_table.map(palette);
        let mut application_extensions = Vec::new();
        let mut frames = Vec::new();
        let mut pending_control = None;

        loop {
            let (rest, block) = parse_block(bytes)?;
            bytes = rest;
            match block {
                Block::GraphicsControl(gce) => pending_control = Some(gce),
                Block::Application(ext) => application_extensions.push(ext),
                Block::Skipped { .. } => {}
                Block::Image(image_block) => {
                    let frame = build_frame(
                        image_block,
                        pending_control.take(),
                        global_quantization.as_ref(),
                    )?;
                    log::debug!("Decoded frame {}", frames.len());
                    frames.push(frame);
                }
                Block::Trailer => break,
            }
        }

        Ok(Animation {
            logical_screen_descriptor,
            global_quantization,
            application_extensions,
            frames,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ApplicationExtension, DisposalMethod};

    // "What's in a GIF" sample: 10x10, global table of 4 colors.
    const SAMPLE: [u8; 66] = [
        0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x0A, 0x00, 0x0A, 0x00, 0x91, 0x00, 0x00, 0xFF,
        0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00, 0xFF, 0x00, 0x00, 0x00, 0x21, 0xF9, 0x04,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00, 0x00, 0x00, 0x0A, 0x00, 0x0A, 0x00,
        0x00, 0x02, 0x16, 0x8C, 0x2D, 0x99, 0x87, 0x2A, 0x1C, 0xDC, 0x33, 0xA0, 0x02, 0x75,
        0xEC, 0x95, 0xFA, 0xA8, 0xDE, 0x60, 0x8C, 0x04, 0x91, 0x4C,
    ];

    fn sample() -> Vec<u8> {
        let mut bytes = SAMPLE.to_vec();
        bytes.extend_from_slice(&[0x01, 0x00, 0x3B]);
        bytes
    }

    #[test]
    fn decodes_sample() {
        let animation = Animation::from_bytes(&sample()).unwrap();
        assert_eq!(animation.logical_screen_descriptor.canvas_width, 10);
        assert_eq!(animation.frames.len(), 1);
        assert!(animation.application_extensions.is_empty());

        let frame = &animation.frames[0];
        assert_eq!(frame.delay_time(), Some(0));
        assert_eq!(frame.disposal_method(), Some(DisposalMethod::NoDisposal));
        let red = Color::rgb(0xFF, 0, 0);
        let blue = Color::rgb(0, 0, 0xFF);
        let white = Color::rgb(0xFF, 0xFF, 0xFF);
        assert_eq!(frame.image[(0, 0)], red);
        assert_eq!(frame.image[(0, 5)], blue);
        assert_eq!(frame.image[(3, 3)], white);
        assert_eq!(frame.image[(9, 9)], red);
    }

    #[test]
    fn frame_without_any_table() {
        let mut bytes = sample();
        // Drop the global table flag and its 12 bytes.
        bytes[10] = 0x00;
        bytes.drain(13..25);
        assert!(matches!(
            Animation::from_bytes(&bytes),
            Err(GifError::MissingColorTable)
        ));
    }

    #[test]
    fn transparent_index_decodes_transparent() {
        let mut bytes = sample();
        // Transparency flag on, index 1 (red).
        bytes[28] = 0x01;
        bytes[31] = 0x01;
        let animation = Animation::from_bytes(&bytes).unwrap();
        let image = &animation.frames[0].image;
        assert_eq!(image[(0, 0)], Color::TRANSPARENT);
        assert_eq!(image[(0, 5)], Color::rgb(0, 0, 0xFF));
    }

    #[test]
    fn too_few_pixels() {
        let mut bytes = sample();
        // Claim an 11 pixel tall image.
        bytes[40] = 0x0B;
        assert!(matches!(
            Animation::from_bytes(&bytes),
            Err(GifError::MissingPixelData {
                expected: 110,
                actual: 100
            })
        ));
    }

    #[test]
    fn missing_trailer() {
        let mut bytes = sample();
        bytes.pop();
        assert!(matches!(
            Animation::from_bytes(&bytes),
            Err(GifError::UnexpectedEndOfData)
        ));
    }

    #[test]
    fn looping_extension_is_kept() {
        let mut bytes = sample();
        let mut ext = vec![0x21, 0xFF, 0x0B];
        ext.extend_from_slice(b"NETSCAPE2.0");
        ext.extend_from_slice(&[0x03, 0x01, 0x02, 0x00, 0x00]);
        bytes.splice(25..25, ext);
        let animation = Animation::from_bytes(&bytes).unwrap();
        assert_eq!(
            animation.application_extensions,
            vec![ApplicationExtension::Looping { loop_count: 2 }]
        );
        assert_eq!(animation.loop_count(), Some(2));
    }
}
