//! Animated GIF encoding and decoding.
//!
//! [`Animation`] is the in-memory model shared by both directions. Decode
//! with [`Animation::from_bytes`] or [`decoder::load`], encode with
//! [`Animation::encoded`] or [`encoder::save`].
pub mod bitstream;
pub mod decoder;
pub mod encoder;
pub mod errors;
pub mod image;
pub mod interlace;
pub mod lzw;
pub mod packed;
pub mod quantize;
pub mod render;
pub mod types;

pub use errors::{GifError, Result};
pub use image::Image;
pub use quantize::{
    ColorQuantization, PaletteQuantization, PopularityQuantizer, QuantizationStrategy,
    TransparentSlot,
};
pub use render::{render_frames, Compositor};
pub use types::{
    Animation, ApplicationExtension, Color, ColorTable, DisposalMethod, Frame, GifVersion,
    GraphicsControlExtension, ImageDescriptor, LogicalScreenDescriptor,
};
