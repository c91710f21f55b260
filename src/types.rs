use std::sync::Arc;

use crate::errors::{GifError, Result};
use crate::image::Image;
use crate::quantize::{ColorQuantization, QuantizationStrategy, TransparentSlot};

/// Most colors a GIF color table can hold.
pub const MAX_COLORS: usize = 256;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum GifVersion {
    Gif87a,
    Gif89a,
}

impl GifVersion {
    pub fn from_signature(signature: &[u8]) -> Option<GifVersion> {
        match signature {
            b"GIF89a" => Some(GifVersion::Gif89a),
            b"GIF87a" => Some(GifVersion::Gif87a),
            _ => None,
        }
    }
}

/// RGBA color. GIF has no real alpha: anything below 128 counts as
/// transparent, the rest as opaque.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const TRANSPARENT: Color = Color::new(0, 0, 0, 0);

    pub const fn new(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Color {
            red,
            green,
            blue,
            alpha,
        }
    }

    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Color::new(red, green, blue, 255)
    }

    pub fn is_transparent(&self) -> bool {
        self.alpha < 128
    }
}

/// Up to 256 colors. Serialized tables are padded with black up to the next
/// power of two, at least 2 entries.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ColorTable {
    colors: Vec<Color>,
}

impl ColorTable {
    pub fn new(colors: Vec<Color>) -> Result<Self> {
        if colors.len() > MAX_COLORS {
            return Err(GifError::ColorTableTooLarge(colors.len()));
        }
        Ok(ColorTable { colors })
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    pub fn get(&self, index: usize) -> Option<Color> {
        self.colors.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Entry count once serialized.
    pub fn padded_len(&self) -> usize {
        self.colors.len().max(2).next_power_of_two()
    }

    /// The 3-bit size field: `log2(padded_len) - 1`.
    pub fn size_field(&self) -> u8 {
        (self.padded_len().trailing_zeros() - 1) as u8
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct LogicalScreenDescriptor {
    pub canvas_width: u16,
    pub canvas_height: u16,

    pub global_color_table_flag: bool,
    pub color_resolution: u8,
    pub sort_flag: bool,
    pub global_color_table_size: u8,

    pub background_color_index: u8,
    pub pixel_aspect_ratio: u8,
}

impl LogicalScreenDescriptor {
    pub fn new(canvas_width: u16, canvas_height: u16) -> Self {
        LogicalScreenDescriptor {
            canvas_width,
            canvas_height,
            global_color_table_flag: false,
            color_resolution: 7,
            sort_flag: false,
            global_color_table_size: 0,
            background_color_index: 0,
            pixel_aspect_ratio: 0,
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
#[repr(u8)]
pub enum DisposalMethod {
    #[default]
    NoDisposal = 0,
    DoNotDispose = 1,
    ClearCanvas = 2,
    RestoreToPrevious = 3,
}

impl DisposalMethod {
    pub fn from_u8(value: u8) -> Option<DisposalMethod> {
        match value {
            0 => Some(DisposalMethod::NoDisposal),
            1 => Some(DisposalMethod::DoNotDispose),
            2 => Some(DisposalMethod::ClearCanvas),
            3 => Some(DisposalMethod::RestoreToPrevious),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct GraphicsControlExtension {
    pub disposal_method: DisposalMethod,
    pub user_input_flag: bool,
    pub transparent_color_flag: bool,
    /// Hundredths of a second.
    pub delay_time: u16,
    pub transparent_color_index: u8,
}

impl GraphicsControlExtension {
    pub fn transparent_index(&self) -> Option<u8> {
        self.transparent_color_flag
            .then_some(self.transparent_color_index)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct ImageDescriptor {
    pub left: u16,
    pub top: u16,
    pub width: u16,
    pub height: u16,
    pub local_color_table_flag: bool,
    pub interlace_flag: bool,
    pub sort_flag: bool,
    pub local_color_table_size: u8,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ApplicationExtension {
    /// NETSCAPE2.0 looping; a loop count of 0 loops forever.
    Looping { loop_count: u16 },
}

#[derive(Debug, Clone)]
pub struct Frame {
    pub image: Image,
    pub image_descriptor: ImageDescriptor,
    pub graphics_control_extension: Option<GraphicsControlExtension>,
    pub local_quantization: Option<Arc<dyn ColorQuantization>>,
}

impl Frame {
    /// Frame covering `image` at the canvas origin, cleared after display,
    /// without delay or transparency.
    pub fn new(image: Image) -> Self {
        let image_descriptor = ImageDescriptor {
            left: 0,
            top: 0,
            width: u16::try_from(image.width()).unwrap_or(u16::MAX),
            height: u16::try_from(image.height()).unwrap_or(u16::MAX),
            local_color_table_flag: false,
            interlace_flag: false,
            sort_flag: false,
            local_color_table_size: 0,
        };
        let graphics_control_extension = GraphicsControlExtension {
            disposal_method: DisposalMethod::ClearCanvas,
            user_input_flag: false,
            transparent_color_flag: false,
            delay_time: 0,
            transparent_color_index: 0,
        };
        Frame::from_parts(image, image_descriptor, Some(graphics_control_extension), None)
    }

    pub fn from_parts(
        image: Image,
        image_descriptor: ImageDescriptor,
        graphics_control_extension: Option<GraphicsControlExtension>,
        local_quantization: Option<Arc<dyn ColorQuantization>>,
    ) -> Self {
        Frame {
            image,
            image_descriptor,
            graphics_control_extension,
            local_quantization,
        }
    }

    fn control_mut(&mut self) -> &mut GraphicsControlExtension {
        self.graphics_control_extension
            .get_or_insert(GraphicsControlExtension {
                disposal_method: DisposalMethod::NoDisposal,
                user_input_flag: false,
                transparent_color_flag: false,
                delay_time: 0,
                transparent_color_index: 0,
            })
    }

    pub fn with_delay_time(mut self, delay_time: u16) -> Self {
        self.control_mut().delay_time = delay_time;
        self
    }

    pub fn with_disposal_method(mut self, disposal_method: DisposalMethod) -> Self {
        self.control_mut().disposal_method = disposal_method;
        self
    }

    /// Marks `index` as transparent. [`Animation::quantize_frames`] moves
    /// it to a slot of its own when it builds this frame's table.
    pub fn with_transparent_index(mut self, index: u8) -> Self {
        let control = self.control_mut();
        control.transparent_color_flag = true;
        control.transparent_color_index = index;
        self
    }

    pub fn with_position(mut self, left: u16, top: u16) -> Self {
        self.image_descriptor.left = left;
        self.image_descriptor.top = top;
        self
    }

    pub fn with_interlacing(mut self, interlace: bool) -> Self {
        self.image_descriptor.interlace_flag = interlace;
        self
    }

    pub fn with_local_quantization(mut self, quantization: Arc<dyn ColorQuantization>) -> Self {
        self.set_local_quantization(quantization);
        self
    }

    pub fn set_local_quantization(&mut self, quantization: Arc<dyn ColorQuantization>) {
        self.image_descriptor.local_color_table_flag = true;
        self.image_descriptor.local_color_table_size = quantization.color_table().size_field();
        self.local_quantization = Some(quantization);
    }

    pub fn delay_time(&self) -> Option<u16> {
        self.graphics_control_extension.map(|g| g.delay_time)
    }

    pub fn disposal_method(&self) -> Option<DisposalMethod> {
        self.graphics_control_extension.map(|g| g.disposal_method)
    }
}

#[derive(Debug, Clone)]
pub struct Animation {
    pub logical_screen_descriptor: LogicalScreenDescriptor,
    pub global_quantization: Option<Arc<dyn ColorQuantization>>,
    pub application_extensions: Vec<ApplicationExtension>,
    pub frames: Vec<Frame>,
}

impl Animation {
    /// Empty animation that loops forever.
    pub fn new(canvas_width: u16, canvas_height: u16) -> Self {
        Animation {
            logical_screen_descriptor: LogicalScreenDescriptor::new(canvas_width, canvas_height),
            global_quantization: None,
            application_extensions: vec![ApplicationExtension::Looping { loop_count: 0 }],
            frames: Vec::new(),
        }
    }

    pub fn set_global_quantization(&mut self, quantization: Arc<dyn ColorQuantization>) {
        let lsd = &mut self.logical_screen_descriptor;
        lsd.global_color_table_flag = true;
        lsd.global_color_table_size = quantization.color_table().size_field();
        self.global_quantization = Some(quantization);
    }

    pub fn loop_count(&self) -> Option<u16> {
        self.application_extensions.iter().find_map(|ext| match ext {
            ApplicationExtension::Looping { loop_count } => Some(*loop_count),
        })
    }

    /// Attaches a local quantization from `strategy` to every frame that
    /// would otherwise have no color table. Frames with transparency get a
    /// reserved transparent slot after the strategy's colors.
    pub fn quantize_frames<S>(&mut self, strategy: &S) -> Result<()>
    where
        S: QuantizationStrategy + ?Sized,
    {
        if self.global_quantization.is_some() {
            return Ok(());
        }
        for frame in self.frames.iter_mut() {
            if frame.local_quantization.is_some() {
                continue;
            }
            let transparent = frame
                .graphics_control_extension
                .is_some_and(|g| g.transparent_color_flag);
            if transparent {
                let slot = TransparentSlot::new(strategy.quantize(&frame.image, MAX_COLORS - 1))?;
                frame.control_mut().transparent_color_index = slot.transparent_index();
                frame.set_local_quantization(Arc::new(slot));
            } else {
                frame.set_local_quantization(strategy.quantize(&frame.image, MAX_COLORS));
            }
        }
        Ok(())
    }
}
