use nom::error::{ErrorKind, ParseError};
use nom::ErrorConvert;
use thiserror::Error;

/// Errors reported while encoding or decoding a GIF.
#[derive(Debug, Error)]
pub enum GifError {
    #[error("Invalid header! Expected \"GIF89a\" or \"GIF87a\"")]
    InvalidHeader,

    #[error("Unexpected end of data")]
    UnexpectedEndOfData,

    #[error("Declared color table size is inconsistent with the available data")]
    InvalidColorTableSize,

    #[error("LZW code {0} references a dictionary entry that does not exist")]
    InvalidLzwCode(u16),

    #[error("Frame has neither a local nor a global color quantization")]
    MissingQuantization,

    #[error("Read of {requested} bits at bit {position} is past the end of the stream ({len} bits)")]
    OutOfRange {
        position: usize,
        requested: u32,
        len: usize,
    },

    #[error("LZW Min Code Size of {0} is invalid! Only 2 to 8 inclusive is allowed!")]
    InvalidMinCodeSize(u8),

    #[error("Palette index {index} does not fit a palette of {color_count} colors")]
    IndexOutOfPalette { index: u8, color_count: usize },

    #[error("Color table holds {0} colors, at most 256 are allowed")]
    ColorTableTooLarge(usize),

    #[error("Malformed block ({0:?})")]
    MalformedBlock(ErrorKind),

    #[error("Unsupported block introducer {0:#x}")]
    UnexpectedBlock(u8),

    #[error("Image data found without an active color table")]
    MissingColorTable,

    #[error("Color index {0} is outside the active color table")]
    ColorIndexOutOfRange(u8),

    #[error("Image data holds {actual} pixels, expected {expected}")]
    MissingPixelData { expected: usize, actual: usize },

    #[error("Frame image is {image_width}x{image_height} but its descriptor says {width}x{height}")]
    FrameSizeMismatch {
        width: u16,
        height: u16,
        image_width: usize,
        image_height: usize,
    },

    #[error("Background index {index} is outside the frame's {color_count} color table and the frame has no transparent index")]
    BackgroundOutOfPalette { index: u8, color_count: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GifError>;

// Lets the nom parsers speak GifError directly, both at byte and bit level.
impl<I> ParseError<I> for GifError {
    fn from_error_kind(_input: I, kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Eof | ErrorKind::Complete => GifError::UnexpectedEndOfData,
            kind => GifError::MalformedBlock(kind),
        }
    }

    fn append(_input: I, _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

impl ErrorConvert<GifError> for GifError {
    fn convert(self) -> GifError {
        self
    }
}

impl From<nom::Err<GifError>> for GifError {
    fn from(err: nom::Err<GifError>) -> Self {
        match err {
            nom::Err::Incomplete(_) => GifError::UnexpectedEndOfData,
            nom::Err::Error(e) | nom::Err::Failure(e) => e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eof_maps_to_unexpected_end() {
        let err = <GifError as ParseError<&[u8]>>::from_error_kind(&[][..], ErrorKind::Eof);
        assert!(matches!(err, GifError::UnexpectedEndOfData));
    }

    #[test]
    fn tag_mismatch_is_malformed() {
        let err = <GifError as ParseError<&[u8]>>::from_error_kind(&[1u8][..], ErrorKind::Tag);
        assert!(matches!(err, GifError::MalformedBlock(ErrorKind::Tag)));
    }

    #[test]
    fn incomplete_is_unexpected_end() {
        let err: GifError = nom::Err::<GifError>::Incomplete(nom::Needed::Unknown).into();
        assert!(matches!(err, GifError::UnexpectedEndOfData));
    }
}
