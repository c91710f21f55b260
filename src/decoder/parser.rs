use nom::bits;
use nom::bytes::complete::take;
use nom::combinator::map;
use nom::error::ErrorKind;
use nom::multi::count;
use nom::number::complete::{le_u16, le_u8};
use nom::IResult;

use crate::errors::GifError;
use crate::types::{
    ApplicationExtension, Color, ColorTable, DisposalMethod, GifVersion, GraphicsControlExtension,
    ImageDescriptor, LogicalScreenDescriptor,
};

// Thanks https://blog.adamchalmers.com/nom-bits/
type BitInput<'a> = (&'a [u8], usize);
type ParseResult<'a, T> = IResult<&'a [u8], T, GifError>;

const EXTENSION_INTRODUCER: u8 = 0x21;
const IMAGE_SEPARATOR: u8 = 0x2C;
const TRAILER: u8 = 0x3B;
const BLOCK_TERMINATOR: u8 = 0x00;

fn fail<T>(err: GifError) -> Result<T, nom::Err<GifError>> {
    Err(nom::Err::Failure(err))
}

fn take_bits<'a>(count: usize) -> impl Fn(BitInput<'a>) -> IResult<BitInput<'a>, u8, GifError> {
    bits::complete::take(count)
}

fn take_bit(i: BitInput<'_>) -> IResult<BitInput<'_>, bool, GifError> {
    map(take_bits(1), |bits: u8| bits > 0)(i)
}

fn take_color(bytes: &[u8]) -> ParseResult<'_, Color> {
    let (bytes, red) = le_u8(bytes)?;
    let (bytes, green) = le_u8(bytes)?;
    let (bytes, blue) = le_u8(bytes)?;
    Ok((bytes, Color::rgb(red, green, blue)))
}

/// One top-level block after the screen descriptor and global table.
#[derive(Debug, PartialEq, Eq)]
pub enum Block {
    GraphicsControl(GraphicsControlExtension),
    Application(ApplicationExtension),
    /// Extension without meaning to this decoder, skipped by its length.
    Skipped { label: u8 },
    Image(ImageBlock),
    Trailer,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ImageBlock {
    pub image_descriptor: ImageDescriptor,
    pub local_color_table: Option<ColorTable>,
    pub min_code_size: u8,
    /// Concatenated sub-block payload.
    pub data: Vec<u8>,
}

pub fn parse_header(bytes: &[u8]) -> ParseResult<'_, GifVersion> {
    const SIGNATURES: [&[u8]; 2] = [b"GIF89a", b"GIF87a"];
    if bytes.len() < 6 {
        return if SIGNATURES.iter().any(|sig| sig.starts_with(bytes)) {
            fail(GifError::UnexpectedEndOfData)
        } else {
            fail(GifError::InvalidHeader)
        };
    }
    let (bytes, magic) = take(6usize)(bytes)?;
    match GifVersion::from_signature(magic) {
        Some(version) => Ok((bytes, version)),
        None => fail(GifError::InvalidHeader),
    }
}

pub fn parse_logical_screen_descriptor(bytes: &[u8]) -> ParseResult<'_, LogicalScreenDescriptor> {
    struct PackedField {
        global_color_table_flag: bool,
        color_resolution: u8,
        sort_flag: bool,
        global_color_table_size: u8,
    }

    fn parse_packed_field(bits: BitInput<'_>) -> IResult<BitInput<'_>, PackedField, GifError> {
        let (bits, global_color_table_flag) = take_bit(bits)?;
        let (bits, color_resolution) = take_bits(3)(bits)?;
        let (bits, sort_flag) = take_bit(bits)?;
        let (bits, global_color_table_size) = take_bits(3)(bits)?;
        Ok((
            bits,
            PackedField {
                global_color_table_flag,
                color_resolution,
                sort_flag,
                global_color_table_size,
            },
        ))
    }

    let (bytes, canvas_width) = le_u16(bytes)?;
    let (bytes, canvas_height) = le_u16(bytes)?;
    let (bytes, packed_field) = bits::bits(parse_packed_field)(bytes)?;
    let (bytes, background_color_index) = le_u8(bytes)?;
    let (bytes, pixel_aspect_ratio) = le_u8(bytes)?;
    Ok((
        bytes,
        LogicalScreenDescriptor {
            canvas_width,
            canvas_height,

            global_color_table_flag: packed_field.global_color_table_flag,
            color_resolution: packed_field.color_resolution,
            sort_flag: packed_field.sort_flag,
            global_color_table_size: packed_field.global_color_table_size,

            background_color_index,
            pixel_aspect_ratio,
        },
    ))
}

/// A table of `2^(size_field + 1)` RGB triples.
pub fn parse_color_table(bytes: &[u8], size_field: u8) -> ParseResult<'_, ColorTable> {
    // The size field is 3 bits wide, so this is at most 256 colors.
    let num_colors = 1usize << ((size_field & 0b111) + 1);
    if bytes.len() < num_colors * 3 {
        return fail(GifError::InvalidColorTableSize);
    }
    let (bytes, colors) = count(take_color, num_colors)(bytes)?;
    match ColorTable::new(colors) {
        Ok(table) => Ok((bytes, table)),
        Err(err) => fail(err),
    }
}

pub fn parse_global_color_table<'a>(
    bytes: &'a [u8],
    lsd: &LogicalScreenDescriptor,
) -> ParseResult<'a, Option<ColorTable>> {
    if !lsd.global_color_table_flag {
        return Ok((bytes, None));
    }
    let (bytes, table) = parse_color_table(bytes, lsd.global_color_table_size)?;
    Ok((bytes, Some(table)))
}

/// Length-prefixed sub-blocks up to the zero-length terminator, concatenated.
pub fn parse_sub_blocks(bytes: &[u8]) -> ParseResult<'_, Vec<u8>> {
    let mut data = Vec::new();
    let mut bytes = bytes;
    loop {
        let (rest, len) = le_u8(bytes)?;
        if len == 0 {
            return Ok((rest, data));
        }
        let (rest, chunk) = take(len as usize)(rest)?;
        data.extend_from_slice(chunk);
        bytes = rest;
    }
}

fn parse_graphics_control_extension(bytes: &[u8]) -> ParseResult<'_, GraphicsControlExtension> {
    struct PackedField {
        disposal_method: u8,
        user_input_flag: bool,
        transparent_color_flag: bool,
    }

    fn parse_packed_field(bits: BitInput<'_>) -> IResult<BitInput<'_>, PackedField, GifError> {
        let (bits, _reserved) = take_bits(3)(bits)?;
        let (bits, disposal_method) = take_bits(3)(bits)?;
        let (bits, user_input_flag) = take_bit(bits)?;
        let (bits, transparent_color_flag) = take_bit(bits)?;
        Ok((
            bits,
            PackedField {
                disposal_method,
                user_input_flag,
                transparent_color_flag,
            },
        ))
    }

    const GCE_BLOCK_SIZE: u8 = 0x04;
    let (bytes, block_size) = le_u8(bytes)?;
    if block_size != GCE_BLOCK_SIZE {
        return fail(GifError::MalformedBlock(ErrorKind::Tag));
    }
    let (bytes, packed_field) = bits::bits(parse_packed_field)(bytes)?;
    let (bytes, delay_time) = le_u16(bytes)?;
    let (bytes, transparent_color_index) = le_u8(bytes)?;
    let (bytes, terminator) = le_u8(bytes)?;
    if terminator != BLOCK_TERMINATOR {
        return fail(GifError::MalformedBlock(ErrorKind::Tag));
    }

    let disposal_method = DisposalMethod::from_u8(packed_field.disposal_method)
        .unwrap_or_else(|| {
            log::warn!(
                "Reserved disposal method {}, treating it as no disposal",
                packed_field.disposal_method
            );
            DisposalMethod::NoDisposal
        });

    Ok((
        bytes,
        GraphicsControlExtension {
            disposal_method,
            user_input_flag: packed_field.user_input_flag,
            transparent_color_flag: packed_field.transparent_color_flag,
            delay_time,
            transparent_color_index,
        },
    ))
}

fn parse_application_extension(bytes: &[u8]) -> ParseResult<'_, Block> {
    let (bytes, identifier_len) = le_u8(bytes)?;
    let (bytes, identifier) = take(identifier_len as usize)(bytes)?;
    let (bytes, data) = parse_sub_blocks(bytes)?;

    let looping = matches!(identifier, b"NETSCAPE2.0" | b"ANIMEXTS1.0");
    match data.as_slice() {
        [0x01, lo, hi, ..] if looping => Ok((
            bytes,
            Block::Application(ApplicationExtension::Looping {
                loop_count: u16::from_le_bytes([*lo, *hi]),
            }),
        )),
        _ => {
            log::debug!(
                "Skipping application extension {:?}",
                String::from_utf8_lossy(identifier)
            );
            Ok((bytes, Block::Skipped { label: 0xFF }))
        }
    }
}

fn parse_extension(bytes: &[u8]) -> ParseResult<'_, Block> {
    let (bytes, label) = le_u8(bytes)?;
    match label {
        0xF9 => map(parse_graphics_control_extension, Block::GraphicsControl)(bytes),
        0xFF => parse_application_extension(bytes),
        // Comment, plain text and anything unknown: walk the sub-blocks.
        _ => {
            let (bytes, skipped) = parse_sub_blocks(bytes)?;
            log::debug!(
                "Skipping extension {:#x} ({} bytes)",
                label,
                skipped.len()
            );
            Ok((bytes, Block::Skipped { label }))
        }
    }
}

pub fn parse_image_descriptor(bytes: &[u8]) -> ParseResult<'_, ImageDescriptor> {
    struct PackedField {
        local_color_table_flag: bool,
        interlace_flag: bool,
        sort_flag: bool,
        local_color_table_size: u8,
    }

    fn parse_packed_field(bits: BitInput<'_>) -> IResult<BitInput<'_>, PackedField, GifError> {
        let (bits, local_color_table_flag) = take_bit(bits)?;
        let (bits, interlace_flag) = take_bit(bits)?;
        let (bits, sort_flag) = take_bit(bits)?;
        let (bits, _reserved) = take_bits(2)(bits)?;
        let (bits, local_color_table_size) = take_bits(3)(bits)?;
        Ok((
            bits,
            PackedField {
                local_color_table_flag,
                interlace_flag,
                sort_flag,
                local_color_table_size,
            },
        ))
    }

    let (bytes, left) = le_u16(bytes)?;
    let (bytes, top) = le_u16(bytes)?;
    let (bytes, width) = le_u16(bytes)?;
    let (bytes, height) = le_u16(bytes)?;
    let (bytes, packed_field) = bits::bits(parse_packed_field)(bytes)?;
    Ok((
        bytes,
        ImageDescriptor {
            left,
            top,
            width,
            height,
            local_color_table_flag: packed_field.local_color_table_flag,
            interlace_flag: packed_field.interlace_flag,
            sort_flag: packed_field.sort_flag,
            local_color_table_size: packed_field.local_color_table_size,
        },
    ))
}

fn parse_image_block(bytes: &[u8]) -> ParseResult<'_, ImageBlock> {
    let (bytes, image_descriptor) = parse_image_descriptor(bytes)?;
    let (bytes, local_color_table) = if image_descriptor.local_color_table_flag {
        let (bytes, table) = parse_color_table(bytes, image_descriptor.local_color_table_size)?;
        (bytes, Some(table))
    } else {
        (bytes, None)
    };
    let (bytes, min_code_size) = le_u8(bytes)?;
    let (bytes, data) = parse_sub_blocks(bytes)?;
    Ok((
        bytes,
        ImageBlock {
            image_descriptor,
            local_color_table,
            min_code_size,
            data,
        },
    ))
}

pub fn parse_block(bytes: &[u8]) -> ParseResult<'_, Block> {
    let (bytes, introducer) = le_u8(bytes)?;
    match introducer {
        EXTENSION_INTRODUCER => parse_extension(bytes),
        IMAGE_SEPARATOR => map(parse_image_block, Block::Image)(bytes),
        TRAILER => Ok((bytes, Block::Trailer)),
        other => fail(GifError::UnexpectedBlock(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn err_of<T: std::fmt::Debug>(result: ParseResult<'_, T>) -> GifError {
        match result {
            Err(err) => err.into(),
            Ok(ok) => panic!("expected an error, parsed {:?}", ok),
        }
    }

    #[test]
    fn header_versions() {
        assert_eq!(parse_header(b"GIF89a rest").unwrap(), (&b" rest"[..], GifVersion::Gif89a));
        assert_eq!(parse_header(b"GIF87a").unwrap().1, GifVersion::Gif87a);
        assert!(matches!(err_of(parse_header(b"GIF90a")), GifError::InvalidHeader));
        assert!(matches!(err_of(parse_header(b"BM")), GifError::InvalidHeader));
        assert!(matches!(
            err_of(parse_header(b"GIF8")),
            GifError::UnexpectedEndOfData
        ));
    }

    #[test]
    fn logical_screen_descriptor() {
        let bytes = [0x0A, 0x00, 0x0B, 0x00, 0b1001_0001, 0x03, 0x00];
        let (rest, lsd) = parse_logical_screen_descriptor(&bytes).unwrap();
        assert!(rest.is_empty());
        assert_eq!(
            lsd,
            LogicalScreenDescriptor {
                canvas_width: 10,
                canvas_height: 11,
                global_color_table_flag: true,
                color_resolution: 1,
                sort_flag: false,
                global_color_table_size: 1,
                background_color_index: 3,
                pixel_aspect_ratio: 0,
            }
        );
    }

    #[test]
    fn color_table_with_too_few_bytes() {
        // Size field 1 declares 4 colors, only 3 are present.
        let bytes = [0u8; 9];
        assert!(matches!(
            err_of(parse_color_table(&bytes, 1)),
            GifError::InvalidColorTableSize
        ));
    }

    #[test]
    fn color_table() {
        let bytes = [1, 2, 3, 4, 5, 6, 0xAA];
        let (rest, table) = parse_color_table(&bytes, 0).unwrap();
        assert_eq!(rest, &[0xAA]);
        assert_eq!(table.colors(), &[Color::rgb(1, 2, 3), Color::rgb(4, 5, 6)]);
    }

    #[test]
    fn graphics_control_block() {
        let bytes = [0x21, 0xF9, 0x04, 0b000_010_0_1, 0x0A, 0x00, 0x07, 0x00];
        let (rest, block) = parse_block(&bytes).unwrap();
        assert!(rest.is_empty());
        assert_eq!(
            block,
            Block::GraphicsControl(GraphicsControlExtension {
                disposal_method: DisposalMethod::ClearCanvas,
                user_input_flag: false,
                transparent_color_flag: true,
                delay_time: 10,
                transparent_color_index: 7,
            })
        );
    }

    #[test]
    fn graphics_control_with_wrong_size() {
        let bytes = [0x21, 0xF9, 0x05, 0, 0, 0, 0, 0, 0];
        assert!(matches!(
            err_of(parse_block(&bytes)),
            GifError::MalformedBlock(nom::error::ErrorKind::Tag)
        ));
    }

    #[test]
    fn truncated_graphics_control() {
        let bytes = [0x21, 0xF9, 0x04, 0b000_010_0_1, 0x0A, 0x00, 0x07, 0x00];
        for cut in [2, 3, 5, 7] {
            assert!(
                matches!(
                    err_of(parse_block(&bytes[..cut])),
                    GifError::UnexpectedEndOfData
                ),
                "cut at {}",
                cut
            );
        }
    }

    #[test]
    fn graphics_control_with_bad_terminator() {
        let bytes = [0x21, 0xF9, 0x04, 0, 0, 0, 0, 0x01];
        assert!(matches!(
            err_of(parse_block(&bytes)),
            GifError::MalformedBlock(nom::error::ErrorKind::Tag)
        ));
    }

    #[test]
    fn looping_extension() {
        let mut bytes = vec![0x21, 0xFF, 0x0B];
        bytes.extend_from_slice(b"NETSCAPE2.0");
        bytes.extend_from_slice(&[0x03, 0x01, 0x05, 0x00, 0x00]);
        let (rest, block) = parse_block(&bytes).unwrap();
        assert!(rest.is_empty());
        assert_eq!(
            block,
            Block::Application(ApplicationExtension::Looping { loop_count: 5 })
        );
    }

    #[test]
    fn unknown_application_extension_is_skipped() {
        let mut bytes = vec![0x21, 0xFF, 0x0B];
        bytes.extend_from_slice(b"XMP DataXMP");
        bytes.extend_from_slice(&[0x02, 0xAB, 0xCD, 0x00, 0x3B]);
        let (rest, block) = parse_block(&bytes).unwrap();
        assert_eq!(rest, &[0x3B]);
        assert_eq!(block, Block::Skipped { label: 0xFF });
    }

    #[test]
    fn comment_extension_is_skipped() {
        let bytes = [0x21, 0xFE, 0x02, b'h', b'i', 0x01, b'!', 0x00];
        let (rest, block) = parse_block(&bytes).unwrap();
        assert!(rest.is_empty());
        assert_eq!(block, Block::Skipped { label: 0xFE });
    }

    #[test]
    fn image_block() {
        let bytes = [
            0x2C, 0x01, 0x00, 0x02, 0x00, 0x03, 0x00, 0x04, 0x00, 0b1100_0000, 0, 0, 0, 9, 9, 9,
            0x02, 0x02, 0xAA, 0xBB, 0x01, 0xCC, 0x00,
        ];
        let (rest, block) = parse_block(&bytes).unwrap();
        assert!(rest.is_empty());
        match block {
            Block::Image(image) => {
                assert_eq!(image.image_descriptor.left, 1);
                assert_eq!(image.image_descriptor.top, 2);
                assert_eq!(image.image_descriptor.width, 3);
                assert_eq!(image.image_descriptor.height, 4);
                assert!(image.image_descriptor.interlace_flag);
                assert_eq!(
                    image.local_color_table.unwrap().colors(),
                    &[Color::BLACK, Color::rgb(9, 9, 9)]
                );
                assert_eq!(image.min_code_size, 2);
                assert_eq!(image.data, vec![0xAA, 0xBB, 0xCC]);
            }
            other => panic!("expected an image block, got {:?}", other),
        }
    }

    #[test]
    fn truncated_image_descriptor() {
        let bytes = [0x2C, 0x00, 0x00, 0x00];
        assert!(matches!(
            err_of(parse_block(&bytes)),
            GifError::UnexpectedEndOfData
        ));
    }

    #[test]
    fn unterminated_sub_blocks() {
        assert!(matches!(
            err_of(parse_sub_blocks(&[0x02, 0x01, 0x02])),
            GifError::UnexpectedEndOfData
        ));
        assert!(matches!(
            err_of(parse_sub_blocks(&[0x05, 0x01])),
            GifError::UnexpectedEndOfData
        ));
    }

    #[test]
    fn unknown_introducer() {
        assert!(matches!(
            err_of(parse_block(&[0x42])),
            GifError::UnexpectedBlock(0x42)
        ));
    }
}
