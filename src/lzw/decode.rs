use super::types::*;
use crate::bitstream::BitCursor;
use crate::errors::{GifError, Result};

fn sequence(table: &InvCodeTable, code: u16) -> Result<&[u8]> {
    match table.get(code as usize) {
        Some(InvCode::Sequence(lst)) => Ok(lst),
        _ => Err(GifError::InvalidLzwCode(code)),
    }
}

/// Decompresses a GIF LZW code stream into palette indices.
///
/// Decoding stops at the end code; running out of bits before it is an
/// error.
pub fn decompress(compressed_data: &[u8], minimum_code_size: u8) -> Result<Vec<u8>> {
    let space = CodeSpace::new(minimum_code_size)?;
    let mut inv_code_table = create_inverse_code_table(space);
    let mut cur_code_size = space.initial_code_size();
    let mut prev_code: Option<u16> = None;

    let mut index_stream: Vec<u8> = Vec::new();
    let mut code_stream = BitCursor::new(compressed_data);

    loop {
        let code = code_stream
            .read(cur_code_size)
            .map_err(|_| GifError::UnexpectedEndOfData)? as u16;

        let entry: Vec<u8> = match inv_code_table.get(code as usize) {
            Some(InvCode::ControlCode(SpecialCode::Clear)) => {
                inv_code_table.truncate(space.first_code() as usize);
                cur_code_size = space.initial_code_size();
                prev_code = None;
                continue;
            }
            Some(InvCode::ControlCode(SpecialCode::EndOfInformation)) => break,
            Some(InvCode::Sequence(lst)) => lst.clone(),
            // Only the entry about to be created may be referenced early,
            // and it always ends with its own first index.
            None => match prev_code {
                Some(prev) if code as usize == inv_code_table.len() => {
                    let mut lst = sequence(&inv_code_table, prev)?.to_vec();
                    lst.push(lst[0]);
                    lst
                }
                _ => return Err(GifError::InvalidLzwCode(code)),
            },
        };

        index_stream.extend_from_slice(&entry);

        if let Some(prev) = prev_code {
            if inv_code_table.len() < MAX_CODES {
                let mut lst = sequence(&inv_code_table, prev)?.to_vec();
                lst.push(entry[0]);
                inv_code_table.push(InvCode::Sequence(lst));
            }
        }

        if inv_code_table.len() == 1 << cur_code_size && cur_code_size < MAX_CODE_SIZE {
            cur_code_size += 1;
        }
        prev_code = Some(code);
    }

    if code_stream.remaining() >= 8 {
        log::warn!(
            "{} bits of LZW data follow the end code",
            code_stream.remaining()
        );
    }

    Ok(index_stream)
}
