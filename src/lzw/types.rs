use crate::errors::{GifError, Result};

/// Codes never grow beyond 12 bits.
pub const MAX_CODE_SIZE: u32 = 12;
pub const MAX_CODES: usize = 1 << MAX_CODE_SIZE;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SpecialCode {
    Clear,
    EndOfInformation,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum InvCode {
    Sequence(Vec<u8>),
    ControlCode(SpecialCode),
}

pub type InvCodeTable = Vec<InvCode>;

/// Code layout derived from a minimum code size: roots `0..clear`, then the
/// clear code, the end code and the first free dictionary code.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct CodeSpace {
    pub min_code_size: u8,
}

impl CodeSpace {
    pub fn new(min_code_size: u8) -> Result<Self> {
        if !(2..=8).contains(&min_code_size) {
            return Err(GifError::InvalidMinCodeSize(min_code_size));
        }
        Ok(CodeSpace { min_code_size })
    }

    pub fn clear_code(&self) -> u16 {
        1 << self.min_code_size
    }

    pub fn end_code(&self) -> u16 {
        self.clear_code() + 1
    }

    pub fn first_code(&self) -> u16 {
        self.clear_code() + 2
    }

    pub fn initial_code_size(&self) -> u32 {
        self.min_code_size as u32 + 1
    }
}

pub fn create_inverse_code_table(space: CodeSpace) -> InvCodeTable {
    use InvCode::*;
    use SpecialCode::*;
    let mut ret = InvCodeTable::with_capacity(MAX_CODES);
    for i in 0..space.clear_code() {
        ret.push(Sequence(vec![i as u8]));
    }
    ret.push(ControlCode(Clear));
    ret.push(ControlCode(EndOfInformation));
    ret
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_space_layout() {
        let space = CodeSpace::new(2).unwrap();
        assert_eq!(space.clear_code(), 4);
        assert_eq!(space.end_code(), 5);
        assert_eq!(space.first_code(), 6);
        assert_eq!(space.initial_code_size(), 3);

        let space = CodeSpace::new(8).unwrap();
        assert_eq!(space.clear_code(), 256);
        assert_eq!(space.end_code(), 257);
    }

    #[test]
    fn invalid_code_size() {
        assert!(matches!(
            CodeSpace::new(1),
            Err(GifError::InvalidMinCodeSize(1))
        ));
        assert!(matches!(
            CodeSpace::new(9),
            Err(GifError::InvalidMinCodeSize(9))
        ));
    }

    #[test]
    fn inverse_table_holds_roots_and_controls() {
        let table = create_inverse_code_table(CodeSpace::new(3).unwrap());
        assert_eq!(table.len(), 10);
        assert_eq!(table[0], InvCode::Sequence(vec![0]));
        assert_eq!(table[7], InvCode::Sequence(vec![7]));
        assert_eq!(table[8], InvCode::ControlCode(SpecialCode::Clear));
        assert_eq!(table[9], InvCode::ControlCode(SpecialCode::EndOfInformation));
    }
}
