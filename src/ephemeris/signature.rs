//! The 16-byte binary signature opening every XEPH file.
//!
//! Layout (little-endian):
//! 1. magic `XEPH0100` (8 bytes),
//! 2. length in bytes of the XML header that follows (`u32`),
//! 3. reserved word, must be zero (`u32`).
use nom::{
    bytes::complete::take,
    number::complete::le_u32,
    IResult, Parser,
};

use crate::{
    constants::{MIN_HEADER_LENGTH, SIGNATURE_SIZE, XEPH_MAGIC},
    xeph_errors::XephError,
};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct XephSignature {
    pub(crate) magic: [u8; 8],
    pub(crate) header_length: u32,
    pub(crate) reserved: u32,
}

impl XephSignature {
    pub(crate) fn new(header_length: u32) -> Self {
        XephSignature {
            magic: XEPH_MAGIC,
            header_length,
            reserved: 0,
        }
    }

    pub(crate) fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, magic) = take(8usize).parse(input)?;
        let (input, header_length) = le_u32(input)?;
        let (input, reserved) = le_u32(input)?;

        let mut m = [0u8; 8];
        m.copy_from_slice(magic);
        Ok((
            input,
            XephSignature {
                magic: m,
                header_length,
                reserved,
            },
        ))
    }

    pub(crate) fn validate(&self) -> Result<(), XephError> {
        if self.magic[..4] != XEPH_MAGIC[..4] {
            return Err(XephError::InvalidSignature("bad magic number".into()));
        }
        if self.magic[4..] != XEPH_MAGIC[4..] {
            return Err(XephError::UnsupportedVersion(
                String::from_utf8_lossy(&self.magic[4..]).into_owned(),
            ));
        }
        if self.reserved != 0 {
            return Err(XephError::InvalidSignature(format!(
                "non-zero reserved word {:#010x}",
                self.reserved
            )));
        }
        if self.header_length < MIN_HEADER_LENGTH {
            return Err(XephError::InvalidHeader(format!(
                "header length {} is too small",
                self.header_length
            )));
        }
        Ok(())
    }

    pub(crate) fn to_bytes(&self) -> [u8; SIGNATURE_SIZE] {
        let mut bytes = [0u8; SIGNATURE_SIZE];
        bytes[0..8].copy_from_slice(&self.magic);
        bytes[8..12].copy_from_slice(&self.header_length.to_le_bytes());
        bytes[12..16].copy_from_slice(&self.reserved.to_le_bytes());
        bytes
    }
}
