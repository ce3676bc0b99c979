//! Fixed-width byte encoding of field elements and shares.
//!
//! Every element takes exactly `byte_len(p)` bytes, big-endian and
//! left-padded with zeros. A share is its value followed by its MAC, so
//! `2 * byte_len(p)` bytes. Values wider than their slot are rejected rather
//! than truncated.

use num_bigint::BigUint;
use thiserror::Error;

use crate::{algebra::field::PrimeField, schemes::spdz::Share};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Element needs {len} bytes but only {width} are available")]
    Overflow { len: usize, width: usize },
    #[error("Expected {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codec {
    width: usize,
}

impl Codec {
    pub fn new(field: &PrimeField) -> Self {
        Self::with_width(field.byte_len())
    }

    pub fn with_width(width: usize) -> Self {
        Self { width }
    }

    /// Bytes per element.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Bytes per share.
    pub fn share_len(&self) -> usize {
        2 * self.width
    }

    /// Append `value` to `out` using exactly `width` bytes.
    pub fn encode_element(&self, value: &BigUint, out: &mut Vec<u8>) -> Result<(), CodecError> {
        let bytes = value.to_bytes_be();
        let bytes = match bytes.len() {
            len if len <= self.width => &bytes[..],
            // A single leading zero is a sign byte, anything more is an overflow.
            len if len == self.width + 1 && bytes[0] == 0 => &bytes[1..],
            len => {
                return Err(CodecError::Overflow {
                    len,
                    width: self.width,
                })
            }
        };
        out.resize(out.len() + self.width - bytes.len(), 0);
        out.extend_from_slice(bytes);
        Ok(())
    }

    pub fn encode_share(&self, share: &Share, out: &mut Vec<u8>) -> Result<(), CodecError> {
        self.encode_element(&share.val, out)?;
        self.encode_element(&share.mac, out)
    }

    pub fn decode_element(&self, bytes: &[u8]) -> Result<BigUint, CodecError> {
        if bytes.len() != self.width {
            return Err(CodecError::Truncated {
                expected: self.width,
                got: bytes.len(),
            });
        }
        Ok(BigUint::from_bytes_be(bytes))
    }

    pub fn decode_share(&self, bytes: &[u8]) -> Result<Share, CodecError> {
        if bytes.len() != self.share_len() {
            return Err(CodecError::Truncated {
                expected: self.share_len(),
                got: bytes.len(),
            });
        }
        let (val, mac) = bytes.split_at(self.width);
        Ok(Share::new(
            self.decode_element(val)?,
            self.decode_element(mac)?,
        ))
    }
}
