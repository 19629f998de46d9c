//! Register codec implementation
//!
//! Handles encoding and decoding of field-bus register data types.
//! Registers are 16-bit words; multi-word values use big-endian word order
//! (most-significant word first).

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

/// Decoding failures for a single register read
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Insufficient registers: {encoding} needs {needed}, got {got}")]
    InsufficientWords {
        encoding: RegisterEncoding,
        needed: usize,
        got: usize,
    },
}

/// Encoding failures for a single register write
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    /// Only single-register (16-bit) writes are implemented; wider types
    /// must fail loudly instead of being silently truncated.
    #[error("Unsupported encoding for register write: {0}")]
    UnsupportedEncoding(RegisterEncoding),
}

/// Numeric encoding of one logical value in consecutive registers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegisterEncoding {
    Uint16,
    Int16,
    Uint32,
    Int32,
    Float32,
    /// Unrecognized data-type string from configuration; decoding passes the
    /// raw word sequence through untouched.
    #[serde(other)]
    Raw,
}

impl RegisterEncoding {
    /// Parse a configuration data-type string (e.g. "uint16", "float32").
    /// Unknown strings map to `Raw` rather than failing, matching the
    /// pass-through decode behavior.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "uint16" | "u16" => Self::Uint16,
            "int16" | "i16" => Self::Int16,
            "uint32" | "u32" => Self::Uint32,
            "int32" | "i32" => Self::Int32,
            "float32" | "f32" | "float" => Self::Float32,
            _ => Self::Raw,
        }
    }

    /// Number of consecutive 16-bit registers this encoding consumes
    pub fn width(&self) -> usize {
        match self {
            Self::Uint16 | Self::Int16 | Self::Raw => 1,
            Self::Uint32 | Self::Int32 | Self::Float32 => 2,
        }
    }
}

impl std::fmt::Display for RegisterEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Uint16 => "uint16",
            Self::Int16 => "int16",
            Self::Uint32 => "uint32",
            Self::Int32 => "int32",
            Self::Float32 => "float32",
            Self::Raw => "raw",
        };
        f.write_str(name)
    }
}

/// A decoded register value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RegisterValue {
    Uint16(u16),
    Int16(i16),
    Uint32(u32),
    Int32(i32),
    Float32(f32),
    /// Raw ordered word sequence for unrecognized encodings; callers must
    /// special-case this variant.
    Raw(Vec<u16>),
}

impl RegisterValue {
    /// Coerce to f64 for analytics and publication paths.
    /// `Raw` has no numeric interpretation.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Uint16(v) => Some(f64::from(*v)),
            Self::Int16(v) => Some(f64::from(*v)),
            Self::Uint32(v) => Some(f64::from(*v)),
            Self::Int32(v) => Some(f64::from(*v)),
            Self::Float32(v) => Some(f64::from(*v)),
            Self::Raw(_) => None,
        }
    }
}

/// Combine two big-endian-ordered registers into one 32-bit pattern
fn combine_words(high: u16, low: u16) -> u32 {
    (u32::from(high) << 16) | u32::from(low)
}

/// Decode raw register words into a typed value.
///
/// Decoding is a pure function of the word sequence and requested encoding.
/// 32-bit types consume the first two registers, most-significant word first;
/// 16-bit types consume the first register. The `Raw` encoding returns the
/// input words unchanged.
///
/// # Errors
/// `DecodeError::InsufficientWords` when fewer words are supplied than the
/// encoding requires.
pub fn decode(words: &[u16], encoding: RegisterEncoding) -> Result<RegisterValue, DecodeError> {
    let needed = encoding.width();
    if encoding != RegisterEncoding::Raw && words.len() < needed {
        return Err(DecodeError::InsufficientWords {
            encoding,
            needed,
            got: words.len(),
        });
    }

    let value = match encoding {
        RegisterEncoding::Uint16 => RegisterValue::Uint16(words[0]),
        RegisterEncoding::Int16 => RegisterValue::Int16(words[0] as i16),
        RegisterEncoding::Uint32 => RegisterValue::Uint32(combine_words(words[0], words[1])),
        RegisterEncoding::Int32 => RegisterValue::Int32(combine_words(words[0], words[1]) as i32),
        RegisterEncoding::Float32 => {
            RegisterValue::Float32(f32::from_bits(combine_words(words[0], words[1])))
        },
        RegisterEncoding::Raw => RegisterValue::Raw(words.to_vec()),
    };

    trace!("Decoded {:?} as {}: {:?}", words, encoding, value);
    Ok(value)
}

/// Encode a typed value into register words for a write.
///
/// Only single-register 16-bit encodings are supported; multi-word encodings
/// fail with `EncodeError::UnsupportedEncoding` instead of being silently
/// approximated.
pub fn encode(value: &RegisterValue, encoding: RegisterEncoding) -> Result<Vec<u16>, EncodeError> {
    match (encoding, value) {
        (RegisterEncoding::Uint16, RegisterValue::Uint16(v)) => Ok(vec![*v]),
        (RegisterEncoding::Int16, RegisterValue::Int16(v)) => Ok(vec![*v as u16]),
        _ => Err(EncodeError::UnsupportedEncoding(encoding)),
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_decode_uint16() {
        let v = decode(&[0x1234], RegisterEncoding::Uint16).unwrap();
        assert_eq!(v, RegisterValue::Uint16(0x1234));
    }

    #[test]
    fn test_decode_int16_negative() {
        let v = decode(&[0xFFFF], RegisterEncoding::Int16).unwrap();
        assert_eq!(v, RegisterValue::Int16(-1));
    }

    #[test]
    fn test_decode_uint32_word_order() {
        // High word first
        let v = decode(&[0x0001, 0x0000], RegisterEncoding::Uint32).unwrap();
        assert_eq!(v, RegisterValue::Uint32(0x0001_0000));
    }

    #[test]
    fn test_decode_int32_negative() {
        let v = decode(&[0xFFFF, 0xFFFE], RegisterEncoding::Int32).unwrap();
        assert_eq!(v, RegisterValue::Int32(-2));
    }

    #[test]
    fn test_decode_float32_known_pattern() {
        // 0x42480000 is the IEEE-754 bit pattern for 50.0
        let v = decode(&[0x4248, 0x0000], RegisterEncoding::Float32).unwrap();
        assert_eq!(v, RegisterValue::Float32(50.0));
    }

    #[test]
    fn test_decode_insufficient_words() {
        let err = decode(&[0x4248], RegisterEncoding::Float32).unwrap_err();
        assert_eq!(
            err,
            DecodeError::InsufficientWords {
                encoding: RegisterEncoding::Float32,
                needed: 2,
                got: 1
            }
        );
    }

    #[test]
    fn test_decode_unknown_encoding_passes_raw_words() {
        let words = [0x0102, 0x0304, 0x0506];
        let v = decode(&words, RegisterEncoding::parse("bcd")).unwrap();
        assert_eq!(v, RegisterValue::Raw(words.to_vec()));
    }

    #[test]
    fn test_decode_raw_accepts_empty_input() {
        let v = decode(&[], RegisterEncoding::Raw).unwrap();
        assert_eq!(v, RegisterValue::Raw(vec![]));
    }

    #[test]
    fn test_encode_not_supported_for_wide_types() {
        let err = encode(&RegisterValue::Float32(1.5), RegisterEncoding::Float32).unwrap_err();
        assert_eq!(err, EncodeError::UnsupportedEncoding(RegisterEncoding::Float32));

        let err = encode(&RegisterValue::Uint32(7), RegisterEncoding::Uint32).unwrap_err();
        assert_eq!(err, EncodeError::UnsupportedEncoding(RegisterEncoding::Uint32));
    }

    #[test]
    fn test_round_trip_uint16() {
        for v in [0u16, 1, 0x7FFF, 0x8000, u16::MAX] {
            let value = RegisterValue::Uint16(v);
            let words = encode(&value, RegisterEncoding::Uint16).unwrap();
            assert_eq!(decode(&words, RegisterEncoding::Uint16).unwrap(), value);
        }
    }

    #[test]
    fn test_round_trip_int16() {
        for v in [0i16, 1, -1, i16::MIN, i16::MAX] {
            let value = RegisterValue::Int16(v);
            let words = encode(&value, RegisterEncoding::Int16).unwrap();
            assert_eq!(decode(&words, RegisterEncoding::Int16).unwrap(), value);
        }
    }

    #[test]
    fn test_parse_encoding_strings() {
        assert_eq!(RegisterEncoding::parse("uint16"), RegisterEncoding::Uint16);
        assert_eq!(RegisterEncoding::parse("Float32"), RegisterEncoding::Float32);
        assert_eq!(RegisterEncoding::parse("float"), RegisterEncoding::Float32);
        assert_eq!(RegisterEncoding::parse("ascii"), RegisterEncoding::Raw);
    }

    #[test]
    fn test_width() {
        assert_eq!(RegisterEncoding::Uint16.width(), 1);
        assert_eq!(RegisterEncoding::Int32.width(), 2);
        assert_eq!(RegisterEncoding::Float32.width(), 2);
    }

    #[test]
    fn test_as_f64_coercion() {
        assert_eq!(RegisterValue::Int16(-3).as_f64(), Some(-3.0));
        assert_eq!(RegisterValue::Float32(2.5).as_f64(), Some(2.5));
        assert_eq!(RegisterValue::Raw(vec![1, 2]).as_f64(), None);
    }

    #[test]
    fn test_serialize_as_plain_json_scalar() {
        let json = serde_json::to_value(RegisterValue::Float32(50.0)).unwrap();
        assert_eq!(json, serde_json::json!(50.0));
    }
}
