//! Error taxonomy for cartridge loading
//!
//! Every failure while reading a cartridge out of a JPEG maps onto exactly one
//! [`ErrorClass`]. Callers are expected to treat all of them the same way at the
//! policy level: show the raster, disable the interpreter.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CartridgeError>;

/// Coarse failure class used by the load policy and for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Structural,
    Integrity,
    Schema,
    Completeness,
    Capacity,
}

/// Malformed JPEG marker stream
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructuralError {
    #[error("not a JPEG stream (missing start-of-image marker)")]
    NotJpeg,

    #[error("marker stream truncated at offset {0:#x}")]
    Truncated(usize),

    #[error("expected marker prefix 0xFF at offset {offset:#x}, found {found:#04x}")]
    ExpectedMarker { offset: usize, found: u8 },

    #[error("segment at offset {offset:#x} declares invalid length {length}")]
    BadSegmentLength { offset: usize, length: u16 },

    #[error("end-of-image at offset {0:#x} before start-of-scan")]
    EndBeforeScan(usize),
}

/// Block framing failures reported by the block codec
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockError {
    #[error("bad block magic {0:02x?}")]
    BadMagic([u8; 4]),

    #[error("block length mismatch: framing needs {expected} bytes, span has {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("block checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    CrcMismatch { stored: u32, computed: u32 },

    #[error("unsupported block flags {0:#04x}")]
    UnsupportedFlag(u8),
}

/// A block framed correctly but its body does not match its declared kind
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("{kind} payload truncated: needed {needed} bytes at offset {offset}, have {len}")]
    Truncated {
        kind: &'static str,
        offset: usize,
        needed: usize,
        len: usize,
    },

    #[error("{kind} payload has {extra} trailing bytes")]
    TrailingBytes { kind: &'static str, extra: usize },

    #[error("truth table key length {0} (expected 6)")]
    BadKeyLength(u8),

    #[error("truth table has more than one entry for key with region {0}")]
    DuplicateKey(u16),

    #[error("input grid {columns}x{rows} cannot be addressed by 16-bit region ids")]
    BadGrid { columns: u16, rows: u16 },

    #[error("string table entry is not valid UTF-8")]
    InvalidUtf8,

    #[error("{0} payload is marked compressed but no codec is defined")]
    Compressed(&'static str),

    #[error("{0} does not fit its length field")]
    TooLong(&'static str),
}

/// Ceilings exceeded while building or extracting
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapacityError {
    #[error("block of {size} bytes exceeds the segment limit of {limit}")]
    SegmentTooLarge { size: usize, limit: usize },

    #[error("cartridge payloads exceed the ceiling of {limit} bytes")]
    CartridgeTooLarge { limit: usize },

    #[error("payload of {0} bytes does not fit a u32 length")]
    PayloadTooLarge(usize),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CartridgeError {
    #[error("structural error: {0}")]
    Structural(#[from] StructuralError),

    #[error("block error: {0}")]
    Block(#[from] BlockError),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("incomplete cartridge: {0}")]
    Completeness(String),

    #[error("capacity error: {0}")]
    Capacity(#[from] CapacityError),
}

impl CartridgeError {
    pub fn class(&self) -> ErrorClass {
        match self {
            CartridgeError::Structural(_) => ErrorClass::Structural,
            CartridgeError::Block(BlockError::BadMagic(_))
            | CartridgeError::Block(BlockError::LengthMismatch { .. }) => ErrorClass::Structural,
            CartridgeError::Block(BlockError::CrcMismatch { .. })
            | CartridgeError::Block(BlockError::UnsupportedFlag(_)) => ErrorClass::Integrity,
            CartridgeError::Schema(_) => ErrorClass::Schema,
            CartridgeError::Completeness(_) => ErrorClass::Completeness,
            CartridgeError::Capacity(_) => ErrorClass::Capacity,
        }
    }
}
