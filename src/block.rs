//! Block codec
//!
//! A block is the self-describing unit a cartridge is made of:
//!
//! ```text
//! offset  size  field
//! 0       4     magic "JCRT"
//! 4       1     version
//! 5       1     block type
//! 6       1     flags (bit 0 crc, bit 1 compressed, bit 2 encrypted - rejected)
//! 7       4     payload length, big-endian
//! 11      n     payload
//! 11+n    4     CRC32 of bytes 0..11+n, big-endian (only when the crc flag is set)
//! ```
//!
//! The codec never looks inside the payload.

use crate::error::{BlockError, CapacityError, CartridgeError};
use log::debug;

pub const BLOCK_MAGIC: [u8; 4] = *b"JCRT";
pub const BLOCK_VERSION: u8 = 1;

/// magic + version + type + flags + length
pub const BLOCK_HEADER_LEN: usize = 11;
pub const CRC_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockType {
    Header,
    Bytecode,
    TruthTable,
    LutPalette,
    StringTable,
    Signature,
    Fs,
    /// A type byte this implementation does not know. Kept so it can be re-emitted.
    Unknown(u8),
}

impl BlockType {
    pub fn from_byte(b: u8) -> Self {
        match b {
            0x01 => BlockType::Header,
            0x02 => BlockType::Bytecode,
            0x03 => BlockType::TruthTable,
            0x04 => BlockType::LutPalette,
            0x05 => BlockType::StringTable,
            0x06 => BlockType::Signature,
            0x07 => BlockType::Fs,
            other => BlockType::Unknown(other),
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            BlockType::Header => 0x01,
            BlockType::Bytecode => 0x02,
            BlockType::TruthTable => 0x03,
            BlockType::LutPalette => 0x04,
            BlockType::StringTable => 0x05,
            BlockType::Signature => 0x06,
            BlockType::Fs => 0x07,
            BlockType::Unknown(b) => b,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BlockType::Header => "header",
            BlockType::Bytecode => "bytecode",
            BlockType::TruthTable => "truth table",
            BlockType::LutPalette => "lut palette",
            BlockType::StringTable => "string table",
            BlockType::Signature => "signature",
            BlockType::Fs => "fs",
            BlockType::Unknown(_) => "unknown",
        }
    }
}

/// Block flag bitset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockFlags(u8);

impl BlockFlags {
    pub const CRC: u8 = 0x01;
    pub const COMPRESSED: u8 = 0x02;
    /// Reserved. Never valid on the wire.
    pub const ENCRYPTED: u8 = 0x04;

    const SUPPORTED: u8 = Self::CRC | Self::COMPRESSED;

    pub fn empty() -> Self {
        BlockFlags(0)
    }

    pub fn with_crc() -> Self {
        BlockFlags(Self::CRC)
    }

    /// Accept a raw flag byte, rejecting the encrypted bit and any undefined bit
    pub fn from_bits(bits: u8) -> Result<Self, BlockError> {
        if bits & !Self::SUPPORTED != 0 {
            return Err(BlockError::UnsupportedFlag(bits));
        }
        Ok(BlockFlags(bits))
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn crc(self) -> bool {
        self.0 & Self::CRC != 0
    }

    pub fn compressed(self) -> bool {
        self.0 & Self::COMPRESSED != 0
    }

    pub fn set_compressed(mut self, on: bool) -> Self {
        if on {
            self.0 |= Self::COMPRESSED;
        } else {
            self.0 &= !Self::COMPRESSED;
        }
        self
    }
}

/// One decoded block. The checksum is not stored: it is a function of the other fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub version: u8,
    pub block_type: BlockType,
    pub flags: BlockFlags,
    pub payload: Vec<u8>,
}

impl Block {
    /// A current-version block with the CRC flag set
    pub fn new(block_type: BlockType, payload: Vec<u8>) -> Self {
        Block {
            version: BLOCK_VERSION,
            block_type,
            flags: BlockFlags::with_crc(),
            payload,
        }
    }

    /// Size of the encoded block in bytes
    pub fn encoded_len(&self) -> usize {
        BLOCK_HEADER_LEN + self.payload.len() + if self.flags.crc() { CRC_LEN } else { 0 }
    }

    /// Serialize to bytes
    pub fn encode(&self) -> Result<Vec<u8>, CartridgeError> {
        let flags = BlockFlags::from_bits(self.flags.bits())?;
        let len = u32::try_from(self.payload.len())
            .map_err(|_| CapacityError::PayloadTooLarge(self.payload.len()))?;

        let mut bytes = Vec::with_capacity(self.encoded_len());
        bytes.extend_from_slice(&BLOCK_MAGIC);
        bytes.push(self.version);
        bytes.push(self.block_type.to_byte());
        bytes.push(flags.bits());
        bytes.extend_from_slice(&len.to_be_bytes());
        bytes.extend_from_slice(&self.payload);

        if flags.crc() {
            let crc = crc32fast::hash(&bytes);
            bytes.extend_from_slice(&crc.to_be_bytes());
        }

        Ok(bytes)
    }

    /// Deserialize from exactly one block's worth of bytes
    pub fn decode(span: &[u8]) -> Result<Block, BlockError> {
        if span.len() < BLOCK_HEADER_LEN {
            return Err(BlockError::LengthMismatch {
                expected: BLOCK_HEADER_LEN,
                actual: span.len(),
            });
        }

        let magic = [span[0], span[1], span[2], span[3]];
        if magic != BLOCK_MAGIC {
            return Err(BlockError::BadMagic(magic));
        }

        let version = span[4];
        let block_type = BlockType::from_byte(span[5]);
        let flags = BlockFlags::from_bits(span[6])?;
        let payload_len = u32::from_be_bytes([span[7], span[8], span[9], span[10]]) as usize;

        let crc_len = if flags.crc() { CRC_LEN } else { 0 };
        let expected = BLOCK_HEADER_LEN
            .checked_add(payload_len)
            .and_then(|n| n.checked_add(crc_len))
            .unwrap_or(usize::MAX);
        if expected != span.len() {
            return Err(BlockError::LengthMismatch {
                expected,
                actual: span.len(),
            });
        }

        let body_end = BLOCK_HEADER_LEN + payload_len;
        if flags.crc() {
            let stored = u32::from_be_bytes([
                span[body_end],
                span[body_end + 1],
                span[body_end + 2],
                span[body_end + 3],
            ]);
            let computed = crc32fast::hash(&span[..body_end]);
            if stored != computed {
                return Err(BlockError::CrcMismatch { stored, computed });
            }
        }

        debug!(
            "decoded {} block v{} flags={:#04x} len={}",
            block_type.name(),
            version,
            flags.bits(),
            payload_len
        );

        Ok(Block {
            version,
            block_type,
            flags,
            payload: span[BLOCK_HEADER_LEN..body_end].to_vec(),
        })
    }
}
