//! Cartridge assembly and loading
//!
//! A cartridge is the ordered set of blocks carried by one JPEG. Exactly one
//! header and one bytecode block make it runnable; the truth table and the
//! string table are optional. Blocks of other kinds are carried through untouched.

use log::{debug, info, warn};

use crate::block::{Block, BlockType};
use crate::error::{CartridgeError, Result, SchemaError};
use crate::header::Header;
use crate::marker;
use crate::string_table::StringTable;
use crate::truth_table::{InputGrid, TruthTable};

/// A block's payload decoded according to its declared type
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Header(Header),
    Bytecode(Vec<u8>),
    TruthTable(TruthTable),
    StringTable(StringTable),
    /// Palette, signature, fs and unknown kinds: no schema here
    Opaque(Block),
}

impl Payload {
    /// `grid` quantizes truth-table keys and comes from the cartridge header
    pub fn decode(block: &Block, grid: InputGrid) -> Result<Payload> {
        let schema_kind = match block.block_type {
            BlockType::Header | BlockType::Bytecode | BlockType::TruthTable | BlockType::StringTable => {
                Some(block.block_type.name())
            }
            BlockType::LutPalette
            | BlockType::Signature
            | BlockType::Fs
            | BlockType::Unknown(_) => None,
        };
        if let Some(kind) = schema_kind {
            if block.flags.compressed() {
                return Err(SchemaError::Compressed(kind).into());
            }
        }

        let payload = match block.block_type {
            BlockType::Header => Payload::Header(Header::from_bytes(&block.payload)?),
            BlockType::Bytecode => Payload::Bytecode(block.payload.clone()),
            BlockType::TruthTable => {
                Payload::TruthTable(TruthTable::from_bytes(&block.payload, grid)?)
            }
            BlockType::StringTable => {
                Payload::StringTable(StringTable::from_bytes(&block.payload)?)
            }
            BlockType::LutPalette
            | BlockType::Signature
            | BlockType::Fs
            | BlockType::Unknown(_) => Payload::Opaque(block.clone()),
        };
        Ok(payload)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cartridge {
    pub header: Header,
    pub bytecode: Vec<u8>,
    pub truth_table: Option<TruthTable>,
    pub string_table: Option<StringTable>,
    /// Blocks without a schema, in file order
    pub extra: Vec<Block>,
}

impl Cartridge {
    pub fn new(header: Header, bytecode: Vec<u8>) -> Self {
        Cartridge {
            header,
            bytecode,
            truth_table: None,
            string_table: None,
            extra: Vec::new(),
        }
    }

    pub fn input_grid(&self) -> Result<InputGrid> {
        Ok(InputGrid::new(self.header.grid_columns, self.header.grid_rows)?)
    }

    /// Header, bytecode, truth table, string table, then the opaque blocks
    pub fn to_blocks(&self) -> Result<Vec<Block>> {
        let mut blocks = vec![
            Block::new(BlockType::Header, self.header.to_bytes()),
            Block::new(BlockType::Bytecode, self.bytecode.clone()),
        ];
        if let Some(table) = &self.truth_table {
            blocks.push(Block::new(BlockType::TruthTable, table.to_bytes()));
        }
        if let Some(strings) = &self.string_table {
            blocks.push(Block::new(BlockType::StringTable, strings.to_bytes()?));
        }
        blocks.extend(self.extra.iter().cloned());
        Ok(blocks)
    }

    pub fn from_blocks(blocks: &[Block]) -> Result<Self> {
        let count = |t: BlockType| blocks.iter().filter(|b| b.block_type == t).count();
        for required in [BlockType::Header, BlockType::Bytecode] {
            match count(required) {
                1 => {}
                0 => {
                    return Err(CartridgeError::Completeness(format!(
                        "missing {} block",
                        required.name()
                    )))
                }
                n => {
                    return Err(CartridgeError::Completeness(format!(
                        "{} {} blocks, expected one",
                        n,
                        required.name()
                    )))
                }
            }
        }

        // The header decides how truth-table keys are quantized, so it goes first
        let header = blocks
            .iter()
            .find(|b| b.block_type == BlockType::Header)
            .map(|b| Payload::decode(b, InputGrid::default()))
            .transpose()?;
        let Some(Payload::Header(header)) = header else {
            return Err(CartridgeError::Completeness("missing header block".to_string()));
        };
        let grid = InputGrid::new(header.grid_columns, header.grid_rows)?;

        let mut bytecode = None;
        let mut truth_table = None;
        let mut string_table = None;
        let mut extra = Vec::new();

        for block in blocks {
            match Payload::decode(block, grid)? {
                Payload::Header(_) => {}
                Payload::Bytecode(code) => bytecode = Some(code),
                Payload::TruthTable(table) => {
                    if truth_table.replace(table).is_some() {
                        return Err(duplicate(block.block_type));
                    }
                }
                Payload::StringTable(strings) => {
                    if string_table.replace(strings).is_some() {
                        return Err(duplicate(block.block_type));
                    }
                }
                Payload::Opaque(block) => {
                    debug!("carrying opaque {} block", block.block_type.name());
                    extra.push(block);
                }
            }
        }

        let bytecode = bytecode
            .ok_or_else(|| CartridgeError::Completeness("missing bytecode block".to_string()))?;

        Ok(Cartridge {
            header,
            bytecode,
            truth_table,
            string_table,
            extra,
        })
    }

    /// Splice this cartridge into `jpeg`, replacing any cartridge already there
    pub fn write_into_jpeg(&self, jpeg: &[u8]) -> Result<Vec<u8>> {
        marker::splice(jpeg, &self.to_blocks()?)
    }

    pub fn read_from_jpeg(jpeg: &[u8], max_bytes: usize) -> Result<Self> {
        let blocks = marker::extract(jpeg, max_bytes)?;
        Cartridge::from_blocks(&blocks)
    }
}

fn duplicate(block_type: BlockType) -> CartridgeError {
    CartridgeError::Completeness(format!("duplicate {} block", block_type.name()))
}

/// Result of opening an untrusted file
#[derive(Debug)]
pub enum LoadOutcome {
    Runnable(Cartridge),
    /// Show the raster only; the error says why
    Inert(CartridgeError),
}

/// Apply the fail-closed policy: any failure leaves the file as a plain image
pub fn load_or_inert(jpeg: &[u8], max_bytes: usize) -> LoadOutcome {
    match Cartridge::read_from_jpeg(jpeg, max_bytes) {
        Ok(cart) => {
            info!(
                "Loaded cartridge: {} bytes of bytecode, entry {:#06x}",
                cart.bytecode.len(),
                cart.header.entry_point
            );
            LoadOutcome::Runnable(cart)
        }
        Err(e) => {
            warn!("Cartridge not runnable ({:?}): {}", e.class(), e);
            LoadOutcome::Inert(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorClass;
    use crate::interpreter::{SNAKE_ENTRY, SNAKE_PROGRAM};
    use crate::test_utils::tiny_jpeg;
    use crate::truth_table::TouchKey;

    fn cartridge() -> Cartridge {
        let header = Header {
            entry_point: SNAKE_ENTRY,
            ..Header::default()
        };
        let mut cart = Cartridge::new(header, SNAKE_PROGRAM.to_vec());
        let mut table = TruthTable::new(InputGrid::default());
        table.insert(TouchKey::region(7), 5);
        cart.truth_table = Some(table);
        cart.string_table = Some([("title", "Snake")].into_iter().collect());
        cart.extra.push(Block::new(BlockType::Signature, vec![9; 16]));
        cart
    }

    #[test]
    fn jpeg_round_trip() {
        let cart = cartridge();
        let jpeg = cart.write_into_jpeg(&tiny_jpeg()).unwrap();
        let loaded = Cartridge::read_from_jpeg(&jpeg, marker::DEFAULT_MAX_CARTRIDGE_BYTES).unwrap();
        assert_eq!(loaded, cart);
    }

    #[test]
    fn header_and_bytecode_are_required() {
        let blocks = cartridge().to_blocks().unwrap();

        let no_bytecode: Vec<Block> = blocks
            .iter()
            .filter(|b| b.block_type != BlockType::Bytecode)
            .cloned()
            .collect();
        let err = Cartridge::from_blocks(&no_bytecode).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Completeness);

        let no_header: Vec<Block> = blocks[1..].to_vec();
        let err = Cartridge::from_blocks(&no_header).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Completeness);

        let mut two_headers = blocks.clone();
        two_headers.push(blocks[0].clone());
        let err = Cartridge::from_blocks(&two_headers).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Completeness);
    }

    #[test]
    fn header_may_follow_the_truth_table() {
        let mut blocks = cartridge().to_blocks().unwrap();
        blocks.rotate_left(2);
        assert_eq!(Cartridge::from_blocks(&blocks).unwrap().header.entry_point, SNAKE_ENTRY);
    }

    #[test]
    fn bad_body_is_a_schema_error() {
        let mut blocks = cartridge().to_blocks().unwrap();
        blocks[0].payload.truncate(10);
        let err = Cartridge::from_blocks(&blocks).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Schema);
    }

    #[test]
    fn compressed_schema_blocks_are_refused() {
        let mut blocks = cartridge().to_blocks().unwrap();
        blocks[1].flags = blocks[1].flags.set_compressed(true);
        assert_eq!(
            Cartridge::from_blocks(&blocks).unwrap_err(),
            SchemaError::Compressed("bytecode").into()
        );
    }

    #[test]
    fn load_policy_degrades_to_inert() {
        match load_or_inert(&tiny_jpeg(), marker::DEFAULT_MAX_CARTRIDGE_BYTES) {
            LoadOutcome::Inert(e) => assert_eq!(e.class(), ErrorClass::Completeness),
            LoadOutcome::Runnable(_) => panic!("plain image must not be runnable"),
        }

        match load_or_inert(b"not a jpeg", marker::DEFAULT_MAX_CARTRIDGE_BYTES) {
            LoadOutcome::Inert(e) => assert_eq!(e.class(), ErrorClass::Structural),
            LoadOutcome::Runnable(_) => panic!("garbage must not be runnable"),
        }
    }
}
