//! Build manifest: the TOML description `pixelcart build` turns into a cartridge.
//!
//! ```toml
//! bytecode = [0x40, 0x01, 0x01, 0x40, 0x02, 0x01]
//!
//! [header]
//! entry_point = 3
//! os_tag = "SNAK"
//!
//! [[button]]
//! name = "up"
//! x = 224
//! y = 400
//! w = 64
//! h = 40
//! command = 1
//!
//! [strings]
//! title = "Snake"
//! ```

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;

use crate::cartridge::Cartridge;
use crate::error::CartridgeError;
use crate::header::Header;
use crate::interpreter::{SNAKE_ENTRY, SNAKE_PROGRAM};
use crate::string_table::StringTable;
use crate::truth_table::{Button, TruthTable};

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("invalid manifest: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("os_tag must be exactly 4 bytes, got {0:?}")]
    BadOsTag(String),

    #[error(transparent)]
    Cartridge(#[from] CartridgeError),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HeaderSpec {
    pub entry_point: u32,
    pub framebuffer_width: u16,
    pub framebuffer_height: u16,
    pub frame_rate: u16,
    pub grid_columns: u16,
    pub grid_rows: u16,
    pub features: u32,
    pub os_tag: String,
}

impl Default for HeaderSpec {
    fn default() -> Self {
        let h = Header::default();
        HeaderSpec {
            entry_point: SNAKE_ENTRY,
            framebuffer_width: h.framebuffer_width,
            framebuffer_height: h.framebuffer_height,
            frame_rate: h.frame_rate,
            grid_columns: h.grid_columns,
            grid_rows: h.grid_rows,
            features: h.features,
            os_tag: String::from_utf8_lossy(&h.os_tag).into_owned(),
        }
    }
}

impl HeaderSpec {
    fn to_header(&self) -> Result<Header, ManifestError> {
        let os_tag: [u8; 4] = self
            .os_tag
            .as_bytes()
            .try_into()
            .map_err(|_| ManifestError::BadOsTag(self.os_tag.clone()))?;
        Ok(Header {
            entry_point: self.entry_point,
            framebuffer_width: self.framebuffer_width,
            framebuffer_height: self.framebuffer_height,
            frame_rate: self.frame_rate,
            grid_columns: self.grid_columns,
            grid_rows: self.grid_rows,
            features: self.features,
            capability_hints: [0, 0],
            os_tag,
        })
    }
}

fn default_bytecode() -> Vec<u8> {
    SNAKE_PROGRAM.to_vec()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub header: HeaderSpec,
    #[serde(default = "default_bytecode")]
    pub bytecode: Vec<u8>,
    #[serde(default, rename = "button")]
    pub buttons: Vec<Button>,
    #[serde(default)]
    pub strings: IndexMap<String, String>,
}

impl Manifest {
    pub fn from_toml_str(text: &str) -> Result<Self, ManifestError> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_cartridge(&self) -> Result<Cartridge, ManifestError> {
        let header = self.header.to_header()?;
        let mut cart = Cartridge::new(header, self.bytecode.clone());
        if !self.buttons.is_empty() {
            let grid = cart.input_grid()?;
            cart.truth_table = Some(TruthTable::build(grid, &self.buttons));
        }
        if !self.strings.is_empty() {
            cart.string_table = Some(self.strings.iter().collect::<StringTable>());
        }
        Ok(cart)
    }
}
