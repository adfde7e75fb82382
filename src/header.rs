use std::fmt::Display;
use std::fmt::Error;
use std::fmt::Formatter;

use crate::error::SchemaError;
use crate::util::PayloadReader;

/// Encoded size of the header payload
pub const HEADER_LEN: usize = 30;

/// Cartridge header payload. All integers big-endian:
///
/// ```text
/// 0   u32  entry point
/// 4   u16  framebuffer width
/// 6   u16  framebuffer height
/// 8   u16  target frame rate
/// 10  u16  input grid columns
/// 12  u16  input grid rows
/// 14  u32  feature flags
/// 18  u32  reserved, zero
/// 22  u8   capability hint (gradient fidelity)
/// 23  u8   capability hint (gradient fidelity)
/// 24  u16  reserved, zero
/// 26  [4]  subsystem tag
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub entry_point: u32,
    pub framebuffer_width: u16,
    pub framebuffer_height: u16,
    pub frame_rate: u16,
    pub grid_columns: u16,
    pub grid_rows: u16,
    pub features: u32,
    /// Reserved for gradient-fidelity negotiation, always zero today
    pub capability_hints: [u8; 2],
    /// Namespaces the PRNG seed
    pub os_tag: [u8; 4],
}

impl Default for Header {
    fn default() -> Self {
        Header {
            entry_point: 0,
            framebuffer_width: 512,
            framebuffer_height: 512,
            frame_rate: 8,
            grid_columns: 64,
            grid_rows: 64,
            features: 0,
            capability_hints: [0, 0],
            os_tag: *b"SNAK",
        }
    }
}

impl Header {
    pub fn os_id(&self) -> u32 {
        u32::from_be_bytes(self.os_tag)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN);
        bytes.extend_from_slice(&self.entry_point.to_be_bytes());
        bytes.extend_from_slice(&self.framebuffer_width.to_be_bytes());
        bytes.extend_from_slice(&self.framebuffer_height.to_be_bytes());
        bytes.extend_from_slice(&self.frame_rate.to_be_bytes());
        bytes.extend_from_slice(&self.grid_columns.to_be_bytes());
        bytes.extend_from_slice(&self.grid_rows.to_be_bytes());
        bytes.extend_from_slice(&self.features.to_be_bytes());
        bytes.extend_from_slice(&0u32.to_be_bytes());
        bytes.extend_from_slice(&self.capability_hints);
        bytes.extend_from_slice(&0u16.to_be_bytes());
        bytes.extend_from_slice(&self.os_tag);
        bytes
    }

    pub fn from_bytes(data: &[u8]) -> Result<Header, SchemaError> {
        let mut r = PayloadReader::new("header", data);
        let entry_point = r.u32()?;
        let framebuffer_width = r.u16()?;
        let framebuffer_height = r.u16()?;
        let frame_rate = r.u16()?;
        let grid_columns = r.u16()?;
        let grid_rows = r.u16()?;
        let features = r.u32()?;
        let _reserved = r.u32()?;
        let capability_hints = r.array::<2>()?;
        let _reserved = r.u16()?;
        let os_tag = r.array::<4>()?;
        r.finish()?;

        Ok(Header {
            entry_point,
            framebuffer_width,
            framebuffer_height,
            frame_rate,
            grid_columns,
            grid_rows,
            features,
            capability_hints,
            os_tag,
        })
    }
}

impl Display for Header {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(
            f,
            "
Entry point:              {:#06x}
Framebuffer:              {}x{}
Frame rate:               {}
Input grid:               {}x{}
Feature flags:            {:#010x}
Capability hints:         {:02x?}
Subsystem tag:            {} ({:#010x})
",
            self.entry_point,
            self.framebuffer_width,
            self.framebuffer_height,
            self.frame_rate,
            self.grid_columns,
            self.grid_rows,
            self.features,
            self.capability_hints,
            String::from_utf8_lossy(&self.os_tag),
            self.os_id(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout() {
        let header = Header {
            entry_point: 3,
            framebuffer_width: 320,
            framebuffer_height: 480,
            frame_rate: 10,
            grid_columns: 64,
            grid_rows: 64,
            features: 0x8000_0001,
            capability_hints: [0, 0],
            os_tag: *b"SNAK",
        };
        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), HEADER_LEN);
        assert_eq!(&bytes[0..4], &[0, 0, 0, 3]);
        assert_eq!(&bytes[4..6], &[0x01, 0x40]);
        assert_eq!(&bytes[14..18], &[0x80, 0, 0, 0x01]);
        assert_eq!(&bytes[18..22], &[0, 0, 0, 0]);
        assert_eq!(&bytes[24..26], &[0, 0]);
        assert_eq!(&bytes[26..30], b"SNAK");
        assert_eq!(header.os_id(), 0x534E_414B);

        assert_eq!(Header::from_bytes(&bytes).unwrap(), header);
    }

    #[test]
    fn short_header_is_a_schema_error() {
        let bytes = Header::default().to_bytes();
        assert!(matches!(
            Header::from_bytes(&bytes[..29]),
            Err(SchemaError::Truncated { kind: "header", .. })
        ));
    }

    #[test]
    fn long_header_is_a_schema_error() {
        let mut bytes = Header::default().to_bytes();
        bytes.push(0);
        assert!(matches!(
            Header::from_bytes(&bytes),
            Err(SchemaError::TrailingBytes { .. })
        ));
    }
}
