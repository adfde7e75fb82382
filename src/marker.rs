//! JPEG marker-stream splicer
//!
//! Walks the marker segments between start-of-image and start-of-scan. Cartridge
//! blocks travel in APP11 segments inserted right before start-of-scan; the
//! entropy-coded data after that point is never read or modified.

use crate::block::{Block, BLOCK_MAGIC};
use crate::error::{CapacityError, CartridgeError, Result, StructuralError};
use log::debug;

pub const MARKER_PREFIX: u8 = 0xFF;
pub const SOI: u8 = 0xD8;
pub const EOI: u8 = 0xD9;
pub const SOS: u8 = 0xDA;
pub const TEM: u8 = 0x01;
pub const RST0: u8 = 0xD0;
pub const RST7: u8 = 0xD7;

/// APP11 carries cartridge blocks
pub const CARTRIDGE_MARKER: u8 = 0xEB;

/// Largest payload a segment can carry (the length field counts itself)
pub const MAX_SEGMENT_PAYLOAD: usize = u16::MAX as usize - 2;

/// Default cumulative ceiling on cartridge bytes pulled out of one file
pub const DEFAULT_MAX_CARTRIDGE_BYTES: usize = 1 << 20;

/// A length-bearing marker segment found during the walk
#[derive(Debug, Clone, Copy)]
pub struct Segment<'a> {
    pub marker: u8,
    /// Offset of the 0xFF that introduces the marker
    pub start: usize,
    /// Offset one past the last payload byte
    pub end: usize,
    pub payload: &'a [u8],
}

impl Segment<'_> {
    /// APP11 segment whose payload opens with the block magic
    pub fn is_cartridge_block(&self) -> bool {
        self.marker == CARTRIDGE_MARKER && self.payload.starts_with(&BLOCK_MAGIC)
    }
}

fn has_no_length(marker: u8) -> bool {
    marker == TEM || (RST0..=RST7).contains(&marker)
}

/// Walk the marker stream, calling `visit` for every length-bearing segment.
/// Returns the offset of the start-of-scan marker.
pub fn walk_segments<'a, F>(jpeg: &'a [u8], mut visit: F) -> Result<usize>
where
    F: FnMut(&Segment<'a>) -> Result<()>,
{
    if jpeg.len() < 2 || jpeg[0] != MARKER_PREFIX || jpeg[1] != SOI {
        return Err(StructuralError::NotJpeg.into());
    }

    let mut pos = 2;
    loop {
        let Some(&lead) = jpeg.get(pos) else {
            return Err(StructuralError::Truncated(pos).into());
        };
        if lead != MARKER_PREFIX {
            return Err(StructuralError::ExpectedMarker {
                offset: pos,
                found: lead,
            }
            .into());
        }

        // Fill bytes: any run of 0xFF before the marker code
        while jpeg.get(pos) == Some(&MARKER_PREFIX) {
            pos += 1;
        }
        let start = pos - 1;
        let Some(&marker) = jpeg.get(pos) else {
            return Err(StructuralError::Truncated(pos).into());
        };
        pos += 1;

        match marker {
            SOS => return Ok(start),
            EOI => return Err(StructuralError::EndBeforeScan(start).into()),
            m if has_no_length(m) => continue,
            _ => {}
        }

        if pos + 2 > jpeg.len() {
            return Err(StructuralError::Truncated(pos).into());
        }
        let length = u16::from_be_bytes([jpeg[pos], jpeg[pos + 1]]);
        if length < 2 {
            return Err(StructuralError::BadSegmentLength {
                offset: start,
                length,
            }
            .into());
        }
        let end = pos + length as usize;
        if end > jpeg.len() {
            return Err(StructuralError::Truncated(jpeg.len()).into());
        }

        let segment = Segment {
            marker,
            start,
            end,
            payload: &jpeg[pos + 2..end],
        };
        visit(&segment)?;
        pos = end;
    }
}

/// Offset of the start-of-scan marker, where cartridge segments go
pub fn locate_splice_point(jpeg: &[u8]) -> Result<usize> {
    walk_segments(jpeg, |_| Ok(()))
}

/// Encode a block and check that it fits in one marker segment
pub fn segment_payload(block: &Block) -> Result<Vec<u8>> {
    let bytes = block.encode()?;
    if bytes.len() > MAX_SEGMENT_PAYLOAD {
        return Err(CapacityError::SegmentTooLarge {
            size: bytes.len(),
            limit: MAX_SEGMENT_PAYLOAD,
        }
        .into());
    }
    Ok(bytes)
}

/// Rebuild `jpeg` with `blocks` as APP11 segments right before start-of-scan.
///
/// Cartridge segments already present are dropped so that a file carries one
/// cartridge. Every other byte, including foreign APP11 segments, is copied as is.
pub fn splice(jpeg: &[u8], blocks: &[Block]) -> Result<Vec<u8>> {
    let payloads = blocks
        .iter()
        .map(segment_payload)
        .collect::<Result<Vec<_>>>()?;

    let mut stale = Vec::new();
    let splice_point = walk_segments(jpeg, |seg| {
        if seg.is_cartridge_block() {
            stale.push((seg.start, seg.end));
        }
        Ok(())
    })?;

    let added: usize = payloads.iter().map(|p| p.len() + 4).sum();
    let mut out = Vec::with_capacity(jpeg.len() + added);

    let mut cursor = 0;
    for (start, end) in stale {
        out.extend_from_slice(&jpeg[cursor..start]);
        cursor = end;
    }
    out.extend_from_slice(&jpeg[cursor..splice_point]);

    for payload in &payloads {
        out.push(MARKER_PREFIX);
        out.push(CARTRIDGE_MARKER);
        out.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
        out.extend_from_slice(payload);
    }

    out.extend_from_slice(&jpeg[splice_point..]);

    debug!(
        "spliced {} blocks ({} bytes) at offset {:#x}",
        payloads.len(),
        added,
        splice_point
    );
    Ok(out)
}

/// Pull every cartridge block out of `jpeg`, in file order.
///
/// `max_bytes` bounds the total segment payload accepted; going past it is a
/// hard failure rather than a truncated result.
pub fn extract(jpeg: &[u8], max_bytes: usize) -> Result<Vec<Block>> {
    let mut blocks = Vec::new();
    let mut total = 0usize;

    walk_segments(jpeg, |seg| {
        if !seg.is_cartridge_block() {
            return Ok(());
        }
        total += seg.payload.len();
        if total > max_bytes {
            return Err(CapacityError::CartridgeTooLarge { limit: max_bytes }.into());
        }
        let block = Block::decode(seg.payload).map_err(CartridgeError::from)?;
        debug!("extracted {} block at {:#x}", block.block_type.name(), seg.start);
        blocks.push(block);
        Ok(())
    })?;

    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockType;
    use crate::error::{BlockError, ErrorClass};
    use crate::test_utils::{tiny_jpeg, TINY_SCAN};

    fn blocks() -> Vec<Block> {
        vec![
            Block::new(BlockType::Header, vec![0; 30]),
            Block::new(BlockType::Bytecode, vec![0x40, 0x01, 0x01]),
        ]
    }

    #[test]
    fn splice_point_is_start_of_scan() {
        let jpeg = tiny_jpeg();
        let sos = locate_splice_point(&jpeg).unwrap();
        assert_eq!(&jpeg[sos..sos + 2], &[0xFF, SOS]);
        assert!(jpeg[sos..].ends_with(TINY_SCAN));
    }

    #[test]
    fn round_trip_preserves_blocks_and_image() {
        let jpeg = tiny_jpeg();
        let sos = locate_splice_point(&jpeg).unwrap();
        let out = splice(&jpeg, &blocks()).unwrap();

        assert_eq!(extract(&out, DEFAULT_MAX_CARTRIDGE_BYTES).unwrap(), blocks());
        assert_eq!(&out[..sos], &jpeg[..sos]);
        assert!(out.ends_with(&jpeg[sos..]));
    }

    #[test]
    fn splicing_twice_replaces_the_cartridge() {
        let jpeg = tiny_jpeg();
        let once = splice(&jpeg, &blocks()).unwrap();
        let replacement = vec![Block::new(BlockType::StringTable, vec![0, 0])];
        let twice = splice(&once, &replacement).unwrap();

        assert_eq!(extract(&twice, DEFAULT_MAX_CARTRIDGE_BYTES).unwrap(), replacement);
        assert_eq!(splice(&twice, &[]).unwrap(), jpeg);
    }

    #[test]
    fn foreign_app11_segments_are_ignored_and_kept() {
        let mut jpeg = tiny_jpeg();
        let sos = locate_splice_point(&jpeg).unwrap();
        let foreign = [0xFF, CARTRIDGE_MARKER, 0x00, 0x06, b'J', b'P', 0x00, 0x01];
        jpeg.splice(sos..sos, foreign.iter().copied());

        let out = splice(&jpeg, &blocks()).unwrap();
        assert!(out.windows(foreign.len()).any(|w| w == foreign));
        assert_eq!(extract(&out, DEFAULT_MAX_CARTRIDGE_BYTES).unwrap(), blocks());
    }

    #[test]
    fn fill_bytes_and_standalone_markers_are_skipped() {
        let mut jpeg = tiny_jpeg();
        jpeg.splice(2..2, [0xFF, 0xFF, 0xFF, TEM, 0xFF, RST0 + 3]);
        assert!(locate_splice_point(&jpeg).is_ok());
    }

    #[test]
    fn structural_failures() {
        let jpeg = tiny_jpeg();
        let sos = locate_splice_point(&jpeg).unwrap();

        let err = locate_splice_point(b"GIF89a").unwrap_err();
        assert_eq!(err, StructuralError::NotJpeg.into());

        let err = locate_splice_point(&jpeg[..10]).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Structural);

        let mut eoi = jpeg[..sos].to_vec();
        eoi.extend_from_slice(&[0xFF, EOI]);
        assert!(matches!(
            locate_splice_point(&eoi),
            Err(CartridgeError::Structural(StructuralError::EndBeforeScan(_)))
        ));

        let mut bad_len = jpeg.clone();
        bad_len[4] = 0x00;
        bad_len[5] = 0x01;
        assert!(matches!(
            locate_splice_point(&bad_len),
            Err(CartridgeError::Structural(StructuralError::BadSegmentLength { length: 1, .. }))
        ));

        let mut stray = jpeg[..sos].to_vec();
        stray.push(0x00);
        stray.extend_from_slice(&jpeg[sos..]);
        assert!(matches!(
            locate_splice_point(&stray),
            Err(CartridgeError::Structural(StructuralError::ExpectedMarker { found: 0x00, .. }))
        ));
    }

    #[test]
    fn oversized_block_is_rejected_before_splicing() {
        let big = Block::new(BlockType::Fs, vec![0; MAX_SEGMENT_PAYLOAD]);
        let err = splice(&tiny_jpeg(), &[big]).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Capacity);
    }

    #[test]
    fn extraction_ceiling_is_enforced() {
        let out = splice(&tiny_jpeg(), &blocks()).unwrap();
        let err = extract(&out, 40).unwrap_err();
        assert_eq!(err, CapacityError::CartridgeTooLarge { limit: 40 }.into());
    }

    #[test]
    fn corrupt_block_fails_the_whole_extraction() {
        let mut out = splice(&tiny_jpeg(), &blocks()).unwrap();
        let sos = locate_splice_point(&out).unwrap();
        // Last byte before SOS is the final block's CRC
        out[sos - 1] ^= 0x01;
        assert!(matches!(
            extract(&out, DEFAULT_MAX_CARTRIDGE_BYTES),
            Err(CartridgeError::Block(BlockError::CrcMismatch { .. }))
        ));
    }
}
