//! Touch truth table
//!
//! Maps quantized touches to command codes. The builder rasterizes button
//! rectangles onto the input grid; the resolver quantizes a touch the same way
//! and looks the cell up. Payload layout (big-endian):
//!
//! ```text
//! u32 record count
//! repeated: u8 key length (6) | 6-byte key | u16 command
//! ```

use indexmap::IndexMap;
use log::debug;
use serde::Deserialize;

use crate::error::SchemaError;
use crate::transform::{ViewTransform, VIRTUAL_SIZE};
use crate::util::PayloadReader;

pub const KEY_LEN: usize = 6;

/// `{mode, touch type, region (u16 BE), gesture, time bucket}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TouchKey {
    pub mode_bits: u8,
    pub touch_type: u8,
    pub region_id: u16,
    pub gesture_id: u8,
    pub time_bucket: u8,
}

impl TouchKey {
    /// A plain tap in `region_id`, every other field zero
    pub fn region(region_id: u16) -> Self {
        TouchKey {
            region_id,
            ..TouchKey::default()
        }
    }

    pub fn to_bytes(self) -> [u8; KEY_LEN] {
        let [hi, lo] = self.region_id.to_be_bytes();
        [self.mode_bits, self.touch_type, hi, lo, self.gesture_id, self.time_bucket]
    }

    pub fn from_bytes(b: [u8; KEY_LEN]) -> Self {
        TouchKey {
            mode_bits: b[0],
            touch_type: b[1],
            region_id: u16::from_be_bytes([b[2], b[3]]),
            gesture_id: b[4],
            time_bucket: b[5],
        }
    }
}

/// Quantization grid laid over the virtual canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputGrid {
    columns: u16,
    rows: u16,
}

impl Default for InputGrid {
    fn default() -> Self {
        InputGrid {
            columns: 64,
            rows: 64,
        }
    }
}

impl InputGrid {
    /// Every region id must fit in a u16
    pub fn new(columns: u16, rows: u16) -> Result<Self, SchemaError> {
        if columns == 0 || rows == 0 || columns as u32 * rows as u32 > u16::MAX as u32 + 1 {
            return Err(SchemaError::BadGrid { columns, rows });
        }
        Ok(InputGrid { columns, rows })
    }

    pub fn columns(&self) -> u16 {
        self.columns
    }

    pub fn rows(&self) -> u16 {
        self.rows
    }

    pub fn cell_width(&self) -> f32 {
        VIRTUAL_SIZE / self.columns as f32
    }

    pub fn cell_height(&self) -> f32 {
        VIRTUAL_SIZE / self.rows as f32
    }

    pub fn region_id(&self, gx: u16, gy: u16) -> u16 {
        gx + gy * self.columns
    }

    /// Quantize a canvas point, clamping to the grid
    pub fn region_at(&self, vx: f32, vy: f32) -> u16 {
        let gx = clamp_cell((vx / self.cell_width()).floor(), self.columns);
        let gy = clamp_cell((vy / self.cell_height()).floor(), self.rows);
        self.region_id(gx, gy)
    }
}

fn clamp_cell(v: f32, count: u16) -> u16 {
    v.max(0.0).min(count.saturating_sub(1) as f32) as u16
}

/// A named hit rectangle in canvas units
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Button {
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    pub command: u16,
}

impl Button {
    /// Inclusive cell span `(first, last)` along one axis, or `None` if the
    /// rectangle misses the canvas on that axis
    fn span(start: f32, size: f32, cell: f32, count: u16) -> Option<(u16, u16)> {
        let lo = start.max(0.0);
        let hi = (start + size).min(VIRTUAL_SIZE);
        if !(hi > lo) {
            return None;
        }
        let first = clamp_cell((lo / cell).floor(), count);
        let last = clamp_cell((hi / cell).ceil() - 1.0, count);
        Some((first, last.max(first)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TruthTable {
    grid: InputGrid,
    entries: IndexMap<TouchKey, u16>,
}

impl TruthTable {
    pub fn new(grid: InputGrid) -> Self {
        TruthTable {
            grid,
            entries: IndexMap::new(),
        }
    }

    /// Rasterize buttons onto the grid. A later button wins any cell it shares
    /// with an earlier one.
    pub fn build(grid: InputGrid, buttons: &[Button]) -> Self {
        let mut table = TruthTable::new(grid);
        for button in buttons {
            let xs = Button::span(button.x, button.w, grid.cell_width(), grid.columns());
            let ys = Button::span(button.y, button.h, grid.cell_height(), grid.rows());
            let (Some((x0, x1)), Some((y0, y1))) = (xs, ys) else {
                debug!("button '{}' lies outside the canvas", button.name);
                continue;
            };
            for gy in y0..=y1 {
                for gx in x0..=x1 {
                    table.insert(TouchKey::region(grid.region_id(gx, gy)), button.command);
                }
            }
            debug!(
                "button '{}' -> command {} over cells ({},{})..=({},{})",
                button.name, button.command, x0, y0, x1, y1
            );
        }
        table
    }

    pub fn grid(&self) -> InputGrid {
        self.grid
    }

    pub fn insert(&mut self, key: TouchKey, command: u16) {
        self.entries.insert(key, command);
    }

    pub fn lookup(&self, key: &TouchKey) -> Option<u16> {
        self.entries.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TouchKey, &u16)> {
        self.entries.iter()
    }

    /// Command for a canvas point, if any
    pub fn resolve_virtual(&self, vx: f32, vy: f32) -> Option<u16> {
        if !(0.0..VIRTUAL_SIZE).contains(&vx) || !(0.0..VIRTUAL_SIZE).contains(&vy) {
            return None;
        }
        self.lookup(&TouchKey::region(self.grid.region_at(vx, vy)))
    }

    /// Command for a screen point seen through `transform`, if any
    pub fn resolve(&self, transform: &ViewTransform, x: f32, y: f32) -> Option<u16> {
        let (vx, vy) = transform.to_virtual(x, y)?;
        self.resolve_virtual(vx, vy)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(4 + self.entries.len() * (1 + KEY_LEN + 2));
        bytes.extend_from_slice(&(self.entries.len() as u32).to_be_bytes());
        for (key, command) in &self.entries {
            bytes.push(KEY_LEN as u8);
            bytes.extend_from_slice(&key.to_bytes());
            bytes.extend_from_slice(&command.to_be_bytes());
        }
        bytes
    }

    pub fn from_bytes(data: &[u8], grid: InputGrid) -> Result<Self, SchemaError> {
        let mut r = PayloadReader::new("truth table", data);
        let count = r.u32()?;
        let mut table = TruthTable::new(grid);
        for _ in 0..count {
            let key_len = r.u8()?;
            if key_len as usize != KEY_LEN {
                return Err(SchemaError::BadKeyLength(key_len));
            }
            let key = TouchKey::from_bytes(r.array()?);
            let command = r.u16()?;
            if table.entries.contains_key(&key) {
                return Err(SchemaError::DuplicateKey(key.region_id));
            }
            table.insert(key, command);
        }
        r.finish()?;
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn button(name: &str, x: f32, y: f32, w: f32, h: f32, command: u16) -> Button {
        Button {
            name: name.to_string(),
            x,
            y,
            w,
            h,
            command,
        }
    }

    #[test]
    fn key_layout() {
        let key = TouchKey {
            mode_bits: 1,
            touch_type: 2,
            region_id: 0x0304,
            gesture_id: 5,
            time_bucket: 6,
        };
        assert_eq!(key.to_bytes(), [1, 2, 3, 4, 5, 6]);
        assert_eq!(TouchKey::from_bytes(key.to_bytes()), key);
    }

    #[test]
    fn region_ids_are_row_major_and_clamped() {
        let grid = InputGrid::default();
        assert_eq!(grid.region_at(0.0, 0.0), 0);
        assert_eq!(grid.region_at(16.0, 24.0), 2 + 3 * 64);
        assert_eq!(grid.region_at(511.9, 511.9), 63 + 63 * 64);
        assert_eq!(grid.region_at(9000.0, -5.0), 63);
    }

    #[test]
    fn single_cell_button_resolves_only_inside_its_cell() {
        let table = TruthTable::build(
            InputGrid::default(),
            &[button("a", 16.0, 24.0, 8.0, 8.0, 4)],
        );
        assert_eq!(table.len(), 1);

        for y in 24..32 {
            for x in 16..24 {
                assert_eq!(table.resolve_virtual(x as f32, y as f32), Some(4));
            }
        }
        assert_eq!(table.resolve_virtual(24.0, 28.0), None);
        assert_eq!(table.resolve_virtual(15.0, 28.0), None);
        assert_eq!(table.resolve_virtual(20.0, 32.0), None);
        assert_eq!(table.resolve_virtual(20.0, 23.0), None);
    }

    #[test]
    fn partial_overlap_covers_the_cell() {
        let table = TruthTable::build(
            InputGrid::default(),
            &[button("sliver", 7.0, 0.0, 2.0, 1.0, 1)],
        );
        assert_eq!(table.len(), 2);
        assert_eq!(table.lookup(&TouchKey::region(0)), Some(1));
        assert_eq!(table.lookup(&TouchKey::region(1)), Some(1));
    }

    #[test]
    fn later_button_wins_shared_cells() {
        let table = TruthTable::build(
            InputGrid::default(),
            &[
                button("wide", 0.0, 0.0, 32.0, 8.0, 1),
                button("narrow", 8.0, 0.0, 8.0, 8.0, 2),
            ],
        );
        assert_eq!(table.len(), 4);
        assert_eq!(table.lookup(&TouchKey::region(0)), Some(1));
        assert_eq!(table.lookup(&TouchKey::region(1)), Some(2));
        assert_eq!(table.lookup(&TouchKey::region(2)), Some(1));
    }

    #[test]
    fn off_canvas_buttons_cover_nothing() {
        let table = TruthTable::build(
            InputGrid::default(),
            &[
                button("left", -50.0, 0.0, 10.0, 10.0, 1),
                button("flat", 10.0, 10.0, 0.0, 10.0, 2),
            ],
        );
        assert!(table.is_empty());
    }

    #[test]
    fn resolve_goes_through_the_view_transform() {
        let table = TruthTable::build(
            InputGrid::default(),
            &[button("a", 16.0, 24.0, 8.0, 8.0, 4)],
        );
        // 1024x1024 screen: scale 2
        let t = ViewTransform::fit(1024.0, 1024.0);
        assert_eq!(table.resolve(&t, 40.0, 56.0), Some(4));
        assert_eq!(table.resolve(&t, 48.0, 56.0), None);
        assert_eq!(table.resolve(&t, -1.0, 56.0), None);
    }

    #[test]
    fn payload_layout() {
        let mut table = TruthTable::new(InputGrid::default());
        table.insert(TouchKey::region(0x0102), 6);
        let bytes = table.to_bytes();
        assert_eq!(bytes, vec![0, 0, 0, 1, 6, 0, 0, 0x01, 0x02, 0, 0, 0, 6]);
        assert_eq!(
            TruthTable::from_bytes(&bytes, InputGrid::default()).unwrap(),
            table
        );
    }

    #[test]
    fn malformed_payloads() {
        let grid = InputGrid::default();
        assert!(matches!(
            TruthTable::from_bytes(&[0, 0, 0, 2, 6, 0, 0, 0, 1, 0, 0, 0, 1], grid),
            Err(SchemaError::Truncated { .. })
        ));
        assert_eq!(
            TruthTable::from_bytes(&[0, 0, 0, 1, 5, 0, 0, 0, 1, 0, 0, 1], grid),
            Err(SchemaError::BadKeyLength(5))
        );
    }

    #[test]
    fn grid_must_fit_region_ids() {
        assert!(InputGrid::new(256, 256).is_ok());
        assert!(InputGrid::new(256, 257).is_err());
        assert!(InputGrid::new(0, 8).is_err());
    }

    #[test]
    fn grid_is_only_built_validated() {
        let grid = InputGrid::new(8, 4).unwrap();
        assert_eq!((grid.columns(), grid.rows()), (8, 4));
        assert_eq!(grid.region_at(511.0, 511.0), 31);
        assert_eq!(grid.region_at(-5.0, 600.0), 24);
        assert_eq!(InputGrid::default().columns(), 64);
    }

    #[test]
    fn repeated_key_is_rejected() {
        let grid = InputGrid::default();
        let entry = [6, 0, 0, 0x01, 0x02, 0, 0];
        let mut bytes = vec![0, 0, 0, 2];
        bytes.extend_from_slice(&entry);
        bytes.extend_from_slice(&[0, 5]);
        bytes.extend_from_slice(&entry);
        bytes.extend_from_slice(&[0, 6]);
        assert_eq!(
            TruthTable::from_bytes(&bytes, grid),
            Err(SchemaError::DuplicateKey(0x0102))
        );

        // Same region, different gesture: two distinct keys
        bytes[4 + 9 + 5] = 1;
        assert_eq!(TruthTable::from_bytes(&bytes, grid).unwrap().len(), 2);
    }
}
