// Test fixtures shared by unit and integration tests

/// Entropy-coded tail of [`tiny_jpeg`], from start-of-scan to end-of-image
pub const TINY_SCAN: &[u8] = &[
    0xFF, 0xDA, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00, 0x3F, 0x00, // SOS
    0x12, 0x34, 0xFF, 0x00, 0x56, 0xFF, 0xD0, 0x78, // scan data with stuffing and a restart
    0xFF, 0xD9, // EOI
];

/// A structurally valid 8x8 greyscale JPEG marker stream.
///
/// The tables are not meaningful image data; only the marker framing matters here.
pub fn tiny_jpeg() -> Vec<u8> {
    let mut jpeg = vec![0xFF, 0xD8];

    // APP0 JFIF
    jpeg.extend_from_slice(&[
        0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0x01, 0x01, 0x00, 0x00, 0x01, 0x00,
        0x01, 0x00, 0x00,
    ]);

    // DQT, one 8-bit table
    jpeg.extend_from_slice(&[0xFF, 0xDB, 0x00, 0x43, 0x00]);
    jpeg.extend((1..=64).map(|q| q as u8));

    // SOF0, 8x8, one component
    jpeg.extend_from_slice(&[
        0xFF, 0xC0, 0x00, 0x0B, 0x08, 0x00, 0x08, 0x00, 0x08, 0x01, 0x01, 0x11, 0x00,
    ]);

    // DHT stub
    jpeg.extend_from_slice(&[0xFF, 0xC4, 0x00, 0x05, 0x00, 0x00, 0x00]);

    jpeg.extend_from_slice(TINY_SCAN);
    jpeg
}
