//! Synthetic scan containers for tests.

use std::path::Path;

/// Fixed frame offset used by the synthetic containers; real instruments pad
/// their headers the same way.
pub const DATA_OFFSET: usize = 4096;

/// Build the bytes of a single-channel scan container.
///
/// `raw` is row-major, `rows * cols` little-endian `i16` counts; the header
/// advertises `nm_per_lsb` as the Z-scale calibration.
pub fn container_bytes(
    channel: &str,
    rows: usize,
    cols: usize,
    raw: &[i16],
    nm_per_lsb: f64,
) -> Vec<u8> {
    assert_eq!(raw.len(), rows * cols, "raw frame must fill the image");

    let mut header = String::new();
    header.push_str("\\*File list\r\n");
    header.push_str("\\Version: 0x09400202\r\n");
    header.push_str("\\Date: 01:00:00 PM Mon Jan 01 2024\r\n");
    header.push_str("\\*Ciao image list\r\n");
    header.push_str(&format!("\\Data offset: {DATA_OFFSET}\r\n"));
    header.push_str(&format!("\\Data length: {}\r\n", raw.len() * 2));
    header.push_str("\\Bytes/pixel: 2\r\n");
    header.push_str(&format!("\\Samps/line: {cols}\r\n"));
    header.push_str(&format!("\\Number of lines: {rows}\r\n"));
    header.push_str(&format!(
        "\\@2:Z scale: V [Sens. Zsens] ({nm_per_lsb} nm/LSB) 100.0 nm\r\n"
    ));
    header.push_str(&format!(
        "\\@2:Image Data: S [{channel}] \"{channel}\"\r\n"
    ));
    header.push_str("\\*File list end\r\n");
    assert!(header.len() <= DATA_OFFSET, "header overflows the frame offset");

    let mut bytes = header.into_bytes();
    bytes.resize(DATA_OFFSET, 0);
    for value in raw {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Write a synthetic container to `path`.
pub fn write_container(
    path: &Path,
    channel: &str,
    rows: usize,
    cols: usize,
    raw: &[i16],
    nm_per_lsb: f64,
) {
    std::fs::write(path, container_bytes(channel, rows, cols, raw, nm_per_lsb)).unwrap();
}
