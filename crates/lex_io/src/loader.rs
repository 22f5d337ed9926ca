use anyhow::{Context, Result, ensure};
use bitvec::prelude::*;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Widest frame a GPIO bank can take.
pub const MAX_PINS: usize = 32;

/// Loads a raw .b8 stimulus stream (LSB first).
pub fn load_b8_file<P: AsRef<Path>>(path: P) -> Result<BitVec<u8, Lsb0>> {
    let mut file = File::open(path).context("Failed to open .b8 file")?;
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)?;

    Ok(BitVec::<u8, Lsb0>::from_vec(buffer))
}

/// Splits a stream into input words, one per frame.
///
/// Each frame holds `pins` bits padded to a whole byte; bit `i` of a frame
/// becomes bit `i` of its word. A trailing partial frame is dropped.
pub fn slice_frames(raw_bits: &BitSlice<u8, Lsb0>, pins: usize) -> Result<Vec<u32>> {
    ensure!(
        (1..=MAX_PINS).contains(&pins),
        "frame width must be 1..={MAX_PINS} pins, got {pins}"
    );
    let stride_bits = pins.div_ceil(8) * 8;

    Ok(raw_bits
        .chunks_exact(stride_bits)
        .map(|frame| frame[..pins].load_le::<u32>())
        .collect())
}

/// Packs input words into a stream readable by [`slice_frames`].
pub fn encode_frames(frames: &[u32], pins: usize) -> Result<BitVec<u8, Lsb0>> {
    ensure!(
        (1..=MAX_PINS).contains(&pins),
        "frame width must be 1..={MAX_PINS} pins, got {pins}"
    );
    let stride_bits = pins.div_ceil(8) * 8;
    let mut bits = bitvec![u8, Lsb0; 0; frames.len() * stride_bits];

    for (frame, &word) in bits.chunks_exact_mut(stride_bits).zip(frames) {
        let masked = if pins == MAX_PINS { word } else { word & ((1 << pins) - 1) };
        frame[..pins].store_le(masked);
    }
    Ok(bits)
}

/// Writes a stimulus stream to disk.
pub fn save_b8_file<P: AsRef<Path>>(path: P, frames: &[u32], pins: usize) -> Result<()> {
    let bits = encode_frames(frames, pins)?;
    let mut file = File::create(path).context("Failed to create .b8 file")?;
    file.write_all(bits.as_raw_slice())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_are_padded_to_bytes() {
        // 12 pins: two bytes per frame, upper nibble of the second ignored.
        let bits = BitVec::<u8, Lsb0>::from_vec(vec![0xEF, 0xFB, 0x01, 0x00, 0xAA]);
        let frames = slice_frames(&bits, 12).unwrap();
        assert_eq!(frames, [0xBEF, 0x001]);
    }

    #[test]
    fn full_width_frames_are_little_endian() {
        let bits = BitVec::<u8, Lsb0>::from_vec(vec![0x78, 0x56, 0x34, 0x12]);
        assert_eq!(slice_frames(&bits, 32).unwrap(), [0x1234_5678]);
    }

    #[test]
    fn rejects_impossible_widths() {
        let bits = BitVec::<u8, Lsb0>::from_vec(vec![0; 8]);
        assert!(slice_frames(&bits, 0).is_err());
        assert!(slice_frames(&bits, 33).is_err());
    }

    #[test]
    fn encoded_frames_slice_back() {
        let frames = [0x0000, 0xFFFF, 0x8001, 0x1234];
        let bits = encode_frames(&frames, 16).unwrap();
        assert_eq!(bits.as_raw_slice(), [0, 0, 0xFF, 0xFF, 0x01, 0x80, 0x34, 0x12]);
        assert_eq!(slice_frames(&bits, 16).unwrap(), frames);

        let narrow = encode_frames(&[0xFF], 3).unwrap();
        assert_eq!(narrow.as_raw_slice(), [0x07]);
    }

    #[test]
    fn file_round_trip() {
        let path = std::env::temp_dir().join(format!("lex_io_{}.b8", std::process::id()));
        save_b8_file(&path, &[0x5, 0xA], 4).unwrap();
        let frames = slice_frames(&load_b8_file(&path).unwrap(), 4).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(frames, [0x5, 0xA]);
    }
}
