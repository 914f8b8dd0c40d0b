//! # Print Head Format Pipeline
//!
//! This module rotates a host-order [`PixelBuffer`] into the byte order the
//! print head's datapath consumes, in three fixed stages:
//!
//! ```text
//! ┌─────────────┐    ┌──────────────┐    ┌───────────┐    ┌───────────┐
//! │ row-major   │ ─► │ column-major │ ─► │ byte-pair │ ─► │ polarity  │
//! │ PixelBuffer │    │ reorder      │    │ swap      │    │ inversion │
//! └─────────────┘    └──────────────┘    └───────────┘    └───────────┘
//! ```
//!
//! ## Stage 1: Column-Major Reorder
//!
//! The head prints one dot column at a time, scanning bottom-to-top. Each
//! column becomes a `height / 8`-byte group; pixel `(x, y)` lands in column
//! `x` at byte `(H-1-y) / 8`, bit `(H-1-y) % 8`. Only black pixels are
//! written, so the output must start zeroed. This stage never aliases its
//! input.
//!
//! ## Stage 2: Byte-Pair Swap
//!
//! The datapath reads each column as big-endian 16-bit words while stage 1
//! produces little-endian byte order, so bytes `i` and `i+1` are exchanged
//! for every even `i`. Applying the swap twice restores the original.
//!
//! ## Stage 3: Polarity Inversion
//!
//! The firmware treats cleared bits as "print" and set bits as "skip".
//! Inversion runs last so every earlier stage keeps the intuitive
//! 1 = black convention. Its own inverse, like stage 2.
//!
//! Stages 2 and 3 are byte-level bijections and run in place; they are
//! applied in order from [`PACKING_STAGES`], so a device variant that skips
//! one simply carries a shorter list.

use crate::bitmap::PixelBuffer;
use crate::error::EtiquetaError;
use crate::printer::PrinterConfig;

/// One in-place byte transform applied after the column-major reorder.
pub type PackingStage = fn(&mut [u8]);

/// The in-place stages, in required order: word swap, then inversion.
pub const PACKING_STAGES: &[PackingStage] = &[swap_byte_pairs, invert_polarity];

/// Rotate a row-major raster into bottom-to-top column-major order.
///
/// `out` must be zeroed and exactly `image.as_bytes().len()` long; only
/// black pixels set bits (sparse write).
pub fn column_major_reorder(image: &PixelBuffer, out: &mut [u8]) {
    debug_assert_eq!(
        out.len(),
        image.as_bytes().len(),
        "output must match the raster size"
    );

    let width = image.width() as i32;
    let height = image.height() as i32;
    let bytes_per_column = (height / 8) as usize;

    for x in 0..width {
        let column = x as usize * bytes_per_column;
        for y in 0..height {
            if image.get(x, y) {
                let flipped = height - 1 - y;
                out[column + (flipped / 8) as usize] |= 1 << (flipped % 8);
            }
        }
    }
}

/// Exchange bytes `i` and `i+1` for every even offset `i`.
///
/// An involution: applying it twice is the identity.
pub fn swap_byte_pairs(buf: &mut [u8]) {
    for pair in buf.chunks_exact_mut(2) {
        pair.swap(0, 1);
    }
}

/// XOR every byte with `0xFF`.
///
/// An involution: applying it twice is the identity.
pub fn invert_polarity(buf: &mut [u8]) {
    for byte in buf.iter_mut() {
        *byte ^= 0xFF;
    }
}

/// Run the full pipeline, producing the device-native buffer.
///
/// The image dimensions must match the printer's head geometry. The output
/// is freshly allocated; the input raster is never touched.
///
/// ## Example
///
/// ```
/// use etiqueta::{transform, PixelBuffer, PrinterConfig};
///
/// let config = PrinterConfig::LP384;
/// let blank = PixelBuffer::for_printer(&config)?;
/// let native = transform::to_printer_format(&blank, &config)?;
///
/// // A blank label is all "skip" bits after inversion
/// assert!(native.iter().all(|&b| b == 0xFF));
/// assert_eq!(native.len(), config.bitmap_size());
/// # Ok::<(), etiqueta::EtiquetaError>(())
/// ```
///
/// ## Errors
///
/// - [`EtiquetaError::Image`] if the raster does not match the head geometry
/// - [`EtiquetaError::Allocation`] if the output buffer cannot be reserved
pub fn to_printer_format(
    image: &PixelBuffer,
    config: &PrinterConfig,
) -> Result<Vec<u8>, EtiquetaError> {
    if image.width() != config.width || image.height() != config.height {
        return Err(EtiquetaError::Image(format!(
            "raster is {}x{}, {} expects {}x{}",
            image.width(),
            image.height(),
            config.name,
            config.width,
            config.height
        )));
    }

    let size = config.bitmap_size();
    let mut out = Vec::new();
    out.try_reserve_exact(size)
        .map_err(|e| EtiquetaError::Allocation(format!("transform buffer ({size} bytes): {e}")))?;
    out.resize(size, 0x00);

    column_major_reorder(image, &mut out);
    for stage in PACKING_STAGES {
        stage(&mut out);
    }

    Ok(out)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// 16 columns of one byte each; small enough to hand-check.
    const TEST_CONFIG: PrinterConfig = PrinterConfig {
        name: "TEST16x8",
        width: 16,
        height: 8,
        dpi: 203,
        chunk_width: 85,
        command_id: [0x1B, 0x2F, 0x03, 0x01, 0x00, 0x01, 0x00, 0x01],
    };

    #[test]
    fn test_reorder_flips_vertically() {
        let mut image = PixelBuffer::new(16, 8).unwrap();
        // top-left pixel lands in the top bit of column 0
        image.set(0, 0, true);
        // bottom-left pixel lands in the bottom bit of column 0
        image.set(0, 7, true);

        let mut out = vec![0u8; 16];
        column_major_reorder(&image, &mut out);

        // (0,0): flipped row 7 -> bit 7; (0,7): flipped row 0 -> bit 0
        assert_eq!(out[0], 0x81);
        assert!(out[1..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_reorder_column_addressing() {
        let mut image = PixelBuffer::new(16, 8).unwrap();
        image.set(5, 3, true);

        let mut out = vec![0u8; 16];
        column_major_reorder(&image, &mut out);

        // column 5, flipped row 8-1-3 = 4 -> bit 4
        assert_eq!(out[5], 1 << 4);
    }

    #[test]
    fn test_reorder_multi_byte_columns() {
        // 96 rows -> 12 bytes per column
        let mut image = PixelBuffer::new(4, 96).unwrap();
        image.set(2, 95, true);

        let mut out = vec![0u8; 4 * 12];
        column_major_reorder(&image, &mut out);

        // column 2 starts at byte 24; flipped row 0 -> byte 0, bit 0
        assert_eq!(out[24], 0x01);
    }

    #[test]
    fn test_reorder_is_sparse() {
        let image = PixelBuffer::new(16, 8).unwrap();
        let mut out = vec![0u8; 16];
        column_major_reorder(&image, &mut out);
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_swap_byte_pairs() {
        let mut buf = vec![0x11, 0x22, 0x33, 0x44];
        swap_byte_pairs(&mut buf);
        assert_eq!(buf, vec![0x22, 0x11, 0x44, 0x33]);
    }

    #[test]
    fn test_swap_is_involution() {
        let original: Vec<u8> = (0..48).collect();
        let mut buf = original.clone();

        swap_byte_pairs(&mut buf);
        assert_ne!(buf, original);
        swap_byte_pairs(&mut buf);
        assert_eq!(buf, original);
    }

    #[test]
    fn test_invert_is_involution() {
        let original: Vec<u8> = (0..48).collect();
        let mut buf = original.clone();

        invert_polarity(&mut buf);
        assert_ne!(buf, original);
        invert_polarity(&mut buf);
        assert_eq!(buf, original);
    }

    #[test]
    fn test_invert_polarity() {
        let mut buf = vec![0x00, 0xFF, 0xA5];
        invert_polarity(&mut buf);
        assert_eq!(buf, vec![0xFF, 0x00, 0x5A]);
    }

    #[test]
    fn test_full_pipeline_blank_label() {
        let blank = PixelBuffer::new(16, 8).unwrap();
        let out = to_printer_format(&blank, &TEST_CONFIG).unwrap();
        // no marks anywhere: every bit is "skip" after inversion
        assert_eq!(out, vec![0xFF; 16]);
    }

    #[test]
    fn test_full_pipeline_single_pixel() {
        let mut image = PixelBuffer::new(16, 8).unwrap();
        image.set(0, 0, true);

        let out = to_printer_format(&image, &TEST_CONFIG).unwrap();

        // reorder puts the mark in byte 0 (bit 7); the pair swap moves it
        // to byte 1; inversion clears that bit and sets all others
        assert_eq!(out[0], 0xFF);
        assert_eq!(out[1], !0x80);
        assert!(out[2..].iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_pipeline_rejects_mismatched_raster() {
        let image = PixelBuffer::new(8, 8).unwrap();
        let result = to_printer_format(&image, &TEST_CONFIG);
        assert!(matches!(result, Err(EtiquetaError::Image(_))));
    }

    #[test]
    fn test_input_is_untouched() {
        let mut image = PixelBuffer::new(16, 8).unwrap();
        image.set(3, 4, true);
        let before = image.clone();

        let _ = to_printer_format(&image, &TEST_CONFIG).unwrap();
        assert_eq!(image, before);
    }
}
