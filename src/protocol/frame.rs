//! # Frame Encoding
//!
//! This module builds the checksum-terminated frames the printer accepts on
//! its write characteristic.
//!
//! ## Frame Layout
//!
//! All multi-byte fields are little-endian unless noted:
//!
//! | Offset | Size | Field | Notes |
//! |--------|------|-------|-------|
//! | 0 | 1 | magic | constant `0x66` |
//! | 1 | 2 | frame length | bytes following this field |
//! | 3 | 8 | command id | constant per device model |
//! | 11 | 2 | job id | increments per print job |
//! | 13 | 1 | frame-type marker | `0x55` data, `0x34` final |
//! | 14 | 2 | frames remaining | **big-endian**; 0 on the final frame |
//! | 16 | var | payload | one compressed chunk |
//! | — | 3 | end marker | `11 00 00` |
//! | last | 1 | checksum | whole frame sums to 0 mod 256 |
//!
//! The firmware reads the frames-remaining field big-endian even though
//! every other field is little-endian; getting this wrong stalls the
//! printer mid-job.
//!
//! ## Transport-Unit Splitting
//!
//! A logical frame larger than the link's negotiated unit size is written
//! as a leading unit followed by continuation units. Continuations are raw
//! byte slices of the same frame — no header of their own — and must go
//! out back-to-back before anything from another frame.

use crate::printer::PrinterConfig;

/// First byte of every frame.
pub const MAGIC: u8 = 0x66;

/// Marker for a data frame with more frames to follow.
pub const DATA_FRAME_MARKER: u8 = 0x55;

/// Marker for the last frame of a job.
pub const FINAL_FRAME_MARKER: u8 = 0x34;

/// Fixed trailer preceding the checksum byte.
pub const END_MARKER: [u8; 3] = [0x11, 0x00, 0x00];

/// Header bytes before the payload.
pub const HEADER_LEN: usize = 16;

/// Total non-payload bytes in a frame (header + end marker + checksum).
pub const FRAME_OVERHEAD: usize = HEADER_LEN + END_MARKER.len() + 1;

/// Two's-complement running sum over `bytes`.
///
/// Appending the result makes the whole sequence sum to 0 modulo 256,
/// which is how the firmware validates a frame.
///
/// ## Example
///
/// ```
/// use etiqueta::protocol::frame;
///
/// let body = [0x66, 0x35, 0x00, 0x1B];
/// let check = frame::checksum(&body);
///
/// let total: u8 = body.iter().fold(check, |sum, b| sum.wrapping_add(*b));
/// assert_eq!(total, 0);
/// ```
#[inline]
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |sum, b| sum.wrapping_sub(*b))
}

/// Build one complete logical frame around a compressed payload.
///
/// `frames_remaining` counts the frames still to come after this one; the
/// frame carrying 0 is marked final.
///
/// ## Example
///
/// ```
/// use etiqueta::protocol::frame;
/// use etiqueta::printer::PrinterConfig;
///
/// let bytes = frame::encode_frame(&[0xAB, 0xCD], 1, 4, &PrinterConfig::LP384);
///
/// assert_eq!(bytes[0], 0x66);
/// assert_eq!(&bytes[1..3], &[19, 0]); // 17 fixed bytes + 2 payload bytes
/// assert_eq!(bytes.len(), 2 + frame::FRAME_OVERHEAD);
/// assert_eq!(bytes.iter().fold(0u8, |sum, b| sum.wrapping_add(*b)), 0);
/// ```
pub fn encode_frame(
    payload: &[u8],
    job_id: u16,
    frames_remaining: u16,
    config: &PrinterConfig,
) -> Vec<u8> {
    let mut frame = Vec::with_capacity(payload.len() + FRAME_OVERHEAD);

    frame.push(MAGIC);

    // everything after the length field itself: 13 header bytes, the
    // payload, the end marker and the checksum
    let length = (HEADER_LEN - 3 + payload.len() + END_MARKER.len() + 1) as u16;
    frame.extend_from_slice(&length.to_le_bytes());

    frame.extend_from_slice(&config.command_id);
    frame.extend_from_slice(&job_id.to_le_bytes());

    frame.push(if frames_remaining == 0 {
        FINAL_FRAME_MARKER
    } else {
        DATA_FRAME_MARKER
    });
    frame.extend_from_slice(&frames_remaining.to_be_bytes());

    frame.extend_from_slice(payload);
    frame.extend_from_slice(&END_MARKER);
    frame.push(checksum(&frame));

    frame
}

/// # Logical Frame
///
/// One immutable frame of a print job, plus the metadata needed to drive
/// its transmission: the column count it paints, its position in the job,
/// and the transport unit size it must be split to.
#[derive(Debug, Clone)]
pub struct Frame {
    bytes: Vec<u8>,
    chunk_width: u16,
    frames_remaining: u16,
    unit: usize,
}

impl Frame {
    pub(crate) fn new(bytes: Vec<u8>, chunk_width: u16, frames_remaining: u16, unit: usize) -> Self {
        debug_assert!(unit > 0, "transport unit size must be non-zero");
        Self {
            bytes,
            chunk_width,
            frames_remaining,
            unit,
        }
    }

    /// The full frame image, header through checksum.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Total frame length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Dot columns this frame's payload paints.
    #[inline]
    pub fn chunk_width(&self) -> u16 {
        self.chunk_width
    }

    /// Frames still to come after this one.
    #[inline]
    pub fn frames_remaining(&self) -> u16 {
        self.frames_remaining
    }

    /// Whether this is the job's final frame.
    #[inline]
    pub fn is_final(&self) -> bool {
        self.frames_remaining == 0
    }

    /// Number of transport writes this frame needs.
    #[inline]
    pub fn unit_count(&self) -> usize {
        self.bytes.len().div_ceil(self.unit)
    }

    /// The frame sliced to the transport unit size.
    ///
    /// The first slice is the leading unit (it starts with the header);
    /// the rest are continuation units and carry no header. All slices of
    /// one frame must be written back-to-back.
    pub fn units(&self) -> impl Iterator<Item = &[u8]> {
        self.bytes.chunks(self.unit)
    }
}

// ============================================================================
// TESTS
// ============================================================================
