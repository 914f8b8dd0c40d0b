//! # Print Job Assembly
//!
//! This module turns one label raster into the ordered frame sequence a
//! job transmits, and tracks the send cursor over it.
//!
//! ## Chunking by Printable Width
//!
//! The image is divided into `ceil(width / chunk_width)` column groups.
//! Every group is `chunk_width` columns wide except the last, which takes
//! the remainder:
//!
//! ```text
//! 384 columns, chunk width 85:
//! ┌────┬────┬────┬────┬───┐
//! │ 85 │ 85 │ 85 │ 85 │44 │   frames remaining: 4, 3, 2, 1, 0
//! └────┴────┴────┴────┴───┘
//! ```
//!
//! Each group's slice of the device-native buffer is compressed on its
//! own and wrapped into one logical frame. The whole sequence is built
//! before the first transport write, so a compression failure aborts the
//! job without having touched the device.

use log::debug;

use crate::bitmap::PixelBuffer;
use crate::compress;
use crate::error::EtiquetaError;
use crate::printer::PrinterConfig;
use crate::protocol::frame::{self, Frame};
use crate::transform;
use crate::transport::MIN_UNIT_SIZE;

/// # Print Job
///
/// Owns the ordered frames of one print request and the cursor marking
/// the next frame to send. Created by the transmission controller when a
/// print is accepted; dropped when the job reaches a terminal state.
#[derive(Debug)]
pub struct PrintJob {
    id: u16,
    frames: Vec<Frame>,
    cursor: usize,
}

impl PrintJob {
    /// Build the complete frame sequence for `image`.
    ///
    /// Runs the format pipeline, compresses each column group, and wraps
    /// the results into frames sliced to the transport's `unit` size.
    /// Frame construction only slices the compressed blocks, it never
    /// rewrites them.
    ///
    /// ## Errors
    ///
    /// - [`EtiquetaError::NoTransport`] if `unit` is below the 20-byte
    ///   minimum a BLE link guarantees
    /// - [`EtiquetaError::Image`] if the raster does not match the config
    /// - [`EtiquetaError::Allocation`] / [`EtiquetaError::Compression`]
    ///   from the pipeline stages
    pub fn build(
        image: &PixelBuffer,
        config: &PrinterConfig,
        job_id: u16,
        unit: usize,
    ) -> Result<Self, EtiquetaError> {
        if unit < MIN_UNIT_SIZE {
            return Err(EtiquetaError::NoTransport);
        }

        let native = transform::to_printer_format(image, config)?;

        let bytes_per_column = config.bytes_per_column();
        let chunk_width = config.chunk_width as usize;
        let groups = config.chunk_count();

        let mut frames = Vec::with_capacity(groups);
        let mut column_offset = 0usize;

        for group in 0..groups {
            let width = if group == groups - 1 {
                config.width as usize - column_offset
            } else {
                chunk_width
            };

            let start = column_offset * bytes_per_column;
            let end = start + width * bytes_per_column;
            let payload = compress::compress_block(&native[start..end])?;

            let frames_remaining = (groups - 1 - group) as u16;
            let bytes = frame::encode_frame(&payload, job_id, frames_remaining, config);
            debug!(
                "job {job_id}: group {group} ({width} columns) -> {} frame bytes, {frames_remaining} remaining",
                bytes.len()
            );

            frames.push(Frame::new(bytes, width as u16, frames_remaining, unit));
            column_offset += width;
        }

        if frames.is_empty() {
            return Err(EtiquetaError::Image("no printable columns".to_string()));
        }

        Ok(Self {
            id: job_id,
            frames,
            cursor: 0,
        })
    }

    /// Job identifier carried in every frame header.
    #[inline]
    pub fn id(&self) -> u16 {
        self.id
    }

    /// All frames, in transmission order.
    #[inline]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Number of logical frames in the job.
    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Index of the next frame to send.
    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The frame at the cursor, or `None` when the job is drained.
    #[inline]
    pub fn current(&self) -> Option<&Frame> {
        self.frames.get(self.cursor)
    }

    /// Advance the cursor past an acknowledged frame.
    #[inline]
    pub fn advance(&mut self) {
        self.cursor += 1;
    }

    /// Whether every frame has been sent and acknowledged.
    #[inline]
    pub fn is_done(&self) -> bool {
        self.cursor >= self.frames.len()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_label() -> PixelBuffer {
        PixelBuffer::for_printer(&PrinterConfig::LP384).unwrap()
    }

    #[test]
    fn test_group_count_and_widths() {
        let job = PrintJob::build(&blank_label(), &PrinterConfig::LP384, 1, 180).unwrap();

        let widths: Vec<u16> = job.frames().iter().map(|f| f.chunk_width()).collect();
        assert_eq!(widths, vec![85, 85, 85, 85, 44]);
        assert_eq!(widths.iter().map(|&w| w as u32).sum::<u32>(), 384);
    }

    #[test]
    fn test_frames_remaining_descends_to_zero() {
        let job = PrintJob::build(&blank_label(), &PrinterConfig::LP384, 1, 180).unwrap();

        let remaining: Vec<u16> = job.frames().iter().map(|f| f.frames_remaining()).collect();
        assert_eq!(remaining, vec![4, 3, 2, 1, 0]);
    }

    #[test]
    fn test_exactly_one_final_frame() {
        let job = PrintJob::build(&blank_label(), &PrinterConfig::LP384, 1, 180).unwrap();

        let finals = job.frames().iter().filter(|f| f.is_final()).count();
        assert_eq!(finals, 1);
        assert!(job.frames().last().unwrap().is_final());
    }

    #[test]
    fn test_every_frame_sums_to_zero() {
        let mut image = blank_label();
        for x in 0..384 {
            image.set(x, x % 96, true);
        }
        let job = PrintJob::build(&image, &PrinterConfig::LP384, 3, 180).unwrap();

        for frame in job.frames() {
            let sum = frame.as_bytes().iter().fold(0u8, |sum, b| sum.wrapping_add(*b));
            assert_eq!(sum, 0);
        }
    }

    #[test]
    fn test_job_id_in_every_header() {
        let job = PrintJob::build(&blank_label(), &PrinterConfig::LP384, 0x0304, 180).unwrap();

        for frame in job.frames() {
            assert_eq!(&frame.as_bytes()[11..13], &[0x04, 0x03]);
        }
    }

    #[test]
    fn test_unit_below_minimum_rejected() {
        let result = PrintJob::build(&blank_label(), &PrinterConfig::LP384, 1, 19);
        assert!(matches!(result, Err(EtiquetaError::NoTransport)));
    }

    #[test]
    fn test_mismatched_raster_rejected() {
        let image = PixelBuffer::new(255, 96).unwrap();
        let result = PrintJob::build(&image, &PrinterConfig::LP384, 1, 180);
        assert!(matches!(result, Err(EtiquetaError::Image(_))));
    }

    #[test]
    fn test_cursor_walks_the_job() {
        let mut job = PrintJob::build(&blank_label(), &PrinterConfig::LP384, 1, 180).unwrap();

        assert_eq!(job.cursor(), 0);
        assert!(!job.is_done());

        let mut seen = 0;
        while let Some(frame) = job.current() {
            assert_eq!(frame.frames_remaining(), (job.len() - 1 - seen) as u16);
            job.advance();
            seen += 1;
        }

        assert_eq!(seen, job.len());
        assert!(job.is_done());
        assert!(job.current().is_none());
    }

    #[test]
    fn test_narrow_head_single_remainder() {
        // 255 columns / 85 -> exactly 3 full groups, no remainder group
        let image = PixelBuffer::for_printer(&PrinterConfig::LP255).unwrap();
        let job = PrintJob::build(&image, &PrinterConfig::LP255, 1, 180).unwrap();

        let widths: Vec<u16> = job.frames().iter().map(|f| f.chunk_width()).collect();
        assert_eq!(widths, vec![85, 85, 85]);
    }
}
