//! # Block Compressor
//!
//! This module wraps the LZO1X-1 codec that the printer firmware
//! decompresses on-device. The payload of every data frame is one LZO
//! stream, so the output must be byte-exact LZO — no other codec works.
//!
//! ## Contract
//!
//! - Single pass, stateless: no dictionary carries over between calls.
//!   Two jobs (or two chunks of one job) compress identically whether run
//!   back-to-back or years apart.
//! - The LZO1X-1 variant trades ratio for a small fixed work area (an
//!   8K-entry match table), which the binding owns per call.
//! - Failure is reported, never papered over: a codec error or an output
//!   above the worst-case bound aborts the job before anything is written
//!   to the transport.

use log::debug;

use crate::error::EtiquetaError;

/// Worst-case LZO1X output size for `len` input bytes.
///
/// Incompressible input grows by at most 1/16th plus a small constant.
/// Frame buffers sized with this bound can never overflow.
#[inline]
pub const fn max_compressed_size(len: usize) -> usize {
    len + len / 16 + 64 + 3
}

/// Compress one block with LZO1X-1.
///
/// The input is typically the device-native buffer for a column range of
/// the label (one frame payload), or the whole buffer for small jobs.
///
/// ## Errors
///
/// [`EtiquetaError::Compression`] if the codec reports an internal error
/// or the output exceeds [`max_compressed_size`].
pub fn compress_block(data: &[u8]) -> Result<Vec<u8>, EtiquetaError> {
    let compressed =
        minilzo::compress(data).map_err(|e| EtiquetaError::Compression(format!("LZO1X-1: {e:?}")))?;

    let bound = max_compressed_size(data.len());
    if compressed.len() > bound {
        return Err(EtiquetaError::Compression(format!(
            "output is {} bytes, bound is {} for {} input bytes",
            compressed.len(),
            bound,
            data.len()
        )));
    }

    debug!("compressed {} -> {} bytes", data.len(), compressed.len());
    Ok(compressed)
}

// ============================================================================
// TESTS
// ============================================================================
