//! # Error Types
//!
//! This module defines error types used throughout the etiqueta library.
//!
//! Every failure is terminal for the job that hit it: the core never
//! retries on its own, it reports the cause and leaves recovery to the
//! caller.

use thiserror::Error;

/// Main error type for etiqueta operations
#[derive(Debug, Error)]
pub enum EtiquetaError {
    /// Job-scope buffer reservation failed; the job cannot start
    #[error("Allocation failed: {0}")]
    Allocation(String),

    /// The block compressor reported an internal error, or its output
    /// exceeded the worst-case bound; the job is aborted before any
    /// transport write
    #[error("Compression failed: {0}")]
    Compression(String),

    /// No transport is attached, or the negotiated unit size is unusable
    #[error("No usable transport")]
    NoTransport,

    /// The device did not acknowledge a frame within the deadline
    #[error("Acknowledgement timeout")]
    AckTimeout,

    /// A print job is already in flight; the original job is unaffected
    #[error("A print job is already in progress")]
    JobInProgress,

    /// The transport rejected a write; the cursor is not advanced
    #[error("Transport write failed: {0}")]
    Write(String),

    /// The job was cancelled with `abort`
    #[error("Print job aborted")]
    Aborted,

    /// Caller-supplied image data has the wrong shape
    #[error("Image error: {0}")]
    Image(String),
}
