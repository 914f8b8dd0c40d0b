//! # Wire Protocol
//!
//! This module implements the label printer's proprietary BLE frame format.
//!
//! ## Module Structure
//!
//! - [`frame`]: frame header layout, checksum, and transport-unit splitting
//!
//! ## Usage Example
//!
//! ```
//! use etiqueta::protocol::frame;
//! use etiqueta::printer::PrinterConfig;
//!
//! // Wrap a compressed chunk into the final frame of a job
//! let payload = [0x00, 0x02, 0x00];
//! let bytes = frame::encode_frame(&payload, 1, 0, &PrinterConfig::LP384);
//!
//! assert_eq!(bytes[0], frame::MAGIC);
//! assert_eq!(bytes[13], frame::FINAL_FRAME_MARKER);
//! ```
//!
//! The format was recovered from wire captures of the vendor app; there is
//! no public specification.

pub mod frame;
