//! # Etiqueta - BLE Thermal Label Printer Core
//!
//! Etiqueta is a Rust library for driving thermal label printers over
//! Bluetooth LE. It converts a monochrome raster into the printer's native
//! scanline order, compresses it, slices it into the proprietary frame
//! format, and paces transmission against device acknowledgements:
//!
//! ```text
//! PixelBuffer ─► transform ─► compress ─► frames ─► controller ─► BLE link
//!  (raster)      (pipeline)   (LZO1X-1)   (wire)     (ack-gated)
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use etiqueta::{EtiquetaError, PixelBuffer, PrintController, PrinterConfig, Transport};
//!
//! // The integration layer wraps its BLE stack in a Transport.
//! struct GattLink;
//!
//! impl Transport for GattLink {
//!     fn write(&mut self, data: &[u8]) -> Result<(), EtiquetaError> {
//!         // hand `data` to the printer's write characteristic
//!         # let _ = data;
//!         Ok(())
//!     }
//!
//!     fn unit_size(&self) -> usize {
//!         180 // negotiated MTU minus ATT overhead
//!     }
//! }
//!
//! let config = PrinterConfig::LP384;
//!
//! // Draw something
//! let mut image = PixelBuffer::for_printer(&config)?;
//! for x in 0..config.width as i32 {
//!     image.set(x, 48, true);
//! }
//!
//! let controller = PrintController::new(config);
//! controller.attach(GattLink);
//!
//! // Couple the BLE notify callback to the acknowledgement sink:
//! // notify_characteristic.on_notify(move |bytes| acks.notify(bytes));
//! let acks = controller.ack_sink();
//!
//! controller.print(&image)?;
//! # let _ = acks;
//! # Ok::<(), EtiquetaError>(())
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`bitmap`] | Packed 1-bpp label raster |
//! | [`transform`] | Row-major to print-head format pipeline |
//! | [`compress`] | LZO1X-1 block compressor |
//! | [`protocol`] | Frame encoding and transport-unit splitting |
//! | [`job`] | Frame sequence assembly and send cursor |
//! | [`controller`] | Acknowledgement-gated transmission state machine |
//! | [`transport`] | Link boundary trait |
//! | [`printer`] | Printer configurations |
//! | [`error`] | Error types |
//!
//! ## Scope
//!
//! Discovery, pairing, connection management and MTU negotiation belong to
//! the integration layer; the core only needs a connected, subscribed
//! [`Transport`] with a known unit size. Drawing beyond the pixel-set
//! primitive is equally out of scope - lines, text and barcodes all reduce
//! to [`PixelBuffer::set`].

pub mod bitmap;
pub mod compress;
pub mod controller;
pub mod error;
pub mod job;
pub mod printer;
pub mod protocol;
pub mod transform;
pub mod transport;

// Re-exports for convenience
pub use bitmap::PixelBuffer;
pub use controller::{AckSink, JobHandle, JobState, PrintController};
pub use error::EtiquetaError;
pub use printer::PrinterConfig;
pub use transport::Transport;
