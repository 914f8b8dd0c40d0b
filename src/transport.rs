//! # Transport Boundary
//!
//! The core drives any connection-oriented link that can write a byte
//! buffer and report its maximum write size. Discovery, pairing, MTU
//! negotiation and notification subscription all live in the integration
//! layer; the controller only ever sees "a connected link with a known
//! unit size", plus an [`AckSink`](crate::controller::AckSink) the
//! integration couples to its notify callback.

use crate::error::EtiquetaError;

/// Smallest usable transport unit.
///
/// Every BLE link guarantees at least a 23-byte ATT MTU, 20 bytes of which
/// are payload. A link reporting less than this is misconfigured and is
/// rejected at job start.
pub const MIN_UNIT_SIZE: usize = 20;

/// # Printer Link
///
/// One connected, writable channel to the device.
///
/// Implementations wrap whatever BLE stack the platform provides; the
/// GATT write characteristic on the desktop stacks, or a serial bridge in
/// tests. `write` must hand the whole buffer to the link in one
/// operation and report failure honestly - a failed write aborts the job
/// with the cursor unmoved, so a silently dropped buffer would stall the
/// device instead.
pub trait Transport: Send {
    /// Write one buffer to the command channel.
    ///
    /// Failures should be reported as [`EtiquetaError::Write`].
    fn write(&mut self, data: &[u8]) -> Result<(), EtiquetaError>;

    /// The negotiated maximum write size in bytes.
    fn unit_size(&self) -> usize;
}
