//! # Transmission Controller
//!
//! This module paces frame delivery against device acknowledgements. The
//! printer acks every logical frame on its notify characteristic; the next
//! frame may only go out once the previous one is acknowledged.
//!
//! ## State Machine
//!
//! ```text
//!              ┌───────────── ack, frames left ──────────────┐
//!              ▼                                             │
//! Idle ──► Preparing ──► Sending ──► AwaitingAck ────────────┤
//!              │            │             │                  └─ ack, job drained ──► Completed
//!              │            │             └─ timeout / abort ──► Failed
//!              │            └─ write error / abort ──► Failed
//!              └─ build error ──► Failed
//! ```
//!
//! A frame larger than the transport unit is written as several units
//! back-to-back with a short pacing gap; the acknowledgement gate applies
//! to the logical frame, not to its units. A timeout is terminal - the
//! firmware keeps no cursor to resynchronize against, so the job fails
//! rather than retry blind.
//!
//! ## Concurrency
//!
//! Two execution contexts touch a job: the caller's thread drives
//! [`PrintController::print`], and the BLE stack's own thread delivers
//! notifications through [`AckSink::notify`]. They share the job state,
//! the ack flag and the last ack payload behind one mutex, with a condvar
//! for the bounded wait in `AwaitingAck`. The sink checks the job is in an
//! ack-accepting state before touching anything, so a stale notification
//! for an aborted or finished job is dropped on the floor.

use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::bitmap::PixelBuffer;
use crate::error::EtiquetaError;
use crate::job::PrintJob;
use crate::printer::PrinterConfig;
use crate::transport::Transport;

/// Default deadline for one frame acknowledgement.
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(5);

/// Default pacing gap between continuation units of one frame.
pub const DEFAULT_UNIT_GAP: Duration = Duration::from_millis(5);

/// Lifecycle of the current (or most recent) print job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// No job in flight; the controller accepts `print`.
    Idle,
    /// Building the frame sequence; nothing written yet.
    Preparing,
    /// Writing a frame's units to the transport.
    Sending,
    /// Frame written, waiting for the device to ack.
    AwaitingAck,
    /// Terminal: every frame was acknowledged.
    Completed,
    /// Terminal: the job was aborted or hit an error.
    Failed,
}

impl JobState {
    /// Whether a job currently holds the controller.
    #[inline]
    pub fn is_active(self) -> bool {
        matches!(
            self,
            JobState::Preparing | JobState::Sending | JobState::AwaitingAck
        )
    }
}

/// Fields shared between the controller and the notification handler.
#[derive(Debug)]
struct Shared {
    state: JobState,
    job_id: u16,
    ack_received: bool,
    last_ack: Option<Vec<u8>>,
    aborted: bool,
}

#[derive(Debug)]
struct SharedState {
    shared: Mutex<Shared>,
    ack_cond: Condvar,
}

impl SharedState {
    /// Lock the shared fields, recovering from a poisoned mutex.
    ///
    /// The fields are plain flags that stay coherent through a panic on
    /// the other side, so the guard is always usable.
    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// # Print Controller
///
/// Owns the transport slot, the tunables and the job lifecycle. All
/// methods take `&self`, so the controller can sit in an `Arc` and be
/// driven from one thread while another observes it through a
/// [`JobHandle`].
///
/// ## Example
///
/// ```no_run
/// use etiqueta::{PixelBuffer, PrintController, PrinterConfig, Transport};
/// use etiqueta::EtiquetaError;
///
/// # struct Link;
/// # impl Transport for Link {
/// #     fn write(&mut self, _data: &[u8]) -> Result<(), EtiquetaError> { Ok(()) }
/// #     fn unit_size(&self) -> usize { 180 }
/// # }
/// let config = PrinterConfig::LP384;
/// let controller = PrintController::new(config);
/// controller.attach(Link);
///
/// // the BLE integration calls acks.notify(bytes) from its callback
/// let acks = controller.ack_sink();
///
/// let image = PixelBuffer::for_printer(&config)?;
/// controller.print(&image)?;
/// # let _ = acks;
/// # Ok::<(), EtiquetaError>(())
/// ```
pub struct PrintController<T: Transport> {
    config: PrinterConfig,
    transport: Mutex<Option<T>>,
    connected: AtomicBool,
    next_job_id: AtomicU16,
    shared: Arc<SharedState>,
    ack_timeout: Duration,
    unit_gap: Duration,
}

impl<T: Transport> PrintController<T> {
    /// Create a controller for one printer model, with no transport yet.
    pub fn new(config: PrinterConfig) -> Self {
        Self {
            config,
            transport: Mutex::new(None),
            connected: AtomicBool::new(false),
            next_job_id: AtomicU16::new(1),
            shared: Arc::new(SharedState {
                shared: Mutex::new(Shared {
                    state: JobState::Idle,
                    job_id: 0,
                    ack_received: false,
                    last_ack: None,
                    aborted: false,
                }),
                ack_cond: Condvar::new(),
            }),
            ack_timeout: DEFAULT_ACK_TIMEOUT,
            unit_gap: DEFAULT_UNIT_GAP,
        }
    }

    /// Set the per-frame acknowledgement deadline. Default 5 seconds.
    pub fn set_ack_timeout(&mut self, timeout: Duration) {
        self.ack_timeout = timeout;
    }

    /// Set the pacing gap between continuation units. Default 5ms.
    ///
    /// Some firmware drops back-to-back writes that arrive faster than its
    /// receive buffer drains.
    pub fn set_unit_gap(&mut self, gap: Duration) {
        self.unit_gap = gap;
    }

    /// Hand a connected transport to the controller.
    pub fn attach(&self, transport: T) {
        let mut slot = self.transport.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(transport);
        self.connected.store(true, Ordering::Release);
        info!("transport attached");
    }

    /// Take the transport back, e.g. on disconnect.
    ///
    /// Blocks until any in-flight job releases the link.
    pub fn detach(&self) -> Option<T> {
        let mut slot = self.transport.lock().unwrap_or_else(|e| e.into_inner());
        self.connected.store(false, Ordering::Release);
        info!("transport detached");
        slot.take()
    }

    /// Whether a transport is attached. Never blocks.
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Whether a job is currently in flight.
    pub fn is_printing(&self) -> bool {
        self.shared.lock().state.is_active()
    }

    /// Current job lifecycle state.
    pub fn state(&self) -> JobState {
        self.shared.lock().state
    }

    /// Handle for the integration's notify callback.
    pub fn ack_sink(&self) -> AckSink {
        AckSink {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Status/abort handle, cloneable across threads.
    pub fn handle(&self) -> JobHandle {
        JobHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Run one complete print job to the device.
    ///
    /// Builds every frame up front, then drains them one acknowledgement
    /// at a time. Blocks the calling thread until the job reaches a
    /// terminal state; progress is observable from other threads through
    /// [`PrintController::handle`].
    ///
    /// ## Errors
    ///
    /// - [`EtiquetaError::JobInProgress`] if a job is already in flight
    ///   (that job is unaffected)
    /// - [`EtiquetaError::NoTransport`] with nothing attached or an
    ///   unusable unit size; the controller returns to `Idle`
    /// - [`EtiquetaError::AckTimeout`], [`EtiquetaError::Write`],
    ///   [`EtiquetaError::Aborted`] and the frame-build errors, all
    ///   terminal with the state left at `Failed`
    pub fn print(&self, image: &PixelBuffer) -> Result<(), EtiquetaError> {
        let job_id = self.claim_job()?;
        info!("job {job_id}: print started");
        let outcome = self.run_job(image, job_id);
        self.settle(job_id, outcome)
    }

    /// Atomically reject concurrent starts and take the job slot.
    fn claim_job(&self) -> Result<u16, EtiquetaError> {
        let mut s = self.shared.lock();
        if s.state.is_active() {
            return Err(EtiquetaError::JobInProgress);
        }
        let id = self.next_job_id.fetch_add(1, Ordering::Relaxed);
        s.state = JobState::Preparing;
        s.job_id = id;
        s.ack_received = false;
        s.last_ack = None;
        s.aborted = false;
        Ok(id)
    }

    fn run_job(&self, image: &PixelBuffer, job_id: u16) -> Result<(), EtiquetaError> {
        let mut link = self.transport.lock().unwrap_or_else(|e| e.into_inner());
        let transport = link.as_mut().ok_or(EtiquetaError::NoTransport)?;
        let unit = transport.unit_size();

        // The whole frame sequence exists before the first byte goes out;
        // a compression failure can still abort without touching the wire.
        let mut job = PrintJob::build(image, &self.config, job_id, unit)?;
        debug!(
            "job {job_id}: {} frames, transport unit {unit} bytes",
            job.len()
        );

        while let Some(frame) = job.current() {
            self.begin_frame()?;

            for (index, chunk) in frame.units().enumerate() {
                if index > 0 && !self.unit_gap.is_zero() {
                    thread::sleep(self.unit_gap);
                }
                let aborted = self.shared.lock().aborted;
                if aborted {
                    return Err(EtiquetaError::Aborted);
                }
                transport.write(chunk)?;
            }

            debug!(
                "job {job_id}: frame {}/{} written, awaiting ack",
                job.cursor() + 1,
                job.len()
            );
            self.await_ack()?;
            job.advance();
        }

        Ok(())
    }

    /// Enter `Sending` and arm the ack flag for the next frame batch.
    ///
    /// The flag is cleared before the first unit write because the device
    /// may ack while continuation units are still going out.
    fn begin_frame(&self) -> Result<(), EtiquetaError> {
        let mut s = self.shared.lock();
        if s.aborted {
            return Err(EtiquetaError::Aborted);
        }
        s.state = JobState::Sending;
        s.ack_received = false;
        Ok(())
    }

    /// Enter `AwaitingAck` and block until ack, abort or deadline.
    fn await_ack(&self) -> Result<(), EtiquetaError> {
        let deadline = Instant::now() + self.ack_timeout;
        let mut s = self.shared.lock();
        if s.aborted {
            return Err(EtiquetaError::Aborted);
        }
        s.state = JobState::AwaitingAck;

        loop {
            if s.aborted {
                return Err(EtiquetaError::Aborted);
            }
            if s.ack_received {
                s.ack_received = false;
                return Ok(());
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(EtiquetaError::AckTimeout);
            }

            // bounded wait; spurious wakeups just re-check the flags
            let (guard, _) = self
                .shared
                .ack_cond
                .wait_timeout(s, deadline - now)
                .unwrap_or_else(|e| e.into_inner());
            s = guard;
        }
    }

    /// Record the terminal state and hand the outcome to the caller.
    fn settle(
        &self,
        job_id: u16,
        outcome: Result<(), EtiquetaError>,
    ) -> Result<(), EtiquetaError> {
        let mut s = self.shared.lock();
        match outcome {
            Ok(()) => {
                if s.aborted {
                    // abort raced the final acknowledgement; abort wins
                    s.state = JobState::Failed;
                    warn!("job {job_id}: aborted at completion");
                    return Err(EtiquetaError::Aborted);
                }
                s.state = JobState::Completed;
                info!("job {job_id}: completed");
                Ok(())
            }
            Err(e @ EtiquetaError::NoTransport) | Err(e @ EtiquetaError::JobInProgress) => {
                // rejected before any work started
                s.state = JobState::Idle;
                warn!("job {job_id}: rejected: {e}");
                Err(e)
            }
            Err(e) => {
                s.state = JobState::Failed;
                warn!("job {job_id}: failed: {e}");
                Err(e)
            }
        }
    }
}

/// # Acknowledgement Sink
///
/// Cloneable handle the integration layer registers with its BLE stack.
/// `notify` runs on the stack's own thread; it stores the payload, sets
/// the ack flag and wakes the controller's wait.
#[derive(Debug, Clone)]
pub struct AckSink {
    shared: Arc<SharedState>,
}

impl AckSink {
    /// Deliver one notification payload from the device.
    ///
    /// Ignored unless a frame is in flight (`Sending` or `AwaitingAck`):
    /// a stale acknowledgement for an aborted or finished job must not
    /// leak into the next one.
    pub fn notify(&self, payload: &[u8]) {
        let mut s = self.shared.lock();
        if s.aborted || !matches!(s.state, JobState::Sending | JobState::AwaitingAck) {
            debug!("dropping stale notification ({} bytes)", payload.len());
            return;
        }

        debug!("job {}: ack {:02X?}", s.job_id, payload);
        s.last_ack = Some(payload.to_vec());
        s.ack_received = true;
        self.shared.ack_cond.notify_all();
    }
}

/// # Job Handle
///
/// Cloneable status and cancellation handle, independent of the transport
/// type so observers never need the controller's generic parameter.
#[derive(Debug, Clone)]
pub struct JobHandle {
    shared: Arc<SharedState>,
}

impl JobHandle {
    /// Current job lifecycle state.
    pub fn state(&self) -> JobState {
        self.shared.lock().state
    }

    /// Whether a job is currently in flight.
    pub fn is_printing(&self) -> bool {
        self.shared.lock().state.is_active()
    }

    /// The most recent acknowledgement payload, if any arrived.
    pub fn last_ack(&self) -> Option<Vec<u8>> {
        self.shared.lock().last_ack.clone()
    }

    /// Abort the job in flight, if any.
    ///
    /// Safe to call from any thread. The blocked `print` call observes
    /// the abort and returns [`EtiquetaError::Aborted`]; a job already in
    /// a terminal state is left alone.
    pub fn abort(&self) {
        let mut s = self.shared.lock();
        if s.state.is_active() {
            warn!("job {}: abort requested", s.job_id);
            s.aborted = true;
            s.state = JobState::Failed;
            self.shared.ack_cond.notify_all();
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Transport that records writes and (optionally) acks each one.
    struct LoopbackLink {
        writes: Arc<Mutex<Vec<Vec<u8>>>>,
        unit: usize,
        acks: Option<AckSink>,
    }

    impl Transport for LoopbackLink {
        fn write(&mut self, data: &[u8]) -> Result<(), EtiquetaError> {
            self.writes
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(data.to_vec());
            if let Some(acks) = &self.acks {
                acks.notify(&[0x4F, 0x4B]);
            }
            Ok(())
        }

        fn unit_size(&self) -> usize {
            self.unit
        }
    }

    fn controller() -> PrintController<LoopbackLink> {
        let mut controller = PrintController::new(PrinterConfig::LP384);
        controller.set_unit_gap(Duration::ZERO);
        controller
    }

    fn blank_label() -> PixelBuffer {
        PixelBuffer::for_printer(&PrinterConfig::LP384).unwrap()
    }

    #[test]
    fn test_starts_idle_and_disconnected() {
        let controller = controller();
        assert_eq!(controller.state(), JobState::Idle);
        assert!(!controller.is_connected());
        assert!(!controller.is_printing());
    }

    #[test]
    fn test_print_without_transport_rejected() {
        let controller = controller();
        let result = controller.print(&blank_label());
        assert!(matches!(result, Err(EtiquetaError::NoTransport)));
        assert_eq!(controller.state(), JobState::Idle);
    }

    #[test]
    fn test_attach_detach_flips_connected() {
        let controller = controller();
        controller.attach(LoopbackLink {
            writes: Arc::default(),
            unit: 180,
            acks: None,
        });
        assert!(controller.is_connected());

        assert!(controller.detach().is_some());
        assert!(!controller.is_connected());
    }

    #[test]
    fn test_acked_job_completes() {
        let controller = controller();
        let writes = Arc::new(Mutex::new(Vec::new()));
        controller.attach(LoopbackLink {
            writes: Arc::clone(&writes),
            unit: 512,
            acks: Some(controller.ack_sink()),
        });

        controller.print(&blank_label()).unwrap();

        assert_eq!(controller.state(), JobState::Completed);
        assert!(!controller.is_printing());
        // blank LP384 label: 5 groups, each frame fits one 512-byte unit
        assert_eq!(writes.lock().unwrap().len(), 5);
    }

    #[test]
    fn test_never_acked_job_times_out() {
        let mut controller = controller();
        controller.set_ack_timeout(Duration::from_millis(30));
        controller.attach(LoopbackLink {
            writes: Arc::default(),
            unit: 512,
            acks: None,
        });

        let result = controller.print(&blank_label());

        assert!(matches!(result, Err(EtiquetaError::AckTimeout)));
        assert_eq!(controller.state(), JobState::Failed);
        assert!(!controller.is_printing());
    }

    #[test]
    fn test_completed_controller_accepts_next_job() {
        let controller = controller();
        let writes = Arc::new(Mutex::new(Vec::new()));
        controller.attach(LoopbackLink {
            writes: Arc::clone(&writes),
            unit: 512,
            acks: Some(controller.ack_sink()),
        });

        controller.print(&blank_label()).unwrap();
        controller.print(&blank_label()).unwrap();

        let writes = writes.lock().unwrap();
        // job ids 1 and 2 in the leading headers of the two jobs
        assert_eq!(&writes[0][11..13], &[1, 0]);
        assert_eq!(&writes[5][11..13], &[2, 0]);
    }

    #[test]
    fn test_stale_notification_is_dropped() {
        let controller = controller();
        controller.attach(LoopbackLink {
            writes: Arc::default(),
            unit: 512,
            acks: Some(controller.ack_sink()),
        });
        controller.print(&blank_label()).unwrap();

        let handle = controller.handle();
        let acked = handle.last_ack();

        // job is terminal; this must not disturb anything
        controller.ack_sink().notify(&[0xDE, 0xAD]);

        assert_eq!(controller.state(), JobState::Completed);
        assert_eq!(handle.last_ack(), acked);
    }

    #[test]
    fn test_abort_before_idle_job_is_noop() {
        let controller = controller();
        controller.handle().abort();
        assert_eq!(controller.state(), JobState::Idle);
    }

    #[test]
    fn test_write_failure_fails_job() {
        struct DeadLink;
        impl Transport for DeadLink {
            fn write(&mut self, _data: &[u8]) -> Result<(), EtiquetaError> {
                Err(EtiquetaError::Write("link dropped".to_string()))
            }
            fn unit_size(&self) -> usize {
                180
            }
        }

        let controller = PrintController::new(PrinterConfig::LP384);
        controller.attach(DeadLink);

        let result = controller.print(&blank_label());
        assert!(matches!(result, Err(EtiquetaError::Write(_))));
        assert_eq!(controller.state(), JobState::Failed);
    }

    #[test]
    fn test_small_unit_splits_frames() {
        let controller = controller();
        let writes = Arc::new(Mutex::new(Vec::new()));
        controller.attach(LoopbackLink {
            writes: Arc::clone(&writes),
            unit: 20,
            acks: Some(controller.ack_sink()),
        });

        controller.print(&blank_label()).unwrap();

        let writes = writes.lock().unwrap();
        assert!(writes.len() > 5, "frames must split into multiple units");
        assert!(writes.iter().all(|unit| unit.len() <= 20));
    }
}
