//! Callback side of a render session.
//!
//! [`RenderBridge`] is the [`RenderHandler`] handed to the driver at buffer
//! creation. It owns the consumer half of the staging planes and runs
//! entirely inside the driver's callback: pop pre-converted bytes when a
//! full half is buffered, substitute native silence when it is not. Nothing
//! here blocks or allocates.
//!
//! Counters live in [`StreamShared`] so the session can read them from the
//! application thread without touching the consumer.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use crate::driver::{BufferHalf, DriverNotice, RenderHandler};
use crate::event::{EventCallback, RenderEvent};
use crate::native::NativeSampleType;
use crate::session::SessionState;
use crate::staging::StagingConsumer;

const FAULT_NONE: u8 = 0;
const FAULT_RESET: u8 = 1;
const FAULT_OVERLOAD: u8 = 2;
const FAULT_DRIVER: u8 = 3;

/// State and counters shared between the render callback and the session.
///
/// Counters are written with relaxed ordering from the callback; the session
/// only ever reads snapshots, so no counter needs to synchronize with
/// another. The lifecycle state uses sequential consistency, matching its
/// role as a control flag.
#[derive(Debug, Default)]
pub(crate) struct StreamShared {
    /// Lifecycle state as a [`SessionState`] discriminant.
    state: AtomicU8,
    /// Buffer halves filled with queued audio.
    pub(crate) halves_rendered: AtomicU64,
    /// Buffer halves filled with silence.
    pub(crate) silent_halves: AtomicU64,
    /// Underrun episodes (edges, not silent halves).
    pub(crate) underruns: AtomicU64,
    /// Sample rate change notices seen.
    pub(crate) rate_changes: AtomicU64,
    /// First fatal notice, one of the FAULT_* codes.
    fault: AtomicU8,
}

impl StreamShared {
    pub(crate) fn set_state(&self, state: SessionState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    pub(crate) fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Latches a fatal notice. Returns true if this call did the latching;
    /// later notices keep the first fault.
    fn latch_fault(&self, code: u8) -> bool {
        self.fault
            .compare_exchange(FAULT_NONE, code, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// The latched fatal notice, if any.
    pub(crate) fn fault(&self) -> Option<DriverNotice> {
        match self.fault.load(Ordering::Acquire) {
            FAULT_RESET => Some(DriverNotice::ResetRequested),
            FAULT_OVERLOAD => Some(DriverNotice::Overload),
            FAULT_DRIVER => Some(DriverNotice::Fault),
            _ => None,
        }
    }
}

/// Render handler bridging the staging planes to the driver's halves.
pub(crate) struct RenderBridge {
    staging: StagingConsumer,
    native: NativeSampleType,
    /// Bytes one half requires per plane.
    bytes_per_half: usize,
    shared: Arc<StreamShared>,
    events: Option<EventCallback>,
    /// Silent halves in the current underrun episode, 0 when healthy.
    silent_streak: u64,
}

impl RenderBridge {
    pub(crate) fn new(
        staging: StagingConsumer,
        native: NativeSampleType,
        bytes_per_half: usize,
        shared: Arc<StreamShared>,
        events: Option<EventCallback>,
    ) -> Self {
        Self {
            staging,
            native,
            bytes_per_half,
            shared,
            events,
            silent_streak: 0,
        }
    }

    fn emit(&self, event: RenderEvent) {
        if let Some(callback) = &self.events {
            callback(event);
        }
    }
}

impl RenderHandler for RenderBridge {
    fn render(&mut self, mut half: BufferHalf<'_, '_>) {
        let buffered = self.staging.available_to_read();
        if buffered >= self.bytes_per_half {
            // Every plane has a full half queued, pop them in lock step.
            for plane in 0..half.plane_count() {
                if let Some(dst) = half.plane_mut(plane) {
                    self.staging.read(plane, dst);
                }
            }
            self.shared.halves_rendered.fetch_add(1, Ordering::Relaxed);
            if self.silent_streak > 0 {
                let silent_halves = self.silent_streak;
                self.silent_streak = 0;
                self.emit(RenderEvent::Recovered { silent_halves });
            }
        } else {
            // All or nothing: a short queue stays untouched and the whole
            // half goes out as silence.
            for plane in 0..half.plane_count() {
                if let Some(dst) = half.plane_mut(plane) {
                    self.native.fill_silence(dst);
                }
            }
            self.shared.silent_halves.fetch_add(1, Ordering::Relaxed);
            if self.silent_streak == 0 {
                self.shared.underruns.fetch_add(1, Ordering::Relaxed);
                self.emit(RenderEvent::UnderrunStarted {
                    buffered_bytes: buffered,
                    needed_bytes: self.bytes_per_half,
                });
            }
            self.silent_streak += 1;
        }
    }

    fn notice(&mut self, notice: DriverNotice) {
        match notice {
            DriverNotice::SampleRateChanged { rate } => {
                self.shared.rate_changes.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(rate, "Driver reported a sample rate change");
                self.emit(RenderEvent::SampleRateChanged { rate });
            }
            DriverNotice::ResetRequested | DriverNotice::Overload | DriverNotice::Fault => {
                let code = match notice {
                    DriverNotice::ResetRequested => FAULT_RESET,
                    DriverNotice::Overload => FAULT_OVERLOAD,
                    _ => FAULT_DRIVER,
                };
                if self.shared.latch_fault(code) {
                    tracing::error!("Driver fault latched: {}", notice);
                    self.emit(RenderEvent::FaultLatched { notice });
                }
            }
        }
    }
}
