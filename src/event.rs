//! Runtime events for monitoring stream health.
//!
//! Events are non-fatal notifications about stream behavior. The session
//! keeps running after an event is emitted - they exist for logging and
//! metrics, not error handling. Payloads are `Copy` because events originate
//! in the driver callback, which never allocates.

use std::sync::Arc;

use crate::driver::DriverNotice;

/// Runtime events emitted while a session streams.
///
/// These are informational, not errors. Underruns in particular are edge
/// events: one [`UnderrunStarted`] when the staging queue first comes up
/// short, one [`Recovered`] when data flows again, no matter how many silent
/// buffer halves passed in between.
///
/// [`UnderrunStarted`]: RenderEvent::UnderrunStarted
/// [`Recovered`]: RenderEvent::Recovered
///
/// # Example
///
/// ```
/// use render_audio::RenderEvent;
///
/// fn handle_event(event: RenderEvent) {
///     match event {
///         RenderEvent::UnderrunStarted { buffered_bytes, needed_bytes } => {
///             eprintln!("underrun: {buffered_bytes} of {needed_bytes} bytes buffered");
///         }
///         RenderEvent::Recovered { silent_halves } => {
///             eprintln!("recovered after {silent_halves} silent halves");
///         }
///         RenderEvent::SampleRateChanged { rate } => {
///             eprintln!("driver clock now {rate}Hz");
///         }
///         RenderEvent::FaultLatched { notice } => {
///             eprintln!("driver fault: {notice}");
///         }
///     }
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderEvent {
    /// The staging queue could not fill a buffer half; silence was
    /// substituted.
    ///
    /// Emitted once per underrun episode, on the first silent half.
    UnderrunStarted {
        /// Bytes that were buffered per plane when the driver asked.
        buffered_bytes: usize,
        /// Bytes one buffer half requires per plane.
        needed_bytes: usize,
    },

    /// Data is flowing again after an underrun episode.
    Recovered {
        /// Buffer halves that carried silence during the episode.
        silent_halves: u64,
    },

    /// The driver reported a sample rate change on its message channel.
    ///
    /// Informational only; the session keeps its negotiated geometry.
    SampleRateChanged {
        /// The rate the driver reported.
        rate: u32,
    },

    /// A driver notice latched the session into a fatal state.
    ///
    /// The next [`Session::add_packets()`] or [`Session::health()`] call
    /// returns the corresponding error.
    ///
    /// [`Session::add_packets()`]: crate::Session::add_packets
    /// [`Session::health()`]: crate::Session::health
    FaultLatched {
        /// The notice that caused the latch.
        notice: DriverNotice,
    },
}

/// Callback type for receiving runtime events.
///
/// Register one via [`RenderAudioBuilder::on_event()`]. The callback is
/// invoked from the driver's threads and must not block; hand the event to a
/// channel or a logger and return.
///
/// [`RenderAudioBuilder::on_event()`]: crate::RenderAudioBuilder::on_event
pub type EventCallback = Arc<dyn Fn(RenderEvent) + Send + Sync>;

/// Creates an [`EventCallback`] from a closure.
///
/// Convenience for building callbacks without wrapping in `Arc` by hand.
///
/// # Example
///
/// ```
/// use render_audio::{event_callback, RenderEvent};
///
/// let callback = event_callback(|event| {
///     println!("got event: {event:?}");
/// });
/// ```
pub fn event_callback<F>(f: F) -> EventCallback
where
    F: Fn(RenderEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}
