//! Producer-side handle to a negotiated render stream.

use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use crate::bridge::StreamShared;
use crate::convert::{convert_plane, ConvertFn};
use crate::driver::OutputDriver;
use crate::error::RenderAudioError;
use crate::format::AudioFormat;
use crate::native::NativeSampleType;
use crate::staging::StagingProducer;

/// Lifecycle of a render session.
///
/// Negotiation moves Idle → Armed (buffers created) → Streaming (clock
/// running); [`Session::stop()`] or [`Session::drain()`] moves Streaming →
/// Stopped. Stopped is terminal: resuming requires a fresh negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    /// No driver resources claimed yet.
    Idle = 0,
    /// Buffers created, clock not running.
    Armed = 1,
    /// Driver clock running, callback live.
    Streaming = 2,
    /// Clock halted; terminal.
    Stopped = 3,
}

impl SessionState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Armed,
            2 => Self::Streaming,
            _ => Self::Stopped,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Armed => "armed",
            Self::Streaming => "streaming",
            Self::Stopped => "stopped",
        };
        f.write_str(label)
    }
}

/// Statistics about a render session.
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    /// Frames accepted by [`Session::add_packets()`].
    pub frames_accepted: u64,
    /// Buffer halves filled with queued audio.
    pub halves_rendered: u64,
    /// Buffer halves filled with silence.
    pub silent_halves: u64,
    /// Underrun episodes (transitions into silence, not silent halves).
    pub underruns: u64,
    /// Sample rate changes the driver reported.
    pub sample_rate_changes: u64,
}

/// Handle to a negotiated render stream.
///
/// Returned by [`RenderAudioBuilder::open()`] with the driver clock already
/// running. The application feeds interleaved host-format audio through
/// [`add_packets()`]; conversion and queueing happen here, on the caller's
/// thread, while the driver callback drains the queue on its own clock.
///
/// # Lifecycle
///
/// 1. Created by [`RenderAudioBuilder::open()`], already streaming
/// 2. Feed audio with [`add_packets()`], watch [`delay()`]
/// 3. [`stop()`](Session::stop) halts the clock; [`drain()`](Session::drain)
///    halts it and discards what was still buffered
/// 4. Dropping the session stops the clock and releases driver buffers
///
/// # Example
///
/// ```
/// use render_audio::{
///     AudioFormat, ChannelLayout, MockDeviceConfig, MockHost, RenderAudio, SampleFormat,
/// };
///
/// let mut host = MockHost::new();
/// host.add("main", "Main Out", MockDeviceConfig::default());
///
/// let format = AudioFormat::pcm(48_000, ChannelLayout::stereo(), SampleFormat::F32);
/// let mut session = RenderAudio::builder().format(format).open(&host)?;
///
/// let frames = session.format().frames as usize;
/// let frame_size = session.format().frame_size as usize;
/// let silence = vec![0u8; frames * frame_size];
/// let accepted = session.add_packets(&silence, frames, 0)?;
/// assert_eq!(accepted, frames);
///
/// session.stop()?;
/// # Ok::<(), render_audio::RenderAudioError>(())
/// ```
///
/// [`RenderAudioBuilder::open()`]: crate::RenderAudioBuilder::open
/// [`add_packets()`]: Session::add_packets
/// [`delay()`]: Session::delay
pub struct Session {
    driver: Box<dyn OutputDriver>,
    staging: StagingProducer,
    shared: Arc<StreamShared>,
    format: AudioFormat,
    native: NativeSampleType,
    rule: ConvertFn,
    /// Native-format bytes per second per plane, for delay accounting.
    plane_bytes_per_sec: u64,
    frames_accepted: u64,
    drained: bool,
    /// Conversion scratch, one plane's worth, reused across calls.
    scratch: Vec<u8>,
}

impl Session {
    pub(crate) fn new(
        driver: Box<dyn OutputDriver>,
        staging: StagingProducer,
        shared: Arc<StreamShared>,
        format: AudioFormat,
        native: NativeSampleType,
        rule: ConvertFn,
        plane_bytes_per_sec: u64,
    ) -> Self {
        Self {
            driver,
            staging,
            shared,
            format,
            native,
            rule,
            plane_bytes_per_sec,
            frames_accepted: 0,
            drained: false,
            scratch: Vec::new(),
        }
    }

    /// The negotiated format, with `frames` and `frame_size` filled in.
    pub fn format(&self) -> &AudioFormat {
        &self.format
    }

    /// Converts and enqueues up to `frames` frames from `data`.
    ///
    /// `data` is interleaved in the negotiated host format; `offset` skips
    /// that many frames from its start. Each host channel is converted into
    /// its own plane; device planes beyond the host channel count receive
    /// native silence so every plane advances in lock step.
    ///
    /// Returns the number of frames accepted, bounded by queue space and by
    /// what `data` actually holds. Partial acceptance is normal when the
    /// queue is near capacity; feed the remainder again later.
    ///
    /// # Errors
    ///
    /// Returns the latched [`DriverFault`] once the driver has reported a
    /// fatal condition. Returns `Ok(0)` after [`stop()`] or [`drain()`].
    ///
    /// [`DriverFault`]: RenderAudioError::DriverFault
    /// [`stop()`]: Session::stop
    /// [`drain()`]: Session::drain
    pub fn add_packets(
        &mut self,
        data: &[u8],
        frames: usize,
        offset: usize,
    ) -> Result<usize, RenderAudioError> {
        self.health()?;
        if self.shared.state() == SessionState::Stopped {
            return Ok(0);
        }

        let frame_size = self.format.frame_size as usize;
        let host_channels = self.format.channels.count();
        let host_sample_size = self.format.sample_format.byte_size();
        let native_size = self.native.byte_size();

        let skip = offset.saturating_mul(frame_size);
        let src = data.get(skip..).unwrap_or(&[]);
        let source_frames = src.len() / frame_size;
        let space_frames = self.staging.available_to_write() / native_size;
        let count = frames.min(source_frames).min(space_frames);
        if count == 0 {
            return Ok(0);
        }

        self.scratch.resize(count * native_size, 0);
        let planes = self.staging.plane_count();
        let consumed_planes = planes.min(host_channels);
        for plane in 0..consumed_planes {
            convert_plane(
                self.rule,
                src,
                plane,
                host_channels,
                host_sample_size,
                native_size,
                &mut self.scratch,
            );
            self.staging.write(plane, &self.scratch);
        }
        if consumed_planes < planes {
            self.native.fill_silence(&mut self.scratch);
            for plane in consumed_planes..planes {
                self.staging.write(plane, &self.scratch);
            }
        }

        self.frames_accepted += count as u64;
        Ok(count)
    }

    /// Audio buffered ahead of the driver, as playback time.
    ///
    /// Decreases between callbacks when nothing is fed, reaching zero once
    /// the queue is exhausted. Reports zero after [`drain()`].
    ///
    /// [`drain()`]: Session::drain
    #[must_use]
    pub fn delay(&self) -> Duration {
        if self.drained {
            return Duration::ZERO;
        }
        let buffered = self.staging.available_to_read() as f64;
        Duration::from_secs_f64(buffered / self.plane_bytes_per_sec as f64)
    }

    /// Total queue capacity as playback time.
    #[must_use]
    pub fn cache_total(&self) -> Duration {
        let capacity = self.staging.capacity() as f64;
        Duration::from_secs_f64(capacity / self.plane_bytes_per_sec as f64)
    }

    /// Halts the driver clock. Idempotent; the session is terminal after.
    ///
    /// # Errors
    ///
    /// Returns a driver error if the clock refuses to stop.
    pub fn stop(&mut self) -> Result<(), RenderAudioError> {
        if self.shared.state() == SessionState::Stopped {
            return Ok(());
        }
        self.driver.stop()?;
        self.shared.set_state(SessionState::Stopped);
        tracing::debug!("Driver clock stopped");
        Ok(())
    }

    /// Halts the driver clock and discards buffered audio.
    ///
    /// The queue's contents will never reach the device; [`delay()`] reports
    /// zero from here on.
    ///
    /// # Errors
    ///
    /// Returns a driver error if the clock refuses to stop.
    ///
    /// [`delay()`]: Session::delay
    pub fn drain(&mut self) -> Result<(), RenderAudioError> {
        self.stop()?;
        self.drained = true;
        Ok(())
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    /// Returns the latched driver fault, if one occurred.
    ///
    /// # Errors
    ///
    /// The fault the driver reported, as a [`DriverFault`].
    ///
    /// [`DriverFault`]: RenderAudioError::DriverFault
    pub fn health(&self) -> Result<(), RenderAudioError> {
        match self.shared.fault() {
            Some(notice) => Err(RenderAudioError::driver_fault(notice.to_string())),
            None => Ok(()),
        }
    }

    /// Snapshot of the session's counters.
    #[must_use]
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            frames_accepted: self.frames_accepted,
            halves_rendered: self.shared.halves_rendered.load(Ordering::Relaxed),
            silent_halves: self.shared.silent_halves.load(Ordering::Relaxed),
            underruns: self.shared.underruns.load(Ordering::Relaxed),
            sample_rate_changes: self.shared.rate_changes.load(Ordering::Relaxed),
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state())
            .field("format", &self.format)
            .field("native", &self.native)
            .field("frames_accepted", &self.frames_accepted)
            .field("drained", &self.drained)
            .finish_non_exhaustive()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Stop the clock before releasing buffer ownership.
        if self.shared.state() != SessionState::Stopped {
            let _ = self.driver.stop();
            self.shared.set_state(SessionState::Stopped);
        }
        let _ = self.driver.dispose_buffers();
        tracing::debug!("Render session torn down");
    }
}
