//! Builder pattern for `RenderAudio`.

use std::sync::Arc;

use crate::bridge::{RenderBridge, StreamShared};
use crate::convert::{conversion_rule, ConvertFn};
use crate::driver::{DeviceId, DriverHost, OutputDriver};
use crate::error::RenderAudioError;
use crate::event::{event_callback, EventCallback, RenderEvent};
use crate::format::{AudioFormat, ChannelLayout, SampleFormat, StreamMode, MAX_OUTPUT_CHANNELS};
use crate::native::NativeSampleType;
use crate::session::{Session, SessionState};
use crate::staging::create_staging;

/// Service-rate quanta per second; one quantum is 1/75 s of audio.
const QUANTA_PER_SEC: u32 = 75;

/// Quanta of queue capacity per plane, three seconds' worth.
const CACHE_QUANTA: u64 = 3 * QUANTA_PER_SEC as u64;

/// Specifies which output device to open.
#[derive(Debug, Clone, Default)]
pub(crate) enum DeviceSelection {
    /// The first device the host reports.
    #[default]
    SystemDefault,
    /// A specific device by identifier.
    ById(DeviceId),
}

/// Builder for negotiating a render session.
///
/// Use [`RenderAudio::builder()`] to create one. `open()` performs the whole
/// driver handshake: mode switch for density rates, rate and capability
/// queries, conversion rule lookup, queue allocation, buffer creation, and
/// clock start. It either returns a streaming [`Session`] or an error with
/// the driver restored to its pre-negotiation state.
///
/// # Example
///
/// ```
/// use render_audio::{
///     AudioFormat, ChannelLayout, MockDeviceConfig, MockHost, RenderAudio, SampleFormat,
/// };
///
/// let mut host = MockHost::new();
/// host.add("dac", "Reference DAC", MockDeviceConfig::default());
///
/// let session = RenderAudio::builder()
///     .format(AudioFormat::pcm(48_000, ChannelLayout::stereo(), SampleFormat::F32))
///     .device("dac")
///     .on_event(|event| tracing::debug!(?event, "render event"))
///     .open(&host)?;
///
/// assert_eq!(session.format().frames, 640);
/// # Ok::<(), render_audio::RenderAudioError>(())
/// ```
///
/// [`RenderAudio::builder()`]: RenderAudio::builder
#[must_use]
pub struct RenderAudioBuilder {
    /// Requested stream format; derived fields are filled during `open()`.
    format: AudioFormat,
    /// Which device to open.
    device: DeviceSelection,
    /// Event callback.
    event_callback: Option<EventCallback>,
}

impl Default for RenderAudioBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderAudioBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            format: AudioFormat::pcm(48_000, ChannelLayout::stereo(), SampleFormat::F32),
            device: DeviceSelection::default(),
            event_callback: None,
        }
    }

    /// Sets the requested stream format.
    ///
    /// Default: 48 kHz stereo float32.
    pub fn format(mut self, format: AudioFormat) -> Self {
        self.format = format;
        self
    }

    /// Selects a specific device instead of the host's first.
    pub fn device(mut self, id: impl Into<DeviceId>) -> Self {
        self.device = DeviceSelection::ById(id.into());
        self
    }

    /// Sets a callback to receive runtime events.
    ///
    /// Events include underrun edges, driver rate changes, and latched
    /// faults. The callback runs on driver threads and must not block.
    pub fn on_event<F>(mut self, callback: F) -> Self
    where
        F: Fn(RenderEvent) + Send + Sync + 'static,
    {
        self.event_callback = Some(event_callback(callback));
        self
    }

    /// Negotiates with the selected device and starts streaming.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The selected device does not exist or fails to open
    /// - The device rejects the density mode switch or the sample rate
    /// - A capability query fails
    /// - No conversion rule exists for the host/native format pairing
    /// - The derived geometry is degenerate
    ///
    /// On error no session exists and the device was restored: buffers
    /// created along the way are disposed and a density mode switch is
    /// undone.
    pub fn open(self, host: &dyn DriverHost) -> Result<Session, RenderAudioError> {
        let desc = match &self.device {
            DeviceSelection::SystemDefault => host
                .devices()
                .into_iter()
                .next()
                .ok_or(RenderAudioError::NoDevices)?,
            DeviceSelection::ById(id) => host
                .devices()
                .into_iter()
                .find(|desc| desc.id == *id)
                .ok_or_else(|| RenderAudioError::device_not_found(id.as_str()))?,
        };
        tracing::debug!(device = %desc.id, name = %desc.name, "Opening output device");
        let driver = host.open(&desc.id)?;

        negotiate(driver, self.format, self.event_callback)
    }
}

/// Everything negotiation produces besides the driver itself.
struct Negotiated {
    format: AudioFormat,
    staging: crate::staging::StagingProducer,
    shared: Arc<StreamShared>,
    native: NativeSampleType,
    rule: ConvertFn,
    plane_bytes_per_sec: u64,
}

/// Runs the handshake, undoing the density mode switch if a later step
/// fails.
fn negotiate(
    mut driver: Box<dyn OutputDriver>,
    format: AudioFormat,
    events: Option<EventCallback>,
) -> Result<Session, RenderAudioError> {
    let mode = format.stream_mode();
    if mode == StreamMode::Dsd {
        driver.set_stream_mode(StreamMode::Dsd).map_err(|_| {
            RenderAudioError::DsdModeUnsupported {
                rate: format.sample_rate,
            }
        })?;
    }

    match negotiate_in_mode(&mut driver, format, events) {
        Ok(negotiated) => Ok(Session::new(
            driver,
            negotiated.staging,
            negotiated.shared,
            negotiated.format,
            negotiated.native,
            negotiated.rule,
            negotiated.plane_bytes_per_sec,
        )),
        Err(err) => {
            if mode == StreamMode::Dsd {
                let _ = driver.set_stream_mode(StreamMode::Pcm);
            }
            Err(err)
        }
    }
}

/// The handshake proper, in the driver call order: rate check, rate set,
/// channel query, buffer-size query, channel-info query, buffer creation,
/// clock start. Buffers are disposed here if the clock fails to start, so
/// the caller only has the mode switch left to undo.
fn negotiate_in_mode(
    driver: &mut Box<dyn OutputDriver>,
    mut format: AudioFormat,
    events: Option<EventCallback>,
) -> Result<Negotiated, RenderAudioError> {
    let rate = format.sample_rate;
    if !driver.supports_sample_rate(rate) {
        return Err(RenderAudioError::UnsupportedSampleRate { rate });
    }
    driver.set_sample_rate(rate)?;

    let device_channels = driver.output_channels()?;
    let buffer_frames = driver.preferred_buffer_frames()?;
    let native = driver.native_sample_type()?;
    tracing::debug!(
        device_channels,
        buffer_frames,
        native = %native,
        "Queried device geometry"
    );

    let rule = conversion_rule(format.sample_format, native).ok_or(
        RenderAudioError::ConversionGap {
            host: format.sample_format,
            native,
        },
    )?;

    let native_size = native.byte_size();
    let host_sample_size = format.sample_format.byte_size();
    let frame_size = format.channels.count() * host_sample_size;
    let quantum_divisor = if format.stream_mode() == StreamMode::Dsd {
        8
    } else {
        1
    };
    let frames = rate / quantum_divisor / QUANTA_PER_SEC;
    let plane_bytes_per_sec = u64::from(rate) * u64::from(native.bits()) / 8;
    let quantum_bytes = plane_bytes_per_sec / u64::from(QUANTA_PER_SEC);
    let mut capacity = (quantum_bytes * CACHE_QUANTA) as usize;
    capacity -= capacity % native_size;

    let planes = device_channels.min(MAX_OUTPUT_CHANNELS);
    if planes == 0 {
        return Err(RenderAudioError::invalid_geometry(
            "device reports zero output channels",
        ));
    }
    if buffer_frames == 0 {
        return Err(RenderAudioError::invalid_geometry(
            "device reports zero buffer frames",
        ));
    }
    if frames == 0 || capacity == 0 {
        return Err(RenderAudioError::invalid_geometry(format!(
            "sample rate {rate}Hz yields an empty quantum"
        )));
    }
    if frame_size == 0 {
        return Err(RenderAudioError::invalid_geometry(
            "requested layout has zero channels",
        ));
    }

    format.frames = frames;
    format.frame_size = frame_size as u32;

    let shared = Arc::new(StreamShared::default());
    let (producer, consumer) = create_staging(planes, capacity);
    let bridge = RenderBridge::new(
        consumer,
        native,
        buffer_frames * native_size,
        Arc::clone(&shared),
        events,
    );
    driver.create_buffers(planes, buffer_frames, Box::new(bridge))?;
    shared.set_state(SessionState::Armed);

    tracing::info!(
        rate,
        planes,
        frames,
        frame_size,
        native = %native,
        "Negotiated render stream"
    );

    if let Err(err) = driver.start() {
        let _ = driver.dispose_buffers();
        return Err(err.into());
    }
    shared.set_state(SessionState::Streaming);

    Ok(Negotiated {
        format,
        staging: producer,
        shared,
        native,
        rule,
        plane_bytes_per_sec,
    })
}

/// Main entry point for render-audio.
///
/// Use [`RenderAudio::builder()`] to start configuring a render session.
pub struct RenderAudio;

impl RenderAudio {
    /// Creates a new builder for configuring a render session.
    pub fn builder() -> RenderAudioBuilder {
        RenderAudioBuilder::new()
    }
}
