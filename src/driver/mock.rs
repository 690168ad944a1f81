//! Mock driver and host for testing without hardware.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::DriverError;
use crate::format::StreamMode;
use crate::native::NativeSampleType;

use super::{
    BufferHalf, DeviceDesc, DeviceId, DriverHost, DriverNotice, HalfIndex, OutputDriver,
    RenderHandler,
};

/// Capability profile for a [`MockDriver`].
///
/// Defaults describe a plain stereo PCM device with a 16-bit MSB-first
/// native type. The `fail_*` switches make individual negotiation steps
/// fail, for exercising error paths.
#[derive(Debug, Clone)]
pub struct MockDeviceConfig {
    /// Output channels the device reports.
    pub channels: usize,
    /// Preferred buffer half length in frames.
    pub preferred_frames: usize,
    /// Native sample type reported in PCM mode.
    pub pcm_native: NativeSampleType,
    /// Native sample type reported in density mode, `None` if the device
    /// has no density support.
    pub dsd_native: Option<NativeSampleType>,
    /// Sample rates accepted in PCM mode.
    pub pcm_rates: Vec<u32>,
    /// Sample rates accepted in density mode.
    pub dsd_rates: Vec<u32>,
    /// Makes the channel count query fail.
    pub fail_channel_query: bool,
    /// Makes buffer creation fail.
    pub fail_buffer_creation: bool,
    /// Makes the clock start fail.
    pub fail_start: bool,
}

impl Default for MockDeviceConfig {
    fn default() -> Self {
        Self {
            channels: 2,
            preferred_frames: 512,
            pcm_native: NativeSampleType::Int16Msb,
            dsd_native: None,
            pcm_rates: vec![44_100, 48_000, 88_200, 96_000, 176_400, 192_000],
            dsd_rates: Vec::new(),
            fail_channel_query: false,
            fail_buffer_creation: false,
            fail_start: false,
        }
    }
}

impl MockDeviceConfig {
    /// Profile with density support on top of the PCM defaults.
    #[must_use]
    pub fn dsd_capable() -> Self {
        Self {
            dsd_native: Some(NativeSampleType::Dsd1Msb),
            dsd_rates: vec![2_822_400, 3_072_000, 5_644_800, 6_144_000],
            ..Self::default()
        }
    }
}

struct MockBuffers {
    frames: usize,
    // [half][plane] -> bytes
    halves: [Vec<Vec<u8>>; 2],
}

struct MockState {
    config: MockDeviceConfig,
    mode: StreamMode,
    sample_rate: u32,
    buffers: Option<MockBuffers>,
    handler: Option<Box<dyn RenderHandler>>,
    started: bool,
    current_half: HalfIndex,
    starts: u32,
    stops: u32,
}

/// An in-memory [`OutputDriver`] that a test drives by hand.
///
/// The driver is a cloneable handle over shared state, so a test can keep
/// one clone for inspection while negotiation owns another. Nothing happens
/// on its own clock: call [`advance`] to simulate one buffer half swap and
/// [`notify`] to deliver an out-of-band notice.
///
/// [`advance`]: MockDriver::advance
/// [`notify`]: MockDriver::notify
///
/// # Example
///
/// ```
/// use render_audio::driver::{MockDeviceConfig, MockDriver};
/// use render_audio::{OutputDriver, StreamMode};
///
/// let mut driver = MockDriver::new(MockDeviceConfig::default());
/// assert!(driver.supports_sample_rate(48_000));
/// assert!(driver.set_stream_mode(StreamMode::Dsd).is_err());
/// ```
#[derive(Clone)]
pub struct MockDriver {
    state: Arc<Mutex<MockState>>,
}

impl MockDriver {
    /// Creates a mock driver with the given capability profile.
    #[must_use]
    pub fn new(config: MockDeviceConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                config,
                mode: StreamMode::Pcm,
                sample_rate: 0,
                buffers: None,
                handler: None,
                started: false,
                current_half: HalfIndex::A,
                starts: 0,
                stops: 0,
            })),
        }
    }

    /// Simulates one driver clock tick: hands the current buffer half to
    /// the installed handler, then flips to the other half.
    ///
    /// Does nothing while the clock is stopped, like the real thing.
    pub fn advance(&self) {
        let mut guard = self.state.lock();
        let MockState {
            buffers,
            handler,
            current_half,
            started,
            ..
        } = &mut *guard;
        if !*started {
            return;
        }
        let (Some(buffers), Some(handler)) = (buffers.as_mut(), handler.as_mut()) else {
            return;
        };
        let index = *current_half;
        let slot = match index {
            HalfIndex::A => 0,
            HalfIndex::B => 1,
        };
        let mut planes: Vec<&mut [u8]> = buffers.halves[slot]
            .iter_mut()
            .map(Vec::as_mut_slice)
            .collect();
        handler.render(BufferHalf::new(index, &mut planes));
        *current_half = index.flipped();
    }

    /// Delivers an out-of-band notice to the installed handler.
    pub fn notify(&self, notice: DriverNotice) {
        let mut guard = self.state.lock();
        if let Some(handler) = guard.handler.as_mut() {
            handler.notice(notice);
        }
    }

    /// Copy of the plane bytes from the half rendered most recently.
    ///
    /// # Panics
    ///
    /// Panics if buffers were never created or `plane` is out of range.
    #[must_use]
    pub fn last_rendered(&self, plane: usize) -> Vec<u8> {
        let guard = self.state.lock();
        let buffers = guard.buffers.as_ref().expect("buffers not created");
        let slot = match guard.current_half.flipped() {
            HalfIndex::A => 0,
            HalfIndex::B => 1,
        };
        buffers.halves[slot][plane].clone()
    }

    /// Stream mode the driver is currently in.
    #[must_use]
    pub fn stream_mode(&self) -> StreamMode {
        self.state.lock().mode
    }

    /// Sample rate last set on the driver clock.
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.state.lock().sample_rate
    }

    /// Whether the driver clock is running.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.state.lock().started
    }

    /// Whether double buffers currently exist.
    #[must_use]
    pub fn buffers_created(&self) -> bool {
        self.state.lock().buffers.is_some()
    }

    /// Buffer half length in frames, if buffers exist.
    #[must_use]
    pub fn buffer_frames(&self) -> Option<usize> {
        self.state.lock().buffers.as_ref().map(|b| b.frames)
    }

    /// Number of planes per buffer half, if buffers exist.
    #[must_use]
    pub fn buffer_planes(&self) -> Option<usize> {
        self.state
            .lock()
            .buffers
            .as_ref()
            .map(|b| b.halves[0].len())
    }

    /// How many times the clock was started.
    #[must_use]
    pub fn start_count(&self) -> u32 {
        self.state.lock().starts
    }

    /// How many times the clock was stopped.
    #[must_use]
    pub fn stop_count(&self) -> u32 {
        self.state.lock().stops
    }

    fn current_native(state: &MockState) -> Result<NativeSampleType, DriverError> {
        match state.mode {
            StreamMode::Pcm => Ok(state.config.pcm_native),
            StreamMode::Dsd => state
                .config
                .dsd_native
                .ok_or_else(|| DriverError::query_failed("channel info")),
        }
    }
}

impl OutputDriver for MockDriver {
    fn set_stream_mode(&mut self, mode: StreamMode) -> Result<(), DriverError> {
        let mut guard = self.state.lock();
        if mode == StreamMode::Dsd && guard.config.dsd_native.is_none() {
            return Err(DriverError::ModeNotSupported { mode });
        }
        guard.mode = mode;
        Ok(())
    }

    fn supports_sample_rate(&self, rate: u32) -> bool {
        let guard = self.state.lock();
        match guard.mode {
            StreamMode::Pcm => guard.config.pcm_rates.contains(&rate),
            StreamMode::Dsd => guard.config.dsd_rates.contains(&rate),
        }
    }

    fn set_sample_rate(&mut self, rate: u32) -> Result<(), DriverError> {
        let mut guard = self.state.lock();
        let supported = match guard.mode {
            StreamMode::Pcm => guard.config.pcm_rates.contains(&rate),
            StreamMode::Dsd => guard.config.dsd_rates.contains(&rate),
        };
        if !supported {
            return Err(DriverError::backend(format!("rate {rate}Hz not supported")));
        }
        guard.sample_rate = rate;
        Ok(())
    }

    fn output_channels(&self) -> Result<usize, DriverError> {
        let guard = self.state.lock();
        if guard.config.fail_channel_query {
            return Err(DriverError::query_failed("output channels"));
        }
        Ok(guard.config.channels)
    }

    fn preferred_buffer_frames(&self) -> Result<usize, DriverError> {
        Ok(self.state.lock().config.preferred_frames)
    }

    fn native_sample_type(&self) -> Result<NativeSampleType, DriverError> {
        let guard = self.state.lock();
        Self::current_native(&guard)
    }

    fn create_buffers(
        &mut self,
        planes: usize,
        frames: usize,
        handler: Box<dyn RenderHandler>,
    ) -> Result<(), DriverError> {
        let mut guard = self.state.lock();
        if guard.config.fail_buffer_creation {
            return Err(DriverError::buffer_creation_failed("injected failure"));
        }
        if guard.started {
            return Err(DriverError::buffer_creation_failed("clock is running"));
        }
        let sample_size = Self::current_native(&guard)?.byte_size();
        let plane_bytes = frames * sample_size;
        let make_half = || (0..planes).map(|_| vec![0u8; plane_bytes]).collect();
        guard.buffers = Some(MockBuffers {
            frames,
            halves: [make_half(), make_half()],
        });
        guard.handler = Some(handler);
        guard.current_half = HalfIndex::A;
        Ok(())
    }

    fn start(&mut self) -> Result<(), DriverError> {
        let mut guard = self.state.lock();
        if guard.buffers.is_none() {
            return Err(DriverError::clock_failed("no buffers created"));
        }
        if guard.config.fail_start {
            return Err(DriverError::clock_failed("injected failure"));
        }
        guard.started = true;
        guard.starts += 1;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DriverError> {
        let mut guard = self.state.lock();
        if guard.started {
            guard.started = false;
            guard.stops += 1;
        }
        Ok(())
    }

    fn dispose_buffers(&mut self) -> Result<(), DriverError> {
        let mut guard = self.state.lock();
        if guard.started {
            return Err(DriverError::backend("buffers disposed while clock running"));
        }
        guard.buffers = None;
        guard.handler = None;
        Ok(())
    }
}

/// An in-memory [`DriverHost`] serving [`MockDriver`]s.
///
/// # Example
///
/// ```
/// use render_audio::driver::{MockDeviceConfig, MockHost};
/// use render_audio::DriverHost;
///
/// let mut host = MockHost::new();
/// host.add("mock-a", "Mock Device A", MockDeviceConfig::default());
/// assert_eq!(host.devices().len(), 1);
/// ```
#[derive(Default)]
pub struct MockHost {
    devices: Vec<(DeviceDesc, MockDriver)>,
}

impl MockHost {
    /// Creates an empty host.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a device and returns a handle to its driver for
    /// inspection and for driving callbacks.
    pub fn add(
        &mut self,
        id: impl Into<DeviceId>,
        name: impl Into<String>,
        config: MockDeviceConfig,
    ) -> MockDriver {
        let driver = MockDriver::new(config);
        self.devices.push((
            DeviceDesc {
                id: id.into(),
                name: name.into(),
            },
            driver.clone(),
        ));
        driver
    }
}

impl DriverHost for MockHost {
    fn devices(&self) -> Vec<DeviceDesc> {
        self.devices.iter().map(|(desc, _)| desc.clone()).collect()
    }

    fn open(&self, id: &DeviceId) -> Result<Box<dyn OutputDriver>, DriverError> {
        self.devices
            .iter()
            .find(|(desc, _)| desc.id == *id)
            .map(|(_, driver)| Box::new(driver.clone()) as Box<dyn OutputDriver>)
            .ok_or_else(|| DriverError::backend(format!("unknown device: {id}")))
    }
}
