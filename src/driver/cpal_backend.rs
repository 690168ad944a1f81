//! System output backend built on CPAL.
//!
//! CPAL streams are pull-based and interleaved, while [`OutputDriver`]
//! exposes double-buffered planar halves. The adapter renders halves on a
//! dedicated worker thread and feeds an interleaved f32 ring buffer that
//! the CPAL callback drains. The worker owns the stream because CPAL
//! streams cannot move across threads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleRate, StreamConfig};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::HeapRb;

use crate::error::DriverError;
use crate::format::StreamMode;
use crate::native::NativeSampleType;

use super::{
    BufferHalf, DeviceDesc, DeviceId, DriverHost, DriverNotice, HalfIndex, OutputDriver,
    RenderHandler,
};

/// Buffer frames to fall back on when the device does not report a range.
const DEFAULT_BUFFER_FRAMES: usize = 512;

/// Host adapter that discovers system output devices through CPAL.
///
/// Devices are identified by name. The system default output device, when
/// one is configured, is listed first so it doubles as the fallback pick.
pub struct CpalHost {
    host: cpal::Host,
}

impl CpalHost {
    /// Connects to the platform's default CPAL host.
    #[must_use]
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }
}

impl Default for CpalHost {
    fn default() -> Self {
        Self::new()
    }
}

impl DriverHost for CpalHost {
    fn devices(&self) -> Vec<DeviceDesc> {
        let default_name = self
            .host
            .default_output_device()
            .and_then(|device| device.name().ok());

        let mut descs = Vec::new();
        let Ok(devices) = self.host.output_devices() else {
            return descs;
        };
        for device in devices {
            let Ok(name) = device.name() else { continue };
            let desc = DeviceDesc {
                id: DeviceId::new(name.clone()),
                name,
            };
            if default_name.as_deref() == Some(desc.name.as_str()) {
                descs.insert(0, desc);
            } else {
                descs.push(desc);
            }
        }
        descs
    }

    fn open(&self, id: &DeviceId) -> Result<Box<dyn OutputDriver>, DriverError> {
        let device = find_device(&self.host, id.as_str())?;
        let driver = CpalDriver::open(&device, id.as_str())?;
        Ok(Box::new(driver))
    }
}

fn find_device(host: &cpal::Host, name: &str) -> Result<cpal::Device, DriverError> {
    let devices = host
        .output_devices()
        .map_err(|e| DriverError::Backend(e.to_string()))?;
    for device in devices {
        if device.name().ok().as_deref() == Some(name) {
            return Ok(device);
        }
    }
    Err(DriverError::Backend(format!("no output device named {name}")))
}

enum WorkerCommand {
    Stop,
}

struct Worker {
    cmd_tx: mpsc::Sender<WorkerCommand>,
    join: thread::JoinHandle<Box<dyn RenderHandler>>,
}

/// [`OutputDriver`] over one CPAL output device.
///
/// Capabilities are snapshotted at open time so trait queries never touch
/// the device again. The device itself is reopened by name on the worker
/// thread when the clock starts. Density mode is not available through
/// CPAL, so only PCM negotiations succeed here.
pub struct CpalDriver {
    device_name: String,
    channels: u16,
    rate_ranges: Vec<(u32, u32)>,
    preferred_frames: usize,
    sample_rate: u32,
    buffer_planes: usize,
    buffer_frames: usize,
    handler: Option<Box<dyn RenderHandler>>,
    worker: Option<Worker>,
}

impl CpalDriver {
    fn open(device: &cpal::Device, name: &str) -> Result<Self, DriverError> {
        let default_config = device
            .default_output_config()
            .map_err(|e| DriverError::Backend(e.to_string()))?;

        let mut rate_ranges = Vec::new();
        let configs = device
            .supported_output_configs()
            .map_err(|e| DriverError::Backend(e.to_string()))?;
        for range in configs {
            if range.sample_format() == cpal::SampleFormat::F32 {
                rate_ranges.push((range.min_sample_rate().0, range.max_sample_rate().0));
            }
        }
        if rate_ranges.is_empty() {
            return Err(DriverError::query_failed("f32 output configs"));
        }

        let preferred_frames = match *default_config.buffer_size() {
            cpal::SupportedBufferSize::Range { min, max } => {
                (DEFAULT_BUFFER_FRAMES as u32).clamp(min, max) as usize
            }
            cpal::SupportedBufferSize::Unknown => DEFAULT_BUFFER_FRAMES,
        };

        Ok(Self {
            device_name: name.to_string(),
            channels: default_config.channels(),
            rate_ranges,
            preferred_frames,
            sample_rate: default_config.sample_rate().0,
            buffer_planes: 0,
            buffer_frames: 0,
            handler: None,
            worker: None,
        })
    }
}

impl OutputDriver for CpalDriver {
    fn set_stream_mode(&mut self, mode: StreamMode) -> Result<(), DriverError> {
        match mode {
            StreamMode::Pcm => Ok(()),
            StreamMode::Dsd => Err(DriverError::ModeNotSupported { mode }),
        }
    }

    fn supports_sample_rate(&self, rate: u32) -> bool {
        self.rate_ranges
            .iter()
            .any(|&(min, max)| (min..=max).contains(&rate))
    }

    fn set_sample_rate(&mut self, rate: u32) -> Result<(), DriverError> {
        if !self.supports_sample_rate(rate) {
            return Err(DriverError::Backend(format!(
                "sample rate {rate}Hz outside device ranges"
            )));
        }
        self.sample_rate = rate;
        Ok(())
    }

    fn output_channels(&self) -> Result<usize, DriverError> {
        Ok(usize::from(self.channels))
    }

    fn preferred_buffer_frames(&self) -> Result<usize, DriverError> {
        Ok(self.preferred_frames)
    }

    fn native_sample_type(&self) -> Result<NativeSampleType, DriverError> {
        // CPAL consumes f32 in the machine's own byte order.
        if cfg!(target_endian = "little") {
            Ok(NativeSampleType::Float32Lsb)
        } else {
            Ok(NativeSampleType::Float32Msb)
        }
    }

    fn create_buffers(
        &mut self,
        planes: usize,
        frames: usize,
        handler: Box<dyn RenderHandler>,
    ) -> Result<(), DriverError> {
        if self.worker.is_some() {
            return Err(DriverError::buffer_creation_failed("clock is running"));
        }
        if planes == 0 || frames == 0 {
            return Err(DriverError::buffer_creation_failed("zero-sized buffers"));
        }
        self.buffer_planes = planes;
        self.buffer_frames = frames;
        self.handler = Some(handler);
        Ok(())
    }

    fn start(&mut self) -> Result<(), DriverError> {
        if self.worker.is_some() {
            return Ok(());
        }
        let handler = self
            .handler
            .take()
            .ok_or_else(|| DriverError::clock_failed("no buffers created"))?;

        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();
        let params = WorkerParams {
            device_name: self.device_name.clone(),
            channels: self.channels,
            sample_rate: self.sample_rate,
            planes: self.buffer_planes,
            frames: self.buffer_frames,
        };
        let join = thread::spawn(move || run_worker(&params, handler, &cmd_rx, &ready_tx));

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.worker = Some(Worker { cmd_tx, join });
                Ok(())
            }
            Ok(Err(err)) => {
                // The worker hands the handler back before exiting.
                if let Ok(handler) = join.join() {
                    self.handler = Some(handler);
                }
                Err(err)
            }
            Err(_) => Err(DriverError::clock_failed("render thread died during start")),
        }
    }

    fn stop(&mut self) -> Result<(), DriverError> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        let _ = worker.cmd_tx.send(WorkerCommand::Stop);
        match worker.join.join() {
            Ok(handler) => {
                self.handler = Some(handler);
                Ok(())
            }
            Err(_) => Err(DriverError::clock_failed("render thread panicked")),
        }
    }

    fn dispose_buffers(&mut self) -> Result<(), DriverError> {
        if self.worker.is_some() {
            return Err(DriverError::buffer_creation_failed(
                "cannot dispose while clock is running",
            ));
        }
        self.handler = None;
        self.buffer_planes = 0;
        self.buffer_frames = 0;
        Ok(())
    }
}

impl Drop for CpalDriver {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.cmd_tx.send(WorkerCommand::Stop);
            let _ = worker.join.join();
        }
    }
}

struct WorkerParams {
    device_name: String,
    channels: u16,
    sample_rate: u32,
    planes: usize,
    frames: usize,
}

/// Body of the worker thread. Builds the CPAL stream, then alternates
/// rendering halves into the interleaved ring until told to stop. Always
/// returns the handler so the driver can start again later.
fn run_worker(
    params: &WorkerParams,
    mut handler: Box<dyn RenderHandler>,
    cmd_rx: &mpsc::Receiver<WorkerCommand>,
    ready_tx: &mpsc::Sender<Result<(), DriverError>>,
) -> Box<dyn RenderHandler> {
    let half_samples = params.frames * usize::from(params.channels);
    // Room for four halves keeps the callback fed across scheduling jitter.
    let ring = HeapRb::<f32>::new(half_samples * 4);
    let (mut producer, mut consumer) = ring.split();

    let fault = Arc::new(AtomicBool::new(false));
    let stream = match build_stream(params, &fault, move |data| {
        let filled = consumer.pop_slice(data);
        for sample in &mut data[filled..] {
            *sample = 0.0;
        }
    }) {
        Ok(stream) => stream,
        Err(err) => {
            let _ = ready_tx.send(Err(err));
            return handler;
        }
    };
    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(DriverError::clock_failed(e.to_string())));
        return handler;
    }
    let _ = ready_tx.send(Ok(()));

    let mut halves = [
        allocate_half(params.planes, params.frames),
        allocate_half(params.planes, params.frames),
    ];
    let mut interleaved = vec![0.0f32; half_samples];
    let mut index = HalfIndex::A;
    let mut fault_reported = false;
    let nap = quarter_half(params.frames, params.sample_rate);

    loop {
        match cmd_rx.try_recv() {
            Ok(WorkerCommand::Stop) | Err(mpsc::TryRecvError::Disconnected) => break,
            Err(mpsc::TryRecvError::Empty) => {}
        }
        if fault.load(Ordering::Relaxed) && !fault_reported {
            handler.notice(DriverNotice::Fault);
            fault_reported = true;
        }
        if producer.vacant_len() < half_samples {
            thread::sleep(nap);
            continue;
        }

        let slot = match index {
            HalfIndex::A => 0,
            HalfIndex::B => 1,
        };
        {
            let mut planes: Vec<&mut [u8]> = halves[slot]
                .iter_mut()
                .map(Vec::as_mut_slice)
                .collect();
            handler.render(BufferHalf::new(index, &mut planes));
        }
        interleave(&halves[slot], params.frames, &mut interleaved);
        producer.push_slice(&interleaved);
        index = index.flipped();
    }

    drop(stream);
    handler
}

fn build_stream<F>(
    params: &WorkerParams,
    fault: &Arc<AtomicBool>,
    mut fill: F,
) -> Result<cpal::Stream, DriverError>
where
    F: FnMut(&mut [f32]) + Send + 'static,
{
    let host = cpal::default_host();
    let device = find_device(&host, &params.device_name)?;
    let config = StreamConfig {
        channels: params.channels,
        sample_rate: SampleRate(params.sample_rate),
        buffer_size: BufferSize::Default,
    };
    let fault = Arc::clone(fault);
    device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                fill(data);
            },
            move |err| {
                tracing::error!("Audio stream error: {}", err);
                fault.store(true, Ordering::Relaxed);
            },
            None,
        )
        .map_err(|e| DriverError::Backend(e.to_string()))
}

fn allocate_half(planes: usize, frames: usize) -> Vec<Vec<u8>> {
    (0..planes).map(|_| vec![0u8; frames * 4]).collect()
}

/// Re-lays planar native-endian f32 bytes as interleaved samples.
fn interleave(planes: &[Vec<u8>], frames: usize, out: &mut [f32]) {
    let channels = planes.len();
    for (channel, plane) in planes.iter().enumerate() {
        for frame in 0..frames {
            let start = frame * 4;
            let bytes = [
                plane[start],
                plane[start + 1],
                plane[start + 2],
                plane[start + 3],
            ];
            out[frame * channels + channel] = f32::from_ne_bytes(bytes);
        }
    }
}

fn quarter_half(frames: usize, sample_rate: u32) -> Duration {
    let micros = (frames as u64) * 250_000 / u64::from(sample_rate.max(1));
    Duration::from_micros(micros.max(500))
}
