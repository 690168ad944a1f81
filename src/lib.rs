//! # render-audio
//!
//! **Note:** This crate is under active development. The API may change before 1.0.
//!
//! Real-time audio rendering into double-buffered driver outputs.
//!
//! `render-audio` moves decoded PCM or DSD audio from an application thread
//! into a hardware driver's alternating buffer halves, converting host
//! sample formats into whatever native representation the device negotiated
//! and substituting silence whenever the producer falls behind.
//!
//! ## Quick Start
//!
//! ```rust
//! use render_audio::{
//!     AudioFormat, ChannelLayout, MockDeviceConfig, MockHost, RenderAudio, SampleFormat,
//! };
//!
//! let mut host = MockHost::new();
//! host.add("dac", "Reference DAC", MockDeviceConfig::default());
//!
//! let format = AudioFormat::pcm(48_000, ChannelLayout::stereo(), SampleFormat::F32);
//! let mut session = RenderAudio::builder()
//!     .format(format)
//!     .on_event(|e| tracing::warn!(?e, "render event"))
//!     .open(&host)?;
//!
//! // Feed interleaved f32 frames; the driver drains them on its own clock.
//! let frames = session.format().frames as usize;
//! let data = vec![0u8; frames * session.format().frame_size as usize];
//! session.add_packets(&data, frames, 0)?;
//!
//! session.stop()?;
//! # Ok::<(), render_audio::RenderAudioError>(())
//! ```
//!
//! With the `cpal-backend` feature enabled, `CpalHost` adapts any system
//! output device into the same `DriverHost` model.
//!
//! ## Architecture
//!
//! The crate maintains a strict thread boundary:
//!
//! - **Driver Callback**: Invoked on the device's clock; pops pre-converted
//!   bytes or writes silence, never blocks or allocates
//! - **Staging Planes**: One lock-free SPSC ring per output channel absorbs
//!   the producer/consumer rate mismatch
//! - **Producer Thread**: `add_packets` converts host samples to the native
//!   format and fans them out across planes
//!
//! Conversion cost stays on the producer thread, so the callback's only work
//! per plane is a bounded copy.

// unsafe_code lint is configured in Cargo.toml as "deny"
#![warn(missing_docs)]
// Audio code requires intentional numeric casts between sample formats
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_lossless
)]
// unwrap/expect allowed in tests only
#![allow(clippy::unwrap_used)]
// These doc lints are too strict for internal implementation details
#![allow(clippy::missing_panics_doc, clippy::missing_errors_doc)]

mod bridge;
mod builder;
mod convert;
pub mod driver;
mod error;
mod event;
pub mod format;
mod native;
mod session;
mod staging;

pub use builder::{RenderAudio, RenderAudioBuilder};
#[cfg(feature = "cpal-backend")]
pub use driver::CpalHost;
pub use driver::{
    enumerate_devices, BufferHalf, DeviceDesc, DeviceId, DeviceInfo, DriverHost, DriverNotice,
    HalfIndex, MockDeviceConfig, MockDriver, MockHost, OutputDriver, RenderHandler,
};
pub use error::{DriverError, RenderAudioError};
pub use event::{event_callback, EventCallback, RenderEvent};
pub use format::{
    AudioFormat, Channel, ChannelLayout, SampleFormat, StreamMode, MAX_OUTPUT_CHANNELS,
};
pub use native::{NativeSampleType, DSD_MIN_SAMPLE_RATE, DSD_SILENCE_BYTE};
pub use session::{Session, SessionState, SessionStats};
