//! Error types for render-audio.
//!
//! Errors are split into two categories:
//! - **Negotiation failures** ([`RenderAudioError`]): returned once from
//!   [`RenderAudioBuilder::open()`], leaving no partial session behind
//! - **Runtime conditions**: underruns surface through events and stats, not
//!   errors; a fatal driver notice latches and is returned from the next
//!   producer call
//!
//! [`RenderAudioBuilder::open()`]: crate::RenderAudioBuilder::open

use crate::format::{SampleFormat, StreamMode};
use crate::native::NativeSampleType;

/// Fatal errors that prevent a render session from opening or continuing.
///
/// These are returned from [`RenderAudioBuilder::open()`] and, for latched
/// driver faults, from [`Session::add_packets()`] and [`Session::health()`].
///
/// [`RenderAudioBuilder::open()`]: crate::RenderAudioBuilder::open
/// [`Session::add_packets()`]: crate::Session::add_packets
/// [`Session::health()`]: crate::Session::health
#[derive(Debug, thiserror::Error)]
pub enum RenderAudioError {
    /// The requested output device was not found.
    #[error("device not found: {id}")]
    DeviceNotFound {
        /// Identifier of the device that wasn't found.
        id: String,
    },

    /// No output devices are available from the driver host.
    #[error("no output devices available")]
    NoDevices,

    /// The device rejected the switch to density (DSD) streaming mode.
    #[error("device rejected density mode for {rate}Hz")]
    DsdModeUnsupported {
        /// The sample rate that required density mode.
        rate: u32,
    },

    /// The requested sample rate is not supported by the device.
    #[error("sample rate {rate}Hz not supported by device")]
    UnsupportedSampleRate {
        /// The requested sample rate.
        rate: u32,
    },

    /// No conversion rule exists for the host/native format pairing.
    ///
    /// Refused at negotiation time rather than streaming undefined bytes.
    #[error("no conversion rule from {host} to {native}")]
    ConversionGap {
        /// The host sample representation.
        host: SampleFormat,
        /// The driver-native sample type.
        native: NativeSampleType,
    },

    /// The negotiated geometry is unusable for streaming.
    #[error("unusable stream geometry: {reason}")]
    InvalidGeometry {
        /// What made the geometry degenerate.
        reason: String,
    },

    /// An error from the driver boundary during negotiation or teardown.
    #[error("driver error: {0}")]
    Driver(#[from] DriverError),

    /// The driver reported an unrecoverable condition mid-stream.
    ///
    /// Latched by the callback bridge and surfaced from the next producer
    /// call; the session must be torn down and renegotiated.
    #[error("driver fault: {reason}")]
    DriverFault {
        /// The condition the driver reported.
        reason: String,
    },
}

impl RenderAudioError {
    /// Creates a device-not-found error for the given identifier.
    pub fn device_not_found(id: impl Into<String>) -> Self {
        Self::DeviceNotFound { id: id.into() }
    }

    /// Creates an invalid-geometry error with the given reason.
    pub fn invalid_geometry(reason: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            reason: reason.into(),
        }
    }

    /// Creates a driver-fault error with the given reason.
    pub fn driver_fault(reason: impl Into<String>) -> Self {
        Self::DriverFault {
            reason: reason.into(),
        }
    }
}

/// Errors that can occur within an [`OutputDriver`](crate::OutputDriver)
/// implementation.
///
/// Driver errors are the boundary type backends return from capability and
/// control calls; negotiation wraps them into [`RenderAudioError`].
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// The driver does not support the requested stream mode.
    #[error("stream mode not supported: {mode}")]
    ModeNotSupported {
        /// The rejected mode.
        mode: StreamMode,
    },

    /// A capability query the driver is expected to answer failed.
    #[error("query failed: {what}")]
    QueryFailed {
        /// Which query failed.
        what: String,
    },

    /// The driver rejected buffer creation for the requested geometry.
    #[error("buffer creation failed: {reason}")]
    BufferCreationFailed {
        /// Why the buffers could not be created.
        reason: String,
    },

    /// The driver failed to start or stop its clock.
    #[error("clock control failed: {reason}")]
    ClockFailed {
        /// Why the clock request failed.
        reason: String,
    },

    /// Custom error from the underlying device API.
    #[error("backend error: {0}")]
    Backend(String),
}

impl DriverError {
    /// Creates a query-failed error naming the failing query.
    pub fn query_failed(what: impl Into<String>) -> Self {
        Self::QueryFailed { what: what.into() }
    }

    /// Creates a buffer-creation error with the given reason.
    pub fn buffer_creation_failed(reason: impl Into<String>) -> Self {
        Self::BufferCreationFailed {
            reason: reason.into(),
        }
    }

    /// Creates a clock-control error with the given reason.
    pub fn clock_failed(reason: impl Into<String>) -> Self {
        Self::ClockFailed {
            reason: reason.into(),
        }
    }

    /// Creates a backend error with the given message.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}
