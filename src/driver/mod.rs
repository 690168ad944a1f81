//! Output driver abstraction.
//!
//! This module is the boundary between the session and whatever device API
//! actually owns the hardware. A [`DriverHost`] discovers devices and opens
//! [`OutputDriver`]s; negotiation queries a driver's capabilities, hands it a
//! [`RenderHandler`], and starts its clock. From then on the driver calls
//! back with a [`BufferHalf`] to fill, once per double-buffer swap, on its
//! own real-time schedule.

#[cfg(feature = "cpal-backend")]
pub mod cpal_backend;
mod device_id;
mod mock;
mod probe;

#[cfg(feature = "cpal-backend")]
pub use cpal_backend::CpalHost;
pub use device_id::DeviceId;
pub use mock::{MockDeviceConfig, MockDriver, MockHost};
pub use probe::{enumerate_devices, DeviceInfo};

use std::fmt;

use crate::error::DriverError;
use crate::format::StreamMode;
use crate::native::NativeSampleType;

/// A discoverable output device as reported by a [`DriverHost`].
#[derive(Debug, Clone)]
pub struct DeviceDesc {
    /// Stable identifier used to open the device.
    pub id: DeviceId,
    /// Human-readable device name.
    pub name: String,
}

/// Which of the two alternating hardware buffer halves is being handed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalfIndex {
    /// The first half.
    A,
    /// The second half.
    B,
}

impl HalfIndex {
    /// The other half.
    #[must_use]
    pub fn flipped(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

/// Driver-owned memory the handler may fill during one callback.
///
/// Borrows the per-plane regions of the half being handed over. The borrow
/// ends with the callback, so the handler cannot retain the memory, and it
/// never allocates or frees it. All planes share one length.
pub struct BufferHalf<'a, 'b> {
    index: HalfIndex,
    planes: &'a mut [&'b mut [u8]],
}

impl<'a, 'b> BufferHalf<'a, 'b> {
    /// Wraps the plane regions of the half the driver wants filled.
    pub fn new(index: HalfIndex, planes: &'a mut [&'b mut [u8]]) -> Self {
        Self { index, planes }
    }

    /// Which half this is.
    #[must_use]
    pub fn index(&self) -> HalfIndex {
        self.index
    }

    /// Number of plane regions.
    #[must_use]
    pub fn plane_count(&self) -> usize {
        self.planes.len()
    }

    /// Bytes in one plane region.
    #[must_use]
    pub fn plane_len(&self) -> usize {
        self.planes.first().map_or(0, |plane| plane.len())
    }

    /// Mutable access to one plane's region.
    pub fn plane_mut(&mut self, plane: usize) -> Option<&mut [u8]> {
        self.planes.get_mut(plane).map(|plane| &mut **plane)
    }
}

/// Out-of-band conditions a driver reports on its message channel.
///
/// Delivered to [`RenderHandler::notice`] from driver context, outside the
/// render path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverNotice {
    /// The driver clock changed its sample rate.
    SampleRateChanged {
        /// The new rate in Hz.
        rate: u32,
    },
    /// The driver wants the session torn down and renegotiated.
    ResetRequested,
    /// The driver detected that callbacks are overrunning their time budget.
    Overload,
    /// The driver hit an internal failure.
    Fault,
}

impl fmt::Display for DriverNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SampleRateChanged { rate } => write!(f, "sample rate changed to {rate}Hz"),
            Self::ResetRequested => write!(f, "reset requested"),
            Self::Overload => write!(f, "overload"),
            Self::Fault => write!(f, "driver fault"),
        }
    }
}

/// The callback surface a driver invokes once its clock runs.
///
/// Handed over at [`OutputDriver::create_buffers`] and dropped with the
/// buffers. [`render`] runs at real-time priority and must not block,
/// allocate, or wait on the producer; [`notice`] arrives on an arbitrary
/// driver thread.
///
/// [`render`]: RenderHandler::render
/// [`notice`]: RenderHandler::notice
pub trait RenderHandler: Send {
    /// Fills one buffer half with audio or silence.
    fn render(&mut self, half: BufferHalf<'_, '_>);

    /// Receives an out-of-band driver notice.
    fn notice(&mut self, notice: DriverNotice);
}

/// Capability and control surface of one output device.
///
/// Negotiation and enumeration probing use the same calls in the same order:
/// stream mode, sample rate, channel count, preferred buffer length, native
/// sample type, then buffer creation and clock start. Implementations are
/// free to reject anything they cannot do with a [`DriverError`].
pub trait OutputDriver: Send {
    /// Switches between PCM and density streaming.
    ///
    /// Drivers without density support return
    /// [`DriverError::ModeNotSupported`] for [`StreamMode::Dsd`].
    fn set_stream_mode(&mut self, mode: StreamMode) -> Result<(), DriverError>;

    /// Whether the driver clock can run at `rate` in the current mode.
    fn supports_sample_rate(&self, rate: u32) -> bool;

    /// Sets the driver clock to `rate`.
    fn set_sample_rate(&mut self, rate: u32) -> Result<(), DriverError>;

    /// Number of output channels the device exposes in the current mode.
    fn output_channels(&self) -> Result<usize, DriverError>;

    /// The driver's preferred buffer half length, in frames.
    fn preferred_buffer_frames(&self) -> Result<usize, DriverError>;

    /// Native sample type of the output channels in the current mode.
    fn native_sample_type(&self) -> Result<NativeSampleType, DriverError>;

    /// Allocates the double buffers and installs the render handler.
    ///
    /// `planes` buffer regions of `frames` native samples each, times two
    /// halves. The handler starts receiving calls only after [`start`].
    ///
    /// [`start`]: OutputDriver::start
    fn create_buffers(
        &mut self,
        planes: usize,
        frames: usize,
        handler: Box<dyn RenderHandler>,
    ) -> Result<(), DriverError>;

    /// Starts the driver clock.
    fn start(&mut self) -> Result<(), DriverError>;

    /// Stops the driver clock. No render calls arrive after this returns.
    fn stop(&mut self) -> Result<(), DriverError>;

    /// Releases the double buffers and drops the handler.
    ///
    /// Only valid with the clock stopped.
    fn dispose_buffers(&mut self) -> Result<(), DriverError>;
}

/// Discovery collaborator producing devices for negotiation and enumeration.
pub trait DriverHost {
    /// Descriptors for every discoverable output device.
    fn devices(&self) -> Vec<DeviceDesc>;

    /// Opens the driver behind `id`.
    fn open(&self, id: &DeviceId) -> Result<Box<dyn OutputDriver>, DriverError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_index_flips() {
        assert_eq!(HalfIndex::A.flipped(), HalfIndex::B);
        assert_eq!(HalfIndex::B.flipped(), HalfIndex::A);
        assert_eq!(HalfIndex::A.flipped().flipped(), HalfIndex::A);
    }

    #[test]
    fn test_buffer_half_plane_access() {
        let mut left = vec![0u8; 4];
        let mut right = vec![0u8; 4];
        let mut planes: Vec<&mut [u8]> = vec![&mut left, &mut right];

        let mut half = BufferHalf::new(HalfIndex::A, &mut planes);
        assert_eq!(half.index(), HalfIndex::A);
        assert_eq!(half.plane_count(), 2);
        assert_eq!(half.plane_len(), 4);

        half.plane_mut(1).unwrap()[0] = 7;
        assert!(half.plane_mut(2).is_none());

        drop(half);
        drop(planes);
        assert_eq!(right[0], 7);
        assert_eq!(left[0], 0);
    }

    #[test]
    fn test_driver_notice_display() {
        assert_eq!(
            DriverNotice::SampleRateChanged { rate: 44_100 }.to_string(),
            "sample rate changed to 44100Hz"
        );
        assert_eq!(DriverNotice::ResetRequested.to_string(), "reset requested");
        assert_eq!(DriverNotice::Overload.to_string(), "overload");
    }
}
