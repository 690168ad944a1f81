//! Audio format descriptions: host sample formats, channel layouts, and the
//! stream descriptor fixed by negotiation.

use std::fmt;

use crate::native::DSD_MIN_SAMPLE_RATE;

/// Maximum number of output channels (and therefore staging planes) a single
/// session will drive, regardless of how many the hardware exposes.
pub const MAX_OUTPUT_CHANNELS: usize = 8;

/// Sample representation delivered by the host pipeline.
///
/// Interleaved buffers handed to [`Session::add_packets`] carry samples in one
/// of these layouts. Integer formats name their byte order explicitly; the
/// float formats use the platform's natural byte order.
///
/// [`Session::add_packets`]: crate::Session::add_packets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    /// Unsigned 8-bit. Also carries packed DSD bitstreams
    /// (eight 1-bit samples per byte).
    U8,
    /// Signed 16-bit, little-endian.
    S16Le,
    /// Signed 16-bit, big-endian.
    S16Be,
    /// Signed 24-bit packed in three bytes, little-endian.
    S24Le,
    /// Signed 24-bit packed in three bytes, big-endian.
    S24Be,
    /// Signed 32-bit, little-endian.
    S32Le,
    /// Signed 32-bit, big-endian.
    S32Be,
    /// IEEE 754 single-precision float, platform byte order.
    F32,
    /// IEEE 754 double-precision float, platform byte order.
    F64,
}

impl SampleFormat {
    /// Bytes occupied by one sample of this format in a host buffer.
    #[must_use]
    pub fn byte_size(&self) -> usize {
        match self {
            Self::U8 => 1,
            Self::S16Le | Self::S16Be => 2,
            Self::S24Le | Self::S24Be => 3,
            Self::S32Le | Self::S32Be | Self::F32 => 4,
            Self::F64 => 8,
        }
    }

    /// Returns `true` for the floating-point representations.
    #[must_use]
    pub fn is_float(&self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::U8 => "u8",
            Self::S16Le => "s16le",
            Self::S16Be => "s16be",
            Self::S24Le => "s24le",
            Self::S24Be => "s24be",
            Self::S32Le => "s32le",
            Self::S32Be => "s32be",
            Self::F32 => "f32",
            Self::F64 => "f64",
        };
        write!(f, "{name}")
    }
}

/// Named speaker position within a [`ChannelLayout`].
///
/// Positions follow the conventional surround ordering (front pair, center,
/// LFE, back pair, side pair), which is also the order hardware planes are
/// assigned in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Front left.
    FrontLeft,
    /// Front right.
    FrontRight,
    /// Front center.
    FrontCenter,
    /// Low-frequency effects.
    LowFrequency,
    /// Back left.
    BackLeft,
    /// Back right.
    BackRight,
    /// Side left.
    SideLeft,
    /// Side right.
    SideRight,
}

impl Channel {
    /// The default position order used when building layouts by count.
    const DEFAULT_ORDER: [Channel; MAX_OUTPUT_CHANNELS] = [
        Channel::FrontLeft,
        Channel::FrontRight,
        Channel::FrontCenter,
        Channel::LowFrequency,
        Channel::BackLeft,
        Channel::BackRight,
        Channel::SideLeft,
        Channel::SideRight,
    ];

    /// Short label for logs and device listings.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::FrontLeft => "FL",
            Self::FrontRight => "FR",
            Self::FrontCenter => "FC",
            Self::LowFrequency => "LFE",
            Self::BackLeft => "BL",
            Self::BackRight => "BR",
            Self::SideLeft => "SL",
            Self::SideRight => "SR",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Ordered set of output channel positions.
///
/// The position at index `i` feeds hardware plane `i`. Layout length is
/// capped at [`MAX_OUTPUT_CHANNELS`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelLayout(Vec<Channel>);

impl ChannelLayout {
    /// Single-channel layout (front center).
    #[must_use]
    pub fn mono() -> Self {
        Self(vec![Channel::FrontCenter])
    }

    /// Two-channel layout (front left, front right).
    #[must_use]
    pub fn stereo() -> Self {
        Self(vec![Channel::FrontLeft, Channel::FrontRight])
    }

    /// Builds a layout of `count` channels in the default position order.
    ///
    /// `count` is clamped to `1..=MAX_OUTPUT_CHANNELS`.
    #[must_use]
    pub fn with_count(count: usize) -> Self {
        let count = count.clamp(1, MAX_OUTPUT_CHANNELS);
        Self(Channel::DEFAULT_ORDER[..count].to_vec())
    }

    /// Builds a layout from explicit positions, truncating past the cap.
    #[must_use]
    pub fn from_channels(channels: Vec<Channel>) -> Self {
        let mut channels = channels;
        channels.truncate(MAX_OUTPUT_CHANNELS);
        Self(channels)
    }

    /// Number of channels in the layout.
    #[must_use]
    pub fn count(&self) -> usize {
        self.0.len()
    }

    /// The ordered positions.
    #[must_use]
    pub fn channels(&self) -> &[Channel] {
        &self.0
    }
}

impl Default for ChannelLayout {
    fn default() -> Self {
        Self::stereo()
    }
}

impl fmt::Display for ChannelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, ch) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{ch}")?;
        }
        Ok(())
    }
}

/// Driver I/O mode selected during negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    /// Multi-bit PCM streaming.
    Pcm,
    /// 1-bit density streaming (Direct Stream Digital).
    Dsd,
}

impl fmt::Display for StreamMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pcm => write!(f, "pcm"),
            Self::Dsd => write!(f, "dsd"),
        }
    }
}

/// Stream descriptor: what the host delivers and, after negotiation, the
/// geometry the session settled on.
///
/// Construct one with [`AudioFormat::pcm`] or [`AudioFormat::dsd`] and pass
/// it to the builder. The derived fields (`frames`, `frame_size`) are zero
/// until negotiation fills them in; the negotiated copy is available from
/// [`Session::format`](crate::Session::format) and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFormat {
    /// Sample rate in Hz. For DSD this is the 1-bit sample rate
    /// (e.g. 2 822 400 for DSD64).
    pub sample_rate: u32,
    /// Output channel layout.
    pub channels: ChannelLayout,
    /// Host sample representation.
    pub sample_format: SampleFormat,
    /// Frames per processing quantum. Derived during negotiation.
    pub frames: u32,
    /// Bytes per multichannel frame in the host buffer. Derived during
    /// negotiation.
    pub frame_size: u32,
}

impl AudioFormat {
    /// Describes a PCM stream.
    #[must_use]
    pub fn pcm(sample_rate: u32, channels: ChannelLayout, sample_format: SampleFormat) -> Self {
        Self {
            sample_rate,
            channels,
            sample_format,
            frames: 0,
            frame_size: 0,
        }
    }

    /// Describes a DSD stream. The host representation is always [`SampleFormat::U8`]:
    /// the producer delivers the bitstream pre-packed, eight samples per byte.
    #[must_use]
    pub fn dsd(sample_rate: u32, channels: ChannelLayout) -> Self {
        Self {
            sample_rate,
            channels,
            sample_format: SampleFormat::U8,
            frames: 0,
            frame_size: 0,
        }
    }

    /// The driver I/O mode this format requires, keyed off the DSD rate
    /// threshold.
    #[must_use]
    pub fn stream_mode(&self) -> StreamMode {
        if self.sample_rate >= DSD_MIN_SAMPLE_RATE {
            StreamMode::Dsd
        } else {
            StreamMode::Pcm
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}Hz {}ch {}",
            self.sample_rate,
            self.channels.count(),
            self.sample_format
        )
    }
}
