//! Driver-native sample type catalog.
//!
//! Output drivers report the layout of their hardware buffers as one of these
//! tags during negotiation. Everything the rest of the pipeline needs to know
//! about a tag lives here: bit width, byte size, closest host representation,
//! and the silence pattern to emit on underrun.

use std::fmt;

use crate::format::SampleFormat;

/// Sample rates at or above this threshold select density (DSD) streaming.
///
/// 2 822 400 Hz is DSD64, the lowest standard density rate.
pub const DSD_MIN_SAMPLE_RATE: u32 = 2_822_400;

/// Idle bit pattern for 1-bit density streams.
///
/// Density silence is an alternating bit pattern, not all-zero bits. The same
/// constant feeds both packed and byte-expanded silence fills so an underrun
/// transition stays inaudible.
pub const DSD_SILENCE_BYTE: u8 = 0x69;

/// Sample layout of a driver's hardware buffers.
///
/// Reported by [`OutputDriver::native_sample_type`] during negotiation and
/// fixed for the session's lifetime. The 32-bit container variants carry
/// 16/18/20/24 significant bits but occupy a full 32-bit slot; drivers expect
/// them filled exactly like the full-width types of the same byte order.
///
/// [`OutputDriver::native_sample_type`]: crate::driver::OutputDriver::native_sample_type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeSampleType {
    /// 16-bit signed integer, most significant byte first.
    Int16Msb,
    /// 24-bit signed integer packed in 3 bytes, most significant byte first.
    Int24Msb,
    /// 32-bit signed integer, most significant byte first.
    Int32Msb,
    /// IEEE float32, most significant byte first.
    Float32Msb,
    /// IEEE float64, most significant byte first.
    Float64Msb,
    /// 32-bit container with 16 significant bits, most significant byte first.
    Int32Msb16,
    /// 32-bit container with 18 significant bits, most significant byte first.
    Int32Msb18,
    /// 32-bit container with 20 significant bits, most significant byte first.
    Int32Msb20,
    /// 32-bit container with 24 significant bits, most significant byte first.
    Int32Msb24,
    /// 16-bit signed integer, least significant byte first.
    Int16Lsb,
    /// 24-bit signed integer packed in 3 bytes, least significant byte first.
    Int24Lsb,
    /// 32-bit signed integer, least significant byte first.
    Int32Lsb,
    /// IEEE float32, least significant byte first.
    Float32Lsb,
    /// IEEE float64, least significant byte first.
    Float64Lsb,
    /// 32-bit container with 16 significant bits, least significant byte first.
    Int32Lsb16,
    /// 32-bit container with 18 significant bits, least significant byte first.
    Int32Lsb18,
    /// 32-bit container with 20 significant bits, least significant byte first.
    Int32Lsb20,
    /// 32-bit container with 24 significant bits, least significant byte first.
    Int32Lsb24,
    /// 1-bit density stream packed 8 bits per byte, most significant bit first.
    Dsd1Msb,
    /// 1-bit density stream packed 8 bits per byte, least significant bit first.
    Dsd1Lsb,
    /// 1-bit density stream expanded to one bit per byte.
    Dsd8,
}

impl NativeSampleType {
    /// Bit width of one sample as the driver counts it.
    #[must_use]
    pub fn bits(&self) -> u32 {
        match self {
            Self::Dsd1Msb | Self::Dsd1Lsb => 1,
            Self::Dsd8 => 8,
            Self::Int16Msb | Self::Int16Lsb => 16,
            Self::Int24Msb | Self::Int24Lsb => 24,
            Self::Int32Msb
            | Self::Int32Msb16
            | Self::Int32Msb18
            | Self::Int32Msb20
            | Self::Int32Msb24
            | Self::Int32Lsb
            | Self::Int32Lsb16
            | Self::Int32Lsb18
            | Self::Int32Lsb20
            | Self::Int32Lsb24
            | Self::Float32Msb
            | Self::Float32Lsb => 32,
            Self::Float64Msb | Self::Float64Lsb => 64,
        }
    }

    /// Bytes occupied by one sample in a hardware buffer, bit width rounded
    /// up to whole bytes.
    #[must_use]
    pub fn byte_size(&self) -> usize {
        self.bits().div_ceil(8) as usize
    }

    /// Whether this is a 1-bit density stream type.
    #[must_use]
    pub fn is_dsd(&self) -> bool {
        matches!(self, Self::Dsd1Msb | Self::Dsd1Lsb | Self::Dsd8)
    }

    /// The host representation this native type implies for enumeration.
    ///
    /// The 32-bit container variants all report as full 32-bit in their byte
    /// order; density types report as unsigned 8-bit (the producer delivers
    /// the bitstream pre-packed).
    #[must_use]
    pub fn host_equivalent(&self) -> SampleFormat {
        match self {
            Self::Int16Msb => SampleFormat::S16Be,
            Self::Int16Lsb => SampleFormat::S16Le,
            Self::Int24Msb => SampleFormat::S24Be,
            Self::Int24Lsb => SampleFormat::S24Le,
            Self::Int32Msb
            | Self::Int32Msb16
            | Self::Int32Msb18
            | Self::Int32Msb20
            | Self::Int32Msb24 => SampleFormat::S32Be,
            Self::Int32Lsb
            | Self::Int32Lsb16
            | Self::Int32Lsb18
            | Self::Int32Lsb20
            | Self::Int32Lsb24 => SampleFormat::S32Le,
            Self::Float32Msb | Self::Float32Lsb => SampleFormat::F32,
            Self::Float64Msb | Self::Float64Lsb => SampleFormat::F64,
            Self::Dsd1Msb | Self::Dsd1Lsb | Self::Dsd8 => SampleFormat::U8,
        }
    }

    /// Fills `dst` with this type's silence pattern.
    ///
    /// Packed density types repeat [`DSD_SILENCE_BYTE`]; the byte-expanded
    /// density type emits that constant's bits most-significant-first, one
    /// bit per byte. Every other type is silent at all-zero bytes. `dst` is
    /// raw buffer bytes, not a sample count.
    pub fn fill_silence(&self, dst: &mut [u8]) {
        match self {
            Self::Dsd1Msb | Self::Dsd1Lsb => dst.fill(DSD_SILENCE_BYTE),
            Self::Dsd8 => {
                for (i, byte) in dst.iter_mut().enumerate() {
                    *byte = (DSD_SILENCE_BYTE >> (7 - i % 8)) & 1;
                }
            }
            _ => dst.fill(0),
        }
    }
}

impl fmt::Display for NativeSampleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Int16Msb => "int16 msb",
            Self::Int24Msb => "int24 msb",
            Self::Int32Msb => "int32 msb",
            Self::Float32Msb => "float32 msb",
            Self::Float64Msb => "float64 msb",
            Self::Int32Msb16 => "int32 msb16",
            Self::Int32Msb18 => "int32 msb18",
            Self::Int32Msb20 => "int32 msb20",
            Self::Int32Msb24 => "int32 msb24",
            Self::Int16Lsb => "int16 lsb",
            Self::Int24Lsb => "int24 lsb",
            Self::Int32Lsb => "int32 lsb",
            Self::Float32Lsb => "float32 lsb",
            Self::Float64Lsb => "float64 lsb",
            Self::Int32Lsb16 => "int32 lsb16",
            Self::Int32Lsb18 => "int32 lsb18",
            Self::Int32Lsb20 => "int32 lsb20",
            Self::Int32Lsb24 => "int32 lsb24",
            Self::Dsd1Msb => "dsd1 msb",
            Self::Dsd1Lsb => "dsd1 lsb",
            Self::Dsd8 => "dsd8",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_widths() {
        assert_eq!(NativeSampleType::Dsd1Msb.bits(), 1);
        assert_eq!(NativeSampleType::Dsd1Lsb.bits(), 1);
        assert_eq!(NativeSampleType::Dsd8.bits(), 8);
        assert_eq!(NativeSampleType::Int16Msb.bits(), 16);
        assert_eq!(NativeSampleType::Int24Lsb.bits(), 24);
        assert_eq!(NativeSampleType::Int32Msb.bits(), 32);
        assert_eq!(NativeSampleType::Int32Lsb20.bits(), 32);
        assert_eq!(NativeSampleType::Float32Lsb.bits(), 32);
        assert_eq!(NativeSampleType::Float64Msb.bits(), 64);
    }

    #[test]
    fn test_byte_size_rounds_up() {
        assert_eq!(NativeSampleType::Dsd1Msb.byte_size(), 1);
        assert_eq!(NativeSampleType::Dsd8.byte_size(), 1);
        assert_eq!(NativeSampleType::Int16Lsb.byte_size(), 2);
        assert_eq!(NativeSampleType::Int24Msb.byte_size(), 3);
        assert_eq!(NativeSampleType::Int32Msb16.byte_size(), 4);
        assert_eq!(NativeSampleType::Float64Lsb.byte_size(), 8);
    }

    #[test]
    fn test_density_detection() {
        assert!(NativeSampleType::Dsd1Msb.is_dsd());
        assert!(NativeSampleType::Dsd1Lsb.is_dsd());
        assert!(NativeSampleType::Dsd8.is_dsd());
        assert!(!NativeSampleType::Int32Lsb.is_dsd());
        assert!(!NativeSampleType::Float32Msb.is_dsd());
    }

    #[test]
    fn test_host_equivalents() {
        assert_eq!(
            NativeSampleType::Int16Msb.host_equivalent(),
            SampleFormat::S16Be
        );
        assert_eq!(
            NativeSampleType::Int24Lsb.host_equivalent(),
            SampleFormat::S24Le
        );
        assert_eq!(
            NativeSampleType::Int32Msb18.host_equivalent(),
            SampleFormat::S32Be
        );
        assert_eq!(
            NativeSampleType::Int32Lsb24.host_equivalent(),
            SampleFormat::S32Le
        );
        assert_eq!(
            NativeSampleType::Float32Msb.host_equivalent(),
            SampleFormat::F32
        );
        assert_eq!(
            NativeSampleType::Float64Lsb.host_equivalent(),
            SampleFormat::F64
        );
        assert_eq!(NativeSampleType::Dsd8.host_equivalent(), SampleFormat::U8);
    }

    #[test]
    fn test_pcm_silence_is_zero() {
        let mut buf = [0xffu8; 12];
        NativeSampleType::Int24Msb.fill_silence(&mut buf);
        assert_eq!(buf, [0u8; 12]);
    }

    #[test]
    fn test_packed_density_silence() {
        let mut buf = [0u8; 8];
        NativeSampleType::Dsd1Msb.fill_silence(&mut buf);
        assert_eq!(buf, [DSD_SILENCE_BYTE; 8]);

        NativeSampleType::Dsd1Lsb.fill_silence(&mut buf);
        assert_eq!(buf, [DSD_SILENCE_BYTE; 8]);
    }

    #[test]
    fn test_expanded_density_silence() {
        // 0x69 = 0b0110_1001, emitted msb first, one bit per byte.
        let mut buf = [0xffu8; 16];
        NativeSampleType::Dsd8.fill_silence(&mut buf);
        assert_eq!(
            &buf[..8],
            &[0, 1, 1, 0, 1, 0, 0, 1],
            "first pattern repetition"
        );
        assert_eq!(&buf[8..], &[0, 1, 1, 0, 1, 0, 0, 1], "pattern repeats");
    }

    #[test]
    fn test_display_names() {
        assert_eq!(NativeSampleType::Int16Msb.to_string(), "int16 msb");
        assert_eq!(NativeSampleType::Int32Lsb20.to_string(), "int32 lsb20");
        assert_eq!(NativeSampleType::Dsd8.to_string(), "dsd8");
    }
}
