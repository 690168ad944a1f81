//! Host to native sample transcoding.
//!
//! A [`ConvertFn`] maps exactly one host-format sample to one native-format
//! sample. The rule for a (host, native) pair is resolved once per session
//! through [`conversion_rule`]; the hot path then applies the resolved rule
//! per sample with no further dispatch. Pairs without an entry are rejected
//! at negotiation time, so the streaming path never meets an unmapped pair.

use crate::format::SampleFormat;
use crate::native::NativeSampleType;

/// One-sample conversion: host bytes in, native bytes out.
///
/// `src` holds exactly one host-format sample in process byte order; `dst`
/// holds exactly one native-format sample slot. Rules are plain functions so
/// the render producer can store one per session without boxing.
pub type ConvertFn = fn(&[u8], &mut [u8]);

/// Looks up the conversion rule for a host/native pairing.
///
/// Integer targets scale by 2^(bits-1), round ties away from zero, and clamp
/// to the signed range. Float targets re-lay the value in the native byte
/// order, widening or narrowing as needed. Unsigned 8-bit hosts pass through
/// to density natives unchanged. Returns `None` for every other pairing.
#[must_use]
pub fn conversion_rule(host: SampleFormat, native: NativeSampleType) -> Option<ConvertFn> {
    match host {
        SampleFormat::F32 => float32_rule(native),
        SampleFormat::F64 => float64_rule(native),
        SampleFormat::U8 => density_rule(native),
        _ => None,
    }
}

/// Converts one plane's worth of interleaved host samples into a contiguous
/// native-format run.
///
/// Reads every `channels`-th sample starting at `channel` from `src` and
/// writes `dst.len() / native_sample_size` converted samples front to back.
/// The run is laid out for direct staging-queue insertion.
pub fn convert_plane(
    rule: ConvertFn,
    src: &[u8],
    channel: usize,
    channels: usize,
    host_sample_size: usize,
    native_sample_size: usize,
    dst: &mut [u8],
) {
    let frames = dst.len() / native_sample_size;
    for frame in 0..frames {
        let src_at = (frame * channels + channel) * host_sample_size;
        let dst_at = frame * native_sample_size;
        rule(
            &src[src_at..src_at + host_sample_size],
            &mut dst[dst_at..dst_at + native_sample_size],
        );
    }
}

fn float32_rule(native: NativeSampleType) -> Option<ConvertFn> {
    use NativeSampleType as N;
    let rule: ConvertFn = match native {
        N::Int16Msb => f32_to_i16_msb,
        N::Int16Lsb => f32_to_i16_lsb,
        N::Int24Msb => f32_to_i24_msb,
        N::Int24Lsb => f32_to_i24_lsb,
        N::Int32Msb | N::Int32Msb16 | N::Int32Msb18 | N::Int32Msb20 | N::Int32Msb24 => {
            f32_to_i32_msb
        }
        N::Int32Lsb | N::Int32Lsb16 | N::Int32Lsb18 | N::Int32Lsb20 | N::Int32Lsb24 => {
            f32_to_i32_lsb
        }
        N::Float32Msb => f32_to_f32_msb,
        N::Float32Lsb => f32_to_f32_lsb,
        N::Float64Msb => f32_to_f64_msb,
        N::Float64Lsb => f32_to_f64_lsb,
        N::Dsd1Msb | N::Dsd1Lsb | N::Dsd8 => return None,
    };
    Some(rule)
}

fn float64_rule(native: NativeSampleType) -> Option<ConvertFn> {
    use NativeSampleType as N;
    let rule: ConvertFn = match native {
        N::Int16Msb => f64_to_i16_msb,
        N::Int16Lsb => f64_to_i16_lsb,
        N::Int24Msb => f64_to_i24_msb,
        N::Int24Lsb => f64_to_i24_lsb,
        N::Int32Msb | N::Int32Msb16 | N::Int32Msb18 | N::Int32Msb20 | N::Int32Msb24 => {
            f64_to_i32_msb
        }
        N::Int32Lsb | N::Int32Lsb16 | N::Int32Lsb18 | N::Int32Lsb20 | N::Int32Lsb24 => {
            f64_to_i32_lsb
        }
        N::Float32Msb => f64_to_f32_msb,
        N::Float32Lsb => f64_to_f32_lsb,
        N::Float64Msb => f64_to_f64_msb,
        N::Float64Lsb => f64_to_f64_lsb,
        N::Dsd1Msb | N::Dsd1Lsb | N::Dsd8 => return None,
    };
    Some(rule)
}

fn density_rule(native: NativeSampleType) -> Option<ConvertFn> {
    use NativeSampleType as N;
    let rule: ConvertFn = match native {
        N::Dsd1Msb | N::Dsd1Lsb | N::Dsd8 => u8_passthrough,
        _ => return None,
    };
    Some(rule)
}

/// Scales to 16-bit full range, rounding ties away from zero.
///
/// -1.0 maps to -32768 and +1.0 clamps to 32767, matching what hardware
/// drivers expect for full-scale integer material.
#[inline]
fn real_to_i16(value: f64) -> i16 {
    (value * 32768.0).round().clamp(-32768.0, 32767.0) as i16
}

/// Scales to 32-bit full range, rounding ties away from zero.
#[inline]
fn real_to_i32(value: f64) -> i32 {
    (value * 2_147_483_648.0)
        .round()
        .clamp(-2_147_483_648.0, 2_147_483_647.0) as i32
}

#[inline]
fn host_f32(src: &[u8]) -> f64 {
    f64::from(f32::from_ne_bytes([src[0], src[1], src[2], src[3]]))
}

#[inline]
fn host_f64(src: &[u8]) -> f64 {
    f64::from_ne_bytes([
        src[0], src[1], src[2], src[3], src[4], src[5], src[6], src[7],
    ])
}

// 24-bit targets keep the top three bytes of the 32-bit scaled value; the
// low byte is dropped.

#[inline]
fn write_i24_msb(value: i32, dst: &mut [u8]) {
    let b = value.to_le_bytes();
    dst[0] = b[3];
    dst[1] = b[2];
    dst[2] = b[1];
}

#[inline]
fn write_i24_lsb(value: i32, dst: &mut [u8]) {
    let b = value.to_le_bytes();
    dst[0] = b[1];
    dst[1] = b[2];
    dst[2] = b[3];
}

fn f32_to_i16_msb(src: &[u8], dst: &mut [u8]) {
    dst[..2].copy_from_slice(&real_to_i16(host_f32(src)).to_be_bytes());
}

fn f32_to_i16_lsb(src: &[u8], dst: &mut [u8]) {
    dst[..2].copy_from_slice(&real_to_i16(host_f32(src)).to_le_bytes());
}

fn f32_to_i24_msb(src: &[u8], dst: &mut [u8]) {
    write_i24_msb(real_to_i32(host_f32(src)), dst);
}

fn f32_to_i24_lsb(src: &[u8], dst: &mut [u8]) {
    write_i24_lsb(real_to_i32(host_f32(src)), dst);
}

fn f32_to_i32_msb(src: &[u8], dst: &mut [u8]) {
    dst[..4].copy_from_slice(&real_to_i32(host_f32(src)).to_be_bytes());
}

fn f32_to_i32_lsb(src: &[u8], dst: &mut [u8]) {
    dst[..4].copy_from_slice(&real_to_i32(host_f32(src)).to_le_bytes());
}

fn f32_to_f32_msb(src: &[u8], dst: &mut [u8]) {
    let value = host_f32(src) as f32;
    dst[..4].copy_from_slice(&value.to_be_bytes());
}

fn f32_to_f32_lsb(src: &[u8], dst: &mut [u8]) {
    let value = host_f32(src) as f32;
    dst[..4].copy_from_slice(&value.to_le_bytes());
}

fn f32_to_f64_msb(src: &[u8], dst: &mut [u8]) {
    dst[..8].copy_from_slice(&host_f32(src).to_be_bytes());
}

fn f32_to_f64_lsb(src: &[u8], dst: &mut [u8]) {
    dst[..8].copy_from_slice(&host_f32(src).to_le_bytes());
}

fn f64_to_i16_msb(src: &[u8], dst: &mut [u8]) {
    dst[..2].copy_from_slice(&real_to_i16(host_f64(src)).to_be_bytes());
}

fn f64_to_i16_lsb(src: &[u8], dst: &mut [u8]) {
    dst[..2].copy_from_slice(&real_to_i16(host_f64(src)).to_le_bytes());
}

fn f64_to_i24_msb(src: &[u8], dst: &mut [u8]) {
    write_i24_msb(real_to_i32(host_f64(src)), dst);
}

fn f64_to_i24_lsb(src: &[u8], dst: &mut [u8]) {
    write_i24_lsb(real_to_i32(host_f64(src)), dst);
}

fn f64_to_i32_msb(src: &[u8], dst: &mut [u8]) {
    dst[..4].copy_from_slice(&real_to_i32(host_f64(src)).to_be_bytes());
}

fn f64_to_i32_lsb(src: &[u8], dst: &mut [u8]) {
    dst[..4].copy_from_slice(&real_to_i32(host_f64(src)).to_le_bytes());
}

fn f64_to_f32_msb(src: &[u8], dst: &mut [u8]) {
    let value = host_f64(src) as f32;
    dst[..4].copy_from_slice(&value.to_be_bytes());
}

fn f64_to_f32_lsb(src: &[u8], dst: &mut [u8]) {
    let value = host_f64(src) as f32;
    dst[..4].copy_from_slice(&value.to_le_bytes());
}

fn f64_to_f64_msb(src: &[u8], dst: &mut [u8]) {
    dst[..8].copy_from_slice(&host_f64(src).to_be_bytes());
}

fn f64_to_f64_lsb(src: &[u8], dst: &mut [u8]) {
    dst[..8].copy_from_slice(&host_f64(src).to_le_bytes());
}

fn u8_passthrough(src: &[u8], dst: &mut [u8]) {
    dst[0] = src[0];
}
