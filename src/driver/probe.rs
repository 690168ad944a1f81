//! Transient device capability probing.

use crate::error::DriverError;
use crate::format::{ChannelLayout, SampleFormat, StreamMode, MAX_OUTPUT_CHANNELS};

use super::{DeviceDesc, DeviceId, DriverHost, OutputDriver};

/// Capabilities of one output device, as gathered by [`enumerate_devices`].
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    /// Identifier to open the device with.
    pub id: DeviceId,
    /// Human-readable device name.
    pub name: String,
    /// Channel layout the device supports, clamped to stereo at minimum.
    pub channels: ChannelLayout,
    /// Sample rates the device accepted, PCM rates first, density after.
    pub sample_rates: Vec<u32>,
    /// Host representations implied by the device's native sample types.
    pub host_formats: Vec<SampleFormat>,
}

/// Probes every discoverable device for channels, rates, and formats.
///
/// Each candidate driver is opened transiently and queried the same way
/// negotiation would. PCM rates come from the 44100- and 48000-rooted
/// octave ladders; if the device accepts a switch to density mode, the 64x
/// ladders are probed in that mode, the native type is re-queried there,
/// and the device is switched back to PCM before release. A device that
/// fails to open or to answer a query is skipped with a warning rather
/// than failing the whole enumeration.
pub fn enumerate_devices(host: &dyn DriverHost) -> Vec<DeviceInfo> {
    let mut infos = Vec::new();
    for desc in host.devices() {
        match host.open(&desc.id) {
            Ok(driver) => match probe_device(&desc, driver) {
                Ok(info) => {
                    tracing::debug!(
                        device = %info.id,
                        rates = info.sample_rates.len(),
                        formats = info.host_formats.len(),
                        "probed device"
                    );
                    infos.push(info);
                }
                Err(err) => {
                    tracing::warn!(device = %desc.id, "skipping device, probe failed: {err}");
                }
            },
            Err(err) => {
                tracing::warn!(device = %desc.id, "skipping device, open failed: {err}");
            }
        }
    }
    infos
}

fn probe_device(
    desc: &DeviceDesc,
    mut driver: Box<dyn OutputDriver>,
) -> Result<DeviceInfo, DriverError> {
    let reported = driver.output_channels()?;
    let channels = ChannelLayout::with_count(reported.clamp(2, MAX_OUTPUT_CHANNELS));

    let mut sample_rates = Vec::new();
    for octave in 0..5 {
        for root in [44_100u32, 48_000] {
            let rate = root << octave;
            if driver.supports_sample_rate(rate) {
                sample_rates.push(rate);
            }
        }
    }

    let mut host_formats = Vec::new();
    host_formats.push(driver.native_sample_type()?.host_equivalent());

    if driver.set_stream_mode(StreamMode::Dsd).is_ok() {
        for octave in 0..5 {
            for root in [64 * 44_100u32, 64 * 48_000] {
                let rate = root << octave;
                if driver.supports_sample_rate(rate) {
                    sample_rates.push(rate);
                }
            }
        }
        if let Ok(native) = driver.native_sample_type() {
            let format = native.host_equivalent();
            if !host_formats.contains(&format) {
                host_formats.push(format);
            }
        }
        if !host_formats.contains(&SampleFormat::U8) {
            host_formats.push(SampleFormat::U8);
        }
        if let Err(err) = driver.set_stream_mode(StreamMode::Pcm) {
            tracing::warn!(device = %desc.id, "could not switch device back to pcm: {err}");
        }
    }

    Ok(DeviceInfo {
        id: desc.id.clone(),
        name: desc.name.clone(),
        channels,
        sample_rates,
        host_formats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{MockDeviceConfig, MockHost};
    use crate::native::NativeSampleType;

    #[test]
    fn test_enumerate_reports_pcm_capabilities() {
        let mut host = MockHost::new();
        host.add("pcm", "Plain PCM", MockDeviceConfig::default());

        let infos = enumerate_devices(&host);
        assert_eq!(infos.len(), 1);

        let info = &infos[0];
        assert_eq!(info.name, "Plain PCM");
        assert_eq!(info.channels.count(), 2);
        assert_eq!(
            info.sample_rates,
            vec![44_100, 48_000, 88_200, 96_000, 176_400, 192_000]
        );
        assert_eq!(info.host_formats, vec![SampleFormat::S16Be]);
    }

    #[test]
    fn test_enumerate_probes_density_mode_and_restores_pcm() {
        let mut host = MockHost::new();
        let driver = host.add("dsd", "Density Device", MockDeviceConfig::dsd_capable());

        let infos = enumerate_devices(&host);
        assert_eq!(infos.len(), 1);

        let info = &infos[0];
        assert!(info.sample_rates.contains(&2_822_400));
        assert!(info.sample_rates.contains(&5_644_800));
        assert!(info.host_formats.contains(&SampleFormat::U8));
        assert_eq!(driver.stream_mode(), StreamMode::Pcm);
    }

    #[test]
    fn test_enumerate_clamps_channel_count() {
        let mut host = MockHost::new();
        host.add(
            "mono",
            "Mono Device",
            MockDeviceConfig {
                channels: 1,
                ..MockDeviceConfig::default()
            },
        );
        host.add(
            "wide",
            "Wide Device",
            MockDeviceConfig {
                channels: 16,
                ..MockDeviceConfig::default()
            },
        );

        let infos = enumerate_devices(&host);
        assert_eq!(infos[0].channels.count(), 2);
        assert_eq!(infos[1].channels.count(), 8);
    }

    #[test]
    fn test_enumerate_skips_failing_device() {
        let mut host = MockHost::new();
        host.add(
            "broken",
            "Broken Device",
            MockDeviceConfig {
                fail_channel_query: true,
                ..MockDeviceConfig::default()
            },
        );
        host.add("ok", "Working Device", MockDeviceConfig::default());

        let infos = enumerate_devices(&host);
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].name, "Working Device");
    }

    #[test]
    fn test_density_native_adds_its_host_format() {
        let mut host = MockHost::new();
        host.add(
            "dsd8",
            "Byte Expanded",
            MockDeviceConfig {
                dsd_native: Some(NativeSampleType::Dsd8),
                dsd_rates: vec![2_822_400],
                ..MockDeviceConfig::default()
            },
        );

        let infos = enumerate_devices(&host);
        // S16BE from pcm mode, U8 once from the density probe.
        assert_eq!(
            infos[0].host_formats,
            vec![SampleFormat::S16Be, SampleFormat::U8]
        );
    }
}
