//! Integration tests for render-audio.
//!
//! Every test drives the full negotiate/convert/stage/render pipeline
//! through [`MockHost`], so the suite runs without audio hardware.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use render_audio::{
    enumerate_devices, AudioFormat, ChannelLayout, DriverNotice, MockDeviceConfig, MockHost,
    RenderAudio, RenderAudioError, RenderEvent, SampleFormat, SessionState, StreamMode,
};

/// Interleaved stereo float32 frames with a fixed left/right value.
fn stereo_f32(left: f32, right: f32, frames: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(frames * 8);
    for _ in 0..frames {
        data.extend_from_slice(&left.to_ne_bytes());
        data.extend_from_slice(&right.to_ne_bytes());
    }
    data
}

/// Event recorder suitable for `on_event`.
fn recorder() -> (Arc<Mutex<Vec<RenderEvent>>>, impl Fn(RenderEvent)) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    (events, move |event| sink.lock().unwrap().push(event))
}

#[test]
fn test_pcm_pipeline_end_to_end() {
    // Default mock device: stereo, Int16Msb native, 512-frame halves.
    let mut host = MockHost::new();
    let driver = host.add("mock-0", "Mock Output", MockDeviceConfig::default());

    let mut session = RenderAudio::builder()
        .format(AudioFormat::pcm(48_000, ChannelLayout::stereo(), SampleFormat::F32))
        .open(&host)
        .unwrap();

    // 48000 / 75 = 640 frames per quantum, 2ch * 4 bytes = 8 bytes per frame.
    assert_eq!(session.format().frames, 640);
    assert_eq!(session.format().frame_size, 8);
    assert_eq!(session.state(), SessionState::Streaming);
    assert_eq!(driver.sample_rate(), 48_000);
    assert_eq!(driver.buffer_frames(), Some(512));

    let data = stereo_f32(0.5, -0.5, 640);
    let accepted = session.add_packets(&data, 640, 0).unwrap();
    assert_eq!(accepted, 640);

    // 640 frames * 2 native bytes = 1280 bytes staged per plane.
    assert_eq!(
        session.delay(),
        Duration::from_secs_f64(1280.0 / 96_000.0)
    );

    driver.advance();

    // 0.5 scales to 16384 = 0x4000, -0.5 to -16384 = 0xC000, both big-endian.
    assert_eq!(driver.last_rendered(0), [0x40, 0x00].repeat(512));
    assert_eq!(driver.last_rendered(1), [0xC0, 0x00].repeat(512));

    let stats = session.stats();
    assert_eq!(stats.frames_accepted, 640);
    assert_eq!(stats.halves_rendered, 1);
    assert_eq!(stats.silent_halves, 0);

    // One half consumed 1024 bytes per plane, 256 remain.
    assert_eq!(session.delay(), Duration::from_secs_f64(256.0 / 96_000.0));
    assert_eq!(session.cache_total(), Duration::from_secs(3));
}

#[test]
fn test_halves_render_in_fifo_order() {
    let mut host = MockHost::new();
    let driver = host.add("mock-0", "Mock Output", MockDeviceConfig::default());

    let mut session = RenderAudio::builder()
        .format(AudioFormat::pcm(48_000, ChannelLayout::stereo(), SampleFormat::F32))
        .open(&host)
        .unwrap();

    // Two halves worth of frames with distinct values per half.
    let mut data = stereo_f32(0.25, 0.25, 512);
    data.extend_from_slice(&stereo_f32(0.125, 0.125, 512));
    assert_eq!(session.add_packets(&data, 1024, 0).unwrap(), 1024);

    driver.advance();
    assert_eq!(driver.last_rendered(0), [0x20, 0x00].repeat(512));

    driver.advance();
    assert_eq!(driver.last_rendered(0), [0x10, 0x00].repeat(512));

    assert_eq!(session.delay(), Duration::ZERO);
    assert_eq!(session.stats().halves_rendered, 2);
}

#[test]
fn test_underrun_renders_silence_and_reports_edges() {
    let mut host = MockHost::new();
    let driver = host.add("mock-0", "Mock Output", MockDeviceConfig::default());
    let (events, on_event) = recorder();

    let mut session = RenderAudio::builder()
        .format(AudioFormat::pcm(48_000, ChannelLayout::stereo(), SampleFormat::F32))
        .on_event(on_event)
        .open(&host)
        .unwrap();

    // Nothing staged: both callbacks must fall back to full-half silence.
    driver.advance();
    driver.advance();
    assert_eq!(driver.last_rendered(0), vec![0u8; 1024]);
    assert_eq!(driver.last_rendered(1), vec![0u8; 1024]);

    // Exactly one half of audio ends the streak.
    let data = stereo_f32(1.0, 1.0, 512);
    session.add_packets(&data, 512, 0).unwrap();
    driver.advance();
    assert_eq!(driver.last_rendered(0), [0x7F, 0xFF].repeat(512));

    let stats = session.stats();
    assert_eq!(stats.underruns, 1);
    assert_eq!(stats.silent_halves, 2);
    assert_eq!(stats.halves_rendered, 1);

    assert_eq!(
        *events.lock().unwrap(),
        vec![
            RenderEvent::UnderrunStarted {
                buffered_bytes: 0,
                needed_bytes: 1024,
            },
            RenderEvent::Recovered { silent_halves: 2 },
        ]
    );
}

#[test]
fn test_short_queue_is_held_back_not_partially_rendered() {
    let mut host = MockHost::new();
    let driver = host.add("mock-0", "Mock Output", MockDeviceConfig::default());

    let mut session = RenderAudio::builder()
        .format(AudioFormat::pcm(48_000, ChannelLayout::stereo(), SampleFormat::F32))
        .open(&host)
        .unwrap();

    // 100 frames = 200 bytes per plane, well short of the 1024-byte half.
    session.add_packets(&stereo_f32(0.5, 0.5, 100), 100, 0).unwrap();
    driver.advance();
    assert_eq!(driver.last_rendered(0), vec![0u8; 1024]);

    // The short queue is untouched; topping it up renders it intact.
    assert_eq!(session.delay(), Duration::from_secs_f64(200.0 / 96_000.0));
    session.add_packets(&stereo_f32(0.5, 0.5, 412), 412, 0).unwrap();
    driver.advance();
    assert_eq!(driver.last_rendered(0), [0x40, 0x00].repeat(512));
}

#[test]
fn test_dsd_pipeline_end_to_end() {
    let mut host = MockHost::new();
    let driver = host.add("mock-dsd", "Mock DSD", MockDeviceConfig::dsd_capable());

    let mut session = RenderAudio::builder()
        .format(AudioFormat::dsd(2_822_400, ChannelLayout::stereo()))
        .open(&host)
        .unwrap();

    // 2822400 / 8 / 75 = 4704 frames per quantum, 2ch * 1 byte per frame.
    assert_eq!(session.format().frames, 4704);
    assert_eq!(session.format().frame_size, 2);
    assert_eq!(driver.stream_mode(), StreamMode::Dsd);

    // DSD silence is the 0x69 density pattern, not zeros.
    driver.advance();
    assert_eq!(driver.last_rendered(0), vec![0x69u8; 512]);
    assert_eq!(driver.last_rendered(1), vec![0x69u8; 512]);

    // Density bytes pass through untouched, split by channel.
    let mut data = Vec::with_capacity(4704 * 2);
    for _ in 0..4704 {
        data.push(0xAA);
        data.push(0x55);
    }
    assert_eq!(session.add_packets(&data, 4704, 0).unwrap(), 4704);

    driver.advance();
    assert_eq!(driver.last_rendered(0), vec![0xAAu8; 512]);
    assert_eq!(driver.last_rendered(1), vec![0x55u8; 512]);

    assert_eq!(session.cache_total(), Duration::from_secs(3));
}

#[test]
fn test_extra_device_planes_get_silence() {
    let mut host = MockHost::new();
    let config = MockDeviceConfig {
        channels: 4,
        ..MockDeviceConfig::default()
    };
    let driver = host.add("mock-quad", "Mock Quad", config);

    let mut session = RenderAudio::builder()
        .format(AudioFormat::pcm(48_000, ChannelLayout::stereo(), SampleFormat::F32))
        .open(&host)
        .unwrap();

    // The stream keeps the caller's stereo layout but feeds all four planes.
    assert_eq!(session.format().frame_size, 8);
    assert_eq!(driver.buffer_planes(), Some(4));

    session.add_packets(&stereo_f32(0.5, -0.5, 640), 640, 0).unwrap();
    driver.advance();

    assert_eq!(driver.last_rendered(0), [0x40, 0x00].repeat(512));
    assert_eq!(driver.last_rendered(1), [0xC0, 0x00].repeat(512));
    assert_eq!(driver.last_rendered(2), vec![0u8; 1024]);
    assert_eq!(driver.last_rendered(3), vec![0u8; 1024]);
}

#[test]
fn test_add_packets_honors_frame_offset() {
    let mut host = MockHost::new();
    host.add("mock-0", "Mock Output", MockDeviceConfig::default());

    let mut session = RenderAudio::builder()
        .format(AudioFormat::pcm(48_000, ChannelLayout::stereo(), SampleFormat::F32))
        .open(&host)
        .unwrap();

    // Two garbage frames, then two real ones selected by offset.
    let mut data = stereo_f32(9.0, 9.0, 2);
    data.extend_from_slice(&stereo_f32(0.5, -0.5, 2));
    let accepted = session.add_packets(&data, 2, 2).unwrap();
    assert_eq!(accepted, 2);

    // 2 frames * 2 native bytes staged per plane.
    assert_eq!(session.delay(), Duration::from_secs_f64(4.0 / 96_000.0));
}

#[test]
fn test_add_packets_is_bounded_by_staging_capacity() {
    let mut host = MockHost::new();
    host.add("mock-0", "Mock Output", MockDeviceConfig::default());

    let mut session = RenderAudio::builder()
        .format(AudioFormat::pcm(48_000, ChannelLayout::stereo(), SampleFormat::F32))
        .open(&host)
        .unwrap();

    // Capacity is 3s: 288000 bytes per plane / 2 bytes = 144000 frames.
    let data = vec![0u8; 150_000 * 8];
    let accepted = session.add_packets(&data, 150_000, 0).unwrap();
    assert_eq!(accepted, 144_000);

    // A full queue accepts nothing further without blocking.
    assert_eq!(session.add_packets(&data, 150_000, 0).unwrap(), 0);
    assert_eq!(session.cache_total(), Duration::from_secs(3));
    assert_eq!(session.delay(), Duration::from_secs(3));
}

#[test]
fn test_delay_drains_to_zero() {
    let mut host = MockHost::new();
    let driver = host.add("mock-0", "Mock Output", MockDeviceConfig::default());

    let mut session = RenderAudio::builder()
        .format(AudioFormat::pcm(48_000, ChannelLayout::stereo(), SampleFormat::F32))
        .open(&host)
        .unwrap();

    session.add_packets(&stereo_f32(0.0, 0.0, 1024), 1024, 0).unwrap();

    let full = session.delay();
    driver.advance();
    let after_one = session.delay();
    driver.advance();
    let after_two = session.delay();

    assert!(full > after_one);
    assert!(after_one > after_two);
    assert_eq!(after_two, Duration::ZERO);
}

#[test]
fn test_stop_is_terminal_and_idempotent() {
    let mut host = MockHost::new();
    let driver = host.add("mock-0", "Mock Output", MockDeviceConfig::default());

    let mut session = RenderAudio::builder()
        .format(AudioFormat::pcm(48_000, ChannelLayout::stereo(), SampleFormat::F32))
        .open(&host)
        .unwrap();

    session.add_packets(&stereo_f32(0.5, 0.5, 640), 640, 0).unwrap();
    session.stop().unwrap();
    assert_eq!(session.state(), SessionState::Stopped);
    assert!(!driver.is_started());
    assert_eq!(driver.stop_count(), 1);

    // Stop leaves staged audio in place and further audio is refused.
    assert!(session.delay() > Duration::ZERO);
    assert_eq!(session.add_packets(&stereo_f32(0.5, 0.5, 10), 10, 0).unwrap(), 0);

    session.stop().unwrap();
    assert_eq!(driver.stop_count(), 1);
}

#[test]
fn test_drain_discards_remaining_delay() {
    let mut host = MockHost::new();
    let driver = host.add("mock-0", "Mock Output", MockDeviceConfig::default());

    let mut session = RenderAudio::builder()
        .format(AudioFormat::pcm(48_000, ChannelLayout::stereo(), SampleFormat::F32))
        .open(&host)
        .unwrap();

    session.add_packets(&stereo_f32(0.5, 0.5, 640), 640, 0).unwrap();
    session.drain().unwrap();

    assert_eq!(session.state(), SessionState::Stopped);
    assert!(!driver.is_started());
    assert_eq!(session.delay(), Duration::ZERO);
}

#[test]
fn test_dropping_session_disposes_driver_buffers() {
    let mut host = MockHost::new();
    let driver = host.add("mock-0", "Mock Output", MockDeviceConfig::default());

    let session = RenderAudio::builder()
        .format(AudioFormat::pcm(48_000, ChannelLayout::stereo(), SampleFormat::F32))
        .open(&host)
        .unwrap();
    assert!(driver.buffers_created());

    drop(session);
    assert!(!driver.is_started());
    assert!(!driver.buffers_created());
}

#[test]
fn test_fatal_notice_latches_the_session() {
    let mut host = MockHost::new();
    let driver = host.add("mock-0", "Mock Output", MockDeviceConfig::default());
    let (events, on_event) = recorder();

    let mut session = RenderAudio::builder()
        .format(AudioFormat::pcm(48_000, ChannelLayout::stereo(), SampleFormat::F32))
        .on_event(on_event)
        .open(&host)
        .unwrap();

    driver.notify(DriverNotice::Fault);

    let err = session.health().unwrap_err();
    assert!(matches!(err, RenderAudioError::DriverFault { .. }));
    let err = session.add_packets(&stereo_f32(0.5, 0.5, 10), 10, 0).unwrap_err();
    assert!(matches!(err, RenderAudioError::DriverFault { .. }));

    // Later notices do not overwrite the first latched fault.
    driver.notify(DriverNotice::Overload);
    let err = session.health().unwrap_err();
    assert_eq!(err.to_string(), "driver fault: driver fault");

    assert_eq!(
        *events.lock().unwrap(),
        vec![RenderEvent::FaultLatched {
            notice: DriverNotice::Fault,
        }]
    );
}

#[test]
fn test_sample_rate_change_is_informational() {
    let mut host = MockHost::new();
    let driver = host.add("mock-0", "Mock Output", MockDeviceConfig::default());
    let (events, on_event) = recorder();

    let mut session = RenderAudio::builder()
        .format(AudioFormat::pcm(48_000, ChannelLayout::stereo(), SampleFormat::F32))
        .on_event(on_event)
        .open(&host)
        .unwrap();

    driver.notify(DriverNotice::SampleRateChanged { rate: 96_000 });

    session.health().unwrap();
    assert_eq!(session.add_packets(&stereo_f32(0.5, 0.5, 10), 10, 0).unwrap(), 10);
    assert_eq!(session.stats().sample_rate_changes, 1);
    assert_eq!(
        *events.lock().unwrap(),
        vec![RenderEvent::SampleRateChanged { rate: 96_000 }]
    );
}

#[test]
fn test_enumeration_reports_pcm_and_dsd_capabilities() {
    let mut host = MockHost::new();
    host.add("pcm-0", "Plain PCM", MockDeviceConfig::default());
    let dsd = host.add("dsd-0", "DSD Capable", MockDeviceConfig::dsd_capable());
    let broken = MockDeviceConfig {
        fail_channel_query: true,
        ..MockDeviceConfig::default()
    };
    host.add("broken-0", "Broken", broken);

    let infos = enumerate_devices(&host);

    // The broken device is skipped, not fatal.
    assert_eq!(infos.len(), 2);

    let pcm = infos.iter().find(|info| info.id.as_str() == "pcm-0").unwrap();
    assert!(pcm.sample_rates.contains(&44_100));
    assert!(pcm.sample_rates.contains(&192_000));
    assert!(!pcm.sample_rates.contains(&2_822_400));
    assert!(pcm.host_formats.contains(&SampleFormat::S16Be));

    let info = infos.iter().find(|info| info.id.as_str() == "dsd-0").unwrap();
    assert!(info.sample_rates.contains(&2_822_400));
    assert!(info.sample_rates.contains(&5_644_800));
    assert!(info.host_formats.contains(&SampleFormat::U8));

    // Probing a DSD ladder must leave the device back in PCM mode.
    assert_eq!(dsd.stream_mode(), StreamMode::Pcm);
}
