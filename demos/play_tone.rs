//! Tone playback example.
//!
//! Renders a 440Hz sine wave through the default output device for three
//! seconds, reporting underruns as they happen.
//!
//! Run with: cargo run --example play_tone --features cpal-backend

use std::f32::consts::TAU;
use std::thread;
use std::time::Duration;

use render_audio::{
    AudioFormat, ChannelLayout, CpalHost, RenderAudio, RenderEvent, SampleFormat,
};

const RATE: u32 = 48_000;
const TONE_HZ: f32 = 440.0;
const SECONDS: usize = 3;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let host = CpalHost::new();
    let mut session = RenderAudio::builder()
        .format(AudioFormat::pcm(
            RATE,
            ChannelLayout::stereo(),
            SampleFormat::F32,
        ))
        .on_event(|event| match event {
            RenderEvent::UnderrunStarted {
                buffered_bytes,
                needed_bytes,
            } => {
                eprintln!("Underrun: {buffered_bytes} of {needed_bytes} bytes buffered");
            }
            RenderEvent::Recovered { silent_halves } => {
                eprintln!("Recovered after {silent_halves} silent halves");
            }
            _ => {}
        })
        .open(&host)?;

    let quantum = session.format().frames as usize;
    let frame_size = session.format().frame_size as usize;
    println!("Playing a {TONE_HZ}Hz tone for {SECONDS}s ({quantum} frames per packet)...");

    let mut packet = vec![0u8; quantum * frame_size];
    let step = TAU * TONE_HZ / RATE as f32;
    let mut phase = 0.0f32;
    let mut sent = 0usize;

    while sent < RATE as usize * SECONDS {
        // One quantum of stereo float32 at modest volume.
        for frame in packet.chunks_exact_mut(frame_size) {
            let sample = (phase.sin() * 0.2).to_ne_bytes();
            frame[..4].copy_from_slice(&sample);
            frame[4..].copy_from_slice(&sample);
            phase = (phase + step) % TAU;
        }

        // The queue is bounded, so resubmit whatever wasn't accepted.
        let mut offset = 0;
        while offset < quantum {
            let accepted = session.add_packets(&packet, quantum - offset, offset)?;
            if accepted == 0 {
                thread::sleep(Duration::from_millis(5));
                continue;
            }
            offset += accepted;
        }
        sent += quantum;
    }

    // Let the buffered tail play out before tearing down.
    thread::sleep(session.delay());
    session.stop()?;

    let stats = session.stats();
    println!("Done.");
    println!("  frames accepted: {}", stats.frames_accepted);
    println!("  halves rendered: {}", stats.halves_rendered);
    println!("  silent halves:   {}", stats.silent_halves);
    println!("  underruns:       {}", stats.underruns);

    Ok(())
}
