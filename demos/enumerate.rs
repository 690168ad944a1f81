//! Output device enumeration example.
//!
//! Probes every output device the system host exposes and prints its
//! channel layout, supported sample rates, and host-facing sample
//! formats. DSD-capable devices show their density rates as well.
//!
//! Run with: cargo run --example enumerate --features cpal-backend

use render_audio::{enumerate_devices, CpalHost};

fn main() {
    tracing_subscriber::fmt::init();

    let host = CpalHost::new();
    let devices = enumerate_devices(&host);

    if devices.is_empty() {
        eprintln!("No output devices found!");
        return;
    }

    println!("=== Output Devices ===\n");
    for info in &devices {
        println!("{} [{}]", info.name, info.id);
        println!("  channels: {} ({})", info.channels.count(), info.channels);

        let rates: Vec<String> = info.sample_rates.iter().map(u32::to_string).collect();
        println!("  rates:    {}", rates.join(", "));

        let formats: Vec<String> = info.host_formats.iter().map(ToString::to_string).collect();
        println!("  formats:  {}", formats.join(", "));
        println!();
    }
}
