//! Basic generator example.
//!
//! Instantiates the DRBG on this machine's telemetry, prints a few blocks
//! as hex and the same output as a bit string.
//!
//! Run: `cargo run --example basic`

use sm3drbg_core::{DrbgConfig, SourceKind, Sm3Drbg};

fn main() -> sm3drbg_core::Result<()> {
    let mut drbg = Sm3Drbg::init(DrbgConfig::default(), b"basic-example")?;

    let unavailable = drbg.entropy().sources().unavailable();
    if !unavailable.is_empty() {
        println!("Unavailable sources (zero-filled): {unavailable:?}");
    }

    for i in 0..4 {
        let block = drbg.generate(256, b"")?;
        print!("block {i}: ");
        for b in &block {
            print!("{b:02x}");
        }
        println!();
    }

    println!("bits: {}", drbg.generate_bits(b"")?);

    let disk = drbg.entropy().sources().state(SourceKind::Disk);
    println!(
        "\nPool: {}, {} updates, disk source read {} times ({} failures)",
        drbg.entropy().mode(),
        drbg.entropy().updates(),
        disk.samples,
        disk.failures
    );
    Ok(())
}
