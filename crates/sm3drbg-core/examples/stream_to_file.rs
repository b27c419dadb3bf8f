//! Stream generator output to a file.
//!
//! Writes 4096 bytes of 256-bit blocks to `drbg_output.bin`.
//!
//! Run: `cargo run --example stream_to_file`

use sm3drbg_core::{DrbgConfig, Sm3Drbg, write_sample_file};

fn main() -> sm3drbg_core::Result<()> {
    let output_path = "drbg_output.bin";
    let total_bits: u64 = 4096 * 8;

    let mut drbg = Sm3Drbg::init(DrbgConfig::default(), b"")?;
    println!("Streaming {total_bits} bits to {output_path}");

    let written = write_sample_file(&mut drbg, output_path, total_bits, b"")?;

    println!(
        "Done. Wrote {written} bytes to {output_path} ({} reseeds)",
        drbg.reseeds()
    );
    Ok(())
}
