use std::path::Path;
use std::time::Instant;

use sm3drbg_core::{Result, Sm3Drbg, write_sample_file};

pub fn run(config_path: Option<&Path>, mode: Option<u8>, output: &Path, bits: u64) -> Result<()> {
    let config = super::load_config(config_path, mode)?;
    let mut drbg = Sm3Drbg::init(config, b"")?;

    let start = Instant::now();
    let written = write_sample_file(&mut drbg, output, bits, b"")?;
    let elapsed = start.elapsed().as_secs_f64();

    println!(
        "Wrote {written} bytes ({} bits) to {} in {elapsed:.2}s ({} reseeds, mode {})",
        written * 8,
        output.display(),
        drbg.reseeds(),
        drbg.config().mode,
    );
    Ok(())
}
