//! Binary sample files for external statistical test suites.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::info;

use crate::drbg::{Clock, MAX_OUTPUT_BITS, Sm3Drbg};
use crate::error::Result;
use crate::pool::EntropyInput;

/// Default sample length in bits.
pub const DEFAULT_SAMPLE_BITS: u64 = 125_000_000;

/// Write consecutive 256-bit outputs to `writer` until at least `total_bits`
/// bits are out. Returns the number of bytes written.
pub fn write_samples<E, C, W>(
    drbg: &mut Sm3Drbg<E, C>,
    writer: &mut W,
    total_bits: u64,
    additional_input: &[u8],
) -> Result<u64>
where
    E: EntropyInput,
    C: Clock,
    W: Write,
{
    let blocks = total_bits.div_ceil(MAX_OUTPUT_BITS as u64);
    let mut written = 0u64;
    for _ in 0..blocks {
        let block = drbg.generate(MAX_OUTPUT_BITS, additional_input)?;
        writer.write_all(&block)?;
        written += block.len() as u64;
    }
    writer.flush()?;
    Ok(written)
}

/// [`write_samples`] into a new file at `path`, synced before returning.
pub fn write_sample_file<E: EntropyInput, C: Clock>(
    drbg: &mut Sm3Drbg<E, C>,
    path: impl AsRef<Path>,
    total_bits: u64,
    additional_input: &[u8],
) -> Result<u64> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let written = write_samples(drbg, &mut writer, total_bits, additional_input)?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    info!("wrote {written} bytes of samples to {}", path.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use zeroize::Zeroizing;

    use super::*;
    use crate::config::DrbgConfig;
    use crate::drbg::SystemClock;
    use crate::nonce::NoncePadding;
    use crate::pool::PoolRead;

    struct FixedEntropy;

    impl EntropyInput for FixedEntropy {
        fn draw(&mut self, _: u64, _: u64, _: u64) -> Result<PoolRead> {
            Ok(PoolRead::Ready(Zeroizing::new(vec![0x5a; 64])))
        }
    }

    fn drbg() -> Sm3Drbg<FixedEntropy, SystemClock> {
        let config = DrbgConfig {
            nonce_padding: NoncePadding::Constant,
            ..Default::default()
        };
        Sm3Drbg::with_parts(config, FixedEntropy, SystemClock::new(), b"").unwrap()
    }

    #[test]
    fn test_rounds_up_to_whole_blocks() {
        let mut out = Vec::new();
        let written = write_samples(&mut drbg(), &mut out, 257, b"").unwrap();
        assert_eq!(written, 64);
        assert_eq!(out.len(), 64);
        assert_ne!(out[..32], out[32..]);
    }

    #[test]
    fn test_default_length_block_count() {
        assert_eq!(DEFAULT_SAMPLE_BITS.div_ceil(256), 488_282);
    }

    #[test]
    fn test_sample_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.bin");
        let written = write_sample_file(&mut drbg(), &path, 256 * 10, b"adin").unwrap();
        assert_eq!(written, 320);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 320);
    }
}
