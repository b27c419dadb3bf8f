//! Generator-backed sources: the process PRNG and the OS/hardware RNG.

use crate::source::{Platform, SourceCategory, SourceInfo, SourceKind, TelemetrySource};

static SOFTWARE_PRNG_INFO: SourceInfo = SourceInfo {
    kind: SourceKind::SoftwarePrng,
    description: "32 bits from the thread-local software PRNG",
    layout: "u32(4)",
    category: SourceCategory::Generator,
    platform: Platform::Any,
};

static HARDWARE_RNG_INFO: SourceInfo = SourceInfo {
    kind: SourceKind::HardwareRng,
    description: "32 bits from the operating system RNG",
    layout: "bytes(4)",
    category: SourceCategory::Generator,
    platform: Platform::Any,
};

/// `rand`'s thread-local generator.
pub struct SoftwarePrngSource;

impl TelemetrySource for SoftwarePrngSource {
    fn info(&self) -> &SourceInfo {
        &SOFTWARE_PRNG_INFO
    }

    fn is_available(&self) -> bool {
        true
    }

    fn read(&mut self, out: &mut [u8]) -> std::io::Result<()> {
        let sample: u32 = rand::random();
        out.copy_from_slice(&sample.to_be_bytes()[..out.len()]);
        Ok(())
    }
}

/// The OS generator (`getrandom(2)`, `/dev/urandom`, RDRAND-backed where the
/// kernel uses it).
pub struct HardwareRngSource;

impl TelemetrySource for HardwareRngSource {
    fn info(&self) -> &SourceInfo {
        &HARDWARE_RNG_INFO
    }

    fn is_available(&self) -> bool {
        let mut byte = [0u8; 1];
        getrandom::fill(&mut byte).is_ok()
    }

    fn read(&mut self, out: &mut [u8]) -> std::io::Result<()> {
        getrandom::fill(out).map_err(|e| std::io::Error::other(e.to_string()))
    }
}
