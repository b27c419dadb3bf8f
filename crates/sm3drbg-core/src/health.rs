//! Repetition-count health test over the telemetry samples.
//!
//! Each source keeps its own counter and previous value for the life of the
//! pool. The power-on test runs before the pool exists. The continuous test
//! re-checks every refresh. Both fail closed.

use log::{debug, error, info};

use crate::error::{DrbgError, Result};
use crate::source::SourceKind;
use crate::sources::SourceSet;

/// Detects a source that keeps returning the same sample.
///
/// The counter starts at 1 on the first sample, goes up for every identical
/// successor and fails once it exceeds the cutoff. A differing sample puts it
/// back to 1.
#[derive(Debug, Clone)]
pub struct RepetitionTest {
    cutoff: u32,
    count: u32,
    last_sample: u128,
    initialized: bool,
}

impl RepetitionTest {
    pub fn new(cutoff: u32) -> Self {
        Self {
            cutoff,
            count: 0,
            last_sample: 0,
            initialized: false,
        }
    }

    /// Feed one sample. `Err` carries the repeat count that tripped the test.
    pub fn test(&mut self, sample: u128) -> std::result::Result<(), u32> {
        if !self.initialized {
            self.last_sample = sample;
            self.count = 1;
            self.initialized = true;
            return Ok(());
        }

        if sample == self.last_sample {
            self.count = self.count.saturating_add(1);
            if self.count > self.cutoff {
                return Err(self.count);
            }
        } else {
            self.last_sample = sample;
            self.count = 1;
        }
        Ok(())
    }

    /// Current run length of the last sample.
    pub fn count(&self) -> u32 {
        self.count
    }
}

/// Pack a sample of up to 16 bytes into one comparable value.
fn pack(sample: &[u8]) -> u128 {
    sample
        .iter()
        .fold(0u128, |acc, &b| (acc << 8) | u128::from(b))
}

/// Per-source repetition history.
#[derive(Debug, Clone)]
pub struct HealthHistory {
    tests: Vec<RepetitionTest>,
}

impl HealthHistory {
    pub fn new(cutoff: u32) -> Self {
        Self {
            tests: SourceKind::ALL
                .iter()
                .map(|_| RepetitionTest::new(cutoff))
                .collect(),
        }
    }

    /// Check one sample from `kind`.
    pub fn check(&mut self, kind: SourceKind, sample: &[u8]) -> Result<()> {
        self.tests[kind.index()]
            .test(pack(sample))
            .map_err(|repeats| DrbgError::HealthTestFailure { kind, repeats })
    }

    /// Check every sample of a 56-byte refresh.
    pub fn continuous_test(&mut self, refresh: &[u8]) -> Result<()> {
        for kind in SourceKind::ALL {
            let start = kind.offset();
            if let Err(e) = self.check(kind, &refresh[start..start + kind.width()]) {
                error!("continuous health test failed: {e}");
                return Err(e);
            }
        }
        debug!("continuous health test passed");
        Ok(())
    }

    /// Draw `samples` readings from every source and check each run.
    pub fn power_on_test(&mut self, sources: &mut SourceSet, samples: usize) -> Result<()> {
        let mut buf = [0u8; 16];
        for kind in SourceKind::ALL {
            let out = &mut buf[..kind.width()];
            for _ in 0..samples {
                sources.sample_into(kind, out);
                if let Err(e) = self.check(kind, out) {
                    error!("power-on health test failed: {e}");
                    return Err(e);
                }
            }
        }
        info!(
            "power-on health test passed ({samples} samples x {} sources)",
            SourceKind::ALL.len()
        );
        Ok(())
    }

    /// Current run length for `kind`.
    pub fn count(&self, kind: SourceKind) -> u32 {
        self.tests[kind.index()].count()
    }
}
