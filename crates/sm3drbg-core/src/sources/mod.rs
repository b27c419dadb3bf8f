//! The seven telemetry collaborators and the set that drives them.

pub mod helpers;

pub mod clock;
pub mod procfs;
pub mod random;

use std::time::Instant;

use log::warn;

use crate::error::{DrbgError, Result};
use crate::source::{SourceKind, SourceState, TelemetrySource};

/// Bytes produced by one refresh of all seven sources.
pub const REFRESH_SIZE: usize = 56;

/// The seven production collaborators, in refresh order.
pub fn system_sources() -> Vec<Box<dyn TelemetrySource>> {
    vec![
        Box::new(clock::TimestampSource),
        Box::new(procfs::CpuSource),
        Box::new(procfs::MemorySource),
        Box::new(procfs::DiskSource),
        Box::new(procfs::NetworkSource),
        Box::new(random::SoftwarePrngSource),
        Box::new(random::HardwareRngSource),
    ]
}

/// One source per [`SourceKind`], kept in refresh order.
pub struct SourceSet {
    states: Vec<SourceState>,
}

impl SourceSet {
    /// Build the set from exactly one source of each kind, in any order.
    pub fn new(sources: Vec<Box<dyn TelemetrySource>>) -> Result<Self> {
        let mut slots: Vec<Option<SourceState>> = SourceKind::ALL.iter().map(|_| None).collect();
        for source in sources {
            let kind = source.kind();
            let slot = &mut slots[kind.index()];
            if slot.is_some() {
                return Err(DrbgError::Configuration(format!(
                    "duplicate telemetry source: {kind}"
                )));
            }
            *slot = Some(SourceState::new(source));
        }

        let mut states = Vec::with_capacity(SourceKind::ALL.len());
        for (kind, slot) in SourceKind::ALL.iter().zip(slots) {
            match slot {
                Some(state) => states.push(state),
                None => {
                    return Err(DrbgError::Configuration(format!(
                        "missing telemetry source: {kind}"
                    )));
                }
            }
        }
        Ok(Self { states })
    }

    /// The production collaborators.
    pub fn system() -> Result<Self> {
        Self::new(system_sources())
    }

    /// Read one sample from `kind` into `out` (exactly `kind.width()` bytes).
    ///
    /// A failed read leaves `out` zeroed and is logged.
    pub fn sample_into(&mut self, kind: SourceKind, out: &mut [u8]) {
        let state = &mut self.states[kind.index()];
        let t0 = Instant::now();
        let result = state.source.read(out);
        state.collect_time += t0.elapsed();
        state.samples += 1;
        if let Err(e) = result {
            state.failures += 1;
            out.fill(0);
            warn!("{kind} read failed, using zero sample: {e}");
        }
    }

    /// Sample every source once and concatenate in refresh order.
    pub fn refresh(&mut self) -> [u8; REFRESH_SIZE] {
        let mut out = [0u8; REFRESH_SIZE];
        for kind in SourceKind::ALL {
            let start = kind.offset();
            self.sample_into(kind, &mut out[start..start + kind.width()]);
        }
        out
    }

    /// Runtime state of one source.
    pub fn state(&self, kind: SourceKind) -> &SourceState {
        &self.states[kind.index()]
    }

    /// Kinds whose source reports itself unavailable on this machine.
    pub fn unavailable(&self) -> Vec<SourceKind> {
        self.states
            .iter()
            .filter(|s| !s.source.is_available())
            .map(|s| s.source.kind())
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! Deterministic sources for tests.

    use std::io;

    use crate::source::{Platform, SourceCategory, SourceInfo, SourceKind, TelemetrySource};

    const fn mock_info(kind: SourceKind) -> SourceInfo {
        SourceInfo {
            kind,
            description: "test source",
            layout: "counter",
            category: SourceCategory::Timing,
            platform: Platform::Any,
        }
    }

    static INFOS: [SourceInfo; 7] = [
        mock_info(SourceKind::Timestamp),
        mock_info(SourceKind::Cpu),
        mock_info(SourceKind::Memory),
        mock_info(SourceKind::Disk),
        mock_info(SourceKind::Network),
        mock_info(SourceKind::SoftwarePrng),
        mock_info(SourceKind::HardwareRng),
    ];

    /// Emits a counter that changes on every read.
    pub struct CountingSource {
        pub kind: SourceKind,
        pub next: u64,
    }

    impl TelemetrySource for CountingSource {
        fn info(&self) -> &SourceInfo {
            &INFOS[self.kind.index()]
        }
        fn is_available(&self) -> bool {
            true
        }
        fn read(&mut self, out: &mut [u8]) -> io::Result<()> {
            // Spread the counter over the whole sample so no byte sticks.
            self.next = self.next.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            for (i, b) in out.iter_mut().enumerate() {
                *b = (self.next >> ((i % 8) * 8)) as u8 ^ i as u8;
            }
            Ok(())
        }
    }

    /// Always returns the same bytes.
    pub struct StuckSource {
        pub kind: SourceKind,
        pub byte: u8,
    }

    impl TelemetrySource for StuckSource {
        fn info(&self) -> &SourceInfo {
            &INFOS[self.kind.index()]
        }
        fn is_available(&self) -> bool {
            true
        }
        fn read(&mut self, out: &mut [u8]) -> io::Result<()> {
            out.fill(self.byte);
            Ok(())
        }
    }

    /// Always fails.
    pub struct FailingSource {
        pub kind: SourceKind,
    }

    impl TelemetrySource for FailingSource {
        fn info(&self) -> &SourceInfo {
            &INFOS[self.kind.index()]
        }
        fn is_available(&self) -> bool {
            false
        }
        fn read(&mut self, _out: &mut [u8]) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::NotFound, "no such counter"))
        }
    }

    /// Seven healthy counting sources.
    pub fn counting() -> Vec<Box<dyn TelemetrySource>> {
        SourceKind::ALL
            .iter()
            .map(|&kind| {
                Box::new(CountingSource {
                    kind,
                    next: kind.index() as u64 + 1,
                }) as Box<dyn TelemetrySource>
            })
            .collect()
    }

    /// Seven counting sources with `kind` replaced by `replacement`.
    pub fn with_replaced(
        kind: SourceKind,
        replacement: Box<dyn TelemetrySource>,
    ) -> Vec<Box<dyn TelemetrySource>> {
        let mut sources = counting();
        sources[kind.index()] = replacement;
        sources
    }
}

#[cfg(test)]
mod tests {
    use super::mock::*;
    use super::*;

    #[test]
    fn test_refresh_is_56_bytes_and_varies() {
        let mut set = SourceSet::new(counting()).unwrap();
        let a = set.refresh();
        let b = set.refresh();
        assert_eq!(a.len(), REFRESH_SIZE);
        assert_ne!(a, b);
        assert_eq!(set.state(SourceKind::Disk).samples, 2);
    }

    #[test]
    fn test_sources_reordered_by_kind() {
        let mut sources = counting();
        sources.reverse();
        let set = SourceSet::new(sources).unwrap();
        for kind in SourceKind::ALL {
            assert_eq!(set.state(kind).source.kind(), kind);
        }
    }

    #[test]
    fn test_missing_and_duplicate_rejected() {
        let mut sources = counting();
        sources.pop();
        assert!(matches!(
            SourceSet::new(sources),
            Err(DrbgError::Configuration(_))
        ));

        let mut sources = counting();
        sources.push(Box::new(StuckSource {
            kind: SourceKind::Cpu,
            byte: 1,
        }));
        assert!(matches!(
            SourceSet::new(sources),
            Err(DrbgError::Configuration(_))
        ));
    }

    #[test]
    fn test_failed_read_is_zero_filled() {
        let sources = with_replaced(
            SourceKind::Memory,
            Box::new(FailingSource {
                kind: SourceKind::Memory,
            }),
        );
        let mut set = SourceSet::new(sources).unwrap();
        let refresh = set.refresh();
        let start = SourceKind::Memory.offset();
        assert_eq!(&refresh[start..start + 8], &[0u8; 8]);
        assert_eq!(set.state(SourceKind::Memory).failures, 1);
        assert_eq!(set.unavailable(), vec![SourceKind::Memory]);
    }

    #[test]
    #[ignore] // Reads real system telemetry
    fn test_system_refresh() {
        let mut set = SourceSet::system().unwrap();
        let a = set.refresh();
        let b = set.refresh();
        assert_ne!(a, b);
    }
}
