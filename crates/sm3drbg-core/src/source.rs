//! Telemetry source trait and runtime state.
//!
//! Every collaborator implements [`TelemetrySource`], which provides
//! metadata via [`SourceInfo`], availability checking, and fixed-width
//! sample collection. The seven kinds and their widths are fixed; the pool
//! depends on their order.

use std::time::Duration;

use serde::Serialize;

/// The seven telemetry collaborators, in refresh order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Timestamp,
    Cpu,
    Memory,
    Disk,
    Network,
    SoftwarePrng,
    HardwareRng,
}

impl SourceKind {
    /// All kinds in the order they appear in a refresh.
    pub const ALL: [SourceKind; 7] = [
        Self::Timestamp,
        Self::Cpu,
        Self::Memory,
        Self::Disk,
        Self::Network,
        Self::SoftwarePrng,
        Self::HardwareRng,
    ];

    /// Sample width in bytes.
    pub const fn width(self) -> usize {
        match self {
            Self::Timestamp => 4,
            Self::Cpu => 12,
            Self::Memory => 8,
            Self::Disk => 16,
            Self::Network => 8,
            Self::SoftwarePrng => 4,
            Self::HardwareRng => 4,
        }
    }

    /// Position in [`SourceKind::ALL`].
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Byte offset of this kind's sample inside a refresh.
    pub fn offset(self) -> usize {
        Self::ALL[..self.index()].iter().map(|k| k.width()).sum()
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timestamp => write!(f, "timestamp"),
            Self::Cpu => write!(f, "cpu"),
            Self::Memory => write!(f, "memory"),
            Self::Disk => write!(f, "disk"),
            Self::Network => write!(f, "network"),
            Self::SoftwarePrng => write!(f, "software_prng"),
            Self::HardwareRng => write!(f, "hardware_rng"),
        }
    }
}

/// Category of a source based on what it observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceCategory {
    /// Clock readings.
    Timing,
    /// OS counters/state.
    System,
    /// Storage counters.
    IO,
    /// Network counters.
    Network,
    /// Output of another generator.
    Generator,
}

impl std::fmt::Display for SourceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timing => write!(f, "timing"),
            Self::System => write!(f, "system"),
            Self::IO => write!(f, "io"),
            Self::Network => write!(f, "network"),
            Self::Generator => write!(f, "generator"),
        }
    }
}

/// Target platform for a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Works on any platform.
    Any,
    /// Requires Linux procfs.
    Linux,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Any => write!(f, "any"),
            Self::Linux => write!(f, "linux"),
        }
    }
}

/// Metadata about a telemetry source.
#[derive(Debug, Clone)]
pub struct SourceInfo {
    /// Which of the seven slots this source fills.
    pub kind: SourceKind,
    /// One-line human-readable description.
    pub description: &'static str,
    /// Layout of the sample bytes.
    pub layout: &'static str,
    pub category: SourceCategory,
    pub platform: Platform,
}

/// Trait that every telemetry collaborator must implement.
pub trait TelemetrySource: Send {
    /// Source metadata.
    fn info(&self) -> &SourceInfo;

    /// Check if this source can operate on the current machine.
    fn is_available(&self) -> bool;

    /// Write one sample into `out`, which is exactly `kind().width()` bytes.
    fn read(&mut self, out: &mut [u8]) -> std::io::Result<()>;

    /// Convenience: kind from info.
    fn kind(&self) -> SourceKind {
        self.info().kind
    }
}

/// Runtime state for a registered source.
pub struct SourceState {
    pub source: Box<dyn TelemetrySource>,
    pub samples: u64,
    pub failures: u64,
    /// Time spent in `read`, summed over all samples.
    pub collect_time: Duration,
}

impl SourceState {
    pub fn new(source: Box<dyn TelemetrySource>) -> Self {
        Self {
            source,
            samples: 0,
            failures: 0,
            collect_time: Duration::ZERO,
        }
    }
}
