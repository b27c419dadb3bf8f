//! Counter sources backed by `getrusage` and Linux procfs.
//!
//! Every sample ends with the low 16 bits of the read latency in
//! nanoseconds. The counters themselves move slowly; the latency tail keeps
//! consecutive samples from repeating on an idle machine.

use std::io;

use crate::source::{Platform, SourceCategory, SourceInfo, SourceKind, TelemetrySource};

use super::helpers::{parse_diskstats, parse_meminfo, parse_net_dev, parse_stat_idle, put_be, timed};

fn read_proc(path: &str) -> io::Result<String> {
    std::fs::read_to_string(path)
}

fn malformed(path: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, format!("unexpected format in {path}"))
}

// ---------------------------------------------------------------------------
// CPU
// ---------------------------------------------------------------------------

static CPU_INFO: SourceInfo = SourceInfo {
    kind: SourceKind::Cpu,
    description: "Process user/system CPU time and system idle ticks",
    layout: "user_us(4) sys_us(4) idle_ticks(2) latency_ns(2)",
    category: SourceCategory::System,
    platform: Platform::Linux,
};

/// Process CPU time plus the global idle counter.
pub struct CpuSource;

/// `(user_us, sys_us)` for the calling process.
#[cfg(unix)]
fn process_cpu_times() -> io::Result<(u64, u64)> {
    // SAFETY: `rusage` is plain old data; all-zero is a valid value.
    let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
    // SAFETY: `usage` is a valid, writable `rusage` for the duration of the call.
    let rc = unsafe { libc::getrusage(libc::RUSAGE_SELF, &mut usage) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    let micros = |tv: libc::timeval| (tv.tv_sec as u64) * 1_000_000 + tv.tv_usec as u64;
    Ok((micros(usage.ru_utime), micros(usage.ru_stime)))
}

#[cfg(not(unix))]
fn process_cpu_times() -> io::Result<(u64, u64)> {
    Err(io::Error::new(io::ErrorKind::Unsupported, "getrusage unavailable"))
}

impl TelemetrySource for CpuSource {
    fn info(&self) -> &SourceInfo {
        &CPU_INFO
    }

    fn is_available(&self) -> bool {
        cfg!(target_os = "linux")
    }

    fn read(&mut self, out: &mut [u8]) -> io::Result<()> {
        let (stat, latency) = timed(|| read_proc("/proc/stat"));
        let idle = parse_stat_idle(&stat?).ok_or_else(|| malformed("/proc/stat"))?;
        let (user, sys) = process_cpu_times()?;

        put_be(&mut out[0..4], user);
        put_be(&mut out[4..8], sys);
        put_be(&mut out[8..10], idle);
        put_be(&mut out[10..12], latency);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

static MEMORY_INFO: SourceInfo = SourceInfo {
    kind: SourceKind::Memory,
    description: "Used memory and used swap from /proc/meminfo",
    layout: "used_kib(4) swap_used_kib(2) latency_ns(2)",
    category: SourceCategory::System,
    platform: Platform::Linux,
};

/// Memory usage counters.
pub struct MemorySource;

impl TelemetrySource for MemorySource {
    fn info(&self) -> &SourceInfo {
        &MEMORY_INFO
    }

    fn is_available(&self) -> bool {
        std::path::Path::new("/proc/meminfo").exists()
    }

    fn read(&mut self, out: &mut [u8]) -> io::Result<()> {
        let (raw, latency) = timed(|| read_proc("/proc/meminfo"));
        let (used, swap) = parse_meminfo(&raw?).ok_or_else(|| malformed("/proc/meminfo"))?;

        put_be(&mut out[0..4], used);
        put_be(&mut out[4..6], swap);
        put_be(&mut out[6..8], latency);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Disk
// ---------------------------------------------------------------------------

static DISK_INFO: SourceInfo = SourceInfo {
    kind: SourceKind::Disk,
    description: "Block device I/O counters from /proc/diskstats",
    layout: "read_ios(2) write_ios(2) read_sectors(4) write_sectors(4) io_ticks(2) latency_ns(2)",
    category: SourceCategory::IO,
    platform: Platform::Linux,
};

/// Aggregate I/O counters over whole-disk devices.
pub struct DiskSource;

impl TelemetrySource for DiskSource {
    fn info(&self) -> &SourceInfo {
        &DISK_INFO
    }

    fn is_available(&self) -> bool {
        std::path::Path::new("/proc/diskstats").exists()
    }

    fn read(&mut self, out: &mut [u8]) -> io::Result<()> {
        let (raw, latency) = timed(|| read_proc("/proc/diskstats"));
        let c = parse_diskstats(&raw?).ok_or_else(|| malformed("/proc/diskstats"))?;

        put_be(&mut out[0..2], c.read_ios);
        put_be(&mut out[2..4], c.write_ios);
        put_be(&mut out[4..8], c.read_sectors);
        put_be(&mut out[8..12], c.write_sectors);
        put_be(&mut out[12..14], c.io_ticks_ms);
        put_be(&mut out[14..16], latency);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

static NETWORK_INFO: SourceInfo = SourceInfo {
    kind: SourceKind::Network,
    description: "Interface byte counters from /proc/net/dev",
    layout: "tx_bytes(4) rx_bytes(2) latency_ns(2)",
    category: SourceCategory::Network,
    platform: Platform::Linux,
};

/// Transmit/receive byte counters summed over all interfaces.
pub struct NetworkSource;

impl TelemetrySource for NetworkSource {
    fn info(&self) -> &SourceInfo {
        &NETWORK_INFO
    }

    fn is_available(&self) -> bool {
        std::path::Path::new("/proc/net/dev").exists()
    }

    fn read(&mut self, out: &mut [u8]) -> io::Result<()> {
        let (raw, latency) = timed(|| read_proc("/proc/net/dev"));
        let (tx, rx) = parse_net_dev(&raw?).ok_or_else(|| malformed("/proc/net/dev"))?;

        put_be(&mut out[0..4], tx);
        put_be(&mut out[4..6], rx);
        put_be(&mut out[6..8], latency);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sources() -> Vec<Box<dyn TelemetrySource>> {
        vec![
            Box::new(CpuSource),
            Box::new(MemorySource),
            Box::new(DiskSource),
            Box::new(NetworkSource),
        ]
    }

    #[test]
    fn test_info_matches_kind() {
        for src in sources() {
            assert_eq!(src.info().platform, Platform::Linux);
            assert!(!src.info().layout.is_empty());
        }
    }

    #[test]
    #[ignore] // Requires a Linux /proc
    fn test_procfs_sources_read() {
        for mut src in sources() {
            if !src.is_available() {
                continue;
            }
            let mut out = vec![0u8; src.kind().width()];
            src.read(&mut out).unwrap();
        }
    }
}
