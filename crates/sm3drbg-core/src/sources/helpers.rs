//! Shared helpers used by the telemetry source implementations.
//!
//! Byte packing for fixed-width samples, read-latency timing, and the procfs
//! parsers. Parsers take the file contents as `&str` so they can be tested
//! without a live `/proc`.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

// ---------------------------------------------------------------------------
// Byte packing
// ---------------------------------------------------------------------------

/// Write the low `out.len()` bytes of `value` big-endian into `out`.
///
/// Wider counters are truncated, so only their fast-moving low bits end up
/// in the sample.
pub fn put_be(out: &mut [u8], value: u64) {
    let bytes = value.to_be_bytes();
    let n = out.len().min(8);
    out[..n].copy_from_slice(&bytes[8 - n..]);
}

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// Nanoseconds since the Unix epoch (0 if the clock is before it).
pub fn unix_nanos() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos()
}

/// Run `f` and return its result with the elapsed time in nanoseconds.
pub fn timed<T>(f: impl FnOnce() -> T) -> (T, u64) {
    let t0 = Instant::now();
    let value = f();
    (value, t0.elapsed().as_nanos() as u64)
}

// ---------------------------------------------------------------------------
// procfs parsing
// ---------------------------------------------------------------------------

/// Aggregate counters from `/proc/diskstats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskCounters {
    pub read_ios: u64,
    pub write_ios: u64,
    pub read_sectors: u64,
    pub write_sectors: u64,
    pub io_ticks_ms: u64,
}

/// Idle ticks from the aggregate `cpu` line of `/proc/stat`.
pub fn parse_stat_idle(raw: &str) -> Option<u64> {
    let rest = raw.lines().find_map(|line| line.strip_prefix("cpu "))?;
    rest.split_whitespace().nth(3)?.parse().ok()
}

/// Boot time in Unix seconds from the `btime` line of `/proc/stat`.
pub fn parse_stat_btime(raw: &str) -> Option<u64> {
    raw.lines()
        .find_map(|line| line.strip_prefix("btime "))
        .and_then(|v| v.trim().parse().ok())
}

/// `(used_kib, swap_used_kib)` from `/proc/meminfo`.
pub fn parse_meminfo(raw: &str) -> Option<(u64, u64)> {
    let mut total = None;
    let mut available = None;
    let mut free = None;
    let mut swap_total = 0;
    let mut swap_free = 0;

    for line in raw.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let Some(value) = rest
            .split_whitespace()
            .next()
            .and_then(|v| v.parse::<u64>().ok())
        else {
            continue;
        };
        match key {
            "MemTotal" => total = Some(value),
            "MemAvailable" => available = Some(value),
            "MemFree" => free = Some(value),
            "SwapTotal" => swap_total = value,
            "SwapFree" => swap_free = value,
            _ => {}
        }
    }

    // Old kernels lack MemAvailable.
    let unused = available.or(free)?;
    Some((
        total?.saturating_sub(unused),
        swap_total.saturating_sub(swap_free),
    ))
}

/// Sum the whole-disk devices in `/proc/diskstats`.
pub fn parse_diskstats(raw: &str) -> Option<DiskCounters> {
    let mut counters = DiskCounters::default();
    let mut disks = 0;

    for line in raw.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 14 || !is_likely_disk_device(parts[2]) {
            continue;
        }
        let parsed: Vec<u64> = parts[3..14]
            .iter()
            .filter_map(|v| v.parse::<u64>().ok())
            .collect();
        if parsed.len() < 11 {
            continue;
        }
        disks += 1;
        counters.read_ios = counters.read_ios.wrapping_add(parsed[0]);
        counters.read_sectors = counters.read_sectors.wrapping_add(parsed[2]);
        counters.write_ios = counters.write_ios.wrapping_add(parsed[4]);
        counters.write_sectors = counters.write_sectors.wrapping_add(parsed[6]);
        counters.io_ticks_ms = counters.io_ticks_ms.wrapping_add(parsed[9]);
    }

    (disks > 0).then_some(counters)
}

/// `(tx_bytes, rx_bytes)` summed over all interfaces in `/proc/net/dev`.
pub fn parse_net_dev(raw: &str) -> Option<(u64, u64)> {
    let mut tx = 0u64;
    let mut rx = 0u64;
    let mut interfaces = 0;

    for line in raw.lines().skip(2) {
        let Some((_, stats)) = line.split_once(':') else {
            continue;
        };
        let fields: Vec<u64> = stats
            .split_whitespace()
            .filter_map(|s| s.parse::<u64>().ok())
            .collect();
        if fields.len() < 16 {
            continue;
        }
        interfaces += 1;
        rx = rx.wrapping_add(fields[0]);
        tx = tx.wrapping_add(fields[8]);
    }

    (interfaces > 0).then_some((tx, rx))
}

fn is_likely_disk_device(name: &str) -> bool {
    if name.starts_with("loop")
        || name.starts_with("ram")
        || name.starts_with("dm-")
        || name.starts_with("md")
        || name.starts_with("zram")
        || name.starts_with("sr")
        || name.starts_with("fd")
        || name.starts_with("nbd")
    {
        return false;
    }
    if name.starts_with("nvme") || name.starts_with("mmcblk") {
        return !name.contains('p');
    }
    !name.chars().last().is_some_and(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROC_STAT: &str = "\
cpu  4705 356 584 3699176 23060 0 277 0 0 0
cpu0 1393 280 234 1095437 6370 0 159 0 0 0
intr 114930548 113199788 3 0 5 263 0 4 [... lots more numbers ...]
ctxt 1990473
btime 1062191376
processes 2915
";

    const MEMINFO: &str = "\
MemTotal:        1921988 kB
MemFree:          355980 kB
MemAvailable:    1217256 kB
Buffers:           79484 kB
SwapTotal:       1048572 kB
SwapFree:        1048060 kB
";

    const DISKSTATS: &str = "\
   7       0 loop0 10 0 100 5 0 0 0 0 0 8 5 0 0 0 0
 259       0 nvme0n1 1000 20 80000 300 2000 40 160000 900 0 1200 1300 0 0 0 0
 259       1 nvme0n1p1 900 20 70000 250 1900 40 150000 800 0 1100 1200 0 0 0 0
   8       0 sda 500 1 4000 60 700 2 5600 90 0 100 150 0 0 0 0
";

    const NET_DEV: &str = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo:  123456     100    0    0    0     0          0         0   123456     100    0    0    0     0       0          0
  eth0: 9876543    5000    0    0    0     0          0         0  1234567    4000    0    0    0     0       0          0
";

    #[test]
    fn test_put_be_truncates_to_low_bytes() {
        let mut out = [0u8; 4];
        put_be(&mut out, 0x1122_3344_5566_7788);
        assert_eq!(out, [0x55, 0x66, 0x77, 0x88]);

        let mut out = [0u8; 2];
        put_be(&mut out, 0x0102);
        assert_eq!(out, [0x01, 0x02]);
    }

    #[test]
    fn test_parse_stat() {
        assert_eq!(parse_stat_idle(PROC_STAT), Some(3_699_176));
        assert_eq!(parse_stat_btime(PROC_STAT), Some(1_062_191_376));
        assert_eq!(parse_stat_idle("garbage"), None);
    }

    #[test]
    fn test_parse_meminfo() {
        assert_eq!(parse_meminfo(MEMINFO), Some((1_921_988 - 1_217_256, 512)));
        assert_eq!(parse_meminfo(""), None);
    }

    #[test]
    fn test_parse_diskstats_skips_partitions_and_loops() {
        let c = parse_diskstats(DISKSTATS).unwrap();
        assert_eq!(c.read_ios, 1500);
        assert_eq!(c.write_ios, 2700);
        assert_eq!(c.read_sectors, 84_000);
        assert_eq!(c.write_sectors, 165_600);
        assert_eq!(c.io_ticks_ms, 1300);
    }

    #[test]
    fn test_parse_net_dev() {
        assert_eq!(
            parse_net_dev(NET_DEV),
            Some((123_456 + 1_234_567, 123_456 + 9_876_543))
        );
        assert_eq!(parse_net_dev("header\nheader\n"), None);
    }

    #[test]
    fn test_timed_reports_elapsed() {
        let (value, _ns) = timed(|| 7);
        assert_eq!(value, 7);
    }
}
