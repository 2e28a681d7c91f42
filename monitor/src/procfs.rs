//! Linux `/proc` readers for counters sysinfo does not expose.
//!
//! USS comes from the `Private_*` lines of `smaps_rollup` (or `smaps` on
//! kernels without it) and the user/system CPU split from `stat`. On other
//! platforms every reader returns `ErrorKind::Unsupported` so callers fall
//! back to sysinfo values.

use std::io;

use crate::snapshot::CpuTimes;

/// `smaps` keys whose sizes make up the unique set size.
const PRIVATE_KEYS: [&str; 3] = ["Private_Clean:", "Private_Dirty:", "Private_Hugetlb:"];

/// Sum the private mappings of an `smaps`/`smaps_rollup` document, in bytes.
pub fn parse_private_bytes(contents: &str) -> u64 {
    contents
        .lines()
        .filter_map(|line| {
            let key = PRIVATE_KEYS.iter().find(|key| line.starts_with(*key))?;
            line[key.len()..]
                .split_whitespace()
                .next()
                .and_then(|kb| kb.parse::<u64>().ok())
        })
        .sum::<u64>()
        * 1024
}

/// Parse `utime` and `stime` (in clock ticks) out of a `/proc/<pid>/stat` line.
///
/// The command name may contain spaces and parentheses, so fields are counted
/// from the last `)`.
pub fn parse_stat_ticks(contents: &str) -> Option<(u64, u64)> {
    let close_paren = contents.rfind(')')?;
    let fields: Vec<&str> = contents.get(close_paren + 1..)?.split_whitespace().collect();
    // fields[0] is the state (field 3 of stat); utime and stime are fields 14 and 15
    let utime = fields.get(11)?.parse().ok()?;
    let stime = fields.get(12)?.parse().ok()?;
    Some((utime, stime))
}

#[cfg(target_os = "linux")]
mod imp {
    use std::fs;
    use std::io;

    use super::{parse_private_bytes, parse_stat_ticks};
    use crate::snapshot::CpuTimes;

    pub fn unique_set_size(pid: u32) -> io::Result<u64> {
        match fs::read_to_string(format!("/proc/{}/smaps_rollup", pid)) {
            Ok(contents) => Ok(parse_private_bytes(&contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                let contents = fs::read_to_string(format!("/proc/{}/smaps", pid))?;
                Ok(parse_private_bytes(&contents))
            }
            Err(err) => Err(err),
        }
    }

    pub fn cpu_times(pid: u32) -> io::Result<CpuTimes> {
        let contents = fs::read_to_string(format!("/proc/{}/stat", pid))?;
        let (utime, stime) = parse_stat_ticks(&contents).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, format!("malformed /proc/{}/stat", pid))
        })?;

        let ticks = clock_ticks_per_second();
        Ok(CpuTimes {
            user: utime as f64 / ticks,
            system: stime as f64 / ticks,
        })
    }

    fn clock_ticks_per_second() -> f64 {
        // SAFETY: sysconf has no preconditions and only reads a constant.
        let ticks = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
        if ticks > 0 {
            ticks as f64
        } else {
            100.0
        }
    }
}

#[cfg(not(target_os = "linux"))]
mod imp {
    use std::io;

    use crate::snapshot::CpuTimes;

    pub fn unique_set_size(_pid: u32) -> io::Result<u64> {
        Err(io::Error::from(io::ErrorKind::Unsupported))
    }

    pub fn cpu_times(_pid: u32) -> io::Result<CpuTimes> {
        Err(io::Error::from(io::ErrorKind::Unsupported))
    }
}

/// Unique set size of `pid` in bytes.
///
/// `NotFound` means the process is gone.
pub fn unique_set_size(pid: u32) -> io::Result<u64> {
    imp::unique_set_size(pid)
}

/// Cumulative user and system CPU time of `pid`.
///
/// `NotFound` means the process is gone.
pub fn cpu_times(pid: u32) -> io::Result<CpuTimes> {
    imp::cpu_times(pid)
}
