//! Resource snapshots of a process tree
//!
//! A snapshot sums memory, CPU time and I/O counters of a root process and
//! every descendant alive at the time of the read. The descendant set may
//! change from one snapshot to the next.

use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::ops::{Add, AddAssign};

use sysinfo::{Pid, Process, ProcessRefreshKind, ProcessesToUpdate, System};
use tracing::{debug, trace};

use crate::procfs;

/// Cumulative CPU time in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CpuTimes {
    pub user: f64,
    pub system: f64,
}

impl CpuTimes {
    pub fn total(&self) -> f64 {
        self.user + self.system
    }
}

impl Add for CpuTimes {
    type Output = CpuTimes;

    fn add(self, other: CpuTimes) -> CpuTimes {
        CpuTimes {
            user: self.user + other.user,
            system: self.system + other.system,
        }
    }
}

impl AddAssign for CpuTimes {
    fn add_assign(&mut self, other: CpuTimes) {
        *self = *self + other;
    }
}

/// Cumulative I/O byte counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IoCounters {
    pub read_bytes: u64,
    pub write_bytes: u64,
}

impl Add for IoCounters {
    type Output = IoCounters;

    fn add(self, other: IoCounters) -> IoCounters {
        IoCounters {
            read_bytes: self.read_bytes.saturating_add(other.read_bytes),
            write_bytes: self.write_bytes.saturating_add(other.write_bytes),
        }
    }
}

impl AddAssign for IoCounters {
    fn add_assign(&mut self, other: IoCounters) {
        *self = *self + other;
    }
}

/// Counters of a single process.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProcessCounters {
    pub memory_bytes: u64,
    pub cpu: CpuTimes,
    pub io: IoCounters,
}

/// Counters summed over a process and its live descendants.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawSnapshot {
    /// Unique set size in bytes
    pub memory_bytes: u64,

    /// Cumulative CPU time
    pub cpu: CpuTimes,

    /// Cumulative I/O bytes
    pub io: IoCounters,

    /// Number of processes that contributed
    pub process_count: usize,
}

impl RawSnapshot {
    /// Add one process's counters to the totals.
    pub fn absorb(&mut self, counters: &ProcessCounters) {
        self.memory_bytes = self.memory_bytes.saturating_add(counters.memory_bytes);
        self.cpu += counters.cpu;
        self.io += counters.io;
        self.process_count += 1;
    }
}

impl From<ProcessCounters> for RawSnapshot {
    fn from(counters: ProcessCounters) -> Self {
        let mut snapshot = RawSnapshot::default();
        snapshot.absorb(&counters);
        snapshot
    }
}

/// Sum a root's counters with those of its descendants.
pub fn aggregate<'a, I>(root: ProcessCounters, descendants: I) -> RawSnapshot
where
    I: IntoIterator<Item = &'a ProcessCounters>,
{
    let mut snapshot = RawSnapshot::from(root);
    for counters in descendants {
        snapshot.absorb(counters);
    }
    snapshot
}

/// Every transitive descendant of `root`, breadth first.
///
/// `table` yields `(pid, parent)` pairs. Parent-link cycles are tolerated and
/// `root` itself is never part of the result.
pub fn descendants_of<I>(root: u32, table: I) -> Vec<u32>
where
    I: IntoIterator<Item = (u32, Option<u32>)>,
{
    let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
    for (pid, parent) in table {
        if let Some(parent) = parent {
            if parent != pid {
                children.entry(parent).or_default().push(pid);
            }
        }
    }

    let mut seen = HashSet::from([root]);
    let mut queue = VecDeque::from([root]);
    let mut result = Vec::new();

    while let Some(pid) = queue.pop_front() {
        if let Some(kids) = children.get(&pid) {
            for &kid in kids {
                if seen.insert(kid) {
                    result.push(kid);
                    queue.push_back(kid);
                }
            }
        }
    }

    result
}

/// Snapshot of `root` and its descendants found in `table`.
///
/// `counters_of` returning `None` for the root means the tree is gone. A
/// descendant that vanished between enumeration and read is skipped.
pub fn read_tree<I, F>(root: u32, table: I, mut counters_of: F) -> Option<RawSnapshot>
where
    I: IntoIterator<Item = (u32, Option<u32>)>,
    F: FnMut(u32) -> Option<ProcessCounters>,
{
    let root_counters = counters_of(root)?;

    let descendants: Vec<ProcessCounters> = descendants_of(root, table)
        .into_iter()
        .filter_map(|child| {
            let counters = counters_of(child);
            if counters.is_none() {
                trace!(pid = child, "Descendant exited before it could be read");
            }
            counters
        })
        .collect();

    Some(aggregate(root_counters, &descendants))
}

/// Source of per-tick resource snapshots.
pub trait SnapshotReader: Send {
    /// Aggregated counters for `pid` and its descendants, or `None` once the
    /// process no longer exists.
    fn read(&mut self, pid: u32) -> Option<RawSnapshot>;
}

/// Snapshot reader backed by sysinfo, with `/proc` refinements on Linux.
pub struct SystemSnapshotReader {
    system: System,
}

impl SystemSnapshotReader {
    pub fn new() -> Self {
        Self { system: System::new() }
    }

    fn refresh(&mut self) {
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing()
                .with_cpu()
                .with_memory()
                .with_disk_usage(),
        );
    }
}

impl Default for SystemSnapshotReader {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotReader for SystemSnapshotReader {
    fn read(&mut self, pid: u32) -> Option<RawSnapshot> {
        self.refresh();

        let system = &self.system;
        let table = system
            .processes()
            .values()
            .filter(|process| process.thread_kind().is_none())
            .map(|process| (process.pid().as_u32(), process.parent().map(|parent| parent.as_u32())));

        let snapshot = read_tree(pid, table, |pid| {
            system.process(Pid::from_u32(pid)).and_then(process_counters)
        })?;

        debug!(
            pid,
            processes = snapshot.process_count,
            memory_bytes = snapshot.memory_bytes,
            "Read process tree snapshot"
        );
        Some(snapshot)
    }
}

/// Counters of one process, `None` if it disappeared mid-read.
fn process_counters(process: &Process) -> Option<ProcessCounters> {
    let pid = process.pid().as_u32();

    let memory_bytes = match procfs::unique_set_size(pid) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
        Err(err) => {
            trace!(pid, error = %err, "USS unavailable, using resident set size");
            process.memory()
        }
    };

    let cpu = match procfs::cpu_times(pid) {
        Ok(times) => times,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
        Err(_) => CpuTimes {
            user: process.accumulated_cpu_time() as f64 / 1000.0,
            system: 0.0,
        },
    };

    let disk = process.disk_usage();
    Some(ProcessCounters {
        memory_bytes,
        cpu,
        io: IoCounters {
            read_bytes: disk.total_read_bytes,
            write_bytes: disk.total_written_bytes,
        },
    })
}
