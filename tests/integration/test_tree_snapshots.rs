use procwatch_monitor::snapshot::{aggregate, descendants_of, CpuTimes, IoCounters, ProcessCounters};
use procwatch_monitor::{RawSnapshot, Sample};
use proptest::prelude::*;

use crate::mocks::MB;

fn counters(memory_mb: u64, cpu: f64, read: u64, write: u64) -> ProcessCounters {
    ProcessCounters {
        memory_bytes: memory_mb * MB,
        cpu: CpuTimes { user: cpu, system: cpu / 2.0 },
        io: IoCounters { read_bytes: read, write_bytes: write },
    }
}

#[test]
fn test_aggregate_without_descendants_is_identity() {
    let root = counters(40, 1.0, 10, 20);
    let none: [ProcessCounters; 0] = [];
    let snapshot = aggregate(root, &none);

    assert_eq!(snapshot, RawSnapshot::from(root));
    assert_eq!(snapshot.process_count, 1);
    assert_eq!(snapshot.memory_bytes, 40 * MB);
}

#[test]
fn test_tree_totals_feed_the_sample() {
    let root = counters(10, 0.5, MB, 0);
    let children = [counters(20, 1.0, MB, 2 * MB), counters(30, 1.5, 0, 2 * MB)];

    let snapshot = aggregate(root, &children);
    let sample = Sample::from_snapshot(2.0, 50.0, &snapshot);

    assert_eq!(snapshot.process_count, 3);
    assert_eq!(sample.memory_mb, 60.0);
    assert_eq!(sample.io_read_mb, 2.0);
    assert_eq!(sample.io_write_mb, 4.0);
    assert_eq!(snapshot.cpu.total(), 4.5);
}

#[test]
fn test_descendants_include_grandchildren_only_under_root() {
    let table = vec![
        (1, None),
        (100, Some(1)),
        (101, Some(100)),
        (102, Some(101)),
        (200, Some(1)),
        (300, Some(999)),
    ];

    let mut found = descendants_of(100, table);
    found.sort_unstable();
    assert_eq!(found, vec![101, 102]);
}

proptest! {
    #[test]
    fn prop_aggregate_is_order_independent(
        memories in prop::collection::vec(0u64..512, 0..16),
    ) {
        let root = counters(1, 0.0, 0, 0);
        let children: Vec<_> = memories.iter().map(|&m| counters(m, 0.0, m, m)).collect();
        let mut reversed = children.clone();
        reversed.reverse();

        let forward = aggregate(root, &children);
        let backward = aggregate(root, &reversed);

        prop_assert_eq!(forward.memory_bytes, backward.memory_bytes);
        prop_assert_eq!(forward.io, backward.io);
        prop_assert_eq!(forward.process_count, children.len() + 1);
    }
}
