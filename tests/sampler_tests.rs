//! Integration tests for process-table sampling.
//!
//! These tests exercise the public API end-to-end against fixture process
//! tables written into temp directories: open, sample, inspect adjacency,
//! walk, close.

use std::collections::HashMap;
use std::path::Path;

use proc_tree_sampler::sampler::{ProcessTableSampler, SampleError};
use proc_tree_sampler::snapshot::{Pid, ProcessSnapshot};
use proc_tree_sampler::walk::{count_descendants, positioned_walk, Layout, Position, WalkError};
use tempfile::tempdir;

/// Writes one process entry (stat, comm, cmdline) under `root`.
fn write_process(root: &Path, pid: Pid, ppid: Pid, comm: &str) {
    let dir = root.join(pid.to_string());
    std::fs::create_dir_all(&dir).expect("create process dir");
    let stat = format!(
        "{pid} ({comm}) S {ppid} {pid} {pid} 0 -1 4194304 10 0 0 0 5 5 0 0 20 0 1 0 100 4096 10 18446744073709551615 0 0 0 0 0 0 0 0 0 0 0 0 17 0 0 0 0 0 0"
    );
    std::fs::write(dir.join("stat"), stat).expect("write stat");
    std::fs::write(dir.join("comm"), format!("{comm}\n")).expect("write comm");
    std::fs::write(
        dir.join("cmdline"),
        format!("/usr/bin/{comm}\0").into_bytes(),
    )
    .expect("write cmdline");
}

/// Standard fixture: 1 → {100 → {200, 201}, 101}, plus orphan 300 whose
/// parent 999 exited before the scan.
fn standard_fixture() -> tempfile::TempDir {
    let dir = tempdir().expect("tempdir");
    write_process(dir.path(), 1, 0, "init");
    write_process(dir.path(), 100, 1, "daemon");
    write_process(dir.path(), 101, 1, "shell");
    write_process(dir.path(), 200, 100, "worker-a");
    write_process(dir.path(), 201, 100, "worker-b");
    write_process(dir.path(), 300, 999, "orphan");
    dir
}

/// Every record whose parent resolved appears exactly once in that parent's
/// children; roots plus parented records partition the keyset.
fn assert_forest_invariants(snapshot: &ProcessSnapshot) {
    let mut placements: HashMap<Pid, usize> = HashMap::new();

    for record in snapshot.records() {
        for &child in &record.children {
            *placements.entry(child).or_insert(0) += 1;
            let child_record = snapshot.get(child).expect("children reference records");
            assert_eq!(
                child_record.ppid, record.pid,
                "child {child} lists a different parent than {0}",
                record.pid
            );
        }
    }
    for &root in snapshot.roots() {
        *placements.entry(root).or_insert(0) += 1;
    }

    assert_eq!(
        placements.len(),
        snapshot.len(),
        "every record belongs somewhere in the forest"
    );
    for (pid, count) in placements {
        assert!(snapshot.contains(pid), "placement of unknown pid {pid}");
        assert_eq!(count, 1, "pid {pid} placed {count} times");
    }
}

#[test]
fn test_adjacency_invariants_hold() {
    let dir = standard_fixture();
    let mut sampler = ProcessTableSampler::open_at(dir.path()).expect("fixture opens");
    let snapshot = sampler.sample_once().expect("scan succeeds");

    assert_eq!(snapshot.len(), 6);
    assert_forest_invariants(snapshot);

    let mut roots = snapshot.roots().to_vec();
    roots.sort_unstable();
    assert_eq!(roots, vec![1, 300], "unresolved parent becomes a root");
}

#[test]
fn test_resampling_static_table_is_idempotent() {
    let dir = standard_fixture();
    let mut sampler = ProcessTableSampler::open_at(dir.path()).expect("fixture opens");

    let first: HashMap<Pid, Vec<Pid>> = {
        let snapshot = sampler.sample_once().expect("first scan");
        snapshot
            .records()
            .map(|r| {
                let mut kids = r.children.clone();
                kids.sort_unstable();
                (r.pid, kids)
            })
            .collect()
    };
    let second: HashMap<Pid, Vec<Pid>> = {
        let snapshot = sampler.sample_once().expect("second scan");
        snapshot
            .records()
            .map(|r| {
                let mut kids = r.children.clone();
                kids.sort_unstable();
                (r.pid, kids)
            })
            .collect()
    };

    assert_eq!(first, second, "identical adjacency for identical tables");
}

#[test]
fn test_descendant_counts_over_sampled_snapshot() {
    let dir = standard_fixture();
    let mut sampler = ProcessTableSampler::open_at(dir.path()).expect("fixture opens");
    let snapshot = sampler.sample_once().expect("scan succeeds");

    assert_eq!(count_descendants(snapshot, 1), Ok(4));
    assert_eq!(count_descendants(snapshot, 100), Ok(2));
    assert_eq!(count_descendants(snapshot, 101), Ok(0));
    assert_eq!(count_descendants(snapshot, 300), Ok(0));
    assert_eq!(
        count_descendants(snapshot, 4242),
        Err(WalkError::UnknownPid(4242))
    );
}

#[test]
fn test_positioned_walk_covers_subtree() {
    let dir = standard_fixture();
    let mut sampler = ProcessTableSampler::open_at(dir.path()).expect("fixture opens");
    let snapshot = sampler.sample_once().expect("scan succeeds");

    let placed: Vec<(Pid, Position)> =
        positioned_walk(snapshot, 1, Position::ORIGIN, Layout::default())
            .expect("root present")
            .collect::<Result<_, _>>()
            .expect("well-formed snapshot");

    // Root and its four descendants; orphan 300 is a separate tree.
    assert_eq!(placed.len(), 5);
    assert_eq!(placed[0], (1, Position::ORIGIN));
    let depth_of: HashMap<Pid, f32> = placed.iter().map(|(pid, p)| (*pid, p.z)).collect();
    assert_eq!(depth_of[&100], 35.0);
    assert_eq!(depth_of[&101], 35.0);
    assert_eq!(depth_of[&200], 70.0);
    assert_eq!(depth_of[&201], 70.0);
}

#[test]
fn test_snapshot_lifecycle() {
    let dir = standard_fixture();
    let mut sampler = ProcessTableSampler::open_at(dir.path()).expect("fixture opens");
    assert!(sampler.snapshot().is_none(), "no snapshot before first pass");

    sampler.sample_once().expect("scan succeeds");
    assert!(sampler.snapshot().is_some());

    sampler.close();
    sampler.close();
    assert!(
        sampler.snapshot().is_some(),
        "last snapshot readable after close"
    );
    assert!(matches!(
        sampler.sample_once(),
        Err(SampleError::TableClosed)
    ));
}

#[test]
fn test_missing_table_root_is_fatal_at_open() {
    let dir = tempdir().expect("tempdir");
    let missing = dir.path().join("proc-is-not-mounted");
    assert!(matches!(
        ProcessTableSampler::open_at(&missing),
        Err(SampleError::ProcTableUnavailable { .. })
    ));
}

#[test]
fn test_growing_table_shows_up_in_next_snapshot() {
    let dir = standard_fixture();
    let mut sampler = ProcessTableSampler::open_at(dir.path()).expect("fixture opens");
    assert_eq!(sampler.sample_once().expect("first scan").len(), 6);

    write_process(dir.path(), 400, 101, "newcomer");
    let snapshot = sampler.sample_once().expect("second scan");
    assert_eq!(snapshot.len(), 7);
    assert_eq!(snapshot.children(101), Some(&[400][..]));
    assert_forest_invariants(snapshot);
}

#[test]
fn test_thread_enumeration_nests_tasks() {
    let dir = standard_fixture();
    let task_root = dir.path().join("100").join("task");
    write_process(&task_root, 100, 1, "daemon");
    write_process(&task_root, 102, 1, "daemon-io");

    let mut sampler = ProcessTableSampler::open_at(dir.path())
        .expect("fixture opens")
        .include_threads(true);
    let snapshot = sampler.sample_once().expect("scan succeeds");

    assert_eq!(snapshot.len(), 7);
    let task = snapshot.get(102).expect("task recorded");
    assert_eq!(task.ppid, 100, "threads nest under their owning process");
    assert_forest_invariants(snapshot);
    // Thread counts as a descendant of everything above its process.
    assert_eq!(count_descendants(snapshot, 1), Ok(5));
}
