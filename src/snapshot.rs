//! Snapshot data model for sampled process trees.
//!
//! A [`ProcessSnapshot`] is one complete, internally consistent capture of the
//! process table: plain owned [`ProcessRecord`] values keyed by pid, plus the
//! derived parent→children adjacency and the list of roots. Records are never
//! mutated after the adjacency build; a new sampling pass replaces the whole
//! snapshot. Views handed to consumers are valid only until the next pass.

use ahash::AHashMap as HashMap;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Task id. Unique within a single snapshot; for the main task of a process
/// this is the pid.
pub type Pid = u32;

/// One process as observed during a sampling pass.
///
/// All fields except `children` come straight from the process table; raw
/// counters are kept raw (jiffies, clock ticks) and converted only at the
/// consumer boundary. `children` is derived after every record of the pass is
/// known and lists child pids in the order the scan encountered them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessRecord {
    pub pid: Pid,
    /// Parent pid as reported by the table. May name a pid that is not part
    /// of this snapshot (already-exited parent, or the pid 0 boundary).
    pub ppid: Pid,
    /// Start time in jiffies since boot (`stat` field 22).
    pub start_time: u64,
    /// Nice value (`stat` field 19).
    pub nice: i64,
    /// Virtual memory size in bytes (`stat` field 23).
    pub virtual_memory_bytes: u64,
    /// Accumulated user + system CPU clock ticks (`stat` fields 14 + 15).
    pub cpu_ticks: u64,
    /// Command basename.
    pub comm: String,
    /// Full argument vector; empty when unavailable (kernel threads).
    #[serde(default)]
    pub argv: Vec<String>,
    /// Process group id (`stat` field 5).
    pub pgrp: i32,
    /// Processor this task last ran on (`stat` field 39).
    pub last_processor: i32,
    /// Derived: pids whose `ppid` resolved to this record, in scan order.
    #[serde(default)]
    pub children: Vec<Pid>,
}

/// One completed sampling pass.
#[derive(Debug, Clone)]
pub struct ProcessSnapshot {
    processes: HashMap<Pid, ProcessRecord>,
    roots: Vec<Pid>,
    taken_at: Instant,
}

impl ProcessSnapshot {
    pub(crate) fn new(
        processes: HashMap<Pid, ProcessRecord>,
        roots: Vec<Pid>,
        taken_at: Instant,
    ) -> Self {
        Self {
            processes,
            roots,
            taken_at,
        }
    }

    /// Looks up a record by pid.
    pub fn get(&self, pid: Pid) -> Option<&ProcessRecord> {
        self.processes.get(&pid)
    }

    /// The child pids of `pid`, or `None` if the pid is absent.
    pub fn children(&self, pid: Pid) -> Option<&[Pid]> {
        self.processes.get(&pid).map(|record| record.children.as_slice())
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.processes.contains_key(&pid)
    }

    /// Number of records in the snapshot.
    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// All pids, in map order.
    pub fn pids(&self) -> impl Iterator<Item = Pid> + '_ {
        self.processes.keys().copied()
    }

    /// All records, in map order.
    pub fn records(&self) -> impl Iterator<Item = &ProcessRecord> {
        self.processes.values()
    }

    /// Records whose parent did not resolve within this snapshot, in scan
    /// order. Every record is reachable from exactly one root.
    pub fn roots(&self) -> &[Pid] {
        &self.roots
    }

    /// Monotonic instant at which the pass completed.
    pub fn taken_at(&self) -> Instant {
        self.taken_at
    }

    /// Time since the pass completed.
    pub fn age(&self) -> Duration {
        self.taken_at.elapsed()
    }
}
