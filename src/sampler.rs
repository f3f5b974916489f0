//! Process-table sampling and snapshot construction.
//!
//! [`ProcTable`] is the owning handle to a `/proc` style directory, acquired
//! once and released deterministically when the sampler is closed or dropped.
//! [`ProcessTableSampler`] turns the table into [`ProcessSnapshot`]s with a
//! three-phase build: immutable base records, a children side map keyed by
//! pid, then one merge into the final records. A pass either completes and
//! replaces the current snapshot wholesale or fails and leaves the previous
//! snapshot untouched — readers never see a partially built snapshot.
//!
//! The process table is an external, mutating resource; processes exit and
//! spawn while the scan runs. Adjacency is therefore correct as of the scan,
//! not as of any single instant, the same tradeoff the kernel's own table
//! listing makes.

use ahash::{AHashMap as HashMap, AHashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

use crate::procfs;
use crate::snapshot::{Pid, ProcessRecord, ProcessSnapshot};

/// Default process-table root on Linux.
pub const DEFAULT_PROC_ROOT: &str = "/proc";

#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    /// The enumeration facility could not be opened. Fatal for the sampler's
    /// lifetime; no retry is built in, the caller decides.
    #[error("process table unavailable at {}: {source}", path.display())]
    ProcTableUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The handle was closed before this call.
    #[error("process table handle already closed")]
    TableClosed,
    /// Enumerating the table root failed mid-pass. The previous snapshot is
    /// still current.
    #[error("process table scan failed: {0}")]
    ScanFailed(#[source] io::Error),
}

/// Owning handle to a process-table directory.
#[derive(Debug)]
pub struct ProcTable {
    root: PathBuf,
}

impl ProcTable {
    /// Opens the system process table at [`DEFAULT_PROC_ROOT`].
    pub fn open() -> Result<Self, SampleError> {
        Self::open_at(DEFAULT_PROC_ROOT)
    }

    /// Opens a process table at an arbitrary root. Tests and synthetic
    /// fixtures point this at a generated directory.
    pub fn open_at(root: impl Into<PathBuf>) -> Result<Self, SampleError> {
        let root = root.into();
        // Probe enumerability up front; insufficient privilege or a missing
        // mount surfaces here, not halfway through a scan.
        match fs::read_dir(&root) {
            Ok(_) => {
                debug!(root = %root.display(), "process table opened");
                Ok(Self { root })
            }
            Err(source) => Err(SampleError::ProcTableUnavailable { path: root, source }),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Periodic whole-table sampler. Single writer of its snapshot; consumers
/// borrow read-only views that are valid until the next pass.
pub struct ProcessTableSampler {
    table: Option<ProcTable>,
    include_threads: bool,
    snapshot: Option<ProcessSnapshot>,
}

impl ProcessTableSampler {
    /// Opens the system process table and wraps it in a sampler.
    pub fn open() -> Result<Self, SampleError> {
        Ok(Self::with_table(ProcTable::open()?))
    }

    /// Opens a process table at `root` and wraps it in a sampler.
    pub fn open_at(root: impl Into<PathBuf>) -> Result<Self, SampleError> {
        Ok(Self::with_table(ProcTable::open_at(root)?))
    }

    /// Wraps an already opened table. The sampler takes exclusive ownership.
    pub fn with_table(table: ProcTable) -> Self {
        Self {
            table: Some(table),
            include_threads: false,
            snapshot: None,
        }
    }

    /// Also enumerate per-process tasks, nesting each thread beneath its
    /// owning process. Off by default.
    pub fn include_threads(mut self, include: bool) -> Self {
        self.include_threads = include;
        self
    }

    /// Whether the table handle is still open.
    pub fn is_open(&self) -> bool {
        self.table.is_some()
    }

    /// The most recently completed snapshot, or `None` before the first
    /// successful pass.
    pub fn snapshot(&self) -> Option<&ProcessSnapshot> {
        self.snapshot.as_ref()
    }

    /// Releases the table handle. Idempotent; the last snapshot stays
    /// readable, further sampling fails with [`SampleError::TableClosed`].
    pub fn close(&mut self) {
        if let Some(table) = self.table.take() {
            debug!(root = %table.root().display(), "process table closed");
        }
    }

    /// Takes one complete snapshot and publishes it, replacing the previous
    /// one. Individual processes that disappear mid-enumeration are skipped;
    /// only failure to enumerate the table root fails the pass.
    pub fn sample_once(&mut self) -> Result<&ProcessSnapshot, SampleError> {
        let table = self.table.as_ref().ok_or(SampleError::TableClosed)?;
        let started = Instant::now();

        // Phase 1: one immutable base record per readable process, scan order.
        let mut records: Vec<ProcessRecord> = Vec::new();
        let mut skipped = 0usize;
        let entries = fs::read_dir(table.root()).map_err(SampleError::ScanFailed)?;
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(pid) = numeric_name(&path) else {
                continue;
            };
            match procfs::read_record(&path) {
                Ok(record) => {
                    records.push(record);
                    if self.include_threads {
                        collect_tasks(&path, pid, &mut records, &mut skipped);
                    }
                }
                Err(error) => {
                    // Typically a process that exited between the directory
                    // listing and the read.
                    debug!(pid, %error, "skipping process");
                    skipped += 1;
                }
            }
        }

        // Phase 2: derive children adjacency into a side structure. A record
        // whose parent has no record in this pass becomes a root; common for
        // pid 1/2 and for children reparented after their parent exited.
        let mut index: AHashSet<Pid> = AHashSet::with_capacity(records.len());
        for record in &records {
            index.insert(record.pid);
        }
        let mut children: HashMap<Pid, Vec<Pid>> = HashMap::new();
        let mut roots: Vec<Pid> = Vec::new();
        let mut unresolved = 0usize;
        for record in &records {
            if record.ppid != record.pid && index.contains(&record.ppid) {
                children.entry(record.ppid).or_default().push(record.pid);
            } else {
                if record.ppid != 0 {
                    debug!(
                        pid = record.pid,
                        ppid = record.ppid,
                        "parent not in snapshot, treating as root"
                    );
                    unresolved += 1;
                }
                roots.push(record.pid);
            }
        }
        if unresolved > 0 {
            debug!(unresolved, "records with unresolved parents in this pass");
        }

        // Phase 3: merge children lists into the final immutable records and
        // publish by whole-snapshot replacement.
        let mut processes: HashMap<Pid, ProcessRecord> = HashMap::with_capacity(records.len());
        for mut record in records {
            if let Some(kids) = children.remove(&record.pid) {
                record.children = kids;
            }
            processes.insert(record.pid, record);
        }

        let snapshot = ProcessSnapshot::new(processes, roots, Instant::now());
        info!(
            processes = snapshot.len(),
            roots = snapshot.roots().len(),
            skipped,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "snapshot complete"
        );
        Ok(self.snapshot.insert(snapshot))
    }
}

/// Parses the final path component as a pid; `None` for non-numeric entries.
fn numeric_name(path: &Path) -> Option<Pid> {
    let name = path.file_name()?.to_str()?;
    if !name.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    name.parse().ok()
}

/// Samples `<proc>/task/<tid>` entries for one process. The raw stat ppid of
/// a task names the process's parent, which would flatten the tree, so each
/// thread record gets `ppid` forced to its owning pid instead.
fn collect_tasks(proc_path: &Path, pid: Pid, records: &mut Vec<ProcessRecord>, skipped: &mut usize) {
    let Ok(entries) = fs::read_dir(proc_path.join("task")) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(tid) = numeric_name(&path) else {
            continue;
        };
        if tid == pid {
            // The main thread is already recorded as the process itself.
            continue;
        }
        match procfs::read_record(&path) {
            Ok(mut record) => {
                record.ppid = pid;
                records.push(record);
            }
            Err(error) => {
                debug!(pid, tid, %error, "skipping task");
                *skipped += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_process(root: &Path, pid: Pid, ppid: Pid, comm: &str) {
        let dir = root.join(pid.to_string());
        fs::create_dir_all(&dir).expect("create process dir");
        let stat = format!(
            "{pid} ({comm}) S {ppid} {pid} {pid} 0 -1 4194304 10 0 0 0 5 5 0 0 20 0 1 0 100 4096 10 18446744073709551615 0 0 0 0 0 0 0 0 0 0 0 0 17 0 0 0 0 0 0"
        );
        fs::write(dir.join("stat"), stat).expect("write stat");
        fs::write(dir.join("comm"), format!("{comm}\n")).expect("write comm");
        fs::write(dir.join("cmdline"), format!("/usr/bin/{comm}\0").into_bytes())
            .expect("write cmdline");
    }

    #[test]
    fn test_open_missing_root_is_fatal() {
        let dir = tempdir().expect("tempdir");
        let missing = dir.path().join("no-such-proc");
        assert!(matches!(
            ProcTable::open_at(&missing),
            Err(SampleError::ProcTableUnavailable { .. })
        ));
    }

    #[test]
    fn test_no_snapshot_before_first_sample() {
        let dir = tempdir().expect("tempdir");
        let sampler =
            ProcessTableSampler::open_at(dir.path()).expect("fixture root opens");
        assert!(sampler.snapshot().is_none());
    }

    #[test]
    fn test_sample_builds_adjacency_in_scan_order() {
        let dir = tempdir().expect("tempdir");
        write_process(dir.path(), 1, 0, "init");
        write_process(dir.path(), 10, 1, "daemon");
        write_process(dir.path(), 11, 1, "shell");
        write_process(dir.path(), 20, 10, "worker");

        let mut sampler =
            ProcessTableSampler::open_at(dir.path()).expect("fixture root opens");
        let snapshot = sampler.sample_once().expect("scan succeeds");

        assert_eq!(snapshot.len(), 4);
        assert_eq!(snapshot.roots(), &[1]);
        let mut kids = snapshot.children(1).expect("pid 1 present").to_vec();
        kids.sort_unstable();
        assert_eq!(kids, vec![10, 11]);
        assert_eq!(snapshot.children(10), Some(&[20][..]));
        assert_eq!(snapshot.children(20), Some(&[][..]));
        let record = snapshot.get(10).expect("pid 10 present");
        assert_eq!(record.comm, "daemon");
        assert_eq!(record.cpu_ticks, 10);
        assert_eq!(record.argv, vec!["/usr/bin/daemon"]);
    }

    #[test]
    fn test_unresolved_parent_becomes_root() {
        let dir = tempdir().expect("tempdir");
        // Parent 500 exited before the scan; 600 still names it.
        write_process(dir.path(), 1, 0, "init");
        write_process(dir.path(), 600, 500, "orphan");

        let mut sampler =
            ProcessTableSampler::open_at(dir.path()).expect("fixture root opens");
        let snapshot = sampler.sample_once().expect("scan succeeds");

        let mut roots = snapshot.roots().to_vec();
        roots.sort_unstable();
        assert_eq!(roots, vec![1, 600]);
        assert_eq!(snapshot.children(600), Some(&[][..]));
    }

    #[test]
    fn test_unreadable_entry_is_skipped_not_fatal() {
        let dir = tempdir().expect("tempdir");
        write_process(dir.path(), 1, 0, "init");
        // Entry directory exists but its stat is gone: mid-scan exit race.
        fs::create_dir_all(dir.path().join("77")).expect("create bare dir");

        let mut sampler =
            ProcessTableSampler::open_at(dir.path()).expect("fixture root opens");
        let snapshot = sampler.sample_once().expect("scan succeeds");
        assert_eq!(snapshot.len(), 1);
        assert!(!snapshot.contains(77));
    }

    #[test]
    fn test_close_is_idempotent_and_keeps_last_snapshot() {
        let dir = tempdir().expect("tempdir");
        write_process(dir.path(), 1, 0, "init");

        let mut sampler =
            ProcessTableSampler::open_at(dir.path()).expect("fixture root opens");
        sampler.sample_once().expect("scan succeeds");
        sampler.close();
        sampler.close();
        assert!(!sampler.is_open());
        assert!(sampler.snapshot().is_some());
        assert!(matches!(
            sampler.sample_once(),
            Err(SampleError::TableClosed)
        ));
    }

    #[test]
    fn test_threads_nest_under_their_process() {
        let dir = tempdir().expect("tempdir");
        write_process(dir.path(), 1, 0, "init");
        write_process(dir.path(), 30, 1, "server");
        // One extra task beneath pid 30, plus the main thread's own entry.
        let task_root = dir.path().join("30").join("task");
        write_process(&task_root, 30, 1, "server");
        write_process(&task_root, 31, 1, "server-io");

        let mut sampler = ProcessTableSampler::open_at(dir.path())
            .expect("fixture root opens")
            .include_threads(true);
        let snapshot = sampler.sample_once().expect("scan succeeds");

        assert_eq!(snapshot.len(), 3);
        let record = snapshot.get(31).expect("task recorded");
        assert_eq!(record.ppid, 30);
        assert_eq!(snapshot.children(30), Some(&[31][..]));
    }
}
