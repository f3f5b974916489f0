//! Generate testdata command implementation.
//!
//! Writes a synthetic /proc-shaped fixture directory: a random process forest
//! with one `stat`, `comm`, and `cmdline` file per process, plus a JSON
//! manifest describing what was generated. Point `--proc-root` at the output
//! to sample it like a live table.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use proc_tree_sampler::snapshot::Pid;

/// Name of the manifest file written beside the numeric process entries. The
/// sampler only descends into numeric directories, so it never sees this.
pub const MANIFEST_FILE: &str = "testdata.json";

/// One generated process, as recorded in the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestProcess {
    pub pid: Pid,
    pub ppid: Pid,
    pub comm: String,
}

/// Root structure of the manifest JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestdataManifest {
    pub version: String,
    pub generated_at: String,
    pub processes: Vec<TestProcess>,
}

/// Command names the synthetic processes are drawn from.
const COMM_NAMES: &[&str] = &[
    "systemd", "sshd", "bash", "nginx", "postgres", "cron", "agetty", "dockerd", "containerd",
    "kworker", "rsyslogd", "gitd",
];

/// Generates a synthetic process table under `output`.
pub fn command_generate_testdata(
    output: PathBuf,
    roots: usize,
    count: usize,
    max_children: usize,
) -> Result<()> {
    if roots == 0 {
        bail!("at least one root process is required");
    }
    if count < roots {
        bail!("count ({count}) must be at least the number of roots ({roots})");
    }
    if max_children == 0 {
        bail!("max_children must be positive");
    }

    debug!(
        roots,
        count,
        max_children,
        output = %output.display(),
        "generating synthetic process table"
    );
    fs::create_dir_all(&output)
        .with_context(|| format!("creating output directory {}", output.display()))?;

    let mut rng = rand::thread_rng();
    let mut processes: Vec<TestProcess> = Vec::with_capacity(count);
    let mut child_counts: Vec<usize> = Vec::with_capacity(count);
    let mut next_pid: Pid = 1;

    for index in 0..count {
        let pid = next_pid;
        next_pid += rng.gen_range(1..=37);

        let ppid = if index < roots {
            0
        } else {
            pick_parent(&mut rng, &processes, &mut child_counts, max_children)
        };

        let comm = format!(
            "{}-{}",
            COMM_NAMES[rng.gen_range(0..COMM_NAMES.len())],
            index + 1
        );
        write_process_entry(&output, pid, ppid, &comm, &mut rng)
            .with_context(|| format!("writing process entry {pid}"))?;

        processes.push(TestProcess { pid, ppid, comm });
        child_counts.push(0);
    }

    let manifest = TestdataManifest {
        version: "1.0".to_string(),
        generated_at: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        processes,
    };
    let json_content = serde_json::to_string_pretty(&manifest)?;
    fs::write(output.join(MANIFEST_FILE), &json_content)?;

    println!(
        "✅ Generated synthetic process table: {} processes ({} roots) in {}",
        manifest.processes.len(),
        roots,
        output.display()
    );

    Ok(())
}

/// Picks a parent among the already generated processes, preferring the first
/// random candidate that still has child capacity.
fn pick_parent(
    rng: &mut impl Rng,
    processes: &[TestProcess],
    child_counts: &mut [usize],
    max_children: usize,
) -> Pid {
    for _ in 0..8 {
        let candidate = rng.gen_range(0..processes.len());
        if child_counts[candidate] < max_children {
            child_counts[candidate] += 1;
            return processes[candidate].pid;
        }
    }
    // Every sampled candidate was full; overload the last one rather than
    // looping indefinitely.
    let last = processes.len() - 1;
    child_counts[last] += 1;
    processes[last].pid
}

/// Writes the `stat`, `comm`, and `cmdline` files for one process entry.
fn write_process_entry(
    root: &Path,
    pid: Pid,
    ppid: Pid,
    comm: &str,
    rng: &mut impl Rng,
) -> std::io::Result<()> {
    let dir = root.join(pid.to_string());
    fs::create_dir_all(&dir)?;

    let utime: u64 = rng.gen_range(0..10_000);
    let stime: u64 = rng.gen_range(0..10_000);
    let nice: i64 = rng.gen_range(-5..=19);
    let start_time: u64 = rng.gen_range(0..5_000_000);
    let vsize: u64 = rng.gen_range(1 << 20..1u64 << 32);
    let processor: i32 = rng.gen_range(0..8);

    fs::write(
        dir.join("stat"),
        synthetic_stat_line(pid, comm, ppid, utime, stime, nice, start_time, vsize, processor),
    )?;
    fs::write(dir.join("comm"), format!("{comm}\n"))?;
    fs::write(
        dir.join("cmdline"),
        format!("/usr/bin/{comm}\0--synthetic\0").into_bytes(),
    )?;
    Ok(())
}

/// Builds one full 44-field `stat` line with the given values and plausible
/// filler everywhere else.
#[allow(clippy::too_many_arguments)]
fn synthetic_stat_line(
    pid: Pid,
    comm: &str,
    ppid: Pid,
    utime: u64,
    stime: u64,
    nice: i64,
    start_time: u64,
    vsize: u64,
    processor: i32,
) -> String {
    format!(
        "{pid} ({comm}) S {ppid} {pid} {pid} 0 -1 4194304 250 0 0 0 {utime} {stime} 0 0 20 {nice} 1 0 {start_time} {vsize} 120 18446744073709551615 1 1 0 0 0 0 0 0 0 0 0 0 17 {processor} 0 0 0 0 0"
    )
}
