//! Raw per-process readers for a `/proc` style directory.
//!
//! These functions read and parse the files of one process entry
//! (`stat`, `comm`, `cmdline`) into an immutable base record. Field
//! availability is platform- and privilege-dependent; a missing argument
//! vector degrades to empty and a missing `comm` file falls back to the
//! `stat` comm, while a truncated `stat` line fails only that one record.

use std::fs;
use std::io;
use std::path::Path;

use crate::snapshot::{Pid, ProcessRecord};

/// Fields pulled from `/proc/<pid>/stat`.
#[derive(Debug, Clone, PartialEq)]
pub struct StatRecord {
    pub pid: Pid,
    pub comm: String,
    pub ppid: Pid,
    pub pgrp: i32,
    pub utime: u64,
    pub stime: u64,
    pub nice: i64,
    pub start_time: u64,
    pub vsize: u64,
    pub last_processor: i32,
}

/// Reads and parses `<proc_path>/stat`.
pub fn read_stat(proc_path: &Path) -> io::Result<StatRecord> {
    let content = fs::read_to_string(proc_path.join("stat"))?;
    parse_stat(&content)
}

/// Parses one `stat` line. The comm field may itself contain spaces and
/// parentheses, so it is isolated between the first `(` and the *last* `)`;
/// everything after that is whitespace-separated numeric fields.
fn parse_stat(content: &str) -> io::Result<StatRecord> {
    let open = content
        .find('(')
        .ok_or_else(|| io::Error::other("stat line missing comm field"))?;
    let close = content
        .rfind(')')
        .filter(|close| *close > open)
        .ok_or_else(|| io::Error::other("stat line missing comm field"))?;

    let pid: Pid = content[..open]
        .trim()
        .parse()
        .map_err(|_| io::Error::other("stat line has invalid pid"))?;
    let comm = content[open + 1..close].to_string();
    let rest: Vec<&str> = content[close + 1..].split_whitespace().collect();

    Ok(StatRecord {
        pid,
        comm,
        ppid: stat_field(&rest, 4)?,
        pgrp: stat_field(&rest, 5)?,
        utime: stat_field(&rest, 14)?,
        stime: stat_field(&rest, 15)?,
        nice: stat_field(&rest, 19)?,
        start_time: stat_field(&rest, 22)?,
        vsize: stat_field(&rest, 23)?,
        // Not reported by very old kernels; degrade to cpu 0.
        last_processor: stat_field(&rest, 39).unwrap_or(0),
    })
}

/// Fetches 1-based `stat` field `n` from the fields following the comm.
fn stat_field<T: std::str::FromStr>(rest: &[&str], n: usize) -> io::Result<T> {
    rest.get(n - 3)
        .and_then(|raw| raw.parse().ok())
        .ok_or_else(|| io::Error::other(format!("stat field {n} missing or invalid")))
}

/// Reads the command basename from the `comm` file, falling back to the
/// basename of the first `cmdline` argument.
pub fn read_comm(proc_path: &Path) -> Option<String> {
    let comm = proc_path.join("comm");
    if let Ok(content) = fs::read_to_string(&comm) {
        let trimmed = content.trim();
        if !trimmed.is_empty() {
            return Some(trimmed.into());
        }
    }

    let argv = read_argv(proc_path);
    argv.first().and_then(|arg0| {
        Path::new(arg0)
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.to_string())
    })
}

/// Reads the NUL-separated argument vector. Empty when the file is empty
/// (kernel threads) or unreadable.
pub fn read_argv(proc_path: &Path) -> Vec<String> {
    let Ok(content) = fs::read(proc_path.join("cmdline")) else {
        return Vec::new();
    };
    content
        .split(|&byte| byte == 0u8)
        .filter(|arg| !arg.is_empty())
        .filter_map(|arg| std::str::from_utf8(arg).ok())
        .map(|arg| arg.to_string())
        .collect()
}

/// Assembles the immutable base record for one process entry. `children` is
/// left empty; adjacency is derived once every record of the pass is known.
pub fn read_record(proc_path: &Path) -> io::Result<ProcessRecord> {
    let stat = read_stat(proc_path)?;
    let comm = read_comm(proc_path).unwrap_or_else(|| stat.comm.clone());
    let argv = read_argv(proc_path);

    Ok(ProcessRecord {
        pid: stat.pid,
        ppid: stat.ppid,
        start_time: stat.start_time,
        nice: stat.nice,
        virtual_memory_bytes: stat.vsize,
        cpu_ticks: stat.utime + stat.stime,
        comm,
        argv,
        pgrp: stat.pgrp,
        last_processor: stat.last_processor,
        children: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const STAT_LINE: &str = "1234 (test_process) S 1 1234 1234 0 -1 4194304 100 0 0 0 1000 500 0 0 20 5 1 0 12345 12345678 1234 18446744073709551615 4194304 4238788 140736466511168 0 0 0 0 0 0 0 0 0 17 3 0 0 0 0 0";

    #[test]
    fn test_parse_stat_plain_comm() {
        let stat = parse_stat(STAT_LINE).expect("valid stat line");
        assert_eq!(stat.pid, 1234);
        assert_eq!(stat.comm, "test_process");
        assert_eq!(stat.ppid, 1);
        assert_eq!(stat.pgrp, 1234);
        assert_eq!(stat.utime, 1000);
        assert_eq!(stat.stime, 500);
        assert_eq!(stat.nice, 5);
        assert_eq!(stat.start_time, 12345);
        assert_eq!(stat.vsize, 12345678);
        assert_eq!(stat.last_processor, 3);
    }

    #[test]
    fn test_parse_stat_comm_with_spaces_and_parens() {
        // tmux and browser helpers put spaces and ')' inside comm.
        let line = "77 (tmux: server (1)) S 1 77 77 0 -1 4194304 0 0 0 0 7 8 0 0 20 0 1 0 99 4096 10 18446744073709551615 0 0 0 0 0 0 0 0 0 0 0 0 17 1 0 0 0 0 0";
        let stat = parse_stat(line).expect("valid stat line");
        assert_eq!(stat.pid, 77);
        assert_eq!(stat.comm, "tmux: server (1)");
        assert_eq!(stat.ppid, 1);
        assert_eq!(stat.utime, 7);
        assert_eq!(stat.stime, 8);
        assert_eq!(stat.last_processor, 1);
    }

    #[test]
    fn test_parse_stat_truncated_line_fails() {
        assert!(parse_stat("1234 (short) S 1 2").is_err());
        assert!(parse_stat("not a stat line").is_err());
        assert!(parse_stat("").is_err());
    }

    #[test]
    fn test_parse_stat_missing_processor_defaults() {
        // Fields through vsize (23) only, as an ancient kernel would report.
        let line = "9 (old) S 1 9 9 0 -1 0 0 0 0 0 1 2 0 0 20 0 1 0 50 1024";
        let stat = parse_stat(line).expect("valid stat line");
        assert_eq!(stat.last_processor, 0);
    }

    #[test]
    fn test_read_record_from_fixture() {
        let dir = tempdir().expect("tempdir");
        std::fs::write(dir.path().join("stat"), STAT_LINE).expect("write stat");
        std::fs::write(dir.path().join("comm"), "test_process\n").expect("write comm");
        std::fs::write(
            dir.path().join("cmdline"),
            b"/usr/bin/test_process\0--flag\0value\0",
        )
        .expect("write cmdline");

        let record = read_record(dir.path()).expect("readable record");
        assert_eq!(record.pid, 1234);
        assert_eq!(record.ppid, 1);
        assert_eq!(record.comm, "test_process");
        assert_eq!(
            record.argv,
            vec!["/usr/bin/test_process", "--flag", "value"]
        );
        assert_eq!(record.cpu_ticks, 1500);
        assert_eq!(record.virtual_memory_bytes, 12345678);
        assert!(record.children.is_empty());
    }

    #[test]
    fn test_read_record_kernel_thread_degrades_to_empty_argv() {
        let dir = tempdir().expect("tempdir");
        let line = "2 (kthreadd) S 0 0 0 0 -1 2129984 0 0 0 0 0 3 0 0 20 0 1 0 4 0 0 18446744073709551615 0 0 0 0 0 0 0 0 0 0 0 0 17 0 0 0 0 0 0";
        std::fs::write(dir.path().join("stat"), line).expect("write stat");
        std::fs::write(dir.path().join("comm"), "kthreadd\n").expect("write comm");
        std::fs::write(dir.path().join("cmdline"), b"").expect("write cmdline");

        let record = read_record(dir.path()).expect("readable record");
        assert_eq!(record.pid, 2);
        assert_eq!(record.ppid, 0);
        assert_eq!(record.comm, "kthreadd");
        assert!(record.argv.is_empty());
    }

    #[test]
    fn test_read_comm_falls_back_to_cmdline_basename() {
        let dir = tempdir().expect("tempdir");
        std::fs::write(dir.path().join("cmdline"), b"/opt/app/bin/worker\0-q\0")
            .expect("write cmdline");
        assert_eq!(read_comm(dir.path()).as_deref(), Some("worker"));
    }

    #[test]
    fn test_read_record_missing_stat_fails() {
        let dir = tempdir().expect("tempdir");
        assert!(read_record(dir.path()).is_err());
    }
}
