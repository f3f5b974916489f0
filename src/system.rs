//! System facts read from the host.
//!
//! Snapshot records keep raw kernel counters (jiffies, clock ticks); the
//! helpers here supply the conversion constants a consumer needs to present
//! them in human units.

use once_cell::sync::Lazy;
use std::fs;
use std::io;
use std::path::Path;

/// Get system clock ticks per second (usually 100, but can vary).
fn get_clk_tck() -> f64 {
    #[cfg(unix)]
    {
        // SAFETY: sysconf is safe to call with _SC_CLK_TCK
        // Returns -1 on error, 0 if undefined - both are handled by the > 0 check
        unsafe {
            let tck = libc::sysconf(libc::_SC_CLK_TCK);
            if tck > 0 {
                return tck as f64;
            }
        }
    }
    // Fallback to common default for error cases or non-Unix platforms
    100.0
}

/// System clock ticks per second (for presenting raw tick/jiffy counters).
pub static CLK_TCK: Lazy<f64> = Lazy::new(get_clk_tck);

/// Reads system uptime in seconds from `<root>/uptime`.
pub fn read_uptime(root: &Path) -> io::Result<f64> {
    let content = fs::read_to_string(root.join("uptime"))?;
    parse_uptime(&content)
}

fn parse_uptime(content: &str) -> io::Result<f64> {
    content
        .split_whitespace()
        .next()
        .and_then(|value| value.parse().ok())
        .ok_or_else(|| io::Error::other("invalid uptime format"))
}

/// Reads the boot time in unix seconds from the `btime` line of `<root>/stat`.
pub fn read_btime(root: &Path) -> io::Result<u64> {
    let content = fs::read_to_string(root.join("stat"))?;
    parse_btime(&content)
}

fn parse_btime(content: &str) -> io::Result<u64> {
    content
        .lines()
        .find_map(|line| line.strip_prefix("btime "))
        .and_then(|value| value.trim().parse().ok())
        .ok_or_else(|| io::Error::other("no btime line in stat"))
}
