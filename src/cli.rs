//! CLI arguments and subcommands for proc-tree-sampler.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "proc-tree-sampler",
    about = "Live Linux process-tree sampler with frame-rate-independent interval polling",
    long_about = "Live Linux process-tree sampler with frame-rate-independent interval polling.\n\n\
                  Snapshots the /proc process table on a fixed cadence, rebuilds the \
                  parent/child process forest, and reports the tree below a chosen root \
                  pid. Sampling frequency is governed by an interval timer, independent \
                  of how often the host loop ticks.",
    author = "Michael Moll <sampler@herakles.io> - Herakles IO",
    version,
    long_version = concat!(
        env!("CARGO_PKG_VERSION"),
        " (built ",
        env!("VERGEN_BUILD_TIMESTAMP"),
        ")"
    ),
    propagate_version = true,
    after_help = "Project: https://github.com/herakles-io/proc-tree-sampler — More info: https://www.herakles.io — Support: sampler@herakles.io"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Process table root to sample
    #[arg(long)]
    pub proc_root: Option<PathBuf>,

    /// Milliseconds between snapshots
    #[arg(short = 'i', long)]
    pub interval_ms: Option<u64>,

    /// Milliseconds per animation/progress cycle
    #[arg(long)]
    pub animation_ms: Option<u64>,

    /// Host loop tick in milliseconds
    #[arg(long)]
    pub tick_ms: Option<u64>,

    /// Stop after N snapshots (0 = run until interrupted)
    #[arg(short = 'n', long)]
    pub max_samples: Option<u64>,

    /// Pid whose subtree is reported with each snapshot
    #[arg(long)]
    pub root_pid: Option<u32>,

    /// Also sample per-process threads
    #[arg(long)]
    pub include_threads: bool,

    /// Log level
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate the process table and system requirements
    Check {
        /// Probe one process entry in depth
        #[arg(long)]
        pid: Option<u32>,
    },

    /// Generate configuration files
    Config {
        /// Output file path
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,

        /// Include comments and examples
        #[arg(long)]
        commented: bool,
    },

    /// Take snapshots and print per-snapshot statistics
    Test {
        /// Number of snapshots to take
        #[arg(short = 'n', long, default_value_t = 1)]
        iterations: usize,

        /// Print the positioned tree below the configured root pid
        #[arg(long)]
        verbose: bool,

        /// Output format for the per-snapshot report
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,
    },

    /// Generate a synthetic /proc-shaped fixture directory
    GenerateTestdata {
        /// Output directory path
        #[arg(short = 'o', long, default_value = "testdata")]
        output: PathBuf,

        /// Number of root processes in the synthetic forest
        #[arg(long, default_value_t = 3)]
        roots: usize,

        /// Total number of processes to generate
        #[arg(long, default_value_t = 64)]
        count: usize,

        /// Maximum children attached to any one process
        #[arg(long, default_value_t = 6)]
        max_children: usize,
    },
}
