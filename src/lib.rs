//! Live Linux process-tree sampling.
//!
//! This library repeatedly snapshots a `/proc` style process table, rebuilds
//! parent→child adjacency, and exposes the resulting forest read-only,
//! together with the interval timing that decouples sampling cadence from
//! however often the host loop polls.
//!
//! # Usage
//!
//! ```no_run
//! use proc_tree_sampler::sampler::ProcessTableSampler;
//! use proc_tree_sampler::timer::IntervalTimer;
//! use proc_tree_sampler::walk::count_descendants;
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut sampler = ProcessTableSampler::open()?;
//! let mut timer = IntervalTimer::new(Duration::from_millis(1000))?;
//!
//! loop {
//!     // Fires once per fully elapsed interval, however rarely we get here.
//!     for _ in 0..timer.poll_catch_up() {
//!         let snapshot = sampler.sample_once()?;
//!         println!(
//!             "{} processes, {} below pid 1",
//!             snapshot.len(),
//!             count_descendants(snapshot, 1)?
//!         );
//!     }
//!     std::thread::sleep(Duration::from_millis(16));
//! }
//! # }
//! ```
//!
//! The model is single-threaded and poll-driven: a slow scan stalls the loop
//! that runs it. See the README for the scaling implications.

pub mod procfs;
pub mod sampler;
pub mod snapshot;
pub mod system;
pub mod timer;
pub mod walk;

// Re-export main types for convenience
pub use sampler::{ProcTable, ProcessTableSampler, SampleError, DEFAULT_PROC_ROOT};
pub use snapshot::{Pid, ProcessRecord, ProcessSnapshot};
pub use timer::{IntervalTimer, TimerError, PROGRAM_START};
pub use walk::{count_descendants, positioned_walk, Layout, Position, PositionedWalk, WalkError};
