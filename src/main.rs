//! proc-tree-sampler - live process-tree sampling from the command line.
//!
//! The default mode runs the cooperative host loop: a fixed tick drives an
//! interval timer, the timer decides when to resample the process table, and
//! each fresh snapshot is reported on the terminal. Everything the loop needs
//! is constructed here and passed down explicitly; there is no ambient
//! sampler or timer state.

mod cli;
mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{debug, error, info, warn, Level};

use proc_tree_sampler::sampler::ProcessTableSampler;
use proc_tree_sampler::snapshot::{Pid, ProcessSnapshot};
use proc_tree_sampler::timer::{IntervalTimer, PROGRAM_START};
use proc_tree_sampler::walk::{count_descendants, WalkError};

use crate::cli::{Args, Commands};
use crate::config::{resolve_config, show_config, validate_config, Config};

fn main() -> Result<()> {
    let args = Args::parse();

    // Early config resolution for show/check modes
    if args.show_config || args.check_config {
        let config = resolve_config(&args)?;

        if args.check_config {
            if let Err(e) = validate_config(&config) {
                eprintln!("❌ Configuration invalid: {e}");
                std::process::exit(1);
            }
            println!("✅ Configuration is valid");
            return Ok(());
        }

        return show_config(&config, args.config_format.clone());
    }

    let config = resolve_config(&args)?;
    if let Err(e) = validate_config(&config) {
        eprintln!("❌ Configuration invalid: {e}");
        std::process::exit(1);
    }

    setup_logging(&config);

    // Handle subcommands
    if let Some(command) = &args.command {
        return match command {
            Commands::Check { pid } => commands::command_check(&config, *pid),
            Commands::Config {
                output,
                format,
                commented,
            } => commands::command_config(output.clone(), format.clone(), *commented),
            Commands::Test {
                iterations,
                verbose,
                format,
            } => commands::command_test(*iterations, *verbose, format.clone(), &config),
            Commands::GenerateTestdata {
                output,
                roots,
                count,
                max_children,
            } => commands::command_generate_testdata(
                output.clone(),
                *roots,
                *count,
                *max_children,
            ),
        };
    }

    run_host_loop(&config)
}

/// The cooperative single-threaded host loop. One thread polls the timers,
/// resamples when the sampling timer says so, and reports; a slow scan stalls
/// the loop by design.
fn run_host_loop(config: &Config) -> Result<()> {
    info!("Starting proc-tree-sampler");

    let mut sampler = ProcessTableSampler::open_at(config.proc_root())?
        .include_threads(config.include_threads());
    let mut sample_timer = IntervalTimer::new(config.sample_interval())?;
    let mut animation_timer = IntervalTimer::new(config.animation_interval())?;
    let tick = config.tick();
    let root_pid = config.root_pid();
    let max_samples = config.max_samples();
    let mut taken: u64 = 0;

    // First snapshot before the loop so consumers never start against
    // "no snapshot yet".
    match sampler.sample_once() {
        Ok(snapshot) => {
            report_snapshot(snapshot, root_pid);
            taken += 1;
        }
        Err(e) => warn!("initial sample failed: {e}"),
    }

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || {
            running.store(false, Ordering::SeqCst);
        })?;
    }

    debug!(
        interval_ms = config.sample_interval().as_millis() as u64,
        tick_ms = tick.as_millis() as u64,
        "host loop started"
    );

    while running.load(Ordering::SeqCst) {
        if let Some(max) = max_samples {
            if taken >= max {
                info!(taken, "sample budget reached");
                break;
            }
        }

        thread::sleep(tick);

        // Continuous sawtooth for the progress line; never consumes time.
        let phase = animation_timer.poll_phase();

        // Exactly one resample per fully elapsed interval, even if the loop
        // stalled across several of them.
        for _ in 0..sample_timer.poll_catch_up() {
            match sampler.sample_once() {
                Ok(snapshot) => {
                    report_snapshot(snapshot, root_pid);
                    taken += 1;
                }
                Err(e) => error!("sample failed: {e}"),
            }
        }

        render_progress(phase, taken);
    }

    eprintln!();
    sampler.close();
    info!("proc-tree-sampler stopped gracefully");
    Ok(())
}

/// Logs a one-line summary of a fresh snapshot.
fn report_snapshot(snapshot: &ProcessSnapshot, root_pid: Pid) {
    match count_descendants(snapshot, root_pid) {
        Ok(descendants) => info!(
            processes = snapshot.len(),
            roots = snapshot.roots().len(),
            root_pid,
            descendants,
            "snapshot"
        ),
        Err(WalkError::UnknownPid(_)) => info!(
            processes = snapshot.len(),
            roots = snapshot.roots().len(),
            root_pid,
            "snapshot (root pid not present)"
        ),
        Err(e) => warn!(root_pid, "snapshot query failed: {e}"),
    }
}

/// Single status line on stderr, rewritten in place each tick so it does not
/// interleave with the log stream.
fn render_progress(phase: f32, taken: u64) {
    const SPINNER: [char; 4] = ['|', '/', '-', '\\'];
    let glyph = SPINNER[(phase * SPINNER.len() as f32) as usize % SPINNER.len()];
    eprint!(
        "\r{glyph} snapshots {taken} | up {}s ",
        PROGRAM_START.elapsed().as_secs()
    );
    let _ = std::io::stderr().flush();
}

/// Installs the global tracing subscriber from the effective config.
fn setup_logging(config: &Config) {
    let log_level = match config.log_level.as_deref() {
        // Off not fully supported, use ERROR as minimal
        Some("off") | Some("error") => Level::ERROR,
        Some("warn") => Level::WARN,
        Some("debug") => Level::DEBUG,
        Some("trace") => Level::TRACE,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    info!("Logging initialized with level: {log_level}");
}
