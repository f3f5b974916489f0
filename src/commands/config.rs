//! Configuration file generation command.

use anyhow::Result;
use std::fs;
use std::path::PathBuf;

use crate::cli::ConfigFormat;
use crate::config::Config;

/// Generates a default configuration file in the requested format, to a file
/// or to stdout.
pub fn command_config(
    output: Option<PathBuf>,
    format: ConfigFormat,
    commented: bool,
) -> Result<()> {
    let config = Config::default();

    let mut content = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(&config)?,
        ConfigFormat::Toml => toml::to_string(&config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(&config)?,
    };

    // Comments are only meaningful for YAML/TOML output.
    if commented && !matches!(format, ConfigFormat::Json) {
        content = add_config_comments(content);
    }

    match output {
        Some(path) => {
            fs::write(&path, &content)?;
            println!("✅ Wrote default configuration to {}", path.display());
        }
        None => println!("{content}"),
    }

    Ok(())
}

/// Prefixes known keys with a short explanation line.
fn add_config_comments(body: String) -> String {
    const COMMENTS: &[(&str, &str)] = &[
        ("proc_root", "Process table root to sample ('/proc')"),
        ("include_threads", "Also sample per-process threads"),
        (
            "sample_interval_ms",
            "Milliseconds between snapshots of the process table",
        ),
        (
            "animation_interval_ms",
            "Milliseconds per progress/animation cycle",
        ),
        ("tick_ms", "Host loop tick; must not exceed the sample interval"),
        ("max_samples", "Stop after N snapshots; 0 runs until interrupted"),
        ("root_pid", "Pid whose subtree is reported with each snapshot"),
        ("layout_radius", "Distance from a parent to each of its children"),
        (
            "layout_angular_step_deg",
            "Angular offset between adjacent siblings, in degrees",
        ),
        ("layout_depth_step", "Depth advance per generation"),
        ("log_level", "error | warn | info | debug | trace"),
    ];

    let mut out = String::from("# proc-tree-sampler default configuration\n");
    for line in body.lines() {
        let key = line.split(':').next().unwrap_or("").trim();
        let key = key.split('=').next().unwrap_or(key).trim();
        if let Some((_, comment)) = COMMENTS.iter().find(|(name, _)| *name == key) {
            out.push_str(&format!("# {comment}\n"));
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}
