//! Runtime configuration for proc-tree-sampler.
//!
//! Configuration is layered: hard defaults, then an optional config file
//! (YAML/JSON/TOML picked by extension), then CLI flags field by field.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use proc_tree_sampler::sampler::DEFAULT_PROC_ROOT;
use proc_tree_sampler::walk::Layout;

use crate::cli::{Args, ConfigFormat};

pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_ANIMATION_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_TICK_MS: u64 = 16;
pub const DEFAULT_ROOT_PID: u32 = 1;

/// Effective runtime configuration. Every field is optional so that file and
/// CLI layers can override selectively; accessors apply the defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Process table
    pub proc_root: Option<PathBuf>,
    pub include_threads: Option<bool>,

    // Sampling cadence
    pub sample_interval_ms: Option<u64>,
    pub animation_interval_ms: Option<u64>,
    pub tick_ms: Option<u64>,
    /// Stop after this many snapshots; 0 means run until interrupted.
    pub max_samples: Option<u64>,

    // Tree reporting
    pub root_pid: Option<u32>,
    pub layout_radius: Option<f32>,
    pub layout_angular_step_deg: Option<f32>,
    pub layout_depth_step: Option<f32>,

    // Logging
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            proc_root: Some(PathBuf::from(DEFAULT_PROC_ROOT)),
            include_threads: Some(false),
            sample_interval_ms: Some(DEFAULT_SAMPLE_INTERVAL_MS),
            animation_interval_ms: Some(DEFAULT_ANIMATION_INTERVAL_MS),
            tick_ms: Some(DEFAULT_TICK_MS),
            max_samples: Some(0),
            root_pid: Some(DEFAULT_ROOT_PID),
            layout_radius: Some(100.0),
            layout_angular_step_deg: Some(15.0),
            layout_depth_step: Some(35.0),
            log_level: Some("info".into()),
        }
    }
}

impl Config {
    pub fn proc_root(&self) -> PathBuf {
        self.proc_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PROC_ROOT))
    }

    pub fn include_threads(&self) -> bool {
        self.include_threads.unwrap_or(false)
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms.unwrap_or(DEFAULT_SAMPLE_INTERVAL_MS))
    }

    pub fn animation_interval(&self) -> Duration {
        Duration::from_millis(
            self.animation_interval_ms
                .unwrap_or(DEFAULT_ANIMATION_INTERVAL_MS),
        )
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.unwrap_or(DEFAULT_TICK_MS))
    }

    /// `None` means unbounded.
    pub fn max_samples(&self) -> Option<u64> {
        match self.max_samples.unwrap_or(0) {
            0 => None,
            n => Some(n),
        }
    }

    pub fn root_pid(&self) -> u32 {
        self.root_pid.unwrap_or(DEFAULT_ROOT_PID)
    }

    pub fn layout(&self) -> Layout {
        let defaults = Layout::default();
        Layout {
            radius: self.layout_radius.unwrap_or(defaults.radius),
            angular_step: self
                .layout_angular_step_deg
                .map(|deg| deg.to_radians())
                .unwrap_or(defaults.angular_step),
            depth_step: self.layout_depth_step.unwrap_or(defaults.depth_step),
        }
    }
}

/// Resolves configuration from CLI args, config file, and defaults.
/// Precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> Result<Config> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    if let Some(root) = &args.proc_root {
        config.proc_root = Some(root.clone());
    }
    if args.include_threads {
        config.include_threads = Some(true);
    }
    if let Some(interval) = args.interval_ms {
        config.sample_interval_ms = Some(interval);
    }
    if let Some(animation) = args.animation_ms {
        config.animation_interval_ms = Some(animation);
    }
    if let Some(tick) = args.tick_ms {
        config.tick_ms = Some(tick);
    }
    if let Some(max) = args.max_samples {
        config.max_samples = Some(max);
    }
    if let Some(pid) = args.root_pid {
        config.root_pid = Some(pid);
    }
    if let Some(level) = &args.log_level {
        config.log_level = Some(format!("{level:?}").to_lowercase());
    }

    // Fill anything the file and CLI left unset, so the effective config is
    // fully populated (TOML output cannot express a null).
    let defaults = Config::default();
    config.proc_root = config.proc_root.or(defaults.proc_root);
    config.include_threads = config.include_threads.or(defaults.include_threads);
    config.sample_interval_ms = config.sample_interval_ms.or(defaults.sample_interval_ms);
    config.animation_interval_ms = config
        .animation_interval_ms
        .or(defaults.animation_interval_ms);
    config.tick_ms = config.tick_ms.or(defaults.tick_ms);
    config.max_samples = config.max_samples.or(defaults.max_samples);
    config.root_pid = config.root_pid.or(defaults.root_pid);
    config.layout_radius = config.layout_radius.or(defaults.layout_radius);
    config.layout_angular_step_deg = config
        .layout_angular_step_deg
        .or(defaults.layout_angular_step_deg);
    config.layout_depth_step = config.layout_depth_step.or(defaults.layout_depth_step);
    config.log_level = config.log_level.or(defaults.log_level);

    Ok(config)
}

/// Enhanced configuration loading with multiple format support.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = if let Some(p) = path {
        p.to_path_buf()
    } else {
        // Try default locations
        let defaults = [
            "/etc/proc-tree-sampler/config.yaml",
            "/etc/proc-tree-sampler/config.yml",
            "/etc/proc-tree-sampler/config.json",
            "./proc-tree-sampler.yaml",
            "./proc-tree-sampler.yml",
            "./proc-tree-sampler.json",
        ];

        match defaults.iter().find(|p| Path::new(p).exists()) {
            Some(found) => PathBuf::from(found),
            None => return Ok(Config::default()),
        }
    };

    if !path.exists() {
        bail!("config file not found: {}", path.display());
    }

    let content = fs::read_to_string(&path)?;

    match path.extension().and_then(|s| s.to_str()) {
        Some("json") => {
            let config: Config = serde_json::from_str(&content)?;
            info!("Loaded JSON configuration from: {}", path.display());
            Ok(config)
        }
        Some("toml") => {
            let config: Config = toml::from_str(&content)?;
            info!("Loaded TOML configuration from: {}", path.display());
            Ok(config)
        }
        _ => {
            // Default to YAML
            let config: Config = serde_yaml::from_str(&content)?;
            info!("Loaded YAML configuration from: {}", path.display());
            Ok(config)
        }
    }
}

/// Validate effective config (used by --check-config and at startup).
pub fn validate_config(cfg: &Config) -> Result<()> {
    if cfg.sample_interval_ms.unwrap_or(DEFAULT_SAMPLE_INTERVAL_MS) == 0 {
        bail!("sample_interval_ms must be positive");
    }
    if cfg
        .animation_interval_ms
        .unwrap_or(DEFAULT_ANIMATION_INTERVAL_MS)
        == 0
    {
        bail!("animation_interval_ms must be positive");
    }
    let tick = cfg.tick_ms.unwrap_or(DEFAULT_TICK_MS);
    if tick == 0 {
        bail!("tick_ms must be positive");
    }
    if tick > cfg.sample_interval_ms.unwrap_or(DEFAULT_SAMPLE_INTERVAL_MS) {
        bail!("tick_ms must not exceed sample_interval_ms");
    }
    if cfg.root_pid.unwrap_or(DEFAULT_ROOT_PID) == 0 {
        bail!("root_pid must be at least 1");
    }

    let layout = cfg.layout();
    if !layout.radius.is_finite() || !layout.depth_step.is_finite() {
        bail!("layout radius and depth step must be finite");
    }
    if layout.angular_step == 0.0 || !layout.angular_step.is_finite() {
        bail!("layout angular step must be a non-zero angle");
    }

    Ok(())
}

/// Shows configuration in requested format.
pub fn show_config(config: &Config, format: ConfigFormat) -> Result<()> {
    let output = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    };

    println!("{output}");
    Ok(())
}
