// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! Three tiers, later ones winning:
//! 1. TOML file (base values, defaults for anything missing)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{ConfigError, ConfigResult, VisionConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "feagi_vision.toml";

/// Environment variable naming an explicit configuration file
pub const CONFIG_PATH_ENV: &str = "FEAGI_VISION_CONFIG_PATH";

/// Find the vision configuration file
///
/// Search order:
/// 1. `FEAGI_VISION_CONFIG_PATH` environment variable
/// 2. Current working directory: `./feagi_vision.toml`
/// 3. Up to 5 parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by {} not found: {}",
            CONFIG_PATH_ENV,
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));
        let mut current = cwd.as_path();
        for _ in 0..5 {
            match current.parent() {
                Some(parent) => {
                    search_paths.push(parent.join(CONFIG_FILE_NAME));
                    current = parent;
                }
                None => break,
            }
        }
    }

    if let Some(path) = search_paths.iter().find(|p| p.exists()) {
        return Ok(path.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "'{}' not found in any of these locations:\n{}\n\nSet {} to specify a custom location.",
        CONFIG_FILE_NAME, search_list, CONFIG_PATH_ENV
    )))
}

/// Load configuration from TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search for config file.
/// * `cli_args` - Optional CLI argument overrides
///
/// The result is not validated; call [`crate::validate_config`] before use.
///
/// # Errors
///
/// Returns error if config file is not found or contains invalid TOML
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<VisionConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: VisionConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }

    Ok(config)
}

fn parse_flag(value: &str) -> bool {
    let value = value.to_lowercase();
    value == "true" || value == "1" || value == "yes"
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `FEAGI_VISION_WORKERS` -> `system.max_workers`
/// - `FEAGI_VISION_LOG_LEVEL` -> `system.log_level`
/// - `FEAGI_VISION_KWTA_ITERS` -> `kwta.iters`
/// - `FEAGI_VISION_KWTA_ON` -> `kwta.on`
/// - `FEAGI_VISION_NEIGH_INHIB_GI` -> `neigh_inhib.gi`
///
/// Values that do not parse are ignored.
pub fn apply_environment_overrides(config: &mut VisionConfig) {
    if let Ok(value) = env::var("FEAGI_VISION_WORKERS") {
        if let Ok(workers) = value.parse::<usize>() {
            config.system.max_workers = workers;
        }
    }
    if let Ok(value) = env::var("FEAGI_VISION_LOG_LEVEL") {
        config.system.log_level = value;
    }

    if let Ok(value) = env::var("FEAGI_VISION_KWTA_ITERS") {
        if let Ok(iters) = value.parse::<usize>() {
            config.kwta.iters = iters;
        }
    }
    if let Ok(value) = env::var("FEAGI_VISION_KWTA_ON") {
        config.kwta.on = parse_flag(&value);
    }

    if let Ok(value) = env::var("FEAGI_VISION_NEIGH_INHIB_GI") {
        if let Ok(gi) = value.parse::<f32>() {
            config.neigh_inhib.gi = gi;
        }
    }
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - Map of CLI arguments (e.g., `{"workers": "4", "kwta_on": "false"}`)
///
/// Recognised keys: `workers`, `log_level`, `kwta_iters`, `kwta_on`, `neigh_gi`.
pub fn apply_cli_overrides(config: &mut VisionConfig, cli_args: &HashMap<String, String>) {
    if let Some(value) = cli_args.get("workers") {
        if let Ok(workers) = value.parse::<usize>() {
            config.system.max_workers = workers;
        }
    }
    if let Some(value) = cli_args.get("log_level") {
        config.system.log_level = value.clone();
    }

    if let Some(value) = cli_args.get("kwta_iters") {
        if let Ok(iters) = value.parse::<usize>() {
            config.kwta.iters = iters;
        }
    }
    if let Some(value) = cli_args.get("kwta_on") {
        config.kwta.on = parse_flag(value);
    }

    if let Some(value) = cli_args.get("neigh_gi") {
        if let Ok(gi) = value.parse::<f32>() {
            config.neigh_inhib.gi = gi;
        }
    }
}
