// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Logging driven by `[system] log_level` in `feagi_vision.toml`

use anyhow::Result;
use feagi_vision_config::VisionConfig;
use feagi_vision_observability::{
    env_filter, init_logging_with_level, CrateDebugFlags, EnvFilter, LogFormat,
};

/// Filter with `system.log_level` as the base level and `debug` for the flagged crates
pub fn log_filter(config: &VisionConfig, debug_flags: &CrateDebugFlags) -> Result<EnvFilter> {
    env_filter(debug_flags, &config.system.log_level)
}

/// Install console logging at the configured level
///
/// # Errors
/// Fails on an unparsable level or when a global subscriber is already installed.
pub fn init_logging_from_config(
    config: &VisionConfig,
    debug_flags: &CrateDebugFlags,
    format: LogFormat,
) -> Result<()> {
    init_logging_with_level(debug_flags, &config.system.log_level, format)
}
