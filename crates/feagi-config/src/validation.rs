// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Every check runs and all violations are reported together, so a bad file can be fixed
//! in one pass.

use crate::{ConfigError, ConfigResult, FffbConfig, VisionConfig};

/// Log levels accepted in `system.log_level` (case-insensitive)
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    /// A size or spacing component is zero
    ZeroExtent { field: String },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroExtent { field } => {
                write!(f, "{} must be at least 1 on both axes", field)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigValidationError {
    ConfigValidationError::InvalidValue {
        field: field.to_string(),
        reason: reason.into(),
    }
}

/// Validate the complete configuration
///
/// Checks for:
/// - Zero filter sizes, spacings and pool sizes
/// - Pool spacing equal to or half of the pool size
/// - Negative gains and non-positive time constants
/// - Zero kWTA iterations
/// - Unknown log levels
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every violation
pub fn validate_config(config: &VisionConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_system(config, &mut errors);
    validate_geometry(config, &mut errors);
    validate_kwta(config, &mut errors);
    validate_pooling(config, &mut errors);

    if config.neigh_inhib.gi < 0.0 {
        errors.push(invalid("neigh_inhib.gi", "must be non-negative"));
    }

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }

    Ok(())
}

fn validate_system(config: &VisionConfig, errors: &mut Vec<ConfigValidationError>) {
    let level = config.system.log_level.to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(invalid(
            "system.log_level",
            format!("must be one of {}", LOG_LEVELS.join(", ")),
        ));
    }
}

fn validate_geometry(config: &VisionConfig, errors: &mut Vec<ConfigValidationError>) {
    let geom = &config.geometry;
    for (field, pair) in [
        ("geometry.filter_size", geom.filter_size),
        ("geometry.spacing", geom.spacing),
    ] {
        if pair.contains(&0) {
            errors.push(ConfigValidationError::ZeroExtent {
                field: field.to_string(),
            });
        }
    }
    if geom.gain < 0.0 {
        errors.push(invalid("geometry.gain", "must be non-negative"));
    }
}

fn validate_fffb(level: &str, fffb: &FffbConfig, errors: &mut Vec<ConfigValidationError>) {
    for (name, value) in [("gi", fffb.gi), ("ff", fffb.ff), ("fb", fffb.fb)] {
        if value < 0.0 {
            errors.push(invalid(&format!("{level}.{name}"), "must be non-negative"));
        }
    }
    if fffb.fb_tau <= 0.0 {
        errors.push(invalid(&format!("{level}.fb_tau"), "must be positive"));
    }
    if !(0.0..=1.0).contains(&fffb.max_vs_avg) {
        errors.push(invalid(
            &format!("{level}.max_vs_avg"),
            "must be between 0.0 and 1.0",
        ));
    }
}

fn validate_kwta(config: &VisionConfig, errors: &mut Vec<ConfigValidationError>) {
    let kwta = &config.kwta;
    if kwta.iters == 0 {
        errors.push(invalid("kwta.iters", "must be at least 1"));
    }
    if kwta.act_tau <= 0.0 {
        errors.push(invalid("kwta.act_tau", "must be positive"));
    }
    if kwta.del_act_thr < 0.0 {
        errors.push(invalid("kwta.del_act_thr", "must be non-negative"));
    }
    validate_fffb("kwta.layer", &kwta.layer, errors);
    validate_fffb("kwta.pool", &kwta.pool, errors);

    let xx1 = &kwta.xx1;
    if xx1.gain < 0.0 {
        errors.push(invalid("kwta.xx1.gain", "must be non-negative"));
    }
    for (name, value) in [
        ("nvar", xx1.nvar),
        ("interp_range", xx1.interp_range),
        ("gain_cor_range", xx1.gain_cor_range),
    ] {
        if value <= 0.0 {
            errors.push(invalid(&format!("kwta.xx1.{name}"), "must be positive"));
        }
    }
    if xx1.thr == kwta.erev.e {
        errors.push(invalid(
            "kwta.erev.e",
            "must differ from the activation threshold kwta.xx1.thr",
        ));
    }
}

fn validate_pooling(config: &VisionConfig, errors: &mut Vec<ConfigValidationError>) {
    let pooling = &config.pooling;
    let mut zero = false;
    for (field, pair) in [
        ("pooling.size", pooling.size),
        ("pooling.spacing", pooling.spacing),
    ] {
        if pair.contains(&0) {
            zero = true;
            errors.push(ConfigValidationError::ZeroExtent {
                field: field.to_string(),
            });
        }
    }
    if zero {
        return;
    }
    for axis in 0..2 {
        let (size, spacing) = (pooling.size[axis], pooling.spacing[axis]);
        if spacing != size && spacing * 2 != size {
            errors.push(invalid(
                "pooling.spacing",
                format!("must equal pooling.size or half of it (size {size}, spacing {spacing})"),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(config: &VisionConfig) -> String {
        match validate_config(config) {
            Err(ConfigError::ValidationError(msg)) => msg,
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        let result = validate_config(&VisionConfig::default());
        if let Err(e) = &result {
            eprintln!("Validation error: {}", e);
        }
        assert!(result.is_ok());
    }

    #[test]
    fn test_zero_spacing() {
        let mut config = VisionConfig::default();
        config.geometry.spacing = [4, 0];

        let msg = messages(&config);
        assert!(msg.contains("geometry.spacing"));
        assert!(msg.contains("at least 1"));
    }

    #[test]
    fn test_pool_spacing_must_match_size() {
        let mut config = VisionConfig::default();
        config.pooling.size = [4, 4];
        config.pooling.spacing = [2, 2];
        assert!(validate_config(&config).is_ok());

        config.pooling.spacing = [3, 2];
        let msg = messages(&config);
        assert!(msg.contains("pooling.spacing"));
        assert!(msg.contains("size 4, spacing 3"));
    }

    #[test]
    fn test_all_violations_reported_together() {
        let mut config = VisionConfig::default();
        config.kwta.iters = 0;
        config.kwta.pool.gi = -1.0;
        config.kwta.layer.fb_tau = 0.0;
        config.kwta.xx1.nvar = 0.0;
        config.neigh_inhib.gi = -0.5;

        let msg = messages(&config);
        for field in [
            "kwta.iters",
            "kwta.pool.gi",
            "kwta.layer.fb_tau",
            "kwta.xx1.nvar",
            "neigh_inhib.gi",
        ] {
            assert!(msg.contains(field), "missing {field} in:\n{msg}");
        }
        assert_eq!(msg.lines().count(), 6);
    }

    #[test]
    fn test_unknown_log_level() {
        let mut config = VisionConfig::default();
        config.system.log_level = "WARN".to_string();
        assert!(validate_config(&config).is_ok());

        config.system.log_level = "loud".to_string();
        assert!(messages(&config).contains("system.log_level"));
    }
}
