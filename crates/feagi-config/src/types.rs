// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `feagi_vision.toml`. They are plain data; the numerical crates build their own validated
//! parameter types from them.

use serde::{Deserialize, Deserializer, Serialize};

/// Environment variable set by SLURM with the CPUs allotted to the task
pub const SLURM_CPUS_ENV: &str = "SLURM_CPUS_PER_TASK";

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct VisionConfig {
    pub system: SystemConfig,
    pub geometry: GeometryConfig,
    pub kwta: KwtaConfig,
    pub neigh_inhib: NeighInhibConfig,
    pub pooling: PoolingConfig,
}

/// System-level configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Worker threads for parallel filters (0 = auto-detect)
    pub max_workers: usize,
    pub log_level: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            max_workers: 0,
            log_level: "info".to_string(),
        }
    }
}

impl SystemConfig {
    /// Worker count to use: `max_workers` if set, else [`detect_workers`]
    pub fn resolved_workers(&self) -> usize {
        if self.max_workers > 0 {
            self.max_workers
        } else {
            detect_workers()
        }
    }
}

/// Workers available to this process: `SLURM_CPUS_PER_TASK` when set to a positive
/// number, otherwise the machine's available parallelism
pub fn detect_workers() -> usize {
    std::env::var(SLURM_CPUS_ENV)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
}

/// Simple-cell filtering geometry; pairs are `[x, y]`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GeometryConfig {
    pub filter_size: [usize; 2],
    pub spacing: [usize; 2],
    /// Raised to the filter's right half at build time if smaller
    pub border: [usize; 2],
    /// Convolution gain
    pub gain: f32,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            filter_size: [12, 12],
            spacing: [4, 4],
            border: [0, 0],
            gain: 2.0,
        }
    }
}

/// FFFB inhibition for one level
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FffbConfig {
    pub on: bool,
    pub gi: f32,
    pub ff: f32,
    pub fb: f32,
    pub fb_tau: f32,
    pub max_vs_avg: f32,
    pub ff0: f32,
}

impl Default for FffbConfig {
    fn default() -> Self {
        Self {
            on: true,
            gi: 1.8,
            ff: 1.0,
            fb: 1.0,
            fb_tau: 1.4,
            max_vs_avg: 0.0,
            ff0: 0.1,
        }
    }
}

impl FffbConfig {
    /// Pool-level defaults: the layer defaults with a stronger `gi`
    pub fn pool_default() -> Self {
        Self {
            gi: 2.0,
            ..Self::default()
        }
    }
}

/// `[kwta.pool]` as written in the file
#[derive(Deserialize)]
struct PoolFffbTable {
    on: Option<bool>,
    gi: Option<f32>,
    ff: Option<f32>,
    fb: Option<f32>,
    fb_tau: Option<f32>,
    max_vs_avg: Option<f32>,
    ff0: Option<f32>,
}

/// Fill keys missing from a `[kwta.pool]` table from [`FffbConfig::pool_default`]
fn deserialize_pool_fffb<'de, D>(deserializer: D) -> Result<FffbConfig, D::Error>
where
    D: Deserializer<'de>,
{
    let table = PoolFffbTable::deserialize(deserializer)?;
    let base = FffbConfig::pool_default();
    Ok(FffbConfig {
        on: table.on.unwrap_or(base.on),
        gi: table.gi.unwrap_or(base.gi),
        ff: table.ff.unwrap_or(base.ff),
        fb: table.fb.unwrap_or(base.fb),
        fb_tau: table.fb_tau.unwrap_or(base.fb_tau),
        max_vs_avg: table.max_vs_avg.unwrap_or(base.max_vs_avg),
        ff0: table.ff0.unwrap_or(base.ff0),
    })
}

/// Noisy-XX1 activation settings
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Xx1Config {
    pub thr: f32,
    pub gain: f32,
    pub nvar: f32,
    pub sig_mult: f32,
    pub sig_mult_pow: f32,
    pub sig_gain: f32,
    pub interp_range: f32,
    pub gain_cor_range: f32,
    pub gain_cor: f32,
}

impl Default for Xx1Config {
    fn default() -> Self {
        Self {
            thr: 0.5,
            gain: 80.0,
            nvar: 0.01,
            sig_mult: 0.33,
            sig_mult_pow: 0.8,
            sig_gain: 3.0,
            interp_range: 0.01,
            gain_cor_range: 10.0,
            gain_cor: 0.1,
        }
    }
}

/// Values for the excitatory, leak, inhibitory and potassium channels
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ChansConfig {
    pub e: f32,
    pub l: f32,
    pub i: f32,
    pub k: f32,
}

/// kWTA solver configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct KwtaConfig {
    pub on: bool,
    pub iters: usize,
    pub del_act_thr: f32,
    pub act_tau: f32,
    pub gbar: ChansConfig,
    pub erev: ChansConfig,
    pub layer: FffbConfig,
    /// Keys missing from a `[kwta.pool]` table take [`FffbConfig::pool_default`]
    #[serde(deserialize_with = "deserialize_pool_fffb")]
    pub pool: FffbConfig,
    pub xx1: Xx1Config,
}

impl Default for KwtaConfig {
    fn default() -> Self {
        Self {
            on: true,
            iters: 20,
            del_act_thr: 0.005,
            act_tau: 3.0,
            gbar: ChansConfig {
                e: 0.5,
                l: 0.1,
                i: 1.0,
                k: 1.0,
            },
            erev: ChansConfig {
                e: 1.0,
                l: 0.3,
                i: 0.3,
                k: 0.1,
            },
            layer: FffbConfig::default(),
            pool: FffbConfig::pool_default(),
            xx1: Xx1Config::default(),
        }
    }
}

/// Neighbor inhibition configuration
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NeighInhibConfig {
    pub on: bool,
    pub gi: f32,
}

impl Default for NeighInhibConfig {
    fn default() -> Self {
        Self { on: false, gi: 0.6 }
    }
}

/// Max-pooling and reconstruction configuration; pairs are `[x, y]`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PoolingConfig {
    pub size: [usize; 2],
    pub spacing: [usize; 2],
    /// Reconstruct from one random cell per pool instead of the whole pool
    pub randomize_unpool: bool,
    /// Fixed RNG seed for randomised un-pooling (entropy when absent)
    pub seed: Option<u64>,
}

impl Default for PoolingConfig {
    fn default() -> Self {
        Self {
            size: [2, 2],
            spacing: [2, 2],
            randomize_unpool: true,
            seed: None,
        }
    }
}
