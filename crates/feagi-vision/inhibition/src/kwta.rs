// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # kWTA Solver
//!
//! Fixed-point iteration from excitatory drive (`Ge`) to sparse, normalised activation.
//!
//! ## Unit Dynamics
//!
//! ```text
//! ge_thr(gi) = (gbar.i × gi × (erev.i - thr) + gbar.l × (erev.l - thr)) / (thr - erev.e)
//! raw_act    = noisy_xx1(ge × gbar.e - ge_thr(gi))
//! act       += act_dt × (raw_act - act)
//! ```
//!
//! ## Iteration
//!
//! Each iteration recomputes inhibition from the previous iteration's activation stats, then
//! updates every unit once. The loop stops early once `iteration > 2` and the largest
//! per-unit change is below `del_act_thr`. Running out of iterations is not an error; the
//! last state is returned and [`KwtaReport::converged`] is false.
//!
//! Two granularities:
//! - [`Kwta::kwta_layer`]: one inhibition record for the whole tensor
//! - [`Kwta::kwta_pool`]: `[LayerY, LayerX, PoolY, PoolX]`, where each unit gets the larger of
//!   the layer and its pool's inhibition

use feagi_vision_filter::{ensure_shape, ShapeOutcome};
use ndarray::{Array, Array4, Dimension};
use tracing::{debug, warn};

use crate::chans::Chans;
use crate::error::{InhibitionError, Result};
use crate::fffb::{FffbParams, Inhib, Inhibs};
use crate::nxx1::Nxx1Params;

/// Plain kWTA settings, validated by [`Kwta::new`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KwtaParams {
    /// Whether callers should run kWTA at all
    pub on: bool,
    /// Maximum iterations per solve
    pub iters: usize,
    /// Early-stop threshold on the largest activation change
    pub del_act_thr: f32,
    /// Layer-level inhibition
    pub layer: FffbParams,
    /// Pool-level inhibition (only used by [`Kwta::kwta_pool`])
    pub pool: FffbParams,
    /// Activation function
    pub xx1: Nxx1Params,
    /// Activation integration time constant
    pub act_tau: f32,
    /// Maximal conductances
    pub gbar: Chans,
    /// Reversal potentials
    pub erev: Chans,
}

impl Default for KwtaParams {
    fn default() -> Self {
        Self {
            on: true,
            iters: 20,
            del_act_thr: 0.005,
            layer: FffbParams::default(),
            pool: FffbParams {
                gi: 2.0,
                ..FffbParams::default()
            },
            xx1: Nxx1Params::default(),
            act_tau: 3.0,
            // gbar.e = 0.5 suits inputs normalised to 1
            gbar: Chans::new(0.5, 0.1, 1.0, 1.0),
            erev: Chans::new(1.0, 0.3, 0.3, 0.1),
        }
    }
}

impl KwtaParams {
    pub fn validate(&self) -> Result<()> {
        if self.iters == 0 {
            return Err(InhibitionError::invalid("kwta.iters", "must be at least 1"));
        }
        if !(self.act_tau > 0.0) {
            return Err(InhibitionError::invalid(
                "kwta.act_tau",
                format!("must be positive, got {}", self.act_tau),
            ));
        }
        if self.del_act_thr < 0.0 {
            return Err(InhibitionError::invalid(
                "kwta.del_act_thr",
                "must be non-negative",
            ));
        }
        // ge_thr divides by thr - erev.e
        if self.xx1.thr() == self.erev.e {
            return Err(InhibitionError::invalid(
                "kwta.erev.e",
                "must differ from the activation threshold",
            ));
        }
        self.layer.validate("kwta.layer")?;
        self.pool.validate("kwta.pool")?;
        Ok(())
    }
}

/// What a solve did
#[derive(Debug, Clone, PartialEq)]
pub struct KwtaReport {
    /// Iterations actually run
    pub iterations: usize,
    /// Largest per-unit activation change in the last iteration
    pub max_delta_act: f32,
    /// Stopped on `del_act_thr` rather than by exhausting `iters`
    pub converged: bool,
    /// False when no external inhibition was given or its shape did not match
    pub ext_gi_used: bool,
    /// Whether the activation tensor was reallocated
    pub output: ShapeOutcome,
    /// `max_delta_act` of every iteration, in order
    pub delta_history: Vec<f32>,
}

/// Validated kWTA solver.
///
/// Built once from [`KwtaParams`]; the channel cross-terms and integration rate are derived
/// at construction and cannot go stale.
#[derive(Debug, Clone, PartialEq)]
pub struct Kwta {
    params: KwtaParams,
    erev_sub_thr: Chans,
    thr_sub_erev: Chans,
    act_dt: f32,
}

impl Kwta {
    pub fn new(params: KwtaParams) -> Result<Self> {
        params.validate()?;
        let thr = params.xx1.thr();
        Ok(Self {
            params,
            erev_sub_thr: params.erev.minus(thr),
            thr_sub_erev: params.erev.subtracted_from(thr),
            act_dt: 1.0 / params.act_tau,
        })
    }

    pub fn params(&self) -> &KwtaParams {
        &self.params
    }

    pub fn is_on(&self) -> bool {
        self.params.on
    }

    pub fn act_dt(&self) -> f32 {
        self.act_dt
    }

    /// Excitatory drive needed to reach threshold against inhibition `gi`
    #[inline]
    pub fn ge_thr_from_g(&self, gi: f32) -> f32 {
        let gbar = &self.params.gbar;
        (gbar.i * gi * self.erev_sub_thr.i + gbar.l * self.erev_sub_thr.l) / self.thr_sub_erev.e
    }

    /// One Euler step of activation; returns `(new_act, delta)`
    #[inline]
    pub fn act_from_g(&self, ge_thr: f32, ge: f32, act: f32) -> (f32, f32) {
        let raw = self
            .params
            .xx1
            .noisy_xx1(ge * self.params.gbar.e - ge_thr);
        let delta = self.act_dt * (raw - act);
        (act + delta, delta)
    }

    /// Layer-level kWTA over a tensor of any rank.
    ///
    /// `act` is resized to `raw`'s shape if needed; when it already matches, its contents
    /// are the starting activation. `ext_gi`, when its shape matches `raw`, is added to the
    /// layer inhibition per unit; otherwise it is ignored for this call.
    pub fn kwta_layer<D: Dimension>(
        &self,
        raw: &Array<f32, D>,
        act: &mut Array<f32, D>,
        ext_gi: Option<&Array<f32, D>>,
    ) -> KwtaReport {
        let output = ensure_shape(act, raw.raw_dim());
        let ext_gi = checked_ext_gi("kwta_layer", raw.shape(), ext_gi);

        let mut inhib = Inhib::default();
        inhib.ge.init();
        for (i, &ge) in raw.iter().enumerate() {
            inhib.ge.update(ge, i);
        }
        inhib.ge.calc_avg();

        let mut history = Vec::with_capacity(self.params.iters);
        let mut converged = false;
        for cy in 0..self.params.iters {
            self.params.layer.inhib(&mut inhib);
            inhib.act.init();
            let mut max_del = 0.0f32;
            let mut ext_vals = ext_gi.map(|e| e.iter());
            for (i, (a, &ge)) in act.iter_mut().zip(raw.iter()).enumerate() {
                let mut gi = inhib.gi;
                if let Some(e) = ext_vals.as_mut().and_then(|it| it.next()) {
                    gi += *e;
                }
                let (new_act, delta) = self.act_from_g(self.ge_thr_from_g(gi), ge, *a);
                max_del = max_del.max(delta.abs());
                inhib.act.update(new_act, i);
                *a = new_act;
            }
            inhib.act.calc_avg();
            history.push(max_del);
            if cy > 2 && max_del < self.params.del_act_thr {
                converged = true;
                break;
            }
        }
        self.finish("kwta_layer", history, converged, ext_gi.is_some(), output)
    }

    /// Layer + pool kWTA over `raw` `[LayerY, LayerX, PoolY, PoolX]`.
    ///
    /// `inhibs` is resized to one record per layer location and reset at the start of the
    /// solve; on return it holds each pool's final inhibition, with `lay_gi` set to the
    /// layer's. External inhibition enters through the pool feedforward formula,
    /// `pool.gi × pool.ff_inhib(ext, ext)`, and is max'd with the unit's inhibition.
    pub fn kwta_pool(
        &self,
        raw: &Array4<f32>,
        act: &mut Array4<f32>,
        inhibs: &mut Inhibs,
        ext_gi: Option<&Array4<f32>>,
    ) -> KwtaReport {
        let output = ensure_shape(act, raw.raw_dim());
        let ext_gi = checked_ext_gi("kwta_pool", raw.shape(), ext_gi);
        let (lay_y, lay_x, pl_y, pl_x) = raw.dim();
        let lay_n = lay_y * lay_x;
        let pl_n = pl_y * pl_x;

        inhibs.resize(lay_n, Inhib::default());
        let mut lay_inhib = Inhib::default();
        lay_inhib.ge.init();
        for (pi, pool_inhib) in inhibs.iter_mut().enumerate() {
            pool_inhib.init();
            let (ly, lx) = (pi / lay_x, pi % lay_x);
            for py in 0..pl_y {
                for px in 0..pl_x {
                    let ge = raw[[ly, lx, py, px]];
                    lay_inhib.ge.update(ge, pi * pl_n + py * pl_x + px);
                    pool_inhib.ge.update(ge, py * pl_x + px);
                }
            }
            pool_inhib.ge.calc_avg();
        }
        lay_inhib.ge.calc_avg();

        let pool_fffb = &self.params.pool;
        let mut history = Vec::with_capacity(self.params.iters);
        let mut converged = false;
        for cy in 0..self.params.iters {
            self.params.layer.inhib(&mut lay_inhib);
            lay_inhib.act.init();
            let mut max_del = 0.0f32;
            for (pi, pool_inhib) in inhibs.iter_mut().enumerate() {
                pool_fffb.inhib(pool_inhib);
                pool_inhib.lay_gi = lay_inhib.gi;
                let gi_pool = pool_inhib.effective_gi();

                pool_inhib.act.init();
                let (ly, lx) = (pi / lay_x, pi % lay_x);
                for py in 0..pl_y {
                    for px in 0..pl_x {
                        let idx = [ly, lx, py, px];
                        let mut gi = gi_pool;
                        if let Some(ext) = ext_gi {
                            let e = ext[idx];
                            gi = gi.max(pool_fffb.gi * pool_fffb.ff_inhib(e, e));
                        }
                        let (new_act, delta) =
                            self.act_from_g(self.ge_thr_from_g(gi), raw[idx], act[idx]);
                        max_del = max_del.max(delta.abs());
                        let ui = py * pl_x + px;
                        lay_inhib.act.update(new_act, pi * pl_n + ui);
                        pool_inhib.act.update(new_act, ui);
                        act[idx] = new_act;
                    }
                }
                pool_inhib.act.calc_avg();
            }
            lay_inhib.act.calc_avg();
            history.push(max_del);
            if cy > 2 && max_del < self.params.del_act_thr {
                converged = true;
                break;
            }
        }
        self.finish("kwta_pool", history, converged, ext_gi.is_some(), output)
    }

    fn finish(
        &self,
        op: &'static str,
        history: Vec<f32>,
        converged: bool,
        ext_gi_used: bool,
        output: ShapeOutcome,
    ) -> KwtaReport {
        let max_delta_act = history.last().copied().unwrap_or(0.0);
        debug!(
            op,
            iterations = history.len(),
            max_delta_act,
            converged,
            "kWTA solve finished"
        );
        KwtaReport {
            iterations: history.len(),
            max_delta_act,
            converged,
            ext_gi_used,
            output,
            delta_history: history,
        }
    }
}

fn checked_ext_gi<'a, D: Dimension>(
    op: &'static str,
    shape: &[usize],
    ext_gi: Option<&'a Array<f32, D>>,
) -> Option<&'a Array<f32, D>> {
    match ext_gi {
        Some(ext) if ext.shape() != shape => {
            warn!(
                op,
                expected = ?shape,
                actual = ?ext.shape(),
                "external inhibition has the wrong shape and will not be used"
            );
            None
        }
        other => other,
    }
}
