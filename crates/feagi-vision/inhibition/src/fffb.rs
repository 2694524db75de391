// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # FFFB Inhibition
//!
//! Feedforward inhibition tracks the drive into a group of units, feedback inhibition tracks
//! the group's own activity:
//!
//! ```text
//! ff_netin = avg_ge + max_vs_avg × (max_ge - avg_ge)
//! ffi      = ff × (ff_netin - ff0)        if ff_netin > ff0, else 0
//! fbi     += fb_dt × (fb × avg_act - fbi)  (low-pass, previous value carried over)
//! gi       = gi_gain × (ffi + fbi)
//! ```
//!
//! [`Inhib`] holds the state for one group during a single solve. `fbi` is the only value
//! carried from one iteration to the next.

use crate::error::{InhibitionError, Result};

/// FFFB parameters for one level (layer or pool)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FffbParams {
    /// Enable this level of inhibition
    pub on: bool,
    /// Overall gain, scaling both FF and FB terms
    pub gi: f32,
    /// Feedforward contribution, multiplies the average drive
    pub ff: f32,
    /// Feedback contribution, multiplies the average activation
    pub fb: f32,
    /// Feedback integration time constant, in iterations
    pub fb_tau: f32,
    /// 0 = FF from the average drive, 1 = from the max
    pub max_vs_avg: f32,
    /// Drive below this produces no FF inhibition
    pub ff0: f32,
}

impl Default for FffbParams {
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

impl FffbParams {
    /// Feedback integration rate, `1 / fb_tau`
    #[inline]
    pub fn fb_dt(&self) -> f32 {
        1.0 / self.fb_tau
    }

    /// Feedforward inhibition from the average and max drive
    #[inline]
    pub fn ff_inhib(&self, avg_ge: f32, max_ge: f32) -> f32 {
        let ff_netin = avg_ge + self.max_vs_avg * (max_ge - avg_ge);
        if ff_netin > self.ff0 {
            self.ff * (ff_netin - self.ff0)
        } else {
            0.0
        }
    }

    /// Feedback inhibition target from the average activation
    #[inline]
    pub fn fb_inhib(&self, avg_act: f32) -> f32 {
        self.fb * avg_act
    }

    /// One low-pass step of `fbi` toward `target`
    #[inline]
    pub fn fb_update(&self, fbi: &mut f32, target: f32) {
        *fbi += self.fb_dt() * (target - *fbi);
    }

    /// Compute this iteration's inhibition from the stats stored in `inh`
    pub fn inhib(&self, inh: &mut Inhib) {
        if !self.on {
            inh.zero();
            return;
        }
        let ffi = self.ff_inhib(inh.ge.avg, inh.ge.max);
        let fbi = self.fb_inhib(inh.act.avg);
        inh.ffi = ffi;
        self.fb_update(&mut inh.fbi, fbi);
        inh.gi = self.gi * (ffi + inh.fbi);
        inh.gi_orig = inh.gi;
    }

    pub fn validate(&self, level: &'static str) -> Result<()> {
        if self.gi < 0.0 || self.ff < 0.0 || self.fb < 0.0 {
            return Err(InhibitionError::invalid(
                level,
                format!(
                    "gains must be non-negative (gi={}, ff={}, fb={})",
                    self.gi, self.ff, self.fb
                ),
            ));
        }
        if !(self.fb_tau > 0.0) {
            return Err(InhibitionError::invalid(
                level,
                format!("fb_tau must be positive, got {}", self.fb_tau),
            ));
        }
        if !(0.0..=1.0).contains(&self.max_vs_avg) {
            return Err(InhibitionError::invalid(
                level,
                format!("max_vs_avg must be in [0, 1], got {}", self.max_vs_avg),
            ));
        }
        Ok(())
    }
}

/// Running sum, average and max of a set of values
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AvgMax {
    pub sum: f32,
    pub n: usize,
    pub avg: f32,
    pub max: f32,
    /// Index of the max value, as passed to [`AvgMax::update`]
    pub max_idx: Option<usize>,
}

impl AvgMax {
    /// Reset for accumulation
    pub fn init(&mut self) {
        self.sum = 0.0;
        self.n = 0;
        self.avg = 0.0;
        self.max = -f32::MAX;
        self.max_idx = None;
    }

    #[inline]
    pub fn update(&mut self, val: f32, idx: usize) {
        self.sum += val;
        self.n += 1;
        if val > self.max {
            self.max = val;
            self.max_idx = Some(idx);
        }
    }

    /// Finish accumulation. With no samples both avg and max are 0.
    pub fn calc_avg(&mut self) {
        if self.n > 0 {
            self.avg = self.sum / self.n as f32;
        } else {
            self.avg = self.sum;
            self.max = self.avg;
        }
    }
}

/// FFFB state for one group of units
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Inhib {
    /// Feedforward inhibition
    pub ffi: f32,
    /// Feedback inhibition (integrated)
    pub fbi: f32,
    /// Net inhibition applied to the group's units
    pub gi: f32,
    /// `gi` before any pool or external adjustment
    pub gi_orig: f32,
    /// For pools: the layer-level inhibition it is max'd with
    pub lay_gi: f32,
    /// Excitatory drive stats (feed FF)
    pub ge: AvgMax,
    /// Activation stats (feed FB)
    pub act: AvgMax,
}

impl Inhib {
    /// Clear the inhibition values, keeping the stats
    pub fn zero(&mut self) {
        self.ffi = 0.0;
        self.fbi = 0.0;
        self.gi = 0.0;
        self.gi_orig = 0.0;
        self.lay_gi = 0.0;
    }

    /// Fresh state for a new solve
    pub fn init(&mut self) {
        self.zero();
        self.ge.init();
        self.act.init();
        self.act.calc_avg();
    }

    /// Inhibition a pool's units actually receive: the larger of pool and layer
    #[inline]
    pub fn effective_gi(&self) -> f32 {
        self.gi.max(self.lay_gi)
    }
}

/// Per-pool inhibition state, indexed by flattened `(layer_y, layer_x)`
pub type Inhibs = Vec<Inhib>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ff_zero_point() {
        let p = FffbParams::default();
        assert_eq!(p.ff_inhib(0.05, 0.9), 0.0);
        assert_eq!(p.ff_inhib(0.1, 0.1), 0.0);
        assert!((p.ff_inhib(0.6, 0.6) - 0.5).abs() < 1e-6);

        let max_only = FffbParams {
            max_vs_avg: 1.0,
            ..FffbParams::default()
        };
        assert!((max_only.ff_inhib(0.05, 0.9) - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_inhib_combines_ff_and_fb() {
        let p = FffbParams::default();
        let mut inh = Inhib::default();
        inh.ge.avg = 0.3;
        inh.act.avg = 0.2;
        p.inhib(&mut inh);

        let fbi = p.fb_dt() * 0.2;
        assert!((inh.ffi - 0.2).abs() < 1e-6);
        assert!((inh.fbi - fbi).abs() < 1e-6);
        assert!((inh.gi - 1.8 * (0.2 + fbi)).abs() < 1e-6);
        assert_eq!(inh.gi, inh.gi_orig);
    }

    #[test]
    fn test_off_zeroes_inhibition() {
        let p = FffbParams {
            on: false,
            ..FffbParams::default()
        };
        let mut inh = Inhib {
            fbi: 0.4,
            gi: 1.0,
            ..Inhib::default()
        };
        inh.ge.avg = 1.0;
        p.inhib(&mut inh);
        assert_eq!((inh.ffi, inh.fbi, inh.gi), (0.0, 0.0, 0.0));
        assert_eq!(inh.ge.avg, 1.0);
    }

    #[test]
    fn test_fb_dt_follows_tau() {
        let mut p = FffbParams::default();
        assert!((p.fb_dt() - 1.0 / 1.4).abs() < 1e-7);
        p.fb_tau = 4.0;
        assert_eq!(p.fb_dt(), 0.25);
    }

    #[test]
    fn test_avg_max_accumulation() {
        let mut am = AvgMax::default();
        am.init();
        for (i, v) in [0.2, 0.8, 0.5].into_iter().enumerate() {
            am.update(v, i);
        }
        am.calc_avg();
        assert!((am.avg - 0.5).abs() < 1e-6);
        assert_eq!(am.max, 0.8);
        assert_eq!(am.max_idx, Some(1));

        am.init();
        am.calc_avg();
        assert_eq!((am.avg, am.max, am.max_idx), (0.0, 0.0, None));
    }

    #[test]
    fn test_validate_rejects_bad_tau() {
        let p = FffbParams {
            fb_tau: 0.0,
            ..FffbParams::default()
        };
        assert!(matches!(
            p.validate("layer"),
            Err(InhibitionError::InvalidParameter { name: "layer", .. })
        ));
        assert!(FffbParams::default().validate("pool").is_ok());
    }
}
