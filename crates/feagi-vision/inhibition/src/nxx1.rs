// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Noisy-XX1 Activation
//!
//! Rate-code activation `x / (x + 1)` smoothed as if convolved with Gaussian noise of
//! variance `nvar`, approximated in three pieces:
//!
//! ```text
//! x < 0             →  sig_mult_eff / (1 + exp(-x × sig_gain / nvar))
//! 0 ≤ x < interp    →  linear from the sigmoid at 0 to xx1_gain_cor(interp)
//! x ≥ interp        →  xx1_gain_cor(x)
//! ```
//!
//! The curve depends on constants derived from the base parameters. [`Nxx1Params`] only
//! exists fully built: base parameters are private, and a different curve means building a
//! new value through [`Nxx1Builder`].

use crate::error::{InhibitionError, Result};

/// Built Noisy-XX1 curve (base parameters plus derived constants)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nxx1Params {
    thr: f32,
    gain: f32,
    nvar: f32,
    sig_mult: f32,
    sig_mult_pow: f32,
    sig_gain: f32,
    interp_range: f32,
    gain_cor_range: f32,
    gain_cor: f32,

    sig_gain_nvar: f32,
    sig_mult_eff: f32,
    sig_val_at_0: f32,
    interp_val: f32,
}

/// Base parameters for a [`Nxx1Params`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nxx1Builder {
    /// Firing threshold
    pub thr: f32,
    /// Gain of the rate code
    pub gain: f32,
    /// Noise variance; sets the curvature near threshold
    pub nvar: f32,
    /// Multiplier on the sub-threshold sigmoid
    pub sig_mult: f32,
    /// Power on `gain × nvar` in the effective sigmoid multiplier
    pub sig_mult_pow: f32,
    /// Gain on the sub-threshold sigmoid
    pub sig_gain: f32,
    /// Range above 0 that is linearly interpolated
    pub interp_range: f32,
    /// Range, in units of `nvar`, over which the gain is corrected
    pub gain_cor_range: f32,
    /// Strength of the gain correction
    pub gain_cor: f32,
}

impl Default for Nxx1Builder {
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

impl Nxx1Builder {
    pub fn thr(mut self, thr: f32) -> Self {
        self.thr = thr;
        self
    }

    pub fn gain(mut self, gain: f32) -> Self {
        self.gain = gain;
        self
    }

    pub fn nvar(mut self, nvar: f32) -> Self {
        self.nvar = nvar;
        self
    }

    pub fn sig_mult(mut self, sig_mult: f32) -> Self {
        self.sig_mult = sig_mult;
        self
    }

    pub fn sig_mult_pow(mut self, sig_mult_pow: f32) -> Self {
        self.sig_mult_pow = sig_mult_pow;
        self
    }

    pub fn sig_gain(mut self, sig_gain: f32) -> Self {
        self.sig_gain = sig_gain;
        self
    }

    pub fn interp_range(mut self, interp_range: f32) -> Self {
        self.interp_range = interp_range;
        self
    }

    pub fn gain_cor_range(mut self, gain_cor_range: f32) -> Self {
        self.gain_cor_range = gain_cor_range;
        self
    }

    pub fn gain_cor(mut self, gain_cor: f32) -> Self {
        self.gain_cor = gain_cor;
        self
    }

    /// Validate and derive the curve constants
    pub fn build(self) -> Result<Nxx1Params> {
        if !(self.gain >= 0.0) {
            return Err(InhibitionError::invalid("xx1.gain", "must be non-negative"));
        }
        if !(self.nvar > 0.0) {
            return Err(InhibitionError::invalid("xx1.nvar", "must be positive"));
        }
        if !(self.interp_range > 0.0) {
            return Err(InhibitionError::invalid("xx1.interp_range", "must be positive"));
        }
        if !(self.gain_cor_range > 0.0) {
            return Err(InhibitionError::invalid("xx1.gain_cor_range", "must be positive"));
        }
        Ok(Nxx1Params::derive(self))
    }
}

impl Default for Nxx1Params {
    fn default() -> Self {
        Self::derive(Nxx1Builder::default())
    }
}

impl Nxx1Params {
    pub fn builder() -> Nxx1Builder {
        Nxx1Builder::default()
    }

    /// Builder seeded with this curve's base parameters
    pub fn to_builder(&self) -> Nxx1Builder {
        Nxx1Builder {
            thr: self.thr,
            gain: self.gain,
            nvar: self.nvar,
            sig_mult: self.sig_mult,
            sig_mult_pow: self.sig_mult_pow,
            sig_gain: self.sig_gain,
            interp_range: self.interp_range,
            gain_cor_range: self.gain_cor_range,
            gain_cor: self.gain_cor,
        }
    }

    fn derive(b: Nxx1Builder) -> Self {
        let mut p = Self {
            thr: b.thr,
            gain: b.gain,
            nvar: b.nvar,
            sig_mult: b.sig_mult,
            sig_mult_pow: b.sig_mult_pow,
            sig_gain: b.sig_gain,
            interp_range: b.interp_range,
            gain_cor_range: b.gain_cor_range,
            gain_cor: b.gain_cor,
            sig_gain_nvar: b.sig_gain / b.nvar,
            sig_mult_eff: b.sig_mult * (b.gain * b.nvar).powf(b.sig_mult_pow),
            sig_val_at_0: 0.0,
            interp_val: 0.0,
        };
        p.sig_val_at_0 = 0.5 * p.sig_mult_eff;
        p.interp_val = p.xx1_gain_cor(p.interp_range) - p.sig_val_at_0;
        p
    }

    pub fn thr(&self) -> f32 {
        self.thr
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn nvar(&self) -> f32 {
        self.nvar
    }

    pub fn interp_range(&self) -> f32 {
        self.interp_range
    }

    pub fn sig_mult_eff(&self) -> f32 {
        self.sig_mult_eff
    }

    pub fn sig_val_at_0(&self) -> f32 {
        self.sig_val_at_0
    }

    /// Plain `x / (x + 1)`
    #[inline]
    pub fn xx1(&self, x: f32) -> f32 {
        x / (x + 1.0)
    }

    /// `xx1(gain × x)` with the gain reduced within `gain_cor_range × nvar` of zero
    #[inline]
    pub fn xx1_gain_cor(&self, x: f32) -> f32 {
        let gain_cor_fact = (self.gain_cor_range - x / self.nvar) / self.gain_cor_range;
        if gain_cor_fact < 0.0 {
            return self.xx1(self.gain * x);
        }
        let new_gain = self.gain * (1.0 - self.gain_cor * gain_cor_fact);
        self.xx1(new_gain * x)
    }

    #[inline]
    pub fn noisy_xx1(&self, x: f32) -> f32 {
        if x < 0.0 {
            self.sig_mult_eff / (1.0 + (-(x * self.sig_gain_nvar)).exp())
        } else if x < self.interp_range {
            let interp = 1.0 - (self.interp_range - x) / self.interp_range;
            self.sig_val_at_0 + interp * self.interp_val
        } else {
            self.xx1_gain_cor(x)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_derived_constants() {
        let p = Nxx1Params::default();
        // 0.33 × (80 × 0.01)^0.8
        let sme = 0.33 * 0.8f32.powf(0.8);
        assert!((p.sig_mult_eff() - sme).abs() < 1e-6);
        assert!((p.sig_val_at_0() - 0.5 * sme).abs() < 1e-6);
        assert_eq!(p, Nxx1Params::builder().build().unwrap());
    }

    #[test]
    fn test_rebuild_refreshes_constants() {
        let base = Nxx1Params::default();
        let steeper = base.to_builder().gain(100.0).build().unwrap();
        assert_eq!(steeper.gain(), 100.0);
        assert!(steeper.sig_mult_eff() > base.sig_mult_eff());
        assert!(steeper.noisy_xx1(0.05) > base.noisy_xx1(0.05));
        assert_eq!(steeper.thr(), base.thr());
    }

    #[test]
    fn test_curve_shape() {
        let p = Nxx1Params::default();
        assert!(p.noisy_xx1(-1.0) < 1e-6);
        assert!(p.noisy_xx1(-0.01) > 0.0);
        assert!(p.noisy_xx1(1.0) > 0.98);
        let mut prev = p.noisy_xx1(-0.05);
        for i in -49..200 {
            let v = p.noisy_xx1(i as f32 * 0.001);
            assert!(v >= prev, "not monotone at {i}");
            prev = v;
        }
    }

    #[test]
    fn test_gain_correction_fades_out() {
        let p = Nxx1Params::default();
        // beyond gain_cor_range × nvar = 0.1 the nominal gain applies
        assert_eq!(p.xx1_gain_cor(0.2), p.xx1(80.0 * 0.2));
        assert!(p.xx1_gain_cor(0.05) < p.xx1(80.0 * 0.05));
    }

    #[test]
    fn test_build_rejects_zero_nvar() {
        let err = Nxx1Params::builder().nvar(0.0).build();
        assert!(matches!(
            err,
            Err(InhibitionError::InvalidParameter { name: "xx1.nvar", .. })
        ));
    }
}
