// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/// Per-channel values for the point-neuron conductance model
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Chans {
    /// Excitatory (AMPA)
    pub e: f32,
    /// Leak
    pub l: f32,
    /// Inhibitory (GABA)
    pub i: f32,
    /// Gated potassium
    pub k: f32,
}

impl Chans {
    pub const fn new(e: f32, l: f32, i: f32, k: f32) -> Self {
        Self { e, l, i, k }
    }

    /// `self - v` per channel
    pub fn minus(self, v: f32) -> Self {
        Self::new(self.e - v, self.l - v, self.i - v, self.k - v)
    }

    /// `v - self` per channel
    pub fn subtracted_from(self, v: f32) -> Self {
        Self::new(v - self.e, v - self.l, v - self.i, v - self.k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_are_mirrored() {
        let erev = Chans::new(1.0, 0.3, 0.3, 0.1);
        let above = erev.minus(0.5);
        let below = erev.subtracted_from(0.5);
        assert_eq!(above.e, 0.5);
        assert!((above.l + 0.2).abs() < 1e-6);
        assert!((above.k + 0.4).abs() < 1e-6);
        assert_eq!(below.e, -above.e);
        assert_eq!(below.k, -above.k);
    }
}
