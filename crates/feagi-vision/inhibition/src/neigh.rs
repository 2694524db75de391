// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Neighbor inhibition between same-feature units along the orthogonal direction

use feagi_vision_filter::{ensure_shape, offset_index, split_axis_mut, ShapeOutcome, WorkerPool};
use ndarray::{Array4, Axis};

use crate::error::{InhibitionError, Result};

/// Orthogonal neighbor X offset per angle (`-`, `/`, `|`, `\`); the negated offset is used too
pub const NEIGH4_X: [isize; 4] = [0, -1, 1, -1];
/// Orthogonal neighbor Y offset per angle
pub const NEIGH4_Y: [isize; 4] = [1, 1, 0, -1];

/// Inhibition from the two orthogonal neighbors of the same feature
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighInhib {
    pub on: bool,
    /// Gain on the neighbor activation
    pub gi: f32,
}

impl Default for NeighInhib {
    fn default() -> Self {
        Self { on: false, gi: 0.6 }
    }
}

impl NeighInhib {
    /// Compute per-unit external inhibition from `act` `[Y, X, Py, Angle]` into `ext_gi`.
    ///
    /// Each unit gets `max(0, gi × act[+neighbor], gi × act[-neighbor])`; neighbors off the
    /// grid count as 0. The angle axis must have exactly 4 entries.
    pub fn inhib4(
        &self,
        pool: &WorkerPool,
        act: &Array4<f32>,
        ext_gi: &mut Array4<f32>,
    ) -> Result<ShapeOutcome> {
        let (lay_y, lay_x, pl_y, nang) = act.dim();
        if nang != NEIGH4_X.len() {
            return Err(InhibitionError::UnsupportedAngles {
                expected: NEIGH4_X.len(),
                actual: nang,
            });
        }
        let outcome = ensure_shape(ext_gi, act.raw_dim());

        let gain = self.gi;
        let ranges = pool.split(lay_y).ranges();
        let parts = split_axis_mut(ext_gi.view_mut(), Axis(0), &ranges);
        pool.run_parts(parts, |(y_start, mut rows)| {
            for yi in 0..rows.len_of(Axis(0)) {
                let ly = y_start + yi;
                for lx in 0..lay_x {
                    for py in 0..pl_y {
                        for ang in 0..nang {
                            let (dx, dy) = (NEIGH4_X[ang], NEIGH4_Y[ang]);
                            let mut gi = 0.0f32;
                            for sign in [1, -1] {
                                let ny = offset_index(ly, sign * dy, lay_y);
                                let nx = offset_index(lx, sign * dx, lay_x);
                                if let (Some(ny), Some(nx)) = (ny, nx) {
                                    gi = gi.max(gain * act[[ny, nx, py, ang]]);
                                }
                            }
                            rows[[yi, lx, py, ang]] = gi;
                        }
                    }
                }
            }
        })?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let ni = NeighInhib::default();
        assert!(!ni.on);
        assert_eq!(ni.gi, 0.6);
    }

    #[test]
    fn test_orthogonal_neighbors_per_angle() {
        let pool = WorkerPool::new(2);
        let ni = NeighInhib { on: true, gi: 0.5 };
        let mut act = Array4::zeros((5, 5, 1, 4));
        for ang in 0..4 {
            act[[2, 2, 0, ang]] = 1.0;
        }
        let mut ext = Array4::zeros((0, 0, 0, 0));
        ni.inhib4(&pool, &act, &mut ext).unwrap();

        for ang in 0..4 {
            let (dx, dy) = (NEIGH4_X[ang], NEIGH4_Y[ang]);
            let plus = [(2 + dy) as usize, (2 + dx) as usize];
            let minus = [(2 - dy) as usize, (2 - dx) as usize];
            assert_eq!(ext[[plus[0], plus[1], 0, ang]], 0.5);
            assert_eq!(ext[[minus[0], minus[1], 0, ang]], 0.5);
            let hits = ext
                .index_axis(Axis(3), ang)
                .iter()
                .filter(|&&v| v > 0.0)
                .count();
            assert_eq!(hits, 2, "angle {ang}");
        }
    }

    #[test]
    fn test_edges_read_zero_and_stronger_neighbor_wins() {
        let pool = WorkerPool::new(1);
        let ni = NeighInhib { on: true, gi: 1.0 };
        let mut act = Array4::zeros((3, 1, 1, 4));
        // angle 0 looks one row up and down
        act[[0, 0, 0, 0]] = 0.2;
        act[[2, 0, 0, 0]] = 0.7;
        let mut ext = Array4::zeros((3, 1, 1, 4));
        let outcome = ni.inhib4(&pool, &act, &mut ext).unwrap();

        assert_eq!(outcome, ShapeOutcome::Reused);
        assert_eq!(ext[[1, 0, 0, 0]], 0.7);
        assert_eq!(ext[[0, 0, 0, 0]], 0.0);
        assert_eq!(ext[[2, 0, 0, 0]], 0.0);
    }

    #[test]
    fn test_requires_four_angles() {
        let pool = WorkerPool::new(1);
        let act = Array4::zeros((2, 2, 2, 6));
        let mut ext = Array4::zeros((0, 0, 0, 0));
        let err = NeighInhib::default().inhib4(&pool, &act, &mut ext);
        assert!(matches!(
            err,
            Err(InhibitionError::UnsupportedAngles { expected: 4, actual: 6 })
        ));
    }
}
