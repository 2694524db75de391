// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use ndarray::{Array4, Axis};

use crate::error::Result;
use crate::parallel::{split_axis_mut, WorkerPool};
use crate::shape::{ensure_shape, ShapeOutcome};

/// Collapse the polarity axis of `input` `[Y, X, Pol, Ang]` by max into `out` `[Y, X, 1, Ang]`.
///
/// Like [`crate::max_pool`] the max starts at 0. One task per range of angles.
pub fn max_reduce_filter_y(
    pool: &WorkerPool,
    input: &Array4<f32>,
    out: &mut Array4<f32>,
) -> Result<ShapeOutcome> {
    let (ny, nx, npol, nang) = input.dim();
    let outcome = ensure_shape(out, (ny, nx, 1, nang));

    let ranges = pool.split(nang).ranges();
    let parts = split_axis_mut(out.view_mut(), Axis(3), &ranges);
    pool.run_parts(parts, |(a_start, mut chunk)| {
        for ai in 0..chunk.len_of(Axis(3)) {
            let ang = a_start + ai;
            for y in 0..ny {
                for x in 0..nx {
                    let mut max = 0.0f32;
                    for p in 0..npol {
                        let v = input[[y, x, p, ang]];
                        if v > max {
                            max = v;
                        }
                    }
                    chunk[[y, x, 0, ai]] = max;
                }
            }
        }
    })?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduces_polarity_per_angle() {
        let pool = WorkerPool::new(2);
        let mut input = Array4::zeros((2, 3, 2, 4));
        input[[0, 0, 0, 1]] = 0.3;
        input[[0, 0, 1, 1]] = 0.7;
        input[[1, 2, 1, 3]] = 0.9;
        input[[1, 2, 0, 2]] = 0.4;

        let mut out = Array4::zeros((0, 0, 0, 0));
        let outcome = max_reduce_filter_y(&pool, &input, &mut out).unwrap();
        assert!(outcome.was_reshaped());
        assert_eq!(out.shape(), &[2, 3, 1, 4]);
        assert_eq!(out[[0, 0, 0, 1]], 0.7);
        assert_eq!(out[[1, 2, 0, 3]], 0.9);
        assert_eq!(out[[1, 2, 0, 2]], 0.4);
        assert_eq!(out.iter().filter(|&&v| v != 0.0).count(), 3);
    }
}
