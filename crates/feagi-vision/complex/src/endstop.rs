// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # End-Stop
//!
//! Responds where a line ends: the length-sum one step behind a unit minus the strongest
//! same-orientation activation in a three-unit region one step ahead of it. Both directions
//! along the line are computed; direction 0 looks behind along `-LINE4` and ahead along
//! `+END_STOP_OFF4`, direction 1 mirrors both.

use feagi_vision_filter::{ensure_shape, offset_index, split_axis_mut, ShapeOutcome, WorkerPool};
use ndarray::{Array4, Axis};
use tracing::warn;

use crate::error::{ComplexError, Result};
use crate::lensum::{check_angles, LINE4_X, LINE4_Y};

/// Off-region X offsets, three per angle
pub const END_STOP_OFF4_X: [isize; 12] = [1, 1, 1, 0, 1, 1, -1, 0, 1, 0, 1, 1];
/// Off-region Y offsets, three per angle
pub const END_STOP_OFF4_Y: [isize; 12] = [1, 0, -1, 1, 1, 0, 1, 1, 1, -1, -1, 0];

/// Responses below this are zeroed
pub const END_STOP_THR: f32 = 0.2;

/// Compute end-stop responses into `estop` `[Y, X, 2 × Py, Angle]`.
///
/// `lsum` must be the [`crate::len_sum4`] output for `act`. Row `py × 2 + dir` of the
/// output holds direction `dir` for polarity row `py`.
pub fn end_stop4(
    pool: &WorkerPool,
    act: &Array4<f32>,
    lsum: &Array4<f32>,
    estop: &mut Array4<f32>,
) -> Result<ShapeOutcome> {
    let (lay_y, lay_x, pl_y, nang) = act.dim();
    check_angles(nang)?;
    if lsum.shape() != act.shape() {
        warn!(
            expected = ?act.shape(),
            actual = ?lsum.shape(),
            "end_stop4: length-sum does not match activation"
        );
        return Err(ComplexError::ShapeMismatch {
            op: "end_stop4",
            expected: act.shape().to_vec(),
            actual: lsum.shape().to_vec(),
        });
    }
    let outcome = ensure_shape(estop, (lay_y, lay_x, 2 * pl_y, nang));

    let neighbor = |y: usize, x: usize, dy: isize, dx: isize| {
        offset_index(y, dy, lay_y).zip(offset_index(x, dx, lay_x))
    };

    let ranges = pool.split(lay_y).ranges();
    let parts = split_axis_mut(estop.view_mut(), Axis(0), &ranges);
    pool.run_parts(parts, |(y_start, mut rows)| {
        for yi in 0..rows.len_of(Axis(0)) {
            let ly = y_start + yi;
            for lx in 0..lay_x {
                for py in 0..pl_y {
                    for ang in 0..nang {
                        for (dir, dsign) in [(0usize, 1isize), (1, -1)] {
                            let (dy, dx) = (-dsign * LINE4_Y[ang], -dsign * LINE4_X[ang]);
                            let ls = neighbor(ly, lx, dy, dx)
                                .map_or(0.0, |(y, x)| lsum[[y, x, py, ang]]);

                            let mut off_max = 0.0f32;
                            for oi in ang * 3..ang * 3 + 3 {
                                let off = dsign * END_STOP_OFF4_Y[oi];
                                if let Some((y, x)) =
                                    neighbor(ly, lx, off, dsign * END_STOP_OFF4_X[oi])
                                {
                                    off_max = off_max.max(act[[y, x, py, ang]]);
                                }
                            }

                            let es = ls - off_max;
                            rows[[yi, lx, py * 2 + dir, ang]] =
                                if es < END_STOP_THR { 0.0 } else { es };
                        }
                    }
                }
            }
        }
    })?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lensum::len_sum4;

    #[test]
    fn test_off_region_suppresses_line_interior() {
        let pool = WorkerPool::new(1);
        let mut act = Array4::zeros((1, 5, 1, 4));
        for x in 0..5 {
            act[[0, x, 0, 0]] = 1.0;
        }
        let mut lsum = Array4::zeros((0, 0, 0, 0));
        len_sum4(&pool, &act, &mut lsum).unwrap();
        let mut estop = Array4::zeros((0, 0, 0, 0));
        end_stop4(&pool, &act, &lsum, &mut estop).unwrap();

        assert_eq!(estop.shape(), &[1, 5, 2, 4]);
        for x in 1..4 {
            assert_eq!(estop[[0, x, 0, 0]], 0.0);
            assert_eq!(estop[[0, x, 1, 0]], 0.0);
        }
        // last unit on each side has nothing ahead of it
        assert!((estop[[0, 4, 0, 0]] - 1.0).abs() < 1e-6);
        assert!((estop[[0, 0, 1, 0]] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_weak_responses_are_zeroed() {
        let pool = WorkerPool::new(1);
        let act = Array4::zeros((2, 2, 1, 4));
        let lsum = Array4::from_elem((2, 2, 1, 4), 0.15f32);
        let mut estop = Array4::from_elem((2, 2, 2, 4), 9.0f32);
        let outcome = end_stop4(&pool, &act, &lsum, &mut estop).unwrap();

        assert_eq!(outcome, ShapeOutcome::Reused);
        assert!(estop.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_mismatched_lsum_is_rejected() {
        let pool = WorkerPool::new(1);
        let act = Array4::zeros((2, 2, 1, 4));
        let lsum = Array4::zeros((2, 3, 1, 4));
        let mut estop = Array4::zeros((0, 0, 0, 0));
        let err = end_stop4(&pool, &act, &lsum, &mut estop);
        assert!(matches!(
            err,
            Err(ComplexError::ShapeMismatch { op: "end_stop4", .. })
        ));
        assert_eq!(estop.len(), 0);
    }
}
