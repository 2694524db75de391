// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Length-sum: simple-cell activation averaged along its own orientation

use feagi_vision_filter::{ensure_shape, offset_index, split_axis_mut, ShapeOutcome, WorkerPool};
use ndarray::{Array4, Axis};

use crate::error::{ComplexError, Result};

/// Line neighbor X offset per angle (`-`, `/`, `|`, `\`); the negated offset is used too
pub const LINE4_X: [isize; 4] = [1, 1, 0, 1];
/// Line neighbor Y offset per angle
pub const LINE4_Y: [isize; 4] = [0, 1, 1, -1];

pub(crate) fn check_angles(nang: usize) -> Result<()> {
    if nang != LINE4_X.len() {
        return Err(ComplexError::UnsupportedAngles {
            expected: LINE4_X.len(),
            actual: nang,
        });
    }
    Ok(())
}

/// Average each unit of `act` `[Y, X, Py, Angle]` with its two neighbors along the angle's line.
///
/// `lsum` takes `act`'s shape. Neighbors off the grid count as 0 and the divisor stays 3.
pub fn len_sum4(
    pool: &WorkerPool,
    act: &Array4<f32>,
    lsum: &mut Array4<f32>,
) -> Result<ShapeOutcome> {
    let (lay_y, lay_x, pl_y, nang) = act.dim();
    check_angles(nang)?;
    let outcome = ensure_shape(lsum, act.raw_dim());

    let at = |y: usize, x: usize, dy: isize, dx: isize, py: usize, ang: usize| -> f32 {
        match (offset_index(y, dy, lay_y), offset_index(x, dx, lay_x)) {
            (Some(ny), Some(nx)) => act[[ny, nx, py, ang]],
            _ => 0.0,
        }
    };

    let ranges = pool.split(lay_y).ranges();
    let parts = split_axis_mut(lsum.view_mut(), Axis(0), &ranges);
    pool.run_parts(parts, |(y_start, mut rows)| {
        for yi in 0..rows.len_of(Axis(0)) {
            let ly = y_start + yi;
            for lx in 0..lay_x {
                for py in 0..pl_y {
                    for ang in 0..nang {
                        let (dx, dy) = (LINE4_X[ang], LINE4_Y[ang]);
                        let ctr = act[[ly, lx, py, ang]];
                        let lp = at(ly, lx, dy, dx, py, ang);
                        let ln = at(ly, lx, -dy, -dx, py, ang);
                        rows[[yi, lx, py, ang]] = (ctr + lp + ln) / 3.0;
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

    #[test]
    fn test_isolated_unit_spreads_along_its_line() {
        let pool = WorkerPool::new(2);
        let mut act = Array4::zeros((3, 3, 1, 4));
        for ang in 0..4 {
            act[[1, 1, 0, ang]] = 0.9;
        }
        let mut lsum = Array4::zeros((0, 0, 0, 0));
        let outcome = len_sum4(&pool, &act, &mut lsum).unwrap();

        assert!(outcome.was_reshaped());
        for ang in 0..4 {
            assert!((lsum[[1, 1, 0, ang]] - 0.3).abs() < 1e-6);
            let (dx, dy) = (LINE4_X[ang], LINE4_Y[ang]);
            let ahead = [(1 + dy) as usize, (1 + dx) as usize];
            let behind = [(1 - dy) as usize, (1 - dx) as usize];
            assert!((lsum[[ahead[0], ahead[1], 0, ang]] - 0.3).abs() < 1e-6);
            assert!((lsum[[behind[0], behind[1], 0, ang]] - 0.3).abs() < 1e-6);
            let lit = lsum
                .index_axis(Axis(3), ang)
                .iter()
                .filter(|&&v| v > 0.0)
                .count();
            assert_eq!(lit, 3, "angle {ang}");
        }
    }

    #[test]
    fn test_line_ends_are_attenuated() {
        let pool = WorkerPool::new(1);
        let mut act = Array4::zeros((1, 4, 1, 4));
        for x in 0..4 {
            act[[0, x, 0, 0]] = 0.6;
        }
        let mut lsum = Array4::zeros((1, 4, 1, 4));
        let outcome = len_sum4(&pool, &act, &mut lsum).unwrap();

        assert_eq!(outcome, ShapeOutcome::Reused);
        assert!((lsum[[0, 0, 0, 0]] - 0.4).abs() < 1e-6);
        assert!((lsum[[0, 1, 0, 0]] - 0.6).abs() < 1e-6);
        assert!((lsum[[0, 3, 0, 0]] - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_requires_four_angles() {
        let pool = WorkerPool::new(1);
        let act = Array4::zeros((2, 2, 1, 8));
        let mut lsum = Array4::zeros((0, 0, 0, 0));
        assert!(matches!(
            len_sum4(&pool, &act, &mut lsum),
            Err(ComplexError::UnsupportedAngles { expected: 4, actual: 8 })
        ));
    }
}
