// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Row aggregation between feature maps.
//!
//! Neither function allocates: `out` must already be large enough for every write, and an
//! undersized `out` panics on indexing.

use ndarray::{Array3, Array4, Axis};

use crate::error::Result;
use crate::parallel::{split_axis_mut, WorkerPool};

/// Copy feature rows `src_rows` of `src` `[Y, X, Row, Ang]` into consecutive rows of `out`
/// starting at `trg_start`. The angle axis is shared; one task per range of angles.
pub fn feat_agg(
    pool: &WorkerPool,
    src_rows: &[usize],
    trg_start: usize,
    src: &Array4<f32>,
    out: &mut Array4<f32>,
) -> Result<()> {
    let (ny, nx, _, nang) = src.dim();
    let ranges = pool.split(nang).ranges();
    let parts = split_axis_mut(out.view_mut(), Axis(3), &ranges);
    pool.run_parts(parts, |(a_start, mut chunk)| {
        for ai in 0..chunk.len_of(Axis(3)) {
            let ang = a_start + ai;
            for y in 0..ny {
                for x in 0..nx {
                    for (si, &sr) in src_rows.iter().enumerate() {
                        chunk[[y, x, trg_start + si, ai]] = src[[y, x, sr, ang]];
                    }
                }
            }
        }
    })
}

/// Copy the outer axis of `src` `[F, Y, X]` into rows `row_off..row_off + F` of `out`
/// `[Y, X, Row, Inner]` at inner position `inner_pos`.
pub fn outer_agg(inner_pos: usize, row_off: usize, src: &Array3<f32>, out: &mut Array4<f32>) {
    let (nout, ny, nx) = src.dim();
    for y in 0..ny {
        for x in 0..nx {
            for f in 0..nout {
                out[[y, x, row_off + f, inner_pos]] = src[[f, y, x]];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;

    #[test]
    fn test_feat_agg_interleaves_rows() {
        let pool = WorkerPool::new(3);
        let src = Array::from_shape_fn((2, 2, 3, 4), |(y, x, r, a)| {
            (y * 1000 + x * 100 + r * 10 + a) as f32
        });
        let mut out = Array4::from_elem((2, 2, 5, 4), -1.0f32);

        feat_agg(&pool, &[2, 0], 1, &src, &mut out).unwrap();

        for y in 0..2 {
            for x in 0..2 {
                for a in 0..4 {
                    assert_eq!(out[[y, x, 0, a]], -1.0);
                    assert_eq!(out[[y, x, 1, a]], src[[y, x, 2, a]]);
                    assert_eq!(out[[y, x, 2, a]], src[[y, x, 0, a]]);
                    assert_eq!(out[[y, x, 3, a]], -1.0);
                }
            }
        }
    }

    #[test]
    #[should_panic]
    fn test_feat_agg_undersized_output_panics() {
        let pool = WorkerPool::new(1);
        let src = Array4::zeros((2, 2, 2, 1));
        let mut out = Array4::zeros((2, 2, 1, 1));
        let _ = feat_agg(&pool, &[0, 1], 0, &src, &mut out);
    }

    #[test]
    fn test_outer_agg_places_outer_axis_in_rows() {
        let src = Array::from_shape_fn((3, 2, 2), |(f, y, x)| (f * 100 + y * 10 + x) as f32);
        let mut out = Array4::zeros((2, 2, 4, 2));

        outer_agg(1, 1, &src, &mut out);

        assert_eq!(out[[1, 0, 1, 1]], 10.0);
        assert_eq!(out[[1, 0, 3, 1]], 210.0);
        assert_eq!(out[[0, 1, 2, 1]], 101.0);
        assert!(out.index_axis(Axis(3), 0).iter().all(|&v| v == 0.0));
        assert!(out.index_axis(Axis(2), 0).iter().all(|&v| v == 0.0));
    }
}
