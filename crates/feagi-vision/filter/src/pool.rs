// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Max-pooling and its approximate inverse over `[Y, X, Polarity, Angle]` feature maps.
//!
//! Both directions run one task per contiguous range of the flattened `Polarity × Angle`
//! feature index. Pool spacing must equal the pool size (tiled) or half of it (50% overlap);
//! that is a convention of the callers and is not checked here.

use ndarray::{Array4, ArrayView3, ArrayViewMut3, Axis};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

use crate::error::{FilterError, Result};
use crate::geom::Point2;
use crate::parallel::{split_axis_mut, WorkerPool};
use crate::shape::{ensure_shape, ShapeOutcome};

/// How [`unpool`] spreads a pooled value back over its window
pub enum UnPoolMode<'a> {
    /// Copy the pooled value to every cell of the window
    Broadcast,
    /// Put the pooled value on one uniformly drawn cell and zero the rest.
    ///
    /// Each feature partition seeds its own `StdRng` from this source, so a fixed seed and
    /// worker count reproduce the same placement.
    Randomized(&'a mut dyn RngCore),
}

impl std::fmt::Debug for UnPoolMode<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnPoolMode::Broadcast => f.write_str("Broadcast"),
            UnPoolMode::Randomized(_) => f.write_str("Randomized"),
        }
    }
}

/// Output grid of a pooling pass over an `input`-sized grid.
///
/// `input / spacing`, minus one cell per axis when the windows overlap
/// (`spacing != pool_size`).
pub fn pooled_size(pool_size: Point2, spacing: Point2, input: Point2) -> Result<Point2> {
    if spacing.x == 0 || spacing.y == 0 || pool_size.x == 0 || pool_size.y == 0 {
        return Err(FilterError::InvalidGeometry(format!(
            "pool size {pool_size:?} and spacing {spacing:?} must be non-zero"
        )));
    }
    let axis = |inp: usize, spc: usize, psz: usize| {
        let out = inp / spc;
        if spc != psz {
            out.saturating_sub(1)
        } else {
            out
        }
    };
    Ok(Point2::new(
        axis(input.x, spacing.x, pool_size.x),
        axis(input.y, spacing.y, pool_size.y),
    ))
}

/// Max over each `pool_size` window of `input` `[Y, X, Pol, Ang]` into `out`.
///
/// The running max starts at 0, so results are floored at zero. Feature maps fed here are
/// rectified upstream.
pub fn max_pool(
    pool: &WorkerPool,
    pool_size: Point2,
    spacing: Point2,
    input: &Array4<f32>,
    out: &mut Array4<f32>,
) -> Result<ShapeOutcome> {
    let (ny, nx, npol, nang) = input.dim();
    let osz = pooled_size(pool_size, spacing, Point2::new(nx, ny))?;
    let outcome = ensure_shape(out, (osz.y, osz.x, npol, nang));

    let nf = npol * nang;
    let src = input.view().into_shape_with_order((ny, nx, nf))?;
    let dst = out.view_mut().into_shape_with_order((osz.y, osz.x, nf))?;
    let ranges = pool.split(nf).ranges();
    let parts = split_axis_mut(dst, Axis(2), &ranges);
    pool.run_parts(parts, |(f_start, mut chunk)| {
        max_pool_features(pool_size, spacing, &src, f_start, &mut chunk)
    })?;
    Ok(outcome)
}

fn max_pool_features(
    psize: Point2,
    spc: Point2,
    src: &ArrayView3<f32>,
    f_start: usize,
    out: &mut ArrayViewMut3<f32>,
) {
    let (oy, ox, nf) = out.dim();
    for fi in 0..nf {
        let f = f_start + fi;
        for y in 0..oy {
            let iy = y * spc.y;
            for x in 0..ox {
                let ix = x * spc.x;
                let mut max = 0.0f32;
                for py in 0..psize.y {
                    for px in 0..psize.x {
                        let v = src[[iy + py, ix + px, f]];
                        if v > max {
                            max = v;
                        }
                    }
                }
                out[[y, x, fi]] = max;
            }
        }
    }
}

/// Spread `pooled` back over `unpooled` `[Y, X, Pol, Ang]`, the grid it was pooled from.
///
/// No arg-max is tracked: every window cell gets the pooled value ([`UnPoolMode::Broadcast`])
/// or a single random cell does ([`UnPoolMode::Randomized`]). With overlapping windows later
/// windows overwrite earlier ones.
///
/// `unpooled` is not resized: its shape decides the pooled shape, and a `pooled` tensor
/// that does not match is rejected with [`FilterError::ShapeMismatch`].
pub fn unpool(
    pool: &WorkerPool,
    pool_size: Point2,
    spacing: Point2,
    pooled: &Array4<f32>,
    unpooled: &mut Array4<f32>,
    mode: UnPoolMode<'_>,
) -> Result<()> {
    let (ny, nx, npol, nang) = unpooled.dim();
    let osz = pooled_size(pool_size, spacing, Point2::new(nx, ny))?;
    let expected = [osz.y, osz.x, npol, nang];
    if pooled.shape() != expected {
        tracing::warn!(
            expected = ?expected,
            actual = ?pooled.shape(),
            "pooled tensor does not match unpool target, skipping"
        );
        return Err(FilterError::ShapeMismatch {
            op: "unpool",
            expected: expected.to_vec(),
            actual: pooled.shape().to_vec(),
        });
    }

    let nf = npol * nang;
    let src = pooled.view().into_shape_with_order((osz.y, osz.x, nf))?;
    let dst = unpooled.view_mut().into_shape_with_order((ny, nx, nf))?;
    let ranges = pool.split(nf).ranges();
    let parts = split_axis_mut(dst, Axis(2), &ranges);

    match mode {
        UnPoolMode::Broadcast => pool.run_parts(parts, |(f_start, mut chunk)| {
            unpool_features(pool_size, spacing, &src, f_start, &mut chunk, None)
        }),
        UnPoolMode::Randomized(rng) => {
            let seeded: Vec<_> = parts
                .into_iter()
                .map(|part| (part, rng.gen::<u64>()))
                .collect();
            pool.run_parts(seeded, |((f_start, mut chunk), seed)| {
                let mut part_rng = StdRng::seed_from_u64(seed);
                unpool_features(
                    pool_size,
                    spacing,
                    &src,
                    f_start,
                    &mut chunk,
                    Some(&mut part_rng),
                )
            })
        }
    }
}

fn unpool_features(
    psize: Point2,
    spc: Point2,
    src: &ArrayView3<f32>,
    f_start: usize,
    out: &mut ArrayViewMut3<f32>,
    mut rng: Option<&mut StdRng>,
) {
    let (oy, ox, _) = src.dim();
    let nf = out.len_of(Axis(2));
    let psz = psize.x * psize.y;
    for fi in 0..nf {
        let f = f_start + fi;
        for y in 0..oy {
            let iy = y * spc.y;
            for x in 0..ox {
                let ix = x * spc.x;
                let val = src[[y, x, f]];
                let target = rng.as_deref_mut().map(|r| r.gen_range(0..psz));
                let mut pdx = 0;
                for py in 0..psize.y {
                    for px in 0..psize.x {
                        let v = match target {
                            Some(t) if t != pdx => 0.0,
                            _ => val,
                        };
                        out[[iy + py, ix + px, fi]] = v;
                        pdx += 1;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;

    fn ramp(ny: usize, nx: usize, npol: usize, nang: usize) -> Array4<f32> {
        Array::from_shape_fn((ny, nx, npol, nang), |(y, x, p, a)| {
            (y * 1000 + x * 100 + p * 10 + a) as f32
        })
    }

    #[test]
    fn test_pooled_size_tiled_and_overlapping() {
        let tiled = pooled_size(Point2::splat(2), Point2::splat(2), Point2::new(8, 6)).unwrap();
        assert_eq!(tiled, Point2::new(4, 3));
        let overlap = pooled_size(Point2::splat(4), Point2::splat(2), Point2::new(8, 6)).unwrap();
        assert_eq!(overlap, Point2::new(3, 2));
    }

    #[test]
    fn test_pooled_size_rejects_zero_spacing() {
        let err = pooled_size(Point2::splat(2), Point2::new(0, 2), Point2::splat(4));
        assert!(matches!(err, Err(FilterError::InvalidGeometry(_))));
    }

    #[test]
    fn test_max_pool_is_per_feature() {
        let pool = WorkerPool::new(3);
        let input = ramp(4, 4, 2, 3);
        let mut out = Array4::zeros((0, 0, 0, 0));
        max_pool(&pool, Point2::splat(2), Point2::splat(2), &input, &mut out).unwrap();

        assert_eq!(out.shape(), &[2, 2, 2, 3]);
        for ((y, x, p, a), &v) in out.indexed_iter() {
            // ramp grows with y and x, so the window max is its bottom-right cell
            assert_eq!(v, input[[y * 2 + 1, x * 2 + 1, p, a]]);
        }
    }

    #[test]
    fn test_max_pool_overlapping_windows() {
        let pool = WorkerPool::new(2);
        let mut input = Array4::zeros((4, 4, 1, 1));
        input[[2, 2, 0, 0]] = 5.0;
        let mut out = Array4::zeros((0, 0, 0, 0));
        max_pool(&pool, Point2::splat(2), Point2::splat(1), &input, &mut out).unwrap();

        assert_eq!(out.shape(), &[3, 3, 1, 1]);
        let hits: Vec<_> = out
            .indexed_iter()
            .filter(|&(_, &v)| v == 5.0)
            .map(|((y, x, _, _), _)| (y, x))
            .collect();
        assert_eq!(hits, vec![(1, 1), (1, 2), (2, 1), (2, 2)]);
    }

    #[test]
    fn test_max_pool_floors_negative_at_zero() {
        let pool = WorkerPool::new(1);
        let input = Array4::from_elem((2, 2, 1, 1), -3.0f32);
        let mut out = Array4::zeros((1, 1, 1, 1));
        let outcome =
            max_pool(&pool, Point2::splat(2), Point2::splat(2), &input, &mut out).unwrap();
        assert_eq!(outcome, ShapeOutcome::Reused);
        assert_eq!(out[[0, 0, 0, 0]], 0.0);
    }

    #[test]
    fn test_unpool_broadcast_fills_windows() {
        let pool = WorkerPool::new(2);
        let pooled = ramp(2, 2, 2, 2);
        let mut unpooled = Array4::from_elem((4, 4, 2, 2), -1.0f32);
        unpool(
            &pool,
            Point2::splat(2),
            Point2::splat(2),
            &pooled,
            &mut unpooled,
            UnPoolMode::Broadcast,
        )
        .unwrap();

        for ((y, x, p, a), &v) in unpooled.indexed_iter() {
            assert_eq!(v, pooled[[y / 2, x / 2, p, a]]);
        }
    }

    #[test]
    fn test_unpool_randomized_single_cell_and_reproducible() {
        let pool = WorkerPool::new(2);
        let pooled = Array4::from_elem((2, 2, 2, 2), 1.5f32);
        let run = |seed: u64| {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut unpooled = Array4::zeros((4, 4, 2, 2));
            unpool(
                &pool,
                Point2::splat(2),
                Point2::splat(2),
                &pooled,
                &mut unpooled,
                UnPoolMode::Randomized(&mut rng),
            )
            .unwrap();
            unpooled
        };

        let first = run(42);
        for wy in 0..2 {
            for wx in 0..2 {
                for p in 0..2 {
                    for a in 0..2 {
                        let window = first.slice(ndarray::s![
                            wy * 2..wy * 2 + 2,
                            wx * 2..wx * 2 + 2,
                            p,
                            a
                        ]);
                        assert_eq!(window.iter().filter(|&&v| v == 1.5).count(), 1);
                        assert_eq!(window.iter().filter(|&&v| v == 0.0).count(), 3);
                    }
                }
            }
        }
        assert_eq!(first, run(42));
    }

    #[test]
    fn test_unpool_rejects_mismatched_pooled() {
        let pool = WorkerPool::new(1);
        let pooled = Array4::from_elem((3, 2, 1, 1), 1.0f32);
        let mut unpooled = Array4::zeros((4, 4, 1, 1));
        let err = unpool(
            &pool,
            Point2::splat(2),
            Point2::splat(2),
            &pooled,
            &mut unpooled,
            UnPoolMode::Broadcast,
        );
        assert!(matches!(err, Err(FilterError::ShapeMismatch { op: "unpool", .. })));
        assert!(unpooled.iter().all(|&v| v == 0.0));
    }
}
