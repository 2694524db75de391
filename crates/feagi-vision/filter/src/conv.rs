// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Convolution Engine
//!
//! Slides filter kernels over a padded raster and writes a rectified polarity split:
//!
//! ```text
//! sum = gain × Σ image[iy + fy, ix + fx] × filter[fy, fx]
//!     iy = border.y - filter_left.y + y × spacing.y   (same for x)
//!
//! sum > 0  →  on = sum, off = 0
//! else     →  on = 0,   off = -sum
//! ```
//!
//! Downstream stages rely on both channels being non-negative.

use ndarray::{s, Array2, Array3, Array4, ArrayView2, ArrayViewMut3, ArrayViewMut4, Axis, Zip};

use crate::error::{FilterError, Result};
use crate::geom::{Geom, Point2};
use crate::parallel::{split_axis_mut, WorkerPool};
use crate::shape::{ensure_shape, ShapeOutcome};

/// Split a signed response into non-negative (on, off) channels.
///
/// Exactly one channel is non-zero for a non-zero `sum`, and `on - off == sum`.
#[inline(always)]
pub fn polarity_split(sum: f32) -> (f32, f32) {
    if sum > 0.0 {
        (sum, 0.0)
    } else {
        (0.0, -sum)
    }
}

#[inline(always)]
fn window_dot(image: &Array2<f32>, filter: &ArrayView2<f32>, iy: usize, ix: usize) -> f32 {
    let (fy, fx) = filter.dim();
    let window = image.slice(s![iy..iy + fy, ix..ix + fx]);
    Zip::from(&window)
        .and(filter)
        .fold(0.0f32, |acc, &iv, &fv| acc + iv * fv)
}

fn configure(geom: &mut Geom, filter_y: usize, filter_x: usize, image: &Array2<f32>) {
    geom.filter_size = Point2::new(filter_x, filter_y);
    geom.update_filter();
    let (iy, ix) = image.dim();
    geom.set_size(Point2::new(ix, iy));
    tracing::trace!(
        out_x = geom.output.x,
        out_y = geom.output.y,
        border_x = geom.border.x,
        border_y = geom.border.y,
        "filter geometry"
    );
}

/// Convolve a bank of filters `[F, FY, FX]` over `image` into `out` `[Y, X, 2, F]`.
///
/// Updates `geom` from the filter and image sizes, reshapes `out` if needed, and runs
/// one task per contiguous range of filters.
pub fn conv(
    pool: &WorkerPool,
    geom: &mut Geom,
    filters: &Array3<f32>,
    image: &Array2<f32>,
    out: &mut Array4<f32>,
    gain: f32,
) -> Result<ShapeOutcome> {
    let (nf, fy, fx) = filters.dim();
    configure(geom, fy, fx, image);
    let outcome = ensure_shape(out, (geom.output.y, geom.output.x, 2, nf));

    let geom = &*geom;
    let ranges = pool.split(nf).ranges();
    let parts = split_axis_mut(out.view_mut(), Axis(3), &ranges);
    pool.run_parts(parts, |(f_start, mut chunk)| {
        conv_filters(geom, f_start, filters, image, &mut chunk, gain)
    })?;
    Ok(outcome)
}

fn conv_filters(
    geom: &Geom,
    f_start: usize,
    filters: &Array3<f32>,
    image: &Array2<f32>,
    out: &mut ArrayViewMut4<f32>,
    gain: f32,
) {
    let ist = geom.input_start();
    for fi in 0..out.len_of(Axis(3)) {
        let filter = filters.index_axis(Axis(0), f_start + fi);
        for y in 0..geom.output.y {
            let iy = ist.y + y * geom.spacing.y;
            for x in 0..geom.output.x {
                let ix = ist.x + x * geom.spacing.x;
                let (on, off) = polarity_split(window_dot(image, &filter, iy, ix) * gain);
                out[[y, x, 0, fi]] = on;
                out[[y, x, 1, fi]] = off;
            }
        }
    }
}

/// Convolve a single isotropic filter `[FY, FX]` over `image` into `out` `[2, Y, X]`.
///
/// Parallel over output rows.
pub fn conv1(
    pool: &WorkerPool,
    geom: &mut Geom,
    filter: &Array2<f32>,
    image: &Array2<f32>,
    out: &mut Array3<f32>,
    gain: f32,
) -> Result<ShapeOutcome> {
    let (fy, fx) = filter.dim();
    configure(geom, fy, fx, image);
    let outcome = ensure_shape(out, (2, geom.output.y, geom.output.x));

    let geom = &*geom;
    let filter = filter.view();
    let ranges = pool.split(geom.output.y).ranges();
    let parts = split_axis_mut(out.view_mut(), Axis(1), &ranges);
    pool.run_parts(parts, |(y_start, mut rows)| {
        let ist = geom.input_start();
        for yi in 0..rows.len_of(Axis(1)) {
            let iy = ist.y + (y_start + yi) * geom.spacing.y;
            for x in 0..geom.output.x {
                let ix = ist.x + x * geom.spacing.x;
                let (on, off) = polarity_split(window_dot(image, &filter, iy, ix) * gain);
                rows[[0, yi, x]] = on;
                rows[[1, yi, x]] = off;
            }
        }
    })?;
    Ok(outcome)
}

/// Difference of two convolutions over two rasters, polarity split into `out` `[2, Y, X]`:
/// `gain × (gain_on × (filter_on ⋆ image_on) - (filter_off ⋆ image_off))`.
///
/// Used for colour-opponent filtering where the On and Off planes come from different
/// colour channels. Both rasters share one geometry and must have the same shape.
#[allow(clippy::too_many_arguments)]
pub fn conv_diff(
    pool: &WorkerPool,
    geom: &mut Geom,
    filter_on: &Array2<f32>,
    filter_off: &Array2<f32>,
    image_on: &Array2<f32>,
    image_off: &Array2<f32>,
    out: &mut Array3<f32>,
    gain: f32,
    gain_on: f32,
) -> Result<ShapeOutcome> {
    if image_on.dim() != image_off.dim() {
        return Err(FilterError::ShapeMismatch {
            op: "conv_diff",
            expected: image_on.shape().to_vec(),
            actual: image_off.shape().to_vec(),
        });
    }
    if filter_on.dim() != filter_off.dim() {
        return Err(FilterError::ShapeMismatch {
            op: "conv_diff",
            expected: filter_on.shape().to_vec(),
            actual: filter_off.shape().to_vec(),
        });
    }
    let (fy, fx) = filter_on.dim();
    configure(geom, fy, fx, image_on);
    let outcome = ensure_shape(out, (2, geom.output.y, geom.output.x));

    let geom = &*geom;
    let (flt_on, flt_off) = (filter_on.view(), filter_off.view());
    let ranges = pool.split(geom.output.y).ranges();
    let parts = split_axis_mut(out.view_mut(), Axis(1), &ranges);
    pool.run_parts(parts, |(y_start, mut rows): (usize, ArrayViewMut3<f32>)| {
        let ist = geom.input_start();
        for yi in 0..rows.len_of(Axis(1)) {
            let iy = ist.y + (y_start + yi) * geom.spacing.y;
            for x in 0..geom.output.x {
                let ix = ist.x + x * geom.spacing.x;
                let sum_on = window_dot(image_on, &flt_on, iy, ix);
                let sum_off = window_dot(image_off, &flt_off, iy, ix);
                let (on, off) = polarity_split(gain * (gain_on * sum_on - sum_off));
                rows[[0, yi, x]] = on;
                rows[[1, yi, x]] = off;
            }
        }
    })?;
    Ok(outcome)
}
