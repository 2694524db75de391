// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Adjoint of [`crate::conv`]: scatter filter-weighted activations back onto a raster

use ndarray::{s, Array2, Array3, Array4, Axis, Zip};

use crate::error::{FilterError, Result};
use crate::geom::{Geom, Point2};

/// Accumulate (`+=`) into `image` the reconstruction implied by a polarity-split filter
/// output `out` `[Y, X, 2, F]`.
///
/// For each output cell the signed activation is recovered as the on value when it is
/// positive, else the negated off value, and `activation × filter` is added over the cell's
/// receptive field. Overlapping fields sum, so the result is a lossy diagnostic view of what
/// the filter responses encode, not an inverse.
///
/// There is no gain argument and none is applied: the activations already carry the gain
/// given to `conv`, and scaling `out` scales the result.
///
/// `out` must have exactly the shape `conv` would produce for this geometry and raster;
/// otherwise nothing is written and [`FilterError::ShapeMismatch`] is returned.
pub fn deconv(
    geom: &mut Geom,
    filters: &Array3<f32>,
    image: &mut Array2<f32>,
    out: &Array4<f32>,
) -> Result<()> {
    let (nf, fy, fx) = filters.dim();
    geom.filter_size = Point2::new(fx, fy);
    geom.update_filter();
    let (iy, ix) = image.dim();
    geom.set_size(Point2::new(ix, iy));

    let expected = [geom.output.y, geom.output.x, 2, nf];
    if out.shape() != expected {
        tracing::warn!(
            expected = ?expected,
            actual = ?out.shape(),
            "deconv output shape does not match geometry, skipping"
        );
        return Err(FilterError::ShapeMismatch {
            op: "deconv",
            expected: expected.to_vec(),
            actual: out.shape().to_vec(),
        });
    }

    let ist = geom.input_start();
    for f in 0..nf {
        let filter = filters.index_axis(Axis(0), f);
        for y in 0..geom.output.y {
            let iy = ist.y + y * geom.spacing.y;
            for x in 0..geom.output.x {
                let ix = ist.x + x * geom.spacing.x;
                let on = out[[y, x, 0, f]];
                let act = if on > 0.0 { on } else { -out[[y, x, 1, f]] };
                if act == 0.0 {
                    continue;
                }
                let mut field = image.slice_mut(s![iy..iy + fy, ix..ix + fx]);
                Zip::from(&mut field)
                    .and(&filter)
                    .for_each(|iv, &fv| *iv += act * fv);
            }
        }
    }
    Ok(())
}
