// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Edge handling for padded rasters.
//!
//! A raster handed to the convolution engine carries a `pad`-wide border on every side.
//! These routines fill that border in place from the interior, either by wrapping the
//! opposite edge around (toroidal) or by fading the nearest edge value toward the mean edge
//! value. The `_rgb` variants treat the outer axis of an `[C, Y, X]` tensor as independent
//! planes.

use ndarray::{ArrayBase, Axis, DataMut, Ix2, Ix3};

use crate::error::{FilterError, Result};
use crate::geom::Point2;

fn check_pad(dim: (usize, usize), pad: Point2) -> Result<()> {
    let (sy, sx) = dim;
    if 2 * pad.y > sy || 2 * pad.x > sx {
        return Err(FilterError::InvalidParameter(format!(
            "pad {pad:?} does not fit a {sy}x{sx} raster"
        )));
    }
    Ok(())
}

/// Fill the border with the interior from the opposite side.
pub fn wrap_pad<S>(tsr: &mut ArrayBase<S, Ix2>, pad: usize) -> Result<()>
where
    S: DataMut<Elem = f32>,
{
    wrap_pad_xy(tsr, Point2::splat(pad))
}

/// [`wrap_pad`] with a separate border width per axis (`pad.x` columns, `pad.y` rows)
pub fn wrap_pad_xy<S>(tsr: &mut ArrayBase<S, Ix2>, pad: Point2) -> Result<()>
where
    S: DataMut<Elem = f32>,
{
    check_pad(tsr.dim(), pad)?;
    let (sy, sx) = tsr.dim();
    let (uy, ux) = (sy - pad.y, sx - pad.x);
    let src_of = |i: usize, usz: usize, pad: usize| {
        if i < pad {
            usz - (pad - i)
        } else if i >= usz {
            pad + (i - usz)
        } else {
            i
        }
    };

    for y in 0..sy {
        let src_y = src_of(y, uy, pad.y);
        for x in (0..pad.x).chain(ux..sx) {
            tsr[[y, x]] = tsr[[src_y, src_of(x, ux, pad.x)]];
        }
    }
    for x in 0..sx {
        let src_x = src_of(x, ux, pad.x);
        for y in (0..pad.y).chain(uy..sy) {
            tsr[[y, x]] = tsr[[src_of(y, uy, pad.y), src_x]];
        }
    }
    Ok(())
}

/// [`wrap_pad`] over each plane of a `[C, Y, X]` tensor
pub fn wrap_pad_rgb<S>(tsr: &mut ArrayBase<S, Ix3>, pad: usize) -> Result<()>
where
    S: DataMut<Elem = f32>,
{
    for mut plane in tsr.axis_iter_mut(Axis(0)) {
        wrap_pad(&mut plane, pad)?;
    }
    Ok(())
}

/// Mean value of the ring of pixels just inside a `pad`-wide border (0 for an empty interior)
pub fn edge_avg<S>(tsr: &ArrayBase<S, Ix2>, pad: usize) -> Result<f32>
where
    S: ndarray::Data<Elem = f32>,
{
    check_pad(tsr.dim(), Point2::splat(pad))?;
    let (sy, sx) = tsr.dim();
    let (ey, ex) = (sy - 2 * pad, sx - 2 * pad);
    if ey == 0 || ex == 0 {
        return Ok(0.0);
    }
    let mut sum = 0.0f32;
    for y in pad..pad + ey {
        sum += tsr[[y, pad]] + tsr[[y, pad + ex - 1]];
    }
    for x in pad..pad + ex {
        sum += tsr[[pad, x]] + tsr[[pad + ey - 1, x]];
    }
    Ok(sum / (2 * (ey + ex)) as f32)
}

/// Fill the border by fading the nearest edge value toward [`edge_avg`].
///
/// At depth `d` into the border (0 = outermost) the value is
/// `p × edge + (1 - p) × avg` with `p = d / pad`.
pub fn fade_pad<S>(tsr: &mut ArrayBase<S, Ix2>, pad: usize) -> Result<()>
where
    S: DataMut<Elem = f32>,
{
    let avg = edge_avg(tsr, pad)?;
    let (sy, sx) = tsr.dim();
    if pad == 0 || sy == 2 * pad || sx == 2 * pad {
        return Ok(());
    }
    let (uy, ux) = (sy - pad, sx - pad);
    let clamp_y = |y: usize| y.clamp(pad, uy - 1);
    let clamp_x = |x: usize| x.clamp(pad, ux - 1);
    let fade = |d: usize, edge: f32| {
        let p = d as f32 / pad as f32;
        p * edge + (1.0 - p) * avg
    };

    for y in 0..sy {
        let ey = clamp_y(y);
        let (lv, rv) = (tsr[[ey, pad]], tsr[[ey, ux - 1]]);
        for x in 0..pad {
            if y < x || y >= sy - x {
                continue;
            }
            tsr[[y, x]] = fade(x, lv);
            tsr[[y, sx - 1 - x]] = fade(x, rv);
        }
    }
    for x in 0..sx {
        let ex = clamp_x(x);
        let (tv, bv) = (tsr[[pad, ex]], tsr[[uy - 1, ex]]);
        for y in 0..pad {
            if x < y || x >= sx - y {
                continue;
            }
            tsr[[y, x]] = fade(y, tv);
            tsr[[sy - 1 - y, x]] = fade(y, bv);
        }
    }
    Ok(())
}

/// [`fade_pad`] over each plane of a `[C, Y, X]` tensor
pub fn fade_pad_rgb<S>(tsr: &mut ArrayBase<S, Ix3>, pad: usize) -> Result<()>
where
    S: DataMut<Elem = f32>,
{
    for mut plane in tsr.axis_iter_mut(Axis(0)) {
        fade_pad(&mut plane, pad)?;
    }
    Ok(())
}
