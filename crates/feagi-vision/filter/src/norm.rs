// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Renormalisation helpers, generic over the float element type

use ndarray::{ArrayBase, DataMut, Dimension, NdFloat};

use crate::error::{FilterError, Result};

/// Replace every value `v` by `ln(1 + v)`, then divide by the max of its group.
///
/// Groups are the sub-tensors under the first `ndim` axes: `ndim = 0` normalises the whole
/// tensor, `ndim = 1` each slice of the outer axis, and so on. A group whose max is zero is
/// left as is. The tensor must be contiguous in standard layout.
pub fn tensor_log_norm<A, S, D>(tsr: &mut ArrayBase<S, D>, ndim: usize) -> Result<()>
where
    A: NdFloat,
    S: DataMut<Elem = A>,
    D: Dimension,
{
    if ndim > 0 && ndim >= tsr.ndim() {
        return Err(FilterError::InvalidParameter(format!(
            "log norm over {ndim} outer dims of a rank-{} tensor",
            tsr.ndim()
        )));
    }
    let group: usize = tsr.shape()[ndim..].iter().product();
    let values = tsr
        .as_slice_mut()
        .ok_or(FilterError::NotContiguous("tensor_log_norm"))?;
    if group == 0 {
        return Ok(());
    }

    for chunk in values.chunks_mut(group) {
        let mut max = A::neg_infinity();
        for v in chunk.iter_mut() {
            *v = v.ln_1p();
            if *v > max {
                max = *v;
            }
        }
        if max != A::zero() {
            chunk.iter_mut().for_each(|v| *v = *v / max);
        }
    }
    Ok(())
}

/// Min-max rescale into `0..=1`. A constant tensor becomes all zeros.
pub fn unit_norm<A, S, D>(tsr: &mut ArrayBase<S, D>)
where
    A: NdFloat,
    S: DataMut<Elem = A>,
    D: Dimension,
{
    let (min, max) = tsr.iter().fold(
        (A::infinity(), A::neg_infinity()),
        |(lo, hi), &v| (lo.min(v), hi.max(v)),
    );
    let range = max - min;
    if range.is_nan() || range <= A::zero() {
        tsr.fill(A::zero());
        return;
    }
    tsr.mapv_inplace(|v| (v - min) / range);
}
