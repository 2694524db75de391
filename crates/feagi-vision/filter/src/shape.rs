// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Reshape-on-demand for caller-owned output tensors

use ndarray::{Array, Dimension, IntoDimension};

/// What happened to an output tensor on entry to an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeOutcome {
    /// Existing allocation had the required shape and was written in place
    Reused,
    /// Output was reallocated (zero-filled) to the required shape
    Reshaped,
}

impl ShapeOutcome {
    pub fn was_reshaped(self) -> bool {
        matches!(self, ShapeOutcome::Reshaped)
    }
}

/// Make `out` have exactly `shape` in standard (row-major) layout.
///
/// Repeated calls with a stable shape never reallocate.
pub fn ensure_shape<D, Sh>(out: &mut Array<f32, D>, shape: Sh) -> ShapeOutcome
where
    D: Dimension,
    Sh: IntoDimension<Dim = D>,
{
    let dim = shape.into_dimension();
    if out.raw_dim() == dim && out.is_standard_layout() {
        return ShapeOutcome::Reused;
    }
    *out = Array::zeros(dim);
    ShapeOutcome::Reshaped
}
