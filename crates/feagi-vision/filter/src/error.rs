// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for filtering operations

use thiserror::Error;

/// Errors raised by the filtering core.
///
/// Output tensors of the wrong shape are not errors: they are reshaped in place and the
/// call reports [`crate::ShapeOutcome::Reshaped`]. Only inputs that cannot be corrected
/// without losing caller data end up here.
#[derive(Debug, Error)]
pub enum FilterError {
    /// A tensor the operation cannot resize has the wrong shape; nothing was written
    #[error("{op}: shape mismatch, expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        op: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Geometry parameters that cannot produce a valid sampling grid
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Operation needs a row-major contiguous tensor
    #[error("{0}: tensor is not contiguous in row-major order")]
    NotContiguous(&'static str),

    /// Invalid argument value
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),

    /// Worker thread pool could not be built
    #[error("Worker pool error: {0}")]
    WorkerPool(String),
}

/// Result type for filtering operations
pub type Result<T> = core::result::Result<T, FilterError>;
