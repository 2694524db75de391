// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for complex-cell filters

use feagi_vision_filter::FilterError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ComplexError {
    /// The line and end-stop tables cover exactly four orientations
    #[error("Expected {expected} angles on the inner axis, got {actual}")]
    UnsupportedAngles { expected: usize, actual: usize },

    /// An input tensor that must match another input does not
    #[error("{op}: shape mismatch, expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        op: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error(transparent)]
    Filter(#[from] FilterError),
}

/// Result type for complex-cell operations
pub type Result<T> = core::result::Result<T, ComplexError>;
