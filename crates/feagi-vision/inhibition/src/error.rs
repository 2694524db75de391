// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for inhibition and activation

use feagi_vision_filter::FilterError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InhibitionError {
    /// Parameter outside its valid range
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("{op}: shape mismatch, expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        op: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Orientation tables are defined for a fixed number of angles only
    #[error("Expected {expected} angles on the inner axis, got {actual}")]
    UnsupportedAngles { expected: usize, actual: usize },

    #[error(transparent)]
    Filter(#[from] FilterError),
}

impl InhibitionError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Result type for inhibition operations
pub type Result<T> = core::result::Result<T, InhibitionError>;
