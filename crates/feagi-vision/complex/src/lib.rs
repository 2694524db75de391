// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # FEAGI Vision Complex Cells
//!
//! Complex-cell responses built on angle-only simple-cell activation (the polarity axis
//! already max-reduced):
//! - **Length-sum**: activation averaged along each unit's own orientation
//! - **End-stop**: length-sum behind a unit minus the strongest activation just ahead of it,
//!   computed in both directions
//!
//! Both operate on `[Y, X, Py, Angle]` tensors with exactly four angles
//! (`-`, `/`, `|`, `\`) and split work across layer rows.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod endstop;
pub mod error;
pub mod lensum;

pub use endstop::{end_stop4, END_STOP_OFF4_X, END_STOP_OFF4_Y, END_STOP_THR};
pub use error::{ComplexError, Result};
pub use lensum::{len_sum4, LINE4_X, LINE4_Y};
