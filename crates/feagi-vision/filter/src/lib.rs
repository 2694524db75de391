// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # FEAGI Vision Filtering
//!
//! Convolution and pooling over padded 2D rasters:
//! - **Geometry**: output size and sampling offsets from border, spacing and filter size
//! - **Convolution**: polarity-split filter banks (`conv`, `conv1`, `conv_diff`) and the
//!   adjoint accumulation (`deconv`)
//! - **Pooling**: max-pooling, un-pooling, polarity max-reduce, feature-row aggregation
//! - **Padding / Norm**: wrap and fade padding, log renormalisation
//!
//! ## Padding Contract
//! Every raster handed to a convolution must already carry a border of at least
//! `Geom::filter_right` pixels on each side. The hot loops do no bounds handling of
//! their own; a raster that violates the contract panics on indexing.
//!
//! ## Tensor Layout
//! All tensors are row-major `ndarray` arrays of `f32`:
//! - image: `[Y, X]`
//! - filter bank: `[Filter, FY, FX]`
//! - feature map: `[Y, X, Polarity, Angle]`

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod agg;
pub mod conv;
pub mod deconv;
pub mod error;
pub mod geom;
pub mod norm;
pub mod padding;
pub mod parallel;
pub mod pool;
pub mod reduce;
pub mod shape;

pub use agg::{feat_agg, outer_agg};
pub use conv::{conv, conv1, conv_diff, polarity_split};
pub use deconv::deconv;
pub use error::{FilterError, Result};
pub use geom::{left_half, offset_index, Geom, Point2};
pub use norm::{tensor_log_norm, unit_norm};
pub use padding::{edge_avg, fade_pad, fade_pad_rgb, wrap_pad, wrap_pad_rgb, wrap_pad_xy};
pub use parallel::{split_axis_mut, thread_split, ThreadSplit, WorkerPool};
pub use pool::{max_pool, pooled_size, unpool, UnPoolMode};
pub use reduce::max_reduce_filter_y;
pub use shape::{ensure_shape, ShapeOutcome};
