// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # FEAGI Vision - Bio-inspired Visual Front-End
//!
//! Turns grey-scale images into sparse, oriented feature maps the way early visual cortex
//! does: oriented filtering, rectification into on/off channels, competitive inhibition, then
//! pooled complex-cell features.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! feagi-vision = "0.0.1-beta.18"
//! ```
//!
//! ```rust,no_run
//! use feagi_vision::prelude::*;
//! use ndarray::{Array2, Array3};
//!
//! let config = load_config(None, None)?;
//! init_logging_from_config(&config, &parse_debug_flags(), LogFormat::Text)?;
//! let filters: Array3<f32> = Array3::zeros((4, 12, 12)); // your gabor bank [angle, y, x]
//! let mut v1 = V1Pipeline::from_config(&config, filters)?;
//!
//! let raw = Array2::<f32>::zeros((128, 128));
//! let image = v1.prepare_image(&raw)?;
//! let features = v1.run(&image)?;
//! println!("V1 features: {:?}", features.shape());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Feature Flags
//!
//! - **`file-logging`**: rotating JSON log files via `feagi_vision::observability`
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Foundation: feagi-vision-config, -observability        │
//! │  (TOML settings, tracing setup)                         │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Filtering: feagi-vision-filter                         │
//! │  (geometry, conv/deconv, pooling, worker pool)          │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Competition: feagi-vision-inhibition                   │
//! │  (FFFB, Noisy-XX1, kWTA, neighbor inhibition)           │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Complex cells: feagi-vision-complex                    │
//! │  (length-sum, end-stop)                                 │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Pipeline: feagi_vision::pipeline::V1Pipeline           │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## License
//!
//! Apache-2.0

// Re-export foundation
pub use feagi_vision_config as config;
pub use feagi_vision_observability as observability;

// Re-export algorithms
pub use feagi_vision_complex as complex;
pub use feagi_vision_filter as filter;
pub use feagi_vision_inhibition as inhibition;

pub mod logging;
pub mod pipeline;

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude - commonly used types and functions
pub mod prelude {
    pub use crate::config::{load_config, validate_config, VisionConfig};
    pub use crate::filter::{Geom, Point2, ShapeOutcome, WorkerPool};
    pub use crate::inhibition::{Kwta, KwtaParams, KwtaReport, NeighInhib, Nxx1Params};
    pub use crate::logging::init_logging_from_config;
    pub use crate::observability::{parse_debug_flags, CrateDebugFlags, LogFormat};
    pub use crate::pipeline::{PipelineError, V1Pipeline};
}
