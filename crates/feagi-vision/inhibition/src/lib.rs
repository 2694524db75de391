// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # FEAGI Vision Inhibition
//!
//! Turns raw filter drive into sparse, contrast-normalised activation:
//! - **FFFB**: feedforward + feedback inhibition per group of units
//! - **Noisy-XX1**: the rate-code activation function
//! - **kWTA**: iterative solver combining the two, at layer or layer + pool granularity
//! - **Neighbor inhibition**: extra per-unit inhibition from orthogonal same-feature neighbors,
//!   fed to the solver as external inhibition
//!
//! ## Parameter Lifecycle
//! Parameters with derived constants are immutable once built: [`Nxx1Params`] comes from a
//! builder and [`Kwta`] from [`Kwta::new`]. [`FffbParams::fb_dt`] is computed on read.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod chans;
pub mod error;
pub mod fffb;
pub mod kwta;
pub mod neigh;
pub mod nxx1;

pub use chans::Chans;
pub use error::{InhibitionError, Result};
pub use fffb::{AvgMax, FffbParams, Inhib, Inhibs};
pub use kwta::{Kwta, KwtaParams, KwtaReport};
pub use neigh::{NeighInhib, NEIGH4_X, NEIGH4_Y};
pub use nxx1::{Nxx1Builder, Nxx1Params};
