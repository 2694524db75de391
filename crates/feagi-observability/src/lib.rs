// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # feagi-vision-observability
//!
//! Logging setup shared by the visual front-end crates, with per-crate debug flag support.
//!
//! The library crates only emit `tracing` events; nothing is printed until an application
//! installs a subscriber through [`init_logging`].
//!
//! ## Features
//! - `file-logging`: JSON log files with daily rotation under a timestamped run directory

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod init;

pub use cli::*;
pub use init::*;
pub use tracing_subscriber::EnvFilter;

/// Workspace crate names accepted by the debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "feagi-vision",
    "feagi-vision-filter",
    "feagi-vision-inhibition",
    "feagi-vision-complex",
    "feagi-vision-config",
];
