// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

#![cfg(feature = "file-logging")]

use feagi_vision_observability::{init_file_logging, CrateDebugFlags, LogFormat};
use tempfile::tempdir;

#[test]
fn test_file_logging_creates_run_directory() {
    let dir = tempdir().unwrap();
    let flags = CrateDebugFlags::from_args(vec!["--debug-all".to_string()]);

    let guard = init_file_logging(&flags, LogFormat::Text, dir.path()).unwrap();
    tracing::info!(target: "feagi_vision", "written to file");

    let run_dir = guard.log_dir().to_path_buf();
    assert!(run_dir.starts_with(dir.path()));
    assert!(run_dir
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("run_")));
    drop(guard);
    assert!(std::fs::read_dir(&run_dir).unwrap().next().is_some());
}
