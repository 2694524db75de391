// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Synchronous fan-out / fan-in over disjoint output partitions
//!
//! Every parallel filter splits its independent-unit axis (filter index, feature index or
//! output row) into contiguous ranges with [`thread_split`], carves the output tensor into
//! matching disjoint mutable views with [`split_axis_mut`], and runs one task per view on the
//! worker pool, blocking until all tasks are done. Disjointness of the views is what makes the
//! writes race-free; there is no locking anywhere.

use std::ops::Range;

use ndarray::{ArrayViewMut, Axis, Dimension};
use once_cell::sync::OnceCell;
use rayon::prelude::*;

use crate::error::{FilterError, Result};

/// Partition of `jobs` units of work across at most `workers` + 1 tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadSplit {
    /// Number of full tasks
    pub threads: usize,
    /// Jobs per full task
    pub per_thread: usize,
    /// Jobs in the trailing remainder task (0 = no remainder task)
    pub remainder: usize,
}

/// Split `jobs` across `workers`.
///
/// When there are no more jobs than workers every job gets its own task. Otherwise there are
/// `workers` tasks of `jobs / workers` jobs plus one remainder task of `jobs % workers`.
pub fn thread_split(workers: usize, jobs: usize) -> ThreadSplit {
    let workers = workers.max(1);
    if jobs <= workers {
        return ThreadSplit {
            threads: jobs,
            per_thread: 1,
            remainder: 0,
        };
    }
    ThreadSplit {
        threads: workers,
        per_thread: jobs / workers,
        remainder: jobs % workers,
    }
}

impl ThreadSplit {
    /// Contiguous, non-overlapping job ranges covering `0..jobs` in order
    pub fn ranges(&self) -> Vec<Range<usize>> {
        let mut ranges = Vec::with_capacity(self.threads + 1);
        for th in 0..self.threads {
            let start = th * self.per_thread;
            ranges.push(start..start + self.per_thread);
        }
        if self.remainder > 0 {
            let start = self.threads * self.per_thread;
            ranges.push(start..start + self.remainder);
        }
        ranges
    }

    pub fn total_jobs(&self) -> usize {
        self.threads * self.per_thread + self.remainder
    }
}

/// Carve `view` into disjoint sub-views along `axis`, one per range.
///
/// `ranges` must be contiguous and start at 0 (as produced by [`ThreadSplit::ranges`]).
/// Each entry carries the range start so tasks can recover absolute indices.
pub fn split_axis_mut<'a, A, D>(
    view: ArrayViewMut<'a, A, D>,
    axis: Axis,
    ranges: &[Range<usize>],
) -> Vec<(usize, ArrayViewMut<'a, A, D>)>
where
    D: Dimension,
{
    let mut parts = Vec::with_capacity(ranges.len());
    let mut rest = view;
    for range in ranges {
        let (head, tail) = rest.split_at(axis, range.len());
        parts.push((range.start, head));
        rest = tail;
    }
    parts
}

/// Explicitly owned worker context.
///
/// Carries the injected worker count; the rayon pool behind it is built on first use by
/// [`WorkerPool::ensure_pool`] and reused for every later call.
#[derive(Debug)]
pub struct WorkerPool {
    workers: usize,
    pool: OnceCell<rayon::ThreadPool>,
}

impl WorkerPool {
    /// Pool with a fixed worker count (0 is treated as 1)
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            pool: OnceCell::new(),
        }
    }

    /// Pool sized to the machine's available parallelism
    pub fn with_available_parallelism() -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self::new(workers)
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Partition `jobs` for this pool's worker count
    pub fn split(&self, jobs: usize) -> ThreadSplit {
        thread_split(self.workers, jobs)
    }

    /// Build the underlying thread pool once
    pub fn ensure_pool(&self) -> Result<&rayon::ThreadPool> {
        self.pool.get_or_try_init(|| {
            tracing::debug!(workers = self.workers, "building vision worker pool");
            rayon::ThreadPoolBuilder::new()
                .num_threads(self.workers)
                .thread_name(|i| format!("vision-worker-{i}"))
                .build()
                .map_err(|e| FilterError::WorkerPool(e.to_string()))
        })
    }

    /// Run one task per part and block until every task has finished
    pub fn run_parts<T, F>(&self, parts: Vec<T>, task: F) -> Result<()>
    where
        T: Send,
        F: Fn(T) + Send + Sync,
    {
        match parts.len() {
            0 => Ok(()),
            1 => {
                parts.into_iter().for_each(task);
                Ok(())
            }
            _ => {
                let pool = self.ensure_pool()?;
                pool.install(|| parts.into_par_iter().for_each(task));
                Ok(())
            }
        }
    }
}

impl Clone for WorkerPool {
    fn clone(&self) -> Self {
        Self::new(self.workers)
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::with_available_parallelism()
    }
}
