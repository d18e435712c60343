//! Batch conversion across a worker pool.
//!
//! Enqueue -> Run -> Drain:
//!
//! ```no_run
//! use voxcloud::{BatchDriver, ConversionTask, ConvertOptions, GridSpec};
//!
//! let grid = GridSpec::new(110, 110, 110)?;
//! let mut driver = BatchDriver::new(ConvertOptions::default()).with_threads(4);
//! driver.enqueue(ConversionTask::from_legacy_layout("data", "scene0001", "labels.txt", grid));
//! driver.run();
//! for outcome in driver.drain() {
//!     println!("{}: {:?}", outcome.id, outcome.result.map(|cloud| cloud.len()));
//! }
//! # Ok::<(), voxcloud::VoxelizeError>(())
//! ```
//!
//! Every task is an independent call into [`convert_mesh`]; its mesh, grid
//! and output buffer live only for the duration of the task. Label tables
//! are loaded once per distinct path and shared read-only.

use crate::config::ConvertOptions;
use crate::convert::convert_mesh;
use crate::emit::PointCloud;
use crate::error::{Result, VoxelizeError};
use crate::grid::GridSpec;
use crate::labels::LabelTable;
use crate::mesh::Mesh;
use rayon::prelude::*;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// One mesh to convert.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionTask {
    /// Identifier reported back with the outcome
    pub id: String,
    pub mesh_path: PathBuf,
    pub label_path: PathBuf,
    pub grid: GridSpec,
}

impl ConversionTask {
    pub fn new(
        id: impl Into<String>,
        mesh_path: impl Into<PathBuf>,
        label_path: impl Into<PathBuf>,
        grid: GridSpec,
    ) -> Self {
        Self {
            id: id.into(),
            mesh_path: mesh_path.into(),
            label_path: label_path.into(),
            grid,
        }
    }

    /// Dataset layout `<root>/<id>/<id>.obj`.
    pub fn from_legacy_layout(
        root: impl AsRef<Path>,
        id: impl Into<String>,
        label_path: impl Into<PathBuf>,
        grid: GridSpec,
    ) -> Self {
        let id = id.into();
        let mesh_path = root.as_ref().join(&id).join(format!("{id}.obj"));
        Self::new(id, mesh_path, label_path, grid)
    }
}

/// Result of one task.
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    pub id: String,
    pub mesh_path: PathBuf,
    pub result: Result<PointCloud>,
    pub elapsed: Duration,
}

impl TaskOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Totals over a set of outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub points: usize,
}

impl BatchSummary {
    pub fn summarize<'a>(outcomes: impl IntoIterator<Item = &'a TaskOutcome>) -> Self {
        outcomes
            .into_iter()
            .fold(Self::default(), |mut summary, outcome| {
                match &outcome.result {
                    Ok(cloud) => {
                        summary.succeeded += 1;
                        summary.points += cloud.len();
                    }
                    Err(_) => summary.failed += 1,
                }
                summary
            })
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

pub struct BatchDriver {
    options: ConvertOptions,
    /// Worker count, 0 = rayon default
    threads: usize,
    pending: Vec<ConversionTask>,
    completed: Vec<TaskOutcome>,
}

impl BatchDriver {
    pub fn new(options: ConvertOptions) -> Self {
        Self {
            options,
            threads: 0,
            pending: Vec::new(),
            completed: Vec::new(),
        }
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    pub fn enqueue(&mut self, task: ConversionTask) {
        self.pending.push(task);
    }

    pub fn enqueue_all(&mut self, tasks: impl IntoIterator<Item = ConversionTask>) {
        self.pending.extend(tasks);
    }

    /// Process all pending tasks. Returns the number processed.
    pub fn run(&mut self) -> usize {
        self.run_with(|_| {})
    }

    /// Process all pending tasks, calling `on_complete` from the worker
    /// thread as each one finishes. Outcomes are stored in enqueue order.
    pub fn run_with<F>(&mut self, on_complete: F) -> usize
    where
        F: Fn(&TaskOutcome) + Sync,
    {
        let outcomes = self.dispatch(|outcome| {
            on_complete(&outcome);
            outcome
        });
        let count = outcomes.len();
        self.completed.extend(outcomes);
        count
    }

    /// Process all pending tasks, handing each outcome to `consume` on the
    /// worker thread instead of storing it. Results are returned in enqueue
    /// order; nothing is left to drain.
    pub fn run_map<T, F>(&mut self, consume: F) -> Vec<T>
    where
        T: Send,
        F: Fn(TaskOutcome) -> T + Sync,
    {
        self.dispatch(consume)
    }

    fn dispatch<T, F>(&mut self, consume: F) -> Vec<T>
    where
        T: Send,
        F: Fn(TaskOutcome) -> T + Sync,
    {
        if self.pending.is_empty() {
            return Vec::new();
        }

        let tasks = std::mem::take(&mut self.pending);
        let jobs = self.resolve_label_tables(tasks);
        let options = &self.options;

        let succeeded = AtomicUsize::new(0);
        let failed = AtomicUsize::new(0);
        let points = AtomicUsize::new(0);

        let work = || -> Vec<T> {
            jobs.into_par_iter()
                .map(|(task, labels)| {
                    let outcome = run_task(task, labels, options);
                    match &outcome.result {
                        Ok(cloud) => {
                            succeeded.fetch_add(1, Ordering::Relaxed);
                            points.fetch_add(cloud.len(), Ordering::Relaxed);
                        }
                        Err(_) => {
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                    consume(outcome)
                })
                .collect()
        };

        let start = Instant::now();
        let results = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.threads)
            .thread_name(|index| format!("voxcloud-worker-{index}"))
            .build()
        {
            Ok(pool) => pool.install(work),
            Err(err) => {
                warn!("Could not build worker pool ({err}); using the global rayon pool");
                work()
            }
        };

        info!(
            "Batch finished in {:.2?}: {} succeeded, {} failed, {} points",
            start.elapsed(),
            succeeded.into_inner(),
            failed.into_inner(),
            points.into_inner()
        );

        results
    }

    /// Take all completed outcomes.
    pub fn drain(&mut self) -> Vec<TaskOutcome> {
        std::mem::take(&mut self.completed)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    /// True when nothing is pending and nothing waits to be drained.
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.completed.is_empty()
    }

    fn resolve_label_tables(
        &self,
        tasks: Vec<ConversionTask>,
    ) -> Vec<(ConversionTask, Result<Arc<LabelTable>>)> {
        let mut cache: HashMap<PathBuf, Result<Arc<LabelTable>>> = HashMap::new();
        tasks
            .into_iter()
            .map(|task| {
                let labels = cache
                    .entry(task.label_path.clone())
                    .or_insert_with(|| {
                        LabelTable::load(&task.label_path)
                            .map(|table| Arc::new(table.with_fallback(self.options.fallback_label)))
                    })
                    .clone();
                (task, labels)
            })
            .collect()
    }
}

fn run_task(
    task: ConversionTask,
    labels: Result<Arc<LabelTable>>,
    options: &ConvertOptions,
) -> TaskOutcome {
    let start = Instant::now();
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let labels = labels?;
        let mesh = Mesh::load(&task.mesh_path, options)?;
        convert_mesh(&mesh, &labels, task.grid, options)
    }))
    .unwrap_or_else(|payload| Err(VoxelizeError::TaskPanicked(panic_message(payload.as_ref()))));

    let elapsed = start.elapsed();
    match &result {
        Ok(cloud) => debug!("{}: {} points in {:.2?}", task.id, cloud.len(), elapsed),
        Err(err) => warn!("{}: {}", task.id, err),
    }

    TaskOutcome {
        id: task.id,
        mesh_path: task.mesh_path,
        result,
        elapsed,
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_layout_path() {
        let grid = GridSpec::new(8, 8, 8).unwrap();
        let task =
            ConversionTask::from_legacy_layout("/data/scenes", "scene0042", "labels.txt", grid);
        assert_eq!(task.id, "scene0042");
        assert_eq!(
            task.mesh_path,
            PathBuf::from("/data/scenes/scene0042/scene0042.obj")
        );
    }

    #[test]
    fn test_empty_driver_is_idle() {
        let mut driver = BatchDriver::new(ConvertOptions::default());
        assert!(driver.is_idle());
        assert_eq!(driver.run(), 0);
        assert!(driver.drain().is_empty());
    }

    #[test]
    fn test_missing_label_file_reported_per_task() {
        let grid = GridSpec::new(2, 2, 2).unwrap();
        let mut driver = BatchDriver::new(ConvertOptions::default()).with_threads(2);
        driver.enqueue(ConversionTask::new("a", "a.obj", "/nonexistent/labels.txt", grid));
        driver.enqueue(ConversionTask::new("b", "b.obj", "/nonexistent/labels.txt", grid));
        assert_eq!(driver.pending_count(), 2);

        assert_eq!(driver.run(), 2);
        assert_eq!(driver.completed_count(), 2);

        let outcomes = driver.drain();
        assert_eq!(outcomes[0].id, "a");
        assert_eq!(outcomes[1].id, "b");
        assert!(outcomes
            .iter()
            .all(|o| o.result.as_ref().unwrap_err().is_not_found()));
        assert!(driver.is_idle());
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload = panic::catch_unwind(|| panic!("boom")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "boom");
    }

    #[test]
    fn test_summary_counts() {
        let ok = TaskOutcome {
            id: "ok".into(),
            mesh_path: PathBuf::new(),
            result: Ok(PointCloud::default()),
            elapsed: Duration::ZERO,
        };
        let failed = TaskOutcome {
            id: "bad".into(),
            mesh_path: PathBuf::new(),
            result: Err(VoxelizeError::InvalidGridSpec("zero".into())),
            elapsed: Duration::ZERO,
        };
        let summary = BatchSummary::summarize([&ok, &failed, &ok]);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.total(), 3);
    }
}
