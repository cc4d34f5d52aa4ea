//! Batch conversion.
//!
//! Converts many top-level playbooks independently on a pool of worker
//! threads. A failure aborts only the playbook it occurred in.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use parking_lot::Mutex;

use super::engine::{ConversionReport, Converter};
use crate::caldera::ArtifactEmitter;
use crate::error::ConvertResult;
use crate::playbook::GraphLoader;

/// Result of converting one playbook of a batch.
#[derive(Debug)]
pub struct BatchOutcome {
    pub path: PathBuf,
    pub result: ConvertResult<ConversionReport>,
}

impl BatchOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Batch conversion options.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Maximum number of playbooks converted at once
    pub max_concurrency: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { max_concurrency: num_cpus::get().max(1) }
    }
}

/// Convert every playbook in `paths`.
///
/// Each worker builds its own converter through `make_converter`, so no
/// state other than the output directory is shared. Outcomes are returned
/// in input order.
pub fn convert_batch<L, E, F>(
    paths: &[PathBuf],
    config: &BatchConfig,
    make_converter: F,
) -> Vec<BatchOutcome>
where
    L: GraphLoader,
    E: ArtifactEmitter,
    F: Fn() -> ConvertResult<Converter<L, E>> + Sync,
{
    let workers = config.max_concurrency.clamp(1, paths.len().max(1));
    let next = AtomicUsize::new(0);
    let results: Mutex<Vec<Option<BatchOutcome>>> =
        Mutex::new(paths.iter().map(|_| None).collect());

    tracing::debug!(playbooks = paths.len(), workers, "Starting batch conversion");

    thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| loop {
                let index = next.fetch_add(1, Ordering::SeqCst);
                let Some(path) = paths.get(index) else {
                    break;
                };

                let reference = path.to_string_lossy();
                let result =
                    make_converter().and_then(|mut converter| converter.convert_playbook(&reference));

                tracing::debug!(path = ?path, ok = result.is_ok(), "Finished playbook");
                results.lock()[index] = Some(BatchOutcome { path: path.clone(), result });
            });
        }
    });

    results.into_inner().into_iter().flatten().collect()
}
