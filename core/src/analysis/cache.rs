//! Per-document analysis results, rebuilt in the background on change.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;

use dashmap::DashMap;
use tokio::{
    task::{self, JoinHandle},
    time::sleep,
};
use tracing::{debug, error, info};

use crate::{
    analysis::{analyze, Analysis},
    ast::Node,
    token::{ParseDiagnostic, Position, Span},
    util::compute_content_hash,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStatus {
    Running,
    Complete,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Processing {
        path: String,
        status: ProcessingStatus,
    },
    /// Replaces every diagnostic previously published for `path`. `text` is
    /// the text the spans refer to.
    Diagnostics {
        path: String,
        version: i32,
        text: Arc<str>,
        diagnostics: Vec<ParseDiagnostic>,
    },
}

/// Receives cache notifications. Delivery is fire-and-forget.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Parse + desugar, run on the blocking pool.
pub type Builder = Arc<dyn Fn(&str, &str) -> Analysis + Send + Sync>;

/// One completed rebuild. Immutable and shared by every reader.
#[derive(Debug)]
pub struct Snapshot {
    pub version: i32,
    pub hash: u64,
    pub text: Arc<str>,
    pub tree: Node,
    pub diagnostics: Vec<ParseDiagnostic>,
}

#[derive(Debug, Default)]
struct CacheEntry {
    /// Hash of the most recently requested text.
    hash: Option<u64>,
    /// Generation of the most recently requested rebuild.
    generation: u64,
    /// Generation of the last result written.
    written: u64,
    /// Generation of the first rebuild after the entry was created. Results
    /// from before a close and reopen fall below it.
    opened_at: u64,
    latest: Option<Arc<Snapshot>>,
    failure: Option<Vec<ParseDiagnostic>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Watch {
    Waiting,
    Notified,
}

pub struct AnalysisCache {
    entries: Arc<DashMap<String, CacheEntry>>,
    generation: AtomicU64,
    slow_threshold_ms: AtomicU64,
    notifier: Arc<dyn Notifier>,
    builder: Builder,
}

impl AnalysisCache {
    pub fn new(notifier: Arc<dyn Notifier>, slow_threshold: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            generation: AtomicU64::new(0),
            slow_threshold_ms: AtomicU64::new(slow_threshold.as_millis() as u64),
            notifier,
            builder: Arc::new(analyze),
        }
    }

    pub fn with_builder(mut self, builder: Builder) -> Self {
        self.builder = builder;
        self
    }

    pub fn set_slow_threshold(&self, threshold: Duration) {
        self.slow_threshold_ms
            .store(threshold.as_millis() as u64, Ordering::Relaxed);
    }

    /// Starts a rebuild of `path` unless `text` is what was last requested.
    ///
    /// Must be called inside a tokio runtime. The returned handle resolves
    /// once the result has been written or discarded.
    pub fn update(&self, path: &str, version: i32, text: &str) -> Option<JoinHandle<()>> {
        let hash = compute_content_hash(text);
        let generation = {
            let mut entry = self.entries.entry(path.to_string()).or_default();
            if entry.hash == Some(hash) {
                debug!(path, version, "content unchanged, skipping rebuild");
                return None;
            }
            let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
            if entry.opened_at == 0 {
                entry.opened_at = generation;
            }
            entry.hash = Some(hash);
            entry.generation = generation;
            generation
        };

        let entries = Arc::clone(&self.entries);
        let notifier = Arc::clone(&self.notifier);
        let builder = Arc::clone(&self.builder);
        let threshold = Duration::from_millis(self.slow_threshold_ms.load(Ordering::Relaxed));
        let path = path.to_string();
        let text: Arc<str> = Arc::from(text);

        Some(tokio::spawn(async move {
            let build_path = path.clone();
            let build_text = Arc::clone(&text);
            let mut build = task::spawn_blocking(move || builder(&build_path, &build_text));

            let deadline = sleep(threshold);
            tokio::pin!(deadline);
            let mut watch = Watch::Waiting;
            let joined = loop {
                tokio::select! {
                    joined = &mut build => break joined,
                    _ = &mut deadline, if watch == Watch::Waiting => {
                        info!(path = %path, version, "rebuild still running");
                        notifier.notify(Notification::Processing {
                            path: path.clone(),
                            status: ProcessingStatus::Running,
                        });
                        watch = Watch::Notified;
                    }
                }
            };

            let analysis = match joined {
                Ok(analysis) => analysis,
                Err(err) => {
                    error!(defect = true, path = %path, version, error = %err, "rebuild task failed");
                    Analysis {
                        tree: None,
                        diagnostics: vec![ParseDiagnostic::new(
                            format!("analysis failed: {}", err),
                            Span::single(Position::start()),
                        )],
                    }
                }
            };

            let diagnostics = analysis.diagnostics.clone();
            let written = store(&entries, &path, generation, version, hash, Arc::clone(&text), analysis);

            if watch == Watch::Notified {
                notifier.notify(Notification::Processing {
                    path: path.clone(),
                    status: ProcessingStatus::Complete,
                });
            }
            if written {
                notifier.notify(Notification::Diagnostics {
                    path,
                    version,
                    text,
                    diagnostics,
                });
            }
        }))
    }

    /// The last successfully completed rebuild.
    pub fn get(&self, path: &str) -> Option<Arc<Snapshot>> {
        self.entries.get(path)?.latest.clone()
    }

    /// Diagnostics of the last rebuild if it produced no tree.
    pub fn failure(&self, path: &str) -> Option<Vec<ParseDiagnostic>> {
        self.entries.get(path)?.failure.clone()
    }

    pub fn is_rebuilding(&self, path: &str) -> bool {
        self.entries
            .get(path)
            .is_some_and(|entry| entry.generation > entry.written)
    }

    /// Forgets the last requested text so the next `update` rebuilds.
    pub fn invalidate(&self, path: &str) {
        if let Some(mut entry) = self.entries.get_mut(path) {
            entry.hash = None;
        }
    }

    /// Drops the entry. A rebuild still in flight for it is discarded on arrival.
    pub fn remove(&self, path: &str) -> bool {
        self.entries.remove(path).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn store(
    entries: &DashMap<String, CacheEntry>,
    path: &str,
    generation: u64,
    version: i32,
    hash: u64,
    text: Arc<str>,
    analysis: Analysis,
) -> bool {
    let Some(mut entry) = entries.get_mut(path) else {
        debug!(path, version, "document closed, discarding rebuild");
        return false;
    };
    if generation < entry.opened_at {
        debug!(path, version, "rebuild predates reopen, discarding");
        return false;
    }
    if generation <= entry.written {
        debug!(path, version, "superseded rebuild discarded");
        return false;
    }
    entry.written = generation;
    match analysis.tree {
        Some(tree) => {
            entry.latest = Some(Arc::new(Snapshot {
                version,
                hash,
                text,
                tree,
                diagnostics: analysis.diagnostics,
            }));
            entry.failure = None;
        }
        None => entry.failure = Some(analysis.diagnostics),
    }
    true
}
