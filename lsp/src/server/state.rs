use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{anyhow, Context};
use dashmap::DashMap;
use ropey::Rope;
use tower_lsp::lsp_types::Url;
use tower_lsp::Client;
use tracing::error;

use jsonnet_core::AnalysisCache;

use super::{config::ServerConfig, notifier::ClientNotifier};
use crate::analyzer::CompletionMatcher;

/// An open document. The store is the authoritative copy of its text.
#[derive(Debug, Default)]
pub(crate) struct Document {
    pub(crate) content: Rope,
    pub(crate) version: i32,
}

/// Primary LSP server state shared across handlers.
pub(crate) struct JsonnetLanguageServer {
    pub(crate) client: Client,
    pub(crate) documents: Arc<DashMap<Url, Document>>,
    pub(crate) cache: AnalysisCache,
    pub(crate) config: Mutex<ServerConfig>,
    pub(crate) matcher: Option<CompletionMatcher>,
}

impl JsonnetLanguageServer {
    pub(crate) fn new(client: Client) -> Self {
        let config = ServerConfig::default();
        let notifier = Arc::new(ClientNotifier::spawn(client.clone()));
        let matcher = match CompletionMatcher::with_defaults() {
            Ok(matcher) => Some(matcher),
            Err(err) => {
                error!(defect = true, error = %err, "completion matchers failed to compile");
                None
            }
        };
        Self {
            client,
            documents: Arc::new(DashMap::new()),
            cache: AnalysisCache::new(notifier, config.slow_threshold()),
            config: Mutex::new(config),
            matcher,
        }
    }

    pub(crate) fn config(&self) -> MutexGuard<'_, ServerConfig> {
        self.config.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current text of `uri`: the open document if there is one, the file otherwise.
    pub(crate) fn document_text(&self, uri: &Url) -> anyhow::Result<Rope> {
        if let Some(doc) = self.documents.get(uri) {
            return Ok(doc.content.clone());
        }
        let path = uri
            .to_file_path()
            .map_err(|()| anyhow!("{} is not a file URI", uri))?;
        let text = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        Ok(Rope::from_str(&text))
    }

    /// Starts a background rebuild of the stored text of `uri`.
    pub(crate) fn schedule_rebuild(&self, uri: &Url) {
        let Some((text, version)) = self
            .documents
            .get(uri)
            .map(|doc| (doc.content.to_string(), doc.version))
        else {
            return;
        };
        // Completion is observed through notifications.
        drop(self.cache.update(uri.as_str(), version, &text));
    }
}
