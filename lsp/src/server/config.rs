use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use serde::Deserialize;
use serde_json::{Map, Value};
use tower_lsp::jsonrpc;
use tower_lsp::lsp_types::{ConfigurationItem, MessageType};
use tracing::{info, warn};

use super::state::JsonnetLanguageServer;

pub(crate) const SECTION: &str = "jsonnet";
const LIB_PATHS: &str = "jsonnet.libPaths";
const SLOW_REBUILD_MS: &str = "jsonnet.slowRebuildMs";

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ServerConfig {
    pub(crate) lib_paths: Vec<PathBuf>,
    pub(crate) slow_rebuild_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            lib_paths: Vec::new(),
            slow_rebuild_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JsonnetConfigSection {
    #[serde(default)]
    lib_paths: Option<Vec<PathBuf>>,
    #[serde(default)]
    slow_rebuild_ms: Option<u64>,
}

impl ServerConfig {
    pub(crate) fn slow_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_rebuild_ms)
    }

    pub(crate) fn apply(&mut self, section: JsonnetConfigSection) {
        if let Some(paths) = section.lib_paths {
            self.lib_paths = paths;
        }
        if let Some(ms) = section.slow_rebuild_ms.filter(|ms| *ms > 0) {
            self.slow_rebuild_ms = ms;
        }
    }

    /// Applies a flat `{"jsonnet.libPaths": [...]}` update. Nothing changes
    /// unless every key is known and well-typed.
    pub(crate) fn update(&mut self, update: &Map<String, Value>) -> anyhow::Result<()> {
        let mut next = self.clone();
        for (key, value) in update {
            match key.as_str() {
                LIB_PATHS => {
                    next.lib_paths = serde_json::from_value(value.clone())
                        .with_context(|| format!("setting {:?} expects a list of paths", key))?;
                }
                SLOW_REBUILD_MS => {
                    let ms: u64 = serde_json::from_value(value.clone())
                        .with_context(|| format!("setting {:?} expects a number of milliseconds", key))?;
                    if ms == 0 {
                        bail!("setting {:?} must be positive", key);
                    }
                    next.slow_rebuild_ms = ms;
                }
                _ => bail!("setting {:?} is unknown to the jsonnet language server", key),
            }
        }
        *self = next;
        Ok(())
    }
}

impl JsonnetLanguageServer {
    pub(crate) async fn load_config(&self) {
        let items = vec![ConfigurationItem {
            scope_uri: None,
            section: Some(SECTION.to_string()),
        }];

        let values = match self.client.configuration(items).await {
            Ok(values) => values,
            Err(err) => {
                warn!(error = %err, "workspace/configuration failed");
                return;
            }
        };
        let Some(value) = values.into_iter().next().filter(|v| !v.is_null()) else {
            return;
        };
        match serde_json::from_value::<JsonnetConfigSection>(value) {
            Ok(section) => {
                let threshold = {
                    let mut guard = self.config();
                    guard.apply(section);
                    info!(
                        lib_paths = ?guard.lib_paths,
                        slow_rebuild_ms = guard.slow_rebuild_ms,
                        "configuration loaded"
                    );
                    guard.slow_threshold()
                };
                self.cache.set_slow_threshold(threshold);
            }
            Err(err) => warn!(error = %err, "ignoring malformed jsonnet configuration"),
        }
    }

    /// `updateClientConfiguration`: flat key/value settings pushed by the client.
    pub(crate) async fn update_client_configuration(&self, update: Map<String, Value>) -> jsonrpc::Result<()> {
        let result = {
            let mut guard = self.config();
            guard.update(&update).map(|()| guard.slow_threshold())
        };
        match result {
            Ok(threshold) => {
                self.cache.set_slow_threshold(threshold);
                Ok(())
            }
            Err(err) => {
                let message = format!("{:#}", err);
                warn!(error = %message, "rejected client configuration");
                self.client.show_message(MessageType::ERROR, &message).await;
                Err(jsonrpc::Error::invalid_params(message))
            }
        }
    }
}
