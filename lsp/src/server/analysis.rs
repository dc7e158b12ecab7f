use tokio::task;
use tower_lsp::jsonrpc;
use tower_lsp::lsp_types::Url;
use tracing::{debug, error};

use crate::analyzer::DocumentView;

use super::state::JsonnetLanguageServer;

impl JsonnetLanguageServer {
    /// View of the current text of `uri` for one query.
    ///
    /// Reuses the cached snapshot when it matches the text, otherwise
    /// analyses on the blocking pool. `Ok(None)` when the text does not
    /// desugar.
    pub(crate) async fn document_view(&self, uri: &Url) -> anyhow::Result<Option<DocumentView>> {
        let rope = self.document_text(uri)?;
        let cached = self.cache.get(uri.as_str());
        let path = uri.to_string();
        let view = task::spawn_blocking(move || DocumentView::new(&path, rope, cached)).await?;
        if let Some(view) = &view {
            debug!(uri = %uri, cached = view.is_cached(), "document view ready");
        }
        Ok(view)
    }

    /// `document_view` for handlers: text errors become request failures.
    pub(crate) async fn view_for_request(&self, uri: &Url) -> jsonrpc::Result<Option<DocumentView>> {
        self.document_view(uri).await.map_err(|err| {
            error!(uri = %uri, error = %format!("{:#}", err), "document unavailable");
            let mut failure = jsonrpc::Error::internal_error();
            failure.message = format!("{:#}", err).into();
            failure
        })
    }
}
