use ropey::Rope;
use tokio::sync::mpsc;
use tower_lsp::lsp_types::{
    notification::Progress, request::WorkDoneProgressCreate, Diagnostic, DiagnosticSeverity, NumberOrString,
    ProgressParams, ProgressParamsValue, WorkDoneProgress, WorkDoneProgressBegin, WorkDoneProgressCreateParams,
    WorkDoneProgressEnd,
};
use tower_lsp::Client;
use tracing::{debug, warn};
use url::Url;

use jsonnet_core::{
    analysis::{Notification, Notifier, ProcessingStatus},
    token::ParseDiagnostic,
};

use super::text::to_lsp_range;

/// Forwards cache notifications to the client in the order they were raised.
pub(crate) struct ClientNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ClientNotifier {
    /// Must be called inside a tokio runtime.
    pub(crate) fn spawn(client: Client) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Some(notification) = rx.recv().await {
                deliver(&client, notification).await;
            }
            debug!("notification channel closed");
        });
        Self { tx }
    }
}

impl Notifier for ClientNotifier {
    fn notify(&self, notification: Notification) {
        if let Err(err) = self.tx.send(notification) {
            warn!(error = %err, "dropping notification, client is gone");
        }
    }
}

fn progress_token(path: &str) -> NumberOrString {
    NumberOrString::String(format!("jsonnet:rebuild:{}", path))
}

async fn deliver(client: &Client, notification: Notification) {
    match notification {
        Notification::Processing {
            path,
            status: ProcessingStatus::Running,
        } => {
            let token = progress_token(&path);
            if let Err(err) = client
                .send_request::<WorkDoneProgressCreate>(WorkDoneProgressCreateParams { token: token.clone() })
                .await
            {
                debug!(error = %err, "client refused progress token");
            }
            client
                .send_notification::<Progress>(ProgressParams {
                    token,
                    value: ProgressParamsValue::WorkDone(WorkDoneProgress::Begin(WorkDoneProgressBegin {
                        title: "Jsonnet: analysing".to_string(),
                        cancellable: Some(false),
                        message: Some(path),
                        percentage: None,
                    })),
                })
                .await;
        }
        Notification::Processing {
            path,
            status: ProcessingStatus::Complete,
        } => {
            client
                .send_notification::<Progress>(ProgressParams {
                    token: progress_token(&path),
                    value: ProgressParamsValue::WorkDone(WorkDoneProgress::End(WorkDoneProgressEnd {
                        message: Some("Analysis complete".to_string()),
                    })),
                })
                .await;
        }
        Notification::Diagnostics {
            path,
            version,
            text,
            diagnostics,
        } => {
            let uri = match Url::parse(&path) {
                Ok(uri) => uri,
                Err(err) => {
                    warn!(path, error = %err, "cannot publish diagnostics for a non-URI path");
                    return;
                }
            };
            let rope = Rope::from_str(&text);
            let diagnostics = diagnostics.iter().map(|d| to_lsp_diagnostic(&rope, d)).collect();
            client.publish_diagnostics(uri, diagnostics, Some(version)).await;
        }
    }
}

pub(crate) fn to_lsp_diagnostic(text: &Rope, diagnostic: &ParseDiagnostic) -> Diagnostic {
    Diagnostic {
        range: to_lsp_range(text, diagnostic.span),
        severity: Some(DiagnosticSeverity::ERROR),
        source: Some("jsonnet".to_string()),
        message: diagnostic.message.clone(),
        ..Default::default()
    }
}
