use ropey::Rope;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::LanguageServer;
use tracing::{info, warn};

use crate::analyzer::{self, CompletionRequest, LibPaths};

use super::{
    state::{Document, JsonnetLanguageServer},
    text::apply_incremental_change_rope,
};

#[tower_lsp::async_trait]
impl LanguageServer for JsonnetLanguageServer {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        info!("Jsonnet Language Server initializing with params: {:?}", params.root_uri);

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Options(TextDocumentSyncOptions {
                    open_close: Some(true),
                    change: Some(TextDocumentSyncKind::INCREMENTAL),
                    save: Some(TextDocumentSyncSaveOptions::Supported(true)),
                    ..Default::default()
                })),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                completion_provider: Some(CompletionOptions {
                    resolve_provider: Some(false),
                    trigger_characters: Some(vec![".".to_string()]),
                    work_done_progress_options: Default::default(),
                    all_commit_characters: None,
                    completion_item: None,
                }),
                signature_help_provider: Some(SignatureHelpOptions {
                    trigger_characters: Some(vec!["(".to_string(), ",".to_string()]),
                    retrigger_characters: None,
                    work_done_progress_options: Default::default(),
                }),
                document_symbol_provider: Some(OneOf::Left(true)),
                references_provider: Some(OneOf::Left(true)),
                definition_provider: Some(OneOf::Left(true)),
                document_highlight_provider: Some(OneOf::Left(true)),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "Jsonnet Language Server".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        info!("Jsonnet Language Server initialized");
        self.client
            .log_message(MessageType::INFO, "Jsonnet Language Server started")
            .await;
        self.load_config().await;
    }

    async fn shutdown(&self) -> Result<()> {
        info!(open = self.documents.len(), cached = self.cache.len(), "Jsonnet Language Server shutting down");
        Ok(())
    }

    async fn did_change_configuration(&self, _params: DidChangeConfigurationParams) {
        self.load_config().await;
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        self.documents.insert(
            uri.clone(),
            Document {
                content: Rope::from_str(&params.text_document.text),
                version: params.text_document.version,
            },
        );
        self.schedule_rebuild(&uri);
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        {
            let mut entry = self.documents.entry(uri.clone()).or_default();
            entry.version = params.text_document.version;
            for change in &params.content_changes {
                apply_incremental_change_rope(&mut entry.content, change);
            }
        }
        self.schedule_rebuild(&uri);
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let uri = params.text_document.uri;
        if let Some(text) = params.text {
            if let Some(mut doc) = self.documents.get_mut(&uri) {
                doc.content = Rope::from_str(&text);
            }
        }
        self.cache.invalidate(uri.as_str());
        self.schedule_rebuild(&uri);
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        self.documents.remove(&uri);
        self.cache.remove(uri.as_str());
        self.client.publish_diagnostics(uri, Vec::new(), None).await;
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri = &params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;

        let Some(view) = self.view_for_request(uri).await? else {
            return Ok(None);
        };
        Ok(analyzer::hover(&view, position))
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri = &params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;

        let Some(matcher) = &self.matcher else {
            return Ok(None);
        };
        let Some(view) = self.view_for_request(uri).await? else {
            return Ok(None);
        };
        let files = LibPaths::new(self.config().lib_paths.clone());
        let request = CompletionRequest {
            view: &view,
            position,
            files: &files,
        };
        match matcher.complete(&request) {
            Ok(items) => Ok(Some(CompletionResponse::Array(items))),
            Err(err) => {
                warn!(uri = %uri, error = %format!("{:#}", err), "completion failed");
                Ok(None)
            }
        }
    }

    async fn document_highlight(&self, params: DocumentHighlightParams) -> Result<Option<Vec<DocumentHighlight>>> {
        let uri = &params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;

        let Some(view) = self.view_for_request(uri).await? else {
            return Ok(None);
        };
        let highlights = analyzer::highlight(&view, position);
        Ok((!highlights.is_empty()).then_some(highlights))
    }

    async fn references(&self, params: ReferenceParams) -> Result<Option<Vec<Location>>> {
        let uri = &params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;

        let Some(view) = self.view_for_request(uri).await? else {
            return Ok(None);
        };
        let locations: Vec<Location> = analyzer::references(&view, position, params.context.include_declaration)
            .into_iter()
            .map(|range| Location::new(uri.clone(), range))
            .collect();
        Ok((!locations.is_empty()).then_some(locations))
    }

    async fn goto_definition(&self, params: GotoDefinitionParams) -> Result<Option<GotoDefinitionResponse>> {
        let uri = &params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;

        let Some(view) = self.view_for_request(uri).await? else {
            return Ok(None);
        };
        Ok(analyzer::definition(&view, position)
            .map(|range| GotoDefinitionResponse::Scalar(Location::new(uri.clone(), range))))
    }

    async fn signature_help(&self, params: SignatureHelpParams) -> Result<Option<SignatureHelp>> {
        let uri = &params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;

        let Some(view) = self.view_for_request(uri).await? else {
            return Ok(None);
        };
        Ok(analyzer::signature_help(&view, position))
    }

    async fn document_symbol(&self, params: DocumentSymbolParams) -> Result<Option<DocumentSymbolResponse>> {
        let Some(view) = self.view_for_request(&params.text_document.uri).await? else {
            return Ok(None);
        };
        let symbols = analyzer::document_symbols(&view);
        Ok((!symbols.is_empty()).then_some(DocumentSymbolResponse::Nested(symbols)))
    }
}
