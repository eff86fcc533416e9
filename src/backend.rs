//! LSP Backend implementation

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};

use crate::document::Document;
use crate::position::Position as SourcePosition;
use crate::semantic::index::IndexStore;
use crate::tokens::semantic_tokens_legend;

/// The LSP backend that handles all language server requests
pub struct Backend {
    /// The LSP client for sending notifications
    client: Client,
    /// Map of document URIs to their state
    documents: Arc<RwLock<HashMap<Url, Document>>>,
    /// Cross-file key index
    index: Arc<IndexStore>,
}

impl Backend {
    /// Create a new backend instance
    pub fn new(client: Client) -> Self {
        Self {
            client,
            documents: Arc::new(RwLock::new(HashMap::new())),
            index: Arc::new(IndexStore::new()),
        }
    }

    /// Re-index a document, update the shared key index and publish
    /// diagnostics
    async fn update_document(&self, uri: &Url, text: String, version: i32) {
        let document = Document::new(text, version);
        self.index.update(uri, &document.index.anchors);
        let diagnostics = document.diagnostics();

        {
            let mut docs = self.documents.write().await;
            docs.insert(uri.clone(), document);
        }

        self.client
            .publish_diagnostics(uri.clone(), diagnostics, Some(version))
            .await;
    }

    /// The index or local key under the cursor, if any
    fn key_at(&self, uri: &Url, position: tower_lsp::lsp_types::Position) -> Option<String> {
        self.index
            .key_at(uri, SourcePosition::new(position.line, position.character))
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, _: InitializeParams) -> Result<InitializeResult> {
        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                semantic_tokens_provider: Some(
                    SemanticTokensServerCapabilities::SemanticTokensOptions(
                        SemanticTokensOptions {
                            legend: semantic_tokens_legend(),
                            full: Some(SemanticTokensFullOptions::Bool(true)),
                            range: Some(false),
                            work_done_progress_options: WorkDoneProgressOptions::default(),
                        },
                    ),
                ),
                definition_provider: Some(OneOf::Left(true)),
                references_provider: Some(OneOf::Left(true)),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "koreo-ls".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        tracing::info!("Server initialized");
    }

    async fn shutdown(&self) -> Result<()> {
        tracing::info!("Server shutting down");
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        tracing::debug!("Document opened: {}", uri);
        self.update_document(&uri, params.text_document.text, params.text_document.version)
            .await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let version = params.text_document.version;

        // Full sync: the change carries the whole text
        if let Some(change) = params.content_changes.into_iter().next() {
            tracing::debug!("Document changed: {}", uri);
            self.update_document(&uri, change.text, version).await;
        }
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        tracing::debug!("Document saved: {}", params.text_document.uri);
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        tracing::debug!("Document closed: {}", uri);

        {
            let mut docs = self.documents.write().await;
            docs.remove(&uri);
        }
        self.index.remove(&uri);

        // Clear diagnostics for this document
        self.client.publish_diagnostics(uri, vec![], None).await;
    }

    async fn semantic_tokens_full(
        &self,
        params: SemanticTokensParams,
    ) -> Result<Option<SemanticTokensResult>> {
        let uri = params.text_document.uri;
        let docs = self.documents.read().await;
        let Some(document) = docs.get(&uri) else {
            return Ok(None);
        };
        Ok(Some(SemanticTokensResult::Tokens(SemanticTokens {
            result_id: None,
            data: document.semantic_tokens(),
        })))
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;
        let Some(key) = self.key_at(&uri, position) else {
            return Ok(None);
        };

        let mut locations: Vec<Location> = self
            .index
            .definitions(&key)
            .into_iter()
            .map(|(target, entry)| Location::new(target, entry.range()))
            .collect();
        if locations.is_empty() {
            // Local keys resolve within the requesting file only.
            locations = self
                .index
                .locals(&uri)
                .into_iter()
                .filter(|entry| entry.key == key && entry.definition)
                .map(|entry| Location::new(uri.clone(), entry.range()))
                .collect();
        }

        if locations.is_empty() {
            Ok(None)
        } else {
            Ok(Some(GotoDefinitionResponse::Array(locations)))
        }
    }

    async fn references(&self, params: ReferenceParams) -> Result<Option<Vec<Location>>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;
        let Some(key) = self.key_at(&uri, position) else {
            return Ok(None);
        };

        let mut locations: Vec<Location> = self
            .index
            .occurrences(&key)
            .into_iter()
            .map(|(target, entry)| Location::new(target, entry.range()))
            .collect();
        locations.extend(
            self.index
                .locals(&uri)
                .into_iter()
                .filter(|entry| entry.key == key)
                .map(|entry| Location::new(uri.clone(), entry.range())),
        );

        if locations.is_empty() {
            Ok(None)
        } else {
            Ok(Some(locations))
        }
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;
        let Some(key) = self.key_at(&uri, position) else {
            return Ok(None);
        };

        let definitions = self.index.definitions(&key).len();
        let detail = match definitions {
            0 => format!("`{key}` (no definition found)"),
            1 => format!("`{key}`"),
            n => format!("`{key}` ({n} definitions)"),
        };
        Ok(Some(Hover {
            contents: HoverContents::Scalar(MarkedString::String(detail)),
            range: None,
        }))
    }
}
