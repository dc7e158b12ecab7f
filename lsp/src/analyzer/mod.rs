//! Query features: hover, completion, highlight/references/definition,
//! signature help, the symbol outline, and the importable-file listing
//! completion relies on.

use std::sync::Arc;

use ropey::Rope;
use tower_lsp::lsp_types::{Position, Range};
use tracing::debug;

use jsonnet_core::{
    analysis::{Snapshot, Source},
    analyze,
    ast::Node,
    token::{Position as CorePosition, Span},
    util::compute_content_hash,
};

use crate::server::text::{to_core_position, to_lsp_range};

mod completions;
mod files;
mod highlight;
mod hover;
mod signature;
mod symbols;

pub(crate) use completions::{CompletionMatcher, CompletionRequest};
pub(crate) use files::{ImportableFiles, LibPaths};
pub(crate) use highlight::{definition, highlight, references};
pub(crate) use hover::hover;
pub(crate) use signature::signature_help;
pub(crate) use symbols::document_symbols;

enum ViewTree {
    Cached(Arc<Snapshot>),
    Fresh(Node),
}

/// A document's current text together with a tree built from exactly that
/// text: the cached snapshot when its hash matches, a fresh parse otherwise.
pub(crate) struct DocumentView {
    text: String,
    rope: Rope,
    tree: ViewTree,
}

impl DocumentView {
    /// `None` when the text does not desugar.
    pub(crate) fn new(path: &str, rope: Rope, cached: Option<Arc<Snapshot>>) -> Option<Self> {
        let text = rope.to_string();
        let hash = compute_content_hash(&text);
        let tree = match cached {
            Some(snapshot) if snapshot.hash == hash => ViewTree::Cached(snapshot),
            _ => {
                debug!(path, "no current snapshot, analysing on request");
                ViewTree::Fresh(analyze(path, &text).tree?)
            }
        };
        Some(Self { text, rope, tree })
    }

    pub(crate) fn tree(&self) -> &Node {
        match &self.tree {
            ViewTree::Cached(snapshot) => &snapshot.tree,
            ViewTree::Fresh(node) => node,
        }
    }

    pub(crate) fn source(&self) -> Source<'_> {
        Source::new(&self.text)
    }

    pub(crate) fn rope(&self) -> &Rope {
        &self.rope
    }

    pub(crate) fn is_cached(&self) -> bool {
        matches!(self.tree, ViewTree::Cached(_))
    }

    pub(crate) fn core_position(&self, pos: Position) -> CorePosition {
        to_core_position(&self.rope, pos)
    }

    pub(crate) fn range(&self, span: Span) -> Range {
        to_lsp_range(&self.rope, span)
    }
}
