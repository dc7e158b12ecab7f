use tower_lsp::lsp_types::{DocumentHighlight, DocumentHighlightKind, Position, Range};

use jsonnet_core::analysis::{Binding, References};

use super::DocumentView;

pub(crate) fn highlight(view: &DocumentView, position: Position) -> Vec<DocumentHighlight> {
    references(view, position, true)
        .into_iter()
        .map(|range| DocumentHighlight {
            range,
            kind: Some(DocumentHighlightKind::TEXT),
        })
        .collect()
}

/// Ranges denoting the same binding as the identifier under `position`.
pub(crate) fn references(view: &DocumentView, position: Position, include_declaration: bool) -> Vec<Range> {
    let source = view.source();
    let refs = References::collect(view.tree(), &source);
    let Some(occurrence) = refs.at(view.core_position(position)) else {
        return Vec::new();
    };
    let decl = match occurrence.binding {
        Binding::Decl(span) if !include_declaration => Some(*span),
        _ => None,
    };
    refs.of(occurrence.binding)
        .into_iter()
        .filter(|span| Some(*span) != decl)
        .map(|span| view.range(span))
        .collect()
}

pub(crate) fn definition(view: &DocumentView, position: Position) -> Option<Range> {
    let source = view.source();
    let refs = References::collect(view.tree(), &source);
    match refs.at(view.core_position(position))?.binding {
        Binding::Decl(span) => Some(view.range(*span)),
        Binding::Builtin(_) => None,
    }
}
