use tower_lsp::lsp_types::{DocumentSymbol, SymbolKind};
use tracing::error;

use jsonnet_core::{
    analysis::{field_value, Source},
    ast::{describe, LocalBind, Node},
    token::Span,
};

use super::DocumentView;

/// Locals and object fields as an outline. Fields of nested objects are
/// children of the field or local holding them.
pub(crate) fn document_symbols(view: &DocumentView) -> Vec<DocumentSymbol> {
    let source = view.source();
    let mut out = Vec::new();
    collect(view, &source, view.tree(), &mut out);
    out
}

fn collect(view: &DocumentView, source: &Source<'_>, node: &Node, out: &mut Vec<DocumentSymbol>) {
    match node {
        Node::Local(local) => {
            for bind in &local.binds {
                out.push(bind_symbol(view, source, bind));
            }
            collect(view, source, &local.body, out);
        }
        Node::DesugaredObject(object) => {
            for bind in &object.locals {
                out.push(bind_symbol(view, source, bind));
            }
            // Field bodies sit under a copy of the object's locals; skip it.
            for field in &object.fields {
                let value = match field_value(field) {
                    Ok(value) => value,
                    Err(err) => {
                        error!(defect = true, error = %err, "malformed desugared field");
                        continue;
                    }
                };
                let kind = match value {
                    Node::Function(_) => SymbolKind::METHOD,
                    _ => SymbolKind::FIELD,
                };
                let selection = object.field_loc(&field.name).unwrap_or(field.span);
                out.push(symbol(view, source, field.name.clone(), kind, field.span, selection, value));
            }
        }
        _ => {
            for child in node.children() {
                collect(view, source, child, out);
            }
        }
    }
}

fn bind_symbol(view: &DocumentView, source: &Source<'_>, bind: &LocalBind) -> DocumentSymbol {
    let kind = match bind.body {
        Node::Function(_) => SymbolKind::FUNCTION,
        _ => SymbolKind::VARIABLE,
    };
    let selection = source.bind_name_span(bind).unwrap_or(bind.span);
    symbol(view, source, bind.variable.clone(), kind, bind.span, selection, &bind.body)
}

fn symbol(
    view: &DocumentView,
    source: &Source<'_>,
    name: String,
    kind: SymbolKind,
    span: Span,
    selection: Span,
    value: &Node,
) -> DocumentSymbol {
    let mut children = Vec::new();
    collect(view, source, value, &mut children);
    let detail = match value {
        Node::Function(_) => Some(describe(value)),
        _ => None,
    };
    DocumentSymbol {
        name,
        detail,
        kind,
        tags: None,
        #[allow(deprecated)]
        deprecated: None,
        range: view.range(span),
        selection_range: view.range(selection),
        children: (!children.is_empty()).then_some(children),
    }
}
