use tower_lsp::lsp_types::{Hover, HoverContents, LanguageString, MarkedString, Position};
use tracing::debug;

use jsonnet_core::{
    analysis::{field_value, locate, resolve_scope, Located},
    ast::{describe, IndexKey, LiteralValue, Node},
};

use super::DocumentView;

/// Description of whatever sits under `position`. Positions outside the
/// tree and partial nodes give `None`.
pub(crate) fn hover(view: &DocumentView, position: Position) -> Option<Hover> {
    let source = view.source();
    let pos = view.core_position(position);
    let located = match locate(view.tree(), &source, pos) {
        Ok(located) => located,
        Err(err) => {
            debug!(%pos, error = %err, "nothing to hover");
            return None;
        }
    };
    if located.is_partial() {
        return None;
    }

    let value = match located {
        Located::Node(node) => match index_path(node) {
            Some(path) => {
                let scope = resolve_scope(view.tree(), &source, pos);
                match scope.resolve(&path) {
                    Ok(entry) => entry.detail,
                    Err(err) => {
                        debug!(?path, error = %err, "hover falls back to node description");
                        describe(node)
                    }
                }
            }
            None => describe(node),
        },
        Located::BindName { bind, .. } => describe(&bind.body),
        Located::RequiredParam { name, .. } => format!("(parameter) {}", name),
        Located::OptionalParam { param, .. } => describe(&param.default),
        Located::FieldName { object, name, .. } => match object.field(name).map(field_value) {
            Some(Ok(body)) => describe(body),
            _ => format!("(field) {}", name),
        },
    };

    Some(Hover {
        contents: HoverContents::Scalar(MarkedString::LanguageString(LanguageString {
            language: "jsonnet".to_string(),
            value,
        })),
        range: Some(view.range(located.span())),
    })
}

/// `a.b["c"]` as `["a", "b", "c"]`; `None` unless every key is a constant name
/// and the root is a variable, `self` or `$`.
pub(crate) fn index_path(node: &Node) -> Option<Vec<&str>> {
    let mut path = Vec::new();
    let mut current = node;
    loop {
        match current {
            Node::Var(var) => {
                path.push(var.id.as_str());
                break;
            }
            Node::SelfRef(_) => {
                path.push("self");
                break;
            }
            Node::Dollar(_) => {
                path.push("$");
                break;
            }
            Node::Index(index) => {
                match &index.key {
                    IndexKey::Id(id) => path.push(id.as_str()),
                    IndexKey::Expr(key) => match key.as_ref() {
                        Node::Literal(lit) => match &lit.value {
                            LiteralValue::String(s) => path.push(s.as_str()),
                            _ => return None,
                        },
                        _ => return None,
                    },
                }
                current = &index.target;
            }
            _ => return None,
        }
    }
    path.reverse();
    Some(path)
}
