use tower_lsp::lsp_types::{ParameterInformation, ParameterLabel, Position, SignatureHelp, SignatureInformation};
use tracing::debug;

use jsonnet_core::{
    analysis::{resolve_scope, Source},
    ast::{describe_params, Apply, Function, Node},
    token::Position as CorePosition,
};

use super::{hover::index_path, DocumentView};

/// Parameters of the function being called around `position`. Only calls
/// whose target resolves to a function literal in scope are answered.
pub(crate) fn signature_help(view: &DocumentView, position: Position) -> Option<SignatureHelp> {
    let source = view.source();
    let pos = view.core_position(position);
    let apply = enclosing_call(view.tree(), &source, pos)?;
    let path = index_path(&apply.target)?;

    let scope = resolve_scope(view.tree(), &source, pos);
    let entry = match scope.resolve(&path) {
        Ok(entry) => entry,
        Err(err) => {
            debug!(?path, error = %err, "no signature for call target");
            return None;
        }
    };
    let function = match entry.node? {
        Node::Function(function) => function,
        Node::Local(local) => match local.body.as_ref() {
            Node::Function(function) => function,
            _ => return None,
        },
        _ => return None,
    };

    let parameters = function
        .params
        .names()
        .map(|name| ParameterInformation {
            label: ParameterLabel::Simple(name.to_string()),
            documentation: None,
        })
        .collect();
    let active = active_parameter(apply, function, pos);
    Some(SignatureHelp {
        signatures: vec![SignatureInformation {
            label: format!("{}({})", path.join("."), describe_params(&function.params)),
            documentation: None,
            parameters: Some(parameters),
            active_parameter: Some(active),
        }],
        active_signature: Some(0),
        active_parameter: Some(active),
    })
}

/// Innermost call whose argument list holds `pos`. A call missing its `)`
/// extends to wherever parsing stopped.
fn enclosing_call<'a>(node: &'a Node, source: &Source<'_>, pos: CorePosition) -> Option<&'a Apply> {
    if !node.span().contains(pos) {
        return None;
    }
    if let Some(inner) = node
        .children()
        .into_iter()
        .find_map(|child| enclosing_call(child, source, pos))
    {
        return Some(inner);
    }
    match node {
        Node::Apply(apply) if apply.target.span().end < pos => {
            let closed = source.slice(apply.span).is_some_and(|text| text.ends_with(')'));
            (!closed || pos < apply.span.end).then_some(apply)
        }
        _ => None,
    }
}

fn active_parameter(apply: &Apply, function: &Function, pos: CorePosition) -> u32 {
    for arg in &apply.named {
        if arg.value.span().contains(pos) {
            if let Some(i) = function.params.names().position(|name| name == arg.name) {
                return i as u32;
            }
        }
    }
    apply.args.iter().take_while(|arg| arg.span().end < pos).count() as u32
}
