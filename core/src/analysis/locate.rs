use crate::{
    analysis::{extent, LocateError, Source},
    ast::{DesugaredObject, FieldKey, Function, LocalBind, NamedParameter, Node},
    token::{Position, Span},
};

/// What sits under a position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Located<'a> {
    Node(&'a Node),
    BindName {
        bind: &'a LocalBind,
        span: Span,
    },
    RequiredParam {
        function: &'a Function,
        name: &'a str,
        span: Span,
    },
    OptionalParam {
        function: &'a Function,
        param: &'a NamedParameter,
        span: Span,
    },
    FieldName {
        object: &'a DesugaredObject,
        name: &'a str,
        span: Span,
    },
}

impl<'a> Located<'a> {
    pub fn span(&self) -> Span {
        match self {
            Located::Node(node) => node.span(),
            Located::BindName { span, .. }
            | Located::RequiredParam { span, .. }
            | Located::OptionalParam { span, .. }
            | Located::FieldName { span, .. } => *span,
        }
    }

    pub fn node(&self) -> Option<&'a Node> {
        match self {
            Located::Node(node) => Some(*node),
            _ => None,
        }
    }

    /// True when the cursor sits in syntax the parser had to fill in.
    pub fn is_partial(&self) -> bool {
        self.node().is_some_and(Node::is_partial)
    }
}

/// Finds the most specific construct containing `pos`.
///
/// Partial nodes are returned like any other node. `NotFound` only when
/// `pos` lies outside the tree.
pub fn locate<'a>(tree: &'a Node, source: &Source<'_>, pos: Position) -> Result<Located<'a>, LocateError> {
    if !tree.span().contains(pos) {
        return Err(LocateError::NotFound { pos });
    }
    Ok(descend(tree, source, pos))
}

fn descend<'a>(node: &'a Node, source: &Source<'_>, pos: Position) -> Located<'a> {
    if let Some(found) = sub_token(node, source, pos) {
        return found;
    }

    let best = node
        .children()
        .into_iter()
        .filter(|child| child.span().contains(pos))
        .min_by_key(|child| extent(child.span()));
    match best {
        Some(child) => descend(child, source, pos),
        None => Located::Node(node),
    }
}

fn bind_at<'a>(binds: &'a [LocalBind], source: &Source<'_>, pos: Position) -> Option<Located<'a>> {
    binds.iter().find_map(|bind| {
        let span = source.bind_name_span(bind).ok()?;
        span.contains(pos).then_some(Located::BindName { bind, span })
    })
}

/// Names that are part of `node` itself rather than of a child.
fn sub_token<'a>(node: &'a Node, source: &Source<'_>, pos: Position) -> Option<Located<'a>> {
    match node {
        Node::Local(local) => bind_at(&local.binds, source, pos),
        Node::Function(function) => {
            for param in &function.params.optional {
                if let Ok(span) = source.optional_param_span(param) {
                    if span.contains(pos) {
                        return Some(Located::OptionalParam { function, param, span });
                    }
                }
            }
            let spans = source.required_param_spans(function).ok()?;
            spans
                .into_iter()
                .zip(&function.params.required)
                .find(|(span, _)| span.contains(pos))
                .map(|(span, name)| Located::RequiredParam {
                    function,
                    name: name.as_str(),
                    span,
                })
        }
        Node::DesugaredObject(object) => {
            for (key, span) in &object.field_locs {
                if let FieldKey::Name(name) = key {
                    if span.contains(pos) {
                        return Some(Located::FieldName {
                            object,
                            name: name.as_str(),
                            span: *span,
                        });
                    }
                }
            }
            bind_at(&object.locals, source, pos)
        }
        _ => None,
    }
}
