//! Binding identity: which identifiers in a tree denote the same binding.

use tracing::trace;

use crate::{
    analysis::{extent, field_value, index_id_span, Source},
    ast::{DesugaredObject, Function, IndexKey, LocalBind, Node, STD},
    token::{Position, Span},
    util::{FastHashMap, FastHashSet},
};

/// A binding is identified by its declaring identifier; builtins by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Binding {
    Decl(Span),
    Builtin(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence<'b> {
    pub binding: &'b Binding,
    pub span: Span,
    pub is_decl: bool,
}

#[derive(Debug, Clone, Copy)]
struct Bound<'a> {
    binding: Span,
    value: Option<&'a Node>,
}

/// Every identifier occurrence in a tree, grouped by binding.
#[derive(Debug, Default)]
pub struct References {
    spans: FastHashMap<Binding, Vec<(Span, bool)>>,
}

impl References {
    pub fn collect(tree: &Node, source: &Source<'_>) -> Self {
        let mut collector = Collector {
            source,
            env: vec![FastHashMap::default()],
            seen: FastHashSet::default(),
            refs: References::default(),
            in_object: false,
        };
        collector.visit(tree);
        for spans in collector.refs.spans.values_mut() {
            spans.sort_by_key(|(span, _)| (span.start, span.end));
        }
        collector.refs
    }

    /// The innermost occurrence whose span contains `pos`.
    pub fn at(&self, pos: Position) -> Option<Occurrence<'_>> {
        self.spans
            .iter()
            .flat_map(|(binding, spans)| {
                spans.iter().map(move |(span, is_decl)| Occurrence {
                    binding,
                    span: *span,
                    is_decl: *is_decl,
                })
            })
            .filter(|occ| occ.span.contains(pos))
            .min_by_key(|occ| extent(occ.span))
    }

    /// All spans denoting `binding`, sorted.
    pub fn of(&self, binding: &Binding) -> Vec<Span> {
        self.spans
            .get(binding)
            .map(|spans| spans.iter().map(|(span, _)| *span).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.spans.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

/// Spans of every occurrence of the binding under `pos`, declaration included.
pub fn references_at(tree: &Node, source: &Source<'_>, pos: Position) -> Vec<Span> {
    let refs = References::collect(tree, source);
    match refs.at(pos) {
        Some(occ) => refs.of(occ.binding),
        None => Vec::new(),
    }
}

/// Declaration span of the binding under `pos`.
pub fn definition_at(tree: &Node, source: &Source<'_>, pos: Position) -> Option<Span> {
    let refs = References::collect(tree, source);
    match refs.at(pos)?.binding {
        Binding::Decl(span) => Some(*span),
        Binding::Builtin(_) => None,
    }
}

struct Collector<'a, 's> {
    source: &'s Source<'s>,
    env: Vec<FastHashMap<&'a str, Bound<'a>>>,
    seen: FastHashSet<(Span, Span)>,
    refs: References,
    in_object: bool,
}

/// Index chains longer than this are not followed.
const MAX_DEPTH: usize = 16;

impl<'a, 's> Collector<'a, 's> {
    fn lookup(&self, name: &str) -> Option<Bound<'a>> {
        self.env.iter().rev().find_map(|frame| frame.get(name).copied())
    }

    fn record(&mut self, binding: Binding, span: Span, is_decl: bool) {
        let key = match &binding {
            Binding::Decl(decl) => (*decl, span),
            Binding::Builtin(_) => (Span::single(Position::start()), span),
        };
        if !self.seen.insert(key) {
            return;
        }
        self.refs.spans.entry(binding).or_default().push((span, is_decl));
    }

    fn declare(&mut self, name: &'a str, decl: Option<Span>, value: Option<&'a Node>) {
        let Some(decl) = decl else {
            trace!(name, "declaration span not derivable");
            return;
        };
        self.record(Binding::Decl(decl), decl, true);
        if let Some(frame) = self.env.last_mut() {
            frame.insert(name, Bound { binding: decl, value });
        }
    }

    fn declare_binds(&mut self, binds: &'a [LocalBind]) {
        for bind in binds {
            let decl = self.source.bind_name_span(bind).ok();
            self.declare(&bind.variable, decl, Some(&bind.body));
        }
    }

    fn declare_params(&mut self, function: &'a Function) {
        if let Ok(spans) = self.source.required_param_spans(function) {
            for (name, span) in function.params.required.iter().zip(spans) {
                self.declare(name, Some(span), None);
            }
        }
        for param in &function.params.optional {
            let decl = self.source.optional_param_span(param).ok();
            self.declare(&param.name, decl, Some(&param.default));
        }
    }

    fn declare_object(&mut self, node: &'a Node, object: &'a DesugaredObject) {
        if let Some(frame) = self.env.last_mut() {
            let this = Bound {
                binding: object.span,
                value: Some(node),
            };
            frame.insert("self", this);
            if !self.in_object {
                frame.insert("$", this);
            }
        }
        for field in &object.fields {
            let value = field_value(field).ok();
            self.declare(&field.name, object.field_loc(&field.name), value);
        }
        self.declare_binds(&object.locals);
    }

    fn scoped(&mut self, f: impl FnOnce(&mut Self)) {
        self.env.push(FastHashMap::default());
        f(self);
        self.env.pop();
    }

    fn visit(&mut self, node: &'a Node) {
        match node {
            Node::Var(var) => {
                if let Some(bound) = self.lookup(&var.id) {
                    self.record(Binding::Decl(bound.binding), var.span, false);
                } else if var.id == STD {
                    self.record(Binding::Builtin(STD.to_string()), var.span, false);
                }
            }
            Node::Local(local) => self.scoped(|c| {
                c.declare_binds(&local.binds);
                for child in node.children() {
                    c.visit(child);
                }
            }),
            Node::Function(function) => self.scoped(|c| {
                c.declare_params(function);
                for child in node.children() {
                    c.visit(child);
                }
            }),
            Node::DesugaredObject(object) => self.scoped(|c| {
                c.declare_object(node, object);
                let outer = std::mem::replace(&mut c.in_object, true);
                for child in node.children() {
                    c.visit(child);
                }
                c.in_object = outer;
            }),
            Node::Index(index) => {
                if let IndexKey::Id(id) = &index.key {
                    let field = self
                        .object_of(&index.target, 0)
                        .and_then(|object| object.field_loc(id));
                    if let (Some(decl), Some(span)) = (field, index_id_span(index)) {
                        self.record(Binding::Decl(decl), span, false);
                    }
                }
                for child in node.children() {
                    self.visit(child);
                }
            }
            _ => {
                for child in node.children() {
                    self.visit(child);
                }
            }
        }
    }

    /// The object `node` evaluates to, as far as can be told statically.
    fn object_of(&self, node: &'a Node, depth: usize) -> Option<&'a DesugaredObject> {
        if depth > MAX_DEPTH {
            return None;
        }
        match node {
            Node::DesugaredObject(object) => Some(object),
            Node::Var(var) => self.object_of(self.lookup(&var.id)?.value?, depth + 1),
            Node::SelfRef(_) => self.object_of(self.lookup("self")?.value?, depth + 1),
            Node::Dollar(_) => self.object_of(self.lookup("$")?.value?, depth + 1),
            Node::Local(local) => self.object_of(&local.body, depth + 1),
            Node::Index(index) => {
                let IndexKey::Id(id) = &index.key else {
                    return None;
                };
                let object = self.object_of(&index.target, depth + 1)?;
                let value = field_value(object.field(id)?).ok()?;
                self.object_of(value, depth + 1)
            }
            _ => None,
        }
    }
}
