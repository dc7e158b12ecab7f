use std::collections::BTreeMap;

use tracing::error;

use crate::{
    analysis::{field_value, ObjectMapper, ResolveError, Source},
    ast::{describe, DesugaredObject, Function, LocalBind, Node, STD},
    token::{Position, Span},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Builtin,
    Local,
    Parameter,
    Field,
    SelfRef,
    Super,
    Dollar,
}

/// One name visible at a position.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeEntry<'a> {
    pub detail: String,
    pub kind: EntryKind,
    /// The bound value. Field values are unwrapped from their scope wrapper;
    /// required parameters and builtins have none.
    pub node: Option<&'a Node>,
    /// Span of the declaring identifier.
    pub decl: Option<Span>,
}

impl<'a> ScopeEntry<'a> {
    fn builtin(name: &str) -> Self {
        Self {
            detail: format!("(builtin) {}", name),
            kind: EntryKind::Builtin,
            node: None,
            decl: None,
        }
    }

    fn bound(kind: EntryKind, node: &'a Node, decl: Option<Span>) -> Self {
        Self {
            detail: describe(node),
            kind,
            node: Some(node),
            decl,
        }
    }
}

/// Names visible at one position of one tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Scope<'a> {
    entries: BTreeMap<String, ScopeEntry<'a>>,
}

impl<'a> Default for Scope<'a> {
    fn default() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(STD.to_string(), ScopeEntry::builtin(STD));
        Self { entries }
    }
}

impl<'a> Scope<'a> {
    /// Sorted names; `std` is always present.
    pub fn keys(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn get(&self, name: &str) -> Option<&ScopeEntry<'a>> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScopeEntry<'a>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn insert(&mut self, name: &str, entry: ScopeEntry<'a>) {
        self.entries.insert(name.to_string(), entry);
    }

    /// Resolves `head.tail...` to the entry declaring the last segment.
    pub fn resolve(&self, path: &[&str]) -> Result<ScopeEntry<'a>, ResolveError> {
        let (head, tail) = path.split_first().ok_or(ResolveError::EmptyPath)?;
        let entry = self
            .entries
            .get(*head)
            .ok_or_else(|| ResolveError::UnresolvedIdentifier { name: head.to_string() })?;
        if tail.is_empty() {
            return Ok(entry.clone());
        }

        let object = self.indexable(head, entry)?;
        let mut mapper = ObjectMapper::new();
        mapper.index(object);
        let (field, span) = mapper.lookup_field(object, tail)?;
        let value = field_value(field)?;
        Ok(ScopeEntry::bound(EntryKind::Field, value, Some(span)))
    }

    /// Field names of the object `path` resolves to, with their entries.
    pub fn field_candidates(&self, path: &[&str]) -> Result<Vec<(String, ScopeEntry<'a>)>, ResolveError> {
        let entry = self.resolve(path)?;
        let name = path.last().copied().unwrap_or_default();
        let object = self.indexable(name, &entry)?;
        let mut out = Vec::with_capacity(object.fields.len());
        for field in &object.fields {
            match field_value(field) {
                Ok(value) => out.push((
                    field.name.clone(),
                    ScopeEntry::bound(EntryKind::Field, value, object.field_loc(&field.name)),
                )),
                Err(err) => error!(defect = true, error = %err, "malformed desugared field"),
            }
        }
        Ok(out)
    }

    /// The object bound to `name`, looking through at most one `local`.
    fn indexable(&self, name: &str, entry: &ScopeEntry<'a>) -> Result<&'a DesugaredObject, ResolveError> {
        let node = match entry.node {
            Some(Node::Local(local)) => match local.body.as_ref() {
                Node::Local(_) => return Err(ResolveError::NestedLocal { name: name.to_string() }),
                body => Some(body),
            },
            node => node,
        };
        match node {
            Some(Node::DesugaredObject(object)) => Ok(object),
            _ => Err(ResolveError::NotIndexable { name: name.to_string() }),
        }
    }

    fn add_binds(&mut self, binds: &'a [LocalBind], source: &Source<'_>) {
        for bind in binds {
            let decl = source.bind_name_span(bind).ok();
            self.insert(&bind.variable, ScopeEntry::bound(EntryKind::Local, &bind.body, decl));
        }
    }

    fn add_params(&mut self, function: &'a Function, source: &Source<'_>) {
        let spans = source.required_param_spans(function).ok();
        for (i, name) in function.params.required.iter().enumerate() {
            self.insert(
                name,
                ScopeEntry {
                    detail: format!("(parameter) {}", name),
                    kind: EntryKind::Parameter,
                    node: None,
                    decl: spans.as_ref().and_then(|s| s.get(i).copied()),
                },
            );
        }
        for param in &function.params.optional {
            let decl = source.optional_param_span(param).ok();
            self.insert(&param.name, ScopeEntry::bound(EntryKind::Parameter, &param.default, decl));
        }
    }

    fn add_object(&mut self, node: &'a Node, object: &'a DesugaredObject, outermost: bool, source: &Source<'_>) {
        self.insert("self", ScopeEntry::bound(EntryKind::SelfRef, node, None));
        self.insert(
            "super",
            ScopeEntry {
                detail: "(super)".to_string(),
                kind: EntryKind::Super,
                node: None,
                decl: None,
            },
        );
        if outermost {
            self.insert("$", ScopeEntry::bound(EntryKind::Dollar, node, None));
        }
        for field in &object.fields {
            match field_value(field) {
                Ok(value) => {
                    let entry = ScopeEntry::bound(EntryKind::Field, value, object.field_loc(&field.name));
                    self.insert(&field.name, entry);
                }
                Err(err) => error!(defect = true, error = %err, "malformed desugared field"),
            }
        }
        self.add_binds(&object.locals, source);
    }
}

/// Builds the scope at `pos` by walking from the root through every node
/// whose span contains it.
pub fn resolve_scope<'a>(tree: &'a Node, source: &Source<'_>, pos: Position) -> Scope<'a> {
    let mut scope = Scope::default();
    let mut in_object = false;
    enter(tree, source, pos, &mut scope, &mut in_object);
    scope
}

fn enter<'a>(node: &'a Node, source: &Source<'_>, pos: Position, scope: &mut Scope<'a>, in_object: &mut bool) {
    if !node.span().contains(pos) {
        return;
    }
    match node {
        Node::Local(local) => scope.add_binds(&local.binds, source),
        Node::Function(function) => scope.add_params(function, source),
        Node::DesugaredObject(object) => {
            scope.add_object(node, object, !*in_object, source);
            *in_object = true;
        }
        _ => {}
    }
    for child in node.children() {
        enter(child, source, pos, scope, in_object);
    }
}
