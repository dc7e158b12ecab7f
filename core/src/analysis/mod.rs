//! Position queries over a desugared tree: locating, scopes, field lookup,
//! binding identity, plus the per-document cache that owns the trees.

use thiserror::Error;
use tracing::debug;

use crate::{
    ast::{self, Node},
    token::{ParseDiagnostic, Position, Span},
};

mod cache;
mod derive;
mod locate;
mod object;
mod references;
mod scope;

#[cfg(test)]
mod cache_test;
#[cfg(test)]
mod object_test;
#[cfg(test)]
mod references_test;
#[cfg(test)]
mod scope_test;

pub use cache::{AnalysisCache, Builder, Notification, Notifier, ProcessingStatus, Snapshot};
pub use derive::{index_id_span, Source};
pub use locate::{locate, Located};
pub use object::{field_name_at, field_value, path_to_location, ObjectMapper, ObjectPath};
pub use references::{definition_at, references_at, Binding, Occurrence, References};
pub use scope::{resolve_scope, EntryKind, Scope, ScopeEntry};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocateError {
    #[error("position {pos} is outside the document")]
    NotFound { pos: Position },
    #[error("computed field names are unsupported")]
    Unsupported,
    #[error("position {pos} isn't in an object key")]
    NotInField { pos: Position },
    #[error("unable to derive the span of {what}")]
    Underivable { what: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("unresolved identifier {name:?}")]
    UnresolvedIdentifier { name: String },
    #[error("{name:?} is not an indexable object")]
    NotIndexable { name: String },
    #[error("field {name:?} does not exist in object")]
    FieldNotFound { name: String },
    #[error("field {field:?} has no scope wrapper")]
    MissingScopeWrapper { field: String },
    #[error("field {field:?} has more than one scope wrapper")]
    ExtraScopeWrapper { field: String },
    #[error("{name:?} is bound inside more than one local")]
    NestedLocal { name: String },
    #[error("empty path")]
    EmptyPath,
}

/// Output of parsing and desugaring one document.
#[derive(Debug, Clone)]
pub struct Analysis {
    /// `None` only when desugaring failed.
    pub tree: Option<Node>,
    pub diagnostics: Vec<ParseDiagnostic>,
}

pub fn analyze(path: &str, text: &str) -> Analysis {
    let parsed = ast::parse(path, text);
    let mut diagnostics = parsed.diagnostics;
    let tree = match ast::desugar(parsed.node) {
        Ok(tree) => Some(tree),
        Err(err) => {
            debug!(path, error = %err, "desugaring failed");
            diagnostics.push(ParseDiagnostic::new(err.to_string(), err.span()));
            None
        }
    };
    Analysis { tree, diagnostics }
}

/// Lines first, then columns: smaller means more specific.
pub(crate) fn extent(span: Span) -> (u32, u32) {
    let lines = span.end.line.saturating_sub(span.start.line);
    let columns = if lines == 0 {
        span.end.column.saturating_sub(span.start.column)
    } else {
        span.end.column
    };
    (lines, columns)
}
