use anyhow::Context;
use regex::Regex;
use tower_lsp::lsp_types::{CompletionItem, CompletionItemKind, CompletionTextEdit, Position, Range, TextEdit};
use tracing::debug;

use jsonnet_core::analysis::resolve_scope;

use super::{DocumentView, ImportableFiles};
use crate::server::text::{line_prefix, text_before};

/// Trailing dotted path, optionally followed by closers the editor inserted.
const INDEX_PATH: &str = r"((\w+\.)*\w+)\.[;\]\)\}]*$";
const CLOSERS: [char; 4] = [';', ']', ')', '}'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompletionAction {
    Import,
    Index,
}

pub(crate) struct CompletionRequest<'a> {
    pub(crate) view: &'a DocumentView,
    pub(crate) position: Position,
    pub(crate) files: &'a dyn ImportableFiles,
}

/// Maps patterns matched against the text before the cursor to completion actions.
pub(crate) struct CompletionMatcher {
    actions: Vec<(Regex, CompletionAction)>,
    index_path: Regex,
}

impl CompletionMatcher {
    pub(crate) fn new() -> anyhow::Result<Self> {
        Ok(Self {
            actions: Vec::new(),
            index_path: Regex::new(INDEX_PATH).context("compiling index path pattern")?,
        })
    }

    pub(crate) fn with_defaults() -> anyhow::Result<Self> {
        let mut matcher = Self::new()?;
        for term in [r"import\s+", r"importstr\s+", r"importbin\s+"] {
            matcher.register(term, CompletionAction::Import)?;
        }
        matcher.register(r"\w+\.", CompletionAction::Index)?;
        Ok(matcher)
    }

    /// `term` must match up to the cursor. Earlier registrations win.
    pub(crate) fn register(&mut self, term: &str, action: CompletionAction) -> anyhow::Result<()> {
        let re = Regex::new(&format!("(?:{})$", term))
            .with_context(|| format!("registering completion matcher {:?}", term))?;
        self.actions.push((re, action));
        Ok(())
    }

    pub(crate) fn action_for(&self, prefix: &str) -> Option<CompletionAction> {
        self.actions
            .iter()
            .find(|(re, _)| re.is_match(prefix))
            .map(|(_, action)| *action)
    }

    pub(crate) fn complete(&self, req: &CompletionRequest<'_>) -> anyhow::Result<Vec<CompletionItem>> {
        let rope = req.view.rope();
        let prefix = line_prefix(rope, req.position);
        match self.action_for(&prefix) {
            Some(CompletionAction::Import) => import_items(req),
            Some(CompletionAction::Index) => Ok(self.index_items(req)),
            None => Ok(Vec::new()),
        }
    }

    /// Dotted path before a trailing dot: `a.b.` gives `["a", "b"]`.
    pub(crate) fn resolve_index(&self, source: &str) -> Option<Vec<String>> {
        let matched = self.index_path.find(source)?.as_str();
        let path: Vec<String> = matched
            .trim_end_matches(&CLOSERS[..])
            .split('.')
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect();
        (!path.is_empty()).then_some(path)
    }

    fn index_items(&self, req: &CompletionRequest<'_>) -> Vec<CompletionItem> {
        let view = req.view;
        let before = text_before(view.rope(), req.position);
        let Some(path) = self.resolve_index(&before) else {
            debug!(line = req.position.line, "no index before cursor");
            return Vec::new();
        };
        let path: Vec<&str> = path.iter().map(String::as_str).collect();

        let source = view.source();
        let scope = resolve_scope(view.tree(), &source, view.core_position(req.position));
        match scope.field_candidates(&path) {
            Ok(fields) => fields
                .into_iter()
                .map(|(name, entry)| CompletionItem {
                    label: name.clone(),
                    kind: Some(CompletionItemKind::FIELD),
                    detail: Some(entry.detail),
                    text_edit: Some(edit_at(req.position, name)),
                    ..Default::default()
                })
                .collect(),
            Err(err) => {
                debug!(path = ?path, error = %err, "index completion unresolved");
                Vec::new()
            }
        }
    }
}

fn import_items(req: &CompletionRequest<'_>) -> anyhow::Result<Vec<CompletionItem>> {
    let files = req.files.files().context("listing importable files")?;
    Ok(files
        .into_iter()
        .map(|file| {
            let quoted = format!("\"{}\"", file);
            CompletionItem {
                label: file,
                kind: Some(CompletionItemKind::FILE),
                text_edit: Some(edit_at(req.position, quoted)),
                ..Default::default()
            }
        })
        .collect())
}

fn edit_at(position: Position, new_text: String) -> CompletionTextEdit {
    CompletionTextEdit::Edit(TextEdit {
        range: Range::new(position, position),
        new_text,
    })
}
