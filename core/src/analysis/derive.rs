//! Spans the tree does not store: bound identifiers, required parameters and
//! the identifier of `target.id`. They are recovered from a node's span plus
//! the source text.

use crate::{
    analysis::LocateError,
    ast::{Function, Index, IndexKey, LocalBind, NamedParameter},
    token::{offset_to_position, LineIndex, Position, Span, Token, Tokenizer},
};

/// Document text with a line index, shared by one analysis pass.
#[derive(Debug, Clone)]
pub struct Source<'a> {
    text: &'a str,
    lines: LineIndex,
}

fn ident_span(start: Position, name: &str) -> Span {
    Span::new(start, Position::new(start.line, start.column + name.chars().count() as u32))
}

impl<'a> Source<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            lines: LineIndex::new(text),
        }
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    /// Position just past the last character.
    pub fn end(&self) -> Position {
        offset_to_position(self.text, self.text.len())
    }

    pub fn slice(&self, span: Span) -> Option<&'a str> {
        let start = self.lines.offset(self.text, span.start)?;
        let end = self.lines.offset(self.text, span.end)?;
        self.text.get(start..end)
    }

    /// Text from the start of the line holding `pos` up to `pos`.
    pub fn line_prefix(&self, pos: Position) -> Option<&'a str> {
        let end = self.lines.offset(self.text, pos)?;
        let start = self.lines.offset(self.text, Position::new(pos.line, 1))?;
        self.text.get(start..end)
    }

    /// Span of the variable in `x = e` / `f(a) = e`.
    pub fn bind_name_span(&self, bind: &LocalBind) -> Result<Span, LocateError> {
        let span = ident_span(bind.span.start, &bind.variable);
        match self.slice(span) {
            Some(text) if text == bind.variable => Ok(span),
            _ => Err(LocateError::Underivable {
                what: format!("local {}", bind.variable),
            }),
        }
    }

    pub fn optional_param_span(&self, param: &NamedParameter) -> Result<Span, LocateError> {
        let span = ident_span(param.span.start, &param.name);
        match self.slice(span) {
            Some(text) if text == param.name => Ok(span),
            _ => Err(LocateError::Underivable {
                what: format!("parameter {}", param.name),
            }),
        }
    }

    /// Spans of `function.params.required`, in order.
    ///
    /// Functions written in source list their parameters inside the first
    /// parenthesis. Functions synthesised for comprehensions span the whole
    /// comprehension and take their parameter from `for <name> in`.
    pub fn required_param_spans(&self, function: &Function) -> Result<Vec<Span>, LocateError> {
        let underivable = || LocateError::Underivable {
            what: format!("parameters of function at {}", function.span),
        };
        if function.params.required.is_empty() {
            return Ok(Vec::new());
        }
        let text = self.slice(function.span).ok_or_else(underivable)?;
        let lexed = Tokenizer::tokenize_from(text, function.span.start);
        let tokens = &lexed.tokens;
        let spans = &lexed.spans;

        if matches!(tokens.first(), Some(Token::LBracket | Token::LBrace)) {
            return function
                .params
                .required
                .iter()
                .map(|name| {
                    tokens
                        .windows(2)
                        .position(|w| w[0] == Token::For && matches!(&w[1], Token::Id(id) if id == name))
                        .map(|i| spans[i + 1])
                        .ok_or_else(underivable)
                })
                .collect();
        }

        let open = tokens.iter().position(|t| *t == Token::LParen).ok_or_else(underivable)?;
        let mut depth = 0usize;
        let mut found = Vec::new();
        for i in open..tokens.len() {
            match &tokens[i] {
                Token::LParen | Token::LBracket | Token::LBrace => depth += 1,
                Token::RParen | Token::RBracket | Token::RBrace => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                Token::Id(id) if depth == 1 => {
                    let starts_param = matches!(tokens[i - 1], Token::LParen | Token::Comma);
                    let is_optional = tokens.get(i + 1) == Some(&Token::Assign);
                    if starts_param && !is_optional {
                        found.push((id.as_str(), spans[i]));
                    }
                }
                _ => {}
            }
        }

        if found.len() != function.params.required.len()
            || found.iter().zip(&function.params.required).any(|((id, _), name)| id != name)
        {
            return Err(underivable());
        }
        Ok(found.into_iter().map(|(_, span)| span).collect())
    }
}

/// Span of `id` in `target.id`.
pub fn index_id_span(index: &Index) -> Option<Span> {
    let IndexKey::Id(id) = &index.key else {
        return None;
    };
    let len = id.chars().count() as u32;
    let end = index.span.end;
    if end.column <= len || index.span.start.line == end.line && end.column - len < index.span.start.column {
        return None;
    }
    Some(Span::new(Position::new(end.line, end.column - len), end))
}
