use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;

use crate::token::{ParseDiagnostic, Position, Span};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    LBrace,          // {
    RBrace,          // }
    LBracket,        // [
    RBracket,        // ]
    LParen,          // (
    RParen,          // )
    Comma,           // ,
    Dot,             // .
    Semicolon,       // ;
    Dollar,          // $
    Colon,           // :
    DoubleColon,     // ::
    TripleColon,     // :::
    PlusColon,       // +:
    PlusDoubleColon, // +::
    PlusTripleColon, // +:::
    Assign,          // =
    Add,             // +
    Sub,             // -
    Mul,             // *
    Div,             // /
    Mod,             // %
    Not,             // !
    Tilde,           // ~
    BitAnd,          // &
    BitOr,           // |
    BitXor,          // ^
    Lt,              // <
    Gt,              // >
    Le,              // <=
    Ge,              // >=
    Eq,              // ==
    Ne,              // !=
    Shl,             // <<
    Shr,             // >>
    And,             // &&
    Or,              // ||
    // Keywords
    Assert,
    Else,
    Error,
    False,
    For,
    Function,
    If,
    Import,
    ImportBin,
    ImportStr,
    In,
    Local,
    Null,
    SelfKw,
    Super,
    TailStrict,
    Then,
    True,
    Id(String),     // identifier
    Number(String), // original spelling, e.g. 1e3
    Str(String),    // unescaped string contents
}

impl Token {
    pub fn describe(&self) -> String {
        match self {
            Token::Id(name) => format!("identifier {:?}", name),
            Token::Number(n) => format!("number {}", n),
            Token::Str(_) => "string".to_string(),
            other => format!("`{}`", other),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::Comma => ",",
            Token::Dot => ".",
            Token::Semicolon => ";",
            Token::Dollar => "$",
            Token::Colon => ":",
            Token::DoubleColon => "::",
            Token::TripleColon => ":::",
            Token::PlusColon => "+:",
            Token::PlusDoubleColon => "+::",
            Token::PlusTripleColon => "+:::",
            Token::Assign => "=",
            Token::Add => "+",
            Token::Sub => "-",
            Token::Mul => "*",
            Token::Div => "/",
            Token::Mod => "%",
            Token::Not => "!",
            Token::Tilde => "~",
            Token::BitAnd => "&",
            Token::BitOr => "|",
            Token::BitXor => "^",
            Token::Lt => "<",
            Token::Gt => ">",
            Token::Le => "<=",
            Token::Ge => ">=",
            Token::Eq => "==",
            Token::Ne => "!=",
            Token::Shl => "<<",
            Token::Shr => ">>",
            Token::And => "&&",
            Token::Or => "||",
            Token::Assert => "assert",
            Token::Else => "else",
            Token::Error => "error",
            Token::False => "false",
            Token::For => "for",
            Token::Function => "function",
            Token::If => "if",
            Token::Import => "import",
            Token::ImportBin => "importbin",
            Token::ImportStr => "importstr",
            Token::In => "in",
            Token::Local => "local",
            Token::Null => "null",
            Token::SelfKw => "self",
            Token::Super => "super",
            Token::TailStrict => "tailstrict",
            Token::Then => "then",
            Token::True => "true",
            Token::Id(name) => return write!(f, "{}", name),
            Token::Number(n) => return write!(f, "{}", n),
            Token::Str(s) => return write!(f, "{:?}", s),
        };
        write!(f, "{}", s)
    }
}

static KEYWORDS: Lazy<HashMap<&'static str, Token>> = Lazy::new(|| {
    HashMap::from([
        ("assert", Token::Assert),
        ("else", Token::Else),
        ("error", Token::Error),
        ("false", Token::False),
        ("for", Token::For),
        ("function", Token::Function),
        ("if", Token::If),
        ("import", Token::Import),
        ("importbin", Token::ImportBin),
        ("importstr", Token::ImportStr),
        ("in", Token::In),
        ("local", Token::Local),
        ("null", Token::Null),
        ("self", Token::SelfKw),
        ("super", Token::Super),
        ("tailstrict", Token::TailStrict),
        ("then", Token::Then),
        ("true", Token::True),
    ])
});

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains_key(word)
}

#[inline]
fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

#[inline]
fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Tokens, their spans, and the lexing problems found along the way.
#[derive(Debug, Clone)]
pub struct LexOutput {
    pub tokens: Vec<Token>,
    pub spans: Vec<Span>,
    pub diagnostics: Vec<ParseDiagnostic>,
    /// Position just past the last character of the input.
    pub eof: Position,
}

pub struct Tokenizer {
    chars: Vec<char>,
    idx: usize,
    line: u32,
    column: u32,
    tokens: Vec<Token>,
    spans: Vec<Span>,
    diagnostics: Vec<ParseDiagnostic>,
}

impl Tokenizer {
    /// Tokenize the whole input. Never fails: bad input becomes diagnostics.
    pub fn tokenize_with_spans(s: &str) -> LexOutput {
        Self::tokenize_from(s, Position::start())
    }

    /// Tokenize `s` as if it started at `origin` in a larger document.
    pub fn tokenize_from(s: &str, origin: Position) -> LexOutput {
        let mut tokenizer = Tokenizer {
            chars: s.chars().collect(),
            idx: 0,
            line: origin.line,
            column: origin.column,
            tokens: Vec::new(),
            spans: Vec::new(),
            diagnostics: Vec::new(),
        };
        tokenizer.run();
        let eof = tokenizer.current_position();
        LexOutput {
            tokens: tokenizer.tokens,
            spans: tokenizer.spans,
            diagnostics: tokenizer.diagnostics,
            eof,
        }
    }

    pub fn tokenize(s: &str) -> Vec<Token> {
        Self::tokenize_with_spans(s).tokens
    }

    fn current_position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn eof(&self) -> bool {
        self.idx >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.idx).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.idx + ahead).copied()
    }

    fn starts_with(&self, s: &str) -> bool {
        s.chars().enumerate().all(|(i, c)| self.peek_at(i) == Some(c))
    }

    fn advance_char(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.idx += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn advance_n(&mut self, n: usize) {
        for _ in 0..n {
            self.advance_char();
        }
    }

    fn push_with_span(&mut self, token: Token, start: Position) {
        let end = self.current_position();
        self.tokens.push(token);
        self.spans.push(Span::new(start, end));
    }

    fn error(&mut self, message: impl Into<String>, start: Position) {
        let end = self.current_position();
        self.diagnostics.push(ParseDiagnostic::new(message, Span::new(start, end)));
    }

    fn run(&mut self) {
        while !self.eof() {
            self.skip_trivia();
            if self.eof() {
                break;
            }
            let start = self.current_position();
            let Some(c) = self.peek() else { break };

            if is_ident_start(c) {
                self.parse_id(start);
            } else if c.is_ascii_digit() {
                self.parse_num(start);
            } else if c == '"' || c == '\'' {
                self.advance_char();
                self.parse_str(c, start);
            } else if c == '@' && matches!(self.peek_at(1), Some('"') | Some('\'')) {
                self.parse_verbatim_str(start);
            } else if self.starts_with("|||") {
                self.parse_text_block(start);
            } else if !self.parse_punctuation(start) {
                self.advance_char();
                self.error(format!("unexpected character {:?}", c), start);
            }
        }
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance_char();
                }
                Some('#') => self.skip_line_comment(),
                Some('/') if self.peek_at(1) == Some('/') => self.skip_line_comment(),
                Some('/') if self.peek_at(1) == Some('*') => self.skip_block_comment(),
                _ => return,
            }
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance_char();
        }
    }

    fn skip_block_comment(&mut self) {
        let start = self.current_position();
        self.advance_n(2);
        while !self.eof() {
            if self.starts_with("*/") {
                self.advance_n(2);
                return;
            }
            self.advance_char();
        }
        self.error("unterminated comment", start);
    }

    fn parse_id(&mut self, start: Position) {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if !is_ident_continue(c) {
                break;
            }
            word.push(c);
            self.advance_char();
        }
        let token = KEYWORDS.get(word.as_str()).cloned().unwrap_or(Token::Id(word));
        self.push_with_span(token, start);
    }

    fn parse_num(&mut self, start: Position) {
        let mut text = String::new();
        self.take_digits(&mut text);
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            text.push('.');
            self.advance_char();
            self.take_digits(&mut text);
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            let sign = matches!(self.peek_at(1), Some('+') | Some('-'));
            let digit_at = if sign { 2 } else { 1 };
            if self.peek_at(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                for _ in 0..digit_at {
                    if let Some(c) = self.advance_char() {
                        text.push(c);
                    }
                }
                self.take_digits(&mut text);
            } else {
                self.advance_n(digit_at);
                self.error("malformed exponent in number literal", start);
            }
        }
        self.push_with_span(Token::Number(text), start);
    }

    fn take_digits(&mut self, text: &mut String) {
        while let Some(c) = self.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            text.push(c);
            self.advance_char();
        }
    }

    fn parse_str(&mut self, quote: char, start: Position) {
        let mut value = String::new();
        loop {
            let Some(c) = self.advance_char() else {
                self.error("unterminated string", start);
                break;
            };
            if c == quote {
                break;
            }
            if c != '\\' {
                value.push(c);
                continue;
            }
            let esc_start = self.current_position();
            match self.advance_char() {
                Some('"') => value.push('"'),
                Some('\'') => value.push('\''),
                Some('\\') => value.push('\\'),
                Some('/') => value.push('/'),
                Some('b') => value.push('\u{8}'),
                Some('f') => value.push('\u{c}'),
                Some('n') => value.push('\n'),
                Some('r') => value.push('\r'),
                Some('t') => value.push('\t'),
                Some('u') => match self.unicode_escape() {
                    Some(ch) => value.push(ch),
                    None => self.error("invalid unicode escape", esc_start),
                },
                Some(other) => {
                    self.error(format!("unknown escape sequence \\{}", other), esc_start);
                    value.push(other);
                }
                None => {
                    self.error("unterminated string", start);
                    break;
                }
            }
        }
        self.push_with_span(Token::Str(value), start);
    }

    /// Decodes the digits after `\u`. A high surrogate followed by an escaped
    /// low surrogate is one character.
    fn unicode_escape(&mut self) -> Option<char> {
        let Some(code) = self.hex_at(0) else {
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.advance_char();
            }
            return None;
        };
        self.advance_n(4);
        if (0xD800..0xDC00).contains(&code) && self.starts_with("\\u") {
            if let Some(low @ 0xDC00..=0xDFFF) = self.hex_at(2) {
                self.advance_n(6);
                return char::from_u32(0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00));
            }
        }
        char::from_u32(code)
    }

    fn hex_at(&self, ahead: usize) -> Option<u32> {
        (ahead..ahead + 4).try_fold(0u32, |code, i| Some(code * 16 + self.peek_at(i)?.to_digit(16)?))
    }

    fn parse_verbatim_str(&mut self, start: Position) {
        self.advance_char();
        let quote = self.advance_char().unwrap_or('"');
        let mut value = String::new();
        loop {
            match self.advance_char() {
                None => {
                    self.error("unterminated string", start);
                    break;
                }
                Some(c) if c == quote => {
                    if self.peek() == Some(quote) {
                        self.advance_char();
                        value.push(quote);
                    } else {
                        break;
                    }
                }
                Some(c) => value.push(c),
            }
        }
        self.push_with_span(Token::Str(value), start);
    }

    fn parse_text_block(&mut self, start: Position) {
        self.advance_n(3);
        let chomp = self.peek() == Some('-');
        if chomp {
            self.advance_char();
        }
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            if !c.is_whitespace() {
                self.advance_char();
                self.error("text block requires a new line after |||", start);
                continue;
            }
            self.advance_char();
        }
        self.advance_char();

        let mut lines: Vec<String> = Vec::new();
        let mut indent: Option<String> = None;
        loop {
            if self.eof() {
                self.error("unterminated text block", start);
                break;
            }
            let mut line = String::new();
            while let Some(c) = self.peek() {
                if c == '\n' {
                    break;
                }
                line.push(c);
                self.advance_char();
            }
            let trimmed = line.trim_start();
            if trimmed.starts_with("|||") {
                // Rewind to the closing delimiter so its column is right.
                let consumed_after = line.len() - line.trim_start().len() + 3;
                let back = line.chars().count() - line[..consumed_after].chars().count();
                self.idx -= back;
                self.column -= back as u32;
                break;
            }
            self.advance_char();
            if line.trim().is_empty() {
                lines.push(String::new());
                continue;
            }
            let prefix = indent.get_or_insert_with(|| line[..line.len() - trimmed.len()].to_string());
            match line.strip_prefix(prefix.as_str()) {
                Some(rest) => lines.push(rest.to_string()),
                None => {
                    let line_start = Position::new(self.line - 1, 1);
                    self.diagnostics.push(ParseDiagnostic::at(
                        "text block line is less indented than the first line",
                        line_start,
                    ));
                    lines.push(trimmed.to_string());
                }
            }
        }
        let mut value = lines.join("\n");
        if !chomp {
            value.push('\n');
        }
        self.push_with_span(Token::Str(value), start);
    }

    fn parse_punctuation(&mut self, start: Position) -> bool {
        const MULTI: &[(&str, Token)] = &[
            ("+:::", Token::PlusTripleColon),
            (":::", Token::TripleColon),
            ("+::", Token::PlusDoubleColon),
            ("::", Token::DoubleColon),
            ("+:", Token::PlusColon),
            ("<=", Token::Le),
            (">=", Token::Ge),
            ("==", Token::Eq),
            ("!=", Token::Ne),
            ("<<", Token::Shl),
            (">>", Token::Shr),
            ("&&", Token::And),
            ("||", Token::Or),
        ];
        for (text, token) in MULTI {
            if self.starts_with(text) {
                self.advance_n(text.chars().count());
                self.push_with_span(token.clone(), start);
                return true;
            }
        }

        let token = match self.peek() {
            Some('{') => Token::LBrace,
            Some('}') => Token::RBrace,
            Some('[') => Token::LBracket,
            Some(']') => Token::RBracket,
            Some('(') => Token::LParen,
            Some(')') => Token::RParen,
            Some(',') => Token::Comma,
            Some('.') => Token::Dot,
            Some(';') => Token::Semicolon,
            Some('$') => Token::Dollar,
            Some(':') => Token::Colon,
            Some('=') => Token::Assign,
            Some('+') => Token::Add,
            Some('-') => Token::Sub,
            Some('*') => Token::Mul,
            Some('/') => Token::Div,
            Some('%') => Token::Mod,
            Some('!') => Token::Not,
            Some('~') => Token::Tilde,
            Some('&') => Token::BitAnd,
            Some('|') => Token::BitOr,
            Some('^') => Token::BitXor,
            Some('<') => Token::Lt,
            Some('>') => Token::Gt,
            _ => return false,
        };
        self.advance_char();
        self.push_with_span(token, start);
        true
    }
}
