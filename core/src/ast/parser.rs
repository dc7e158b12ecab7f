use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::{
    ast::*,
    token::{LexOutput, ParseDiagnostic, Position, Span, Token, Tokenizer},
};

/// A tree for the whole document plus every problem found on the way.
///
/// Parsing never fails: wherever an expression was expected but missing, the
/// tree holds a `Partial` (or `PartialIndex` after a trailing dot) and a
/// diagnostic explains what was expected.
#[derive(Debug, Clone)]
pub struct ParseOutput {
    pub node: Node,
    pub diagnostics: Vec<ParseDiagnostic>,
}

pub fn parse(path: &str, text: &str) -> ParseOutput {
    let LexOutput {
        tokens,
        spans,
        diagnostics: mut lex_diagnostics,
        eof,
    } = Tokenizer::tokenize_with_spans(text);

    let mut parser = Parser::new(&tokens, &spans, eof);
    let node = parser.parse();
    lex_diagnostics.extend(parser.into_diagnostics());

    debug!(
        path,
        tokens = tokens.len(),
        diagnostics = lex_diagnostics.len(),
        "parsed document"
    );
    ParseOutput {
        node,
        diagnostics: lex_diagnostics,
    }
}

/// Reads and parses a file from disk.
pub fn parse_file(path: &Path) -> Result<ParseOutput> {
    let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(parse(&path.to_string_lossy(), &text))
}

pub struct Parser<'a> {
    tokens: &'a [Token],
    spans: &'a [Span],
    pos: usize,
    len: usize,
    eof_pos: Position,
    diagnostics: Vec<ParseDiagnostic>,
    depth: usize,
}

const MAX_PRECEDENCE: u8 = 10;

/// Deepest tree the parser builds. Every later pass recurses over the tree,
/// so this also bounds their stack use.
pub const MAX_NESTING: usize = 256;

fn binary_op(token: &Token) -> Option<BinaryOp> {
    let op = match token {
        Token::Mul => BinaryOp::Mul,
        Token::Div => BinaryOp::Div,
        Token::Mod => BinaryOp::Mod,
        Token::Add => BinaryOp::Add,
        Token::Sub => BinaryOp::Sub,
        Token::Shl => BinaryOp::Shl,
        Token::Shr => BinaryOp::Shr,
        Token::Lt => BinaryOp::Lt,
        Token::Le => BinaryOp::Le,
        Token::Gt => BinaryOp::Gt,
        Token::Ge => BinaryOp::Ge,
        Token::In => BinaryOp::In,
        Token::Eq => BinaryOp::Eq,
        Token::Ne => BinaryOp::Ne,
        Token::BitAnd => BinaryOp::BitAnd,
        Token::BitXor => BinaryOp::BitXor,
        Token::BitOr => BinaryOp::BitOr,
        Token::And => BinaryOp::And,
        Token::Or => BinaryOp::Or,
        _ => return None,
    };
    Some(op)
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token], spans: &'a [Span], eof_pos: Position) -> Self {
        Self {
            tokens,
            spans,
            pos: 0,
            len: tokens.len(),
            eof_pos,
            diagnostics: Vec::new(),
            depth: 0,
        }
    }

    pub fn parse(&mut self) -> Node {
        let node = self.parse_expr();
        if !self.eof() {
            let msg = format!("unexpected {} after end of expression", self.found());
            let span = self.current_span();
            self.error(msg, span);
        }
        node
    }

    pub fn into_diagnostics(self) -> Vec<ParseDiagnostic> {
        self.diagnostics
    }

    fn eof(&self) -> bool {
        self.pos >= self.len
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, ahead: usize) -> Option<&'a Token> {
        self.tokens.get(self.pos + ahead)
    }

    fn at(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    fn current_span(&self) -> Span {
        self.spans
            .get(self.pos)
            .copied()
            .unwrap_or_else(|| Span::single(self.eof_pos))
    }

    fn current_start(&self) -> Position {
        self.current_span().start
    }

    /// End of the last consumed token.
    fn prev_end(&self) -> Position {
        match self.pos.checked_sub(1).and_then(|i| self.spans.get(i)) {
            Some(span) => span.end,
            None => Position::start(),
        }
    }

    fn bump(&mut self) -> Span {
        let span = self.current_span();
        if !self.eof() {
            self.pos += 1;
        }
        span
    }

    fn eat(&mut self, token: &Token) -> Option<Span> {
        if self.at(token) { Some(self.bump()) } else { None }
    }

    fn found(&self) -> String {
        match self.peek() {
            Some(token) => token.describe(),
            None => "end of input".to_string(),
        }
    }

    fn error(&mut self, message: impl Into<String>, span: Span) {
        self.diagnostics.push(ParseDiagnostic::new(message, span));
    }

    fn expect(&mut self, token: Token, context: &str) -> Option<Span> {
        if let Some(span) = self.eat(&token) {
            return Some(span);
        }
        let msg = format!("expected `{}` {}, found {}", token, context, self.found());
        let span = self.current_span();
        self.error(msg, span);
        None
    }

    /// End position for a bracketed construct whose closer may be missing.
    fn close_end(&self, close: Option<Span>) -> Position {
        match close {
            Some(span) => span.end,
            None => self.current_start(),
        }
    }

    fn partial(&self) -> Node {
        Node::Partial(Partial {
            span: Span::new(self.prev_end(), self.current_start()),
        })
    }

    fn missing_expr(&mut self) -> Node {
        let msg = format!("expected expression, found {}", self.found());
        let span = self.current_span();
        self.error(msg, span);
        self.partial()
    }

    fn synchronize(&mut self, stop: &[Token]) {
        while let Some(token) = self.peek() {
            if stop.contains(token) {
                break;
            }
            self.pos += 1;
        }
    }

    /// Consumes the separator after a list item. Returns false once the list
    /// is over.
    fn finish_list_item(&mut self, close: &Token, context: &str) -> bool {
        if self.eat(&Token::Comma).is_some() {
            return true;
        }
        if self.at(close) || self.eof() {
            return false;
        }
        let msg = format!("expected `,` or `{}` {}, found {}", close, context, self.found());
        let span = self.current_span();
        self.error(msg, span);
        self.synchronize(&[Token::Comma, close.clone()]);
        self.eat(&Token::Comma).is_some()
    }

    fn parse_expr(&mut self) -> Node {
        self.nested(|p| p.parse_binary(MAX_PRECEDENCE))
    }

    fn nested(&mut self, parse: fn(&mut Self) -> Node) -> Node {
        if self.depth >= MAX_NESTING {
            return self.too_deep();
        }
        self.depth += 1;
        let node = parse(self);
        self.depth -= 1;
        node
    }

    /// Skips the expression at the cursor, stopping at a `,` or an unmatched
    /// closer.
    fn too_deep(&mut self) -> Node {
        let span = self.current_span();
        self.error("nesting too deep", span);
        let first = self.pos;
        let mut open = 0usize;
        while let Some(token) = self.peek() {
            match token {
                Token::LParen | Token::LBracket | Token::LBrace => open += 1,
                Token::RParen | Token::RBracket | Token::RBrace => {
                    if open == 0 {
                        break;
                    }
                    open -= 1;
                }
                Token::Comma if open == 0 => break,
                _ => {}
            }
            self.pos += 1;
        }
        if self.pos == first {
            return self.partial();
        }
        Node::Partial(Partial {
            span: Span::new(span.start, self.prev_end()),
        })
    }

    /// Postfix and binary chains nest to the left without recursing. Once a
    /// chain reaches the limit the tree built so far collapses into a
    /// `Partial`.
    fn bound_chain(&mut self, node: Node, links: &mut usize) -> Node {
        *links += 1;
        if self.depth + *links <= MAX_NESTING {
            return node;
        }
        let span = node.span();
        self.error("nesting too deep", span);
        *links = 0;
        Node::Partial(Partial { span })
    }

    /// Precedence climbing over left-associative binary operators whose
    /// precedence is at most `max`.
    fn parse_binary(&mut self, max: u8) -> Node {
        let mut left = self.parse_unary();
        let mut links = 0;
        while let Some(op) = self.peek().and_then(binary_op) {
            if op.precedence() > max {
                break;
            }
            self.pos += 1;

            // `e in super`
            if op == BinaryOp::In && self.at(&Token::Super) {
                let end = self.bump().end;
                let node = Node::InSuper(InSuper {
                    span: Span::new(left.span().start, end),
                    expr: Box::new(left),
                });
                left = self.bound_chain(node, &mut links);
                continue;
            }

            let right = self.parse_binary(op.precedence() - 1);
            let node = Node::Binary(Binary {
                op,
                span: Span::new(left.span().start, right.span().end),
                left: Box::new(left),
                right: Box::new(right),
            });
            left = self.bound_chain(node, &mut links);
        }
        left
    }

    fn parse_unary(&mut self) -> Node {
        let op = match self.peek() {
            Some(Token::Sub) => UnaryOp::Neg,
            Some(Token::Add) => UnaryOp::Plus,
            Some(Token::Not) => UnaryOp::Not,
            Some(Token::Tilde) => UnaryOp::BitNot,
            _ => return self.parse_postfix(),
        };
        let start = self.bump().start;
        let expr = self.nested(Self::parse_unary);
        Node::Unary(Unary {
            op,
            span: Span::new(start, expr.span().end),
            expr: Box::new(expr),
        })
    }

    /// - `e.id`, `e[i]`, `e[a:b:c]`
    /// - `e(args)`, `e(args) tailstrict`
    /// - `e { ... }` (object extension)
    fn parse_postfix(&mut self) -> Node {
        let mut node = self.parse_primary();
        let mut links = 0;
        loop {
            let next = match self.peek() {
                Some(Token::Dot) => {
                    self.pos += 1;
                    match self.peek() {
                        Some(Token::Id(id)) => {
                            let end = self.bump().end;
                            Node::Index(Index {
                                span: Span::new(node.span().start, end),
                                target: Box::new(node),
                                key: IndexKey::Id(id.clone()),
                            })
                        }
                        _ => {
                            let span = Span::new(self.prev_end(), self.current_start());
                            let msg = format!("expected field name after `.`, found {}", self.found());
                            let err_span = self.current_span();
                            self.error(msg, err_span);
                            return Node::PartialIndex(PartialIndex {
                                target: Box::new(node),
                                span,
                            });
                        }
                    }
                }
                Some(Token::LBracket) => self.parse_index_suffix(node),
                Some(Token::LParen) => self.parse_call(node),
                Some(Token::LBrace) => {
                    let object = self.parse_object();
                    Node::Binary(Binary {
                        op: BinaryOp::Add,
                        span: Span::new(node.span().start, object.span().end),
                        left: Box::new(node),
                        right: Box::new(object),
                    })
                }
                _ => break,
            };
            node = self.bound_chain(next, &mut links);
        }
        node
    }

    fn parse_index_suffix(&mut self, target: Node) -> Node {
        self.pos += 1; // consume '['
        let start = target.span().start;

        let begin = if self.peek().is_some_and(|t| matches!(t, Token::Colon | Token::DoubleColon | Token::RBracket)) {
            None
        } else {
            Some(Box::new(self.parse_expr()))
        };

        let mut is_slice = true;
        let mut end = None;
        let mut step = None;
        match self.peek() {
            Some(Token::Colon) => {
                self.pos += 1;
                if !self.at(&Token::Colon) && !self.at(&Token::RBracket) {
                    end = Some(Box::new(self.parse_expr()));
                }
                if self.eat(&Token::Colon).is_some() && !self.at(&Token::RBracket) {
                    step = Some(Box::new(self.parse_expr()));
                }
            }
            Some(Token::DoubleColon) => {
                self.pos += 1;
                if !self.at(&Token::RBracket) {
                    step = Some(Box::new(self.parse_expr()));
                }
            }
            _ => is_slice = false,
        }

        let close = self.expect(Token::RBracket, "to close index");
        let span = Span::new(start, self.close_end(close));

        if is_slice {
            return Node::Slice(Slice {
                target: Box::new(target),
                begin,
                end,
                step,
                span,
            });
        }
        let key = match begin {
            Some(key) => key,
            None => Box::new(self.missing_expr()),
        };
        Node::Index(Index {
            target: Box::new(target),
            key: IndexKey::Expr(key),
            span,
        })
    }

    fn parse_call(&mut self, target: Node) -> Node {
        self.pos += 1; // consume '('
        let mut args = Vec::new();
        let mut named: Vec<NamedArg> = Vec::new();

        while !self.eof() && !self.at(&Token::RParen) {
            if let (Some(Token::Id(name)), Some(Token::Assign)) = (self.peek(), self.peek_at(1)) {
                self.pos += 2;
                let value = self.parse_expr();
                named.push(NamedArg {
                    name: name.clone(),
                    value,
                });
            } else {
                if !named.is_empty() {
                    let span = self.current_span();
                    self.error("positional argument after named argument", span);
                }
                args.push(self.parse_expr());
            }
            if !self.finish_list_item(&Token::RParen, "in argument list") {
                break;
            }
        }

        let close = self.expect(Token::RParen, "to close argument list");
        let mut end = self.close_end(close);
        let tailstrict = match self.eat(&Token::TailStrict) {
            Some(span) => {
                end = span.end;
                true
            }
            None => false,
        };
        Node::Apply(Apply {
            span: Span::new(target.span().start, end),
            target: Box::new(target),
            args,
            named,
            tailstrict,
        })
    }

    fn parse_primary(&mut self) -> Node {
        let Some(token) = self.peek() else {
            return self.missing_expr();
        };
        match token {
            Token::Number(text) => {
                let span = self.bump();
                let value = match text.parse::<f64>() {
                    Ok(value) => value,
                    Err(_) => {
                        self.error(format!("invalid number literal {}", text), span);
                        0.0
                    }
                };
                Node::Literal(Literal {
                    value: LiteralValue::Number {
                        value,
                        original: text.clone(),
                    },
                    span,
                })
            }
            Token::Str(s) => {
                let span = self.bump();
                Node::string(s.clone(), span)
            }
            Token::True | Token::False | Token::Null => {
                let value = match token {
                    Token::True => LiteralValue::Bool(true),
                    Token::False => LiteralValue::Bool(false),
                    _ => LiteralValue::Null,
                };
                let span = self.bump();
                Node::Literal(Literal { value, span })
            }
            Token::SelfKw => Node::SelfRef(self.bump()),
            Token::Dollar => Node::Dollar(self.bump()),
            Token::Super => self.parse_super(),
            Token::Id(name) => {
                let span = self.bump();
                Node::var(name.clone(), span)
            }
            Token::LParen => {
                self.pos += 1;
                let inner = self.parse_expr();
                self.expect(Token::RParen, "to close parenthesized expression");
                inner
            }
            Token::LBracket => self.parse_array(),
            Token::LBrace => self.parse_object(),
            Token::Local => self.parse_local(),
            Token::If => self.parse_conditional(),
            Token::Function => self.parse_function(),
            Token::Error => {
                let start = self.bump().start;
                let expr = self.parse_expr();
                Node::Error(ErrorExpr {
                    span: Span::new(start, expr.span().end),
                    expr: Box::new(expr),
                })
            }
            Token::Assert => self.parse_assert(),
            Token::Import | Token::ImportStr | Token::ImportBin => self.parse_import(),
            _ => self.missing_expr(),
        }
    }

    fn parse_super(&mut self) -> Node {
        let start = self.bump().start;
        match self.peek() {
            Some(Token::Dot) => {
                self.pos += 1;
                if let Some(Token::Id(id)) = self.peek() {
                    let end = self.bump().end;
                    return Node::SuperIndex(SuperIndex {
                        key: IndexKey::Id(id.clone()),
                        span: Span::new(start, end),
                    });
                }
                let msg = format!("expected field name after `super.`, found {}", self.found());
                let span = self.current_span();
                self.error(msg, span);
                self.partial()
            }
            Some(Token::LBracket) => {
                self.pos += 1;
                let key = self.parse_expr();
                let close = self.expect(Token::RBracket, "to close index");
                Node::SuperIndex(SuperIndex {
                    key: IndexKey::Expr(Box::new(key)),
                    span: Span::new(start, self.close_end(close)),
                })
            }
            _ => {
                let msg = format!("expected `.` or `[` after `super`, found {}", self.found());
                let span = self.current_span();
                self.error(msg, span);
                self.partial()
            }
        }
    }

    /// `local a = 1, f(x) = x; body`
    fn parse_local(&mut self) -> Node {
        let start = self.bump().start;
        let mut binds = Vec::new();
        loop {
            match self.parse_bind() {
                Some(bind) => binds.push(bind),
                None => {
                    self.synchronize(&[Token::Semicolon]);
                    break;
                }
            }
            if self.eat(&Token::Comma).is_none() {
                break;
            }
        }
        self.expect(Token::Semicolon, "after local bindings");
        let body = self.parse_expr();
        Node::Local(Local {
            binds,
            span: Span::new(start, body.span().end),
            body: Box::new(body),
        })
    }

    fn parse_bind(&mut self) -> Option<LocalBind> {
        let Some(Token::Id(name)) = self.peek() else {
            let msg = format!("expected identifier in local binding, found {}", self.found());
            let span = self.current_span();
            self.error(msg, span);
            return None;
        };
        let start = self.bump().start;
        let params = if self.eat(&Token::LParen).is_some() {
            Some(self.parse_params())
        } else {
            None
        };
        self.expect(Token::Assign, "in local binding");
        let body = self.parse_expr();
        let body = match params {
            Some(params) => Node::Function(Function {
                params,
                span: Span::new(start, body.span().end),
                body: Box::new(body),
            }),
            None => body,
        };
        Some(LocalBind {
            variable: name.clone(),
            span: Span::new(start, body.span().end),
            body,
        })
    }

    /// Parameters after the opening parenthesis, through the closing one.
    fn parse_params(&mut self) -> Parameters {
        let mut params = Parameters::default();
        while !self.eof() && !self.at(&Token::RParen) {
            if let Some(Token::Id(name)) = self.peek() {
                let name_span = self.bump();
                if self.eat(&Token::Assign).is_some() {
                    let default = self.parse_expr();
                    params.optional.push(NamedParameter {
                        name: name.clone(),
                        span: Span::new(name_span.start, default.span().end),
                        default,
                    });
                } else {
                    if !params.optional.is_empty() {
                        self.error("required parameter after optional parameter", name_span);
                    }
                    params.required.push(name.clone());
                }
            } else {
                let msg = format!("expected parameter name, found {}", self.found());
                let span = self.current_span();
                self.error(msg, span);
            }
            if !self.finish_list_item(&Token::RParen, "in parameter list") {
                break;
            }
        }
        self.expect(Token::RParen, "to close parameter list");
        params
    }

    fn parse_function(&mut self) -> Node {
        let start = self.bump().start;
        let params = if self.expect(Token::LParen, "after `function`").is_some() {
            self.parse_params()
        } else {
            Parameters::default()
        };
        let body = self.parse_expr();
        Node::Function(Function {
            params,
            span: Span::new(start, body.span().end),
            body: Box::new(body),
        })
    }

    fn parse_conditional(&mut self) -> Node {
        let start = self.bump().start;
        let cond = self.parse_expr();
        self.expect(Token::Then, "after condition");
        let then_branch = self.parse_expr();
        let else_branch = if self.eat(&Token::Else).is_some() {
            Some(Box::new(self.parse_expr()))
        } else {
            None
        };
        let end = match &else_branch {
            Some(e) => e.span().end,
            None => then_branch.span().end,
        };
        Node::Conditional(Conditional {
            cond: Box::new(cond),
            then_branch: Box::new(then_branch),
            else_branch,
            span: Span::new(start, end),
        })
    }

    /// `assert cond : message; rest`
    fn parse_assert(&mut self) -> Node {
        let start = self.bump().start;
        let cond = self.parse_expr();
        let message = if self.eat(&Token::Colon).is_some() {
            Some(Box::new(self.parse_expr()))
        } else {
            None
        };
        self.expect(Token::Semicolon, "after assertion");
        let rest = self.parse_expr();
        Node::Assert(Assert {
            span: Span::new(start, rest.span().end),
            cond: Box::new(cond),
            message,
            rest: Box::new(rest),
        })
    }

    fn parse_import(&mut self) -> Node {
        let kind = match self.peek() {
            Some(Token::ImportStr) => ImportKind::Str,
            Some(Token::ImportBin) => ImportKind::Bin,
            _ => ImportKind::Code,
        };
        let start = self.bump().start;
        if let Some(Token::Str(file)) = self.peek() {
            let end = self.bump().end;
            return Node::Import(Import {
                kind,
                file: file.clone(),
                span: Span::new(start, end),
            });
        }
        let msg = format!("expected string literal after `{}`, found {}", kind.keyword(), self.found());
        let span = self.current_span();
        self.error(msg, span);
        self.partial()
    }

    fn parse_array(&mut self) -> Node {
        let start = self.bump().start;
        if let Some(close) = self.eat(&Token::RBracket) {
            return Node::Array(Array {
                elements: Vec::new(),
                span: Span::new(start, close.end),
            });
        }

        let first = self.parse_expr();
        if self.at(&Token::For) {
            let specs = self.parse_comp_specs();
            let close = self.expect(Token::RBracket, "to close array comprehension");
            return Node::ArrayComp(ArrayComp {
                body: Box::new(first),
                specs,
                span: Span::new(start, self.close_end(close)),
            });
        }

        let mut elements = vec![first];
        while self.finish_list_item(&Token::RBracket, "in array") {
            if self.at(&Token::RBracket) {
                break;
            }
            elements.push(self.parse_expr());
        }
        let close = self.expect(Token::RBracket, "to close array");
        Node::Array(Array {
            elements,
            span: Span::new(start, self.close_end(close)),
        })
    }

    /// `for x in e` followed by any mix of `for` and `if` clauses.
    fn parse_comp_specs(&mut self) -> Vec<CompSpec> {
        let mut specs = Vec::new();
        loop {
            match self.peek() {
                Some(Token::For) => {
                    let start = self.bump().start;
                    let Some(Token::Id(variable)) = self.peek() else {
                        let msg = format!("expected identifier after `for`, found {}", self.found());
                        let span = self.current_span();
                        self.error(msg, span);
                        break;
                    };
                    self.pos += 1;
                    self.expect(Token::In, "in comprehension");
                    let expr = self.parse_expr();
                    specs.push(CompSpec::For {
                        variable: variable.clone(),
                        span: Span::new(start, expr.span().end),
                        expr,
                    });
                }
                Some(Token::If) if !specs.is_empty() => {
                    let start = self.bump().start;
                    let cond = self.parse_expr();
                    specs.push(CompSpec::If {
                        span: Span::new(start, cond.span().end),
                        cond,
                    });
                }
                _ => break,
            }
        }
        specs
    }

    fn at_member_start(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::Id(_) | Token::Str(_) | Token::LBracket | Token::Local | Token::Assert)
        )
    }

    fn parse_object(&mut self) -> Node {
        let start = self.bump().start;
        let mut fields: Vec<ObjectField> = Vec::new();
        let mut locals = Vec::new();
        let mut asserts = Vec::new();

        while !self.eof() && !self.at(&Token::RBrace) {
            match self.peek() {
                Some(Token::Local) => {
                    self.pos += 1;
                    match self.parse_bind() {
                        Some(bind) => locals.push(bind),
                        None => self.synchronize(&[Token::Comma, Token::RBrace]),
                    }
                }
                Some(Token::Assert) => {
                    let assert_start = self.bump().start;
                    let cond = self.parse_expr();
                    let message = if self.eat(&Token::Colon).is_some() {
                        Some(self.parse_expr())
                    } else {
                        None
                    };
                    let end = message.as_ref().unwrap_or(&cond).span().end;
                    asserts.push(ObjectAssert {
                        cond,
                        message,
                        span: Span::new(assert_start, end),
                    });
                }
                _ => {
                    if let Some(field) = self.parse_field() {
                        if self.at(&Token::For) {
                            if fields.is_empty() && asserts.is_empty() {
                                if let FieldName::Computed(name) = field.name {
                                    return self.parse_object_comp(
                                        start,
                                        *name,
                                        field.body,
                                        field.visibility,
                                        field.name_span,
                                        locals,
                                    );
                                }
                            }
                            let span = self.current_span();
                            self.error("object comprehension needs exactly one computed field", span);
                            self.parse_comp_specs();
                        }
                        fields.push(field);
                    }
                }
            }

            if self.eat(&Token::Comma).is_some() {
                continue;
            }
            if self.at(&Token::RBrace) || self.eof() {
                break;
            }
            let msg = format!("expected `,` or `}}` in object, found {}", self.found());
            let span = self.current_span();
            self.error(msg, span);
            if self.at_member_start() {
                continue;
            }
            self.synchronize(&[Token::Comma, Token::RBrace]);
            if self.eat(&Token::Comma).is_none() {
                break;
            }
        }

        let close = self.expect(Token::RBrace, "to close object");
        Node::Object(Object {
            fields,
            locals,
            asserts,
            span: Span::new(start, self.close_end(close)),
        })
    }

    fn parse_field(&mut self) -> Option<ObjectField> {
        let mut name_span = self.current_span();
        let name = match self.peek() {
            Some(Token::Id(id)) => {
                self.pos += 1;
                FieldName::Id(id.clone())
            }
            Some(Token::Str(s)) => {
                self.pos += 1;
                FieldName::Str(s.clone())
            }
            Some(Token::LBracket) => {
                self.pos += 1;
                let expr = self.parse_expr();
                let close = self.expect(Token::RBracket, "after computed field name");
                name_span = Span::new(name_span.start, self.close_end(close));
                FieldName::Computed(Box::new(expr))
            }
            _ => {
                let msg = format!("expected field name, found {}", self.found());
                let span = self.current_span();
                self.error(msg, span);
                self.synchronize(&[Token::Comma, Token::RBrace]);
                return None;
            }
        };

        let params = if self.eat(&Token::LParen).is_some() {
            Some(self.parse_params())
        } else {
            None
        };

        let (visibility, plus) = match self.peek() {
            Some(Token::Colon) => (Visibility::Inherit, false),
            Some(Token::DoubleColon) => (Visibility::Hidden, false),
            Some(Token::TripleColon) => (Visibility::Visible, false),
            Some(Token::PlusColon) => (Visibility::Inherit, true),
            Some(Token::PlusDoubleColon) => (Visibility::Hidden, true),
            Some(Token::PlusTripleColon) => (Visibility::Visible, true),
            _ => {
                let msg = format!("expected `:` after field name, found {}", self.found());
                let span = self.current_span();
                self.error(msg, span);
                return Some(ObjectField {
                    name,
                    visibility: Visibility::Inherit,
                    plus: false,
                    body: self.partial(),
                    span: name_span,
                    name_span,
                });
            }
        };
        self.pos += 1;

        let body = self.parse_expr();
        let body = match params {
            Some(params) => Node::Function(Function {
                params,
                span: Span::new(name_span.start, body.span().end),
                body: Box::new(body),
            }),
            None => body,
        };
        Some(ObjectField {
            name,
            visibility,
            plus,
            span: Span::new(name_span.start, body.span().end),
            body,
            name_span,
        })
    }

    fn parse_object_comp(
        &mut self,
        start: Position,
        name: Node,
        body: Node,
        visibility: Visibility,
        name_span: Span,
        locals: Vec<LocalBind>,
    ) -> Node {
        let specs = self.parse_comp_specs();
        let close = self.expect(Token::RBrace, "to close object comprehension");
        Node::ObjectComp(ObjectComp {
            name: Box::new(name),
            body: Box::new(body),
            visibility,
            locals,
            specs,
            name_span,
            span: Span::new(start, self.close_end(close)),
        })
    }
}
