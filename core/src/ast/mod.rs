//! Jsonnet syntax tree.
//!
//! One enum covers both the tree the parser produces and the canonical tree
//! the desugarer returns. `Object`, `ObjectComp`, `ArrayComp` and `Slice` only
//! appear before desugaring; `DesugaredObject` only appears after.

use std::fmt;

use crate::token::Span;

mod desugar;
mod describe;
mod parser;

#[cfg(test)]
mod desugar_test;

pub use desugar::{desugar, DesugarError};
pub use describe::{describe, describe_field, describe_params};
pub use parser::{parse, parse_file, ParseOutput, Parser, MAX_NESTING};

pub type Ident = String;

/// The name the standard library is bound to in every scope.
pub const STD: &str = "std";

/// Standard library reference used by desugared constructs. Not nameable
/// from source, so it never shows up in scopes or highlights.
pub const HIDDEN_STD: &str = "$std";

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Literal(Literal),
    Var(Var),
    Local(Local),
    Function(Function),
    Apply(Apply),
    Index(Index),
    Slice(Slice),
    Import(Import),
    Array(Array),
    ArrayComp(ArrayComp),
    Object(Object),
    ObjectComp(ObjectComp),
    DesugaredObject(DesugaredObject),
    Binary(Binary),
    Unary(Unary),
    Conditional(Conditional),
    Error(ErrorExpr),
    Assert(Assert),
    SelfRef(Span),
    Dollar(Span),
    SuperIndex(SuperIndex),
    InSuper(InSuper),
    /// Stand-in for an expression the parser expected but did not find.
    Partial(Partial),
    /// `target.` with nothing after the dot yet.
    PartialIndex(PartialIndex),
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    String(String),
    Number { value: f64, original: String },
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    pub value: LiteralValue,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Var {
    pub id: Ident,
    pub span: Span,
}

/// `variable = body`. For `f(x) = e` the body is a `Function` whose span
/// starts at the variable.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalBind {
    pub variable: Ident,
    pub body: Node,
    /// From the start of the variable to the end of the body.
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Local {
    pub binds: Vec<LocalBind>,
    pub body: Box<Node>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedParameter {
    pub name: Ident,
    pub default: Node,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Parameters {
    /// Required parameter spans are not stored; see `analysis::derive`.
    pub required: Vec<Ident>,
    pub optional: Vec<NamedParameter>,
}

impl Parameters {
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.required
            .iter()
            .map(String::as_str)
            .chain(self.optional.iter().map(|p| p.name.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub params: Parameters,
    pub body: Box<Node>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedArg {
    pub name: Ident,
    pub value: Node,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Apply {
    pub target: Box<Node>,
    pub args: Vec<Node>,
    pub named: Vec<NamedArg>,
    pub tailstrict: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndexKey {
    /// `target.id`; the identifier's own span is derived on demand.
    Id(Ident),
    Expr(Box<Node>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Index {
    pub target: Box<Node>,
    pub key: IndexKey,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Slice {
    pub target: Box<Node>,
    pub begin: Option<Box<Node>>,
    pub end: Option<Box<Node>>,
    pub step: Option<Box<Node>>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    Code,
    Str,
    Bin,
}

impl ImportKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            ImportKind::Code => "import",
            ImportKind::Str => "importstr",
            ImportKind::Bin => "importbin",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub kind: ImportKind,
    pub file: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    pub elements: Vec<Node>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CompSpec {
    For { variable: Ident, expr: Node, span: Span },
    If { cond: Node, span: Span },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayComp {
    pub body: Box<Node>,
    pub specs: Vec<CompSpec>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Inherit,
    Hidden,
    Visible,
}

impl Visibility {
    pub fn token(&self, plus: bool) -> &'static str {
        match (self, plus) {
            (Visibility::Inherit, false) => ":",
            (Visibility::Hidden, false) => "::",
            (Visibility::Visible, false) => ":::",
            (Visibility::Inherit, true) => "+:",
            (Visibility::Hidden, true) => "+::",
            (Visibility::Visible, true) => "+:::",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldName {
    Id(Ident),
    Str(String),
    Computed(Box<Node>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectField {
    pub name: FieldName,
    pub visibility: Visibility,
    pub plus: bool,
    /// Method fields `f(x): e` carry a `Function` body.
    pub body: Node,
    pub name_span: Span,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectAssert {
    pub cond: Node,
    pub message: Option<Node>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    pub fields: Vec<ObjectField>,
    pub locals: Vec<LocalBind>,
    pub asserts: Vec<ObjectAssert>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectComp {
    pub name: Box<Node>,
    pub body: Box<Node>,
    pub visibility: Visibility,
    pub locals: Vec<LocalBind>,
    pub specs: Vec<CompSpec>,
    pub name_span: Span,
    pub span: Span,
}

/// Identity of a desugared object within one tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

/// Key of a `field_locs` entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldKey {
    Name(String),
    /// Index into `DesugaredObject::computed`.
    Computed(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DesugaredField {
    pub name: String,
    pub visibility: Visibility,
    pub plus: bool,
    /// Always a `Local` carrying the object's locals.
    pub body: Node,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComputedField {
    pub name: Node,
    pub visibility: Visibility,
    pub plus: bool,
    pub body: Node,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DesugaredObject {
    pub id: ObjectId,
    /// The object's locals as written; every field body also carries a copy.
    pub locals: Vec<LocalBind>,
    pub fields: Vec<DesugaredField>,
    pub computed: Vec<ComputedField>,
    pub asserts: Vec<Node>,
    /// Field name spans in source order.
    pub field_locs: Vec<(FieldKey, Span)>,
    pub span: Span,
}

impl DesugaredObject {
    pub fn field(&self, name: &str) -> Option<&DesugaredField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_loc(&self, name: &str) -> Option<Span> {
        self.field_locs.iter().find_map(|(key, span)| match key {
            FieldKey::Name(n) if n == name => Some(*span),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Mul,
    Div,
    Mod,
    Add,
    Sub,
    Shl,
    Shr,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    Eq,
    Ne,
    BitAnd,
    BitXor,
    BitOr,
    And,
    Or,
}

impl BinaryOp {
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 1,
            BinaryOp::Add | BinaryOp::Sub => 2,
            BinaryOp::Shl | BinaryOp::Shr => 3,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge | BinaryOp::In => 4,
            BinaryOp::Eq | BinaryOp::Ne => 5,
            BinaryOp::BitAnd => 6,
            BinaryOp::BitXor => 7,
            BinaryOp::BitOr => 8,
            BinaryOp::And => 9,
            BinaryOp::Or => 10,
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::In => "in",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitXor => "^",
            BinaryOp::BitOr => "|",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    BitNot,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Binary {
    pub op: BinaryOp,
    pub left: Box<Node>,
    pub right: Box<Node>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Unary {
    pub op: UnaryOp,
    pub expr: Box<Node>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Conditional {
    pub cond: Box<Node>,
    pub then_branch: Box<Node>,
    pub else_branch: Option<Box<Node>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ErrorExpr {
    pub expr: Box<Node>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assert {
    pub cond: Box<Node>,
    pub message: Option<Box<Node>>,
    pub rest: Box<Node>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SuperIndex {
    pub key: IndexKey,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InSuper {
    pub expr: Box<Node>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Partial {
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PartialIndex {
    pub target: Box<Node>,
    pub span: Span,
}

impl Node {
    pub fn span(&self) -> Span {
        match self {
            Node::Literal(n) => n.span,
            Node::Var(n) => n.span,
            Node::Local(n) => n.span,
            Node::Function(n) => n.span,
            Node::Apply(n) => n.span,
            Node::Index(n) => n.span,
            Node::Slice(n) => n.span,
            Node::Import(n) => n.span,
            Node::Array(n) => n.span,
            Node::ArrayComp(n) => n.span,
            Node::Object(n) => n.span,
            Node::ObjectComp(n) => n.span,
            Node::DesugaredObject(n) => n.span,
            Node::Binary(n) => n.span,
            Node::Unary(n) => n.span,
            Node::Conditional(n) => n.span,
            Node::Error(n) => n.span,
            Node::Assert(n) => n.span,
            Node::SelfRef(span) | Node::Dollar(span) => *span,
            Node::SuperIndex(n) => n.span,
            Node::InSuper(n) => n.span,
            Node::Partial(n) => n.span,
            Node::PartialIndex(n) => n.span,
        }
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, Node::Partial(_) | Node::PartialIndex(_))
    }

    pub fn string(value: impl Into<String>, span: Span) -> Node {
        Node::Literal(Literal {
            value: LiteralValue::String(value.into()),
            span,
        })
    }

    pub fn var(id: impl Into<String>, span: Span) -> Node {
        Node::Var(Var { id: id.into(), span })
    }

    /// Direct children in source order.
    pub fn children(&self) -> Vec<&Node> {
        let mut out: Vec<&Node> = Vec::new();
        match self {
            Node::Literal(_)
            | Node::Var(_)
            | Node::Import(_)
            | Node::SelfRef(_)
            | Node::Dollar(_)
            | Node::Partial(_) => {}
            Node::Local(n) => {
                out.extend(n.binds.iter().map(|b| &b.body));
                out.push(&n.body);
            }
            Node::Function(n) => {
                out.extend(n.params.optional.iter().map(|p| &p.default));
                out.push(&n.body);
            }
            Node::Apply(n) => {
                out.push(&n.target);
                out.extend(n.args.iter());
                out.extend(n.named.iter().map(|a| &a.value));
            }
            Node::Index(n) => {
                out.push(&n.target);
                if let IndexKey::Expr(e) = &n.key {
                    out.push(e);
                }
            }
            Node::Slice(n) => {
                out.push(&n.target);
                out.extend(n.begin.as_deref());
                out.extend(n.end.as_deref());
                out.extend(n.step.as_deref());
            }
            Node::Array(n) => out.extend(n.elements.iter()),
            Node::ArrayComp(n) => {
                out.push(&n.body);
                for spec in &n.specs {
                    match spec {
                        CompSpec::For { expr, .. } => out.push(expr),
                        CompSpec::If { cond, .. } => out.push(cond),
                    }
                }
            }
            Node::Object(n) => {
                out.extend(n.locals.iter().map(|b| &b.body));
                for field in &n.fields {
                    if let FieldName::Computed(e) = &field.name {
                        out.push(e);
                    }
                    out.push(&field.body);
                }
                for a in &n.asserts {
                    out.push(&a.cond);
                    out.extend(a.message.as_ref());
                }
            }
            Node::ObjectComp(n) => {
                out.extend(n.locals.iter().map(|b| &b.body));
                out.push(&n.name);
                out.push(&n.body);
                for spec in &n.specs {
                    match spec {
                        CompSpec::For { expr, .. } => out.push(expr),
                        CompSpec::If { cond, .. } => out.push(cond),
                    }
                }
            }
            Node::DesugaredObject(n) => {
                out.extend(n.locals.iter().map(|b| &b.body));
                out.extend(n.fields.iter().map(|f| &f.body));
                for c in &n.computed {
                    out.push(&c.name);
                    out.push(&c.body);
                }
                out.extend(n.asserts.iter());
            }
            Node::Binary(n) => {
                out.push(&n.left);
                out.push(&n.right);
            }
            Node::Unary(n) => out.push(&n.expr),
            Node::Conditional(n) => {
                out.push(&n.cond);
                out.push(&n.then_branch);
                out.extend(n.else_branch.as_deref());
            }
            Node::Error(n) => out.push(&n.expr),
            Node::Assert(n) => {
                out.push(&n.cond);
                out.extend(n.message.as_deref());
                out.push(&n.rest);
            }
            Node::SuperIndex(n) => {
                if let IndexKey::Expr(e) = &n.key {
                    out.push(e);
                }
            }
            Node::InSuper(n) => out.push(&n.expr),
            Node::PartialIndex(n) => out.push(&n.target),
        }
        out
    }

    /// Depth-first pre-order walk.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Node)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    /// Strips exactly one scope wrapper, as placed around every desugared
    /// field body.
    pub fn unwrap_scope(&self) -> &Node {
        match self {
            Node::Local(local) => &local.body,
            other => other,
        }
    }
}
