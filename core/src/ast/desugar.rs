//! Rewrites the parsed tree into its canonical shape.
//!
//! - objects become `DesugaredObject`s with string-keyed fields, each field
//!   body wrapped in one `Local` that carries the object's locals
//! - array comprehensions become nested `std.flatMap` calls
//! - object comprehensions become `std.$objectFlatMerge` over an array
//!   comprehension of single-field objects
//! - slices become `std.slice` calls
//!
//! Every source span is preserved; synthesised nodes reuse the span of the
//! construct they replace.

use thiserror::Error;

use crate::{ast::*, token::Span};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DesugarError {
    #[error("duplicate field {name:?} at {span}")]
    DuplicateField { name: String, span: Span },
    #[error("field name must be a string, found {found} at {span}")]
    NonStringFieldName { found: &'static str, span: Span },
}

impl DesugarError {
    pub fn span(&self) -> Span {
        match self {
            DesugarError::DuplicateField { span, .. } | DesugarError::NonStringFieldName { span, .. } => *span,
        }
    }
}

/// Desugars `node`, consuming it.
pub fn desugar(node: Node) -> Result<Node, DesugarError> {
    Desugarer::default().expr(node)
}

#[derive(Default)]
struct Desugarer {
    next_object: u32,
}

fn boxed(node: Node) -> Box<Node> {
    Box::new(node)
}

fn std_member(name: &str, span: Span) -> Node {
    let at = Span::single(span.start);
    Node::Index(Index {
        target: boxed(Node::var(HIDDEN_STD, at)),
        key: IndexKey::Id(name.to_string()),
        span: at,
    })
}

fn std_call(name: &str, args: Vec<Node>, span: Span) -> Node {
    Node::Apply(Apply {
        target: boxed(std_member(name, span)),
        args,
        named: Vec::new(),
        tailstrict: false,
        span,
    })
}

fn null_at(pos: Span) -> Node {
    Node::Literal(Literal {
        value: LiteralValue::Null,
        span: pos,
    })
}

impl Desugarer {
    fn expr(&mut self, node: Node) -> Result<Node, DesugarError> {
        let node = match node {
            Node::Literal(_)
            | Node::Var(_)
            | Node::Import(_)
            | Node::SelfRef(_)
            | Node::Dollar(_)
            | Node::Partial(_)
            | Node::DesugaredObject(_) => node,
            Node::Local(local) => Node::Local(Local {
                binds: self.binds(local.binds)?,
                body: boxed(self.expr(*local.body)?),
                span: local.span,
            }),
            Node::Function(f) => Node::Function(Function {
                params: self.params(f.params)?,
                body: boxed(self.expr(*f.body)?),
                span: f.span,
            }),
            Node::Apply(apply) => {
                let target = self.expr(*apply.target)?;
                let args = apply
                    .args
                    .into_iter()
                    .map(|a| self.expr(a))
                    .collect::<Result<Vec<_>, _>>()?;
                let mut named = Vec::with_capacity(apply.named.len());
                for arg in apply.named {
                    named.push(NamedArg {
                        name: arg.name,
                        value: self.expr(arg.value)?,
                    });
                }
                Node::Apply(Apply {
                    target: boxed(target),
                    args,
                    named,
                    tailstrict: apply.tailstrict,
                    span: apply.span,
                })
            }
            Node::Index(index) => Node::Index(Index {
                target: boxed(self.expr(*index.target)?),
                key: self.key(index.key)?,
                span: index.span,
            }),
            Node::Slice(slice) => {
                let end_pos = Span::single(slice.span.end);
                let mut args = vec![self.expr(*slice.target)?];
                for part in [slice.begin, slice.end, slice.step] {
                    args.push(match part {
                        Some(e) => self.expr(*e)?,
                        None => null_at(end_pos),
                    });
                }
                std_call("slice", args, slice.span)
            }
            Node::Array(array) => Node::Array(Array {
                elements: array
                    .elements
                    .into_iter()
                    .map(|e| self.expr(e))
                    .collect::<Result<Vec<_>, _>>()?,
                span: array.span,
            }),
            Node::ArrayComp(comp) => self.comprehension(*comp.body, comp.specs, comp.span)?,
            Node::Object(object) => self.object(object)?,
            Node::ObjectComp(comp) => self.object_comp(comp)?,
            Node::Binary(b) => Node::Binary(Binary {
                op: b.op,
                left: boxed(self.expr(*b.left)?),
                right: boxed(self.expr(*b.right)?),
                span: b.span,
            }),
            Node::Unary(u) => Node::Unary(Unary {
                op: u.op,
                expr: boxed(self.expr(*u.expr)?),
                span: u.span,
            }),
            Node::Conditional(c) => Node::Conditional(Conditional {
                cond: boxed(self.expr(*c.cond)?),
                then_branch: boxed(self.expr(*c.then_branch)?),
                else_branch: match c.else_branch {
                    Some(e) => Some(boxed(self.expr(*e)?)),
                    None => None,
                },
                span: c.span,
            }),
            Node::Error(e) => Node::Error(ErrorExpr {
                expr: boxed(self.expr(*e.expr)?),
                span: e.span,
            }),
            Node::Assert(a) => Node::Assert(Assert {
                cond: boxed(self.expr(*a.cond)?),
                message: match a.message {
                    Some(m) => Some(boxed(self.expr(*m)?)),
                    None => None,
                },
                rest: boxed(self.expr(*a.rest)?),
                span: a.span,
            }),
            Node::SuperIndex(s) => Node::SuperIndex(SuperIndex {
                key: self.key(s.key)?,
                span: s.span,
            }),
            Node::InSuper(s) => Node::InSuper(InSuper {
                expr: boxed(self.expr(*s.expr)?),
                span: s.span,
            }),
            Node::PartialIndex(p) => Node::PartialIndex(PartialIndex {
                target: boxed(self.expr(*p.target)?),
                span: p.span,
            }),
        };
        Ok(node)
    }

    fn key(&mut self, key: IndexKey) -> Result<IndexKey, DesugarError> {
        Ok(match key {
            IndexKey::Id(id) => IndexKey::Id(id),
            IndexKey::Expr(e) => IndexKey::Expr(boxed(self.expr(*e)?)),
        })
    }

    fn binds(&mut self, binds: Vec<LocalBind>) -> Result<Vec<LocalBind>, DesugarError> {
        binds
            .into_iter()
            .map(|b| {
                Ok(LocalBind {
                    variable: b.variable,
                    body: self.expr(b.body)?,
                    span: b.span,
                })
            })
            .collect()
    }

    fn params(&mut self, params: Parameters) -> Result<Parameters, DesugarError> {
        let mut optional = Vec::with_capacity(params.optional.len());
        for p in params.optional {
            optional.push(NamedParameter {
                name: p.name,
                default: self.expr(p.default)?,
                span: p.span,
            });
        }
        Ok(Parameters {
            required: params.required,
            optional,
        })
    }

    /// `[body for x in a if c]` => `std.flatMap(function(x) if c then [body] else [], a)`
    ///
    /// The synthesised functions span the whole comprehension so `x` is in
    /// scope in the body, which precedes the `for`.
    fn comprehension(&mut self, body: Node, specs: Vec<CompSpec>, span: Span) -> Result<Node, DesugarError> {
        let body = self.expr(body)?;
        let mut inner = Node::Array(Array {
            span: body.span(),
            elements: vec![body],
        });
        for spec in specs.into_iter().rev() {
            inner = match spec {
                CompSpec::If { cond, span: if_span } => Node::Conditional(Conditional {
                    cond: boxed(self.expr(cond)?),
                    then_branch: boxed(inner),
                    else_branch: Some(boxed(Node::Array(Array {
                        elements: Vec::new(),
                        span: Span::single(if_span.start),
                    }))),
                    span,
                }),
                CompSpec::For { variable, expr, .. } => {
                    let function = Node::Function(Function {
                        params: Parameters {
                            required: vec![variable],
                            optional: Vec::new(),
                        },
                        body: boxed(inner),
                        span,
                    });
                    std_call("flatMap", vec![function, self.expr(expr)?], span)
                }
            };
        }
        Ok(inner)
    }

    /// `{[k]: v for x in a}` => `std.$objectFlatMerge([{[k]: v} for x in a])`
    fn object_comp(&mut self, comp: ObjectComp) -> Result<Node, DesugarError> {
        let body = *comp.body;
        let field = ObjectField {
            name: FieldName::Computed(comp.name),
            visibility: comp.visibility,
            plus: false,
            span: Span::new(comp.name_span.start, body.span().end),
            body,
            name_span: comp.name_span,
        };
        let single = Node::Object(Object {
            fields: vec![field],
            locals: comp.locals,
            asserts: Vec::new(),
            span: comp.span,
        });
        let array = self.comprehension(single, comp.specs, comp.span)?;
        Ok(std_call("$objectFlatMerge", vec![array], comp.span))
    }

    fn object(&mut self, object: Object) -> Result<Node, DesugarError> {
        let id = ObjectId(self.next_object);
        self.next_object += 1;

        let locals = self.binds(object.locals)?;
        let wrap = |body: Node, span: Span| {
            Node::Local(Local {
                binds: locals.clone(),
                body: boxed(body),
                span,
            })
        };

        let mut fields: Vec<DesugaredField> = Vec::new();
        let mut computed = Vec::new();
        let mut field_locs = Vec::new();

        for field in object.fields {
            let name = match field.name {
                FieldName::Id(name) | FieldName::Str(name) => name,
                FieldName::Computed(expr) => match *expr {
                    Node::Literal(Literal {
                        value: LiteralValue::String(name),
                        ..
                    }) => name,
                    Node::Literal(Literal { value, .. }) => {
                        let found = match value {
                            LiteralValue::Number { .. } => "number",
                            LiteralValue::Bool(_) => "boolean",
                            _ => "null",
                        };
                        return Err(DesugarError::NonStringFieldName {
                            found,
                            span: field.name_span,
                        });
                    }
                    expr => {
                        let name = self.expr(expr)?;
                        let body = self.expr(field.body)?;
                        let body_span = body.span();
                        field_locs.push((FieldKey::Computed(computed.len()), field.name_span));
                        computed.push(ComputedField {
                            name,
                            visibility: field.visibility,
                            plus: field.plus,
                            body: wrap(body, body_span),
                            span: field.span,
                        });
                        continue;
                    }
                },
            };

            if fields.iter().any(|f| f.name == name) {
                return Err(DesugarError::DuplicateField {
                    name,
                    span: field.name_span,
                });
            }
            let body = self.expr(field.body)?;
            let body_span = body.span();
            field_locs.push((FieldKey::Name(name.clone()), field.name_span));
            fields.push(DesugaredField {
                name,
                visibility: field.visibility,
                plus: field.plus,
                body: wrap(body, body_span),
                span: field.span,
            });
        }

        let mut asserts = Vec::with_capacity(object.asserts.len());
        for assert in object.asserts {
            let cond = self.expr(assert.cond)?;
            let message = match assert.message {
                Some(m) => self.expr(m)?,
                None => Node::string("Object assertion failed", Span::single(assert.span.end)),
            };
            let check = Node::Conditional(Conditional {
                then_branch: boxed(null_at(Span::single(cond.span().start))),
                cond: boxed(cond),
                else_branch: Some(boxed(Node::Error(ErrorExpr {
                    span: message.span(),
                    expr: boxed(message),
                }))),
                span: assert.span,
            });
            asserts.push(wrap(check, assert.span));
        }

        Ok(Node::DesugaredObject(DesugaredObject {
            id,
            locals,
            fields,
            computed,
            asserts,
            field_locs,
            span: object.span,
        }))
    }
}
