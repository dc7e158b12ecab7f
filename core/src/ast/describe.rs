use crate::ast::*;

/// Human-readable label for a node, shown in hover and completion details.
pub fn describe(node: &Node) -> String {
    match node {
        Node::Literal(lit) => match &lit.value {
            LiteralValue::String(s) => format!("(string) {:?}", s),
            LiteralValue::Number { original, .. } => format!("(number) {}", original),
            LiteralValue::Bool(b) => format!("(bool) {}", b),
            LiteralValue::Null => "(null)".to_string(),
        },
        Node::DesugaredObject(obj) => {
            let mut out = String::from("(object) {\n");
            for (key, _) in &obj.field_locs {
                let line = match key {
                    FieldKey::Name(name) => obj.field(name).map(|f| describe_field(&f.name, f.visibility, f.plus)),
                    FieldKey::Computed(i) => obj
                        .computed
                        .get(*i)
                        .map(|c| describe_field("[computed]", c.visibility, c.plus)),
                };
                if let Some(line) = line {
                    out.push_str("  ");
                    out.push_str(&line);
                    out.push_str(",\n");
                }
            }
            out.push('}');
            out
        }
        Node::Object(obj) => {
            let mut out = String::from("(object) {\n");
            for field in &obj.fields {
                let name = match &field.name {
                    FieldName::Id(name) | FieldName::Str(name) => name.as_str(),
                    FieldName::Computed(_) => "[computed]",
                };
                out.push_str("  ");
                out.push_str(&describe_field(name, field.visibility, field.plus));
                out.push_str(",\n");
            }
            out.push('}');
            out
        }
        Node::Function(f) => format!("function({})", describe_params(&f.params)),
        Node::Var(v) => format!("(variable) {}", v.id),
        Node::Import(i) => format!("({}) {:?}", i.kind.keyword(), i.file),
        Node::Array(a) => format!("(array) [{} items]", a.elements.len()),
        Node::ArrayComp(_) => "(array comprehension)".to_string(),
        Node::ObjectComp(_) => "(object comprehension)".to_string(),
        Node::Local(local) => describe(&local.body),
        Node::Apply(_) => "(apply)".to_string(),
        Node::Index(index) => match &index.key {
            IndexKey::Id(id) => format!("(index) .{}", id),
            IndexKey::Expr(_) => "(index)".to_string(),
        },
        Node::Slice(_) => "(slice)".to_string(),
        Node::Binary(b) => format!("(binary) {}", b.op),
        Node::Unary(_) => "(unary)".to_string(),
        Node::Conditional(_) => "(conditional)".to_string(),
        Node::Error(_) => "(error)".to_string(),
        Node::Assert(_) => "(assert)".to_string(),
        Node::SelfRef(_) => "(self)".to_string(),
        Node::Dollar(_) => "($)".to_string(),
        Node::SuperIndex(_) => "(super index)".to_string(),
        Node::InSuper(_) => "(in super)".to_string(),
        Node::Partial(_) => "(incomplete)".to_string(),
        Node::PartialIndex(_) => "(incomplete index)".to_string(),
    }
}

pub fn describe_field(name: &str, visibility: Visibility, plus: bool) -> String {
    format!("(field) {}{}", name, visibility.token(plus))
}

/// `x, y=1`
pub fn describe_params(params: &Parameters) -> String {
    let mut parts: Vec<String> = params.required.clone();
    for p in &params.optional {
        parts.push(format!("{}={}", p.name, short_value(&p.default)));
    }
    parts.join(", ")
}

fn short_value(node: &Node) -> String {
    match node {
        Node::Literal(lit) => match &lit.value {
            LiteralValue::String(s) => format!("{:?}", s),
            LiteralValue::Number { original, .. } => original.clone(),
            LiteralValue::Bool(b) => b.to_string(),
            LiteralValue::Null => "null".to_string(),
        },
        Node::Var(v) => v.id.clone(),
        _ => "...".to_string(),
    }
}
