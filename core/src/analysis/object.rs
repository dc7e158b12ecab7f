use tracing::error;

use crate::{
    analysis::{LocateError, ResolveError, Source},
    ast::{DesugaredField, DesugaredObject, FieldKey, Node, ObjectId},
    token::{Position, Span},
    util::FastHashMap,
};

/// Field name spans keyed by (object, field).
///
/// Entries exist only for fields that were added, so a miss means "not
/// indexed or not present".
#[derive(Debug, Default)]
pub struct ObjectMapper {
    locs: FastHashMap<(ObjectId, String), Span>,
}

/// Strips the one scope wrapper every desugared field body carries.
///
/// Zero wrappers, or a wrapper directly around an identical one, mean the
/// tree did not come out of the desugarer and are reported as such.
pub fn field_value(field: &DesugaredField) -> Result<&Node, ResolveError> {
    let Node::Local(wrapper) = &field.body else {
        return Err(ResolveError::MissingScopeWrapper {
            field: field.name.clone(),
        });
    };
    if let Node::Local(inner) = wrapper.body.as_ref() {
        if inner.span == wrapper.span && inner.binds == wrapper.binds {
            return Err(ResolveError::ExtraScopeWrapper {
                field: field.name.clone(),
            });
        }
    }
    Ok(&wrapper.body)
}

fn field_by_name<'a>(object: &'a DesugaredObject, name: &str) -> Result<&'a DesugaredField, ResolveError> {
    object.field(name).ok_or_else(|| ResolveError::FieldNotFound { name: name.to_string() })
}

impl ObjectMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, object: &DesugaredObject, name: &str) -> Result<(), ResolveError> {
        let span = object
            .field_loc(name)
            .ok_or_else(|| ResolveError::FieldNotFound { name: name.to_string() })?;
        self.locs.insert((object.id, name.to_string()), span);
        Ok(())
    }

    /// Adds every string-keyed field of `object` and of the objects nested in
    /// its field values.
    pub fn index(&mut self, object: &DesugaredObject) {
        for field in &object.fields {
            if let Some(span) = object.field_loc(&field.name) {
                self.locs.insert((object.id, field.name.clone()), span);
            }
            match field_value(field) {
                Ok(Node::DesugaredObject(nested)) => self.index(nested),
                Ok(_) => {}
                Err(err) => error!(defect = true, error = %err, "malformed desugared field"),
            }
        }
    }

    pub fn len(&self) -> usize {
        self.locs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locs.is_empty()
    }

    /// Span of the field name at the end of `path`.
    pub fn lookup(&self, object: &DesugaredObject, path: &[&str]) -> Result<Span, ResolveError> {
        self.lookup_field(object, path).map(|(_, span)| span)
    }

    /// The field at the end of `path` with its name span.
    pub fn lookup_field<'a>(
        &self,
        object: &'a DesugaredObject,
        path: &[&str],
    ) -> Result<(&'a DesugaredField, Span), ResolveError> {
        let (name, rest) = path.split_first().ok_or(ResolveError::EmptyPath)?;
        let span = self
            .locs
            .get(&(object.id, name.to_string()))
            .copied()
            .ok_or_else(|| ResolveError::FieldNotFound { name: name.to_string() })?;
        let field = field_by_name(object, name)?;
        if rest.is_empty() {
            return Ok((field, span));
        }

        match field_value(field)? {
            Node::DesugaredObject(nested) => self.lookup_field(nested, rest),
            _ => Err(ResolveError::NotIndexable { name: name.to_string() }),
        }
    }
}

/// Name and span of the field key under `pos`.
pub fn field_name_at(object: &DesugaredObject, pos: Position) -> Result<(&str, Span), LocateError> {
    for (key, span) in &object.field_locs {
        if !span.contains(pos) {
            continue;
        }
        return match key {
            FieldKey::Name(name) => Ok((name.as_str(), *span)),
            FieldKey::Computed(_) => Err(LocateError::Unsupported),
        };
    }
    Err(LocateError::NotInField { pos })
}

/// Where a position falls inside an object, as a path of field names.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectPath<'a> {
    pub path: Vec<String>,
    pub span: Span,
    pub body: Option<&'a Node>,
    /// Set when the position is on a method parameter.
    pub required: Option<String>,
}

/// Checks, in order, the field names, the parameters of method fields, and
/// the field bodies, recursing into nested objects.
pub fn path_to_location<'a>(
    object: &'a DesugaredObject,
    source: &Source<'_>,
    pos: Position,
) -> Result<ObjectPath<'a>, LocateError> {
    match field_name_at(object, pos) {
        Ok((name, span)) => {
            return Ok(ObjectPath {
                path: vec![name.to_string()],
                span,
                body: None,
                required: None,
            });
        }
        Err(LocateError::Unsupported) => return Err(LocateError::Unsupported),
        Err(_) => {}
    }

    for field in &object.fields {
        let Ok(value) = field_value(field) else {
            continue;
        };
        let name_span = object.field_loc(&field.name).ok_or_else(|| LocateError::Underivable {
            what: format!("field {}", field.name),
        })?;

        if let Node::Function(function) = value {
            let range = Span::new(name_span.start, function.body.span().end);
            if range.contains(pos) {
                let spans = source.required_param_spans(function)?;
                if let Some((span, id)) = spans
                    .into_iter()
                    .zip(&function.params.required)
                    .find(|(span, _)| span.contains(pos))
                {
                    return Ok(ObjectPath {
                        path: vec![field.name.clone()],
                        span,
                        body: Some(&field.body),
                        required: Some(id.clone()),
                    });
                }
            }
        }

        if !field.body.span().contains(pos) {
            continue;
        }
        if let Node::DesugaredObject(nested) = value {
            let mut found = path_to_location(nested, source, pos)?;
            found.path.insert(0, field.name.clone());
            return Ok(found);
        }
        return Ok(ObjectPath {
            path: vec![field.name.clone()],
            span: name_span,
            body: Some(&field.body),
            required: None,
        });
    }

    Err(LocateError::NotInField { pos })
}
