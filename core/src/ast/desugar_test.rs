#[cfg(test)]
mod tests {
    use crate::{ast::*, token::Span};

    fn desugared(text: &str) -> Node {
        let out = parse("test.jsonnet", text);
        assert!(out.diagnostics.is_empty(), "unexpected diagnostics: {:?}", out.diagnostics);
        desugar(out.node).expect("desugar failed")
    }

    fn as_object(node: &Node) -> &DesugaredObject {
        match node {
            Node::DesugaredObject(obj) => obj,
            other => panic!("expected desugared object, got {:?}", other),
        }
    }

    fn assert_canonical(node: &Node) {
        node.walk(&mut |n| {
            assert!(
                !matches!(n, Node::Object(_) | Node::ObjectComp(_) | Node::ArrayComp(_) | Node::Slice(_)),
                "surface node survived desugaring: {:?}",
                n
            );
        });
    }

    #[test]
    fn fields_are_string_keyed_and_wrapped() {
        let node = desugared("{ local x = 1, a: x, 'b': 2, ['c']: 3 }");
        let obj = as_object(&node);
        let names: Vec<_> = obj.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(obj.computed.is_empty());
        for field in &obj.fields {
            let Node::Local(wrapper) = &field.body else {
                panic!("field {} is not wrapped: {:?}", field.name, field.body);
            };
            assert_eq!(wrapper.binds.len(), 1);
            assert_eq!(wrapper.binds[0].variable, "x");
            assert!(!matches!(wrapper.body.as_ref(), Node::Local(_)));
        }
        assert_eq!(obj.locals.len(), 1);
    }

    #[test]
    fn objects_without_locals_still_get_one_wrapper() {
        let node = desugared("{a: {b: 'c'}}");
        let outer = as_object(&node);
        let Node::Local(wrapper) = &outer.fields[0].body else {
            panic!("missing wrapper");
        };
        assert!(wrapper.binds.is_empty());
        let inner = as_object(&wrapper.body);
        assert_eq!(inner.fields[0].name, "b");
        assert_ne!(inner.id, outer.id);
    }

    #[test]
    fn field_locations_are_recorded() {
        let node = desugared("{a: 1, 'b': 2}");
        let obj = as_object(&node);
        assert_eq!(obj.field_loc("a"), Some(Span::from_coords(1, 2, 1, 3)));
        assert_eq!(obj.field_loc("b"), Some(Span::from_coords(1, 8, 1, 11)));
        assert_eq!(obj.field_loc("c"), None);
    }

    #[test]
    fn computed_names_are_kept_apart() {
        let node = desugared("local k = 'x'; {[k]: 1, a: 2}");
        let Node::Local(local) = &node else {
            panic!("expected local");
        };
        let obj = as_object(&local.body);
        assert_eq!(obj.fields.len(), 1);
        assert_eq!(obj.computed.len(), 1);
        assert!(matches!(&obj.computed[0].name, Node::Var(v) if v.id == "k"));
        assert_eq!(obj.field_locs[0], (FieldKey::Computed(0), Span::from_coords(1, 17, 1, 20)));
    }

    #[test]
    fn non_string_literal_names_are_errors() {
        let out = parse("test.jsonnet", "{[1]: 1}");
        let err = desugar(out.node).unwrap_err();
        assert!(matches!(err, DesugarError::NonStringFieldName { found: "number", .. }));
        assert_eq!(err.span(), Span::from_coords(1, 2, 1, 5));
    }

    #[test]
    fn duplicate_fields_are_errors() {
        let out = parse("test.jsonnet", "{a: 1, 'a': 2}");
        let err = desugar(out.node).unwrap_err();
        assert_eq!(
            err,
            DesugarError::DuplicateField {
                name: "a".to_string(),
                span: Span::from_coords(1, 8, 1, 11),
            }
        );
    }

    #[test]
    fn comprehensions_become_flat_map() {
        let node = desugared("[x + 1 for x in [1, 2] if x > 1]");
        assert_canonical(&node);
        let Node::Apply(apply) = &node else {
            panic!("expected apply, got {:?}", node);
        };
        assert!(matches!(apply.target.as_ref(), Node::Index(i) if i.key == IndexKey::Id("flatMap".to_string())));
        let Node::Function(f) = &apply.args[0] else {
            panic!("expected function, got {:?}", apply.args[0]);
        };
        assert_eq!(f.params.required, vec!["x".to_string()]);
        assert!(matches!(f.body.as_ref(), Node::Conditional(_)));
        assert_eq!(f.span, node.span());
    }

    #[test]
    fn object_comprehension_and_slice() {
        let node = desugared("{[k]: k for k in ['a']}");
        assert_canonical(&node);
        assert!(matches!(&node, Node::Apply(a) if matches!(a.target.as_ref(),
            Node::Index(i) if i.key == IndexKey::Id("$objectFlatMerge".to_string()))));

        let node = desugared("local a = [1, 2, 3]; a[1:]");
        assert_canonical(&node);
        let Node::Local(local) = &node else {
            panic!("expected local");
        };
        let Node::Apply(apply) = local.body.as_ref() else {
            panic!("expected std.slice call");
        };
        assert_eq!(apply.args.len(), 4);
        assert!(matches!(&apply.args[2], Node::Literal(l) if l.value == LiteralValue::Null));
    }

    #[test]
    fn partial_nodes_survive() {
        let out = parse("test.jsonnet", "local o={a: 9}; o.");
        let node = desugar(out.node).expect("desugar failed");
        let Node::Local(local) = &node else {
            panic!("expected local");
        };
        assert!(matches!(local.body.as_ref(), Node::PartialIndex(_)));
        assert!(matches!(&local.binds[0].body, Node::DesugaredObject(_)));
    }

    #[test]
    fn describes_nodes() {
        let node = desugared("{a: 1, b:: 'x', f(x, y=1): x}");
        let obj = as_object(&node);
        assert_eq!(describe(&node), "(object) {\n  (field) a:,\n  (field) b::,\n  (field) f:,\n}");
        assert_eq!(describe(obj.fields[0].body.unwrap_scope()), "(number) 1");
        assert_eq!(describe(obj.fields[1].body.unwrap_scope()), "(string) \"x\"");
        assert_eq!(describe(obj.fields[2].body.unwrap_scope()), "function(x, y=1)");
    }
}
