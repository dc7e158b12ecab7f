#[cfg(test)]
mod tests {
    use crate::{
        analysis::*,
        ast::{DesugaredObject, Node},
        token::{Position, Span},
    };

    fn tree(text: &str) -> Node {
        let analysis = analyze("file.jsonnet", text);
        assert!(analysis.diagnostics.is_empty(), "{:?}", analysis.diagnostics);
        analysis.tree.expect("tree")
    }

    fn object(node: &Node) -> &DesugaredObject {
        match node {
            Node::DesugaredObject(obj) => obj,
            other => panic!("expected object, got {:?}", other),
        }
    }

    #[test]
    fn mapper_lookup_follows_added_fields() {
        let node = tree("{a: {b: 'c'}}");
        let outer = object(&node);
        let mut mapper = ObjectMapper::new();
        mapper.add(outer, "a").unwrap();
        assert_eq!(mapper.lookup(outer, &["a"]).unwrap(), Span::from_coords(1, 2, 1, 3));

        // nested field not added yet
        assert!(matches!(
            mapper.lookup(outer, &["a", "b"]),
            Err(ResolveError::FieldNotFound { .. })
        ));

        let nested = object(field_value(&outer.fields[0]).unwrap());
        mapper.add(nested, "b").unwrap();
        assert_eq!(mapper.lookup(outer, &["a", "b"]).unwrap(), Span::from_coords(1, 6, 1, 7));
        assert_eq!(mapper.len(), 2);
    }

    #[test]
    fn mapper_distinguishes_absent_from_not_indexable() {
        let node = tree("{a: 1, b: {c: 2}}");
        let obj = object(&node);
        let mut mapper = ObjectMapper::new();
        mapper.index(obj);
        assert_eq!(mapper.len(), 3);

        assert_eq!(
            mapper.lookup(obj, &["x"]),
            Err(ResolveError::FieldNotFound { name: "x".into() })
        );
        assert_eq!(
            mapper.lookup(obj, &["a", "x"]),
            Err(ResolveError::NotIndexable { name: "a".into() })
        );
        assert_eq!(
            mapper.lookup(obj, &["b", "x"]),
            Err(ResolveError::FieldNotFound { name: "x".into() })
        );
        assert_eq!(mapper.lookup(obj, &[]), Err(ResolveError::EmptyPath));
        assert!(mapper.add(obj, "missing").is_err());
    }

    #[test]
    fn field_value_checks_wrapper_depth() {
        let node = tree("{a: 1}");
        let obj = object(&node);
        let mut field = obj.fields[0].clone();
        assert!(matches!(field_value(&field), Ok(Node::Literal(_))));

        let Node::Local(wrapper) = field.body.clone() else {
            panic!("missing wrapper");
        };
        let mut doubled = wrapper.clone();
        doubled.body = Box::new(Node::Local(wrapper.clone()));
        field.body = Node::Local(doubled);
        assert_eq!(
            field_value(&field),
            Err(ResolveError::ExtraScopeWrapper { field: "a".into() })
        );

        field.body = *wrapper.body;
        assert_eq!(
            field_value(&field),
            Err(ResolveError::MissingScopeWrapper { field: "a".into() })
        );
    }

    #[test]
    fn computed_names_are_unsupported() {
        let node = tree("local k = 'x'; {[k]: 'a'}");
        let Node::Local(local) = &node else {
            panic!("expected local");
        };
        let obj = object(&local.body);
        assert_eq!(obj.computed.len(), 1);
        assert_eq!(field_name_at(obj, Position::new(1, 18)), Err(LocateError::Unsupported));
        assert!(matches!(
            field_name_at(obj, Position::new(1, 23)),
            Err(LocateError::NotInField { .. })
        ));
    }

    #[test]
    fn path_to_location_cases() {
        struct Case {
            source: &'static str,
            pos: Position,
            path: &'static [&'static str],
            span: Span,
        }
        let cases = [
            // field name
            Case {
                source: "{a:'a'}",
                pos: Position::new(1, 2),
                path: &["a"],
                span: Span::from_coords(1, 2, 1, 3),
            },
            // field body
            Case {
                source: "{a:'a'}",
                pos: Position::new(1, 5),
                path: &["a"],
                span: Span::from_coords(1, 2, 1, 3),
            },
            // body is an object
            Case {
                source: "{a:{b:'b'}}",
                pos: Position::new(1, 5),
                path: &["a", "b"],
                span: Span::from_coords(1, 5, 1, 6),
            },
            // string name
            Case {
                source: "{'a': 'a'}",
                pos: Position::new(1, 3),
                path: &["a"],
                span: Span::from_coords(1, 2, 1, 5),
            },
            // method parameter
            Case {
                source: "{id(y): y}",
                pos: Position::new(1, 5),
                path: &["id"],
                span: Span::from_coords(1, 5, 1, 6),
            },
        ];

        for case in cases {
            let node = tree(case.source);
            let source = Source::new(case.source);
            let found = path_to_location(object(&node), &source, case.pos)
                .unwrap_or_else(|err| panic!("{}: {}", case.source, err));
            let path: Vec<&str> = found.path.iter().map(String::as_str).collect();
            assert_eq!(path, case.path, "{}", case.source);
            assert_eq!(found.span, case.span, "{}", case.source);
        }
    }

    #[test]
    fn path_to_location_reports_parameter_and_errors() {
        let text = "{id(y): y}";
        let node = tree(text);
        let source = Source::new(text);
        let found = path_to_location(object(&node), &source, Position::new(1, 5)).unwrap();
        assert_eq!(found.required.as_deref(), Some("y"));

        let text = "local a = 1; {[a]: 'a'}";
        let node = analyze("file.jsonnet", text).tree.unwrap();
        let Node::Local(local) = &node else {
            panic!("expected local");
        };
        let source = Source::new(text);
        assert_eq!(
            path_to_location(object(&local.body), &source, Position::new(1, 16)),
            Err(LocateError::Unsupported)
        );
    }
}
