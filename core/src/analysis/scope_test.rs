#[cfg(test)]
mod tests {
    use crate::{
        analysis::*,
        ast::Node,
        token::{Position, Span},
    };

    fn tree(text: &str) -> Node {
        analyze("file.jsonnet", text).tree.expect("tree")
    }

    #[test]
    fn scope_keys_at_positions() {
        let cases: &[(&str, &str, Position, &[&str])] = &[
            ("valid local", "local a=\"a\";a", Position::new(1, 13), &["a", "std"]),
            ("local with no body", "local a=\"a\";\n", Position::new(2, 1), &["a", "std"]),
            (
                "local with an incomplete body",
                "local o={a:'b'};\nlocal y=o.\n",
                Position::new(2, 11),
                &["o", "std", "y"],
            ),
            ("object keys in invalid local", "local o={a:\"a\"};\n", Position::new(2, 1), &["o", "std"]),
            (
                "deep object",
                "local o={a:{b:{c:{d:\"e\"}}}};o.a.b.c.d.e",
                Position::new(1, 36),
                &["o", "std"],
            ),
            ("outside every binding", "1 + 2", Position::new(1, 3), &["std"]),
        ];

        for (name, text, pos, expected) in cases {
            let node = tree(text);
            let scope = resolve_scope(&node, &Source::new(text), *pos);
            assert_eq!(scope.keys(), *expected, "{}", name);
        }
    }

    #[test]
    fn object_scope_has_self_and_siblings() {
        let text = "{a: 1, b: self.a}";
        let node = tree(text);
        let scope = resolve_scope(&node, &Source::new(text), Position::new(1, 16));
        assert_eq!(scope.keys(), vec!["$", "a", "b", "self", "std", "super"]);
        assert_eq!(scope.get("a").unwrap().kind, EntryKind::Field);
        assert_eq!(scope.get("a").unwrap().decl, Some(Span::from_coords(1, 2, 1, 3)));
        assert_eq!(scope.get("super").unwrap().kind, EntryKind::Super);
    }

    #[test]
    fn dollar_is_the_outermost_object() {
        let text = "{a: {b: 1}}";
        let node = tree(text);
        let scope = resolve_scope(&node, &Source::new(text), Position::new(1, 10));
        assert_eq!(scope.keys(), vec!["$", "a", "b", "self", "std", "super"]);
        let dollar = scope.get("$").unwrap().node.unwrap();
        assert_eq!(dollar.span(), node.span());
        let this = scope.get("self").unwrap().node.unwrap();
        assert_ne!(this.span(), node.span());
    }

    #[test]
    fn function_parameters() {
        let text = "function(x, y=1) x";
        let node = tree(text);
        let scope = resolve_scope(&node, &Source::new(text), Position::new(1, 18));
        assert_eq!(scope.keys(), vec!["std", "x", "y"]);

        let x = scope.get("x").unwrap();
        assert_eq!(x.kind, EntryKind::Parameter);
        assert_eq!(x.detail, "(parameter) x");
        assert_eq!(x.node, None);
        assert_eq!(x.decl, Some(Span::from_coords(1, 10, 1, 11)));

        let y = scope.get("y").unwrap();
        assert_eq!(y.decl, Some(Span::from_coords(1, 13, 1, 14)));
        assert_eq!(y.detail, "(number) 1");
    }

    #[test]
    fn locals_are_visible_in_their_own_binds() {
        let text = "local f(n) = f(n); 1";
        let node = tree(text);
        let scope = resolve_scope(&node, &Source::new(text), Position::new(1, 14));
        assert!(scope.keys().contains(&"f"));
        assert!(scope.keys().contains(&"n"));
    }

    #[test]
    fn std_is_a_builtin() {
        let scope = Scope::default();
        assert_eq!(scope.keys(), vec!["std"]);
        let entry = scope.get("std").unwrap();
        assert_eq!(entry.kind, EntryKind::Builtin);
        assert_eq!(entry.detail, "(builtin) std");
        assert!(scope.get("invalid").is_none());
    }

    #[test]
    fn resolve_single_identifier() {
        let text = "local a=\"a\";a";
        let node = tree(text);
        let scope = resolve_scope(&node, &Source::new(text), Position::new(1, 13));
        let entry = scope.resolve(&["a"]).unwrap();
        assert_eq!(entry.decl, Some(Span::from_coords(1, 7, 1, 8)));
        assert_eq!(entry.node.unwrap().span(), Span::from_coords(1, 9, 1, 12));
        assert_eq!(entry.detail, "(string) \"a\"");
    }

    #[test]
    fn resolve_nested_path() {
        let text = "local o={a:{b:'c'}};\n";
        let node = tree(text);
        let scope = resolve_scope(&node, &Source::new(text), Position::new(2, 1));
        let entry = scope.resolve(&["o", "a", "b"]).unwrap();
        assert_eq!(entry.node.unwrap().span(), Span::from_coords(1, 15, 1, 18));
        assert_eq!(entry.decl, Some(Span::from_coords(1, 13, 1, 14)));
    }

    #[test]
    fn resolve_paths() {
        let text = "local o={data:{a::'a', b::{c::'a'}}, str::'str'};\n";
        let node = tree(text);
        let scope = resolve_scope(&node, &Source::new(text), Position::new(2, 1));

        assert_eq!(scope.resolve(&["o"]).unwrap().kind, EntryKind::Local);
        assert_eq!(
            scope.resolve(&["o", "data"]).unwrap().detail,
            "(object) {\n  (field) a::,\n  (field) b::,\n}"
        );
        assert_eq!(
            scope.resolve(&["o", "data", "b"]).unwrap().detail,
            "(object) {\n  (field) c::,\n}"
        );
        assert_eq!(
            scope.resolve(&["x"]),
            Err(ResolveError::UnresolvedIdentifier { name: "x".into() })
        );
        assert_eq!(
            scope.resolve(&["o", "x"]),
            Err(ResolveError::FieldNotFound { name: "x".into() })
        );
        assert_eq!(
            scope.resolve(&["o", "str", "x"]),
            Err(ResolveError::NotIndexable { name: "str".into() })
        );
        assert_eq!(
            scope.resolve(&["std", "length"]),
            Err(ResolveError::NotIndexable { name: "std".into() })
        );
        assert_eq!(scope.resolve(&[]), Err(ResolveError::EmptyPath));
    }

    #[test]
    fn resolve_looks_through_one_local() {
        let text = "local o = local x = 1; {a: x}; local p = local x = 1; local y = 2; {a: y}; [o.a, p.a]";
        let node = tree(text);
        let source = Source::new(text);
        let scope = resolve_scope(&node, &source, source.end());

        let entry = scope.resolve(&["o", "a"]).unwrap();
        assert_eq!(entry.kind, EntryKind::Field);
        assert_eq!(entry.decl, Some(Span::from_coords(1, 25, 1, 26)));
        let names: Vec<String> = scope
            .field_candidates(&["o"])
            .unwrap()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["a"]);

        assert_eq!(
            scope.resolve(&["p", "a"]),
            Err(ResolveError::NestedLocal { name: "p".into() })
        );
    }

    #[test]
    fn field_candidates_on_truncated_index() {
        let text = "local o={a:9}; o.";
        let node = tree(text);
        let scope = resolve_scope(&node, &Source::new(text), Position::new(1, 18));
        let candidates = scope.field_candidates(&["o"]).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].0, "a");
        assert_eq!(candidates[0].1.detail, "(number) 9");
    }

    #[test]
    fn resolve_scope_is_idempotent() {
        let text = "local o={a:{b:'c'}}; local f(x) = o.a; f(1)";
        let node = tree(text);
        let source = Source::new(text);
        for col in 1..=text.len() as u32 {
            let pos = Position::new(1, col);
            assert_eq!(resolve_scope(&node, &source, pos), resolve_scope(&node, &source, pos));
        }
    }
}
