use jsonnet_core::{
    analysis::{locate, references_at, resolve_scope, LocateError, Located, Source},
    analyze,
    ast::{FieldKey, Node, MAX_NESTING},
    token::Position,
};

const SOURCES: &[&str] = &[
    "{a: 1, 'b': 2, ['c']: 3}",
    "local o = {a: {b: 'c'}}; o.a.b",
    "{ local x = 1, f(y):: x + y, nested: { z::: self.f(1) } }",
    "[x * 2 for x in [1, 2, 3] if x > 1]",
    "{[k]: 1 for k in ['a', 'b']}",
    "function(a, b=2) a[1:b]",
    "local f(n) = if n == 0 then 1 else n * f(n - 1); f(5)",
    "{a: 1} + {a+: 2, assert self.a > 0 : 'positive'}",
    "std.length([])\n",
];

fn tree(text: &str) -> Node {
    let analysis = analyze("file.jsonnet", text);
    assert!(analysis.diagnostics.is_empty(), "{}: {:?}", text, analysis.diagnostics);
    analysis.tree.expect("tree")
}

#[test]
fn desugared_fields_are_string_keyed() {
    for text in SOURCES {
        let node = tree(text);
        node.walk(&mut |n| {
            assert!(!matches!(n, Node::Object(_) | Node::ObjectComp(_)), "{}", text);
            if let Node::DesugaredObject(obj) = n {
                for field in &obj.fields {
                    assert!(
                        obj.field_locs
                            .iter()
                            .any(|(key, _)| matches!(key, FieldKey::Name(name) if *name == field.name)),
                        "{}: field {} has no location",
                        text,
                        field.name
                    );
                }
            }
        });
    }
}

#[test]
fn positions_outside_the_document_are_not_found() {
    for text in SOURCES {
        let node = tree(text);
        let source = Source::new(text);
        let lines = text.lines().count() as u32;
        for pos in [
            Position::new(lines + 2, 1),
            Position::new(lines + 10, 40),
            Position::new(1, text.chars().count() as u32 + 5),
        ] {
            if node.span().contains(pos) {
                continue;
            }
            assert_eq!(locate(&node, &source, pos), Err(LocateError::NotFound { pos }));
        }
    }
}

#[test]
fn every_inside_position_locates() {
    for text in SOURCES {
        let node = tree(text);
        let source = Source::new(text);
        for (i, line) in text.lines().enumerate() {
            for col in 1..=line.chars().count() as u32 {
                let pos = Position::new(i as u32 + 1, col);
                let found = locate(&node, &source, pos).unwrap_or_else(|err| panic!("{} at {}: {}", text, pos, err));
                assert!(found.span().contains(pos), "{} at {}: {:?}", text, pos, found.span());
            }
        }
    }
}

#[test]
fn resolved_declarations_round_trip_through_locate() {
    let text = "local o = {a: {b: 'c'}, d: 1};\n";
    let analysis = analyze("file.jsonnet", text);
    let node = analysis.tree.expect("tree");
    let source = Source::new(text);
    let scope = resolve_scope(&node, &source, Position::new(2, 1));

    let paths: [&[&str]; 4] = [&["o"], &["o", "a"], &["o", "a", "b"], &["o", "d"]];
    for path in paths {
        let decl = scope.resolve(path).unwrap().decl.unwrap();
        for col in decl.start.column..decl.end.column {
            let found = locate(&node, &source, Position::new(decl.start.line, col)).unwrap();
            assert_eq!(found.span(), decl, "{:?}", path);
            assert!(!matches!(found, Located::Node(_)), "{:?}", path);
        }
    }
}

#[test]
fn scope_resolution_is_idempotent() {
    for text in SOURCES {
        let node = tree(text);
        let source = Source::new(text);
        for col in 1..=text.chars().count() as u32 {
            let pos = Position::new(1, col);
            assert_eq!(resolve_scope(&node, &source, pos), resolve_scope(&node, &source, pos));
        }
    }
}

#[test]
fn truncated_index_offers_fields() {
    let text = "local o={a:9}; o.";
    let analysis = analyze("file.jsonnet", text);
    assert!(!analysis.diagnostics.is_empty());
    let node = analysis.tree.expect("tree");
    let source = Source::new(text);
    let scope = resolve_scope(&node, &source, source.end());
    let names: Vec<String> = scope
        .field_candidates(&["o"])
        .unwrap()
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    assert_eq!(names, vec!["a"]);
}

#[test]
fn deeply_nested_documents_are_analysed() {
    let depth = MAX_NESTING * 8;
    for (open, close) in [("[", "]"), ("{a: ", "}"), ("(", ")"), ("local x = 1; ", "")] {
        let text = format!("{}x{}", open.repeat(depth), close.repeat(depth));
        let messages = std::thread::Builder::new()
            .stack_size(64 << 20)
            .spawn(move || {
                let analysis = analyze("file.jsonnet", &text);
                let node = analysis.tree.expect("tree");
                let source = Source::new(&text);
                let pos = Position::new(1, depth as u32);
                let _ = locate(&node, &source, pos);
                let _ = resolve_scope(&node, &source, pos).keys();
                let _ = references_at(&node, &source, pos);
                analysis
                    .diagnostics
                    .into_iter()
                    .map(|d| d.message)
                    .collect::<Vec<_>>()
            })
            .unwrap()
            .join()
            .unwrap();
        assert_eq!(messages.first().map(String::as_str), Some("nesting too deep"), "{}", open);
    }
}
