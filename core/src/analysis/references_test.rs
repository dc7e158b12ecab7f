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

    fn refs(text: &str, pos: Position) -> Vec<Span> {
        references_at(&tree(text), &Source::new(text), pos)
    }

    #[test]
    fn local_references() {
        let expected = vec![
            Span::from_coords(1, 7, 1, 8),
            Span::from_coords(1, 12, 1, 13),
            Span::from_coords(1, 16, 1, 17),
        ];
        assert_eq!(refs("local a=1; a + a", Position::new(1, 12)), expected);
        assert_eq!(refs("local a=1; a + a", Position::new(1, 7)), expected);
    }

    #[test]
    fn shadowing_splits_bindings() {
        let text = "local a=1; local a=2; a";
        assert_eq!(
            refs(text, Position::new(1, 23)),
            vec![Span::from_coords(1, 18, 1, 19), Span::from_coords(1, 23, 1, 24)]
        );
        assert_eq!(refs(text, Position::new(1, 7)), vec![Span::from_coords(1, 7, 1, 8)]);
    }

    #[test]
    fn field_references_through_variables() {
        let text = "local o={a:1}; o.a";
        let expected = vec![Span::from_coords(1, 10, 1, 11), Span::from_coords(1, 18, 1, 19)];
        assert_eq!(refs(text, Position::new(1, 18)), expected);
        assert_eq!(refs(text, Position::new(1, 10)), expected);
    }

    #[test]
    fn field_references_through_self() {
        let text = "{a: 1, b: self.a}";
        assert_eq!(
            refs(text, Position::new(1, 16)),
            vec![Span::from_coords(1, 2, 1, 3), Span::from_coords(1, 16, 1, 17)]
        );
    }

    #[test]
    fn nested_field_references() {
        let text = "local o={a:{b:1}}; o.a.b";
        let node = tree(text);
        let source = Source::new(text);
        // local1-5 o7 {9 a10 {12 b13 }16 }17 ;18 o20 .21 a22 .23 b24
        assert_eq!(
            definition_at(&node, &source, Position::new(1, 24)),
            Some(Span::from_coords(1, 13, 1, 14))
        );
        assert_eq!(
            definition_at(&node, &source, Position::new(1, 22)),
            Some(Span::from_coords(1, 10, 1, 11))
        );
    }

    #[test]
    fn parameters_and_comprehensions() {
        assert_eq!(
            refs("function(x) x * x", Position::new(1, 13)),
            vec![
                Span::from_coords(1, 10, 1, 11),
                Span::from_coords(1, 13, 1, 14),
                Span::from_coords(1, 17, 1, 18),
            ]
        );
        assert_eq!(
            refs("[x for x in [1, 2]]", Position::new(1, 2)),
            vec![Span::from_coords(1, 2, 1, 3), Span::from_coords(1, 8, 1, 9)]
        );
    }

    #[test]
    fn builtins_have_no_declaration() {
        let text = "std.length([]) + std.abs(1)";
        let node = tree(text);
        let source = Source::new(text);
        assert_eq!(
            references_at(&node, &source, Position::new(1, 1)),
            vec![Span::from_coords(1, 1, 1, 4), Span::from_coords(1, 18, 1, 21)]
        );
        assert_eq!(definition_at(&node, &source, Position::new(1, 1)), None);
    }

    #[test]
    fn synthetic_std_is_invisible() {
        let text = "[x for x in [1]]";
        let collected = References::collect(&tree(text), &Source::new(text));
        // x: one declaration and one use
        assert_eq!(collected.len(), 2);
    }

    #[test]
    fn nothing_under_cursor() {
        assert!(refs("1 + 2", Position::new(1, 1)).is_empty());
        let text = "local a=1; a";
        assert_eq!(definition_at(&tree(text), &Source::new(text), Position::new(1, 9)), None);
    }
}
