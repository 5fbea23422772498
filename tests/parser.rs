#[cfg(test)]
mod parser_tests {
    use loxwalk::ast::{ExprKind, Stmt};
    use loxwalk::ast_printer::AstPrinter;
    use loxwalk::error::LoxError;
    use loxwalk::parser::Parser;
    use loxwalk::scanner::Scanner;
    use pretty_assertions::assert_eq;

    fn parse_program(source: &str) -> (Vec<Stmt>, Vec<String>) {
        let mut errors: Vec<LoxError> = Vec::new();
        let tokens = Scanner::new(source).scan_tokens(&mut errors);
        let statements = Parser::new(tokens, &mut errors).parse();

        (statements, errors.iter().map(|e| e.to_string()).collect())
    }

    fn print_expression(source: &str) -> String {
        let mut errors: Vec<LoxError> = Vec::new();
        let tokens = Scanner::new(source).scan_tokens(&mut errors);
        let expr = Parser::new(tokens, &mut errors).parse_expression();

        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
        AstPrinter::print(&expr.expect("expression"))
    }

    #[test]
    fn test_precedence() {
        assert_eq!(print_expression("1 + 2 * 3"), "(+ 1.0 (* 2.0 3.0))");
        assert_eq!(print_expression("-1 - -2"), "(- (- 1.0) (- 2.0))");
        assert_eq!(print_expression("(1 + 2) * 3"), "(* (group (+ 1.0 2.0)) 3.0)");
        assert_eq!(
            print_expression("1 < 2 == !false"),
            "(== (< 1.0 2.0) (! false))"
        );
        assert_eq!(print_expression("a or b and c"), "(or a (and b c))");
    }

    #[test]
    fn test_left_associativity() {
        assert_eq!(print_expression("8 / 4 / 2"), "(/ (/ 8.0 4.0) 2.0)");
        assert_eq!(print_expression("1 - 2 + 3"), "(+ (- 1.0 2.0) 3.0)");
    }

    #[test]
    fn test_assignment_is_right_associative() {
        assert_eq!(print_expression("a = b = 1"), "(= a (= b 1.0))");
        assert_eq!(print_expression("p.x = 2"), "(= (. p x) 2.0)");
    }

    #[test]
    fn test_call_and_property_chains() {
        assert_eq!(print_expression("a.b().c"), "(. (call (. a b)) c)");
        assert_eq!(print_expression("f(1, \"s\")(nil)"), "(call (call f 1.0 s) nil)");
        assert_eq!(print_expression("super.go"), "(super go)");
        assert_eq!(print_expression("this.x"), "(. this x)");
        assert_eq!(print_expression("3.5"), "3.5");
    }

    #[test]
    fn test_trailing_tokens_after_expression() {
        let mut errors: Vec<LoxError> = Vec::new();
        let tokens = Scanner::new("1 2").scan_tokens(&mut errors);
        let expr = Parser::new(tokens, &mut errors).parse_expression();

        assert!(expr.is_none());
        assert_eq!(
            errors.iter().map(|e| e.to_string()).collect::<Vec<_>>(),
            vec!["[line 1] Error at '2': Expect end of expression."]
        );
    }

    #[test]
    fn test_statement_shapes() {
        let (statements, errors) = parse_program(
            "var a = 1;\n\
             fun f(x, y) { return x; }\n\
             class B < A { m() {} }\n\
             for (var i = 0; i < 3; i = i + 1) print i;\n\
             if (a) print 1; else { print 2; }\n\
             while (false) a;",
        );

        assert!(errors.is_empty(), "{:?}", errors);
        assert_eq!(statements.len(), 6);

        assert!(matches!(&statements[0], Stmt::Var { name, initializer: Some(_) } if name.lexeme == "a"));

        match &statements[1] {
            Stmt::Function(decl) => {
                assert_eq!(decl.name.lexeme, "f");
                assert_eq!(decl.params.len(), 2);
                let Stmt::Block(body) = decl.body.as_ref() else {
                    panic!("expected block body, got {:?}", decl.body);
                };
                assert!(matches!(body[0], Stmt::Return { value: Some(_), .. }));
            }
            other => panic!("expected function, got {:?}", other),
        }

        match &statements[2] {
            Stmt::Class {
                name,
                superclass: Some(superclass),
                methods,
            } => {
                assert_eq!(name.lexeme, "B");
                assert!(matches!(&superclass.kind, ExprKind::Variable(t) if t.lexeme == "A"));
                assert_eq!(methods.len(), 1);
            }
            other => panic!("expected class, got {:?}", other),
        }

        assert!(matches!(
            &statements[3],
            Stmt::For {
                initializer: Some(_),
                condition: Some(_),
                increment: Some(_),
                ..
            }
        ));
        assert!(matches!(&statements[4], Stmt::If { else_branch: Some(_), .. }));
        assert!(matches!(&statements[5], Stmt::While { .. }));
    }

    #[test]
    fn test_function_body_is_any_statement() {
        let (statements, errors) = parse_program("fun f() return 1;
fun g(x) print x;");

        assert!(errors.is_empty(), "{:?}", errors);
        assert_eq!(statements.len(), 2);

        let Stmt::Function(f) = &statements[0] else {
            panic!("expected function, got {:?}", statements[0]);
        };
        assert!(matches!(f.body.as_ref(), Stmt::Return { value: Some(_), .. }));

        let Stmt::Function(g) = &statements[1] else {
            panic!("expected function, got {:?}", statements[1]);
        };
        assert!(matches!(g.body.as_ref(), Stmt::Print(_)));
    }

    #[test]
    fn test_return_in_single_statement_body_is_legal() {
        let (_, errors) = parse_program("class A { m() return this; }");

        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn test_synchronize_drops_only_the_bad_declaration() {
        let (statements, errors) = parse_program("var = 1;\nprint 2;\nprint (3;\nprint 4;");

        assert_eq!(
            errors,
            vec![
                "[line 1] Error at '=': Expect variable name.",
                "[line 3] Error at ';': Expect ')' after expression.",
            ]
        );
        assert_eq!(statements.len(), 2);
    }

    #[test]
    fn test_invalid_assignment_target_is_not_fatal() {
        let (statements, errors) = parse_program("a + b = c;\nprint 1;");

        assert_eq!(errors, vec!["[line 1] Error at '=': Invalid assignment target."]);
        assert_eq!(statements.len(), 2);
    }

    #[test]
    fn test_top_level_return() {
        let (statements, errors) = parse_program("return 1;\nfun f() { return; }");

        assert_eq!(errors, vec!["[line 1] Error at 'return': Can't return from top-level code."]);
        assert_eq!(statements.len(), 2);
    }

    #[test]
    fn test_too_many_arguments() {
        let args: Vec<String> = (0..256).map(|i| i.to_string()).collect();
        let source = format!("f({});", args.join(", "));
        let (statements, errors) = parse_program(&source);

        assert_eq!(errors, vec!["[line 1] Error at '255': Can't have more than 255 arguments."]);
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn test_too_many_parameters() {
        let params: Vec<String> = (0..256).map(|i| format!("p{}", i)).collect();
        let source = format!("fun f({}) {{}}", params.join(", "));
        let (statements, errors) = parse_program(&source);

        assert_eq!(errors, vec!["[line 1] Error at 'p255': Can't have more than 255 parameters."]);
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn test_missing_expression_at_end() {
        let (statements, errors) = parse_program("print");

        assert_eq!(errors, vec!["[line 1] Error at end: Expect expression."]);
        assert!(statements.is_empty());
    }
}
