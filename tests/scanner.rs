#[cfg(test)]
mod scanner_tests {
    use loxwalk::error::LoxError;
    use loxwalk::scanner::*;
    use loxwalk::token::*;
    use pretty_assertions::assert_eq;

    fn scan(source: &str) -> (Vec<Token>, Vec<LoxError>) {
        let mut errors: Vec<LoxError> = Vec::new();
        let tokens = Scanner::new(source).scan_tokens(&mut errors);
        (tokens, errors)
    }

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let (tokens, errors) = scan(source);
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);

        let actual: Vec<(TokenType, &str)> = tokens
            .iter()
            .map(|t| (t.token_type, t.lexeme.as_str()))
            .collect();

        assert_eq!(actual, expected);
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({*.,+*})",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::STAR, "*"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_two_character_operators() {
        assert_token_sequence(
            "! != = == < <= > >= /",
            &[
                (TokenType::BANG, "!"),
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::EQUAL, "="),
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::LESS, "<"),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::GREATER, ">"),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::SLASH, "/"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_token_sequence(
            "class Foo < Bar { init() { this.x = super.y; } } orchid _tmp1",
            &[
                (TokenType::CLASS, "class"),
                (TokenType::IDENTIFIER, "Foo"),
                (TokenType::LESS, "<"),
                (TokenType::IDENTIFIER, "Bar"),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::IDENTIFIER, "init"),
                (TokenType::LEFT_PAREN, "("),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::THIS, "this"),
                (TokenType::DOT, "."),
                (TokenType::IDENTIFIER, "x"),
                (TokenType::EQUAL, "="),
                (TokenType::SUPER, "super"),
                (TokenType::DOT, "."),
                (TokenType::IDENTIFIER, "y"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::IDENTIFIER, "orchid"),
                (TokenType::IDENTIFIER, "_tmp1"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_number_literals() {
        let (tokens, errors) = scan("123 3.25 7.");
        assert!(errors.is_empty());

        assert_eq!(tokens[0].literal, Some(Literal::Number(123.0)));
        assert_eq!(tokens[1].literal, Some(Literal::Number(3.25)));

        // a trailing dot is its own token
        assert_eq!(tokens[2].literal, Some(Literal::Number(7.0)));
        assert_eq!(tokens[3].token_type, TokenType::DOT);
        assert_eq!(tokens[4].token_type, TokenType::EOF);
    }

    #[test]
    fn test_string_spanning_lines() {
        let (tokens, errors) = scan("\"one\ntwo\" x");
        assert!(errors.is_empty());

        assert_eq!(tokens[0].token_type, TokenType::STRING);
        assert_eq!(tokens[0].literal, Some(Literal::Str("one\ntwo".to_owned())));
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn test_comments_and_newlines() {
        let (tokens, errors) = scan("// nothing here\nprint 1; // trailing\n\nx");
        assert!(errors.is_empty());

        let lines: Vec<usize> = tokens.iter().map(|t| t.line).collect();
        assert_eq!(lines, vec![2, 2, 2, 4, 4]);
    }

    #[test]
    fn test_token_display() {
        let (tokens, _) = scan("var x = 42; \"hi\"");
        let rendered: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();

        assert_eq!(
            rendered,
            vec![
                "VAR var null",
                "IDENTIFIER x null",
                "EQUAL = null",
                "NUMBER 42 42.0",
                "SEMICOLON ; null",
                "STRING \"hi\" hi",
                "EOF  null",
            ]
        );
    }

    #[test]
    fn test_unexpected_chars_token_sequence() {
        let source = ",.$(#";
        let results: Vec<_> = Scanner::new(source).collect();

        // COMMA, DOT, error, LEFT_PAREN, error, EOF
        assert_eq!(results.len(), 6, "Expected 6 items in result");

        let kinds: Vec<Option<TokenType>> = results
            .iter()
            .map(|r| r.as_ref().ok().map(|t| t.token_type))
            .collect();

        assert_eq!(
            kinds,
            vec![
                Some(TokenType::COMMA),
                Some(TokenType::DOT),
                None,
                Some(TokenType::LEFT_PAREN),
                None,
                Some(TokenType::EOF),
            ]
        );

        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert_eq!(err.to_string(), "[line 1] Error: Unexpected character.");
        }
    }

    #[test]
    fn test_errors_do_not_stop_scanning() {
        let (tokens, errors) = scan("@\nprint \"open");

        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].line(), Some(1));
        assert_eq!(errors[1].to_string(), "[line 2] Error: Unterminated string.");

        let kinds: Vec<TokenType> = tokens.iter().map(|t| t.token_type).collect();
        assert_eq!(kinds, vec![TokenType::PRINT, TokenType::EOF]);
    }

    #[test]
    fn test_multibyte_unexpected_character() {
        let (tokens, errors) = scan("é1");

        assert_eq!(errors.len(), 1);
        assert_eq!(tokens[0].literal, Some(Literal::Number(1.0)));
    }
}
