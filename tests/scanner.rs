#[cfg(test)]
mod scanner_tests {
    use kunyu::error::ErrorKind;
    use kunyu::scanner::*;
    use kunyu::token::*;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source);
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), expected.len(), "tokens: {:?}", tokens);

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    #[test]
    fn test_scanner_01_delimiters() {
        assert_token_sequence(
            "({[,.;]})",
            &[
                (TokenType::DELIMITER(Delimiter::LeftParen), "("),
                (TokenType::DELIMITER(Delimiter::LeftBrace), "{"),
                (TokenType::DELIMITER(Delimiter::LeftBracket), "["),
                (TokenType::DELIMITER(Delimiter::Comma), ","),
                (TokenType::DELIMITER(Delimiter::Dot), "."),
                (TokenType::DELIMITER(Delimiter::Semicolon), ";"),
                (TokenType::DELIMITER(Delimiter::RightBracket), "]"),
                (TokenType::DELIMITER(Delimiter::RightBrace), "}"),
                (TokenType::DELIMITER(Delimiter::RightParen), ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_02_operators() {
        assert_token_sequence(
            "= == ! != < <= > >= && || + - * / %",
            &[
                (TokenType::OPERATOR(Operator::Assign), "="),
                (TokenType::OPERATOR(Operator::EqualEqual), "=="),
                (TokenType::OPERATOR(Operator::Bang), "!"),
                (TokenType::OPERATOR(Operator::BangEqual), "!="),
                (TokenType::OPERATOR(Operator::Less), "<"),
                (TokenType::OPERATOR(Operator::LessEqual), "<="),
                (TokenType::OPERATOR(Operator::Greater), ">"),
                (TokenType::OPERATOR(Operator::GreaterEqual), ">="),
                (TokenType::OPERATOR(Operator::AndAnd), "&&"),
                (TokenType::OPERATOR(Operator::OrOr), "||"),
                (TokenType::OPERATOR(Operator::Plus), "+"),
                (TokenType::OPERATOR(Operator::Minus), "-"),
                (TokenType::OPERATOR(Operator::Star), "*"),
                (TokenType::OPERATOR(Operator::Slash), "/"),
                (TokenType::OPERATOR(Operator::Percent), "%"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_03_keywords_and_identifiers() {
        assert_token_sequence(
            "变量 计数 = 0; 常量 名字_2 = x;",
            &[
                (TokenType::KEYWORD(Keyword::Variable), "变量"),
                (TokenType::IDENTIFIER, "计数"),
                (TokenType::OPERATOR(Operator::Assign), "="),
                (TokenType::NUMBER, "0"),
                (TokenType::DELIMITER(Delimiter::Semicolon), ";"),
                (TokenType::KEYWORD(Keyword::Constant), "常量"),
                (TokenType::IDENTIFIER, "名字_2"),
                (TokenType::OPERATOR(Operator::Assign), "="),
                (TokenType::IDENTIFIER, "x"),
                (TokenType::DELIMITER(Delimiter::Semicolon), ";"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_04_every_keyword() {
        for word in ["变量", "常量", "如果", "否则", "循环", "函数", "返回", "输出"] {
            let tokens = tokenize(word).unwrap();

            assert!(
                matches!(tokens[0].token_type, TokenType::KEYWORD(_)),
                "{} should be a keyword",
                word
            );
            assert_eq!(keyword(word).map(Keyword::as_str), Some(word));
        }

        // A keyword prefix glued to more characters is an identifier.
        let tokens = tokenize("变量名").unwrap();
        assert_eq!(tokens[0].token_type, TokenType::IDENTIFIER);
    }

    #[test]
    fn test_scanner_05_numbers_take_at_most_one_dot() {
        assert_token_sequence(
            "3.14 1.2.3",
            &[
                (TokenType::NUMBER, "3.14"),
                (TokenType::NUMBER, "1.2"),
                (TokenType::DELIMITER(Delimiter::Dot), "."),
                (TokenType::NUMBER, "3"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_06_strings_keep_backslashes() {
        assert_token_sequence(
            r#""a\nb" "引\"号""#,
            &[
                (TokenType::STRING, r"a\nb"),
                (TokenType::STRING, r#"引\"号"#),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_07_unterminated_string_runs_to_end() {
        assert_token_sequence(
            "\"abc\n def",
            &[(TokenType::STRING, "abc\n def"), (TokenType::EOF, "")],
        );
    }

    #[test]
    fn test_scanner_08_comments_and_newlines() {
        assert_token_sequence(
            "输出 1; # 注释 here\n输出 2;",
            &[
                (TokenType::KEYWORD(Keyword::Print), "输出"),
                (TokenType::NUMBER, "1"),
                (TokenType::DELIMITER(Delimiter::Semicolon), ";"),
                (TokenType::NEWLINE, "\n"),
                (TokenType::KEYWORD(Keyword::Print), "输出"),
                (TokenType::NUMBER, "2"),
                (TokenType::DELIMITER(Delimiter::Semicolon), ";"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_09_positions_count_characters() {
        let tokens = tokenize("变量 x = 1;\n  输出 x;").unwrap();

        let x = &tokens[1];
        assert_eq!((x.line, x.column), (1, 4));

        let print = tokens
            .iter()
            .find(|t| t.is_keyword(Keyword::Print))
            .unwrap();
        assert_eq!((print.line, print.column), (2, 3));
    }

    #[test]
    fn test_scanner_10_exactly_one_eof() {
        let tokens = tokenize("").unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].token_type, TokenType::EOF);

        let mut scanner = Scanner::new("1");
        assert!(scanner.next().is_some());
        assert!(scanner.next().is_some());
        assert!(scanner.next().is_none());
        assert!(scanner.next().is_none());
    }

    #[test]
    fn test_unexpected_character_halts() {
        let source = ",.$(";
        let results: Vec<_> = Scanner::new(source).collect();

        // ',' '.' then the error, with nothing after it.
        assert_eq!(results.len(), 3, "Expected 3 items in result");
        assert!(results[0].is_ok());
        assert!(results[1].is_ok());

        let err = results[2].as_ref().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Lex);
        assert_eq!(err.position(), Some((1, 3)));
        assert!(
            err.to_string().contains("Unexpected character: $"),
            "got: {}",
            err
        );
    }

    #[test]
    fn test_lone_ampersand_and_pipe_are_errors() {
        for source in ["1 & 2", "1 | 2"] {
            let err = tokenize(source).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Lex);
            assert_eq!(err.position(), Some((1, 3)));
        }
    }

    #[test]
    fn test_token_display() {
        let tokens = tokenize("输出 \"hi\";").unwrap();
        let rendered: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();

        assert_eq!(rendered[0], "KEYWORD 输出 1:1");
        assert_eq!(rendered[1], "STRING hi 1:4");
        assert_eq!(rendered[3], "EOF <eof> 1:9");
    }
}
