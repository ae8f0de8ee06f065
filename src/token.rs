use log::debug;
use serde::Serialize;
use std::fmt;

/// The eight reserved words of the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Keyword {
    /// 变量
    Variable,

    /// 常量
    Constant,

    /// 如果
    If,

    /// 否则
    Else,

    /// 循环
    Loop,

    /// 函数
    Function,

    /// 返回
    Return,

    /// 输出
    Print,
}

impl Keyword {
    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Variable => "变量",
            Keyword::Constant => "常量",
            Keyword::If => "如果",
            Keyword::Else => "否则",
            Keyword::Loop => "循环",
            Keyword::Function => "函数",
            Keyword::Return => "返回",
            Keyword::Print => "输出",
        }
    }
}

/// Operator lexemes.  `=` is only meaningful in declarations and
/// assignments; everything else is a binary or unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Operator {
    /// '='
    Assign,

    /// '+'
    Plus,

    /// '-'
    Minus,

    /// '*'
    Star,

    /// '/'
    Slash,

    /// '%'
    Percent,

    /// '=='
    EqualEqual,

    /// '!='
    BangEqual,

    /// '<'
    Less,

    /// '<='
    LessEqual,

    /// '>'
    Greater,

    /// '>='
    GreaterEqual,

    /// '!'
    Bang,

    /// '&&'
    AndAnd,

    /// '||'
    OrOr,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Assign => "=",
            Operator::Plus => "+",
            Operator::Minus => "-",
            Operator::Star => "*",
            Operator::Slash => "/",
            Operator::Percent => "%",
            Operator::EqualEqual => "==",
            Operator::BangEqual => "!=",
            Operator::Less => "<",
            Operator::LessEqual => "<=",
            Operator::Greater => ">",
            Operator::GreaterEqual => ">=",
            Operator::Bang => "!",
            Operator::AndAnd => "&&",
            Operator::OrOr => "||",
        }
    }
}

/// Punctuation that structures the program but never computes anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Delimiter {
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Comma,
    Dot,
    Semicolon,
}

impl Delimiter {
    pub fn as_str(self) -> &'static str {
        match self {
            Delimiter::LeftParen => "(",
            Delimiter::RightParen => ")",
            Delimiter::LeftBrace => "{",
            Delimiter::RightBrace => "}",
            Delimiter::LeftBracket => "[",
            Delimiter::RightBracket => "]",
            Delimiter::Comma => ",",
            Delimiter::Dot => ".",
            Delimiter::Semicolon => ";",
        }
    }
}

/// The different kinds of tokens recognized by the scanner.
///
/// The category is the variant; keywords, operators and delimiters carry
/// which one they are.  `STRING` and `NUMBER` keep their text in
/// [`Token::lexeme`].
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TokenType {
    /// End‑of‑input marker, emitted exactly once.
    EOF,

    /// A user‑defined identifier
    IDENTIFIER,

    /// One of the reserved words
    KEYWORD(Keyword),

    /// A string literal (contents without quotes, backslashes kept)
    STRING,

    /// A numeric literal
    NUMBER,

    OPERATOR(Operator),

    DELIMITER(Delimiter),

    /// A line break; separates statements
    NEWLINE,
}

impl TokenType {
    /// Category name without payload, as printed by `tokenize`.
    pub fn category(&self) -> &'static str {
        match self {
            TokenType::EOF => "EOF",
            TokenType::IDENTIFIER => "IDENTIFIER",
            TokenType::KEYWORD(_) => "KEYWORD",
            TokenType::STRING => "STRING",
            TokenType::NUMBER => "NUMBER",
            TokenType::OPERATOR(_) => "OPERATOR",
            TokenType::DELIMITER(_) => "DELIMITER",
            TokenType::NEWLINE => "NEWLINE",
        }
    }
}

/// A scanned token, including its type, its text and the position where
/// it starts.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Token<'a> {
    /// The category of this token.
    pub token_type: TokenType,

    /// The token text.  For strings this is the content between the
    /// quotes; for everything else the exact source slice.
    pub lexeme: &'a str,

    /// 1‑based line number in the source.
    pub line: usize,

    /// 1‑based column, counted in characters.
    pub column: usize,
}

impl<'a> Token<'a> {
    /// Create a new Token with the given type, lexeme and position.
    pub fn new(token_type: TokenType, lexeme: &'a str, line: usize, column: usize) -> Self {
        debug!(
            "Creating new token: type={:?}, lexeme={:?}, line={}, column={}",
            token_type, lexeme, line, column
        );

        Self {
            token_type,
            lexeme,
            line,
            column,
        }
    }

    #[inline]
    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.token_type == TokenType::KEYWORD(keyword)
    }

    #[inline]
    pub fn is_operator(&self, operator: Operator) -> bool {
        self.token_type == TokenType::OPERATOR(operator)
    }

    #[inline]
    pub fn is_delimiter(&self, delimiter: Delimiter) -> bool {
        self.token_type == TokenType::DELIMITER(delimiter)
    }
}

impl<'a> fmt::Display for Token<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text: &str = match self.token_type {
            TokenType::NEWLINE => "\\n",
            TokenType::EOF => "<eof>",
            _ => self.lexeme,
        };

        write!(
            f,
            "{} {} {}:{}",
            self.token_type.category(),
            text,
            self.line,
            self.column
        )
    }
}
