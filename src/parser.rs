/*!
Time & Space Complexity: whole‑file overview
============================================

Definitions
-----------
* **n** = number of tokens (including the sole EOF).
* **m** = number of AST nodes (`m ≤ n`, because each token contributes at most one node).

### Time

| Phase / function              | Cost | Rationale                                                    |
|-------------------------------|-----:|--------------------------------------------------------------|
| `Parser::parse` main loop     | Θ(n) | Each token is consumed once via `advance()`.                 |
| Individual productions        | O(1) per token | Recursive descent with one token of lookahead.     |
| Error handling                | O(1) | The first error aborts the parse; there is no recovery.      |

**Overall:** **Θ(n)**.

### Space

| Structure                | Asymptotic | Notes                                                  |
|--------------------------|-----------:|--------------------------------------------------------|
| Borrowed token slice     | O(n)       | Zero‑copy from scanner.                                |
| AST (`Vec`, `Box`)       | O(m) ≈ O(n)| Names and literals are copied out of the token text.   |
| Parser scratch fields    | O(1)       | Cursor and nesting depth.                              |

Call‑stack depth grows with syntactic nesting and is capped at [`MAX_NESTING`];
the host stack is grown on demand through [`crate::stack`].

### Logging Policy

| Location                     | Level  | Purpose                                   |
|------------------------------|--------|-------------------------------------------|
| `Parser::new`, `parse`       | `info` | Lifecycle milestones.                     |
| `statement`, `block`         | `debug`| High‑level descent into grammar branches. |
| Error paths (`consume_*`)    | `debug`| Context before returning structured error.|

--------------------------------------------------------------------------------
Grammar (EBNF)
--------------

```text
program      → NEWLINE* ( statement NEWLINE* )* EOF ;
statement    → printStmt | varDecl | ifStmt | loopStmt
             | funDecl | returnStmt | exprStmt ;
exprStmt     → expression ";" ;
varDecl      → ( "变量" | "常量" ) IDENT "=" expression ";" ;
ifStmt       → "如果" "(" expression ")" "{" block
               ( "否则" ( ifStmt | "{" block ) )? ;
loopStmt     → "循环" "(" expression ")" "{" block ;
funDecl      → "函数" IDENT "(" ( IDENT ( "," IDENT )* )? ")" "{" block ;
returnStmt   → "返回" expression? ";" ;
printStmt    → "输出" expression ";" ;
block        → NEWLINE* ( statement NEWLINE* )* "}" ;
expression   → IDENT "=" expression | chain ;
chain        → primary ( BINARY_OP primary )* ;
primary      → NUMBER | STRING | IDENT ( "(" arguments? ")" )?
             | "(" expression ")" | ( "-" | "!" ) primary ;
arguments    → expression ( "," expression )* ;
```

Binary operators carry **no precedence**: `chain` folds strictly left to
right, so `1 + 2 * 3` is `(1 + 2) * 3`.  Assignment is only recognised when
an identifier is immediately followed by `=` at the start of an expression.
*/

use crate::ast::{
    BinaryOp, Expr, FunctionDecl, LiteralValue, Position, Program, Stmt, UnaryOp,
};
use crate::error::{KunyuError, Result};
use crate::stack::ensure_sufficient_stack;
use crate::token::{Delimiter, Keyword, Operator, Token, TokenType};

use log::{debug, info};
use std::rc::Rc;

/// Deepest nesting of blocks, groupings, unary operators and operator
/// chains the parser accepts.
pub const MAX_NESTING: usize = 256;

/// Stand‑in returned when the cursor runs past a token slice that lacks
/// its EOF marker.
static EOF_TOKEN: Token<'static> = Token {
    token_type: TokenType::EOF,
    lexeme: "",
    line: 0,
    column: 0,
};

/// Top‑level parser over an immutable slice of tokens.
pub struct Parser<'a> {
    tokens: &'a [Token<'a>],
    current: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    /// Construct a new parser.
    pub fn new(tokens: &'a [Token<'a>]) -> Self {
        info!("Parser created with {} tokens", tokens.len());

        Self {
            tokens,
            current: 0,
            depth: 0,
        }
    }

    // ───────────────────────── public API ─────────────────────────

    /// Parse an entire program.  Aborts on the first error; any partially
    /// built subtrees are dropped on the way out.
    pub fn parse(&mut self) -> Result<Program> {
        info!("Beginning parse phase");

        let mut statements: Vec<Stmt> = Vec::new();

        self.skip_newlines();

        while !self.is_at_end() {
            statements.push(self.statement()?);

            self.skip_newlines();
        }

        info!("Parsed {} top-level statements", statements.len());

        Ok(Program { statements })
    }

    // ───────────────────────── statement rules ────────────────────

    fn statement(&mut self) -> Result<Stmt> {
        ensure_sufficient_stack(|| self.statement_inner())
    }

    fn statement_inner(&mut self) -> Result<Stmt> {
        debug!("Entering statement at {}", self.position_of(self.peek()));

        match self.peek().token_type {
            TokenType::KEYWORD(Keyword::Print) => {
                self.advance();
                self.print_statement()
            }

            TokenType::KEYWORD(Keyword::Variable) => {
                self.advance();
                self.var_declaration(false)
            }

            TokenType::KEYWORD(Keyword::Constant) => {
                self.advance();
                self.var_declaration(true)
            }

            TokenType::KEYWORD(Keyword::If) => {
                self.advance();
                self.if_statement()
            }

            TokenType::KEYWORD(Keyword::Loop) => {
                self.advance();
                self.loop_statement()
            }

            TokenType::KEYWORD(Keyword::Function) => {
                self.advance();
                self.function_declaration()
            }

            TokenType::KEYWORD(Keyword::Return) => {
                self.advance();
                self.return_statement()
            }

            _ => self.expression_statement(),
        }
    }

    fn print_statement(&mut self) -> Result<Stmt> {
        let value: Expr = self.expression()?;

        self.consume_delimiter(Delimiter::Semicolon, "Expected ';' after value")?;

        Ok(Stmt::Print(value))
    }

    fn var_declaration(&mut self, constant: bool) -> Result<Stmt> {
        let name: &Token<'_> = self.consume_identifier("Expected variable name")?;

        if !self.peek().is_operator(Operator::Assign) {
            return Err(self.error_at_current("Expected '=' after variable name"));
        }
        self.advance();

        let initializer: Expr = self.expression()?;

        self.consume_delimiter(
            Delimiter::Semicolon,
            "Expected ';' after variable declaration",
        )?;

        Ok(Stmt::VarDecl {
            name: name.lexeme.to_string(),
            initializer,
            constant,
            position: self.position_of(name),
        })
    }

    /// `如果` has already been consumed.
    fn if_statement(&mut self) -> Result<Stmt> {
        self.consume_delimiter(Delimiter::LeftParen, "Expected '(' after '如果'")?;
        let condition: Expr = self.expression()?;
        self.consume_delimiter(Delimiter::RightParen, "Expected ')' after condition")?;

        self.consume_delimiter(Delimiter::LeftBrace, "Expected '{' before if body")?;
        let then_branch: Box<Stmt> = Box::new(Stmt::Block(self.block()?));

        let else_branch: Option<Box<Stmt>> = if self.match_keyword(Keyword::Else) {
            if self.match_keyword(Keyword::If) {
                Some(Box::new(self.if_statement()?))
            } else {
                self.consume_delimiter(Delimiter::LeftBrace, "Expected '{' after '否则'")?;

                Some(Box::new(Stmt::Block(self.block()?)))
            }
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn loop_statement(&mut self) -> Result<Stmt> {
        self.consume_delimiter(Delimiter::LeftParen, "Expected '(' after '循环'")?;
        let condition: Expr = self.expression()?;
        self.consume_delimiter(Delimiter::RightParen, "Expected ')' after loop condition")?;

        self.consume_delimiter(Delimiter::LeftBrace, "Expected '{' before loop body")?;
        let body: Box<Stmt> = Box::new(Stmt::Block(self.block()?));

        Ok(Stmt::Loop { condition, body })
    }

    fn function_declaration(&mut self) -> Result<Stmt> {
        let name: &Token<'_> = self.consume_identifier("Expected function name")?;

        self.consume_delimiter(Delimiter::LeftParen, "Expected '(' after function name")?;

        let mut params: Vec<String> = Vec::new();

        if !self.check_delimiter(Delimiter::RightParen) {
            loop {
                let param: &Token<'_> = self.consume_identifier("Expected parameter name")?;
                params.push(param.lexeme.to_string());

                if self.check_delimiter(Delimiter::RightParen) {
                    break;
                }

                self.consume_delimiter(Delimiter::Comma, "Expected ',' between parameters")?;
            }
        }

        self.consume_delimiter(Delimiter::RightParen, "Expected ')' after parameters")?;
        self.consume_delimiter(Delimiter::LeftBrace, "Expected '{' before function body")?;

        let body: Vec<Stmt> = self.block()?;

        debug!(
            "Parsed function '{}' with {} parameters",
            name.lexeme,
            params.len()
        );

        Ok(Stmt::Function(Rc::new(FunctionDecl {
            name: name.lexeme.to_string(),
            params,
            body,
            position: self.position_of(name),
        })))
    }

    fn return_statement(&mut self) -> Result<Stmt> {
        let keyword: &Token<'_> = self.previous();

        let value: Option<Expr> = if self.check_delimiter(Delimiter::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };

        self.consume_delimiter(Delimiter::Semicolon, "Expected ';' after return value")?;

        Ok(Stmt::Return {
            value,
            position: self.position_of(keyword),
        })
    }

    fn expression_statement(&mut self) -> Result<Stmt> {
        let expr: Expr = self.expression()?;

        self.consume_delimiter(Delimiter::Semicolon, "Expected ';' after expression")?;

        Ok(Stmt::Expression(expr))
    }

    /// Statements up to the closing `}`; the opening `{` is already consumed.
    fn block(&mut self) -> Result<Vec<Stmt>> {
        self.enter()?;
        debug!("Entering block at depth {}", self.depth);

        let mut statements: Vec<Stmt> = Vec::new();

        self.skip_newlines();

        while !self.check_delimiter(Delimiter::RightBrace) {
            if self.is_at_end() {
                return Err(self.error_at_current("Unterminated block, expected '}'"));
            }

            statements.push(self.statement()?);

            self.skip_newlines();
        }

        self.consume_delimiter(Delimiter::RightBrace, "Expected '}' after block")?;
        self.leave();

        Ok(statements)
    }

    // ─────────────────────── expression rules ─────────────────────

    fn expression(&mut self) -> Result<Expr> {
        ensure_sufficient_stack(|| self.expression_inner())
    }

    fn expression_inner(&mut self) -> Result<Expr> {
        self.enter()?;

        let expr: Expr = if self.peek().token_type == TokenType::IDENTIFIER
            && self.peek_next().is_operator(Operator::Assign)
        {
            let name: &Token<'_> = self.advance();
            self.advance(); // '='

            let value: Expr = self.expression()?;

            Expr::Assign {
                name: name.lexeme.to_string(),
                position: self.position_of(name),
                value: Box::new(value),
            }
        } else {
            self.chain()?
        };

        self.leave();

        Ok(expr)
    }

    /// `primary ( op primary )*`, folded left with no precedence.
    fn chain(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.primary()?;
        let mut links: usize = 0;

        while let TokenType::OPERATOR(op) = self.peek().token_type {
            let token: &Token<'_> = self.advance();

            let Some(operator) = BinaryOp::from_operator(op) else {
                debug!("Rejecting operator '{}' in expression chain", op.as_str());

                return Err(KunyuError::parse(
                    token.line,
                    token.column,
                    format!("Unsupported binary operator '{}'", op.as_str()),
                ));
            };

            // Each link deepens the left spine of the tree.
            self.enter()?;
            links += 1;

            let right: Expr = self.primary()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                position: self.position_of(token),
                right: Box::new(right),
            };
        }

        self.depth -= links;

        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr> {
        ensure_sufficient_stack(|| self.primary_inner())
    }

    fn primary_inner(&mut self) -> Result<Expr> {
        let token: &Token<'a> = self.peek();

        match token.token_type {
            TokenType::NUMBER => {
                self.advance();

                let n: f64 = token.lexeme.parse::<f64>().map_err(|_| {
                    KunyuError::parse(
                        token.line,
                        token.column,
                        format!("Invalid number literal '{}'", token.lexeme),
                    )
                })?;

                Ok(Expr::Literal(LiteralValue::Number(n)))
            }

            TokenType::STRING => {
                self.advance();

                Ok(Expr::Literal(LiteralValue::Str(token.lexeme.to_string())))
            }

            TokenType::IDENTIFIER => {
                self.advance();

                if self.match_delimiter(Delimiter::LeftParen) {
                    return self.finish_call(token);
                }

                Ok(Expr::Variable {
                    name: token.lexeme.to_string(),
                    position: self.position_of(token),
                })
            }

            TokenType::DELIMITER(Delimiter::LeftParen) => {
                self.advance();

                let expr: Expr = self.expression()?;

                self.consume_delimiter(Delimiter::RightParen, "Expected ')' after expression")?;

                Ok(Expr::Grouping(Box::new(expr)))
            }

            TokenType::OPERATOR(op @ (Operator::Minus | Operator::Bang)) => {
                self.advance();
                self.enter()?;

                let operand: Expr = self.primary()?;

                self.leave();

                let operator: UnaryOp = if op == Operator::Minus {
                    UnaryOp::Negate
                } else {
                    UnaryOp::Not
                };

                Ok(Expr::Unary {
                    operator,
                    position: self.position_of(token),
                    operand: Box::new(operand),
                })
            }

            _ => {
                debug!("Expected expression, found {}", token);

                Err(self.error_at_current("Expected expression"))
            }
        }
    }

    /// Arguments of a call; the name and `(` are already consumed.
    fn finish_call(&mut self, name: &Token<'a>) -> Result<Expr> {
        let mut arguments: Vec<Expr> = Vec::new();

        if !self.check_delimiter(Delimiter::RightParen) {
            loop {
                arguments.push(self.expression()?);

                if self.check_delimiter(Delimiter::RightParen) {
                    break;
                }

                self.consume_delimiter(Delimiter::Comma, "Expected ',' between arguments")?;
            }
        }

        self.consume_delimiter(Delimiter::RightParen, "Expected ')' after arguments")?;

        Ok(Expr::Call {
            name: name.lexeme.to_string(),
            position: self.position_of(name),
            arguments,
        })
    }

    // ────────────────────── utility helpers ───────────────────────

    #[inline(always)]
    fn enter(&mut self) -> Result<()> {
        self.depth += 1;

        if self.depth > MAX_NESTING {
            return Err(self.error_at_current("Nesting too deep"));
        }

        Ok(())
    }

    #[inline(always)]
    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn skip_newlines(&mut self) {
        while self.peek().token_type == TokenType::NEWLINE {
            self.advance();
        }
    }

    #[inline(always)]
    fn match_keyword(&mut self, keyword: Keyword) -> bool {
        if self.peek().is_keyword(keyword) {
            self.advance();

            return true;
        }

        false
    }

    #[inline(always)]
    fn check_delimiter(&self, delimiter: Delimiter) -> bool {
        self.peek().is_delimiter(delimiter)
    }

    #[inline(always)]
    fn match_delimiter(&mut self, delimiter: Delimiter) -> bool {
        if self.check_delimiter(delimiter) {
            self.advance();

            return true;
        }

        false
    }

    #[inline(always)]
    fn consume_delimiter(&mut self, delimiter: Delimiter, message: &str) -> Result<&'a Token<'a>> {
        if self.check_delimiter(delimiter) {
            return Ok(self.advance());
        }

        debug!("Expected '{}', found {}", delimiter.as_str(), self.peek());

        Err(self.error_at_current(message))
    }

    #[inline(always)]
    fn consume_identifier(&mut self, message: &str) -> Result<&'a Token<'a>> {
        if self.peek().token_type == TokenType::IDENTIFIER {
            return Ok(self.advance());
        }

        debug!("Expected identifier, found {}", self.peek());

        Err(self.error_at_current(message))
    }

    fn error_at_current(&self, message: &str) -> KunyuError {
        let token: &Token<'_> = self.peek();

        KunyuError::parse(token.line, token.column, message)
    }

    #[inline(always)]
    fn position_of(&self, token: &Token<'_>) -> Position {
        Position::new(token.line, token.column)
    }

    #[inline(always)]
    fn advance(&mut self) -> &'a Token<'a> {
        if !self.is_at_end() {
            self.current += 1;
        }

        self.previous()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        matches!(self.peek().token_type, TokenType::EOF)
    }

    #[inline(always)]
    fn peek(&self) -> &'a Token<'a> {
        self.tokens.get(self.current).unwrap_or(&EOF_TOKEN)
    }

    /// The token after [`peek`]; only used to spot `IDENT =`.
    #[inline(always)]
    fn peek_next(&self) -> &'a Token<'a> {
        self.tokens.get(self.current + 1).unwrap_or(&EOF_TOKEN)
    }

    #[inline(always)]
    fn previous(&self) -> &'a Token<'a> {
        self.current
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .unwrap_or(&EOF_TOKEN)
    }
}

/// Convenience: parse a token slice into a [`Program`].
pub fn parse(tokens: &[Token<'_>]) -> Result<Program> {
    Parser::new(tokens).parse()
}
