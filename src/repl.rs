//! Interactive read‑eval‑print loop.
//!
//! Each line is its own failure domain: an error is reported and the
//! session (global frame and function registry) carries on.  A line that
//! looks like an expression is wrapped in `输出 …;` so its value is echoed.

use std::borrow::Cow;
use std::io::{self, BufRead, Write};

use log::{debug, info};

use crate::interpreter::Session;
use crate::scanner;
use crate::token::{Delimiter, Keyword, Operator, Token, TokenType};

pub const PROMPT: &str = "坤舆> ";

/// Lines that end the session.
pub const EXIT_WORDS: [&str; 2] = ["退出", "exit"];

pub const FAREWELL: &str = "再见！";

pub const WELCOME: &str = "欢迎使用坤舆编程语言交互式环境！\n\
                           输入表达式或语句进行求值，输入'退出'或按Ctrl+D退出。";

/// What to do with one line of input.
#[derive(Debug, PartialEq, Eq)]
pub enum Input<'a> {
    /// Blank line.
    Skip,

    /// One of the exit words.
    Exit,

    /// Source to hand to the session, possibly rewritten.
    Source(Cow<'a, str>),
}

/// Classify a raw input line.
pub fn prepare(line: &str) -> Input<'_> {
    let line: &str = line.trim();

    if line.is_empty() {
        return Input::Skip;
    }

    if EXIT_WORDS.contains(&line) {
        return Input::Exit;
    }

    // Lex errors are left for the session to report.
    let wrap: bool = match scanner::tokenize(line) {
        Ok(tokens) => is_expression(&tokens),
        Err(_) => false,
    };

    if !wrap {
        return Input::Source(Cow::Borrowed(line));
    }

    let body: &str = line.strip_suffix(';').unwrap_or(line).trim_end();

    debug!("Wrapping REPL input as print statement: {}", body);

    Input::Source(Cow::Owned(format!("{} {};", Keyword::Print.as_str(), body)))
}

/// An input is an expression when it does not start with a statement
/// keyword and either lacks a trailing `;` or contains a bare `=`.
pub fn is_expression(tokens: &[Token<'_>]) -> bool {
    let significant: Vec<&Token<'_>> = tokens
        .iter()
        .filter(|t| !matches!(t.token_type, TokenType::NEWLINE | TokenType::EOF))
        .collect();

    let (first, last) = match (significant.first(), significant.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return false,
    };

    if let TokenType::KEYWORD(_) = first.token_type {
        return false;
    }

    if first.is_delimiter(Delimiter::LeftBrace) {
        return false;
    }

    let assigns: bool = significant.iter().any(|t| t.is_operator(Operator::Assign));

    assigns || !last.is_delimiter(Delimiter::Semicolon)
}

/// Drive a session from `input` until EOF or an exit word.  Program output
/// and echoed values go to `out`, diagnostics to `err`.
pub fn run<R, W, E>(session: &mut Session, mut input: R, mut out: W, mut err: E) -> io::Result<()>
where
    R: BufRead,
    W: Write,
    E: Write,
{
    info!("Starting REPL");

    writeln!(out, "{}", WELCOME)?;

    let mut line: String = String::new();

    loop {
        write!(out, "{}", PROMPT)?;
        out.flush()?;

        line.clear();

        if input.read_line(&mut line)? == 0 {
            writeln!(out)?;
            writeln!(out, "{}", FAREWELL)?;
            break;
        }

        let source: Cow<'_, str> = match prepare(&line) {
            Input::Skip => continue,
            Input::Exit => {
                writeln!(out, "{}", FAREWELL)?;
                break;
            }
            Input::Source(source) => source,
        };

        let (printed, result) = session.evaluate(&source);

        out.write_all(printed.as_bytes())?;

        if let Err(e) = result {
            debug!("REPL input failed: {}", e);
            writeln!(err, "{}", e)?;
            err.flush()?;
        }
    }

    info!("REPL finished");

    Ok(())
}
