//! Centralised error hierarchy for the **Kunyu interpreter**.
//!
//! All subsystems (scanner, parser, runtime, CLI) convert their internal
//! failure modes into one of the variants defined here.  Only one error is
//! ever carried out of a pipeline stage: the first failure aborts the stage
//! and is handed back to the caller as the `Err` side of [`Result`].
//!
//! The module **does not** print diagnostics itself

use std::io;
use thiserror::Error;

use log::info;

/// Coarse classification of a [`KunyuError`], handy for exit codes and for
/// comparing outcomes without looking at message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Lex,
    Parse,
    Runtime,
    Memory,
    Io,
}

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KunyuError {
    /// Lexical (scanner) error with source position.
    #[error("[line {line}, column {column}] Lex error: {message}")]
    Lex {
        /// Human‑readable description.
        message: String,

        /// 1‑based line where the error occurred.
        line: usize,

        /// 1‑based column (in characters) where the error occurred.
        column: usize,
    },

    /// Syntactic (parser) error.
    #[error("[line {line}, column {column}] Parse error: {message}")]
    Parse {
        message: String,
        line: usize,
        column: usize,
    },

    /// Runtime evaluation error.  Errors raised without an attributable
    /// token carry line/column `0`.
    #[error("[line {line}, column {column}] Runtime error: {message}")]
    Runtime {
        message: String,
        line: usize,
        column: usize,
    },

    /// A container could not grow.
    #[error("Memory error: {0}")]
    Memory(String),

    /// Wrapper around `std::io::Error` (transparent).  Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl KunyuError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, column: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!(
            "Creating Lex error: line={}, column={}, msg={}",
            line, column, message
        );

        KunyuError::Lex {
            message,
            line,
            column,
        }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(line: usize, column: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!(
            "Creating Parse error: line={}, column={}, msg={}",
            line, column, message
        );

        KunyuError::Parse {
            message,
            line,
            column,
        }
    }

    /// Helper constructor for the **interpreter**.
    pub fn runtime<S: Into<String>>(line: usize, column: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!(
            "Creating Runtime error: line={}, column={}, msg={}",
            line, column, message
        );

        KunyuError::Runtime {
            message,
            line,
            column,
        }
    }

    pub fn memory<S: Into<String>>(msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Memory error: msg={}", message);

        KunyuError::Memory(message)
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            KunyuError::Lex { .. } => ErrorKind::Lex,
            KunyuError::Parse { .. } => ErrorKind::Parse,
            KunyuError::Runtime { .. } => ErrorKind::Runtime,
            KunyuError::Memory(_) => ErrorKind::Memory,
            KunyuError::Io(_) => ErrorKind::Io,
        }
    }

    /// The message without the position prefix.
    pub fn message(&self) -> String {
        match self {
            KunyuError::Lex { message, .. }
            | KunyuError::Parse { message, .. }
            | KunyuError::Runtime { message, .. }
            | KunyuError::Memory(message) => message.clone(),
            KunyuError::Io(e) => e.to_string(),
        }
    }

    /// `(line, column)` when the error carries a source position.
    pub fn position(&self) -> Option<(usize, usize)> {
        match self {
            KunyuError::Lex { line, column, .. }
            | KunyuError::Parse { line, column, .. }
            | KunyuError::Runtime { line, column, .. } => Some((*line, *column)),
            KunyuError::Memory(_) | KunyuError::Io(_) => None,
        }
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, KunyuError>;
