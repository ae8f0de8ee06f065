pub mod ast;
pub mod ast_printer;
pub mod builtins;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod parser;
pub mod repl;
pub mod scanner;
pub mod stack;
pub mod token;
pub mod value;

pub use error::{ErrorKind, KunyuError, Result};
pub use interpreter::{Interpreter, InterpreterConfig, Session};
