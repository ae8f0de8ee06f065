//! Tree‑walking evaluator.
//!
//! The [`Interpreter`] owns everything a running program can observe: the
//! scope chain, the global function registry, the builtin registry and the
//! output sink.  Statements report how they finished through [`Flow`]; a
//! `返回` travels outwards as `Flow::Returned` until the nearest call
//! boundary consumes it.
//!
//! Scoping is dynamic: a call frame is pushed on top of whatever frame is
//! active at the call site, so a callee can see (and assign) the caller's
//! locals.
//!
//! [`Session`] wraps an interpreter writing into an in‑memory buffer and is
//! the entry point for evaluating source text repeatedly while keeping the
//! global frame and function registry alive between calls.

use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

use bytes::buf::Writer;
use bytes::{BufMut, BytesMut};
use log::{debug, info};

use crate::ast::{BinaryOp, Expr, FunctionDecl, LiteralValue, Position, Program, Stmt, UnaryOp};
use crate::builtins::{BuiltinError, Builtins};
use crate::environment::{Environment, ScopeError};
use crate::error::{KunyuError, Result};
use crate::parser;
use crate::scanner;
use crate::stack::ensure_sufficient_stack;
use crate::value::Value;

/// Default ceiling on nested user‑function calls.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterpreterConfig {
    pub max_call_depth: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

/// How a statement finished.
#[derive(Debug)]
pub enum Flow {
    Completed,

    /// A `返回` was executed; the payload is absent for a bare `返回;` or
    /// when the returned expression produced no value.
    Returned(Option<Value>),
}

pub struct Interpreter<W: Write> {
    env: Environment,
    functions: HashMap<String, Rc<FunctionDecl>>,
    builtins: Builtins,
    out: W,
    config: InterpreterConfig,
    call_depth: usize,
}

impl<W: Write> Interpreter<W> {
    pub fn new(out: W) -> Self {
        Self::with_config(out, InterpreterConfig::default())
    }

    pub fn with_config(out: W, config: InterpreterConfig) -> Self {
        info!(
            "Initializing Interpreter (max_call_depth={})",
            config.max_call_depth
        );

        Self {
            env: Environment::new(),
            functions: HashMap::new(),
            builtins: Builtins::standard(),
            out,
            config,
            call_depth: 0,
        }
    }

    pub fn builtins_mut(&mut self) -> &mut Builtins {
        &mut self.builtins
    }

    pub fn output_mut(&mut self) -> &mut W {
        &mut self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    pub fn is_function_defined(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Look up a binding visible from the current frame.
    pub fn global(&self, name: &str) -> Option<Value> {
        self.env.get(name).ok()
    }

    /// Forget every global binding and every user function.
    pub fn reset(&mut self) {
        info!("Resetting interpreter state");

        self.env.clear();
        self.functions.clear();
        self.call_depth = 0;
    }

    /// Run a whole program.  A top‑level `返回` stops the program early
    /// without error.  Declarations executed before a failure stay visible.
    pub fn interpret(&mut self, program: &Program) -> Result<()> {
        debug!("Interpreting {} statements", program.len());

        self.env.unwind_to_global();
        self.call_depth = 0;

        let result: Result<()> = self.run_statements(&program.statements);
        self.out.flush()?;

        if result.is_ok() {
            info!("Interpretation completed successfully");
        }

        result
    }

    fn run_statements(&mut self, statements: &[Stmt]) -> Result<()> {
        for stmt in statements {
            if let Flow::Returned(_) = self.execute(stmt)? {
                debug!("Top-level return, stopping program");
                break;
            }
        }

        Ok(())
    }

    /// Execute a single statement.
    pub fn execute(&mut self, stmt: &Stmt) -> Result<Flow> {
        ensure_sufficient_stack(|| self.execute_inner(stmt))
    }

    fn execute_inner(&mut self, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Expression(expr) => {
                debug!("Evaluating expression statement");

                // A void result is fine here; it is simply discarded.
                let _ = self.evaluate_maybe(expr)?;

                Ok(Flow::Completed)
            }

            Stmt::Print(expr) => {
                let value: Value = self.evaluate(expr)?;

                writeln!(self.out, "{}", value)?;
                debug!("Printed value: {}", value);

                Ok(Flow::Completed)
            }

            Stmt::VarDecl {
                name,
                initializer,
                constant,
                position,
            } => {
                let value: Value = self.evaluate(initializer)?;

                debug!("Declaring '{}' = {}", name, value);

                self.env
                    .define(name, value, *constant)
                    .map_err(|e: ScopeError| scope_error(*position, e))?;

                Ok(Flow::Completed)
            }

            Stmt::Block(statements) => self.execute_block(statements),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    debug!("Condition is truthy; executing then branch");
                    self.execute(then_branch)
                } else if let Some(else_stmt) = else_branch {
                    debug!("Condition is falsy; executing else branch");
                    self.execute(else_stmt)
                } else {
                    Ok(Flow::Completed)
                }
            }

            Stmt::Loop { condition, body } => {
                debug!("Entering loop");

                while self.evaluate(condition)?.is_truthy() {
                    if let Flow::Returned(value) = self.execute(body)? {
                        debug!("Return inside loop body, leaving loop");
                        return Ok(Flow::Returned(value));
                    }
                }

                debug!("Exited loop");

                Ok(Flow::Completed)
            }

            Stmt::Function(decl) => {
                if self.functions.contains_key(&decl.name) {
                    return Err(runtime_error(
                        decl.position,
                        format!("函数'{}'已经定义", decl.name),
                    ));
                }

                info!(
                    "Function '{}' defined with {} parameters",
                    decl.name,
                    decl.arity()
                );

                self.functions.insert(decl.name.clone(), Rc::clone(decl));

                Ok(Flow::Completed)
            }

            Stmt::Return { value, .. } => {
                let value: Option<Value> = match value {
                    Some(expr) => self.evaluate_maybe(expr)?,
                    None => None,
                };

                debug!("Returning {:?}", value.as_ref().map(Value::to_string));

                Ok(Flow::Returned(value))
            }
        }
    }

    /// Run `statements` in a fresh frame.  The frame is popped whether or
    /// not a statement failed.
    pub fn execute_block(&mut self, statements: &[Stmt]) -> Result<Flow> {
        debug!("Entering block with {} statements", statements.len());

        self.env.push();
        let result: Result<Flow> = self.execute_sequence(statements);
        self.env.pop();

        result
    }

    fn execute_sequence(&mut self, statements: &[Stmt]) -> Result<Flow> {
        for stmt in statements {
            if let Flow::Returned(value) = self.execute(stmt)? {
                return Ok(Flow::Returned(value));
            }
        }

        Ok(Flow::Completed)
    }

    /// Evaluate an expression that must produce a value.
    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        match self.evaluate_maybe(expr)? {
            Some(value) => Ok(value),

            None => Err(runtime_error(
                position_of(expr),
                "表达式没有产生值",
            )),
        }
    }

    /// Evaluate an expression that may legitimately produce nothing: a call
    /// to a function that never returned a value, or a dict lookup miss.
    pub fn evaluate_maybe(&mut self, expr: &Expr) -> Result<Option<Value>> {
        ensure_sufficient_stack(|| self.evaluate_inner(expr))
    }

    fn evaluate_inner(&mut self, expr: &Expr) -> Result<Option<Value>> {
        match expr {
            Expr::Literal(literal) => Ok(Some(match literal {
                LiteralValue::Number(n) => Value::number(*n),
                LiteralValue::Str(s) => Value::string(s.as_str()),
            })),

            Expr::Variable { name, position } => {
                let value: Value = self
                    .env
                    .get(name)
                    .map_err(|e: ScopeError| scope_error(*position, e))?;

                debug!("Variable '{}' evaluated to: {}", name, value);

                Ok(Some(value))
            }

            Expr::Binary {
                left,
                operator,
                position,
                right,
            } => {
                // Both operands are always evaluated, `&&` and `||` included.
                let lhs: Value = self.evaluate(left)?;
                let rhs: Value = self.evaluate(right)?;

                binary(*operator, *position, &lhs, &rhs).map(Some)
            }

            Expr::Unary {
                operator,
                position,
                operand,
            } => {
                let value: Value = self.evaluate(operand)?;

                unary(*operator, *position, &value).map(Some)
            }

            Expr::Call {
                name,
                position,
                arguments,
            } => self.call(name, *position, arguments),

            Expr::Grouping(inner) => self.evaluate_maybe(inner),

            Expr::Assign {
                name,
                position,
                value,
            } => {
                let value: Value = self.evaluate(value)?;

                self.env
                    .assign(name, value.clone())
                    .map_err(|e: ScopeError| scope_error(*position, e))?;

                debug!("Assigned {} to '{}'", value, name);

                Ok(Some(value))
            }
        }
    }

    fn evaluate_arguments(&mut self, arguments: &[Expr]) -> Result<Vec<Value>> {
        let mut values: Vec<Value> = Vec::new();

        values
            .try_reserve(arguments.len())
            .map_err(|e| KunyuError::memory(format!("内存分配失败，无法创建参数数组: {}", e)))?;

        for arg in arguments {
            values.push(self.evaluate(arg)?);
        }

        Ok(values)
    }

    /// Dispatch a call.  Builtins win over user functions of the same name.
    fn call(&mut self, name: &str, position: Position, arguments: &[Expr]) -> Result<Option<Value>> {
        if self.builtins.is_builtin(name) {
            let args: Vec<Value> = self.evaluate_arguments(arguments)?;

            return match self.builtins.call(name, &args) {
                Some(Ok(result)) => Ok(result),

                Some(Err(BuiltinError::Memory(e))) => Err(KunyuError::memory(format!(
                    "调用内置函数'{}'失败: {}",
                    name, e
                ))),

                Some(Err(e)) => Err(runtime_error(
                    position,
                    format!("调用内置函数'{}'失败: {}", name, e),
                )),

                None => Err(runtime_error(
                    position,
                    format!("未定义的函数: {}", name),
                )),
            };
        }

        let function: Rc<FunctionDecl> = self
            .functions
            .get(name)
            .cloned()
            .ok_or_else(|| runtime_error(position, format!("未定义的函数: {}", name)))?;

        if arguments.len() != function.arity() {
            return Err(runtime_error(
                position,
                format!(
                    "函数'{}'需要{}个参数，但接收到{}个",
                    name,
                    function.arity(),
                    arguments.len()
                ),
            ));
        }

        if self.call_depth >= self.config.max_call_depth {
            return Err(runtime_error(position, "超出最大调用深度"));
        }

        // Arguments see the caller's frame, not the new one.
        let args: Vec<Value> = self.evaluate_arguments(arguments)?;

        debug!("Calling user function '{}'", name);

        self.call_depth += 1;
        self.env.push();

        let result: Result<Flow> = self.invoke(&function, args);

        self.env.pop();
        self.call_depth -= 1;

        match result? {
            Flow::Returned(value) => {
                debug!("Function '{}' returned", name);
                Ok(value)
            }

            Flow::Completed => {
                debug!("Function '{}' finished without a value", name);
                Ok(None)
            }
        }
    }

    fn invoke(&mut self, function: &FunctionDecl, args: Vec<Value>) -> Result<Flow> {
        for (param, arg) in function.params.iter().zip(args) {
            self.env
                .define(param, arg, false)
                .map_err(|e: ScopeError| scope_error(function.position, e))?;
        }

        self.execute_block(&function.body)
    }
}

// ───────────────────────────── operators ────────────────────────────────────

fn binary(op: BinaryOp, position: Position, lhs: &Value, rhs: &Value) -> Result<Value> {
    debug!("Binary {} on {} and {}", op.symbol(), lhs, rhs);

    if op == BinaryOp::Add && (lhs.is_string() || rhs.is_string()) {
        return Ok(Value::string(format!("{}{}", lhs, rhs)));
    }

    let (a, b) = match (lhs.as_number(), rhs.as_number()) {
        (Some(a), Some(b)) => (a, b),

        _ => {
            return Err(runtime_error(
                position,
                format!(
                    "类型不匹配的运算: '{}' 不能作用于{}和{}",
                    op.symbol(),
                    lhs.type_name(),
                    rhs.type_name()
                ),
            ));
        }
    };

    let n: f64 = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,

        BinaryOp::Div => {
            if b == 0.0 {
                return Err(runtime_error(position, "除数不能为零"));
            }

            a / b
        }

        BinaryOp::Mod => {
            // Both sides are truncated first, so `1 % 0.5` divides by zero.
            let (a, b) = (a.trunc() as i64, b.trunc() as i64);

            if b == 0 {
                return Err(runtime_error(position, "模运算的除数不能为零"));
            }

            a.wrapping_rem(b) as f64
        }

        BinaryOp::Eq => bool_number(a == b),
        BinaryOp::Ne => bool_number(a != b),
        BinaryOp::Lt => bool_number(a < b),
        BinaryOp::Le => bool_number(a <= b),
        BinaryOp::Gt => bool_number(a > b),
        BinaryOp::Ge => bool_number(a >= b),
        BinaryOp::And => bool_number(a != 0.0 && b != 0.0),
        BinaryOp::Or => bool_number(a != 0.0 || b != 0.0),
    };

    Ok(Value::number(n))
}

fn unary(op: UnaryOp, position: Position, value: &Value) -> Result<Value> {
    let n: f64 = value.as_number().ok_or_else(|| {
        runtime_error(
            position,
            format!(
                "一元运算'{}'的操作数必须是数字，实际为{}",
                op.symbol(),
                value.type_name()
            ),
        )
    })?;

    Ok(Value::number(match op {
        UnaryOp::Negate => -n,
        UnaryOp::Not => bool_number(n == 0.0),
    }))
}

#[inline]
fn bool_number(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

fn runtime_error<S: Into<String>>(position: Position, msg: S) -> KunyuError {
    KunyuError::runtime(position.line, position.column, msg)
}

fn scope_error(position: Position, err: ScopeError) -> KunyuError {
    runtime_error(position, err.to_string())
}

/// Best position available for an expression; literals carry none.
fn position_of(expr: &Expr) -> Position {
    match expr {
        Expr::Literal(_) => Position::default(),
        Expr::Grouping(inner) => position_of(inner),
        Expr::Variable { position, .. }
        | Expr::Binary { position, .. }
        | Expr::Unary { position, .. }
        | Expr::Call { position, .. }
        | Expr::Assign { position, .. } => *position,
    }
}

// ───────────────────────────── entry points ─────────────────────────────────

/// Tokenize, parse and run `source` on an existing interpreter.
pub fn run_source<W: Write>(interpreter: &mut Interpreter<W>, source: &str) -> Result<()> {
    let tokens = scanner::tokenize(source)?;
    let program: Program = parser::parse(&tokens)?;

    interpreter.interpret(&program)
}

/// A long‑lived evaluation context whose output is captured in memory.
pub struct Session {
    interpreter: Interpreter<Writer<BytesMut>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::with_config(InterpreterConfig::default())
    }

    pub fn with_config(config: InterpreterConfig) -> Self {
        Self {
            interpreter: Interpreter::with_config(BytesMut::new().writer(), config),
        }
    }

    /// Evaluate one source text.  Returns everything printed during this
    /// call (also on failure) together with the outcome.
    pub fn evaluate(&mut self, source: &str) -> (String, Result<()>) {
        let result: Result<()> = run_source(&mut self.interpreter, source);

        let printed: BytesMut = self.interpreter.output_mut().get_mut().split();
        let output: String = String::from_utf8_lossy(&printed).into_owned();

        (output, result)
    }

    pub fn interpreter(&self) -> &Interpreter<Writer<BytesMut>> {
        &self.interpreter
    }

    pub fn interpreter_mut(&mut self) -> &mut Interpreter<Writer<BytesMut>> {
        &mut self.interpreter
    }
}
