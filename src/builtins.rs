//! Builtin function registry.
//!
//! Builtins are looked up by name *before* user functions, so a builtin
//! always shadows a user function of the same name.  A native operation
//! receives its evaluated arguments as strong references and either
//! produces a value, produces nothing (`Ok(None)`, e.g. a dict lookup
//! miss), or fails with a [`BuiltinError`].

use std::collections::HashMap;

use log::{debug, info};
use thiserror::Error;

use crate::value::Value;

#[derive(Debug, Error)]
pub enum BuiltinError {
    #[error("需要{expected}个参数，但接收到{received}个")]
    Arity { expected: usize, received: usize },

    /// `index` is zero-based; the message counts from one.
    #[error("第{}个参数必须是{expected}，实际为{found}", .index + 1)]
    Type {
        index: usize,
        expected: &'static str,
        found: &'static str,
    },

    #[error("索引{index}超出范围，长度为{len}")]
    Index { index: f64, len: usize },

    #[error("内存分配失败: {0}")]
    Memory(#[from] std::collections::TryReserveError),
}

/// Number of arguments a builtin accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Fixed(usize),
    Any,
}

pub type NativeFn = fn(&[Value]) -> Result<Option<Value>, BuiltinError>;

#[derive(Debug, Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub arity: Arity,
    pub func: NativeFn,
}

#[derive(Debug, Clone, Default)]
pub struct Builtins {
    table: HashMap<&'static str, Builtin>,
}

impl Builtins {
    /// A registry with no builtins at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The list and dict primitives.
    pub fn standard() -> Self {
        let mut builtins: Builtins = Self::empty();

        builtins.register("创建列表", Arity::Fixed(0), list_new);
        builtins.register("列表添加", Arity::Fixed(2), list_append);
        builtins.register("列表长度", Arity::Fixed(1), list_length);
        builtins.register("列表获取", Arity::Fixed(2), list_get);
        builtins.register("列表设置", Arity::Fixed(3), list_set);

        builtins.register("创建字典", Arity::Fixed(0), dict_new);
        builtins.register("字典设置", Arity::Fixed(3), dict_set);
        builtins.register("字典获取", Arity::Fixed(2), dict_get);
        builtins.register("字典大小", Arity::Fixed(1), dict_size);

        info!("Registered {} standard builtins", builtins.table.len());

        builtins
    }

    /// Add or replace a builtin.
    pub fn register(&mut self, name: &'static str, arity: Arity, func: NativeFn) {
        debug!("Registering builtin '{}' ({:?})", name, arity);

        self.table.insert(name, Builtin { name, arity, func });
    }

    pub fn is_builtin(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Builtin> {
        self.table.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.table.keys().copied()
    }

    /// Check arity and dispatch.  `None` means `name` is not a builtin.
    pub fn call(&self, name: &str, args: &[Value]) -> Option<Result<Option<Value>, BuiltinError>> {
        let builtin: &Builtin = self.table.get(name)?;

        if let Arity::Fixed(expected) = builtin.arity {
            if args.len() != expected {
                return Some(Err(BuiltinError::Arity {
                    expected,
                    received: args.len(),
                }));
            }
        }

        debug!("Calling builtin '{}' with {} arguments", name, args.len());

        Some((builtin.func)(args))
    }
}

// ───────────────────────────── argument helpers ─────────────────────────────

fn type_error(index: usize, expected: &'static str, found: &Value) -> BuiltinError {
    BuiltinError::Type {
        index,
        expected,
        found: found.type_name(),
    }
}

fn expect_number(args: &[Value], index: usize) -> Result<f64, BuiltinError> {
    args[index]
        .as_number()
        .ok_or_else(|| type_error(index, "数字", &args[index]))
}

/// Indices are truncated towards zero; negatives never address anything.
fn expect_index(args: &[Value], index: usize, len: usize) -> Result<usize, BuiltinError> {
    let n: f64 = expect_number(args, index)?;
    let truncated: f64 = n.trunc();

    if truncated < 0.0 || truncated >= len as f64 || !truncated.is_finite() {
        return Err(BuiltinError::Index { index: n, len });
    }

    Ok(truncated as usize)
}

// ───────────────────────────── list primitives ──────────────────────────────

fn list_new(_args: &[Value]) -> Result<Option<Value>, BuiltinError> {
    Ok(Some(Value::list()))
}

fn list_append(args: &[Value]) -> Result<Option<Value>, BuiltinError> {
    let mut items = args[0]
        .list_mut()
        .ok_or_else(|| type_error(0, "列表", &args[0]))?;

    items.try_reserve(1)?;
    items.push(args[1].clone());

    Ok(Some(Value::number(1.0)))
}

fn list_length(args: &[Value]) -> Result<Option<Value>, BuiltinError> {
    let items = args[0]
        .list_ref()
        .ok_or_else(|| type_error(0, "列表", &args[0]))?;

    Ok(Some(Value::number(items.len() as f64)))
}

fn list_get(args: &[Value]) -> Result<Option<Value>, BuiltinError> {
    let items = args[0]
        .list_ref()
        .ok_or_else(|| type_error(0, "列表", &args[0]))?;
    let index: usize = expect_index(args, 1, items.len())?;

    Ok(Some(items[index].clone()))
}

fn list_set(args: &[Value]) -> Result<Option<Value>, BuiltinError> {
    // Clone the incoming value before borrowing the list mutably: the list
    // may be stored into itself.
    let value: Value = args[2].clone();

    let mut items = args[0]
        .list_mut()
        .ok_or_else(|| type_error(0, "列表", &args[0]))?;
    let index: usize = expect_index(args, 1, items.len())?;

    items[index] = value;

    Ok(Some(Value::number(1.0)))
}

// ───────────────────────────── dict primitives ──────────────────────────────

fn dict_new(_args: &[Value]) -> Result<Option<Value>, BuiltinError> {
    Ok(Some(Value::dict()))
}

fn dict_set(args: &[Value]) -> Result<Option<Value>, BuiltinError> {
    let mut dict = args[0]
        .dict_mut()
        .ok_or_else(|| type_error(0, "字典", &args[0]))?;

    dict.set(args[1].clone(), args[2].clone())?;

    Ok(Some(Value::number(1.0)))
}

fn dict_get(args: &[Value]) -> Result<Option<Value>, BuiltinError> {
    let dict = args[0]
        .dict_ref()
        .ok_or_else(|| type_error(0, "字典", &args[0]))?;

    Ok(dict.get(&args[1]))
}

fn dict_size(args: &[Value]) -> Result<Option<Value>, BuiltinError> {
    let dict = args[0]
        .dict_ref()
        .ok_or_else(|| type_error(0, "字典", &args[0]))?;

    Ok(Some(Value::number(dict.len() as f64)))
}
