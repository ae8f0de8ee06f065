//! Scope chain.
//!
//! Frames are pushed on block entry and function invocation and popped on
//! exit, strictly last‑in first‑out.  Because a call frame's parent is the
//! frame active at the call site, the chain seen from the innermost frame is
//! simply the whole stack, so the chain is stored as a `Vec` and lookups walk
//! it from the top.  Frame 0 is the global frame and is never popped.

use crate::value::Value;
use log::debug;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    #[error("未定义的变量: {0}")]
    Undefined(String),

    #[error("不能修改常量: {0}")]
    Constant(String),

    #[error("变量'{0}'已经在当前作用域中定义")]
    AlreadyDefined(String),
}

#[derive(Debug, Clone)]
struct Binding {
    value: Value,
    constant: bool,
}

#[derive(Debug, Default)]
struct Frame {
    bindings: HashMap<String, Binding>,
}

#[derive(Debug)]
pub struct Environment {
    frames: Vec<Frame>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    /// A chain holding only the global frame.
    pub fn new() -> Self {
        Environment {
            frames: vec![Frame::default()],
        }
    }

    /// Number of frames, the global one included.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn push(&mut self) {
        self.frames.push(Frame::default());
        debug!("Pushed scope, depth={}", self.frames.len());
    }

    /// Pop the innermost frame, releasing everything bound in it.
    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
            debug!("Popped scope, depth={}", self.frames.len());
        }
    }

    /// Drop every frame above the global one.
    pub fn unwind_to_global(&mut self) {
        self.frames.truncate(1);
    }

    /// Bind `name` in the innermost frame.  Shadowing an outer frame is
    /// fine; rebinding within the same frame is not.
    pub fn define(&mut self, name: &str, value: Value, constant: bool) -> Result<(), ScopeError> {
        let frame: &mut Frame = self.current_mut();

        if frame.bindings.contains_key(name) {
            return Err(ScopeError::AlreadyDefined(name.to_string()));
        }

        debug!("Defining '{}' (constant={})", name, constant);

        frame
            .bindings
            .insert(name.to_string(), Binding { value, constant });

        Ok(())
    }

    /// Resolve `name` from the innermost frame outwards.
    pub fn get(&self, name: &str) -> Result<Value, ScopeError> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.bindings.get(name))
            .map(|binding| binding.value.clone())
            .ok_or_else(|| ScopeError::Undefined(name.to_string()))
    }

    /// Replace the value of an existing binding.  Assignment never declares.
    pub fn assign(&mut self, name: &str, value: Value) -> Result<(), ScopeError> {
        let binding: &mut Binding = self
            .frames
            .iter_mut()
            .rev()
            .find_map(|frame| frame.bindings.get_mut(name))
            .ok_or_else(|| ScopeError::Undefined(name.to_string()))?;

        if binding.constant {
            return Err(ScopeError::Constant(name.to_string()));
        }

        binding.value = value;

        Ok(())
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.frames.iter().any(|f| f.bindings.contains_key(name))
    }

    /// Release every binding, global ones included.
    pub fn clear(&mut self) {
        self.frames.clear();
        self.frames.push(Frame::default());
    }

    fn current_mut(&mut self) -> &mut Frame {
        if self.frames.is_empty() {
            self.frames.push(Frame::default());
        }

        let last: usize = self.frames.len() - 1;

        &mut self.frames[last]
    }
}
