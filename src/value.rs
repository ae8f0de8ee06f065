//! Reference‑counted object runtime.
//!
//! Every runtime value is a [`Value`]: a counted handle (`Rc`) to a heap
//! object holding a number, a string, a list or a dict.  Cloning a `Value`
//! is an *incref*, dropping one is a *decref*, and the object is destroyed
//! exactly once when the last handle goes away, releasing every handle it
//! holds in turn.
//!
//! Lists and dicts are mutated in place while shared; there is no
//! copy‑on‑write.  There is also no cycle collection: a list or dict that
//! (directly or indirectly) contains itself is never freed.
//!
//! A thread‑local counter tracks how many objects are alive, see
//! [`live_objects`].

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::TryReserveError;
use std::fmt;
use std::rc::Rc;

use log::debug;

thread_local! {
    static LIVE_OBJECTS: Cell<usize> = const { Cell::new(0) };
}

/// Number of heap objects currently alive on this thread.
pub fn live_objects() -> usize {
    LIVE_OBJECTS.with(Cell::get)
}

/// Ordered key/value pairs.  Only string keys compare equal (by content);
/// any other key never matches, so setting it always appends.
#[derive(Debug, Default)]
pub struct Dict {
    entries: Vec<(Value, Value)>,
}

impl Dict {
    fn position(&self, key: &Value) -> Option<usize> {
        let key: &str = key.as_str()?;

        self.entries
            .iter()
            .position(|(k, _)| k.as_str() == Some(key))
    }

    pub fn get(&self, key: &Value) -> Option<Value> {
        self.position(key).map(|i| self.entries[i].1.clone())
    }

    /// Insert or replace.  Replacing releases the old value.
    pub fn set(&mut self, key: Value, value: Value) -> Result<(), TryReserveError> {
        match self.position(&key) {
            Some(i) => {
                self.entries[i].1 = value;
            }

            None => {
                self.entries.try_reserve(1)?;
                self.entries.push((key, value));
            }
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Payload of a heap object.
#[derive(Debug)]
pub enum Object {
    Number(f64),
    String(String),
    List(RefCell<Vec<Value>>),
    Dict(RefCell<Dict>),
}

/// The allocation behind a [`Value`]; its `Drop` keeps the live counter
/// honest.
#[derive(Debug)]
struct HeapObject {
    object: Object,
}

impl HeapObject {
    fn new(object: Object) -> Self {
        LIVE_OBJECTS.with(|c| c.set(c.get() + 1));

        Self { object }
    }
}

impl Drop for HeapObject {
    /// Releases contained handles through a worklist rather than by
    /// recursion, so a long chain of nested containers cannot exhaust the
    /// stack.  A child is emptied before it drops only when this was its
    /// last handle; shared children just lose one count.
    fn drop(&mut self) {
        LIVE_OBJECTS.with(|c| c.set(c.get().saturating_sub(1)));

        let mut pending: Vec<Value> = Vec::new();
        take_children(&mut self.object, &mut pending);

        while let Some(mut value) = pending.pop() {
            if let Some(heap) = Rc::get_mut(&mut value.0) {
                take_children(&mut heap.object, &mut pending);
            }
        }
    }
}

/// Move every handle held by `object` into `pending`.
fn take_children(object: &mut Object, pending: &mut Vec<Value>) {
    match object {
        Object::List(items) => pending.append(items.get_mut()),

        Object::Dict(dict) => {
            for (key, value) in dict.get_mut().entries.drain(..) {
                pending.push(key);
                pending.push(value);
            }
        }

        Object::Number(_) | Object::String(_) => {}
    }
}

/// A strong reference to a runtime object.
#[derive(Debug, Clone)]
pub struct Value(Rc<HeapObject>);

impl Value {
    fn new(object: Object) -> Self {
        Value(Rc::new(HeapObject::new(object)))
    }

    pub fn number(n: f64) -> Self {
        Self::new(Object::Number(n))
    }

    pub fn string<S: Into<String>>(s: S) -> Self {
        Self::new(Object::String(s.into()))
    }

    pub fn list() -> Self {
        Self::new(Object::List(RefCell::new(Vec::new())))
    }

    pub fn list_from(items: Vec<Value>) -> Self {
        Self::new(Object::List(RefCell::new(items)))
    }

    pub fn dict() -> Self {
        Self::new(Object::Dict(RefCell::new(Dict::default())))
    }

    #[inline]
    pub fn object(&self) -> &Object {
        &self.0.object
    }

    /// Number of strong handles to this object.
    #[inline]
    pub fn ref_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    pub fn type_name(&self) -> &'static str {
        match self.object() {
            Object::Number(_) => "数字",
            Object::String(_) => "字符串",
            Object::List(_) => "列表",
            Object::Dict(_) => "字典",
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self.object() {
            Object::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.object() {
            Object::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(self.object(), Object::String(_))
    }

    pub fn list_ref(&self) -> Option<Ref<'_, Vec<Value>>> {
        match self.object() {
            Object::List(items) => Some(items.borrow()),
            _ => None,
        }
    }

    pub fn list_mut(&self) -> Option<RefMut<'_, Vec<Value>>> {
        match self.object() {
            Object::List(items) => Some(items.borrow_mut()),
            _ => None,
        }
    }

    pub fn dict_ref(&self) -> Option<Ref<'_, Dict>> {
        match self.object() {
            Object::Dict(dict) => Some(dict.borrow()),
            _ => None,
        }
    }

    pub fn dict_mut(&self) -> Option<RefMut<'_, Dict>> {
        match self.object() {
            Object::Dict(dict) => Some(dict.borrow_mut()),
            _ => None,
        }
    }

    /// Numbers are falsy only at zero, strings only when empty; lists and
    /// dicts are always truthy.
    pub fn is_truthy(&self) -> bool {
        let truthy: bool = match self.object() {
            Object::Number(n) => *n != 0.0,
            Object::String(s) => !s.is_empty(),
            Object::List(_) | Object::Dict(_) => true,
        };

        debug!("Truthiness of {} is {}", self, truthy);

        truthy
    }
}

/// Render a number the way `print` shows it: integral values without a
/// fractional part, everything else like C's `%g`.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 {
        if n.abs() < 1e15 {
            let mut buf: itoa::Buffer = itoa::Buffer::new();

            // `-0.0` prints as "-0", like `%.0f`.
            if n == 0.0 && n.is_sign_negative() {
                return "-0".to_string();
            }

            return buf.format(n as i64).to_owned();
        }

        return format!("{:.0}", n);
    }

    format_general(n)
}

/// `%g` with the default precision of six significant digits.
fn format_general(n: f64) -> String {
    if n.is_nan() {
        return "nan".to_string();
    }

    if n.is_infinite() {
        return if n > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    const PRECISION: i32 = 6;

    // Round to the target precision first so the exponent reflects carries
    // (e.g. 999999.5 → 1e+06).
    let sci: String = format!("{:.*e}", (PRECISION - 1) as usize, n);
    let (mantissa, exponent) = match sci.split_once('e') {
        Some(parts) => parts,
        None => return sci,
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= PRECISION {
        let sign: char = if exponent < 0 { '-' } else { '+' };

        format!(
            "{}e{}{:02}",
            trim_fraction(mantissa),
            sign,
            exponent.unsigned_abs()
        )
    } else {
        let decimals: usize = (PRECISION - 1 - exponent) as usize;

        trim_fraction(&format!("{:.*}", decimals, n)).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

impl fmt::Display for Value {
    /// Print‑form.  Containers print a summary rather than their contents,
    /// which keeps self‑referential containers printable.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.object() {
            Object::Number(n) => write!(f, "{}", format_number(*n)),

            Object::String(s) => write!(f, "{}", s),

            Object::List(items) => write!(f, "[列表，长度: {}]", items.borrow().len()),

            Object::Dict(dict) => write!(f, "[字典，大小: {}]", dict.borrow().len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_numbers_have_no_fraction() {
        assert_eq!(format_number(9.0), "9");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(1e20), "100000000000000000000");
    }

    #[test]
    fn fractional_numbers_use_general_format() {
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(0.1 + 0.2), "0.3");
        assert_eq!(format_number(1.0 / 3.0), "0.333333");
        assert_eq!(format_number(123456.75), "123457");
        assert_eq!(format_number(0.00001234), "1.234e-05");
        assert_eq!(format_number(1234567.5), "1.23457e+06");
    }

    #[test]
    fn objects_are_counted_and_released() {
        let before = live_objects();

        {
            let list = Value::list();
            let item = Value::string("a");
            list.list_mut().unwrap().push(item.clone());

            assert_eq!(item.ref_count(), 2);
            assert_eq!(live_objects(), before + 2);
        }

        assert_eq!(live_objects(), before);
    }

    #[test]
    fn nested_containers_release_recursively() {
        let before = live_objects();

        {
            let outer = Value::list();
            let inner = Value::dict();
            inner
                .dict_mut()
                .unwrap()
                .set(Value::string("k"), Value::number(1.0))
                .unwrap();
            outer.list_mut().unwrap().push(inner);
        }

        assert_eq!(live_objects(), before);
    }

    #[test]
    fn deep_chains_drop_without_recursion() {
        let before = live_objects();

        {
            let mut head = Value::list();
            for _ in 0..200_000 {
                let node = Value::dict();
                node.dict_mut()
                    .unwrap()
                    .set(Value::string("下"), head)
                    .unwrap();
                head = Value::list_from(vec![node]);
            }

            assert_eq!(live_objects(), before + 600_001);
        }

        assert_eq!(live_objects(), before);
    }

    #[test]
    fn shared_children_survive_parent_teardown() {
        let child = Value::list_from(vec![Value::number(1.0)]);

        {
            let parent = Value::list_from(vec![child.clone(), child.clone()]);
            assert_eq!(child.ref_count(), 3);
            drop(parent);
        }

        assert_eq!(child.ref_count(), 1);
        assert_eq!(child.list_ref().unwrap().len(), 1);
    }

    #[test]
    fn dict_matches_only_string_keys() {
        let dict = Value::dict();
        let mut d = dict.dict_mut().unwrap();

        d.set(Value::string("a"), Value::number(1.0)).unwrap();
        d.set(Value::string("a"), Value::number(2.0)).unwrap();
        d.set(Value::number(1.0), Value::number(3.0)).unwrap();
        d.set(Value::number(1.0), Value::number(4.0)).unwrap();

        assert_eq!(d.len(), 3);
        assert_eq!(d.get(&Value::string("a")).unwrap().as_number(), Some(2.0));
        assert!(d.get(&Value::number(1.0)).is_none());
    }

    #[test]
    fn truthiness() {
        assert!(!Value::number(0.0).is_truthy());
        assert!(Value::number(-1.0).is_truthy());
        assert!(!Value::string("").is_truthy());
        assert!(Value::string("x").is_truthy());
        assert!(Value::list().is_truthy());
        assert!(Value::dict().is_truthy());
    }
}
