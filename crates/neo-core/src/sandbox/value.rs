//! Runtime values of the sandbox language.

use std::cmp::Ordering;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::ast::FunctionDef;
use super::builtins::Builtin;
use super::faults::FaultReason;

/// Handle to a list. Lists are shared and mutable, like in Python.
#[derive(Debug, Clone)]
pub struct ListRef(Arc<Mutex<Vec<Value>>>);

impl ListRef {
    pub fn ptr_eq(&self, other: &ListRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn as_ptr(&self) -> *const Mutex<Vec<Value>> {
        Arc::as_ptr(&self.0)
    }
}

/// Releases nested lists from a work list instead of recursing, so a list
/// nested a million levels deep is freed without exhausting the stack.
impl Drop for ListRef {
    fn drop(&mut self) {
        let Some(items) = Arc::get_mut(&mut self.0) else {
            return;
        };
        let mut pending = std::mem::take(items.get_mut().unwrap_or_else(PoisonError::into_inner));
        while let Some(value) = pending.pop() {
            if let Value::List(mut child) = value {
                if let Some(items) = Arc::get_mut(&mut child.0) {
                    pending.append(items.get_mut().unwrap_or_else(PoisonError::into_inner));
                }
            }
        }
    }
}

pub fn new_list(items: Vec<Value>) -> Value {
    Value::List(ListRef(Arc::new(Mutex::new(items))))
}

pub fn lock(list: &ListRef) -> MutexGuard<'_, Vec<Value>> {
    list.0.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Equality, ordering and `repr` give up past this depth of nested lists.
const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(ListRef),
    Range(RangeValue),
    Function(Arc<UserFunction>),
    Builtin(Builtin),
    /// The arm facade. Carries no handle; calls are routed by the interpreter.
    Arm,
    /// A method looked up on a value, waiting to be called.
    Method(Box<Value>, String),
}

#[derive(Debug)]
pub struct UserFunction {
    pub def: Arc<FunctionDef>,
    /// Default values, evaluated once when the `def` ran.
    pub defaults: Vec<Option<Value>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeValue {
    pub start: i64,
    pub stop: i64,
    pub step: i64,
}

impl RangeValue {
    pub fn len(&self) -> usize {
        let (start, stop, step) = (
            i128::from(self.start),
            i128::from(self.stop),
            i128::from(self.step),
        );
        let count = if step > 0 && start < stop {
            (stop - start - 1) / step + 1
        } else if step < 0 && start > stop {
            (start - stop - 1) / (-step) + 1
        } else {
            0
        };
        usize::try_from(count).unwrap_or(usize::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<i64> {
        if index >= self.len() {
            return None;
        }
        let value = i128::from(self.start) + i128::from(self.step) * index as i128;
        i64::try_from(value).ok()
    }

    pub fn contains(&self, value: i64) -> bool {
        let in_bounds = if self.step > 0 {
            self.start <= value && value < self.stop
        } else {
            self.stop < value && value <= self.start
        };
        in_bounds && (i128::from(value) - i128::from(self.start)) % i128::from(self.step) == 0
    }
}

/// Numeric view of a value; `bool` counts as an integer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn to_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Range(_) => "range",
            Value::Function(_) => "function",
            Value::Builtin(_) => "builtin",
            Value::Arm => "arm",
            Value::Method(..) => "method",
        }
    }

    /// How the value is described to a student, e.g. "a number".
    pub fn kind(&self) -> &'static str {
        match self {
            Value::None => "None",
            Value::Bool(_) => "a true/false value",
            Value::Int(_) | Value::Float(_) => "a number",
            Value::Str(_) => "text",
            Value::List(_) => "a list",
            Value::Range(_) => "a range",
            Value::Function(_) | Value::Builtin(_) | Value::Method(..) => "a function",
            Value::Arm => "the arm",
        }
    }

    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Bool(b) => Some(Number::Int(i64::from(*b))),
            Value::Int(i) => Some(Number::Int(*i)),
            Value::Float(f) => Some(Number::Float(*f)),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Bool(b) => Some(i64::from(*b)),
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !lock(items).is_empty(),
            Value::Range(r) => !r.is_empty(),
            _ => true,
        }
    }

    /// `str(value)`.
    pub fn display(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            other => other.repr(),
        }
    }

    /// `repr(value)`, as echoed by the REPL.
    pub fn repr(&self) -> String {
        let mut out = String::new();
        self.write_repr(&mut out, &mut Vec::new());
        out
    }

    fn write_repr(&self, out: &mut String, open: &mut Vec<*const Mutex<Vec<Value>>>) {
        match self {
            Value::None => out.push_str("None"),
            Value::Bool(true) => out.push_str("True"),
            Value::Bool(false) => out.push_str("False"),
            Value::Int(i) => {
                let _ = write!(out, "{}", i);
            }
            Value::Float(f) => out.push_str(&format_float(*f)),
            Value::Str(s) => out.push_str(&quote(s)),
            Value::List(list) => {
                let ptr = list.as_ptr();
                if open.contains(&ptr) || open.len() > MAX_DEPTH {
                    out.push_str("[...]");
                    return;
                }
                let items = lock(list).clone();
                open.push(ptr);
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.write_repr(out, open);
                }
                out.push(']');
                open.pop();
            }
            Value::Range(r) => {
                if r.step == 1 {
                    let _ = write!(out, "range({}, {})", r.start, r.stop);
                } else {
                    let _ = write!(out, "range({}, {}, {})", r.start, r.stop, r.step);
                }
            }
            Value::Function(f) => {
                let _ = write!(out, "<function {}>", f.def.name);
            }
            Value::Builtin(b) => {
                let _ = write!(out, "<built-in function {}>", b.name());
            }
            Value::Arm => out.push_str("<arm>"),
            Value::Method(receiver, name) => {
                let _ = write!(out, "<method {} of {}>", name, receiver.type_name());
            }
        }
    }

    /// `==` as the student sees it.
    pub fn equals(&self, other: &Value) -> bool {
        self.equals_at(other, 0)
    }

    fn equals_at(&self, other: &Value, depth: usize) -> bool {
        if depth > MAX_DEPTH {
            return false;
        }
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                if a.ptr_eq(b) {
                    return true;
                }
                let a = lock(a).clone();
                let b = lock(b).clone();
                a.len() == b.len()
                    && a.iter().zip(b.iter()).all(|(x, y)| x.equals_at(y, depth + 1))
            }
            (Value::Range(a), Value::Range(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            (Value::Arm, Value::Arm) => true,
            _ => match (self.as_number(), other.as_number()) {
                (Some(Number::Int(a)), Some(Number::Int(b))) => a == b,
                (Some(a), Some(b)) => a.to_f64() == b.to_f64(),
                _ => false,
            },
        }
    }

    /// Ordering for `<`, `sorted`, `min` and `max`.
    ///
    /// `Err` means the two values can't be compared at all; `Ok(None)` means
    /// they can but are unordered (NaN).
    pub fn compare(&self, other: &Value) -> Result<Option<Ordering>, ()> {
        self.compare_at(other, 0)
    }

    fn compare_at(&self, other: &Value, depth: usize) -> Result<Option<Ordering>, ()> {
        if depth > MAX_DEPTH {
            return Err(());
        }
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => Ok(Some(a.cmp(b))),
            (Value::List(a), Value::List(b)) => {
                let a = lock(a).clone();
                let b = lock(b).clone();
                for (x, y) in a.iter().zip(b.iter()) {
                    if x.equals_at(y, depth + 1) {
                        continue;
                    }
                    return x.compare_at(y, depth + 1);
                }
                Ok(Some(a.len().cmp(&b.len())))
            }
            _ => match (self.as_number(), other.as_number()) {
                (Some(Number::Int(a)), Some(Number::Int(b))) => Ok(Some(a.cmp(&b))),
                (Some(a), Some(b)) => Ok(a.to_f64().partial_cmp(&b.to_f64())),
                _ => Err(()),
            },
        }
    }

    /// The items a `for` loop or a builtin like `sum` walks over.
    pub fn items(&self, max_items: usize) -> Result<Vec<Value>, FaultReason> {
        match self {
            Value::List(list) => Ok(lock(list).clone()),
            Value::Str(s) => Ok(s.chars().map(|c| Value::Str(c.to_string())).collect()),
            Value::Range(r) => {
                if r.len() > max_items {
                    return Err(FaultReason::TooLarge);
                }
                Ok((0..r.len()).filter_map(|i| r.get(i)).map(Value::Int).collect())
            }
            other => Err(FaultReason::NotIterable(other.kind())),
        }
    }
}

/// Formats a float the way Python's `repr` does.
pub fn format_float(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let abs = f.abs();
    if abs != 0.0 && !(1e-4..1e16).contains(&abs) {
        let text = format!("{:e}", f);
        return match text.split_once('e') {
            Some((mantissa, exp)) => {
                let (sign, digits) = match exp.strip_prefix('-') {
                    Some(d) => ('-', d),
                    None => ('+', exp),
                };
                format!("{}e{}{:0>2}", mantissa, sign, digits)
            }
            None => text,
        };
    }
    if f.fract() == 0.0 {
        format!("{:.1}", f)
    } else {
        format!("{}", f)
    }
}

fn quote(s: &str) -> String {
    let delimiter = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(delimiter);
    for c in s.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\\' => out.push_str("\\\\"),
            c if c == delimiter => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(delimiter);
    out
}
