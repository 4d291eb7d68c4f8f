//! Allow-listed builtin functions and the methods of text and lists.
//!
//! Everything here is pure: output and waiting (`print`, `delay`) need the
//! interpreter and are handled there.

use std::cmp::Ordering;

use super::ast::BinOp;
use super::faults::FaultReason;
use super::ops;
use super::value::{lock, new_list, ListRef, Number, RangeValue, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Print,
    Range,
    Len,
    Abs,
    Min,
    Max,
    Round,
    Sum,
    Sorted,
    Reversed,
    Int,
    Float,
    Str,
    Bool,
    List,
    Enumerate,
    Zip,
    Delay,
}

impl Builtin {
    pub const ALL: [Builtin; 18] = [
        Builtin::Print,
        Builtin::Range,
        Builtin::Len,
        Builtin::Abs,
        Builtin::Min,
        Builtin::Max,
        Builtin::Round,
        Builtin::Sum,
        Builtin::Sorted,
        Builtin::Reversed,
        Builtin::Int,
        Builtin::Float,
        Builtin::Str,
        Builtin::Bool,
        Builtin::List,
        Builtin::Enumerate,
        Builtin::Zip,
        Builtin::Delay,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Print => "print",
            Builtin::Range => "range",
            Builtin::Len => "len",
            Builtin::Abs => "abs",
            Builtin::Min => "min",
            Builtin::Max => "max",
            Builtin::Round => "round",
            Builtin::Sum => "sum",
            Builtin::Sorted => "sorted",
            Builtin::Reversed => "reversed",
            Builtin::Int => "int",
            Builtin::Float => "float",
            Builtin::Str => "str",
            Builtin::Bool => "bool",
            Builtin::List => "list",
            Builtin::Enumerate => "enumerate",
            Builtin::Zip => "zip",
            Builtin::Delay => "delay",
        }
    }
}

pub const LIST_METHODS: &[&str] = &["append", "pop", "insert", "index", "count"];
pub const STR_METHODS: &[&str] = &["upper", "lower", "strip", "split", "join", "replace"];

/// Positional and keyword arguments of one call.
#[derive(Debug, Default)]
pub struct Args {
    pub positional: Vec<Value>,
    pub keywords: Vec<(String, Value)>,
}

impl Args {
    pub fn count(&self) -> usize {
        self.positional.len() + self.keywords.len()
    }

    /// Matches the arguments against `params`, of which the first `required`
    /// must be supplied.
    pub fn bind(
        self,
        name: &str,
        params: &[&str],
        required: usize,
    ) -> Result<Vec<Option<Value>>, FaultReason> {
        let got = self.count();
        let count_error = || FaultReason::ArgumentCount {
            name: name.to_string(),
            expected: expected(required, params.len()),
            got,
        };
        if self.positional.len() > params.len() {
            return Err(count_error());
        }

        let mut slots: Vec<Option<Value>> = vec![None; params.len()];
        for (slot, value) in slots.iter_mut().zip(self.positional) {
            *slot = Some(value);
        }
        for (keyword, value) in self.keywords {
            match params.iter().position(|p| *p == keyword) {
                Some(i) if slots[i].is_none() => slots[i] = Some(value),
                Some(_) => {
                    return Err(FaultReason::Invalid(format!(
                        "'{}' got two values for '{}'",
                        name, keyword
                    )))
                }
                None => {
                    return Err(FaultReason::UnexpectedKeyword {
                        name: name.to_string(),
                        keyword,
                    })
                }
            }
        }
        if slots.iter().take(required).any(Option::is_none) {
            return Err(count_error());
        }
        Ok(slots)
    }

    /// All positional arguments, no keywords allowed.
    pub fn variadic(self, name: &str) -> Result<Vec<Value>, FaultReason> {
        if let Some((keyword, _)) = self.keywords.into_iter().next() {
            return Err(FaultReason::UnexpectedKeyword {
                name: name.to_string(),
                keyword,
            });
        }
        Ok(self.positional)
    }
}

pub fn expected(required: usize, total: usize) -> String {
    if required == total {
        total.to_string()
    } else {
        format!("{} to {}", required, total)
    }
}

fn take(slots: &mut [Option<Value>], i: usize) -> Option<Value> {
    slots.get_mut(i).and_then(Option::take)
}

fn whole_number(value: &Value, what: &str) -> Result<i64, FaultReason> {
    value.as_int().ok_or_else(|| {
        FaultReason::Invalid(format!("{} needs whole numbers, not {}", what, value.kind()))
    })
}

/// Calls a builtin that needs nothing from the interpreter.
pub fn call_pure(builtin: Builtin, args: Args, max_items: usize) -> Result<Value, FaultReason> {
    let name = builtin.name();
    match builtin {
        Builtin::Range => {
            let values = args.variadic(name)?;
            let ints = values
                .iter()
                .map(|v| whole_number(v, "range()"))
                .collect::<Result<Vec<_>, _>>()?;
            let (start, stop, step) = match ints.as_slice() {
                [stop] => (0, *stop, 1),
                [start, stop] => (*start, *stop, 1),
                [start, stop, step] => (*start, *stop, *step),
                _ => {
                    return Err(FaultReason::ArgumentCount {
                        name: name.to_string(),
                        expected: expected(1, 3),
                        got: values.len(),
                    })
                }
            };
            if step == 0 {
                return Err(FaultReason::Invalid("range() step can't be 0".to_string()));
            }
            Ok(Value::Range(RangeValue { start, stop, step }))
        }
        Builtin::Len => {
            let mut slots = args.bind(name, &["obj"], 1)?;
            match take(&mut slots, 0).unwrap_or(Value::None) {
                Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
                Value::List(list) => Ok(Value::Int(lock(&list).len() as i64)),
                Value::Range(r) => Ok(Value::Int(r.len() as i64)),
                other => Err(FaultReason::Invalid(format!("{} has no length", other.kind()))),
            }
        }
        Builtin::Abs => {
            let mut slots = args.bind(name, &["x"], 1)?;
            let value = take(&mut slots, 0).unwrap_or(Value::None);
            match value.as_number() {
                Some(Number::Int(i)) => i.checked_abs().map(Value::Int).ok_or(FaultReason::TooLarge),
                Some(Number::Float(f)) => Ok(Value::Float(f.abs())),
                None => Err(FaultReason::BadOperand {
                    op: "abs()".to_string(),
                    operand: value.kind(),
                }),
            }
        }
        Builtin::Min | Builtin::Max => {
            let values = args.variadic(name)?;
            let items = match values.len() {
                0 => {
                    return Err(FaultReason::ArgumentCount {
                        name: name.to_string(),
                        expected: "at least 1".to_string(),
                        got: 0,
                    })
                }
                1 => values[0].items(max_items)?,
                _ => values,
            };
            let wanted = if builtin == Builtin::Min {
                Ordering::Less
            } else {
                Ordering::Greater
            };
            let mut best: Option<Value> = None;
            for item in items {
                best = Some(match best {
                    None => item,
                    Some(current) => match item.compare(&current) {
                        Ok(Some(ordering)) if ordering == wanted => item,
                        Ok(_) => current,
                        Err(()) => {
                            return Err(FaultReason::TypeMismatch {
                                op: "<".to_string(),
                                left: item.kind(),
                                right: current.kind(),
                            })
                        }
                    },
                });
            }
            best.ok_or_else(|| FaultReason::Invalid(format!("{}() got an empty list", name)))
        }
        Builtin::Round => {
            let mut slots = args.bind(name, &["number", "ndigits"], 1)?;
            let number = take(&mut slots, 0).unwrap_or(Value::None);
            let digits = match take(&mut slots, 1) {
                None | Some(Value::None) => None,
                Some(d) => Some(whole_number(&d, "round()")?),
            };
            match (number.as_number(), digits) {
                (Some(Number::Int(i)), _) => Ok(Value::Int(i)),
                (Some(Number::Float(f)), None) => {
                    let rounded = f.round_ties_even();
                    if !rounded.is_finite() || rounded.abs() >= 9.2e18 {
                        return Err(FaultReason::TooLarge);
                    }
                    Ok(Value::Int(rounded as i64))
                }
                (Some(Number::Float(f)), Some(d)) => {
                    let scale = 10f64.powi(d.clamp(-308, 308) as i32);
                    Ok(Value::Float((f * scale).round_ties_even() / scale))
                }
                (None, _) => Err(FaultReason::BadOperand {
                    op: "round()".to_string(),
                    operand: number.kind(),
                }),
            }
        }
        Builtin::Sum => {
            let mut slots = args.bind(name, &["iterable", "start"], 1)?;
            let items = take(&mut slots, 0).unwrap_or(Value::None).items(max_items)?;
            let mut total = take(&mut slots, 1).unwrap_or(Value::Int(0));
            for item in items {
                total = ops::binary(BinOp::Add, &total, &item, max_items)?;
            }
            Ok(total)
        }
        Builtin::Sorted => {
            let mut slots = args.bind(name, &["iterable", "reverse"], 1)?;
            let mut items = take(&mut slots, 0).unwrap_or(Value::None).items(max_items)?;
            let reverse = take(&mut slots, 1).is_some_and(|r| r.truthy());
            let mut failure = None;
            items.sort_by(|a, b| match a.compare(b) {
                Ok(ordering) => ordering.unwrap_or(Ordering::Equal),
                Err(()) => {
                    failure.get_or_insert(FaultReason::TypeMismatch {
                        op: "<".to_string(),
                        left: a.kind(),
                        right: b.kind(),
                    });
                    Ordering::Equal
                }
            });
            if let Some(reason) = failure {
                return Err(reason);
            }
            if reverse {
                items.reverse();
            }
            Ok(new_list(items))
        }
        Builtin::Reversed => {
            let mut slots = args.bind(name, &["sequence"], 1)?;
            let mut items = take(&mut slots, 0).unwrap_or(Value::None).items(max_items)?;
            items.reverse();
            Ok(new_list(items))
        }
        Builtin::Int => {
            let mut slots = args.bind(name, &["x"], 0)?;
            match take(&mut slots, 0).unwrap_or(Value::Int(0)) {
                Value::Int(i) => Ok(Value::Int(i)),
                Value::Bool(b) => Ok(Value::Int(i64::from(b))),
                Value::Float(f) => {
                    if !f.is_finite() || f.abs() >= 9.2e18 {
                        return Err(FaultReason::Invalid(format!(
                            "can't turn {} into a whole number",
                            super::value::format_float(f)
                        )));
                    }
                    Ok(Value::Int(f.trunc() as i64))
                }
                Value::Str(s) => s.trim().parse::<i64>().map(Value::Int).map_err(|_| {
                    FaultReason::Invalid(format!("can't turn '{}' into a whole number", s))
                }),
                other => Err(FaultReason::Invalid(format!(
                    "can't turn {} into a whole number",
                    other.kind()
                ))),
            }
        }
        Builtin::Float => {
            let mut slots = args.bind(name, &["x"], 0)?;
            match take(&mut slots, 0).unwrap_or(Value::Float(0.0)) {
                Value::Str(s) => s.trim().parse::<f64>().map(Value::Float).map_err(|_| {
                    FaultReason::Invalid(format!("can't turn '{}' into a number", s))
                }),
                other => match other.as_number() {
                    Some(n) => Ok(Value::Float(n.to_f64())),
                    None => Err(FaultReason::Invalid(format!(
                        "can't turn {} into a number",
                        other.kind()
                    ))),
                },
            }
        }
        Builtin::Str => {
            let mut slots = args.bind(name, &["object"], 0)?;
            Ok(Value::Str(
                take(&mut slots, 0).map(|v| v.display()).unwrap_or_default(),
            ))
        }
        Builtin::Bool => {
            let mut slots = args.bind(name, &["x"], 0)?;
            Ok(Value::Bool(take(&mut slots, 0).is_some_and(|v| v.truthy())))
        }
        Builtin::List => {
            let mut slots = args.bind(name, &["iterable"], 0)?;
            match take(&mut slots, 0) {
                Some(value) => Ok(new_list(value.items(max_items)?)),
                None => Ok(new_list(Vec::new())),
            }
        }
        // Pairs come back as two-item lists, since there are no tuples.
        Builtin::Enumerate => {
            let mut slots = args.bind(name, &["iterable", "start"], 1)?;
            let items = take(&mut slots, 0).unwrap_or(Value::None).items(max_items)?;
            let start = match take(&mut slots, 1) {
                Some(start) => whole_number(&start, "enumerate()")?,
                None => 0,
            };
            let mut pairs = Vec::with_capacity(items.len());
            for (offset, item) in items.into_iter().enumerate() {
                let index = i64::try_from(offset)
                    .ok()
                    .and_then(|offset| start.checked_add(offset))
                    .ok_or(FaultReason::TooLarge)?;
                pairs.push(new_list(vec![Value::Int(index), item]));
            }
            Ok(new_list(pairs))
        }
        Builtin::Zip => {
            let columns = args
                .variadic(name)?
                .iter()
                .map(|value| value.items(max_items))
                .collect::<Result<Vec<_>, _>>()?;
            let rows = columns.iter().map(Vec::len).min().unwrap_or(0);
            let mut columns: Vec<_> = columns.into_iter().map(Vec::into_iter).collect();
            let mut zipped = Vec::with_capacity(rows);
            for _ in 0..rows {
                zipped.push(new_list(columns.iter_mut().filter_map(Iterator::next).collect()));
            }
            Ok(new_list(zipped))
        }
        Builtin::Print | Builtin::Delay => Err(FaultReason::Internal(format!(
            "'{}' must be called by the interpreter",
            name
        ))),
    }
}

pub fn call_list_method(
    list: &ListRef,
    method: &str,
    args: Args,
    max_items: usize,
) -> Result<Value, FaultReason> {
    match method {
        "append" => {
            let mut slots = args.bind(method, &["item"], 1)?;
            let mut items = lock(list);
            if items.len() >= max_items {
                return Err(FaultReason::TooLarge);
            }
            items.push(take(&mut slots, 0).unwrap_or(Value::None));
            Ok(Value::None)
        }
        "pop" => {
            let mut slots = args.bind(method, &["index"], 0)?;
            let index = match take(&mut slots, 0) {
                Some(v) => whole_number(&v, "pop()")?,
                None => -1,
            };
            let mut items = lock(list);
            if items.is_empty() {
                return Err(FaultReason::Invalid(
                    "can't pop from an empty list".to_string(),
                ));
            }
            match ops::resolve_index(index, items.len()) {
                Some(at) => Ok(items.remove(at)),
                None => Err(FaultReason::IndexOutOfRange {
                    index,
                    len: items.len(),
                    container: "list",
                }),
            }
        }
        "insert" => {
            let mut slots = args.bind(method, &["index", "item"], 2)?;
            let index = whole_number(&take(&mut slots, 0).unwrap_or(Value::None), "insert()")?;
            let item = take(&mut slots, 1).unwrap_or(Value::None);
            let mut items = lock(list);
            if items.len() >= max_items {
                return Err(FaultReason::TooLarge);
            }
            let len = items.len() as i64;
            let at = if index < 0 { (index + len).max(0) } else { index.min(len) };
            items.insert(at as usize, item);
            Ok(Value::None)
        }
        "index" => {
            let mut slots = args.bind(method, &["item"], 1)?;
            let item = take(&mut slots, 0).unwrap_or(Value::None);
            let items = lock(list).clone();
            items
                .iter()
                .position(|x| x.equals(&item))
                .map(|i| Value::Int(i as i64))
                .ok_or_else(|| FaultReason::Invalid(format!("{} is not in the list", item.repr())))
        }
        "count" => {
            let mut slots = args.bind(method, &["item"], 1)?;
            let item = take(&mut slots, 0).unwrap_or(Value::None);
            let items = lock(list).clone();
            Ok(Value::Int(items.iter().filter(|x| x.equals(&item)).count() as i64))
        }
        other => Err(FaultReason::UnknownMethod {
            kind: "a list",
            name: other.to_string(),
        }),
    }
}

fn text_arg(value: Option<Value>, method: &str) -> Result<String, FaultReason> {
    match value {
        Some(Value::Str(s)) => Ok(s),
        Some(other) => Err(FaultReason::Invalid(format!(
            "{}() needs text, not {}",
            method,
            other.kind()
        ))),
        None => Ok(String::new()),
    }
}

pub fn call_str_method(
    text: &str,
    method: &str,
    args: Args,
    max_items: usize,
) -> Result<Value, FaultReason> {
    match method {
        "upper" => {
            args.bind(method, &[], 0)?;
            Ok(Value::Str(text.to_uppercase()))
        }
        "lower" => {
            args.bind(method, &[], 0)?;
            Ok(Value::Str(text.to_lowercase()))
        }
        "strip" => {
            args.bind(method, &[], 0)?;
            Ok(Value::Str(text.trim().to_string()))
        }
        "split" => {
            let mut slots = args.bind(method, &["sep"], 0)?;
            let parts: Vec<Value> = match take(&mut slots, 0) {
                None | Some(Value::None) => text
                    .split_whitespace()
                    .map(|p| Value::Str(p.to_string()))
                    .collect(),
                Some(sep) => {
                    let sep = text_arg(Some(sep), method)?;
                    if sep.is_empty() {
                        return Err(FaultReason::Invalid(
                            "split() needs a separator that isn't empty".to_string(),
                        ));
                    }
                    text.split(sep.as_str())
                        .map(|p| Value::Str(p.to_string()))
                        .collect()
                }
            };
            Ok(new_list(parts))
        }
        "join" => {
            let mut slots = args.bind(method, &["iterable"], 1)?;
            let items = take(&mut slots, 0).unwrap_or(Value::None).items(max_items)?;
            let mut parts = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::Str(s) => parts.push(s),
                    other => {
                        return Err(FaultReason::Invalid(format!(
                            "join() needs a list of text, but found {}",
                            other.kind()
                        )))
                    }
                }
            }
            let joined = parts.join(text);
            if joined.len() > max_items {
                return Err(FaultReason::TooLarge);
            }
            Ok(Value::Str(joined))
        }
        "replace" => {
            let mut slots = args.bind(method, &["old", "new"], 2)?;
            let old = text_arg(take(&mut slots, 0), method)?;
            let new = text_arg(take(&mut slots, 1), method)?;
            if old.is_empty() {
                return Err(FaultReason::Invalid(
                    "replace() needs text to look for".to_string(),
                ));
            }
            let replaced = text.replace(old.as_str(), &new);
            if replaced.len() > max_items {
                return Err(FaultReason::TooLarge);
            }
            Ok(Value::Str(replaced))
        }
        other => Err(FaultReason::UnknownMethod {
            kind: "text",
            name: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: usize = 10_000;

    fn args(values: Vec<Value>) -> Args {
        Args {
            positional: values,
            keywords: Vec::new(),
        }
    }

    fn ints(values: &[i64]) -> Value {
        new_list(values.iter().copied().map(Value::Int).collect())
    }

    #[test]
    fn test_bind_reports_counts() {
        let err = args(vec![Value::Int(1), Value::Int(2)])
            .bind("set_angle", &["angle"], 1)
            .unwrap_err();
        assert_eq!(err.to_string(), "'set_angle' expects 1 argument(s) but got 2");

        let err = args(vec![]).bind("round", &["number", "ndigits"], 1).unwrap_err();
        assert_eq!(err.to_string(), "'round' expects 1 to 2 argument(s) but got 0");

        let with_keyword = Args {
            positional: vec![],
            keywords: vec![("speed".into(), Value::Int(3))],
        };
        assert!(matches!(
            with_keyword.bind("turn_left", &["angle"], 0),
            Err(FaultReason::UnexpectedKeyword { .. })
        ));
    }

    #[test]
    fn test_range_and_len() {
        let r = call_pure(Builtin::Range, args(vec![Value::Int(2), Value::Int(8), Value::Int(2)]), MAX).unwrap();
        assert_eq!(r.repr(), "range(2, 8, 2)");
        let len = call_pure(Builtin::Len, args(vec![r]), MAX).unwrap();
        assert!(matches!(len, Value::Int(3)));
        assert!(call_pure(Builtin::Range, args(vec![Value::Int(1), Value::Int(5), Value::Int(0)]), MAX).is_err());
    }

    #[test]
    fn test_aggregates() {
        assert!(matches!(call_pure(Builtin::Sum, args(vec![ints(&[1, 2, 3])]), MAX), Ok(Value::Int(6))));
        assert!(matches!(call_pure(Builtin::Max, args(vec![ints(&[4, 9, 2])]), MAX), Ok(Value::Int(9))));
        assert!(matches!(
            call_pure(Builtin::Min, args(vec![Value::Int(4), Value::Float(1.5)]), MAX),
            Ok(Value::Float(f)) if f == 1.5
        ));
        assert!(call_pure(Builtin::Max, args(vec![ints(&[])]), MAX).is_err());
        let sorted = call_pure(Builtin::Sorted, args(vec![ints(&[3, 1, 2])]), MAX).unwrap();
        assert_eq!(sorted.repr(), "[1, 2, 3]");
        let mixed = new_list(vec![Value::Int(1), Value::Str("a".into())]);
        assert!(call_pure(Builtin::Sorted, args(vec![mixed]), MAX).is_err());
    }

    #[test]
    fn test_round_uses_bankers_rounding() {
        assert!(matches!(call_pure(Builtin::Round, args(vec![Value::Float(2.5)]), MAX), Ok(Value::Int(2))));
        assert!(matches!(call_pure(Builtin::Round, args(vec![Value::Float(3.5)]), MAX), Ok(Value::Int(4))));
        let two_places = call_pure(Builtin::Round, args(vec![Value::Float(1.2345), Value::Int(2)]), MAX).unwrap();
        assert_eq!(two_places.repr(), "1.23");
    }

    #[test]
    fn test_conversions() {
        assert!(matches!(call_pure(Builtin::Int, args(vec![Value::Str(" 42 ".into())]), MAX), Ok(Value::Int(42))));
        assert!(matches!(call_pure(Builtin::Int, args(vec![Value::Float(-3.9)]), MAX), Ok(Value::Int(-3))));
        let err = call_pure(Builtin::Int, args(vec![Value::Str("abc".into())]), MAX).unwrap_err();
        assert_eq!(err.to_string(), "can't turn 'abc' into a whole number");
        assert!(matches!(call_pure(Builtin::Str, args(vec![Value::Float(2.0)]), MAX), Ok(Value::Str(s)) if s == "2.0"));
        assert!(matches!(call_pure(Builtin::Bool, args(vec![]), MAX), Ok(Value::Bool(false))));
        let chars = call_pure(Builtin::List, args(vec![Value::Str("ab".into())]), MAX).unwrap();
        assert_eq!(chars.repr(), "['a', 'b']");
    }

    #[test]
    fn test_enumerate_and_zip() {
        let letters = Value::Str("ab".into());
        let pairs = call_pure(Builtin::Enumerate, args(vec![letters.clone()]), MAX).unwrap();
        assert_eq!(pairs.repr(), "[[0, 'a'], [1, 'b']]");
        let from_ten = Args {
            positional: vec![letters],
            keywords: vec![("start".into(), Value::Int(10))],
        };
        let pairs = call_pure(Builtin::Enumerate, from_ten, MAX).unwrap();
        assert_eq!(pairs.repr(), "[[10, 'a'], [11, 'b']]");
        let overflow = args(vec![ints(&[1, 2]), Value::Int(i64::MAX)]);
        assert!(matches!(call_pure(Builtin::Enumerate, overflow, MAX), Err(FaultReason::TooLarge)));

        let zipped = call_pure(Builtin::Zip, args(vec![ints(&[1, 2, 3]), ints(&[4, 5])]), MAX).unwrap();
        assert_eq!(zipped.repr(), "[[1, 4], [2, 5]]");
        assert_eq!(call_pure(Builtin::Zip, args(vec![]), MAX).unwrap().repr(), "[]");
        assert!(matches!(
            call_pure(Builtin::Zip, args(vec![ints(&[1]), Value::Int(3)]), MAX),
            Err(FaultReason::NotIterable(_))
        ));
    }

    #[test]
    fn test_list_methods() {
        let list = ints(&[1, 2]);
        let Value::List(handle) = &list else { unreachable!() };
        call_list_method(handle, "append", args(vec![Value::Int(3)]), MAX).unwrap();
        call_list_method(handle, "insert", args(vec![Value::Int(0), Value::Int(0)]), MAX).unwrap();
        assert_eq!(list.repr(), "[0, 1, 2, 3]");
        assert!(matches!(call_list_method(handle, "pop", args(vec![]), MAX), Ok(Value::Int(3))));
        assert!(matches!(call_list_method(handle, "index", args(vec![Value::Int(2)]), MAX), Ok(Value::Int(2))));
        assert!(call_list_method(handle, "index", args(vec![Value::Int(7)]), MAX).is_err());
        assert!(matches!(call_list_method(handle, "count", args(vec![Value::Int(1)]), MAX), Ok(Value::Int(1))));
    }

    #[test]
    fn test_str_methods() {
        let upper = call_str_method("hi", "upper", args(vec![]), MAX).unwrap();
        assert_eq!(upper.display(), "HI");
        let parts = call_str_method("a,b", "split", args(vec![Value::Str(",".into())]), MAX).unwrap();
        assert_eq!(parts.repr(), "['a', 'b']");
        let joined = call_str_method("-", "join", args(vec![parts]), MAX).unwrap();
        assert_eq!(joined.display(), "a-b");
        let replaced = call_str_method(
            "left left",
            "replace",
            args(vec![Value::Str("left".into()), Value::Str("right".into())]),
            MAX,
        )
        .unwrap();
        assert_eq!(replaced.display(), "right right");
        assert!(call_str_method("x", "shout", args(vec![]), MAX).is_err());
    }
}
