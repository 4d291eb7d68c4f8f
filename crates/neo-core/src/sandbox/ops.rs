//! Operators: arithmetic, comparison, membership and indexing.

use super::ast::{BinOp, CmpOp};
use super::faults::FaultReason;
use super::value::{lock, new_list, Number, Value};

fn mismatch(op: &str, left: &Value, right: &Value) -> FaultReason {
    FaultReason::TypeMismatch {
        op: op.to_string(),
        left: left.kind(),
        right: right.kind(),
    }
}

fn repeat_count(value: &Value) -> Option<i64> {
    match value {
        Value::Int(n) => Some(*n),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

fn checked_len(unit: usize, times: i64, max_items: usize) -> Result<usize, FaultReason> {
    if unit == 0 {
        return Ok(0);
    }
    let times = usize::try_from(times.max(0)).map_err(|_| FaultReason::TooLarge)?;
    match unit.checked_mul(times) {
        Some(total) if total <= max_items => Ok(times),
        _ => Err(FaultReason::TooLarge),
    }
}

pub fn binary(op: BinOp, left: &Value, right: &Value, max_items: usize) -> Result<Value, FaultReason> {
    match (op, left, right) {
        (BinOp::Add, Value::Str(a), Value::Str(b)) => {
            if a.len() + b.len() > max_items {
                return Err(FaultReason::TooLarge);
            }
            Ok(Value::Str(format!("{}{}", a, b)))
        }
        (BinOp::Add, Value::List(a), Value::List(b)) => {
            let mut items = lock(a).clone();
            items.extend(lock(b).iter().cloned());
            if items.len() > max_items {
                return Err(FaultReason::TooLarge);
            }
            Ok(new_list(items))
        }
        (BinOp::Mul, Value::Str(s), n) | (BinOp::Mul, n, Value::Str(s)) if repeat_count(n).is_some() => {
            let times = checked_len(s.len(), repeat_count(n).unwrap_or(0), max_items)?;
            Ok(Value::Str(s.repeat(times)))
        }
        (BinOp::Mul, Value::List(list), n) | (BinOp::Mul, n, Value::List(list))
            if repeat_count(n).is_some() =>
        {
            let items = lock(list).clone();
            let times = checked_len(items.len(), repeat_count(n).unwrap_or(0), max_items)?;
            let mut repeated = Vec::with_capacity(items.len() * times);
            for _ in 0..times {
                repeated.extend(items.iter().cloned());
            }
            Ok(new_list(repeated))
        }
        _ => match (left.as_number(), right.as_number()) {
            (Some(Number::Int(a)), Some(Number::Int(b))) => int_op(op, a, b),
            (Some(a), Some(b)) => float_op(op, a.to_f64(), b.to_f64()),
            _ => Err(mismatch(op.symbol(), left, right)),
        },
    }
}

fn int_op(op: BinOp, a: i64, b: i64) -> Result<Value, FaultReason> {
    let too_large = || FaultReason::TooLarge;
    let value = match op {
        BinOp::Add => a.checked_add(b).ok_or_else(too_large)?,
        BinOp::Sub => a.checked_sub(b).ok_or_else(too_large)?,
        BinOp::Mul => a.checked_mul(b).ok_or_else(too_large)?,
        BinOp::Div => {
            if b == 0 {
                return Err(FaultReason::DivisionByZero);
            }
            return Ok(Value::Float(a as f64 / b as f64));
        }
        BinOp::FloorDiv => {
            if b == 0 {
                return Err(FaultReason::DivisionByZero);
            }
            let q = a.checked_div(b).ok_or_else(too_large)?;
            if a % b != 0 && ((a < 0) != (b < 0)) {
                q - 1
            } else {
                q
            }
        }
        BinOp::Mod => {
            if b == 0 {
                return Err(FaultReason::DivisionByZero);
            }
            let r = a.checked_rem(b).ok_or_else(too_large)?;
            if r != 0 && ((r < 0) != (b < 0)) {
                r + b
            } else {
                r
            }
        }
        BinOp::Pow => {
            if b < 0 {
                if a == 0 {
                    return Err(FaultReason::DivisionByZero);
                }
                return Ok(Value::Float((a as f64).powf(b as f64)));
            }
            let exp = u32::try_from(b).map_err(|_| FaultReason::TooLarge)?;
            a.checked_pow(exp).ok_or_else(too_large)?
        }
    };
    Ok(Value::Int(value))
}

fn float_op(op: BinOp, a: f64, b: f64) -> Result<Value, FaultReason> {
    let value = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => {
            if b == 0.0 {
                return Err(FaultReason::DivisionByZero);
            }
            a / b
        }
        BinOp::FloorDiv => {
            if b == 0.0 {
                return Err(FaultReason::DivisionByZero);
            }
            (a / b).floor()
        }
        BinOp::Mod => {
            if b == 0.0 {
                return Err(FaultReason::DivisionByZero);
            }
            let r = a % b;
            if r != 0.0 && ((r < 0.0) != (b < 0.0)) {
                r + b
            } else {
                r
            }
        }
        BinOp::Pow => {
            if a == 0.0 && b < 0.0 {
                return Err(FaultReason::DivisionByZero);
            }
            let r = a.powf(b);
            if r.is_nan() && !a.is_nan() && !b.is_nan() {
                return Err(FaultReason::Invalid(
                    "a negative number can't be raised to a fractional power".to_string(),
                ));
            }
            if r.is_infinite() && a.is_finite() && b.is_finite() {
                return Err(FaultReason::TooLarge);
            }
            r
        }
    };
    Ok(Value::Float(value))
}

pub fn negate(value: &Value) -> Result<Value, FaultReason> {
    match value.as_number() {
        Some(Number::Int(i)) => i.checked_neg().map(Value::Int).ok_or(FaultReason::TooLarge),
        Some(Number::Float(f)) => Ok(Value::Float(-f)),
        None => Err(FaultReason::BadOperand {
            op: "-".to_string(),
            operand: value.kind(),
        }),
    }
}

pub fn plus(value: &Value) -> Result<Value, FaultReason> {
    match value.as_number() {
        Some(Number::Int(i)) => Ok(Value::Int(i)),
        Some(Number::Float(f)) => Ok(Value::Float(f)),
        None => Err(FaultReason::BadOperand {
            op: "+".to_string(),
            operand: value.kind(),
        }),
    }
}

pub fn compare(op: CmpOp, left: &Value, right: &Value) -> Result<bool, FaultReason> {
    use std::cmp::Ordering::*;

    let ordered = |accept: &[std::cmp::Ordering]| match left.compare(right) {
        Ok(Some(ordering)) => Ok(accept.contains(&ordering)),
        Ok(None) => Ok(false),
        Err(()) => Err(mismatch(op.symbol(), left, right)),
    };
    match op {
        CmpOp::Eq => Ok(left.equals(right)),
        CmpOp::NotEq => Ok(!left.equals(right)),
        CmpOp::Lt => ordered(&[Less]),
        CmpOp::LtE => ordered(&[Less, Equal]),
        CmpOp::Gt => ordered(&[Greater]),
        CmpOp::GtE => ordered(&[Greater, Equal]),
        CmpOp::In => contains(right, left),
        CmpOp::NotIn => contains(right, left).map(|found| !found),
    }
}

pub fn contains(container: &Value, item: &Value) -> Result<bool, FaultReason> {
    match container {
        Value::List(list) => {
            let items = lock(list).clone();
            Ok(items.iter().any(|x| x.equals(item)))
        }
        Value::Str(text) => match item {
            Value::Str(needle) => Ok(text.contains(needle.as_str())),
            other => Err(mismatch("in", other, container)),
        },
        Value::Range(r) => Ok(item.as_int().is_some_and(|i| r.contains(i))
            || matches!(item, Value::Float(f) if f.fract() == 0.0 && r.contains(*f as i64))),
        other => Err(FaultReason::NotIterable(other.kind())),
    }
}

fn index_arg(index: &Value, container: &'static str) -> Result<i64, FaultReason> {
    index.as_int().ok_or_else(|| {
        FaultReason::Invalid(format!(
            "{} positions must be whole numbers, not {}",
            container,
            index.kind()
        ))
    })
}

/// Resolves a possibly negative index against `len`.
pub fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let resolved = if index < 0 { index + len } else { index };
    if (0..len).contains(&resolved) {
        usize::try_from(resolved).ok()
    } else {
        None
    }
}

pub fn get_item(object: &Value, index: &Value) -> Result<Value, FaultReason> {
    match object {
        Value::List(list) => {
            let i = index_arg(index, "list")?;
            let items = lock(list);
            resolve_index(i, items.len())
                .and_then(|at| items.get(at).cloned())
                .ok_or(FaultReason::IndexOutOfRange {
                    index: i,
                    len: items.len(),
                    container: "list",
                })
        }
        Value::Str(text) => {
            let i = index_arg(index, "text")?;
            let count = text.chars().count();
            resolve_index(i, count)
                .and_then(|at| text.chars().nth(at))
                .map(|c| Value::Str(c.to_string()))
                .ok_or(FaultReason::IndexOutOfRange {
                    index: i,
                    len: count,
                    container: "text",
                })
        }
        Value::Range(r) => {
            let i = index_arg(index, "range")?;
            resolve_index(i, r.len())
                .and_then(|at| r.get(at))
                .map(Value::Int)
                .ok_or(FaultReason::IndexOutOfRange {
                    index: i,
                    len: r.len(),
                    container: "range",
                })
        }
        other => Err(FaultReason::NotIndexable(other.kind())),
    }
}

pub fn set_item(object: &Value, index: &Value, value: Value) -> Result<(), FaultReason> {
    match object {
        Value::List(list) => {
            let i = index_arg(index, "list")?;
            let mut items = lock(list);
            let len = items.len();
            match resolve_index(i, len).and_then(|at| items.get_mut(at)) {
                Some(slot) => {
                    *slot = value;
                    Ok(())
                }
                None => Err(FaultReason::IndexOutOfRange {
                    index: i,
                    len,
                    container: "list",
                }),
            }
        }
        Value::Str(_) => Err(FaultReason::Invalid(
            "text can't be changed in place; build a new text instead".to_string(),
        )),
        other => Err(FaultReason::NotIndexable(other.kind())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: usize = 1_000;

    fn int(i: i64) -> Value {
        Value::Int(i)
    }

    #[test]
    fn test_python_division_semantics() {
        assert!(matches!(binary(BinOp::Div, &int(7), &int(2), MAX), Ok(Value::Float(f)) if f == 3.5));
        assert!(matches!(binary(BinOp::FloorDiv, &int(-7), &int(2), MAX), Ok(Value::Int(-4))));
        assert!(matches!(binary(BinOp::Mod, &int(-7), &int(3), MAX), Ok(Value::Int(2))));
        assert!(matches!(binary(BinOp::Mod, &int(7), &int(-3), MAX), Ok(Value::Int(-2))));
        assert_eq!(
            binary(BinOp::Div, &int(1), &int(0), MAX).unwrap_err(),
            FaultReason::DivisionByZero
        );
        assert_eq!(
            binary(BinOp::Mod, &Value::Float(1.0), &Value::Float(0.0), MAX).unwrap_err(),
            FaultReason::DivisionByZero
        );
    }

    #[test]
    fn test_overflow_is_reported() {
        assert_eq!(
            binary(BinOp::Pow, &int(2), &int(100), MAX).unwrap_err(),
            FaultReason::TooLarge
        );
        assert_eq!(binary(BinOp::Add, &int(i64::MAX), &int(1), MAX).unwrap_err(), FaultReason::TooLarge);
        assert!(matches!(binary(BinOp::Pow, &int(2), &int(-1), MAX), Ok(Value::Float(f)) if f == 0.5));
    }

    #[test]
    fn test_text_and_list_operators() {
        let joined = binary(BinOp::Add, &Value::Str("ab".into()), &Value::Str("c".into()), MAX);
        assert!(matches!(joined, Ok(Value::Str(s)) if s == "abc"));
        let repeated = binary(BinOp::Mul, &int(3), &Value::Str("-".into()), MAX);
        assert!(matches!(repeated, Ok(Value::Str(s)) if s == "---"));
        let list = binary(BinOp::Mul, &new_list(vec![int(0)]), &int(3), MAX).unwrap();
        assert_eq!(list.repr(), "[0, 0, 0]");
        assert_eq!(
            binary(BinOp::Mul, &new_list(vec![int(0)]), &int(1_000_000), MAX).unwrap_err(),
            FaultReason::TooLarge
        );
    }

    #[test]
    fn test_mismatch_message() {
        let err = binary(BinOp::Add, &Value::Str("a".into()), &int(1), MAX).unwrap_err();
        assert_eq!(err.to_string(), "can't use '+' between text and a number");
    }

    #[test]
    fn test_comparisons() {
        assert!(compare(CmpOp::Lt, &int(1), &Value::Float(1.5)).unwrap());
        assert!(compare(CmpOp::In, &int(2), &new_list(vec![int(1), int(2)])).unwrap());
        assert!(compare(CmpOp::NotIn, &Value::Str("z".into()), &Value::Str("abc".into())).unwrap());
        assert!(compare(CmpOp::Lt, &Value::Str("a".into()), &int(1)).is_err());
        assert!(compare(CmpOp::Eq, &Value::Str("a".into()), &int(1)).is_ok());
    }

    #[test]
    fn test_indexing() {
        let list = new_list(vec![int(10), int(20), int(30)]);
        assert!(matches!(get_item(&list, &int(-1)), Ok(Value::Int(30))));
        assert_eq!(
            get_item(&list, &int(5)).unwrap_err().to_string(),
            "list index 5 is out of range (the list has 3 items)"
        );
        set_item(&list, &int(0), int(99)).unwrap();
        assert_eq!(list.repr(), "[99, 20, 30]");
        assert!(set_item(&Value::Str("abc".into()), &int(0), int(1)).is_err());
        assert!(matches!(get_item(&Value::Str("abc".into()), &int(1)), Ok(Value::Str(s)) if s == "b"));
        assert!(get_item(&int(5), &int(0)).is_err());
    }
}
