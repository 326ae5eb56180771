/// Constant folding over statically known values.
///
/// Every function here returns `None` when the expression cannot be folded
/// (non-numeric operand, division by zero, overflow). Callers then fall back
/// to a non-constant column of the inferred type.
use std::cmp::Ordering;

use crate::sql::ast::{BinaryOp, UnaryOp};
use crate::types::{ScalarType, Value};

pub(super) fn fold_unary(op: UnaryOp, val: &Value) -> Option<Value> {
    match op {
        UnaryOp::Not => Some(match is_truthy(val) {
            None => Value::Null,
            Some(b) => Value::Integer(i64::from(!b)),
        }),
        UnaryOp::Neg => match val {
            Value::Integer(n) => n.checked_neg().map(Value::Integer),
            Value::Double(n) => Some(Value::Double(-n)),
            Value::Null => Some(Value::Null),
            Value::Text(_) => None,
        },
        UnaryOp::Plus => Some(val.clone()),
    }
}

pub(super) fn fold_binary(left: &Value, op: BinaryOp, right: &Value) -> Option<Value> {
    match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            fold_arithmetic(left, op, right)
        }
        BinaryOp::Concat => {
            if left.is_null() || right.is_null() {
                return Some(Value::Null);
            }
            Some(Value::Text(format!("{}{}", to_text(left), to_text(right))))
        }
        BinaryOp::And => Some(match (is_truthy(left), is_truthy(right)) {
            (Some(false), _) | (_, Some(false)) => Value::Integer(0),
            (Some(true), Some(true)) => Value::Integer(1),
            _ => Value::Null,
        }),
        BinaryOp::Or => Some(match (is_truthy(left), is_truthy(right)) {
            (Some(true), _) | (_, Some(true)) => Value::Integer(1),
            (Some(false), Some(false)) => Value::Integer(0),
            _ => Value::Null,
        }),
        BinaryOp::Eq
        | BinaryOp::Ne
        | BinaryOp::Lt
        | BinaryOp::Gt
        | BinaryOp::Le
        | BinaryOp::Ge => {
            if left.is_null() || right.is_null() {
                return Some(Value::Null);
            }
            let ord = value_cmp(left, right)?;
            let result = match op {
                BinaryOp::Eq => ord == Ordering::Equal,
                BinaryOp::Ne => ord != Ordering::Equal,
                BinaryOp::Lt => ord == Ordering::Less,
                BinaryOp::Gt => ord == Ordering::Greater,
                BinaryOp::Le => ord != Ordering::Greater,
                _ => ord != Ordering::Less,
            };
            Some(Value::Integer(i64::from(result)))
        }
    }
}

fn fold_arithmetic(left: &Value, op: BinaryOp, right: &Value) -> Option<Value> {
    if left.is_null() || right.is_null() {
        return Some(Value::Null);
    }

    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => {
            let result = match op {
                BinaryOp::Add => a.checked_add(*b)?,
                BinaryOp::Sub => a.checked_sub(*b)?,
                BinaryOp::Mul => a.checked_mul(*b)?,
                BinaryOp::Div => a.checked_div(*b)?,
                BinaryOp::Mod => a.checked_rem(*b)?,
                _ => return None,
            };
            Some(Value::Integer(result))
        }
        _ => {
            let (a, b) = (left.as_f64()?, right.as_f64()?);
            let result = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div if b != 0.0 => a / b,
                BinaryOp::Mod if b != 0.0 => a % b,
                _ => return None,
            };
            Some(Value::Double(result))
        }
    }
}

/// SQLite truthiness: NULL is neither true nor false.
pub(super) fn is_truthy(val: &Value) -> Option<bool> {
    match val {
        Value::Integer(n) => Some(*n != 0),
        Value::Double(n) => Some(*n != 0.0),
        Value::Text(s) => Some(leading_number(s) != 0.0),
        Value::Null => None,
    }
}

fn value_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        // Numbers sort before text
        (Value::Text(_), _) => Some(Ordering::Greater),
        (_, Value::Text(_)) => Some(Ordering::Less),
        _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
    }
}

/// Textual form used by `||` and casts to text.
pub(super) fn to_text(val: &Value) -> String {
    match val {
        Value::Double(n) if n.is_finite() && n.fract() == 0.0 => format!("{:.1}", n),
        other => other.to_string(),
    }
}

/// Longest numeric prefix of `s`, or 0, the way SQLite converts text to a number.
fn leading_number(s: &str) -> f64 {
    let s = s.trim_start();
    let mut best = 0.0;
    for (i, c) in s.char_indices() {
        if let Ok(n) = s[..i + c.len_utf8()].parse::<f64>() {
            best = n;
        } else if !matches!(c, '+' | '-' | '.' | 'e' | 'E') {
            break;
        }
    }
    best
}

/// SQLite type affinity of a declared type name.
pub(super) fn affinity(type_name: &str) -> ScalarType {
    let upper = type_name.to_ascii_uppercase();
    if upper.contains("INT") {
        ScalarType::Int
    } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
        ScalarType::String
    } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
        ScalarType::Double
    } else {
        ScalarType::Invalid
    }
}

pub(super) fn fold_cast(val: &Value, target: ScalarType) -> Option<Value> {
    if val.is_null() {
        return Some(Value::Null);
    }
    match target {
        ScalarType::Int => match val {
            Value::Integer(n) => Some(Value::Integer(*n)),
            Value::Double(n) if n.is_finite() => Some(Value::Integer(*n as i64)),
            Value::Text(s) => Some(Value::Integer(leading_number(s) as i64)),
            _ => None,
        },
        ScalarType::Double => match val {
            Value::Text(s) => Some(Value::Double(leading_number(s))),
            other => other.as_f64().map(Value::Double),
        },
        ScalarType::String => Some(Value::Text(to_text(val))),
        ScalarType::Invalid => None,
    }
}
