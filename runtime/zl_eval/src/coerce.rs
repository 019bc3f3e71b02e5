//! Value coercion and declared-type checking.
//!
//! Scripts are stringly at the edges (attribute values arrive as text), so
//! the checks here are permissive: a value satisfies a declared type if it
//! either already has that shape or is a string that plainly reads as one.

use rust_decimal::Decimal;
use zl_ir::{unquote, Value, ValueType};

/// Does `value` satisfy the declared attribute type?
pub fn check_type(value: &Value, ty: ValueType) -> bool {
    match ty {
        ValueType::Any => true,
        ValueType::Str => matches!(value, Value::Str(_)),
        ValueType::Int => match value {
            Value::Int(_) => true,
            Value::Float(f) => f.fract() == 0.0,
            Value::Str(s) => clean(s).parse::<i64>().is_ok(),
            _ => false,
        },
        ValueType::Float => match value {
            Value::Int(_) | Value::Float(_) => true,
            Value::Str(s) => clean(s).parse::<f64>().is_ok(),
            _ => false,
        },
        ValueType::Decimal => match value {
            Value::Int(_) | Value::Float(_) | Value::Decimal(_) => true,
            Value::Str(s) => clean(s).parse::<Decimal>().is_ok(),
            _ => false,
        },
        ValueType::Bool => match value {
            Value::Bool(_) => true,
            Value::Str(s) => {
                let s = clean(s);
                s.eq_ignore_ascii_case("true")
                    || s.eq_ignore_ascii_case("false")
                    || s == "1"
                    || s == "0"
            }
            _ => false,
        },
        ValueType::List => match value {
            Value::List(_) => true,
            Value::Str(s) => {
                let s = clean(s);
                s.starts_with('[') && s.ends_with(']')
            }
            _ => false,
        },
        ValueType::Map => match value {
            Value::Map(_) => true,
            Value::Str(s) => {
                let s = clean(s);
                s.starts_with('{') && s.ends_with('}')
            }
            _ => false,
        },
    }
}

/// Parse a raw textual value into its natural [`Value`]. Integers, floats,
/// and booleans become typed; everything else stays a string.
pub fn parse_scalar(raw: &str) -> Value {
    let s = raw.trim();
    if let Ok(i) = s.parse::<i64>() {
        return Value::Int(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return Value::Float(f);
    }
    match s {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::Str(s.to_string()),
    }
}

/// Best-effort integer view of a value.
pub fn to_int(value: &Value) -> Option<i64> {
    match value {
        Value::Int(i) => Some(*i),
        Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::Str(s) => clean(s).parse().ok(),
        _ => None,
    }
}

/// Best-effort float view of a value.
pub fn to_float(value: &Value) -> Option<f64> {
    match value {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        Value::Str(s) => clean(s).parse().ok(),
        _ => None,
    }
}

/// Best-effort boolean view; strings accept true/false/1/0 case-insensitively.
pub fn to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Int(i) => Some(*i != 0),
        Value::Str(s) => {
            let s = clean(s);
            if s.eq_ignore_ascii_case("true") || s == "1" {
                Some(true)
            } else if s.eq_ignore_ascii_case("false") || s == "0" {
                Some(false)
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Strip surrounding quotes from string-shaped text, if any.
fn clean(s: &str) -> &str {
    unquote(s).unwrap_or(s).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn int_accepts_integral_forms() {
        assert!(check_type(&Value::Int(3), ValueType::Int));
        assert!(check_type(&Value::Float(3.0), ValueType::Int));
        assert!(check_type(&Value::Str("42".into()), ValueType::Int));
        assert!(check_type(&Value::Str("\"42\"".into()), ValueType::Int));
        assert!(!check_type(&Value::Float(3.5), ValueType::Int));
        assert!(!check_type(&Value::Str("hello".into()), ValueType::Int));
    }

    #[test]
    fn bool_accepts_textual_forms() {
        for ok in ["true", "False", "1", "0"] {
            assert!(check_type(&Value::Str(ok.into()), ValueType::Bool), "{ok}");
        }
        assert!(!check_type(&Value::Str("yes".into()), ValueType::Bool));
        assert!(!check_type(&Value::Int(1), ValueType::Bool));
    }

    #[test]
    fn decimal_accepts_numeric_text() {
        assert!(check_type(&Value::Str("19.99".into()), ValueType::Decimal));
        assert!(!check_type(&Value::Str("cheap".into()), ValueType::Decimal));
    }

    #[test]
    fn list_and_map_accept_bracketed_text() {
        assert!(check_type(&Value::Str("[1, 2]".into()), ValueType::List));
        assert!(check_type(&Value::Str("{\"a\": 1}".into()), ValueType::Map));
        assert!(!check_type(&Value::Str("plain".into()), ValueType::List));
    }

    #[test]
    fn any_accepts_everything() {
        assert!(check_type(&Value::Null, ValueType::Any));
        assert!(check_type(&Value::List(vec![]), ValueType::Any));
    }

    #[test]
    fn parse_scalar_types_literals() {
        assert_eq!(parse_scalar("7"), Value::Int(7));
        assert_eq!(parse_scalar("7.5"), Value::Float(7.5));
        assert_eq!(parse_scalar("true"), Value::Bool(true));
        assert_eq!(parse_scalar("seven"), Value::Str("seven".into()));
    }

    #[test]
    fn to_int_views() {
        assert_eq!(to_int(&Value::Float(4.0)), Some(4));
        assert_eq!(to_int(&Value::Str("\"8\"".into())), Some(8));
        assert_eq!(to_int(&Value::Float(4.2)), None);
    }
}
