//! Host implementations of the standard builtins.
//!
//! Implementations may assume their arguments match the declared types; a
//! mismatch that still gets here is reported as an internal error.

use std::time::{SystemTime, UNIX_EPOCH};

use super::Registry;
use super::names::*;
use crate::error::InterpError;
use crate::value::Value;

pub(super) fn register_standard_fns(registry: &mut Registry) {
    register_arith_fns(registry);
    register_compare_fns(registry);
    register_logic_fns(registry);
    register_string_fns(registry);
    register_io_fns(registry);
    register_misc_fns(registry);
}

fn int_args(op: &str, args: &[Value]) -> Result<(i64, i64), InterpError> {
    match args {
        [Value::Int(a), Value::Int(b)] => Ok((*a, *b)),
        other => Err(InterpError::internal(format!("{op}: bad args: {other:?}"))),
    }
}

fn str_arg<'a>(op: &str, args: &'a [Value]) -> Result<&'a str, InterpError> {
    match args {
        [Value::Str(s)] => Ok(&**s),
        other => Err(InterpError::internal(format!("{op}: bad args: {other:?}"))),
    }
}

fn register_int_binop(registry: &mut Registry, name: &'static str, f: fn(i64, i64) -> i64) {
    registry.register(name, move |args, _| {
        let (a, b) = int_args(name, args)?;
        Ok(Value::Int(f(a, b)))
    });
}

fn register_arith_fns(registry: &mut Registry) {
    register_int_binop(registry, INT_ADD, i64::wrapping_add);
    register_int_binop(registry, INT_SUB, i64::wrapping_sub);
    register_int_binop(registry, INT_MUL, i64::wrapping_mul);

    registry.register(INT_DIV, |args, _| {
        let (a, b) = int_args(INT_DIV, args)?;
        if b == 0 {
            return Err(InterpError::DivisionByZero { op: INT_DIV.into() });
        }
        Ok(Value::Int(a.wrapping_div(b)))
    });
    registry.register(INT_MOD, |args, _| {
        let (a, b) = int_args(INT_MOD, args)?;
        if b == 0 {
            return Err(InterpError::DivisionByZero { op: INT_MOD.into() });
        }
        Ok(Value::Int(a.wrapping_rem(b)))
    });
}

fn register_compare_fns(registry: &mut Registry) {
    registry.register(ANY_EQ, |args, _| match args {
        [a, b] => Ok(Value::from_bool(a.ir_eq(b))),
        other => Err(InterpError::internal(format!("{ANY_EQ}: bad args: {other:?}"))),
    });
    registry.register(ANY_NEQ, |args, _| match args {
        [a, b] => Ok(Value::from_bool(!a.ir_eq(b))),
        other => Err(InterpError::internal(format!("{ANY_NEQ}: bad args: {other:?}"))),
    });

    register_int_binop(registry, INT_LT, |a, b| i64::from(a < b));
    register_int_binop(registry, INT_LEQ, |a, b| i64::from(a <= b));
    register_int_binop(registry, INT_GT, |a, b| i64::from(a > b));
    register_int_binop(registry, INT_GEQ, |a, b| i64::from(a >= b));
}

fn register_logic_fns(registry: &mut Registry) {
    // Both operands are already evaluated; there is no short-circuiting.
    register_int_binop(registry, INT_AND, |a, b| i64::from(a != 0 && b != 0));
    register_int_binop(registry, INT_OR, |a, b| i64::from(a != 0 || b != 0));
}

fn register_string_fns(registry: &mut Registry) {
    registry.register(CONCAT, |args, _| match args {
        [Value::Str(a), Value::Str(b)] => Ok(Value::from(format!("{a}{b}"))),
        other => Err(InterpError::internal(format!("{CONCAT}: bad args: {other:?}"))),
    });

    registry.register(STRING_TO_INT, |args, _| {
        let s = str_arg(STRING_TO_INT, args)?;
        parse_int(s)
            .map(Value::Int)
            .ok_or_else(|| InterpError::Conversion { input: s.to_owned() })
    });
    registry.register(CAN_CONVERT_TO_INT, |args, _| {
        let s = str_arg(CAN_CONVERT_TO_INT, args)?;
        Ok(Value::from_bool(parse_int(s).is_some()))
    });
    registry.register(INT_TO_STRING, |args, _| match args {
        [Value::Int(i)] => Ok(Value::from(i.to_string())),
        other => Err(InterpError::internal(format!(
            "{INT_TO_STRING}: bad args: {other:?}"
        ))),
    });
}

fn register_io_fns(registry: &mut Registry) {
    registry.register(PRINT, |args, console| match args {
        [value] => {
            console
                .print_line(&value.short_string())
                .map_err(|e| InterpError::Io {
                    op: PRINT.into(),
                    detail: e.to_string(),
                })?;
            Ok(Value::Null)
        }
        other => Err(InterpError::internal(format!("{PRINT}: bad args: {other:?}"))),
    });

    registry.register(READ, |_, console| match console.read_line() {
        Ok(Some(line)) => Ok(Value::from(line)),
        Ok(None) => Err(InterpError::Io {
            op: READ.into(),
            detail: "end of input".into(),
        }),
        Err(e) => Err(InterpError::Io {
            op: READ.into(),
            detail: e.to_string(),
        }),
    });
}

fn register_misc_fns(registry: &mut Registry) {
    registry.register(ARRAY_LENGTH, |args, _| match args {
        [Value::Array(a)] => Ok(Value::Int(i64::try_from(a.len()).unwrap_or(i64::MAX))),
        other => Err(InterpError::internal(format!(
            "{ARRAY_LENGTH}: bad args: {other:?}"
        ))),
    });

    registry.register(TIME, |_, _| {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| InterpError::Io {
                op: TIME.into(),
                detail: e.to_string(),
            })?;
        Ok(Value::Int(i64::try_from(now.as_nanos()).unwrap_or(i64::MAX)))
    });
}

/// Parse a decimal integer: an optional `-`, then `0` or a digit sequence
/// without leading zeros. Out-of-range values are rejected.
pub(crate) fn parse_int(s: &str) -> Option<i64> {
    let digits = s.strip_prefix('-').unwrap_or(s);
    let well_formed = match digits.as_bytes() {
        [b'0'] => true,
        [b'1'..=b'9', rest @ ..] => rest.iter().all(u8::is_ascii_digit),
        _ => false,
    };
    if well_formed { s.parse().ok() } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::standard;
    use crate::console::Console;
    use crate::error::InterpError;
    use crate::value::ArrayRef;

    fn call(name: &str, args: &[Value]) -> Result<Value, InterpError> {
        let (mut console, _) = Console::buffered("");
        standard().unwrap().call(name, args, &mut console)
    }

    fn ints(name: &str, a: i64, b: i64) -> Result<Value, InterpError> {
        call(name, &[Value::Int(a), Value::Int(b)])
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(ints(INT_ADD, 40, 2).unwrap(), Value::Int(42));
        assert_eq!(ints(INT_SUB, 40, 42).unwrap(), Value::Int(-2));
        assert_eq!(ints(INT_MUL, -6, 7).unwrap(), Value::Int(-42));
        assert_eq!(ints(INT_DIV, -7, 2).unwrap(), Value::Int(-3));
        assert_eq!(ints(INT_MOD, -7, 2).unwrap(), Value::Int(-1));
        assert_eq!(ints(INT_ADD, i64::MAX, 1).unwrap(), Value::Int(i64::MIN));
    }

    #[test]
    fn test_division_by_zero_raises() {
        for name in [INT_DIV, INT_MOD] {
            for dividend in [0, 1, -5, i64::MIN] {
                assert!(matches!(
                    ints(name, dividend, 0),
                    Err(InterpError::DivisionByZero { .. })
                ));
            }
        }
    }

    #[test]
    fn test_comparisons_and_logic() {
        assert_eq!(ints(INT_LT, 1, 2).unwrap(), Value::Int(1));
        assert_eq!(ints(INT_LEQ, 2, 2).unwrap(), Value::Int(1));
        assert_eq!(ints(INT_GT, 1, 2).unwrap(), Value::Int(0));
        assert_eq!(ints(INT_GEQ, 1, 2).unwrap(), Value::Int(0));
        assert_eq!(ints(INT_AND, 3, -1).unwrap(), Value::Int(1));
        assert_eq!(ints(INT_AND, 3, 0).unwrap(), Value::Int(0));
        assert_eq!(ints(INT_OR, 0, 0).unwrap(), Value::Int(0));
        assert_eq!(ints(INT_OR, 0, 9).unwrap(), Value::Int(1));
    }

    #[test]
    fn test_equality_semantics() {
        let a = ArrayRef::from_values(vec![Value::Int(1)]);
        let b = ArrayRef::from_values(vec![Value::Int(1)]);
        let eq = |x: Value, y: Value| call(ANY_EQ, &[x, y]).unwrap();
        assert_eq!(eq(a.clone().into(), b.into()), Value::Int(0));
        assert_eq!(eq(a.clone().into(), a.into()), Value::Int(1));
        assert_eq!(eq(Value::Int(1001), Value::Int(1001)), Value::Int(1));
        assert_eq!(eq(Value::Int(10), Value::Int(13)), Value::Int(0));
        assert_eq!(eq(Value::from("1"), Value::Int(1)), Value::Int(0));
    }

    #[test]
    fn test_conversions() {
        assert_eq!(
            call(STRING_TO_INT, &["123".into()]).unwrap(),
            Value::Int(123)
        );
        assert_eq!(
            call(STRING_TO_INT, &["-45".into()]).unwrap(),
            Value::Int(-45)
        );
        assert!(matches!(
            call(STRING_TO_INT, &["12a".into()]),
            Err(InterpError::Conversion { .. })
        ));
        assert_eq!(
            call(CAN_CONVERT_TO_INT, &["12a".into()]).unwrap(),
            Value::Int(0)
        );
        assert_eq!(
            call(CAN_CONVERT_TO_INT, &["0".into()]).unwrap(),
            Value::Int(1)
        );
        assert_eq!(
            call(INT_TO_STRING, &[Value::Int(-8)]).unwrap(),
            Value::from("-8")
        );
    }

    #[test]
    fn test_parse_int_grammar() {
        assert_eq!(parse_int("0"), Some(0));
        assert_eq!(parse_int("-0"), Some(0));
        assert_eq!(parse_int("9223372036854775807"), Some(i64::MAX));
        assert_eq!(parse_int("-9223372036854775808"), Some(i64::MIN));
        for bad in ["", "-", "007", "+1", " 1", "1 ", "9223372036854775808", "1e3"] {
            assert_eq!(parse_int(bad), None, "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_concat_and_length() {
        assert_eq!(
            call(CONCAT, &["Hello ".into(), "World".into()]).unwrap(),
            Value::from("Hello World")
        );
        let array = ArrayRef::new(11);
        assert_eq!(
            call(ARRAY_LENGTH, &[array.into()]).unwrap(),
            Value::Int(11)
        );
    }

    #[test]
    fn test_print_and_read() {
        let (mut console, output) = Console::buffered("first\r\nsecond\n");
        let builtins = standard().unwrap();
        let line = builtins.call(READ, &[], &mut console).unwrap();
        assert_eq!(line, Value::from("first"));
        let printed = builtins.call(PRINT, &[line], &mut console).unwrap();
        assert!(printed.is_null());
        builtins
            .call(PRINT, &[Value::Int(7)], &mut console)
            .unwrap();
        assert_eq!(output.contents(), "first\n7\n");

        assert_eq!(
            builtins.call(READ, &[], &mut console).unwrap(),
            Value::from("second")
        );
        assert!(matches!(
            builtins.call(READ, &[], &mut console),
            Err(InterpError::Io { .. })
        ));
    }

    #[test]
    fn test_time_is_positive() {
        assert!(call(TIME, &[]).unwrap().as_int().unwrap() > 0);
    }
}
