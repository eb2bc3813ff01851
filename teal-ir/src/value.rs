//! Runtime values exchanged between the interpreter and builtin operations.
//!
//! The value domain is closed: integers, immutable strings, arrays and null.
//! Arrays have reference semantics. Every holder of an [`ArrayRef`] shares the
//! same storage, so a store through one alias is visible through all others.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::InterpError;

/// The dynamic kind of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Int,
    Str,
    Array,
    Null,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueKind::Int => "int",
            ValueKind::Str => "string",
            ValueKind::Array => "array",
            ValueKind::Null => "null",
        })
    }
}

/// A runtime value.
///
/// Equality follows the language: structural for integers, strings and null,
/// identity for arrays. Two distinct arrays with the same contents are not
/// equal.
#[derive(Debug, Clone)]
pub enum Value {
    /// 64-bit signed integer. Also used for booleans (nonzero is true).
    Int(i64),
    /// Immutable text.
    Str(Rc<str>),
    /// Shared, mutable, fixed-size array.
    Array(ArrayRef),
    /// Absence of a value; the initial content of every slot.
    Null,
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Int(_) => ValueKind::Int,
            Value::Str(_) => ValueKind::Str,
            Value::Array(_) => ValueKind::Array,
            Value::Null => ValueKind::Null,
        }
    }

    /// Create a boolean in the language's encoding: `1` or `0`.
    pub fn from_bool(value: bool) -> Self {
        Value::Int(i64::from(value))
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(&**s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayRef> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Language-level equality, as used by `__builtin_any_eq`.
    pub fn ir_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Canonical short rendering used by `print`.
    pub fn short_string(&self) -> String {
        self.to_string()
    }

    fn write_short(&self, f: &mut fmt::Formatter<'_>, open: &mut Vec<*const ()>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Str(s) => f.write_str(&**s),
            Value::Null => f.write_str("null"),
            Value::Array(array) => {
                let id = array.id();
                if open.contains(&id) {
                    // The array contains itself.
                    return f.write_str("[...]");
                }
                open.push(id);
                f.write_str("[")?;
                for (i, elem) in array.0.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    elem.write_short(f, open)?;
                }
                open.pop();
                f.write_str("]")
            }
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.ir_eq(other)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_short(f, &mut Vec::new())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(Rc::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(Rc::from(value))
    }
}

impl From<ArrayRef> for Value {
    fn from(value: ArrayRef) -> Self {
        Value::Array(value)
    }
}

/// Handle to a shared array.
///
/// Cloning the handle aliases the array; it never copies the elements. The
/// array lives as long as its longest holder.
#[derive(Clone)]
pub struct ArrayRef(Rc<RefCell<Vec<Value>>>);

impl ArrayRef {
    /// Allocate an array of `len` null elements.
    pub fn new(len: usize) -> Self {
        Self::from_values(vec![Value::Null; len])
    }

    pub fn from_values(values: Vec<Value>) -> Self {
        ArrayRef(Rc::new(RefCell::new(values)))
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read element `index`, failing when it is outside `0..len`.
    pub fn get(&self, index: i64) -> Result<Value, InterpError> {
        let elems = self.0.borrow();
        let slot = checked_index(index, elems.len())?;
        Ok(elems[slot].clone())
    }

    /// Overwrite element `index`, failing when it is outside `0..len`.
    pub fn set(&self, index: i64, value: Value) -> Result<(), InterpError> {
        let mut elems = self.0.borrow_mut();
        let slot = checked_index(index, elems.len())?;
        elems[slot] = value;
        Ok(())
    }

    /// Snapshot of the current elements.
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.borrow().clone()
    }

    /// True iff both handles denote the same array instance.
    pub fn ptr_eq(&self, other: &ArrayRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn id(&self) -> *const () {
        Rc::as_ptr(&self.0).cast()
    }
}

fn checked_index(index: i64, len: usize) -> Result<usize, InterpError> {
    usize::try_from(index)
        .ok()
        .filter(|slot| *slot < len)
        .ok_or(InterpError::IndexOutOfBounds { index, len })
}

impl fmt::Debug for ArrayRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Elements are omitted so that self-referencing arrays stay printable.
        write!(f, "ArrayRef({:p}, len={})", self.id(), self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_kinds() {
        assert_eq!(Value::Int(3).kind(), ValueKind::Int);
        assert_eq!(Value::from("a").kind(), ValueKind::Str);
        assert_eq!(Value::from(ArrayRef::new(0)).kind(), ValueKind::Array);
        assert_eq!(Value::Null.kind(), ValueKind::Null);
        assert_eq!(ValueKind::Str.to_string(), "string");
    }

    #[test]
    fn test_structural_equality() {
        assert_eq!(Value::Int(42), Value::Int(42));
        assert_ne!(Value::Int(42), Value::Int(43));
        assert_eq!(Value::from("cat"), Value::from(String::from("cat")));
        assert_eq!(Value::Null, Value::Null);
        assert_ne!(Value::Int(0), Value::Null);
        assert_ne!(Value::from("1"), Value::Int(1));
    }

    #[test]
    fn test_array_identity_equality() {
        let a = ArrayRef::from_values(vec![Value::Int(1), Value::Int(2)]);
        let b = ArrayRef::from_values(vec![Value::Int(1), Value::Int(2)]);
        assert_ne!(Value::from(a.clone()), Value::from(b));
        assert_eq!(Value::from(a.clone()), Value::from(a));
    }

    #[test]
    fn test_array_aliasing() {
        let a = ArrayRef::new(3);
        let alias = Value::from(a.clone());
        a.set(1, Value::Int(7)).unwrap();
        assert_eq!(alias.as_array().unwrap().get(1).unwrap(), Value::Int(7));
        assert!(a.get(0).unwrap().is_null());
    }

    #[test]
    fn test_array_bounds() {
        let a = ArrayRef::new(2);
        assert!(matches!(
            a.get(2),
            Err(InterpError::IndexOutOfBounds { index: 2, len: 2 })
        ));
        assert!(matches!(
            a.set(-1, Value::Null),
            Err(InterpError::IndexOutOfBounds { index: -1, len: 2 })
        ));
    }

    #[test]
    fn test_short_string() {
        assert_eq!(Value::Int(-12).short_string(), "-12");
        assert_eq!(Value::from("Hello").short_string(), "Hello");
        assert_eq!(Value::Null.short_string(), "null");
        let a = ArrayRef::from_values(vec![Value::Int(1), Value::from("x"), Value::Null]);
        assert_eq!(Value::from(a).short_string(), "[1, x, null]");
    }

    #[test]
    fn test_self_referencing_array_renders() {
        let a = ArrayRef::new(2);
        a.set(0, Value::from(a.clone())).unwrap();
        assert_eq!(Value::from(a).short_string(), "[[...], null]");
    }
}
