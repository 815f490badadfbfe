//! Plain Data Model
//!
//! [`Value`] is the dynamic value stored in and read out of targets:
//! scalars, raw containers ([`Target`]), views over containers, and refs.
//! Raw targets carry no reactive state; tracking happens only when they are
//! accessed through a [`View`](crate::proxy::View).

mod json;
mod target;

use std::sync::Arc;

pub use target::{Shape, Target, MAX_SEQUENCE_LEN};

use crate::proxy::{self, View};
use crate::reactive::{Ref, RefHandle};

/// A dynamically typed value.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    /// Absence of a value.
    #[default]
    Null,
    /// A boolean.
    Bool(bool),
    /// An integer.
    Int(i64),
    /// A floating point number.
    Float(f64),
    /// A string.
    Str(Arc<str>),
    /// A raw container.
    Object(Target),
    /// A view over a container.
    View(View),
    /// A ref-like wrapper.
    Ref(RefHandle),
}

impl Value {
    /// Whether this is `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether this is a raw container or a view over one.
    pub fn is_container(&self) -> bool {
        matches!(self, Value::Object(_) | Value::View(_))
    }

    /// Whether this is a ref-like wrapper.
    pub fn is_ref(&self) -> bool {
        matches!(self, Value::Ref(_))
    }

    /// The boolean, if this is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The integer, if this is an `Int`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Any number, widened to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// The string slice, if this is a `Str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Non-negative integers, as a sequence index or length. Integral
    /// floats such as `2.0` count.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Value::Int(i) => usize::try_from(*i).ok(),
            Value::Float(f) if f.fract() == 0.0 && *f >= 0.0 && *f <= usize::MAX as f64 => {
                Some(*f as usize)
            }
            _ => None,
        }
    }

    /// The raw container, if this is an `Object`.
    pub fn as_target(&self) -> Option<&Target> {
        match self {
            Value::Object(target) => Some(target),
            _ => None,
        }
    }

    /// The view, if this is one.
    pub fn as_view(&self) -> Option<&View> {
        match self {
            Value::View(view) => Some(view),
            _ => None,
        }
    }

    /// Consume into the view, if this is one.
    pub fn into_view(self) -> Option<View> {
        match self {
            Value::View(view) => Some(view),
            _ => None,
        }
    }

    /// The ref handle, if this is a `Ref`.
    pub fn as_ref_handle(&self) -> Option<&RefHandle> {
        match self {
            Value::Ref(handle) => Some(handle),
            _ => None,
        }
    }

    /// Strip every view layer, yielding the innermost raw form.
    pub fn to_raw(&self) -> Value {
        proxy::to_raw(self)
    }
}

/// Whether `value` differs from `old` for change-detection purposes.
///
/// Scalars compare by value, with `NaN` equal to itself and integers equal
/// to floats of the same magnitude. Containers, views and refs compare by
/// identity.
pub fn has_changed(value: &Value, old: &Value) -> bool {
    match (value, old) {
        (Value::Float(a), Value::Float(b)) => !(a == b || (a.is_nan() && b.is_nan())),
        (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 != *b,
        _ => value != old,
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<usize> for Value {
    fn from(i: usize) -> Self {
        i64::try_from(i).map_or(Value::Float(i as f64), Value::Int)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s.into())
    }
}

impl From<Target> for Value {
    fn from(target: Target) -> Self {
        Value::Object(target)
    }
}

impl From<View> for Value {
    fn from(view: View) -> Self {
        Value::View(view)
    }
}

impl From<RefHandle> for Value {
    fn from(handle: RefHandle) -> Self {
        Value::Ref(handle)
    }
}

impl From<&Ref> for Value {
    fn from(r: &Ref) -> Self {
        Value::from(r.clone())
    }
}
