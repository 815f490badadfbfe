//! Sequence instrumentation.
//!
//! Identity searches depend on every element, so they track the length and
//! each index before searching the raw elements. Length-mutating methods
//! run with tracking paused: the reads they perform internally must not
//! subscribe the running effect to the very keys it is writing.

use super::handlers::warn_readonly;
use super::view::{Subject, View};
use crate::graph::{Key, TrackOp};
use crate::value::{has_changed, Value};

/// `includes` treats `NaN` as equal to itself.
fn same_value_zero(a: &Value, b: &Value) -> bool {
    !has_changed(a, b)
}

/// `index_of` never matches `NaN`.
fn strict_equals(a: &Value, b: &Value) -> bool {
    let nan = |v: &Value| matches!(v, Value::Float(f) if f.is_nan());
    !nan(a) && !nan(b) && !has_changed(a, b)
}

#[derive(Clone, Copy)]
enum Search {
    Includes,
    IndexOf,
    LastIndexOf,
}

impl Search {
    fn find(self, items: &[Value], needle: &Value) -> Option<usize> {
        match self {
            Search::Includes => items.iter().position(|item| same_value_zero(item, needle)),
            Search::IndexOf => items.iter().position(|item| strict_equals(item, needle)),
            Search::LastIndexOf => items.iter().rposition(|item| strict_equals(item, needle)),
        }
    }
}

impl View {
    fn search(&self, search: Search, needle: &Value) -> Option<usize> {
        let target = match self.subject() {
            Subject::View(inner) => return inner.search(search, needle),
            Subject::Raw(target) => target,
        };
        if !target.is_sequence() {
            return None;
        }
        let items = target.values();
        if !self.is_readonly() {
            let runtime = self.runtime();
            let identity = target.identity();
            runtime.track(identity, TrackOp::Get, Key::Length);
            for index in 0..items.len() {
                runtime.track(identity, TrackOp::Get, Key::Index(index));
            }
        }
        search
            .find(&items, needle)
            .or_else(|| search.find(&items, &needle.to_raw()))
    }

    /// Whether the sequence contains `needle`. Views match their raw target.
    pub fn includes(&self, needle: impl Into<Value>) -> bool {
        self.search(Search::Includes, &needle.into()).is_some()
    }

    /// Position of the first element equal to `needle`.
    pub fn index_of(&self, needle: impl Into<Value>) -> Option<usize> {
        self.search(Search::IndexOf, &needle.into())
    }

    /// Position of the last element equal to `needle`.
    pub fn last_index_of(&self, needle: impl Into<Value>) -> Option<usize> {
        self.search(Search::LastIndexOf, &needle.into())
    }

    /// Append `values`, returning the new length.
    pub fn push<V: Into<Value>>(&self, values: impl IntoIterator<Item = V>) -> usize {
        if self.is_readonly() {
            warn_readonly(self, "push", None);
            return self.runtime().untracked(|| self.len());
        }
        self.runtime().untracked(|| {
            let mut len = self.len();
            for value in values {
                self.set(Key::Index(len), value);
                len += 1;
            }
            len
        })
    }

    /// Remove and return the last element.
    pub fn pop(&self) -> Value {
        if self.is_readonly() {
            warn_readonly(self, "pop", None);
            return Value::Null;
        }
        self.runtime().untracked(|| {
            let len = self.len();
            if len == 0 {
                return Value::Null;
            }
            let last = self.get(Key::Index(len - 1));
            self.delete(Key::Index(len - 1));
            self.set(Key::Length, len - 1);
            last
        })
    }

    /// Remove and return the first element, moving the rest down.
    pub fn shift(&self) -> Value {
        if self.is_readonly() {
            warn_readonly(self, "shift", None);
            return Value::Null;
        }
        self.runtime().untracked(|| {
            let len = self.len();
            if len == 0 {
                return Value::Null;
            }
            let first = self.get(Key::Index(0));
            for index in 1..len {
                self.set(Key::Index(index - 1), self.get(Key::Index(index)));
            }
            self.delete(Key::Index(len - 1));
            self.set(Key::Length, len - 1);
            first
        })
    }

    /// Prepend `values` in order, returning the new length.
    pub fn unshift<V: Into<Value>>(&self, values: impl IntoIterator<Item = V>) -> usize {
        if self.is_readonly() {
            warn_readonly(self, "unshift", None);
            return self.runtime().untracked(|| self.len());
        }
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.runtime().untracked(|| {
            let len = self.len();
            let count = values.len();
            for index in (0..len).rev() {
                self.set(Key::Index(index + count), self.get(Key::Index(index)));
            }
            for (index, value) in values.into_iter().enumerate() {
                self.set(Key::Index(index), value);
            }
            len + count
        })
    }
}
