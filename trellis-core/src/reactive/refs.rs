//! Ref-like values.
//!
//! A ref is a single observable slot read and written through its `value`
//! key. Views treat anything implementing [`RefLike`] as a ref: stored in a
//! record field it is transparently unwrapped on read, and a plain write to
//! that field is redirected into it.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::runtime::Runtime;
use crate::graph::{Identity, Key, ObjectId, TargetKind, TrackOp, TriggerEvent, TriggerOp};
use crate::value::{has_changed, Value};

/// Capability implemented by every ref-like wrapper.
pub trait RefLike: Send + Sync + 'static {
    /// Tracked read of the wrapped value.
    fn get_value(&self) -> Value;

    /// Write the wrapped value, triggering readers if it changed.
    fn set_value(&self, value: Value);

    /// Untracked read of the wrapped value.
    fn peek(&self) -> Value;

    /// Identity of the wrapper itself.
    fn ref_id(&self) -> ObjectId;
}

/// Type-erased ref stored inside a [`Value`].
#[derive(Clone)]
pub struct RefHandle(Arc<dyn RefLike>);

impl RefHandle {
    /// Erase a ref-like value.
    pub fn new(inner: impl RefLike) -> Self {
        Self(Arc::new(inner))
    }

    /// Tracked read.
    pub fn get(&self) -> Value {
        self.0.get_value()
    }

    /// Write through to the wrapped ref.
    pub fn set(&self, value: impl Into<Value>) {
        self.0.set_value(value.into());
    }

    /// Untracked read.
    pub fn peek(&self) -> Value {
        self.0.peek()
    }

    /// Identity of the wrapped ref.
    pub fn id(&self) -> ObjectId {
        self.0.ref_id()
    }
}

impl PartialEq for RefHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl fmt::Debug for RefHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ref({})", self.id())
    }
}

struct RefInner {
    identity: Identity,
    runtime: Runtime,
    raw: RwLock<Value>,
}

/// A minimal observable box.
///
/// Containers stored in a ref are handed out as reactive views; the ref
/// itself keeps the raw form.
#[derive(Clone)]
pub struct Ref {
    inner: Arc<RefInner>,
}

impl Ref {
    /// Create a ref on the current thread's runtime.
    pub fn new(value: impl Into<Value>) -> Self {
        Self::new_in(Runtime::current(), value)
    }

    /// Create a ref on `runtime`.
    pub fn new_in(runtime: Runtime, value: impl Into<Value>) -> Self {
        Self {
            inner: Arc::new(RefInner {
                identity: Identity::new(),
                raw: RwLock::new(value.into().to_raw()),
                runtime,
            }),
        }
    }

    /// Tracked read.
    pub fn get(&self) -> Value {
        let inner = &self.inner;
        inner.runtime.track(&inner.identity, TrackOp::Get, Key::Value);
        let raw = inner.raw.read().clone();
        if raw.is_container() {
            inner.runtime.reactive(raw)
        } else {
            raw
        }
    }

    /// Write; readers re-run only if the raw value actually changed.
    pub fn set(&self, value: impl Into<Value>) {
        let inner = &self.inner;
        let value = value.into().to_raw();
        let old = {
            let mut raw = inner.raw.write();
            if !has_changed(&value, &raw) {
                return;
            }
            std::mem::replace(&mut *raw, value.clone())
        };
        inner.runtime.trigger(
            &inner.identity,
            TargetKind::Record,
            TriggerEvent::new(TriggerOp::Set, Key::Value)
                .with_new(value)
                .with_old(old),
        );
    }

    /// Untracked read of the raw value.
    pub fn peek(&self) -> Value {
        self.inner.raw.read().clone()
    }

    /// Object id of this ref.
    pub fn id(&self) -> ObjectId {
        self.inner.identity.id()
    }

    /// Identity under which readers track this ref.
    pub fn identity(&self) -> &Identity {
        &self.inner.identity
    }
}

impl RefLike for Ref {
    fn get_value(&self) -> Value {
        self.get()
    }

    fn set_value(&self, value: Value) {
        self.set(value);
    }

    fn peek(&self) -> Value {
        Ref::peek(self)
    }

    fn ref_id(&self) -> ObjectId {
        self.id()
    }
}

impl fmt::Debug for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ref")
            .field("id", &self.id())
            .field("value", &self.peek())
            .finish()
    }
}

impl From<Ref> for Value {
    fn from(r: Ref) -> Self {
        Value::Ref(RefHandle::new(r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::effect;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[test]
    fn ref_triggers_on_change_only() {
        let count = Ref::new(0);
        let runs = Arc::new(AtomicI32::new(0));

        let _effect = {
            let (count, runs) = (count.clone(), runs.clone());
            effect(move || {
                count.get();
                runs.fetch_add(1, Ordering::SeqCst);
            })
        };

        count.set(1);
        count.set(1);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(count.peek(), Value::Int(1));
    }

    #[test]
    fn ref_hands_out_reactive_containers() {
        let state = Ref::new(serde_json::json!({ "a": 1 }));
        let value = state.get();
        assert!(value.as_view().is_some_and(|view| view.is_reactive()));
        assert!(state.peek().as_target().is_some());
    }

    #[test]
    fn handles_compare_by_identity() {
        let a = Ref::new(1);
        let first = RefHandle::new(a.clone());
        let second = RefHandle::new(a);
        let other = RefHandle::new(Ref::new(1));
        assert_eq!(first, second);
        assert_ne!(first, other);
    }
}
