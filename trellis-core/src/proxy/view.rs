//! The observable wrapper type.

use std::fmt;
use std::sync::Arc;

use super::flavor::Flavor;
use crate::graph::{Identity, Key, ObjectId};
use crate::reactive::Runtime;
use crate::value::{Target, Value};

/// What a view wraps: a raw target, or (for readonly views over reactive
/// ones) another view.
pub(crate) enum Subject {
    Raw(Target),
    View(View),
}

impl Subject {
    pub(crate) fn id(&self) -> ObjectId {
        match self {
            Subject::Raw(target) => target.id(),
            Subject::View(view) => view.id(),
        }
    }
}

pub(crate) struct ViewInner {
    identity: Identity,
    subject: Subject,
    flavor: Flavor,
    runtime: Runtime,
}

/// An observable façade over a [`Target`].
///
/// Every access is dispatched through the [`ProxyHandler`] of the view's
/// [`Flavor`]. Views are created through
/// [`reactive`](crate::proxy::reactive) and friends; at most one live view
/// exists per (subject, flavor) pair.
///
/// [`ProxyHandler`]: super::ProxyHandler
#[derive(Clone)]
pub struct View {
    inner: Arc<ViewInner>,
}

impl View {
    pub(crate) fn new(runtime: Runtime, subject: Subject, flavor: Flavor) -> Self {
        Self {
            inner: Arc::new(ViewInner {
                identity: Identity::new(),
                subject,
                flavor,
                runtime,
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<ViewInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> std::sync::Weak<ViewInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn subject(&self) -> &Subject {
        &self.inner.subject
    }

    fn normalize(&self, key: impl Into<Key>) -> Key {
        key.into().normalize(self.is_sequence())
    }

    /// Read a property.
    ///
    /// Missing keys read as `Null`. Sequences understand `"length"` and
    /// decimal string indices.
    pub fn get(&self, key: impl Into<Key>) -> Value {
        let key = self.normalize(key);
        self.inner.flavor.handler().get(self, key)
    }

    /// Write a property. Returns whether the write was accepted.
    pub fn set(&self, key: impl Into<Key>, value: impl Into<Value>) -> bool {
        let key = self.normalize(key);
        self.inner.flavor.handler().set(self, key, value.into())
    }

    /// Delete a property. Returns whether the delete was accepted.
    pub fn delete(&self, key: impl Into<Key>) -> bool {
        let key = self.normalize(key);
        self.inner.flavor.handler().delete_property(self, key)
    }

    /// Whether a property is present. Tracked as a membership read.
    pub fn has(&self, key: impl Into<Key>) -> bool {
        let key = self.normalize(key);
        self.inner.flavor.handler().has(self, key)
    }

    /// Field names of a record, indices of a sequence.
    pub fn keys(&self) -> Vec<Key> {
        self.inner.flavor.handler().own_keys(self)
    }

    /// Length of a sequence or field count of a record.
    pub fn len(&self) -> usize {
        if self.is_sequence() {
            self.get(Key::Length).as_index().unwrap_or(0)
        } else {
            self.keys().len()
        }
    }

    /// Whether [`len`](Self::len) is zero.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the values, read through this view.
    pub fn values(&self) -> Vec<Value> {
        self.keys().into_iter().map(|key| self.get(key)).collect()
    }

    /// Snapshot of the entries, read through this view.
    pub fn entries(&self) -> Vec<(Key, Value)> {
        self.keys()
            .into_iter()
            .map(|key| {
                let value = self.get(key.clone());
                (key, value)
            })
            .collect()
    }

    /// Object id of the view itself, distinct from its target's.
    pub fn id(&self) -> ObjectId {
        self.inner.identity.id()
    }

    /// Readonly and shallow flags of this view.
    pub fn flavor(&self) -> Flavor {
        self.inner.flavor
    }

    /// Whether this is a mutable reactive view. A readonly view answers for
    /// the view it wraps.
    pub fn is_reactive(&self) -> bool {
        if self.inner.flavor.readonly {
            match &self.inner.subject {
                Subject::View(inner) => inner.is_reactive(),
                Subject::Raw(_) => false,
            }
        } else {
            true
        }
    }

    /// Whether writes through this view are refused.
    pub fn is_readonly(&self) -> bool {
        self.inner.flavor.readonly
    }

    /// Whether nested containers are returned unwrapped.
    pub fn is_shallow(&self) -> bool {
        self.inner.flavor.shallow
    }

    /// Whether the underlying target is a sequence.
    pub fn is_sequence(&self) -> bool {
        match &self.inner.subject {
            Subject::Raw(target) => target.is_sequence(),
            Subject::View(inner) => inner.is_sequence(),
        }
    }

    /// The wrapped subject, one layer down.
    ///
    /// Only answered by the view registered for its subject and flavor.
    pub fn raw(&self) -> Option<Value> {
        if !self.is_canonical() {
            return None;
        }
        Some(match &self.inner.subject {
            Subject::Raw(target) => Value::Object(target.clone()),
            Subject::View(inner) => Value::View(inner.clone()),
        })
    }

    /// The innermost raw target, through every layer.
    pub fn to_raw_target(&self) -> Target {
        match &self.inner.subject {
            Subject::Raw(target) => target.clone(),
            Subject::View(inner) => inner.to_raw_target(),
        }
    }

    /// The runtime this view tracks and triggers in.
    pub fn runtime(&self) -> &Runtime {
        &self.inner.runtime
    }

    /// Whether both handles are the same view.
    pub fn ptr_eq(&self, other: &View) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Whether the registry maps this view's subject and flavor to this view.
    /// Views built outside the registry answer `false`.
    pub(crate) fn is_canonical(&self) -> bool {
        self.inner
            .runtime
            .registry()
            .lookup(self.inner.flavor, self.inner.subject.id())
            .is_some_and(|view| view.ptr_eq(self))
    }
}

impl PartialEq for View {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for View {}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("id", &self.id())
            .field("flavor", &self.inner.flavor)
            .field("target", &self.to_raw_target().id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::EffectOptions;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[test]
    fn readonly_over_reactive_reports_both() {
        let runtime = Runtime::new();
        let target = Target::record();
        let reactive = runtime.reactive(target.clone());
        let readonly = runtime.readonly(reactive.clone()).into_view().unwrap();

        assert!(readonly.is_readonly());
        assert!(readonly.is_reactive());
        assert_eq!(readonly.raw(), Some(reactive));
        assert_eq!(readonly.to_raw_target(), target);
    }

    #[test]
    fn sequence_len_reads_through_view() {
        let runtime = Runtime::new();
        let view = runtime
            .reactive(Target::from_values([1, 2, 3]))
            .into_view()
            .unwrap();
        assert_eq!(view.len(), 3);
        assert_eq!(view.get("length"), Value::Int(3));
        assert_eq!(view.get("1"), Value::Int(2));
        assert_eq!(view.keys(), vec![Key::Index(0), Key::Index(1), Key::Index(2)]);
    }

    #[test]
    fn entries_follow_insertion_order() {
        let runtime = Runtime::new();
        let view = runtime
            .reactive(Target::from_entries([("b", 1), ("a", 2)]))
            .into_view()
            .unwrap();
        assert!(view.set("c", 3));
        assert_eq!(
            view.entries(),
            vec![
                (Key::from("b"), Value::Int(1)),
                (Key::from("a"), Value::Int(2)),
                (Key::from("c"), Value::Int(3)),
            ]
        );
        assert!(view.delete("b"));
        assert!(!view.has("b"));
    }

    #[test]
    fn unregistered_view_neither_triggers_nor_unwraps() {
        let runtime = Runtime::new();
        let target = Target::from_entries([("a", 1)]);
        let registered = runtime.reactive(target.clone()).into_view().unwrap();
        let detached = View::new(
            runtime.clone(),
            Subject::Raw(target.clone()),
            Flavor::REACTIVE,
        );

        let runs = Arc::new(AtomicI32::new(0));
        let _effect = {
            let (registered, runs) = (registered.clone(), runs.clone());
            runtime.effect(
                move || {
                    registered.get("a");
                    runs.fetch_add(1, Ordering::SeqCst);
                },
                EffectOptions::new(),
            )
        };

        assert!(detached.set("a", 2));
        assert_eq!(target.get("a"), Some(Value::Int(2)));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(!detached.is_canonical());
        assert_eq!(detached.raw(), None);

        assert!(registered.set("a", 3));
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn oversized_sequence_write_is_refused_without_trigger() {
        let runtime = Runtime::new();
        let view = runtime
            .reactive(Target::from_values([1, 2]))
            .into_view()
            .unwrap();

        let runs = Arc::new(AtomicI32::new(0));
        let _effect = {
            let (view, runs) = (view.clone(), runs.clone());
            runtime.effect(
                move || {
                    view.len();
                    runs.fetch_add(1, Ordering::SeqCst);
                },
                EffectOptions::new(),
            )
        };

        assert!(!view.set(usize::MAX, 1));
        assert!(!view.set("length", i64::MAX));
        assert_eq!(view.len(), 2);
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        assert!(view.set("length", 1.0));
        assert_eq!(view.len(), 1);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }
}
