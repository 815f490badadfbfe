//! Computed Implementation
//!
//! A computed value is a cached derivation that re-evaluates only when
//! something it read has changed.
//!
//! # How Computed Values Work
//!
//! 1. Construction creates a lazy effect around the derivation; nothing runs.
//!
//! 2. The first read runs the effect, caches the result and marks the value
//!    clean.
//!
//! 3. When a dependency changes, the effect's scheduler marks the value
//!    dirty and announces a change on the computed's own `value` key. Only
//!    the first invalidation after a clean read is announced; further ones
//!    collapse into it.
//!
//! 4. The next read re-derives. Every read, fresh or cached, tracks the
//!    computed's `value` key, so whoever reads a computed inside an effect
//!    becomes a transitive subscriber.
//!
//! # Why This Matters
//!
//! - A field changes
//! - 10 computed values depend on it
//! - Only the ones actually read again will recompute
//! - The others stay dirty (no wasted work)

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{trace, warn};

use super::effect::{EffectOptions, ReactiveEffect};
use super::refs::{RefHandle, RefLike};
use super::runtime::Runtime;
use crate::graph::{Identity, Key, ObjectId, TargetKind, TrackOp, TriggerEvent, TriggerOp};
use crate::value::Value;

type Getter<T> = Arc<dyn Fn() -> T + Send + Sync>;
type Setter<T> = Box<dyn Fn(T) + Send + Sync>;

/// Freshness of a computed value's cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputedState {
    /// The cached value is up-to-date.
    Clean,

    /// A dependency changed since the last derivation.
    Dirty,
}

struct ComputedInner<T> {
    identity: Identity,
    runtime: Runtime,
    getter: Getter<T>,
    setter: Option<Setter<T>>,
    cache: Arc<Mutex<Option<T>>>,
    dirty: AtomicBool,
    effect: ReactiveEffect,
}

impl<T> ComputedInner<T> {
    /// Scheduler body: dirty the cache once and tell our own readers.
    fn invalidate(&self) {
        if !self.dirty.swap(true, Ordering::AcqRel) {
            trace!(computed = %self.identity.id(), "invalidated");
            self.runtime.trigger(
                &self.identity,
                TargetKind::Record,
                TriggerEvent::new(TriggerOp::Set, Key::Value),
            );
        }
    }
}

/// A cached derived value that recomputes only when dependencies change.
///
/// # Example
///
/// ```rust,ignore
/// let state = reactive(json!({ "a": 1, "b": 2 })).into_view().unwrap();
/// let sum = computed(move || {
///     state.get("a").as_i64().unwrap_or(0) + state.get("b").as_i64().unwrap_or(0)
/// });
///
/// assert_eq!(sum.get(), 3);
/// ```
pub struct Computed<T> {
    inner: Arc<ComputedInner<T>>,
}

impl<T> Computed<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn build(runtime: Runtime, getter: Getter<T>, setter: Option<Setter<T>>) -> Self {
        let cache: Arc<Mutex<Option<T>>> = Arc::new(Mutex::new(None));

        let inner = Arc::new_cyclic(|weak: &Weak<ComputedInner<T>>| {
            let derive = {
                let getter = Arc::clone(&getter);
                let cache = Arc::clone(&cache);
                move || {
                    let value = getter();
                    *cache.lock() = Some(value);
                }
            };
            let weak = weak.clone();
            let options = EffectOptions::new().lazy().scheduler(move |_| {
                if let Some(inner) = weak.upgrade() {
                    inner.invalidate();
                }
            });

            ComputedInner {
                identity: Identity::new(),
                effect: runtime.effect(derive, options),
                runtime: runtime.clone(),
                getter,
                setter,
                cache,
                dirty: AtomicBool::new(true),
            }
        });

        Self { inner }
    }

    /// Read the value, re-deriving first if it is dirty.
    pub fn get(&self) -> T {
        let inner = &self.inner;
        if inner.dirty.load(Ordering::Acquire) {
            inner.effect.run();
            inner.dirty.store(false, Ordering::Release);
        }
        inner
            .runtime
            .track(&inner.identity, TrackOp::Get, Key::Value);

        let cached = inner.cache.lock().clone();
        match cached {
            Some(value) => value,
            // Only reachable when the effect was stopped before its first run.
            None => inner.runtime.untracked(|| (inner.getter)()),
        }
    }

    /// Forward a write to the setter. Without one the write is discarded.
    pub fn set(&self, value: T) {
        match &self.inner.setter {
            Some(setter) => setter(value),
            None => {
                if self.inner.runtime.config().should_warn() {
                    warn!(computed = %self.id(), "write discarded: computed value has no setter");
                }
            }
        }
    }

    /// Whether a setter was supplied.
    pub fn is_writable(&self) -> bool {
        self.inner.setter.is_some()
    }

    /// Whether the next read will re-derive.
    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.load(Ordering::Acquire)
    }

    /// Get the current dirty state.
    pub fn state(&self) -> ComputedState {
        if self.is_dirty() {
            ComputedState::Dirty
        } else {
            ComputedState::Clean
        }
    }

    /// The effect performing the derivation.
    pub fn effect(&self) -> &ReactiveEffect {
        &self.inner.effect
    }

    /// Stop re-deriving. Reads keep returning the last cached value.
    pub fn stop(&self) {
        self.inner.effect.stop();
    }

    /// Identity under which readers track this value.
    pub fn identity(&self) -> &Identity {
        &self.inner.identity
    }

    /// Object id of this computed value.
    pub fn id(&self) -> ObjectId {
        self.inner.identity.id()
    }
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("id", &self.inner.identity.id())
            .field("dirty", &self.inner.dirty.load(Ordering::Acquire))
            .field("writable", &self.inner.setter.is_some())
            .finish()
    }
}

impl RefLike for Computed<Value> {
    fn get_value(&self) -> Value {
        self.get()
    }

    fn set_value(&self, value: Value) {
        self.set(value);
    }

    fn peek(&self) -> Value {
        self.inner.runtime.untracked(|| self.get())
    }

    fn ref_id(&self) -> ObjectId {
        self.id()
    }
}

impl From<Computed<Value>> for Value {
    fn from(computed: Computed<Value>) -> Self {
        Value::Ref(RefHandle::new(computed))
    }
}

impl Runtime {
    /// Create a readonly computed value in this runtime.
    pub fn computed<T, F>(&self, getter: F) -> Computed<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Computed::build(self.clone(), Arc::new(getter), None)
    }

    /// Create a computed value whose writes go to `setter`.
    pub fn writable_computed<T, G, S>(&self, getter: G, setter: S) -> Computed<T>
    where
        T: Clone + Send + Sync + 'static,
        G: Fn() -> T + Send + Sync + 'static,
        S: Fn(T) + Send + Sync + 'static,
    {
        Computed::build(self.clone(), Arc::new(getter), Some(Box::new(setter)))
    }
}

/// Create a readonly computed value on the current thread's runtime.
pub fn computed<T, F>(getter: F) -> Computed<T>
where
    T: Clone + Send + Sync + 'static,
    F: Fn() -> T + Send + Sync + 'static,
{
    Runtime::current().computed(getter)
}

/// Create a writable computed value on the current thread's runtime.
pub fn writable_computed<T, G, S>(getter: G, setter: S) -> Computed<T>
where
    T: Clone + Send + Sync + 'static,
    G: Fn() -> T + Send + Sync + 'static,
    S: Fn(T) + Send + Sync + 'static,
{
    Runtime::current().writable_computed(getter, setter)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{effect_with, EffectOptions, Ref};
    use std::sync::atomic::AtomicI32;

    #[test]
    fn computed_is_lazy() {
        let call_count = Arc::new(AtomicI32::new(0));
        let call_count_clone = call_count.clone();

        let value = computed(move || {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
            42
        });

        assert_eq!(call_count.load(Ordering::SeqCst), 0);
        assert_eq!(value.state(), ComputedState::Dirty);

        assert_eq!(value.get(), 42);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert_eq!(value.state(), ComputedState::Clean);
    }

    #[test]
    fn computed_caches_value_when_clean() {
        let call_count = Arc::new(AtomicI32::new(0));
        let call_count_clone = call_count.clone();

        let value = computed(move || {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
            42
        });

        assert_eq!(value.get(), 42);
        assert_eq!(value.get(), 42);
        assert_eq!(value.get(), 42);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn invalidations_collapse_until_next_read() {
        let source = Ref::new(1);
        let call_count = Arc::new(AtomicI32::new(0));

        let doubled = {
            let (source, call_count) = (source.clone(), call_count.clone());
            computed(move || {
                call_count.fetch_add(1, Ordering::SeqCst);
                source.get().as_i64().unwrap_or(0) * 2
            })
        };

        assert_eq!(doubled.get(), 2);
        source.set(2);
        source.set(3);
        source.set(4);
        assert!(doubled.is_dirty());
        assert_eq!(call_count.load(Ordering::SeqCst), 1);

        assert_eq!(doubled.get(), 8);
        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn repeated_invalidation_notifies_downstream_once() {
        let source = Ref::new(1);
        let notifications = Arc::new(AtomicI32::new(0));

        let doubled = {
            let source = source.clone();
            computed(move || source.get().as_i64().unwrap_or(0) * 2)
        };
        let _watcher = {
            let (doubled, notifications) = (doubled.clone(), notifications.clone());
            effect_with(
                move || {
                    doubled.get();
                },
                EffectOptions::new().scheduler(move |_| {
                    notifications.fetch_add(1, Ordering::SeqCst);
                }),
            )
        };

        source.set(2);
        source.set(3);
        source.set(4);
        assert_eq!(notifications.load(Ordering::SeqCst), 1);

        assert_eq!(doubled.get(), 8);
        source.set(5);
        assert_eq!(notifications.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn computed_depends_on_computed() {
        let base = Ref::new(5);
        let doubled = {
            let base = base.clone();
            computed(move || base.get().as_i64().unwrap_or(0) * 2)
        };
        let plus_ten = {
            let doubled = doubled.clone();
            computed(move || doubled.get() + 10)
        };

        assert_eq!(plus_ten.get(), 20);

        base.set(10);
        assert!(doubled.is_dirty());
        assert!(plus_ten.is_dirty());
        assert_eq!(plus_ten.get(), 30);
    }

    #[test]
    fn writable_computed_forwards_to_setter() {
        let source = Ref::new(1);
        let plus_one = {
            let (read, write) = (source.clone(), source.clone());
            writable_computed(
                move || read.get().as_i64().unwrap_or(0) + 1,
                move |value: i64| write.set(value - 1),
            )
        };

        assert!(plus_one.is_writable());
        plus_one.set(10);
        assert_eq!(source.get(), Value::Int(9));
        assert_eq!(plus_one.get(), 10);
    }

    #[test]
    fn write_without_setter_is_discarded() {
        let value = computed(|| 1);
        value.set(5);
        assert!(!value.is_writable());
        assert_eq!(value.get(), 1);
    }

    #[test]
    fn stopped_computed_keeps_last_value() {
        let source = Ref::new(1);
        let mirror = {
            let source = source.clone();
            computed(move || source.get())
        };

        assert_eq!(mirror.get(), Value::Int(1));
        mirror.stop();
        source.set(2);
        assert_eq!(mirror.get(), Value::Int(1));
    }

    #[test]
    fn computed_clone_shares_state() {
        let first = computed(|| 42);
        assert_eq!(first.get(), 42);

        let second = first.clone();
        assert_eq!(first.id(), second.id());
        assert_eq!(second.state(), ComputedState::Clean);
    }
}
