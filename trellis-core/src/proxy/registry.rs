//! Identity Registry & Wrapping Entry Points
//!
//! The registry maps a subject's [`ObjectId`] to the live view of each
//! flavor. Entries hold the view weakly: a view that nobody references is
//! gone, and the registry never keeps a target alive. Dead entries are swept
//! once a slot grows past its high-water mark.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Weak;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, warn};

use super::flavor::Flavor;
use super::view::{Subject, View, ViewInner};
use crate::graph::ObjectId;
use crate::reactive::Runtime;
use crate::value::Value;

struct Slot {
    views: DashMap<ObjectId, Weak<ViewInner>>,
    next_sweep: AtomicUsize,
}

impl Slot {
    fn new(threshold: usize) -> Self {
        Self {
            views: DashMap::new(),
            next_sweep: AtomicUsize::new(threshold),
        }
    }

    fn sweep(&self) -> usize {
        let before = self.views.len();
        self.views.retain(|_, view| view.strong_count() > 0);
        before - self.views.len()
    }
}

/// One map per flavor from subject to view.
pub(crate) struct Registry {
    slots: [Slot; 4],
    threshold: usize,
}

impl Registry {
    pub(crate) fn new(threshold: usize) -> Self {
        let threshold = threshold.max(1);
        Self {
            slots: std::array::from_fn(|_| Slot::new(threshold)),
            threshold,
        }
    }

    pub(crate) fn lookup(&self, flavor: Flavor, subject: ObjectId) -> Option<View> {
        self.slots[flavor.slot()]
            .views
            .get(&subject)
            .and_then(|view| view.upgrade())
            .map(View::from_inner)
    }

    /// Return the live view for `subject`, creating it with `create` if there
    /// is none.
    fn get_or_insert(
        &self,
        flavor: Flavor,
        subject: ObjectId,
        create: impl FnOnce() -> View,
    ) -> View {
        let slot = &self.slots[flavor.slot()];
        if slot.views.len() >= slot.next_sweep.load(Ordering::Relaxed) {
            let swept = slot.sweep();
            let live = slot.views.len();
            slot.next_sweep
                .store(self.threshold.max(live * 2), Ordering::Relaxed);
            debug!(%flavor, swept, live, "swept view registry");
        }

        match slot.views.entry(subject) {
            Entry::Occupied(mut entry) => {
                if let Some(inner) = entry.get().upgrade() {
                    return View::from_inner(inner);
                }
                let view = create();
                entry.insert(view.downgrade());
                view
            }
            Entry::Vacant(entry) => {
                let view = create();
                entry.insert(view.downgrade());
                view
            }
        }
    }

    /// Remove dead entries from every slot.
    pub(crate) fn sweep(&self) -> usize {
        self.slots.iter().map(Slot::sweep).sum()
    }

    #[cfg(test)]
    fn len(&self, flavor: Flavor) -> usize {
        self.slots[flavor.slot()].views.len()
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Int(_) | Value::Float(_) => "number",
        Value::Str(_) => "string",
        Value::Ref(_) => "ref",
        Value::Object(_) | Value::View(_) => "container",
    }
}

/// Wrap `value` in a view of `flavor`.
///
/// Anything that cannot be wrapped comes back unchanged: scalars, refs,
/// skipped or non-extensible targets, and views (unless a readonly view of a
/// mutable view is requested).
fn create_view(runtime: &Runtime, value: Value, flavor: Flavor) -> Value {
    let subject = match value {
        Value::Object(target) => Subject::Raw(target),
        Value::View(view) => {
            if !(flavor.readonly && !view.is_readonly()) {
                return Value::View(view);
            }
            Subject::View(view)
        }
        other => {
            if cfg!(debug_assertions) {
                warn!(found = describe(&other), "value cannot be made {flavor}");
            }
            return other;
        }
    };

    let target = match &subject {
        Subject::Raw(target) => target.clone(),
        Subject::View(view) => view.to_raw_target(),
    };
    if target.is_skipped() || !target.is_extensible() {
        return match subject {
            Subject::Raw(target) => Value::Object(target),
            Subject::View(view) => Value::View(view),
        };
    }

    let id = subject.id();
    let registry = runtime.registry();
    let view = registry.get_or_insert(flavor, id, || View::new(runtime.clone(), subject, flavor));
    Value::View(view)
}

impl Runtime {
    /// Deep mutable view. Nested containers are wrapped on read and refs
    /// stored in record fields are unwrapped.
    pub fn reactive(&self, value: impl Into<Value>) -> Value {
        create_view(self, value.into(), Flavor::REACTIVE)
    }

    /// Root-level mutable view. Nested values come back raw.
    pub fn shallow_reactive(&self, value: impl Into<Value>) -> Value {
        create_view(self, value.into(), Flavor::SHALLOW_REACTIVE)
    }

    /// Deep readonly view.
    pub fn readonly(&self, value: impl Into<Value>) -> Value {
        create_view(self, value.into(), Flavor::READONLY)
    }

    /// Root-level readonly view. Refs are handed out as refs.
    pub fn shallow_readonly(&self, value: impl Into<Value>) -> Value {
        create_view(self, value.into(), Flavor::SHALLOW_READONLY)
    }
}

/// Deep mutable view on the current thread's runtime.
pub fn reactive(value: impl Into<Value>) -> Value {
    Runtime::current().reactive(value)
}

/// Root-level mutable view on the current thread's runtime.
pub fn shallow_reactive(value: impl Into<Value>) -> Value {
    Runtime::current().shallow_reactive(value)
}

/// Deep readonly view on the current thread's runtime.
pub fn readonly(value: impl Into<Value>) -> Value {
    Runtime::current().readonly(value)
}

/// Root-level readonly view on the current thread's runtime.
pub fn shallow_readonly(value: impl Into<Value>) -> Value {
    Runtime::current().shallow_readonly(value)
}

/// Whether `value` is a mutable reactive view, directly or under a readonly
/// view.
pub fn is_reactive(value: &Value) -> bool {
    value.as_view().is_some_and(View::is_reactive)
}

/// Whether `value` is a readonly view.
pub fn is_readonly(value: &Value) -> bool {
    value.as_view().is_some_and(View::is_readonly)
}

/// Whether `value` is a view of any flavor.
pub fn is_proxy(value: &Value) -> bool {
    is_reactive(value) || is_readonly(value)
}

/// Strip every view layer from `value`.
pub fn to_raw(value: &Value) -> Value {
    match value.as_view().and_then(View::raw) {
        Some(raw) => to_raw(&raw),
        None => value.clone(),
    }
}

/// Flag the target behind `value` so it is never wrapped. Returns `value`.
pub fn mark_raw(value: impl Into<Value>) -> Value {
    let value = value.into();
    match &value {
        Value::Object(target) => target.mark_skip(),
        Value::View(view) => view.to_raw_target().mark_skip(),
        _ => {}
    }
    value
}
