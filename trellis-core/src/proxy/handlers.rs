//! Trap sets.
//!
//! Every access through a [`View`] is dispatched to the [`ProxyHandler`] of
//! its flavor. Mutable handlers track reads and trigger writes; readonly
//! handlers never track their own subject and refuse every mutation.

use tracing::warn;

use super::view::{Subject, View};
use crate::graph::{Key, TrackOp, TriggerEvent, TriggerOp};
use crate::value::{has_changed, Value};

/// The interception surface of a view.
///
/// Keys arrive normalized for the subject's shape.
pub trait ProxyHandler: Send + Sync {
    /// Property read.
    fn get(&self, view: &View, key: Key) -> Value;

    /// Property write. Returns whether the write was accepted.
    fn set(&self, view: &View, key: Key, value: Value) -> bool;

    /// Property delete. Returns whether the delete was accepted.
    fn delete_property(&self, view: &View, key: Key) -> bool;

    /// Key presence query.
    fn has(&self, view: &View, key: Key) -> bool;

    /// Key enumeration.
    fn own_keys(&self, view: &View) -> Vec<Key>;
}

/// Traps for reactive and shallow-reactive views.
pub struct MutableHandler {
    shallow: bool,
}

/// Traps for readonly and shallow-readonly views.
pub struct ReadonlyHandler {
    shallow: bool,
}

/// Traps behind [`Flavor::REACTIVE`](super::Flavor::REACTIVE).
pub static MUTABLE_HANDLER: MutableHandler = MutableHandler { shallow: false };
/// Traps behind [`Flavor::SHALLOW_REACTIVE`](super::Flavor::SHALLOW_REACTIVE).
pub static SHALLOW_MUTABLE_HANDLER: MutableHandler = MutableHandler { shallow: true };
/// Traps behind [`Flavor::READONLY`](super::Flavor::READONLY).
pub static READONLY_HANDLER: ReadonlyHandler = ReadonlyHandler { shallow: false };
/// Traps behind [`Flavor::SHALLOW_READONLY`](super::Flavor::SHALLOW_READONLY).
pub static SHALLOW_READONLY_HANDLER: ReadonlyHandler = ReadonlyHandler { shallow: true };

/// Shared read path.
fn read(view: &View, key: Key, readonly: bool, shallow: bool) -> Value {
    let (res, sequence) = match view.subject() {
        Subject::Raw(target) => (target.raw_get(&key), target.is_sequence()),
        Subject::View(inner) => (Some(inner.get(key.clone())), inner.is_sequence()),
    };
    let res = res.unwrap_or_default();

    if !key.is_trackable() {
        return res;
    }

    if !readonly {
        if let Subject::Raw(target) = view.subject() {
            view.runtime().track(target.identity(), TrackOp::Get, key.clone());
        }
    }

    if shallow {
        return res;
    }

    let res = match res {
        // Sequences keep refs at integer indices.
        Value::Ref(handle) if !(sequence && key.is_index()) => handle.get(),
        res => res,
    };

    if res.is_container() {
        let runtime = view.runtime();
        return if readonly {
            runtime.readonly(res)
        } else {
            runtime.reactive(res)
        };
    }
    res
}

pub(crate) fn warn_readonly(view: &View, operation: &str, key: Option<&Key>) {
    if view.runtime().config().should_warn() {
        match key {
            Some(key) => warn!(
                view = %view.id(),
                %key,
                "{operation} operation on key \"{key}\" failed: target is readonly"
            ),
            None => warn!(view = %view.id(), "{operation} operation failed: target is readonly"),
        }
    }
}

impl ProxyHandler for MutableHandler {
    fn get(&self, view: &View, key: Key) -> Value {
        read(view, key, false, self.shallow)
    }

    fn set(&self, view: &View, key: Key, value: Value) -> bool {
        let Subject::Raw(target) = view.subject() else {
            return false;
        };
        let old = target.raw_get(&key).unwrap_or_default();
        let (value, old) = if self.shallow {
            (value, old)
        } else {
            let (value, old) = (value.to_raw(), old.to_raw());
            if !target.is_sequence() && !value.is_ref() {
                if let Value::Ref(handle) = &old {
                    handle.set(value);
                    return true;
                }
            }
            (value, old)
        };

        let had_key = target.raw_has(&key);
        let result = target.raw_set(&key, value.clone());

        // Only the registered view for a target announces writes.
        if result && view.is_canonical() {
            let event = if !had_key {
                Some(TriggerEvent::new(TriggerOp::Add, key).with_new(value))
            } else if has_changed(&value, &old) {
                Some(
                    TriggerEvent::new(TriggerOp::Set, key)
                        .with_new(value)
                        .with_old(old),
                )
            } else {
                None
            };
            if let Some(event) = event {
                view.runtime()
                    .trigger(target.identity(), target.kind(), event);
            }
        }
        result
    }

    fn delete_property(&self, view: &View, key: Key) -> bool {
        let Subject::Raw(target) = view.subject() else {
            return false;
        };
        match target.raw_delete(&key) {
            Some(old) => {
                view.runtime().trigger(
                    target.identity(),
                    target.kind(),
                    TriggerEvent::new(TriggerOp::Delete, key).with_old(old),
                );
                true
            }
            // Deleting an absent key succeeds; a sequence's length cannot go.
            None => key != Key::Length,
        }
    }

    fn has(&self, view: &View, key: Key) -> bool {
        let Subject::Raw(target) = view.subject() else {
            return false;
        };
        let result = target.raw_has(&key);
        if key.is_trackable() {
            view.runtime().track(target.identity(), TrackOp::Has, key);
        }
        result
    }

    fn own_keys(&self, view: &View) -> Vec<Key> {
        let Subject::Raw(target) = view.subject() else {
            return Vec::new();
        };
        let key = if target.is_sequence() {
            Key::Length
        } else {
            Key::Iterate
        };
        view.runtime()
            .track(target.identity(), TrackOp::Iterate, key);
        target.raw_keys()
    }
}

impl ProxyHandler for ReadonlyHandler {
    fn get(&self, view: &View, key: Key) -> Value {
        read(view, key, true, self.shallow)
    }

    fn set(&self, view: &View, key: Key, _value: Value) -> bool {
        warn_readonly(view, "set", Some(&key));
        true
    }

    fn delete_property(&self, view: &View, key: Key) -> bool {
        warn_readonly(view, "delete", Some(&key));
        true
    }

    fn has(&self, view: &View, key: Key) -> bool {
        match view.subject() {
            Subject::Raw(target) => target.raw_has(&key),
            Subject::View(inner) => inner.has(key),
        }
    }

    fn own_keys(&self, view: &View) -> Vec<Key> {
        match view.subject() {
            Subject::Raw(target) => target.raw_keys(),
            Subject::View(inner) => inner.keys(),
        }
    }
}
