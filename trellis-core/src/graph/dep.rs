//! Per-key subscriber sets.

use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::reactive::EffectInner;

use super::SubscriberId;

/// The set of subscribers that read one `(target, key)` pair.
///
/// Subscribers are held weakly and kept in insertion order, which is the
/// order they are re-run in when the key changes.
#[derive(Default)]
pub(crate) struct Dep {
    subscribers: Mutex<IndexMap<SubscriberId, Weak<EffectInner>>>,
}

impl Dep {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Add a subscriber. Returns false if it was already present.
    pub(crate) fn insert(&self, effect: &Arc<EffectInner>) -> bool {
        let mut subscribers = self.subscribers.lock();
        if subscribers.contains_key(&effect.id()) {
            return false;
        }
        subscribers.insert(effect.id(), Arc::downgrade(effect));
        true
    }

    pub(crate) fn remove(&self, id: SubscriberId) -> bool {
        self.subscribers.lock().shift_remove(&id).is_some()
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, id: SubscriberId) -> bool {
        self.subscribers.lock().contains_key(&id)
    }

    /// Number of subscribers still alive.
    pub(crate) fn len(&self) -> usize {
        self.subscribers
            .lock()
            .values()
            .filter(|effect| effect.strong_count() > 0)
            .count()
    }

    /// Snapshot of the live subscribers, in insertion order.
    pub(crate) fn subscribers(&self) -> Vec<Arc<EffectInner>> {
        self.subscribers
            .lock()
            .values()
            .filter_map(Weak::upgrade)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{EffectOptions, Runtime};

    #[test]
    fn insert_is_idempotent_and_ordered() {
        let runtime = Runtime::new();
        let first = runtime.effect(|| {}, EffectOptions::new().lazy());
        let second = runtime.effect(|| {}, EffectOptions::new().lazy());

        let dep = Dep::new();
        assert!(dep.insert(first.inner()));
        assert!(dep.insert(second.inner()));
        assert!(!dep.insert(first.inner()));

        let ids: Vec<_> = dep.subscribers().iter().map(|e| e.id()).collect();
        assert_eq!(ids, vec![first.id(), second.id()]);

        assert!(dep.remove(first.id()));
        assert!(!dep.contains(first.id()));
        assert_eq!(dep.len(), 1);
    }

    #[test]
    fn dropped_subscribers_are_not_returned() {
        let runtime = Runtime::new();
        let dep = Dep::new();
        {
            let effect = runtime.effect(|| {}, EffectOptions::new().lazy());
            dep.insert(effect.inner());
        }
        assert_eq!(dep.len(), 0);
        assert!(dep.subscribers().is_empty());
    }
}
