//! The two-level `target -> key -> subscribers` mapping.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use super::dep::Dep;
use super::identity::{Identity, Liveness, ObjectId};
use super::{Key, TargetKind, TriggerEvent, TriggerOp};

struct TargetEntry {
    liveness: Liveness,
    deps: IndexMap<Key, Arc<Dep>>,
}

/// Dependency storage for one runtime.
///
/// Entries are keyed by object id and only hold a weak liveness handle, so
/// a tracked target can be dropped freely; its entry is swept the next time
/// the map grows past its sweep mark.
pub(crate) struct TargetMap {
    entries: HashMap<ObjectId, TargetEntry>,
    sweep_threshold: usize,
    next_sweep: usize,
}

impl TargetMap {
    pub(crate) fn new(sweep_threshold: usize) -> Self {
        let sweep_threshold = sweep_threshold.max(1);
        Self {
            entries: HashMap::new(),
            sweep_threshold,
            next_sweep: sweep_threshold,
        }
    }

    /// The subscriber set for `(target, key)`, created on first use.
    pub(crate) fn dep_for(&mut self, target: &Identity, key: &Key) -> Arc<Dep> {
        if !self.entries.contains_key(&target.id()) && self.entries.len() >= self.next_sweep {
            self.sweep();
            self.next_sweep = self.sweep_threshold.max(self.entries.len() * 2);
        }

        let entry = self
            .entries
            .entry(target.id())
            .or_insert_with(|| TargetEntry {
                liveness: target.liveness(),
                deps: IndexMap::new(),
            });

        if let Some(dep) = entry.deps.get(key) {
            return Arc::clone(dep);
        }
        let dep = Dep::new();
        entry.deps.insert(key.clone(), Arc::clone(&dep));
        dep
    }

    pub(crate) fn dep(&self, target: ObjectId, key: &Key) -> Option<Arc<Dep>> {
        self.entries
            .get(&target)
            .and_then(|entry| entry.deps.get(key))
            .cloned()
    }

    pub(crate) fn contains(&self, target: ObjectId) -> bool {
        self.entries.contains_key(&target)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Pick the subscriber sets affected by `event` on `target`.
    ///
    /// - `Clear` hits every key of the target.
    /// - A `length` write on a sequence hits `length` plus every index at or
    ///   beyond the new length.
    /// - Otherwise the exact key, plus the enumeration keys whose result the
    ///   operation changes.
    pub(crate) fn select(
        &self,
        target: ObjectId,
        kind: TargetKind,
        event: &TriggerEvent,
    ) -> Vec<Arc<Dep>> {
        let Some(entry) = self.entries.get(&target) else {
            return Vec::new();
        };
        let deps = &entry.deps;

        if event.op == TriggerOp::Clear {
            return deps.values().cloned().collect();
        }

        if event.key == Key::Length && kind == TargetKind::Sequence {
            let new_length = event.new_length();
            return deps
                .iter()
                .filter(|(key, _)| match key {
                    Key::Length => true,
                    Key::Index(index) => *index >= new_length,
                    _ => false,
                })
                .map(|(_, dep)| Arc::clone(dep))
                .collect();
        }

        let mut selected = Vec::new();
        let mut add = |key: &Key| {
            if let Some(dep) = deps.get(key) {
                selected.push(Arc::clone(dep));
            }
        };

        add(&event.key);
        match event.op {
            TriggerOp::Add => {
                if kind.enumerates_by_key() {
                    add(&Key::Iterate);
                    if kind.is_map() {
                        add(&Key::MapKeyIterate);
                    }
                } else if event.key.is_index() {
                    add(&Key::Length);
                }
            }
            TriggerOp::Delete => {
                if kind.enumerates_by_key() {
                    add(&Key::Iterate);
                    if kind.is_map() {
                        add(&Key::MapKeyIterate);
                    }
                }
            }
            TriggerOp::Set => {
                if kind.is_map() {
                    add(&Key::Iterate);
                }
            }
            TriggerOp::Clear => {}
        }
        selected
    }

    /// Drop entries whose target no longer exists. Returns how many went.
    pub(crate) fn sweep(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.liveness.is_alive());
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!(removed, remaining = self.entries.len(), "swept dead dependency targets");
        }
        removed
    }
}
