//! Raw containers.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{RwLock, RwLockReadGuard};

use super::Value;
use crate::graph::{Identity, Key, ObjectId, TargetKind};

/// Largest length a sequence may be given by a write.
pub const MAX_SEQUENCE_LEN: usize = u32::MAX as usize;

/// Which kind of container a [`Target`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// Insertion-ordered string-keyed fields.
    Record,
    /// Integer-indexed elements with a length.
    Sequence,
}

pub(super) enum Container {
    Record(IndexMap<Arc<str>, Value>),
    Sequence(Vec<Value>),
}

struct TargetInner {
    identity: Identity,
    data: RwLock<Container>,
    skip: AtomicBool,
    extensible: AtomicBool,
}

/// A shared, plain container.
///
/// Cloning a `Target` clones the handle; both clones name the same
/// container. Equality is identity. Reading or writing a `Target` directly
/// never tracks or triggers anything.
#[derive(Clone)]
pub struct Target {
    inner: Arc<TargetInner>,
}

impl Target {
    fn with_container(data: Container) -> Self {
        Self {
            inner: Arc::new(TargetInner {
                identity: Identity::new(),
                data: RwLock::new(data),
                skip: AtomicBool::new(false),
                extensible: AtomicBool::new(true),
            }),
        }
    }

    /// An empty record.
    pub fn record() -> Self {
        Self::with_container(Container::Record(IndexMap::new()))
    }

    /// An empty sequence.
    pub fn sequence() -> Self {
        Self::with_container(Container::Sequence(Vec::new()))
    }

    /// A record holding `entries` in order.
    pub fn from_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<Arc<str>>,
        V: Into<Value>,
    {
        let fields = entries
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        Self::with_container(Container::Record(fields))
    }

    /// A sequence holding `values` in order.
    pub fn from_values<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        Self::with_container(Container::Sequence(
            values.into_iter().map(Into::into).collect(),
        ))
    }

    /// Stable id of this container.
    pub fn id(&self) -> ObjectId {
        self.inner.identity.id()
    }

    /// Identity under which the dependency graph and registry key this target.
    pub fn identity(&self) -> &Identity {
        &self.inner.identity
    }

    /// Record or sequence.
    pub fn shape(&self) -> Shape {
        match &*self.inner.data.read() {
            Container::Record(_) => Shape::Record,
            Container::Sequence(_) => Shape::Sequence,
        }
    }

    pub(crate) fn kind(&self) -> TargetKind {
        match self.shape() {
            Shape::Record => TargetKind::Record,
            Shape::Sequence => TargetKind::Sequence,
        }
    }

    /// Whether this is a sequence.
    pub fn is_sequence(&self) -> bool {
        self.shape() == Shape::Sequence
    }

    /// Field count of a record, length of a sequence.
    pub fn len(&self) -> usize {
        match &*self.inner.data.read() {
            Container::Record(fields) => fields.len(),
            Container::Sequence(items) => items.len(),
        }
    }

    /// Whether [`len`](Self::len) is zero.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read a key, normalized for this target's shape.
    pub fn get(&self, key: impl Into<Key>) -> Option<Value> {
        self.raw_get(&self.normalize(key.into()))
    }

    /// Whether a key is present.
    pub fn contains_key(&self, key: impl Into<Key>) -> bool {
        self.raw_has(&self.normalize(key.into()))
    }

    /// Write a key. Returns `false` if the write was refused.
    pub fn insert(&self, key: impl Into<Key>, value: impl Into<Value>) -> bool {
        self.raw_set(&self.normalize(key.into()), value.into())
    }

    /// Delete a key, returning the value it held.
    pub fn remove(&self, key: impl Into<Key>) -> Option<Value> {
        self.raw_delete(&self.normalize(key.into()))
    }

    /// Field names of a record, indices of a sequence.
    pub fn keys(&self) -> Vec<Key> {
        self.raw_keys()
    }

    /// Snapshot of the stored values in order.
    pub fn values(&self) -> Vec<Value> {
        match &*self.inner.data.read() {
            Container::Record(fields) => fields.values().cloned().collect(),
            Container::Sequence(items) => items.clone(),
        }
    }

    pub(crate) fn normalize(&self, key: Key) -> Key {
        key.normalize(self.is_sequence())
    }

    pub(crate) fn raw_get(&self, key: &Key) -> Option<Value> {
        match (&*self.inner.data.read(), key) {
            (Container::Record(fields), Key::Field(name)) => fields.get(name).cloned(),
            (Container::Sequence(items), Key::Index(index)) => items.get(*index).cloned(),
            (Container::Sequence(items), Key::Length) => Some(Value::from(items.len())),
            _ => None,
        }
    }

    pub(crate) fn raw_has(&self, key: &Key) -> bool {
        match (&*self.inner.data.read(), key) {
            (Container::Record(fields), Key::Field(name)) => fields.contains_key(name),
            (Container::Sequence(items), Key::Index(index)) => *index < items.len(),
            (Container::Sequence(_), Key::Length) => true,
            _ => false,
        }
    }

    /// Store `value` under `key`.
    ///
    /// Writing past the end of a sequence pads it with `Null`; writing its
    /// length truncates or pads. New keys are refused once the target has
    /// been made non-extensible, and so is any sequence growth past
    /// [`MAX_SEQUENCE_LEN`] or that cannot be allocated.
    pub(crate) fn raw_set(&self, key: &Key, value: Value) -> bool {
        let extensible = self.is_extensible();
        match (&mut *self.inner.data.write(), key) {
            (Container::Record(fields), Key::Field(name)) => {
                if let Some(slot) = fields.get_mut(name) {
                    *slot = value;
                } else if extensible {
                    fields.insert(name.clone(), value);
                } else {
                    return false;
                }
                true
            }
            (Container::Sequence(items), Key::Index(index)) => {
                if *index >= items.len() {
                    let grown = extensible
                        && index
                            .checked_add(1)
                            .is_some_and(|len| grow(items, len));
                    if !grown {
                        return false;
                    }
                }
                items[*index] = value;
                true
            }
            (Container::Sequence(items), Key::Length) => match value.as_index() {
                Some(len) if len <= items.len() => {
                    items.truncate(len);
                    true
                }
                Some(len) => extensible && grow(items, len),
                None => false,
            },
            _ => false,
        }
    }

    /// Delete `key`, returning its previous value if it was present.
    /// A sequence slot is reset to `Null` rather than removed.
    pub(crate) fn raw_delete(&self, key: &Key) -> Option<Value> {
        match (&mut *self.inner.data.write(), key) {
            (Container::Record(fields), Key::Field(name)) => fields.shift_remove(name),
            (Container::Sequence(items), Key::Index(index)) => items
                .get_mut(*index)
                .map(|slot| std::mem::replace(slot, Value::Null)),
            _ => None,
        }
    }

    pub(crate) fn raw_keys(&self) -> Vec<Key> {
        match &*self.inner.data.read() {
            Container::Record(fields) => fields.keys().cloned().map(Key::Field).collect(),
            Container::Sequence(items) => (0..items.len()).map(Key::Index).collect(),
        }
    }

    pub(super) fn container(&self) -> RwLockReadGuard<'_, Container> {
        self.inner.data.read()
    }

    /// Flag this target so it is never wrapped in a view.
    pub fn mark_skip(&self) {
        self.inner.skip.store(true, Ordering::Release);
    }

    /// Whether [`mark_skip`](Self::mark_skip) was called.
    pub fn is_skipped(&self) -> bool {
        self.inner.skip.load(Ordering::Acquire)
    }

    /// Refuse new keys from now on. Non-extensible targets are never wrapped.
    pub fn prevent_extensions(&self) {
        self.inner.extensible.store(false, Ordering::Release);
    }

    /// Whether new keys are still accepted.
    pub fn is_extensible(&self) -> bool {
        self.inner.extensible.load(Ordering::Acquire)
    }

    /// Whether both handles name the same container.
    pub fn ptr_eq(&self, other: &Target) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Pad `items` with `Null` up to `len`, refusing oversized or unallocatable growth.
fn grow(items: &mut Vec<Value>, len: usize) -> bool {
    if len > MAX_SEQUENCE_LEN || items.try_reserve(len - items.len()).is_err() {
        return false;
    }
    items.resize(len, Value::Null);
    true
}

impl PartialEq for Target {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Target {}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("id", &self.id())
            .field("shape", &self.shape())
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_preserves_insertion_order() {
        let target = Target::from_entries([("b", 1), ("a", 2)]);
        assert!(target.insert("c", 3));
        assert_eq!(
            target.keys(),
            vec![Key::from("b"), Key::from("a"), Key::from("c")]
        );
        assert_eq!(target.remove("b"), Some(Value::Int(1)));
        assert_eq!(target.keys(), vec![Key::from("a"), Key::from("c")]);
    }

    #[test]
    fn sequence_length_and_indices() {
        let target = Target::from_values([1, 2, 3]);
        assert_eq!(target.get("length"), Some(Value::Int(3)));
        assert_eq!(target.get("1"), Some(Value::Int(2)));

        assert!(target.insert(5usize, 6));
        assert_eq!(target.len(), 6);
        assert_eq!(target.get(4usize), Some(Value::Null));

        assert!(target.insert("length", 2));
        assert_eq!(target.values(), vec![Value::Int(1), Value::Int(2)]);
        assert!(!target.insert("length", -1));
    }

    #[test]
    fn oversized_sequence_writes_are_refused() {
        let target = Target::from_values([1, 2]);
        assert!(!target.insert(usize::MAX, 1));
        assert!(!target.insert(MAX_SEQUENCE_LEN, 1));
        assert!(!target.insert("length", MAX_SEQUENCE_LEN as i64 + 1));
        assert!(!target.insert("length", i64::MAX));
        assert_eq!(target.values(), vec![Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn integral_float_length_is_accepted() {
        let target = Target::from_values([1, 2, 3]);
        assert!(target.insert("length", 2.0));
        assert_eq!(target.len(), 2);
        assert!(!target.insert("length", 1.5));
        assert_eq!(target.len(), 2);
    }

    #[test]
    fn sequence_delete_leaves_null() {
        let target = Target::from_values(["a", "b"]);
        assert_eq!(target.remove(0usize), Some(Value::from("a")));
        assert_eq!(target.len(), 2);
        assert_eq!(target.get(0usize), Some(Value::Null));
        assert_eq!(target.remove(9usize), None);
    }

    #[test]
    fn non_extensible_refuses_new_keys() {
        let target = Target::from_entries([("a", 1)]);
        target.prevent_extensions();
        assert!(target.insert("a", 2));
        assert!(!target.insert("b", 2));
        assert!(!target.contains_key("b"));
    }

    #[test]
    fn equality_is_identity() {
        let a = Target::record();
        assert_eq!(a, a.clone());
        assert_ne!(a, Target::record());
    }
}
