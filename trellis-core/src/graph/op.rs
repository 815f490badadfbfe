//! Operation kinds carried by `track` and `trigger`.

use crate::value::Value;

use super::Key;

/// What kind of read registered a dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackOp {
    /// A property or index was read.
    Get,
    /// Key presence was queried.
    Has,
    /// The key set was enumerated.
    Iterate,
}

/// What kind of write is being announced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerOp {
    /// An existing key got a different value.
    Set,
    /// A previously absent key was created.
    Add,
    /// An existing key was removed.
    Delete,
    /// Every key was removed at once.
    Clear,
}

/// Shape of the target a trigger is announced for.
///
/// The subscriber selection policy differs per shape: sequences have a
/// length, maps have a second iteration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    /// A record (string-keyed map of fields). Refs and computed values
    /// announce themselves as records with a single `value` key.
    Record,
    /// An indexable sequence.
    Sequence,
    /// A map-like collection.
    Map,
    /// A set-like collection.
    Set,
}

impl TargetKind {
    pub(crate) fn is_map(self) -> bool {
        self == TargetKind::Map
    }

    /// Everything but sequences enumerates through the iterate key;
    /// sequences enumerate through their length.
    pub(crate) fn enumerates_by_key(self) -> bool {
        self != TargetKind::Sequence
    }
}

/// A change announced to the dependency graph.
#[derive(Debug, Clone)]
pub struct TriggerEvent {
    /// The kind of write.
    pub op: TriggerOp,
    /// The key written. Ignored for [`TriggerOp::Clear`].
    pub key: Key,
    /// The value after the write, when there is one.
    pub new_value: Option<Value>,
    /// The value before the write, when there was one.
    pub old_value: Option<Value>,
}

impl TriggerEvent {
    /// An event without value payloads.
    pub fn new(op: TriggerOp, key: Key) -> Self {
        Self {
            op,
            key,
            new_value: None,
            old_value: None,
        }
    }

    /// Attach the value after the write.
    pub fn with_new(mut self, value: Value) -> Self {
        self.new_value = Some(value);
        self
    }

    /// Attach the value before the write.
    pub fn with_old(mut self, value: Value) -> Self {
        self.old_value = Some(value);
        self
    }

    /// The length a sequence was set to, for `length` writes.
    pub(crate) fn new_length(&self) -> usize {
        self.new_value
            .as_ref()
            .and_then(Value::as_index)
            .unwrap_or(0)
    }
}
