//! Identity Tokens
//!
//! Everything the dependency graph keys on (raw targets, views, refs and
//! computed values) owns an [`Identity`]. The graph and the identity
//! registry only ever hold the id plus a weak liveness handle, so neither
//! keeps an object alive after its last owner lets go.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Stable identifier of a trackable object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Unique identifier for a subscriber (an effect, or the effect behind a
/// computed value).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "effect-{}", self.0)
    }
}

/// The identity owned by a trackable object.
///
/// Not `Clone`: exactly one owner exists, and its drop is what makes every
/// [`Liveness`] handle report the object as gone.
#[derive(Debug)]
pub struct Identity {
    id: ObjectId,
    token: Arc<()>,
}

impl Identity {
    /// Mint a fresh identity.
    pub fn new() -> Self {
        Self {
            id: ObjectId::next(),
            token: Arc::new(()),
        }
    }

    /// The object's id.
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub(crate) fn liveness(&self) -> Liveness {
        Liveness(Arc::downgrade(&self.token))
    }
}

impl Default for Identity {
    fn default() -> Self {
        Self::new()
    }
}

/// Weak handle answering "is the owner of this identity still around".
#[derive(Debug, Clone)]
pub(crate) struct Liveness(Weak<()>);

impl Liveness {
    pub(crate) fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let a = Identity::new();
        let b = Identity::new();
        assert_ne!(a.id(), b.id());
        assert_ne!(SubscriberId::new(), SubscriberId::new());
    }

    #[test]
    fn liveness_follows_owner() {
        let identity = Identity::new();
        let liveness = identity.liveness();
        assert!(liveness.is_alive());

        drop(identity);
        assert!(!liveness.is_alive());
    }
}
