//! Dependency Graph
//!
//! This module implements the storage behind `track` and `trigger`: a
//! two-level mapping from observed objects to keys to the subscribers that
//! read them.
//!
//! # Overview
//!
//! ```text
//! ObjectId ──► Key ──► Dep { SubscriberId ─► Weak<effect> }
//! ```
//!
//! - The outer level is keyed by object identity, never by value, and holds
//!   only a weak liveness handle per object.
//! - The inner level is keyed by [`Key`]: concrete fields and indices, the
//!   sequence `length`, a ref's `value`, and the synthetic iterate keys that
//!   stand for "the key set of this object".
//! - Each subscriber keeps the list of [`Dep`](dep::Dep) sets it sits in, so
//!   it can remove itself from all of them before re-running.
//!
//! The selection policy (which subscribers a write reaches) lives in
//! [`TargetMap::select`](target_map::TargetMap::select). Running them is the
//! job of the [`Runtime`](crate::reactive::Runtime).

pub(crate) mod dep;
mod identity;
mod key;
mod op;
pub(crate) mod target_map;

pub use identity::{Identity, ObjectId, SubscriberId};
pub use key::Key;
pub use op::{TargetKind, TrackOp, TriggerEvent, TriggerOp};
