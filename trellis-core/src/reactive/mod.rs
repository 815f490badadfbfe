//! Reactive Primitives
//!
//! This module implements the scheduling half of the system: the runtime
//! context, subscribers (effects), computed values and refs.
//!
//! # Concepts
//!
//! ## Runtime
//!
//! A [`Runtime`] holds the dependency graph, the stack of running
//! subscribers and the tracking flag. Every view, effect and computed
//! value belongs to one runtime; each thread has a default one.
//!
//! ## Effects
//!
//! An effect is a computation whose reads are recorded. When something it
//! read changes, it re-runs (or is handed to its scheduler). Before every
//! run it drops all of its old subscriptions, so the recorded set always
//! matches what the latest run actually read.
//!
//! ## Computed Values
//!
//! A computed value is a lazy effect plus a cache. It re-derives on the
//! first read after a dependency changed, and is itself observable through
//! its `value` key.
//!
//! # Implementation Notes
//!
//! Reads call [`Runtime::track`], writes call [`Runtime::trigger`]. The
//! runtime keeps the running subscriber on an explicit stack guarded by
//! scoped `Drop` guards, so nested runs and panics always restore the
//! previous state.

mod computed;
mod context;
mod effect;
mod refs;
mod runtime;

pub use computed::{computed, writable_computed, Computed, ComputedState};
pub use context::TrackingPause;
pub(crate) use effect::EffectInner;
pub use effect::{
    effect, effect_with, stop, DebugHook, DebugKind, DebuggerEvent, EffectOptions,
    ReactiveEffect, Scheduler, StopHook,
};
pub use refs::{Ref, RefHandle, RefLike};
pub use runtime::{
    enable_tracking, pause_tracking, reset_tracking, track, trigger, untracked, Runtime,
};
