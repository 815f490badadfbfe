//! Reactive Runtime
//!
//! The runtime is the context object every reactive operation runs
//! against. It owns:
//!
//! - the dependency graph (`target -> key -> subscribers`),
//! - the stack of running subscribers,
//! - the tracking flag and the stack of its saved values,
//! - the identity registry mapping raw targets to their views.
//!
//! # How It Works
//!
//! 1. A view read inside a running subscriber calls [`Runtime::track`],
//!    which records `(target, key) -> subscriber` and remembers the
//!    dependency set on the subscriber so it can unsubscribe later.
//!
//! 2. A view write calls [`Runtime::trigger`], which selects the affected
//!    subscribers and either hands them to their scheduler or re-runs them
//!    synchronously.
//!
//! # Threading
//!
//! Execution is single-threaded and synchronous. Each thread gets its own
//! default runtime from [`Runtime::current`]; independent graphs are made
//! with [`Runtime::new`]. Internal locks are never held while user code
//! (computations, schedulers, hooks) runs.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::trace;

use super::context::TrackingPause;
use super::effect::{EffectInner, ReactiveEffect};
use crate::config::RuntimeConfig;
use crate::graph::target_map::TargetMap;
use crate::graph::{Identity, Key, ObjectId, SubscriberId, TargetKind, TrackOp, TriggerEvent};
use crate::proxy::Registry;

thread_local! {
    static CURRENT: Runtime = Runtime::new();
}

struct TrackingState {
    should_track: bool,
    saved: Vec<bool>,
}

struct RuntimeInner {
    config: RuntimeConfig,
    targets: Mutex<TargetMap>,
    effect_stack: Mutex<Vec<Arc<EffectInner>>>,
    tracking: Mutex<TrackingState>,
    registry: Registry,
}

/// Handle to a reactive context. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Runtime {
    inner: Arc<RuntimeInner>,
}

impl Runtime {
    /// Create an independent runtime with the default configuration.
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Create an independent runtime.
    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            inner: Arc::new(RuntimeInner {
                targets: Mutex::new(TargetMap::new(config.sweep_threshold)),
                effect_stack: Mutex::new(Vec::new()),
                tracking: Mutex::new(TrackingState {
                    should_track: true,
                    saved: Vec::new(),
                }),
                registry: Registry::new(config.sweep_threshold),
                config,
            }),
        }
    }

    /// The default runtime of the calling thread.
    pub fn current() -> Self {
        CURRENT.with(Runtime::clone)
    }

    /// This runtime's configuration.
    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    /// Whether two handles refer to the same runtime.
    pub fn ptr_eq(&self, other: &Runtime) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    // ------------------------------------------------------------------
    // Tracking flag
    // ------------------------------------------------------------------

    /// Stop recording dependencies until the matching [`reset_tracking`](Self::reset_tracking).
    pub fn pause_tracking(&self) {
        let mut tracking = self.inner.tracking.lock();
        let previous = tracking.should_track;
        tracking.saved.push(previous);
        tracking.should_track = false;
    }

    /// Record dependencies until the matching [`reset_tracking`](Self::reset_tracking).
    pub fn enable_tracking(&self) {
        let mut tracking = self.inner.tracking.lock();
        let previous = tracking.should_track;
        tracking.saved.push(previous);
        tracking.should_track = true;
    }

    /// Restore the tracking flag saved by the last pause or enable.
    pub fn reset_tracking(&self) {
        let mut tracking = self.inner.tracking.lock();
        tracking.should_track = tracking.saved.pop().unwrap_or(true);
    }

    /// The raw tracking flag.
    pub fn should_track(&self) -> bool {
        self.inner.tracking.lock().should_track
    }

    /// Whether a read right now would register a dependency.
    pub fn is_tracking(&self) -> bool {
        self.should_track() && !self.inner.effect_stack.lock().is_empty()
    }

    /// Run `f` with tracking paused.
    pub fn untracked<R>(&self, f: impl FnOnce() -> R) -> R {
        let _pause = TrackingPause::new(self);
        f()
    }

    // ------------------------------------------------------------------
    // Running-subscriber stack
    // ------------------------------------------------------------------

    pub(crate) fn push_effect(&self, effect: Arc<EffectInner>) {
        self.inner.effect_stack.lock().push(effect);
    }

    pub(crate) fn pop_effect(&self) -> Option<Arc<EffectInner>> {
        self.inner.effect_stack.lock().pop()
    }

    pub(crate) fn is_running(&self, id: SubscriberId) -> bool {
        self.inner
            .effect_stack
            .lock()
            .iter()
            .any(|effect| effect.id() == id)
    }

    /// The subscriber currently running, if any.
    pub fn active_effect(&self) -> Option<ReactiveEffect> {
        self.inner
            .effect_stack
            .lock()
            .last()
            .cloned()
            .map(ReactiveEffect::from_inner)
    }

    fn tracking_effect(&self) -> Option<Arc<EffectInner>> {
        if !self.should_track() {
            return None;
        }
        self.inner.effect_stack.lock().last().cloned()
    }

    // ------------------------------------------------------------------
    // Track / trigger
    // ------------------------------------------------------------------

    /// Record that the running subscriber read `key` of `target`.
    ///
    /// No-op when tracking is paused or nothing is running. Re-tracking the
    /// same pair within one run is a cheap presence check.
    pub fn track(&self, target: &Identity, op: TrackOp, key: Key) {
        let Some(effect) = self.tracking_effect() else {
            return;
        };

        let dep = self.inner.targets.lock().dep_for(target, &key);
        if !dep.insert(&effect) {
            return;
        }
        effect.record_dep(dep);

        trace!(effect = %effect.id(), target = %target.id(), key = %key, ?op, "track");
        #[cfg(debug_assertions)]
        effect.debug_track(target.id(), op, key);
    }

    /// Announce a change to `target` and re-run the subscribers it reaches.
    ///
    /// The subscriber currently running is skipped unless it allows
    /// recursion. Each selected subscriber runs once, in selection order,
    /// through its scheduler when it has one.
    pub fn trigger(&self, target: &Identity, kind: TargetKind, event: TriggerEvent) {
        let deps = {
            let targets = self.inner.targets.lock();
            if !targets.contains(target.id()) {
                return;
            }
            targets.select(target.id(), kind, &event)
        };
        if deps.is_empty() {
            return;
        }

        let running = self.inner.effect_stack.lock().last().map(|effect| effect.id());
        let mut effects: IndexMap<SubscriberId, Arc<EffectInner>> = IndexMap::new();
        for dep in &deps {
            for effect in dep.subscribers() {
                if Some(effect.id()) != running || effect.allows_recurse() {
                    effects.entry(effect.id()).or_insert(effect);
                }
            }
        }

        trace!(
            target = %target.id(),
            key = %event.key,
            op = ?event.op,
            subscribers = effects.len(),
            "trigger"
        );

        for effect in effects.into_values() {
            #[cfg(debug_assertions)]
            effect.debug_trigger(target.id(), &event);
            effect.notify();
        }
    }

    // ------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------

    /// Number of objects with at least one recorded dependency key.
    pub fn tracked_target_count(&self) -> usize {
        self.inner.targets.lock().len()
    }

    /// Number of live subscribers recorded for `(target, key)`.
    pub fn dependent_count(&self, target: ObjectId, key: &Key) -> usize {
        let dep = self.inner.targets.lock().dep(target, key);
        dep.map_or(0, |dep| dep.len())
    }

    /// Drop graph and registry entries whose objects no longer exist.
    pub fn sweep(&self) -> usize {
        let graph = self.inner.targets.lock().sweep();
        graph + self.inner.registry.sweep()
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("tracked_targets", &self.tracked_target_count())
            .field("should_track", &self.should_track())
            .field("depth", &self.inner.effect_stack.lock().len())
            .finish()
    }
}

/// Pause tracking on the current thread's runtime.
pub fn pause_tracking() {
    Runtime::current().pause_tracking();
}

/// Enable tracking on the current thread's runtime.
pub fn enable_tracking() {
    Runtime::current().enable_tracking();
}

/// Restore the previous tracking flag on the current thread's runtime.
pub fn reset_tracking() {
    Runtime::current().reset_tracking();
}

/// Run `f` without recording dependencies on the current thread's runtime.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    Runtime::current().untracked(f)
}

/// [`Runtime::track`] on the current thread's runtime.
pub fn track(target: &Identity, op: TrackOp, key: Key) {
    Runtime::current().track(target, op, key);
}

/// [`Runtime::trigger`] on the current thread's runtime.
pub fn trigger(target: &Identity, kind: TargetKind, event: TriggerEvent) {
    Runtime::current().trigger(target, kind, event);
}
