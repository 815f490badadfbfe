//! Effect Implementation
//!
//! An effect (subscriber) is a re-runnable computation whose reads are
//! tracked.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its function immediately to establish
//!    initial dependencies (unless created lazily).
//!
//! 2. Before every run, the effect removes itself from every dependency set
//!    it joined last time. A computation may read different fields on
//!    different runs, and stale subscriptions would cause both missed and
//!    spurious re-runs.
//!
//! 3. When a dependency changes, the effect is handed to its scheduler, or
//!    re-run synchronously when it has none.
//!
//! # Lifetime
//!
//! The dependency graph holds effects weakly. Stopping an effect, or
//! dropping every handle to it, removes it from the graph for good.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use smallvec::SmallVec;
use tracing::trace;

use super::context::ActiveEffectScope;
use super::runtime::Runtime;
use crate::graph::dep::Dep;
use crate::graph::{Key, ObjectId, SubscriberId, TrackOp, TriggerOp};
use crate::value::Value;

/// Custom dispatch for a triggered effect.
pub type Scheduler = Arc<dyn Fn(&ReactiveEffect) + Send + Sync>;

/// Diagnostic callback for track and trigger events.
pub type DebugHook = Arc<dyn Fn(&DebuggerEvent) + Send + Sync>;

/// Teardown callback run when an effect stops.
pub type StopHook = Arc<dyn Fn() + Send + Sync>;

/// Whether a [`DebuggerEvent`] records a read or a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugKind {
    /// A dependency was recorded.
    Track(TrackOp),
    /// A dependency fired.
    Trigger(TriggerOp),
}

/// Payload handed to `on_track` / `on_trigger` hooks.
#[derive(Debug, Clone)]
pub struct DebuggerEvent {
    /// The subscriber the event concerns.
    pub effect: SubscriberId,
    /// The object read or written.
    pub target: ObjectId,
    /// Read or write, and which kind.
    pub kind: DebugKind,
    /// The key read or written.
    pub key: Key,
    /// Value after a write.
    pub new_value: Option<Value>,
    /// Value before a write.
    pub old_value: Option<Value>,
}

/// Options recognized when creating an effect.
#[derive(Clone, Default)]
pub struct EffectOptions {
    /// Skip the initial run.
    pub lazy: bool,
    /// Let the effect be re-triggered by its own writes.
    pub allow_recurse: bool,
    /// Replace the default synchronous re-run.
    pub scheduler: Option<Scheduler>,
    /// Called when a dependency is recorded. Debug builds only.
    pub on_track: Option<DebugHook>,
    /// Called when a dependency fires. Debug builds only.
    pub on_trigger: Option<DebugHook>,
    /// Called once when the effect stops.
    pub on_stop: Option<StopHook>,
}

impl EffectOptions {
    /// Default options: run immediately, re-run synchronously.
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip the initial run.
    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    /// Permit self-retriggering.
    pub fn allow_recurse(mut self) -> Self {
        self.allow_recurse = true;
        self
    }

    /// Dispatch re-runs through `scheduler`.
    pub fn scheduler<F>(mut self, scheduler: F) -> Self
    where
        F: Fn(&ReactiveEffect) + Send + Sync + 'static,
    {
        self.scheduler = Some(Arc::new(scheduler));
        self
    }

    /// Observe recorded dependencies.
    pub fn on_track<F>(mut self, hook: F) -> Self
    where
        F: Fn(&DebuggerEvent) + Send + Sync + 'static,
    {
        self.on_track = Some(Arc::new(hook));
        self
    }

    /// Observe fired dependencies.
    pub fn on_trigger<F>(mut self, hook: F) -> Self
    where
        F: Fn(&DebuggerEvent) + Send + Sync + 'static,
    {
        self.on_trigger = Some(Arc::new(hook));
        self
    }

    /// Run `hook` when the effect stops.
    pub fn on_stop<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_stop = Some(Arc::new(hook));
        self
    }
}

impl fmt::Debug for EffectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectOptions")
            .field("lazy", &self.lazy)
            .field("allow_recurse", &self.allow_recurse)
            .field("scheduler", &self.scheduler.is_some())
            .field("on_track", &self.on_track.is_some())
            .field("on_trigger", &self.on_trigger.is_some())
            .field("on_stop", &self.on_stop.is_some())
            .finish()
    }
}

pub(crate) struct EffectInner {
    id: SubscriberId,
    runtime: Runtime,
    func: Box<dyn Fn() + Send + Sync>,
    active: AtomicBool,
    /// Reverse index: every dependency set this effect currently sits in.
    deps: Mutex<SmallVec<[Arc<Dep>; 4]>>,
    run_count: AtomicUsize,
    options: EffectOptions,
}

impl EffectInner {
    pub(crate) fn id(&self) -> SubscriberId {
        self.id
    }

    pub(crate) fn allows_recurse(&self) -> bool {
        self.options.allow_recurse
    }

    pub(crate) fn record_dep(&self, dep: Arc<Dep>) {
        self.deps.lock().push(dep);
    }

    fn cleanup(&self) {
        let deps = std::mem::take(&mut *self.deps.lock());
        for dep in deps {
            dep.remove(self.id);
        }
    }

    pub(crate) fn run(self: &Arc<Self>) {
        if !self.active.load(Ordering::Acquire) {
            if self.options.scheduler.is_none() {
                self.runtime.untracked(|| (self.func)());
            }
            return;
        }
        if self.runtime.is_running(self.id) {
            trace!(effect = %self.id, "skipping re-entrant run");
            return;
        }

        self.cleanup();
        let _scope = ActiveEffectScope::enter(&self.runtime, Arc::clone(self));
        self.run_count.fetch_add(1, Ordering::Relaxed);
        trace!(effect = %self.id, "run");
        (self.func)();
    }

    /// Called by `trigger` for each selected subscriber.
    pub(crate) fn notify(self: &Arc<Self>) {
        if !self.active.load(Ordering::Acquire) {
            return;
        }
        match &self.options.scheduler {
            Some(scheduler) => scheduler(&ReactiveEffect::from_inner(Arc::clone(self))),
            None => self.run(),
        }
    }

    fn stop(&self) {
        if self.active.swap(false, Ordering::AcqRel) {
            self.cleanup();
            trace!(effect = %self.id, "stopped");
            if let Some(on_stop) = &self.options.on_stop {
                on_stop();
            }
        }
    }

    #[cfg(debug_assertions)]
    pub(crate) fn debug_track(&self, target: ObjectId, op: TrackOp, key: Key) {
        if let Some(hook) = &self.options.on_track {
            hook(&DebuggerEvent {
                effect: self.id,
                target,
                kind: DebugKind::Track(op),
                key,
                new_value: None,
                old_value: None,
            });
        }
    }

    #[cfg(debug_assertions)]
    pub(crate) fn debug_trigger(&self, target: ObjectId, event: &crate::graph::TriggerEvent) {
        if let Some(hook) = &self.options.on_trigger {
            hook(&DebuggerEvent {
                effect: self.id,
                target,
                kind: DebugKind::Trigger(event.op),
                key: event.key.clone(),
                new_value: event.new_value.clone(),
                old_value: event.old_value.clone(),
            });
        }
    }
}

impl Drop for EffectInner {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Handle to a subscriber.
///
/// # Example
///
/// ```rust,ignore
/// let state = reactive(json!({ "count": 0 }));
///
/// let effect = effect(move || {
///     println!("count is {:?}", state.get("count"));
/// });
///
/// state.set("count", 5); // prints "count is Int(5)"
/// ```
#[derive(Clone)]
pub struct ReactiveEffect {
    inner: Arc<EffectInner>,
}

impl ReactiveEffect {
    pub(crate) fn new<F>(runtime: Runtime, func: F, options: EffectOptions) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(EffectInner {
                id: SubscriberId::new(),
                runtime,
                func: Box::new(func),
                active: AtomicBool::new(true),
                deps: Mutex::new(SmallVec::new()),
                run_count: AtomicUsize::new(0),
                options,
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<EffectInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn inner(&self) -> &Arc<EffectInner> {
        &self.inner
    }

    /// The subscriber id.
    pub fn id(&self) -> SubscriberId {
        self.inner.id
    }

    /// Run the computation now, re-collecting its dependencies.
    ///
    /// Does nothing if the effect is already running further up the stack.
    /// A stopped effect without a scheduler still runs its function, with
    /// tracking paused so its reads reach no outer effect either.
    pub fn run(&self) {
        self.inner.run();
    }

    /// Unsubscribe from everything and never run again from a trigger.
    pub fn stop(&self) {
        self.inner.stop();
    }

    /// Whether the effect has not been stopped.
    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::Acquire)
    }

    /// Whether the effect may re-trigger itself.
    pub fn allows_recurse(&self) -> bool {
        self.inner.allows_recurse()
    }

    /// Number of completed or in-progress tracked runs.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.load(Ordering::Relaxed)
    }

    /// Number of dependency sets the effect currently sits in.
    pub fn dependency_count(&self) -> usize {
        self.inner.deps.lock().len()
    }

    /// The runtime the effect runs in.
    pub fn runtime(&self) -> &Runtime {
        &self.inner.runtime
    }
}

impl PartialEq for ReactiveEffect {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for ReactiveEffect {}

impl fmt::Debug for ReactiveEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveEffect")
            .field("id", &self.id())
            .field("active", &self.is_active())
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .finish()
    }
}

impl Runtime {
    /// Create an effect in this runtime. Runs it once unless `options.lazy`.
    #[must_use = "dropping the last handle to an effect stops it"]
    pub fn effect<F>(&self, func: F, options: EffectOptions) -> ReactiveEffect
    where
        F: Fn() + Send + Sync + 'static,
    {
        let lazy = options.lazy;
        let effect = ReactiveEffect::new(self.clone(), func, options);
        if !lazy {
            effect.run();
        }
        effect
    }
}

/// Run `func` as an effect on the current thread's runtime.
#[must_use = "dropping the last handle to an effect stops it"]
pub fn effect<F>(func: F) -> ReactiveEffect
where
    F: Fn() + Send + Sync + 'static,
{
    Runtime::current().effect(func, EffectOptions::default())
}

/// Run `func` as an effect with `options` on the current thread's runtime.
#[must_use = "dropping the last handle to an effect stops it"]
pub fn effect_with<F>(func: F, options: EffectOptions) -> ReactiveEffect
where
    F: Fn() + Send + Sync + 'static,
{
    Runtime::current().effect(func, options)
}

/// Stop an effect.
pub fn stop(effect: &ReactiveEffect) {
    effect.stop();
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Identity, TargetKind, TriggerEvent};
    use std::sync::atomic::AtomicI32;

    #[test]
    fn effect_runs_on_creation() {
        let run_count = Arc::new(AtomicI32::new(0));
        let run_count_clone = run_count.clone();

        let effect = effect(move || {
            run_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(run_count.load(Ordering::SeqCst), 1);
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn lazy_effect_does_not_run_on_creation() {
        let run_count = Arc::new(AtomicI32::new(0));
        let run_count_clone = run_count.clone();

        let effect = effect_with(
            move || {
                run_count_clone.fetch_add(1, Ordering::SeqCst);
            },
            EffectOptions::new().lazy(),
        );

        assert_eq!(run_count.load(Ordering::SeqCst), 0);

        effect.run();
        assert_eq!(run_count.load(Ordering::SeqCst), 1);
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn stop_unsubscribes_and_calls_hook() {
        let runtime = Runtime::new();
        let target = Arc::new(Identity::new());
        let runs = Arc::new(AtomicI32::new(0));
        let stops = Arc::new(AtomicI32::new(0));

        let effect = {
            let (rt, target, runs) = (runtime.clone(), target.clone(), runs.clone());
            let stops = stops.clone();
            runtime.effect(
                move || {
                    runs.fetch_add(1, Ordering::SeqCst);
                    rt.track(&target, TrackOp::Get, Key::from("a"));
                },
                EffectOptions::new().on_stop(move || {
                    stops.fetch_add(1, Ordering::SeqCst);
                }),
            )
        };

        stop(&effect);
        stop(&effect);
        assert!(!effect.is_active());
        assert_eq!(stops.load(Ordering::SeqCst), 1);
        assert_eq!(effect.dependency_count(), 0);
        assert_eq!(runtime.dependent_count(target.id(), &Key::from("a")), 0);

        runtime.trigger(&target, TargetKind::Record, TriggerEvent::new(TriggerOp::Set, Key::from("a")));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropping_last_handle_unsubscribes() {
        let runtime = Runtime::new();
        let target = Arc::new(Identity::new());
        {
            let (rt, t) = (runtime.clone(), target.clone());
            let _effect = runtime.effect(
                move || rt.track(&t, TrackOp::Get, Key::from("a")),
                EffectOptions::new(),
            );
            assert_eq!(runtime.dependent_count(target.id(), &Key::from("a")), 1);
        }
        assert_eq!(runtime.dependent_count(target.id(), &Key::from("a")), 0);
    }

    #[test]
    fn scheduler_replaces_rerun() {
        let runtime = Runtime::new();
        let target = Arc::new(Identity::new());
        let runs = Arc::new(AtomicI32::new(0));
        let queue: Arc<Mutex<Vec<ReactiveEffect>>> = Arc::new(Mutex::new(Vec::new()));

        let _effect = {
            let (rt, target, runs, queue) = (runtime.clone(), target.clone(), runs.clone(), queue.clone());
            runtime.effect(
                move || {
                    runs.fetch_add(1, Ordering::SeqCst);
                    rt.track(&target, TrackOp::Get, Key::from("a"));
                },
                EffectOptions::new().scheduler(move |effect| queue.lock().push(effect.clone())),
            )
        };

        runtime.trigger(&target, TargetKind::Record, TriggerEvent::new(TriggerOp::Set, Key::from("a")));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(queue.lock().len(), 1);

        let queued = queue.lock().pop();
        if let Some(effect) = queued {
            effect.run();
        }
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn stopped_effect_without_scheduler_runs_untracked() {
        let runtime = Runtime::new();
        let target = Arc::new(Identity::new());
        let runs = Arc::new(AtomicI32::new(0));

        let effect = {
            let (rt, target, runs) = (runtime.clone(), target.clone(), runs.clone());
            runtime.effect(
                move || {
                    runs.fetch_add(1, Ordering::SeqCst);
                    rt.track(&target, TrackOp::Get, Key::from("a"));
                },
                EffectOptions::new(),
            )
        };
        effect.stop();
        effect.run();

        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(effect.run_count(), 1);
        assert_eq!(runtime.dependent_count(target.id(), &Key::from("a")), 0);
    }

    #[test]
    fn stopped_effect_reads_do_not_reach_outer_effect() {
        let runtime = Runtime::new();
        let target = Arc::new(Identity::new());

        let inner = {
            let (rt, target) = (runtime.clone(), target.clone());
            runtime.effect(
                move || rt.track(&target, TrackOp::Get, Key::from("a")),
                EffectOptions::new().lazy(),
            )
        };
        inner.stop();

        let outer = {
            let inner = inner.clone();
            runtime.effect(move || inner.run(), EffectOptions::new())
        };

        assert_eq!(outer.dependency_count(), 0);
        assert_eq!(runtime.dependent_count(target.id(), &Key::from("a")), 0);
    }

    #[cfg(debug_assertions)]
    #[test]
    fn debug_hooks_observe_track_and_trigger() {
        let runtime = Runtime::new();
        let target = Arc::new(Identity::new());
        let events: Arc<Mutex<Vec<DebugKind>>> = Arc::new(Mutex::new(Vec::new()));

        let _effect = {
            let (rt, target) = (runtime.clone(), target.clone());
            let (tracked, triggered) = (events.clone(), events.clone());
            runtime.effect(
                move || rt.track(&target, TrackOp::Has, Key::from("a")),
                EffectOptions::new()
                    .on_track(move |event| tracked.lock().push(event.kind))
                    .on_trigger(move |event| triggered.lock().push(event.kind)),
            )
        };

        runtime.trigger(&target, TargetKind::Record, TriggerEvent::new(TriggerOp::Delete, Key::from("a")));

        assert_eq!(
            *events.lock(),
            vec![
                DebugKind::Track(TrackOp::Has),
                DebugKind::Trigger(TriggerOp::Delete),
                DebugKind::Track(TrackOp::Has),
            ]
        );
    }

    #[test]
    fn panicking_effect_restores_runtime() {
        let runtime = Runtime::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _effect = runtime.effect(|| panic!("derivation failed"), EffectOptions::new());
        }));

        assert!(result.is_err());
        assert!(runtime.active_effect().is_none());
        assert!(runtime.should_track());
    }
}
