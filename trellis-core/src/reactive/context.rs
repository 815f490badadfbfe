//! Reactive Context
//!
//! Scoped guards over the two stacks a [`Runtime`] keeps: the stack of
//! running subscribers and the stack of saved tracking flags.
//!
//! # Implementation
//!
//! Entering a scope pushes; dropping the guard pops. Because the pop lives
//! in `Drop`, both stacks are restored even when the computation panics,
//! so a failed effect never leaves the runtime believing it is still inside
//! that effect.

use std::sync::Arc;

use super::effect::EffectInner;
use super::runtime::Runtime;
use crate::graph::SubscriberId;

/// Guard marking a subscriber as the one currently running.
///
/// Tracking is force-enabled for the duration, so an effect re-run from
/// inside a paused region still records its own dependencies.
pub(crate) struct ActiveEffectScope<'a> {
    runtime: &'a Runtime,
    subscriber_id: SubscriberId,
}

impl<'a> ActiveEffectScope<'a> {
    pub(crate) fn enter(runtime: &'a Runtime, effect: Arc<EffectInner>) -> Self {
        let subscriber_id = effect.id();
        runtime.enable_tracking();
        runtime.push_effect(effect);
        Self {
            runtime,
            subscriber_id,
        }
    }
}

impl Drop for ActiveEffectScope<'_> {
    fn drop(&mut self) {
        let popped = self.runtime.pop_effect();

        // Verify we're popping the right subscriber.
        if let Some(effect) = &popped {
            debug_assert_eq!(
                effect.id(),
                self.subscriber_id,
                "effect stack mismatch: expected {}, got {}",
                self.subscriber_id,
                effect.id()
            );
        }
        self.runtime.reset_tracking();

        // The popped handle may be the last one; release it with no locks held.
        drop(popped);
    }
}

/// Guard that pauses tracking until dropped.
///
/// Nested pauses compose: dropping restores whatever the flag was before,
/// not unconditionally "on".
pub struct TrackingPause<'a> {
    runtime: &'a Runtime,
}

impl<'a> TrackingPause<'a> {
    /// Pause tracking on `runtime`.
    pub fn new(runtime: &'a Runtime) -> Self {
        runtime.pause_tracking();
        Self { runtime }
    }
}

impl Drop for TrackingPause<'_> {
    fn drop(&mut self) {
        self.runtime.reset_tracking();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::EffectOptions;

    #[test]
    fn scope_tracks_running_subscriber() {
        let runtime = Runtime::new();
        let effect = runtime.effect(|| {}, EffectOptions::new().lazy());

        assert!(runtime.active_effect().is_none());
        {
            let _scope = ActiveEffectScope::enter(&runtime, Arc::clone(effect.inner()));
            assert_eq!(runtime.active_effect().map(|e| e.id()), Some(effect.id()));
            assert!(runtime.is_tracking());
        }
        assert!(runtime.active_effect().is_none());
        assert!(!runtime.is_tracking());
    }

    #[test]
    fn nested_scopes_restore_outer() {
        let runtime = Runtime::new();
        let outer = runtime.effect(|| {}, EffectOptions::new().lazy());
        let inner = runtime.effect(|| {}, EffectOptions::new().lazy());

        let _outer_scope = ActiveEffectScope::enter(&runtime, Arc::clone(outer.inner()));
        {
            let _inner_scope = ActiveEffectScope::enter(&runtime, Arc::clone(inner.inner()));
            assert_eq!(runtime.active_effect().map(|e| e.id()), Some(inner.id()));
        }
        assert_eq!(runtime.active_effect().map(|e| e.id()), Some(outer.id()));
    }

    #[test]
    fn pauses_nest_and_restore_previous_state() {
        let runtime = Runtime::new();
        assert!(runtime.should_track());
        {
            let _outer = TrackingPause::new(&runtime);
            assert!(!runtime.should_track());

            runtime.enable_tracking();
            assert!(runtime.should_track());
            {
                let _inner = TrackingPause::new(&runtime);
                assert!(!runtime.should_track());
            }
            assert!(runtime.should_track());
            runtime.reset_tracking();

            assert!(!runtime.should_track());
        }
        assert!(runtime.should_track());
    }

    #[test]
    fn scope_pops_on_panic() {
        let runtime = Runtime::new();
        let effect = runtime.effect(|| {}, EffectOptions::new().lazy());

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _scope = ActiveEffectScope::enter(&runtime, Arc::clone(effect.inner()));
            panic!("computation failed");
        }));

        assert!(result.is_err());
        assert!(runtime.active_effect().is_none());
        assert!(runtime.should_track());
    }
}
