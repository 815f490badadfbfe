//! Trellis Core
//!
//! A fine-grained reactive dependency-tracking runtime. Plain containers are
//! wrapped in observable views; effects and computed values record which
//! (target, key) pairs they read, and re-run exactly when those change.
//!
//! # Architecture
//!
//! - `graph`: the two-level `target -> key -> subscribers` dependency graph
//!   and the policy selecting who re-runs for a given write
//! - `reactive`: the runtime context, effects, computed values and refs
//! - `proxy`: views, their trap sets, and the identity registry
//! - `value`: the plain data model and its JSON conversion
//!
//! # Example
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//!
//! use serde_json::json;
//! use trellis_core::proxy::reactive;
//! use trellis_core::reactive::effect;
//!
//! let state = reactive(json!({ "count": 0 })).into_view().unwrap();
//! let log = Arc::new(Mutex::new(Vec::new()));
//!
//! let _effect = {
//!     let (state, log) = (state.clone(), log.clone());
//!     effect(move || log.lock().unwrap().push(state.get("count")))
//! };
//!
//! state.set("count", 1);
//! state.set("count", 1);
//! assert_eq!(log.lock().unwrap().len(), 2);
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod proxy;
pub mod reactive;
pub mod value;

pub use config::RuntimeConfig;
pub use error::{ReactiveError, Result};
pub use proxy::{
    is_proxy, is_reactive, is_readonly, mark_raw, reactive, readonly, shallow_reactive,
    shallow_readonly, to_raw, View,
};
pub use reactive::{
    computed, effect, effect_with, stop, untracked, writable_computed, Computed, EffectOptions,
    ReactiveEffect, Ref, Runtime,
};
pub use value::{Target, Value};
