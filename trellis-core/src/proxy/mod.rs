//! Interception Layer
//!
//! A [`View`] wraps a raw [`Target`](crate::value::Target) and routes every
//! read, write, delete, presence query and key enumeration through a
//! [`ProxyHandler`]. Reads call `track`, writes call `trigger`, and nested
//! containers are wrapped lazily as they are read.
//!
//! Views come in four flavors ({mutable | readonly} × {deep | shallow}); the
//! registry guarantees one live view per subject and flavor.

mod array;
mod flavor;
mod handlers;
mod registry;
mod view;

pub use flavor::Flavor;
pub use handlers::{
    MutableHandler, ProxyHandler, ReadonlyHandler, MUTABLE_HANDLER, READONLY_HANDLER,
    SHALLOW_MUTABLE_HANDLER, SHALLOW_READONLY_HANDLER,
};
pub(crate) use registry::Registry;
pub use registry::{
    is_proxy, is_reactive, is_readonly, mark_raw, reactive, readonly, shallow_reactive,
    shallow_readonly, to_raw,
};
pub use view::View;
