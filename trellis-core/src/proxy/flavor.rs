//! Capability combinations a view can be created with.

use std::fmt;

use super::handlers::{
    ProxyHandler, MUTABLE_HANDLER, READONLY_HANDLER, SHALLOW_MUTABLE_HANDLER,
    SHALLOW_READONLY_HANDLER,
};

/// {mutable | readonly} × {deep | shallow}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Flavor {
    /// Writes and deletes are refused.
    pub readonly: bool,
    /// Only the root level is intercepted; nested values come back raw.
    pub shallow: bool,
}

impl Flavor {
    /// Deep and mutable.
    pub const REACTIVE: Flavor = Flavor {
        readonly: false,
        shallow: false,
    };
    /// Mutable, root level only.
    pub const SHALLOW_REACTIVE: Flavor = Flavor {
        readonly: false,
        shallow: true,
    };
    /// Deep and readonly.
    pub const READONLY: Flavor = Flavor {
        readonly: true,
        shallow: false,
    };
    /// Readonly, root level only.
    pub const SHALLOW_READONLY: Flavor = Flavor {
        readonly: true,
        shallow: true,
    };

    /// The trap set views of this flavor dispatch through.
    pub fn handler(self) -> &'static dyn ProxyHandler {
        match (self.readonly, self.shallow) {
            (false, false) => &MUTABLE_HANDLER,
            (false, true) => &SHALLOW_MUTABLE_HANDLER,
            (true, false) => &READONLY_HANDLER,
            (true, true) => &SHALLOW_READONLY_HANDLER,
        }
    }

    /// Registry slot.
    pub(crate) fn slot(self) -> usize {
        usize::from(self.readonly) * 2 + usize::from(self.shallow)
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match (self.readonly, self.shallow) {
            (false, false) => "reactive",
            (false, true) => "shallow-reactive",
            (true, false) => "readonly",
            (true, true) => "shallow-readonly",
        })
    }
}
