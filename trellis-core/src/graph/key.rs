//! Dependency keys.

use std::fmt;
use std::sync::Arc;

/// Reads of these never register a dependency.
const NON_TRACKABLE_FIELDS: &[&str] = &["__proto__"];

/// The second level of the dependency graph: which part of a target was read.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// A named property of a record.
    Field(Arc<str>),
    /// An integer index into a sequence.
    Index(usize),
    /// The `"length"` of a sequence.
    Length,
    /// The `"value"` slot of a ref or computed value.
    Value,
    /// Synthetic key standing for "the key set of this target".
    Iterate,
    /// Synthetic key standing for "the key set of this map-like collection".
    MapKeyIterate,
}

impl Key {
    /// Build a field key.
    pub fn field(name: impl Into<Arc<str>>) -> Self {
        Key::Field(name.into())
    }

    /// Whether this is an integer index.
    pub fn is_index(&self) -> bool {
        matches!(self, Key::Index(_))
    }

    /// Built-in keys are read through without tracking.
    pub fn is_trackable(&self) -> bool {
        match self {
            Key::Field(name) => !NON_TRACKABLE_FIELDS.contains(&name.as_ref()),
            _ => true,
        }
    }

    /// Rewrite a user-supplied key into the form a record or sequence stores.
    ///
    /// Sequences understand `"length"` and canonical decimal strings as
    /// [`Key::Length`] and [`Key::Index`]; records only have named fields.
    pub(crate) fn normalize(self, sequence: bool) -> Key {
        match (self, sequence) {
            (Key::Field(name), true) => {
                if name.as_ref() == "length" {
                    Key::Length
                } else if let Some(index) = parse_index(&name) {
                    Key::Index(index)
                } else {
                    Key::Field(name)
                }
            }
            (Key::Index(index), false) => Key::Field(index.to_string().into()),
            (Key::Length, false) => Key::Field("length".into()),
            (key, _) => key,
        }
    }
}

/// Canonical decimal only: `"01"`, `"-1"` and `"+1"` are plain field names.
fn parse_index(name: &str) -> Option<usize> {
    let index = name.parse::<usize>().ok()?;
    (index.to_string() == name).then_some(index)
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Field(name) => f.write_str(name),
            Key::Index(index) => write!(f, "{index}"),
            Key::Length => f.write_str("length"),
            Key::Value => f.write_str("value"),
            Key::Iterate => f.write_str("<iterate>"),
            Key::MapKeyIterate => f.write_str("<map-key-iterate>"),
        }
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Field(name.into())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Field(name.into())
    }
}

impl From<Arc<str>> for Key {
    fn from(name: Arc<str>) -> Self {
        Key::Field(name)
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Key::Index(index)
    }
}
