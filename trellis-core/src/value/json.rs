//! Conversion between targets and JSON.

use std::collections::HashSet;

use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use serde_json::{Map, Number};

use super::target::Container;
use super::{Target, Value};
use crate::error::{ReactiveError, Result};
use crate::graph::ObjectId;

impl Value {
    /// Build a value from JSON. Objects and arrays become fresh targets.
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Str(s.into()),
            serde_json::Value::Array(items) => Value::Object(Target::from_values(
                items.into_iter().map(Value::from_json),
            )),
            serde_json::Value::Object(fields) => Value::Object(Target::from_entries(
                fields
                    .into_iter()
                    .map(|(key, value)| (key, Value::from_json(value))),
            )),
        }
    }

    /// Snapshot this value as JSON.
    ///
    /// Views serialize their raw target and refs their current value.
    /// Non-finite floats and containers already being serialized further up
    /// (cycles) become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        self.to_json_guarded(&mut HashSet::new())
    }

    fn to_json_guarded(&self, seen: &mut HashSet<ObjectId>) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::Number((*i).into()),
            Value::Float(f) => Number::from_f64(*f).map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::Str(s) => serde_json::Value::String(s.to_string()),
            Value::Object(target) => target.to_json_guarded(seen),
            Value::View(view) => view.to_raw_target().to_json_guarded(seen),
            Value::Ref(handle) => handle.peek().to_json_guarded(seen),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Value::from_json(json)
    }
}

impl Target {
    /// Build a target from a JSON object or array.
    pub fn from_json(json: serde_json::Value) -> Result<Self> {
        let found = match &json {
            serde_json::Value::Null => "null",
            serde_json::Value::Bool(_) => "boolean",
            serde_json::Value::Number(_) => "number",
            serde_json::Value::String(_) => "string",
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => "",
        };
        match Value::from_json(json) {
            Value::Object(target) => Ok(target),
            _ => Err(ReactiveError::NotAContainer { found }),
        }
    }

    /// Parse JSON text into a target.
    pub fn parse(text: &str) -> Result<Self> {
        Self::from_json(serde_json::from_str(text)?)
    }

    /// Snapshot this target as JSON.
    pub fn to_json(&self) -> serde_json::Value {
        self.to_json_guarded(&mut HashSet::new())
    }

    /// Deserialize a snapshot of this target into `T`.
    pub fn deserialize_into<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.to_json()).map_err(ReactiveError::Deserialize)
    }

    fn to_json_guarded(&self, seen: &mut HashSet<ObjectId>) -> serde_json::Value {
        if !seen.insert(self.id()) {
            return serde_json::Value::Null;
        }
        // Snapshot first; nested targets take their own locks.
        let json = match &*self.container() {
            Container::Record(fields) => Snapshot::Record(
                fields
                    .iter()
                    .map(|(key, value)| (key.to_string(), value.clone()))
                    .collect(),
            ),
            Container::Sequence(items) => Snapshot::Sequence(items.clone()),
        };
        let json = match json {
            Snapshot::Record(fields) => serde_json::Value::Object(
                fields
                    .into_iter()
                    .map(|(key, value)| (key, value.to_json_guarded(seen)))
                    .collect::<Map<_, _>>(),
            ),
            Snapshot::Sequence(items) => serde_json::Value::Array(
                items
                    .iter()
                    .map(|value| value.to_json_guarded(seen))
                    .collect(),
            ),
        };
        seen.remove(&self.id());
        json
    }
}

enum Snapshot {
    Record(Vec<(String, Value)>),
    Sequence(Vec<Value>),
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl Serialize for Target {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}
