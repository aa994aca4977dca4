//! Bounded conversion of arbitrary values into loggable form.
//!
//! Values passed through hook points can be deeply nested, self-referential,
//! or huge. The [`Sanitizer`] walks them with a depth limit, a per-path
//! identity set for cycle detection, and a collection size threshold, and
//! produces a [`LogValue`] tree that is always finite and serializable.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use cartprobe_foundation::{ObjectRef, Shape, Value};
use indexmap::IndexMap;
use serde::{Serialize, Serializer};

use crate::config::SanitizeConfig;

// =============================================================================
// Marker
// =============================================================================

/// Placeholder emitted where a value was not traversed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Marker {
    /// The value sat deeper than the configured maximum.
    MaxDepth,
    /// The object is already on the current traversal path.
    Circular(String),
    /// An object that is summarized by class only.
    Object(String),
    /// An object whose state was being mutated while it was read.
    Busy(String),
    /// A collection over the size threshold.
    LargeCollection(usize),
    /// An external handle such as a file or socket.
    Resource,
    /// The payload could not be captured at all.
    Unavailable,
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxDepth => write!(f, "[Max Depth Reached]"),
            Self::Circular(class) => write!(f, "[Circular Reference: {class}]"),
            Self::Object(class) => write!(f, "[Object: {class}]"),
            Self::Busy(class) => write!(f, "[Object: {class} (busy)]"),
            Self::LargeCollection(len) => write!(f, "[Large Collection: {len} items]"),
            Self::Resource => write!(f, "[Resource]"),
            Self::Unavailable => write!(f, "[Unavailable]"),
        }
    }
}

// =============================================================================
// Log Value
// =============================================================================

/// A finite, acyclic, serializable value tree.
#[derive(Clone, Debug, PartialEq)]
pub enum LogValue {
    /// Absent value.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Float.
    Float(f64),
    /// String.
    String(String),
    /// Ordered list.
    List(Vec<LogValue>),
    /// Map preserving insertion order.
    Map(IndexMap<String, LogValue>),
    /// A value that was summarized instead of traversed.
    Marker(Marker),
}

impl LogValue {
    /// Builds a map from key/value pairs.
    #[must_use]
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, LogValue)>) -> Self {
        Self::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Looks up a key in a map value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&LogValue> {
        match self {
            Self::Map(map) => map.get(key),
            _ => None,
        }
    }

    /// Returns the string content, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the marker, if this value was summarized.
    #[must_use]
    pub const fn as_marker(&self) -> Option<&Marker> {
        match self {
            Self::Marker(m) => Some(m),
            _ => None,
        }
    }

    /// Returns the list items, if this is a list.
    #[must_use]
    pub fn as_list(&self) -> Option<&[LogValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns true if any node in the tree is a marker.
    #[must_use]
    pub fn contains_marker(&self) -> bool {
        match self {
            Self::Marker(_) => true,
            Self::List(items) => items.iter().any(Self::contains_marker),
            Self::Map(map) => map.values().any(Self::contains_marker),
            _ => false,
        }
    }
}

impl From<Marker> for LogValue {
    fn from(marker: Marker) -> Self {
        Self::Marker(marker)
    }
}

impl From<&str> for LogValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for LogValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for LogValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<bool> for LogValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl Serialize for LogValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(n) => serializer.serialize_i64(*n),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::String(s) => serializer.serialize_str(s),
            Self::List(items) => items.serialize(serializer),
            Self::Map(map) => map.serialize(serializer),
            Self::Marker(marker) => serializer.collect_str(marker),
        }
    }
}

// =============================================================================
// Seen Set
// =============================================================================

/// Identities of the objects on the current traversal path.
///
/// An identity is inserted when traversal enters an object and removed when
/// it leaves, so an object shared by two siblings is rendered twice while an
/// object reachable from itself is rendered once and then marked circular.
#[derive(Clone, Debug, Default)]
pub struct SeenSet {
    ids: HashSet<usize>,
}

impl SeenSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks an object as on-path. Returns false if it already was.
    pub fn enter(&mut self, object: &ObjectRef) -> bool {
        self.ids.insert(object.identity())
    }

    /// Marks an object as off-path.
    pub fn leave(&mut self, object: &ObjectRef) {
        self.ids.remove(&object.identity());
    }

    /// Returns true if the object is on the current path.
    #[must_use]
    pub fn contains(&self, object: &ObjectRef) -> bool {
        self.ids.contains(&object.identity())
    }

    /// Returns true if no object is on the path.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

// =============================================================================
// Sanitizer
// =============================================================================

/// Converts [`Value`]s into bounded [`LogValue`]s.
#[derive(Clone, Debug, Default)]
pub struct Sanitizer {
    config: SanitizeConfig,
}

impl Sanitizer {
    /// Creates a sanitizer with the given limits.
    #[must_use]
    pub const fn new(config: SanitizeConfig) -> Self {
        Self { config }
    }

    /// Returns the active limits.
    #[must_use]
    pub const fn config(&self) -> &SanitizeConfig {
        &self.config
    }

    /// Sanitizes a value from the top level.
    #[must_use]
    pub fn sanitize(&self, value: &Value) -> LogValue {
        let mut seen = SeenSet::new();
        self.sanitize_from(value, 0, &mut seen)
    }

    /// Sanitizes a value that sits at `depth` below some root whose on-path
    /// objects are in `seen`.
    ///
    /// `seen` is returned to its prior contents when this call returns.
    pub fn sanitize_from(&self, value: &Value, depth: usize, seen: &mut SeenSet) -> LogValue {
        if depth > self.config.max_depth {
            return Marker::MaxDepth.into();
        }

        match value {
            Value::Null => LogValue::Null,
            Value::Bool(b) => LogValue::Bool(*b),
            Value::Int(n) => LogValue::Int(*n),
            Value::Float(f) => LogValue::Float(*f),
            Value::String(s) => LogValue::String(s.to_string()),
            Value::Resource(_) => Marker::Resource.into(),
            Value::List(items) => {
                if items.len() > self.config.max_collection_len {
                    return Marker::LargeCollection(items.len()).into();
                }
                LogValue::List(
                    items
                        .iter()
                        .map(|item| self.sanitize_from(item, depth + 1, seen))
                        .collect(),
                )
            }
            Value::Map(entries) => self.sanitize_entries(entries, depth, seen),
            Value::Object(object) => {
                if !seen.enter(object) {
                    return Marker::Circular(object.class().to_string()).into();
                }
                let result = self.sanitize_object(object, depth, seen);
                seen.leave(object);
                result
            }
        }
    }

    fn sanitize_entries(
        &self,
        entries: &[(Arc<str>, Value)],
        depth: usize,
        seen: &mut SeenSet,
    ) -> LogValue {
        if entries.len() > self.config.max_collection_len {
            return Marker::LargeCollection(entries.len()).into();
        }
        let mut map = IndexMap::with_capacity(entries.len());
        for (key, value) in entries {
            map.insert(key.to_string(), self.sanitize_from(value, depth + 1, seen));
        }
        LogValue::Map(map)
    }

    fn sanitize_object(&self, object: &ObjectRef, depth: usize, seen: &mut SeenSet) -> LogValue {
        let class = object.class();
        let Some(shape) = object.shape() else {
            return Marker::Busy(class.to_string()).into();
        };

        match &*shape {
            Shape::Coupon {
                id,
                code,
                amount,
                discount_type,
            } => LogValue::map([
                ("type", LogValue::from(class)),
                ("id", LogValue::Int(i64::try_from(*id).unwrap_or(i64::MAX))),
                ("code", LogValue::from(code.as_str())),
                ("amount", LogValue::Float(*amount)),
                ("discount_type", LogValue::from(discount_type.as_str())),
            ]),
            Shape::Product { id, name } => LogValue::map([
                ("type", LogValue::from(class)),
                ("id", LogValue::Int(i64::try_from(*id).unwrap_or(i64::MAX))),
                ("name", LogValue::from(name.as_str())),
            ]),
            Shape::Error { code, message } => LogValue::map([
                ("type", LogValue::from(class)),
                ("code", LogValue::from(code.as_str())),
                ("message", LogValue::from(message.as_str())),
            ]),
            Shape::Record(fields) => self.sanitize_entries(fields, depth, seen),
            Shape::Cart | Shape::Opaque(_) => Marker::Object(class.to_string()).into(),
        }
    }
}
