//! Dynamic values passed through hook points and stored in sessions.
//!
//! Hook arguments are whatever the engine and its extensions decide to pass,
//! so they are modelled as an open [`Value`] tree. Object nodes are shared,
//! interiorly mutable, and carry identity: two [`ObjectRef`]s are equal only
//! when they point at the same object, which is what makes self-referential
//! graphs expressible (and what the sanitizer has to defend against).

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// A dynamic value.
///
/// Cloning is cheap: strings are reference counted and objects are shared.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Absence of a value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit floating point.
    Float(f64),
    /// String value.
    String(Arc<str>),
    /// Ordered sequence.
    List(Vec<Value>),
    /// Ordered string-keyed mapping.
    Map(Vec<(Arc<str>, Value)>),
    /// Shared object with identity.
    Object(ObjectRef),
    /// Opaque external handle (stream, connection, ...), labelled by kind.
    Resource(Arc<str>),
}

impl Value {
    /// Creates a string value.
    #[must_use]
    pub fn string(s: impl AsRef<str>) -> Self {
        Self::String(Arc::from(s.as_ref()))
    }

    /// Creates a list value.
    #[must_use]
    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Self::List(items.into_iter().collect())
    }

    /// Creates a map value, preserving entry order.
    #[must_use]
    pub fn map<K: AsRef<str>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Self::Map(
            entries
                .into_iter()
                .map(|(k, v)| (Arc::from(k.as_ref()), v))
                .collect(),
        )
    }

    /// Creates an empty list.
    #[must_use]
    pub fn empty_list() -> Self {
        Self::List(Vec::new())
    }

    /// Returns a short name for the value's type.
    #[must_use]
    pub fn type_name(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Bool(_) => "bool".to_string(),
            Self::Int(_) => "int".to_string(),
            Self::Float(_) => "float".to_string(),
            Self::String(_) => "string".to_string(),
            Self::List(_) => "list".to_string(),
            Self::Map(_) => "map".to_string(),
            Self::Object(obj) => obj.class().to_string(),
            Self::Resource(kind) => format!("resource({kind})"),
        }
    }

    /// Returns true if this value is null.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns true unless the value is null, false, zero, or empty.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null | Self::Bool(false) | Self::Int(0) => false,
            Self::Float(f) => *f != 0.0,
            Self::String(s) => !s.is_empty(),
            Self::List(items) => !items.is_empty(),
            Self::Map(entries) => !entries.is_empty(),
            _ => true,
        }
    }

    /// Attempts to extract a boolean.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Attempts to extract an integer.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Attempts to extract a string slice.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Attempts to extract an object reference.
    #[must_use]
    pub const fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Looks up a key in a map value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Map(entries) => entries.iter().find(|(k, _)| &**k == key).map(|(_, v)| v),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(Arc::from(s))
    }
}

impl From<ObjectRef> for Value {
    fn from(obj: ObjectRef) -> Self {
        Self::Object(obj)
    }
}

// =============================================================================
// Objects
// =============================================================================

/// The recognizable structure of an object.
///
/// A handful of domain types are known by shape so diagnostics can show their
/// important fields; everything else is either field-bearing or opaque.
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    /// A discount code entity.
    Coupon {
        /// Engine-side identifier (0 when not persisted).
        id: u64,
        /// The code customers type.
        code: String,
        /// Discount amount (percentage or fixed, per `discount_type`).
        amount: f64,
        /// Discount type label, e.g. `percent` or `fixed_cart`.
        discount_type: String,
    },
    /// A product or cart line item.
    Product {
        /// Product identifier.
        id: u64,
        /// Display name.
        name: String,
    },
    /// The cart itself; never traversed.
    Cart,
    /// An error object produced by the engine.
    Error {
        /// Machine-readable code.
        code: String,
        /// Human-readable message.
        message: String,
    },
    /// An object that can be converted to an array of fields.
    Record(Vec<(Arc<str>, Value)>),
    /// Any other object. Its fields exist but are not meant to be traversed.
    Opaque(Vec<(Arc<str>, Value)>),
}

/// An object node: a class name plus interiorly mutable shape.
#[derive(Debug)]
pub struct Object {
    class: Arc<str>,
    shape: RefCell<Shape>,
}

/// Shared handle to an [`Object`]. Equality is identity.
#[derive(Clone)]
pub struct ObjectRef(Rc<Object>);

impl ObjectRef {
    /// Creates a new object with the given class and shape.
    #[must_use]
    pub fn new(class: impl AsRef<str>, shape: Shape) -> Self {
        Self(Rc::new(Object {
            class: Arc::from(class.as_ref()),
            shape: RefCell::new(shape),
        }))
    }

    /// Creates a discount code object.
    #[must_use]
    pub fn coupon(id: u64, code: &str, amount: f64, discount_type: &str) -> Self {
        Self::new(
            "Coupon",
            Shape::Coupon {
                id,
                code: code.to_string(),
                amount,
                discount_type: discount_type.to_string(),
            },
        )
    }

    /// Creates a product object.
    #[must_use]
    pub fn product(id: u64, name: &str) -> Self {
        Self::new(
            "Product",
            Shape::Product {
                id,
                name: name.to_string(),
            },
        )
    }

    /// Creates a cart object.
    #[must_use]
    pub fn cart() -> Self {
        Self::new("Cart", Shape::Cart)
    }

    /// Creates an engine error object.
    #[must_use]
    pub fn error(code: &str, message: &str) -> Self {
        Self::new(
            "Error",
            Shape::Error {
                code: code.to_string(),
                message: message.to_string(),
            },
        )
    }

    /// Creates an empty field-bearing object.
    #[must_use]
    pub fn record(class: impl AsRef<str>) -> Self {
        Self::new(class, Shape::Record(Vec::new()))
    }

    /// Creates an empty opaque object.
    #[must_use]
    pub fn opaque(class: impl AsRef<str>) -> Self {
        Self::new(class, Shape::Opaque(Vec::new()))
    }

    /// Returns the class name.
    #[must_use]
    pub fn class(&self) -> &str {
        &self.0.class
    }

    /// Returns a stable identity for the lifetime of this object.
    #[must_use]
    pub fn identity(&self) -> usize {
        Rc::as_ptr(&self.0).addr()
    }

    /// Returns true if both handles point at the same object.
    #[must_use]
    pub fn same(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Borrows the shape, or `None` if it is currently mutably borrowed.
    #[must_use]
    pub fn shape(&self) -> Option<Ref<'_, Shape>> {
        self.0.shape.try_borrow().ok()
    }

    /// Mutably borrows the shape, or `None` if it is currently borrowed.
    #[must_use]
    pub fn shape_mut(&self) -> Option<RefMut<'_, Shape>> {
        self.0.shape.try_borrow_mut().ok()
    }

    /// Sets (or replaces) a field on a record or opaque object.
    ///
    /// Returns false if the object has no field storage or is busy.
    pub fn set_field(&self, name: &str, value: Value) -> bool {
        let Some(mut shape) = self.shape_mut() else {
            return false;
        };
        let fields = match &mut *shape {
            Shape::Record(fields) | Shape::Opaque(fields) => fields,
            _ => return false,
        };
        if let Some(slot) = fields.iter_mut().find(|(k, _)| &**k == name) {
            slot.1 = value;
        } else {
            fields.push((Arc::from(name), value));
        }
        true
    }

    /// Builder form of [`set_field`](Self::set_field).
    #[must_use]
    pub fn with_field(self, name: &str, value: impl Into<Value>) -> Self {
        self.set_field(name, value.into());
        self
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

// Object graphs may be cyclic; never recurse into fields here.
impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({}@{:#x})", self.class(), self.identity())
    }
}
