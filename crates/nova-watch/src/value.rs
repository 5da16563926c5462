//! Runtime values observed at an instrumented call site.
//!
//! Scalars are stored inline. Everything with identity in the target runtime (plain objects,
//! arrays, collections, throwables) is an [`ObjectRef`]: a shared handle with a stable
//! [`ObjectId`] whose body can be mutated after construction, so object graphs may contain
//! cycles exactly like they can in the watched process.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

pub type ObjectId = u64;

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

pub const OBJECT_ARRAY_ELEMENT_TYPE: &str = "java.lang.Object";
pub const LIST_TYPE: &str = "java.util.ArrayList";
pub const MAP_TYPE: &str = "java.util.LinkedHashMap";

#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Boolean(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Char(char),
    String(Arc<str>),
    Object(ObjectRef),
}

impl Value {
    pub fn string(value: impl Into<Arc<str>>) -> Self {
        Self::String(value.into())
    }

    pub fn object(runtime_type: impl Into<String>, fields: Vec<(String, Value)>) -> Self {
        Self::Object(ObjectRef::new(runtime_type, ObjectBody::Plain { fields }))
    }

    /// An `Object[]`-style array.
    pub fn array(elements: Vec<Value>) -> Self {
        Self::typed_array(OBJECT_ARRAY_ELEMENT_TYPE, elements)
    }

    pub fn typed_array(element_type: impl Into<String>, elements: Vec<Value>) -> Self {
        let element_type = element_type.into();
        Self::Object(ObjectRef::new(
            format!("{element_type}[]"),
            ObjectBody::Array {
                element_type,
                elements,
            },
        ))
    }

    pub fn list(elements: Vec<Value>) -> Self {
        Self::Object(ObjectRef::new(LIST_TYPE, ObjectBody::List { elements }))
    }

    pub fn map(entries: Vec<(Value, Value)>) -> Self {
        Self::Object(ObjectRef::new(MAP_TYPE, ObjectBody::Map { entries }))
    }

    pub fn throwable(runtime_type: impl Into<String>, message: Option<&str>) -> Self {
        Self::Object(ObjectRef::new(
            runtime_type,
            ObjectBody::Throwable {
                message: message.map(str::to_owned),
                cause: None,
            },
        ))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Runtime type name, boxed the way the target runtime reports it.
    pub fn type_name(&self) -> &str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "java.lang.Boolean",
            Self::Byte(_) => "java.lang.Byte",
            Self::Short(_) => "java.lang.Short",
            Self::Int(_) => "java.lang.Integer",
            Self::Long(_) => "java.lang.Long",
            Self::Float(_) => "java.lang.Float",
            Self::Double(_) => "java.lang.Double",
            Self::Char(_) => "java.lang.Character",
            Self::String(_) => "java.lang.String",
            Self::Object(obj) => obj.runtime_type(),
        }
    }

    /// Elements of an array or list, `None` for anything else.
    pub fn sequence_elements(&self) -> Option<Vec<Value>> {
        let obj = self.as_object()?;
        obj.with_body(|body| match body {
            ObjectBody::Array { elements, .. } | ObjectBody::List { elements } => {
                Some(elements.clone())
            }
            _ => None,
        })
    }

    /// Entries of a map, `None` for anything else.
    pub fn map_entries(&self) -> Option<Vec<(Value, Value)>> {
        let obj = self.as_object()?;
        obj.with_body(|body| match body {
            ObjectBody::Map { entries } => Some(entries.clone()),
            _ => None,
        })
    }
}

impl PartialEq for Value {
    /// Scalars compare by value, objects by identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Byte(a), Self::Byte(b)) => a == b,
            (Self::Short(a), Self::Short(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Long(a), Self::Long(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Double(a), Self::Double(b)) => a == b,
            (Self::Char(a), Self::Char(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a.id() == b.id(),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value.into())
    }
}

#[derive(Clone, Debug)]
pub enum ObjectBody {
    Plain {
        fields: Vec<(String, Value)>,
    },
    Array {
        element_type: String,
        elements: Vec<Value>,
    },
    List {
        elements: Vec<Value>,
    },
    /// Insertion ordered.
    Map {
        entries: Vec<(Value, Value)>,
    },
    Throwable {
        message: Option<String>,
        cause: Option<Value>,
    },
}

struct ObjectData {
    id: ObjectId,
    runtime_type: String,
    body: RwLock<ObjectBody>,
}

/// Shared handle to an object in the watched process.
#[derive(Clone)]
pub struct ObjectRef(Arc<ObjectData>);

impl ObjectRef {
    pub fn new(runtime_type: impl Into<String>, body: ObjectBody) -> Self {
        Self(Arc::new(ObjectData {
            id: NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed),
            runtime_type: runtime_type.into(),
            body: RwLock::new(body),
        }))
    }

    pub fn id(&self) -> ObjectId {
        self.0.id
    }

    pub fn runtime_type(&self) -> &str {
        &self.0.runtime_type
    }

    /// `java.util.HashMap$Node` -> `Node`, `java.lang.Object[]` -> `Object[]`.
    pub fn simple_type_name(&self) -> &str {
        simple_type_name(&self.0.runtime_type)
    }

    /// Run `f` with the body read-locked. `f` must not re-enter this object mutably.
    pub fn with_body<R>(&self, f: impl FnOnce(&ObjectBody) -> R) -> R {
        f(&self.0.body.read())
    }

    /// Clone of the current body. Used by traversals that must not hold the lock while
    /// descending into children (which may be this very object).
    pub fn snapshot(&self) -> ObjectBody {
        self.0.body.read().clone()
    }

    pub fn replace_body(&self, body: ObjectBody) {
        *self.0.body.write() = body;
    }

    /// Set (or add) a field on a plain object. Returns `false` for other bodies.
    pub fn set_field(&self, name: &str, value: Value) -> bool {
        let mut body = self.0.body.write();
        let ObjectBody::Plain { fields } = &mut *body else {
            return false;
        };
        match fields.iter_mut().find(|(field, _)| field == name) {
            Some((_, slot)) => *slot = value,
            None => fields.push((name.to_owned(), value)),
        }
        true
    }

    /// Append to a list or array. Returns `false` for other bodies.
    pub fn push(&self, value: Value) -> bool {
        let mut body = self.0.body.write();
        match &mut *body {
            ObjectBody::List { elements } | ObjectBody::Array { elements, .. } => {
                elements.push(value);
                true
            }
            _ => false,
        }
    }

    /// Insert into a map, replacing an existing entry with an equal key.
    pub fn insert(&self, key: Value, value: Value) -> bool {
        let mut body = self.0.body.write();
        let ObjectBody::Map { entries } = &mut *body else {
            return false;
        };
        match entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => entries.push((key, value)),
        }
        true
    }

    pub fn set_cause(&self, cause: Value) -> bool {
        let mut body = self.0.body.write();
        let ObjectBody::Throwable { cause: slot, .. } = &mut *body else {
            return false;
        };
        *slot = Some(cause);
        true
    }
}

impl fmt::Debug for ObjectRef {
    // Bodies may be cyclic; never descend.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectRef")
            .field("id", &self.0.id)
            .field("runtime_type", &self.0.runtime_type)
            .finish()
    }
}

pub fn simple_type_name(full: &str) -> &str {
    let tail = full.rsplit('.').next().unwrap_or(full);
    tail.rsplit('$').next().unwrap_or(tail)
}
