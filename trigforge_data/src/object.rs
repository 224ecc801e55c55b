//! Trigger objects: ordered field → value dictionaries.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::fields::{FieldTable, field};
use crate::ids::TypedRef;
use crate::validate::{ValidationError, check_field};

/// A single field value.
///
/// Booleans render as `1`/`0`; reference lists and integer lists render
/// dot-joined. `Text` holds segments the decoder could not coerce.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Bool(bool),
    Ref(TypedRef),
    Refs(Vec<TypedRef>),
    List(Vec<i64>),
    Text(String),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Ref(r) => Some(f64::from(r.value)),
            _ => None,
        }
    }

    /// Type name used in validation messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Bool(_) => "boolean",
            Value::Ref(r) => r.domain.as_str(),
            Value::Refs(_) => "reference list",
            Value::List(_) => "integer list",
            Value::Text(_) => "text",
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<i64> for Value {
    #[allow(clippy::cast_precision_loss)]
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<TypedRef> for Value {
    fn from(r: TypedRef) -> Self {
        Value::Ref(r)
    }
}

impl From<Vec<TypedRef>> for Value {
    fn from(refs: Vec<TypedRef>) -> Self {
        Value::Refs(refs)
    }
}

impl From<Vec<i64>> for Value {
    fn from(list: Vec<i64>) -> Self {
        Value::List(list)
    }
}

/// One graph node: fields in declaration order.
///
/// ```
/// use trigforge_data::{Object, TypedRef, field, obj_id};
///
/// let spawn = Object::of_type(obj_id::SPAWN)
///     .with(field::TARGET, TypedRef::group(4))?
///     .with(field::SPAWN_DURATION, 0.5)?;
/// assert_eq!(spawn.len(), 3);
/// # Ok::<(), trigforge_data::ValidationError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Object {
    fields: Vec<(String, Value)>,
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an object with its `OBJ_ID` already set.
    pub fn of_type(obj_id: u32) -> Self {
        let mut obj = Self::new();
        obj.insert(field::OBJ_ID, Value::from(obj_id));
        obj
    }

    /// Set a field and hand the object back, for chained construction.
    ///
    /// # Errors
    /// `ValidationError::TypeMismatch` when `key` is explicit-typed and
    /// `value` is not a reference of the required domain.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Result<Self, ValidationError> {
        self.set(key, value)?;
        Ok(self)
    }

    /// Set a field, checking explicit-typed fields against the built-in table.
    ///
    /// # Errors
    /// See [`Object::with`].
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<&mut Self, ValidationError> {
        self.set_in(FieldTable::builtin(), key, value)
    }

    /// Like [`Object::set`] but validated against a caller-supplied table.
    ///
    /// # Errors
    /// See [`Object::with`].
    pub fn set_in(
        &mut self,
        table: &FieldTable,
        key: &str,
        value: impl Into<Value>,
    ) -> Result<&mut Self, ValidationError> {
        let value = value.into();
        check_field(table, key, &value)?;
        self.insert(key, value);
        Ok(self)
    }

    /// Store a value without any validation. Existing keys keep their position.
    pub fn insert(&mut self, key: &str, value: Value) {
        match self.fields.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((key.to_string(), value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let idx = self.fields.iter().position(|(k, _)| k == key)?;
        Some(self.fields.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Numeric object type, if present.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn obj_id(&self) -> Option<u32> {
        self.get(field::OBJ_ID).and_then(Value::as_f64).map(|n| n as u32)
    }

    /// Union `group` into the `GROUPS` field, turning a single existing value
    /// into a list.
    #[allow(clippy::cast_possible_truncation)]
    pub fn add_group(&mut self, group: TypedRef) {
        let merged = match self.remove(field::GROUPS) {
            None => Value::Refs(vec![group]),
            Some(Value::Refs(mut refs)) => {
                if !refs.contains(&group) {
                    refs.push(group);
                }
                Value::Refs(refs)
            },
            Some(Value::Ref(existing)) if existing == group => Value::Refs(vec![existing]),
            Some(Value::Ref(existing)) => Value::Refs(vec![existing, group]),
            Some(Value::List(mut ids)) => {
                let id = i64::from(group.value);
                if !ids.contains(&id) {
                    ids.push(id);
                }
                Value::List(ids)
            },
            Some(Value::Number(n)) if n as i64 == i64::from(group.value) => Value::List(vec![n as i64]),
            Some(Value::Number(n)) => Value::List(vec![n as i64, i64::from(group.value)]),
            Some(other) => {
                log::warn!("replacing unreadable GROUPS value ({}) with {group}", other.kind_name());
                Value::Refs(vec![group])
            },
        };
        self.insert(field::GROUPS, merged);
    }

    /// Whether `GROUPS` contains the numeric group id, whatever form it is in.
    #[allow(clippy::cast_possible_truncation)]
    pub fn has_group(&self, id: u32) -> bool {
        match self.get(field::GROUPS) {
            Some(Value::Refs(refs)) => refs.iter().any(|r| r.value == id),
            Some(Value::Ref(r)) => r.value == id,
            Some(Value::List(ids)) => ids.contains(&i64::from(id)),
            Some(Value::Number(n)) => *n as i64 == i64::from(id),
            _ => false,
        }
    }
}

impl Serialize for Object {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}
