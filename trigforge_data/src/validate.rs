use thiserror::Error;

use crate::fields::FieldTable;
use crate::ids::Domain;
use crate::object::Value;

/// Explicit-typed field checks shared by [`crate::Object::set`] and the encoder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("field {field} expects a {expected} reference, got {found}")]
    TypeMismatch {
        field: String,
        expected: Domain,
        found: &'static str,
    },
    #[error("field {field} holds a {domain} reference without an id")]
    MissingValue { field: String, domain: Domain },
}

/// Check that an explicit-typed field receives a reference of its domain.
/// Fields that are not explicit-typed accept any value.
///
/// ```
/// use trigforge_data::{FieldTable, TypedRef, Value, field, validate::check_field};
///
/// let table = FieldTable::builtin();
/// assert!(check_field(table, field::TARGET, &Value::Ref(TypedRef::group(3))).is_ok());
/// assert!(check_field(table, field::TARGET, &Value::Number(3.0)).is_err());
/// assert!(check_field(table, field::COUNT, &Value::Number(3.0)).is_ok());
/// ```
///
/// # Errors
/// `ValidationError::TypeMismatch` on a domain or shape mismatch.
pub fn check_field(table: &FieldTable, key: &str, value: &Value) -> Result<(), ValidationError> {
    let Some(expected) = table.explicit_domain(key) else {
        return Ok(());
    };
    match value {
        Value::Ref(r) if r.domain == expected => Ok(()),
        other => Err(ValidationError::TypeMismatch {
            field: key.to_string(),
            expected,
            found: other.kind_name(),
        }),
    }
}

/// Encoder-side check: the explicit-typed field must also carry a nonzero id.
///
/// # Errors
/// `TypeMismatch` as in [`check_field`], or `MissingValue` for id 0.
pub fn check_encodable(table: &FieldTable, key: &str, value: &Value) -> Result<(), ValidationError> {
    check_field(table, key, value)?;
    if let Value::Ref(r) = value
        && table.explicit_domain(key).is_some()
        && r.value == 0
    {
        return Err(ValidationError::MissingValue {
            field: key.to_string(),
            domain: r.domain,
        });
    }
    Ok(())
}
