//! Level-string codec.
//!
//! Each object becomes `<fieldId>,<value>,<fieldId>,<value>,…;` and objects are
//! concatenated with no separator. Encoding is strict about explicit-typed
//! fields; decoding never fails and keeps whatever it cannot coerce as text.

use std::fmt::Write as _;

use log::debug;
use thiserror::Error;

use crate::fields::{FieldKind, FieldTable};
use crate::object::{Object, Value};
use crate::validate::{ValidationError, check_encodable};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("field {field} holds a non-finite number ({value})")]
    InvalidNumber { field: String, value: f64 },
    #[error("field {field} value '{value}' contains a level-string delimiter")]
    Unrepresentable { field: String, value: String },
}

/// Serialize one object, fields in declaration order, terminated by `;`.
///
/// Names missing from `table` are written verbatim as the field id, which is
/// how undecodable ids from [`decode_level_string`] survive a round trip.
///
/// # Errors
/// `CodecError::Validation` for explicit-typed mismatches or zero ids,
/// `InvalidNumber` for NaN/infinite values, `Unrepresentable` for text that
/// would break the delimiter structure.
pub fn encode_object(obj: &Object, table: &FieldTable) -> Result<String, CodecError> {
    let mut out = String::new();
    for (key, value) in obj.iter() {
        check_encodable(table, key, value)?;
        match table.id_of(key) {
            Some(id) => out.push_str(&id.to_string()),
            None => out.push_str(key),
        }
        out.push(',');
        write_value(&mut out, key, value)?;
        out.push(',');
    }
    out.push(';');
    Ok(out)
}

/// Serialize a list of objects back to back.
///
/// # Errors
/// The first error from [`encode_object`].
pub fn encode_objects<'a>(
    objects: impl IntoIterator<Item = &'a Object>,
    table: &FieldTable,
) -> Result<String, CodecError> {
    let mut out = String::new();
    for obj in objects {
        out.push_str(&encode_object(obj, table)?);
    }
    Ok(out)
}

fn write_value(out: &mut String, key: &str, value: &Value) -> Result<(), CodecError> {
    match value {
        Value::Number(n) => {
            if !n.is_finite() {
                return Err(CodecError::InvalidNumber {
                    field: key.to_string(),
                    value: *n,
                });
            }
            write!(out, "{n}").ok();
        },
        Value::Bool(b) => out.push(if *b { '1' } else { '0' }),
        Value::Ref(r) => {
            write!(out, "{}", r.value).ok();
        },
        Value::Refs(refs) => join_dotted(out, refs.iter().map(|r| i64::from(r.value))),
        Value::List(ids) => join_dotted(out, ids.iter().copied()),
        Value::Text(text) => {
            if text.contains([',', ';']) {
                return Err(CodecError::Unrepresentable {
                    field: key.to_string(),
                    value: text.clone(),
                });
            }
            out.push_str(text);
        },
    }
    Ok(())
}

fn join_dotted(out: &mut String, values: impl Iterator<Item = i64>) {
    for (i, v) in values.enumerate() {
        if i > 0 {
            out.push('.');
        }
        write!(out, "{v}").ok();
    }
}

/// Split a level string into its raw object segments, dropping empty ones.
pub fn segments(level: &str) -> impl Iterator<Item = &str> {
    level.split(';').filter(|seg| !seg.is_empty())
}

/// Parse a level string into objects.
///
/// Field ids are mapped through `table`; unknown ids are kept under their raw
/// id string. Explicit-typed fields come back as plain numbers because the
/// reference domain is not part of the wire format.
pub fn decode_level_string(level: &str, table: &FieldTable) -> Vec<Object> {
    segments(level).map(|seg| decode_object(seg, table)).collect()
}

/// Parse one `;`-free object segment.
pub fn decode_object(segment: &str, table: &FieldTable) -> Object {
    let mut obj = Object::new();
    let mut parts = segment.split(',');
    while let Some(raw_key) = parts.next() {
        if raw_key.is_empty() {
            continue;
        }
        let raw_value = parts.next().unwrap_or_default();
        let def = raw_key.parse::<u32>().ok().and_then(|id| table.by_id(id));
        let (name, kind) = match def {
            Some(def) => (def.name, Some(def.kind)),
            None => {
                debug!("unknown field id '{raw_key}' kept verbatim");
                (raw_key, None)
            },
        };
        obj.insert(name, coerce(raw_value, kind));
    }
    obj
}

#[allow(clippy::cast_precision_loss)]
fn coerce(raw: &str, kind: Option<FieldKind>) -> Value {
    match raw {
        "true" => return Value::Number(1.0),
        "false" => return Value::Number(0.0),
        _ => {},
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Value::Number(n as f64);
    }
    if raw.contains('.') {
        let wants_list = kind.is_some_and(|k| k.is_list()) || raw.matches('.').count() > 1;
        if !wants_list && let Ok(n) = raw.parse::<f64>() {
            return Value::Number(n);
        }
        if let Some(list) = parse_dotted(raw) {
            return Value::List(list);
        }
    } else if let Ok(n) = raw.parse::<f64>()
        && n.is_finite()
    {
        return Value::Number(n);
    }
    Value::Text(raw.to_string())
}

fn parse_dotted(raw: &str) -> Option<Vec<i64>> {
    raw.split('.').map(|part| part.parse::<i64>().ok()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{field, obj_id};
    use crate::ids::TypedRef;

    fn table() -> &'static FieldTable {
        FieldTable::builtin()
    }

    #[test]
    fn encodes_fields_in_declaration_order() {
        let obj = Object::of_type(obj_id::SPAWN)
            .with(field::TARGET, TypedRef::group(12))
            .unwrap()
            .with(field::SPAWN_DURATION, 0.25)
            .unwrap()
            .with(field::SPAWN_TRIGGERED, true)
            .unwrap()
            .with(field::GROUPS, vec![TypedRef::group(3), TypedRef::group(4)])
            .unwrap();
        assert_eq!(encode_object(&obj, table()).unwrap(), "1,1268,51,12,63,0.25,62,1,57,3.4,;");
    }

    #[test]
    fn explicit_field_must_be_typed_at_encode_time() {
        let mut obj = Object::of_type(obj_id::SPAWN);
        obj.insert(field::TARGET, Value::Number(5.0));
        assert!(matches!(
            encode_object(&obj, table()),
            Err(CodecError::Validation(ValidationError::TypeMismatch { .. }))
        ));
        let missing = Object::of_type(obj_id::SPAWN).with(field::TARGET, TypedRef::group(0)).unwrap();
        assert!(matches!(
            encode_object(&missing, table()),
            Err(CodecError::Validation(ValidationError::MissingValue { .. }))
        ));
    }

    #[test]
    fn rejects_delimiters_and_nan() {
        let mut obj = Object::new();
        obj.insert("kS38", Value::Text("a,b".into()));
        assert!(matches!(encode_object(&obj, table()), Err(CodecError::Unrepresentable { .. })));
        let mut obj = Object::new();
        obj.insert(field::X, Value::Number(f64::NAN));
        assert!(matches!(encode_object(&obj, table()), Err(CodecError::InvalidNumber { .. })));
    }

    #[test]
    fn decode_coerces_values_by_shape() {
        let objs = decode_level_string("1,1817,80,4,77,-2,139,true;1,1268,63,0.05,57,7.8.9;", table());
        assert_eq!(objs.len(), 2);
        assert_eq!(objs[0].get(field::ITEM), Some(&Value::Number(4.0)));
        assert_eq!(objs[0].get(field::COUNT), Some(&Value::Number(-2.0)));
        assert_eq!(objs[0].get(field::OVERRIDE), Some(&Value::Number(1.0)));
        assert_eq!(objs[1].get(field::SPAWN_DURATION), Some(&Value::Number(0.05)));
        assert_eq!(objs[1].get(field::GROUPS), Some(&Value::List(vec![7, 8, 9])));
    }

    #[test]
    fn single_dotted_pair_in_list_field_stays_a_list() {
        let objs = decode_level_string("57,3.4;", table());
        assert_eq!(objs[0].get(field::GROUPS), Some(&Value::List(vec![3, 4])));
    }

    #[test]
    fn decode_loses_reference_domain() {
        let obj = Object::of_type(obj_id::SPAWN).with(field::TARGET, TypedRef::group(6)).unwrap();
        let text = encode_object(&obj, table()).unwrap();
        let back = decode_level_string(&text, table());
        assert_eq!(back[0].get(field::TARGET), Some(&Value::Number(6.0)));
    }

    #[test]
    fn unknown_ids_and_header_keys_round_trip() {
        let raw = "kS38,1_40_2_125,kA13,0;1,1,2,15,9001,abc;";
        let objs = decode_level_string(raw, table());
        assert_eq!(objs[0].get("kS38"), Some(&Value::Text("1_40_2_125".into())));
        assert_eq!(objs[1].get("9001"), Some(&Value::Text("abc".into())));
        let again = encode_objects(&objs, table()).unwrap();
        assert_eq!(again, "kS38,1_40_2_125,kA13,0,;1,1,2,15,9001,abc,;");
    }

    #[test]
    fn trailing_key_without_value_is_kept_as_text() {
        let objs = decode_level_string("1,1,2", table());
        assert_eq!(objs[0].get(field::X), Some(&Value::Text(String::new())));
    }
}
