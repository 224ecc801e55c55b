use proptest::prelude::*;
use trigforge_data::{FieldTable, Object, TypedRef, Value, decode_level_string, encode_object, field, obj_id};

fn table() -> &'static FieldTable {
    FieldTable::builtin()
}

#[test]
fn decoded_values_match_modulo_reference_tags() {
    let obj = Object::of_type(obj_id::INSTANT_COUNT)
        .with(field::ITEM, 12)
        .and_then(|o| o.with(field::COUNT, -3))
        .and_then(|o| o.with(field::TARGET, TypedRef::group(40)))
        .and_then(|o| o.with(field::ACTIVATE_GROUP, true))
        .and_then(|o| o.with(field::GROUPS, vec![TypedRef::group(2), TypedRef::group(7)]))
        .expect("valid object");
    let text = encode_object(&obj, table()).expect("encodes");
    let back = decode_level_string(&text, table());
    assert_eq!(back.len(), 1);
    let back = &back[0];

    assert_eq!(back.obj_id(), Some(obj_id::INSTANT_COUNT));
    assert_eq!(back.get(field::ITEM), Some(&Value::Number(12.0)));
    assert_eq!(back.get(field::COUNT), Some(&Value::Number(-3.0)));
    assert_eq!(back.get(field::TARGET), Some(&Value::Number(40.0)));
    assert_eq!(back.get(field::ACTIVATE_GROUP), Some(&Value::Number(1.0)));
    assert_eq!(back.get(field::GROUPS), Some(&Value::List(vec![2, 7])));
    let keys: Vec<_> = back.iter().map(|(k, _)| k).collect();
    let original: Vec<_> = obj.iter().map(|(k, _)| k).collect();
    assert_eq!(keys, original);
}

proptest! {
    #[test]
    fn numeric_fields_survive(x in -100_000i32..100_000, y in -1000.0f64..1000.0, dur in 0.0f64..60.0) {
        let obj = Object::of_type(obj_id::SPAWN)
            .with(field::X, x).unwrap()
            .with(field::Y, y).unwrap()
            .with(field::SPAWN_DURATION, dur).unwrap();
        let back = decode_level_string(&encode_object(&obj, table()).unwrap(), table());
        prop_assert_eq!(back[0].get(field::X), Some(&Value::Number(f64::from(x))));
        prop_assert_eq!(back[0].get(field::Y), Some(&Value::Number(y)));
        prop_assert_eq!(back[0].get(field::SPAWN_DURATION), Some(&Value::Number(dur)));
    }
}
