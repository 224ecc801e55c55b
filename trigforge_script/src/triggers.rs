//! Builders for the handful of trigger objects the compiler emits.
//!
//! Every builder returns a fully-populated [`Object`] without placing it
//! anywhere; the caller decides which context receives it.

use trigforge_data::{Object, TypedRef, ValidationError, field, obj_id};

use crate::control::{SequenceMode, SequenceReset};
use crate::counter::{Comparator, Counter, CounterKind};

type Built = Result<Object, ValidationError>;

/// Assignment operator of an item-edit trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOp {
    Set,
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl ItemOp {
    pub fn code(self) -> i32 {
        match self {
            ItemOp::Set => 0,
            ItemOp::Add => 1,
            ItemOp::Subtract => 2,
            ItemOp::Multiply => 3,
            ItemOp::Divide => 4,
        }
    }
}

// arithmetic operator codes for OP_1/OP_2
const OP_ADD: i32 = 0;
const OP_MUL: i32 = 2;

impl CounterKind {
    /// Item-type code used by item-edit and item-compare triggers.
    pub fn type_code(self) -> i32 {
        match self {
            CounterKind::Item => 1,
            CounterKind::Timer => 2,
        }
    }
}

/// Spawn `target`, optionally after `delay` seconds.
pub fn spawn(target: TypedRef, delay: f64) -> Built {
    let obj = Object::of_type(obj_id::SPAWN).with(field::TARGET, target)?;
    if delay > 0.0 {
        obj.with(field::SPAWN_DURATION, delay)
    } else {
        Ok(obj)
    }
}

/// Spawn `target` with item ids remapped pairwise: `[from, to, from, to, ..]`.
pub fn remap_spawn(target: TypedRef, pairs: Vec<i64>) -> Built {
    spawn(target, 0.0)?
        .with(field::REMAPS, pairs)?
        .with(field::RESET_REMAP, true)
}

/// Pickup trigger forcing the item to `value`.
pub fn pickup_set(item: u32, value: f64) -> Built {
    Object::of_type(obj_id::PICKUP)
        .with(field::ITEM, item)?
        .with(field::COUNT, value)?
        .with(field::OVERRIDE, true)
}

/// Pickup trigger adding `delta` (negative to subtract).
pub fn pickup_add(item: u32, delta: f64) -> Built {
    Object::of_type(obj_id::PICKUP)
        .with(field::ITEM, item)?
        .with(field::COUNT, delta)
}

/// Pickup trigger multiplying or dividing the item by `factor`.
pub fn pickup_scale(item: u32, factor: f64, divide: bool) -> Built {
    Object::of_type(obj_id::PICKUP)
        .with(field::ITEM, item)?
        .with(field::MULTIPLY_DIVIDE, if divide { 2 } else { 1 })?
        .with(field::MODIFIER, factor)
}

/// Item edit: `target <op>= source`.
pub fn item_edit(target: Counter, source: Counter, op: ItemOp) -> Built {
    Object::of_type(obj_id::ITEM_EDIT)
        .with(field::ITEM_ID_1, source.item)?
        .with(field::TYPE_1, source.kind.type_code())?
        .with(field::ITEM_TARGET, target.item)?
        .with(field::TARGET_TYPE, target.kind.type_code())?
        .with(field::ASSIGN_OP, op.code())?
        .with(field::OP_1, OP_MUL)?
        .with(field::MOD, 1)
}

/// Item edit with a constant right-hand side: `target <op>= value`.
pub fn item_edit_const(target: Counter, value: f64, op: ItemOp) -> Built {
    Object::of_type(obj_id::ITEM_EDIT)
        .with(field::ITEM_TARGET, target.item)?
        .with(field::TARGET_TYPE, target.kind.type_code())?
        .with(field::ASSIGN_OP, op.code())?
        .with(field::OP_1, OP_ADD)?
        .with(field::MOD, value)
}

/// Instant count: activate `target` when the item compares true against `count`.
pub fn instant_count(item: u32, count: f64, cmp: Comparator, target: TypedRef) -> Built {
    Object::of_type(obj_id::INSTANT_COUNT)
        .with(field::ITEM, item)?
        .with(field::COUNT, count)?
        .with(field::COMPARISON, cmp.count_code())?
        .with(field::TARGET, target)?
        .with(field::ACTIVATE_GROUP, true)
}

/// Item compare against a constant; used for timers, which instant count
/// cannot read.
pub fn item_compare(counter: Counter, value: f64, cmp: Comparator, target: TypedRef) -> Built {
    Object::of_type(obj_id::ITEM_COMPARE)
        .with(field::ITEM_ID_1, counter.item)?
        .with(field::TYPE_1, counter.kind.type_code())?
        .with(field::MOD, 1)?
        .with(field::OP_1, OP_MUL)?
        .with(field::MOD_2, value)?
        .with(field::OP_2, OP_ADD)?
        .with(field::COMPARE_OP, cmp.compare_code())?
        .with(field::TARGET, target)
}

/// Persist trigger marking an item (or timer) as persistent.
pub fn persist(counter: Counter) -> Built {
    Object::of_type(obj_id::ITEM_PERSIST)
        .with(field::ITEM, counter.item)?
        .with(field::TIMER, counter.kind == CounterKind::Timer)?
        .with(field::PERSISTENT, true)
}

/// Sequence trigger stepping through `(group, duration)` pairs.
///
/// A step's duration is the number of activations it holds before the
/// sequence moves on, so it is a whole count: the payload is a dot-list of
/// integers.
pub fn sequence(steps: &[(TypedRef, u32)], mode: SequenceMode, min_interval: f64, reset: SequenceReset) -> Built {
    let list = steps
        .iter()
        .flat_map(|(group, duration)| [i64::from(group.value), i64::from(*duration)])
        .collect::<Vec<_>>();
    Object::of_type(obj_id::SEQUENCE)
        .with(field::SEQUENCE, list)?
        .with(field::MODE, mode.code())?
        .with(field::MIN_INT, min_interval)?
        .with(field::RESET, reset.code())
}

#[cfg(test)]
mod tests {
    use super::*;
    use trigforge_data::Value;

    #[test]
    fn zero_delay_spawn_has_no_duration() {
        let obj = spawn(TypedRef::group(4), 0.0).unwrap();
        assert!(!obj.contains(field::SPAWN_DURATION));
        let obj = spawn(TypedRef::group(4), 0.5).unwrap();
        assert_eq!(obj.get(field::SPAWN_DURATION), Some(&Value::Number(0.5)));
    }

    #[test]
    fn spawn_rejects_non_group_target() {
        assert!(matches!(
            spawn(TypedRef::color(4), 0.0),
            Err(ValidationError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn item_edit_names_both_sides() {
        let a = Counter::item(3);
        let b = Counter::timer(8);
        let obj = item_edit(a, b, ItemOp::Add).unwrap();
        assert_eq!(obj.obj_id(), Some(obj_id::ITEM_EDIT));
        assert_eq!(obj.get(field::ITEM_TARGET), Some(&Value::Number(3.0)));
        assert_eq!(obj.get(field::ITEM_ID_1), Some(&Value::Number(8.0)));
        assert_eq!(obj.get(field::TYPE_1), Some(&Value::Number(2.0)));
        assert_eq!(obj.get(field::ASSIGN_OP), Some(&Value::Number(1.0)));
    }

    #[test]
    fn sequence_flattens_steps() {
        let obj = sequence(
            &[(TypedRef::group(5), 1), (TypedRef::group(6), 3)],
            SequenceMode::Loop,
            0.1,
            SequenceReset::Full,
        )
        .unwrap();
        assert_eq!(obj.get(field::SEQUENCE), Some(&Value::List(vec![5, 1, 6, 3])));
    }

    #[test]
    fn remap_spawn_lists_pairs() {
        let obj = remap_spawn(TypedRef::group(9), vec![1, 20, 2, 21]).unwrap();
        assert_eq!(obj.get(field::REMAPS), Some(&Value::List(vec![1, 20, 2, 21])));
        assert_eq!(obj.get(field::RESET_REMAP), Some(&Value::Bool(true)));
    }
}
