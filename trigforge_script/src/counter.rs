//! Counters: item and timer slots plus the arithmetic and comparisons that
//! compile to pickup, item-edit and instant-count triggers.

use log::debug;
use trigforge_data::TypedRef;

use crate::CompileError;
use crate::context::{Compiler, ContextId};
use crate::triggers::{self, ItemOp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterKind {
    Item,
    Timer,
}

/// Handle to one item (or timer) slot. Copyable; every operation takes the
/// compiler explicitly and emits into its current context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Counter {
    pub item: u32,
    pub kind: CounterKind,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CounterOptions {
    pub initial: f64,
    /// Wrap this item id instead of allocating a new one.
    pub existing: Option<u32>,
    pub persistent: bool,
    pub timer: bool,
}

/// Right-hand side of counter arithmetic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Amount {
    Const(f64),
    Counter(Counter),
}

impl From<f64> for Amount {
    fn from(n: f64) -> Self {
        Amount::Const(n)
    }
}

impl From<i32> for Amount {
    fn from(n: i32) -> Self {
        Amount::Const(f64::from(n))
    }
}

impl From<i64> for Amount {
    #[allow(clippy::cast_precision_loss)]
    fn from(n: i64) -> Self {
        Amount::Const(n as f64)
    }
}

impl From<Counter> for Amount {
    fn from(c: Counter) -> Self {
        Amount::Counter(c)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Equal,
    Larger,
    Smaller,
}

impl Comparator {
    /// Code for the instant-count `COMPARISON` field.
    pub fn count_code(self) -> i32 {
        match self {
            Comparator::Equal => 0,
            Comparator::Larger => 1,
            Comparator::Smaller => 2,
        }
    }

    /// Code for the item-compare `COMPARE_OP` field.
    pub fn compare_code(self) -> i32 {
        match self {
            Comparator::Equal => 0,
            Comparator::Larger => 1,
            Comparator::Smaller => 3,
        }
    }
}

/// A loop condition: `counter <comparator> threshold`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Condition {
    pub counter: Counter,
    pub comparator: Comparator,
    pub threshold: f64,
}

impl Condition {
    /// Emit the comparison into the current context, firing `target` on true.
    ///
    /// # Errors
    /// `CompileError::Validation` if `target` is not a group.
    pub fn compile(&self, c: &mut Compiler, target: TypedRef) -> Result<(), CompileError> {
        self.counter.if_is(c, self.comparator, self.threshold, target)
    }
}

pub fn less_than(counter: Counter, threshold: f64) -> Condition {
    Condition {
        counter,
        comparator: Comparator::Smaller,
        threshold,
    }
}

pub fn greater_than(counter: Counter, threshold: f64) -> Condition {
    Condition {
        counter,
        comparator: Comparator::Larger,
        threshold,
    }
}

pub fn equal_to(counter: Counter, threshold: f64) -> Condition {
    Condition {
        counter,
        comparator: Comparator::Equal,
        threshold,
    }
}

impl Compiler {
    /// Allocate a fresh item counter, emitting a set trigger for a nonzero
    /// initial value.
    ///
    /// # Errors
    /// Propagates trigger construction failures.
    pub fn counter(&mut self, initial: f64) -> Result<Counter, CompileError> {
        self.counter_with(CounterOptions {
            initial,
            ..CounterOptions::default()
        })
    }

    /// # Errors
    /// Propagates trigger construction failures.
    pub fn counter_with(&mut self, opts: CounterOptions) -> Result<Counter, CompileError> {
        let kind = if opts.timer { CounterKind::Timer } else { CounterKind::Item };
        let item = match opts.existing {
            Some(item) => {
                self.ids.reserve_item(item);
                item
            },
            None => self.ids.next_item(),
        };
        let counter = Counter { item, kind };
        debug!("counter on item {item} ({kind:?})");
        if opts.existing.is_none() && opts.initial != 0.0 {
            counter.set(self, opts.initial)?;
        }
        if opts.persistent {
            self.add(triggers::persist(counter)?);
            // global objects fire on every attempt, restoring the saved value
            self.push_into(ContextId::GLOBAL, triggers::persist(counter)?);
        }
        Ok(counter)
    }
}

impl Counter {
    pub const fn item(item: u32) -> Self {
        Self {
            item,
            kind: CounterKind::Item,
        }
    }

    pub const fn timer(item: u32) -> Self {
        Self {
            item,
            kind: CounterKind::Timer,
        }
    }

    /// # Errors
    /// Propagates trigger construction failures.
    pub fn add(&self, c: &mut Compiler, amount: impl Into<Amount>) -> Result<(), CompileError> {
        self.apply(c, ItemOp::Add, amount.into())
    }

    /// # Errors
    /// Propagates trigger construction failures.
    pub fn subtract(&self, c: &mut Compiler, amount: impl Into<Amount>) -> Result<(), CompileError> {
        self.apply(c, ItemOp::Subtract, amount.into())
    }

    /// # Errors
    /// Propagates trigger construction failures.
    pub fn multiply(&self, c: &mut Compiler, amount: impl Into<Amount>) -> Result<(), CompileError> {
        self.apply(c, ItemOp::Multiply, amount.into())
    }

    /// # Errors
    /// Propagates trigger construction failures.
    pub fn divide(&self, c: &mut Compiler, amount: impl Into<Amount>) -> Result<(), CompileError> {
        self.apply(c, ItemOp::Divide, amount.into())
    }

    /// # Errors
    /// Propagates trigger construction failures.
    pub fn set(&self, c: &mut Compiler, amount: impl Into<Amount>) -> Result<(), CompileError> {
        self.apply(c, ItemOp::Set, amount.into())
    }

    /// Set the counter back to zero.
    ///
    /// # Errors
    /// Propagates trigger construction failures.
    pub fn reset(&self, c: &mut Compiler) -> Result<(), CompileError> {
        self.set(c, 0.0)
    }

    fn apply(&self, c: &mut Compiler, op: ItemOp, amount: Amount) -> Result<(), CompileError> {
        let obj = match amount {
            Amount::Counter(other) => triggers::item_edit(*self, other, op)?,
            Amount::Const(n) => match (self.kind, op) {
                (CounterKind::Timer, _) => triggers::item_edit_const(*self, n, op)?,
                (CounterKind::Item, ItemOp::Set) => triggers::pickup_set(self.item, n)?,
                (CounterKind::Item, ItemOp::Add) => triggers::pickup_add(self.item, n)?,
                (CounterKind::Item, ItemOp::Subtract) => triggers::pickup_add(self.item, -n)?,
                (CounterKind::Item, ItemOp::Multiply) => triggers::pickup_scale(self.item, n, false)?,
                (CounterKind::Item, ItemOp::Divide) => triggers::pickup_scale(self.item, n, true)?,
            },
        };
        c.add(obj);
        Ok(())
    }

    /// Fire `target` once the counter compares true against `threshold`.
    ///
    /// # Errors
    /// `CompileError::Validation` if `target` is not a group.
    pub fn if_is(
        &self,
        c: &mut Compiler,
        comparator: Comparator,
        threshold: f64,
        target: TypedRef,
    ) -> Result<(), CompileError> {
        let obj = match self.kind {
            CounterKind::Item => triggers::instant_count(self.item, threshold, comparator, target)?,
            CounterKind::Timer => triggers::item_compare(*self, threshold, comparator, target)?,
        };
        c.add(obj);
        Ok(())
    }

    /// Branch on each value in `values`: for every value a trigger function is
    /// compiled from `body` and fired when the counter equals it.
    ///
    /// # Errors
    /// The first error from `body`.
    #[allow(clippy::cast_precision_loss)]
    pub fn to_const<I, F>(&self, c: &mut Compiler, values: I, mut body: F) -> Result<(), CompileError>
    where
        I: IntoIterator<Item = i64>,
        F: FnMut(&mut Compiler, i64) -> Result<(), CompileError>,
    {
        for value in values {
            let branch = c.trigger_function(|c| body(c, value))?;
            self.if_is(c, Comparator::Equal, value as f64, branch)?;
        }
        Ok(())
    }

    /// `other = self`.
    ///
    /// # Errors
    /// Propagates trigger construction failures.
    pub fn copy_to(&self, c: &mut Compiler, other: Counter) -> Result<(), CompileError> {
        other.set(c, *self)
    }

    /// `other += self`, then zero this counter.
    ///
    /// # Errors
    /// Propagates trigger construction failures.
    pub fn add_to(&self, c: &mut Compiler, other: Counter) -> Result<(), CompileError> {
        other.add(c, *self)?;
        self.reset(c)
    }

    /// `other -= self`, then zero this counter.
    ///
    /// # Errors
    /// Propagates trigger construction failures.
    pub fn subtract_from(&self, c: &mut Compiler, other: Counter) -> Result<(), CompileError> {
        other.subtract(c, *self)?;
        self.reset(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trigforge_data::{Object, Value, field, obj_id};

    fn objects(c: &Compiler) -> Vec<Object> {
        c.current().objects.clone()
    }

    #[test]
    fn zero_initial_emits_nothing() {
        let mut c = Compiler::new();
        let a = c.counter(0.0).unwrap();
        let b = c.counter(0.0).unwrap();
        assert_ne!(a.item, b.item);
        assert!(objects(&c).is_empty());
    }

    #[test]
    fn initial_value_is_set_with_override() {
        let mut c = Compiler::new();
        let a = c.counter(7.0).unwrap();
        let objs = objects(&c);
        assert_eq!(objs.len(), 1);
        assert_eq!(objs[0].obj_id(), Some(obj_id::PICKUP));
        assert_eq!(objs[0].get(field::ITEM), Some(&Value::Number(f64::from(a.item))));
        assert_eq!(objs[0].get(field::COUNT), Some(&Value::Number(7.0)));
        assert_eq!(objs[0].get(field::OVERRIDE), Some(&Value::Bool(true)));
    }

    #[test]
    fn existing_item_is_wrapped_without_set() {
        let mut c = Compiler::new();
        let a = c
            .counter_with(CounterOptions {
                existing: Some(40),
                initial: 3.0,
                ..CounterOptions::default()
            })
            .unwrap();
        assert_eq!(a.item, 40);
        assert!(objects(&c).is_empty());
    }

    #[test]
    fn existing_item_is_not_handed_out_again() {
        let mut c = Compiler::new();
        let wrapped = c
            .counter_with(CounterOptions {
                existing: Some(2),
                ..CounterOptions::default()
            })
            .unwrap();
        let fresh: Vec<u32> = (0..3).map(|_| c.counter(0.0).unwrap().item).collect();
        assert_eq!(fresh, vec![1, 3, 4]);
        assert!(!fresh.contains(&wrapped.item));
    }

    #[test]
    fn constant_arithmetic_uses_pickups() {
        let mut c = Compiler::new();
        let a = c.counter(0.0).unwrap();
        a.subtract(&mut c, 2).unwrap();
        a.multiply(&mut c, 3).unwrap();
        a.divide(&mut c, 4).unwrap();
        let objs = objects(&c);
        assert_eq!(objs[0].get(field::COUNT), Some(&Value::Number(-2.0)));
        assert_eq!(objs[1].get(field::MULTIPLY_DIVIDE), Some(&Value::Number(1.0)));
        assert_eq!(objs[1].get(field::MODIFIER), Some(&Value::Number(3.0)));
        assert_eq!(objs[2].get(field::MULTIPLY_DIVIDE), Some(&Value::Number(2.0)));
    }

    #[test]
    fn timers_use_item_edit_and_item_compare() {
        let mut c = Compiler::new();
        let t = c
            .counter_with(CounterOptions {
                timer: true,
                ..CounterOptions::default()
            })
            .unwrap();
        t.add(&mut c, 1.5).unwrap();
        t.if_is(&mut c, Comparator::Larger, 10.0, TypedRef::group(5)).unwrap();
        let objs = objects(&c);
        assert_eq!(objs[0].obj_id(), Some(obj_id::ITEM_EDIT));
        assert_eq!(objs[0].get(field::TARGET_TYPE), Some(&Value::Number(2.0)));
        assert_eq!(objs[1].obj_id(), Some(obj_id::ITEM_COMPARE));
        assert_eq!(objs[1].get(field::MOD_2), Some(&Value::Number(10.0)));
    }

    #[test]
    fn persistent_counter_also_arms_global() {
        let mut c = Compiler::new();
        let group = c
            .trigger_function(|c| {
                c.counter_with(CounterOptions {
                    persistent: true,
                    ..CounterOptions::default()
                })?;
                Ok(())
            })
            .unwrap();
        assert_eq!(c.find_by_group(group).unwrap().objects.len(), 1);
        let global = objects(&c);
        assert_eq!(global.len(), 1);
        assert_eq!(global[0].obj_id(), Some(obj_id::ITEM_PERSIST));
    }

    #[test]
    fn if_is_rejects_non_group_target() {
        let mut c = Compiler::new();
        let a = c.counter(0.0).unwrap();
        let err = a.if_is(&mut c, Comparator::Equal, 1.0, TypedRef::block(3)).unwrap_err();
        assert!(matches!(err, CompileError::Validation(_)));
    }

    #[test]
    fn to_const_builds_one_branch_per_value() {
        let mut c = Compiler::new();
        let a = c.counter(0.0).unwrap();
        let mut seen = Vec::new();
        a.to_const(&mut c, 0..3, |c, v| {
            seen.push(v);
            c.counter(0.0).map(|_| ())
        })
        .unwrap();
        assert_eq!(seen, vec![0, 1, 2]);
        let checks = objects(&c);
        assert_eq!(checks.len(), 3);
        assert!(checks.iter().all(|o| o.obj_id() == Some(obj_id::INSTANT_COUNT)));
        assert_eq!(checks[2].get(field::COUNT), Some(&Value::Number(2.0)));
    }

    #[test]
    fn add_to_transfers_then_resets() {
        let mut c = Compiler::new();
        let a = c.counter(0.0).unwrap();
        let b = c.counter(0.0).unwrap();
        a.add_to(&mut c, b).unwrap();
        let objs = objects(&c);
        assert_eq!(objs.len(), 2);
        assert_eq!(objs[0].get(field::ITEM_TARGET), Some(&Value::Number(f64::from(b.item))));
        assert_eq!(objs[0].get(field::ITEM_ID_1), Some(&Value::Number(f64::from(a.item))));
        assert_eq!(objs[1].get(field::COUNT), Some(&Value::Number(0.0)));
        assert_eq!(objs[1].get(field::OVERRIDE), Some(&Value::Bool(true)));
    }
}
