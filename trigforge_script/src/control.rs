//! Control flow: delays, loops, sequences and remappable functions.
//!
//! None of these exist in the target graph. Each is lowered to extra
//! contexts wired together with spawn and comparison triggers.

use log::debug;
use trigforge_data::TypedRef;

use crate::CompileError;
use crate::context::{Compiler, ContextId};
use crate::counter::{Condition, Counter, CounterKind, greater_than, less_than};
use crate::triggers;

fn check_delay(seconds: f64) -> Result<(), CompileError> {
    if seconds.is_finite() && seconds >= 0.0 {
        Ok(())
    } else {
        Err(CompileError::InvalidDelay(seconds))
    }
}

/// Groups and contexts produced by one loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompiledLoop {
    /// Group holding the condition check; spawning it (re)starts an iteration.
    pub check: TypedRef,
    pub body: TypedRef,
    /// Context the re-check spawn was placed in.
    pub tail: ContextId,
}

/// Counting range for [`Compiler::for_loop`]; `end` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopRange {
    pub start: i64,
    pub end: i64,
    pub step: i64,
}

impl LoopRange {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end, step: 1 }
    }

    #[must_use]
    pub fn step(self, step: i64) -> Self {
        Self { step, ..self }
    }

    fn validate(&self) -> Result<(), CompileError> {
        if self.step == 0 {
            return Err(CompileError::InvalidRange("step must not be zero".into()));
        }
        if (self.step > 0 && self.start > self.end) || (self.step < 0 && self.start < self.end) {
            return Err(CompileError::InvalidRange(format!(
                "step {} never reaches {} from {}",
                self.step, self.end, self.start
            )));
        }
        Ok(())
    }
}

impl From<std::ops::Range<i64>> for LoopRange {
    fn from(r: std::ops::Range<i64>) -> Self {
        Self::new(r.start, r.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceMode {
    Stop,
    Loop,
    Last,
}

impl SequenceMode {
    pub fn code(self) -> i32 {
        match self {
            SequenceMode::Stop => 0,
            SequenceMode::Loop => 1,
            SequenceMode::Last => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceReset {
    None,
    Full,
    Step,
}

impl SequenceReset {
    pub fn code(self) -> i32 {
        match self {
            SequenceReset::None => 0,
            SequenceReset::Full => 1,
            SequenceReset::Step => 2,
        }
    }
}

/// A compiled sequence; each call advances it one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sequence {
    pub group: TypedRef,
}

impl Sequence {
    /// # Errors
    /// Propagates trigger construction failures.
    pub fn call(&self, c: &mut Compiler) -> Result<(), CompileError> {
        c.call(self.group, 0.0)
    }
}

/// A trigger function written against placeholder counters, callable with
/// concrete counters substituted via item remapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Remappable<const N: usize> {
    pub group: TypedRef,
    pub placeholders: [Counter; N],
}

impl<const N: usize> Remappable<N> {
    /// Spawn the function with each placeholder remapped to the matching arg.
    ///
    /// # Errors
    /// Propagates trigger construction failures.
    pub fn call(&self, c: &mut Compiler, args: [Counter; N]) -> Result<(), CompileError> {
        let pairs = self
            .placeholders
            .iter()
            .zip(args.iter())
            .flat_map(|(from, to)| [i64::from(from.item), i64::from(to.item)])
            .collect();
        c.add(triggers::remap_spawn(self.group, pairs)?);
        Ok(())
    }
}

impl Compiler {
    /// Spawn `group` from the current context after `delay` seconds.
    ///
    /// # Errors
    /// `InvalidDelay` for a negative or non-finite delay, `Validation` if
    /// `group` is not a group reference.
    pub fn call(&mut self, group: TypedRef, delay: f64) -> Result<(), CompileError> {
        check_delay(delay)?;
        self.add(triggers::spawn(group, delay)?);
        Ok(())
    }

    /// Suspend for `seconds`: everything emitted afterwards runs in a new
    /// context spawned with that delay.
    ///
    /// # Errors
    /// `CompileError::InvalidDelay` for a negative or non-finite delay.
    pub fn wait(&mut self, seconds: f64) -> Result<(), CompileError> {
        check_delay(seconds)?;
        let from = self.current_id();
        let next = self.anonymous_context()?;
        let target = self.group_of(next);
        self.add(triggers::spawn(target, seconds)?);
        self.link(from, next);
        self.switch_to(next);
        Ok(())
    }

    /// Loop `body` while `cond` holds, re-checking every
    /// [`CompilerOptions::loop_delay`](crate::CompilerOptions) seconds.
    ///
    /// # Errors
    /// The first error from `body`.
    pub fn repeat_while<F>(&mut self, cond: Condition, body: F) -> Result<CompiledLoop, CompileError>
    where
        F: FnOnce(&mut Compiler, TypedRef) -> Result<(), CompileError>,
    {
        let delay = self.options().loop_delay;
        self.repeat_while_every(cond, delay, body)
    }

    /// [`Compiler::repeat_while`] with an explicit re-check delay.
    ///
    /// The check lives in its own context, so the tail re-spawn runs only the
    /// comparison and not the code that started the loop. `body` receives its
    /// own group.
    ///
    /// # Errors
    /// `InvalidDelay`, or the first error from `body`.
    pub fn repeat_while_every<F>(&mut self, cond: Condition, delay: f64, body: F) -> Result<CompiledLoop, CompileError>
    where
        F: FnOnce(&mut Compiler, TypedRef) -> Result<(), CompileError>,
    {
        check_delay(delay)?;
        let check_ctx = self.anonymous_context()?;
        let body_ctx = self.anonymous_context()?;
        let check = self.group_of(check_ctx);
        let body_group = self.group_of(body_ctx);

        self.enter(check_ctx, |c| cond.compile(c, body_group))?;
        self.add(triggers::spawn(check, 0.0)?);
        self.enter(body_ctx, |c| body(c, body_group))?;

        let tail = self.chain().terminal(body_ctx);
        self.push_into(tail, triggers::spawn(check, delay)?);
        debug!("loop: check {check}, body {body_group}, re-check every {delay}s");
        Ok(CompiledLoop {
            check,
            body: body_group,
            tail,
        })
    }

    /// Counted loop over `range` using the default re-check delay. Returns
    /// the loop counter.
    ///
    /// # Errors
    /// `InvalidRange` before anything is emitted, or the first error from `body`.
    pub fn for_loop<F>(&mut self, range: impl Into<LoopRange>, body: F) -> Result<Counter, CompileError>
    where
        F: FnOnce(&mut Compiler, Counter) -> Result<(), CompileError>,
    {
        let delay = self.options().loop_delay;
        self.for_loop_every(range, delay, body)
    }

    /// # Errors
    /// `InvalidRange` or `InvalidDelay` before anything is emitted, or the
    /// first error from `body`.
    #[allow(clippy::cast_precision_loss)]
    pub fn for_loop_every<F>(&mut self, range: impl Into<LoopRange>, delay: f64, body: F) -> Result<Counter, CompileError>
    where
        F: FnOnce(&mut Compiler, Counter) -> Result<(), CompileError>,
    {
        let range = range.into();
        range.validate()?;
        check_delay(delay)?;
        let counter = self.counter(0.0)?;
        // set even at zero: a nested or re-called loop must restart its count
        counter.set(self, range.start as f64)?;
        let cond = if range.step > 0 {
            less_than(counter, range.end as f64)
        } else {
            greater_than(counter, range.end as f64)
        };
        self.repeat_while_every(cond, delay, |c, _| {
            body(c, counter)?;
            counter.add(c, range.step)
        })?;
        Ok(counter)
    }

    /// Compile a sequence trigger over `(group, duration)` steps. Durations
    /// count activations, see [`triggers::sequence`].
    ///
    /// # Errors
    /// `InvalidDelay` for a bad minimum interval, `Validation` if a step is
    /// not a group.
    pub fn sequence(
        &mut self,
        steps: &[(TypedRef, u32)],
        mode: SequenceMode,
        min_interval: f64,
        reset: SequenceReset,
    ) -> Result<Sequence, CompileError> {
        check_delay(min_interval)?;
        for (group, _) in steps {
            triggers::spawn(*group, 0.0)?;
        }
        let trigger = triggers::sequence(steps, mode, min_interval, reset)?;
        let group = self.trigger_function(|c| {
            c.add(trigger);
            Ok(())
        })?;
        Ok(Sequence { group })
    }

    /// Compile `body` against `N` fresh placeholder counters.
    ///
    /// # Errors
    /// The first error from `body`.
    pub fn remappable<const N: usize, F>(&mut self, body: F) -> Result<Remappable<N>, CompileError>
    where
        F: FnOnce(&mut Compiler, [Counter; N]) -> Result<(), CompileError>,
    {
        let placeholders = std::array::from_fn(|_| Counter {
            item: self.ids.next_item(),
            kind: CounterKind::Item,
        });
        let group = self.trigger_function(|c| body(c, placeholders))?;
        Ok(Remappable { group, placeholders })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trigforge_data::{Value, field, obj_id};

    #[test]
    fn wait_switches_to_a_chained_context() {
        let mut c = Compiler::new();
        let before = c.current_id();
        c.wait(1.5).unwrap();
        let after = c.current_id();
        assert_ne!(before, after);
        assert_eq!(c.chain().next(before), Some(after));
        let spawn = &c.context_at(before).unwrap().objects[0];
        assert_eq!(spawn.get(field::TARGET), Some(&Value::Ref(c.current().group)));
        assert_eq!(spawn.get(field::SPAWN_DURATION), Some(&Value::Number(1.5)));
    }

    #[test]
    fn bad_delays_are_rejected() {
        let mut c = Compiler::new();
        assert_eq!(c.wait(-1.0), Err(CompileError::InvalidDelay(-1.0)));
        assert!(matches!(c.wait(f64::NAN), Err(CompileError::InvalidDelay(_))));
        assert!(c.call(TypedRef::group(1), f64::INFINITY).is_err());
    }

    #[test]
    fn wait_inside_function_does_not_leak() {
        let mut c = Compiler::new();
        c.trigger_function(|c| c.wait(0.2)).unwrap();
        assert_eq!(c.current_id(), ContextId::GLOBAL);
    }

    #[test]
    fn loop_tail_follows_waits_in_body() {
        let mut c = Compiler::new();
        let n = c.counter(0.0).unwrap();
        let lp = c
            .repeat_while(less_than(n, 3.0), |c, _| {
                n.add(c, 1)?;
                c.wait(0.5)
            })
            .unwrap();
        let body_ctx = c.find_by_group(lp.body).unwrap();
        assert_eq!(body_ctx.objects.len(), 2);
        let tail = c.context_at(lp.tail).unwrap();
        assert_ne!(tail.group, lp.body);
        assert_eq!(tail.objects.len(), 1);
        assert_eq!(tail.objects[0].get(field::TARGET), Some(&Value::Ref(lp.check)));
        assert_eq!(tail.objects[0].get(field::SPAWN_DURATION), Some(&Value::Number(0.05)));
    }

    #[test]
    fn for_loop_rejects_bad_ranges_before_emitting() {
        let mut c = Compiler::new();
        let before = c.contexts().count();
        let err = c.for_loop(LoopRange::new(0, 5).step(0), |_, _| Ok(())).unwrap_err();
        assert!(matches!(err, CompileError::InvalidRange(_)));
        let err = c.for_loop(LoopRange::new(5, 0), |_, _| Ok(())).unwrap_err();
        assert!(matches!(err, CompileError::InvalidRange(_)));
        assert_eq!(c.contexts().count(), before);
        assert!(c.current().objects.is_empty());
    }

    #[test]
    fn descending_for_loop_uses_greater_than() {
        let mut c = Compiler::new();
        c.for_loop(LoopRange::new(10, 0).step(-2), |_, _| Ok(())).unwrap();
        let check = c
            .contexts()
            .flat_map(|ctx| ctx.objects.iter())
            .find(|o| o.obj_id() == Some(obj_id::INSTANT_COUNT))
            .unwrap();
        assert_eq!(check.get(field::COMPARISON), Some(&Value::Number(1.0)));
        assert_eq!(check.get(field::COUNT), Some(&Value::Number(0.0)));
    }

    #[test]
    fn sequence_is_a_callable_function() {
        let mut c = Compiler::new();
        let a = c.next_group();
        let b = c.next_group();
        let seq = c
            .sequence(&[(a, 1), (b, 2)], SequenceMode::Stop, 0.0, SequenceReset::None)
            .unwrap();
        seq.call(&mut c).unwrap();
        let inner = &c.find_by_group(seq.group).unwrap().objects;
        assert_eq!(inner.len(), 1);
        assert_eq!(inner[0].obj_id(), Some(obj_id::SEQUENCE));
        assert_eq!(c.current().objects[0].get(field::TARGET), Some(&Value::Ref(seq.group)));
        assert!(
            c.sequence(&[(TypedRef::color(2), 1)], SequenceMode::Stop, 0.0, SequenceReset::None)
                .is_err()
        );
    }

    #[test]
    fn remappable_maps_placeholders_to_args() {
        let mut c = Compiler::new();
        let f = c.remappable::<2, _>(|c, [x, y]| x.add_to(c, y)).unwrap();
        let a = c.counter(0.0).unwrap();
        let b = c.counter(0.0).unwrap();
        f.call(&mut c, [a, b]).unwrap();
        let [x, y] = f.placeholders;
        let spawn = &c.current().objects[0];
        assert_eq!(
            spawn.get(field::REMAPS),
            Some(&Value::List(vec![
                i64::from(x.item),
                i64::from(a.item),
                i64::from(y.item),
                i64::from(b.item)
            ]))
        );
        assert_eq!(c.find_by_group(f.group).unwrap().objects.len(), 2);
    }
}
