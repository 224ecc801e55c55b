//! Build contexts and the compiler state that owns them.
//!
//! A context binds a name to one group id and collects the objects emitted
//! while it is current. The "current" context is the top of an explicit
//! stack: entering a trigger function pushes, leaving pops, and `wait`
//! replaces the top so later statements land in the delayed context.

use std::collections::{HashMap, HashSet};

use log::{debug, info};
use trigforge_data::{Domain, FieldTable, IdAllocator, Object, TypedRef, Value, encode_objects, field};
use uuid::Uuid;

use crate::CompileError;

/// Name of the context that exists from the start and owns group 1.
pub const GLOBAL: &str = "global";

/// Index of a context inside one [`Compiler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(usize);

impl ContextId {
    pub const GLOBAL: ContextId = ContextId(0);
}

/// A compile-time scope: one group, the objects emitted into it, and the
/// context that was current when it was opened.
#[derive(Debug, Clone)]
pub struct Context {
    pub name: String,
    pub group: TypedRef,
    pub objects: Vec<Object>,
    pub parent: Option<ContextId>,
}

/// Records which context each `wait` chained on from, so loop compilation can
/// find where a body's execution actually ends.
#[derive(Debug, Clone, Default)]
pub struct ChainGraph {
    next: HashMap<ContextId, ContextId>,
}

impl ChainGraph {
    /// Record `to` as the most recent continuation of `from`.
    pub fn link(&mut self, from: ContextId, to: ContextId) {
        self.next.insert(from, to);
    }

    pub fn next(&self, from: ContextId) -> Option<ContextId> {
        self.next.get(&from).copied()
    }

    /// Follow links from `start` to the last context in its chain.
    pub fn terminal(&self, start: ContextId) -> ContextId {
        let mut seen = HashSet::new();
        let mut at = start;
        while let Some(next) = self.next(at) {
            if !seen.insert(at) {
                break;
            }
            at = next;
        }
        at
    }
}

/// Tunables for one compilation run.
#[derive(Debug, Clone, PartialEq)]
pub struct CompilerOptions {
    /// Seconds between re-checks of a loop condition.
    pub loop_delay: f64,
    /// Group kept out of auto allocation from the start, for tagging output.
    pub marker_group: Option<u32>,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            loop_delay: 0.05,
            marker_group: None,
        }
    }
}

/// All mutable state of one compilation: id counters, contexts, the current
/// context stack and the wait chain. Independent compilers share nothing.
#[derive(Debug)]
pub struct Compiler {
    pub(crate) ids: IdAllocator,
    contexts: Vec<Context>,
    by_name: HashMap<String, ContextId>,
    by_group: HashMap<u32, ContextId>,
    stack: Vec<ContextId>,
    chain: ChainGraph,
    options: CompilerOptions,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    pub fn new() -> Self {
        Self::with_options(CompilerOptions::default())
    }

    pub fn with_options(options: CompilerOptions) -> Self {
        let mut ids = IdAllocator::new();
        let group = ids.reserve(Domain::Group, 1);
        if let Some(marker) = options.marker_group {
            ids.reserve(Domain::Group, marker);
        }
        let global = Context {
            name: GLOBAL.to_string(),
            group,
            objects: Vec::new(),
            parent: None,
        };
        Self {
            ids,
            contexts: vec![global],
            by_name: HashMap::from([(GLOBAL.to_string(), ContextId::GLOBAL)]),
            by_group: HashMap::from([(group.value, ContextId::GLOBAL)]),
            stack: vec![ContextId::GLOBAL],
            chain: ChainGraph::default(),
            options,
        }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// A fresh group id that no context owns.
    pub fn next_group(&mut self) -> TypedRef {
        self.ids.next(Domain::Group)
    }

    pub fn next_color(&mut self) -> TypedRef {
        self.ids.next(Domain::Color)
    }

    pub fn next_block(&mut self) -> TypedRef {
        self.ids.next(Domain::Block)
    }

    /// Claim an explicit group id; auto allocation will skip it from now on.
    pub fn reserve_group(&mut self, value: u32) -> TypedRef {
        self.ids.reserve(Domain::Group, value)
    }

    /// Whether `value` already addresses something in this compilation: an
    /// auto-allocated group or a context's group.
    pub fn group_in_use(&self, value: u32) -> bool {
        self.ids.is_issued(Domain::Group, value) || self.by_group.contains_key(&value)
    }

    pub fn reserve_color(&mut self, value: u32) -> TypedRef {
        self.ids.reserve(Domain::Color, value)
    }

    pub fn reserve_block(&mut self, value: u32) -> TypedRef {
        self.ids.reserve(Domain::Block, value)
    }

    /// Open a named context with a fresh group, optionally making it current.
    ///
    /// # Errors
    /// `CompileError::DuplicateContext` if the name is taken.
    pub fn create_context(&mut self, name: &str, switch_to_it: bool) -> Result<ContextId, CompileError> {
        let id = self.register(name.to_string())?;
        if switch_to_it {
            self.switch_to(id);
        }
        Ok(id)
    }

    pub(crate) fn anonymous_context(&mut self) -> Result<ContextId, CompileError> {
        self.register(format!("trigger_fn_{}", Uuid::new_v4().simple()))
    }

    fn register(&mut self, name: String) -> Result<ContextId, CompileError> {
        if self.by_name.contains_key(&name) {
            return Err(CompileError::DuplicateContext(name));
        }
        let group = self.ids.next(Domain::Group);
        let id = ContextId(self.contexts.len());
        debug!("context '{name}' opened with {group}");
        self.by_name.insert(name.clone(), id);
        self.by_group.insert(group.value, id);
        self.contexts.push(Context {
            name,
            group,
            objects: Vec::new(),
            parent: Some(self.current_id()),
        });
        Ok(id)
    }

    /// Make the named context current in place of the present one.
    ///
    /// # Errors
    /// `CompileError::UnknownContext` for an unregistered name.
    pub fn set_current(&mut self, name: &str) -> Result<(), CompileError> {
        let id = self.lookup(name)?;
        self.switch_to(id);
        Ok(())
    }

    pub fn current_id(&self) -> ContextId {
        self.stack.last().copied().unwrap_or(ContextId::GLOBAL)
    }

    pub fn current(&self) -> &Context {
        &self.contexts[self.current_id().0]
    }

    /// # Errors
    /// `CompileError::UnknownContext` for an unregistered name.
    pub fn context(&self, name: &str) -> Result<&Context, CompileError> {
        Ok(&self.contexts[self.lookup(name)?.0])
    }

    pub fn context_at(&self, id: ContextId) -> Option<&Context> {
        self.contexts.get(id.0)
    }

    /// The context owning `group`.
    ///
    /// # Errors
    /// `CompileError::UnknownGroup` when no context owns it.
    pub fn find_by_group(&self, group: TypedRef) -> Result<&Context, CompileError> {
        self.group_owner(group).map(|id| &self.contexts[id.0])
    }

    /// Contexts in creation order, `global` first.
    pub fn contexts(&self) -> impl Iterator<Item = &Context> {
        self.contexts.iter()
    }

    pub fn chain(&self) -> &ChainGraph {
        &self.chain
    }

    fn lookup(&self, name: &str) -> Result<ContextId, CompileError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| CompileError::UnknownContext(name.to_string()))
    }

    fn group_owner(&self, group: TypedRef) -> Result<ContextId, CompileError> {
        if !group.is_group() {
            return Err(CompileError::UnknownGroup(group));
        }
        self.by_group
            .get(&group.value)
            .copied()
            .ok_or(CompileError::UnknownGroup(group))
    }

    /// Append an object to the current context.
    pub fn add(&mut self, obj: Object) {
        let id = self.current_id();
        self.push_into(id, obj);
    }

    pub(crate) fn push_into(&mut self, id: ContextId, obj: Object) {
        self.contexts[id.0].objects.push(obj);
    }

    pub(crate) fn group_of(&self, id: ContextId) -> TypedRef {
        self.contexts[id.0].group
    }

    pub(crate) fn switch_to(&mut self, id: ContextId) {
        match self.stack.last_mut() {
            Some(top) => *top = id,
            None => self.stack.push(id),
        }
    }

    pub(crate) fn link(&mut self, from: ContextId, to: ContextId) {
        self.chain.link(from, to);
    }

    /// Run `body` with `id` as the current context and restore the previous
    /// current context afterwards, whether or not `body` succeeded.
    pub(crate) fn enter<R>(
        &mut self,
        id: ContextId,
        body: impl FnOnce(&mut Compiler) -> Result<R, CompileError>,
    ) -> Result<R, CompileError> {
        self.stack.push(id);
        let result = body(self);
        self.stack.pop();
        result
    }

    /// Compile `body` into a fresh context and return that context's group.
    /// Calling the group later runs everything `body` emitted.
    ///
    /// Objects emitted before a failure are kept; the error is returned as is.
    ///
    /// # Errors
    /// Whatever `body` returns.
    pub fn trigger_function<F>(&mut self, body: F) -> Result<TypedRef, CompileError>
    where
        F: FnOnce(&mut Compiler) -> Result<(), CompileError>,
    {
        let id = self.anonymous_context()?;
        self.enter(id, body)?;
        Ok(self.group_of(id))
    }

    /// Re-enter the context owning `group` and append more objects to it.
    ///
    /// # Errors
    /// `CompileError::UnknownGroup`, or whatever `body` returns.
    pub fn extend_trigger_function<F>(&mut self, group: TypedRef, body: F) -> Result<(), CompileError>
    where
        F: FnOnce(&mut Compiler) -> Result<(), CompileError>,
    {
        let id = self.group_owner(group)?;
        self.enter(id, body)
    }

    /// Finalize every context: non-global objects join their context's group
    /// and become spawn- and multi-triggered. Returns all objects, `global`
    /// first, then contexts in creation order.
    pub fn flush(self) -> Vec<Object> {
        let total: usize = self.contexts.iter().map(|ctx| ctx.objects.len()).sum();
        let mut out = Vec::with_capacity(total);
        for (idx, ctx) in self.contexts.into_iter().enumerate() {
            let is_global = idx == ContextId::GLOBAL.0;
            for mut obj in ctx.objects {
                if !is_global {
                    obj.add_group(ctx.group);
                    obj.insert(field::SPAWN_TRIGGERED, Value::Bool(true));
                    obj.insert(field::MULTI_TRIGGERED, Value::Bool(true));
                }
                out.push(obj);
            }
        }
        info!("flushed {total} objects");
        out
    }

    /// Flush and serialize to a level string with the built-in field table.
    ///
    /// # Errors
    /// `CompileError::Codec` if any object cannot be encoded.
    pub fn export(self) -> Result<String, CompileError> {
        self.export_with(FieldTable::builtin())
    }

    /// # Errors
    /// `CompileError::Codec` if any object cannot be encoded.
    pub fn export_with(self, table: &FieldTable) -> Result<String, CompileError> {
        let objects = self.flush();
        Ok(encode_objects(&objects, table)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trigforge_data::obj_id;

    fn marker(n: i32) -> Object {
        Object::of_type(obj_id::PICKUP).with(field::COUNT, n).unwrap()
    }

    #[test]
    fn global_exists_and_owns_group_one() {
        let c = Compiler::new();
        assert_eq!(c.current().name, GLOBAL);
        assert_eq!(c.context(GLOBAL).unwrap().group, TypedRef::group(1));
        assert_eq!(c.find_by_group(TypedRef::group(1)).unwrap().name, GLOBAL);
    }

    #[test]
    fn created_contexts_get_distinct_groups() {
        let mut c = Compiler::new();
        c.reserve_group(3);
        let a = c.create_context("a", false).unwrap();
        let b = c.create_context("b", false).unwrap();
        let ga = c.context_at(a).unwrap().group;
        let gb = c.context_at(b).unwrap().group;
        assert_ne!(ga, gb);
        assert_ne!(ga.value, 1);
        assert_ne!(gb.value, 3);
        assert_eq!(c.context_at(a).unwrap().parent, Some(ContextId::GLOBAL));
    }

    #[test]
    fn marker_option_keeps_group_out_of_allocation() {
        let mut c = Compiler::with_options(CompilerOptions {
            marker_group: Some(2),
            ..CompilerOptions::default()
        });
        assert!(!c.group_in_use(2));
        let a = c.create_context("a", false).unwrap();
        assert_eq!(c.context_at(a).unwrap().group, TypedRef::group(3));
        assert!(c.group_in_use(3));
        assert!(c.group_in_use(1));
        assert!(!c.group_in_use(2));
    }

    #[test]
    fn duplicate_and_unknown_names_are_errors() {
        let mut c = Compiler::new();
        c.create_context("dup", false).unwrap();
        assert!(matches!(c.create_context("dup", false), Err(CompileError::DuplicateContext(_))));
        assert!(matches!(c.set_current("nope"), Err(CompileError::UnknownContext(_))));
        assert!(matches!(
            c.find_by_group(TypedRef::group(99)),
            Err(CompileError::UnknownGroup(_))
        ));
        assert!(matches!(
            c.find_by_group(TypedRef::color(1)),
            Err(CompileError::UnknownGroup(_))
        ));
    }

    #[test]
    fn create_context_can_switch() {
        let mut c = Compiler::new();
        c.create_context("side", true).unwrap();
        c.add(marker(1));
        assert_eq!(c.context("side").unwrap().objects.len(), 1);
        c.set_current(GLOBAL).unwrap();
        c.add(marker(2));
        assert_eq!(c.context(GLOBAL).unwrap().objects.len(), 1);
    }

    #[test]
    fn trigger_function_restores_current_even_on_error() {
        let mut c = Compiler::new();
        let result = c.trigger_function(|c| {
            c.add(marker(1));
            Err(CompileError::UnknownContext("boom".into()))
        });
        assert!(result.is_err());
        assert_eq!(c.current().name, GLOBAL);
        // partial output stays in the failed function's context
        assert_eq!(c.contexts().map(|ctx| ctx.objects.len()).sum::<usize>(), 1);
    }

    #[test]
    fn nested_trigger_functions_collect_separately() {
        let mut c = Compiler::new();
        let mut inner = None;
        let outer = c
            .trigger_function(|c| {
                c.add(marker(1));
                inner = Some(c.trigger_function(|c| {
                    c.add(marker(2));
                    Ok(())
                })?);
                c.add(marker(3));
                Ok(())
            })
            .unwrap();
        let inner = inner.unwrap();
        assert_eq!(c.find_by_group(outer).unwrap().objects.len(), 2);
        assert_eq!(c.find_by_group(inner).unwrap().objects.len(), 1);
    }

    #[test]
    fn extend_appends_to_existing_function() {
        let mut c = Compiler::new();
        let group = c
            .trigger_function(|c| {
                c.add(marker(1));
                Ok(())
            })
            .unwrap();
        c.extend_trigger_function(group, |c| {
            c.add(marker(2));
            Ok(())
        })
        .unwrap();
        assert_eq!(c.find_by_group(group).unwrap().objects.len(), 2);
        assert_eq!(c.current().name, GLOBAL);
    }

    #[test]
    fn flush_marks_only_non_global_objects() {
        let mut c = Compiler::new();
        c.add(marker(0));
        let group = c
            .trigger_function(|c| {
                c.add(marker(1).with(field::GROUPS, TypedRef::group(50)).unwrap());
                Ok(())
            })
            .unwrap();
        let objects = c.flush();
        assert_eq!(objects.len(), 2);
        assert!(!objects[0].contains(field::GROUPS));
        assert!(!objects[0].contains(field::SPAWN_TRIGGERED));
        assert_eq!(
            objects[1].get(field::GROUPS),
            Some(&Value::Refs(vec![TypedRef::group(50), group]))
        );
        assert_eq!(objects[1].get(field::SPAWN_TRIGGERED), Some(&Value::Bool(true)));
        assert_eq!(objects[1].get(field::MULTI_TRIGGERED), Some(&Value::Bool(true)));
    }

    #[test]
    fn terminal_follows_links_and_stops_on_cycles() {
        let mut chain = ChainGraph::default();
        chain.link(ContextId(1), ContextId(2));
        chain.link(ContextId(2), ContextId(3));
        assert_eq!(chain.terminal(ContextId(1)), ContextId(3));
        assert_eq!(chain.terminal(ContextId(4)), ContextId(4));
        chain.link(ContextId(3), ContextId(1));
        let _ = chain.terminal(ContextId(1));
    }
}
