//! ** ids module **
//! Typed references (group / color / block) and the monotonic allocators that
//! hand them out, plus the independent item-slot counter used by counters.
use std::collections::HashSet;
use std::fmt;

use log::warn;
use serde::{Deserialize, Serialize};

/// The id space a [`TypedRef`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Domain {
    Group,
    Color,
    Block,
}

impl Domain {
    pub const ALL: [Domain; 3] = [Domain::Group, Domain::Color, Domain::Block];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Group => "group",
            Domain::Color => "color",
            Domain::Block => "block",
        }
    }

    fn index(self) -> usize {
        match self {
            Domain::Group => 0,
            Domain::Color => 1,
            Domain::Block => 2,
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable numeric id tagged with the domain it addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypedRef {
    pub domain: Domain,
    pub value: u32,
}

impl TypedRef {
    pub const fn new(domain: Domain, value: u32) -> Self {
        Self { domain, value }
    }

    pub const fn group(value: u32) -> Self {
        Self::new(Domain::Group, value)
    }

    pub const fn color(value: u32) -> Self {
        Self::new(Domain::Color, value)
    }

    pub const fn block(value: u32) -> Self {
        Self::new(Domain::Block, value)
    }

    pub fn is_group(&self) -> bool {
        self.domain == Domain::Group
    }
}

impl fmt::Display for TypedRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.domain, self.value)
    }
}

/// Per-domain monotonic allocation state.
#[derive(Debug, Clone, Default)]
struct DomainCounter {
    last: u32,
    reserved: HashSet<u32>,
    /// Reserved ids that allocation stepped over.
    skipped: HashSet<u32>,
}

impl DomainCounter {
    fn next(&mut self) -> u32 {
        loop {
            self.last += 1;
            if !self.reserved.contains(&self.last) {
                return self.last;
            }
            self.skipped.insert(self.last);
        }
    }

    fn reserve(&mut self, value: u32) -> bool {
        let late = value <= self.last && !self.skipped.contains(&value);
        self.reserved.insert(value);
        late
    }

    fn issued(&self, value: u32) -> bool {
        value != 0 && value <= self.last && !self.skipped.contains(&value)
    }
}

/// Hands out fresh group / color / block ids and item slots.
///
/// Each domain counts independently and skips any id that has been reserved
/// in that domain. Nothing is ever released: the emitted graph has no way to
/// free an id either.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    domains: [DomainCounter; 3],
    items: DomainCounter,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next unreserved id in `domain`.
    pub fn next(&mut self, domain: Domain) -> TypedRef {
        TypedRef::new(domain, self.domains[domain.index()].next())
    }

    /// Mark an explicit id as reserved so auto allocation never returns it.
    ///
    /// Returns the typed reference for convenience.
    pub fn reserve(&mut self, domain: Domain, value: u32) -> TypedRef {
        if self.domains[domain.index()].reserve(value) {
            warn!("reserving {domain} {value} after it may already have been auto-allocated");
        }
        TypedRef::new(domain, value)
    }

    pub fn is_reserved(&self, domain: Domain, value: u32) -> bool {
        self.domains[domain.index()].reserved.contains(&value)
    }

    /// Whether `next` has already handed out `value` in `domain`.
    ///
    /// A reservation made after the fact does not hide an issued id.
    pub fn is_issued(&self, domain: Domain, value: u32) -> bool {
        self.domains[domain.index()].issued(value)
    }

    /// Highest id handed out so far in `domain` (0 if none).
    pub fn high_water(&self, domain: Domain) -> u32 {
        self.domains[domain.index()].last
    }

    /// Allocate a fresh item slot. Item ids never collide with each other but
    /// are unrelated to group/color/block numbering.
    pub fn next_item(&mut self) -> u32 {
        self.items.next()
    }

    /// Claim an explicit item slot so `next_item` never returns it.
    pub fn reserve_item(&mut self, item: u32) {
        if self.items.reserve(item) {
            warn!("reserving item {item} after it may already have been auto-allocated");
        }
    }
}
