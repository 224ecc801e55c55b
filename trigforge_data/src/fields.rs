//! Field-id table consumed by the codec and by object validation.
//!
//! The full game table is large and lives outside this crate; the built-in
//! table covers the fields the compiler itself emits. Callers with a richer
//! table construct their own [`FieldTable`] from [`FieldDef`] entries.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::ids::Domain;

/// Field names used by the compiler. Several names may share one numeric id
/// (e.g. `ITEM_TARGET` and `TARGET`); the first one registered is canonical.
pub mod field {
    pub const OBJ_ID: &str = "OBJ_ID";
    pub const X: &str = "X";
    pub const Y: &str = "Y";
    pub const DURATION: &str = "DURATION";
    pub const TARGET_COLOR: &str = "TARGET_COLOR";
    pub const TARGET: &str = "TARGET";
    pub const ITEM_TARGET: &str = "ITEM_TARGET";
    pub const ACTIVATE_GROUP: &str = "ACTIVATE_GROUP";
    pub const GROUPS: &str = "GROUPS";
    pub const SPAWN_TRIGGERED: &str = "SPAWN_TRIGGERED";
    pub const SPAWN_DURATION: &str = "SPAWN_DURATION";
    pub const TARGET_POS: &str = "TARGET_POS";
    pub const FALSE_ID: &str = "FALSE_ID";
    pub const COUNT: &str = "COUNT";
    pub const ITEM: &str = "ITEM";
    pub const ITEM_ID_1: &str = "ITEM_ID_1";
    pub const MULTI_TRIGGERED: &str = "MULTI_TRIGGERED";
    pub const COMPARISON: &str = "COMPARISON";
    pub const MULTIPLY_DIVIDE: &str = "MULTIPLY_DIVIDE";
    pub const ITEM_ID_2: &str = "ITEM_ID_2";
    pub const OVERRIDE: &str = "OVERRIDE";
    pub const SEQUENCE: &str = "SEQUENCE";
    pub const MODE: &str = "MODE";
    pub const MIN_INT: &str = "MIN_INT";
    pub const RESET: &str = "RESET";
    pub const REMAPS: &str = "REMAPS";
    pub const MODIFIER: &str = "MODIFIER";
    pub const TYPE_1: &str = "TYPE_1";
    pub const TYPE_2: &str = "TYPE_2";
    pub const TARGET_TYPE: &str = "TARGET_TYPE";
    pub const MOD: &str = "MOD";
    pub const ASSIGN_OP: &str = "ASSIGN_OP";
    pub const COMPARE_OP: &str = "COMPARE_OP";
    pub const OP_1: &str = "OP_1";
    pub const OP_2: &str = "OP_2";
    pub const MOD_2: &str = "MOD_2";
    pub const PERSISTENT: &str = "PERSISTENT";
    pub const TARGET_ALL: &str = "TARGET_ALL";
    pub const PERSIST_RESET: &str = "PERSIST_RESET";
    pub const TIMER: &str = "TIMER";
    pub const RESET_REMAP: &str = "RESET_REMAP";
}

/// Object type ids for the trigger kinds the compiler emits.
pub mod obj_id {
    pub const SPAWN: u32 = 1268;
    pub const INSTANT_COUNT: u32 = 1811;
    pub const PICKUP: u32 = 1817;
    pub const SEQUENCE: u32 = 3607;
    pub const ITEM_EDIT: u32 = 3619;
    pub const ITEM_COMPARE: u32 = 3620;
    pub const ITEM_PERSIST: u32 = 3641;
}

/// How a field's raw value should be read and checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Scalar,
    Flag,
    /// A single reference that must carry exactly this domain (explicit-typed).
    Ref(Domain),
    /// A dot-joined list of references.
    Refs(Domain),
    /// A dot-joined list of plain integers.
    List,
}

impl FieldKind {
    pub fn is_list(&self) -> bool {
        matches!(self, FieldKind::Refs(_) | FieldKind::List)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub id: u32,
    pub name: &'static str,
    pub kind: FieldKind,
}

const fn def(id: u32, name: &'static str, kind: FieldKind) -> FieldDef {
    FieldDef { id, name, kind }
}

const BUILTIN_FIELDS: &[FieldDef] = &[
    def(1, field::OBJ_ID, FieldKind::Scalar),
    def(2, field::X, FieldKind::Scalar),
    def(3, field::Y, FieldKind::Scalar),
    def(10, field::DURATION, FieldKind::Scalar),
    def(23, field::TARGET_COLOR, FieldKind::Ref(Domain::Color)),
    def(51, field::TARGET, FieldKind::Ref(Domain::Group)),
    def(51, field::ITEM_TARGET, FieldKind::Scalar),
    def(56, field::ACTIVATE_GROUP, FieldKind::Flag),
    def(57, field::GROUPS, FieldKind::Refs(Domain::Group)),
    def(62, field::SPAWN_TRIGGERED, FieldKind::Flag),
    def(63, field::SPAWN_DURATION, FieldKind::Scalar),
    def(71, field::TARGET_POS, FieldKind::Scalar),
    def(71, field::FALSE_ID, FieldKind::Scalar),
    def(77, field::COUNT, FieldKind::Scalar),
    def(80, field::ITEM, FieldKind::Scalar),
    def(80, field::ITEM_ID_1, FieldKind::Scalar),
    def(87, field::MULTI_TRIGGERED, FieldKind::Flag),
    def(88, field::COMPARISON, FieldKind::Scalar),
    def(88, field::MULTIPLY_DIVIDE, FieldKind::Scalar),
    def(95, field::ITEM_ID_2, FieldKind::Scalar),
    def(139, field::OVERRIDE, FieldKind::Flag),
    def(435, field::SEQUENCE, FieldKind::List),
    def(436, field::MODE, FieldKind::Scalar),
    def(437, field::MIN_INT, FieldKind::Scalar),
    def(438, field::RESET, FieldKind::Scalar),
    def(442, field::REMAPS, FieldKind::List),
    def(449, field::MODIFIER, FieldKind::Scalar),
    def(476, field::TYPE_1, FieldKind::Scalar),
    def(477, field::TYPE_2, FieldKind::Scalar),
    def(478, field::TARGET_TYPE, FieldKind::Scalar),
    def(479, field::MOD, FieldKind::Scalar),
    def(480, field::ASSIGN_OP, FieldKind::Scalar),
    def(480, field::COMPARE_OP, FieldKind::Scalar),
    def(481, field::OP_1, FieldKind::Scalar),
    def(482, field::OP_2, FieldKind::Scalar),
    def(483, field::MOD_2, FieldKind::Scalar),
    def(491, field::PERSISTENT, FieldKind::Flag),
    def(492, field::TARGET_ALL, FieldKind::Flag),
    def(493, field::PERSIST_RESET, FieldKind::Flag),
    def(494, field::TIMER, FieldKind::Flag),
    def(581, field::RESET_REMAP, FieldKind::Flag),
];

static BUILTIN: LazyLock<FieldTable> = LazyLock::new(|| FieldTable::new(BUILTIN_FIELDS.iter().copied()));

/// Bidirectional field id ↔ name mapping with per-field kinds.
#[derive(Debug, Clone, Default)]
pub struct FieldTable {
    by_name: HashMap<&'static str, FieldDef>,
    canonical: HashMap<u32, FieldDef>,
}

impl FieldTable {
    /// Build a table; when several entries share an id, the first is used
    /// when decoding that id.
    pub fn new(defs: impl IntoIterator<Item = FieldDef>) -> Self {
        let mut table = Self::default();
        for def in defs {
            table.canonical.entry(def.id).or_insert(def);
            table.by_name.insert(def.name, def);
        }
        table
    }

    /// The table covering every field the compiler emits.
    pub fn builtin() -> &'static FieldTable {
        &BUILTIN
    }

    pub fn by_name(&self, name: &str) -> Option<&FieldDef> {
        self.by_name.get(name)
    }

    pub fn by_id(&self, id: u32) -> Option<&FieldDef> {
        self.canonical.get(&id)
    }

    pub fn id_of(&self, name: &str) -> Option<u32> {
        self.by_name(name).map(|def| def.id)
    }

    pub fn kind_of(&self, name: &str) -> Option<FieldKind> {
        self.by_name(name).map(|def| def.kind)
    }

    /// Domain required by an explicit-typed field, if `name` is one.
    pub fn explicit_domain(&self, name: &str) -> Option<Domain> {
        match self.kind_of(name) {
            Some(FieldKind::Ref(domain)) => Some(domain),
            _ => None,
        }
    }
}
