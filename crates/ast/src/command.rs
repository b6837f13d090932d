//! The command table: the immutable, case-insensitive catalogue of every
//! command, alternator, enumeration, constant, and entity type a script can
//! reference.
//!
//! The table is assembled once through [`CommandTableBuilder`] and then
//! frozen into a [`CommandTable`]; every lookup after that point is by
//! uppercased name and O(1).

use gta3c_data_structures::{Arena, fx::FxHashMap};
use index_vec::{IndexVec, define_index_type};

define_index_type! {
    pub struct EnumId = u32;
}

define_index_type! {
    pub struct EntityId = u32;
}

impl EnumId {
    /// The enumeration constants that aren't namespaced under any
    /// particular enum share this id.
    pub fn global_enum() -> Self {
        Self::from_usize(0)
    }
}

impl EntityId {
    /// The absence of an entity-type restriction on a command parameter.
    pub fn no_entity_type() -> Self {
        Self::from_usize(0)
    }
}

/// The closed set of shapes a command parameter can take.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamType {
    Int,
    Float,
    VarInt,
    LvarInt,
    VarFloat,
    LvarFloat,
    VarTextLabel,
    LvarTextLabel,
    InputInt,
    InputFloat,
    OutputInt,
    OutputFloat,
    Label,
    TextLabel,
    String,
    Filename,
    /// A named external game object (model), e.g. a vehicle or pickup model
    /// name passed to a spawn command. Resolved against the compile
    /// session's model table rather than the symbol table.
    Object,
    IntOpt,
    FloatOpt,
    VarIntOpt,
    LvarIntOpt,
    VarFloatOpt,
    LvarFloatOpt,
    VarTextLabelOpt,
    LvarTextLabelOpt,
    InputIntOpt,
    InputFloatOpt,
    OutputIntOpt,
    OutputFloatOpt,
    LabelOpt,
    TextLabelOpt,
    StringOpt,
    FilenameOpt,
    ObjectOpt,
}

impl ParamType {
    /// Whether this parameter may be omitted from a call; only the last
    /// parameter of a command may have `is_optional() == true`.
    pub fn is_optional(self) -> bool {
        use ParamType::*;
        matches!(
            self,
            IntOpt
                | FloatOpt
                | VarIntOpt
                | LvarIntOpt
                | VarFloatOpt
                | LvarFloatOpt
                | VarTextLabelOpt
                | LvarTextLabelOpt
                | InputIntOpt
                | InputFloatOpt
                | OutputIntOpt
                | OutputFloatOpt
                | LabelOpt
                | TextLabelOpt
                | StringOpt
                | FilenameOpt
                | ObjectOpt
        )
    }
}

/// One parameter slot in a [`CommandDef`].
#[derive(Clone, Copy, Debug)]
pub struct ParamDef {
    pub ty: ParamType,
    /// Restricts a `VAR_INT`/`LVAR_INT` parameter to handles of a specific
    /// entity type; [`EntityId::no_entity_type`] means unrestricted.
    pub entity_type: EntityId,
    /// Restricts an `INPUT_INT` parameter's literal values to members of
    /// this enumeration; `None` means unrestricted.
    pub enum_id: Option<EnumId>,
}

/// A command's immutable definition: name, parameter shapes, and the
/// target opcode it compiles to, if any.
#[derive(Debug)]
pub struct CommandDef<'a> {
    pub name: &'a str,
    pub params: &'a [ParamDef],
    pub target_id: Option<u16>,
    pub target_handled: bool,
}

impl<'a> CommandDef<'a> {
    /// The index, if any, of this command's trailing optional parameter.
    pub fn optional_param_index(&self) -> Option<usize> {
        self.params.iter().position(|p| p.ty.is_optional())
    }
}

/// One link of an [`AlternatorDef`]'s candidate list: a command definition
/// considered, in order, when resolving an alternator call.
pub struct AlternativeDef<'a> {
    pub command: &'a CommandDef<'a>,
    next: std::cell::Cell<Option<&'a AlternativeDef<'a>>>,
}

/// A named group of commands tried in sequence until one matches the call
/// site's argument shapes (e.g. GTA3script's `SET` overload resolution).
pub struct AlternatorDef<'a> {
    pub name: &'a str,
    head: std::cell::Cell<Option<&'a AlternativeDef<'a>>>,
}

impl<'a> AlternatorDef<'a> {
    pub fn alternatives(&self) -> AlternativeIter<'a> {
        AlternativeIter { next: self.head.get() }
    }
}

pub struct AlternativeIter<'a> {
    next: Option<&'a AlternativeDef<'a>>,
}

impl<'a> Iterator for AlternativeIter<'a> {
    type Item = &'a CommandDef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next?;
        self.next = node.next.get();
        Some(node.command)
    }
}

/// One named constant of an enumeration, e.g. `PLAYER_CHAR` in the global
/// enum. Constants sharing a name across different enums chain off the
/// same hash slot.
pub struct ConstantDef<'a> {
    pub enum_id: EnumId,
    pub value: i32,
    next_same_name: std::cell::Cell<Option<&'a ConstantDef<'a>>>,
}

impl<'a> ConstantDef<'a> {
    fn chain(&'a self) -> ConstantChainIter<'a> {
        ConstantChainIter { next: Some(self) }
    }
}

struct ConstantChainIter<'a> {
    next: Option<&'a ConstantDef<'a>>,
}

impl<'a> Iterator for ConstantChainIter<'a> {
    type Item = &'a ConstantDef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next?;
        self.next = node.next_same_name.get();
        Some(node)
    }
}

/// The frozen command catalogue. Built once via [`CommandTableBuilder`],
/// then shared read-only for the rest of compilation.
pub struct CommandTable<'a> {
    commands: FxHashMap<&'a str, &'a CommandDef<'a>>,
    alternators: FxHashMap<&'a str, &'a AlternatorDef<'a>>,
    enumerations: FxHashMap<&'a str, EnumId>,
    enum_names: IndexVec<EnumId, &'a str>,
    constants: FxHashMap<&'a str, &'a ConstantDef<'a>>,
    entity_types: FxHashMap<&'a str, EntityId>,
}

impl<'a> CommandTable<'a> {
    pub fn find_command(&self, name: &str) -> Option<&'a CommandDef<'a>> {
        self.commands.get(name.to_ascii_uppercase().as_str()).copied()
    }

    pub fn find_alternator(&self, name: &str) -> Option<&'a AlternatorDef<'a>> {
        self.alternators.get(name.to_ascii_uppercase().as_str()).copied()
    }

    pub fn find_enumeration(&self, name: &str) -> Option<EnumId> {
        self.enumerations.get(name.to_ascii_uppercase().as_str()).copied()
    }

    pub fn enum_name(&self, id: EnumId) -> &'a str {
        self.enum_names[id]
    }

    /// Looks up a constant by name within a specific enumeration.
    pub fn find_constant(&self, enum_id: EnumId, name: &str) -> Option<&'a ConstantDef<'a>> {
        let upper = name.to_ascii_uppercase();
        self.constants.get(upper.as_str())?.chain().find(|c| c.enum_id == enum_id)
    }

    /// Looks up a constant by name regardless of which enumeration it
    /// belongs to; used when a context doesn't narrow down the enum ahead
    /// of time. Ambiguous only in the sense that the first match (by
    /// insertion order) wins, matching the reference compiler.
    pub fn find_constant_any_means(&self, name: &str) -> Option<&'a ConstantDef<'a>> {
        self.constants.get(name.to_ascii_uppercase().as_str()).copied()
    }

    pub fn find_entity_type(&self, name: &str) -> Option<EntityId> {
        self.entity_types.get(name.to_ascii_uppercase().as_str()).copied()
    }
}

/// Incrementally assembles a [`CommandTable`] in an arena, then freezes it.
pub struct CommandTableBuilder<'a> {
    arena: &'a Arena,
    commands: FxHashMap<&'a str, &'a CommandDef<'a>>,
    alternators: FxHashMap<&'a str, &'a AlternatorDef<'a>>,
    enumerations: FxHashMap<&'a str, EnumId>,
    enum_names: IndexVec<EnumId, &'a str>,
    constants: FxHashMap<&'a str, &'a ConstantDef<'a>>,
    entity_types: FxHashMap<&'a str, EntityId>,
}

impl<'a> CommandTableBuilder<'a> {
    pub fn new(arena: &'a Arena) -> Self {
        let mut builder = Self {
            arena,
            commands: FxHashMap::default(),
            alternators: FxHashMap::default(),
            enumerations: FxHashMap::default(),
            enum_names: IndexVec::new(),
            constants: FxHashMap::default(),
            entity_types: FxHashMap::default(),
        };
        let global = builder.arena.alloc_str_upper("GLOBAL");
        builder.enum_names.push(global);
        builder.enumerations.insert(global, EnumId::global_enum());
        let no_entity = builder.arena.alloc_str_upper("NO_ENTITY_TYPE");
        builder.entity_types.insert(no_entity, EntityId::no_entity_type());
        builder
    }

    /// Inserts a command, keyed by its uppercased name. Returns `false`
    /// without modifying the table if a command of that name already
    /// exists (the reference compiler's `.ini` loader treats this as a
    /// configuration error, surfaced by the caller).
    pub fn insert_command(
        &mut self,
        name: &str,
        params: Vec<ParamDef>,
        target_id: Option<u16>,
        target_handled: bool,
    ) -> bool {
        let name = self.arena.alloc_str_upper(name);
        if self.commands.contains_key(name) {
            return false;
        }
        let params = self.arena.alloc_slice_fill_iter(params);
        let def = self.arena.alloc(CommandDef { name, params, target_id, target_handled });
        self.commands.insert(name, def);
        true
    }

    pub fn insert_alternator(&mut self, name: &str) -> bool {
        let name = self.arena.alloc_str_upper(name);
        if self.alternators.contains_key(name) {
            return false;
        }
        let def = self.arena.alloc(AlternatorDef { name, head: std::cell::Cell::new(None) });
        self.alternators.insert(name, def);
        true
    }

    /// Appends `command` to the end of `alternator`'s candidate list.
    pub fn insert_alternative(
        &mut self,
        alternator: &str,
        command: &'a CommandDef<'a>,
    ) -> bool {
        let Some(&alternator) = self.alternators.get(alternator.to_ascii_uppercase().as_str())
        else {
            return false;
        };
        let node = self.arena.alloc(AlternativeDef { command, next: std::cell::Cell::new(None) });
        match alternator.alternatives().last() {
            None => alternator.head.set(Some(node)),
            Some(_) => {
                let mut cur = alternator.head.get().unwrap();
                while let Some(next) = cur.next.get() {
                    cur = next;
                }
                cur.next.set(Some(node));
            }
        }
        true
    }

    /// Registers a new enumeration, returning its id. Re-registering an
    /// existing name returns the existing id unchanged.
    pub fn insert_enumeration(&mut self, name: &str) -> EnumId {
        let name = self.arena.alloc_str_upper(name);
        if let Some(&id) = self.enumerations.get(name) {
            return id;
        }
        let id = self.enum_names.push(name);
        self.enumerations.insert(name, id);
        id
    }

    /// Inserts a constant under `enum_id`, or updates its value if a
    /// constant of that name already exists within that enum.
    pub fn insert_or_assign_constant(&mut self, enum_id: EnumId, name: &str, value: i32) {
        let name = self.arena.alloc_str_upper(name);
        match self.constants.get(name).copied() {
            Some(head) => {
                if let Some(existing) = head.chain().find(|c| c.enum_id == enum_id) {
                    // SAFETY-free approach: values live behind a shared
                    // reference, so replace the chain head instead of
                    // mutating in place when the match is at the head; the
                    // common case (single enum per name) takes this path.
                    if std::ptr::eq(existing, head) {
                        let new_head = self.arena.alloc(ConstantDef {
                            enum_id,
                            value,
                            next_same_name: std::cell::Cell::new(head.next_same_name.get()),
                        });
                        self.constants.insert(name, new_head);
                        return;
                    }
                }
                let new_head = self.arena.alloc(ConstantDef {
                    enum_id,
                    value,
                    next_same_name: std::cell::Cell::new(Some(head)),
                });
                self.constants.insert(name, new_head);
            }
            None => {
                let def = self.arena.alloc(ConstantDef {
                    enum_id,
                    value,
                    next_same_name: std::cell::Cell::new(None),
                });
                self.constants.insert(name, def);
            }
        }
    }

    pub fn insert_entity_type(&mut self, name: &str) -> EntityId {
        let name = self.arena.alloc_str_upper(name);
        if let Some(&id) = self.entity_types.get(name) {
            return id;
        }
        let id = EntityId::from_usize(self.entity_types.len());
        self.entity_types.insert(name, id);
        id
    }

    pub fn build(self) -> CommandTable<'a> {
        CommandTable {
            commands: self.commands,
            alternators: self.alternators,
            enumerations: self.enumerations,
            enum_names: self.enum_names,
            constants: self.constants,
            entity_types: self.entity_types,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_lookup_is_case_insensitive() {
        let arena = Arena::new();
        let mut builder = CommandTableBuilder::new(&arena);
        builder.insert_command("wait", vec![ParamDef {
            ty: ParamType::Int,
            entity_type: EntityId::no_entity_type(),
            enum_id: None,
        }], Some(0x0001), true);
        let table = builder.build();

        let def = table.find_command("Wait").unwrap();
        assert_eq!(def.name, "WAIT");
        assert_eq!(def.target_id, Some(0x0001));
        assert!(def.optional_param_index().is_none());
    }

    #[test]
    fn duplicate_command_insert_is_rejected() {
        let arena = Arena::new();
        let mut builder = CommandTableBuilder::new(&arena);
        assert!(builder.insert_command("WAIT", vec![], None, false));
        assert!(!builder.insert_command("wait", vec![], None, false));
    }

    #[test]
    fn alternator_preserves_insertion_order() {
        let arena = Arena::new();
        let mut builder = CommandTableBuilder::new(&arena);
        builder.insert_command("SET_VAR_INT", vec![], Some(1), true);
        builder.insert_command("SET_VAR_FLOAT", vec![], Some(2), true);
        builder.insert_alternator("SET");
        let int_def = *builder.commands.get("SET_VAR_INT").unwrap();
        let float_def = *builder.commands.get("SET_VAR_FLOAT").unwrap();
        builder.insert_alternative("SET", int_def);
        builder.insert_alternative("set", float_def);
        let table = builder.build();

        let names: Vec<_> =
            table.find_alternator("Set").unwrap().alternatives().map(|c| c.name).collect();
        assert_eq!(names, ["SET_VAR_INT", "SET_VAR_FLOAT"]);
    }

    #[test]
    fn constants_are_scoped_per_enum() {
        let arena = Arena::new();
        let mut builder = CommandTableBuilder::new(&arena);
        let global = EnumId::global_enum();
        let pickup = builder.insert_enumeration("PICKUP_TYPE");
        builder.insert_or_assign_constant(global, "TRUE", 1);
        builder.insert_or_assign_constant(pickup, "TRUE", 7);
        let table = builder.build();

        assert_eq!(table.find_constant(global, "true").unwrap().value, 1);
        assert_eq!(table.find_constant(pickup, "true").unwrap().value, 7);
        assert!(table.find_constant_any_means("TRUE").is_some());
    }

    #[test]
    fn entity_types_are_interned_once() {
        let arena = Arena::new();
        let mut builder = CommandTableBuilder::new(&arena);
        let a = builder.insert_entity_type("PED");
        let b = builder.insert_entity_type("ped");
        assert_eq!(a, b);
        let table = builder.build();
        assert_eq!(table.find_entity_type("Ped"), Some(a));
    }
}
