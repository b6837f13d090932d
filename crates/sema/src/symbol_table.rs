//! Labels, scoped variables, used-objects, and the external model-name
//! table: everything semantic analysis populates, keyed by interned
//! uppercase names with dense, insertion-ordered ids per namespace.

use gta3c_ast::EntityId;
use gta3c_data_structures::{Arena, fx::FxHashMap};
use gta3c_interface::Span;
use index_vec::{IndexVec, define_index_type};
use std::cell::Cell;
use std::num::NonZeroU32;

define_index_type! {
    pub struct ScopeId = u32;
}

define_index_type! {
    pub struct VariableId = u32;
}

define_index_type! {
    pub struct LabelId = u32;
}

define_index_type! {
    pub struct UsedObjectId = u32;
}

define_index_type! {
    pub struct ModelId = u32;
}

impl ScopeId {
    pub fn global_scope() -> Self {
        Self::from_usize(0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VarType {
    Int,
    Float,
    TextLabel,
}

/// A declared variable. `entity_type` starts unset and is refined the first
/// time the variable receives a value through a typed `OUTPUT_*` parameter;
/// later refinements must agree or sema reports a mismatch.
#[derive(Debug)]
pub struct Variable<'a> {
    pub name: &'a str,
    pub span: Span,
    pub id: VariableId,
    pub scope: ScopeId,
    pub ty: VarType,
    pub dimensions: Option<NonZeroU32>,
    entity_type: Cell<Option<EntityId>>,
}

impl<'a> Variable<'a> {
    pub fn entity_type(&self) -> Option<EntityId> {
        self.entity_type.get()
    }
}

#[derive(Debug)]
pub struct Label<'a> {
    pub name: &'a str,
    pub span: Span,
    pub id: LabelId,
    /// The scope this label introduces: the local scope opened by the `{`
    /// immediately following it, if any, else the scope it was declared in.
    /// Used to look up the locals a `START_NEW_SCRIPT` targeting this label
    /// must supply. Patched once the following scope (if any) is seen.
    scope: Cell<ScopeId>,
}

impl<'a> Label<'a> {
    pub fn scope(&self) -> ScopeId {
        self.scope.get()
    }
}

#[derive(Debug)]
pub struct UsedObject<'a> {
    pub name: &'a str,
    pub span: Span,
    pub id: UsedObjectId,
}

/// A model name known to the game, referenced by `USED_OBJECT` declarations.
#[derive(Debug)]
pub struct ModelDef<'a> {
    pub name: &'a str,
    pub id: ModelId,
}

/// The frozen set of model names a compilation may reference. Built outside
/// sema (typically from the game's data files) and handed to the analyzer.
pub struct ModelTable<'a> {
    by_name: FxHashMap<&'a str, &'a ModelDef<'a>>,
}

impl<'a> ModelTable<'a> {
    pub fn new(arena: &'a Arena, names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut by_name = FxHashMap::default();
        for (i, name) in names.into_iter().enumerate() {
            let name = arena.alloc_str_upper(name);
            let def = &*arena.alloc(ModelDef { name, id: ModelId::from_usize(i) });
            by_name.insert(name, def);
        }
        Self { by_name }
    }

    pub fn find_model(&self, name: &str) -> Option<&'a ModelDef<'a>> {
        self.by_name.get(name.to_ascii_uppercase().as_str()).copied()
    }
}

struct ScopeData<'a> {
    variables: FxHashMap<&'a str, &'a Variable<'a>>,
    /// Variables declared in this scope, in declaration (id) order.
    order: Vec<&'a Variable<'a>>,
}

/// Populated while walking the parser IR during semantic analysis. The
/// global scope always exists; one additional scope is allocated per
/// `{ ... }` block.
pub struct SymbolTable<'a> {
    arena: &'a Arena,
    scopes: IndexVec<ScopeId, ScopeData<'a>>,
    labels: FxHashMap<&'a str, &'a Label<'a>>,
    used_objects: FxHashMap<&'a str, &'a UsedObject<'a>>,
    next_variable_id: u32,
    next_label_id: u32,
    next_used_object_id: u32,
}

impl<'a> SymbolTable<'a> {
    pub fn new(arena: &'a Arena) -> Self {
        let mut scopes = IndexVec::new();
        scopes.push(ScopeData { variables: FxHashMap::default(), order: Vec::new() });
        Self {
            arena,
            scopes,
            labels: FxHashMap::default(),
            used_objects: FxHashMap::default(),
            next_variable_id: 0,
            next_label_id: 0,
            next_used_object_id: 0,
        }
    }

    pub fn global_scope(&self) -> ScopeId {
        ScopeId::global_scope()
    }

    /// Allocates a new, initially empty scope.
    pub fn new_scope(&mut self) -> ScopeId {
        self.scopes.push(ScopeData { variables: FxHashMap::default(), order: Vec::new() })
    }

    pub fn insert_variable(
        &mut self,
        scope: ScopeId,
        name: &str,
        span: Span,
        ty: VarType,
        dimensions: Option<NonZeroU32>,
    ) -> (&'a Variable<'a>, bool) {
        let name = self.arena.alloc_str_upper(name);
        if let Some(&existing) = self.scopes[scope].variables.get(name) {
            return (existing, false);
        }
        let id = VariableId::from_usize(self.next_variable_id as usize);
        self.next_variable_id += 1;
        let var = &*self.arena.alloc(Variable {
            name,
            span,
            id,
            scope,
            ty,
            dimensions,
            entity_type: Cell::new(None),
        });
        self.scopes[scope].variables.insert(name, var);
        self.scopes[scope].order.push(var);
        (var, true)
    }

    pub fn lookup_var(&self, name: &str, scope: ScopeId) -> Option<&'a Variable<'a>> {
        let upper = name.to_ascii_uppercase();
        self.scopes[scope].variables.get(upper.as_str()).copied()
    }

    /// Whether `name` is already declared as a global variable; used to
    /// reject a local declaration that would collide with the global scope.
    pub fn global_var(&self, name: &str) -> Option<&'a Variable<'a>> {
        self.lookup_var(name, self.global_scope())
    }

    /// Variables declared directly in `scope`, in declaration order.
    pub fn scope_variables(&self, scope: ScopeId) -> impl Iterator<Item = &'a Variable<'a>> + '_ {
        self.scopes[scope].order.iter().copied()
    }

    /// Every scope allocated besides the global one, in allocation order
    /// (which is also the order a second walk of the same IR re-creates
    /// them in, since scopes are opened strictly in source order).
    pub fn local_scopes(&self) -> impl Iterator<Item = ScopeId> + '_ {
        (1..self.scopes.len()).map(ScopeId::from_usize)
    }

    pub fn insert_label(&mut self, name: &str, span: Span, scope: ScopeId) -> (&'a Label<'a>, bool) {
        let name = self.arena.alloc_str_upper(name);
        if let Some(&existing) = self.labels.get(name) {
            return (existing, false);
        }
        let id = LabelId::from_usize(self.next_label_id as usize);
        self.next_label_id += 1;
        let label = &*self.arena.alloc(Label { name, span, id, scope: Cell::new(scope) });
        self.labels.insert(name, label);
        (label, true)
    }

    /// Re-targets `label`'s scope, e.g. when the `{` immediately following
    /// it turns out to open the scope the label's script body declares its
    /// locals in.
    pub fn set_label_scope(&self, label: &'a Label<'a>, scope: ScopeId) {
        label.scope.set(scope);
    }

    pub fn lookup_label(&self, name: &str) -> Option<&'a Label<'a>> {
        let upper = name.to_ascii_uppercase();
        self.labels.get(upper.as_str()).copied()
    }

    pub fn insert_used_object(&mut self, name: &str, span: Span) -> (&'a UsedObject<'a>, bool) {
        let name = self.arena.alloc_str_upper(name);
        if let Some(&existing) = self.used_objects.get(name) {
            return (existing, false);
        }
        let id = UsedObjectId::from_usize(self.next_used_object_id as usize);
        self.next_used_object_id += 1;
        let obj = &*self.arena.alloc(UsedObject { name, span, id });
        self.used_objects.insert(name, obj);
        (obj, true)
    }

    pub fn lookup_used_object(&self, name: &str) -> Option<&'a UsedObject<'a>> {
        let upper = name.to_ascii_uppercase();
        self.used_objects.get(upper.as_str()).copied()
    }

    /// Refines `var`'s entity type against an incoming use. Returns the
    /// previously recorded type on a mismatch, leaving it unchanged.
    pub fn refine_entity_type(
        &self,
        var: &'a Variable<'a>,
        incoming: EntityId,
    ) -> Result<(), EntityId> {
        match var.entity_type.get() {
            None => {
                var.entity_type.set(Some(incoming));
                Ok(())
            }
            Some(current) if current == incoming => Ok(()),
            Some(current) => Err(current),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gta3c_interface::BytePos;

    fn sp() -> Span {
        Span::new(BytePos(0), BytePos(1))
    }

    #[test]
    fn insert_then_lookup_round_trips() {
        let arena = Arena::new();
        let mut table = SymbolTable::new(&arena);
        let scope = table.global_scope();
        let (var, inserted) = table.insert_variable(scope, "health", sp(), VarType::Float, None);
        assert!(inserted);
        assert_eq!(table.lookup_var("Health", scope).unwrap().id, var.id);
        let (_, inserted_again) =
            table.insert_variable(scope, "HEALTH", sp(), VarType::Float, None);
        assert!(!inserted_again);
    }

    #[test]
    fn scopes_keep_variables_separate() {
        let arena = Arena::new();
        let mut table = SymbolTable::new(&arena);
        let global = table.global_scope();
        let local = table.new_scope();
        table.insert_variable(global, "x", sp(), VarType::Int, None);
        assert!(table.lookup_var("x", local).is_none());
        table.insert_variable(local, "x", sp(), VarType::Int, None);
        assert!(table.lookup_var("x", local).is_some());
    }

    #[test]
    fn scope_variables_preserve_declaration_order() {
        let arena = Arena::new();
        let mut table = SymbolTable::new(&arena);
        let scope = table.global_scope();
        table.insert_variable(scope, "a", sp(), VarType::Int, None);
        table.insert_variable(scope, "b", sp(), VarType::Int, None);
        table.insert_variable(scope, "c", sp(), VarType::Int, None);
        let names: Vec<_> = table.scope_variables(scope).map(|v| v.name).collect();
        assert_eq!(names, ["A", "B", "C"]);
    }

    #[test]
    fn label_scope_defaults_then_can_be_retargeted() {
        let arena = Arena::new();
        let mut table = SymbolTable::new(&arena);
        let global = table.global_scope();
        let (label, inserted) = table.insert_label("entry", sp(), global);
        assert!(inserted);
        assert_eq!(label.scope(), global);

        let body = table.new_scope();
        table.set_label_scope(label, body);
        assert_eq!(table.lookup_label("ENTRY").unwrap().scope(), body);

        let (_, inserted_again) = table.insert_label("Entry", sp(), global);
        assert!(!inserted_again);
    }

    #[test]
    fn entity_type_refinement_rejects_conflicting_narrowing() {
        let arena = Arena::new();
        let mut table = SymbolTable::new(&arena);
        let scope = table.global_scope();
        let (var, _) = table.insert_variable(scope, "ped_handle", sp(), VarType::Int, None);
        let ped = EntityId::from_usize(1);
        let car = EntityId::from_usize(2);
        assert!(table.refine_entity_type(var, ped).is_ok());
        assert!(table.refine_entity_type(var, ped).is_ok());
        assert_eq!(table.refine_entity_type(var, car), Err(ped));
    }
}
