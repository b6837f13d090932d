//! Storage allocation: assigns each declared variable a fixed index in
//! global or local variable space. Two indices in each local scope are
//! reserved for the `TIMERA`/`TIMERB` variables, if declared.
//!
//! Variable ids in [`gta3c_sema::SymbolTable`] are dense across the whole
//! compilation rather than scoped per-scope, so unlike the table this is
//! grounded on, each [`LocalStorageTable`] keys its assignments by
//! [`VariableId`] in a map rather than indexing a vector by a per-scope
//! local id.

use gta3c_data_structures::fx::FxHashMap;
use gta3c_sema::{ScopeId, SymbolTable, VarType, Variable, VariableId};
use index_vec::IndexVec;

pub type IndexType = u16;

/// An index never reached in practice: wide enough that the reserved-index
/// skip loop below can compare against it unconditionally even when no
/// timer is configured.
const IMPOSSIBLE_INDEX: u32 = u32::MAX;

#[derive(Clone, Copy, Debug)]
pub struct TimerOptions {
    pub index: IndexType,
    pub name: &'static str,
}

#[derive(Clone, Debug)]
pub struct LocalStorageOptions {
    pub first_storage_index: IndexType,
    pub max_storage_index: IndexType,
    pub timers: [Option<TimerOptions>; 2],
}

/// Storage assignment for the variables of a single scope.
pub struct LocalStorageTable {
    index_for_vars: FxHashMap<VariableId, IndexType>,
}

impl LocalStorageTable {
    /// Returns the index assigned to `var`. Panics if `var` wasn't part of
    /// the scope this table was built from.
    pub fn var_index(&self, var: &Variable<'_>) -> IndexType {
        self.index_for_vars[&var.id]
    }

    /// Computes the storage assignment for the variables of `scope`, or
    /// `None` if they don't fit within `options.max_storage_index`.
    pub fn from_symbols(
        symbols: &SymbolTable<'_>,
        scope: ScopeId,
        options: &LocalStorageOptions,
    ) -> Option<Self> {
        let max_var_index = options.max_storage_index as u32;
        let (timera_index, timera_var) = unwrap_timer_options(options.timers[0], symbols, scope);
        let (timerb_index, timerb_var) = unwrap_timer_options(options.timers[1], symbols, scope);

        let mut index_for_vars = FxHashMap::default();
        let mut current_index = options.first_storage_index as u32;

        for var in symbols.scope_variables(scope) {
            if Some(var.id) == timera_var {
                index_for_vars.insert(var.id, timera_index as IndexType);
            } else if Some(var.id) == timerb_var {
                index_for_vars.insert(var.id, timerb_index as IndexType);
            } else {
                while current_index == timera_index || current_index == timerb_index {
                    current_index += 1;
                }
                index_for_vars.insert(var.id, current_index as IndexType);
                current_index += num_indices_for_var(var);
                if current_index > max_var_index + 1 {
                    return None;
                }
            }
        }

        Some(Self { index_for_vars })
    }
}

fn unwrap_timer_options(
    timer: Option<TimerOptions>,
    symbols: &SymbolTable<'_>,
    scope: ScopeId,
) -> (u32, Option<VariableId>) {
    let Some(timer) = timer else { return (IMPOSSIBLE_INDEX, None) };
    match symbols.lookup_var(timer.name, scope) {
        Some(var) => (timer.index as u32, Some(var.id)),
        None => (timer.index as u32, None),
    }
}

fn num_indices_for_var(var: &Variable<'_>) -> u32 {
    num_indices_for_type(var.ty) * var.dimensions.map_or(1, |d| d.get())
}

fn num_indices_for_type(ty: VarType) -> u32 {
    match ty {
        VarType::Int | VarType::Float => 1,
        VarType::TextLabel => 2,
    }
}

/// Options for allocating both global and local variable storage across a
/// whole symbol table.
#[derive(Clone, Debug)]
pub struct StorageOptions {
    pub first_var_storage_index: IndexType,
    pub max_var_storage_index: IndexType,
    pub first_lvar_storage_index: IndexType,
    pub max_lvar_storage_index: IndexType,
    pub timers: [Option<TimerOptions>; 2],
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            first_var_storage_index: 2,
            max_var_storage_index: 16383,
            first_lvar_storage_index: 0,
            max_lvar_storage_index: 17,
            timers: [
                Some(TimerOptions { index: 16, name: "TIMERA" }),
                Some(TimerOptions { index: 17, name: "TIMERB" }),
            ],
        }
    }
}

/// Storage assignment for every scope of a symbol table: the global scope
/// plus every local scope opened by a `{ ... }` block.
pub struct StorageTable {
    table_for_scopes: IndexVec<ScopeId, LocalStorageTable>,
}

impl StorageTable {
    pub fn var_index(&self, var: &Variable<'_>) -> IndexType {
        self.table_for_scopes[var.scope].var_index(var)
    }

    pub fn from_symbols(symbols: &SymbolTable<'_>, options: &StorageOptions) -> Option<Self> {
        let mut table_for_scopes = IndexVec::new();

        let global_opts = LocalStorageOptions {
            first_storage_index: options.first_var_storage_index,
            max_storage_index: options.max_var_storage_index,
            timers: [None, None],
        };
        table_for_scopes
            .push(LocalStorageTable::from_symbols(symbols, symbols.global_scope(), &global_opts)?);

        for scope in symbols.local_scopes() {
            let local_opts = LocalStorageOptions {
                first_storage_index: options.first_lvar_storage_index,
                max_storage_index: options.max_lvar_storage_index,
                timers: options.timers,
            };
            table_for_scopes.push(LocalStorageTable::from_symbols(symbols, scope, &local_opts)?);
        }

        Some(Self { table_for_scopes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gta3c_data_structures::Arena;
    use gta3c_interface::{BytePos, Span};

    fn sp() -> Span {
        Span::new(BytePos(0), BytePos(1))
    }

    #[test]
    fn timers_take_their_reserved_indices() {
        let arena = Arena::new();
        let mut symbols = SymbolTable::new(&arena);
        let scope = symbols.new_scope();
        let (x, _) = symbols.insert_variable(scope, "X", sp(), VarType::Int, None);
        let (y, _) = symbols.insert_variable(scope, "Y", sp(), VarType::Int, None);
        let (timera, _) = symbols.insert_variable(scope, "TIMERA", sp(), VarType::Float, None);

        let options = LocalStorageOptions {
            first_storage_index: 0,
            max_storage_index: 17,
            timers: [
                Some(TimerOptions { index: 16, name: "TIMERA" }),
                Some(TimerOptions { index: 17, name: "TIMERB" }),
            ],
        };
        let table = LocalStorageTable::from_symbols(&symbols, scope, &options).unwrap();

        assert_eq!(table.var_index(x), 0);
        assert_eq!(table.var_index(y), 1);
        assert_eq!(table.var_index(timera), 16);
    }

    #[test]
    fn text_labels_take_two_indices() {
        let arena = Arena::new();
        let mut symbols = SymbolTable::new(&arena);
        let scope = symbols.global_scope();
        let (a, _) = symbols.insert_variable(scope, "A", sp(), VarType::TextLabel, None);
        let (b, _) = symbols.insert_variable(scope, "B", sp(), VarType::Int, None);

        let options =
            LocalStorageOptions { first_storage_index: 2, max_storage_index: 16383, timers: [None, None] };
        let table = LocalStorageTable::from_symbols(&symbols, scope, &options).unwrap();

        assert_eq!(table.var_index(a), 2);
        assert_eq!(table.var_index(b), 4);
    }

    #[test]
    fn overflowing_storage_fails() {
        let arena = Arena::new();
        let mut symbols = SymbolTable::new(&arena);
        let scope = symbols.global_scope();
        symbols.insert_variable(scope, "A", sp(), VarType::Int, None);
        symbols.insert_variable(scope, "B", sp(), VarType::Int, None);

        let options = LocalStorageOptions { first_storage_index: 0, max_storage_index: 0, timers: [None, None] };
        assert!(LocalStorageTable::from_symbols(&symbols, scope, &options).is_none());
    }

    #[test]
    fn storage_table_separates_global_and_local_scopes() {
        let arena = Arena::new();
        let mut symbols = SymbolTable::new(&arena);
        let global = symbols.global_scope();
        let (g, _) = symbols.insert_variable(global, "G", sp(), VarType::Int, None);
        let local = symbols.new_scope();
        let (l, _) = symbols.insert_variable(local, "L", sp(), VarType::Int, None);

        let table = StorageTable::from_symbols(&symbols, &StorageOptions::default()).unwrap();
        assert_eq!(table.var_index(g), 2);
        assert_eq!(table.var_index(l), 0);
    }
}
