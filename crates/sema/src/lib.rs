//! Symbol table, `REPEAT` lowering, and the two-pass semantic analyzer that
//! turns parser IR into validated [`sema_ir::SemaIr`].

pub mod analyzer;
pub mod lowering;
pub mod sema_ir;
pub mod symbol_table;

pub use analyzer::{AnalysisResult, Analyzer};
pub use lowering::lower_repeats;
pub use sema_ir::{SemaArgument, SemaArgumentValue, SemaCommand, SemaIr, Subscript, VarRef};
pub use symbol_table::{
    Label, LabelId, ModelDef, ModelId, ModelTable, ScopeId, SymbolTable, UsedObject,
    UsedObjectId, VarType, Variable, VariableId,
};
