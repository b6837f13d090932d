//! The validated analog of the parser IR: every name has been resolved to
//! the symbol it refers to, so later passes never need to repeat a lookup.

use crate::symbol_table::{Label, UsedObject, Variable};
use gta3c_ast::{CommandDef, EnumId};
use gta3c_interface::{File, Span};

#[derive(Clone, Copy, Debug)]
pub enum Subscript<'a> {
    Constant(i32),
    Variable(&'a Variable<'a>),
}

#[derive(Clone, Copy, Debug)]
pub struct VarRef<'a> {
    pub var: &'a Variable<'a>,
    pub subscript: Option<Subscript<'a>>,
}

#[derive(Clone, Copy, Debug)]
pub enum SemaArgumentValue<'a> {
    Int(i32),
    Float(f32),
    TextLabel(&'a str),
    QuotedString(&'a str),
    Var(VarRef<'a>),
    Label(&'a Label<'a>),
    Filename(&'a File<'a>),
    UsedObject(&'a UsedObject<'a>),
    StringConstant { enum_id: EnumId, value: i32 },
}

#[derive(Clone, Copy, Debug)]
pub struct SemaArgument<'a> {
    pub value: SemaArgumentValue<'a>,
    pub span: Span,
}

pub struct SemaCommand<'a> {
    pub def: &'a CommandDef<'a>,
    pub not_flag: bool,
    pub span: Span,
    pub args: &'a [SemaArgument<'a>],
}

/// One validated line: at most one label target, at most one resolved
/// command.
pub struct SemaIr<'a> {
    pub label: Option<&'a Label<'a>>,
    pub command: Option<SemaCommand<'a>>,
}
