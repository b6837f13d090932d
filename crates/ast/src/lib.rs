//! Parser IR, token kinds, and the command table that backs lowering and
//! semantic analysis.

pub use gta3c_interface as interface;

pub mod command;
pub mod parser_ir;
pub mod token;

pub use command::{
    AlternativeDef, AlternatorDef, CommandDef, CommandTable, CommandTableBuilder, ConstantDef,
    EntityId, EnumId, ParamDef, ParamType,
};
pub use parser_ir::{Argument, ArgumentValue, Command, LabelDef, LinkedIr, ParserIr, ParserIrBuilder};
pub use token::{Token, TokenKind};
