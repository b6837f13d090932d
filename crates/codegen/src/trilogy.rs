//! Generates bytecode for GTA III, Vice City and San Andreas from validated
//! `SemaIr`, registering relocation entries for every label and filename
//! reference it emits.
//!
//! One `CodeGen` generates code for a single source file, positioned at a
//! known offset (`base_offset`) in the final multi-file image.

use crate::emitter::CodeEmitter;
use crate::relocation::{AbsoluteOffset, RelocationTable};
use crate::storage::StorageTable;
use gta3c_interface::{DiagCtxt, DiagnosticKind, File};
use gta3c_sema::{ScopeId, SemaArgument, SemaArgumentValue, SemaCommand, SemaIr, VarRef, VarType};

pub struct CodeGen<'a> {
    dcx: &'a DiagCtxt,
    storage: &'a StorageTable,
    file: &'a File<'a>,
    base_offset: AbsoluteOffset,
    emitter: CodeEmitter,
}

impl<'a> CodeGen<'a> {
    pub fn new(file: &'a File<'a>, base_offset: AbsoluteOffset, storage: &'a StorageTable, dcx: &'a DiagCtxt) -> Self {
        Self { dcx, storage, file, base_offset, emitter: CodeEmitter::new() }
    }

    /// Generates bytecode for one IR line into `out`, registering any
    /// relocation entries it produces in `reloc`. Returns `false`, with a
    /// diagnostic already reported, if the line could not be generated.
    pub fn generate(&mut self, ir: &SemaIr<'a>, reloc: &mut RelocationTable<'a>, out: &mut Vec<u8>) -> bool {
        self.emitter.buffer_clear();
        self.emitter.buffer_reserve(256);
        let ok = self.generate_line(ir, reloc);
        self.emitter.drain(out);
        ok
    }

    /// Generates bytecode for every line in `ir`, in order. Every line is
    /// attempted even if an earlier one fails; returns `false` if any did.
    pub fn generate_all(&mut self, ir: &[&'a SemaIr<'a>], reloc: &mut RelocationTable<'a>, out: &mut Vec<u8>) -> bool {
        let mut ok = true;
        for line in ir {
            if !self.generate(line, reloc, out) {
                ok = false;
            }
        }
        ok
    }

    fn generate_line(&mut self, ir: &SemaIr<'a>, reloc: &mut RelocationTable<'a>) -> bool {
        if let Some(label) = ir.label {
            let label_offset = self.base_offset + self.emitter.offset();
            let inserted = reloc.insert_label_loc(label, self.file, label_offset);
            debug_assert!(inserted, "pass 1 guarantees each label is defined exactly once");
        }

        match &ir.command {
            Some(command) => self.generate_command(command, reloc),
            None => true,
        }
    }

    fn generate_command(&mut self, command: &SemaCommand<'a>, reloc: &mut RelocationTable<'a>) -> bool {
        let cmd_def = command.def;

        let Some(target_id) = cmd_def.target_id.filter(|_| cmd_def.target_handled) else {
            self.dcx
                .err("target does not support this command")
                .span(command.span)
                .kind(DiagnosticKind::CodegenTargetDoesNotSupportCommand)
                .emit();
            return false;
        };

        self.emitter.emit_command_opcode(target_id, command.not_flag);

        let mut params = cmd_def.params.iter();
        let mut current = params.next();
        for arg in command.args {
            let param = current.expect("argument with no corresponding parameter slot");
            self.generate_argument(arg, reloc);
            if !param.ty.is_optional() {
                current = params.next();
            }
        }

        if cmd_def.optional_param_index().is_some() {
            self.emitter.emit_eoal();
        }

        true
    }

    fn generate_argument(&mut self, arg: &SemaArgument<'a>, reloc: &mut RelocationTable<'a>) {
        match arg.value {
            SemaArgumentValue::Int(v) | SemaArgumentValue::StringConstant { value: v, .. } => {
                self.emitter.emit_int(v);
            }
            SemaArgumentValue::Float(v) => {
                self.emitter.emit_q11_4(v);
            }
            SemaArgumentValue::TextLabel(s) => {
                self.emitter.emit_raw_bytes(s.as_bytes(), 8);
            }
            SemaArgumentValue::QuotedString(s) => {
                self.emitter.emit_raw_bytes(s.as_bytes(), 128);
            }
            SemaArgumentValue::Var(var_ref) => self.generate_var_ref(var_ref),
            SemaArgumentValue::Label(label) => {
                let reloc_offset = self.base_offset + self.emitter.offset() + 1;
                reloc.insert_label_fixup(label, self.file, reloc_offset);
                self.emitter.emit_i32(0);
            }
            SemaArgumentValue::Filename(file) => {
                let reloc_offset = self.base_offset + self.emitter.offset() + 1;
                reloc.insert_file_fixup(file, reloc_offset);
                self.emitter.emit_i32(0);
            }
            SemaArgumentValue::UsedObject(obj) => {
                self.emitter.emit_int(-(1 + obj.id.index() as i32));
            }
        }
    }

    fn generate_var_ref(&mut self, var_ref: VarRef<'a>) {
        debug_assert!(var_ref.subscript.is_none(), "array refs are not yet supported");
        let var = var_ref.var;
        debug_assert!(
            matches!(var.ty, VarType::Int | VarType::Float),
            "text label variable refs are not yet supported"
        );

        let index = self.storage.var_index(var) as u32;
        if var.scope == ScopeId::global_scope() {
            self.emitter.emit_var((4 * index) as u16);
        } else {
            self.emitter.emit_lvar(index as u16);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageOptions;
    use gta3c_ast::{CommandDef, EntityId, ParamDef, ParamType};
    use gta3c_data_structures::Arena;
    use gta3c_interface::{BytePos, FileTable, FileType, Span};
    use gta3c_sema::{SymbolTable, VarType};

    fn sp() -> Span {
        Span::new(BytePos(0), BytePos(1))
    }

    fn int_param() -> ParamDef {
        ParamDef { ty: ParamType::Int, entity_type: EntityId::no_entity_type(), enum_id: None }
    }

    #[test]
    fn global_var_ref_emits_byte_offset() {
        let arena = Arena::new();
        let mut symbols = SymbolTable::new(&arena);
        let scope = symbols.global_scope();
        let (health, _) = symbols.insert_variable(scope, "HEALTH", sp(), VarType::Float, None);
        let storage = StorageTable::from_symbols(&symbols, &StorageOptions::default()).unwrap();

        let mut files = FileTable::new(&arena);
        let main = files.insert_or_get("main.sc", FileType::Main);
        let dcx = DiagCtxt::with_silent_emitter();
        let mut codegen = CodeGen::new(main, 0, &storage, &dcx);

        let var_ref = VarRef { var: health, subscript: None };
        let mut reloc = RelocationTable::new();
        let arg = SemaArgument { value: SemaArgumentValue::Var(var_ref), span: sp() };

        let mut out = Vec::new();
        codegen.emitter.buffer_reserve(8);
        codegen.generate_argument(&arg, &mut reloc);
        codegen.emitter.drain(&mut out);

        // HEALTH is the first global (index 2), so its byte offset is 4*2=8.
        assert_eq!(out, [0x02, 0x08, 0x00]);
    }

    #[test]
    fn command_with_unhandled_target_fails() {
        let arena = Arena::new();
        let symbols = SymbolTable::new(&arena);
        let storage = StorageTable::from_symbols(&symbols, &StorageOptions::default()).unwrap();
        let mut files = FileTable::new(&arena);
        let main = files.insert_or_get("main.sc", FileType::Main);
        let dcx = DiagCtxt::with_silent_emitter();
        let mut codegen = CodeGen::new(main, 0, &storage, &dcx);

        let def = CommandDef { name: "NOP", params: &[], target_id: None, target_handled: false };
        let command = SemaCommand { def: &def, not_flag: false, span: sp(), args: &[] };

        let mut reloc = RelocationTable::new();
        let mut out = Vec::new();
        assert!(!codegen.generate(&SemaIr { label: None, command: Some(command) }, &mut reloc, &mut out));
    }

    #[test]
    fn optional_trailing_param_reused_for_extra_args() {
        let arena = Arena::new();
        let symbols = SymbolTable::new(&arena);
        let storage = StorageTable::from_symbols(&symbols, &StorageOptions::default()).unwrap();
        let mut files = FileTable::new(&arena);
        let main = files.insert_or_get("main.sc", FileType::Main);
        let dcx = DiagCtxt::with_silent_emitter();
        let mut codegen = CodeGen::new(main, 0, &storage, &dcx);

        let opt_param =
            ParamDef { ty: ParamType::IntOpt, entity_type: EntityId::no_entity_type(), enum_id: None };
        let params = vec![int_param(), opt_param];
        let builder_arena = Arena::new();
        let params = builder_arena.alloc_slice_fill_iter(params);
        let def = CommandDef { name: "WAIT", params, target_id: Some(1), target_handled: true };

        let args = [
            SemaArgument { value: SemaArgumentValue::Int(1), span: sp() },
            SemaArgument { value: SemaArgumentValue::Int(2), span: sp() },
            SemaArgument { value: SemaArgumentValue::Int(3), span: sp() },
        ];
        let command = SemaCommand { def: &def, not_flag: false, span: sp(), args: &args };

        let mut reloc = RelocationTable::new();
        let mut out = Vec::new();
        assert!(codegen.generate(&SemaIr { label: None, command: Some(command) }, &mut reloc, &mut out));

        // opcode(2) + 3 * (tag(1) + i8(1)) + eoal(1) = 2 + 6 + 1 = 9
        assert_eq!(out.len(), 9);
        assert_eq!(out[out.len() - 1], 0);
    }
}
