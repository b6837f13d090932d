//! Ties the compiler's passes into one multi-file compilation.
//!
//! Semantic analysis shares a single symbol table across every unit (global
//! variables and labels are visible compilation-wide), storage is allocated
//! once that table is complete, and every unit's bytecode is generated into
//! one growing buffer before a final pass patches label and filename
//! fixups into place. Producing each unit's [`LinkedIr`] is a collaborator's
//! job (the scanner/parser); this crate starts from already-parsed IR.

use gta3c_ast::{CommandTable, LinkedIr};
use gta3c_codegen::{AbsoluteOffset, CodeGen, RelocationTable, StorageOptions, StorageTable};
use gta3c_data_structures::Arena;
use gta3c_interface::{DiagCtxt, File, FileTable};
use gta3c_sema::{Analyzer, ModelTable, SemaIr, SymbolTable};
use std::cell::RefCell;

/// One file queued for compilation: its identity and the `LinkedIr` the
/// scanner/parser produced for it.
pub struct Unit<'a> {
    pub file: &'a File<'a>,
    pub ir: LinkedIr<'a>,
}

struct AnalyzedUnit<'a> {
    file: &'a File<'a>,
    sema: Option<Vec<&'a SemaIr<'a>>>,
}

/// Compiles `units`, in order, into a single bytecode image. Units are laid
/// out back to back in the order given, so a unit's absolute offset is the
/// sum of the encoded sizes of every unit before it.
///
/// Returns `None` if any unit failed semantic analysis or if storage
/// allocation overflowed; every failure has already produced a diagnostic
/// through `dcx` by that point.
pub fn compile<'a>(
    arena: &'a Arena,
    commands: &'a CommandTable<'a>,
    models: &'a ModelTable<'a>,
    files: &'a RefCell<FileTable<'a>>,
    dcx: &'a DiagCtxt,
    storage_options: &StorageOptions,
    units: Vec<Unit<'a>>,
) -> Option<Vec<u8>> {
    let span = tracing::span!(tracing::Level::INFO, "compile", units = units.len());
    let _enter = span.enter();

    let mut symbols = SymbolTable::new(arena);
    let mut analyzed = Vec::with_capacity(units.len());
    let mut any_errors = false;

    for unit in &units {
        let unit_span = tracing::span!(tracing::Level::DEBUG, "analyze_unit", file = unit.file.name);
        let result = unit_span.in_scope(|| {
            let analyzer = Analyzer::with_symbols(arena, commands, models, files, dcx, symbols);
            analyzer.analyze(&unit.ir)
        });
        symbols = result.symbols;
        any_errors |= result.sema.is_none();
        analyzed.push(AnalyzedUnit { file: unit.file, sema: result.sema });
    }

    if any_errors {
        tracing::info!("compile aborted: one or more units failed semantic analysis");
        return None;
    }

    let storage = StorageTable::from_symbols(&symbols, storage_options)?;
    let mut reloc = RelocationTable::new();
    let mut out = Vec::new();

    for unit in &analyzed {
        let sema = unit.sema.as_ref().expect("checked above: no unit failed analysis");
        let base_offset: AbsoluteOffset = out.len() as AbsoluteOffset;
        let unit_span =
            tracing::span!(tracing::Level::DEBUG, "generate_unit", file = unit.file.name, base_offset);
        unit_span.in_scope(|| {
            reloc.insert_file_loc(unit.file, base_offset);
            let mut codegen = CodeGen::new(unit.file, base_offset, &storage, dcx);
            codegen.generate_all(sema, &mut reloc, &mut out);
        });
    }

    patch_fixups(&reloc, dcx, &mut out);
    tracing::info!(bytes = out.len(), "compile finished");
    Some(out)
}

/// Overwrites every label/filename placeholder in `out` with its resolved
/// value. A fixup that fails to resolve has already produced a diagnostic
/// through `dcx`; its placeholder is left as the zero it was emitted with.
fn patch_fixups(reloc: &RelocationTable<'_>, dcx: &DiagCtxt, out: &mut [u8]) {
    for entry in reloc.label_fixups() {
        if let Some(value) = reloc.relocate_label(entry, dcx) {
            write_i32_at(out, entry.offset, value);
        }
    }
    for entry in reloc.file_fixups() {
        let value = reloc.relocate_file(entry);
        write_i32_at(out, entry.offset, value);
    }
}

fn write_i32_at(out: &mut [u8], offset: AbsoluteOffset, value: i32) {
    let offset = offset as usize;
    out[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use gta3c_ast::{CommandTableBuilder, EntityId, ParamDef, ParamType, ParserIrBuilder};
    use gta3c_interface::{BytePos, FileType, Span};

    fn sp() -> Span {
        Span::new(BytePos(0), BytePos(1))
    }

    #[test]
    fn single_file_wait_command_compiles_to_bytes() {
        let arena = Arena::new();
        let mut builder = CommandTableBuilder::new(&arena);
        let param = ParamDef { ty: ParamType::Int, entity_type: EntityId::no_entity_type(), enum_id: None };
        builder.insert_command("WAIT", vec![param], Some(1), true);
        let commands = arena.alloc(builder.build());
        let models = arena.alloc(ModelTable::new(&arena, std::iter::empty()));
        let files = arena.alloc(RefCell::new(FileTable::new(&arena)));
        let dcx = arena.alloc(DiagCtxt::with_silent_emitter());

        let file = files.borrow_mut().insert_or_get("main.sc", FileType::Main);

        let ir = LinkedIr::new();
        ir.push_back(ParserIrBuilder::new(&arena).command("WAIT", sp()).arg_int(250, sp()).build());

        let units = vec![Unit { file, ir }];
        let out = compile(&arena, commands, models, files, dcx, &StorageOptions::default(), units).unwrap();

        // opcode(2) + tag+i16(3) = 5
        assert_eq!(out.len(), 5);
        assert_eq!(dcx.err_count(), 0);
    }

    #[test]
    fn analysis_failure_yields_no_bytes() {
        let arena = Arena::new();
        let builder = CommandTableBuilder::new(&arena);
        let commands = arena.alloc(builder.build());
        let models = arena.alloc(ModelTable::new(&arena, std::iter::empty()));
        let files = arena.alloc(RefCell::new(FileTable::new(&arena)));
        let dcx = arena.alloc(DiagCtxt::with_silent_emitter());

        let file = files.borrow_mut().insert_or_get("main.sc", FileType::Main);

        let ir = LinkedIr::new();
        ir.push_back(ParserIrBuilder::new(&arena).command("UNKNOWN_COMMAND", sp()).build());

        let units = vec![Unit { file, ir }];
        assert!(compile(&arena, commands, models, files, dcx, &StorageOptions::default(), units).is_none());
    }

    #[test]
    fn label_declared_in_one_unit_resolves_from_another() {
        let arena = Arena::new();
        let mut builder = CommandTableBuilder::new(&arena);
        let label_param =
            ParamDef { ty: ParamType::Label, entity_type: EntityId::no_entity_type(), enum_id: None };
        builder.insert_command("GOTO", vec![label_param], Some(1), true);
        let commands = arena.alloc(builder.build());
        let models = arena.alloc(ModelTable::new(&arena, std::iter::empty()));
        let files = arena.alloc(RefCell::new(FileTable::new(&arena)));
        let dcx = arena.alloc(DiagCtxt::with_silent_emitter());

        let main = files.borrow_mut().insert_or_get("main.sc", FileType::Main);
        let mission = files.borrow_mut().insert_or_get("mission1.sc", FileType::Mission);

        let main_ir = LinkedIr::new();
        main_ir.push_back(ParserIrBuilder::new(&arena).label("SHARED_LABEL", sp()).build());

        let mission_ir = LinkedIr::new();
        mission_ir.push_back(
            ParserIrBuilder::new(&arena).command("GOTO", sp()).arg_ident("SHARED_LABEL", sp()).build(),
        );

        let units =
            vec![Unit { file: main, ir: main_ir }, Unit { file: mission, ir: mission_ir }];
        let out = compile(&arena, commands, models, files, dcx, &StorageOptions::default(), units);

        assert!(out.is_some());
        assert_eq!(dcx.err_count(), 0);
    }

    #[test]
    fn one_unit_failing_analysis_aborts_the_whole_compile() {
        let arena = Arena::new();
        let mut builder = CommandTableBuilder::new(&arena);
        let param = ParamDef { ty: ParamType::Int, entity_type: EntityId::no_entity_type(), enum_id: None };
        builder.insert_command("WAIT", vec![param], Some(1), true);
        let commands = arena.alloc(builder.build());
        let models = arena.alloc(ModelTable::new(&arena, std::iter::empty()));
        let files = arena.alloc(RefCell::new(FileTable::new(&arena)));
        let dcx = arena.alloc(DiagCtxt::with_silent_emitter());

        let main = files.borrow_mut().insert_or_get("main.sc", FileType::Main);
        let mission = files.borrow_mut().insert_or_get("mission1.sc", FileType::Mission);

        let main_ir = LinkedIr::new();
        main_ir.push_back(ParserIrBuilder::new(&arena).command("WAIT", sp()).arg_int(250, sp()).build());

        let mission_ir = LinkedIr::new();
        mission_ir.push_back(ParserIrBuilder::new(&arena).command("UNKNOWN_COMMAND", sp()).build());

        let units =
            vec![Unit { file: main, ir: main_ir }, Unit { file: mission, ir: mission_ir }];
        let out = compile(&arena, commands, models, files, dcx, &StorageOptions::default(), units);

        assert!(out.is_none());
    }
}
