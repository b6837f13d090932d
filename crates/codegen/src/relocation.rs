//! Tracks where labels and files are defined, and where they're referenced,
//! across a multi-file compilation. Populated as each file's bytecode is
//! generated; scanned afterwards to patch every placeholder offset with its
//! final, relocated value.

use gta3c_interface::{DiagCtxt, DiagnosticKind, File, FileId, FileType};
use gta3c_sema::{Label, LabelId};
use index_vec::IndexVec;

pub type AbsoluteOffset = u32;
pub type RelativeOffset = i32;

#[derive(Clone, Copy)]
struct LabelLoc<'a> {
    origin_file: &'a File<'a>,
    offset: AbsoluteOffset,
}

/// A label reference that needs its placeholder patched once relocation
/// runs.
#[derive(Clone, Copy)]
pub struct FixupEntry<'a> {
    pub origin_file: &'a File<'a>,
    pub label: &'a Label<'a>,
    pub offset: AbsoluteOffset,
}

/// A filename reference that needs its placeholder patched once relocation
/// runs.
#[derive(Clone, Copy)]
pub struct FileFixupEntry<'a> {
    pub file: &'a File<'a>,
    pub offset: AbsoluteOffset,
}

/// Definition sites plus pending fixups for every label and file referenced
/// during code generation.
pub struct RelocationTable<'a> {
    label_def_table: IndexVec<LabelId, Option<LabelLoc<'a>>>,
    label_fixup_table: Vec<FixupEntry<'a>>,
    file_def_table: IndexVec<FileId, Option<AbsoluteOffset>>,
    file_fixup_table: Vec<FileFixupEntry<'a>>,
}

impl<'a> RelocationTable<'a> {
    pub fn new() -> Self {
        Self {
            label_def_table: IndexVec::new(),
            label_fixup_table: Vec::new(),
            file_def_table: IndexVec::new(),
            file_fixup_table: Vec::new(),
        }
    }

    /// Registers where `label` is defined. Returns `false`, leaving the
    /// table unchanged, if the label was already registered.
    pub fn insert_label_loc(
        &mut self,
        label: &'a Label<'a>,
        origin_file: &'a File<'a>,
        offset: AbsoluteOffset,
    ) -> bool {
        self.resize_label_def_table(label.id);
        self.resize_file_def_table(origin_file.id);
        if self.label_def_table[label.id].is_some() {
            return false;
        }
        self.label_def_table[label.id] = Some(LabelLoc { origin_file, offset });
        true
    }

    /// Registers where `file` is defined. Returns `false`, leaving the
    /// table unchanged, if the file was already registered.
    pub fn insert_file_loc(&mut self, file: &'a File<'a>, offset: AbsoluteOffset) -> bool {
        self.resize_file_def_table(file.id);
        if self.file_def_table[file.id].is_some() {
            return false;
        }
        self.file_def_table[file.id] = Some(offset);
        true
    }

    pub fn insert_label_fixup(&mut self, label: &'a Label<'a>, origin_file: &'a File<'a>, offset: AbsoluteOffset) {
        self.resize_label_def_table(label.id);
        self.resize_file_def_table(origin_file.id);
        self.label_fixup_table.push(FixupEntry { origin_file, label, offset });
    }

    pub fn insert_file_fixup(&mut self, file: &'a File<'a>, offset: AbsoluteOffset) {
        self.resize_file_def_table(file.id);
        self.file_fixup_table.push(FileFixupEntry { file, offset });
    }

    pub fn label_fixups(&self) -> &[FixupEntry<'a>] {
        &self.label_fixup_table
    }

    pub fn file_fixups(&self) -> &[FileFixupEntry<'a>] {
        &self.file_fixup_table
    }

    /// Resolves `entry` to the relative offset that should be patched into
    /// its placeholder. Every label and file `entry` depends on must have
    /// already been registered through [`insert_label_loc`] or
    /// [`insert_file_loc`].
    pub fn relocate_label(&self, entry: &FixupEntry<'a>, dcx: &DiagCtxt) -> Option<RelativeOffset> {
        let label_def =
            self.label_def_table[entry.label.id].expect("label fixup resolved before its definition");
        let label_origin_file = label_def.origin_file;
        let entry_origin_file = entry.origin_file;

        if label_origin_file.ty.is_main_segment() {
            return Some(label_def.offset as RelativeOffset);
        }

        if Self::is_in_same_segment(label_origin_file, entry_origin_file) {
            let segbase = self.segment_base_for(label_origin_file);
            if segbase == label_def.offset {
                dcx.err("label resolves to offset zero of its own segment, which doubles as the no-label sentinel")
                    .span(entry.label.span)
                    .kind(DiagnosticKind::CodegenLabelAtLocalZeroOffset)
                    .emit();
                return None;
            }
            debug_assert!(segbase < label_def.offset);
            return Some(-((label_def.offset - segbase) as RelativeOffset));
        }

        dcx.err("label referenced from a file outside its segment")
            .kind(DiagnosticKind::CodegenLabelRefAcrossSegments)
            .emit();
        None
    }

    /// Resolves `entry` to its file's absolute offset. Files are always
    /// addressable across segments, so this never fails.
    pub fn relocate_file(&self, entry: &FileFixupEntry<'a>) -> RelativeOffset {
        self.file_def_table[entry.file.id].expect("file fixup resolved before its definition") as RelativeOffset
    }

    fn segment_base_for(&self, file: &File<'a>) -> AbsoluteOffset {
        match file.ty {
            FileType::Main | FileType::MainExtension | FileType::Subscript => 0,
            FileType::Mission => {
                self.file_def_table[file.id].expect("mission file offset not yet registered")
            }
        }
    }

    /// Two files are in the same segment if a relative offset between them
    /// is meaningful in both directions: the main-like segment is shared by
    /// the main file, its extensions, and subscripts; each mission file is
    /// its own segment.
    fn is_in_same_segment(a: &File<'a>, b: &File<'a>) -> bool {
        match a.ty {
            FileType::Main | FileType::MainExtension | FileType::Subscript => b.ty.is_main_segment(),
            FileType::Mission => b.ty == FileType::Mission && b.type_id == a.type_id,
        }
    }

    fn resize_label_def_table(&mut self, id: LabelId) {
        while self.label_def_table.len() <= id.index() {
            self.label_def_table.push(None);
        }
    }

    fn resize_file_def_table(&mut self, id: FileId) {
        while self.file_def_table.len() <= id.index() {
            self.file_def_table.push(None);
        }
    }
}

impl<'a> Default for RelocationTable<'a> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gta3c_data_structures::Arena;
    use gta3c_interface::{BytePos, FileTable, Span};
    use gta3c_sema::SymbolTable;

    fn sp() -> Span {
        Span::new(BytePos(0), BytePos(1))
    }

    #[test]
    fn main_segment_label_resolves_absolute() {
        let arena = Arena::new();
        let mut symbols = SymbolTable::new(&arena);
        let mut files = FileTable::new(&arena);
        let dcx = DiagCtxt::with_silent_emitter();

        let main = files.insert_or_get("main.sc", FileType::Main);
        let (label, _) = symbols.insert_label("START", sp(), symbols.global_scope());

        let mut reloc = RelocationTable::new();
        assert!(reloc.insert_label_loc(label, main, 100));

        let entry = FixupEntry { origin_file: main, label, offset: 200 };
        assert_eq!(reloc.relocate_label(&entry, &dcx), Some(100));
    }

    #[test]
    fn mission_label_resolves_relative_to_its_own_segment_base() {
        let arena = Arena::new();
        let mut symbols = SymbolTable::new(&arena);
        let mut files = FileTable::new(&arena);
        let dcx = DiagCtxt::with_silent_emitter();

        let mission = files.insert_or_get("mission1.sc", FileType::Mission);
        let (label, _) = symbols.insert_label("LOOP", sp(), symbols.global_scope());

        let mut reloc = RelocationTable::new();
        reloc.insert_file_loc(mission, 1000);
        assert!(reloc.insert_label_loc(label, mission, 1050));

        let entry = FixupEntry { origin_file: mission, label, offset: 1200 };
        assert_eq!(reloc.relocate_label(&entry, &dcx), Some(-50));
    }

    #[test]
    fn label_at_its_own_segment_base_is_rejected() {
        let arena = Arena::new();
        let mut symbols = SymbolTable::new(&arena);
        let mut files = FileTable::new(&arena);
        let dcx = DiagCtxt::with_silent_emitter();

        let mission = files.insert_or_get("mission1.sc", FileType::Mission);
        let (label, _) = symbols.insert_label("ENTRY", sp(), symbols.global_scope());

        let mut reloc = RelocationTable::new();
        reloc.insert_file_loc(mission, 1000);
        assert!(reloc.insert_label_loc(label, mission, 1000));

        let entry = FixupEntry { origin_file: mission, label, offset: 1200 };
        assert_eq!(reloc.relocate_label(&entry, &dcx), None);
    }

    #[test]
    fn cross_mission_reference_is_rejected() {
        let arena = Arena::new();
        let mut symbols = SymbolTable::new(&arena);
        let mut files = FileTable::new(&arena);
        let dcx = DiagCtxt::with_silent_emitter();

        let mission_a = files.insert_or_get("a.sc", FileType::Mission);
        let mission_b = files.insert_or_get("b.sc", FileType::Mission);
        let (label, _) = symbols.insert_label("LOOP", sp(), symbols.global_scope());

        let mut reloc = RelocationTable::new();
        reloc.insert_file_loc(mission_a, 1000);
        reloc.insert_file_loc(mission_b, 2000);
        assert!(reloc.insert_label_loc(label, mission_a, 1050));

        let entry = FixupEntry { origin_file: mission_b, label, offset: 2100 };
        assert_eq!(reloc.relocate_label(&entry, &dcx), None);
    }

    #[test]
    fn file_fixups_always_resolve_absolute() {
        let arena = Arena::new();
        let mut files = FileTable::new(&arena);
        let mission = files.insert_or_get("a.sc", FileType::Mission);

        let mut reloc = RelocationTable::new();
        reloc.insert_file_loc(mission, 4096);

        let entry = FileFixupEntry { file: mission, offset: 10 };
        assert_eq!(reloc.relocate_file(&entry), 4096);
    }
}
