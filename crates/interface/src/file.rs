//! File identity: every compiled or referenced source file carries a type
//! that drives relocation segment policy downstream (`gta3c-codegen`'s
//! relocation table). Main, main-extension, and subscript files share one
//! always-addressable segment; each mission file gets its own.

use gta3c_data_structures::{Arena, fx::FxHashMap};
use index_vec::{IndexVec, define_index_type};

define_index_type! {
    pub struct FileId = u32;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileType {
    Main,
    MainExtension,
    Subscript,
    Mission,
}

impl FileType {
    /// Main, main-extension and subscript files are reachable through an
    /// absolute offset from anywhere; only mission files get a relative
    /// segment of their own.
    pub fn is_main_segment(self) -> bool {
        matches!(self, Self::Main | Self::MainExtension | Self::Subscript)
    }
}

/// One file known to the compilation: a name, a type, and a dense ordinal
/// unique among files of the same type.
#[derive(Debug)]
pub struct File<'a> {
    pub name: &'a str,
    pub ty: FileType,
    pub type_id: u32,
    pub id: FileId,
}

/// The set of files a multi-file compilation may reference by name, e.g. a
/// `FILENAME` argument naming a mission script. Populated by the driver as
/// files are discovered; a file may be referenced before it is compiled.
pub struct FileTable<'a> {
    arena: &'a Arena,
    by_name: FxHashMap<&'a str, &'a File<'a>>,
    files: IndexVec<FileId, &'a File<'a>>,
    next_type_id: [u32; 4],
}

impl<'a> FileTable<'a> {
    pub fn new(arena: &'a Arena) -> Self {
        Self {
            arena,
            by_name: FxHashMap::default(),
            files: IndexVec::new(),
            next_type_id: [0; 4],
        }
    }

    /// Registers `name` as a file of the given type, or returns the
    /// already-registered file if the name was seen before.
    pub fn insert_or_get(&mut self, name: &str, ty: FileType) -> &'a File<'a> {
        let name = self.arena.alloc_str(name);
        if let Some(&existing) = self.by_name.get(name) {
            return existing;
        }
        let type_id = self.next_type_id[ty as usize];
        self.next_type_id[ty as usize] += 1;
        let id = FileId::from_usize(self.files.len());
        let file = &*self.arena.alloc(File { name, ty, type_id, id });
        self.by_name.insert(name, file);
        self.files.push(file);
        file
    }

    pub fn get(&self, name: &str) -> Option<&'a File<'a>> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_or_get_is_idempotent_by_name() {
        let arena = Arena::new();
        let mut table = FileTable::new(&arena);
        let a = table.insert_or_get("main.sc", FileType::Main);
        let b = table.insert_or_get("main.sc", FileType::Main);
        assert_eq!(a.id, b.id);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn type_id_is_dense_per_type() {
        let arena = Arena::new();
        let mut table = FileTable::new(&arena);
        let m0 = table.insert_or_get("one.mis", FileType::Mission);
        let m1 = table.insert_or_get("two.mis", FileType::Mission);
        let main = table.insert_or_get("main.sc", FileType::Main);
        assert_eq!(m0.type_id, 0);
        assert_eq!(m1.type_id, 1);
        assert_eq!(main.type_id, 0);
    }

    #[test]
    fn main_like_types_share_the_main_segment() {
        assert!(FileType::Main.is_main_segment());
        assert!(FileType::MainExtension.is_main_segment());
        assert!(FileType::Subscript.is_main_segment());
        assert!(!FileType::Mission.is_main_segment());
    }
}
