//! Storage allocation, raw bytecode emission, relocation bookkeeping, and
//! the Trilogy (GTA III / Vice City / San Andreas) code generator that ties
//! them together over a validated `SemaIr` stream.

pub mod emitter;
pub mod relocation;
pub mod storage;
pub mod trilogy;

pub use emitter::CodeEmitter;
pub use relocation::{AbsoluteOffset, FileFixupEntry, FixupEntry, RelativeOffset, RelocationTable};
pub use storage::{LocalStorageOptions, LocalStorageTable, StorageOptions, StorageTable, TimerOptions};
pub use trilogy::CodeGen;
