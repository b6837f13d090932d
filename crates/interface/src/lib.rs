//! Source positions, diagnostics, and the compilation session.

pub mod diagnostics;
pub use diagnostics::{DiagCtxt, DiagnosticKind, ErrorGuaranteed};

mod pos;
pub use pos::BytePos;

mod file;
pub use file::{File, FileId, FileTable, FileType};

mod span;
pub use span::{Span, Spanned};

pub mod source_map;
pub use source_map::{SourceFile, SourceMap};

mod session;
pub use session::{Session, SessionBuilder};

pub use anstream::ColorChoice;

/// Compiler result type.
pub type Result<T = (), E = ErrorGuaranteed> = std::result::Result<T, E>;

/// Pluralizes a word based on a count.
#[macro_export]
macro_rules! pluralize {
    ($x:expr) => {
        if $x == 1 { "" } else { "s" }
    };
}
