use crate::{BytePos, Span};
use std::{cell::RefCell, fmt, sync::Arc};

/// One source file loaded into a [`SourceMap`].
///
/// Every line of a GTA3script file is what the scanner and parser operate
/// on; this type exists purely so diagnostics can turn a [`Span`] back into
/// a line/column and a printable snippet. Nothing in the compiler pipeline
/// itself addresses source text through it.
#[derive(Debug)]
pub struct SourceFile {
    pub name: String,
    pub src: String,
    /// The position this file's bytes start at within the map's shared
    /// `BytePos` address space.
    pub start_pos: BytePos,
    /// Byte offset (relative to `start_pos`) of the start of each line.
    line_starts: Vec<BytePos>,
}

impl SourceFile {
    fn new(name: String, src: String, start_pos: BytePos) -> Self {
        let mut line_starts = vec![BytePos(0)];
        for (i, b) in src.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(BytePos::from_usize(i + 1));
            }
        }
        Self { name, src, start_pos, line_starts }
    }

    pub fn end_pos(&self) -> BytePos {
        self.start_pos + BytePos::from_usize(self.src.len())
    }

    fn contains(&self, pos: BytePos) -> bool {
        self.start_pos <= pos && pos <= self.end_pos()
    }

    /// Returns the 1-based line and column for a byte position known to lie
    /// within this file.
    pub fn lookup_line_col(&self, pos: BytePos) -> (usize, usize) {
        let relative = pos.to_usize() - self.start_pos.to_usize();
        let line =
            self.line_starts.partition_point(|&start| start.to_usize() <= relative).max(1) - 1;
        let col = relative - self.line_starts[line].to_usize();
        (line + 1, col + 1)
    }

    /// Returns the full text of the line containing `pos`.
    pub fn line_text(&self, pos: BytePos) -> &str {
        let relative = pos.to_usize() - self.start_pos.to_usize();
        let line = self.line_starts.partition_point(|&start| start.to_usize() <= relative) - 1;
        let lo = self.line_starts[line].to_usize();
        let hi =
            self.line_starts.get(line + 1).map(|p| p.to_usize() - 1).unwrap_or(self.src.len());
        &self.src[lo..hi.max(lo)]
    }
}

/// The set of source files a [`Session`](crate::Session) knows about.
///
/// Files are assigned disjoint, monotonically increasing `BytePos` ranges so
/// a bare [`Span`] can be resolved back to a file without carrying a file id
/// around in every IR node, mirroring how the upstream compiler's
/// `SourceMap` addresses multi-file spans.
#[derive(Default)]
pub struct SourceMap {
    files: RefCell<Vec<Arc<SourceFile>>>,
}

impl fmt::Debug for SourceMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceMap").field("files", &self.files.borrow().len()).finish()
    }
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new source file and returns it along with the `BytePos`
    /// its text starts at.
    pub fn new_source_file(&self, name: impl Into<String>, src: impl Into<String>) -> Arc<SourceFile> {
        let mut files = self.files.borrow_mut();
        let start_pos = files.last().map(|f| f.end_pos() + 1).unwrap_or(BytePos(0));
        let file = Arc::new(SourceFile::new(name.into(), src.into(), start_pos));
        files.push(file.clone());
        file
    }

    pub fn lookup_file(&self, pos: BytePos) -> Option<Arc<SourceFile>> {
        self.files.borrow().iter().find(|f| f.contains(pos)).cloned()
    }

    pub fn lookup_line_col(&self, pos: BytePos) -> Option<(String, usize, usize)> {
        let file = self.lookup_file(pos)?;
        let (line, col) = file.lookup_line_col(pos);
        Some((file.name.clone(), line, col))
    }

    /// Renders `span` as `file:line:col` for use in short diagnostic headers.
    pub fn span_to_diagnostic_string(&self, span: Span) -> String {
        match self.lookup_line_col(span.lo()) {
            Some((name, line, col)) => format!("{name}:{line}:{col}"),
            None => format!("<unknown>:{}..{}", span.lo().0, span.hi().0),
        }
    }

    pub fn span_to_snippet(&self, span: Span) -> Option<String> {
        let file = self.lookup_file(span.lo())?;
        let lo = span.lo().to_usize() - file.start_pos.to_usize();
        let hi = span.hi().to_usize() - file.start_pos.to_usize();
        file.src.get(lo..hi).map(str::to_owned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_lookup() {
        let sm = SourceMap::new();
        sm.new_source_file("a.sc", "LINE0\nLINE1\nLINE2\n");
        let (name, line, col) = sm.lookup_line_col(BytePos(6)).unwrap();
        assert_eq!(name, "a.sc");
        assert_eq!((line, col), (2, 1));
    }

    #[test]
    fn disjoint_files_get_disjoint_ranges() {
        let sm = SourceMap::new();
        let a = sm.new_source_file("a.sc", "AB");
        let b = sm.new_source_file("b.sc", "CD");
        assert!(b.start_pos > a.end_pos());
    }
}
