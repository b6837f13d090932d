use super::{Diagnostic, DiagnosticBuilder, DiagnosticMessage, DynEmitter, EmissionGuarantee, ErrorGuaranteed, Level};
use crate::SourceMap;
use std::{cell::RefCell, sync::Arc};

/// Owns the diagnostic emitter and the running error/warning counts.
///
/// The two-pass semantic analyzer checks [`err_count`](Self::err_count) at
/// the end of its checking pass to decide whether the `SemaIR` it produced
/// is trustworthy or must be discarded; the trilogy code generator checks it
/// per command to decide whether to keep emitting bytes for the current file.
pub struct DiagCtxt {
    inner: RefCell<DiagCtxtInner>,
}

struct DiagCtxtInner {
    emitter: Box<DynEmitter>,
    err_count: usize,
    warn_count: usize,
}

impl DiagCtxt {
    pub fn new(emitter: Box<DynEmitter>) -> Self {
        Self { inner: RefCell::new(DiagCtxtInner { emitter, err_count: 0, warn_count: 0 }) }
    }

    pub fn with_stderr_emitter(source_map: Option<Arc<SourceMap>>) -> Self {
        Self::new(Box::new(super::HumanEmitter::stderr(source_map)))
    }

    pub fn with_buffer_emitter(source_map: Option<Arc<SourceMap>>) -> Self {
        Self::new(Box::new(super::BufferEmitter::new(source_map)))
    }

    pub fn with_silent_emitter() -> Self {
        Self::new(Box::new(super::SilentEmitter))
    }

    pub fn diag<G: EmissionGuarantee>(&self, level: Level, msg: impl Into<DiagnosticMessage>) -> DiagnosticBuilder<'_, G> {
        DiagnosticBuilder::new(self, level, msg)
    }

    pub fn err(&self, msg: impl Into<DiagnosticMessage>) -> DiagnosticBuilder<'_, ErrorGuaranteed> {
        self.diag(Level::Error, msg)
    }

    pub fn warn(&self, msg: impl Into<DiagnosticMessage>) -> DiagnosticBuilder<'_, ()> {
        self.diag(Level::Warning, msg)
    }

    pub fn note(&self, msg: impl Into<DiagnosticMessage>) -> DiagnosticBuilder<'_, ()> {
        self.diag(Level::Note, msg)
    }

    pub(super) fn emit_diagnostic(&self, diagnostic: &Diagnostic) {
        let mut inner = self.inner.borrow_mut();
        inner.emitter.emit_diagnostic(diagnostic);
        if diagnostic.is_error() {
            inner.err_count += 1;
        } else if diagnostic.level() == Level::Warning {
            inner.warn_count += 1;
        }
    }

    /// Number of errors emitted so far, including duplicates.
    pub fn err_count(&self) -> usize {
        self.inner.borrow().err_count
    }

    pub fn warn_count(&self) -> usize {
        self.inner.borrow().warn_count
    }

    pub fn has_errors(&self) -> Result<(), ErrorGuaranteed> {
        if self.err_count() > 0 { Err(ErrorGuaranteed::new_unchecked()) } else { Ok(()) }
    }

    /// Returns the text buffered so far, if the underlying emitter is a
    /// [`BufferEmitter`](super::BufferEmitter).
    pub fn buffer(&self) -> Option<String> {
        self.inner.borrow().emitter.buffer()
    }
}
