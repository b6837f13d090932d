use super::{Diagnostic, DiagCtxt, DiagnosticKind, DiagnosticMessage, ErrorGuaranteed, Level, MultiSpan};
use crate::Span;
use std::{fmt, marker::PhantomData, mem::ManuallyDrop, ops::{Deref, DerefMut}};

/// What emitting a [`DiagnosticBuilder`] hands back: either a proof the
/// error was reported ([`ErrorGuaranteed`]) or nothing, for warnings/notes.
pub trait EmissionGuarantee: Sized {
    fn emit_producing_guarantee(db: &mut DiagnosticBuilder<'_, Self>) -> Self;
}

impl EmissionGuarantee for ErrorGuaranteed {
    fn emit_producing_guarantee(db: &mut DiagnosticBuilder<'_, Self>) -> Self {
        db.dcx.emit_diagnostic(&db.diagnostic);
        assert!(db.diagnostic.is_error(), "emitted a non-error from an error builder");
        ErrorGuaranteed::new_unchecked()
    }
}

impl EmissionGuarantee for () {
    fn emit_producing_guarantee(db: &mut DiagnosticBuilder<'_, Self>) {
        db.dcx.emit_diagnostic(&db.diagnostic);
    }
}

/// Accumulates a diagnostic's fields, fluently, and emits it on
/// [`emit`](Self::emit) or explicitly on [`cancel`](Self::cancel).
///
/// Dropping a builder without calling either panics: every diagnostic raised
/// must be accounted for by the caller.
#[must_use = "diagnostics must be emitted or cancelled"]
pub struct DiagnosticBuilder<'a, G: EmissionGuarantee> {
    dcx: &'a DiagCtxt,
    diagnostic: Diagnostic,
    _marker: PhantomData<G>,
}

impl<G: EmissionGuarantee> fmt::Debug for DiagnosticBuilder<'_, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.diagnostic.fmt(f)
    }
}

impl<G: EmissionGuarantee> Deref for DiagnosticBuilder<'_, G> {
    type Target = Diagnostic;
    fn deref(&self) -> &Self::Target {
        &self.diagnostic
    }
}

impl<G: EmissionGuarantee> DerefMut for DiagnosticBuilder<'_, G> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.diagnostic
    }
}

impl<G: EmissionGuarantee> Drop for DiagnosticBuilder<'_, G> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }
        panic!("diagnostic was constructed but neither emitted nor cancelled: {:?}", self.diagnostic);
    }
}

impl<'a, G: EmissionGuarantee> DiagnosticBuilder<'a, G> {
    pub fn new(dcx: &'a DiagCtxt, level: Level, msg: impl Into<DiagnosticMessage>) -> Self {
        Self { dcx, diagnostic: Diagnostic::new(level, msg), _marker: PhantomData }
    }

    /// Emits the diagnostic through its [`DiagCtxt`], consuming the builder.
    pub fn emit(self) -> G {
        let mut this = ManuallyDrop::new(self);
        let guarantee = G::emit_producing_guarantee(&mut this);
        unsafe { std::ptr::drop_in_place(&mut this.diagnostic) };
        guarantee
    }

    /// Discards the diagnostic without emitting it.
    pub fn cancel(self) {
        let mut this = ManuallyDrop::new(self);
        unsafe { std::ptr::drop_in_place(&mut this.diagnostic) };
    }

    pub fn span(mut self, span: impl Into<MultiSpan>) -> Self {
        self.diagnostic.span(span);
        self
    }

    pub fn code(mut self, code: &'static str) -> Self {
        self.diagnostic.code(code);
        self
    }

    pub fn kind(mut self, kind: DiagnosticKind) -> Self {
        self.diagnostic.kind(kind);
        self
    }

    pub fn span_label(mut self, span: Span, label: impl Into<DiagnosticMessage>) -> Self {
        self.diagnostic.span_label(span, label);
        self
    }

    pub fn note(mut self, msg: impl Into<DiagnosticMessage>) -> Self {
        self.diagnostic.note(msg);
        self
    }

    pub fn help(mut self, msg: impl Into<DiagnosticMessage>) -> Self {
        self.diagnostic.help(msg);
        self
    }
}
