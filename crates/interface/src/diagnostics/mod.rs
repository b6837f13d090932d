//! Diagnostics: typed error records with source ranges.
//!
//! Modeled on `rustc_errors`: a [`Diagnostic`] accumulates messages and
//! sub-diagnostics through a fluent [`DiagnosticBuilder`] and is emitted (or
//! cancelled) exactly once. A [`DiagCtxt`] owns the emitter and the running
//! error/warning counts an analyzer pass checks to decide whether its output
//! is trustworthy.

mod builder;
pub use builder::{DiagnosticBuilder, EmissionGuarantee};

mod context;
pub use context::DiagCtxt;

mod emitter;
pub use emitter::{BufferEmitter, DynEmitter, Emitter, HumanEmitter, SilentEmitter};

mod kind;
pub use kind::DiagnosticKind;

mod message;
pub use message::{DiagnosticMessage, MultiSpan, SpanLabel};

/// Proof that an error has already been reported, so callers can stop
/// analysis without reporting it again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ErrorGuaranteed(());

impl ErrorGuaranteed {
    pub(crate) const fn new_unchecked() -> Self {
        Self(())
    }
}

/// Severity of a [`Diagnostic`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Prevents compilation from finishing. This is the common case for
    /// every sema/codegen diagnostic kind.
    Error,
    /// Does not prevent compilation from finishing.
    Warning,
    /// Additional context, usually attached to an error as a child.
    Note,
    /// A suggested fix, usually attached to an error as a child.
    Help,
}

impl Level {
    pub fn to_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Note => "note",
            Self::Help => "help",
        }
    }

    pub fn is_error(self) -> bool {
        matches!(self, Self::Error)
    }

    pub fn style(self) -> anstyle::Style {
        anstyle::Style::new().fg_color(self.color()).bold()
    }

    pub fn color(self) -> Option<anstyle::Color> {
        use anstyle::{Ansi256Color, AnsiColor, Color};
        let ansi = match self {
            Self::Error => AnsiColor::Red,
            Self::Warning => AnsiColor::Yellow,
            Self::Note => AnsiColor::Green,
            Self::Help => AnsiColor::Cyan,
        };
        Some(Color::Ansi256(Ansi256Color::from_ansi(ansi)))
    }
}

/// A sub-diagnostic attached to a parent, e.g. a note explaining an error.
#[derive(Clone, Debug, PartialEq, Hash)]
pub struct SubDiagnostic {
    pub level: Level,
    pub message: DiagnosticMessage,
    pub span: MultiSpan,
}

/// A single compiler diagnostic: `{level, source_location, range?, kind, args...}`.
#[must_use]
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub(crate) level: Level,
    pub message: DiagnosticMessage,
    pub span: MultiSpan,
    pub children: Vec<SubDiagnostic>,
    /// The diagnostic kind, e.g. `duplicate_label` or `expected_integer`.
    pub code: Option<&'static str>,
}

impl PartialEq for Diagnostic {
    fn eq(&self, other: &Self) -> bool {
        self.keys() == other.keys()
    }
}

impl std::hash::Hash for Diagnostic {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.keys().hash(state);
    }
}

impl Diagnostic {
    pub fn new(level: Level, msg: impl Into<DiagnosticMessage>) -> Self {
        Self { level, message: msg.into(), span: MultiSpan::new(), children: vec![], code: None }
    }

    pub fn is_error(&self) -> bool {
        self.level.is_error()
    }

    pub fn level(&self) -> Level {
        self.level
    }

    fn keys(&self) -> impl PartialEq + std::hash::Hash + '_ {
        (&self.level, &self.message, &self.code, &self.span)
    }

    pub fn span(&mut self, span: impl Into<MultiSpan>) -> &mut Self {
        self.span = span.into();
        self
    }

    pub fn code(&mut self, code: &'static str) -> &mut Self {
        self.code = Some(code);
        self
    }

    pub fn kind(&mut self, kind: DiagnosticKind) -> &mut Self {
        self.code(kind.as_str())
    }

    pub fn span_label(&mut self, span: crate::Span, label: impl Into<DiagnosticMessage>) -> &mut Self {
        self.span.push_span_label(span, label);
        self
    }

    pub fn note(&mut self, msg: impl Into<DiagnosticMessage>) -> &mut Self {
        self.sub(Level::Note, msg)
    }

    pub fn help(&mut self, msg: impl Into<DiagnosticMessage>) -> &mut Self {
        self.sub(Level::Help, msg)
    }

    fn sub(&mut self, level: Level, msg: impl Into<DiagnosticMessage>) -> &mut Self {
        self.children.push(SubDiagnostic { level, message: msg.into(), span: MultiSpan::new() });
        self
    }
}
