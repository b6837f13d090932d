use super::Diagnostic;
use crate::SourceMap;
use std::sync::Arc;

mod human;
pub use human::HumanEmitter;

/// Object-safe diagnostic sink, boxed inside every [`super::DiagCtxt`].
pub type DynEmitter = dyn Emitter;

/// Something that can render a finished [`Diagnostic`].
pub trait Emitter {
    fn emit_diagnostic(&mut self, diagnostic: &Diagnostic);

    /// Returns the source map used to render snippets, if any.
    fn source_map(&self) -> Option<&Arc<SourceMap>> {
        None
    }

    /// Returns the diagnostics buffered so far, if this emitter buffers.
    fn buffer(&self) -> Option<String> {
        None
    }
}

/// Discards every diagnostic. Used by tests that only care about error counts.
pub struct SilentEmitter;

impl Emitter for SilentEmitter {
    fn emit_diagnostic(&mut self, _diagnostic: &Diagnostic) {}
}

/// Renders diagnostics with [`HumanEmitter`]'s formatting into an in-memory
/// buffer instead of stderr, so tests can assert on the rendered text.
pub struct BufferEmitter {
    human: HumanEmitter,
    buffer: String,
}

impl BufferEmitter {
    pub fn new(source_map: Option<Arc<SourceMap>>) -> Self {
        Self { human: HumanEmitter::to_string(source_map), buffer: String::new() }
    }
}

impl Emitter for BufferEmitter {
    fn emit_diagnostic(&mut self, diagnostic: &Diagnostic) {
        self.human.emit_diagnostic(diagnostic);
        if let Some(rendered) = self.human.take_rendered() {
            self.buffer.push_str(&rendered);
        }
    }

    fn source_map(&self) -> Option<&Arc<SourceMap>> {
        self.human.source_map()
    }

    fn buffer(&self) -> Option<String> {
        Some(self.buffer.clone())
    }
}
