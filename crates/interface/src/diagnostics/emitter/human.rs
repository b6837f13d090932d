use super::Emitter;
use crate::{SourceMap, diagnostics::{Diagnostic, Level, SpanLabel}};
use annotate_snippets::{Level as AsLevel, Renderer, Snippet};
use anstream::{AutoStream, ColorChoice};
use std::{
    io::{self, Write},
    sync::Arc,
};

fn as_level(level: Level) -> AsLevel {
    match level {
        Level::Error => AsLevel::Error,
        Level::Warning => AsLevel::Warning,
        Level::Note => AsLevel::Note,
        Level::Help => AsLevel::Help,
    }
}

enum Sink {
    Stream(AutoStream<Box<dyn Write>>),
    String(String),
}

/// Renders diagnostics in the caret-and-snippet style familiar from rustc
/// and clang, via `annotate-snippets`.
pub struct HumanEmitter {
    sink: Sink,
    source_map: Option<Arc<SourceMap>>,
    renderer: Renderer,
}

impl HumanEmitter {
    pub fn stderr(source_map: Option<Arc<SourceMap>>) -> Self {
        let writer: Box<dyn Write> = Box::new(io::stderr());
        Self {
            sink: Sink::Stream(AutoStream::new(writer, ColorChoice::Auto)),
            source_map,
            renderer: Renderer::styled(),
        }
    }

    pub fn to_string(source_map: Option<Arc<SourceMap>>) -> Self {
        Self { sink: Sink::String(String::new()), source_map, renderer: Renderer::plain() }
    }

    /// Takes the text rendered since the last call, if this emitter renders
    /// into a string rather than a stream.
    pub fn take_rendered(&mut self) -> Option<String> {
        match &mut self.sink {
            Sink::String(s) => Some(std::mem::take(s)),
            Sink::Stream(_) => None,
        }
    }

    fn write(&mut self, rendered: &str) {
        match &mut self.sink {
            Sink::Stream(w) => {
                let _ = writeln!(w, "{rendered}\n");
                let _ = w.flush();
            }
            Sink::String(s) => {
                s.push_str(rendered);
                s.push_str("\n\n");
            }
        }
    }
}

impl Emitter for HumanEmitter {
    fn emit_diagnostic(&mut self, diagnostic: &Diagnostic) {
        let title = diagnostic.message.as_str().to_owned();
        let level = as_level(diagnostic.level());

        let labels: Vec<SpanLabel> = diagnostic.span.span_labels();
        let primary = diagnostic.span.primary_span();

        let rendered = if let (Some(primary), Some(sm)) =
            (primary, self.source_map.as_ref().filter(|_| !diagnostic.span.is_dummy()))
        {
            match sm.lookup_file(primary.lo()) {
                Some(file) => {
                    let base = file.start_pos.to_usize();
                    let mut snippet = Snippet::source(file.src.as_str())
                        .origin(file.name.as_str())
                        .line_start(1)
                        .fold(true);
                    for label in &labels {
                        let lo = label.span.lo().to_usize().saturating_sub(base);
                        let hi = label.span.hi().to_usize().saturating_sub(base);
                        let lo = lo.min(file.src.len());
                        let hi = hi.clamp(lo, file.src.len());
                        let ann_level = if label.is_primary { level } else { AsLevel::Note };
                        let text = label.label.as_ref().map(|m| m.as_str()).unwrap_or("");
                        snippet = snippet.annotation(ann_level.span(lo..hi).label(text));
                    }
                    let message = level.title(&title).snippet(snippet);
                    self.renderer.render(message).to_string()
                }
                None => format!("{}: {title}", diagnostic.level().to_str()),
            }
        } else {
            format!("{}: {title}", diagnostic.level().to_str())
        };
        self.write(&rendered);

        for child in &diagnostic.children {
            let rendered = format!("{}: {}", child.level.to_str(), child.message.as_str());
            self.write(&rendered);
        }
    }

    fn source_map(&self) -> Option<&Arc<SourceMap>> {
        self.source_map.as_ref()
    }
}
