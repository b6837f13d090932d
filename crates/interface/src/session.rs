use crate::{SourceMap, diagnostics::DiagCtxt};
use std::sync::Arc;

/// A single compiler invocation: the diagnostics context and the source map
/// backing it. Each driven source file (main, mission, or included script)
/// shares one `Session`.
pub struct Session {
    pub dcx: DiagCtxt,
    source_map: Arc<SourceMap>,
}

impl Default for Session {
    fn default() -> Self {
        Self::builder().with_stderr_emitter().build()
    }
}

/// [`Session`] builder.
#[derive(Default)]
#[must_use = "builders don't do anything unless you call `build`"]
pub struct SessionBuilder {
    dcx: Option<DiagCtxt>,
    source_map: Option<Arc<SourceMap>>,
}

impl SessionBuilder {
    pub fn source_map(mut self, source_map: Arc<SourceMap>) -> Self {
        self.source_map = Some(source_map);
        self
    }

    pub fn with_stderr_emitter(mut self) -> Self {
        let sm = self.get_source_map();
        self.dcx = Some(DiagCtxt::with_stderr_emitter(Some(sm)));
        self
    }

    pub fn with_buffer_emitter(mut self) -> Self {
        let sm = self.get_source_map();
        self.dcx = Some(DiagCtxt::with_buffer_emitter(Some(sm)));
        self
    }

    pub fn with_silent_emitter(mut self) -> Self {
        self.dcx = Some(DiagCtxt::with_silent_emitter());
        self
    }

    fn get_source_map(&mut self) -> Arc<SourceMap> {
        self.source_map.get_or_insert_with(|| Arc::new(SourceMap::new())).clone()
    }

    pub fn build(mut self) -> Session {
        let source_map = self.get_source_map();
        let dcx = self
            .dcx
            .unwrap_or_else(|| DiagCtxt::with_stderr_emitter(Some(source_map.clone())));
        Session { dcx, source_map }
    }
}

impl Session {
    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    pub fn source_map(&self) -> &SourceMap {
        &self.source_map
    }

    pub fn clone_source_map(&self) -> Arc<SourceMap> {
        self.source_map.clone()
    }

    pub fn emitted_errors(&self) -> Option<Result<(), String>> {
        self.dcx.buffer().map(|buf| if self.dcx.err_count() > 0 { Err(buf) } else { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_to_stderr() {
        let _ = Session::builder().with_stderr_emitter().build();
    }

    #[test]
    fn buffer_emitter_collects_errors() {
        let sess = Session::builder().with_buffer_emitter().build();
        sess.dcx.err("test").emit();
        let err = sess.emitted_errors().unwrap().unwrap_err();
        assert!(err.contains("test"), "{err:?}");
    }
}
