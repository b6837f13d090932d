use crate::Span;
use std::borrow::Cow;

/// Text of a diagnostic message or sub-message.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DiagnosticMessage {
    inner: Cow<'static, str>,
}

impl From<&'static str> for DiagnosticMessage {
    fn from(value: &'static str) -> Self {
        Self { inner: Cow::Borrowed(value) }
    }
}

impl From<String> for DiagnosticMessage {
    fn from(value: String) -> Self {
        Self { inner: Cow::Owned(value) }
    }
}

impl DiagnosticMessage {
    pub fn as_str(&self) -> &str {
        &self.inner
    }
}

/// A span with an optional label, to be rendered inside a diagnostic's snippet.
#[derive(Clone, Debug)]
pub struct SpanLabel {
    pub span: Span,
    pub is_primary: bool,
    pub label: Option<DiagnosticMessage>,
}

/// The set of spans attached to one diagnostic.
///
/// The first span pushed is the primary span: the one the `^^^` caret points
/// at. Every other span/label pair is rendered as secondary context.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct MultiSpan {
    primary_spans: Vec<Span>,
    span_labels: Vec<(Span, DiagnosticMessage)>,
}

impl MultiSpan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_span(primary_span: Span) -> Self {
        Self { primary_spans: vec![primary_span], span_labels: vec![] }
    }

    pub fn push_span_label(&mut self, span: Span, label: impl Into<DiagnosticMessage>) {
        self.span_labels.push((span, label.into()));
    }

    pub fn primary_span(&self) -> Option<Span> {
        self.primary_spans.first().copied()
    }

    pub fn is_dummy(&self) -> bool {
        self.primary_spans.iter().all(|sp| sp.is_dummy())
    }

    pub fn span_labels(&self) -> Vec<SpanLabel> {
        let is_primary = |span| self.primary_spans.contains(&span);
        let mut labels = self
            .span_labels
            .iter()
            .map(|&(span, ref label)| SpanLabel {
                span,
                is_primary: is_primary(span),
                label: Some(label.clone()),
            })
            .collect::<Vec<_>>();
        for &span in &self.primary_spans {
            if !labels.iter().any(|sl| sl.span == span) {
                labels.push(SpanLabel { span, is_primary: true, label: None });
            }
        }
        labels
    }
}

impl From<Span> for MultiSpan {
    fn from(span: Span) -> Self {
        Self::from_span(span)
    }
}
