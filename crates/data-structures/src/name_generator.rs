use std::sync::atomic::{AtomicU32, Ordering};

/// Generates strings that are unique for the lifetime of one instance.
///
/// Used by the lowering rewriter to invent label names for the loops it
/// synthesizes out of `REPEAT`/`ENDREPEAT`: each call to [`generate`](Self::generate)
/// returns `{prefix}{n}` for a counter `n` that never repeats within this
/// generator, so labels it produces can never collide with a label written
/// by the user or by another generator with a different prefix.
#[derive(Debug)]
pub struct NameGenerator {
    counter: AtomicU32,
    prefix: String,
}

impl NameGenerator {
    /// Creates a generator with no prefix: `generate` yields `"0"`, `"1"`, ...
    pub fn new() -> Self {
        Self::with_prefix(String::new())
    }

    /// Creates a generator whose output is prefixed with `prefix`.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self { counter: AtomicU32::new(0), prefix: prefix.into() }
    }

    /// Produces the next unique string.
    pub fn generate(&self) -> String {
        let id = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{}{id}", self.prefix)
    }
}

impl Default for NameGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_distinct_names() {
        let gen = NameGenerator::new();
        let names: Vec<_> = (0..5).map(|_| gen.generate()).collect();
        assert_eq!(names, vec!["0", "1", "2", "3", "4"]);
    }

    #[test]
    fn prefix_is_prepended() {
        let gen = NameGenerator::with_prefix("$LOOP@");
        assert_eq!(gen.generate(), "$LOOP@0");
        assert_eq!(gen.generate(), "$LOOP@1");
    }
}
