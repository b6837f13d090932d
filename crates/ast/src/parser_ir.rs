//! The parser IR: an intrusive doubly linked list of immutable per-line
//! records, each carrying at most one label definition and at most one
//! command.
//!
//! Nodes are arena-allocated and linked through `Cell`s rather than raw
//! pointers, so the lowering rewriter can splice new nodes into the middle
//! of a stream (e.g. replacing a `REPEAT` with its primitive expansion)
//! without reallocating anything around it.

use gta3c_data_structures::Arena;
use gta3c_interface::Span;
use std::cell::Cell;

/// The value half of an [`Argument`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ArgumentValue<'a> {
    Int(i32),
    Float(f32),
    /// An uppercased identifier: a variable name, label name, or keyword.
    Identifier(&'a str),
    /// A filename, kept in its original case.
    Filename(&'a str),
    /// A quoted string literal, kept in its original case.
    String(&'a str),
}

#[derive(Clone, Copy, Debug)]
pub struct Argument<'a> {
    pub value: ArgumentValue<'a>,
    pub span: Span,
}

#[derive(Clone, Copy, Debug)]
pub struct LabelDef<'a> {
    pub name: &'a str,
    pub span: Span,
}

#[derive(Clone, Copy, Debug)]
pub struct Command<'a> {
    pub name: &'a str,
    pub not_flag: bool,
    pub args: &'a [Argument<'a>],
    pub span: Span,
}

/// One node of the parser IR stream.
pub struct ParserIr<'a> {
    pub label: Option<LabelDef<'a>>,
    pub command: Option<Command<'a>>,
    next: Cell<Option<&'a ParserIr<'a>>>,
    prev: Cell<Option<&'a ParserIr<'a>>>,
}

impl<'a> ParserIr<'a> {
    pub fn next(&self) -> Option<&'a ParserIr<'a>> {
        self.next.get()
    }

    pub fn prev(&self) -> Option<&'a ParserIr<'a>> {
        self.prev.get()
    }

    fn unlink(&'a self) {
        if let Some(next) = self.next.take() {
            next.prev.set(None);
        }
        if let Some(prev) = self.prev.take() {
            prev.next.set(None);
        }
    }

    /// Links `self -> other`, detaching each from its previous neighbor on
    /// that side.
    pub fn set_next(&'a self, other: &'a ParserIr<'a>) {
        if let Some(old_next) = self.next.get() {
            old_next.prev.set(None);
        }
        self.next.set(Some(other));
        if let Some(old_prev) = other.prev.get() {
            old_prev.next.set(None);
        }
        other.prev.set(Some(self));
    }
}

/// Interns a name in upper case, the canonical form every identifier takes
/// once it crosses into the IR.
fn intern_upper<'a>(arena: &'a Arena, s: &str) -> &'a str {
    arena.alloc_str_upper(s)
}

/// Builds one [`ParserIr`] node: interns the command/label name, copies
/// argument pointers into the arena, and freezes the result.
pub struct ParserIrBuilder<'a> {
    arena: &'a Arena,
    label: Option<LabelDef<'a>>,
    command_name: Option<(&'a str, Span)>,
    not_flag: bool,
    args: Vec<Argument<'a>>,
}

impl<'a> ParserIrBuilder<'a> {
    pub fn new(arena: &'a Arena) -> Self {
        Self { arena, label: None, command_name: None, not_flag: false, args: Vec::new() }
    }

    pub fn label(mut self, name: &str, span: Span) -> Self {
        self.label = Some(LabelDef { name: intern_upper(self.arena, name), span });
        self
    }

    pub fn command(mut self, name: &str, span: Span) -> Self {
        self.command_name = Some((intern_upper(self.arena, name), span));
        self
    }

    pub fn not_flag(mut self) -> Self {
        self.not_flag = true;
        self
    }

    pub fn arg_int(mut self, value: i32, span: Span) -> Self {
        self.args.push(Argument { value: ArgumentValue::Int(value), span });
        self
    }

    pub fn arg_float(mut self, value: f32, span: Span) -> Self {
        self.args.push(Argument { value: ArgumentValue::Float(value), span });
        self
    }

    pub fn arg_ident(mut self, name: &str, span: Span) -> Self {
        let name = intern_upper(self.arena, name);
        self.args.push(Argument { value: ArgumentValue::Identifier(name), span });
        self
    }

    pub fn arg_filename(mut self, name: &str, span: Span) -> Self {
        let name = self.arena.alloc_str(name);
        self.args.push(Argument { value: ArgumentValue::Filename(name), span });
        self
    }

    pub fn arg_string(mut self, text: &str, span: Span) -> Self {
        let text = self.arena.alloc_str(text);
        self.args.push(Argument { value: ArgumentValue::String(text), span });
        self
    }

    /// Appends an already-built argument verbatim, e.g. when a lowering
    /// pass reuses an argument from the node it is replacing.
    pub fn arg(mut self, arg: Argument<'a>) -> Self {
        self.args.push(arg);
        self
    }

    pub fn build(self) -> &'a ParserIr<'a> {
        let command = self.command_name.map(|(name, span)| Command {
            name,
            not_flag: self.not_flag,
            args: self.arena.alloc_slice_fill_iter(self.args),
            span,
        });
        self.arena.alloc(ParserIr {
            label: self.label,
            command,
            next: Cell::new(None),
            prev: Cell::new(None),
        })
    }
}

/// An intrusive doubly linked list of [`ParserIr`] nodes.
///
/// Splicing moves existing nodes between lists in O(1): only the head/tail
/// pointers and the boundary nodes' links change.
#[derive(Default)]
pub struct LinkedIr<'a> {
    head: Cell<Option<&'a ParserIr<'a>>>,
    tail: Cell<Option<&'a ParserIr<'a>>>,
}

impl<'a> LinkedIr<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.head.get().is_none()
    }

    pub fn head(&self) -> Option<&'a ParserIr<'a>> {
        self.head.get()
    }

    pub fn push_back(&self, node: &'a ParserIr<'a>) {
        match self.tail.get() {
            Some(tail) => tail.set_next(node),
            None => {
                node.prev.set(None);
                self.head.set(Some(node));
            }
        }
        node.next.set(None);
        self.tail.set(Some(node));
    }

    /// Moves every node of `other` to the front of `self`. `other` is left
    /// empty.
    pub fn splice_front(&self, other: &LinkedIr<'a>) {
        let (Some(other_head), Some(other_tail)) = (other.head.get(), other.tail.get()) else {
            return;
        };
        if let Some(self_head) = self.head.get() {
            other_tail.set_next(self_head);
        } else {
            self.tail.set(Some(other_tail));
        }
        self.head.set(Some(other_head));
        other.head.set(None);
        other.tail.set(None);
    }

    /// Replaces `old` in the list with every node of `replacement`, which is
    /// left empty. `old` keeps whatever links it had before the call (it is
    /// the caller's node to discard).
    pub fn replace(&self, old: &'a ParserIr<'a>, replacement: &LinkedIr<'a>) {
        let (Some(rep_head), Some(rep_tail)) = (replacement.head.get(), replacement.tail.get())
        else {
            return;
        };
        let prev = old.prev.get();
        let next = old.next.get();
        old.unlink();

        match prev {
            Some(prev) => prev.set_next(rep_head),
            None => {
                rep_head.prev.set(None);
                self.head.set(Some(rep_head));
            }
        }
        match next {
            Some(next) => rep_tail.set_next(next),
            None => {
                rep_tail.next.set(None);
                self.tail.set(Some(rep_tail));
            }
        }
        replacement.head.set(None);
        replacement.tail.set(None);
    }

    pub fn iter(&self) -> Iter<'a> {
        Iter { next: self.head.get() }
    }
}

impl<'a> IntoIterator for &LinkedIr<'a> {
    type Item = &'a ParserIr<'a>;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct Iter<'a> {
    next: Option<&'a ParserIr<'a>>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a ParserIr<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next?;
        self.next = node.next();
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gta3c_interface::{BytePos, Span};

    fn sp() -> Span {
        Span::new(BytePos(0), BytePos(1))
    }

    #[test]
    fn builds_command_with_args() {
        let arena = Arena::new();
        let node =
            ParserIrBuilder::new(&arena).command("wait", sp()).arg_int(100, sp()).build();
        let command = node.command.unwrap();
        assert_eq!(command.name, "WAIT");
        assert_eq!(command.args.len(), 1);
        assert_eq!(command.args[0].value, ArgumentValue::Int(100));
    }

    #[test]
    fn list_preserves_order() {
        let arena = Arena::new();
        let list = LinkedIr::new();
        for name in ["a", "b", "c"] {
            list.push_back(ParserIrBuilder::new(&arena).command(name, sp()).build());
        }
        let names: Vec<_> = list.iter().map(|n| n.command.unwrap().name).collect();
        assert_eq!(names, ["A", "B", "C"]);
    }

    #[test]
    fn splice_front_moves_nodes() {
        let arena = Arena::new();
        let main = LinkedIr::new();
        main.push_back(ParserIrBuilder::new(&arena).command("second", sp()).build());

        let prelude = LinkedIr::new();
        prelude.push_back(ParserIrBuilder::new(&arena).command("first", sp()).build());

        main.splice_front(&prelude);
        assert!(prelude.is_empty());
        let names: Vec<_> = main.iter().map(|n| n.command.unwrap().name).collect();
        assert_eq!(names, ["FIRST", "SECOND"]);
    }

    #[test]
    fn replace_substitutes_node_in_place() {
        let arena = Arena::new();
        let list = LinkedIr::new();
        let a = ParserIrBuilder::new(&arena).command("a", sp()).build();
        let repeat = ParserIrBuilder::new(&arena).command("repeat", sp()).build();
        let c = ParserIrBuilder::new(&arena).command("c", sp()).build();
        list.push_back(a);
        list.push_back(repeat);
        list.push_back(c);

        let expansion = LinkedIr::new();
        expansion.push_back(ParserIrBuilder::new(&arena).command("x1", sp()).build());
        expansion.push_back(ParserIrBuilder::new(&arena).command("x2", sp()).build());

        list.replace(repeat, &expansion);
        let names: Vec<_> = list.iter().map(|n| n.command.unwrap().name).collect();
        assert_eq!(names, ["A", "X1", "X2", "C"]);
    }
}
