//! The token contract exported to the (external) scanner and parser.
//!
//! The scanner and parser themselves are out of scope for this crate; this
//! module only fixes the shape of the stream they hand to whatever builds
//! [`ParserIR`](crate::parser_ir::ParserIr) out of it, so that a lowering
//! pass or a test fixture can construct tokens without depending on a real
//! scanner implementation.

use gta3c_interface::Span;

/// A lexical category of the GTA3script token stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// An identifier, keyword, or command name.
    Word,
    /// A quoted string literal.
    String,
    /// Inter-token whitespace, preserved only so column information stays
    /// accurate; never reaches the parser as a node.
    Whitespace,
    /// End of a logical line.
    EndOfLine,
    Equal,
    PlusEqual,
    MinusEqual,
    StarEqual,
    SlashEqual,
    PlusEqualAt,
    MinusEqualAt,
    EqualHash,
    MinusMinus,
    PlusPlus,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Plus,
    Minus,
    Star,
    Slash,
    PlusAt,
    MinusAt,
}

impl TokenKind {
    /// Returns the operator spelling, or `None` for non-operator kinds.
    pub fn as_op_str(self) -> Option<&'static str> {
        use TokenKind::*;
        Some(match self {
            Equal => "=",
            PlusEqual => "+=",
            MinusEqual => "-=",
            StarEqual => "*=",
            SlashEqual => "/=",
            PlusEqualAt => "+=@",
            MinusEqualAt => "-=@",
            EqualHash => "=#",
            MinusMinus => "--",
            PlusPlus => "++",
            Less => "<",
            LessEqual => "<=",
            Greater => ">",
            GreaterEqual => ">=",
            Plus => "+",
            Minus => "-",
            Star => "*",
            Slash => "/",
            PlusAt => "+@",
            MinusAt => "-@",
            Word | String | Whitespace | EndOfLine => return None,
        })
    }
}

/// A single token with its source range.
#[derive(Clone, Copy, Debug)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub span: Span,
}

impl<'a> Token<'a> {
    pub fn new(kind: TokenKind, text: &'a str, span: Span) -> Self {
        Self { kind, text, span }
    }
}
