//! The token definition for the FIQL filter grammar.

/// A token is a single unit of the filter expression, with a specific kind and location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub span: Span,
}

/// The kind of a token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind<'a> {
    /// A run of text: a property name or a comparison value.
    Text(&'a str),

    // Comparison operators
    Eq,              // ==
    NotEq,           // !=
    Lt,              // =lt=
    Le,              // =le=
    Gt,              // =gt=
    Ge,              // =ge=
    Custom(&'a str), // any other =tok= operator, kept verbatim

    // Combinators
    Semicolon, // ; (AND)
    Comma,     // , (OR)

    // Punctuation
    LParen, // (
    RParen, // )

    // Special
    Illegal, // An illegal/unknown character
    Eof,     // End of input
}

/// Represents a span in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// The starting byte offset.
    pub start: usize,
    /// The ending byte offset.
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}
