use crate::position::Position;
use std::fmt::{Debug, Display, Formatter};

/// Errors raised while turning raw tag source into a [`Tag`](crate::ast::Tag):
/// the grammar layer and the static validator that runs immediately after
/// it.
///
/// Both kinds are fatal at the point they are raised; this engine never
/// recovers from a malformed tag and never attempts to continue parsing
/// past the first mismatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The grammar could not continue at `start`; `message` follows the
    /// `"expected X[, Y, ...]"` convention, listing the production names
    /// that could legally have appeared.
    Grammar {
        message: String,
        start: usize,
        end: usize,
        line_col: Position,
    },
    /// The static validator rejected an otherwise grammatical tree, e.g. a
    /// flag name supplied more than once.
    Flag {
        message: String,
        start: usize,
        end: usize,
        line_col: Position,
    },
}

impl ParseError {
    pub fn grammar(message: impl Into<String>, start: usize, end: usize, line_col: Position) -> Self {
        ParseError::Grammar {
            message: message.into(),
            start,
            end,
            line_col,
        }
    }

    pub fn flag(message: impl Into<String>, start: usize, end: usize, line_col: Position) -> Self {
        ParseError::Flag {
            message: message.into(),
            start,
            end,
            line_col,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ParseError::Grammar { message, .. } | ParseError::Flag { message, .. } => message,
        }
    }

    pub fn span(&self) -> (usize, usize) {
        match self {
            ParseError::Grammar { start, end, .. } | ParseError::Flag { start, end, .. } => {
                (*start, *end)
            }
        }
    }

    pub fn line_col(&self) -> Position {
        match self {
            ParseError::Grammar { line_col, .. } | ParseError::Flag { line_col, .. } => *line_col,
        }
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Grammar { message, line_col, .. } => {
                write!(f, "SyntaxError: {} at {}", message, line_col)
            }
            ParseError::Flag { message, line_col, .. } => {
                write!(f, "SyntaxError: {} at {}", message, line_col)
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// Errors raised while lowering a validated [`Tag`](crate::ast::Tag) into a
/// [`CompiledCall`](crate::compiler::CompiledCall), or while invoking one.
///
/// `E` is the embedder's own callback error type; a [`CallbackError`]
/// wraps it unchanged rather than flattening it to a string, so a caller
/// invoking `invoke` can downcast or match on their own error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError<E> {
    /// A positional argument (or positional-producing spread) was scheduled
    /// after a keyword-producing emission, either discovered statically at
    /// compile time or deferred to `invoke` because the spread kind of a
    /// `...var` attribute depends on the runtime value of `var`.
    Order {
        message: String,
        start: usize,
        end: usize,
        line_col: Position,
    },
    /// A `*`/`**`/`...` spread was applied to a runtime value that does not
    /// satisfy the iteration contract the spread marker requires.
    SpreadType {
        message: String,
        start: usize,
        end: usize,
        line_col: Position,
    },
    /// One of the four resolution callbacks failed; surfaced unchanged.
    Callback(E),
}

impl<E> CompileError<E> {
    pub fn order(message: impl Into<String>, start: usize, end: usize, line_col: Position) -> Self {
        CompileError::Order {
            message: message.into(),
            start,
            end,
            line_col,
        }
    }

    pub fn spread_type(
        message: impl Into<String>,
        start: usize,
        end: usize,
        line_col: Position,
    ) -> Self {
        CompileError::SpreadType {
            message: message.into(),
            start,
            end,
            line_col,
        }
    }
}

/// The static half of [`CompileError::Order`], raised by
/// [`compile_tag`](crate::compiler::compile_tag) before any context or
/// callback bundle exists — so it cannot yet be generic over the
/// embedder's callback error type `E`.
///
/// Converts into any `CompileError<E>` via [`From`], since a compile-time
/// failure can never be the `Callback(E)` variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileTimeError {
    pub message: String,
    pub start: usize,
    pub end: usize,
    pub line_col: Position,
}

impl CompileTimeError {
    pub fn order(message: impl Into<String>, start: usize, end: usize, line_col: Position) -> Self {
        Self {
            message: message.into(),
            start,
            end,
            line_col,
        }
    }
}

impl Display for CompileTimeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SyntaxError: {} at {}", self.message, self.line_col)
    }
}

impl std::error::Error for CompileTimeError {}

impl<E> From<CompileTimeError> for CompileError<E> {
    fn from(err: CompileTimeError) -> Self {
        CompileError::Order {
            message: err.message,
            start: err.start,
            end: err.end,
            line_col: err.line_col,
        }
    }
}

impl<E: Display> Display for CompileError<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileError::Order { message, line_col, .. } => {
                write!(f, "SyntaxError: {} at {}", message, line_col)
            }
            CompileError::SpreadType { message, line_col, .. } => {
                write!(f, "TypeError: {} at {}", message, line_col)
            }
            CompileError::Callback(err) => write!(f, "{}", err),
        }
    }
}

impl<E: Display + Debug> std::error::Error for CompileError<E> {}
