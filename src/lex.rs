use std::fmt::{Debug, Display, Formatter};

/// A single lexeme produced by the tokenizer: a token value plus the byte
/// range `[start, end)` in the original input it was matched from.
#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq)]
pub struct Lex<TToken> {
    pub token: TToken,
    pub start: usize,
    pub end: usize,
}

impl<TToken> Lex<TToken> {
    pub fn new(token: TToken, start: usize, end: usize) -> Self {
        Self { token, start, end }
    }
}

impl<TToken: Debug> Display for Lex<TToken> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("")
            .field(&self.token)
            .field(&self.start)
            .field(&self.end)
            .finish()
    }
}
