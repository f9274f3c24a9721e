//! Lexical analysis: turns raw tag source into a flat stream of [`Lex<Kind>`]
//! tokens, in the same incremental, longest-match-wins style as the
//! tokenizer this crate's grammar engine was built from (see
//! [`FieldTree`] and the regex-driven matchers below), just specialized to
//! this engine's one fixed alphabet instead of being generic over an
//! arbitrary token type.
//!
//! Whitespace and `{# ... #}` comments are tokenized like everything else
//! (as [`Kind::Space`] / [`Kind::Comment`]) rather than silently discarded,
//! because the grammar needs to tell the difference between "any amount of
//! insignificant material may separate these two tokens" (true almost
//! everywhere) and "these two tokens must be byte-adjacent" (true for a
//! spread marker at attribute level, and for the `_` `(` pair that opens a
//! translation). Keeping them in the stream lets the parser make that
//! distinction by simply not skipping.

use crate::error::ParseError;
use crate::field_tree::FieldTree;
use crate::lex::Lex;
use crate::log::Log;
use crate::position::Code;
use regex::bytes::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Space,
    Comment,
    Ident,
    Int,
    Float,
    Str,
    OpenBrace,
    CloseBrace,
    OpenBracket,
    CloseBracket,
    OpenParen,
    CloseParen,
    Comma,
    Colon,
    Equals,
    Pipe,
    Slash,
    Star,
    DoubleStar,
    Ellipsis,
    TagOpen,
    TagClose,
    Eof,
}

impl Kind {
    pub fn is_structural(&self) -> bool {
        !matches!(self, Kind::Space | Kind::Comment)
    }
}

struct Lexer {
    punctuations: FieldTree<Kind>,
    space: Regex,
    comment: Regex,
    ident: Regex,
    number: Regex,
    single_quoted: Regex,
    double_quoted: Regex,
}

impl Lexer {
    fn new() -> Self {
        let mut punctuations = FieldTree::new();
        for (lit, kind) in [
            ("{%", Kind::TagOpen),
            ("%}", Kind::TagClose),
            ("{", Kind::OpenBrace),
            ("}", Kind::CloseBrace),
            ("[", Kind::OpenBracket),
            ("]", Kind::CloseBracket),
            ("(", Kind::OpenParen),
            (")", Kind::CloseParen),
            (",", Kind::Comma),
            (":", Kind::Colon),
            ("=", Kind::Equals),
            ("|", Kind::Pipe),
            ("/", Kind::Slash),
            ("...", Kind::Ellipsis),
            ("**", Kind::DoubleStar),
            ("*", Kind::Star),
        ] {
            punctuations
                .insert(lit.as_bytes(), kind)
                .unwrap_or_else(|_| panic!("duplicate punctuation literal '{}'", lit));
        }

        Self {
            punctuations,
            space: Regex::new(r"^[ \t\r\n]+").unwrap(),
            comment: Regex::new(r"(?s)^\{#.*?#\}").unwrap(),
            ident: Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*").unwrap(),
            number: Regex::new(r"^[0-9]+(\.[0-9]+)?").unwrap(),
            single_quoted: Regex::new(r"^'([^'\\\r\n]|\\.)*'").unwrap(),
            double_quoted: Regex::new(r#"^"([^"\\\r\n]|\\.)*""#).unwrap(),
        }
    }

    fn consume(&self, code: &Code, pointer: usize) -> Option<Lex<Kind>> {
        let rest = &code.value[pointer..];

        if let Some(m) = self.comment.find(rest) {
            return Some(Lex::new(Kind::Comment, pointer, pointer + m.end()));
        }
        if let Some(m) = self.space.find(rest) {
            return Some(Lex::new(Kind::Space, pointer, pointer + m.end()));
        }
        // Punctuation is tried before identifiers/numbers so that multi-char
        // markers like `...`/`**` always win over a lone `.`/`*` prefix.
        if let Some((kind, len)) = self.punctuations.find(rest) {
            if len > 0 {
                return Some(Lex::new(kind, pointer, pointer + len));
            }
        }
        if let Some(m) = self.double_quoted.find(rest) {
            return Some(Lex::new(Kind::Str, pointer, pointer + m.end()));
        }
        if let Some(m) = self.single_quoted.find(rest) {
            return Some(Lex::new(Kind::Str, pointer, pointer + m.end()));
        }
        if let Some(m) = self.number.find(rest) {
            let text = &rest[m.start()..m.end()];
            let kind = if text.contains(&b'.') { Kind::Float } else { Kind::Int };
            return Some(Lex::new(kind, pointer, pointer + m.end()));
        }
        if let Some(m) = self.ident.find(rest) {
            return Some(Lex::new(Kind::Ident, pointer, pointer + m.end()));
        }
        None
    }
}

/// Tokenize `code` end to end, appending a zero-width [`Kind::Eof`] token.
///
/// Every lexeme attempt is traced through [`Log::trace_lexeme`] at
/// [`Log::Verbose`] — a no-op in release builds, and in debug builds only
/// printed when the caller has opted in by building with
/// `tag_call_trace_lexer` (see [`trace_level`]).
pub fn tokenize(code: &Code) -> Result<Vec<Lex<Kind>>, ParseError> {
    let lexer = Lexer::new();
    let log = trace_level();
    let mut stream = Vec::new();
    let mut pointer = 0usize;
    let eof_pointer = code.len();

    while pointer < eof_pointer {
        let lex = lexer.consume(code, pointer);
        log.trace_lexeme(pointer, lex.as_ref(), code);
        match lex {
            Some(lex) => {
                debug_assert_eq!(lex.start, pointer);
                pointer = lex.end;
                stream.push(lex);
            }
            None => {
                return Err(ParseError::grammar(
                    "unrecognized character",
                    pointer,
                    pointer + 1,
                    code.obtain_position(pointer),
                ));
            }
        }
    }

    stream.push(Lex::new(Kind::Eof, eof_pointer, eof_pointer));
    Ok(stream)
}

/// The tracing verbosity for [`tokenize`]. Opt in during local debugging by
/// setting `TAG_CALL_TRACE_LEXER=1`; compiled out entirely in release
/// builds regardless, matching [`Log`]'s own `cfg(debug_assertions)` gate.
fn trace_level() -> Log<&'static str> {
    #[cfg(debug_assertions)]
    {
        if std::env::var_os("TAG_CALL_TRACE_LEXER").is_some() {
            return Log::Verbose("lexer");
        }
    }
    Log::None
}
