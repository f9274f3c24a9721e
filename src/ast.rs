//! The typed tree produced by [`parse_tag`](crate::parser::parse_tag).
//!
//! Every node carries its own `start_index`/`end_index`/`line_col` rather
//! than a shared `Span` type, and owns its text as a `String` rather than
//! borrowing from the source, so that a [`Tag`] can outlive the input it
//! was parsed from.

use crate::position::Position;

/// A single lexical token retained in the AST: its exact source slice plus
/// its position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TagToken {
    pub token: String,
    pub start_index: usize,
    pub end_index: usize,
    pub line_col: Position,
}

impl TagToken {
    pub fn new(token: impl Into<String>, start_index: usize, end_index: usize, line_col: Position) -> Self {
        Self {
            token: token.into(),
            start_index,
            end_index,
            line_col,
        }
    }
}

/// The classification of a [`TagValue`], represented as a tagged string
/// (rather than a closed Rust enum) so that the wire form stays stable if a
/// new concrete kind is ever added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueKind(pub &'static str);

impl ValueKind {
    pub const STRING: ValueKind = ValueKind("string");
    pub const INT: ValueKind = ValueKind("int");
    pub const FLOAT: ValueKind = ValueKind("float");
    pub const BOOL: ValueKind = ValueKind("bool");
    pub const NONE: ValueKind = ValueKind("none");
    pub const VARIABLE: ValueKind = ValueKind("variable");
    pub const TRANSLATION: ValueKind = ValueKind("translation");
    pub const TEMPLATE_STRING: ValueKind = ValueKind("template_string");
    pub const LIST: ValueKind = ValueKind("list");
    pub const DICT: ValueKind = ValueKind("dict");

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The `syntax` tag attached to every parsed [`Tag`], represented the same
/// way as [`ValueKind`]. The only concrete value this engine produces is
/// [`TagSyntax::DJANGO`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TagSyntax(pub &'static str);

impl TagSyntax {
    pub const DJANGO: TagSyntax = TagSyntax("django");

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for TagSyntax {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A spread marker prefixing a value: `*`, `**`, or `...`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Spread {
    /// `*value` — legal as a list element prefix or as an attribute value
    /// prefix when the value is a list literal.
    Star,
    /// `**value` — legal as a dict item prefix or as an attribute value
    /// prefix when the value is a dict literal.
    DoubleStar,
    /// `...value` — legal only as the outer prefix of a positional
    /// attribute value, when the value is a list, a dict, or a variable.
    Ellipsis,
}

impl Spread {
    pub fn as_str(&self) -> &'static str {
        match self {
            Spread::Star => "*",
            Spread::DoubleStar => "**",
            Spread::Ellipsis => "...",
        }
    }

    pub fn byte_len(&self) -> usize {
        self.as_str().len()
    }
}

impl std::fmt::Display for Spread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A `|name` or `|name:arg` filter application.
///
/// `start_index` begins at the leading `|`; `token` names only the filter
/// itself (no `|`, no argument).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagValueFilter {
    pub token: TagToken,
    pub arg: Option<TagValue>,
    pub start_index: usize,
    pub end_index: usize,
    pub line_col: Position,
}

/// A value expression: a literal, a variable reference, a translation, a
/// template string, or a structured `list`/`dict` literal, optionally
/// spread-prefixed and optionally filtered.
///
/// `token` spans only the base atom — no spread marker, no filter
/// pipeline. The node's own `start_index`/`end_index` extend to cover the
/// spread marker (if any) through the last filter (if any); for a value
/// with neither, `token`'s span and the node's own span coincide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagValue {
    pub token: TagToken,
    pub children: Vec<TagValue>,
    pub kind: ValueKind,
    pub spread: Option<Spread>,
    pub filters: Vec<TagValueFilter>,
    pub start_index: usize,
    pub end_index: usize,
    pub line_col: Position,
}

/// One positional or keyword attribute inside a tag.
///
/// `key` is `None` for positional attributes (including flags and
/// spreads). `is_flag` is only ever set by the static validator; the
/// grammar itself cannot tell a flag apart from an ordinary bare variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagAttr {
    pub key: Option<TagToken>,
    pub value: TagValue,
    pub is_flag: bool,
    pub start_index: usize,
    pub end_index: usize,
    pub line_col: Position,
}

/// The root of a parsed tag: `{% name attr* "/"? %}`.
///
/// `line_col` is the name token's position, not the position of the
/// opening `{%` — an intentional asymmetry, while `start_index` still
/// points at the opening delimiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: TagToken,
    pub attrs: Vec<TagAttr>,
    pub is_self_closing: bool,
    pub syntax: TagSyntax,
    pub start_index: usize,
    pub end_index: usize,
    pub line_col: Position,
}
