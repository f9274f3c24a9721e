//! Stage 1: turns `{% name attr* "/"? %}` source into a [`Tag`].
//!
//! This is a hand-written recursive-descent parser rather than a grammar
//! built from this crate's combinator productions: the grammar is small,
//! fixed, and has several context-sensitive disambiguation rules (greedy
//! `**value` parsing inside a dict item, whitespace-sensitive spread
//! markers at attribute level) that are far easier to get right, and keep
//! right, written directly against the token stream than composed from
//! generic backtracking combinators.

use crate::ast::{Tag, TagAttr, TagToken, TagValue, TagValueFilter, TagSyntax, ValueKind, Spread};
use crate::error::ParseError;
use crate::lex::Lex;
use crate::lexer::{self, Kind};
use crate::log::Log;
use crate::position::Code;
use std::collections::HashSet;

/// Parse a single tag expression.
///
/// `input` must begin with `{%` and end with `%}` with no leading or
/// trailing whitespace outside those delimiters. `flags` is the optional,
/// tag-specific set of identifiers that should be recognized as bare flags
/// rather than ordinary variable references.
pub fn parse_tag(input: &str, flags: Option<&HashSet<String>>) -> Result<Tag, ParseError> {
    let code = Code::from(input);

    if !input.starts_with("{%") {
        return Err(ParseError::grammar(
            "expected '{%'",
            0,
            0,
            code.obtain_position(0),
        ));
    }
    if !input.ends_with("%}") {
        let end = input.len();
        return Err(ParseError::grammar(
            "expected '%}'",
            end,
            end,
            code.obtain_position(end),
        ));
    }

    let tokens = lexer::tokenize(&code)?;
    let mut parser = Parser {
        code: &code,
        tokens,
        pos: 0,
        log: trace_level(),
    };
    let mut tag = parser.parse_tag_inner()?;
    crate::validator::validate(&mut tag, flags)?;
    Ok(tag)
}

/// The tracing verbosity for [`Parser::parse_atom`]'s production choice.
/// Opt in during local debugging with `TAG_CALL_TRACE_PARSER=1`; compiled
/// out entirely in release builds regardless, matching [`Log`]'s own
/// `cfg(debug_assertions)` gate.
fn trace_level() -> Log<&'static str> {
    #[cfg(debug_assertions)]
    {
        if std::env::var_os("TAG_CALL_TRACE_PARSER").is_some() {
            return Log::Verbose("atom");
        }
    }
    Log::None
}

struct Parser<'c> {
    code: &'c Code<'c>,
    tokens: Vec<Lex<Kind>>,
    pos: usize,
    log: Log<&'static str>,
}

impl<'c> Parser<'c> {
    fn cur(&self) -> Lex<Kind> {
        self.tokens[self.pos]
    }

    fn skip_insignificant(&mut self) {
        while matches!(self.tokens[self.pos].token, Kind::Space | Kind::Comment) {
            self.pos += 1;
        }
    }

    fn bump(&mut self) -> Lex<Kind> {
        self.skip_insignificant();
        let lex = self.tokens[self.pos];
        self.pos += 1;
        lex
    }

    fn expect(&mut self, kind: Kind, expected: &str) -> Result<Lex<Kind>, ParseError> {
        self.skip_insignificant();
        let lex = self.tokens[self.pos];
        if lex.token == kind {
            self.pos += 1;
            Ok(lex)
        } else {
            Err(self.grammar_error_at(lex.start, lex.end, expected))
        }
    }

    fn grammar_error_at(&self, start: usize, end: usize, expected: &str) -> ParseError {
        ParseError::grammar(
            format!("expected {}", expected),
            start,
            end,
            self.code.obtain_position(start),
        )
    }

    fn grammar_error_at_current(&self, expected: &str) -> ParseError {
        let lex = self.cur();
        self.grammar_error_at(lex.start, lex.end, expected)
    }

    fn text(&self, start: usize, end: usize) -> &'c str {
        self.code.slice(start, end)
    }

    fn make_token(&self, lex: Lex<Kind>) -> TagToken {
        TagToken::new(
            self.text(lex.start, lex.end),
            lex.start,
            lex.end,
            self.code.obtain_position(lex.start),
        )
    }

    fn parse_tag_inner(&mut self) -> Result<Tag, ParseError> {
        let tag_open = self.expect(Kind::TagOpen, "value")?;
        let name_lex = self.expect(Kind::Ident, "attribute")?;
        let name = self.make_token(name_lex);

        let mut attrs = Vec::new();
        let mut is_self_closing = false;

        loop {
            self.skip_insignificant();
            match self.cur().token {
                Kind::TagClose => break,
                Kind::Slash => {
                    self.bump();
                    is_self_closing = true;
                    self.skip_insignificant();
                    if self.cur().token != Kind::TagClose {
                        return Err(self.grammar_error_at_current("self_closing_slash, attribute, or COMMENT"));
                    }
                    break;
                }
                Kind::Eof => {
                    return Err(self.grammar_error_at_current("self_closing_slash, attribute, or COMMENT"))
                }
                _ => attrs.push(self.parse_attr()?),
            }
        }

        let tag_close =
            self.expect(Kind::TagClose, "self_closing_slash, attribute, or COMMENT")?;
        self.skip_insignificant();
        if self.cur().token != Kind::Eof {
            return Err(self.grammar_error_at_current("self_closing_slash, attribute, or COMMENT"));
        }

        Ok(Tag {
            line_col: name.line_col,
            name,
            attrs,
            is_self_closing,
            syntax: TagSyntax::DJANGO,
            start_index: tag_open.start,
            end_index: tag_close.end,
        })
    }

    fn parse_attr(&mut self) -> Result<TagAttr, ParseError> {
        self.skip_insignificant();
        let start = self.cur().start;

        if self.cur().token == Kind::Ident {
            let ident_lex = self.cur();
            let mut lookahead = self.pos + 1;
            while matches!(self.tokens[lookahead].token, Kind::Space | Kind::Comment) {
                lookahead += 1;
            }
            if self.tokens[lookahead].token == Kind::Equals {
                self.pos = lookahead + 1;
                let key = self.make_token(ident_lex);
                let value = self.parse_value(true)?;
                let end_index = value.end_index;
                let line_col = key.line_col;
                return Ok(TagAttr {
                    key: Some(key),
                    value,
                    is_flag: false,
                    start_index: start,
                    end_index,
                    line_col,
                });
            }
        }

        let value = self.parse_posattr()?;
        let end_index = value.end_index;
        let line_col = value.line_col;
        Ok(TagAttr {
            key: None,
            value,
            is_flag: false,
            start_index: start,
            end_index,
            line_col,
        })
    }

    /// `posattr := spread_value | value`, with the attribute-level
    /// whitespace-adjacency rule: a spread marker here must be
    /// byte-adjacent to the value it spreads.
    fn parse_posattr(&mut self) -> Result<TagValue, ParseError> {
        self.skip_insignificant();
        let lex = self.cur();
        let spread = match lex.token {
            Kind::Ellipsis => Some(Spread::Ellipsis),
            Kind::Star => Some(Spread::Star),
            Kind::DoubleStar => Some(Spread::DoubleStar),
            _ => None,
        };

        let Some(spread) = spread else {
            return self.parse_value(true);
        };

        let marker = self.bump();
        if matches!(self.cur().token, Kind::Space | Kind::Comment) {
            return Err(self.grammar_error_at_current("value"));
        }

        let mut value = self.parse_value(true)?;
        let kind_ok = match spread {
            Spread::Ellipsis => {
                value.kind == ValueKind::LIST
                    || value.kind == ValueKind::DICT
                    || value.kind == ValueKind::VARIABLE
            }
            Spread::Star => value.kind == ValueKind::LIST,
            Spread::DoubleStar => value.kind == ValueKind::DICT,
        };
        if !kind_ok {
            return Err(self.grammar_error_at(marker.start, value.end_index, "value"));
        }

        value.start_index = marker.start;
        value.line_col = self.code.obtain_position(marker.start);
        value.spread = Some(spread);
        Ok(value)
    }

    /// `value := atom filter*`. `allow_filter_arg` is false while parsing
    /// the value already sitting inside a filter argument position, so
    /// that a second `:` cannot appear at the same nesting level.
    fn parse_value(&mut self, allow_filter_arg: bool) -> Result<TagValue, ParseError> {
        let atom = self.parse_atom()?;
        let mut filters = Vec::new();
        loop {
            self.skip_insignificant();
            if self.cur().token == Kind::Pipe {
                filters.push(self.parse_filter(allow_filter_arg)?);
            } else {
                break;
            }
        }
        let end_index = filters.last().map(|f| f.end_index).unwrap_or(atom.end_index);
        Ok(TagValue {
            end_index,
            filters,
            ..atom
        })
    }

    fn parse_filter(&mut self, allow_arg: bool) -> Result<TagValueFilter, ParseError> {
        let pipe = self.expect(Kind::Pipe, "filter")?;
        self.skip_insignificant();
        let name_lex = self.expect(Kind::Ident, "filter_name or COMMENT")?;
        let name = self.make_token(name_lex);

        self.skip_insignificant();
        let mut arg = None;
        if self.cur().token == Kind::Colon {
            if !allow_arg {
                return Err(self.grammar_error_at_current("filter_chain_noarg"));
            }
            self.bump();
            arg = Some(self.parse_value(false)?);
        }

        let end_index = arg.as_ref().map(|a| a.end_index).unwrap_or(name.end_index);
        Ok(TagValueFilter {
            token: name,
            arg,
            start_index: pipe.start,
            end_index,
            line_col: self.code.obtain_position(pipe.start),
        })
    }

    fn parse_atom(&mut self) -> Result<TagValue, ParseError> {
        self.skip_insignificant();
        let lex = self.cur();
        let result = match lex.token {
            Kind::Str => {
                self.bump();
                let text = self.text(lex.start, lex.end);
                let inner = &text[1..text.len() - 1];
                let kind = if is_template_string(inner) {
                    ValueKind::TEMPLATE_STRING
                } else {
                    ValueKind::STRING
                };
                Ok(self.leaf_value(lex, kind))
            }
            Kind::Int => {
                self.bump();
                Ok(self.leaf_value(lex, ValueKind::INT))
            }
            Kind::Float => {
                self.bump();
                Ok(self.leaf_value(lex, ValueKind::FLOAT))
            }
            Kind::Ident => {
                self.bump();
                let text = self.text(lex.start, lex.end);
                match text {
                    "true" | "false" => Ok(self.leaf_value(lex, ValueKind::BOOL)),
                    "none" | "null" => Ok(self.leaf_value(lex, ValueKind::NONE)),
                    "_" if self.cur().token == Kind::OpenParen && self.cur().start == lex.end => {
                        self.parse_translation(lex)
                    }
                    _ => Ok(self.leaf_value(lex, ValueKind::VARIABLE)),
                }
            }
            Kind::OpenBracket => self.parse_list(),
            Kind::OpenBrace => self.parse_dict(),
            _ => Err(self.grammar_error_at(lex.start, lex.end, "value or COMMENT")),
        };

        match &result {
            Ok(value) => self.log.trace_production(lex.start, true, value.kind.as_str(), self.code),
            Err(_) => self.log.trace_production(lex.start, false, "atom", self.code),
        }
        result
    }

    fn leaf_value(&self, lex: Lex<Kind>, kind: ValueKind) -> TagValue {
        let line_col = self.code.obtain_position(lex.start);
        TagValue {
            token: TagToken::new(self.text(lex.start, lex.end), lex.start, lex.end, line_col),
            children: Vec::new(),
            kind,
            spread: None,
            filters: Vec::new(),
            start_index: lex.start,
            end_index: lex.end,
            line_col,
        }
    }

    /// `"_(" STRING ")"`; `underscore` has already been consumed and is
    /// known to be byte-adjacent to the `(` that follows it.
    fn parse_translation(&mut self, underscore: Lex<Kind>) -> Result<TagValue, ParseError> {
        self.bump(); // '('
        self.skip_insignificant();
        let str_lex = self.expect(Kind::Str, "value")?;
        let raw = self.text(str_lex.start, str_lex.end);
        self.skip_insignificant();
        let close = self.expect(Kind::CloseParen, "value")?;

        let start_index = underscore.start;
        let end_index = close.end;
        let line_col = self.code.obtain_position(start_index);
        let canonical = format!("_({})", raw);

        Ok(TagValue {
            token: TagToken::new(canonical, start_index, end_index, line_col),
            children: Vec::new(),
            kind: ValueKind::TRANSLATION,
            spread: None,
            filters: Vec::new(),
            start_index,
            end_index,
            line_col,
        })
    }

    /// `list := "[" (list_item ("," list_item)* ","?)? "]"`
    fn parse_list(&mut self) -> Result<TagValue, ParseError> {
        let open = self.bump();
        let mut children = Vec::new();

        self.skip_insignificant();
        if self.cur().token != Kind::CloseBracket {
            loop {
                children.push(self.parse_list_item()?);
                self.skip_insignificant();
                if self.cur().token == Kind::Comma {
                    self.bump();
                    self.skip_insignificant();
                    if self.cur().token == Kind::CloseBracket {
                        break;
                    }
                    continue;
                }
                break;
            }
        }

        let close = self.expect(Kind::CloseBracket, "value")?;
        Ok(self.container_value(open, close, ValueKind::LIST, children))
    }

    /// `list_item := ("*" value) | value` — `"**"` is rejected here.
    fn parse_list_item(&mut self) -> Result<TagValue, ParseError> {
        self.skip_insignificant();
        match self.cur().token {
            Kind::Star => {
                let marker = self.bump();
                self.skip_insignificant();
                let mut value = self.parse_value(true)?;
                value.start_index = marker.start;
                value.line_col = self.code.obtain_position(marker.start);
                value.spread = Some(Spread::Star);
                Ok(value)
            }
            Kind::DoubleStar => Err(self.grammar_error_at_current("value")),
            _ => self.parse_value(true),
        }
    }

    /// `dict := "{" (dict_item ("," dict_item)* ","?)? "}"`
    fn parse_dict(&mut self) -> Result<TagValue, ParseError> {
        let open = self.bump();
        let mut children = Vec::new();

        self.skip_insignificant();
        if self.cur().token != Kind::CloseBrace {
            loop {
                self.parse_dict_item(&mut children)?;
                self.skip_insignificant();
                if self.cur().token == Kind::Comma {
                    self.bump();
                    self.skip_insignificant();
                    if self.cur().token == Kind::CloseBrace {
                        break;
                    }
                    continue;
                }
                break;
            }
        }

        let close = self.expect(Kind::CloseBrace, "dict_item_spread or COMMENT")?;
        Ok(self.container_value(open, close, ValueKind::DICT, children))
    }

    /// `dict_item := ("**" value) | (dict_key ":" value)`. A `**value` is
    /// parsed greedily: its own filter chain is consumed as part of the
    /// single spread item rather than being reinterpreted once a `:` is
    /// seen later.
    fn parse_dict_item(&mut self, children: &mut Vec<TagValue>) -> Result<(), ParseError> {
        self.skip_insignificant();
        match self.cur().token {
            Kind::DoubleStar => {
                let marker = self.bump();
                self.skip_insignificant();
                let mut value = self.parse_value(true)?;
                value.start_index = marker.start;
                value.line_col = self.code.obtain_position(marker.start);
                value.spread = Some(Spread::DoubleStar);
                children.push(value);
                Ok(())
            }
            Kind::Star => Err(self.grammar_error_at_current("dict_key")),
            _ => {
                let key = self.parse_dict_key()?; // dict_key := value, filters no-arg
                self.skip_insignificant();
                self.expect(Kind::Colon, "filter_noarg or COMMENT")?;
                let value = self.parse_value(true)?;
                children.push(key);
                children.push(value);
                Ok(())
            }
        }
    }

    /// `dict_key := value`, except a key's filter chain may never take an
    /// argument: the first `:` following a key's filter name is always the
    /// `dict_item`'s own separator, never that filter's argument position.
    /// `"key"|filter:"arg": "value"` therefore parses as key `"key"|filter`
    /// (no arg) and value `"arg"`, which then fails downstream because the
    /// dict item expects a comma or closing brace, not another `:`.
    fn parse_dict_key(&mut self) -> Result<TagValue, ParseError> {
        let atom = self.parse_atom()?;
        let mut filters = Vec::new();
        loop {
            self.skip_insignificant();
            if self.cur().token == Kind::Pipe {
                filters.push(self.parse_key_filter()?);
            } else {
                break;
            }
        }
        let end_index = filters.last().map(|f| f.end_index).unwrap_or(atom.end_index);
        Ok(TagValue {
            end_index,
            filters,
            ..atom
        })
    }

    /// `|` IDENT, with no argument ever consumed — see [`parse_dict_key`].
    fn parse_key_filter(&mut self) -> Result<TagValueFilter, ParseError> {
        let pipe = self.expect(Kind::Pipe, "filter")?;
        self.skip_insignificant();
        let name_lex = self.expect(Kind::Ident, "filter_name or COMMENT")?;
        let name = self.make_token(name_lex);
        Ok(TagValueFilter {
            end_index: name.end_index,
            start_index: pipe.start,
            line_col: self.code.obtain_position(pipe.start),
            token: name,
            arg: None,
        })
    }

    fn container_value(
        &self,
        open: Lex<Kind>,
        close: Lex<Kind>,
        kind: ValueKind,
        children: Vec<TagValue>,
    ) -> TagValue {
        let line_col = self.code.obtain_position(open.start);
        TagValue {
            token: TagToken::new(self.text(open.start, close.end), open.start, close.end, line_col),
            children,
            kind,
            spread: None,
            filters: Vec::new(),
            start_index: open.start,
            end_index: close.end,
            line_col,
        }
    }
}

fn is_template_string(inner: &str) -> bool {
    ["{%", "%}", "{{", "}}", "{#", "#}"]
        .iter()
        .any(|marker| inner.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_tag() {
        let tag = parse_tag("{% c %}", None).unwrap();
        assert_eq!(tag.name.token, "c");
        assert!(tag.attrs.is_empty());
        assert!(!tag.is_self_closing);
        assert_eq!(tag.syntax, TagSyntax::DJANGO);
    }

    #[test]
    fn rejects_missing_leading_delimiter() {
        let err = parse_tag("c %}", None).unwrap_err();
        assert!(matches!(err, ParseError::Grammar { .. }));
    }

    #[test]
    fn self_closing_slash_must_precede_close() {
        assert!(parse_tag("{% c / %}", None).unwrap().is_self_closing);
        assert!(parse_tag("{% c / key=val %}", None).is_err());
    }

    #[test]
    fn string_with_tag_markers_is_a_template_string() {
        let tag = parse_tag("{% c '{% lorem w 4 %}' %}", None).unwrap();
        assert_eq!(tag.attrs[0].value.kind, ValueKind::TEMPLATE_STRING);
    }

    #[test]
    fn translation_canonicalizes_without_inner_padding() {
        let tag = parse_tag(r#"{% c _( "hi" ) %}"#, None).unwrap();
        let value = &tag.attrs[0].value;
        assert_eq!(value.kind, ValueKind::TRANSLATION);
        assert_eq!(value.token.token, "_(\"hi\")");
    }

    #[test]
    fn bare_underscore_is_a_variable() {
        let tag = parse_tag("{% c _ %}", None).unwrap();
        assert_eq!(tag.attrs[0].value.kind, ValueKind::VARIABLE);
        assert_eq!(tag.attrs[0].value.token.token, "_");
    }

    #[test]
    fn dict_spread_value_as_dict_value_is_rejected() {
        let err = parse_tag(r#"{% c data={"key": **spread} %}"#, None).unwrap_err();
        assert!(matches!(err, ParseError::Grammar { .. }));
    }

    #[test]
    fn ellipsis_on_kwattr_is_rejected() {
        let err = parse_tag("{% c key=...{'a':'b'} %}", None).unwrap_err();
        assert!(matches!(err, ParseError::Grammar { .. }));
    }

    #[test]
    fn attribute_level_spread_requires_adjacent_value() {
        let err = parse_tag("{% c ... attrs %}", None).unwrap_err();
        assert!(matches!(err, ParseError::Grammar { .. }));
    }

    #[test]
    fn dict_key_filter_cannot_take_an_argument() {
        // The first `:` after a key's filter name is always the dict
        // item's key/value separator, never that filter's argument marker.
        let err = parse_tag(r#"{% c data={"key"|filter:"arg": "value"} %}"#, None).unwrap_err();
        assert!(matches!(err, ParseError::Grammar { .. }));
    }

    #[test]
    fn dict_key_filter_with_no_argument_is_allowed() {
        let tag = parse_tag(r#"{% c data={"key"|filter: "value"} %}"#, None).unwrap();
        let dict = &tag.attrs[0].value;
        let key = &dict.children[0];
        assert_eq!(key.filters.len(), 1);
        assert!(key.filters[0].arg.is_none());
    }

    #[test]
    fn greedy_dict_spread_consumes_its_own_filter_chain() {
        let tag = parse_tag("{% c data={**spread|abc:123} %}", None).unwrap();
        let dict = &tag.attrs[0].value;
        assert_eq!(dict.children.len(), 1);
        let spread = &dict.children[0];
        assert_eq!(spread.spread, Some(Spread::DoubleStar));
        assert_eq!(spread.filters.len(), 1);
    }

    #[test]
    fn comment_does_not_perturb_surrounding_spans() {
        let tag = parse_tag("{% component {# comment #} val %}", None).unwrap();
        let value = &tag.attrs[0].value;
        assert_eq!(value.start_index, 27);
        assert_eq!(value.end_index, 30);
    }
}
