//! Stage 2: lowers a validated [`Tag`] into a [`CompiledCall`] — an
//! immutable, reusable evaluation plan that can be invoked any number of
//! times against different contexts and callback bundles.
//!
//! Internally the compiler emits, per attribute, a flat sequence of [`Step`]
//! instructions in post-order over that attribute's value subtree; `invoke`
//! runs each attribute's steps on a small value stack and feeds the single
//! resulting value into the positional or keyword output buffer.

use std::collections::HashMap;

use crate::ast::{Spread, Tag, TagAttr, TagValue, ValueKind};
use crate::error::{CompileError, CompileTimeError};
use crate::position::Position;

/// The host value type the four resolution callbacks and the compiled
/// step machine operate on.
///
/// Runtime values are opaque to this engine except for the two iteration
/// contracts spreads rely on (`as_iterable`, `as_mapping`) and the literal
/// constructors needed to realize `Lit*`/`Build*` steps without the engine
/// ever inventing its own general-purpose value type.
pub trait Value: Clone {
    fn from_str(s: &str) -> Self;
    fn from_int(n: i64) -> Self;
    fn from_float(f: f64) -> Self;
    fn from_bool(b: bool) -> Self;
    fn none() -> Self;
    fn from_list(items: Vec<Self>) -> Self;
    fn from_pairs(pairs: Vec<(String, Self)>) -> Self;

    /// `Some` when this value satisfies the `iterable` contract used by
    /// `*`/`...list` spreads.
    fn as_iterable(&self) -> Option<Vec<Self>>;
    /// `Some` when this value satisfies the `mapping` contract used by
    /// `**`/`...dict` spreads.
    fn as_mapping(&self) -> Option<Vec<(String, Self)>>;
    /// A string key, used only to turn an evaluated `dict_key` value into
    /// the `String` key `from_pairs` expects. Separate from the two
    /// iteration contracts above, and narrower, because dict keys are not
    /// otherwise assumed to be string-shaped.
    fn as_key(&self) -> Option<String>;

    /// The runtime type name, used verbatim in `SpreadTypeError` messages.
    fn type_name(&self) -> &'static str;
}

/// The four resolution callbacks, bundled so a single [`CompiledCall`] can
/// be invoked with different bundles (see §9's design note: callbacks are
/// not embedded in the call itself).
pub struct Callbacks<'a, C, V, E> {
    pub variable: &'a dyn Fn(&C, &str) -> Result<V, E>,
    pub template_string: &'a dyn Fn(&C, &str) -> Result<V, E>,
    pub translation: &'a dyn Fn(&C, &str) -> Result<V, E>,
    pub filter: &'a dyn Fn(&C, &str, V, Option<V>) -> Result<V, E>,
}

#[derive(Debug, Clone)]
enum Step {
    LitString(String),
    LitInt(i64),
    LitFloat(f64),
    LitBool(bool),
    LitNone,
    ResolveVar(String),
    ResolveTemplateString(String),
    ResolveTranslation(String),
    ApplyFilter(String, bool),
    BuildList(Vec<bool>),
    BuildDict(Vec<DictSlot>),
}

#[derive(Debug, Clone, Copy)]
enum DictSlot {
    Pair,
    Spread,
}

#[derive(Debug, Clone)]
enum AttrKind {
    Positional,
    Keyword(String),
    SpreadPositional,
    SpreadKeyword,
    /// `...value` — the target may be a list, a dict, or a variable; only
    /// at runtime, once the value is resolved, is it known which of the
    /// two iteration contracts it satisfies. The order check for this
    /// attribute is therefore deferred to `invoke` (see §4.4/§9).
    SpreadEllipsis,
}

#[derive(Debug, Clone)]
struct CompiledAttr {
    kind: AttrKind,
    steps: Vec<Step>,
    start_index: usize,
    end_index: usize,
    line_col: Position,
}

/// The compiled, reusable evaluation plan produced by [`compile_tag`].
#[derive(Debug, Clone)]
pub struct CompiledCall {
    attrs: Vec<CompiledAttr>,
}

/// Accepts either a full [`Tag`] or a bare slice of [`TagAttr`], matching
/// the original's `Tag | list<Attr>` overload for callers that already
/// hold attributes detached from a parsed tag.
pub enum CompileInput<'a> {
    Tag(&'a Tag),
    Attrs(&'a [TagAttr]),
}

impl<'a> From<&'a Tag> for CompileInput<'a> {
    fn from(tag: &'a Tag) -> Self {
        CompileInput::Tag(tag)
    }
}

impl<'a> From<&'a [TagAttr]> for CompileInput<'a> {
    fn from(attrs: &'a [TagAttr]) -> Self {
        CompileInput::Attrs(attrs)
    }
}

impl<'a> From<&'a Vec<TagAttr>> for CompileInput<'a> {
    fn from(attrs: &'a Vec<TagAttr>) -> Self {
        CompileInput::Attrs(attrs.as_slice())
    }
}

/// Lower a [`Tag`] (or bare attribute list) into a [`CompiledCall`].
///
/// Fails statically with a `SyntaxError` when a positional-producing
/// attribute is scheduled after a keyword-producing one and both sides of
/// that ordering are statically known (`...var`/`...list`/`...dict`
/// attributes are ambiguous until a value is resolved, so they never
/// trigger this static check — see [`CompiledCall::invoke`]).
pub fn compile_tag<'a>(input: impl Into<CompileInput<'a>>) -> Result<CompiledCall, CompileTimeError> {
    let attrs: &[TagAttr] = match input.into() {
        CompileInput::Tag(tag) => &tag.attrs,
        CompileInput::Attrs(attrs) => attrs,
    };

    let mut compiled = Vec::new();
    let mut keyword_seen = false;

    for attr in attrs {
        if attr.is_flag {
            continue;
        }

        let kind = match (&attr.key, attr.value.spread) {
            (Some(key), _) => AttrKind::Keyword(key.token.clone()),
            (None, None) => AttrKind::Positional,
            (None, Some(Spread::Star)) => AttrKind::SpreadPositional,
            (None, Some(Spread::DoubleStar)) => AttrKind::SpreadKeyword,
            (None, Some(Spread::Ellipsis)) => AttrKind::SpreadEllipsis,
        };

        match &kind {
            AttrKind::Positional | AttrKind::SpreadPositional if keyword_seen => {
                return Err(CompileTimeError::order(
                    "positional argument follows keyword argument",
                    attr.start_index,
                    attr.end_index,
                    attr.line_col,
                ));
            }
            AttrKind::Keyword(_) | AttrKind::SpreadKeyword => keyword_seen = true,
            _ => {}
        }

        let mut steps = Vec::new();
        compile_value(&attr.value, &mut steps);
        compiled.push(CompiledAttr {
            kind,
            steps,
            start_index: attr.start_index,
            end_index: attr.end_index,
            line_col: attr.line_col,
        });
    }

    Ok(CompiledCall { attrs: compiled })
}

fn compile_value(value: &TagValue, steps: &mut Vec<Step>) {
    match value.kind {
        ValueKind::STRING => steps.push(Step::LitString(strip_quotes(&value.token.token))),
        ValueKind::TEMPLATE_STRING => {
            steps.push(Step::ResolveTemplateString(strip_quotes(&value.token.token)))
        }
        ValueKind::INT => steps.push(Step::LitInt(value.token.token.parse().unwrap_or(0))),
        ValueKind::FLOAT => steps.push(Step::LitFloat(value.token.token.parse().unwrap_or(0.0))),
        ValueKind::BOOL => steps.push(Step::LitBool(value.token.token == "true")),
        ValueKind::NONE => steps.push(Step::LitNone),
        ValueKind::TRANSLATION => {
            steps.push(Step::ResolveTranslation(translation_inner(&value.token.token)))
        }
        ValueKind::VARIABLE => steps.push(Step::ResolveVar(value.token.token.clone())),
        ValueKind::LIST => {
            let mut flags = Vec::with_capacity(value.children.len());
            for child in &value.children {
                compile_value(child, steps);
                flags.push(child.spread == Some(Spread::Star));
            }
            steps.push(Step::BuildList(flags));
        }
        ValueKind::DICT => {
            let mut slots = Vec::new();
            let mut i = 0;
            while i < value.children.len() {
                let child = &value.children[i];
                if child.spread == Some(Spread::DoubleStar) {
                    compile_value(child, steps);
                    slots.push(DictSlot::Spread);
                    i += 1;
                } else {
                    compile_value(&value.children[i], steps);
                    compile_value(&value.children[i + 1], steps);
                    slots.push(DictSlot::Pair);
                    i += 2;
                }
            }
            steps.push(Step::BuildDict(slots));
        }
        _ => unreachable!("exhaustive over ValueKind's closed set of constants"),
    }

    for filter in &value.filters {
        match &filter.arg {
            Some(arg) => {
                compile_value(arg, steps);
                steps.push(Step::ApplyFilter(filter.token.token.clone(), true));
            }
            None => steps.push(Step::ApplyFilter(filter.token.token.clone(), false)),
        }
    }
}

/// Strip the surrounding quote characters, leaving the rest byte-for-byte
/// as written — this engine never evaluates string/template-string
/// escapes, since `template_string`'s contract hands the caller the
/// "literal text inside the outer quotes" to re-interpret, not a
/// host-language string literal.
fn strip_quotes(token: &str) -> String {
    let bytes = token.as_bytes();
    if bytes.len() >= 2 {
        token[1..token.len() - 1].to_string()
    } else {
        token.to_string()
    }
}

/// `token` is the canonicalized `_("INNER")`/`_('INNER')` form; strip the
/// `_(`/`)` wrapper and then the inner quotes.
fn translation_inner(token: &str) -> String {
    let body = &token[2..token.len() - 1];
    strip_quotes(body)
}

impl CompiledCall {
    /// Execute the compiled plan against `context`, resolving every
    /// variable/template-string/translation/filter through `callbacks`.
    ///
    /// Re-runs the positional-after-keyword order check with the runtime
    /// kind of any `...`-spread attribute now known, since that is the one
    /// case [`compile_tag`] could not resolve statically.
    pub fn invoke<C, V, E>(
        &self,
        context: &C,
        callbacks: &Callbacks<C, V, E>,
    ) -> Result<(Vec<V>, Vec<(String, V)>), CompileError<E>>
    where
        V: Value,
    {
        let mut positional = Vec::new();
        let mut keyword: Vec<(String, V)> = Vec::new();
        let mut keyword_seen = false;

        for attr in &self.attrs {
            let value = exec_steps(&attr.steps, context, callbacks, attr)?;

            match &attr.kind {
                AttrKind::Positional => {
                    if keyword_seen {
                        return Err(order_error(attr));
                    }
                    positional.push(value);
                }
                AttrKind::Keyword(name) => {
                    keyword_seen = true;
                    keyword.push((name.clone(), value));
                }
                AttrKind::SpreadPositional => {
                    if keyword_seen {
                        return Err(order_error(attr));
                    }
                    positional.extend(spread_iterable(&value, attr)?);
                }
                AttrKind::SpreadKeyword => {
                    keyword_seen = true;
                    keyword.extend(spread_mapping(&value, attr)?);
                }
                AttrKind::SpreadEllipsis => {
                    if let Some(pairs) = value.as_mapping() {
                        keyword_seen = true;
                        keyword.extend(pairs);
                    } else if let Some(items) = value.as_iterable() {
                        if keyword_seen {
                            return Err(order_error(attr));
                        }
                        positional.extend(items);
                    } else {
                        return Err(CompileError::spread_type(
                            format!("'{}' object is not iterable", value.type_name()),
                            attr.start_index,
                            attr.end_index,
                            attr.line_col,
                        ));
                    }
                }
            }
        }

        Ok((positional, keyword))
    }
}

fn order_error<E>(attr: &CompiledAttr) -> CompileError<E> {
    CompileError::order(
        "positional argument follows keyword argument",
        attr.start_index,
        attr.end_index,
        attr.line_col,
    )
}

fn spread_iterable<V: Value, E>(value: &V, attr: &CompiledAttr) -> Result<Vec<V>, CompileError<E>> {
    value.as_iterable().ok_or_else(|| {
        CompileError::spread_type(
            format!("'{}' object is not iterable", value.type_name()),
            attr.start_index,
            attr.end_index,
            attr.line_col,
        )
    })
}

fn spread_mapping<V: Value, E>(
    value: &V,
    attr: &CompiledAttr,
) -> Result<Vec<(String, V)>, CompileError<E>> {
    value.as_mapping().ok_or_else(|| {
        CompileError::spread_type(
            format!("'{}' object is not a mapping", value.type_name()),
            attr.start_index,
            attr.end_index,
            attr.line_col,
        )
    })
}

fn exec_steps<C, V, E>(
    steps: &[Step],
    context: &C,
    callbacks: &Callbacks<C, V, E>,
    attr: &CompiledAttr,
) -> Result<V, CompileError<E>>
where
    V: Value,
{
    let mut stack: Vec<V> = Vec::new();

    for step in steps {
        match step {
            Step::LitString(s) => stack.push(V::from_str(s)),
            Step::LitInt(n) => stack.push(V::from_int(*n)),
            Step::LitFloat(f) => stack.push(V::from_float(*f)),
            Step::LitBool(b) => stack.push(V::from_bool(*b)),
            Step::LitNone => stack.push(V::none()),
            Step::ResolveVar(name) => {
                stack.push((callbacks.variable)(context, name).map_err(CompileError::Callback)?)
            }
            Step::ResolveTemplateString(inner) => stack.push(
                (callbacks.template_string)(context, inner).map_err(CompileError::Callback)?,
            ),
            Step::ResolveTranslation(inner) => {
                stack.push((callbacks.translation)(context, inner).map_err(CompileError::Callback)?)
            }
            Step::ApplyFilter(name, has_arg) => {
                let arg = if *has_arg { Some(stack.pop().unwrap()) } else { None };
                let base = stack.pop().unwrap();
                let result =
                    (callbacks.filter)(context, name, base, arg).map_err(CompileError::Callback)?;
                stack.push(result);
            }
            Step::BuildList(flags) => {
                let mut popped = Vec::with_capacity(flags.len());
                for _ in 0..flags.len() {
                    popped.push(stack.pop().unwrap());
                }
                popped.reverse();

                let mut items = Vec::new();
                for (value, spread) in popped.into_iter().zip(flags.iter()) {
                    if *spread {
                        let expanded = value.as_iterable().ok_or_else(|| {
                            CompileError::<E>::spread_type(
                                format!("'{}' object is not iterable", value.type_name()),
                                attr.start_index,
                                attr.end_index,
                                attr.line_col,
                            )
                        })?;
                        items.extend(expanded);
                    } else {
                        items.push(value);
                    }
                }
                stack.push(V::from_list(items));
            }
            Step::BuildDict(slots) => {
                let mut pairs: Vec<(String, V)> = Vec::new();
                let mut index: HashMap<String, usize> = HashMap::new();
                // Slots were pushed in source order; replay that same
                // order by reconstructing each slot's values from the
                // stack, which holds this dict's contributions
                // contiguously and in order because every nested
                // `compile_value` call is itself post-order.
                let mut slot_values: Vec<Vec<V>> = Vec::with_capacity(slots.len());
                for slot in slots.iter().rev() {
                    let n = match slot {
                        DictSlot::Pair => 2,
                        DictSlot::Spread => 1,
                    };
                    let mut vs = Vec::with_capacity(n);
                    for _ in 0..n {
                        vs.push(stack.pop().unwrap());
                    }
                    vs.reverse();
                    slot_values.push(vs);
                }
                slot_values.reverse();

                for (slot, values) in slots.iter().zip(slot_values.into_iter()) {
                    match slot {
                        DictSlot::Pair => {
                            let mut it = values.into_iter();
                            let key_value = it.next().unwrap();
                            let value = it.next().unwrap();
                            let key = key_value.as_key().ok_or_else(|| {
                                CompileError::<E>::spread_type(
                                    format!(
                                        "'{}' object is not a valid dict key",
                                        key_value.type_name()
                                    ),
                                    attr.start_index,
                                    attr.end_index,
                                    attr.line_col,
                                )
                            })?;
                            match index.get(&key) {
                                Some(&i) => pairs[i].1 = value,
                                None => {
                                    index.insert(key.clone(), pairs.len());
                                    pairs.push((key, value));
                                }
                            }
                        }
                        DictSlot::Spread => {
                            let spread_value = values.into_iter().next().unwrap();
                            let entries = spread_value.as_mapping().ok_or_else(|| {
                                CompileError::<E>::spread_type(
                                    format!(
                                        "'{}' object is not a mapping",
                                        spread_value.type_name()
                                    ),
                                    attr.start_index,
                                    attr.end_index,
                                    attr.line_col,
                                )
                            })?;
                            for (k, v) in entries {
                                match index.get(&k) {
                                    Some(&i) => pairs[i].1 = v,
                                    None => {
                                        index.insert(k.clone(), pairs.len());
                                        pairs.push((k, v));
                                    }
                                }
                            }
                        }
                    }
                }
                stack.push(V::from_pairs(pairs));
            }
        }
    }

    Ok(stack.pop().unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_tag;
    use std::collections::HashMap as StdHashMap;

    #[derive(Debug, Clone, PartialEq)]
    enum TV {
        Str(String),
        Int(i64),
        Float(f64),
        Bool(bool),
        None,
        List(Vec<TV>),
        Dict(Vec<(String, TV)>),
    }

    impl Value for TV {
        fn from_str(s: &str) -> Self {
            TV::Str(s.to_string())
        }
        fn from_int(n: i64) -> Self {
            TV::Int(n)
        }
        fn from_float(f: f64) -> Self {
            TV::Float(f)
        }
        fn from_bool(b: bool) -> Self {
            TV::Bool(b)
        }
        fn none() -> Self {
            TV::None
        }
        fn from_list(items: Vec<Self>) -> Self {
            TV::List(items)
        }
        fn from_pairs(pairs: Vec<(String, Self)>) -> Self {
            TV::Dict(pairs)
        }
        fn as_iterable(&self) -> Option<Vec<Self>> {
            match self {
                TV::List(items) => Some(items.clone()),
                _ => None,
            }
        }
        fn as_mapping(&self) -> Option<Vec<(String, Self)>> {
            match self {
                TV::Dict(pairs) => Some(pairs.clone()),
                _ => None,
            }
        }
        fn as_key(&self) -> Option<String> {
            match self {
                TV::Str(s) => Some(s.clone()),
                _ => None,
            }
        }
        fn type_name(&self) -> &'static str {
            match self {
                TV::Str(_) => "str",
                TV::Int(_) => "int",
                TV::Float(_) => "float",
                TV::Bool(_) => "bool",
                TV::None => "NoneType",
                TV::List(_) => "list",
                TV::Dict(_) => "dict",
            }
        }
    }

    type Ctx = StdHashMap<String, TV>;

    fn callbacks<'a>() -> Callbacks<'a, Ctx, TV, String> {
        Callbacks {
            variable: &|ctx: &Ctx, name: &str| {
                ctx.get(name).cloned().ok_or_else(|| format!("undefined: {}", name))
            },
            template_string: &|_ctx: &Ctx, inner: &str| {
                Ok(TV::Str(format!("TEMPLATE_RESOLVED:{}", inner)))
            },
            translation: &|_ctx: &Ctx, inner: &str| Ok(TV::Str(format!("TRANSLATION_RESOLVED:{}", inner))),
            filter: &|_ctx: &Ctx, name: &str, value: TV, arg: Option<TV>| {
                let value_str = match value {
                    TV::Str(s) => s,
                    TV::Bool(b) => b.to_string(),
                    other => format!("{:?}", other),
                };
                let arg_str = match arg {
                    Some(TV::Str(s)) => s,
                    Some(other) => format!("{:?}", other),
                    None => "None".to_string(),
                };
                Ok(TV::Str(format!("{}({}, {})", name, value_str, arg_str)))
            },
        }
    }

    #[test]
    fn scenario_1_positional_and_keyword_literals() {
        let tag = parse_tag("{% c 'my_comp' key=val key2='val2 two' %}", None).unwrap();
        let compiled = compile_tag(&tag).unwrap();
        let mut ctx = Ctx::new();
        ctx.insert("val".into(), TV::List(vec![TV::Int(1), TV::Int(2), TV::Int(3)]));
        let (args, kwargs) = compiled.invoke(&ctx, &callbacks()).unwrap();
        assert_eq!(args, vec![TV::Str("my_comp".to_string())]);
        assert_eq!(
            kwargs,
            vec![
                ("key".to_string(), TV::List(vec![TV::Int(1), TV::Int(2), TV::Int(3)])),
                ("key2".to_string(), TV::Str("val2 two".to_string())),
            ]
        );
    }

    #[test]
    fn scenario_2_filters() {
        let tag = parse_tag(r#"{% c value|lower key=val|yesno:"yes,no" %}"#, None).unwrap();
        let compiled = compile_tag(&tag).unwrap();
        let mut ctx = Ctx::new();
        ctx.insert("value".into(), TV::Str("HELLO".to_string()));
        ctx.insert("val".into(), TV::Bool(true));
        let (args, kwargs) = compiled.invoke(&ctx, &callbacks()).unwrap();
        assert_eq!(args, vec![TV::Str("lower(HELLO, None)".to_string())]);
        assert_eq!(
            kwargs,
            vec![("key".to_string(), TV::Str("yesno(true, yes,no)".to_string()))]
        );
    }

    #[test]
    fn scenario_3_dict_with_spread() {
        let tag = parse_tag(r#"{% c data={"key": val, **spread, "key2": val2} %}"#, None).unwrap();
        let compiled = compile_tag(&tag).unwrap();
        let mut ctx = Ctx::new();
        ctx.insert(
            "spread".into(),
            TV::Dict(vec![("a".to_string(), TV::Int(1))]),
        );
        ctx.insert("val".into(), TV::Str("HELLO".to_string()));
        ctx.insert("val2".into(), TV::Str("WORLD".to_string()));
        let (_args, kwargs) = compiled.invoke(&ctx, &callbacks()).unwrap();
        assert_eq!(
            kwargs,
            vec![(
                "data".to_string(),
                TV::Dict(vec![
                    ("key".to_string(), TV::Str("HELLO".to_string())),
                    ("a".to_string(), TV::Int(1)),
                    ("key2".to_string(), TV::Str("WORLD".to_string())),
                ])
            )]
        );
    }

    #[test]
    fn scenario_4_dict_value_spread_is_a_grammar_error() {
        let err = parse_tag(r#"{% c data={"key": **spread} %}"#, None).unwrap_err();
        assert!(matches!(err, crate::error::ParseError::Grammar { .. }));
    }

    #[test]
    fn scenario_5_static_order_error() {
        let tag = parse_tag("{% t key='value' positional_arg %}", None).unwrap();
        let err = compile_tag(&tag).unwrap_err();
        assert!(err.message.contains("positional argument follows keyword argument"));
    }

    #[test]
    fn scenario_6_deferred_order_error_on_dict_ellipsis() {
        let tag = parse_tag("{% t ...{'k':'v'} positional_arg %}", None).unwrap();
        let compiled = compile_tag(&tag).unwrap();
        let ctx = Ctx::new();
        let err = compiled.invoke(&ctx, &callbacks()).unwrap_err();
        assert!(matches!(err, CompileError::Order { .. }));
    }

    #[test]
    fn scenario_7_list_ellipsis_then_positional() {
        let tag = parse_tag("{% t ...[1,2,3] positional_arg %}", None).unwrap();
        let compiled = compile_tag(&tag).unwrap();
        let mut ctx = Ctx::new();
        ctx.insert("positional_arg".into(), TV::Int(4));
        let (args, kwargs) = compiled.invoke(&ctx, &callbacks()).unwrap();
        assert_eq!(args, vec![TV::Int(1), TV::Int(2), TV::Int(3), TV::Int(4)]);
        assert!(kwargs.is_empty());
    }

    #[test]
    fn scenario_8_flag_contributes_nothing() {
        use std::collections::HashSet;
        let flags: HashSet<String> = ["my_flag".to_string()].into_iter().collect();
        let tag = parse_tag("{% t my_flag %}", Some(&flags)).unwrap();
        let compiled = compile_tag(&tag).unwrap();
        let ctx = Ctx::new();
        let (args, kwargs) = compiled.invoke(&ctx, &callbacks()).unwrap();
        assert!(args.is_empty());
        assert!(kwargs.is_empty());
    }

    #[test]
    fn scenario_9_template_string() {
        let tag = parse_tag("{% c '{% lorem w 4 %}' %}", None).unwrap();
        let compiled = compile_tag(&tag).unwrap();
        let ctx = Ctx::new();
        let (args, _kwargs) = compiled.invoke(&ctx, &callbacks()).unwrap();
        assert_eq!(
            args,
            vec![TV::Str("TEMPLATE_RESOLVED:{% lorem w 4 %}".to_string())]
        );
    }

    #[test]
    fn scenario_10_ellipsis_on_kwattr_is_a_grammar_error() {
        let err = parse_tag("{% c key=...{'a':'b'} %}", None).unwrap_err();
        assert!(matches!(err, crate::error::ParseError::Grammar { .. }));
    }

    #[test]
    fn spread_star_on_non_iterable_is_a_spread_type_error() {
        // *[val1] where val1 itself is not iterable still succeeds (it's
        // the *attribute* not the element that is spread); instead force
        // the failure via a `*`-marked list element whose resolved value
        // is not iterable.
        let tag = parse_tag("{% c [*val1] %}", None).unwrap();
        let compiled = compile_tag(&tag).unwrap();
        let mut ctx = Ctx::new();
        ctx.insert("val1".into(), TV::Int(1));
        let err = compiled.invoke(&ctx, &callbacks()).unwrap_err();
        assert!(matches!(err, CompileError::SpreadType { .. }));
    }

    #[test]
    fn callback_error_surfaces_unchanged() {
        let tag = parse_tag("{% c missing %}", None).unwrap();
        let compiled = compile_tag(&tag).unwrap();
        let ctx = Ctx::new();
        let err = compiled.invoke(&ctx, &callbacks()).unwrap_err();
        assert_eq!(err, CompileError::Callback("undefined: missing".to_string()));
    }
}
