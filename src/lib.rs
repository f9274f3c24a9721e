//! `tag-call` is a two-stage engine for template tag expressions of the
//! form `{% name arg1 arg2 key=value ...spread %}`.
//!
//! Stage 1, [`parse_tag`], turns the raw tag body into a strongly-typed
//! [`Tag`] AST, running the static flag/uniqueness validator immediately
//! afterward. Stage 2, [`compile_tag`], lowers a validated `Tag` (or a bare
//! attribute list) into a [`CompiledCall`]: an immutable, reusable plan
//! that, given a context and four resolution callbacks, produces an
//! ordered `(positional arguments, keyword arguments)` pair ready to be
//! handed to a downstream handler.
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use tag_call::{compile_tag, parse_tag, Callbacks, Value};
//!
//! #[derive(Debug, Clone, PartialEq)]
//! enum Json {
//!     Str(String),
//!     Int(i64),
//!     Float(f64),
//!     Bool(bool),
//!     None,
//!     List(Vec<Json>),
//!     Dict(Vec<(String, Json)>),
//! }
//!
//! impl Value for Json {
//!     fn from_str(s: &str) -> Self { Json::Str(s.to_string()) }
//!     fn from_int(n: i64) -> Self { Json::Int(n) }
//!     fn from_float(f: f64) -> Self { Json::Float(f) }
//!     fn from_bool(b: bool) -> Self { Json::Bool(b) }
//!     fn none() -> Self { Json::None }
//!     fn from_list(items: Vec<Self>) -> Self { Json::List(items) }
//!     fn from_pairs(pairs: Vec<(String, Self)>) -> Self { Json::Dict(pairs) }
//!     fn as_iterable(&self) -> Option<Vec<Self>> {
//!         match self { Json::List(items) => Some(items.clone()), _ => None }
//!     }
//!     fn as_mapping(&self) -> Option<Vec<(String, Self)>> {
//!         match self { Json::Dict(pairs) => Some(pairs.clone()), _ => None }
//!     }
//!     fn as_key(&self) -> Option<String> {
//!         match self { Json::Str(s) => Some(s.clone()), _ => None }
//!     }
//!     fn type_name(&self) -> &'static str {
//!         match self {
//!             Json::Str(_) => "str", Json::Int(_) => "int", Json::Float(_) => "float",
//!             Json::Bool(_) => "bool", Json::None => "NoneType",
//!             Json::List(_) => "list", Json::Dict(_) => "dict",
//!         }
//!     }
//! }
//!
//! let tag = parse_tag("{% c 'my_comp' key=val %}", None).unwrap();
//! let compiled = compile_tag(&tag).unwrap();
//!
//! let mut ctx: HashMap<String, Json> = HashMap::new();
//! ctx.insert("val".to_string(), Json::Int(1));
//!
//! let callbacks: Callbacks<HashMap<String, Json>, Json, String> = Callbacks {
//!     variable: &|ctx, name| ctx.get(name).cloned().ok_or_else(|| format!("undefined: {name}")),
//!     template_string: &|_ctx, inner| Ok(Json::Str(inner.to_string())),
//!     translation: &|_ctx, inner| Ok(Json::Str(inner.to_string())),
//!     filter: &|_ctx, name, value, _arg| Ok(Json::Str(format!("{name}({value:?})"))),
//! };
//!
//! let (args, kwargs) = compiled.invoke(&ctx, &callbacks).unwrap();
//! assert_eq!(args, vec![Json::Str("my_comp".to_string())]);
//! assert_eq!(kwargs, vec![("key".to_string(), Json::Int(1))]);
//! ```
//!
//! # License
//! Provided under the MIT license.

mod ast;
mod compiler;
mod error;
mod field_tree;
mod lex;
mod lexer;
mod log;
mod parser;
mod position;
mod validator;

pub use ast::{Spread, Tag, TagAttr, TagToken, TagSyntax, TagValue, TagValueFilter, ValueKind};
pub use compiler::{compile_tag, Callbacks, CompileInput, CompiledCall, Value};
pub use error::{CompileError, CompileTimeError, ParseError};
pub use parser::parse_tag;
pub use position::Position;
