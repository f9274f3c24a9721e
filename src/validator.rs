//! Stage: the static well-formedness pass that runs immediately after the
//! grammar builds a [`Tag`].
//!
//! Most of §4.3's rules (spread placement, filter-arg shape, self-closing
//! slash position) are context-free and are already rejected by
//! [`parser::parse_tag`](crate::parser::parse_tag) as it builds the tree —
//! the grammar simply never produces a node that violates them. The one
//! rule left for this pass is flag classification, which needs a
//! tag-specific name set the context-free grammar has no way to see.

use std::collections::HashSet;

use crate::ast::{Tag, ValueKind};
use crate::error::ParseError;

/// Classify bare-variable positional attributes against `flags` and reject
/// a flag name that appears more than once.
///
/// A positional attribute becomes a flag only when its value is a plain
/// `variable` with no spread prefix and its token matches a name in
/// `flags` exactly (case-sensitive). The same name used as `key=` or with
/// a spread prefix is never a flag.
pub fn validate(tag: &mut Tag, flags: Option<&HashSet<String>>) -> Result<(), ParseError> {
    let Some(flags) = flags else {
        return Ok(());
    };
    if flags.is_empty() {
        return Ok(());
    }

    let mut seen: HashSet<String> = HashSet::new();
    for attr in tag.attrs.iter_mut() {
        if attr.key.is_some() || attr.value.spread.is_some() {
            continue;
        }
        if attr.value.kind != ValueKind::VARIABLE {
            continue;
        }
        let name = attr.value.token.token.as_str();
        if !flags.contains(name) {
            continue;
        }
        if !seen.insert(name.to_string()) {
            return Err(ParseError::flag(
                format!("Flag '{}' may be specified only once.", name),
                attr.start_index,
                attr.end_index,
                attr.line_col,
            ));
        }
        attr.is_flag = true;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::parser::parse_tag;
    use std::collections::HashSet;

    fn flags(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_flag_name_is_marked() {
        let tag = parse_tag("{% t my_flag %}", Some(&flags(&["my_flag"]))).unwrap();
        assert!(tag.attrs[0].is_flag);
    }

    #[test]
    fn unknown_flag_set_leaves_token_as_variable() {
        let tag = parse_tag("{% t my_flag %}", Some(&flags(&["MY_FLAG"]))).unwrap();
        assert!(!tag.attrs[0].is_flag);
    }

    #[test]
    fn keyword_use_of_flag_name_is_never_a_flag() {
        let tag = parse_tag("{% t my_flag=123 %}", Some(&flags(&["my_flag"]))).unwrap();
        assert!(!tag.attrs[0].is_flag);
    }

    #[test]
    fn spread_use_of_flag_name_is_never_a_flag() {
        let tag = parse_tag("{% t ...my_flag %}", Some(&flags(&["my_flag"]))).unwrap();
        assert!(!tag.attrs[0].is_flag);
    }

    #[test]
    fn duplicate_flag_is_rejected() {
        let err = parse_tag("{% t my_flag my_flag %}", Some(&flags(&["my_flag"]))).unwrap_err();
        assert!(matches!(err, crate::error::ParseError::Flag { .. }));
    }

    #[test]
    fn no_flag_set_never_classifies_a_flag() {
        let tag = parse_tag("{% t my_flag %}", None).unwrap();
        assert!(!tag.attrs[0].is_flag);
    }
}
