//! Index-query text synthesis.
//!
//! The builder appends the type-closure clause, then a fragment per
//! predicate — but only for predicates the classifier marked
//! index-expressible. Skipped predicates leave syntactic debris behind: a
//! dangling combinator right before a group close, or an empty group. A
//! final normalization pass runs three substitutions over the assembled
//! text, each a single non-overlapping `replace_all`, in a fixed order:
//! stray `AND` before `)`, stray `OR` before `)`, empty groups. The
//! substitutions are deliberately not iterated to a fixed point, so a
//! deeply nested omission can still leave a leading dangling combinator
//! inside a group; downstream consumers rely on the current output, so
//! the pass is kept byte-compatible rather than repaired.

use std::sync::LazyLock;

use ahash::AHashSet;
use regex::Regex;
use serde_json::Value;

use crate::context::TagTypeRef;
use crate::criteria::{FilterCriteria, FilterOperator};

static STRAY_AND_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(AND\s+)+\)").expect("stray-AND pattern"));
static STRAY_OR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(OR\s+)+\)").expect("stray-OR pattern"));
static EMPTY_GROUP_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\s*\)").expect("empty-group pattern"));

/// Build the full index query: type-closure clause plus the
/// index-expressible subset of the filter tree.
pub fn build_index_query(
    tag_type: &TagTypeRef,
    criteria: Option<&FilterCriteria>,
    index_attributes: &AHashSet<String>,
) -> String {
    let mut query = String::from(tag_type.index_clause());

    if let Some(criteria) = criteria {
        query.push_str(" AND (");
        append_fragment(&mut query, criteria, index_attributes);
        query.push(')');
    }

    let cleaned = STRAY_AND_PATTERN.replace_all(&query, ")");
    let cleaned = STRAY_OR_PATTERN.replace_all(&cleaned, ")");
    let cleaned = EMPTY_GROUP_PATTERN.replace_all(&cleaned, "");
    cleaned.into_owned()
}

fn append_fragment(out: &mut String, criteria: &FilterCriteria, index_attributes: &AHashSet<String>) {
    match criteria {
        FilterCriteria::Group {
            combinator,
            children,
        } => {
            out.push('(');
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                    out.push_str(combinator.token());
                    out.push(' ');
                }
                append_fragment(out, child, index_attributes);
            }
            out.push(')');
        }
        FilterCriteria::Cond {
            attribute,
            operator,
            value,
        } => {
            if index_attributes.contains(attribute) {
                out.push_str(&leaf_clause(attribute, *operator, value));
            }
        }
    }
}

fn leaf_clause(attribute: &str, operator: FilterOperator, value: &Value) -> String {
    let operand = render_operand(value);
    match operator {
        FilterOperator::Eq => format!("v.\"{attribute}\": {operand}"),
        FilterOperator::Neq => format!("-v.\"{attribute}\": {operand}"),
        FilterOperator::Lt => format!("v.\"{attribute}\": [* TO {operand}}}"),
        FilterOperator::Lte => format!("v.\"{attribute}\": [* TO {operand}]"),
        FilterOperator::Gt => format!("v.\"{attribute}\": {{{operand} TO *]"),
        FilterOperator::Gte => format!("v.\"{attribute}\": [{operand} TO *]"),
        FilterOperator::Contains => format!("v.\"{attribute}\": (*{operand}*)"),
        FilterOperator::StartsWith => format!("v.\"{attribute}\": ({operand}*)"),
        FilterOperator::EndsWith => format!("v.\"{attribute}\": (*{operand})"),
    }
}

fn render_operand(value: &Value) -> String {
    match value {
        Value::String(s) => {
            if s.chars().any(|c| c.is_whitespace() || c == ':') {
                format!("\"{}\"", s.replace('"', "\\\""))
            } else {
                s.clone()
            }
        }
        other => other.to_string(),
    }
}
