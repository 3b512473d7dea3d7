//! Structured graph-query predicates.
//!
//! The non-indexed execution path filters vertices with this AST instead
//! of a backend text grammar. AND/OR nesting mirrors the caller's filter
//! tree; it is deliberately never flattened, so the fallback path and the
//! index path evaluate the same logical structure.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Native comparison operators supported by the graph-query path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    Contains,
    StartsWith,
    EndsWith,
}

/// A predicate over one vertex's properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VertexPredicate {
    /// Property value is one of a fixed set of strings.
    In {
        property: String,
        values: BTreeSet<String>,
    },
    /// Property value compares against a literal.
    Compare {
        property: String,
        op: CompareOp,
        value: Value,
    },
    And {
        children: Vec<VertexPredicate>,
    },
    Or {
        children: Vec<VertexPredicate>,
    },
}

impl VertexPredicate {
    /// Evaluate against a property lookup. A missing property never
    /// satisfies a leaf predicate.
    pub fn matches(&self, lookup: &dyn Fn(&str) -> Option<Value>) -> bool {
        match self {
            Self::In { property, values } => lookup(property)
                .as_ref()
                .and_then(Value::as_str)
                .is_some_and(|v| values.contains(v)),
            Self::Compare { property, op, value } => {
                lookup(property).is_some_and(|actual| compare_values(*op, &actual, value))
            }
            Self::And { children } => children.iter().all(|c| c.matches(lookup)),
            Self::Or { children } => children.iter().any(|c| c.matches(lookup)),
        }
    }
}

/// A ready-to-run structured query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQuery {
    pub predicate: VertexPredicate,
}

impl GraphQuery {
    pub fn new(predicate: VertexPredicate) -> Self {
        Self { predicate }
    }
}

/// Compare two JSON values under a comparison operator.
///
/// Numbers compare numerically, strings lexically; the substring/prefix
/// operators apply to strings only. Cross-type comparisons are false
/// (except `Neq`, where a type mismatch means "not equal").
pub fn compare_values(op: CompareOp, actual: &Value, expected: &Value) -> bool {
    match op {
        CompareOp::Eq => actual == expected,
        CompareOp::Neq => actual != expected,
        CompareOp::Lt | CompareOp::Lte | CompareOp::Gt | CompareOp::Gte => {
            order_compare(op, actual, expected)
        }
        CompareOp::Contains => both_strings(actual, expected, |a, e| a.contains(e)),
        CompareOp::StartsWith => both_strings(actual, expected, |a, e| a.starts_with(e)),
        CompareOp::EndsWith => both_strings(actual, expected, |a, e| a.ends_with(e)),
    }
}

fn order_compare(op: CompareOp, actual: &Value, expected: &Value) -> bool {
    if let (Some(a), Some(e)) = (actual.as_f64(), expected.as_f64()) {
        return match op {
            CompareOp::Lt => a < e,
            CompareOp::Lte => a <= e,
            CompareOp::Gt => a > e,
            CompareOp::Gte => a >= e,
            _ => false,
        };
    }
    if let (Some(a), Some(e)) = (actual.as_str(), expected.as_str()) {
        return match op {
            CompareOp::Lt => a < e,
            CompareOp::Lte => a <= e,
            CompareOp::Gt => a > e,
            CompareOp::Gte => a >= e,
            _ => false,
        };
    }
    false
}

fn both_strings(actual: &Value, expected: &Value, test: impl Fn(&str, &str) -> bool) -> bool {
    match (actual.as_str(), expected.as_str()) {
        (Some(a), Some(e)) => test(a, e),
        _ => false,
    }
}
