//! Filter-criteria model.
//!
//! A request's classification filter is a recursive predicate tree:
//! leaves compare one attribute against a literal, internal nodes combine
//! ordered children with AND/OR. The tree is read-only once parsed and is
//! evaluated with identical semantics on every execution path (index
//! text, structured graph query, traversal script).

use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tagscan_graph::CompareOp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Combinator {
    And,
    Or,
}

impl Combinator {
    pub const fn token(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
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

impl FilterOperator {
    /// The native graph-query operator with the same semantics.
    pub const fn graph_op(self) -> CompareOp {
        match self {
            Self::Eq => CompareOp::Eq,
            Self::Neq => CompareOp::Neq,
            Self::Lt => CompareOp::Lt,
            Self::Lte => CompareOp::Lte,
            Self::Gt => CompareOp::Gt,
            Self::Gte => CompareOp::Gte,
            Self::Contains => CompareOp::Contains,
            Self::StartsWith => CompareOp::StartsWith,
            Self::EndsWith => CompareOp::EndsWith,
        }
    }
}

/// A recursive predicate tree over classification attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterCriteria {
    Cond {
        attribute: String,
        operator: FilterOperator,
        value: Value,
    },
    Group {
        combinator: Combinator,
        children: Vec<FilterCriteria>,
    },
}

impl FilterCriteria {
    pub fn cond(attribute: impl Into<String>, operator: FilterOperator, value: Value) -> Self {
        Self::Cond {
            attribute: attribute.into(),
            operator,
            value,
        }
    }

    pub fn and(children: Vec<FilterCriteria>) -> Self {
        Self::Group {
            combinator: Combinator::And,
            children,
        }
    }

    pub fn or(children: Vec<FilterCriteria>) -> Self {
        Self::Group {
            combinator: Combinator::Or,
            children,
        }
    }

    /// Every attribute name referenced anywhere in the tree.
    pub fn attributes(&self) -> AHashSet<String> {
        let mut out = AHashSet::new();
        self.collect_attributes(&mut out);
        out
    }

    fn collect_attributes(&self, out: &mut AHashSet<String>) {
        match self {
            Self::Cond { attribute, .. } => {
                out.insert(attribute.clone());
            }
            Self::Group { children, .. } => {
                for child in children {
                    child.collect_attributes(out);
                }
            }
        }
    }

    /// Depth-first check that every leaf names an attribute.
    pub fn has_empty_attribute(&self) -> bool {
        match self {
            Self::Cond { attribute, .. } => attribute.is_empty(),
            Self::Group { children, .. } => children.iter().any(Self::has_empty_attribute),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn attributes_walks_nested_groups() {
        let tree = FilterCriteria::and(vec![
            FilterCriteria::cond("owner", FilterOperator::Eq, json!("finance")),
            FilterCriteria::or(vec![
                FilterCriteria::cond("level", FilterOperator::Gt, json!(3)),
                FilterCriteria::cond("owner", FilterOperator::Neq, json!("hr")),
            ]),
        ]);
        let attrs = tree.attributes();
        assert_eq!(attrs.len(), 2);
        assert!(attrs.contains("owner"));
        assert!(attrs.contains("level"));
    }

    #[test]
    fn serde_round_trip_preserves_structure() {
        let tree = FilterCriteria::or(vec![
            FilterCriteria::cond("expiry", FilterOperator::Lte, json!("2026-01-01")),
            FilterCriteria::and(vec![FilterCriteria::cond(
                "source",
                FilterOperator::StartsWith,
                json!("ingest-"),
            )]),
        ]);
        let text = serde_json::to_string(&tree).unwrap();
        let back: FilterCriteria = serde_json::from_str(&text).unwrap();
        assert_eq!(back, tree);
    }
}
