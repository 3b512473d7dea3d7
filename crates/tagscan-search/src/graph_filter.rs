//! Graph predicate synthesis: the non-indexed execution path.
//!
//! Unlike the index text, this translation always covers the *full*
//! filter tree — it is the deterministic fallback when any predicate is
//! not index-expressible, so it can never itself drop predicates.

use tagscan_graph::{GraphQuery, VertexPredicate, TYPE_NAME_PROPERTY_KEY};

use crate::context::TagTypeRef;
use crate::criteria::{Combinator, FilterCriteria};

/// Build the structured query: closure membership conjoined with the
/// whole filter tree, AND/OR nesting preserved.
pub fn build_graph_query(tag_type: &TagTypeRef, criteria: Option<&FilterCriteria>) -> GraphQuery {
    let type_test = VertexPredicate::In {
        property: TYPE_NAME_PROPERTY_KEY.to_owned(),
        values: tag_type.type_and_subtypes().iter().cloned().collect(),
    };

    let predicate = match criteria {
        None => type_test,
        Some(criteria) => VertexPredicate::And {
            children: vec![type_test, translate_criteria(criteria)],
        },
    };

    GraphQuery::new(predicate)
}

/// Translate one filter tree into the native predicate AST.
pub fn translate_criteria(criteria: &FilterCriteria) -> VertexPredicate {
    match criteria {
        FilterCriteria::Cond {
            attribute,
            operator,
            value,
        } => VertexPredicate::Compare {
            property: attribute.clone(),
            op: operator.graph_op(),
            value: value.clone(),
        },
        FilterCriteria::Group {
            combinator,
            children,
        } => {
            let children = children.iter().map(translate_criteria).collect();
            match combinator {
                Combinator::And => VertexPredicate::And { children },
                Combinator::Or => VertexPredicate::Or { children },
            }
        }
    }
}
