//! Query-plan construction.
//!
//! One plan is built per request and discarded with it. The index/graph
//! choice is all-or-nothing: the index path is taken only when the whole
//! predicate tree is index-expressible, no attribute needs traversal, and
//! the closure clause fits the index backend's query-length ceiling.
//! Partial pushdown is deliberately not attempted — correctness over a
//! cost-based planner.

use thiserror::Error;
use tracing::debug;

use crate::classify::AttributeClassifier;
use crate::context::SearchRequest;
use crate::graph_filter::build_graph_query;
use crate::index_query::build_index_query;
use crate::script::{build_traversal_script, TraversalScript};
use tagscan_graph::GraphQuery;

/// Ceiling on the type-closure clause length for the index path; a wide
/// closure falls back to the graph path.
pub const INDEX_QUERY_LENGTH_LIMIT: usize = 512;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("limit must be greater than zero")]
    ZeroLimit,
    #[error("filter condition has an empty attribute name")]
    EmptyAttribute,
}

/// The immutable execution plan for one search.
#[derive(Debug)]
pub struct QueryPlan {
    index_query: Option<String>,
    graph_query: GraphQuery,
    traversal_script: Option<TraversalScript>,
}

impl QueryPlan {
    pub fn build(
        request: &SearchRequest,
        classifier: &dyn AttributeClassifier,
    ) -> Result<Self, PlanError> {
        if request.limit == 0 {
            return Err(PlanError::ZeroLimit);
        }
        if request
            .tag_filters
            .as_ref()
            .is_some_and(|c| c.has_empty_attribute())
        {
            return Err(PlanError::EmptyAttribute);
        }

        let criteria = request.tag_filters.as_ref();
        let split = classifier.split_attributes(criteria);

        // All-or-nothing: any traversal-only attribute disables the index
        // path entirely.
        let use_index = request.tag_type.index_clause().len() <= INDEX_QUERY_LENGTH_LIMIT
            && split.traversal.is_empty()
            && classifier.is_fully_index_expressible(criteria);

        let index_query =
            use_index.then(|| build_index_query(&request.tag_type, criteria, &split.index));
        let graph_query = build_graph_query(&request.tag_type, criteria);
        let traversal_script =
            criteria.map(|c| build_traversal_script(&request.tag_type, c));

        debug!(
            tag_type = request.tag_type.name(),
            use_index,
            residual_script = traversal_script.is_some(),
            "query plan built"
        );

        Ok(Self {
            index_query,
            graph_query,
            traversal_script,
        })
    }

    /// The index query text; present iff the index path is active.
    pub fn index_query(&self) -> Option<&str> {
        self.index_query.as_deref()
    }

    /// The structured fallback query; always built.
    pub fn graph_query(&self) -> &GraphQuery {
        &self.graph_query
    }

    /// The residual filter script; present iff the request carried any
    /// classification filter.
    pub fn traversal_script(&self) -> Option<&TraversalScript> {
        self.traversal_script.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::StaticClassifier;
    use crate::context::TagTypeRef;
    use crate::criteria::{FilterCriteria, FilterOperator};
    use serde_json::json;

    fn request(tag_filters: Option<FilterCriteria>) -> SearchRequest {
        SearchRequest {
            offset: 0,
            limit: 10,
            exclude_deleted_entities: false,
            tag_type: TagTypeRef::new("PII", ["GDPR_PII"]),
            tag_filters,
        }
    }

    #[test]
    fn index_path_selected_when_fully_expressible() {
        let req = request(Some(FilterCriteria::cond(
            "owner",
            FilterOperator::Eq,
            json!("finance"),
        )));
        let plan = QueryPlan::build(&req, &StaticClassifier::all_indexed()).unwrap();
        assert!(plan.index_query().is_some());
        assert!(plan.traversal_script().is_some());
    }

    #[test]
    fn traversal_only_attribute_forces_graph_path() {
        let req = request(Some(FilterCriteria::cond(
            "linkedSystem",
            FilterOperator::Eq,
            json!("crm"),
        )));
        let plan = QueryPlan::build(&req, &StaticClassifier::new(["linkedSystem"])).unwrap();
        assert!(plan.index_query().is_none());
        // The fallback and the residual script are still built.
        assert!(plan.traversal_script().is_some());
    }

    #[test]
    fn oversized_closure_clause_forces_graph_path() {
        let subtypes: Vec<String> = (0..64).map(|i| format!("PII_SUBTYPE_{i:03}")).collect();
        let req = SearchRequest {
            tag_type: TagTypeRef::new("PII", subtypes),
            ..request(None)
        };
        assert!(req.tag_type.index_clause().len() > INDEX_QUERY_LENGTH_LIMIT);
        let plan = QueryPlan::build(&req, &StaticClassifier::all_indexed()).unwrap();
        assert!(plan.index_query().is_none());
    }

    #[test]
    fn no_filter_means_no_script() {
        let plan = QueryPlan::build(&request(None), &StaticClassifier::all_indexed()).unwrap();
        assert!(plan.index_query().is_some());
        assert!(plan.traversal_script().is_none());
    }

    #[test]
    fn construction_fails_fast_on_bad_requests() {
        let mut req = request(None);
        req.limit = 0;
        assert!(matches!(
            QueryPlan::build(&req, &StaticClassifier::all_indexed()),
            Err(PlanError::ZeroLimit)
        ));

        let req = request(Some(FilterCriteria::cond("", FilterOperator::Eq, json!(1))));
        assert!(matches!(
            QueryPlan::build(&req, &StaticClassifier::all_indexed()),
            Err(PlanError::EmptyAttribute)
        ));
    }
}
