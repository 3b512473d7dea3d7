//! tagscan-search: hybrid query planning and paginated classification
//! search over a property graph mirrored into a secondary index.
//!
//! A search asks "all entities tagged with classification X (and
//! subtypes) matching attribute predicates Y". Execution is planned once
//! per request:
//!
//! 1. The classifier splits the predicate tree into index-expressible and
//!    traversal-only attributes.
//! 2. If everything fits the index (and the closure clause is short
//!    enough), the first-stage fetch is an index text query; otherwise it
//!    is the structured graph query, which always covers the full tree.
//! 3. Any classification filter additionally yields a parameterized
//!    traversal script, re-applied per batch as the residual filter.
//!
//! The executor pages classification vertices, resolves them to entities
//! over inbound edges, deduplicates by guid, runs the filter chain, and
//! realizes the caller's offset against the post-filter stream so that
//! silently dropped candidates never shift page boundaries.

pub mod attribute;
pub mod classification;
pub mod classify;
pub mod context;
pub mod criteria;
pub mod graph_filter;
pub mod index_query;
pub mod plan;
pub mod script;
pub mod stage;

use thiserror::Error;

use tagscan_graph::{GraphBackend, GraphError, VertexRef};

pub use attribute::AttributeFilterStage;
pub use classification::ClassificationStage;
pub use classify::{AttributeClassifier, AttributeSplit, StaticClassifier};
pub use context::{CancelFlag, SearchContext, SearchRequest, TagTypeRef};
pub use criteria::{Combinator, FilterCriteria, FilterOperator};
pub use graph_filter::build_graph_query;
pub use index_query::build_index_query;
pub use plan::{PlanError, QueryPlan, INDEX_QUERY_LENGTH_LIMIT};
pub use script::{build_traversal_script, TraversalScript, CANDIDATE_GUIDS_BINDING, TYPE_NAMES_BINDING};
pub use stage::{SearchPipeline, SearchStage};

#[derive(Debug, Error)]
pub enum SearchError {
    /// Construction-time failure; the plan never ran.
    #[error("query planning failed: {0}")]
    Plan(#[from] PlanError),
    /// A backend call failed mid-search; fatal to this search. Partial
    /// progress is discarded, never combined with the error.
    #[error("graph backend call failed: {0}")]
    Backend(#[from] GraphError),
}

/// Plan and run one classification search end to end.
pub fn execute_search(
    backend: &dyn GraphBackend,
    classifier: &dyn AttributeClassifier,
    request: &SearchRequest,
    cancel: CancelFlag,
) -> Result<Vec<VertexRef>, SearchError> {
    let plan = QueryPlan::build(request, classifier)?;
    let pipeline = SearchPipeline::new(vec![Box::new(ClassificationStage::new(plan))]);
    let ctx = SearchContext::new(backend, request, cancel);
    pipeline.execute(&ctx)
}
