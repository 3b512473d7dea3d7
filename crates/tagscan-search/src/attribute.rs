//! By-attribute search stage.
//!
//! As a refine stage it evaluates an entity-attribute predicate tree in
//! place over candidate vertices; as a fetch stage it is a plain
//! paginated graph query with the same post-filter offset compensation
//! the classification stage uses.

use tagscan_graph::{GraphQuery, VertexRef};
use tracing::debug;

use crate::context::SearchContext;
use crate::criteria::FilterCriteria;
use crate::graph_filter::translate_criteria;
use crate::stage::{refine_tail, SearchStage};
use crate::SearchError;

pub struct AttributeFilterStage {
    query: GraphQuery,
}

impl AttributeFilterStage {
    pub fn new(criteria: &FilterCriteria) -> Self {
        Self {
            query: GraphQuery::new(translate_criteria(criteria)),
        }
    }
}

impl SearchStage for AttributeFilterStage {
    fn fetch(
        &self,
        ctx: &SearchContext<'_>,
        tail: &[Box<dyn SearchStage>],
    ) -> Result<Vec<VertexRef>, SearchError> {
        let offset = ctx.request.offset;
        let limit = ctx.request.limit;

        let mut results: Vec<VertexRef> = Vec::with_capacity(limit);
        let mut result_index = 0usize;
        let mut query_offset = 0usize;

        while results.len() < limit {
            if ctx.is_terminated() {
                break;
            }

            let mut batch = ctx.backend.graph_query(&self.query, query_offset, limit)?;
            if batch.is_empty() {
                break;
            }

            refine_tail(ctx, tail, &mut batch)?;

            for vertex in batch {
                result_index += 1;
                if result_index <= offset {
                    continue;
                }
                results.push(vertex);
                if results.len() == limit {
                    break;
                }
            }

            query_offset += limit;
        }

        debug!(results = results.len(), "attribute search done");
        Ok(results)
    }

    fn refine(
        &self,
        ctx: &SearchContext<'_>,
        vertices: &mut Vec<VertexRef>,
    ) -> Result<(), SearchError> {
        vertices.retain(|&v| {
            self.query
                .predicate
                .matches(&|name| ctx.backend.property(v, name))
        });
        Ok(())
    }
}
