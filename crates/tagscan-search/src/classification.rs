//! Classification search: paginated fetch plus residual script filter.
//!
//! The executor's offset handling is the subtle part. The backing store
//! pages classification vertices, but entities are dropped *after* that
//! paging (lifecycle filter, dedup, residual script), so the store's own
//! offset would skip the wrong rows. The loop therefore always queries
//! from offset 0 in `limit`-sized batches and realizes the caller's
//! offset against the post-filter stream: `result_index` counts
//! survivors, and the first `offset` of them are discarded.

use ahash::AHashSet;
use serde_json::Value;
use tracing::{debug, debug_span, warn};

use tagscan_graph::{
    entity_guid, entity_status, EdgeDirection, EdgeEnd, EntityStatus, GraphError, VertexRef,
    VERTEX_INDEX,
};

use crate::context::SearchContext;
use crate::plan::QueryPlan;
use crate::script::CANDIDATE_GUIDS_BINDING;
use crate::stage::{refine_tail, SearchStage};
use crate::SearchError;

/// The by-classification search stage.
pub struct ClassificationStage {
    plan: QueryPlan,
}

impl ClassificationStage {
    pub fn new(plan: QueryPlan) -> Self {
        Self { plan }
    }

    pub fn plan(&self) -> &QueryPlan {
        &self.plan
    }

    /// One page of classification vertices from whichever first-stage
    /// source the plan activated.
    fn fetch_batch(
        &self,
        ctx: &SearchContext<'_>,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<VertexRef>, GraphError> {
        match self.plan.index_query() {
            Some(query) => ctx.backend.index_query(VERTEX_INDEX, query, offset, limit),
            None => ctx.backend.graph_query(self.plan.graph_query(), offset, limit),
        }
    }

    /// Walk inbound classification edges back to owning entities,
    /// applying the lifecycle filter and guid dedup. One entity carrying
    /// several matching classification instances resolves once.
    fn resolve_entities(
        &self,
        ctx: &SearchContext<'_>,
        tag_vertices: &[VertexRef],
        seen_guids: &mut AHashSet<String>,
    ) -> Result<Vec<VertexRef>, SearchError> {
        let active_only = ctx.request.exclude_deleted_entities;
        let mut entities = Vec::new();

        for &tag_vertex in tag_vertices {
            for edge in ctx.backend.edges(tag_vertex, EdgeDirection::In)? {
                let entity = ctx.backend.edge_vertex(edge, EdgeEnd::Out)?;

                if active_only && entity_status(ctx.backend, entity) != Some(EntityStatus::Active) {
                    continue;
                }

                // An entity without a guid cannot be deduplicated or
                // addressed by the residual script; skip it.
                let Some(guid) = entity_guid(ctx.backend, entity) else {
                    continue;
                };
                if !seen_guids.insert(guid) {
                    continue;
                }

                entities.push(entity);
            }
        }

        Ok(entities)
    }
}

impl SearchStage for ClassificationStage {
    fn fetch(
        &self,
        ctx: &SearchContext<'_>,
        tail: &[Box<dyn SearchStage>],
    ) -> Result<Vec<VertexRef>, SearchError> {
        let offset = ctx.request.offset;
        let limit = ctx.request.limit;
        let _span = debug_span!("classification_search", offset, limit).entered();

        let mut results: Vec<VertexRef> = Vec::with_capacity(limit);
        let mut seen_guids: AHashSet<String> = AHashSet::new();
        let mut result_index = 0usize;
        let mut query_offset = 0usize;

        while results.len() < limit {
            if ctx.is_terminated() {
                warn!(query_offset, "search terminated, returning partial result");
                break;
            }

            let tag_vertices = self.fetch_batch(ctx, query_offset, limit)?;
            if tag_vertices.is_empty() {
                // Backing store exhausted.
                break;
            }

            let mut entities = self.resolve_entities(ctx, &tag_vertices, &mut seen_guids)?;
            self.refine(ctx, &mut entities)?;
            refine_tail(ctx, tail, &mut entities)?;

            for entity in entities {
                result_index += 1;
                if result_index <= offset {
                    continue;
                }
                results.push(entity);
                if results.len() == limit {
                    break;
                }
            }

            query_offset += limit;
        }

        debug!(results = results.len(), "classification search done");
        Ok(results)
    }

    fn refine(
        &self,
        ctx: &SearchContext<'_>,
        vertices: &mut Vec<VertexRef>,
    ) -> Result<(), SearchError> {
        let Some(script) = self.plan.traversal_script() else {
            return Ok(());
        };

        let candidates: Vec<Value> = vertices
            .iter()
            .filter_map(|&v| entity_guid(ctx.backend, v))
            .map(Value::String)
            .collect();

        let mut bindings = script.bindings.clone();
        bindings.insert(CANDIDATE_GUIDS_BINDING.to_owned(), Value::Array(candidates));

        match ctx.backend.execute_script(&script.text, &bindings) {
            Ok(matched) => {
                vertices.clear();
                vertices.extend(matched);
            }
            Err(err) => {
                // A residual-filter failure degrades to "no matches" for
                // this batch; the search itself continues.
                warn!(error = %err, "classification filter script failed");
                vertices.clear();
            }
        }

        Ok(())
    }
}
