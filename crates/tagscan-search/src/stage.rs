//! Filter-chain composition.
//!
//! Each stage can both produce a result stream (`fetch`) and shrink one
//! produced by an earlier stage (`refine`). Stages are composed by an
//! explicit ordered [`SearchPipeline`]: the first stage fetches, every
//! later stage refines. A fetching stage receives the tail of the chain
//! so it can run downstream refines on each batch *before* applying the
//! caller's offset/limit — pagination has to count post-filter survivors.

use tagscan_graph::VertexRef;

use crate::context::SearchContext;
use crate::SearchError;

pub trait SearchStage {
    /// Produce the full paginated result for the request, running
    /// `tail`'s refines on every internal batch.
    fn fetch(
        &self,
        ctx: &SearchContext<'_>,
        tail: &[Box<dyn SearchStage>],
    ) -> Result<Vec<VertexRef>, SearchError>;

    /// Shrink (or replace) a candidate list in place.
    fn refine(
        &self,
        ctx: &SearchContext<'_>,
        vertices: &mut Vec<VertexRef>,
    ) -> Result<(), SearchError>;
}

/// An ordered chain of search stages.
pub struct SearchPipeline {
    stages: Vec<Box<dyn SearchStage>>,
}

impl SearchPipeline {
    pub fn new(stages: Vec<Box<dyn SearchStage>>) -> Self {
        Self { stages }
    }

    /// Run the chain: first stage fetches, the rest refine each batch.
    pub fn execute(&self, ctx: &SearchContext<'_>) -> Result<Vec<VertexRef>, SearchError> {
        let Some((head, tail)) = self.stages.split_first() else {
            return Ok(Vec::new());
        };
        head.fetch(ctx, tail)
    }

    /// Run every stage's refine over an externally supplied candidate
    /// list, in chain order. This is the entry point when this pipeline
    /// is itself a later stage of an upstream processor.
    pub fn refine(
        &self,
        ctx: &SearchContext<'_>,
        vertices: &mut Vec<VertexRef>,
    ) -> Result<(), SearchError> {
        for stage in &self.stages {
            stage.refine(ctx, vertices)?;
        }
        Ok(())
    }
}

/// Run each tail stage's refine in order over one batch.
pub(crate) fn refine_tail(
    ctx: &SearchContext<'_>,
    tail: &[Box<dyn SearchStage>],
    vertices: &mut Vec<VertexRef>,
) -> Result<(), SearchError> {
    for stage in tail {
        stage.refine(ctx, vertices)?;
    }
    Ok(())
}
