//! tagscan-graph: the property-graph seam of the tagscan search core.
//!
//! The search layer never talks to a concrete graph store. It sees:
//!
//! - opaque vertex/edge handles (`VertexRef`, `EdgeRef`),
//! - a small object-safe [`GraphBackend`] trait covering the five
//!   primitives the executor needs (index query, structured graph query,
//!   edge enumeration, property lookup, script execution),
//! - a structured predicate AST ([`VertexPredicate`]) for the non-indexed
//!   query path, so the fallback never depends on a text grammar.
//!
//! [`MemoryGraph`] is the embedded reference backend: deterministic
//! insertion-order scans, with the secondary index and the script engine
//! attached as pluggable adapters (both are external engines in a real
//! deployment).

pub mod memory;
pub mod query;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use memory::MemoryGraph;
pub use query::{compare_values, CompareOp, GraphQuery, VertexPredicate};

/// Property key holding an entity's globally unique id.
pub const GUID_PROPERTY_KEY: &str = "__guid";

/// Property key holding a vertex's type name.
pub const TYPE_NAME_PROPERTY_KEY: &str = "__typeName";

/// Property key holding an entity's lifecycle state.
pub const STATE_PROPERTY_KEY: &str = "__state";

/// Edge label connecting an entity vertex to one applied classification.
pub const CLASSIFICATION_EDGE_LABEL: &str = "__classifiedAs";

/// Name of the secondary text/attribute index over vertices.
pub const VERTEX_INDEX: &str = "vertex_index";

/// Opaque handle to a vertex owned by the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct VertexRef(u64);

impl VertexRef {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Opaque handle to an edge owned by the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct EdgeRef(u64);

impl EdgeRef {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Direction of edges relative to a vertex: `In` enumerates edges whose
/// target is the vertex, `Out` edges whose source is the vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeDirection {
    In,
    Out,
}

/// Direction-qualified endpoint of an edge: `Out` is the source vertex,
/// `In` the target vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeEnd {
    Out,
    In,
}

/// Lifecycle state of an entity vertex, stored under [`STATE_PROPERTY_KEY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityStatus {
    Active,
    Deleted,
    Purged,
}

impl EntityStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "ACTIVE" => Some(Self::Active),
            "DELETED" => Some(Self::Deleted),
            "PURGED" => Some(Self::Purged),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Deleted => "DELETED",
            Self::Purged => "PURGED",
        }
    }
}

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("vertex not found: {0:?}")]
    VertexNotFound(VertexRef),
    #[error("edge not found: {0:?}")]
    EdgeNotFound(EdgeRef),
    #[error("index query against `{index}` failed: {message}")]
    IndexQuery { index: String, message: String },
    #[error("graph query failed: {0}")]
    Query(String),
    #[error("script execution failed: {0}")]
    Script(String),
    #[error("backend has no {0} attached")]
    Unsupported(&'static str),
}

/// Named variables supplied alongside a script, never interpolated into it.
pub type ScriptBindings = HashMap<String, Value>;

/// The backing-store primitives the search core consumes.
///
/// Paging is expressed as `(offset, limit)` on the two batch fetches; an
/// empty result means the query is exhausted. Implementations own their
/// concurrency control; callers issue one blocking call at a time.
pub trait GraphBackend {
    /// Run a text query against a secondary index, returning one page of
    /// matching vertices.
    fn index_query(
        &self,
        index: &str,
        query: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<VertexRef>, GraphError>;

    /// Run a structured predicate query against the graph itself,
    /// returning one page of matching vertices in a stable order.
    fn graph_query(
        &self,
        query: &GraphQuery,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<VertexRef>, GraphError>;

    /// Enumerate the edges incident to `vertex` in the given direction.
    fn edges(&self, vertex: VertexRef, direction: EdgeDirection) -> Result<Vec<EdgeRef>, GraphError>;

    /// Resolve one endpoint of an edge.
    fn edge_vertex(&self, edge: EdgeRef, end: EdgeEnd) -> Result<VertexRef, GraphError>;

    /// Typed property lookup; `None` when the vertex is gone or the
    /// property is unset.
    fn property(&self, vertex: VertexRef, name: &str) -> Option<Value>;

    /// Execute a traversal script with named bound variables, returning
    /// the vertices it materializes.
    fn execute_script(
        &self,
        text: &str,
        bindings: &ScriptBindings,
    ) -> Result<Vec<VertexRef>, GraphError>;
}

/// Global id of an entity vertex, if it carries one.
pub fn entity_guid(backend: &dyn GraphBackend, vertex: VertexRef) -> Option<String> {
    backend
        .property(vertex, GUID_PROPERTY_KEY)
        .and_then(|v| v.as_str().map(str::to_owned))
}

/// Lifecycle state of an entity vertex; `None` when unset or unrecognized.
pub fn entity_status(backend: &dyn GraphBackend, vertex: VertexRef) -> Option<EntityStatus> {
    backend
        .property(vertex, STATE_PROPERTY_KEY)
        .and_then(|v| v.as_str().and_then(EntityStatus::parse))
}
