//! In-memory reference backend.
//!
//! `MemoryGraph` stores vertices and edges in insertion order, which makes
//! query results deterministic: `graph_query` scans vertices in the order
//! they were added and pages with offset/limit. The two string-DSL
//! primitives (secondary index queries, traversal scripts) are engines of
//! their own in a real deployment, so here they are pluggable adapters;
//! without one attached the corresponding call fails with
//! [`GraphError::Unsupported`].

use std::collections::HashMap;

use serde_json::Value;

use crate::query::GraphQuery;
use crate::{
    EdgeDirection, EdgeEnd, EdgeRef, EntityStatus, GraphBackend, GraphError, ScriptBindings,
    VertexRef, CLASSIFICATION_EDGE_LABEL, GUID_PROPERTY_KEY, STATE_PROPERTY_KEY,
    TYPE_NAME_PROPERTY_KEY,
};

type IndexAdapter =
    Box<dyn Fn(&MemoryGraph, &str, &str) -> Result<Vec<VertexRef>, GraphError> + Send + Sync>;
type ScriptAdapter = Box<
    dyn Fn(&MemoryGraph, &str, &ScriptBindings) -> Result<Vec<VertexRef>, GraphError>
        + Send
        + Sync,
>;

#[derive(Debug, Default)]
struct VertexData {
    properties: HashMap<String, Value>,
}

#[derive(Debug)]
struct EdgeData {
    label: String,
    from: VertexRef,
    to: VertexRef,
}

#[derive(Default)]
pub struct MemoryGraph {
    vertices: Vec<VertexData>,
    edges: Vec<EdgeData>,
    index_adapter: Option<IndexAdapter>,
    script_adapter: Option<ScriptAdapter>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the secondary-index engine. The adapter returns the full
    /// ordered match list; the graph applies offset/limit paging.
    pub fn with_index_adapter(
        mut self,
        adapter: impl Fn(&MemoryGraph, &str, &str) -> Result<Vec<VertexRef>, GraphError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.index_adapter = Some(Box::new(adapter));
        self
    }

    /// Attach the script engine.
    pub fn with_script_adapter(
        mut self,
        adapter: impl Fn(&MemoryGraph, &str, &ScriptBindings) -> Result<Vec<VertexRef>, GraphError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.script_adapter = Some(Box::new(adapter));
        self
    }

    pub fn add_vertex<K: Into<String>>(
        &mut self,
        properties: impl IntoIterator<Item = (K, Value)>,
    ) -> VertexRef {
        let id = VertexRef::new(self.vertices.len() as u64);
        self.vertices.push(VertexData {
            properties: properties
                .into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect(),
        });
        id
    }

    pub fn add_edge(&mut self, label: &str, from: VertexRef, to: VertexRef) -> EdgeRef {
        let id = EdgeRef::new(self.edges.len() as u64);
        self.edges.push(EdgeData {
            label: label.to_owned(),
            from,
            to,
        });
        id
    }

    /// Add an entity vertex with the well-known identity properties set.
    pub fn add_entity<K: Into<String>>(
        &mut self,
        guid: &str,
        type_name: &str,
        status: EntityStatus,
        attributes: impl IntoIterator<Item = (K, Value)>,
    ) -> VertexRef {
        let mut properties: HashMap<String, Value> = attributes
            .into_iter()
            .map(|(k, v)| (k.into(), v))
            .collect();
        properties.insert(GUID_PROPERTY_KEY.into(), Value::String(guid.into()));
        properties.insert(TYPE_NAME_PROPERTY_KEY.into(), Value::String(type_name.into()));
        properties.insert(
            STATE_PROPERTY_KEY.into(),
            Value::String(status.as_str().into()),
        );
        let id = VertexRef::new(self.vertices.len() as u64);
        self.vertices.push(VertexData { properties });
        id
    }

    /// Add a classification vertex and link it to its entity via a
    /// [`CLASSIFICATION_EDGE_LABEL`] edge (entity is the edge source).
    pub fn add_classification<K: Into<String>>(
        &mut self,
        entity: VertexRef,
        type_name: &str,
        attributes: impl IntoIterator<Item = (K, Value)>,
    ) -> VertexRef {
        let mut properties: HashMap<String, Value> = attributes
            .into_iter()
            .map(|(k, v)| (k.into(), v))
            .collect();
        properties.insert(TYPE_NAME_PROPERTY_KEY.into(), Value::String(type_name.into()));
        let tag = VertexRef::new(self.vertices.len() as u64);
        self.vertices.push(VertexData { properties });
        self.add_edge(CLASSIFICATION_EDGE_LABEL, entity, tag);
        tag
    }

    /// Look an entity up by guid; handy for script adapters.
    pub fn find_by_guid(&self, guid: &str) -> Option<VertexRef> {
        self.vertices.iter().position(|data| {
            data.properties
                .get(GUID_PROPERTY_KEY)
                .and_then(Value::as_str)
                == Some(guid)
        })
        .map(|i| VertexRef::new(i as u64))
    }

    /// All vertex handles in insertion order.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexRef> + '_ {
        (0..self.vertices.len() as u64).map(VertexRef::new)
    }

    fn data(&self, vertex: VertexRef) -> Result<&VertexData, GraphError> {
        self.vertices
            .get(vertex.raw() as usize)
            .ok_or(GraphError::VertexNotFound(vertex))
    }
}

impl GraphBackend for MemoryGraph {
    fn index_query(
        &self,
        index: &str,
        query: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<VertexRef>, GraphError> {
        let adapter = self
            .index_adapter
            .as_ref()
            .ok_or(GraphError::Unsupported("secondary index"))?;
        let matches = adapter(self, index, query)?;
        Ok(matches.into_iter().skip(offset).take(limit).collect())
    }

    fn graph_query(
        &self,
        query: &GraphQuery,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<VertexRef>, GraphError> {
        Ok(self
            .vertices
            .iter()
            .enumerate()
            .filter(|(_, data)| {
                query
                    .predicate
                    .matches(&|name| data.properties.get(name).cloned())
            })
            .map(|(i, _)| VertexRef::new(i as u64))
            .skip(offset)
            .take(limit)
            .collect())
    }

    fn edges(&self, vertex: VertexRef, direction: EdgeDirection) -> Result<Vec<EdgeRef>, GraphError> {
        self.data(vertex)?;
        Ok(self
            .edges
            .iter()
            .enumerate()
            .filter(|(_, edge)| match direction {
                EdgeDirection::In => edge.to == vertex,
                EdgeDirection::Out => edge.from == vertex,
            })
            .map(|(i, _)| EdgeRef::new(i as u64))
            .collect())
    }

    fn edge_vertex(&self, edge: EdgeRef, end: EdgeEnd) -> Result<VertexRef, GraphError> {
        let data = self
            .edges
            .get(edge.raw() as usize)
            .ok_or(GraphError::EdgeNotFound(edge))?;
        Ok(match end {
            EdgeEnd::Out => data.from,
            EdgeEnd::In => data.to,
        })
    }

    fn property(&self, vertex: VertexRef, name: &str) -> Option<Value> {
        self.vertices
            .get(vertex.raw() as usize)
            .and_then(|data| data.properties.get(name).cloned())
    }

    fn execute_script(
        &self,
        text: &str,
        bindings: &ScriptBindings,
    ) -> Result<Vec<VertexRef>, GraphError> {
        let adapter = self
            .script_adapter
            .as_ref()
            .ok_or(GraphError::Unsupported("script engine"))?;
        adapter(self, text, bindings)
    }
}
