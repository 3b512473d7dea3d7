//! Search request and per-search context.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tagscan_graph::GraphBackend;

use crate::criteria::FilterCriteria;

/// A classification type together with the closure of itself and all of
/// its subtypes, plus the precomputed index clause for "type is in this
/// closure". Supplied by the type system; the closure always contains the
/// type itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagTypeRef {
    name: String,
    closure: BTreeSet<String>,
    index_clause: String,
}

impl TagTypeRef {
    pub fn new(
        name: impl Into<String>,
        subtypes: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let name = name.into();
        let mut closure: BTreeSet<String> = subtypes.into_iter().map(Into::into).collect();
        closure.insert(name.clone());
        let joined = closure.iter().map(String::as_str).collect::<Vec<_>>().join(" ");
        let index_clause = format!("v.\"__typeName\": ({joined})");
        Self {
            name,
            closure,
            index_clause,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The type and all of its subtypes.
    pub fn type_and_subtypes(&self) -> &BTreeSet<String> {
        &self.closure
    }

    /// The precomputed index-query fragment testing closure membership.
    pub fn index_clause(&self) -> &str {
        &self.index_clause
    }
}

/// One incoming search. Immutable for the lifetime of the request.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Number of post-filter results to skip.
    pub offset: usize,
    /// Page size; must be greater than zero.
    pub limit: usize,
    /// Drop entities whose lifecycle state is not ACTIVE.
    pub exclude_deleted_entities: bool,
    pub tag_type: TagTypeRef,
    pub tag_filters: Option<FilterCriteria>,
}

/// Cooperative cancellation signal, checked once per executor batch.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Everything one search execution needs: the backend handle, the
/// request, and the termination signal. Borrowed collaborators only; no
/// state is shared across requests.
pub struct SearchContext<'a> {
    pub backend: &'a dyn GraphBackend,
    pub request: &'a SearchRequest,
    cancel: CancelFlag,
}

impl<'a> SearchContext<'a> {
    pub fn new(backend: &'a dyn GraphBackend, request: &'a SearchRequest, cancel: CancelFlag) -> Self {
        Self {
            backend,
            request,
            cancel,
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
