//! Integration tests for the complete tagscan pipeline
//!
//! These tests verify end-to-end functionality across crates:
//! - Plan construction → index/graph path selection → execution
//! - Residual script filtering through the backend seam
//! - Pipeline composition (classification fetch + attribute refine)
//!
//! Run with: cargo test --test integration_tests

use anyhow::Result;
use serde_json::{json, Value};
use tagscan_graph::{
    EdgeDirection, EdgeEnd, EntityStatus, GraphBackend, MemoryGraph, TYPE_NAME_PROPERTY_KEY,
};
use tagscan_search::{
    AttributeFilterStage, CancelFlag, ClassificationStage, FilterCriteria, FilterOperator,
    QueryPlan, SearchContext, SearchPipeline, SearchRequest, StaticClassifier, TagTypeRef,
};

// ============================================================================
// Fixture: a small catalog with tagged entities
// ============================================================================

/// Entities: tables t0..t5, owners alternating finance/hr, rows = i * 100.
/// Each is tagged PII (tag attribute `level` = i); t5 is DELETED.
fn catalog() -> MemoryGraph {
    let mut g = MemoryGraph::new();
    for i in 0..6 {
        let status = if i == 5 {
            EntityStatus::Deleted
        } else {
            EntityStatus::Active
        };
        let owner = if i % 2 == 0 { "finance" } else { "hr" };
        let e = g.add_entity(
            &format!("t{i}"),
            "Table",
            status,
            [("owner", json!(owner)), ("rows", json!(i * 100))],
        );
        g.add_classification(e, "PII", [("level", json!(i))]);
    }

    g.with_index_adapter(|g, _index, _query| {
        Ok(g
            .vertex_ids()
            .filter(|&v| {
                g.property(v, TYPE_NAME_PROPERTY_KEY)
                    .and_then(|t| t.as_str().map(str::to_owned))
                    .is_some_and(|t| t == "PII")
            })
            .collect())
    })
    .with_script_adapter(|g, _text, bindings| {
        // Semantic double for the generated script: candidates whose
        // closure-typed tag satisfies `level >= p0`.
        let candidates = bindings
            .get("candidateGuids")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let type_names = bindings
            .get("typeNames")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let threshold = bindings.get("p0").and_then(Value::as_i64).unwrap_or(0);

        let mut out = Vec::new();
        for guid in candidates.iter().filter_map(Value::as_str) {
            let Some(entity) = g.find_by_guid(guid) else {
                continue;
            };
            for edge in g.edges(entity, EdgeDirection::Out)? {
                let tag = g.edge_vertex(edge, EdgeEnd::In)?;
                let in_closure = g
                    .property(tag, TYPE_NAME_PROPERTY_KEY)
                    .is_some_and(|t| type_names.contains(&t));
                let level_ok = g
                    .property(tag, "level")
                    .and_then(|v| v.as_i64())
                    .is_some_and(|l| l >= threshold);
                if in_closure && level_ok {
                    out.push(entity);
                    break;
                }
            }
        }
        Ok(out)
    })
}

fn guids(g: &MemoryGraph, vertices: &[tagscan_graph::VertexRef]) -> Vec<String> {
    vertices
        .iter()
        .filter_map(|&v| {
            g.property(v, tagscan_graph::GUID_PROPERTY_KEY)
                .and_then(|p| p.as_str().map(str::to_owned))
        })
        .collect()
}

fn level_request(threshold: i64, limit: usize) -> SearchRequest {
    SearchRequest {
        offset: 0,
        limit,
        exclude_deleted_entities: true,
        tag_type: TagTypeRef::new("PII", Vec::<String>::new()),
        tag_filters: Some(FilterCriteria::cond(
            "level",
            FilterOperator::Gte,
            json!(threshold),
        )),
    }
}

// ============================================================================
// Hybrid planning end to end
// ============================================================================

#[test]
fn index_and_graph_paths_agree_on_results() -> Result<()> {
    let g = catalog();
    let request = level_request(2, 10);

    let indexed = tagscan_search::execute_search(
        &g,
        &StaticClassifier::all_indexed(),
        &request,
        CancelFlag::new(),
    )?;
    let fallback = tagscan_search::execute_search(
        &g,
        &StaticClassifier::new(["level"]),
        &request,
        CancelFlag::new(),
    )?;

    assert_eq!(indexed, fallback);
    assert_eq!(guids(&g, &indexed), ["t2", "t3", "t4"]);
    Ok(())
}

#[test]
fn pipeline_tail_stage_refines_each_batch_before_paging() -> Result<()> {
    let g = catalog();
    let request = level_request(0, 2);

    // Tail stage filters on an *entity* attribute; the classification
    // stage must apply it per batch, before offset/limit accounting.
    let entity_filter = FilterCriteria::cond("owner", FilterOperator::Eq, json!("finance"));
    let plan = QueryPlan::build(&request, &StaticClassifier::all_indexed())?;
    let pipeline = SearchPipeline::new(vec![
        Box::new(ClassificationStage::new(plan)),
        Box::new(AttributeFilterStage::new(&entity_filter)),
    ]);

    let ctx = SearchContext::new(&g, &request, CancelFlag::new());
    let results = pipeline.execute(&ctx)?;

    assert_eq!(guids(&g, &results), ["t0", "t2"]);
    Ok(())
}

#[test]
fn pipeline_refine_is_usable_as_an_upstream_second_stage() -> Result<()> {
    let g = catalog();
    let request = level_request(3, 10);

    let plan = QueryPlan::build(&request, &StaticClassifier::all_indexed())?;
    let pipeline = SearchPipeline::new(vec![Box::new(ClassificationStage::new(plan))]);
    let ctx = SearchContext::new(&g, &request, CancelFlag::new());

    // An upstream processor hands over its own candidate list; the chain
    // replaces it with the residual-filter survivors.
    let mut candidates: Vec<_> = ["t1", "t3", "t4"]
        .iter()
        .filter_map(|guid| g.find_by_guid(guid))
        .collect();
    pipeline.refine(&ctx, &mut candidates)?;

    assert_eq!(guids(&g, &candidates), ["t3", "t4"]);
    Ok(())
}

#[test]
fn deleted_entities_never_surface() -> Result<()> {
    let g = catalog();
    // t5 has the highest level but is DELETED.
    let results = tagscan_search::execute_search(
        &g,
        &StaticClassifier::all_indexed(),
        &level_request(5, 10),
        CancelFlag::new(),
    )?;
    assert!(results.is_empty());
    Ok(())
}
