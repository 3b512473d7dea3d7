//! Traversal-script synthesis.
//!
//! When a request carries classification filter predicates, the first
//! fetch stage cannot always evaluate them (the graph path can, the index
//! path only the index-expressible subset, and neither sees predicates on
//! the classification vertex's own neighborhood). The residual filter is
//! a parameterized script: select the candidate entities by id, walk to
//! their attached classification vertices, gate on the type closure,
//! apply the full predicate tree, and project back to the entities.
//!
//! Attribute literals never appear in the script text. Every literal is
//! assigned a generated binding name (`p0`, `p1`, ...) and shipped in the
//! bindings map, which rules out injection through attribute values and
//! lets one script be reused across invocations. The candidate-id set is
//! bound per invocation under [`CANDIDATE_GUIDS_BINDING`].

use serde_json::Value;
use tagscan_graph::ScriptBindings;

use crate::context::TagTypeRef;
use crate::criteria::{Combinator, FilterCriteria, FilterOperator};

/// Binding holding the candidate entity-id set, supplied per invocation.
pub const CANDIDATE_GUIDS_BINDING: &str = "candidateGuids";

/// Binding holding the classification type closure, fixed at build time.
pub const TYPE_NAMES_BINDING: &str = "typeNames";

/// A traversal script plus the bound variables fixed at construction.
#[derive(Debug, Clone)]
pub struct TraversalScript {
    pub text: String,
    pub bindings: ScriptBindings,
}

/// Build the residual classification filter script.
pub fn build_traversal_script(tag_type: &TagTypeRef, criteria: &FilterCriteria) -> TraversalScript {
    let mut bindings = ScriptBindings::new();
    bindings.insert(
        TYPE_NAMES_BINDING.to_owned(),
        Value::Array(
            tag_type
                .type_and_subtypes()
                .iter()
                .cloned()
                .map(Value::String)
                .collect(),
        ),
    );

    let mut next_param = 0usize;
    let filter = predicate_expr(criteria, &mut bindings, &mut next_param);

    let text = format!(
        "g.V().has('__guid', within({CANDIDATE_GUIDS_BINDING})).as('e')\
         .out('__classifiedAs').has('__typeName', within({TYPE_NAMES_BINDING}))\
         .and({filter})\
         .select('e').dedup().toList()"
    );

    TraversalScript { text, bindings }
}

fn predicate_expr(
    criteria: &FilterCriteria,
    bindings: &mut ScriptBindings,
    next_param: &mut usize,
) -> String {
    match criteria {
        FilterCriteria::Cond {
            attribute,
            operator,
            value,
        } => {
            let param = format!("p{next_param}");
            *next_param += 1;
            bindings.insert(param.clone(), value.clone());
            format!("has('{attribute}', {})", operator_step(*operator, &param))
        }
        FilterCriteria::Group {
            combinator,
            children,
        } => {
            let parts: Vec<String> = children
                .iter()
                .map(|c| predicate_expr(c, bindings, next_param))
                .collect();
            match combinator {
                Combinator::And => format!("and({})", parts.join(", ")),
                Combinator::Or => format!("or({})", parts.join(", ")),
            }
        }
    }
}

fn operator_step(operator: FilterOperator, param: &str) -> String {
    let step = match operator {
        FilterOperator::Eq => "eq",
        FilterOperator::Neq => "neq",
        FilterOperator::Lt => "lt",
        FilterOperator::Lte => "lte",
        FilterOperator::Gt => "gt",
        FilterOperator::Gte => "gte",
        FilterOperator::Contains => "containing",
        FilterOperator::StartsWith => "startingWith",
        FilterOperator::EndsWith => "endingWith",
    };
    format!("{step}({param})")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pii() -> TagTypeRef {
        TagTypeRef::new("PII", ["GDPR_PII"])
    }

    #[test]
    fn literals_only_surface_as_bindings() {
        let tree = FilterCriteria::and(vec![
            FilterCriteria::cond("owner", FilterOperator::Eq, json!("finance")),
            FilterCriteria::or(vec![
                FilterCriteria::cond("level", FilterOperator::Gt, json!(3)),
                FilterCriteria::cond("source", FilterOperator::Contains, json!("crm")),
            ]),
        ]);
        let script = build_traversal_script(&pii(), &tree);

        assert!(!script.text.contains("finance"));
        assert!(!script.text.contains("crm"));
        assert_eq!(script.bindings.get("p0"), Some(&json!("finance")));
        assert_eq!(script.bindings.get("p1"), Some(&json!(3)));
        assert_eq!(script.bindings.get("p2"), Some(&json!("crm")));
        assert_eq!(
            script.bindings.get(TYPE_NAMES_BINDING),
            Some(&json!(["GDPR_PII", "PII"]))
        );
        // Candidates are bound per invocation, never at build time.
        assert!(!script.bindings.contains_key(CANDIDATE_GUIDS_BINDING));
    }

    #[test]
    fn script_shape_walks_tag_edges_and_projects_back() {
        let tree = FilterCriteria::cond("owner", FilterOperator::Eq, json!("finance"));
        let script = build_traversal_script(&pii(), &tree);
        assert_eq!(
            script.text,
            "g.V().has('__guid', within(candidateGuids)).as('e')\
             .out('__classifiedAs').has('__typeName', within(typeNames))\
             .and(has('owner', eq(p0)))\
             .select('e').dedup().toList()"
        );
    }

    #[test]
    fn nested_combinators_keep_their_nesting() {
        let tree = FilterCriteria::or(vec![
            FilterCriteria::cond("a", FilterOperator::Lte, json!(1)),
            FilterCriteria::and(vec![
                FilterCriteria::cond("b", FilterOperator::StartsWith, json!("x")),
                FilterCriteria::cond("c", FilterOperator::Neq, json!("y")),
            ]),
        ]);
        let script = build_traversal_script(&pii(), &tree);
        assert!(script.text.contains(
            "or(has('a', lte(p0)), and(has('b', startingWith(p1)), has('c', neq(p2))))"
        ));
    }
}
