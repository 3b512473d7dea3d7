//! Attribute classifier seam.
//!
//! Deciding whether a predicate can be pushed into the secondary index is
//! a schema question (indexed attribute? index-friendly operator?), owned
//! by the type system rather than this crate. The planner consumes the
//! decision through [`AttributeClassifier`]; [`StaticClassifier`] is the
//! set-membership implementation used when the traversal-only attributes
//! are known up front.

use ahash::AHashSet;

use crate::criteria::FilterCriteria;

/// The classifier's verdict over one filter tree.
#[derive(Debug, Default)]
pub struct AttributeSplit {
    /// Attributes whose predicates the index can evaluate.
    pub index: AHashSet<String>,
    /// Attributes that require graph traversal to evaluate.
    pub traversal: AHashSet<String>,
    /// Every attribute referenced by the tree.
    pub all: AHashSet<String>,
}

pub trait AttributeClassifier {
    /// Split the tree's attributes into index-expressible and
    /// traversal-only sets.
    fn split_attributes(&self, criteria: Option<&FilterCriteria>) -> AttributeSplit;

    /// Whether the entire tree (attributes and operators) can be pushed
    /// into the index.
    fn is_fully_index_expressible(&self, criteria: Option<&FilterCriteria>) -> bool;
}

/// Classifier backed by a fixed set of traversal-only attribute names;
/// everything else is considered index-expressible.
#[derive(Debug, Default)]
pub struct StaticClassifier {
    traversal_only: AHashSet<String>,
}

impl StaticClassifier {
    pub fn new(traversal_only: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            traversal_only: traversal_only.into_iter().map(Into::into).collect(),
        }
    }

    /// A classifier that considers every attribute index-expressible.
    pub fn all_indexed() -> Self {
        Self::default()
    }
}

impl AttributeClassifier for StaticClassifier {
    fn split_attributes(&self, criteria: Option<&FilterCriteria>) -> AttributeSplit {
        let mut split = AttributeSplit::default();
        let Some(criteria) = criteria else {
            return split;
        };
        for attribute in criteria.attributes() {
            if self.traversal_only.contains(&attribute) {
                split.traversal.insert(attribute.clone());
            } else {
                split.index.insert(attribute.clone());
            }
            split.all.insert(attribute);
        }
        split
    }

    fn is_fully_index_expressible(&self, criteria: Option<&FilterCriteria>) -> bool {
        criteria.is_none_or(|c| {
            c.attributes()
                .iter()
                .all(|a| !self.traversal_only.contains(a))
        })
    }
}
