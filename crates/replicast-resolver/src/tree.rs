use std::collections::BTreeMap;

use replicast_store::Term;
use replicast_types::reserved::DESTINATION_TAXONOMY;
use serde::{Deserialize, Serialize};

/// Default terms that never replicate.
const EXCLUDED_SLUGS: [&str; 2] = ["uncategorized", "untagged"];

/// One node of a local term hierarchy, children nested.
///
/// Nodes are immutable once built; resolution produces a fresh
/// [`ResolvedTermNode`] tree instead of rewriting this one in place.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermNode {
    #[serde(flatten)]
    pub term: Term,
    /// Language → local term id, when the host tracks translations.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub translations: BTreeMap<String, u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TermNode>,
}

impl TermNode {
    /// A leaf node without translations.
    pub fn leaf(term: Term) -> Self {
        Self {
            term,
            translations: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Total number of nodes in this subtree, including self.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(TermNode::count).sum::<usize>()
    }
}

/// Build the hierarchical forest for a flat term list.
///
/// Roots are terms without a parent in the list's taxonomy; children are
/// attached depth-first under their parents. Terms of the destination
/// taxonomy and host default terms are excluded — the destination
/// assignment selects where to replicate, it is not itself content.
pub fn build_hierarchy(
    terms: &[Term],
    translations: &BTreeMap<u64, BTreeMap<String, u64>>,
) -> Vec<TermNode> {
    terms
        .iter()
        .filter(|t| t.parent.is_none() && included(t))
        .map(|t| build_node(t, terms, translations))
        .collect()
}

fn included(term: &Term) -> bool {
    term.taxonomy != DESTINATION_TAXONOMY && !EXCLUDED_SLUGS.contains(&term.slug.as_str())
}

fn build_node(
    term: &Term,
    terms: &[Term],
    translations: &BTreeMap<u64, BTreeMap<String, u64>>,
) -> TermNode {
    let children = terms
        .iter()
        .filter(|t| t.parent == Some(term.id) && included(t))
        .map(|t| build_node(t, terms, translations))
        .collect();
    TermNode {
        term: term.clone(),
        translations: translations.get(&term.id).cloned().unwrap_or_default(),
        children,
    }
}

/// A term node rewritten for one destination.
///
/// `id` and `parent` are `null` when no descriptor exists on the
/// destination; such nodes are create-on-destination, and the assigned id
/// comes back in the response keyed by `source` (the local term id).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTermNode {
    pub id: Option<u64>,
    pub taxonomy_ref: Option<u64>,
    pub parent: Option<u64>,
    pub taxonomy: String,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    /// The local term id on the sending side.
    pub source: u64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub translations: BTreeMap<String, u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ResolvedTermNode>,
}

impl ResolvedTermNode {
    /// Walk the tree depth-first, parents before children.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a ResolvedTermNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    /// Flatten the tree depth-first into (local id, node) pairs.
    pub fn flatten(&self) -> Vec<&ResolvedTermNode> {
        let mut nodes = Vec::with_capacity(1 + self.children.len());
        self.walk(&mut |node| nodes.push(node));
        nodes
    }
}
