//! Graph construction
//!
//! 1. Compute which kinds can appear within `max_depth` hops of the sources,
//!    by walking the relation schema in both directions.
//! 2. Fetch every object of those kinds.
//! 3. Wire edges for every registered relation.
//! 4. Breadth-first from the sources to assign depths. Namespace nodes are
//!    never expanded; GatewayClass nodes are expanded only as sources.
//! 5. Prune every node the traversal did not reach.

use gwlens_core::config::DEFAULT_MAX_DEPTH;
use gwlens_core::{Document, GroupKind, ResourceFetcher, ResourceId};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::debug;

use crate::error::Result;
use crate::graph::Graph;
use crate::relation::Relation;

pub struct GraphBuilder<'a> {
    fetcher: &'a dyn ResourceFetcher,
    sources: Vec<Document>,
    relations: Vec<Relation>,
    max_depth: usize,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(fetcher: &'a dyn ResourceFetcher) -> Self {
        Self {
            fetcher,
            sources: Vec::new(),
            relations: Vec::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn start_from(mut self, sources: impl IntoIterator<Item = Document>) -> Self {
        self.sources.extend(sources);
        self
    }

    pub fn use_relation(mut self, relation: Relation) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn use_relations(mut self, relations: impl IntoIterator<Item = Relation>) -> Self {
        self.relations.extend(relations);
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub async fn build(self) -> Result<Graph> {
        let mut graph = Graph::new(self.relations, self.max_depth);
        for source in self.sources {
            graph.add_source(source);
        }

        let source_kinds: BTreeSet<GroupKind> =
            graph.sources().map(ResourceId::group_kind).collect();
        let kinds = reachable_kinds(&source_kinds, graph.relations(), self.max_depth);
        debug!(kinds = ?kinds, "group kinds within max depth");

        let only_sources = kinds.len() == 1 && kinds.is_subset(&source_kinds);
        if !only_sources {
            for group_kind in &kinds {
                let documents = self.fetcher.fetch(group_kind).await?;
                debug!(kind = %group_kind, count = documents.len(), "fetched");
                for document in documents {
                    graph.add_node(document);
                }
            }
        }

        graph.wire_relations()?;
        assign_depths(&mut graph);
        prune_unreached(&mut graph);

        debug!(nodes = graph.len(), "graph built");
        Ok(graph)
    }
}

/// Kinds within `max_depth` hops of the source kinds in the relation schema
pub fn reachable_kinds(
    sources: &BTreeSet<GroupKind>,
    relations: &[Relation],
    max_depth: usize,
) -> BTreeSet<GroupKind> {
    let mut depth: BTreeMap<GroupKind, usize> =
        sources.iter().map(|gk| (gk.clone(), 0)).collect();
    let mut queue: VecDeque<GroupKind> = sources.iter().cloned().collect();

    while let Some(current) = queue.pop_front() {
        let next_depth = depth[&current] + 1;
        if next_depth > max_depth {
            continue;
        }
        for relation in relations {
            let neighbor = if relation.from == current {
                &relation.to
            } else if relation.to == current {
                &relation.from
            } else {
                continue;
            };
            if !depth.contains_key(neighbor) {
                depth.insert(neighbor.clone(), next_depth);
                queue.push_back(neighbor.clone());
            }
        }
    }

    depth.into_keys().collect()
}

fn assign_depths(graph: &mut Graph) {
    let max_depth = graph.max_depth();
    let mut queue: VecDeque<ResourceId> = graph.sources().cloned().collect();

    while let Some(id) = queue.pop_front() {
        let Some(node) = graph.node(&id) else {
            continue;
        };
        let Some(depth) = node.depth() else {
            continue;
        };
        // Nodes at max_depth + 1 are leaves
        if depth > max_depth {
            break;
        }

        let group_kind = id.group_kind();
        if group_kind == GroupKind::namespace() {
            continue;
        }
        if group_kind == GroupKind::gateway_class() && depth != 0 {
            continue;
        }

        let neighbors: Vec<ResourceId> = node
            .in_edges()
            .values()
            .chain(node.out_edges().values())
            .flatten()
            .cloned()
            .collect();

        for neighbor in neighbors {
            if graph.node(&neighbor).is_some_and(|n| n.depth().is_none()) {
                graph.set_depth(&neighbor, Some(depth + 1));
                queue.push_back(neighbor);
            }
        }
    }
}

fn prune_unreached(graph: &mut Graph) {
    let unreached: Vec<ResourceId> = graph
        .nodes()
        .filter(|node| node.depth().is_none())
        .map(|node| node.id().clone())
        .collect();

    debug!(count = unreached.len(), "pruning unreached nodes");
    for id in unreached {
        graph.delete_node(&id);
    }
}
