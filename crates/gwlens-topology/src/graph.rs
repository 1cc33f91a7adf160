//! Resource graph
//!
//! Nodes are indexed by group-kind, then namespaced name. Edges are stored on
//! both endpoints, labelled with the relation that produced them, so a node
//! can be walked in either direction without a global edge list.

use gwlens_core::{Document, GroupKind, NamespacedName, ResourceId};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Result, TopologyError};
use crate::extension::{ExtensionData, ExtensionId, ExtensionResult};
use crate::relation::{Relation, RelationId};

pub type Edges = BTreeMap<RelationId, BTreeSet<ResourceId>>;

#[derive(Debug, Clone)]
pub struct Node {
    id: ResourceId,
    document: Document,
    out_edges: Edges,
    in_edges: Edges,
    /// Hops from the nearest source; `None` until reached by the traversal
    depth: Option<usize>,
    metadata: BTreeMap<ExtensionId, ExtensionData>,
}

impl Node {
    pub fn new(document: Document) -> Self {
        Self {
            id: document.resource_id(),
            document,
            out_edges: Edges::new(),
            in_edges: Edges::new(),
            depth: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn depth(&self) -> Option<usize> {
        self.depth
    }

    pub fn is_source(&self) -> bool {
        self.depth == Some(0)
    }

    pub fn out_edges(&self) -> &Edges {
        &self.out_edges
    }

    pub fn in_edges(&self) -> &Edges {
        &self.in_edges
    }

    /// Targets of this node's outgoing edges for one relation
    pub fn out_ids(&self, relation: RelationId) -> impl Iterator<Item = &ResourceId> {
        self.out_edges.get(&relation).into_iter().flatten()
    }

    /// Origins of this node's incoming edges for one relation
    pub fn in_ids(&self, relation: RelationId) -> impl Iterator<Item = &ResourceId> {
        self.in_edges.get(&relation).into_iter().flatten()
    }

    /// Typed metadata written by extension `T`
    pub fn metadata<T: ExtensionResult>(&self) -> Result<Option<&T>> {
        match self.metadata.get(&T::ID) {
            None => Ok(None),
            Some(data) => T::from_data(data)
                .map(Some)
                .ok_or_else(|| self.mismatch(T::ID)),
        }
    }

    /// Typed metadata of extension `T`, created empty if absent
    pub fn metadata_or_default<T: ExtensionResult + Default>(&mut self) -> Result<&mut T> {
        let error = self.mismatch(T::ID);
        let data = self
            .metadata
            .entry(T::ID)
            .or_insert_with(|| T::default().into_data());
        T::from_data_mut(data).ok_or(error)
    }

    pub fn set_metadata<T: ExtensionResult>(&mut self, value: T) {
        self.metadata.insert(T::ID, value.into_data());
    }

    /// Store metadata without checking that it matches the key
    pub fn insert_raw_metadata(&mut self, id: ExtensionId, data: ExtensionData) {
        self.metadata.insert(id, data);
    }

    pub fn remove_metadata(&mut self, id: ExtensionId) -> Option<ExtensionData> {
        self.metadata.remove(&id)
    }

    pub fn raw_metadata(&self) -> &BTreeMap<ExtensionId, ExtensionData> {
        &self.metadata
    }

    fn mismatch(&self, extension: ExtensionId) -> TopologyError {
        TopologyError::MetadataMismatch {
            extension,
            node: self.id.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: BTreeMap<GroupKind, BTreeMap<NamespacedName, Node>>,
    sources: BTreeSet<ResourceId>,
    relations: Vec<Relation>,
    max_depth: usize,
}

impl Graph {
    pub fn new(relations: Vec<Relation>, max_depth: usize) -> Self {
        Self {
            nodes: BTreeMap::new(),
            sources: BTreeSet::new(),
            relations,
            max_depth,
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn relation(&self, id: RelationId) -> Option<&Relation> {
        self.relations.iter().find(|r| r.id == id)
    }

    /// Insert a node for `document` if none exists with its identity.
    /// Returns whether a node was inserted.
    pub fn add_node(&mut self, document: Document) -> bool {
        let group_kind = document.group_kind();
        let name = document.namespaced_name();
        let nodes = self.nodes.entry(group_kind).or_default();
        if nodes.contains_key(&name) {
            return false;
        }
        nodes.insert(name, Node::new(document));
        true
    }

    /// Insert or mark a source node. Sources sit at depth 0.
    pub fn add_source(&mut self, document: Document) {
        let id = document.resource_id();
        self.add_node(document);
        if let Some(node) = self.node_mut(&id) {
            node.depth = Some(0);
        }
        self.sources.insert(id);
    }

    pub fn sources(&self) -> impl Iterator<Item = &ResourceId> {
        self.sources.iter()
    }

    pub fn has_node(&self, id: &ResourceId) -> bool {
        self.node(id).is_some()
    }

    pub fn node(&self, id: &ResourceId) -> Option<&Node> {
        self.nodes.get(&id.group_kind())?.get(&id.namespaced_name())
    }

    pub fn node_mut(&mut self, id: &ResourceId) -> Option<&mut Node> {
        self.nodes
            .get_mut(&id.group_kind())?
            .get_mut(&id.namespaced_name())
    }

    fn require_mut(&mut self, id: &ResourceId) -> Result<&mut Node> {
        self.node_mut(id).ok_or_else(|| TopologyError::NodeNotFound {
            id: id.to_string(),
        })
    }

    /// All nodes, ordered by group-kind then namespaced name
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().flat_map(BTreeMap::values)
    }

    pub fn nodes_of(&self, group_kind: &GroupKind) -> impl Iterator<Item = &Node> {
        self.nodes.get(group_kind).into_iter().flat_map(BTreeMap::values)
    }

    pub fn node_ids_of(&self, group_kind: &GroupKind) -> Vec<ResourceId> {
        self.nodes_of(group_kind).map(|n| n.id.clone()).collect()
    }

    pub fn node_ids(&self) -> Vec<ResourceId> {
        self.nodes().map(|n| n.id.clone()).collect()
    }

    pub fn group_kinds(&self) -> impl Iterator<Item = &GroupKind> {
        self.nodes.keys()
    }

    pub fn len(&self) -> usize {
        self.nodes.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record `from -[relation]-> to` on both endpoints
    pub fn add_edge(&mut self, from: &ResourceId, to: &ResourceId, relation: RelationId) -> Result<()> {
        if !self.has_node(to) {
            return Err(TopologyError::NodeNotFound { id: to.to_string() });
        }
        self.require_mut(from)?
            .out_edges
            .entry(relation)
            .or_default()
            .insert(to.clone());
        self.require_mut(to)?
            .in_edges
            .entry(relation)
            .or_default()
            .insert(from.clone());
        Ok(())
    }

    pub fn remove_edge(&mut self, from: &ResourceId, to: &ResourceId, relation: RelationId) {
        if let Some(node) = self.node_mut(from) {
            remove_from(&mut node.out_edges, relation, to);
        }
        if let Some(node) = self.node_mut(to) {
            remove_from(&mut node.in_edges, relation, from);
        }
    }

    /// Remove a node together with every edge touching it
    pub fn delete_node(&mut self, id: &ResourceId) -> Option<Node> {
        let node = self.node(id)?;
        let outgoing = flatten_edges(&node.out_edges);
        let incoming = flatten_edges(&node.in_edges);

        for (relation, to) in outgoing {
            self.remove_edge(id, &to, relation);
        }
        for (relation, from) in incoming {
            self.remove_edge(&from, id, relation);
        }

        let group_kind = id.group_kind();
        let nodes = self.nodes.get_mut(&group_kind)?;
        let removed = nodes.remove(&id.namespaced_name());
        if nodes.is_empty() {
            self.nodes.remove(&group_kind);
        }
        self.sources.remove(id);
        removed
    }

    /// Swap a node's document, keeping its edges and depth
    pub fn replace_document(&mut self, id: &ResourceId, document: Document) -> Result<()> {
        let replacement = document.resource_id();
        if replacement != *id {
            return Err(TopologyError::IdentityChange {
                id: id.to_string(),
                replacement: replacement.to_string(),
            });
        }
        self.require_mut(id)?.document = document;
        Ok(())
    }

    /// Wire every registered relation over the current node set.
    /// References to absent nodes produce no edge.
    pub fn wire_relations(&mut self) -> Result<()> {
        let ids = self.node_ids();
        for id in ids {
            self.wire_node(&id)?;
        }
        Ok(())
    }

    /// Recompute a node's outgoing edges from its current document
    pub fn rewire_node(&mut self, id: &ResourceId) -> Result<()> {
        let node = self.node(id).ok_or_else(|| TopologyError::NodeNotFound {
            id: id.to_string(),
        })?;
        for (relation, to) in flatten_edges(&node.out_edges) {
            self.remove_edge(id, &to, relation);
        }
        self.wire_node(id)
    }

    fn wire_node(&mut self, id: &ResourceId) -> Result<()> {
        let Some(node) = self.node(id) else {
            return Ok(());
        };

        let edges: Vec<(RelationId, ResourceId)> = self
            .relations
            .iter()
            .filter(|relation| id.is_kind(&relation.from))
            .flat_map(|relation| {
                relation
                    .neighbors(node.document())
                    .into_iter()
                    .filter(|to| to.is_kind(&relation.to))
                    .map(move |to| (relation.id, to))
            })
            .collect();

        for (relation, to) in edges {
            if self.has_node(&to) {
                self.add_edge(id, &to, relation)?;
            }
        }
        Ok(())
    }

    /// Nodes reached from `id` through `relation`
    pub fn out_neighbors(&self, id: &ResourceId, relation: RelationId) -> Vec<&Node> {
        self.node(id)
            .map(|node| node.out_ids(relation).filter_map(|n| self.node(n)).collect())
            .unwrap_or_default()
    }

    /// Nodes reaching `id` through `relation`
    pub fn in_neighbors(&self, id: &ResourceId, relation: RelationId) -> Vec<&Node> {
        self.node(id)
            .map(|node| node.in_ids(relation).filter_map(|n| self.node(n)).collect())
            .unwrap_or_default()
    }

    pub(crate) fn set_depth(&mut self, id: &ResourceId, depth: Option<usize>) {
        if let Some(node) = self.node_mut(id) {
            node.depth = depth;
        }
    }

    /// Drop one extension's metadata from every node
    pub fn remove_metadata(&mut self, extension: ExtensionId) {
        for nodes in self.nodes.values_mut() {
            for node in nodes.values_mut() {
                node.metadata.remove(&extension);
            }
        }
    }
}

fn flatten_edges(edges: &Edges) -> Vec<(RelationId, ResourceId)> {
    edges
        .iter()
        .flat_map(|(relation, ids)| ids.iter().map(|id| (*relation, id.clone())))
        .collect()
}

fn remove_from(edges: &mut Edges, relation: RelationId, id: &ResourceId) {
    if let Some(ids) = edges.get_mut(&relation) {
        ids.remove(id);
        if ids.is_empty() {
            edges.remove(&relation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(kind: &str, namespace: &str, name: &str, spec: &str) -> Document {
        Document::from_yaml(&format!(
            "apiVersion: test.io/v1\nkind: {kind}\nmetadata:\n  name: {name}\n  namespace: \"{namespace}\"\nspec: {spec}\n"
        ))
        .unwrap()
    }

    fn pointer_relation() -> Relation {
        Relation::new(
            RelationId::Custom("points"),
            GroupKind::new("test.io", "A"),
            GroupKind::new("test.io", "B"),
            |d| {
                d.get("spec.target")
                    .and_then(|t| t.as_str())
                    .map(|t| vec![ResourceId::new("test.io", "B", d.namespace(), t)])
                    .unwrap_or_default()
            },
        )
    }

    fn graph() -> Graph {
        let mut graph = Graph::new(vec![pointer_relation()], 3);
        graph.add_node(doc("A", "ns", "a1", "{target: b1}"));
        graph.add_node(doc("A", "ns", "a2", "{target: missing}"));
        graph.add_node(doc("B", "ns", "b1", "{}"));
        graph.wire_relations().unwrap();
        graph
    }

    #[test]
    fn test_wiring_skips_missing_targets() {
        let graph = graph();
        let a1 = ResourceId::new("test.io", "A", "ns", "a1");
        let a2 = ResourceId::new("test.io", "A", "ns", "a2");
        let b1 = ResourceId::new("test.io", "B", "ns", "b1");

        let relation = RelationId::Custom("points");
        assert_eq!(graph.node(&a1).unwrap().out_ids(relation).count(), 1);
        assert_eq!(graph.node(&a2).unwrap().out_ids(relation).count(), 0);
        assert_eq!(graph.in_neighbors(&b1, relation)[0].id(), &a1);
    }

    #[test]
    fn test_delete_node_removes_edges() {
        let mut graph = graph();
        let a1 = ResourceId::new("test.io", "A", "ns", "a1");
        let b1 = ResourceId::new("test.io", "B", "ns", "b1");

        graph.delete_node(&b1).unwrap();
        assert!(!graph.has_node(&b1));
        assert!(graph.node(&a1).unwrap().out_edges().is_empty());
        assert_eq!(graph.group_kinds().count(), 1);

        for node in graph.nodes() {
            for ids in node.out_edges().values().chain(node.in_edges().values()) {
                assert!(ids.iter().all(|id| graph.has_node(id)));
            }
        }
    }

    #[test]
    fn test_add_edge_requires_both_nodes() {
        let mut graph = graph();
        let a1 = ResourceId::new("test.io", "A", "ns", "a1");
        let ghost = ResourceId::new("test.io", "B", "ns", "ghost");
        assert!(matches!(
            graph.add_edge(&a1, &ghost, RelationId::Custom("points")),
            Err(TopologyError::NodeNotFound { .. })
        ));
    }

    #[test]
    fn test_replace_document_and_rewire() {
        let mut graph = graph();
        graph.add_node(doc("B", "ns", "b2", "{}"));
        let a1 = ResourceId::new("test.io", "A", "ns", "a1");
        let b1 = ResourceId::new("test.io", "B", "ns", "b1");
        let b2 = ResourceId::new("test.io", "B", "ns", "b2");

        graph
            .replace_document(&a1, doc("A", "ns", "a1", "{target: b2}"))
            .unwrap();
        graph.rewire_node(&a1).unwrap();

        let targets: Vec<_> = graph
            .out_neighbors(&a1, RelationId::Custom("points"))
            .into_iter()
            .map(|n| n.id().clone())
            .collect();
        assert_eq!(targets, vec![b2]);
        assert!(graph.node(&b1).unwrap().in_edges().is_empty());
    }

    #[test]
    fn test_replace_document_rejects_identity_change() {
        let mut graph = graph();
        let a1 = ResourceId::new("test.io", "A", "ns", "a1");
        let err = graph
            .replace_document(&a1, doc("A", "ns", "renamed", "{}"))
            .unwrap_err();
        assert!(matches!(err, TopologyError::IdentityChange { .. }));
    }

    #[test]
    fn test_sources_have_depth_zero() {
        let mut graph = Graph::new(vec![], 3);
        graph.add_source(doc("A", "ns", "a1", "{}"));
        let node = graph.nodes().next().unwrap();
        assert!(node.is_source());
        assert_eq!(graph.sources().count(), 1);
    }
}
