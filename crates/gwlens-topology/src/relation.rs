//! Typed relations between resource kinds
//!
//! A relation declares that objects of group-kind `from` reference objects of
//! group-kind `to`, and knows how to read those references out of a document.

use gwlens_core::{Document, GroupKind, ResourceId};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum RelationId {
    GatewayClassOfGateway,
    ParentGatewaysOfRoute,
    BackendsOfRoute,
    NamespaceOfGateway,
    NamespaceOfRoute,
    NamespaceOfBackend,
    /// Relations registered outside the Gateway API set
    Custom(&'static str),
}

impl fmt::Display for RelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GatewayClassOfGateway => write!(f, "gatewayClass"),
            Self::ParentGatewaysOfRoute => write!(f, "parentGateways"),
            Self::BackendsOfRoute => write!(f, "backends"),
            Self::NamespaceOfGateway
            | Self::NamespaceOfRoute
            | Self::NamespaceOfBackend => write!(f, "namespace"),
            Self::Custom(name) => write!(f, "{}", name),
        }
    }
}

pub type NeighborFn = Arc<dyn Fn(&Document) -> Vec<ResourceId> + Send + Sync>;

#[derive(Clone)]
pub struct Relation {
    pub id: RelationId,
    pub from: GroupKind,
    pub to: GroupKind,
    neighbors: NeighborFn,
}

impl Relation {
    pub fn new(
        id: RelationId,
        from: GroupKind,
        to: GroupKind,
        neighbors: impl Fn(&Document) -> Vec<ResourceId> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id,
            from,
            to,
            neighbors: Arc::new(neighbors),
        }
    }

    /// Every identity the document references through this relation, including
    /// ones of a kind other than `to`. Unreadable documents yield no neighbors.
    pub fn neighbors(&self, document: &Document) -> Vec<ResourceId> {
        (self.neighbors)(document)
    }
}

impl fmt::Debug for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relation")
            .field("id", &self.id)
            .field("from", &self.from)
            .field("to", &self.to)
            .finish_non_exhaustive()
    }
}
