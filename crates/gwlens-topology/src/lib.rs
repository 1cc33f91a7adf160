//! gwlens Topology - Resource graphs for Gateway API analysis
//!
//! This crate builds a bounded graph of Kubernetes objects around a set of
//! source objects and enriches it:
//! - `GraphBuilder`: fetches related kinds, wires typed relations, prunes by depth
//! - `gateway`: the Gateway API relation set and typed node views
//! - `extension`: policy attachment, effective policies, reference validation
//! - `impact`: before/after comparison of proposed changes
//! - `dot`: Graphviz export

pub mod builder;
pub mod diagnostic;
pub mod dot;
pub mod error;
pub mod extension;
pub mod gateway;
pub mod graph;
pub mod impact;
pub mod relation;

pub use builder::GraphBuilder;
pub use diagnostic::{DiagnosticReason, ReferenceDiagnostic};
pub use dot::to_dot;
pub use error::{Result, TopologyError};
pub use extension::{Extension, ExtensionData, ExtensionId, ExtensionResult, Pipeline};
pub use graph::{Graph, Node};
pub use impact::{ImpactReport, analyze_changes};
pub use relation::{Relation, RelationId};
