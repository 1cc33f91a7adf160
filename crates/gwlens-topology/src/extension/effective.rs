//! Effective policies
//!
//! Folds attached policies down the hierarchy
//! `GatewayClass -> Namespace -> Gateway -> Namespace -> HTTPRoute -> Namespace -> Service`.
//!
//! Ancestor levels contribute only inheritable policies. A node's own level
//! contributes everything attached to it. Routes and backends get one merged
//! map per gateway they are reachable through, since each gateway may carry
//! different policies.

use async_trait::async_trait;
use gwlens_core::{GroupKind, ResourceId};
use gwlens_policy::merge::inheritable_only;
use gwlens_policy::{
    Policy, PolicyMap, merge_different_hierarchy, merge_same_hierarchy, merge_same_kind,
};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::direct::attached;
use super::{Extension, ExtensionId};
use crate::error::Result;
use crate::gateway::{BackendView, GatewayView, RouteView};
use crate::graph::{Graph, Node};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectivePolicies {
    /// Inheritable policies attached to ancestors, keyed by policy identity
    pub inherited: BTreeMap<ResourceId, Policy>,
    /// Merged policies of a Gateway
    pub effective: Option<PolicyMap>,
    /// Merged policies of a route or backend, per gateway it is reached through
    pub effective_by_gateway: BTreeMap<ResourceId, PolicyMap>,
}

pub struct EffectivePolicyExtension;

#[async_trait]
impl Extension for EffectivePolicyExtension {
    fn id(&self) -> ExtensionId {
        ExtensionId::EffectivePolicy
    }

    fn dependencies(&self) -> &'static [ExtensionId] {
        &[ExtensionId::DirectlyAttachedPolicy]
    }

    async fn execute(&self, graph: &mut Graph) -> Result<()> {
        graph.remove_metadata(self.id());

        inherit_into_gateways(graph)?;
        inherit_into_routes(graph)?;
        inherit_into_backends(graph)?;

        effective_for_gateways(graph)?;
        effective_for_routes(graph)?;
        effective_for_backends(graph)
    }
}

fn inheritable_attached(node: &Node) -> Result<BTreeMap<ResourceId, Policy>> {
    Ok(attached(node)?
        .inheritable()
        .map(|policy| (policy.id(), policy.clone()))
        .collect())
}

fn inherited_of(node: &Node) -> Result<BTreeMap<ResourceId, Policy>> {
    Ok(node
        .metadata::<EffectivePolicies>()?
        .map(|meta| meta.inherited.clone())
        .unwrap_or_default())
}

/// Merge one level: ancestors contribute inheritable policies only
fn ancestor_level(node: &Node) -> Result<PolicyMap> {
    Ok(merge_same_kind(inheritable_attached(node)?.into_values())?)
}

fn own_level(node: &Node) -> Result<PolicyMap> {
    Ok(merge_same_kind(attached(node)?.policies.into_values())?)
}

fn store(
    graph: &mut Graph,
    updates: Vec<(ResourceId, impl FnOnce(&mut EffectivePolicies))>,
) -> Result<()> {
    for (id, update) in updates {
        if let Some(node) = graph.node_mut(&id) {
            update(node.metadata_or_default::<EffectivePolicies>()?);
        }
    }
    Ok(())
}

fn inherit_into_gateways(graph: &mut Graph) -> Result<()> {
    let mut updates = Vec::new();
    for node in graph.nodes_of(&GroupKind::gateway()) {
        let view = GatewayView::new(graph, node);
        let mut inherited = BTreeMap::new();
        for parent in [view.namespace(), view.gateway_class()].into_iter().flatten() {
            inherited.extend(inheritable_attached(parent)?);
        }
        updates.push((node.id().clone(), move |m: &mut EffectivePolicies| {
            m.inherited = inherited
        }));
    }
    store(graph, updates)
}

fn inherit_into_routes(graph: &mut Graph) -> Result<()> {
    let mut updates = Vec::new();
    for node in graph.nodes_of(&GroupKind::http_route()) {
        let view = RouteView::new(graph, node);
        let mut inherited = BTreeMap::new();
        if let Some(ns) = view.namespace() {
            inherited.extend(inheritable_attached(ns)?);
        }
        for gateway in view.gateways() {
            inherited.extend(inherited_of(gateway)?);
            inherited.extend(inheritable_attached(gateway)?);
        }
        updates.push((node.id().clone(), move |m: &mut EffectivePolicies| {
            m.inherited = inherited
        }));
    }
    store(graph, updates)
}

fn inherit_into_backends(graph: &mut Graph) -> Result<()> {
    let mut updates = Vec::new();
    for node in graph.nodes_of(&GroupKind::service()) {
        let view = BackendView::new(graph, node);
        let mut inherited = BTreeMap::new();
        if let Some(ns) = view.namespace() {
            inherited.extend(inheritable_attached(ns)?);
        }
        for route in view.routes() {
            inherited.extend(inherited_of(route)?);
            inherited.extend(inheritable_attached(route)?);
        }
        updates.push((node.id().clone(), move |m: &mut EffectivePolicies| {
            m.inherited = inherited
        }));
    }
    store(graph, updates)
}

fn effective_for_gateways(graph: &mut Graph) -> Result<()> {
    let max_depth = graph.max_depth();
    let mut updates = Vec::new();
    for node in graph.nodes_of(&GroupKind::gateway()) {
        if node.depth().is_none_or(|depth| depth > max_depth) {
            debug!(gateway = %node.id(), "beyond max depth, skipping effective policies");
            continue;
        }

        let view = GatewayView::new(graph, node);
        let Some(class) = view.gateway_class() else {
            warn!(gateway = %node.id(), "GatewayClass not found, skipping effective policies");
            continue;
        };
        let Some(ns) = view.namespace() else {
            warn!(gateway = %node.id(), "Namespace not found, skipping effective policies");
            continue;
        };

        let class_level = ancestor_level(class)?;
        let ns_level = ancestor_level(ns)?;
        let gateway_level = own_level(node)?;

        let effective = merge_different_hierarchy(
            &merge_different_hierarchy(&class_level, &ns_level)?,
            &gateway_level,
        )?;
        updates.push((node.id().clone(), move |m: &mut EffectivePolicies| {
            m.effective = Some(effective)
        }));
    }
    store(graph, updates)
}

fn effective_for_routes(graph: &mut Graph) -> Result<()> {
    let mut updates = Vec::new();
    for node in graph.nodes_of(&GroupKind::http_route()) {
        let view = RouteView::new(graph, node);
        let Some(ns) = view.namespace() else {
            warn!(route = %node.id(), "Namespace not found, skipping effective policies");
            continue;
        };
        let ns_level = ancestor_level(ns)?;
        let route_level = own_level(node)?;

        let mut by_gateway = BTreeMap::new();
        for gateway in view.gateways() {
            let Some(gateway_effective) = gateway
                .metadata::<EffectivePolicies>()?
                .and_then(|meta| meta.effective.as_ref())
            else {
                debug!(route = %node.id(), gateway = %gateway.id(), "gateway has no effective policies");
                continue;
            };

            let seed = inheritable_only(gateway_effective);
            let merged =
                merge_different_hierarchy(&merge_different_hierarchy(&seed, &ns_level)?, &route_level)?;
            by_gateway.insert(gateway.id().clone(), merged);
        }

        updates.push((node.id().clone(), move |m: &mut EffectivePolicies| {
            m.effective_by_gateway = by_gateway
        }));
    }
    store(graph, updates)
}

fn effective_for_backends(graph: &mut Graph) -> Result<()> {
    let mut updates = Vec::new();
    for node in graph.nodes_of(&GroupKind::service()) {
        let view = BackendView::new(graph, node);
        let Some(ns) = view.namespace() else {
            warn!(backend = %node.id(), "Namespace not found, skipping effective policies");
            continue;
        };
        let ns_level = ancestor_level(ns)?;
        let backend_level = own_level(node)?;

        let mut from_routes: BTreeMap<ResourceId, PolicyMap> = BTreeMap::new();
        for route in view.routes() {
            let Some(meta) = route.metadata::<EffectivePolicies>()? else {
                continue;
            };
            for (gateway, map) in &meta.effective_by_gateway {
                let seed = inheritable_only(map);
                let entry = from_routes.entry(gateway.clone()).or_default();
                *entry = merge_same_hierarchy(entry, &seed)?;
            }
        }

        let mut by_gateway = BTreeMap::new();
        for (gateway, seed) in from_routes {
            let merged = merge_different_hierarchy(
                &merge_different_hierarchy(&seed, &ns_level)?,
                &backend_level,
            )?;
            by_gateway.insert(gateway, merged);
        }

        updates.push((node.id().clone(), move |m: &mut EffectivePolicies| {
            m.effective_by_gateway = by_gateway
        }));
    }
    store(graph, updates)
}
