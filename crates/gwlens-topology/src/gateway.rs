//! Gateway API relations and typed node views
//!
//! ```text
//! GatewayClass <-- Gateway <-- HTTPRoute --> Service
//!                     |            |            |
//!                     v            v            v
//!                 Namespace    Namespace    Namespace
//! ```

use gwlens_core::{Document, GroupKind, ResourceId};
use gwlens_core::config::DEFAULT_NAMESPACE;
use gwlens_core::id::GATEWAY_API_GROUP;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use tracing::warn;

use crate::graph::{Graph, Node};
use crate::relation::{Relation, RelationId};

#[derive(Deserialize)]
#[serde(bound(deserialize = "S: DeserializeOwned + Default"))]
struct Projection<S> {
    #[serde(default)]
    spec: S,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GatewaySpec {
    #[serde(default)]
    gateway_class_name: String,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HttpRouteSpec {
    #[serde(default)]
    parent_refs: Vec<ObjectReference>,
    #[serde(default)]
    rules: Vec<HttpRouteRule>,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HttpRouteRule {
    #[serde(default)]
    backend_refs: Vec<ObjectReference>,
    #[serde(default)]
    filters: Vec<HttpRouteFilter>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HttpRouteFilter {
    #[serde(rename = "type", default)]
    filter_type: String,
    #[serde(default)]
    request_mirror: Option<RequestMirror>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestMirror {
    backend_ref: ObjectReference,
}

#[derive(Deserialize)]
struct ObjectReference {
    #[serde(default)]
    group: Option<String>,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    namespace: Option<String>,
    name: String,
}

impl ObjectReference {
    /// Namespace falls back to the referrer's, then to `default`
    fn resolve(self, default_group: &str, default_kind: &str, own_namespace: &str) -> ResourceId {
        let namespace = match self.namespace.filter(|ns| !ns.is_empty()) {
            Some(ns) => ns,
            None if !own_namespace.is_empty() => own_namespace.to_string(),
            None => DEFAULT_NAMESPACE.to_string(),
        };
        ResourceId::new(
            self.group.unwrap_or_else(|| default_group.to_string()),
            self.kind.unwrap_or_else(|| default_kind.to_string()),
            namespace,
            self.name,
        )
    }
}

fn spec_of<S: DeserializeOwned + Default>(document: &Document) -> Option<S> {
    match document.project::<Projection<S>>() {
        Ok(projection) => Some(projection.spec),
        Err(e) => {
            warn!(resource = %document.resource_id(), error = %e, "ignoring unreadable references");
            None
        }
    }
}

fn gateway_class_of(document: &Document) -> Vec<ResourceId> {
    spec_of::<GatewaySpec>(document)
        .filter(|spec| !spec.gateway_class_name.is_empty())
        .map(|spec| {
            vec![ResourceId::new(
                GATEWAY_API_GROUP,
                "GatewayClass",
                "",
                spec.gateway_class_name,
            )]
        })
        .unwrap_or_default()
}

fn parent_gateways_of(document: &Document) -> Vec<ResourceId> {
    let Some(spec) = spec_of::<HttpRouteSpec>(document) else {
        return Vec::new();
    };
    let unique: BTreeSet<ResourceId> = spec
        .parent_refs
        .into_iter()
        .map(|parent| parent.resolve(GATEWAY_API_GROUP, "Gateway", document.namespace()))
        .collect();
    unique.into_iter().collect()
}

fn backends_of(document: &Document) -> Vec<ResourceId> {
    let Some(spec) = spec_of::<HttpRouteSpec>(document) else {
        return Vec::new();
    };

    let mut unique = BTreeSet::new();
    for rule in spec.rules {
        for backend in rule.backend_refs {
            unique.insert(backend.resolve("", "Service", document.namespace()));
        }
        for filter in rule.filters {
            if filter.filter_type == "RequestMirror"
                && let Some(mirror) = filter.request_mirror
            {
                unique.insert(mirror.backend_ref.resolve("", "Service", document.namespace()));
            }
        }
    }
    unique.into_iter().collect()
}

fn namespace_of(document: &Document) -> Vec<ResourceId> {
    match document.namespace() {
        "" => Vec::new(),
        ns => vec![ResourceId::new("", "Namespace", "", ns)],
    }
}

/// Every Gateway API relation
pub fn all_relations() -> Vec<Relation> {
    vec![
        Relation::new(
            RelationId::GatewayClassOfGateway,
            GroupKind::gateway(),
            GroupKind::gateway_class(),
            gateway_class_of,
        ),
        Relation::new(
            RelationId::ParentGatewaysOfRoute,
            GroupKind::http_route(),
            GroupKind::gateway(),
            parent_gateways_of,
        ),
        Relation::new(
            RelationId::BackendsOfRoute,
            GroupKind::http_route(),
            GroupKind::service(),
            backends_of,
        ),
        Relation::new(
            RelationId::NamespaceOfGateway,
            GroupKind::gateway(),
            GroupKind::namespace(),
            namespace_of,
        ),
        Relation::new(
            RelationId::NamespaceOfRoute,
            GroupKind::http_route(),
            GroupKind::namespace(),
            namespace_of,
        ),
        Relation::new(
            RelationId::NamespaceOfBackend,
            GroupKind::service(),
            GroupKind::namespace(),
            namespace_of,
        ),
    ]
}

fn first<'g>(nodes: Vec<&'g Node>) -> Option<&'g Node> {
    nodes.into_iter().next()
}

/// A GatewayClass node with its gateways
#[derive(Debug, Clone, Copy)]
pub struct GatewayClassView<'g> {
    graph: &'g Graph,
    node: &'g Node,
}

impl<'g> GatewayClassView<'g> {
    pub fn new(graph: &'g Graph, node: &'g Node) -> Self {
        Self { graph, node }
    }

    pub fn node(&self) -> &'g Node {
        self.node
    }

    pub fn gateways(&self) -> Vec<&'g Node> {
        self.graph
            .in_neighbors(self.node.id(), RelationId::GatewayClassOfGateway)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GatewayView<'g> {
    graph: &'g Graph,
    node: &'g Node,
}

impl<'g> GatewayView<'g> {
    pub fn new(graph: &'g Graph, node: &'g Node) -> Self {
        Self { graph, node }
    }

    pub fn node(&self) -> &'g Node {
        self.node
    }

    pub fn gateway_class(&self) -> Option<&'g Node> {
        first(
            self.graph
                .out_neighbors(self.node.id(), RelationId::GatewayClassOfGateway),
        )
    }

    pub fn namespace(&self) -> Option<&'g Node> {
        first(
            self.graph
                .out_neighbors(self.node.id(), RelationId::NamespaceOfGateway),
        )
    }

    pub fn routes(&self) -> Vec<&'g Node> {
        self.graph
            .in_neighbors(self.node.id(), RelationId::ParentGatewaysOfRoute)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RouteView<'g> {
    graph: &'g Graph,
    node: &'g Node,
}

impl<'g> RouteView<'g> {
    pub fn new(graph: &'g Graph, node: &'g Node) -> Self {
        Self { graph, node }
    }

    pub fn node(&self) -> &'g Node {
        self.node
    }

    pub fn gateways(&self) -> Vec<&'g Node> {
        self.graph
            .out_neighbors(self.node.id(), RelationId::ParentGatewaysOfRoute)
    }

    pub fn backends(&self) -> Vec<&'g Node> {
        self.graph
            .out_neighbors(self.node.id(), RelationId::BackendsOfRoute)
    }

    pub fn namespace(&self) -> Option<&'g Node> {
        first(
            self.graph
                .out_neighbors(self.node.id(), RelationId::NamespaceOfRoute),
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BackendView<'g> {
    graph: &'g Graph,
    node: &'g Node,
}

impl<'g> BackendView<'g> {
    pub fn new(graph: &'g Graph, node: &'g Node) -> Self {
        Self { graph, node }
    }

    pub fn node(&self) -> &'g Node {
        self.node
    }

    pub fn routes(&self) -> Vec<&'g Node> {
        self.graph
            .in_neighbors(self.node.id(), RelationId::BackendsOfRoute)
    }

    pub fn namespace(&self) -> Option<&'g Node> {
        first(
            self.graph
                .out_neighbors(self.node.id(), RelationId::NamespaceOfBackend),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(yaml_spec: &str) -> Document {
        Document::from_yaml(&format!(
            "apiVersion: gateway.networking.k8s.io/v1\nkind: HTTPRoute\nmetadata:\n  name: web\n  namespace: demo\nspec:\n{yaml_spec}"
        ))
        .unwrap()
    }

    #[test]
    fn test_parent_refs_default_to_route_namespace() {
        let doc = route("  parentRefs:\n    - name: gw\n    - name: gw\n    - name: shared\n      namespace: infra\n");
        assert_eq!(
            parent_gateways_of(&doc),
            vec![
                ResourceId::new(GATEWAY_API_GROUP, "Gateway", "demo", "gw"),
                ResourceId::new(GATEWAY_API_GROUP, "Gateway", "infra", "shared"),
            ]
        );
    }

    #[test]
    fn test_parent_refs_fall_back_to_default_namespace() {
        let doc = Document::from_yaml(
            "apiVersion: gateway.networking.k8s.io/v1\nkind: HTTPRoute\nmetadata: {name: web}\nspec:\n  parentRefs: [{name: gw}]\n",
        )
        .unwrap();
        assert_eq!(
            parent_gateways_of(&doc),
            vec![ResourceId::new(GATEWAY_API_GROUP, "Gateway", "default", "gw")]
        );
    }

    #[test]
    fn test_backends_include_mirrors_and_dedupe() {
        let doc = route(
            r#"  rules:
    - backendRefs:
        - name: api
        - name: api
        - name: other
          namespace: b
      filters:
        - type: RequestMirror
          requestMirror:
            backendRef:
              name: shadow
        - type: RequestHeaderModifier
"#,
        );
        assert_eq!(
            backends_of(&doc),
            vec![
                ResourceId::new("", "Service", "b", "other"),
                ResourceId::new("", "Service", "demo", "api"),
                ResourceId::new("", "Service", "demo", "shadow"),
            ]
        );
    }

    #[test]
    fn test_gateway_class_and_namespace() {
        let gw = Document::from_yaml(
            "apiVersion: gateway.networking.k8s.io/v1\nkind: Gateway\nmetadata: {name: gw, namespace: demo}\nspec: {gatewayClassName: eg}\n",
        )
        .unwrap();
        assert_eq!(
            gateway_class_of(&gw),
            vec![ResourceId::new(GATEWAY_API_GROUP, "GatewayClass", "", "eg")]
        );
        assert_eq!(namespace_of(&gw), vec![ResourceId::new("", "Namespace", "", "demo")]);
    }

    #[test]
    fn test_malformed_spec_yields_no_neighbors() {
        let doc = route("  parentRefs: not-a-list\n");
        assert!(parent_gateways_of(&doc).is_empty());
    }

    #[test]
    fn test_relations_keep_foreign_kinds() {
        let doc = route("  rules:\n    - backendRefs:\n        - name: bucket\n          kind: Bucket\n          group: storage.io\n");
        let relation = all_relations()
            .into_iter()
            .find(|r| r.id == RelationId::BackendsOfRoute)
            .unwrap();
        assert_eq!(
            relation.neighbors(&doc),
            vec![ResourceId::new("storage.io", "Bucket", "demo", "bucket")]
        );
    }
}
