//! Resource identities
//!
//! Identities serialize as their display strings so they can be used as
//! JSON object keys in reports.

use serde::{Serialize, Serializer};
use std::fmt;

pub const GATEWAY_API_GROUP: &str = "gateway.networking.k8s.io";
pub const CRD_GROUP: &str = "apiextensions.k8s.io";

/// A resource type, independent of version
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKind {
    pub group: String,
    pub kind: String,
}

impl GroupKind {
    pub fn new(group: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            kind: kind.into(),
        }
    }

    pub fn namespace() -> Self {
        Self::new("", "Namespace")
    }

    pub fn service() -> Self {
        Self::new("", "Service")
    }

    pub fn gateway_class() -> Self {
        Self::new(GATEWAY_API_GROUP, "GatewayClass")
    }

    pub fn gateway() -> Self {
        Self::new(GATEWAY_API_GROUP, "Gateway")
    }

    pub fn http_route() -> Self {
        Self::new(GATEWAY_API_GROUP, "HTTPRoute")
    }

    pub fn reference_grant() -> Self {
        Self::new(GATEWAY_API_GROUP, "ReferenceGrant")
    }

    pub fn custom_resource_definition() -> Self {
        Self::new(CRD_GROUP, "CustomResourceDefinition")
    }

    /// Whether objects of this kind live outside any namespace.
    ///
    /// Only the well-known cluster-scoped kinds are recognized.
    pub fn is_cluster_scoped(&self) -> bool {
        *self == Self::namespace()
            || *self == Self::gateway_class()
            || *self == Self::custom_resource_definition()
    }

    /// `Kind(.group)` form used in diagnostics
    pub fn describe(&self) -> String {
        if self.group.is_empty() {
            self.kind.clone()
        } else {
            format!("{}(.{})", self.kind, self.group)
        }
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}.{}", self.kind, self.group)
        }
    }
}

impl Serialize for GroupKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Namespace and name of an object. Namespace is empty for cluster-scoped objects.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NamespacedName {
    pub namespace: String,
    pub name: String,
}

impl NamespacedName {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for NamespacedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}/{}", self.namespace, self.name)
        }
    }
}

impl Serialize for NamespacedName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Globally unique identity of an object
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceId {
    pub group: String,
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl ResourceId {
    pub fn new(
        group: impl Into<String>,
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn from_parts(group_kind: &GroupKind, namespaced_name: &NamespacedName) -> Self {
        Self::new(
            group_kind.group.clone(),
            group_kind.kind.clone(),
            namespaced_name.namespace.clone(),
            namespaced_name.name.clone(),
        )
    }

    pub fn group_kind(&self) -> GroupKind {
        GroupKind::new(self.group.clone(), self.kind.clone())
    }

    pub fn namespaced_name(&self) -> NamespacedName {
        NamespacedName::new(self.namespace.clone(), self.name.clone())
    }

    pub fn is_kind(&self, group_kind: &GroupKind) -> bool {
        self.group == group_kind.group && self.kind == group_kind.kind
    }

    /// Apply namespace defaulting rules for references.
    ///
    /// Cluster-scoped kinds lose their namespace. A Namespace reference with
    /// no name points at the default namespace. Any other reference with no
    /// namespace lives in the default namespace.
    pub fn normalized(mut self, default_namespace: &str) -> Self {
        let group_kind = self.group_kind();
        if group_kind == GroupKind::namespace() {
            self.namespace.clear();
            if self.name.is_empty() {
                self.name = default_namespace.to_string();
            }
        } else if group_kind.is_cluster_scoped() {
            self.namespace.clear();
        } else if self.namespace.is_empty() {
            self.namespace = default_namespace.to_string();
        }
        self
    }

    /// `Kind(.group) "ns/name"` form used in diagnostics
    pub fn describe(&self) -> String {
        format!("{} \"{}\"", self.group_kind().describe(), self.namespaced_name())
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group_kind(), self.namespaced_name())
    }
}

impl Serialize for ResourceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
