//! ReferenceGrant view
//!
//! A grant lives in the namespace of the objects it exposes and lists which
//! (group, kind, namespace) triples may reference them.

use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::error::Result;
use crate::id::ResourceId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceGrant {
    pub namespace: String,
    pub name: String,
    pub from: Vec<GrantFrom>,
    pub to: Vec<GrantTo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantFrom {
    #[serde(default)]
    pub group: String,
    pub kind: String,
    pub namespace: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantTo {
    #[serde(default)]
    pub group: String,
    pub kind: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Deserialize)]
struct GrantDocument {
    #[serde(default)]
    spec: GrantSpec,
}

#[derive(Default, Deserialize)]
struct GrantSpec {
    #[serde(default)]
    from: Vec<GrantFrom>,
    #[serde(default)]
    to: Vec<GrantTo>,
}

impl ReferenceGrant {
    pub fn from_document(document: &Document) -> Result<Self> {
        let parsed: GrantDocument = document.project()?;
        Ok(Self {
            namespace: document.namespace().to_string(),
            name: document.name().to_string(),
            from: parsed.spec.from,
            to: parsed.spec.to,
        })
    }

    pub fn id(&self) -> ResourceId {
        ResourceId::new(
            crate::id::GATEWAY_API_GROUP,
            "ReferenceGrant",
            self.namespace.clone(),
            self.name.clone(),
        )
    }

    /// Whether the grant makes `resource` referenceable from other namespaces
    pub fn exposes(&self, resource: &ResourceId) -> bool {
        if self.namespace != resource.namespace {
            return false;
        }

        self.to.iter().any(|to| {
            to.group == resource.group
                && to.kind == resource.kind
                && to
                    .name
                    .as_deref()
                    .is_none_or(|name| name.is_empty() || name == resource.name)
        })
    }

    /// Whether objects of the referrer's group, kind and namespace are allowed
    pub fn accepts(&self, referrer: &ResourceId) -> bool {
        self.from.iter().any(|from| {
            from.group == referrer.group
                && from.kind == referrer.kind
                && from.namespace == referrer.namespace
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant() -> ReferenceGrant {
        let doc = Document::from_yaml(
            r#"
apiVersion: gateway.networking.k8s.io/v1beta1
kind: ReferenceGrant
metadata:
  name: allow-a
  namespace: b
spec:
  from:
    - group: gateway.networking.k8s.io
      kind: HTTPRoute
      namespace: a
  to:
    - group: ""
      kind: Service
"#,
        )
        .unwrap();
        ReferenceGrant::from_document(&doc).unwrap()
    }

    #[test]
    fn test_exposes() {
        let grant = grant();
        assert!(grant.exposes(&ResourceId::new("", "Service", "b", "api")));
        assert!(!grant.exposes(&ResourceId::new("", "Service", "c", "api")));
        assert!(!grant.exposes(&ResourceId::new("", "Secret", "b", "api")));
    }

    #[test]
    fn test_exposes_named_target_only() {
        let mut grant = grant();
        grant.to[0].name = Some("api".to_string());
        assert!(grant.exposes(&ResourceId::new("", "Service", "b", "api")));
        assert!(!grant.exposes(&ResourceId::new("", "Service", "b", "web")));
    }

    #[test]
    fn test_accepts() {
        let grant = grant();
        let route_a =
            ResourceId::new(crate::id::GATEWAY_API_GROUP, "HTTPRoute", "a", "web");
        let route_c =
            ResourceId::new(crate::id::GATEWAY_API_GROUP, "HTTPRoute", "c", "web");
        assert!(grant.accepts(&route_a));
        assert!(!grant.accepts(&route_c));
    }
}
