//! Policy instances

use chrono::{DateTime, Utc};
use gwlens_core::{Document, ResourceId, merge_patch};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::crd::PolicyCrdId;
use crate::error::{PolicyError, Result};

/// A policy object together with its resolved attachment
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    document: Document,
    /// `None` for policies with no targetRef and for merge results
    target_ref: Option<ResourceId>,
    inheritable: bool,
}

#[derive(Deserialize)]
struct PolicyDocument {
    #[serde(default)]
    spec: Option<PolicySpec>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PolicySpec {
    #[serde(default)]
    target_ref: Option<TargetRef>,
}

#[derive(Deserialize)]
struct TargetRef {
    #[serde(default)]
    group: String,
    kind: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    namespace: Option<String>,
}

impl Policy {
    pub fn new(document: Document, target_ref: Option<ResourceId>, inheritable: bool) -> Self {
        Self {
            document,
            target_ref,
            inheritable,
        }
    }

    /// Build a policy from its document, resolving `spec.targetRef`.
    ///
    /// An unset target namespace falls back to the policy's own namespace,
    /// then to `default_namespace`. Cluster-scoped targets carry no namespace.
    pub fn from_document(
        document: Document,
        inheritable: bool,
        default_namespace: &str,
    ) -> Result<Self> {
        let parsed: PolicyDocument = document.project()?;
        let target_ref = parsed
            .spec
            .and_then(|spec| spec.target_ref)
            .map(|target| {
                let namespace = target
                    .namespace
                    .filter(|ns| !ns.is_empty())
                    .unwrap_or_else(|| document.namespace().to_string());
                ResourceId::new(target.group, target.kind, namespace, target.name)
                    .normalized(default_namespace)
            });

        Ok(Self::new(document, target_ref, inheritable))
    }

    pub fn id(&self) -> ResourceId {
        self.document.resource_id()
    }

    pub fn crd_id(&self) -> PolicyCrdId {
        PolicyCrdId::new(self.document.kind(), self.document.group())
    }

    pub fn target_ref(&self) -> Option<&ResourceId> {
        self.target_ref.as_ref()
    }

    pub fn is_inheritable(&self) -> bool {
        self.inheritable
    }

    pub fn is_direct(&self) -> bool {
        !self.inheritable
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn creation_timestamp(&self) -> Option<DateTime<Utc>> {
        self.document.creation_timestamp()
    }

    /// `namespace/name`, used to break precedence ties
    pub fn sort_key(&self) -> String {
        format!("{}/{}", self.document.namespace(), self.document.name())
    }

    pub fn spec(&self) -> Option<&Map<String, JsonValue>> {
        self.document.get("spec").and_then(JsonValue::as_object)
    }

    /// Is the policy attached to `target`, after namespace defaulting on both sides
    pub fn is_attached_to(&self, target: &ResourceId, default_namespace: &str) -> bool {
        self.target_ref.as_ref().is_some_and(|own| {
            own.clone().normalized(default_namespace)
                == target.clone().normalized(default_namespace)
        })
    }

    /// The configuration this policy applies.
    ///
    /// Direct policies apply their spec minus `targetRef`. Inheritable
    /// policies apply `spec.default` patched with `spec.override`.
    pub fn effective_spec(&self) -> Result<JsonValue> {
        let Some(spec) = self.spec() else {
            return Ok(JsonValue::Object(Map::new()));
        };

        if !self.inheritable {
            let mut result = spec.clone();
            result.remove("targetRef");
            return Ok(JsonValue::Object(result));
        }

        let mut result = JsonValue::Object(Map::new());
        for section in ["default", "override"] {
            match spec.get(section) {
                None | Some(JsonValue::Null) => {}
                Some(value @ JsonValue::Object(_)) => merge_patch(&mut result, value),
                Some(_) => {
                    return Err(PolicyError::InvalidSpec {
                        policy: self.id().to_string(),
                        message: format!("'spec.{}' is not an object", section),
                    });
                }
            }
        }
        Ok(result)
    }

    /// Replace the document and drop the target, as after a merge
    pub(crate) fn into_merged(self, document: Document) -> Self {
        Self {
            document,
            target_ref: None,
            inheritable: self.inheritable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(yaml: &str) -> Document {
        Document::from_yaml(yaml).unwrap()
    }

    #[test]
    fn test_target_defaults_to_policy_namespace() {
        let policy = Policy::from_document(
            doc(r#"
apiVersion: bar.com/v1
kind: TimeoutPolicy
metadata: {name: p, namespace: demo}
spec:
  targetRef: {group: gateway.networking.k8s.io, kind: Gateway, name: gw}
"#),
            true,
            "default",
        )
        .unwrap();

        assert_eq!(
            policy.target_ref(),
            Some(&ResourceId::new("gateway.networking.k8s.io", "Gateway", "demo", "gw"))
        );
        assert_eq!(policy.crd_id().as_str(), "TimeoutPolicy.bar.com");
    }

    #[test]
    fn test_explicit_target_namespace_and_cluster_scope() {
        let explicit = Policy::from_document(
            doc(r#"
apiVersion: bar.com/v1
kind: TimeoutPolicy
metadata: {name: p, namespace: demo}
spec:
  targetRef: {kind: Service, name: api, namespace: other}
"#),
            false,
            "default",
        )
        .unwrap();
        assert_eq!(explicit.target_ref().unwrap().namespace, "other");

        let ns_target = Policy::from_document(
            doc(r#"
apiVersion: bar.com/v1
kind: TimeoutPolicy
metadata: {name: p, namespace: demo}
spec:
  targetRef: {kind: Namespace, name: demo}
"#),
            true,
            "default",
        )
        .unwrap();
        assert_eq!(
            ns_target.target_ref(),
            Some(&ResourceId::new("", "Namespace", "", "demo"))
        );
    }

    #[test]
    fn test_cluster_policy_targets_default_namespace() {
        let policy = Policy::from_document(
            doc(r#"
apiVersion: bar.com/v1
kind: HealthCheckPolicy
metadata: {name: p}
spec:
  targetRef: {group: gateway.networking.k8s.io, kind: HTTPRoute, name: web}
"#),
            true,
            "default",
        )
        .unwrap();
        assert_eq!(policy.target_ref().unwrap().namespace, "default");
    }

    #[test]
    fn test_missing_target_ref() {
        let policy = Policy::from_document(
            doc("apiVersion: bar.com/v1\nkind: TimeoutPolicy\nmetadata: {name: p}\nspec: {}\n"),
            true,
            "default",
        )
        .unwrap();
        assert!(policy.target_ref().is_none());
    }

    #[test]
    fn test_is_attached_to_normalizes() {
        let policy = Policy::new(
            doc("apiVersion: bar.com/v1\nkind: TimeoutPolicy\nmetadata: {name: p}\n"),
            Some(ResourceId::new("", "Namespace", "", "")),
            true,
        );
        assert!(policy.is_attached_to(&ResourceId::new("", "Namespace", "", "default"), "default"));
        assert!(!policy.is_attached_to(&ResourceId::new("", "Namespace", "", "demo"), "default"));
    }

    #[test]
    fn test_effective_spec_direct() {
        let policy = Policy::from_document(
            doc(r#"
apiVersion: bar.com/v1
kind: RetryPolicy
metadata: {name: p, namespace: demo}
spec:
  targetRef: {kind: Service, name: api}
  attempts: 3
"#),
            false,
            "default",
        )
        .unwrap();
        assert_eq!(policy.effective_spec().unwrap(), json!({"attempts": 3}));
    }

    #[test]
    fn test_effective_spec_inheritable() {
        let policy = Policy::from_document(
            doc(r#"
apiVersion: bar.com/v1
kind: TimeoutPolicy
metadata: {name: p, namespace: demo}
spec:
  default: {timeout: 30, condition: path}
  override: {timeout: 60}
"#),
            true,
            "default",
        )
        .unwrap();
        assert_eq!(
            policy.effective_spec().unwrap(),
            json!({"timeout": 60, "condition": "path"})
        );
    }

    #[test]
    fn test_effective_spec_rejects_scalar_sections() {
        let policy = Policy::from_document(
            doc("apiVersion: bar.com/v1\nkind: TimeoutPolicy\nmetadata: {name: p}\nspec:\n  default: 5\n"),
            true,
            "default",
        )
        .unwrap();
        assert!(matches!(
            policy.effective_spec(),
            Err(PolicyError::InvalidSpec { .. })
        ));
    }
}
