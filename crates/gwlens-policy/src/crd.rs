//! Policy CRD classification
//!
//! A CustomResourceDefinition declares a policy type by carrying the policy
//! label (by default `gateway.networking.k8s.io/policy`). The label value
//! selects the attachment class:
//!
//! | label value               | class     |
//! |---------------------------|-----------|
//! | `inherited`/`inheritable` | Inherited |
//! | `direct`, `true`          | Direct    |
//!
//! Values are matched case-insensitively. Anything else is not a policy.

use gwlens_core::{Document, GroupKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{PolicyError, Result};

/// Identity of a policy type, `Kind.group`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyCrdId(String);

impl PolicyCrdId {
    pub fn new(kind: &str, group: &str) -> Self {
        Self(format!("{}.{}", kind, group))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PolicyCrdId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// CRD scope - whether resources are namespaced or cluster-wide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum CrdScope {
    #[default]
    Namespaced,
    Cluster,
}

impl fmt::Display for CrdScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Namespaced => write!(f, "Namespaced"),
            Self::Cluster => write!(f, "Cluster"),
        }
    }
}

/// Attachment class of a policy type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PolicyClass {
    /// Applies to the target and everything below it in the hierarchy
    Inherited,
    /// Applies to the target only
    Direct,
}

impl PolicyClass {
    /// Classify a policy label value
    pub fn from_label(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "inherited" | "inheritable" => Some(Self::Inherited),
            "direct" | "true" => Some(Self::Direct),
            _ => None,
        }
    }
}

/// A CustomResourceDefinition seen through the policy lens
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyCrd {
    /// CRD object name (e.g., "timeoutpolicies.example.com")
    pub name: String,
    pub group: String,
    pub kind: String,
    pub plural: String,
    pub scope: CrdScope,
    /// Served version names, in declaration order
    pub versions: Vec<String>,
    pub labels: BTreeMap<String, String>,
    /// `None` when the CRD is not a policy type
    pub class: Option<PolicyClass>,
}

impl PolicyCrd {
    /// Parse a CRD document and classify it using `label_key`
    pub fn from_document(document: &Document, label_key: &str) -> Result<Self> {
        let name = document.name().to_string();
        let invalid = |message: &str| PolicyError::InvalidCrd {
            name: name.clone(),
            message: message.to_string(),
        };

        if document.group_kind() != GroupKind::custom_resource_definition() {
            return Err(invalid(&format!(
                "expected CustomResourceDefinition, got {}",
                document.group_kind()
            )));
        }

        let spec = document
            .get("spec")
            .ok_or_else(|| invalid("missing 'spec' field"))?;

        let group = spec
            .get("group")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("missing 'spec.group' field"))?
            .to_string();

        let names = spec
            .get("names")
            .ok_or_else(|| invalid("missing 'spec.names' field"))?;

        let kind = names
            .get("kind")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("missing 'spec.names.kind' field"))?
            .to_string();

        let plural = names
            .get("plural")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let scope = match spec.get("scope").and_then(Value::as_str) {
            Some("Cluster") => CrdScope::Cluster,
            _ => CrdScope::Namespaced,
        };

        let versions = spec
            .get("versions")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.get("name").and_then(Value::as_str))
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let class = document.label(label_key).and_then(PolicyClass::from_label);

        Ok(Self {
            name,
            group,
            kind,
            plural,
            scope,
            versions,
            labels: document.labels(),
            class,
        })
    }

    pub fn id(&self) -> PolicyCrdId {
        PolicyCrdId::new(&self.kind, &self.group)
    }

    /// Group-kind of the policy objects this CRD defines
    pub fn group_kind(&self) -> GroupKind {
        GroupKind::new(self.group.clone(), self.kind.clone())
    }

    pub fn is_policy(&self) -> bool {
        self.class.is_some()
    }

    pub fn is_inheritable(&self) -> bool {
        self.class == Some(PolicyClass::Inherited)
    }

    pub fn is_direct(&self) -> bool {
        self.class == Some(PolicyClass::Direct)
    }

    pub fn is_cluster_scoped(&self) -> bool {
        self.scope == CrdScope::Cluster
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gwlens_core::config::DEFAULT_POLICY_LABEL_KEY;

    fn crd(label: Option<&str>) -> Document {
        let labels = label
            .map(|v| format!("  labels:\n    {}: {}\n", DEFAULT_POLICY_LABEL_KEY, v))
            .unwrap_or_default();
        Document::from_yaml(&format!(
            r#"
apiVersion: apiextensions.k8s.io/v1
kind: CustomResourceDefinition
metadata:
  name: timeoutpolicies.bar.com
{labels}spec:
  group: bar.com
  scope: Namespaced
  names:
    kind: TimeoutPolicy
    plural: timeoutpolicies
  versions:
    - name: v1
      served: true
"#
        ))
        .unwrap()
    }

    #[test]
    fn test_parse_crd() {
        let parsed = PolicyCrd::from_document(&crd(Some("inherited")), DEFAULT_POLICY_LABEL_KEY)
            .unwrap();
        assert_eq!(parsed.kind, "TimeoutPolicy");
        assert_eq!(parsed.group, "bar.com");
        assert_eq!(parsed.plural, "timeoutpolicies");
        assert_eq!(parsed.versions, vec!["v1".to_string()]);
        assert_eq!(parsed.id().as_str(), "TimeoutPolicy.bar.com");
        assert!(parsed.is_inheritable());
        assert!(!parsed.is_cluster_scoped());
    }

    #[test]
    fn test_classification() {
        let class = |label| {
            PolicyCrd::from_document(&crd(label), DEFAULT_POLICY_LABEL_KEY)
                .unwrap()
                .class
        };
        assert_eq!(class(Some("Inherited")), Some(PolicyClass::Inherited));
        assert_eq!(class(Some("inheritable")), Some(PolicyClass::Inherited));
        assert_eq!(class(Some("DIRECT")), Some(PolicyClass::Direct));
        assert_eq!(class(Some("\"true\"")), Some(PolicyClass::Direct));
        assert_eq!(class(Some("other")), None);
        assert_eq!(class(None), None);
    }

    #[test]
    fn test_rejects_non_crd() {
        let doc = Document::from_yaml("apiVersion: v1\nkind: Service\nmetadata:\n  name: x\n").unwrap();
        let err = PolicyCrd::from_document(&doc, DEFAULT_POLICY_LABEL_KEY).unwrap_err();
        assert!(matches!(err, PolicyError::InvalidCrd { .. }));
    }
}
