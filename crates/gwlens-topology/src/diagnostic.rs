//! Reference diagnostics

use gwlens_core::ResourceId;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DiagnosticReason {
    /// The referenced object does not exist
    NonExistent,
    /// A cross-namespace reference no ReferenceGrant allows
    NotPermitted,
}

/// A broken reference from one object to another
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceDiagnostic {
    pub reason: DiagnosticReason,
    pub referring: ResourceId,
    pub referred: ResourceId,
}

impl ReferenceDiagnostic {
    pub fn non_existent(referring: ResourceId, referred: ResourceId) -> Self {
        Self {
            reason: DiagnosticReason::NonExistent,
            referring,
            referred,
        }
    }

    pub fn not_permitted(referring: ResourceId, referred: ResourceId) -> Self {
        Self {
            reason: DiagnosticReason::NotPermitted,
            referring,
            referred,
        }
    }
}

impl fmt::Display for ReferenceDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            DiagnosticReason::NonExistent => write!(
                f,
                "{} references a non-existent {}",
                self.referring.describe(),
                self.referred.describe()
            ),
            DiagnosticReason::NotPermitted => write!(
                f,
                "{} is not permitted to reference {}",
                self.referring.describe(),
                self.referred.describe()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    #[test]
    fn test_non_existent_message() {
        let diagnostic = ReferenceDiagnostic::non_existent(
            ResourceId::new("gateway.networking.k8s.io", "HTTPRoute", "demo", "web"),
            ResourceId::new("gateway.networking.k8s.io", "Gateway", "demo", "missing"),
        );
        assert_snapshot!(
            diagnostic.to_string(),
            @r#"HTTPRoute(.gateway.networking.k8s.io) "demo/web" references a non-existent Gateway(.gateway.networking.k8s.io) "demo/missing""#
        );
    }

    #[test]
    fn test_not_permitted_message() {
        let diagnostic = ReferenceDiagnostic::not_permitted(
            ResourceId::new("gateway.networking.k8s.io", "HTTPRoute", "a", "web"),
            ResourceId::new("", "Service", "b", "api"),
        );
        assert_snapshot!(
            diagnostic.to_string(),
            @r#"HTTPRoute(.gateway.networking.k8s.io) "a/web" is not permitted to reference Service "b/api""#
        );
    }
}
