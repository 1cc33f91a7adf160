//! Policy registry
//!
//! Discovers policy CRDs and their instances through a [`ResourceFetcher`]
//! and answers attachment queries.

use gwlens_core::{AnalysisConfig, Document, GroupKind, ResourceFetcher, ResourceId};
use std::collections::BTreeMap;
use tracing::debug;

use crate::crd::{PolicyCrd, PolicyCrdId};
use crate::error::{PolicyError, Result};
use crate::policy::Policy;

#[derive(Debug, Clone)]
pub struct PolicyManager {
    crds: BTreeMap<PolicyCrdId, PolicyCrd>,
    policies: BTreeMap<ResourceId, Policy>,
    label_key: String,
    default_namespace: String,
}

impl PolicyManager {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            crds: BTreeMap::new(),
            policies: BTreeMap::new(),
            label_key: config.policy_label_key.clone(),
            default_namespace: config.default_namespace.clone(),
        }
    }

    /// Assemble a manager from already-parsed parts
    pub fn from_parts(
        crds: impl IntoIterator<Item = PolicyCrd>,
        policies: impl IntoIterator<Item = Policy>,
        config: &AnalysisConfig,
    ) -> Self {
        let mut manager = Self::new(config);
        manager.crds = crds
            .into_iter()
            .filter(PolicyCrd::is_policy)
            .map(|crd| (crd.id(), crd))
            .collect();
        manager.policies = policies.into_iter().map(|p| (p.id(), p)).collect();
        manager
    }

    /// Load every policy CRD and every instance of each.
    ///
    /// Fetch failures and malformed CRDs or policies abort.
    pub async fn init(&mut self, fetcher: &dyn ResourceFetcher) -> Result<()> {
        self.crds.clear();
        self.policies.clear();

        for document in fetcher
            .fetch(&GroupKind::custom_resource_definition())
            .await?
        {
            let crd = PolicyCrd::from_document(&document, &self.label_key)?;
            if crd.is_policy() {
                debug!(crd = %crd.id(), class = ?crd.class, "registered policy CRD");
                self.crds.insert(crd.id(), crd);
            }
        }

        let kinds: Vec<GroupKind> = self.crds.values().map(PolicyCrd::group_kind).collect();
        for group_kind in kinds {
            for document in fetcher.fetch(&group_kind).await? {
                self.add_policy(document)?;
            }
        }

        debug!(
            crds = self.crds.len(),
            policies = self.policies.len(),
            "policy manager initialized"
        );
        Ok(())
    }

    /// Register one policy object. Its kind must belong to a known policy CRD.
    pub fn add_policy(&mut self, document: Document) -> Result<()> {
        let crd_id = PolicyCrdId::new(document.kind(), document.group());
        let crd = self
            .crds
            .get(&crd_id)
            .ok_or_else(|| PolicyError::UnknownPolicyKind {
                kind: crd_id.to_string(),
                policy: document.resource_id().to_string(),
            })?;

        let policy =
            Policy::from_document(document, crd.is_inheritable(), &self.default_namespace)?;
        self.policies.insert(policy.id(), policy);
        Ok(())
    }

    pub fn crds(&self) -> impl Iterator<Item = &PolicyCrd> {
        self.crds.values()
    }

    pub fn crd(&self, id: &PolicyCrdId) -> Option<&PolicyCrd> {
        self.crds.get(id)
    }

    /// All policies, ordered by identity
    pub fn policies(&self) -> impl Iterator<Item = &Policy> {
        self.policies.values()
    }

    pub fn get_policy(&self, id: &ResourceId) -> Option<&Policy> {
        self.policies.get(id)
    }

    /// Policies whose target matches `target` after namespace defaulting
    pub fn policies_attached_to(&self, target: &ResourceId) -> Vec<&Policy> {
        self.policies
            .values()
            .filter(|p| p.is_attached_to(target, &self.default_namespace))
            .collect()
    }

    pub fn default_namespace(&self) -> &str {
        &self.default_namespace
    }
}
