//! Fetchers backed by the Kubernetes API

use async_trait::async_trait;
use gwlens_core::{
    CoreError, Document, GroupKind, ReferenceGrant, ReferenceGrantFetcher, ResourceFetcher,
};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::{
    Client,
    api::{Api, DynamicObject, ListParams},
    core::TypeMeta,
    discovery::{ApiResource, Discovery, Scope},
};
use tracing::{debug, warn};

use crate::error::{KubeError, Result};

/// Lists cluster objects by group-kind.
///
/// Kinds are resolved once through API discovery, using the version the
/// server recommends. Kinds the server does not serve produce an empty list.
pub struct KubeFetcher {
    client: Client,
    discovery: Discovery,
}

impl KubeFetcher {
    /// Create a fetcher, running API discovery against the cluster
    pub async fn new(client: Client) -> Result<Self> {
        let discovery = Discovery::new(client.clone())
            .run()
            .await
            .map_err(KubeError::Api)?;
        Ok(Self { client, discovery })
    }

    /// Create a fetcher from the local kubeconfig or in-cluster environment
    pub async fn try_default() -> Result<Self> {
        let client = Client::try_default().await?;
        Self::new(client).await
    }

    fn resolve(&self, group_kind: &GroupKind) -> Option<(ApiResource, Scope)> {
        if *group_kind == GroupKind::custom_resource_definition() {
            let resource = ApiResource::erase::<CustomResourceDefinition>(&());
            return Some((resource, Scope::Cluster));
        }
        self.discovery
            .get(&group_kind.group)
            .and_then(|group| group.recommended_kind(&group_kind.kind))
            .map(|(resource, capabilities)| (resource, capabilities.scope))
    }

    async fn list(&self, group_kind: &GroupKind, namespace: Option<&str>) -> Result<Vec<Document>> {
        let Some((resource, scope)) = self.resolve(group_kind) else {
            warn!(kind = %group_kind, "kind is not served by the cluster");
            return Ok(Vec::new());
        };

        let api: Api<DynamicObject> = match namespace {
            Some(ns) if scope == Scope::Namespaced => {
                Api::namespaced_with(self.client.clone(), ns, &resource)
            }
            _ => Api::all_with(self.client.clone(), &resource),
        };

        let list = match api.list(&ListParams::default()).await {
            Ok(list) => list,
            Err(kube::Error::Api(resp)) if resp.code == 404 => {
                warn!(kind = %group_kind, "kind disappeared since discovery");
                return Ok(Vec::new());
            }
            Err(e) => return Err(KubeError::Api(e)),
        };

        debug!(kind = %group_kind, count = list.items.len(), "listed");
        list.items
            .into_iter()
            .map(|object| to_document(object, &resource))
            .collect()
    }
}

/// Convert a listed object into a document.
///
/// List items carry no type information, so it is restored from the resource
/// they were listed with. Managed fields are dropped.
fn to_document(mut object: DynamicObject, resource: &ApiResource) -> Result<Document> {
    object.types = Some(TypeMeta {
        api_version: resource.api_version.clone(),
        kind: resource.kind.clone(),
    });
    object.metadata.managed_fields = None;
    let value = serde_json::to_value(&object)?;
    Ok(Document::from_value(value)?)
}

#[async_trait]
impl ResourceFetcher for KubeFetcher {
    async fn fetch(&self, group_kind: &GroupKind) -> gwlens_core::Result<Vec<Document>> {
        self.list(group_kind, None)
            .await
            .map_err(|e| e.into_fetch_error(group_kind))
    }
}

#[async_trait]
impl ReferenceGrantFetcher for KubeFetcher {
    async fn fetch_grants_for_namespace(
        &self,
        namespace: &str,
    ) -> gwlens_core::Result<Vec<ReferenceGrant>> {
        let group_kind = GroupKind::reference_grant();
        let documents = self
            .list(&group_kind, Some(namespace))
            .await
            .map_err(|e| e.into_fetch_error(&group_kind))?;
        documents
            .iter()
            .map(ReferenceGrant::from_document)
            .collect::<std::result::Result<_, CoreError>>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gwlens_core::ResourceId;
    use gwlens_core::id::GATEWAY_API_GROUP;
    use kube::core::GroupVersionKind;
    use serde_json::json;

    fn gateway_resource() -> ApiResource {
        ApiResource::from_gvk(&GroupVersionKind::gvk(GATEWAY_API_GROUP, "v1", "Gateway"))
    }

    #[test]
    fn test_listed_object_gets_type_information() {
        let mut object = DynamicObject::new("gw", &gateway_resource())
            .within("demo")
            .data(json!({"spec": {"gatewayClassName": "eg"}}));
        object.types = None;

        let document = to_document(object, &gateway_resource()).unwrap();
        assert_eq!(document.api_version(), "gateway.networking.k8s.io/v1");
        assert_eq!(
            document.resource_id(),
            ResourceId::new(GATEWAY_API_GROUP, "Gateway", "demo", "gw")
        );
        assert_eq!(document.get("spec.gatewayClassName"), Some(&json!("eg")));
    }

    #[test]
    fn test_managed_fields_dropped() {
        let mut object = DynamicObject::new("gw", &gateway_resource()).within("demo");
        object.metadata.managed_fields = Some(Vec::new());

        let document = to_document(object, &gateway_resource()).unwrap();
        assert!(document.get("metadata.managedFields").is_none());
    }

    #[test]
    fn test_fetch_error_keeps_kind() {
        let err = KubeError::Serialization(serde_json::from_str::<u8>("x").unwrap_err());
        let core = err.into_fetch_error(&GroupKind::gateway());
        assert!(core.to_string().contains("Gateway.gateway.networking.k8s.io"));
    }
}
