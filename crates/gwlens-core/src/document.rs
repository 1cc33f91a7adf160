//! Generic Kubernetes objects
//!
//! A [`Document`] is an untyped object tree with a few well-known accessors.
//! Typed views are obtained through [`Document::project`], which fails with
//! a [`CoreError::Projection`] instead of panicking when the shape is wrong.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{CoreError, Result};
use crate::id::{GroupKind, NamespacedName, ResourceId};
use crate::merge::get_path;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Document(JsonValue);

impl Document {
    /// Wrap an object tree. It must be a mapping carrying `kind` and `metadata.name`.
    pub fn from_value(value: JsonValue) -> Result<Self> {
        if !value.is_object() {
            return Err(CoreError::InvalidDocument {
                message: "expected a mapping at the document root".to_string(),
            });
        }

        let document = Self(value);
        if document.kind().is_empty() {
            return Err(CoreError::InvalidDocument {
                message: "missing 'kind'".to_string(),
            });
        }
        if document.name().is_empty() {
            return Err(CoreError::InvalidDocument {
                message: format!("{} is missing 'metadata.name'", document.kind()),
            });
        }
        Ok(document)
    }

    /// Parse a single YAML document
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let value: JsonValue = serde_yaml::from_str(yaml)?;
        Self::from_value(value)
    }

    /// Parse a multi-document YAML manifest, skipping empty documents
    pub fn from_yaml_stream(manifest: &str) -> Result<Vec<Self>> {
        let mut documents = Vec::new();
        for de in serde_yaml::Deserializer::from_str(manifest) {
            let value = JsonValue::deserialize(de)?;
            if value.is_null() {
                continue;
            }
            documents.push(Self::from_value(value)?);
        }
        Ok(documents)
    }

    /// Load every document from a manifest file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Vec<Self>> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_stream(&content)
    }

    pub fn api_version(&self) -> &str {
        self.str_at(&["apiVersion"])
    }

    /// API group, empty for the core group (`apiVersion: v1`)
    pub fn group(&self) -> &str {
        match self.api_version().rsplit_once('/') {
            Some((group, _)) => group,
            None => "",
        }
    }

    pub fn kind(&self) -> &str {
        self.str_at(&["kind"])
    }

    pub fn name(&self) -> &str {
        self.str_at(&["metadata", "name"])
    }

    pub fn namespace(&self) -> &str {
        self.str_at(&["metadata", "namespace"])
    }

    pub fn group_kind(&self) -> GroupKind {
        GroupKind::new(self.group(), self.kind())
    }

    pub fn namespaced_name(&self) -> NamespacedName {
        NamespacedName::new(self.namespace(), self.name())
    }

    pub fn resource_id(&self) -> ResourceId {
        ResourceId::new(self.group(), self.kind(), self.namespace(), self.name())
    }

    pub fn labels(&self) -> BTreeMap<String, String> {
        self.get("metadata.labels")
            .and_then(JsonValue::as_object)
            .map(|labels| {
                labels
                    .iter()
                    .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.get("metadata.labels")
            .and_then(|labels| labels.get(key))
            .and_then(JsonValue::as_str)
    }

    /// `metadata.creationTimestamp`, absent when missing or unparsable
    pub fn creation_timestamp(&self) -> Option<DateTime<Utc>> {
        let raw = self.get("metadata.creationTimestamp")?.as_str()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
    }

    /// Get a value by dotted path (e.g. "spec.targetRef.name")
    pub fn get(&self, path: &str) -> Option<&JsonValue> {
        let parts: Vec<&str> = path.split('.').collect();
        get_path(&self.0, &parts)
    }

    /// Deserialize the document into a typed view
    pub fn project<T: DeserializeOwned>(&self) -> Result<T> {
        T::deserialize(&self.0).map_err(|e| CoreError::Projection {
            resource: self.resource_id().to_string(),
            target: std::any::type_name::<T>(),
            message: e.to_string(),
        })
    }

    /// Fill in `metadata.namespace` when the object has none
    pub fn with_default_namespace(mut self, namespace: &str) -> Self {
        if self.namespace().is_empty() && !self.group_kind().is_cluster_scoped() {
            if let Some(metadata) = self
                .0
                .as_object_mut()
                .and_then(|root| root.get_mut("metadata"))
                .and_then(JsonValue::as_object_mut)
            {
                metadata.insert(
                    "namespace".to_string(),
                    JsonValue::String(namespace.to_string()),
                );
            }
        }
        self
    }

    pub fn as_value(&self) -> &JsonValue {
        &self.0
    }

    pub fn into_value(self) -> JsonValue {
        self.0
    }

    fn str_at(&self, path: &[&str]) -> &str {
        get_path(&self.0, path)
            .and_then(JsonValue::as_str)
            .unwrap_or("")
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = JsonValue::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}
