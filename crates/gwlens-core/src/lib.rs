//! gwlens Core - Shared types for Gateway API topology analysis
//!
//! This crate provides the foundational types used throughout gwlens:
//! - `GroupKind`, `NamespacedName`, `ResourceId`: resource identities
//! - `Document`: a generic, schema-less Kubernetes object
//! - `merge`: JSON merge-patch used for policy specs and value folding
//! - `ResourceFetcher` / `ReferenceGrantFetcher`: data-source contracts
//! - `ReferenceGrant`: typed view of cross-namespace reference permissions
//! - `AnalysisConfig`: user configuration

pub mod config;
pub mod document;
pub mod error;
pub mod fetcher;
pub mod grant;
pub mod id;
pub mod merge;

pub use config::AnalysisConfig;
pub use document::Document;
pub use error::{CoreError, Result};
pub use fetcher::{OverlayFetcher, ReferenceGrantFetcher, ResourceFetcher, StaticFetcher};
pub use grant::ReferenceGrant;
pub use id::{GroupKind, NamespacedName, ResourceId};
pub use merge::{merge_patch, merged};
