//! gwlens Kube - Cluster-backed fetchers
//!
//! `KubeFetcher` lists objects of any served group-kind through the dynamic
//! API, resolving kinds with API discovery, and hands them to the analysis
//! crates as generic documents.

pub mod error;
pub mod fetcher;

pub use error::{KubeError, Result};
pub use fetcher::KubeFetcher;
