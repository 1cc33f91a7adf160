//! gwlens Policy - Policy attachment for Gateway API resources
//!
//! - `PolicyCrd`: classifies CustomResourceDefinitions as policy types
//! - `Policy`: a policy object with its resolved target
//! - `PolicyManager`: registry of policy types and instances
//! - `merge`: same-level and cross-level policy merging

pub mod crd;
pub mod error;
pub mod manager;
pub mod merge;
pub mod policy;

pub use crd::{CrdScope, PolicyClass, PolicyCrd, PolicyCrdId};
pub use error::{PolicyError, Result};
pub use manager::PolicyManager;
pub use merge::{
    PolicyMap, effective_specs, inheritable_only, merge_different_hierarchy, merge_policy,
    merge_same_hierarchy, merge_same_kind, precedence,
};
pub use policy::Policy;
