//! Policy merging
//!
//! Policies of the same kind that apply to the same object are folded into
//! one. Two relations decide which side wins:
//! - same hierarchy level: [`precedence`] (newer wins, ties by `namespace/name`)
//! - across levels: the lower level (child) wins, except that a parent's
//!   `spec.override` is reapplied on top

use gwlens_core::{Document, merge_patch};
use serde_json::{Value as JsonValue, json};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::crd::PolicyCrdId;
use crate::error::{PolicyError, Result};
use crate::policy::Policy;

/// At most one policy per kind
pub type PolicyMap = BTreeMap<PolicyCrdId, Policy>;

/// Order two same-level policies as `(lower, higher)` precedence.
///
/// The later creation timestamp has higher precedence. On a tie, the
/// lexicographically smaller `namespace/name` has higher precedence.
pub fn precedence<'p>(a: &'p Policy, b: &'p Policy) -> (&'p Policy, &'p Policy) {
    let by_time = a.creation_timestamp().cmp(&b.creation_timestamp());
    let a_higher = match by_time {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => a.sort_key() <= b.sort_key(),
    };
    if a_higher { (b, a) } else { (a, b) }
}

/// Merge `child` over `parent`.
///
/// The result is `child` with its document replaced by `parent` patched with
/// `child`. If `parent` is inheritable its `spec.override` is reapplied last.
/// The target of the result is cleared.
pub fn merge_policy(parent: &Policy, child: &Policy) -> Result<Policy> {
    if parent.crd_id() != child.crd_id() {
        return Err(PolicyError::KindMismatch {
            parent: parent.id().to_string(),
            child: child.id().to_string(),
        });
    }

    let mut merged = parent.document().as_value().clone();
    merge_patch(&mut merged, child.document().as_value());

    if parent.is_inheritable()
        && let Some(overrides) = parent.spec().and_then(|spec| spec.get("override"))
    {
        merge_patch(&mut merged, &json!({ "spec": { "override": overrides } }));
    }

    let document = Document::from_value(merged)?;
    Ok(child.clone().into_merged(document))
}

/// Fold policies of the same level into at most one per kind
pub fn merge_same_kind(policies: impl IntoIterator<Item = Policy>) -> Result<PolicyMap> {
    let mut result = PolicyMap::new();
    for policy in policies {
        let crd_id = policy.crd_id();
        let folded = match result.remove(&crd_id) {
            Some(existing) => {
                let (lower, higher) = precedence(&existing, &policy);
                merge_policy(lower, higher)?
            }
            None => policy,
        };
        result.insert(crd_id, folded);
    }
    Ok(result)
}

/// Union two maps from the same level, merging colliding kinds by precedence
pub fn merge_same_hierarchy(a: &PolicyMap, b: &PolicyMap) -> Result<PolicyMap> {
    merge_maps(a, b, precedence)
}

/// Union a parent level with a child level, the child winning collisions
pub fn merge_different_hierarchy(parent: &PolicyMap, child: &PolicyMap) -> Result<PolicyMap> {
    merge_maps(parent, child, parent_then_child)
}

fn parent_then_child<'p>(parent: &'p Policy, child: &'p Policy) -> (&'p Policy, &'p Policy) {
    (parent, child)
}

fn merge_maps(
    a: &PolicyMap,
    b: &PolicyMap,
    order: for<'p> fn(&'p Policy, &'p Policy) -> (&'p Policy, &'p Policy),
) -> Result<PolicyMap> {
    let mut result = a.clone();
    for (crd_id, policy) in b {
        let merged = match a.get(crd_id) {
            Some(existing) => {
                let (lower, higher) = order(existing, policy);
                merge_policy(lower, higher)?
            }
            None => policy.clone(),
        };
        result.insert(crd_id.clone(), merged);
    }
    Ok(result)
}

/// Keep only inheritable policies
pub fn inheritable_only(map: &PolicyMap) -> PolicyMap {
    map.iter()
        .filter(|(_, policy)| policy.is_inheritable())
        .map(|(id, policy)| (id.clone(), policy.clone()))
        .collect()
}

/// Effective specs of a merged map, keyed by kind
pub fn effective_specs(map: &PolicyMap) -> Result<BTreeMap<PolicyCrdId, JsonValue>> {
    map.iter()
        .map(|(id, policy)| Ok((id.clone(), policy.effective_spec()?)))
        .collect()
}
