//! Display formatting for CLI output

use console::style;
use gwlens_core::ResourceId;
use gwlens_policy::{PolicyMap, effective_specs};
use gwlens_topology::extension::{DirectPolicies, EffectivePolicies, diagnostics_for};
use gwlens_topology::{ImpactReport, Node, ReferenceDiagnostic};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Everything known about one described resource
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeReport {
    pub resource: ResourceId,
    pub directly_attached_policies: Vec<ResourceId>,
    pub inherited_policies: Vec<ResourceId>,
    /// Effective specs by policy kind, keyed by the gateway they apply through
    pub effective_policies: BTreeMap<String, BTreeMap<String, JsonValue>>,
    pub diagnostics: Vec<String>,
}

impl NodeReport {
    pub fn from_node(node: &Node) -> gwlens_topology::Result<Self> {
        let directly_attached_policies = node
            .metadata::<DirectPolicies>()?
            .map(|direct| direct.policies.keys().cloned().collect())
            .unwrap_or_default();

        let mut inherited_policies = Vec::new();
        let mut effective_policies = BTreeMap::new();
        if let Some(meta) = node.metadata::<EffectivePolicies>()? {
            inherited_policies = meta.inherited.keys().cloned().collect();
            if let Some(map) = &meta.effective {
                effective_policies.insert(node.id().to_string(), specs(map)?);
            }
            for (gateway, map) in &meta.effective_by_gateway {
                effective_policies.insert(gateway.to_string(), specs(map)?);
            }
        }

        let diagnostics = diagnostics_for(node)?
            .iter()
            .map(ToString::to_string)
            .collect();

        Ok(Self {
            resource: node.id().clone(),
            directly_attached_policies,
            inherited_policies,
            effective_policies,
            diagnostics,
        })
    }
}

fn specs(map: &PolicyMap) -> gwlens_topology::Result<BTreeMap<String, JsonValue>> {
    Ok(effective_specs(map)?
        .into_iter()
        .map(|(kind, spec)| (kind.to_string(), spec))
        .collect())
}

fn print_ids(title: &str, ids: &[ResourceId]) {
    println!("  {}:", style(title).cyan());
    if ids.is_empty() {
        println!("    {}", style("<none>").dim());
    }
    for id in ids {
        println!("    {}", id);
    }
}

fn print_diagnostics(title: &str, diagnostics: &[String], marker: console::StyledObject<&str>) {
    println!("  {}:", style(title).cyan());
    if diagnostics.is_empty() {
        println!("    {}", style("<none>").dim());
    }
    for diagnostic in diagnostics {
        println!("    {} {}", marker, diagnostic);
    }
}

pub fn print_reports(reports: &[NodeReport]) {
    for (i, report) in reports.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("{}", style(&report.resource).bold().underlined());
        print_ids("DirectlyAttachedPolicies", &report.directly_attached_policies);
        print_ids("InheritedPolicies", &report.inherited_policies);

        println!("  {}:", style("EffectivePolicies").cyan());
        if report.effective_policies.is_empty() {
            println!("    {}", style("<none>").dim());
        }
        for (through, specs) in &report.effective_policies {
            println!("    {}:", style(through).yellow());
            for (kind, spec) in specs {
                println!("      {}: {}", kind, spec);
            }
        }

        print_diagnostics("Diagnostics", &report.diagnostics, style("✗").red());
    }
}

fn messages(diagnostics: &[ReferenceDiagnostic]) -> Vec<String> {
    diagnostics.iter().map(ToString::to_string).collect()
}

pub fn print_impact(report: &ImpactReport) {
    println!("{}", style("CHANGES").bold().underlined());
    println!("  Created:  {}", style(report.created.len()).green());
    for id in &report.created {
        println!("    + {}", id);
    }
    println!("  Updated:  {}", style(report.updated.len()).yellow());
    for id in &report.updated {
        println!("    ~ {}", id);
    }
    println!();

    println!("{}", style("REFERENCE PROBLEMS").bold().underlined());
    print_diagnostics("Introduced", &messages(&report.introduced), style("✗").red());
    print_diagnostics("Fixed", &messages(&report.fixed), style("✓").green());
    print_diagnostics("Unchanged", &messages(&report.unchanged), style("!").yellow());
}
