//! Graphviz DOT export

use gwlens_core::GroupKind;
use gwlens_core::id::GATEWAY_API_GROUP;
use std::fmt::Write;

use crate::graph::{Graph, Node};

fn node_color(group_kind: &GroupKind) -> &'static str {
    match (group_kind.group.as_str(), group_kind.kind.as_str()) {
        ("", "Namespace") => "#d08770",
        (GATEWAY_API_GROUP, "GatewayClass") => "#e5e9f0",
        (GATEWAY_API_GROUP, "Gateway") => "#ebcb8b",
        (GATEWAY_API_GROUP, "HTTPRoute") => "#a3be8c",
        ("", "Service") => "#88c0d0",
        _ => "#d8dee9",
    }
}

fn label(node: &Node) -> String {
    let id = node.id();
    let kind = if id.group == GATEWAY_API_GROUP {
        id.kind.clone()
    } else {
        id.group_kind().to_string()
    };
    format!("{}\\n{}", kind, id.namespaced_name())
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Render the graph bottom-to-top, so namespaces and classes sit at the base.
///
/// Route-to-Service and Gateway-to-Namespace edges are laid out reversed (for
/// ranking) and drawn with `dir=back`, so arrows still point at the referenced
/// object. Edges into namespaces are dotted.
pub fn to_dot(graph: &Graph) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "digraph {{");
    let _ = writeln!(out, "  rankdir=BT;");
    let _ = writeln!(out, "  node [style=filled];");

    for node in graph.nodes() {
        let _ = writeln!(
            out,
            "  {} [label=\"{}\", fillcolor=\"{}\"];",
            quote(&node.id().to_string()),
            label(node),
            node_color(&node.id().group_kind())
        );
    }

    for node in graph.nodes() {
        let from_kind = node.id().group_kind();
        for (relation, targets) in node.out_edges() {
            for target in targets {
                let to_kind = target.group_kind();
                let reverse = (from_kind == GroupKind::http_route() && to_kind == GroupKind::service())
                    || (from_kind == GroupKind::gateway() && to_kind == GroupKind::namespace());

                let (u, v) = if reverse {
                    (target.to_string(), node.id().to_string())
                } else {
                    (node.id().to_string(), target.to_string())
                };

                let mut attrs = vec![format!("label={}", quote(&relation.to_string()))];
                if reverse {
                    attrs.push("dir=back".to_string());
                }
                if to_kind == GroupKind::namespace() {
                    attrs.push("style=dotted".to_string());
                }

                let _ = writeln!(
                    out,
                    "  {} -> {} [{}];",
                    quote(&u),
                    quote(&v),
                    attrs.join(", ")
                );
            }
        }
    }

    out.push_str("}\n");
    out
}
