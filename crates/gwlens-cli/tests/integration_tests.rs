//! Integration tests for CLI commands
//!
//! Every test runs offline against manifests written to a temporary
//! directory, with the configuration directory pointed there too.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const TOPOLOGY: &str = r#"
apiVersion: apiextensions.k8s.io/v1
kind: CustomResourceDefinition
metadata:
  name: timeoutpolicies.bar.com
  labels:
    gateway.networking.k8s.io/policy: inherited
spec:
  group: bar.com
  scope: Namespaced
  names: {kind: TimeoutPolicy, plural: timeoutpolicies}
  versions: [{name: v1}]
---
apiVersion: v1
kind: Namespace
metadata: {name: demo}
---
apiVersion: gateway.networking.k8s.io/v1
kind: GatewayClass
metadata: {name: eg}
---
apiVersion: gateway.networking.k8s.io/v1
kind: Gateway
metadata: {name: gw, namespace: demo}
spec: {gatewayClassName: eg}
---
apiVersion: gateway.networking.k8s.io/v1
kind: HTTPRoute
metadata: {name: web, namespace: demo}
spec:
  parentRefs: [{name: gw}]
  rules:
    - backendRefs: [{name: api, port: 8080}]
---
apiVersion: v1
kind: Service
metadata: {name: api, namespace: demo}
---
apiVersion: bar.com/v1
kind: TimeoutPolicy
metadata: {name: timeout-gw, namespace: demo}
spec:
  targetRef: {group: gateway.networking.k8s.io, kind: Gateway, name: gw}
  default: {timeout: 60}
"#;

const BROKEN_ROUTE: &str = r#"
apiVersion: gateway.networking.k8s.io/v1
kind: HTTPRoute
metadata: {name: lost, namespace: demo}
spec:
  parentRefs: [{name: nope}]
"#;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).expect("Failed to write manifest");
        path
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Run gwlens isolated from the user's configuration and environment
    fn gwlens(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_gwlens"))
            .args(args)
            .env("XDG_CONFIG_HOME", self.path())
            .env("HOME", self.path())
            .env_remove("GWLENS_MAX_DEPTH")
            .env_remove("RUST_LOG")
            .output()
            .expect("Failed to execute gwlens")
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

mod analyze_command {
    use super::*;

    #[test]
    fn test_analyze_reports_introduced_problem() {
        let ws = Workspace::new();
        let cluster = ws.write("cluster.yaml", TOPOLOGY);
        let change = ws.write("change.yaml", BROKEN_ROUTE);

        let output = ws.gwlens(&[
            "analyze",
            "--offline",
            "--state",
            cluster.to_str().unwrap(),
            "-f",
            change.to_str().unwrap(),
        ]);

        assert!(output.status.success(), "stderr: {}", stderr(&output));
        let stdout = stdout(&output);
        assert!(stdout.contains("references a non-existent Gateway"));
        assert!(stdout.contains("HTTPRoute.gateway.networking.k8s.io/demo/lost"));
    }

    #[test]
    fn test_analyze_strict_exit_code() {
        let ws = Workspace::new();
        let change = ws.write("change.yaml", BROKEN_ROUTE);

        let output = ws.gwlens(&[
            "analyze",
            "--offline",
            "--strict",
            "-f",
            change.to_str().unwrap(),
        ]);

        assert_eq!(output.status.code(), Some(2));
        assert!(stderr(&output).contains("new reference problem"));
    }

    #[test]
    fn test_analyze_strict_passes_clean_change() {
        let ws = Workspace::new();
        let cluster = ws.write("cluster.yaml", TOPOLOGY);
        let change = ws.write(
            "change.yaml",
            "apiVersion: v1\nkind: Service\nmetadata: {name: api, namespace: demo}\nspec: {ports: [{port: 80}]}\n",
        );

        let output = ws.gwlens(&[
            "analyze",
            "--offline",
            "--strict",
            "--state",
            cluster.to_str().unwrap(),
            "-f",
            change.to_str().unwrap(),
        ]);

        assert!(output.status.success(), "stderr: {}", stderr(&output));
    }

    #[test]
    fn test_analyze_json_output() {
        let ws = Workspace::new();
        let cluster = ws.write(
            "cluster.yaml",
            &format!("{TOPOLOGY}---{BROKEN_ROUTE}"),
        );
        let fix = ws.write(
            "fix.yaml",
            "apiVersion: gateway.networking.k8s.io/v1\nkind: HTTPRoute\nmetadata: {name: lost, namespace: demo}\nspec:\n  parentRefs: [{name: gw}]\n",
        );

        let output = ws.gwlens(&[
            "analyze",
            "--offline",
            "--state",
            cluster.to_str().unwrap(),
            "-f",
            fix.to_str().unwrap(),
            "-o",
            "json",
        ]);

        assert!(output.status.success(), "stderr: {}", stderr(&output));
        let json: serde_json::Value =
            serde_json::from_str(&stdout(&output)).expect("Output should be valid JSON");

        assert_eq!(json["created"].as_array().unwrap().len(), 0);
        assert_eq!(
            json["updated"][0],
            "HTTPRoute.gateway.networking.k8s.io/demo/lost"
        );
        assert_eq!(json["introduced"].as_array().unwrap().len(), 0);
        assert_eq!(json["fixed"][0]["reason"], "nonExistent");
    }

    #[test]
    fn test_analyze_default_namespace_flag() {
        let ws = Workspace::new();
        let change = ws.write(
            "change.yaml",
            "apiVersion: gateway.networking.k8s.io/v1\nkind: HTTPRoute\nmetadata: {name: web}\n",
        );

        let output = ws.gwlens(&[
            "analyze",
            "--offline",
            "-n",
            "team-a",
            "-f",
            change.to_str().unwrap(),
            "-o",
            "json",
        ]);

        assert!(output.status.success(), "stderr: {}", stderr(&output));
        let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
        assert_eq!(
            json["created"][0],
            "HTTPRoute.gateway.networking.k8s.io/team-a/web"
        );
    }

    #[test]
    fn test_analyze_state_requires_offline() {
        let ws = Workspace::new();
        let change = ws.write("change.yaml", BROKEN_ROUTE);

        let output = ws.gwlens(&[
            "analyze",
            "--state",
            change.to_str().unwrap(),
            "-f",
            change.to_str().unwrap(),
        ]);

        assert_eq!(output.status.code(), Some(64));
    }

    #[test]
    fn test_analyze_missing_file() {
        let ws = Workspace::new();
        let missing = ws.path().join("missing.yaml");

        let output = ws.gwlens(&["analyze", "--offline", "-f", missing.to_str().unwrap()]);

        assert_eq!(output.status.code(), Some(5));
    }

    #[test]
    fn test_analyze_invalid_manifest() {
        let ws = Workspace::new();
        let bad = ws.write("bad.yaml", "apiVersion: v1\nmetadata: {name: x}\n");

        let output = ws.gwlens(&["analyze", "--offline", "-f", bad.to_str().unwrap()]);

        assert_eq!(output.status.code(), Some(1));
        assert!(stderr(&output).contains("bad.yaml"));
    }
}

mod describe_command {
    use super::*;

    #[test]
    fn test_describe_gateway_json() {
        let ws = Workspace::new();
        let cluster = ws.write("cluster.yaml", TOPOLOGY);

        let output = ws.gwlens(&[
            "describe",
            "gateways",
            "gw",
            "-n",
            "demo",
            "--offline",
            "-f",
            cluster.to_str().unwrap(),
            "-o",
            "json",
        ]);

        assert!(output.status.success(), "stderr: {}", stderr(&output));
        let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
        let report = &json[0];

        assert_eq!(report["resource"], "Gateway.gateway.networking.k8s.io/demo/gw");
        assert_eq!(
            report["directlyAttachedPolicies"][0],
            "TimeoutPolicy.bar.com/demo/timeout-gw"
        );
        assert_eq!(
            report["effectivePolicies"]["Gateway.gateway.networking.k8s.io/demo/gw"]
                ["TimeoutPolicy.bar.com"]["timeout"],
            60
        );
    }

    #[test]
    fn test_describe_route_inherits_from_gateway() {
        let ws = Workspace::new();
        let cluster = ws.write("cluster.yaml", TOPOLOGY);

        let output = ws.gwlens(&[
            "describe",
            "httproute",
            "-n",
            "demo",
            "--offline",
            "-f",
            cluster.to_str().unwrap(),
            "-o",
            "yaml",
        ]);

        assert!(output.status.success(), "stderr: {}", stderr(&output));
        let stdout = stdout(&output);
        assert!(stdout.contains("inheritedPolicies:"));
        assert!(stdout.contains("TimeoutPolicy.bar.com/demo/timeout-gw"));
    }

    #[test]
    fn test_describe_table_output() {
        let ws = Workspace::new();
        let cluster = ws.write("cluster.yaml", TOPOLOGY);

        let output = ws.gwlens(&[
            "describe",
            "backends",
            "--offline",
            "-n",
            "demo",
            "-f",
            cluster.to_str().unwrap(),
        ]);

        assert!(output.status.success(), "stderr: {}", stderr(&output));
        let stdout = stdout(&output);
        assert!(stdout.contains("Service/demo/api"));
        assert!(stdout.contains("EffectivePolicies"));
    }

    #[test]
    fn test_describe_nothing_selected() {
        let ws = Workspace::new();
        let cluster = ws.write("cluster.yaml", TOPOLOGY);

        let output = ws.gwlens(&[
            "describe",
            "gateways",
            "-n",
            "elsewhere",
            "--offline",
            "-f",
            cluster.to_str().unwrap(),
        ]);

        assert_eq!(output.status.code(), Some(1));
        assert!(stderr(&output).contains("no gateways found in namespace \"elsewhere\""));
    }

    #[test]
    fn test_describe_respects_config_file() {
        let ws = Workspace::new();
        let cluster = ws.write("cluster.yaml", TOPOLOGY);
        let config = ws.write("gwlens.yaml", "defaultNamespace: demo\n");

        let output = ws.gwlens(&[
            "describe",
            "gateways",
            "--config",
            config.to_str().unwrap(),
            "--offline",
            "-f",
            cluster.to_str().unwrap(),
            "-o",
            "json",
        ]);

        assert!(output.status.success(), "stderr: {}", stderr(&output));
        let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 1);
    }
}

mod graph_command {
    use super::*;

    #[test]
    fn test_graph_from_manifests() {
        let ws = Workspace::new();
        let cluster = ws.write("cluster.yaml", TOPOLOGY);

        let output = ws.gwlens(&["graph", "--offline", "-f", cluster.to_str().unwrap()]);

        assert!(output.status.success(), "stderr: {}", stderr(&output));
        let stdout = stdout(&output);
        assert!(stdout.starts_with("digraph {"));
        assert!(stdout.contains("rankdir=BT"));
        assert!(stdout.contains("dir=back"));
        assert!(!stdout.contains("TimeoutPolicy"));
    }

    #[test]
    fn test_graph_single_resource_depth() {
        let ws = Workspace::new();
        let cluster = ws.write("cluster.yaml", TOPOLOGY);

        let output = ws.gwlens(&[
            "graph",
            "gateway",
            "gw",
            "-n",
            "demo",
            "--max-depth",
            "1",
            "--offline",
            "-f",
            cluster.to_str().unwrap(),
        ]);

        assert!(output.status.success(), "stderr: {}", stderr(&output));
        let stdout = stdout(&output);
        assert!(stdout.contains("HTTPRoute.gateway.networking.k8s.io/demo/web"));
        assert!(!stdout.contains("Service/demo/api"));
    }

    #[test]
    fn test_graph_without_input() {
        let ws = Workspace::new();
        let output = ws.gwlens(&["graph"]);
        assert_eq!(output.status.code(), Some(64));
    }
}

#[test]
fn test_unknown_subcommand_is_usage_error() {
    let ws = Workspace::new();
    let output = ws.gwlens(&["frobnicate"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn test_offline_requires_files() {
    let ws = Workspace::new();
    let output = ws.gwlens(&["describe", "gateways", "--offline"]);
    assert_eq!(output.status.code(), Some(64));
}
