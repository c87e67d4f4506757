//! # Run Graph
//!
//! A [`RunDag`] records one pipeline execution: the ordered list of
//! [`RunNode`]s, the artifacts merged from nodes with an output key, and
//! the flattened check results. Nodes are appended once and never edited;
//! the only destructive operation is [`RunDag::truncate`], used by
//! rerun-from-step.

use std::collections::BTreeMap;

use grtk_core::{CheckResult, Endpoint};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// How a step's response is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    Artifact,
    Scalar,
    Invariants,
    Checks,
}

/// One planned capability invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub name: String,
    pub endpoint: Endpoint,
    pub payload: Value,
    pub kind: StepKind,
    /// Key under which a successful response is stored in
    /// [`RunDag::artifacts`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_key: Option<String>,
}

impl PlanStep {
    pub fn new(name: impl Into<String>, endpoint: Endpoint, payload: Value, kind: StepKind) -> Self {
        Self {
            name: name.into(),
            endpoint,
            payload,
            kind,
            output_key: None,
        }
    }

    pub fn with_output_key(mut self, key: impl Into<String>) -> Self {
        self.output_key = Some(key.into());
        self
    }
}

/// Lifecycle of a plan position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    NotStarted,
    Running,
    Ok,
    Fail,
}

/// A finished step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunNode {
    pub name: String,
    pub endpoint: Endpoint,
    pub payload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_key: Option<String>,
    pub kind: StepKind,
    /// Always [`NodeStatus::Ok`] or [`NodeStatus::Fail`].
    pub status: NodeStatus,
    pub outputs: Value,
    pub checks: Vec<CheckResult>,
}

impl RunNode {
    pub fn succeeded(&self) -> bool {
        self.status == NodeStatus::Ok
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunDag {
    pub run_id: Uuid,
    pub nodes: Vec<RunNode>,
    pub artifacts: BTreeMap<String, Value>,
    pub checks: Vec<CheckResult>,
    /// Plan position currently executing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub running: Option<usize>,
}

impl Default for RunDag {
    fn default() -> Self {
        Self::new()
    }
}

impl RunDag {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            nodes: Vec::new(),
            artifacts: BTreeMap::new(),
            checks: Vec::new(),
            running: None,
        }
    }

    /// Append a finished node, merging its outputs and checks.
    ///
    /// Outputs are stored only when the node has an output key and the
    /// outputs are non-empty.
    pub fn add_node(&mut self, node: RunNode) {
        if let Some(key) = &node.output_key {
            if !is_empty(&node.outputs) {
                self.artifacts.insert(key.clone(), node.outputs.clone());
            }
        }
        self.checks.extend(node.checks.iter().cloned());
        if self.running == Some(self.nodes.len()) {
            self.running = None;
        }
        self.nodes.push(node);
    }

    /// Status of plan position `index`.
    pub fn status(&self, index: usize) -> NodeStatus {
        match self.nodes.get(index) {
            Some(node) => node.status,
            None if self.running == Some(index) => NodeStatus::Running,
            None => NodeStatus::NotStarted,
        }
    }

    /// Drop nodes from `index` on and clear all merged artifacts and
    /// checks. Returns false, leaving the graph untouched, when `index` is
    /// past the recorded nodes.
    pub fn truncate(&mut self, index: usize) -> bool {
        if index >= self.nodes.len() {
            return false;
        }
        self.nodes.truncate(index);
        self.artifacts.clear();
        self.checks.clear();
        self.running = None;
        true
    }

    /// Keys of the stored artifacts in the order their nodes ran.
    pub fn artifact_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = Vec::with_capacity(self.artifacts.len());
        for key in self.nodes.iter().filter_map(|node| node.output_key.as_ref()) {
            if self.artifacts.contains_key(key) && !keys.contains(key) {
                keys.push(key.clone());
            }
        }
        keys
    }

    /// Checks that did not pass.
    pub fn failed_checks(&self) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(|check| !check.passed)
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(text) => text.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(name: &str, output_key: Option<&str>, outputs: Value, checks: Vec<CheckResult>) -> RunNode {
        RunNode {
            name: name.to_string(),
            endpoint: Endpoint::Christoffel,
            payload: json!({}),
            output_key: output_key.map(str::to_string),
            kind: StepKind::Artifact,
            status: NodeStatus::Ok,
            outputs,
            checks,
        }
    }

    #[test]
    fn add_node_merges_outputs_and_checks() {
        let mut dag = RunDag::new();
        dag.add_node(node("christoffel", Some("christoffel"), json!({"name": "christoffel"}), vec![]));
        dag.add_node(node("check", None, json!({"x": 1}), vec![CheckResult::pass("a"), CheckResult::fail("b")]));
        assert_eq!(dag.artifacts.len(), 1);
        assert_eq!(dag.artifacts["christoffel"]["name"], "christoffel");
        assert_eq!(dag.checks.len(), 2);
        assert_eq!(dag.failed_checks().count(), 1);
    }

    #[test]
    fn artifact_keys_follow_node_order() {
        let mut dag = RunDag::new();
        for key in ["riemann", "christoffel", "riemann", "einstein"] {
            dag.add_node(node(key, Some(key), json!({"name": key}), vec![]));
        }
        dag.add_node(node("empty", Some("absent"), json!({}), vec![]));
        assert_eq!(dag.artifact_keys(), ["riemann", "christoffel", "einstein"]);
    }

    #[test]
    fn empty_outputs_are_not_stored() {
        let mut dag = RunDag::new();
        dag.add_node(node("ricci", Some("ricci"), json!({}), vec![]));
        assert!(dag.artifacts.is_empty());
        assert_eq!(dag.nodes.len(), 1);
    }

    #[test]
    fn status_reflects_position() {
        let mut dag = RunDag::new();
        dag.add_node(node("a", None, json!({}), vec![]));
        dag.running = Some(1);
        assert_eq!(dag.status(0), NodeStatus::Ok);
        assert_eq!(dag.status(1), NodeStatus::Running);
        assert_eq!(dag.status(2), NodeStatus::NotStarted);
        dag.add_node(node("b", None, json!({}), vec![]));
        assert_eq!(dag.running, None);
    }

    #[test]
    fn truncate_clears_merged_state() {
        let mut dag = RunDag::new();
        dag.add_node(node("a", Some("a"), json!({"v": 1}), vec![CheckResult::pass("c")]));
        dag.add_node(node("b", Some("b"), json!({"v": 2}), vec![]));
        assert!(dag.truncate(1));
        assert_eq!(dag.nodes.len(), 1);
        assert!(dag.artifacts.is_empty());
        assert!(dag.checks.is_empty());
    }

    #[test]
    fn truncate_past_the_end_is_a_no_op() {
        let mut dag = RunDag::new();
        dag.add_node(node("a", Some("a"), json!({"v": 1}), vec![CheckResult::pass("c")]));
        let before = dag.clone();
        assert!(!dag.truncate(1));
        assert!(!dag.truncate(7));
        assert_eq!(dag, before);
    }

    #[test]
    fn serializes_with_lowercase_tags() {
        let value = serde_json::to_value(node("a", None, json!({}), vec![])).unwrap();
        assert_eq!(value["kind"], "artifact");
        assert_eq!(value["status"], "ok");
        assert_eq!(value["endpoint"], "christoffel");
    }
}
