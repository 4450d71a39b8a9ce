use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single node in a workflow description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowNode {
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, Value>,
}

impl WorkflowNode {
    pub fn new(name: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            node_type: node_type.into(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    /// A parameter counts as present when it is set to something other than
    /// null or an empty string
    pub fn has_parameter(&self, key: &str) -> bool {
        match self.parameters.get(key) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(_) => true,
        }
    }
}

/// Directed edge between two nodes, by node name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    pub from: String,
    pub to: String,
}

impl Connection {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn touches(&self, node: &str) -> bool {
        self.from == node || self.to == node
    }
}

/// Synthesized workflow description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowArtifact {
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<WorkflowNode>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub settings: BTreeMap<String, Value>,
}

impl WorkflowArtifact {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            connections: Vec::new(),
            settings: BTreeMap::new(),
        }
    }

    pub fn with_node(mut self, node: WorkflowNode) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn with_connection(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.connections.push(Connection::new(from, to));
        self
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: Value) -> Self {
        self.settings.insert(key.into(), value);
        self
    }

    pub fn node(&self, name: &str) -> Option<&WorkflowNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn node_mut(&mut self, name: &str) -> Option<&mut WorkflowNode> {
        self.nodes.iter_mut().find(|n| n.name == name)
    }

    pub fn has_node(&self, name: &str) -> bool {
        self.node(name).is_some()
    }

    pub fn has_connection(&self, from: &str, to: &str) -> bool {
        self.connections.iter().any(|c| c.from == from && c.to == to)
    }

    pub fn incoming_count(&self, name: &str) -> usize {
        self.connections.iter().filter(|c| c.to == name).count()
    }
}
