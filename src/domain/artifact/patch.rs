//! Structural patches - the only kind of fix the auto-corrector applies

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::{Connection, WorkflowArtifact, WorkflowNode};

/// Precondition failures when applying a patch
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PatchError {
    #[error("node '{0}' does not exist")]
    MissingNode(String),

    #[error("connection '{from}' -> '{to}' does not exist")]
    MissingConnection { from: String, to: String },

    #[error("node '{0}' already exists")]
    NodeExists(String),
}

/// A mechanically applicable change to a workflow artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StructuralPatch {
    SetParameter {
        node: String,
        parameter: String,
        value: Value,
    },
    RemoveNode {
        node: String,
    },
    RemoveConnection {
        from: String,
        to: String,
    },
    SetSetting {
        key: String,
        value: Value,
    },
    AddNode {
        node: WorkflowNode,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        connect_to: Option<String>,
    },
    RenameWorkflow {
        name: String,
    },
}

impl StructuralPatch {
    /// Apply the patch to a copy of the artifact, checking its preconditions
    /// against the current state first
    pub fn apply(&self, artifact: &WorkflowArtifact) -> Result<WorkflowArtifact, PatchError> {
        let mut next = artifact.clone();

        match self {
            Self::SetParameter {
                node,
                parameter,
                value,
            } => {
                let target = next
                    .node_mut(node)
                    .ok_or_else(|| PatchError::MissingNode(node.clone()))?;
                target.parameters.insert(parameter.clone(), value.clone());
            }
            Self::RemoveNode { node } => {
                if !next.has_node(node) {
                    return Err(PatchError::MissingNode(node.clone()));
                }

                next.nodes.retain(|n| &n.name != node);
                next.connections.retain(|c| !c.touches(node));
            }
            Self::RemoveConnection { from, to } => {
                if !next.has_connection(from, to) {
                    return Err(PatchError::MissingConnection {
                        from: from.clone(),
                        to: to.clone(),
                    });
                }

                next.connections.retain(|c| !(&c.from == from && &c.to == to));
            }
            Self::SetSetting { key, value } => {
                next.settings.insert(key.clone(), value.clone());
            }
            Self::AddNode { node, connect_to } => {
                if next.has_node(&node.name) {
                    return Err(PatchError::NodeExists(node.name.clone()));
                }

                if let Some(target) = connect_to {
                    if !next.has_node(target) {
                        return Err(PatchError::MissingNode(target.clone()));
                    }
                    next.connections
                        .push(Connection::new(node.name.clone(), target.clone()));
                }

                next.nodes.insert(0, node.clone());
            }
            Self::RenameWorkflow { name } => {
                next.name = name.clone();
            }
        }

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> WorkflowArtifact {
        WorkflowArtifact::new("wf")
            .with_node(WorkflowNode::new("Hook", "webhook"))
            .with_node(WorkflowNode::new("Mail", "emailSend"))
            .with_connection("Hook", "Mail")
    }

    #[test]
    fn test_set_parameter() {
        let patch = StructuralPatch::SetParameter {
            node: "Mail".to_string(),
            parameter: "to".to_string(),
            value: json!("ops@example.com"),
        };

        let next = patch.apply(&sample()).unwrap();
        assert!(next.node("Mail").unwrap().has_parameter("to"));
    }

    #[test]
    fn test_set_parameter_on_missing_node() {
        let patch = StructuralPatch::SetParameter {
            node: "Ghost".to_string(),
            parameter: "to".to_string(),
            value: json!("x"),
        };

        assert_eq!(
            patch.apply(&sample()),
            Err(PatchError::MissingNode("Ghost".to_string()))
        );
    }

    #[test]
    fn test_remove_node_drops_its_connections() {
        let patch = StructuralPatch::RemoveNode {
            node: "Mail".to_string(),
        };

        let next = patch.apply(&sample()).unwrap();
        assert!(!next.has_node("Mail"));
        assert!(next.connections.is_empty());
    }

    #[test]
    fn test_remove_missing_connection() {
        let patch = StructuralPatch::RemoveConnection {
            from: "Mail".to_string(),
            to: "Hook".to_string(),
        };

        assert!(matches!(
            patch.apply(&sample()),
            Err(PatchError::MissingConnection { .. })
        ));
    }

    #[test]
    fn test_add_node_connects_and_prepends() {
        let patch = StructuralPatch::AddNode {
            node: WorkflowNode::new("Start", "manualTrigger"),
            connect_to: Some("Hook".to_string()),
        };

        let next = patch.apply(&sample()).unwrap();
        assert_eq!(next.nodes[0].name, "Start");
        assert!(next.has_connection("Start", "Hook"));
    }

    #[test]
    fn test_add_existing_node_fails() {
        let patch = StructuralPatch::AddNode {
            node: WorkflowNode::new("Hook", "webhook"),
            connect_to: None,
        };

        assert_eq!(
            patch.apply(&sample()),
            Err(PatchError::NodeExists("Hook".to_string()))
        );
    }

    #[test]
    fn test_apply_does_not_touch_input() {
        let original = sample();
        let patch = StructuralPatch::RenameWorkflow {
            name: "Renamed".to_string(),
        };

        let next = patch.apply(&original).unwrap();
        assert_eq!(original.name, "wf");
        assert_eq!(next.name, "Renamed");
    }

    #[test]
    fn test_patch_serialization_tag() {
        let patch = StructuralPatch::SetSetting {
            key: "timezone".to_string(),
            value: json!("UTC"),
        };
        let value = serde_json::to_value(&patch).unwrap();
        assert_eq!(value["op"], "set_setting");
    }
}
