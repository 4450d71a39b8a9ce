//! Workflow artifact domain
//!
//! The artifact is the workflow description produced by the synthesis stage:
//! named nodes, directed connections between them and free-form settings.
//! Model output is never trusted to have this shape; it is parsed into
//! [`ParsedArtifact`] and every consumer matches on the variant.

mod entity;
mod parse;
mod patch;

pub use entity::{Connection, WorkflowArtifact, WorkflowNode};
pub use parse::{extract_json_block, ParsedArtifact, ParsedOutput};
pub use patch::{PatchError, StructuralPatch};
