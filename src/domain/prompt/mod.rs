//! Prompt domain - stage prompt templates with variable support

mod stage_prompts;
mod template;

pub use stage_prompts::{PromptOverrides, StagePrompt, StagePrompts};
pub use template::{PromptTemplate, PromptVariable, TemplateError};
