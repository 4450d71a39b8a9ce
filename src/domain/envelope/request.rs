//! Inbound request and its identifier

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Opaque identifier assigned once at pipeline entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(value: &str) -> Option<Self> {
        Uuid::parse_str(value).ok().map(Self)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Request priority; high priority bypasses the response cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Standard,
    High,
}

impl Priority {
    pub fn bypasses_cache(&self) -> bool {
        matches!(self, Self::High)
    }
}

/// The natural-language brief as produced by the trigger collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct RawRequest {
    pub brief: String,

    #[validate(email(message = "contact_ref must be an email address"))]
    pub contact_ref: String,

    #[serde(default)]
    pub priority: Priority,
}

impl RawRequest {
    pub fn new(brief: impl Into<String>, contact_ref: impl Into<String>) -> Self {
        Self {
            brief: brief.into(),
            contact_ref: contact_ref.into(),
            priority: Priority::Standard,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Check the shape preconditions enforced at intake.
    ///
    /// Returns a human-readable reason for the first failed check.
    pub fn check(&self, min_brief_len: usize) -> Result<(), String> {
        let brief_len = self.brief.trim().chars().count();

        if brief_len == 0 {
            return Err("brief is empty".to_string());
        }

        if brief_len < min_brief_len {
            return Err(format!(
                "brief has {} characters, at least {} required",
                brief_len, min_brief_len
            ));
        }

        self.validate().map_err(|errors| {
            errors
                .field_errors()
                .values()
                .flat_map(|errs| errs.iter())
                .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                .next()
                .unwrap_or_else(|| "request is malformed".to_string())
        })
    }
}
