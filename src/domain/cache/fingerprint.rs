//! Deterministic cache fingerprints

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::envelope::StageName;

/// Hex SHA-256 of a stage name and its normalized input
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn compute(stage: StageName, input: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(stage.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(normalize(input).as_bytes());

        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Collapse runs of whitespace and trim the ends
fn normalize(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_deterministic() {
        let a = Fingerprint::compute(StageName::Parse, "build X");
        let b = Fingerprint::compute(StageName::Parse, "build X");

        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn test_whitespace_is_normalized() {
        assert_eq!(
            Fingerprint::compute(StageName::Parse, "  build\n\tX  "),
            Fingerprint::compute(StageName::Parse, "build X")
        );
    }

    #[test]
    fn test_stage_is_part_of_the_key() {
        assert_ne!(
            Fingerprint::compute(StageName::Parse, "build X"),
            Fingerprint::compute(StageName::Design, "build X")
        );
    }

    #[test]
    fn test_case_is_preserved() {
        assert_ne!(
            Fingerprint::compute(StageName::Parse, "Build X"),
            Fingerprint::compute(StageName::Parse, "build x")
        );
    }
}
