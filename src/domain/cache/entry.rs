//! Response cache entry

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Fingerprint;
use crate::domain::envelope::StageName;

/// Memoized stage output; read-only once written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub fingerprint: Fingerprint,
    pub stage_name: StageName,
    pub output: Value,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(fingerprint: Fingerprint, stage_name: StageName, output: Value, ttl: Duration) -> Self {
        let created_at = Utc::now();
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);

        Self {
            fingerprint,
            stage_name,
            output,
            created_at,
            expires_at: created_at.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_expiry() {
        let entry = CacheEntry::new(
            Fingerprint::compute(StageName::Parse, "x"),
            StageName::Parse,
            json!({"intent": "x"}),
            Duration::from_secs(60),
        );

        assert!(!entry.is_expired());
        assert!(entry.is_expired_at(entry.created_at + chrono::Duration::seconds(60)));
        assert!(!entry.is_expired_at(entry.created_at + chrono::Duration::seconds(59)));
    }

    #[test]
    fn test_huge_ttl_does_not_overflow() {
        let entry = CacheEntry::new(
            Fingerprint::compute(StageName::Parse, "x"),
            StageName::Parse,
            json!(null),
            Duration::MAX,
        );

        assert!(!entry.is_expired());
    }
}
