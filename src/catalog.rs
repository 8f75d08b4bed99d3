//! The durable catalog row (`spec.md` §3 "DNSRecord (catalog row)") — the
//! single source of truth the file and API backends are projections of.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Zone apex sentinel owner name (`spec.md` §3: `"@"` maps to
/// `FullHostname() == zone_name`).
pub const APEX_NAME: &str = "@";

/// A logical DNS record held in the catalog. `records` is an ordered
/// sequence of exact wire-form RDATA strings (`spec.md` §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DNSRecord {
    #[serde(rename = "_id", default, skip_serializing_if = "is_zero")]
    pub id: i64,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    pub name: String,
    #[serde(rename = "type")]
    pub rtype: String,
    #[serde(default)]
    pub ttl: i64,
    pub records: Vec<String>,
}

fn is_zero(id: &i64) -> bool {
    *id == 0
}

impl DNSRecord {
    /// `spec.md` §3: `name == "@"` is the zone apex and maps to `zone_name`
    /// itself; otherwise `name + "." + zone_name`.
    pub fn full_hostname(&self, zone_name: &str) -> String {
        if self.name == APEX_NAME {
            zone_name.to_string()
        } else {
            format!("{}.{}", self.name, zone_name)
        }
    }

    /// `spec.md` §9 "empty-previous special case": a `None` previous means
    /// "no previous record", never "a record different from this one" — so
    /// no delete-then-recreate is needed. Otherwise, the previous record is
    /// different the moment its `(name, type)` differs from this one.
    pub fn should_replace(&self, previous: Option<&DNSRecord>) -> bool {
        match previous {
            None => false,
            Some(previous) => self.name != previous.name || self.rtype != previous.rtype,
        }
    }

    /// Effective TTL for the API backend: `spec.md` §4.5, TTL defaults to
    /// 300 seconds when the row's own TTL is `0` ("inherit").
    pub fn effective_ttl(&self) -> i64 {
        if self.ttl == 0 {
            300
        } else {
            self.ttl
        }
    }

    pub fn is_soft_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Merges this record's fields on top of `existing`: preserve
    /// `created_at`, adopt the existing id, clear `deleted_at`
    /// (`spec.md` §4.6 "`DNSRecord.Upsert` semantics"). Any field this
    /// record left at its zero value is filled in from `existing`.
    pub fn merged_onto(mut self, existing: &DNSRecord) -> DNSRecord {
        self.id = existing.id;
        self.created_at = existing.created_at;
        self.deleted_at = None;
        if self.name.is_empty() {
            self.name = existing.name.clone();
        }
        if self.rtype.is_empty() {
            self.rtype = existing.rtype.clone();
        }
        if self.ttl == 0 {
            self.ttl = existing.ttl;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, rtype: &str) -> DNSRecord {
        DNSRecord {
            id: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
            name: name.to_string(),
            rtype: rtype.to_string(),
            ttl: 0,
            records: vec![],
        }
    }

    #[test]
    fn apex_full_hostname_is_bare_zone_name() {
        let r = record(APEX_NAME, "SOA");
        assert_eq!(r.full_hostname("sapslaj.xyz"), "sapslaj.xyz");
    }

    #[test]
    fn non_apex_full_hostname_is_prefixed() {
        let r = record("web", "A");
        assert_eq!(r.full_hostname("sapslaj.xyz"), "web.sapslaj.xyz");
    }

    #[test]
    fn empty_previous_never_triggers_a_replace() {
        let r = record("web", "A");
        assert!(!r.should_replace(None));
    }

    #[test]
    fn differing_name_or_type_triggers_a_replace() {
        let r = record("web", "A");
        assert!(r.should_replace(Some(&record("api", "A"))));
        assert!(r.should_replace(Some(&record("web", "AAAA"))));
        assert!(!r.should_replace(Some(&record("web", "A"))));
    }

    #[test]
    fn zero_ttl_defaults_to_300_for_the_api_backend() {
        let r = record("web", "A");
        assert_eq!(r.effective_ttl(), 300);
    }

    #[test]
    fn merge_preserves_created_at_and_clears_deleted_at() {
        let mut existing = record("web", "A");
        existing.id = 7;
        existing.deleted_at = Some(Utc::now());
        let created = existing.created_at;

        let incoming = DNSRecord {
            records: vec!["10.0.0.1".to_string()],
            ..record("web", "A")
        };
        let merged = incoming.merged_onto(&existing);
        assert_eq!(merged.id, 7);
        assert_eq!(merged.created_at, created);
        assert!(merged.deleted_at.is_none());
    }
}
