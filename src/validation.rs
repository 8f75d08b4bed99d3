//! Per-record validation (`spec.md` §4.8). Runs before any catalog write
//! reached through the HTTP surface — a record is either accepted wholesale
//! or rejected wholesale with the full message list.

use lazy_static::lazy_static;
use regex::Regex;

use crate::catalog::DNSRecord;
use crate::enums::RecordType;

lazy_static! {
    static ref HOSTNAME_PATTERN: Regex =
        Regex::new(r"^[a-z0-9_][a-z0-9.\-]+[a-z0-9]$").expect("failed to compile an internal regex");
}

const MAX_FULL_HOSTNAME_LEN: usize = 253;

/// Validates `record` against `zone_name` (the single managed zone), per
/// `spec.md` §4.8 items 1-5. Returns the aggregate message list; an empty
/// list means the record is accepted.
pub fn validate(record: &DNSRecord, zone_name: &str) -> Vec<String> {
    let mut messages = Vec::new();

    if record.name.ends_with(zone_name) || record.name.ends_with(&format!("{zone_name}.")) {
        messages.push(format!(
            "The name '{}' should not end with the zone name.",
            record.name
        ));
    }

    if record.name.ends_with('.') && !record.name.ends_with(&format!("{zone_name}.")) {
        messages.push(format!(
            "The name '{}' should not end with a dot ('.').",
            record.name
        ));
    }

    let full_hostname = record.full_hostname(zone_name);
    if full_hostname.len() > MAX_FULL_HOSTNAME_LEN {
        messages.push(format!(
            "The full hostname '{}' for the record '{}' exceeds the length limit ({} > {}).",
            full_hostname,
            record.name,
            full_hostname.len(),
            MAX_FULL_HOSTNAME_LEN,
        ));
    }

    if !HOSTNAME_PATTERN.is_match(&record.name) {
        messages.push(format!(
            "The name '{}' is not a valid RFC 1123 hostname.",
            record.name
        ));
    }

    if RecordType::VALID_FOR_CATALOG
        .iter()
        .all(|t| !t.as_str().eq_ignore_ascii_case(&record.rtype))
    {
        messages.push(format!("Record type '{}' is not supported.", record.rtype));
    }

    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(name: &str, rtype: &str) -> DNSRecord {
        DNSRecord {
            id: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
            name: name.to_string(),
            rtype: rtype.to_string(),
            ttl: 300,
            records: vec!["10.0.0.1".to_string()],
        }
    }

    const ZONE: &str = "sapslaj.xyz";

    #[test]
    fn name_ending_with_zone_is_rejected() {
        let msgs = validate(&record("foo.sapslaj.xyz", "A"), ZONE);
        assert!(msgs
            .iter()
            .any(|m| m == "The name 'foo.sapslaj.xyz' should not end with the zone name."));
    }

    #[test]
    fn trailing_dot_is_rejected() {
        let msgs = validate(&record("foo.", "A"), ZONE);
        assert!(msgs
            .iter()
            .any(|m| m == "The name 'foo.' should not end with a dot ('.')."));
    }

    #[test]
    fn oversized_full_hostname_is_rejected() {
        let long_name = "a".repeat(254);
        let msgs = validate(&record(&long_name, "A"), ZONE);
        assert!(msgs.iter().any(|m| m.contains("exceeds the length limit")));
    }

    #[test]
    fn unsupported_type_is_rejected() {
        let msgs = validate(&record("foo", "ZZZ"), ZONE);
        assert!(msgs
            .iter()
            .any(|m| m == "Record type 'ZZZ' is not supported."));
    }

    #[test]
    fn well_formed_record_passes() {
        let msgs = validate(&record("foo", "A"), ZONE);
        assert!(msgs.is_empty(), "unexpected validation errors: {msgs:?}");
    }

    #[test]
    fn leading_underscore_is_allowed_for_acme_challenge_labels() {
        let msgs = validate(&record("_acme-challenge.www", "TXT"), ZONE);
        assert!(msgs.is_empty(), "unexpected validation errors: {msgs:?}");
    }
}
