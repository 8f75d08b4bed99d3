//! Reorders a parsed document into the canonical, minimal-diff-noise shape
//! described in `spec.md` §4.4 "Formatter". Pure `Vec<AstNode>` → `Vec<AstNode>`,
//! no I/O — kept separate from the file backend so the ordering invariants in
//! `spec.md` §8 ("Formatter invariants") are independently unit-testable.

use super::ast::{AstNode, Entry};

const APEX_OWNER: &str = "@";

fn is_apex(domain_name: &str) -> bool {
    domain_name.is_empty() || domain_name == APEX_OWNER
}

/// A maximal run of consecutive non-apex records (to be sorted as one
/// group-contiguous block) or a single `$INCLUDE` entry, in source order.
/// Segmenting this way is what keeps an include at its original relative
/// position instead of relocating it to the tail of the document: records
/// before it sort and emit before it, records after it sort and emit after.
enum Segment {
    Records(Vec<AstNode>),
    Include(AstNode),
}

/// Pushes a blank separator unless `out` is empty or already ends with one.
fn push_separator(out: &mut Vec<AstNode>) {
    if !out.last().is_some_and(AstNode::is_empty) && !out.is_empty() {
        out.push(AstNode::empty());
    }
}

/// Reorders entries per `spec.md` §4.4:
///
/// 1. first `$ORIGIN` then first `$TTL`, separated from the rest by a blank line.
/// 2. the apex `SOA` record, then apex `NS` records.
/// 3. every other record, grouped by `(domain_name, class, type)`,
///    alphabetized, one blank line between groups.
/// 4. `$INCLUDE` entries, flushed back in at their original relative
///    position among the other records, each bracketed by blank lines.
pub fn format_entries(entries: &[AstNode]) -> Vec<AstNode> {
    let mut origin = None;
    let mut ttl = None;
    let mut apex_soa = None;
    let mut apex_ns = Vec::new();
    let mut segments: Vec<Segment> = Vec::new();

    for node in entries {
        match &node.entry {
            Entry::Empty => {}
            Entry::Origin(_) => {
                if origin.is_none() {
                    origin = Some(node.clone());
                }
            }
            Entry::Ttl(_) => {
                if ttl.is_none() {
                    ttl = Some(node.clone());
                }
            }
            Entry::Include(_) => segments.push(Segment::Include(node.clone())),
            Entry::Rr(rr) => {
                if is_apex(&rr.domain_name) && rr.rrecord.rr_type.eq_ignore_ascii_case("SOA") {
                    if apex_soa.is_none() {
                        apex_soa = Some(node.clone());
                    }
                } else if is_apex(&rr.domain_name) && rr.rrecord.rr_type.eq_ignore_ascii_case("NS") {
                    apex_ns.push(node.clone());
                } else {
                    match segments.last_mut() {
                        Some(Segment::Records(run)) => run.push(node.clone()),
                        _ => segments.push(Segment::Records(vec![node.clone()])),
                    }
                }
            }
        }
    }

    for segment in &mut segments {
        if let Segment::Records(run) = segment {
            run.sort_by(|a, b| group_key(a).cmp(&group_key(b)));
        }
    }

    let mut out = Vec::new();
    let mut wrote_top = false;
    if let Some(node) = origin {
        out.push(node);
        wrote_top = true;
    }
    if let Some(node) = ttl {
        out.push(node);
        wrote_top = true;
    }
    if wrote_top {
        out.push(AstNode::empty());
    }

    if let Some(node) = apex_soa {
        out.push(node);
    }
    for node in apex_ns {
        out.push(node);
    }

    for segment in segments {
        match segment {
            Segment::Records(run) => {
                if run.is_empty() {
                    continue;
                }
                push_separator(&mut out);
                let mut last_group: Option<(String, String, String)> = None;
                for node in run {
                    let key = group_key(&node);
                    if let Some(prev) = &last_group {
                        if *prev != key {
                            out.push(AstNode::empty());
                        }
                    }
                    last_group = Some(key);
                    out.push(node);
                }
            }
            Segment::Include(node) => {
                push_separator(&mut out);
                out.push(node);
                out.push(AstNode::empty());
            }
        }
    }

    out
}

fn group_key(node: &AstNode) -> (String, String, String) {
    match &node.entry {
        Entry::Rr(rr) => (
            rr.domain_name.to_ascii_lowercase(),
            rr.rrecord.class.clone().unwrap_or_default().to_ascii_uppercase(),
            rr.rrecord.rr_type.to_ascii_uppercase(),
        ),
        _ => Default::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::super::ast::{OriginEntry, RRecord, RrEntry, TtlEntry};
    use super::*;
    use std::time::Duration;

    fn rr(domain: &str, rr_type: &str, value: &str) -> AstNode {
        AstNode {
            source_tokens: vec![],
            lead_comments: vec![],
            line_comment: None,
            entry: Entry::Rr(RrEntry {
                domain_name: domain.to_string(),
                rrecord: RRecord {
                    ttl: None,
                    class: Some("IN".to_string()),
                    rr_type: rr_type.to_string(),
                    rdata: vec![value.to_string()],
                },
            }),
        }
    }

    #[test]
    fn origin_then_ttl_at_top_separated_by_blank_line() {
        let entries = vec![
            rr("web", "A", "10.0.0.1"),
            AstNode {
                source_tokens: vec![],
                lead_comments: vec![],
                line_comment: None,
                entry: Entry::Ttl(TtlEntry { ttl: Duration::from_secs(300) }),
            },
            AstNode {
                source_tokens: vec![],
                lead_comments: vec![],
                line_comment: None,
                entry: Entry::Origin(OriginEntry { domain_name: "example.com.".to_string() }),
            },
        ];
        let out = format_entries(&entries);
        assert_eq!(out[0].node_kind(), super::super::ast::NodeKind::Origin);
        assert_eq!(out[1].node_kind(), super::super::ast::NodeKind::Ttl);
        assert!(out[2].is_empty());
    }

    #[test]
    fn apex_soa_precedes_apex_ns() {
        let entries = vec![
            rr("@", "NS", "ns1."),
            rr("@", "SOA", "ns1. hostmaster. 1 3600 600 604800 86400"),
        ];
        let out = format_entries(&entries);
        let soa_pos = out.iter().position(|n| matches!(&n.entry, Entry::Rr(rr) if rr.rrecord.rr_type == "SOA")).unwrap();
        let ns_pos = out.iter().position(|n| matches!(&n.entry, Entry::Rr(rr) if rr.rrecord.rr_type == "NS")).unwrap();
        assert!(soa_pos < ns_pos);
    }

    fn include(file_name: &str) -> AstNode {
        AstNode {
            source_tokens: vec![],
            lead_comments: vec![],
            line_comment: None,
            entry: Entry::Include(super::super::ast::IncludeEntry {
                file_name: file_name.to_string(),
                domain_name: None,
            }),
        }
    }

    #[test]
    fn include_stays_at_its_relative_position_between_neighboring_records() {
        let entries = vec![
            rr("api", "A", "10.0.0.1"),
            include("sub.zone"),
            rr("web", "A", "10.0.0.2"),
        ];
        let out = format_entries(&entries);

        let before_pos = out.iter().position(|n| matches!(&n.entry, Entry::Rr(rr) if rr.domain_name == "api")).unwrap();
        let include_pos = out.iter().position(|n| n.node_kind() == super::super::ast::NodeKind::Include).unwrap();
        let after_pos = out.iter().position(|n| matches!(&n.entry, Entry::Rr(rr) if rr.domain_name == "web")).unwrap();

        assert!(before_pos < include_pos, "record before the include must stay before it");
        assert!(include_pos < after_pos, "record after the include must stay after it");
        assert!(out[include_pos - 1].is_empty(), "include must be bracketed by a blank line before it");
        assert!(out[include_pos + 1].is_empty(), "include must be bracketed by a blank line after it");
    }

    #[test]
    fn groups_are_contiguous_and_alphabetized() {
        let entries = vec![
            rr("web", "A", "10.0.0.2"),
            rr("api", "A", "10.0.0.1"),
            rr("web", "A", "10.0.0.3"),
        ];
        let out = format_entries(&entries);
        let domains: Vec<&str> = out
            .iter()
            .filter_map(|n| n.as_rr().map(|rr| rr.domain_name.as_str()))
            .collect();
        assert_eq!(domains, vec!["api", "web", "web"]);
    }
}
