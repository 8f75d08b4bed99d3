//! SOA serial bump (`spec.md` §4.4 "SOA serial bump").

use thiserror::Error;

use super::ast::{AstNode, Entry};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SoaError {
    #[error("zone file has no SOA record")]
    Missing,
    #[error("SOA record has {0} RDATA values, expected exactly 7")]
    WrongArity(usize),
    #[error("SOA serial '{0}' is not numeric")]
    NonNumericSerial(String),
}

/// Finds the sole `SOA` entry and increments its serial (the third RDATA
/// value) in place. `spec.md` §4.4/§8: fails distinctly when the SOA is
/// absent or malformed, never silently wraps or skips.
pub fn bump_serial(entries: &mut [AstNode]) -> Result<u32, SoaError> {
    let soa = entries
        .iter_mut()
        .find_map(|node| match &mut node.entry {
            Entry::Rr(rr) if rr.rrecord.rr_type.eq_ignore_ascii_case("SOA") => Some(rr),
            _ => None,
        })
        .ok_or(SoaError::Missing)?;

    if soa.rrecord.rdata.len() != 7 {
        return Err(SoaError::WrongArity(soa.rrecord.rdata.len()));
    }

    let serial: u32 = soa.rrecord.rdata[2]
        .parse()
        .map_err(|_| SoaError::NonNumericSerial(soa.rrecord.rdata[2].clone()))?;
    let next = serial.wrapping_add(1);
    soa.rrecord.rdata[2] = next.to_string();
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::super::ast::{RRecord, RrEntry};
    use super::*;

    fn soa_node(serial: &str) -> AstNode {
        AstNode {
            source_tokens: vec![],
            lead_comments: vec![],
            line_comment: None,
            entry: Entry::Rr(RrEntry {
                domain_name: "@".to_string(),
                rrecord: RRecord {
                    ttl: None,
                    class: Some("IN".to_string()),
                    rr_type: "SOA".to_string(),
                    rdata: vec![
                        "ns1.example.com.".to_string(),
                        "hostmaster.example.com.".to_string(),
                        serial.to_string(),
                        "3600".to_string(),
                        "600".to_string(),
                        "604800".to_string(),
                        "86400".to_string(),
                    ],
                },
            }),
        }
    }

    #[test]
    fn increments_the_serial_by_one() {
        let mut entries = vec![soa_node("1406291485")];
        let next = bump_serial(&mut entries).unwrap();
        assert_eq!(next, 1406291486);
        let rr = entries[0].as_rr().unwrap();
        assert_eq!(rr.rrecord.rdata[2], "1406291486");
    }

    #[test]
    fn missing_soa_is_an_error() {
        let mut entries: Vec<AstNode> = vec![];
        assert_eq!(bump_serial(&mut entries).unwrap_err(), SoaError::Missing);
    }

    #[test]
    fn wrong_arity_is_an_error() {
        let mut soa = soa_node("1");
        if let Entry::Rr(rr) = &mut soa.entry {
            rr.rrecord.rdata.pop();
        }
        let mut entries = vec![soa];
        assert!(matches!(bump_serial(&mut entries), Err(SoaError::WrongArity(6))));
    }

    #[test]
    fn non_numeric_serial_is_an_error() {
        let mut entries = vec![soa_node("not-a-number")];
        assert!(matches!(bump_serial(&mut entries), Err(SoaError::NonNumericSerial(_))));
    }
}
