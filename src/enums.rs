//! The closed sets of record types and classes the zone-file lexer needs to
//! disambiguate, and that the catalog's validation (`spec.md` §4.8) checks
//! against. Styled after the teacher's own `RecordType`/`RecordClass` enums
//! (`From<&str>`, `Display`, `Serialize`) minus the wire-protocol numeric
//! discriminants this system has no use for (`spec.md` §1 non-goals: this is
//! not an authoritative server and never encodes a DNS wire packet).

use serde::{Deserialize, Serialize, Serializer};
use std::fmt::Display;

/// Record types the catalog accepts (`spec.md` §4.8 item 5) — also the set
/// the lexer checks a bare word against when disambiguating a line's first
/// field (`spec.md` §4.2).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
pub enum RecordType {
    A,
    Aaaa,
    Caa,
    Cname,
    Ds,
    Https,
    Mx,
    Naptr,
    Ns,
    Ptr,
    Soa,
    Srv,
    Sshfp,
    Svcb,
    Tlsa,
    Txt,
}

impl RecordType {
    pub const ALL: &'static [RecordType] = &[
        RecordType::A,
        RecordType::Aaaa,
        RecordType::Caa,
        RecordType::Cname,
        RecordType::Ds,
        RecordType::Https,
        RecordType::Mx,
        RecordType::Naptr,
        RecordType::Ns,
        RecordType::Ptr,
        RecordType::Soa,
        RecordType::Srv,
        RecordType::Sshfp,
        RecordType::Svcb,
        RecordType::Tlsa,
        RecordType::Txt,
    ];

    /// The subset of types a catalog row may hold (`spec.md` §4.8 item 5).
    /// `SOA` is deliberately excluded: it is managed by the file backend's
    /// formatter/serial-bump logic, never by the HTTP CRUD surface.
    pub const VALID_FOR_CATALOG: &'static [RecordType] = &[
        RecordType::A,
        RecordType::Aaaa,
        RecordType::Caa,
        RecordType::Cname,
        RecordType::Ds,
        RecordType::Https,
        RecordType::Mx,
        RecordType::Naptr,
        RecordType::Ns,
        RecordType::Ptr,
        RecordType::Srv,
        RecordType::Sshfp,
        RecordType::Svcb,
        RecordType::Tlsa,
        RecordType::Txt,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Caa => "CAA",
            RecordType::Cname => "CNAME",
            RecordType::Ds => "DS",
            RecordType::Https => "HTTPS",
            RecordType::Mx => "MX",
            RecordType::Naptr => "NAPTR",
            RecordType::Ns => "NS",
            RecordType::Ptr => "PTR",
            RecordType::Soa => "SOA",
            RecordType::Srv => "SRV",
            RecordType::Sshfp => "SSHFP",
            RecordType::Svcb => "SVCB",
            RecordType::Tlsa => "TLSA",
            RecordType::Txt => "TXT",
        }
    }
}

impl Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for RecordType {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::ALL
            .iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(value))
            .copied()
            .ok_or(())
    }
}

impl Serialize for RecordType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// Record classes the lexer recognizes (`spec.md` §4.2 rule 1). The
/// catalog only ever emits `Internet`; `Hesiod`/`Chaos` exist purely so the
/// lexer can correctly classify a zone file that contains them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordClass {
    Internet,
    Hesiod,
    Chaos,
}

impl RecordClass {
    pub const ALL: &'static [RecordClass] =
        &[RecordClass::Internet, RecordClass::Hesiod, RecordClass::Chaos];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordClass::Internet => "IN",
            RecordClass::Hesiod => "HS",
            RecordClass::Chaos => "CH",
        }
    }
}

impl Display for RecordClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for RecordClass {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::ALL
            .iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(value))
            .copied()
            .ok_or(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_type_round_trips_through_str() {
        for rtype in RecordType::ALL {
            let parsed = RecordType::try_from(rtype.as_str()).unwrap();
            assert_eq!(&parsed, rtype);
        }
    }

    #[test]
    fn record_type_is_case_insensitive() {
        assert_eq!(RecordType::try_from("txt").unwrap(), RecordType::Txt);
        assert_eq!(RecordType::try_from("Txt").unwrap(), RecordType::Txt);
    }

    #[test]
    fn unknown_record_type_is_rejected() {
        assert!(RecordType::try_from("ZZZ").is_err());
    }

    #[test]
    fn record_class_round_trips() {
        for class in RecordClass::ALL {
            assert_eq!(&RecordClass::try_from(class.as_str()).unwrap(), class);
        }
    }
}
