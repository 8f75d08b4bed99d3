//! Typed zone-file entries (`spec.md` §3 "AST node", §9 "Tagged AST nodes").
//!
//! A single discriminated union (`Entry`) replaces the dynamic-dispatch /
//! `any`-typed entry field the original Go `ast.Node` used (`entry Entry any`
//! backed by a type switch) — the design note in `spec.md` §9 asks for
//! exactly this shape: a plain enum plus `is_X()`/`as_X()` accessors rather
//! than a trait-object hierarchy.

use std::time::Duration;

use super::token::Token;

/// One line of a zone file: optional comments, the original tokens it was
/// built from (kept so byte-preserving re-emit stays possible, `spec.md`
/// §9), and the typed entry.
#[derive(Debug, Clone, PartialEq)]
pub struct AstNode {
    pub source_tokens: Vec<Token>,
    pub lead_comments: Vec<String>,
    pub line_comment: Option<String>,
    pub entry: Entry,
}

impl AstNode {
    pub fn empty() -> Self {
        Self {
            source_tokens: Vec::new(),
            lead_comments: Vec::new(),
            line_comment: None,
            entry: Entry::Empty,
        }
    }

    pub fn node_kind(&self) -> NodeKind {
        self.entry.node_kind()
    }

    pub fn is_rr(&self) -> bool {
        matches!(self.entry, Entry::Rr(_))
    }

    pub fn as_rr(&self) -> Option<&RrEntry> {
        match &self.entry {
            Entry::Rr(rr) => Some(rr),
            _ => None,
        }
    }

    pub fn as_rr_mut(&mut self) -> Option<&mut RrEntry> {
        match &mut self.entry {
            Entry::Rr(rr) => Some(rr),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.entry, Entry::Empty)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Empty,
    Origin,
    Ttl,
    Include,
    Rr,
}

/// The tagged union named in `spec.md` §9's "Tagged AST nodes" design note.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Empty,
    Origin(OriginEntry),
    Ttl(TtlEntry),
    Include(IncludeEntry),
    Rr(RrEntry),
}

impl Entry {
    pub fn node_kind(&self) -> NodeKind {
        match self {
            Entry::Empty => NodeKind::Empty,
            Entry::Origin(_) => NodeKind::Origin,
            Entry::Ttl(_) => NodeKind::Ttl,
            Entry::Include(_) => NodeKind::Include,
            Entry::Rr(_) => NodeKind::Rr,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OriginEntry {
    pub domain_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TtlEntry {
    pub ttl: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncludeEntry {
    pub file_name: String,
    pub domain_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RrEntry {
    pub domain_name: String,
    pub rrecord: RRecord,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RRecord {
    pub ttl: Option<Duration>,
    pub class: Option<String>,
    pub rr_type: String,
    pub rdata: Vec<String>,
}
