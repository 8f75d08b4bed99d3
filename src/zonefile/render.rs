//! AST → token stream, canonical re-emission (`spec.md` §4.3 "Inverse
//! operation (tokenize)").
//!
//! This is deliberately *not* the byte-preserving path: every token this
//! module emits carries canonical whitespace (a single space between
//! fields, a single newline after each entry) regardless of what the
//! original file looked like. `spec.md` §9 calls out that the two re-emit
//! paths (byte-preserving vs. canonical) must never be blended — editing
//! any node means re-formatting the whole document through this module, not
//! patching the original token stream in place.

use super::ast::{AstNode, Entry};
use super::parser::ParseErrorKind;
use super::token::{Token, TokenKind};

fn push(tokens: &mut Vec<Token>, kind: TokenKind, literal: impl Into<Vec<u8>>, leading_ws: &'static str) {
    tokens.push(Token::new(kind, literal.into(), leading_ws.as_bytes().to_vec()));
}

/// Canonically tokenizes a single AST node. Lead comments are emitted
/// before the entry, the line comment after, TTLs as integer seconds.
pub fn tokenize_entry(node: &AstNode, tokens: &mut Vec<Token>) -> Result<(), ParseErrorKind> {
    for comment in &node.lead_comments {
        push(tokens, TokenKind::Comment, comment.as_bytes().to_vec(), "");
        push(tokens, TokenKind::Newline, b"\n".to_vec(), "");
    }

    match &node.entry {
        Entry::Empty => {}
        Entry::Origin(entry) => {
            push(tokens, TokenKind::ControlEntry, b"$ORIGIN".to_vec(), "");
            push(tokens, TokenKind::DomainName, entry.domain_name.as_bytes().to_vec(), " ");
        }
        Entry::Ttl(entry) => {
            push(tokens, TokenKind::ControlEntry, b"$TTL".to_vec(), "");
            push(
                tokens,
                TokenKind::Ttl,
                entry.ttl.as_secs().to_string().into_bytes(),
                " ",
            );
        }
        Entry::Include(entry) => {
            push(tokens, TokenKind::ControlEntry, b"$INCLUDE".to_vec(), "");
            push(tokens, TokenKind::FileName, entry.file_name.as_bytes().to_vec(), " ");
            if let Some(domain) = &entry.domain_name {
                push(tokens, TokenKind::DomainName, domain.as_bytes().to_vec(), " ");
            }
        }
        Entry::Rr(entry) => {
            push(tokens, TokenKind::DomainName, entry.domain_name.as_bytes().to_vec(), "");
            if let Some(class) = &entry.rrecord.class {
                push(tokens, TokenKind::Class, class.as_bytes().to_vec(), " ");
            }
            if let Some(ttl) = entry.rrecord.ttl {
                push(tokens, TokenKind::Ttl, ttl.as_secs().to_string().into_bytes(), " ");
            }
            push(tokens, TokenKind::Type, entry.rrecord.rr_type.as_bytes().to_vec(), " ");
            for value in &entry.rrecord.rdata {
                push(tokens, TokenKind::Rdata, value.as_bytes().to_vec(), " ");
            }
        }
    }

    if let Some(comment) = &node.line_comment {
        push(tokens, TokenKind::Comment, comment.as_bytes().to_vec(), " ");
    }

    push(tokens, TokenKind::Newline, b"\n".to_vec(), "");
    Ok(())
}

/// Canonically tokenizes a whole document.
pub fn tokenize(entries: &[AstNode]) -> Result<Vec<Token>, ParseErrorKind> {
    let mut tokens = Vec::new();
    for node in entries {
        tokenize_entry(node, &mut tokens)?;
    }
    Ok(tokens)
}

/// Renders a whole document straight to bytes: `tokenize` followed by
/// [`super::token::render`].
pub fn render_entries(entries: &[AstNode]) -> Result<Vec<u8>, ParseErrorKind> {
    Ok(super::token::render(&tokenize(entries)?))
}

#[cfg(test)]
mod tests {
    use super::super::ast::{OriginEntry, RRecord, RrEntry};
    use super::*;
    use std::time::Duration;

    #[test]
    fn round_trips_a_simple_rr_through_canonical_render() {
        let node = AstNode {
            source_tokens: vec![],
            lead_comments: vec![],
            line_comment: None,
            entry: Entry::Rr(RrEntry {
                domain_name: "web".to_string(),
                rrecord: RRecord {
                    ttl: Some(Duration::from_secs(300)),
                    class: Some("IN".to_string()),
                    rr_type: "A".to_string(),
                    rdata: vec!["10.0.0.1".to_string()],
                },
            }),
        };
        let bytes = render_entries(&[node]).unwrap();
        assert_eq!(bytes, b"web IN 300 A 10.0.0.1\n".to_vec());
    }

    #[test]
    fn origin_control_entry_renders_canonically() {
        let node = AstNode {
            source_tokens: vec![],
            lead_comments: vec![],
            line_comment: None,
            entry: Entry::Origin(OriginEntry {
                domain_name: "example.com.".to_string(),
            }),
        };
        let bytes = render_entries(&[node]).unwrap();
        assert_eq!(bytes, b"$ORIGIN example.com.\n".to_vec());
    }
}
