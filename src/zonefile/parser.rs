//! Token stream → AST (`spec.md` §4.3 "Parser").
//!
//! Mirrors the Go `parser.ParseEntries`/`parser.ParseEntry` almost
//! one-to-one (`pkg/zonefile/parser/parser.go`): split the token stream into
//! lines (joining any `RDATA_OPAREN` … `RDATA_CPAREN` continuation into one
//! logical line), then fold each line's tokens into a single [`AstNode`]
//! by the token kind currently being observed.

use std::time::Duration;

use thiserror::Error;

use super::ast::{AstNode, Entry, IncludeEntry, NodeKind, OriginEntry, RRecord, RrEntry, TtlEntry};
use super::token::{Token, TokenKind};

/// A single parse-error kind, carrying enough context to point at the
/// offending line (`spec.md` §4.3 "Errors").
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseErrorKind {
    #[error("encountered ILLEGAL token: {0:?}")]
    IllegalToken(Vec<u8>),
    #[error("unknown control entry '{0}'")]
    UnknownControlEntry(String),
    #[error("unexpected {token_kind:?} for node kind {node_kind:?}")]
    UnexpectedToken {
        token_kind: TokenKind,
        node_kind: NodeKind,
    },
    #[error("could not parse TTL '{0}': {1}")]
    BadDuration(String, String),
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("error while parsing entry {line}: {kind}")]
pub struct ParseError {
    pub line: usize,
    pub kind: ParseErrorKind,
}

/// Splits a token stream into logical lines, joining any
/// `RDATA_OPAREN` … `RDATA_CPAREN` continuation into a single line
/// (`spec.md` §4.3).
pub fn split_lines(tokens: &[Token]) -> Vec<Vec<Token>> {
    let mut lines = Vec::new();
    let mut line = Vec::new();
    let mut in_continuation = false;

    for tok in tokens {
        line.push(tok.clone());

        if in_continuation {
            if tok.kind == TokenKind::RdataCparen {
                in_continuation = false;
            }
            continue;
        }

        if tok.kind == TokenKind::RdataOparen {
            in_continuation = true;
        }

        if matches!(tok.kind, TokenKind::Newline | TokenKind::Eof) {
            lines.push(std::mem::take(&mut line));
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Parses an entire token stream into one [`AstNode`] per line.
pub fn parse_entries(tokens: &[Token]) -> Result<Vec<AstNode>, ParseError> {
    let lines = split_lines(tokens);
    let mut entries = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        let node = parse_entry(line).map_err(|kind| ParseError { line: i, kind })?;
        entries.push(node);
    }
    Ok(entries)
}

/// Parses a single logical line's tokens into one [`AstNode`]
/// (`pkg/zonefile/parser/parser.go`'s `ParseEntry`).
pub fn parse_entry(tokens: &[Token]) -> Result<AstNode, ParseErrorKind> {
    let mut node = AstNode::empty();
    let mut previous_kind = TokenKind::Newline;

    for tok in tokens {
        node.source_tokens.push(tok.clone());

        match tok.kind {
            TokenKind::Illegal => {
                return Err(ParseErrorKind::IllegalToken(tok.literal.clone()));
            }
            TokenKind::Eof | TokenKind::Newline => {
                previous_kind = tok.kind;
                continue;
            }
            TokenKind::Comment => {
                let text = tok.literal_str().into_owned();
                if previous_kind == TokenKind::Newline {
                    node.lead_comments.push(text);
                } else {
                    node.line_comment = Some(text);
                }
            }
            TokenKind::ControlEntry => {
                let word = tok.literal_str().to_ascii_uppercase();
                node.entry = match word.as_str() {
                    "$INCLUDE" => Entry::Include(IncludeEntry::default()),
                    "$ORIGIN" => Entry::Origin(OriginEntry::default()),
                    "$TTL" => Entry::Ttl(TtlEntry::default()),
                    _ => return Err(ParseErrorKind::UnknownControlEntry(word)),
                };
            }
            TokenKind::DomainName => match &mut node.entry {
                Entry::Origin(entry) => entry.domain_name = tok.literal_str().into_owned(),
                Entry::Include(entry) => entry.domain_name = Some(tok.literal_str().into_owned()),
                Entry::Empty => {
                    node.entry = Entry::Rr(RrEntry {
                        domain_name: tok.literal_str().into_owned(),
                        ..Default::default()
                    });
                }
                other => {
                    return Err(ParseErrorKind::UnexpectedToken {
                        token_kind: tok.kind,
                        node_kind: other.node_kind(),
                    });
                }
            },
            TokenKind::FileName => match &mut node.entry {
                Entry::Include(entry) => entry.file_name = tok.literal_str().into_owned(),
                other => {
                    return Err(ParseErrorKind::UnexpectedToken {
                        token_kind: tok.kind,
                        node_kind: other.node_kind(),
                    });
                }
            },
            TokenKind::Ttl => {
                let literal = tok.literal_str();
                let duration = parse_duration(&literal)
                    .map_err(|e| ParseErrorKind::BadDuration(literal.into_owned(), e))?;
                match &mut node.entry {
                    Entry::Ttl(entry) => entry.ttl = duration,
                    Entry::Empty => {
                        node.entry = Entry::Rr(RrEntry {
                            rrecord: RRecord {
                                ttl: Some(duration),
                                ..Default::default()
                            },
                            ..Default::default()
                        });
                    }
                    Entry::Rr(entry) => entry.rrecord.ttl = Some(duration),
                    other => {
                        return Err(ParseErrorKind::UnexpectedToken {
                            token_kind: tok.kind,
                            node_kind: other.node_kind(),
                        });
                    }
                }
            }
            TokenKind::Class => match &mut node.entry {
                Entry::Empty => {
                    node.entry = Entry::Rr(RrEntry {
                        rrecord: RRecord {
                            class: Some(tok.literal_str().into_owned()),
                            ..Default::default()
                        },
                        ..Default::default()
                    });
                }
                Entry::Rr(entry) => entry.rrecord.class = Some(tok.literal_str().into_owned()),
                other => {
                    return Err(ParseErrorKind::UnexpectedToken {
                        token_kind: tok.kind,
                        node_kind: other.node_kind(),
                    });
                }
            },
            TokenKind::Type => match &mut node.entry {
                Entry::Empty => {
                    node.entry = Entry::Rr(RrEntry {
                        rrecord: RRecord {
                            rr_type: tok.literal_str().into_owned(),
                            ..Default::default()
                        },
                        ..Default::default()
                    });
                }
                Entry::Rr(entry) => entry.rrecord.rr_type = tok.literal_str().into_owned(),
                other => {
                    return Err(ParseErrorKind::UnexpectedToken {
                        token_kind: tok.kind,
                        node_kind: other.node_kind(),
                    });
                }
            },
            TokenKind::Rdata => match &mut node.entry {
                Entry::Rr(entry) => entry.rrecord.rdata.push(tok.literal_str().into_owned()),
                other => {
                    return Err(ParseErrorKind::UnexpectedToken {
                        token_kind: tok.kind,
                        node_kind: other.node_kind(),
                    });
                }
            },
            TokenKind::RdataOparen | TokenKind::RdataCparen => {
                if !matches!(node.entry, Entry::Rr(_)) {
                    return Err(ParseErrorKind::UnexpectedToken {
                        token_kind: tok.kind,
                        node_kind: node.entry.node_kind(),
                    });
                }
            }
        }
        previous_kind = tok.kind;
    }

    Ok(node)
}

/// Parses a TTL/`$TTL` duration literal. Bare digits mean seconds; suffixed
/// values (`h`, `d`, `w`, …) are parsed per common duration syntax
/// (`spec.md` §4.3).
pub fn parse_duration(literal: &str) -> Result<Duration, String> {
    if literal.is_empty() {
        return Err("empty TTL literal".to_string());
    }
    if literal.bytes().all(|b| b.is_ascii_digit()) {
        let secs: u64 = literal.parse().map_err(|e| format!("{e}"))?;
        return Ok(Duration::from_secs(secs));
    }

    let split_at = literal
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .ok_or_else(|| format!("no unit suffix in '{literal}'"))?;
    let (number, unit) = literal.split_at(split_at);
    let number: f64 = number.parse().map_err(|e| format!("{e}"))?;
    let unit_secs: f64 = match unit.to_ascii_lowercase().as_str() {
        "ns" => 1e-9,
        "us" | "µs" => 1e-6,
        "ms" => 1e-3,
        "s" => 1.0,
        "m" => 60.0,
        "h" => 3600.0,
        "d" => 86400.0,
        "w" => 604800.0,
        other => return Err(format!("unknown duration unit '{other}'")),
    };
    Ok(Duration::from_secs_f64(number * unit_secs))
}

#[cfg(test)]
mod tests {
    use super::super::lexer::lex;
    use super::*;

    #[test]
    fn parses_simple_a_record() {
        let tokens = lex(b"web IN A 10.0.0.1\n");
        let entries = parse_entries(&tokens).unwrap();
        assert_eq!(entries.len(), 1);
        let rr = entries[0].as_rr().unwrap();
        assert_eq!(rr.domain_name, "web");
        assert_eq!(rr.rrecord.class.as_deref(), Some("IN"));
        assert_eq!(rr.rrecord.rr_type, "A");
        assert_eq!(rr.rrecord.rdata, vec!["10.0.0.1".to_string()]);
    }

    #[test]
    fn parses_origin_and_ttl_control_entries() {
        let tokens = lex(b"$ORIGIN example.com.\n$TTL 3600\n");
        let entries = parse_entries(&tokens).unwrap();
        assert_eq!(entries.len(), 2);
        match &entries[0].entry {
            Entry::Origin(o) => assert_eq!(o.domain_name, "example.com."),
            other => panic!("unexpected entry: {other:?}"),
        }
        match &entries[1].entry {
            Entry::Ttl(t) => assert_eq!(t.ttl, Duration::from_secs(3600)),
            other => panic!("unexpected entry: {other:?}"),
        }
    }

    #[test]
    fn unknown_control_entry_is_a_parse_error() {
        let tokens = lex(b"$FROBNICATE foo\n");
        let err = parse_entries(&tokens).unwrap_err();
        assert_eq!(
            err.kind,
            ParseErrorKind::UnknownControlEntry("$FROBNICATE".to_string())
        );
    }

    #[test]
    fn joins_rdata_continuation_into_one_line() {
        let input = b"@ IN SOA ns1. hostmaster. (\n 1 ; serial\n 3600\n 600\n 604800\n 86400\n)\n";
        let tokens = lex(input);
        let entries = parse_entries(&tokens).unwrap();
        assert_eq!(entries.len(), 1);
        let rr = entries[0].as_rr().unwrap();
        assert_eq!(rr.rrecord.rr_type, "SOA");
        assert_eq!(rr.rrecord.rdata.len(), 5);
    }

    #[test]
    fn suffixed_duration_is_parsed() {
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("1d").unwrap(), Duration::from_secs(86400));
        assert_eq!(parse_duration("300").unwrap(), Duration::from_secs(300));
    }
}
