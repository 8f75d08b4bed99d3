//! The alphabet of the zone-file grammar (`spec.md` §3 "Token").
//!
//! Every token carries its own leading whitespace so that the full token
//! stream can be rendered back to the exact original bytes (`render`,
//! below) — this is the invariant the round-trip property in `spec.md` §8
//! leans on.

/// A tagged token. Bytes, not `String`: RDATA is not guaranteed to be valid
/// UTF-8 (e.g. raw bytes smuggled into a TXT value), and the lexer must
/// never fail just because of that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub literal: Vec<u8>,
    pub leading_ws: Vec<u8>,
}

impl Token {
    pub fn new(kind: TokenKind, literal: impl Into<Vec<u8>>, leading_ws: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            literal: literal.into(),
            leading_ws: leading_ws.into(),
        }
    }

    /// Lossily decode the literal as text, for diagnostics and for fields
    /// that are known by the grammar to always be ASCII (domain names,
    /// types, classes, control words).
    pub fn literal_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.literal)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Illegal,
    Eof,
    Newline,
    Comment,
    ControlEntry,
    DomainName,
    FileName,
    Ttl,
    Class,
    Type,
    Rdata,
    RdataOparen,
    RdataCparen,
}

/// Renders a token stream back to bytes: `leading_ws ++ literal` for every
/// token, concatenated in order. The canonical inverse of the lexer for any
/// input the lexer can consume without producing an `Illegal` token
/// (`spec.md` §4.1).
pub fn render(tokens: &[Token]) -> Vec<u8> {
    let mut out = Vec::new();
    for token in tokens {
        out.extend_from_slice(&token.leading_ws);
        out.extend_from_slice(&token.literal);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_concatenates_ws_then_literal() {
        let tokens = vec![
            Token::new(TokenKind::DomainName, "web", ""),
            Token::new(TokenKind::Type, "A", "  "),
            Token::new(TokenKind::Rdata, "10.0.0.1", " "),
            Token::new(TokenKind::Newline, "\n", ""),
        ];
        assert_eq!(render(&tokens), b"web  A 10.0.0.1\n".to_vec());
    }
}
