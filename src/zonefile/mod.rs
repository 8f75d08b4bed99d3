//! RFC 1035 master-file lexer, parser, formatter, and renderer
//! (`spec.md` §2 "Zone-file codec", §4.1-§4.4).

pub mod ast;
pub mod format;
pub mod lexer;
pub mod parser;
pub mod render;
pub mod soa;
pub mod token;

pub use ast::{AstNode, Entry};
pub use format::format_entries;
pub use lexer::lex;
pub use parser::{parse_entries, ParseError, ParseErrorKind};
pub use render::{render_entries, tokenize};
pub use soa::{bump_serial, SoaError};
pub use token::{render as render_tokens, Token, TokenKind};

/// Convenience: lex then parse a whole zone file in one call.
pub fn load(input: &[u8]) -> Result<Vec<AstNode>, ParseError> {
    let tokens = lex(input);
    parse_entries(&tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `spec.md` §8 "Round-trip": for every well-formed zone file `Z`,
    /// `render(lex(Z)) == Z` byte-for-byte.
    #[test]
    fn lex_then_render_tokens_round_trips_byte_for_byte() {
        let samples: &[&[u8]] = &[
            b"$ORIGIN example.com.\n$TTL 3600\n@ IN SOA ns1.example.com. hostmaster.example.com. (\n    2024010101 ; serial\n    3600 ; refresh\n    600 ; retry\n    604800 ; expire\n    86400 ; minimum\n)\n@ IN NS ns1.example.com.\nweb IN A 10.0.0.1\nweb IN AAAA ::1\nmail IN MX 10 mx1.example.com.\n",
            b"1.0.0 IN PTR host1.example.com.\n5 IN PTR oddball.example.com.\n",
            b"host IN TXT \"hello \\\"world\\\"; still inside\"\n",
            b"  web\tIN  A\t10.0.0.1 ; a comment\n\n$ORIGIN example.com.\n",
        ];
        for sample in samples {
            let tokens = lex(sample);
            let rendered = token::render(&tokens);
            assert_eq!(&rendered, sample, "round-trip failed for {sample:?}");
        }
    }

    /// `spec.md` §8 "Parse idempotence": `tokenize(parse(lex(Z)))` parses to
    /// the same AST, even if not byte-identical to `lex(Z)`.
    #[test]
    fn tokenize_of_parse_reparses_to_an_equivalent_ast() {
        let input = b"web IN 300 A 10.0.0.1\nmail IN MX 10 mx1.example.com.\n";
        let entries = load(input).unwrap();
        let retokenized = tokenize(&entries).unwrap();
        let reparsed = parser::parse_entries(&retokenized).unwrap();
        assert_eq!(entries, reparsed);
    }
}
