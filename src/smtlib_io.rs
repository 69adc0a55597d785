//! Minimal SMT-LIB v2 tokenizer and pretty-printer: parse text into `Node`
//! trees, and print `Node` trees back into text that the same parser can
//! round-trip (the `--parser-test` property).
use std::fmt::Write as _;

use crate::node::Node;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("unbalanced parentheses")]
    Unbalanced,
}

struct Tokenizer<'a> {
    src: &'a str,
    pos: usize,
}

#[derive(Debug, PartialEq, Eq)]
enum Tok<'a> {
    LParen,
    RParen,
    Atom(&'a str),
}

impl<'a> Tokenizer<'a> {
    fn new(src: &'a str) -> Self {
        Tokenizer { src, pos: 0 }
    }

    fn bytes(&self) -> &'a [u8] {
        self.src.as_bytes()
    }

    fn skip_trivia(&mut self) {
        let b = self.bytes();
        loop {
            while self.pos < b.len() && b[self.pos].is_ascii_whitespace() {
                self.pos += 1;
            }
            if self.pos < b.len() && b[self.pos] == b';' {
                while self.pos < b.len() && b[self.pos] != b'\n' {
                    self.pos += 1;
                }
                continue;
            }
            break;
        }
    }

    fn next(&mut self) -> Option<Tok<'a>> {
        self.skip_trivia();
        let b = self.bytes();
        if self.pos >= b.len() {
            return None;
        }
        match b[self.pos] {
            b'(' => {
                self.pos += 1;
                Some(Tok::LParen)
            }
            b')' => {
                self.pos += 1;
                Some(Tok::RParen)
            }
            b'"' => {
                let start = self.pos;
                self.pos += 1;
                while self.pos < b.len() {
                    if b[self.pos] == b'"' {
                        self.pos += 1;
                        // SMT-LIB escapes quotes by doubling them: `""` stays inside the string.
                        if self.pos < b.len() && b[self.pos] == b'"' {
                            self.pos += 1;
                            continue;
                        }
                        break;
                    }
                    self.pos += 1;
                }
                Some(Tok::Atom(&self.src[start..self.pos]))
            }
            b'|' => {
                let start = self.pos;
                self.pos += 1;
                while self.pos < b.len() && b[self.pos] != b'|' {
                    self.pos += 1;
                }
                if self.pos < b.len() {
                    self.pos += 1;
                }
                Some(Tok::Atom(&self.src[start..self.pos]))
            }
            _ => {
                let start = self.pos;
                while self.pos < b.len()
                    && !b[self.pos].is_ascii_whitespace()
                    && b[self.pos] != b'('
                    && b[self.pos] != b')'
                    && b[self.pos] != b';'
                {
                    self.pos += 1;
                }
                Some(Tok::Atom(&self.src[start..self.pos]))
            }
        }
    }
}

/// Parse a full SMT-LIB script into its top-level command list.
pub fn parse(src: &str) -> Result<Vec<Node>, ParseError> {
    let mut tz = Tokenizer::new(src);
    let mut out = Vec::new();
    loop {
        let save = tz.pos;
        match tz.next() {
            None => break,
            Some(_) => {
                tz.pos = save;
                out.push(parse_one_from(&mut tz)?);
            }
        }
    }
    Ok(out)
}

/// Parse a single s-expression (used by mutators and tests that work with
/// one fragment at a time).
pub fn parse_one(src: &str) -> Result<Node, ParseError> {
    let mut tz = Tokenizer::new(src);
    parse_one_from(&mut tz)
}

fn parse_one_from(tz: &mut Tokenizer<'_>) -> Result<Node, ParseError> {
    match tz.next().ok_or(ParseError::UnexpectedEof)? {
        Tok::Atom(a) => Ok(Node::leaf(a)),
        Tok::LParen => {
            let mut children = Vec::new();
            loop {
                let save = tz.pos;
                match tz.next() {
                    None => return Err(ParseError::Unbalanced),
                    Some(Tok::RParen) => break,
                    Some(_) => {
                        tz.pos = save;
                        children.push(parse_one_from(tz)?);
                    }
                }
            }
            Ok(Node::composite(children))
        }
        Tok::RParen => Err(ParseError::Unbalanced),
    }
}

/// Render a node (or forest of top-level commands) back to SMT-LIB text.
pub fn print_node(n: &Node, out: &mut String) {
    if let Some(text) = n.text() {
        out.push_str(text);
        return;
    }
    out.push('(');
    for (i, child) in n.children().iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        print_node(child, out);
    }
    out.push(')');
}

pub fn write_to_string(roots: &[Node]) -> String {
    let mut s = String::with_capacity(64 * roots.len());
    for r in roots {
        let mut one = String::new();
        print_node(r, &mut one);
        writeln!(s, "{}", one).ok();
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_simple() {
        let src = "(assert (= x 1))";
        let n = parse_one(src).unwrap();
        let mut out = String::new();
        print_node(&n, &mut out);
        assert_eq!(out, src);
    }

    #[test]
    fn roundtrip_forest_normalizes_whitespace() {
        let src = "(set-logic QF_BV)\n(assert\n  (= x  1))\n";
        let forest = parse(src).unwrap();
        assert_eq!(forest.len(), 2);
        let out = write_to_string(&forest);
        let forest2 = parse(&out).unwrap();
        assert_eq!(forest.len(), forest2.len());
        for (a, b) in forest.iter().zip(forest2.iter()) {
            assert_eq!(a, b);
        }
    }

    #[test]
    fn quoted_and_pipe_symbols_survive() {
        let src = r#"(assert (= |a b| "c""d"))"#;
        let n = parse_one(src).unwrap();
        let mut out = String::new();
        print_node(&n, &mut out);
        assert_eq!(out, src);
    }

    #[test]
    fn comments_are_ignored() {
        let src = "(assert ; a comment\n a)";
        let n = parse_one(src).unwrap();
        assert_eq!(n.len(), 2);
    }
}
