//! ASCII STL decoder.
//!
//! The grammar, informally:
//!
//! ```text
//! solid [name]
//!   facet normal <f> <f> <f>
//!     outer loop
//!       vertex <f> <f> <f>
//!       vertex <f> <f> <f>
//!       vertex <f> <f> <f>
//!     endloop
//!   endfacet
//!   ...
//! endsolid [name]
//! ```
//!
//! The lexer is a state machine that is driven one facet at a time by
//! [`Lexer::next`]. The first grammar violation stops it for good; nothing is
//! resynchronized.

use crate::error::Expected;
use crate::error::FloatError;
use crate::Error;
use crate::Facet;
use crate::Result;
use crate::Vertex;
use std::iter::FusedIterator;
use std::mem;

/// The bytes every ASCII STL file starts with.
pub const SENTINEL: &[u8] = b"solid";

fn is_space(b: u8) -> bool {
    b == b' ' || b == b'\t' || b == b'\r' || b == b'\n'
}

fn is_ident(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'.'
}

fn is_float_digit(b: u8) -> bool {
    b.is_ascii_digit() || b == b'.'
}

fn is_sign(b: u8) -> bool {
    b == b'+' || b == b'-'
}

fn is_exponent(b: u8) -> bool {
    b == b'e' || b == b'E'
}

/// Whether `header` looks like the start of an ASCII STL file.
///
/// Binary files may start with `solid` as well, so a positive answer is only
/// a hint.
pub fn test_format(header: &[u8]) -> bool {
    header.starts_with(SENTINEL)
}

/// Whether `name`, written after `solid`, is read back as the mesh name.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(is_ident)
        && name != "facet"
        && name != "endsolid"
}

enum State {
    /// Reading the optional name after `solid`.
    Header,
    /// Expecting `facet ... outer loop`, or `endsolid`.
    Facet,
    /// Expecting the three vertices of the given facet and the closing keywords.
    Vertices(Facet),
    Done,
}

enum Transition {
    Goto(State),
    Emit(Facet),
    End,
}

/// Pull-based ASCII STL lexer.
///
/// Iterating yields facets in file order, and stops either at `endsolid` or at
/// the first error. Call [`Lexer::finish`] afterwards to know which one it was.
pub struct Lexer<'a> {
    input: &'a [u8],
    /// Offset of `input` in the buffer given by the caller, for error reports.
    base: usize,
    pos: usize,
    state: State,
    mesh_name: Option<String>,
    error: Option<Error>,
}

impl<'a> Lexer<'a> {
    /// Lexes `input`, which must be positioned right after the `solid` keyword.
    pub fn new(input: &'a [u8]) -> Lexer<'a> {
        Lexer::with_offset(input, 0)
    }

    /// Like [`Lexer::new`], but byte offsets in errors are shifted by `base`.
    pub fn with_offset(input: &'a [u8], base: usize) -> Lexer<'a> {
        Lexer {
            input,
            base,
            pos: 0,
            state: State::Header,
            mesh_name: None,
            error: None,
        }
    }

    /// The name written after `solid`, once the header has been read.
    pub fn mesh_name(&self) -> Option<&str> {
        self.mesh_name.as_deref()
    }

    /// The error that stopped the lexer, if any.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Returns the mesh name, or the error that stopped the lexer.
    pub fn finish(self) -> Result<Option<String>> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.mesh_name),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn accept(&mut self, valid: fn(u8) -> bool) -> bool {
        match self.peek() {
            Some(b) if valid(b) => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn accept_run(&mut self, valid: fn(u8) -> bool) -> bool {
        let start = self.pos;
        while self.accept(valid) {}
        start < self.pos
    }

    fn skip_spaces(&mut self) {
        self.accept_run(is_space);
    }

    fn accept_keyword(&mut self, keyword: &str) -> bool {
        if self.input[self.pos..].starts_with(keyword.as_bytes()) {
            self.pos += keyword.len();
            return true;
        }
        false
    }

    /// Accepts `[+-]? [0-9.]+ ([eE] [+-]? [0-9.]+)?`.
    ///
    /// This lets through things like `1.2.3`; the float conversion rejects
    /// them afterwards.
    fn accept_number(&mut self) -> bool {
        self.accept(is_sign);
        if !self.accept_run(is_float_digit) {
            return false;
        }
        if self.accept(is_exponent) {
            self.accept(is_sign);
            if !self.accept_run(is_float_digit) {
                return false;
            }
        }
        true
    }

    fn unexpected(&self, expected: Expected, len: usize) -> Error {
        let end = usize::min(self.pos + len, self.input.len());
        Error::Lex {
            expected,
            offset: self.base + self.pos,
            found: self.input[self.pos..end].to_vec(),
        }
    }

    fn expect_keyword(&mut self, keyword: &'static str) -> Result<()> {
        self.skip_spaces();
        if !self.accept_keyword(keyword) {
            return Err(self.unexpected(Expected::Keyword(keyword), keyword.len()));
        }
        Ok(())
    }

    fn number(&mut self) -> Result<f32> {
        self.skip_spaces();
        let start = self.pos;
        if !self.accept_number() {
            return Err(self.unexpected(Expected::Number, 1));
        }
        let text = String::from_utf8_lossy(&self.input[start..self.pos]);
        let float_error = |kind| Error::Float {
            text: text.to_string(),
            offset: self.base + start,
            kind,
        };
        let value = text
            .parse::<f32>()
            .map_err(|err| float_error(FloatError::Malformed(err)))?;
        if value.is_infinite() {
            return Err(float_error(FloatError::OutOfRange));
        }
        Ok(value)
    }

    fn coordinates(&mut self) -> Result<Vertex> {
        let x = self.number()?;
        let y = self.number()?;
        let z = self.number()?;
        Ok(Vertex { x, y, z })
    }

    fn header(&mut self) -> Result<Transition> {
        self.skip_spaces();
        let input = self.input;
        let start = self.pos;
        self.accept_run(is_ident);
        match &input[start..self.pos] {
            // Nameless solid: leave the keyword for the facet state.
            b"facet" | b"endsolid" => self.pos = start,
            b"" => {}
            name => self.mesh_name = Some(String::from_utf8_lossy(name).into_owned()),
        }
        Ok(Transition::Goto(State::Facet))
    }

    fn facet(&mut self) -> Result<Transition> {
        self.skip_spaces();
        if !self.accept_keyword("facet") {
            if self.accept_keyword("endsolid") {
                return Ok(Transition::End);
            }
            return Err(self.unexpected(Expected::Keyword("facet"), "facet".len()));
        }
        self.expect_keyword("normal")?;
        let normal = self.coordinates()?;
        self.expect_keyword("outer")?;
        self.expect_keyword("loop")?;
        Ok(Transition::Goto(State::Vertices(Facet::pending(normal))))
    }

    fn vertices(&mut self, pending: Facet) -> Result<Transition> {
        let mut vertices = [Vertex::default(); 3];
        for vertex in &mut vertices {
            self.expect_keyword("vertex")?;
            *vertex = self.coordinates()?;
        }
        self.expect_keyword("endloop")?;
        self.expect_keyword("endfacet")?;
        Ok(Transition::Emit(pending.finish(vertices)))
    }
}

impl Iterator for Lexer<'_> {
    type Item = Facet;

    fn next(&mut self) -> Option<Facet> {
        loop {
            let transition = match mem::replace(&mut self.state, State::Done) {
                State::Header => self.header(),
                State::Facet => self.facet(),
                State::Vertices(pending) => self.vertices(pending),
                State::Done => return None,
            };
            match transition {
                Ok(Transition::Goto(state)) => self.state = state,
                Ok(Transition::Emit(facet)) => {
                    self.state = State::Facet;
                    return Some(facet);
                }
                Ok(Transition::End) => return None,
                Err(err) => {
                    self.error = Some(err);
                    return None;
                }
            }
        }
    }
}

impl FusedIterator for Lexer<'_> {}

/// Decodes a whole ASCII STL file, `solid` keyword included, and returns its
/// name along with its facets.
///
/// Nothing but the error is returned if the grammar is violated anywhere, even
/// after some facets have been decoded.
pub fn parse_solid(input: &[u8]) -> Result<(Option<String>, Vec<Facet>)> {
    let span = tracing::info_span!("parse_ascii", len = input.len());
    let _enter = span.enter();

    let body = match input.strip_prefix(SENTINEL) {
        Some(body) => body,
        None => {
            return Err(Error::Lex {
                expected: Expected::Keyword("solid"),
                offset: 0,
                found: input[..usize::min(SENTINEL.len(), input.len())].to_vec(),
            })
        }
    };

    let mut lexer = Lexer::with_offset(body, SENTINEL.len());
    let facets: Vec<Facet> = lexer.by_ref().collect();
    let name = lexer.finish()?;
    tracing::debug!(facet_count = facets.len(), ?name, "decoded ascii solid");
    Ok((name, facets))
}

/// Decodes a whole ASCII STL file, `solid` keyword included.
pub fn parse(input: &[u8]) -> Result<Vec<Facet>> {
    parse_solid(input).map(|(_name, facets)| facets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_ulps_eq;

    const ONE_FACET: &str = "solid tri
facet normal 0 0 1
  outer loop
    vertex 0 0 0
    vertex 1 0 0
    vertex 0 1 0
  endloop
endfacet
endsolid tri
";

    fn lex_error(input: &str) -> (Expected, usize, Vec<u8>) {
        match parse(input.as_bytes()) {
            Err(Error::Lex {
                expected,
                offset,
                found,
            }) => (expected, offset, found),
            other => panic!("expected a lex error, got {:?}", other),
        }
    }

    #[test]
    fn test_one_facet() {
        let (name, facets) = parse_solid(ONE_FACET.as_bytes()).unwrap();
        assert_eq!(name.as_deref(), Some("tri"));
        assert_eq!(
            facets,
            [Facet::new(
                Vertex::new(0.0, 0.0, 1.0),
                [
                    Vertex::new(0.0, 0.0, 0.0),
                    Vertex::new(1.0, 0.0, 0.0),
                    Vertex::new(0.0, 1.0, 0.0),
                ],
            )],
        );
    }

    #[test]
    fn test_empty_solid() {
        let (name, facets) = parse_solid(b"solid empty\nendsolid empty\n").unwrap();
        assert_eq!(name.as_deref(), Some("empty"));
        assert!(facets.is_empty());
    }

    #[test]
    fn test_nameless_solid() {
        let input = ONE_FACET.replace("solid tri", "solid");
        let (name, facets) = parse_solid(input.as_bytes()).unwrap();
        assert_eq!(name, None);
        assert_eq!(facets.len(), 1);

        let (name, facets) = parse_solid(b"solid\nendsolid\n").unwrap();
        assert_eq!(name, None);
        assert!(facets.is_empty());
    }

    #[test]
    fn test_header_directly_followed_by_facet() {
        let input = ONE_FACET.replace("solid tri\n", "solidfacet");
        let (name, facets) = parse_solid(input.as_bytes()).unwrap();
        assert_eq!(name, None);
        assert_eq!(facets.len(), 1);
    }

    #[test]
    fn test_crlf_and_tabs() {
        let input = ONE_FACET.replace('\n', "\r\n").replace("  ", "\t");
        assert_eq!(parse(input.as_bytes()).unwrap().len(), 1);
    }

    #[test]
    fn test_numbers() {
        let input = "solid n
facet normal -0 +1.5e+2 3E-1
  outer loop
    vertex .5 1. -2.25e0
    vertex 1e3 0.1 -0.0001
    vertex 0 0 0
  endloop
endfacet
endsolid";
        let facets = parse(input.as_bytes()).unwrap();
        let facet = facets[0];
        assert_eq!(facet.normal.x.to_bits(), (-0.0_f32).to_bits());
        assert_eq!(facet.normal.y, 150.0);
        assert_ulps_eq!(facet.normal.z, 0.3);
        assert_eq!(facet.vertices[0], Vertex::new(0.5, 1.0, -2.25));
        assert_eq!(facet.vertices[1].x, 1000.0);
        assert_ulps_eq!(facet.vertices[1].y, 0.1);
        assert_ulps_eq!(facet.vertices[1].z, -0.0001);
    }

    #[test]
    fn test_trailing_junk_after_endsolid() {
        let input = format!("{}\x00\x01 whatever", ONE_FACET);
        assert_eq!(parse(input.as_bytes()).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_endloop() {
        let input = ONE_FACET.replace("endloop", "");
        let (expected, _offset, found) = lex_error(&input);
        assert_eq!(expected, Expected::Keyword("endloop"));
        assert_eq!(found, b"endface");
    }

    #[test]
    fn test_missing_endfacet_discards_previous_facets() {
        let second = "facet normal 1 0 0
  outer loop
    vertex 0 0 0
    vertex 0 1 0
    vertex 0 0 1
  endloop
endsolid tri";
        let input = ONE_FACET.replace("endsolid tri\n", second);
        let (expected, _offset, found) = lex_error(&input);
        assert_eq!(expected, Expected::Keyword("endfacet"));
        assert_eq!(found, b"endsolid");
    }

    #[test]
    fn test_error_offset_is_absolute() {
        let (expected, offset, found) =
            lex_error("solid a\nfacet normal 1 0 0\nouter lop");
        assert_eq!(expected, Expected::Keyword("loop"));
        assert_eq!(offset, 33);
        assert_eq!(found, b"lop");
    }

    #[test]
    fn test_missing_number() {
        let (expected, offset, found) = lex_error("solid a\nfacet normal 1 0 x");
        assert_eq!(expected, Expected::Number);
        assert_eq!(offset, 25);
        assert_eq!(found, b"x");

        let (expected, _offset, found) = lex_error("solid a\nfacet normal 1 0 2e");
        assert_eq!(expected, Expected::Number);
        assert!(found.is_empty());
    }

    #[test]
    fn test_malformed_number() {
        let input = ONE_FACET.replace("vertex 1 0 0", "vertex 1.2.3 0 0");
        match parse(input.as_bytes()) {
            Err(Error::Float {
                text,
                kind: FloatError::Malformed(_),
                ..
            }) => assert_eq!(text, "1.2.3"),
            other => panic!("expected a float error, got {:?}", other),
        }
    }

    #[test]
    fn test_number_out_of_range() {
        let input = ONE_FACET.replace("vertex 1 0 0", "vertex 1e39 0 0");
        assert!(matches!(
            parse(input.as_bytes()),
            Err(Error::Float {
                kind: FloatError::OutOfRange,
                ..
            }),
        ));
    }

    #[test]
    fn test_missing_endsolid() {
        let input = ONE_FACET.replace("endsolid tri\n", "");
        let (expected, _offset, found) = lex_error(&input);
        assert_eq!(expected, Expected::Keyword("facet"));
        assert!(found.is_empty());
    }

    #[test]
    fn test_missing_sentinel() {
        let (expected, offset, found) = lex_error("sol");
        assert_eq!(expected, Expected::Keyword("solid"));
        assert_eq!(offset, 0);
        assert_eq!(found, b"sol");
    }

    #[test]
    fn test_lexer_is_lazy() {
        let input = ONE_FACET.replace("endsolid", "garbage");
        let body = input.strip_prefix("solid").unwrap();
        let mut lexer = Lexer::new(body.as_bytes());

        assert!(lexer.next().is_some());
        assert_eq!(lexer.mesh_name(), Some("tri"));
        assert!(lexer.error().is_none());

        assert!(lexer.next().is_none());
        assert!(lexer.next().is_none());
        assert!(matches!(lexer.error(), Some(Error::Lex { .. })));
        assert!(lexer.finish().is_err());
    }

    #[test]
    fn test_sniffing() {
        assert!(test_format(b"solid cube"));
        assert!(test_format(b"solid"));
        assert!(!test_format(b"soli"));
        assert!(!test_format(b"SOLID"));
    }

    #[test]
    fn test_valid_names() {
        assert!(is_valid_name("OpenSCAD_Model"));
        assert!(is_valid_name("v1.2"));
        assert!(is_valid_name("facets"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("my model"));
        assert!(!is_valid_name("part-1"));
        assert!(!is_valid_name("facet"));
        assert!(!is_valid_name("endsolid"));
    }
}
