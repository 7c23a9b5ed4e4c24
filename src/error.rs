use std::error;
use std::fmt;
use std::io;
use std::num;

/// What the ASCII lexer was looking for when it gave up.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Expected {
    Keyword(&'static str),
    Number,
}

/// Why a numeric literal could not be turned into an `f32`.
#[derive(Debug)]
pub enum FloatError {
    /// The lexer accepted the literal but it is not a valid float (e.g. `1.2.3`).
    Malformed(num::ParseFloatError),
    /// The literal does not fit in an `f32`.
    OutOfRange,
}

#[derive(Debug)]
pub enum Error {
    /// The buffer is too short to hold any STL variant.
    InputTooSmall { len: usize },
    /// The ASCII grammar was violated.
    Lex {
        expected: Expected,
        offset: usize,
        found: Vec<u8>,
    },
    /// A numeric literal passed the lexer but failed conversion.
    Float {
        text: String,
        offset: usize,
        kind: FloatError,
    },
    BinaryHeaderTruncated { len: usize },
    BinaryCountTruncated { len: usize },
    /// The input ended inside the record of the `index`-th triangle.
    BinaryRecordTruncated { index: u32, count: u32 },
    Io(io::Error),
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expected::Keyword(keyword) => write!(f, "keyword '{}'", keyword),
            Expected::Number => write!(f, "a number"),
        }
    }
}

impl fmt::Display for FloatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FloatError::Malformed(err) => write!(f, "{}", err),
            FloatError::OutOfRange => write!(f, "value out of range"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InputTooSmall { len } => {
                write!(f, "STL input too small ({} < 5 bytes)", len)
            }
            Error::Lex {
                expected,
                offset,
                found,
            } => write!(
                f,
                "expected {} at byte {}, found \"{}\"",
                expected,
                offset,
                found.escape_ascii(),
            ),
            Error::Float { text, offset, kind } => {
                write!(f, "at byte {}: cannot parse {:?} as float: {}", offset, text, kind)
            }
            Error::BinaryHeaderTruncated { len } => {
                write!(f, "incomplete header on binary STL ({} < 80 bytes)", len)
            }
            Error::BinaryCountTruncated { len } => {
                write!(f, "binary STL has no triangle count ({} < 84 bytes)", len)
            }
            Error::BinaryRecordTruncated { index, count } => {
                write!(f, "binary STL truncated in triangle {} of {}", index, count)
            }
            Error::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Float {
                kind: FloatError::Malformed(err),
                ..
            } => Some(err),
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lex_display_escapes_found_bytes() {
        let err = Error::Lex {
            expected: Expected::Keyword("endloop"),
            offset: 42,
            found: b"end\x00\xff".to_vec(),
        };
        assert_eq!(
            err.to_string(),
            r#"expected keyword 'endloop' at byte 42, found "end\x00\xff""#,
        );
    }

    #[test]
    fn test_source() {
        use std::error::Error as _;

        let err = Error::from(io::Error::from(io::ErrorKind::NotFound));
        assert!(err.source().is_some());

        let err = Error::BinaryHeaderTruncated { len: 3 };
        assert!(err.source().is_none());
    }
}
