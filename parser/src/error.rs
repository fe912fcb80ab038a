use nom::error::ParseError;
use thiserror::Error;

use crate::property::PropertyValueKind;

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("stream truncated ({remaining} bytes left)")]
    TruncatedStream { remaining: usize },
    #[error("unknown property type {tag:?}")]
    UnknownPropertyType { tag: String },
    #[error("property list ended without a \"None\" terminator")]
    MissingSentinel,
    #[error("invalid string encoding for length prefix {length}")]
    InvalidStringEncoding { length: i32 },
    #[error("negative element count {count}")]
    NegativeCount { count: i32 },
    #[error("arrays nested {depth} levels deep")]
    NestingTooDeep { depth: usize },
    #[error("property {name:?} holds {found:?}, not {expected:?}")]
    WrongPropertyType {
        name: String,
        expected: PropertyValueKind,
        found: PropertyValueKind,
    },
    #[error("property {name:?} not found")]
    MissingProperty { name: String },
    #[error("nom error {err:?} ({remaining} bytes left)")]
    Nom {
        err: nom::error::ErrorKind,
        remaining: usize,
    },
    #[error("I/O error")]
    Io(#[from] std::io::Error),
}

/// Parser error threaded through every `nom` function in this crate.
#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error { kind }
    }
}

impl<'a> ParseError<&'a [u8]> for Error {
    fn from_error_kind(input: &'a [u8], kind: nom::error::ErrorKind) -> Self {
        let remaining = input.len();
        let kind = match kind {
            nom::error::ErrorKind::Eof => ErrorKind::TruncatedStream { remaining },
            err => ErrorKind::Nom { err, remaining },
        };
        Error { kind }
    }

    fn append(_input: &'a [u8], _kind: nom::error::ErrorKind, other: Self) -> Self {
        other
    }
}

impl From<nom::Err<Error>> for ErrorKind {
    fn from(err: nom::Err<Error>) -> Self {
        match err {
            nom::Err::Incomplete(_) => ErrorKind::TruncatedStream { remaining: 0 },
            nom::Err::Error(e) | nom::Err::Failure(e) => e.kind,
        }
    }
}

pub type IResult<I, T> = nom::IResult<I, T, Error>;

/// Wraps `kind` as a non-recoverable nom error.
pub(crate) fn failure(kind: ErrorKind) -> nom::Err<Error> {
    nom::Err::Failure(kind.into())
}
