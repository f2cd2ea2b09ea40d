// We want a few things here:
// 1. A way to create a new error, tagged with the kind of failure it represents.
// 2. A way to centralize setting a breakpoint to trap any error in the system fairly soon
//    after it's created (or at least when it's propagated from a library we use back to us).
// 3. Same but for logging / emitting error messages into the tracing/logging system.

use std::borrow::Cow;
use std::fmt;

use backtrace_error::DynBacktraceError;
use tracing::error;

#[cfg(test)]
use test_log::test;

/// Which of the five documented failure categories an [`Error`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Value,
    Index,
    Expression,
    ByteAlign,
    Read,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Value => "value error",
            ErrorKind::Index => "index error",
            ErrorKind::Expression => "expression error",
            ErrorKind::ByteAlign => "byte-align error",
            ErrorKind::Read => "read error",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    inner: DynBacktraceError,
}
pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.inner)
    }
}

impl std::error::Error for Error {}

struct SimpleErr(Cow<'static, str>);
impl fmt::Debug for SimpleErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl fmt::Display for SimpleErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::error::Error for SimpleErr {
    fn description(&self) -> &str {
        &self.0
    }
}

// ? on a foreign error (e.g. std::fmt::Error from a Display impl) maps to Value
// by default; call `Error::new` directly for a more specific kind.
impl<E: std::error::Error + Send + Sync + 'static> From<E> for Error {
    fn from(err: E) -> Error {
        Error::new(ErrorKind::Value, err)
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn new<E: std::error::Error + Send + Sync + 'static>(kind: ErrorKind, err: E) -> Error {
        error!(target: "bitfmt", kind = %kind, "{:?}", err);
        let inner = DynBacktraceError::from(err);
        Error { kind, inner }
    }
}

pub fn err(kind: ErrorKind, msg: impl Into<Cow<'static, str>>) -> Error {
    Error::new(kind, SimpleErr(msg.into()))
}

pub fn value_err(msg: impl Into<Cow<'static, str>>) -> Error {
    err(ErrorKind::Value, msg)
}

pub fn index_err(msg: impl Into<Cow<'static, str>>) -> Error {
    err(ErrorKind::Index, msg)
}

pub fn expression_err(msg: impl Into<Cow<'static, str>>) -> Error {
    err(ErrorKind::Expression, msg)
}

pub fn byte_align_err(msg: impl Into<Cow<'static, str>>) -> Error {
    err(ErrorKind::ByteAlign, msg)
}

pub fn read_err(msg: impl Into<Cow<'static, str>>) -> Error {
    err(ErrorKind::Read, msg)
}

#[test]
fn test_error_kinds() {
    let e = value_err("bad literal");
    assert_eq!(e.kind(), ErrorKind::Value);
    let e = index_err("out of range");
    assert_eq!(e.kind(), ErrorKind::Index);
}
