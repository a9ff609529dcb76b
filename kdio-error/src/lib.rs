#![deny(missing_docs)]

//! Error handling for kdio.
//!
//! Every failure the codec or a block store can report is a [`KdioError`]. Errors are never
//! retried or downgraded inside kdio; they carry enough context (the store path, expected and
//! actual sizes) to be diagnosed from the message alone.

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::fmt::{Debug, Display, Formatter};
use std::ops::Deref;
use std::{env, fmt, io};

/// A string that can be used as an error message.
#[derive(Debug)]
pub struct ErrString(Cow<'static, str>);

#[allow(clippy::fallible_impl_from)]
impl<T> From<T> for ErrString
where
    T: Into<Cow<'static, str>>,
{
    #[allow(clippy::panic)]
    fn from(msg: T) -> Self {
        if env::var("KDIO_PANIC_ON_ERR").as_deref().unwrap_or("") == "1" {
            panic!("{}\nBacktrace:\n{}", msg.into(), Backtrace::capture());
        } else {
            Self(msg.into())
        }
    }
}

impl AsRef<str> for ErrString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for ErrString {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for ErrString {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// The stack captured where a [`KdioError`] was constructed.
///
/// Only captured when `RUST_BACKTRACE` or `RUST_LIB_BACKTRACE` asks for it.
pub struct ErrBacktrace(Backtrace);

impl ErrBacktrace {
    /// Capture the current stack.
    #[inline]
    pub fn capture() -> Self {
        Self(Backtrace::capture())
    }
}

impl Deref for ErrBacktrace {
    type Target = Backtrace;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for ErrBacktrace {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl Debug for ErrBacktrace {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// The top-level error type for kdio.
#[derive(thiserror::Error)]
#[non_exhaustive]
pub enum KdioError {
    /// A group, dataset, attribute or block could not be written by the store.
    #[error("Store write failed: {0}\nBacktrace:\n{1}")]
    StoreWrite(ErrString, ErrBacktrace),
    /// A group, dataset, attribute or block could not be read from the store.
    #[error("Store read failed: {0}\nBacktrace:\n{1}")]
    StoreRead(ErrString, ErrBacktrace),
    /// A required attribute is missing or has the wrong type.
    #[error("Corrupt metadata: {0}\nBacktrace:\n{1}")]
    CorruptMetadata(ErrString, ErrBacktrace),
    /// The coordinate dataset and the value array disagree on the number of points.
    #[error(
        "Inconsistent size at {0}: coordinates hold {1} points but {2} values were read\nBacktrace:\n{3}"
    )]
    InconsistentSize(ErrString, usize, usize, ErrBacktrace),
    /// A block payload does not match its declared block shape.
    #[error("Data shape mismatch at {0}: expected {1} elements, got {2}\nBacktrace:\n{3}")]
    DataShape(ErrString, usize, usize, ErrBacktrace),
    /// The version recorded on disk cannot be read by this build.
    #[error("Unsupported {0} {1}, expected {2}\nBacktrace:\n{3}")]
    UnsupportedVersion(ErrString, ErrString, ErrString, ErrBacktrace),
    /// The injected value writer failed.
    #[error("Value write failed at {0}: {1}")]
    ValueWrite(ErrString, Box<KdioError>),
    /// The injected value reader failed.
    #[error("Value read failed at {0}: {1}")]
    ValueRead(ErrString, Box<KdioError>),
    /// An invalid argument was provided.
    #[error("{0}\nBacktrace:\n{1}")]
    InvalidArgument(ErrString, ErrBacktrace),
    /// A wrapper for other errors, carrying additional context.
    #[error("{0}: {1}")]
    Context(ErrString, Box<KdioError>),
    /// A wrapper for IO errors.
    #[error(transparent)]
    IOError(#[from] io::Error),
    /// A wrapper for JSON (de)serialization errors.
    #[error(transparent)]
    JSONError(#[from] serde_json::Error),
}

impl KdioError {
    /// Adds additional context to an error.
    pub fn with_context<T: Into<ErrString>>(self, msg: T) -> Self {
        KdioError::Context(msg.into(), Box::new(self))
    }
}

impl Debug for KdioError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

/// A type alias for Results that return KdioErrors as their error type.
pub type KdioResult<T> = Result<T, KdioError>;

/// A convenient macro for creating a KdioError.
#[macro_export]
macro_rules! kdio_err {
    (InconsistentSize: $path:expr, $coordinates:expr, $values:expr $(,)?) => {{
        $crate::__private::must_use($crate::KdioError::InconsistentSize(
            $path.to_string().into(),
            $coordinates,
            $values,
            $crate::ErrBacktrace::capture(),
        ))
    }};
    (DataShape: $path:expr, $expected:expr, $actual:expr $(,)?) => {{
        $crate::__private::must_use($crate::KdioError::DataShape(
            $path.to_string().into(),
            $expected,
            $actual,
            $crate::ErrBacktrace::capture(),
        ))
    }};
    (UnsupportedVersion: $key:expr, $found:expr, $supported:expr $(,)?) => {{
        $crate::__private::must_use($crate::KdioError::UnsupportedVersion(
            $key.to_string().into(),
            $found.to_string().into(),
            $supported.to_string().into(),
            $crate::ErrBacktrace::capture(),
        ))
    }};
    (ValueWrite: $path:expr, $err:expr $(,)?) => {
        $crate::__private::must_use($crate::KdioError::ValueWrite(
            $path.to_string().into(),
            Box::new($err),
        ))
    };
    (ValueRead: $path:expr, $err:expr $(,)?) => {
        $crate::__private::must_use($crate::KdioError::ValueRead(
            $path.to_string().into(),
            Box::new($err),
        ))
    };
    (Context: $msg:literal, $err:expr $(,)?) => {
        $crate::__private::must_use($crate::KdioError::Context($msg.into(), Box::new($err)))
    };
    ($variant:ident: $fmt:literal $(, $arg:expr)* $(,)?) => {{
        $crate::__private::must_use($crate::KdioError::$variant(
            format!($fmt, $($arg),*).into(),
            $crate::ErrBacktrace::capture(),
        ))
    }};
    ($variant:ident: $err:expr $(,)?) => {
        $crate::__private::must_use($crate::KdioError::$variant($err))
    };
    ($fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::kdio_err!(InvalidArgument: $fmt, $($arg),*)
    };
}

/// A convenient macro for returning a KdioError.
#[macro_export]
macro_rules! kdio_bail {
    ($($tt:tt)+) => {
        return Err($crate::kdio_err!($($tt)+))
    };
}

#[doc(hidden)]
pub mod __private {
    use crate::KdioError;

    #[doc(hidden)]
    #[inline]
    #[cold]
    #[must_use]
    pub const fn must_use(x: KdioError) -> KdioError {
        x
    }
}
