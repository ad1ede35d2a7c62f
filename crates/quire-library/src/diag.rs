//! Diagnostics.

use std::fmt::{self, Display, Formatter};

use ecow::EcoString;

/// Early-return with a [`LayoutError`] of kind `Invalid`.
///
/// ```ignore
/// bail!("bailing with a {}", "formatted message");
/// ```
#[macro_export]
#[doc(hidden)]
macro_rules! __bail {
    ($fmt:literal $(, $arg:expr)* $(,)?) => {
        return Err($crate::diag::error!($fmt $(, $arg)*))
    };

    ($error:expr) => {
        return Err($error)
    };
}

/// Construct a [`LayoutError`] of kind `Invalid`.
#[macro_export]
#[doc(hidden)]
macro_rules! __error {
    ($fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::diag::LayoutError::invalid($crate::diag::eco_format!($fmt, $($arg),*))
    };
}

#[rustfmt::skip]
#[doc(inline)]
pub use {
    crate::__bail as bail,
    crate::__error as error,
    ecow::eco_format,
};

/// The result type for everything that lays out.
pub type LayoutResult<T> = Result<T, LayoutError>;

/// A fatal layout failure.
///
/// Running out of space is not an error; cursors report that through
/// [`Layouted::DoesNotFit`](crate::protocol::Layouted). An error of kind
/// [`DoesNotFit`](ErrorKind::DoesNotFit) exists only at the job level, when
/// the root cursor refuses an entire page.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct LayoutError {
    /// Which failure class this is.
    pub kind: ErrorKind,
    /// A human-readable description.
    pub message: EcoString,
}

/// The class of a [`LayoutError`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    /// A caller broke the layout contract (negative area, oversized
    /// fragment, malformed grid structure).
    Invalid,
    /// The document cannot be paginated into the given page size.
    DoesNotFit,
}

impl LayoutError {
    /// Create a contract-violation error.
    pub fn invalid(message: impl Into<EcoString>) -> Self {
        Self { kind: ErrorKind::Invalid, message: message.into() }
    }

    /// Create a job-level "does not fit" error.
    pub fn does_not_fit(message: impl Into<EcoString>) -> Self {
        Self { kind: ErrorKind::DoesNotFit, message: message.into() }
    }
}

impl Display for LayoutError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self.kind {
            ErrorKind::Invalid => write!(f, "invalid layout: {}", self.message),
            ErrorKind::DoesNotFit => write!(f, "does not fit: {}", self.message),
        }
    }
}

impl std::error::Error for LayoutError {}
