use std::path::PathBuf;
use std::{error, fmt, io, result};

use crate::table::Mode;

/// The specific type of an error.
#[derive(Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Wrap a [std::io::Error].
    Io(io::Error),

    /// Wrap an error emitted by the underlying CSV tokenizer.
    Csv(csv::Error),

    /// Indicate that a source path could not be opened for reading.
    Open {
        /// Path of the offending source
        path: PathBuf,
        /// Underlying io error
        err: io::Error,
    },

    /// Indicate that a destination path could not be opened for writing.
    Sink {
        /// Path of the offending destination
        path: PathBuf,
        /// Underlying io error
        err: io::Error,
    },

    /// Indicate that a write-once piece of state (header, delimiter) was
    /// mutated after being locked.
    AlreadySet {
        /// What was mutated
        what: &'static str,
    },

    /// Indicate that an operation requiring a header ran before one was
    /// established.
    HeaderNotSet {
        /// The operation that required the header
        operation: &'static str,
    },

    /// Indicate that a header contained non-unique column names.
    DuplicateHeader {
        /// Every duplicated name, listed once
        names: Vec<String>,
    },

    /// Indicate that an alias collides with a real header column name.
    InvalidAlias {
        /// Every colliding alias, listed once
        aliases: Vec<String>,
    },

    /// Indicate a write to a column name that does not resolve.
    ColumnNotFound {
        /// The unresolved name
        name: String,
    },

    /// Indicate an integer-index access beyond the current cell count.
    IndexOutOfRange {
        /// Desired index
        index: usize,
        /// Cell count of the record
        len: usize,
    },

    /// Indicate that a strict-mode record's cell count disagrees with the
    /// header length.
    ArityMismatch {
        /// Expected number of cells
        expected: usize,
        /// Actual and incorrect number of cells observed
        len: usize,
        /// Originating source path, if known
        source: Option<PathBuf>,
    },

    /// Indicate that a table has no source file behind it.
    NoSource,

    /// Indicate that an operation was invoked while the table is in an
    /// incompatible iteration mode.
    UnsupportedInMode {
        /// The offending operation
        operation: &'static str,
        /// The table's current mode
        mode: Mode,
    },
}

/// An error occurring when reading/writing tabular CSV data.
#[derive(Debug)]
pub struct Error(ErrorKind);

impl Error {
    pub(crate) fn new(kind: ErrorKind) -> Self {
        Self(kind)
    }

    /// Return whether the wrapped error is a [`std::io::Error`].
    pub fn is_io_error(&self) -> bool {
        matches!(self.0, ErrorKind::Io(_))
    }

    /// Return a reference to the underlying [`ErrorKind`].
    pub fn kind(&self) -> &ErrorKind {
        &self.0
    }

    /// Unwraps the error into its underlying [`ErrorKind`].
    pub fn into_kind(self) -> ErrorKind {
        self.0
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self(ErrorKind::Io(err))
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Self(ErrorKind::Csv(err))
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        Self::new(io::ErrorKind::Other, err)
    }
}

impl error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.0 {
            ErrorKind::Io(err) => err.fmt(f),
            ErrorKind::Csv(err) => err.fmt(f),
            ErrorKind::Open { path, err } => {
                write!(f, "could not open {} for reading: {}", path.display(), err)
            }
            ErrorKind::Sink { path, err } => {
                write!(f, "could not open {} for writing: {}", path.display(), err)
            }
            ErrorKind::AlreadySet { what } => {
                write!(f, "{} has already been set", what)
            }
            ErrorKind::HeaderNotSet { operation } => {
                write!(f, "header must be set before {}", operation)
            }
            ErrorKind::DuplicateHeader { names } => {
                write!(f, "duplicate header names: {}", names.join(", "))
            }
            ErrorKind::InvalidAlias { aliases } => {
                write!(
                    f,
                    "invalid alias name(s) (alias is an existing header name): {}",
                    aliases.join(", ")
                )
            }
            ErrorKind::ColumnNotFound { name } => {
                write!(f, "column {} not found", name)
            }
            ErrorKind::IndexOutOfRange { index, len } => {
                write!(
                    f,
                    "index {} is out of bounds for a record of {} cell(s)",
                    index, len
                )
            }
            ErrorKind::ArityMismatch {
                expected,
                len,
                source: Some(path),
            } => write!(
                f,
                "expected {} data entry(s), received {} (file: {})",
                expected,
                len,
                path.display()
            ),
            ErrorKind::ArityMismatch {
                expected,
                len,
                source: None,
            } => write!(
                f,
                "expected {} data entry(s), received {} (no file set)",
                expected, len
            ),
            ErrorKind::NoSource => {
                write!(f, "table has no source file")
            }
            ErrorKind::UnsupportedInMode { operation, mode } => {
                write!(f, "{} is not supported in {} mode", operation, mode)
            }
        }
    }
}

/// A type alias for `Result<T, csv_table::Error>`.
pub type Result<T> = result::Result<T, Error>;
