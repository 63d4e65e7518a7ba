//! Centralized error handling for churnflow.
//!
//! Every fallible library operation returns [`Result<T>`], whose error type is
//! the [`ChurnError`] enum. The variants follow the failure taxonomy of a
//! pipeline run:
//!
//! - I/O problems (missing or unreadable source files, bad output paths)
//! - data-shape problems (a transformation references an absent column)
//! - extraction and network failures
//! - configuration and export failures
//!
//! Validation failures are *not* errors: they are accumulated into a
//! [`crate::etl::ValidationReport`] and the caller decides what to do.
//!
//! ```
//! use churnflow::error::ChurnError;
//!
//! fn describe(err: &ChurnError) -> &'static str {
//!     match err {
//!         ChurnError::NotFound(_) => "missing input",
//!         ChurnError::MissingColumn(_) => "bad column reference",
//!         _ => "other",
//!     }
//! }
//! ```
//!
//! The `ResultExt` trait adds `.context()` to any result whose error converts
//! into [`ChurnError`]:
//!
//! ```no_run
//! use churnflow::error::ResultExt as _;
//!
//! fn load() -> churnflow::error::Result<String> {
//!     std::fs::read_to_string("data/raw/customers.csv").context("Failed to read customers")
//! }
//! ```

use std::fmt;
use std::path::PathBuf;

/// Main error type for churnflow operations.
#[derive(Debug)]
pub enum ChurnError {
    /// Filesystem failure other than a missing source
    Io(std::io::Error),

    /// Source file does not exist
    NotFound(PathBuf),

    /// Source file exists but could not be decoded
    Decode(String),

    /// Data-frame engine errors
    DataProcessing(String),

    /// A transformation or check referenced a column the dataset does not have
    MissingColumn(String),

    /// Extraction from a source failed
    Extraction(String),

    /// Transport-level HTTP failure
    Network(String),

    /// Analysis (statistics / clustering) failure
    Analysis(String),

    /// Unreadable or malformed run configuration
    Config(String),

    /// Writing an output artefact failed
    Export(String),

    /// Anything else, usually a message prefixed by [`ResultExt`]
    Other(String),
}

impl fmt::Display for ChurnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::NotFound(path) => write!(f, "File not found: {}", path.display()),
            Self::Decode(msg) => write!(f, "Decoding error: {msg}"),
            Self::DataProcessing(msg) => write!(f, "Data processing error: {msg}"),
            Self::MissingColumn(name) => write!(f, "Column '{name}' not found in dataset"),
            Self::Extraction(msg) => write!(f, "Extraction failed: {msg}"),
            Self::Network(msg) => write!(f, "Network error: {msg}"),
            Self::Analysis(msg) => write!(f, "Analysis error: {msg}"),
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
            Self::Export(msg) => write!(f, "Export error: {msg}"),
            Self::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for ChurnError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ChurnError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<anyhow::Error> for ChurnError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<serde_json::Error> for ChurnError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(format!("JSON error: {err}"))
    }
}

impl From<polars::error::PolarsError> for ChurnError {
    fn from(err: polars::error::PolarsError) -> Self {
        match err {
            polars::error::PolarsError::ColumnNotFound(name) => {
                Self::MissingColumn(name.to_string())
            }
            other => Self::DataProcessing(other.to_string()),
        }
    }
}

impl From<calamine::Error> for ChurnError {
    fn from(err: calamine::Error) -> Self {
        Self::Decode(format!("Excel: {err}"))
    }
}

impl From<rust_xlsxwriter::XlsxError> for ChurnError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        Self::Export(format!("Excel: {err}"))
    }
}

impl From<reqwest::Error> for ChurnError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

impl From<linfa_clustering::KMeansError> for ChurnError {
    fn from(err: linfa_clustering::KMeansError) -> Self {
        Self::Analysis(format!("k-means: {err}"))
    }
}

impl From<ChurnError> for String {
    fn from(err: ChurnError) -> Self {
        err.to_string()
    }
}

/// Result type alias for churnflow operations.
pub type Result<T> = std::result::Result<T, ChurnError>;

/// Prefixes failures with a description of what was being attempted.
///
/// The wrapped error keeps its own message after the prefix, so
/// `read_csv(path).context("Loading customers")` reads as
/// `Loading customers: I/O error: ...`.
pub trait ResultExt<T> {
    fn context(self, what: impl Into<String>) -> Result<T>;

    /// Like [`ResultExt::context`], building the prefix only on failure.
    fn with_context<F>(self, what: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

fn prefixed(what: &str, err: impl Into<ChurnError>) -> ChurnError {
    ChurnError::Other(format!("{what}: {}", err.into()))
}

impl<T, E: Into<ChurnError>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, what: impl Into<String>) -> Result<T> {
        self.map_err(|e| prefixed(&what.into(), e))
    }

    fn with_context<F>(self, what: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| prefixed(&what(), e))
    }
}
