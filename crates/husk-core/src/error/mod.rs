//! Error types and result aliases for Husk operations.
//!
//! Provides a unified error type covering every failure the installer can hit,
//! together with the classification the install pipeline uses to decide whether
//! a failure aborts the run or only excludes one package.

use thiserror::Error;

/// Unified error type for all Husk operations
#[derive(Error, Debug)]
pub enum HuskError {
    // Config errors
    #[error("Failed to parse {file}: {message}")]
    TomlParse { file: String, message: String },

    #[error("Failed to parse package.json: {message}")]
    JsonParse { message: String },

    #[error("No package.json found at {path}")]
    ManifestNotFound { path: String },

    #[error("Configuration field '{field}' is invalid: {reason}")]
    ConfigValidation { field: String, reason: String },

    // Registry errors
    #[error("Package '{name}' not found in registry")]
    PackageNotFound { name: String },

    #[error("Registry returned status {status} for '{name}'")]
    RegistryStatus { name: String, status: u16 },

    #[error("Too many redirects (more than {limit}) while fetching {url}")]
    TooManyRedirects { url: String, limit: usize },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // Resolution errors
    #[error("No version of '{name}' satisfies '{range}'")]
    NoMatchingVersion { name: String, range: String },

    #[error("Unsupported version range '{range}' for '{name}'")]
    UnsupportedRange { name: String, range: String },

    #[error("Dependency depth limit of {limit} exceeded while resolving '{package}'")]
    DepthLimitExceeded { package: String, limit: usize },

    #[error("Lockfile is out of date: {reason}")]
    LockfileOutOfDate { reason: String },

    // Cache errors
    #[error("Integrity check failed for {package}: expected {expected}, got {actual}")]
    IntegrityFailure {
        package: String,
        expected: String,
        actual: String,
    },

    #[error("Failed to extract {package}: {message}")]
    Extraction { package: String, message: String },

    // IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for Husk operations
pub type HuskResult<T> = Result<T, HuskError>;

impl HuskError {
    /// Create a network error from any error type
    pub fn network<E>(message: String, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Network {
            message,
            source: Some(Box::new(source)),
        }
    }

    /// Create an IO error from std::io::Error
    pub fn io(message: String, source: std::io::Error) -> Self {
        Self::Io { message, source }
    }

    /// Transport-level failures worth retrying
    pub fn is_recoverable(&self) -> bool {
        matches!(self, HuskError::Network { .. })
    }

    /// Failures that exclude a single package but never abort an install
    pub fn is_per_package(&self) -> bool {
        matches!(
            self,
            HuskError::PackageNotFound { .. }
                | HuskError::RegistryStatus { .. }
                | HuskError::TooManyRedirects { .. }
                | HuskError::Network { .. }
                | HuskError::NoMatchingVersion { .. }
                | HuskError::UnsupportedRange { .. }
                | HuskError::IntegrityFailure { .. }
                | HuskError::Extraction { .. }
        )
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            HuskError::PackageNotFound { .. } => {
                Some("Check the package name spelling or try searching the registry")
            },
            HuskError::Network { .. } => Some("Check your internet connection and try again"),
            HuskError::ManifestNotFound { .. } => {
                Some("Run husk from a directory containing a package.json")
            },
            HuskError::DepthLimitExceeded { .. } => {
                Some("The registry metadata may contain a dependency cycle; inspect the chain with --verbose")
            },
            HuskError::LockfileOutOfDate { .. } => {
                Some("Run 'husk install' without --frozen to refresh husk-lock.json")
            },
            HuskError::NoMatchingVersion { .. } => {
                Some("Loosen the version range or check the published versions")
            },
            _ => None,
        }
    }
}
