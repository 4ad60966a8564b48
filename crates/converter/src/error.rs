//! Error types for the conversion pipeline with context and recovery information

use std::error::Error;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors: any of these aborts the whole conversion
#[derive(Error, Debug)]
pub enum ConvertError {
    /// Catalog URL did not match `<host>/(modpack|project)/<id>[/version/<id>]`
    #[error("Invalid catalog URL '{url}': use a project or version page URL")]
    InvalidUrlFormat {
        url: String,
    },

    /// A specific version could not be fetched or has no files
    #[error("Version '{version}' of project '{project}' not found: {reason}")]
    VersionNotFound {
        project: String,
        version: String,
        reason: String,
    },

    /// The project version list could not be fetched or is empty
    #[error("No versions found for project '{project}': {reason}")]
    NoVersionsFound {
        project: String,
        reason: String,
    },

    /// The chosen version carries no primary pack file
    #[error("Could not find a primary {extension} file for project '{project}'")]
    NoPrimaryAsset {
        project: String,
        extension: String,
    },

    /// The resolved asset URL is not an http(s) URL
    #[error("Invalid download URL provided: '{url}'")]
    InvalidDownloadUrl {
        url: String,
    },

    /// The pack archive itself could not be downloaded
    #[error("Failed to download pack from '{url}': {reason}")]
    DownloadFailed {
        url: String,
        reason: String,
    },

    /// Zero-length input
    #[error("Invalid or empty pack data")]
    EmptyInput,

    /// Input is not a readable zip container
    #[error("Failed to read '{name}' as a zip archive (is it a valid .mrpack file?)")]
    CorruptArchive {
        name: String,
        #[source]
        source: zip::result::ZipError,
    },

    /// The index file is absent from the archive
    #[error("Missing '{manifest}' in '{name}'")]
    MissingManifest {
        name: String,
        manifest: String,
    },

    /// The index file is not valid JSON or lacks the `files` list
    #[error("Malformed '{manifest}': {reason}")]
    MalformedManifest {
        manifest: String,
        reason: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// An entry of the source archive could not be decompressed
    #[error("Failed to read archive entry '{entry}'")]
    ArchiveRead {
        entry: String,
        #[source]
        source: zip::result::ZipError,
    },

    /// The output archive could not be serialized
    #[error("Failed to write output archive entry '{entry}'")]
    ArchiveWrite {
        entry: String,
        #[source]
        source: zip::result::ZipError,
    },

    /// The HTTP client could not be constructed
    #[error("Failed to create HTTP client")]
    HttpClient {
        #[source]
        source: reqwest::Error,
    },

    /// File system I/O errors with file context
    #[error("File operation failed on '{path}' while {operation}")]
    FileSystem {
        path: PathBuf,
        operation: FileOperation,
        #[source]
        source: std::io::Error,
    },

    /// Configuration errors
    #[error("Invalid configuration: {message}")]
    Configuration {
        message: String,
        field: Option<String>,
        suggestion: Option<String>,
    },

    /// A blocking worker task panicked or was cancelled
    #[error("Background task failed while {context}")]
    TaskFailed {
        context: String,
        #[source]
        source: tokio::task::JoinError,
    },
}

/// Types of file operations for error context
#[derive(Debug, Clone, PartialEq)]
pub enum FileOperation {
    Write,
    Move,
    CreateDir,
}

impl std::fmt::Display for FileOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileOperation::Write => write!(f, "writing"),
            FileOperation::Move => write!(f, "moving"),
            FileOperation::CreateDir => write!(f, "creating directory"),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;

impl ConvertError {
    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            ConvertError::InvalidUrlFormat { .. } => "invalid_url_format",
            ConvertError::VersionNotFound { .. } => "version_not_found",
            ConvertError::NoVersionsFound { .. } => "no_versions_found",
            ConvertError::NoPrimaryAsset { .. } => "no_primary_asset",
            ConvertError::InvalidDownloadUrl { .. } => "invalid_download_url",
            ConvertError::DownloadFailed { .. } => "download_failed",
            ConvertError::EmptyInput => "empty_input",
            ConvertError::CorruptArchive { .. } => "corrupt_archive",
            ConvertError::MissingManifest { .. } => "missing_manifest",
            ConvertError::MalformedManifest { .. } => "malformed_manifest",
            ConvertError::ArchiveRead { .. } => "archive_read",
            ConvertError::ArchiveWrite { .. } => "archive_write",
            ConvertError::HttpClient { .. } => "http_client",
            ConvertError::FileSystem { .. } => "file_system",
            ConvertError::Configuration { .. } => "configuration",
            ConvertError::TaskFailed { .. } => "task_failed",
        }
    }

    /// Get severity level for error prioritization
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ConvertError::InvalidUrlFormat { .. } => ErrorSeverity::Low,
            ConvertError::VersionNotFound { .. } => ErrorSeverity::Medium,
            ConvertError::NoVersionsFound { .. } => ErrorSeverity::Medium,
            ConvertError::NoPrimaryAsset { .. } => ErrorSeverity::Medium,
            ConvertError::InvalidDownloadUrl { .. } => ErrorSeverity::Medium,
            ConvertError::DownloadFailed { .. } => ErrorSeverity::Medium,
            ConvertError::EmptyInput => ErrorSeverity::Low,
            ConvertError::CorruptArchive { .. } => ErrorSeverity::High,
            ConvertError::MissingManifest { .. } => ErrorSeverity::High,
            ConvertError::MalformedManifest { .. } => ErrorSeverity::High,
            ConvertError::ArchiveRead { .. } => ErrorSeverity::High,
            ConvertError::ArchiveWrite { .. } => ErrorSeverity::Critical,
            ConvertError::HttpClient { .. } => ErrorSeverity::Critical,
            ConvertError::FileSystem { .. } => ErrorSeverity::High,
            ConvertError::Configuration { .. } => ErrorSeverity::High,
            ConvertError::TaskFailed { .. } => ErrorSeverity::Critical,
        }
    }

    /// Get user-friendly suggestion for resolving the error
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            ConvertError::InvalidUrlFormat { .. } => {
                Some("Use a URL like https://modrinth.com/modpack/<slug> or .../version/<version>")
            }
            ConvertError::NoPrimaryAsset { .. } => {
                Some("Pick a specific version page that ships a .mrpack file")
            }
            ConvertError::EmptyInput | ConvertError::CorruptArchive { .. } => {
                Some("Check that the input is a complete .mrpack file")
            }
            ConvertError::MissingManifest { .. } | ConvertError::MalformedManifest { .. } => {
                Some("The pack was not exported correctly; re-download or re-export it")
            }
            ConvertError::Configuration { suggestion, .. } => suggestion.as_deref(),
            _ => None,
        }
    }

    /// Create a detailed error report for debugging
    pub fn detailed_report(&self) -> String {
        let mut report = format!("Error: {}\n", self);
        report.push_str(&format!("Category: {}\n", self.category()));
        report.push_str(&format!("Severity: {:?}\n", self.severity()));

        if let Some(suggestion) = self.suggestion() {
            report.push_str(&format!("Suggestion: {}\n", suggestion));
        }

        if let Some(source) = self.source() {
            report.push_str(&format!("Root cause: {}\n", source));
        }

        report
    }
}

/// Error severity levels for prioritization
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// Per-file fetch failure; logged and reported, never propagated
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to '{url}' failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error from '{url}': status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failing_resource() {
        let err = ConvertError::VersionNotFound {
            project: "fabulously-optimized".to_string(),
            version: "6.1.0".to_string(),
            reason: "status 404".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("fabulously-optimized"));
        assert!(message.contains("6.1.0"));

        let err = ConvertError::MissingManifest {
            name: "pack.mrpack".to_string(),
            manifest: "modrinth.index.json".to_string(),
        };
        assert_eq!(err.to_string(), "Missing 'modrinth.index.json' in 'pack.mrpack'");
    }

    #[test]
    fn detailed_report_includes_category_and_suggestion() {
        let report = ConvertError::EmptyInput.detailed_report();
        assert!(report.contains("Category: empty_input"));
        assert!(report.contains("Suggestion:"));
    }

    #[test]
    fn severity_ordering() {
        assert!(ErrorSeverity::Critical > ErrorSeverity::High);
        assert!(ConvertError::EmptyInput.severity() < ErrorSeverity::High);
    }
}
