//! Modpack Converter Library
//!
//! This library turns a Modrinth modpack (`.mrpack`) into a plain zip
//! archive holding the actual game files. Bundled overrides are copied in
//! with their prefix removed, files hosted on the trusted CDN are downloaded
//! and placed at their manifest path, and anything hosted elsewhere is handed
//! to the user for manual download.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use converter::{ConvertConfig, Converter, ProgressEvent};
//! use std::sync::Arc;
//!
//! # async fn example() -> converter::Result<()> {
//! let converter = Converter::new(ConvertConfig::default())?;
//!
//! let progress_callback = Arc::new(|event: ProgressEvent| {
//!     match event {
//!         ProgressEvent::Percent { percent } => println!("Downloading files: {}%", percent),
//!         ProgressEvent::FileDeferred { path, url } => {
//!             println!("Download {} yourself from {}", path, url);
//!         }
//!         _ => {}
//!     }
//! });
//!
//! let pack = converter
//!     .convert_from_catalog_url(
//!         "https://modrinth.com/modpack/fabulously-optimized",
//!         Some(progress_callback),
//!     )
//!     .await?;
//!
//! let saved = pack.save_to(".").await?;
//! println!("Saved {} ({} files placed)", saved.display(), pack.report.files_placed);
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Catalog URLs**: project pages resolve to their latest version, version pages to that version
//! - **Lenient manifests**: invalid entries are skipped with a warning instead of failing the pack
//! - **Host trust**: only files on the trusted CDN are fetched automatically
//! - **Partial failure tolerance**: failed downloads are reported, never fatal
//! - **Progress tracking**: byte-weighted percentage plus per-file events
//! - **Deterministic output**: entries are written sorted with a fixed timestamp

pub mod archive;
pub mod catalog;
pub mod config;
pub mod convert;
pub mod error;
pub mod export;
pub mod http;
pub mod manifest;
pub mod notifier;
pub mod overrides;
pub mod progress;
pub mod resolver;

// Re-export commonly used types for convenience
pub use archive::{ArchiveEntry, OutputArchive, SourceArchive};
pub use catalog::{CatalogClient, CatalogUrl, ResolvedAsset};
pub use config::{ConvertConfig, ConvertConfigBuilder};
pub use convert::{ConversionReport, ConvertedPack, Converter, DeferredFile};
pub use error::{ConvertError, ErrorSeverity, FetchError, FileOperation, Result};
pub use export::sanitize_filename;
pub use http::{AssetFetcher, FetchedAsset, HttpFetcher};
pub use manifest::{Manifest, ManifestFile};
pub use notifier::{LogNotifier, UserNotifier};
pub use progress::{
    percent_callback, ConsoleProgressReporter, IntoProgressCallback, NullProgressReporter,
    ProgressCallback, ProgressEvent, ProgressReporter, ProgressState,
};
pub use resolver::{FileOutcome, FileResolver, HostPolicy};
