//! Override extraction
//!
//! Files bundled under an override directory are copied into the output at
//! their path relative to that directory.

use bytes::Bytes;
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info};

use crate::archive::SourceArchive;
use crate::error::Result;
use crate::progress::{emit, ProgressCallback, ProgressEvent};

/// A bundled file ready to be placed in the output
#[derive(Debug, Clone, PartialEq)]
pub struct OverrideFile {
    /// Entry name inside the source archive
    pub source: String,
    /// Output path with the prefix removed
    pub path: String,
    pub bytes: Bytes,
}

/// Strip the first matching prefix; `None` if no prefix matches or nothing remains
pub fn strip_override_prefix<'a>(name: &'a str, prefixes: &[String]) -> Option<(usize, &'a str)> {
    prefixes
        .iter()
        .enumerate()
        .find_map(|(rank, prefix)| name.strip_prefix(prefix.as_str()).map(|rest| (rank, rest)))
        .filter(|(_, rest)| !rest.is_empty())
}

/// Read every override entry of `archive`, at most `concurrency` at a time
///
/// The result is ordered by prefix rank, then archive order, so inserting it
/// in sequence lets later prefixes (`client-overrides/`) replace earlier ones.
pub async fn extract_overrides(
    archive: &SourceArchive,
    prefixes: &[String],
    concurrency: usize,
    progress_callback: &Option<ProgressCallback>,
) -> Result<Vec<OverrideFile>> {
    let mut candidates: Vec<_> = archive
        .entries()
        .filter(|entry| !entry.is_directory())
        .filter_map(|entry| {
            strip_override_prefix(entry.name(), prefixes)
                .map(|(rank, path)| (rank, entry, path.to_string()))
        })
        .collect();
    candidates.sort_by_key(|(rank, _, _)| *rank);

    info!("Copying {} override files", candidates.len());

    let files: Vec<OverrideFile> = stream::iter(candidates)
        .map(|(_, entry, path)| async move {
            let bytes = entry.bytes().await?;
            debug!("Override {} -> {} ({} bytes)", entry.name(), path, bytes.len());
            emit(progress_callback, ProgressEvent::OverrideCopied {
                path: path.clone(),
                size: bytes.len() as u64,
            });
            Ok::<_, crate::error::ConvertError>(OverrideFile {
                source: entry.name().to_string(),
                path,
                bytes,
            })
        })
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;

    Ok(files)
}
