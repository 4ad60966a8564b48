//! Saving converted packs to disk

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::convert::ConvertedPack;
use crate::error::{ConvertError, FileOperation, Result};

const RESERVED: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Replace path separators, reserved and control characters with `_`
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| if RESERVED.contains(&c) || c.is_control() { '_' } else { c })
        .collect();
    let trimmed = sanitized.trim();
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '.') {
        "_".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Temporary path a file is written to before being moved into place
pub fn create_temp_path(dest_path: &Path) -> PathBuf {
    dest_path.with_extension("part")
}

impl ConvertedPack {
    /// Write the archive into `dir` under its sanitized filename
    pub async fn save_to<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf> {
        let dest = dir.as_ref().join(sanitize_filename(&self.filename));
        self.save_as(&dest).await?;
        Ok(dest)
    }

    /// Write the archive to exactly `path`, creating parent directories
    pub async fn save_as<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let dest = path.as_ref();
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|source| ConvertError::FileSystem {
                path: parent.to_path_buf(),
                operation: FileOperation::CreateDir,
                source,
            })?;
        }

        let temp_path = create_temp_path(dest);
        fs::write(&temp_path, &self.content).await.map_err(|source| ConvertError::FileSystem {
            path: temp_path.clone(),
            operation: FileOperation::Write,
            source,
        })?;

        atomic_rename(&temp_path, dest).await?;
        info!("Saved {} ({} bytes)", dest.display(), self.content.len());
        Ok(())
    }
}

/// Move a finished temporary file to its final destination
async fn atomic_rename(temp_path: &Path, dest_path: &Path) -> Result<()> {
    if let Err(source) = fs::rename(temp_path, dest_path).await {
        let _ = fs::remove_file(temp_path).await;
        return Err(ConvertError::FileSystem {
            path: dest_path.to_path_buf(),
            operation: FileOperation::Move,
            source,
        });
    }
    debug!("Renamed {} to {}", temp_path.display(), dest_path.display());
    Ok(())
}
