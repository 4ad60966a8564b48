//! Pack index (`modrinth.index.json`) parser
//!
//! Parsing is lenient: only invalid JSON or a missing `files` list is
//! fatal. Missing or oddly typed metadata produces warnings, and file entries
//! that cannot be used are collected as skipped instead of failing the parse.

use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::archive::SourceArchive;
use crate::error::{ConvertError, Result};

/// Top-level keys a well-formed index is expected to carry
pub const EXPECTED_KEYS: [&str; 6] =
    ["files", "formatVersion", "game", "versionId", "name", "dependencies"];

/// Raw file entry; every field optional so bad entries can be skipped individually
///
/// `hashes` and `env` stay untyped here: a malformed value there drops the
/// metadata, not the file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFile {
    path: Option<String>,
    downloads: Option<Vec<String>>,
    file_size: Option<u64>,
    hashes: Option<serde_json::Value>,
    env: Option<serde_json::Value>,
}

/// Client/server support flags of a file entry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileEnv {
    pub client: Option<String>,
    pub server: Option<String>,
}

/// A usable remote file entry
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestFile {
    /// Archive-relative destination path
    pub path: String,
    /// Candidate URLs, in order; never empty
    pub downloads: Vec<String>,
    /// Declared size in bytes; never zero
    pub file_size: u64,
    pub hashes: BTreeMap<String, String>,
    pub env: Option<FileEnv>,
}

impl ManifestFile {
    pub fn primary_url(&self) -> &str {
        &self.downloads[0]
    }
}

/// A file entry that was ignored, with the reason
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedEntry {
    pub index: usize,
    pub reason: String,
}

/// Parsed pack index
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    pub format_version: Option<u32>,
    pub game: Option<String>,
    pub version_id: Option<String>,
    pub name: Option<String>,
    pub summary: Option<String>,
    pub dependencies: BTreeMap<String, String>,
    /// Valid file entries, in manifest order
    pub files: Vec<ManifestFile>,
    pub skipped: Vec<SkippedEntry>,
    /// Expected top-level keys that were absent
    pub missing_keys: Vec<&'static str>,
}

impl Manifest {
    /// Parse index bytes; `manifest_name` is only used in error messages
    pub fn from_slice(bytes: &[u8], manifest_name: &str) -> Result<Self> {
        let malformed = |reason: String, source: Option<serde_json::Error>| {
            ConvertError::MalformedManifest {
                manifest: manifest_name.to_string(),
                reason,
                source,
            }
        };

        let value: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|e| malformed(e.to_string(), Some(e)))?;
        let mut root = match value {
            serde_json::Value::Object(map) => map,
            other => return Err(malformed(format!("expected a JSON object, got {}", other), None)),
        };

        let missing_keys: Vec<&'static str> = EXPECTED_KEYS
            .into_iter()
            .filter(|key| root.get(*key).is_none_or(serde_json::Value::is_null))
            .collect();
        if !missing_keys.is_empty() {
            warn!("Manifest might be missing some standard fields: {}", missing_keys.join(", "));
        }

        let raw_files = match root.remove("files") {
            Some(serde_json::Value::Array(files)) => files,
            Some(serde_json::Value::Null) | None => {
                return Err(malformed("no 'files' list".to_string(), None));
            }
            Some(other) => {
                return Err(malformed(format!("'files' is not a list: {}", other), None));
            }
        };

        let mut files = Vec::with_capacity(raw_files.len());
        let mut skipped = Vec::new();

        for (index, value) in raw_files.into_iter().enumerate() {
            match validate_file(value) {
                Ok(file) => files.push(file),
                Err(reason) => {
                    warn!("Skipping manifest file #{} due to missing data: {}", index, reason);
                    skipped.push(SkippedEntry { index, reason });
                }
            }
        }

        debug!("Parsed manifest: {} valid files, {} skipped", files.len(), skipped.len());

        Ok(Self {
            format_version: root.get("formatVersion").and_then(format_version),
            game: string_field(&root, "game"),
            version_id: string_field(&root, "versionId"),
            name: string_field(&root, "name"),
            summary: string_field(&root, "summary"),
            dependencies: root.get("dependencies").map(dependency_map).unwrap_or_default(),
            files,
            skipped,
            missing_keys,
        })
    }

    /// Sum of declared sizes of all valid files
    pub fn total_declared_size(&self) -> u64 {
        self.files.iter().map(|f| f.file_size).sum()
    }

    /// `<name>-<versionId>.zip` when the manifest names the pack
    pub fn archive_filename(&self) -> Option<String> {
        let name = self.name.as_deref().filter(|n| !n.trim().is_empty())?;
        Some(match self.version_id.as_deref().filter(|v| !v.is_empty()) {
            Some(version) => format!("{}-{}.zip", name, version),
            None => format!("{}.zip", name),
        })
    }
}

/// Locate and parse the index entry of an opened pack
pub async fn read_manifest(archive: &SourceArchive, manifest_name: &str) -> Result<Manifest> {
    let entry = archive.entry_by_name(manifest_name).ok_or_else(|| ConvertError::MissingManifest {
        name: archive.name().to_string(),
        manifest: manifest_name.to_string(),
    })?;

    let bytes = entry.bytes().await?;
    Manifest::from_slice(&bytes, manifest_name)
}

fn validate_file(value: serde_json::Value) -> std::result::Result<ManifestFile, String> {
    let raw: RawFile =
        serde_json::from_value(value).map_err(|e| format!("unreadable entry: {}", e))?;

    let path = raw.path.filter(|p| !p.is_empty()).ok_or("missing 'path'")?;
    let downloads = raw.downloads
        .filter(|d| d.first().is_some_and(|url| !url.is_empty()))
        .ok_or_else(|| format!("'{}' has no 'downloads'", path))?;
    let file_size = raw.file_size
        .filter(|size| *size > 0)
        .ok_or_else(|| format!("'{}' has no 'fileSize'", path))?;

    if !is_contained_path(&path) {
        return Err(format!("'{}' escapes the output directory", path));
    }

    Ok(ManifestFile {
        hashes: lenient(raw.hashes, &path, "hashes").unwrap_or_default(),
        env: lenient(raw.env, &path, "env"),
        path,
        downloads,
        file_size,
    })
}

/// Deserialize optional metadata, dropping it with a warning when it has the wrong shape
fn lenient<T: serde::de::DeserializeOwned>(
    value: Option<serde_json::Value>,
    path: &str,
    field: &str,
) -> Option<T> {
    let value = value.filter(|v| !v.is_null())?;
    match serde_json::from_value(value) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!("Ignoring unreadable '{}' of {}: {}", field, path, e);
            None
        }
    }
}

fn string_field(root: &serde_json::Map<String, serde_json::Value>, key: &str) -> Option<String> {
    match root.get(key)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Null => None,
        other => {
            warn!("Manifest field '{}' is not a string: {}", key, other);
            Some(other.to_string())
        }
    }
}

/// Accepts `1` as well as `"1"`
fn format_version(value: &serde_json::Value) -> Option<u32> {
    let parsed = match value {
        serde_json::Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    if parsed.is_none() && !value.is_null() {
        warn!("Ignoring unreadable formatVersion: {}", value);
    }
    parsed
}

/// Dependency versions as strings; non-string versions are kept in their JSON form
fn dependency_map(value: &serde_json::Value) -> BTreeMap<String, String> {
    match value {
        serde_json::Value::Object(map) => map
            .iter()
            .map(|(name, version)| {
                let version = match version {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (name.clone(), version)
            })
            .collect(),
        serde_json::Value::Null => BTreeMap::new(),
        other => {
            warn!("Ignoring unreadable dependencies: {}", other);
            BTreeMap::new()
        }
    }
}

/// A relative path with no root, drive prefix or `..` component
pub fn is_contained_path(path: &str) -> bool {
    if path.starts_with('/') || path.starts_with('\\') {
        return false;
    }
    let bytes = path.as_bytes();
    if bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic() {
        return false;
    }
    !path.split(['/', '\\']).any(|component| component == "..")
}
