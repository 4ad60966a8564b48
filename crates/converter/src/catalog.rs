//! Catalog (Modrinth) source resolution
//!
//! Turns a project or version page URL into the URL of the pack file to
//! download, using the public version API.

use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::ConvertConfig;
use crate::error::{ConvertError, Result};
use crate::http::AssetFetcher;

/// Project and optional version parsed from a catalog page URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogUrl {
    pub project: String,
    pub version: Option<String>,
}

impl CatalogUrl {
    /// Match `<host>/(modpack|project)/<id>[/version/<version>]` anywhere in `input`
    pub fn parse(input: &str, host: &str) -> Result<Self> {
        let needle = format!("{}/", host);
        input
            .match_indices(&needle)
            .find_map(|(start, _)| Self::parse_path(&input[start + needle.len()..]))
            .ok_or_else(|| ConvertError::InvalidUrlFormat {
                url: input.to_string(),
            })
    }

    fn parse_path(rest: &str) -> Option<Self> {
        let rest = rest.split(['?', '#']).next().unwrap_or_default();
        let mut segments = rest.split('/');

        match segments.next()? {
            "modpack" | "project" => {}
            _ => return None,
        }
        let project = segments.next().filter(|id| !id.is_empty())?.to_string();
        let version = match (segments.next(), segments.next()) {
            (Some("version"), Some(version)) if !version.is_empty() => Some(version.to_string()),
            _ => None,
        };

        Some(Self { project, version })
    }
}

/// A version as returned by the catalog API
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogVersion {
    pub name: Option<String>,
    pub version_number: Option<String>,
    pub files: Option<Vec<CatalogFile>>,
}

/// A downloadable file of a catalog version
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub primary: bool,
    pub url: Option<String>,
}

/// The pack file chosen for a catalog URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAsset {
    pub url: String,
    /// Output filename: `<version name | project>-<version number>.zip`
    pub filename: String,
}

/// Client for the catalog version API
#[derive(Clone)]
pub struct CatalogClient {
    fetcher: Arc<dyn AssetFetcher>,
    api_base: String,
    archive_extension: String,
}

impl CatalogClient {
    pub fn new(fetcher: Arc<dyn AssetFetcher>, config: &ConvertConfig) -> Self {
        Self {
            fetcher,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            archive_extension: config.archive_extension.clone(),
        }
    }

    /// Fetch a specific version of a project
    pub async fn get_version(&self, project: &str, version: &str) -> Result<CatalogVersion> {
        let url = format!("{}/project/{}/version/{}", self.api_base, project, version);
        let not_found = |reason: String| ConvertError::VersionNotFound {
            project: project.to_string(),
            version: version.to_string(),
            reason,
        };

        let asset = self.fetcher.fetch(&url).await.map_err(|e| not_found(e.to_string()))?;
        let data: CatalogVersion = serde_json::from_slice(&asset.bytes)
            .map_err(|e| not_found(format!("unreadable response: {}", e)))?;

        if data.files.is_none() {
            return Err(not_found("response has no files".to_string()));
        }
        Ok(data)
    }

    /// Fetch the most recent version of a project
    pub async fn latest_version(&self, project: &str) -> Result<CatalogVersion> {
        let url = format!("{}/project/{}/version", self.api_base, project);
        let none_found = |reason: String| ConvertError::NoVersionsFound {
            project: project.to_string(),
            reason,
        };

        let asset = self.fetcher.fetch(&url).await.map_err(|e| none_found(e.to_string()))?;
        let versions: Vec<CatalogVersion> = serde_json::from_slice(&asset.bytes)
            .map_err(|e| none_found(format!("unreadable response: {}", e)))?;

        let latest = versions
            .into_iter()
            .next()
            .ok_or_else(|| none_found("the project has no versions".to_string()))?;
        if latest.files.is_none() {
            return Err(none_found("latest version has no files".to_string()));
        }
        Ok(latest)
    }

    /// First file flagged primary whose name ends with the pack extension
    pub fn select_primary_asset<'a>(&self, version: &'a CatalogVersion) -> Option<&'a CatalogFile> {
        version
            .files
            .as_deref()?
            .iter()
            .find(|file| file.primary && file.filename.ends_with(&self.archive_extension))
    }

    /// Resolve a catalog URL to the pack file to download
    pub async fn resolve(&self, catalog_url: &CatalogUrl) -> Result<ResolvedAsset> {
        let project = catalog_url.project.as_str();
        let version = match &catalog_url.version {
            Some(version) => {
                info!("Fetching version {} of {}", version, project);
                self.get_version(project, version).await?
            }
            None => {
                info!("Fetching latest version of {}", project);
                self.latest_version(project).await?
            }
        };

        let url = self
            .select_primary_asset(&version)
            .and_then(|file| file.url.clone())
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ConvertError::NoPrimaryAsset {
                project: project.to_string(),
                extension: self.archive_extension.clone(),
            })?;

        let filename = format!(
            "{}-{}.zip",
            version.name.as_deref().unwrap_or(project),
            version.version_number.as_deref().unwrap_or_default()
        );
        debug!("Resolved {} to {} ({})", project, url, filename);

        Ok(ResolvedAsset { url, filename })
    }
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("api_base", &self.api_base)
            .field("archive_extension", &self.archive_extension)
            .finish_non_exhaustive()
    }
}
