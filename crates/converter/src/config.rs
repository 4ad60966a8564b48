//! Configuration types for the conversion pipeline

use std::time::Duration;

use crate::error::{ConvertError, Result};

/// Configuration for a conversion
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    /// Base URL of the catalog API, without trailing slash
    pub api_base: String,
    /// Host that catalog page URLs are matched against
    pub catalog_host: String,
    /// Remote files are only fetched when their first URL starts with this prefix
    pub trusted_cdn_prefix: String,
    /// Files with any download URL on one of these hosts are deferred to the user
    pub blocked_hosts: Vec<String>,
    /// Override directories, in priority order
    pub override_prefixes: Vec<String>,
    /// Name of the index entry inside a pack
    pub manifest_name: String,
    /// Extension identifying the pack file in a catalog version
    pub archive_extension: String,
    /// Output name used when neither manifest nor source provide one
    pub default_output_name: String,
    pub user_agent: String,
    /// Deadline for a whole request, body included (None = no deadline)
    pub timeout: Option<Duration>,
    /// Deadline for establishing a connection
    pub connect_timeout: Option<Duration>,
    /// Maximum number of concurrent file downloads (None = one task per file)
    pub max_concurrent_downloads: Option<usize>,
    /// Maximum number of override entries decompressed at once
    pub max_concurrent_overrides: usize,
    /// Deflate level for the output archive (None = codec default)
    pub compression_level: Option<i64>,
}

impl ConvertConfig {
    /// Load configuration from the environment, reading a `.env` file if present
    ///
    /// Recognized variables: `MRPACK_API_BASE`, `MRPACK_TRUSTED_CDN`,
    /// `MRPACK_USER_AGENT`, `MRPACK_TIMEOUT_SECS` (0 = none), `MRPACK_MAX_DOWNLOADS`.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok(); // Ignore error if .env not present
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = ConvertConfigBuilder::new();

        if let Some(api_base) = lookup("MRPACK_API_BASE") {
            builder = builder.api_base(api_base);
        }
        if let Some(prefix) = lookup("MRPACK_TRUSTED_CDN") {
            builder = builder.trusted_cdn_prefix(prefix);
        }
        if let Some(user_agent) = lookup("MRPACK_USER_AGENT") {
            builder = builder.user_agent(user_agent);
        }
        if let Some(raw) = lookup("MRPACK_TIMEOUT_SECS") {
            let secs = parse_number("MRPACK_TIMEOUT_SECS", &raw)?;
            builder = builder.timeout((secs > 0).then(|| Duration::from_secs(secs as u64)));
        }
        if let Some(raw) = lookup("MRPACK_MAX_DOWNLOADS") {
            let max = parse_number("MRPACK_MAX_DOWNLOADS", &raw)?;
            builder = builder.max_concurrent_downloads(max);
        }

        Ok(builder.build())
    }

    /// Effective download fan-out for `file_count` files
    pub fn download_concurrency(&self, file_count: usize) -> usize {
        self.max_concurrent_downloads
            .unwrap_or(file_count)
            .max(1)
    }
}

fn parse_number(field: &str, raw: &str) -> Result<usize> {
    raw.trim().parse::<usize>().map_err(|_| ConvertError::Configuration {
        message: format!("{} must be a non-negative integer, got '{}'", field, raw),
        field: Some(field.to_string()),
        suggestion: Some(format!("Unset {} or give it a whole number", field)),
    })
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.modrinth.com/v2".to_string(),
            catalog_host: "modrinth.com".to_string(),
            trusted_cdn_prefix: "https://cdn.modrinth.com/".to_string(),
            blocked_hosts: vec![
                "github.com".to_string(),
                "raw.githubusercontent.com".to_string(),
            ],
            override_prefixes: vec![
                "overrides/".to_string(),
                "client-overrides/".to_string(),
            ],
            manifest_name: "modrinth.index.json".to_string(),
            archive_extension: ".mrpack".to_string(),
            default_output_name: "modpack.zip".to_string(),
            user_agent: format!("mrpack-to-zip/{}", env!("CARGO_PKG_VERSION")),
            timeout: None,
            connect_timeout: Some(Duration::from_secs(30)),
            max_concurrent_downloads: None,
            max_concurrent_overrides: 8,
            compression_level: None,
        }
    }
}

/// Builder for [`ConvertConfig`]
#[derive(Debug, Clone, Default)]
pub struct ConvertConfigBuilder {
    config: ConvertConfig,
}

impl ConvertConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn api_base<S: Into<String>>(mut self, api_base: S) -> Self {
        self.config.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn catalog_host<S: Into<String>>(mut self, host: S) -> Self {
        self.config.catalog_host = host.into();
        self
    }

    pub fn trusted_cdn_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.config.trusted_cdn_prefix = prefix.into();
        self
    }

    pub fn blocked_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.blocked_hosts = hosts.into_iter().map(Into::into).collect();
        self
    }

    pub fn override_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.override_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    pub fn default_output_name<S: Into<String>>(mut self, name: S) -> Self {
        self.config.default_output_name = name.into();
        self
    }

    pub fn user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Cap concurrent downloads; 0 removes the cap
    pub fn max_concurrent_downloads(mut self, max: usize) -> Self {
        self.config.max_concurrent_downloads = if max == 0 { None } else { Some(max) };
        self
    }

    pub fn max_concurrent_overrides(mut self, max: usize) -> Self {
        self.config.max_concurrent_overrides = max.max(1);
        self
    }

    pub fn compression_level(mut self, level: i64) -> Self {
        self.config.compression_level = Some(level);
        self
    }

    pub fn build(self) -> ConvertConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_point_at_modrinth() {
        let config = ConvertConfig::default();
        assert_eq!(config.api_base, "https://api.modrinth.com/v2");
        assert_eq!(config.trusted_cdn_prefix, "https://cdn.modrinth.com/");
        assert_eq!(config.override_prefixes, vec!["overrides/", "client-overrides/"]);
        assert!(config.max_concurrent_downloads.is_none());
        assert_eq!(config.timeout, None);
        assert_eq!(config.connect_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn builder_trims_api_base_and_treats_zero_as_unbounded() {
        let config = ConvertConfigBuilder::new()
            .api_base("http://localhost:1234/v2/")
            .max_concurrent_downloads(0)
            .build();
        assert_eq!(config.api_base, "http://localhost:1234/v2");
        assert_eq!(config.max_concurrent_downloads, None);
        assert_eq!(config.download_concurrency(5), 5);
        assert_eq!(config.download_concurrency(0), 1);
    }

    #[test]
    fn lookup_overrides_defaults() {
        let vars: HashMap<&str, &str> = [
            ("MRPACK_TRUSTED_CDN", "http://127.0.0.1:9000/"),
            ("MRPACK_TIMEOUT_SECS", "5"),
            ("MRPACK_MAX_DOWNLOADS", "3"),
        ]
        .into_iter()
        .collect();

        let config =
            ConvertConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.trusted_cdn_prefix, "http://127.0.0.1:9000/");
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.max_concurrent_downloads, Some(3));
    }

    #[test]
    fn zero_timeout_means_no_deadline() {
        let config = ConvertConfig::from_lookup(|key| {
            (key == "MRPACK_TIMEOUT_SECS").then(|| "0".to_string())
        })
        .unwrap();
        assert_eq!(config.timeout, None);
    }

    #[test]
    fn lookup_rejects_bad_numbers() {
        let result = ConvertConfig::from_lookup(|key| {
            (key == "MRPACK_TIMEOUT_SECS").then(|| "soon".to_string())
        });
        match result {
            Err(ConvertError::Configuration { field, .. }) => {
                assert_eq!(field.as_deref(), Some("MRPACK_TIMEOUT_SECS"));
            }
            other => panic!("Expected Configuration error, got {:?}", other),
        }
    }
}
