//! Host trust policy for remote files

use url::Url;

use crate::config::ConvertConfig;
use crate::manifest::ManifestFile;

/// Why a file was not fetched automatically
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeferReason {
    /// One of the candidate URLs is on a blocked code-hosting host
    BlockedHost(String),
    /// The first URL is outside the trusted CDN
    UntrustedSource,
}

/// Decides which manifest files may be fetched without the user
#[derive(Debug, Clone)]
pub struct HostPolicy {
    trusted_prefix: String,
    blocked_hosts: Vec<String>,
}

impl HostPolicy {
    pub fn new<S: Into<String>>(trusted_prefix: S, blocked_hosts: Vec<String>) -> Self {
        Self {
            trusted_prefix: trusted_prefix.into(),
            blocked_hosts: blocked_hosts.into_iter().map(|h| h.to_ascii_lowercase()).collect(),
        }
    }

    pub fn from_config(config: &ConvertConfig) -> Self {
        Self::new(config.trusted_cdn_prefix.clone(), config.blocked_hosts.clone())
    }

    /// `None` when the file can be fetched, otherwise why it must be deferred
    pub fn check(&self, file: &ManifestFile) -> Option<DeferReason> {
        if let Some(host) = file.downloads.iter().find_map(|url| self.blocked_host(url)) {
            return Some(DeferReason::BlockedHost(host));
        }
        if !file.primary_url().starts_with(&self.trusted_prefix) {
            return Some(DeferReason::UntrustedSource);
        }
        None
    }

    /// Host of `url` when it is one of the blocked hosts or a subdomain of one
    pub fn blocked_host(&self, url: &str) -> Option<String> {
        let host = Url::parse(url).ok()?.host_str()?.to_ascii_lowercase();
        self.blocked_hosts
            .iter()
            .any(|blocked| host == *blocked || host.ends_with(&format!(".{}", blocked)))
            .then_some(host)
    }
}
