//! Trusted asset origin detection.
//!
//! Values whose host already points at a stage file proxy or a blob storage
//! account are served by that origin and must never be rewritten.

use crate::utils::url::{parse_host, parse_host_name};

const BLOB_STORAGE_SUFFIX: &str = "blob.core.windows.net";

/// Host-prefix patterns of trusted origins. Built once, read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CdnPatterns {
    patterns: Vec<String>,
}

impl CdnPatterns {
    pub fn new(
        stage_file_proxy_origin: Option<&str>,
        azure_blob_storage_name: Option<&str>,
    ) -> Self {
        let mut patterns = Vec::new();

        if let Some(origin) = stage_file_proxy_origin.filter(|o| !o.trim().is_empty()) {
            let host = parse_host_name(origin);
            let host = host.trim_end_matches('/');
            if !host.is_empty() {
                patterns.push(host.to_lowercase());
            }
        }

        if let Some(name) = azure_blob_storage_name.filter(|n| !n.trim().is_empty()) {
            patterns.push(format!("{}.{}", name.trim().to_lowercase(), BLOB_STORAGE_SUFFIX));
        }

        Self { patterns }
    }

    pub fn from_patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(Into::into)
                .filter(|p: &String| !p.is_empty())
                .collect(),
        }
    }

    /// True when `value` is a URL whose host starts with a trusted pattern.
    pub fn is_cdn_address(&self, value: &str) -> bool {
        if self.patterns.is_empty() || value.is_empty() {
            return false;
        }

        match parse_host(value) {
            Some(host) => self
                .patterns
                .iter()
                .any(|pattern| host.starts_with(pattern.as_str())),
            None => false,
        }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}
