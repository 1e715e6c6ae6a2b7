//! # Utilities
//!
//! URL helpers shared by the resolver, the CDN classifier and the stylesheet
//! rewriter:
//!
//! - host extraction and absolute/relative classification
//! - absolute to path-only conversion
//! - parsing hostnames out of comma separated settings

pub mod url;

// Re-export commonly used items for convenience
pub use url::{
    convert_absolute_to_relative, is_absolute, is_root_relative, parse_host, parse_host_name,
    trim_slashes, Url,
};
