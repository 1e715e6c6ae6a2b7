//! Typed environment variable access.
//!
//! The rewrite engine never reads the process environment itself. These
//! accessors are consulted once, while a [`crate::config::ProxyConfig`] is
//! being built, and the results are stored as plain configuration fields.

use std::env;
use std::fmt;

/// Environment variable parse error.
#[derive(Debug, Clone)]
pub struct EnvError {
    pub variable: String,
    pub message: String,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment variable '{}': {}", self.variable, self.message)
    }
}

impl std::error::Error for EnvError {}

pub type EnvResult<T> = Result<T, EnvError>;

/// Environment variable accessor.
pub trait EnvVar<T> {
    const NAME: &'static str;
    const DEFAULT: Option<T>;
    const DESCRIPTION: &'static str;

    fn parse(value: &str) -> EnvResult<T>;

    fn get() -> EnvResult<T> {
        match env::var(Self::NAME) {
            Ok(value) if !value.trim().is_empty() => Self::parse(&value),
            _ => {
                if let Some(default) = Self::DEFAULT {
                    Ok(default)
                } else {
                    Err(EnvError {
                        variable: Self::NAME.to_string(),
                        message: "Required environment variable not set".to_string(),
                    })
                }
            }
        }
    }

    /// `None` when unset, empty or unparsable.
    fn get_opt() -> Option<T> {
        Self::get().ok()
    }
}

fn parse_non_empty(value: &str, name: &str) -> EnvResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(EnvError {
            variable: name.to_string(),
            message: "Value cannot be empty".to_string(),
        });
    }
    Ok(value.to_string())
}

/// Process-level settings
pub mod core {
    use super::*;

    /// Configuration file location
    pub struct ConfigPath;
    impl EnvVar<String> for ConfigPath {
        const NAME: &'static str = "SITEPROXY_CONFIG";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Path to a TOML or JSON configuration file";

        fn parse(value: &str) -> EnvResult<String> {
            parse_non_empty(value, Self::NAME)
        }
    }

    /// Log level
    pub struct LogLevel;
    impl EnvVar<String> for LogLevel {
        const NAME: &'static str = "SITEPROXY_LOG_LEVEL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Log level: trace, debug, info, warn, error";

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("info".to_string()),
            }
        }

        fn parse(value: &str) -> EnvResult<String> {
            match value.to_lowercase().as_str() {
                "trace" | "debug" | "info" | "warn" | "error" => Ok(value.to_lowercase()),
                _ => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!(
                        "Invalid log level '{}'. Use: trace, debug, info, warn, error",
                        value
                    ),
                }),
            }
        }
    }
}

/// Settings describing trusted asset origins
pub mod cdn {
    use super::*;

    /// Stage file proxy origin, a comma separated list of hosts
    pub struct StageFileProxyOrigin;
    impl EnvVar<String> for StageFileProxyOrigin {
        const NAME: &'static str = "STAGE_FILE_PROXY_ORIGIN";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Origin that serves files for staging environments";

        fn parse(value: &str) -> EnvResult<String> {
            parse_non_empty(value, Self::NAME)
        }
    }

    /// Azure blob storage account name
    pub struct AzureBlobStorageName;
    impl EnvVar<String> for AzureBlobStorageName {
        const NAME: &'static str = "AZURE_BLOB_STORAGE_NAME";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Storage account name, served from {name}.blob.core.windows.net";

        fn parse(value: &str) -> EnvResult<String> {
            let name = parse_non_empty(value, Self::NAME)?;
            if name.contains('.') || name.contains('/') {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Expected a bare storage account name".to_string(),
                });
            }
            Ok(name)
        }
    }
}

/// Settings describing the backend's own hostname
pub mod hostname {
    use super::*;

    /// Application environment
    pub struct AppEnv;
    impl EnvVar<String> for AppEnv {
        const NAME: &'static str = "APP_ENV";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Application environment (dev, test, stage, prod)";

        fn parse(value: &str) -> EnvResult<String> {
            Ok(value.trim().to_lowercase())
        }
    }

    /// Local hostname, only consulted when `APP_ENV=dev`
    pub struct Hostname;
    impl EnvVar<String> for Hostname {
        const NAME: &'static str = "HOSTNAME";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Hostname used in local development";

        fn parse(value: &str) -> EnvResult<String> {
            parse_non_empty(value, Self::NAME)
        }
    }

    pub struct BackendDomain;
    impl EnvVar<String> for BackendDomain {
        const NAME: &'static str = "DRUPAL_BACKEND_DOMAIN";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Domain the backend is served from";

        fn parse(value: &str) -> EnvResult<String> {
            parse_non_empty(value, Self::NAME)
        }
    }

    pub struct Routes;
    impl EnvVar<String> for Routes {
        const NAME: &'static str = "DRUPAL_ROUTES";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Comma separated list of routes served by the backend";

        fn parse(value: &str) -> EnvResult<String> {
            parse_non_empty(value, Self::NAME)
        }
    }

    pub struct ReverseProxyAddress;
    impl EnvVar<String> for ReverseProxyAddress {
        const NAME: &'static str = "DRUPAL_REVERSE_PROXY_ADDRESS";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Comma separated list of reverse proxy addresses";

        fn parse(value: &str) -> EnvResult<String> {
            parse_non_empty(value, Self::NAME)
        }
    }
}

/// Response header settings
pub mod headers {
    use super::*;

    /// Adds `X-Robots-Tag` to every response when set to anything
    pub struct RobotsTagEverywhere;
    impl EnvVar<bool> for RobotsTagEverywhere {
        const NAME: &'static str = "DRUPAL_X_ROBOTS_TAG_HEADER";
        const DEFAULT: Option<bool> = Some(false);
        const DESCRIPTION: &'static str = "Add X-Robots-Tag: noindex, nofollow to every response";

        fn parse(value: &str) -> EnvResult<bool> {
            Ok(!matches!(value.trim().to_lowercase().as_str(), "" | "0" | "false" | "no"))
        }
    }
}

/// Web server settings
pub mod web {
    use super::*;

    /// Bind address
    pub struct BindAddress;
    impl EnvVar<String> for BindAddress {
        const NAME: &'static str = "SITEPROXY_BIND_ADDRESS";
        const DEFAULT: Option<String> = None;

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("127.0.0.1".to_string()),
            }
        }
        const DESCRIPTION: &'static str = "Web server bind address";

        fn parse(value: &str) -> EnvResult<String> {
            parse_non_empty(value, Self::NAME)
        }
    }

    /// Port
    pub struct Port;
    impl EnvVar<u16> for Port {
        const NAME: &'static str = "SITEPROXY_PORT";
        const DEFAULT: Option<u16> = Some(8080);
        const DESCRIPTION: &'static str = "Web server port";

        fn parse(value: &str) -> EnvResult<u16> {
            let port: u16 = value.trim().parse().map_err(|_| EnvError {
                variable: Self::NAME.to_string(),
                message: "Must be a valid port number (1-65535)".to_string(),
            })?;

            if port == 0 {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Port cannot be 0".to_string(),
                });
            }

            Ok(port)
        }
    }

    /// Backend the server forwards requests to
    pub struct Upstream;
    impl EnvVar<String> for Upstream {
        const NAME: &'static str = "SITEPROXY_UPSTREAM";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Backend base URL, e.g. http://127.0.0.1:8000";

        fn parse(value: &str) -> EnvResult<String> {
            let url = value.trim().trim_end_matches('/');
            if url.starts_with("http://") || url.starts_with("https://") {
                Ok(url.to_string())
            } else {
                Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Upstream must start with http:// or https://".to_string(),
                })
            }
        }
    }

    /// Largest response body buffered for rewriting, in bytes
    pub struct MaxBodySize;
    impl EnvVar<usize> for MaxBodySize {
        const NAME: &'static str = "SITEPROXY_MAX_BODY_SIZE";
        const DEFAULT: Option<usize> = Some(16 * 1024 * 1024);
        const DESCRIPTION: &'static str = "Maximum response body size buffered for rewriting";

        fn parse(value: &str) -> EnvResult<usize> {
            let size: usize = value.trim().parse().map_err(|_| EnvError {
                variable: Self::NAME.to_string(),
                message: "Must be a valid number of bytes".to_string(),
            })?;

            if size < 1024 {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Body limit too small (minimum 1024 bytes)".to_string(),
                });
            }

            Ok(size)
        }
    }
}

/// Every known variable with its description.
pub fn describe() -> Vec<(&'static str, &'static str)> {
    vec![
        (core::ConfigPath::NAME, core::ConfigPath::DESCRIPTION),
        (core::LogLevel::NAME, core::LogLevel::DESCRIPTION),
        (cdn::StageFileProxyOrigin::NAME, cdn::StageFileProxyOrigin::DESCRIPTION),
        (cdn::AzureBlobStorageName::NAME, cdn::AzureBlobStorageName::DESCRIPTION),
        (hostname::AppEnv::NAME, hostname::AppEnv::DESCRIPTION),
        (hostname::Hostname::NAME, hostname::Hostname::DESCRIPTION),
        (hostname::BackendDomain::NAME, hostname::BackendDomain::DESCRIPTION),
        (hostname::Routes::NAME, hostname::Routes::DESCRIPTION),
        (hostname::ReverseProxyAddress::NAME, hostname::ReverseProxyAddress::DESCRIPTION),
        (headers::RobotsTagEverywhere::NAME, headers::RobotsTagEverywhere::DESCRIPTION),
        (web::BindAddress::NAME, web::BindAddress::DESCRIPTION),
        (web::Port::NAME, web::Port::DESCRIPTION),
        (web::Upstream::NAME, web::Upstream::DESCRIPTION),
        (web::MaxBodySize::NAME, web::MaxBodySize::DESCRIPTION),
    ]
}
