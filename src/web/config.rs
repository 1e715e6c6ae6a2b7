//! Web server configuration
//!
//! Read from the typed environment variables in [`crate::env::web`].

use crate::env::{EnvError, EnvResult, EnvVar};

#[derive(Debug, Clone)]
pub struct WebConfig {
    pub bind_addr: String,
    pub port: u16,
    /// Backend every request is forwarded to, without a trailing slash.
    pub upstream: String,
    /// Largest response body buffered for rewriting.
    pub max_body_size: usize,
}

impl WebConfig {
    pub fn from_env() -> EnvResult<Self> {
        use crate::env::web;

        Ok(Self {
            bind_addr: web::BindAddress::get()?,
            port: web::Port::get()?,
            upstream: web::Upstream::get()?,
            max_body_size: web::MaxBodySize::get()?,
        })
    }

    pub fn validate(&self) -> EnvResult<()> {
        if self.bind_addr.is_empty() {
            return Err(EnvError {
                variable: "SITEPROXY_BIND_ADDRESS".to_string(),
                message: "Bind address cannot be empty".to_string(),
            });
        }

        if self.port == 0 {
            return Err(EnvError {
                variable: "SITEPROXY_PORT".to_string(),
                message: "Port cannot be 0".to_string(),
            });
        }

        if !(self.upstream.starts_with("http://") || self.upstream.starts_with("https://")) {
            return Err(EnvError {
                variable: "SITEPROXY_UPSTREAM".to_string(),
                message: "Upstream must start with http:// or https://".to_string(),
            });
        }

        Ok(())
    }

    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> WebConfig {
        WebConfig {
            bind_addr: "127.0.0.1".to_string(),
            port: 8080,
            upstream: "http://127.0.0.1:8000".to_string(),
            max_body_size: 1024 * 1024,
        }
    }

    #[test]
    fn listen_address_joins_host_and_port() {
        assert_eq!(config().listen_address(), "127.0.0.1:8080");
        assert!(config().validate().is_ok());
    }

    #[test]
    fn upstream_needs_scheme() {
        let config = WebConfig {
            upstream: "127.0.0.1:8000".to_string(),
            ..config()
        };
        assert_eq!(config.validate().unwrap_err().variable, "SITEPROXY_UPSTREAM");
    }
}
