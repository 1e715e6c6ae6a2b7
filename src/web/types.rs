//! Shared state of the web layer

use std::sync::Arc;

use crate::core::ProxyManager;
use crate::response::ResponsePolicy;

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<ProxyManager>,
    pub policy: Arc<ResponsePolicy>,
    pub client: reqwest::Client,
    pub upstream: String,
    pub max_body_size: usize,
}

impl AppState {
    pub fn new(
        manager: ProxyManager,
        policy: ResponsePolicy,
        client: reqwest::Client,
        upstream: &str,
        max_body_size: usize,
    ) -> Self {
        Self {
            manager: Arc::new(manager),
            policy: Arc::new(policy),
            client,
            upstream: upstream.trim_end_matches('/').to_string(),
            max_body_size,
        }
    }
}
