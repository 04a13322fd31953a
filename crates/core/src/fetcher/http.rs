//! Plain HTTP renderer.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use super::types::{PageRenderer, RenderError};
use crate::proxy::ProxyEndpoint;

/// Longest error body kept in [`RenderError::Status`] messages.
const MAX_ERROR_BODY: usize = 200;

/// Fetches pages with a plain GET request.
///
/// reqwest binds proxies to the client, so one client is built per proxy
/// endpoint and reused for later requests through the same endpoint.
pub struct HttpRenderer {
    timeout: Duration,
    user_agent: String,
    clients: Mutex<HashMap<String, reqwest::Client>>,
}

impl HttpRenderer {
    pub fn new(timeout: Duration, user_agent: impl Into<String>) -> Self {
        Self {
            timeout,
            user_agent: user_agent.into(),
            clients: Mutex::new(HashMap::new()),
        }
    }

    fn client_for(&self, proxy: Option<&ProxyEndpoint>) -> Result<reqwest::Client, RenderError> {
        let key = proxy
            .map(|p| format!("{}|{}", p.url(), p.username.as_deref().unwrap_or_default()))
            .unwrap_or_default();

        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(client) = clients.get(&key) {
            return Ok(client.clone());
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent.clone())
            .default_headers(headers);

        if let Some(endpoint) = proxy {
            let mut proxy = reqwest::Proxy::all(endpoint.url())
                .map_err(|e| RenderError::Network(format!("invalid proxy {}: {}", endpoint, e)))?;
            if let (Some(user), Some(pass)) = (&endpoint.username, &endpoint.password) {
                proxy = proxy.basic_auth(user, pass);
            }
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| RenderError::Network(format!("failed to build HTTP client: {}", e)))?;
        clients.insert(key, client.clone());
        Ok(client)
    }
}

/// Flatten a reqwest error and its sources into one message.
fn describe(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn map_error(err: reqwest::Error) -> RenderError {
    if err.is_timeout() {
        return RenderError::Timeout;
    }
    let message = describe(&err);
    if message.contains("407") {
        RenderError::ProxyRejected(message)
    } else {
        RenderError::Network(message)
    }
}

#[async_trait]
impl PageRenderer for HttpRenderer {
    fn name(&self) -> &str {
        "http"
    }

    async fn render(&self, url: &str, proxy: Option<&ProxyEndpoint>) -> Result<String, RenderError> {
        let client = self.client_for(proxy)?;
        let response = client.get(url).send().await.map_err(map_error)?;

        let status = response.status().as_u16();
        if status == 407 {
            return Err(RenderError::ProxyRejected(
                "proxy authentication required".to_string(),
            ));
        }
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RenderError::Status {
                status,
                message: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        response.text().await.map_err(map_error)
    }
}
