//! Browserless renderer (headless Chrome behind an HTTP API).

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use super::config::BrowserlessConfig;
use super::types::{PageRenderer, RenderError};
use crate::proxy::ProxyEndpoint;

/// Renders pages through a Browserless `/content` endpoint.
pub struct BrowserlessRenderer {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ContentRequest<'a> {
    url: &'a str,
    goto_options: GotoOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    authenticate: Option<Credentials<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GotoOptions {
    wait_until: &'static str,
    timeout: u64,
}

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

impl BrowserlessRenderer {
    pub fn new(config: &BrowserlessConfig, timeout: Duration) -> Result<Self, RenderError> {
        // Leave headroom over the navigation timeout for Browserless itself.
        let client = reqwest::Client::builder()
            .timeout(timeout + Duration::from_secs(10))
            .build()
            .map_err(|e| RenderError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            timeout,
        })
    }

    fn query(&self, proxy: Option<&ProxyEndpoint>) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(token) = &self.token {
            query.push(("token", token.clone()));
        }
        if let Some(proxy) = proxy {
            query.push(("--proxy-server", proxy.url()));
        }
        query
    }
}

#[async_trait]
impl PageRenderer for BrowserlessRenderer {
    fn name(&self) -> &str {
        "browserless"
    }

    async fn render(&self, url: &str, proxy: Option<&ProxyEndpoint>) -> Result<String, RenderError> {
        let body = ContentRequest {
            url,
            goto_options: GotoOptions {
                wait_until: "networkidle2",
                timeout: self.timeout.as_millis() as u64,
            },
            authenticate: proxy.and_then(|p| match (&p.username, &p.password) {
                (Some(username), Some(password)) => Some(Credentials { username, password }),
                _ => None,
            }),
        };

        let response = self
            .client
            .post(format!("{}/content", self.base_url))
            .query(&self.query(proxy))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RenderError::Timeout
                } else {
                    RenderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(match status {
                408 | 504 => RenderError::Timeout,
                _ => RenderError::Status { status, message },
            });
        }

        // Status of the rendered page itself, when Browserless reports it.
        let target_status = response
            .headers()
            .get("x-response-code")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u16>().ok());
        match target_status {
            Some(407) => {
                return Err(RenderError::ProxyRejected(
                    "proxy authentication required".to_string(),
                ))
            }
            Some(code) if code >= 400 => {
                return Err(RenderError::Status {
                    status: code,
                    message: format!("target responded with {}", code),
                })
            }
            _ => {}
        }

        response
            .text()
            .await
            .map_err(|e| RenderError::Network(e.to_string()))
    }
}
