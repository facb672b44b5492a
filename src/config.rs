use crate::settings::RetryPolicy;
use anyhow::Context;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const DEFAULT_SCRIPT_URL: &str = "https://cdn.chatwidget.app/chat-widget.js";

/// Runtime configuration for the preview server and CLI harness.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// Host page the widget is booted against; a generated page is used
    /// when unset.
    pub host_page_path: Option<PathBuf>,
    pub host_page_url: Url,
    /// JSON file emulating the browser's durable storage.
    pub storage_path: Option<PathBuf>,
    pub script_url: String,
    pub enable_cors: bool,
    pub policy: RetryPolicy,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let bind_addr: SocketAddr = var("BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
            .parse()
            .context("failed to parse BIND_ADDR")?;

        let host_page_path = var("HOST_PAGE_PATH").map(PathBuf::from);
        let host_page_url = Url::parse(
            &var("HOST_PAGE_URL").unwrap_or_else(|| "https://example.com/".to_string()),
        )
        .context("failed to parse HOST_PAGE_URL")?;
        let storage_path = var("WIDGET_STORAGE_PATH").map(PathBuf::from);
        let script_url = var("WIDGET_SCRIPT_URL").unwrap_or_else(|| DEFAULT_SCRIPT_URL.to_string());

        let enable_cors = var("ENABLE_CORS")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let millis = |key: &str| {
            var(key)
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_millis)
        };
        let defaults = RetryPolicy::default();
        let policy = RetryPolicy {
            settings_timeout: millis("WIDGET_SETTINGS_TIMEOUT_MS").unwrap_or(defaults.settings_timeout),
            settings_attempts: var("WIDGET_SETTINGS_ATTEMPTS")
                .and_then(|v| v.parse::<u32>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.settings_attempts),
            retry_base_delay: millis("WIDGET_RETRY_BASE_MS").unwrap_or(defaults.retry_base_delay),
            chat_timeout: millis("WIDGET_CHAT_TIMEOUT_MS").unwrap_or(defaults.chat_timeout),
            init_timeout: millis("WIDGET_INIT_TIMEOUT_MS").unwrap_or(defaults.init_timeout),
        };

        Ok(Self {
            bind_addr,
            host_page_path,
            host_page_url,
            storage_path,
            script_url,
            enable_cors,
            policy,
        })
    }
}
