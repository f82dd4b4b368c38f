// src/services/render.rs

//! Page rendering backends.
//!
//! The careers site builds its listing client-side, so the default backend
//! drives headless Chrome and waits for the page to settle. The HTTP and file
//! backends serve server-rendered pages and offline replays.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::RenderConfig;

/// Fetches fully-rendered HTML for a URL.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Render `url`, allowing dynamic content the configured time to settle.
    async fn render(&self, url: &str, config: &RenderConfig) -> Result<String>;
}

/// Headless Chrome backend.
#[cfg(feature = "browser")]
#[derive(Debug, Default, Clone)]
pub struct ChromeRenderer;

#[cfg(feature = "browser")]
impl ChromeRenderer {
    pub fn new() -> Self {
        Self
    }

    fn render_blocking(url: &str, config: &RenderConfig) -> Result<String> {
        use std::ffi::OsStr;
        use std::time::Duration;

        use headless_chrome::{Browser, LaunchOptions};

        let options = LaunchOptions {
            headless: true,
            sandbox: false,
            window_size: Some((config.window_width, config.window_height)),
            args: vec![
                OsStr::new("--disable-dev-shm-usage"),
                OsStr::new("--disable-gpu"),
            ],
            idle_browser_timeout: config.timeout(),
            ..LaunchOptions::default()
        };

        let browser = Browser::new(options).map_err(|e| AppError::render(url, e))?;
        let tab = browser.new_tab().map_err(|e| AppError::render(url, e))?;
        tab.set_default_timeout(config.timeout());
        tab.set_user_agent(&config.user_agent, None, None)
            .map_err(|e| AppError::render(url, e))?;

        tab.navigate_to(url)
            .map_err(|e| AppError::render(url, e))?
            .wait_until_navigated()
            .map_err(|e| AppError::render(url, e))?;
        log::info!(
            "Page loaded, waiting {}s for JavaScript to render...",
            config.settle_secs
        );
        std::thread::sleep(Duration::from_secs(config.settle_secs));

        // Scroll to trigger lazy loading
        tab.evaluate("window.scrollTo(0, document.body.scrollHeight);", false)
            .map_err(|e| AppError::render(url, e))?;
        std::thread::sleep(Duration::from_secs(config.scroll_settle_secs));
        tab.evaluate("window.scrollTo(0, 0);", false)
            .map_err(|e| AppError::render(url, e))?;
        std::thread::sleep(Duration::from_secs(config.return_settle_secs));

        tab.get_content().map_err(|e| AppError::render(url, e))
    }
}

#[cfg(feature = "browser")]
#[async_trait]
impl Renderer for ChromeRenderer {
    async fn render(&self, url: &str, config: &RenderConfig) -> Result<String> {
        let owned_url = url.to_string();
        let owned_config = config.clone();
        let job =
            tokio::task::spawn_blocking(move || Self::render_blocking(&owned_url, &owned_config));

        // The browser thread cannot be interrupted; on timeout it is abandoned
        // and shuts Chrome down when it finishes.
        match tokio::time::timeout(config.timeout(), job).await {
            Err(_) => Err(AppError::RenderTimeout {
                url: url.to_string(),
                secs: config.timeout_secs,
            }),
            Ok(Err(join_error)) => Err(AppError::render(url, join_error)),
            Ok(Ok(result)) => result,
        }
    }
}

/// Plain HTTP backend for pages that do not need JavaScript.
#[derive(Debug, Clone)]
pub struct HttpRenderer {
    client: reqwest::Client,
}

impl HttpRenderer {
    /// Create a renderer with a client configured from `config`.
    pub fn new(config: &RenderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn render(&self, url: &str, config: &RenderConfig) -> Result<String> {
        let map = |e: reqwest::Error| {
            if e.is_timeout() {
                AppError::RenderTimeout {
                    url: url.to_string(),
                    secs: config.timeout_secs,
                }
            } else {
                AppError::render(url, e)
            }
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(map)?;
        response.text().await.map_err(map)
    }
}

/// Replays a saved HTML snapshot instead of fetching.
#[derive(Debug, Clone)]
pub struct FileRenderer {
    path: PathBuf,
}

impl FileRenderer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Renderer for FileRenderer {
    async fn render(&self, url: &str, _config: &RenderConfig) -> Result<String> {
        log::info!("Using saved snapshot {} for {url}", self.path.display());
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| AppError::render(url, format!("{}: {e}", self.path.display())))
    }
}
