//! Test doubles for the fetch pipeline.
//!
//! `MockPage` scripts a `BrowserPage` so orchestrator and adapter logic
//! runs without a browser: canned title, registered selectors that the
//! readiness waits find instantly, evaluate results matched by script
//! substring, and a close counter to assert the release-on-every-path
//! contract.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use medreview_browser::{BrowserError, BrowserPage, Result};

/// Builder-style scripted page.
#[derive(Default)]
pub struct MockPage {
    title: String,
    selectors: HashSet<String>,
    evals: Vec<(String, serde_json::Value)>,
    navigation_error: Option<String>,
    screenshot: Vec<u8>,
    close_calls: AtomicUsize,
}

impl MockPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    /// Register a selector the readiness wait will find.
    pub fn with_selector(mut self, selector: &str) -> Self {
        self.selectors.insert(selector.to_string());
        self
    }

    /// Register an evaluate result, matched when the script contains
    /// `needle`. First match wins.
    pub fn on_eval(mut self, needle: &str, value: serde_json::Value) -> Self {
        self.evals.push((needle.to_string(), value));
        self
    }

    /// Make every navigation fail with the given message.
    pub fn failing_navigation(mut self, message: &str) -> Self {
        self.navigation_error = Some(message.to_string());
        self
    }

    pub fn with_screenshot(mut self, png: Vec<u8>) -> Self {
        self.screenshot = png;
        self
    }

    /// How many times `close` was called.
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserPage for MockPage {
    async fn navigate(&self, url: &str, _timeout: Duration) -> Result<()> {
        match &self.navigation_error {
            Some(message) => Err(BrowserError::Navigation(format!("{message}: {url}"))),
            None => Ok(()),
        }
    }

    async fn title(&self) -> Result<String> {
        Ok(self.title.clone())
    }

    async fn wait_for_selector(&self, selector: &str, _timeout: Duration) -> Result<bool> {
        Ok(self.selectors.contains(selector))
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        for (needle, value) in &self.evals {
            if script.contains(needle.as_str()) {
                return Ok(value.clone());
            }
        }
        Ok(serde_json::Value::Null)
    }

    async fn screenshot_png(&self) -> Result<Vec<u8>> {
        Ok(self.screenshot.clone())
    }

    async fn close(&self) -> Result<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
