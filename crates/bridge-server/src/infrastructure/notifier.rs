//! ntfy push notification: "the app has answered".
//!
//! Publishing is a single `POST {server}/{topic}` with a plain-text body and a
//! `Title` header.  The web client subscribes to the same topic.  Delivery is
//! best-effort: failures are logged and never reach the caller.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info};

use crate::application::DoneNotifier;

/// Body of the done notification.
pub const DONE_MESSAGE: &str = "Claude has responded ✅";

/// Title header of the done notification.
pub const DONE_TITLE: &str = "Claude Bridge";

const PUBLISH_TIMEOUT: Duration = Duration::from_secs(10);

/// Publishes done notifications to one ntfy topic URL.
#[derive(Debug, Clone)]
pub struct NtfyNotifier {
    client: reqwest::Client,
    url: String,
}

impl NtfyNotifier {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialised (TLS setup).
    pub fn new(url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(PUBLISH_TIMEOUT).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl DoneNotifier for NtfyNotifier {
    async fn notify_done(&self) {
        info!("publishing done notification to {}", self.url);
        let result = self
            .client
            .post(&self.url)
            .header("Title", DONE_TITLE)
            .body(DONE_MESSAGE)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                info!("done notification published (status {})", response.status());
            }
            Ok(response) => {
                error!(
                    "failed to publish done notification (status {})",
                    response.status()
                );
            }
            Err(e) => error!("error sending done notification: {e}"),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
