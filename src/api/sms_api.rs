//! Thin client for the backend's SMS broadcast relay. The actual SMS
//! provider sits behind the backend; only the relay contract lives here.

use std::time::Duration;

use serde::Serialize;

use crate::error::{Error, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct BroadcastRequest<'a> {
    message: &'a str,
    recipients: &'a [String],
}

pub struct SmsApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl SmsApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Broadcast one message to every recipient. Returns how many numbers
    /// were handed to the relay.
    pub async fn broadcast(&self, message: &str, recipients: &[String]) -> Result<usize> {
        if message.trim().is_empty() {
            return Err(Error::validation("broadcast message is required"));
        }
        if recipients.is_empty() {
            return Err(Error::validation("at least one recipient is required"));
        }
        let response = self
            .client
            .post(format!("{}/send-sms", self.base_url))
            .json(&BroadcastRequest {
                message,
                recipients,
            })
            .send()
            .await?;
        response.error_for_status()?;
        Ok(recipients.len())
    }
}
