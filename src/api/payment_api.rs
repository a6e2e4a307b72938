//! Server-side purchase verification.
//!
//! The checkout widget's success callback is NOT trusted: entitlement is
//! granted only after `POST /payment/verify` confirms the reference. A
//! failed or unreachable verification surfaces an error and grants nothing.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::bundle::Category;
use crate::models::session::Session;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// What the checkout callback hands us.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentReceipt {
    pub reference: String,
    pub email: String,
    pub booking_id: String,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    verified: bool,
    #[serde(default)]
    message: String,
}

#[allow(async_fn_in_trait)]
pub trait PaymentVerifier {
    async fn verify(&self, receipt: &PaymentReceipt) -> Result<()>;
}

pub struct PaymentApiClient {
    client: reqwest::Client,
    verify_url: String,
}

impl PaymentApiClient {
    pub fn new(verify_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            verify_url: verify_url.into(),
        })
    }
}

impl PaymentVerifier for PaymentApiClient {
    async fn verify(&self, receipt: &PaymentReceipt) -> Result<()> {
        if receipt.reference.trim().is_empty() {
            return Err(Error::validation("payment reference is required"));
        }
        let response = self
            .client
            .post(&self.verify_url)
            .json(receipt)
            .send()
            .await?;
        let response = response.error_for_status()?;
        let body: VerifyResponse = response.json().await?;
        if body.verified {
            Ok(())
        } else {
            Err(Error::Service(format!(
                "payment {} not verified: {}",
                receipt.reference, body.message
            )))
        }
    }
}

/// Verify a receipt and, only on success, grant the session access to the
/// package.
pub async fn confirm_purchase(
    verifier: &impl PaymentVerifier,
    session: &mut Session,
    category: Category,
    receipt: &PaymentReceipt,
) -> Result<()> {
    verifier.verify(receipt).await?;
    session.grant(category);
    Ok(())
}
