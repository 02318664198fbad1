//! Checkout backend client with retry logic.
//!
//! Wraps the backend's edge functions with exponential backoff retry for
//! transient failures. Payment-status checks are deliberately not retried
//! here: the payment monitor owns that budget, and double-retrying would
//! stretch its backoff schedule.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, instrument, warn};

use crate::config::CheckoutConfig;
use crate::poll::{PaymentCheck, StatusProbe};
use crate::types::checkout::{
    CheckoutError, CheckoutSession, CreateCheckoutRequest, PaymentStatusResponse,
    RegistrationCredentials,
};

/// HTTP client for the checkout backend.
pub struct CheckoutClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: Option<String>,
    /// Maximum retry attempts for session/credential calls
    max_retries: usize,
    /// Base delay for exponential backoff
    base_delay: Duration,
    /// Maximum delay between retries
    max_delay: Duration,
}

impl CheckoutClient {
    pub fn new(config: &CheckoutConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        })
    }

    /// Build the retry strategy
    fn retry_strategy(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.base_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries)
    }

    /// Check if an error is retryable
    fn should_retry(err: &anyhow::Error) -> bool {
        // Backend errors carry their status; only 5xx is transient
        if let Some(CheckoutError::Backend { status, .. }) = err.downcast_ref::<CheckoutError>() {
            return *status >= 500;
        }

        let err_str = err.to_string().to_lowercase();
        err_str.contains("timeout")
            || err_str.contains("connection")
            || err_str.contains("temporary")
    }

    fn endpoint(&self, function: &str) -> String {
        format!("{}/functions/v1/{function}", self.base_url)
    }

    async fn post_json<B: Serialize + Sync, R: DeserializeOwned>(
        &self,
        function: &str,
        body: &B,
    ) -> Result<R> {
        let mut request = self.http.post(self.endpoint(function)).json(body);
        if let Some(key) = &self.anon_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to reach checkout function {function}"))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CheckoutError::Backend {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        response
            .json()
            .await
            .with_context(|| format!("Malformed response from checkout function {function}"))
    }

    /// Open a checkout session for a selected plan, retrying transient
    /// failures.
    #[instrument(skip(self, request))]
    pub async fn create_checkout_session(
        &self,
        request: &CreateCheckoutRequest,
    ) -> Result<CheckoutSession> {
        let op = || async { self.post_json("create-checkout-session", request).await };

        op.retry(self.retry_strategy())
            .when(Self::should_retry)
            .notify(|err, dur| {
                warn!("Retrying create_checkout_session after {:?}: {}", dur, err);
            })
            .await
    }

    /// Fetch the credentials issued for a confirmed session.
    #[instrument(skip(self))]
    pub async fn fetch_credentials(&self, session_id: &str) -> Result<RegistrationCredentials> {
        let body = json!({ "session_id": session_id });
        let op = || async { self.post_json("get-registration-credentials", &body).await };

        op.retry(self.retry_strategy())
            .when(Self::should_retry)
            .notify(|err, dur| {
                warn!("Retrying fetch_credentials after {:?}: {}", dur, err);
            })
            .await
    }

    /// Single payment-status check. No retry here; the payment monitor's
    /// attempt budget governs re-checks.
    #[instrument(skip(self))]
    pub async fn check_payment_status(&self, session_id: &str) -> Result<PaymentCheck> {
        let body = json!({ "session_id": session_id });
        let response: PaymentStatusResponse = self.post_json("check-payment-status", &body).await?;
        debug!(status = ?response.status, "payment status checked");
        Ok(response.into_check())
    }
}

/// Status probe bound to one checkout session.
pub struct SessionProbe {
    client: Arc<CheckoutClient>,
    session_id: String,
}

impl SessionProbe {
    pub fn new(client: Arc<CheckoutClient>, session_id: impl Into<String>) -> Self {
        Self {
            client,
            session_id: session_id.into(),
        }
    }
}

#[async_trait]
impl StatusProbe for SessionProbe {
    async fn check(&self) -> Result<PaymentCheck> {
        self.client.check_payment_status(&self.session_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> CheckoutConfig {
        CheckoutConfig {
            api_base_url: "https://project.supabase.co/".to_string(),
            anon_key: None,
            poll_base_delay_ms: 5000,
            poll_max_delay_ms: 60000,
            poll_max_attempts: 20,
            request_timeout_secs: 30,
            max_retries: 3,
        }
    }

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let client = CheckoutClient::new(&test_config()).unwrap();
        assert_eq!(
            client.endpoint("check-payment-status"),
            "https://project.supabase.co/functions/v1/check-payment-status"
        );
    }

    #[test]
    fn test_should_retry_classification() {
        let server_err: anyhow::Error = CheckoutError::Backend {
            status: 503,
            message: "unavailable".to_string(),
        }
        .into();
        assert!(CheckoutClient::should_retry(&server_err));

        let auth_err: anyhow::Error = CheckoutError::Backend {
            status: 401,
            message: "unauthorized".to_string(),
        }
        .into();
        assert!(!CheckoutClient::should_retry(&auth_err));

        let transport_err = anyhow::anyhow!("Connection reset by peer");
        assert!(CheckoutClient::should_retry(&transport_err));

        let other = anyhow::anyhow!("malformed response");
        assert!(!CheckoutClient::should_retry(&other));
    }
}
