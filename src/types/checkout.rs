//! Request and response types for the checkout backend's edge functions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::poll::PaymentCheck;

/// Errors surfaced by the checkout backend. Malformed response bodies have no
/// variant here; the closed serde enums reject them at parse time.
#[derive(Error, Debug)]
pub enum CheckoutError {
    /// Non-success HTTP status from an edge function.
    #[error("checkout backend returned {status}: {message}")]
    Backend { status: u16, message: String },
}

/// Body for `create-checkout-session`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateCheckoutRequest {
    pub plan_id: String,
    pub email: String,
    /// Promotional entry code; grants discounted pricing when recognized.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promo_code: Option<String>,
    /// Client-generated key so a retried create call never opens two
    /// sessions.
    pub idempotency_key: Uuid,
}

impl CreateCheckoutRequest {
    pub fn new(plan_id: String, email: String, promo_code: Option<String>) -> Self {
        Self {
            plan_id,
            email,
            promo_code,
            idempotency_key: Uuid::new_v4(),
        }
    }
}

/// Response from `create-checkout-session`.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub session_id: String,
    /// Hosted payment page the user completes the purchase on.
    pub checkout_url: String,
    /// Whether the promo code was recognized and discounted pricing applies.
    #[serde(default)]
    pub promo_applied: bool,
    /// Step payloads the backend fixed in advance (promo entries pin the
    /// plan), keyed by step key.
    #[serde(default)]
    pub prefill: BTreeMap<String, Value>,
}

/// Payment state as reported by `check-payment-status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentState {
    Pending,
    Succeeded,
    Failed,
}

/// Response from `check-payment-status`.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentStatusResponse {
    pub status: PaymentState,
    /// Credentials on success, failure classification on failure.
    #[serde(default)]
    pub payload: Value,
}

impl PaymentStatusResponse {
    /// Collapse the wire response into the poller's check result.
    pub fn into_check(self) -> PaymentCheck {
        match self.status {
            PaymentState::Pending => PaymentCheck::Pending,
            PaymentState::Succeeded => PaymentCheck::Success(self.payload),
            PaymentState::Failed => PaymentCheck::Failure(self.payload),
        }
    }
}

/// Account credentials issued for a confirmed session, from
/// `get-registration-credentials`.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationCredentials {
    pub email: String,
    pub temporary_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_status_parses_lowercase_states() {
        let response: PaymentStatusResponse = serde_json::from_str(
            r#"{"status": "succeeded", "payload": {"email": "a@b.c", "temporary_password": "x"}}"#,
        )
        .unwrap();
        assert_eq!(response.status, PaymentState::Succeeded);

        match response.into_check() {
            PaymentCheck::Success(payload) => assert_eq!(payload["email"], "a@b.c"),
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn test_pending_status_tolerates_missing_payload() {
        let response: PaymentStatusResponse =
            serde_json::from_str(r#"{"status": "pending"}"#).unwrap();
        assert!(matches!(response.into_check(), PaymentCheck::Pending));
    }

    #[test]
    fn test_failed_status_carries_reason() {
        let response: PaymentStatusResponse =
            serde_json::from_str(r#"{"status": "failed", "payload": {"reason": "declined"}}"#)
                .unwrap();
        match response.into_check() {
            PaymentCheck::Failure(payload) => assert_eq!(payload["reason"], "declined"),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_session_parses_without_optional_fields() {
        let session: CheckoutSession = serde_json::from_str(
            r#"{"session_id": "cs_123", "checkout_url": "https://pay.example/cs_123"}"#,
        )
        .unwrap();
        assert!(!session.promo_applied);
        assert!(session.prefill.is_empty());
    }

    #[test]
    fn test_create_request_omits_absent_promo_code() {
        let request = CreateCheckoutRequest::new("quarterly".to_string(), "a@b.c".to_string(), None);
        let wire = serde_json::to_value(&request).unwrap();
        assert!(wire.get("promo_code").is_none());
        assert!(wire.get("idempotency_key").is_some());
    }
}
