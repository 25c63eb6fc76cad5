//! Payment gateway bridge.
//!
//! Wraps the third-party card-payment SDK behind a trait: the bridge takes
//! the opaque client secret issued at pay-online initiation and turns it
//! into a confirmed or denied payment result. Confirmation is delegated
//! entirely to the gateway; the only outcome treated as success is an
//! intent whose status is the literal `"succeeded"`.

use crate::types::ClientSecret;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Payment gateway result
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Payment gateway error
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// Card declined by the issuer
    #[error("card declined: {reason}")]
    CardDeclined {
        /// Decline reason from the gateway
        reason: String,
    },

    /// Gateway did not answer in time
    #[error("payment gateway timeout")]
    Timeout,

    /// Any other gateway-reported failure
    #[error("payment error: {message}")]
    Other {
        /// Error message from the gateway
        message: String,
    },
}

/// The gateway's view of one payment attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    /// Gateway-side intent identifier
    pub id: String,
    /// Raw gateway status string
    pub status: String,
}

impl PaymentIntent {
    /// True only for the literal `"succeeded"` status; every other status
    /// is treated as not-paid.
    #[must_use]
    pub fn is_succeeded(&self) -> bool {
        self.status == "succeeded"
    }
}

/// Payment gateway trait
///
/// Abstraction over card-payment SDKs (Stripe-style client confirmation).
/// Production wires the vendor SDK adapter; tests wire
/// [`MockPaymentGateway`].
pub trait PaymentGateway: Send + Sync {
    /// Confirm the payment authorized by `client_secret`
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] when the gateway denies or fails the
    /// confirmation. An `Ok` intent must still be checked with
    /// [`PaymentIntent::is_succeeded`].
    fn confirm_payment(
        &self,
        client_secret: ClientSecret,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<PaymentIntent>> + Send>>;
}

/// Scriptable mock gateway for development and tests
///
/// Outcomes are consumed in FIFO order; when the script is empty every
/// confirmation succeeds. All confirmation calls are recorded.
#[derive(Debug, Default)]
pub struct MockPaymentGateway {
    script: Mutex<VecDeque<GatewayResult<PaymentIntent>>>,
    confirmed: Mutex<Vec<ClientSecret>>,
}

impl MockPaymentGateway {
    /// Create a gateway that succeeds every confirmation
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an Arc-wrapped instance for sharing
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Queue the outcome for the next confirmation
    pub fn push_outcome(&self, outcome: GatewayResult<PaymentIntent>) {
        let mut script = lock(&self.script);
        script.push_back(outcome);
    }

    /// Client secrets confirmed so far, in order
    #[must_use]
    pub fn confirmed_secrets(&self) -> Vec<ClientSecret> {
        lock(&self.confirmed).clone()
    }
}

impl PaymentGateway for MockPaymentGateway {
    fn confirm_payment(
        &self,
        client_secret: ClientSecret,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<PaymentIntent>> + Send>> {
        lock(&self.confirmed).push(client_secret.clone());

        let outcome = lock(&self.script).pop_front().unwrap_or_else(|| {
            Ok(PaymentIntent {
                id: format!("mock_pi_{}", lock(&self.confirmed).len()),
                status: "succeeded".to_string(),
            })
        });

        if let Err(ref err) = outcome {
            tracing::info!(error = %err, "mock gateway denying confirmation");
        }

        Box::pin(async move { outcome })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_succeeded_literal_counts() {
        let succeeded = PaymentIntent {
            id: "pi_1".to_string(),
            status: "succeeded".to_string(),
        };
        let processing = PaymentIntent {
            id: "pi_2".to_string(),
            status: "processing".to_string(),
        };
        let requires_action = PaymentIntent {
            id: "pi_3".to_string(),
            status: "requires_action".to_string(),
        };

        assert!(succeeded.is_succeeded());
        assert!(!processing.is_succeeded());
        assert!(!requires_action.is_succeeded());
    }

    #[tokio::test]
    async fn scripted_outcomes_are_consumed_in_order() {
        let gateway = MockPaymentGateway::new();
        gateway.push_outcome(Err(GatewayError::CardDeclined {
            reason: "insufficient funds".to_string(),
        }));

        let secret = ClientSecret::new("cs_1".to_string());
        let first = gateway.confirm_payment(secret.clone()).await;
        assert!(first.is_err());

        let second = gateway.confirm_payment(secret).await;
        assert!(second.is_ok_and(|intent| intent.is_succeeded()));

        assert_eq!(gateway.confirmed_secrets().len(), 2);
    }
}
