// Authentication of payment gateway callbacks.
//
// The gateway signs the request path with a shared secret (hex HMAC-SHA256) and sends the
// digest in `x-payment-signature`. Without a configured secret every callback is refused.

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::shared::infrastructure::http::api_error::ApiError;

pub const HEADER_PAYMENT_SIGNATURE: &str = "x-payment-signature";

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone, Default)]
pub struct PaymentWebhookSecret(Option<Arc<str>>);

impl PaymentWebhookSecret {
    pub fn new(secret: Option<String>) -> Self {
        Self(secret.map(Arc::from))
    }

    fn mac(&self, message: &str) -> Option<HmacSha256> {
        let secret = self.0.as_deref()?;
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
        mac.update(message.as_bytes());
        Some(mac)
    }

    /// Hex digest the gateway is expected to send for `message`.
    pub fn sign(&self, message: &str) -> Option<String> {
        self.mac(message)
            .map(|mac| hex::encode(mac.finalize().into_bytes()))
    }

    pub fn verify(&self, message: &str, signature: &str) -> bool {
        let Ok(signature) = hex::decode(signature.trim()) else {
            return false;
        };
        self.mac(message)
            .is_some_and(|mac| mac.verify_slice(&signature).is_ok())
    }
}

impl std::fmt::Debug for PaymentWebhookSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = if self.0.is_some() { "set" } else { "unset" };
        f.debug_tuple("PaymentWebhookSecret").field(&state).finish()
    }
}

/// Extractor that only admits requests signed by the payment gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentGateway;

impl<S> FromRequestParts<S> for PaymentGateway
where
    S: Send + Sync,
    PaymentWebhookSecret: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let secret = PaymentWebhookSecret::from_ref(state);
        let signature = parts
            .headers
            .get(HEADER_PAYMENT_SIGNATURE)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("missing payment signature"))?;
        if !secret.verify(parts.uri.path(), signature) {
            tracing::warn!(path = parts.uri.path(), "rejected payment callback signature");
            return Err(ApiError::unauthorized("invalid payment signature"));
        }
        Ok(Self)
    }
}

#[cfg(test)]
mod payment_gateway_tests {
    use super::*;
    use axum::http::{Request, StatusCode};
    use rstest::rstest;

    const PATH: &str = "/payments/0192a0de-0000-7000-8000-000000000001/confirm";

    async fn extract(
        secret: &PaymentWebhookSecret,
        signature: Option<&str>,
    ) -> Result<PaymentGateway, ApiError> {
        let mut builder = Request::post(PATH);
        if let Some(signature) = signature {
            builder = builder.header(HEADER_PAYMENT_SIGNATURE, signature);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        PaymentGateway::from_request_parts(&mut parts, secret).await
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_admit_a_request_signed_with_the_shared_secret() {
        let secret = PaymentWebhookSecret::new(Some("whsec_test".to_string()));
        let signature = secret.sign(PATH).unwrap();

        assert_eq!(extract(&secret, Some(&signature)).await.unwrap(), PaymentGateway);
    }

    #[rstest]
    #[case(None)]
    #[case(Some("not-hex"))]
    #[case(Some("00ff"))]
    #[tokio::test]
    async fn it_should_reject_missing_or_wrong_signatures(#[case] signature: Option<&str>) {
        let secret = PaymentWebhookSecret::new(Some("whsec_test".to_string()));

        let error = extract(&secret, signature).await.unwrap_err();
        assert_eq!(error.status, StatusCode::UNAUTHORIZED);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_reject_a_signature_made_for_another_order() {
        let secret = PaymentWebhookSecret::new(Some("whsec_test".to_string()));
        let signature = secret
            .sign("/payments/0192a0de-0000-7000-8000-000000000002/confirm")
            .unwrap();

        assert!(extract(&secret, Some(&signature)).await.is_err());
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_refuse_every_callback_without_a_configured_secret() {
        let signer = PaymentWebhookSecret::new(Some("whsec_test".to_string()));
        let signature = signer.sign(PATH).unwrap();

        let error = extract(&PaymentWebhookSecret::default(), Some(&signature))
            .await
            .unwrap_err();
        assert_eq!(error.status, StatusCode::UNAUTHORIZED);
        assert_eq!(PaymentWebhookSecret::default().sign(PATH), None);
    }
}
