//! Checkout signature verification.
//!
//! The hosted checkout reports `(order_id, payment_id, signature)`; the claim
//! is trusted only if `signature == hex(HMAC-SHA256(key_secret,
//! order_id + "|" + payment_id))`. The key secret stays in this process.

use secrecy::{ExposeSecret, Secret};
use service_core::utils::{hmac_sha256_hex, verify_hmac_sha256_hex};

use crate::error::{PaymentError, VERIFY_REQUIRED_FIELDS};
use crate::services::metrics;

const VERIFY_CONTEXT: &str = "Failed to verify payment";

#[derive(Clone)]
pub struct VerificationService {
    key_secret: Secret<String>,
}

fn signed_payload(order_id: &str, payment_id: &str) -> String {
    format!("{}|{}", order_id, payment_id)
}

impl VerificationService {
    pub fn new(key_secret: Secret<String>) -> Self {
        Self { key_secret }
    }

    fn secret(&self) -> Result<&str, PaymentError> {
        let secret = self.key_secret.expose_secret();
        if secret.is_empty() {
            // An empty key would make every signature forgeable.
            return Err(PaymentError::Internal {
                context: VERIFY_CONTEXT,
                details: "Razorpay key secret not configured".to_string(),
            });
        }
        Ok(secret)
    }

    /// Signature the provider would have produced for this order/payment pair.
    pub fn expected_signature(
        &self,
        order_id: &str,
        payment_id: &str,
    ) -> Result<String, PaymentError> {
        hmac_sha256_hex(self.secret()?, &signed_payload(order_id, payment_id)).map_err(|e| {
            PaymentError::Internal {
                context: VERIFY_CONTEXT,
                details: e.to_string(),
            }
        })
    }

    /// Returns whether the signature matches. A mismatch is `Ok(false)`, not
    /// an error; only missing input or an unusable key fail.
    pub fn verify_payment(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<bool, PaymentError> {
        if order_id.is_empty() || payment_id.is_empty() || signature.is_empty() {
            tracing::warn!("Rejected verification request with missing fields");
            return Err(PaymentError::InvalidRequest(VERIFY_REQUIRED_FIELDS));
        }

        let verified = verify_hmac_sha256_hex(
            self.secret()?,
            &signed_payload(order_id, payment_id),
            signature,
        )
        .map_err(|e| PaymentError::Internal {
            context: VERIFY_CONTEXT,
            details: e.to_string(),
        })?;

        if verified {
            tracing::info!(
                order_id = %order_id,
                payment_id = %payment_id,
                "Payment signature verified successfully"
            );
        } else {
            tracing::warn!(
                order_id = %order_id,
                payment_id = %payment_id,
                "Payment signature verification failed"
            );
        }
        metrics::record_verification(verified);

        Ok(verified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> VerificationService {
        VerificationService::new(Secret::new("my_secret_key".to_string()))
    }

    #[test]
    fn matching_signature_verifies() {
        let verifier = service();
        let signature = hmac_sha256_hex("my_secret_key", "order_123|pay_456").unwrap();

        assert_eq!(
            verifier.expected_signature("order_123", "pay_456").unwrap(),
            signature
        );
        assert!(verifier
            .verify_payment("order_123", "pay_456", &signature)
            .unwrap());
    }

    #[test]
    fn verification_is_idempotent() {
        let verifier = service();
        let signature = verifier.expected_signature("order_1", "pay_1").unwrap();

        assert!(verifier.verify_payment("order_1", "pay_1", &signature).unwrap());
        assert!(verifier.verify_payment("order_1", "pay_1", &signature).unwrap());
    }

    #[test]
    fn any_single_character_mutation_fails() {
        let verifier = service();
        let signature = verifier.expected_signature("order_1", "pay_1").unwrap();

        for index in 0..signature.len() {
            let mut mutated: Vec<char> = signature.chars().collect();
            mutated[index] = if mutated[index] == '0' { '1' } else { '0' };
            let mutated: String = mutated.into_iter().collect();

            assert!(
                !verifier.verify_payment("order_1", "pay_1", &mutated).unwrap(),
                "mutation at {index} verified"
            );
        }
    }

    #[test]
    fn signature_is_bound_to_order_and_payment() {
        let verifier = service();
        let signature = verifier.expected_signature("order_1", "pay_1").unwrap();

        assert!(!verifier.verify_payment("order_2", "pay_1", &signature).unwrap());
        assert!(!verifier.verify_payment("order_1", "pay_2", &signature).unwrap());
    }

    #[test]
    fn foreign_signature_fails() {
        assert!(!service()
            .verify_payment("order_1", "pay_1", "deadbeef")
            .unwrap());
    }

    #[test]
    fn missing_fields_are_invalid_requests() {
        let verifier = service();
        for (order_id, payment_id, signature) in [
            ("", "pay_1", "abc"),
            ("order_1", "", "abc"),
            ("order_1", "pay_1", ""),
        ] {
            let err = verifier
                .verify_payment(order_id, payment_id, signature)
                .unwrap_err();
            assert!(matches!(
                err,
                PaymentError::InvalidRequest(VERIFY_REQUIRED_FIELDS)
            ));
        }
    }

    #[test]
    fn empty_secret_refuses_to_verify() {
        let verifier = VerificationService::new(Secret::new(String::new()));
        let forged = hmac_sha256_hex("", "order_1|pay_1").unwrap();

        let err = verifier
            .verify_payment("order_1", "pay_1", &forged)
            .unwrap_err();
        assert!(matches!(err, PaymentError::Internal { .. }));
    }
}
