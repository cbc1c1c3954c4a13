use ed25519_dalek::{Signature, VerifyingKey};

use crate::error::{AppError, AppResult};

pub const SIGNATURE_HEADER: &str = "x-signature-ed25519";
pub const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

/// Checks the ed25519 signature Discord attaches to every interaction request.
pub struct InteractionVerifier {
    key: VerifyingKey,
}

impl InteractionVerifier {
    /// `public_key` is the hex-encoded application public key from the developer portal.
    pub fn from_hex(public_key: &str) -> AppResult<Self> {
        let bytes: [u8; 32] = decode_fixed(public_key.trim()).ok_or_else(|| {
            AppError::Configuration("DISCORD_PUBLIC_KEY must be 32 hex-encoded bytes".to_string())
        })?;
        let key = VerifyingKey::from_bytes(&bytes).map_err(|err| {
            AppError::Configuration(format!("invalid DISCORD_PUBLIC_KEY: {err}"))
        })?;
        Ok(Self { key })
    }

    pub fn verify(&self, timestamp: &str, signature: &str, body: &[u8]) -> AppResult<()> {
        let bytes: [u8; 64] = decode_fixed(signature.trim()).ok_or(AppError::Signature)?;
        let signature = Signature::from_bytes(&bytes);

        let mut message = Vec::with_capacity(timestamp.len() + body.len());
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(body);

        self.key
            .verify_strict(&message, &signature)
            .map_err(|_| AppError::Signature)
    }
}

fn decode_fixed<const N: usize>(raw: &str) -> Option<[u8; N]> {
    hex::decode(raw).ok()?.try_into().ok()
}

#[cfg(test)]
pub(crate) mod tests {
    use ed25519_dalek::{Signer, SigningKey};

    use super::*;

    pub(crate) fn signing_key() -> SigningKey {
        SigningKey::from_bytes(&[7u8; 32])
    }

    pub(crate) fn verifier() -> InteractionVerifier {
        InteractionVerifier::from_hex(&hex::encode(signing_key().verifying_key().as_bytes()))
            .expect("verifier")
    }

    pub(crate) fn sign(timestamp: &str, body: &str) -> String {
        let message = format!("{timestamp}{body}");
        hex::encode(signing_key().sign(message.as_bytes()).to_bytes())
    }

    #[test]
    fn accepts_valid_signature() {
        let body = r#"{"type":1}"#;
        let signature = sign("1700000000", body);
        verifier()
            .verify("1700000000", &signature, body.as_bytes())
            .expect("valid signature");
    }

    #[test]
    fn rejects_tampered_body_and_timestamp() {
        let signature = sign("1700000000", r#"{"type":1}"#);
        let verifier = verifier();
        assert!(matches!(
            verifier.verify("1700000000", &signature, br#"{"type":2}"#),
            Err(AppError::Signature)
        ));
        assert!(matches!(
            verifier.verify("1700000001", &signature, br#"{"type":1}"#),
            Err(AppError::Signature)
        ));
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(matches!(
            verifier().verify("1", "not-hex", b"{}"),
            Err(AppError::Signature)
        ));
        assert!(InteractionVerifier::from_hex("abcd").is_err());
    }
}
