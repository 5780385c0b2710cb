use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, Secret};
use sha2::Sha256;

use crate::core::errors::ClientError;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 request signer.
///
/// Signs the canonical, already-encoded payload exactly as it is
/// transmitted; re-encoding or reordering between signing and sending would
/// invalidate the signature.
pub struct RequestSigner {
    secret_key: Secret<String>,
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner").finish_non_exhaustive()
    }
}

impl RequestSigner {
    pub fn new(secret_key: Secret<String>) -> Self {
        Self { secret_key }
    }

    /// Lowercase hex HMAC-SHA256 digest over `payload`. Deterministic and
    /// stateless.
    pub fn sign(&self, payload: &str) -> Result<String, ClientError> {
        let mut mac = HmacSha256::new_from_slice(self.secret_key.expose_secret().as_bytes())
            .map_err(|e| ClientError::Auth(format!("failed to create HMAC: {}", e)))?;
        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Append `&signature=<hex>` to the encoded payload, producing the exact
    /// transmitted form.
    pub fn attach(&self, payload: &str) -> Result<String, ClientError> {
        Ok(format!("{}&signature={}", payload, self.sign(payload)?))
    }
}
