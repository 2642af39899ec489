//! HMAC keys

use std::fmt;

use crate::{error, jwa::Algorithm, jws, SigningSecretRef};

/// An HMAC secret
///
/// The key is the UTF-8 encoding of the configured secret, used as-is
/// rather than base64-decoded, so that tokens interoperate with common JWT
/// libraries configured with the same string.
#[derive(Clone, PartialEq, Eq)]
#[must_use]
pub struct Hmac {
    secret: Vec<u8>,
}

impl fmt::Debug for Hmac {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("Hmac { secret }")
    }
}

impl Hmac {
    /// HMAC using the provided raw secret
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Whether the secret holds no key material
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.secret.is_empty()
    }

    fn key(&self, alg: Algorithm) -> ring::hmac::Key {
        ring::hmac::Key::new(alg.into_ring_algorithm(), &self.secret)
    }
}

impl From<&'_ SigningSecretRef> for Hmac {
    fn from(secret: &SigningSecretRef) -> Self {
        Self::new(secret.as_str().as_bytes())
    }
}

impl jws::Signer for Hmac {
    type Algorithm = Algorithm;
    type Error = std::convert::Infallible;

    fn sign(&self, alg: Self::Algorithm, data: &[u8]) -> Result<Vec<u8>, Self::Error> {
        let digest = ring::hmac::sign(&self.key(alg), data);
        Ok(digest.as_ref().to_owned())
    }
}

impl jws::Verifier for Hmac {
    type Algorithm = Algorithm;
    type Error = error::SignatureMismatch;

    fn verify(
        &self,
        alg: Self::Algorithm,
        data: &[u8],
        signature: &[u8],
    ) -> Result<(), Self::Error> {
        ring::hmac::verify(&self.key(alg), data, signature).map_err(|_| error::signature_mismatch())
    }
}
