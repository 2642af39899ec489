//! Deterministic bearer tokens derived from long-lived credentials

use crate::{
    clock::{Clock, System, UnixTime},
    error::SigningError,
    jwa::{self, Hmac},
    jwt::{Claims, Headers, Jwt, JwtRef},
    LongLivedCredential,
};

/// A signed bearer token
pub type BearerToken = Jwt;

/// A bearer token together with its validity window
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuedToken {
    token: BearerToken,
    issued: UnixTime,
    expiry: UnixTime,
}

/// Where a token stands relative to its validity window
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenStatus {
    /// Issued in the future
    NotYetValid,
    /// Within its validity window
    Valid,
    /// Past its expiry
    Expired,
}

impl IssuedToken {
    /// The signed token
    #[inline]
    pub fn token(&self) -> &JwtRef {
        &self.token
    }

    /// Takes the signed token
    #[inline]
    pub fn into_token(self) -> BearerToken {
        self.token
    }

    /// The `iat` claim
    #[inline]
    #[must_use]
    pub fn issued(&self) -> UnixTime {
        self.issued
    }

    /// The `exp` claim
    #[inline]
    #[must_use]
    pub fn expiry(&self) -> UnixTime {
        self.expiry
    }

    /// Gets the token's current status
    #[inline]
    #[must_use]
    pub fn token_status(&self) -> TokenStatus {
        self.token_status_with_clock(&System)
    }

    /// Gets the token's status based on the current time as reported by the
    /// provided clock
    #[inline]
    #[must_use]
    pub fn token_status_with_clock<C: Clock>(&self, clock: &C) -> TokenStatus {
        self.token_status_at(clock.now())
    }

    /// Gets the token's status as of the provided time
    #[must_use]
    pub fn token_status_at(&self, time: UnixTime) -> TokenStatus {
        if time < self.issued {
            TokenStatus::NotYetValid
        } else if time < self.expiry {
            TokenStatus::Valid
        } else {
            TokenStatus::Expired
        }
    }
}

/// Signs bearer tokens for long-lived credentials
///
/// The token's claims are taken entirely from the credential: `iss` is the
/// credential id, `iat` its creation time, and `exp` the creation time plus
/// the bearer lifetime. Nothing random or clock-dependent goes in, so the
/// same credential always yields the same string.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TokenSigner {
    alg: jwa::Algorithm,
}

impl TokenSigner {
    /// A signer using HS256
    pub const fn new() -> Self {
        Self {
            alg: jwa::Algorithm::HS256,
        }
    }

    /// Uses a different HMAC algorithm
    #[must_use]
    pub const fn with_algorithm(self, alg: jwa::Algorithm) -> Self {
        Self { alg }
    }

    /// The algorithm tokens are signed with
    #[must_use]
    pub const fn algorithm(&self) -> jwa::Algorithm {
        self.alg
    }

    /// Derives the bearer token for `credential`
    ///
    /// # Errors
    ///
    /// * [`SigningError::EmptySecret`] if the credential has no signing secret
    /// * [`SigningError::NegativeLifetime`] if the token would expire before it is issued
    /// * [`SigningError::TimestampOutOfRange`] if the creation time precedes the Unix
    ///   epoch or the expiry overflows
    pub fn sign(&self, credential: &LongLivedCredential) -> Result<IssuedToken, SigningError> {
        let key = Hmac::from(credential.signing_secret());
        if key.is_empty() {
            return Err(SigningError::EmptySecret);
        }

        let lifetime = credential.bearer_lifetime();
        if lifetime.is_negative() {
            return Err(SigningError::NegativeLifetime {
                secs: lifetime.as_secs(),
            });
        }

        let issued = UnixTime::from_datetime(credential.created_at())
            .ok_or(SigningError::TimestampOutOfRange)?;
        let expiry = issued
            .checked_add(lifetime)
            .ok_or(SigningError::TimestampOutOfRange)?;

        let claims = Claims::new(credential.id().to_owned(), issued, expiry);
        let token = Jwt::try_from_parts_with_signature(&Headers::new(self.alg), &claims, &key)?;

        Ok(IssuedToken {
            token,
            issued,
            expiry,
        })
    }
}
