//! Signed-token codec (JWT, HS256, single shared secret).

use anyhow::bail;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::AuthClaims;

/// Token decode failure.
///
/// Callers must be able to tell an expired-but-genuine token (prompt to
/// refresh) from a forged or malformed one (reject outright), so the two
/// kinds stay distinct.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Signature verified, but the expiry has passed.
    #[error("token has expired")]
    Expired,

    /// Signature did not verify, or the token is structurally malformed.
    #[error("token is invalid")]
    Invalid,
}

/// Encodes and decodes [`AuthClaims`] under one shared secret.
///
/// The secret is configuration, not a per-call argument; an empty secret is a
/// startup error, never a silent accept.
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(secret: &str) -> anyhow::Result<Self> {
        if secret.trim().is_empty() {
            bail!("token secret must not be empty");
        }

        // Expiry is checked by us (strictly, with zero leeway) after the
        // signature verifies, so the library check stays off.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    pub fn encode(&self, claims: &AuthClaims) -> Result<String, TokenError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|_| TokenError::Invalid)
    }

    /// Decode and fully validate a token.
    ///
    /// `exp == now` counts as expired. Any signature or structure problem is
    /// [`TokenError::Invalid`]; no partial data escapes.
    pub fn decode(&self, token: &str, now: DateTime<Utc>) -> Result<AuthClaims, TokenError> {
        let claims = self.decode_allow_expired(token)?;
        if claims.is_expired_at(now) {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    /// Decode with the signature enforced but the expiry ignored.
    ///
    /// Used by refresh to recover the identity from a recently expired
    /// token. The caller owns the expiry policy.
    pub fn decode_allow_expired(&self, token: &str) -> Result<AuthClaims, TokenError> {
        jsonwebtoken::decode::<AuthClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| TokenError::Invalid)
    }
}
