use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::Role;

/// Signed-token claims (transport-agnostic).
///
/// Wire format: `username`, `role` and numeric `iat`/`exp` timestamps.
/// Unknown extra claims are ignored on decode, so tokens minted by newer
/// builds stay readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthClaims {
    /// Subject identity.
    pub username: String,

    /// Role granted at issuance.
    pub role: Role,

    /// Issued-at (Unix timestamp, seconds).
    pub iat: i64,

    /// Expiry (Unix timestamp, seconds).
    pub exp: i64,
}

impl AuthClaims {
    /// Build claims for `username`/`role`, valid from `now` for `ttl`.
    pub fn new(username: impl Into<String>, role: Role, now: DateTime<Utc>, ttl: Duration) -> Self {
        let iat = now.timestamp();
        Self {
            username: username.into(),
            role,
            iat,
            exp: iat + ttl.num_seconds(),
        }
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.iat, 0)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// Strict expiry check: a token whose expiry equals `now` is expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_sets_expiry_relative_to_issue_time() {
        let now = Utc::now();
        let claims = AuthClaims::new("alice", Role::Commercial, now, Duration::hours(4));
        assert_eq!(claims.exp - claims.iat, 4 * 3600);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.role, Role::Commercial);
    }

    #[test]
    fn expiry_boundary_counts_as_expired() {
        let now = Utc::now();
        let claims = AuthClaims::new("alice", Role::Support, now, Duration::hours(1));
        let at_expiry = DateTime::from_timestamp(claims.exp, 0).unwrap();
        assert!(claims.is_expired_at(at_expiry));
        assert!(!claims.is_expired_at(at_expiry - Duration::seconds(1)));
    }

    #[test]
    fn decode_ignores_unknown_extra_claims() {
        let json = r#"{"username":"bob","role":"gestion","iat":1700000000,"exp":1700014400,"iss":"legacy","scope":"all"}"#;
        let claims: AuthClaims = serde_json::from_str(json).unwrap();
        assert_eq!(claims.username, "bob");
        assert_eq!(claims.role, Role::Gestion);
    }
}
