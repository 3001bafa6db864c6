//! Session authentication state machine.
//!
//! States: Anonymous → Authenticating → Authenticated → Expired/Invalid →
//! Anonymous. The authenticator owns token issuance; the session store owns
//! persistence; guards only ever read.

use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::{
    password::verify_password, AuthClaims, AuthError, CredentialStore, Role, SessionStore,
    TokenCodec, TokenError, User,
};

/// Token lifetime: 4 hours from issuance.
pub const TOKEN_TTL_SECS: i64 = 4 * 60 * 60;

/// How long past expiry a token can still be refreshed (signature must
/// still verify; only the identity is reused, never the stale role).
pub const REFRESH_GRACE_SECS: i64 = 60 * 60;

/// Where the persisted session currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No session persisted.
    Anonymous,
    /// A signature-valid, non-expired token.
    Authenticated(AuthClaims),
    /// Signature valid but past expiry; the identity is retained so the
    /// caller can offer a refresh.
    Expired(AuthClaims),
    /// Undecodable token. Treated exactly like Anonymous for permission
    /// purposes (fail closed).
    Invalid,
}

/// Validates credentials, issues tokens, and manages the session lifecycle.
pub struct Authenticator {
    credentials: Arc<dyn CredentialStore>,
    sessions: Arc<dyn SessionStore>,
    codec: TokenCodec,
    ttl: Duration,
}

impl Authenticator {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        sessions: Arc<dyn SessionStore>,
        codec: TokenCodec,
    ) -> Self {
        Self {
            credentials,
            sessions,
            codec,
            ttl: Duration::seconds(TOKEN_TTL_SECS),
        }
    }

    /// Override the token lifetime (tests, short-lived deployments).
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn credentials(&self) -> &dyn CredentialStore {
        self.credentials.as_ref()
    }

    /// Authenticate `username`/`password` and persist a fresh session.
    ///
    /// Unknown user, inactive account and wrong password are deliberately
    /// indistinguishable to the caller; the distinction exists only in debug
    /// logs. Any stale session is cleared before the attempt, so a failed
    /// login never leaves partial state behind.
    pub fn login(&self, username: &str, password: &str) -> Result<AuthClaims, AuthError> {
        self.sessions.clear().map_err(AuthError::storage)?;

        let user = self
            .credentials
            .find_by_username(username)
            .map_err(AuthError::storage)?;

        let Some(user) = user else {
            tracing::debug!(username, "login rejected: unknown username");
            return Err(AuthError::InvalidCredentials);
        };
        if !user.can_authenticate() {
            tracing::debug!(username, "login rejected: account deactivated");
            return Err(AuthError::InvalidCredentials);
        }
        if !verify_password(user.password_hash(), password) {
            tracing::debug!(username, "login rejected: password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let claims = AuthClaims::new(user.username(), user.role(), Utc::now(), self.ttl);
        let token = self.codec.encode(&claims)?;
        self.sessions.save(&token).map_err(AuthError::storage)?;

        tracing::info!(username = %claims.username, role = %claims.role, "login");
        Ok(claims)
    }

    /// Resolve the persisted session without mutating it.
    pub fn current(&self) -> Result<SessionState, AuthError> {
        let Some(token) = self.sessions.load().map_err(AuthError::storage)? else {
            return Ok(SessionState::Anonymous);
        };

        match self.codec.decode(&token, Utc::now()) {
            Ok(claims) => Ok(SessionState::Authenticated(claims)),
            Err(TokenError::Expired) => match self.codec.decode_allow_expired(&token) {
                Ok(claims) => Ok(SessionState::Expired(claims)),
                Err(_) => Ok(SessionState::Invalid),
            },
            Err(TokenError::Invalid) => Ok(SessionState::Invalid),
        }
    }

    /// The role of the current session, if one is authenticated.
    pub fn current_role(&self) -> Result<Option<Role>, AuthError> {
        match self.current()? {
            SessionState::Authenticated(claims) => Ok(Some(claims.role)),
            _ => Ok(None),
        }
    }

    /// Re-issue the session token with a fresh expiry.
    ///
    /// The old token must be signature-valid and at most [`REFRESH_GRACE_SECS`]
    /// past expiry. The role is re-read from the credential store, so a
    /// stale or forged role claim cannot survive a refresh.
    pub fn refresh(&self) -> Result<AuthClaims, AuthError> {
        let Some(token) = self.sessions.load().map_err(AuthError::storage)? else {
            return Err(AuthError::Unauthenticated);
        };

        let old = self.codec.decode_allow_expired(&token)?;
        let now = Utc::now();
        if now.timestamp() >= old.exp + REFRESH_GRACE_SECS {
            return Err(AuthError::TokenExpired);
        }

        let user = self
            .credentials
            .find_by_username(&old.username)
            .map_err(AuthError::storage)?;
        let Some(user) = user else {
            tracing::debug!(username = %old.username, "refresh rejected: user gone");
            return Err(AuthError::InvalidCredentials);
        };
        if !user.can_authenticate() {
            return Err(AuthError::Forbidden("account is deactivated".into()));
        }

        let claims = AuthClaims::new(user.username(), user.role(), now, self.ttl);
        let fresh = self.codec.encode(&claims)?;
        self.sessions.save(&fresh).map_err(AuthError::storage)?;

        tracing::info!(username = %claims.username, role = %claims.role, "session refreshed");
        Ok(claims)
    }

    /// Drop the session. Idempotent: logging out twice is fine.
    pub fn logout(&self) -> Result<(), AuthError> {
        self.sessions.clear().map_err(AuthError::storage)?;
        tracing::info!("logout");
        Ok(())
    }

    /// At-call-time identity re-check for guards: the subject must still
    /// exist and still be active, whatever the token claims.
    pub(crate) fn verify_active(&self, claims: &AuthClaims) -> Result<User, AuthError> {
        let user = self
            .credentials
            .find_by_username(&claims.username)
            .map_err(AuthError::storage)?;
        let Some(user) = user else {
            return Err(AuthError::Unauthenticated);
        };
        if !user.can_authenticate() {
            return Err(AuthError::Forbidden("account is deactivated".into()));
        }
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{hash_password, MemoryCredentialStore, MemorySessionStore};

    fn fixture(users: Vec<User>) -> (Authenticator, Arc<MemorySessionStore>) {
        let sessions = Arc::new(MemorySessionStore::new());
        let auth = Authenticator::new(
            Arc::new(MemoryCredentialStore::with_users(users)),
            sessions.clone(),
            TokenCodec::new("test-secret").unwrap(),
        );
        (auth, sessions)
    }

    fn user(name: &str, password: &str, role: Role) -> User {
        User::new(name, hash_password(password).unwrap(), role, Utc::now()).unwrap()
    }

    #[test]
    fn login_issues_a_commercial_token_with_four_hour_expiry() {
        let (auth, _) = fixture(vec![user("carla", "pw", Role::Commercial)]);

        let claims = auth.login("carla", "pw").unwrap();
        assert_eq!(claims.role, Role::Commercial);
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL_SECS);

        match auth.current().unwrap() {
            SessionState::Authenticated(current) => assert_eq!(current, claims),
            other => panic!("expected authenticated session, got {other:?}"),
        }
    }

    #[test]
    fn three_wrong_passwords_leave_no_session_behind() {
        let (auth, _) = fixture(vec![user("carla", "pw", Role::Commercial)]);

        for _ in 0..3 {
            let err = auth.login("carla", "wrong").unwrap_err();
            assert!(matches!(err, AuthError::InvalidCredentials));
            assert_eq!(auth.current().unwrap(), SessionState::Anonymous);
        }
    }

    #[test]
    fn unknown_user_and_inactive_user_fail_identically() {
        let mut dora = user("dora", "pw", Role::Support);
        dora.deactivate(Utc::now()).unwrap();
        let (auth, _) = fixture(vec![dora]);

        let unknown = auth.login("nobody", "pw").unwrap_err();
        let inactive = auth.login("dora", "pw").unwrap_err();
        assert_eq!(unknown.to_string(), inactive.to_string());
    }

    #[test]
    fn failed_login_clears_a_previous_session() {
        let (auth, _) = fixture(vec![user("carla", "pw", Role::Commercial)]);

        auth.login("carla", "pw").unwrap();
        let _ = auth.login("carla", "wrong").unwrap_err();
        assert_eq!(auth.current().unwrap(), SessionState::Anonymous);
    }

    #[test]
    fn logout_then_current_is_anonymous_from_any_state() {
        let (auth, _) = fixture(vec![user("carla", "pw", Role::Commercial)]);

        // From authenticated.
        auth.login("carla", "pw").unwrap();
        auth.logout().unwrap();
        assert_eq!(auth.current().unwrap(), SessionState::Anonymous);

        // Idempotent from anonymous.
        auth.logout().unwrap();
        assert_eq!(auth.current().unwrap(), SessionState::Anonymous);
    }

    #[test]
    fn current_reports_expired_but_keeps_the_identity() {
        let (auth, sessions) = fixture(vec![user("carla", "pw", Role::Commercial)]);

        let codec = TokenCodec::new("test-secret").unwrap();
        let stale = AuthClaims::new(
            "carla",
            Role::Commercial,
            Utc::now() - Duration::hours(5),
            Duration::hours(4),
        );
        sessions.save(&codec.encode(&stale).unwrap()).unwrap();

        match auth.current().unwrap() {
            SessionState::Expired(claims) => assert_eq!(claims.username, "carla"),
            other => panic!("expected expired session, got {other:?}"),
        }
        assert_eq!(auth.current_role().unwrap(), None);
    }

    #[test]
    fn tampered_token_is_invalid_and_role_less() {
        let (auth, sessions) = fixture(vec![user("carla", "pw", Role::Commercial)]);

        auth.login("carla", "pw").unwrap();
        let token = sessions.load().unwrap().unwrap();
        let mut tampered = token.clone();
        tampered.push('x');
        sessions.save(&tampered).unwrap();

        assert_eq!(auth.current().unwrap(), SessionState::Invalid);
        assert_eq!(auth.current_role().unwrap(), None);
    }

    #[test]
    fn refresh_picks_up_a_role_change_from_the_store() {
        let carla = user("carla", "pw", Role::Commercial);
        let (auth, _) = fixture(vec![carla.clone()]);

        let before = auth.login("carla", "pw").unwrap();
        assert_eq!(before.role, Role::Commercial);

        // Promotion lands in the credential store after issuance.
        let mut promoted = carla;
        promoted.set_role(Role::Gestion, Role::Admin, Utc::now()).unwrap();
        auth.credentials().persist(&promoted).unwrap();

        let after = auth.refresh().unwrap();
        assert_eq!(after.role, Role::Gestion);
    }

    #[test]
    fn refresh_within_grace_succeeds_but_beyond_grace_fails() {
        let (auth, sessions) = fixture(vec![user("carla", "pw", Role::Commercial)]);
        let codec = TokenCodec::new("test-secret").unwrap();

        // Expired 30 minutes ago: inside the 1h grace window.
        let recent = AuthClaims::new(
            "carla",
            Role::Commercial,
            Utc::now() - Duration::minutes(270),
            Duration::hours(4),
        );
        sessions.save(&codec.encode(&recent).unwrap()).unwrap();
        assert!(auth.refresh().is_ok());

        // Expired two hours ago: outside the window.
        let ancient = AuthClaims::new(
            "carla",
            Role::Commercial,
            Utc::now() - Duration::hours(6),
            Duration::hours(4),
        );
        sessions.save(&codec.encode(&ancient).unwrap()).unwrap();
        let err = auth.refresh().unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired));
    }

    #[test]
    fn refresh_without_a_session_is_unauthenticated() {
        let (auth, _) = fixture(vec![user("carla", "pw", Role::Commercial)]);
        assert!(matches!(auth.refresh().unwrap_err(), AuthError::Unauthenticated));
    }

    #[test]
    fn refresh_fails_closed_for_a_deactivated_user() {
        let carla = user("carla", "pw", Role::Commercial);
        let (auth, _) = fixture(vec![carla.clone()]);
        auth.login("carla", "pw").unwrap();

        let mut gone = carla;
        gone.deactivate(Utc::now()).unwrap();
        auth.credentials().persist(&gone).unwrap();

        assert!(matches!(auth.refresh().unwrap_err(), AuthError::Forbidden(_)));
    }
}
