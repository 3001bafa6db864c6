//! Access guard chain.
//!
//! Guards are data: an ordered list of checks evaluated by one function,
//! not nested wrappers. The chain resolves the session exactly once (load,
//! decode, re-check the subject against the credential store) before any
//! guard runs, then applies the guards in declaration order with
//! short-circuiting. Because resolution precedes every guard, the chain's
//! outcome for an unauthenticated caller is independent of guard order.

use crate::{is_allowed, AuthClaims, AuthError, Authenticator, Permission, Role, SessionState};

/// One composable check over the resolved session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    /// Requires a valid, non-expired session. Always satisfied once the
    /// chain has resolved one; listed explicitly so intent shows up in the
    /// chain's definition.
    Authenticated,

    /// Requires the session role to be one of the given roles (OR).
    AnyRole(Vec<Role>),

    /// Requires the session role to hold the permission.
    Can(Permission),
}

impl Guard {
    fn check(&self, claims: &AuthClaims) -> Result<(), AuthError> {
        match self {
            Guard::Authenticated => Ok(()),
            Guard::AnyRole(roles) => {
                if roles.contains(&claims.role) {
                    Ok(())
                } else {
                    Err(AuthError::Forbidden(format!(
                        "requires one of: {}",
                        roles
                            .iter()
                            .map(Role::as_str)
                            .collect::<Vec<_>>()
                            .join(", ")
                    )))
                }
            }
            Guard::Can(permission) => {
                if is_allowed(claims.role, *permission) {
                    Ok(())
                } else {
                    Err(AuthError::missing_permission(*permission))
                }
            }
        }
    }
}

/// Ordered guard list wrapping one business operation.
///
/// Even an empty chain requires a resolvable, active session: every
/// wrapped operation passes through at least the authenticated check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuardChain {
    guards: Vec<Guard>,
}

impl GuardChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Explicit authenticated-only chain.
    pub fn authenticated() -> Self {
        Self::new().with(Guard::Authenticated)
    }

    /// Chain requiring a single permission.
    pub fn can(permission: Permission) -> Self {
        Self::new().with(Guard::Can(permission))
    }

    /// Chain requiring one of the given roles.
    pub fn any_role(roles: impl IntoIterator<Item = Role>) -> Self {
        Self::new().with(Guard::AnyRole(roles.into_iter().collect()))
    }

    /// Append a guard; evaluation order is declaration order.
    pub fn with(mut self, guard: Guard) -> Self {
        self.guards.push(guard);
        self
    }

    pub fn guards(&self) -> &[Guard] {
        &self.guards
    }

    /// Evaluate the chain against the current session.
    ///
    /// Resolution (once, before any guard): no session → `Unauthenticated`;
    /// undecodable token → `Unauthenticated` (fail closed); expired token →
    /// `TokenExpired` so the caller can offer a refresh; subject missing
    /// from the credential store → `Unauthenticated`; subject deactivated →
    /// `Forbidden` (a stale claim never outlives the store). Then guards
    /// run in order and the first failure aborts before the wrapped
    /// operation executes.
    pub fn check(&self, auth: &Authenticator) -> Result<AuthClaims, AuthError> {
        let claims = match auth.current()? {
            SessionState::Authenticated(claims) => claims,
            SessionState::Anonymous | SessionState::Invalid => {
                return Err(AuthError::Unauthenticated)
            }
            SessionState::Expired(_) => return Err(AuthError::TokenExpired),
        };

        auth.verify_active(&claims)?;

        for guard in &self.guards {
            guard.check(&claims)?;
        }
        Ok(claims)
    }
}
