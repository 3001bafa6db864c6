//! User identity records.
//!
//! # Invariants
//! - Usernames are unique (enforced by the credential store) and canonical
//!   lowercase.
//! - Role changes require an Admin or Gestion actor; a user can never
//!   escalate their own role through a profile update.
//! - Users are never hard-deleted, only deactivated, so contracts and
//!   customers keep valid contact references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use solstice_core::{DomainError, DomainResult};

use crate::Role;

/// A stored user: identity, password digest, role and lifecycle flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    username: String,
    password_hash: String,
    role: Role,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        username: &str,
        password_hash: impl Into<String>,
        role: Role,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let username = username.trim().to_lowercase();
        if username.is_empty() {
            return Err(DomainError::validation("username cannot be empty"));
        }
        if username.chars().any(char::is_whitespace) {
            return Err(DomainError::validation("username cannot contain whitespace"));
        }

        Ok(Self {
            username,
            password_hash: password_hash.into(),
            role,
            active: true,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Invariant helper: whether this user may hold a session.
    pub fn can_authenticate(&self) -> bool {
        self.active
    }

    /// Change this user's role.
    ///
    /// Only Admin and Gestion actors may change roles; everyone else gets
    /// `Unauthorized`, including the user acting on their own record.
    pub fn set_role(&mut self, role: Role, actor_role: Role, now: DateTime<Utc>) -> DomainResult<()> {
        if !matches!(actor_role, Role::Admin | Role::Gestion) {
            return Err(DomainError::Unauthorized);
        }
        self.role = role;
        self.updated_at = now;
        Ok(())
    }

    /// Replace the password digest (reset or rotation).
    pub fn set_password_hash(&mut self, password_hash: impl Into<String>, now: DateTime<Utc>) {
        self.password_hash = password_hash.into();
        self.updated_at = now;
    }

    pub fn deactivate(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if !self.active {
            return Err(DomainError::invariant("user is already deactivated"));
        }
        self.active = false;
        self.updated_at = now;
        Ok(())
    }

    pub fn activate(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.active {
            return Err(DomainError::invariant("user is already active"));
        }
        self.active = true;
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn test_user(role: Role) -> User {
        User::new("alice", "phc-digest", role, now()).unwrap()
    }

    #[test]
    fn new_canonicalizes_the_username() {
        let user = User::new("  Alice ", "digest", Role::Support, now()).unwrap();
        assert_eq!(user.username(), "alice");
        assert!(user.is_active());
    }

    #[test]
    fn new_rejects_empty_or_spaced_usernames() {
        assert!(User::new("   ", "digest", Role::Support, now()).is_err());
        assert!(User::new("a b", "digest", Role::Support, now()).is_err());
    }

    #[test]
    fn set_role_requires_an_admin_or_gestion_actor() {
        let mut user = test_user(Role::Commercial);

        let err = user.set_role(Role::Admin, Role::Commercial, now()).unwrap_err();
        assert_eq!(err, DomainError::Unauthorized);
        assert_eq!(user.role(), Role::Commercial);

        user.set_role(Role::Gestion, Role::Gestion, now()).unwrap();
        assert_eq!(user.role(), Role::Gestion);

        user.set_role(Role::Support, Role::Admin, now()).unwrap();
        assert_eq!(user.role(), Role::Support);
    }

    #[test]
    fn self_service_escalation_is_blocked() {
        // A support user acting on their own record cannot raise their role.
        let mut user = test_user(Role::Support);
        let err = user.set_role(Role::Admin, user.role(), now()).unwrap_err();
        assert_eq!(err, DomainError::Unauthorized);
    }

    #[test]
    fn deactivate_then_activate_round_trips() {
        let mut user = test_user(Role::Support);

        user.deactivate(now()).unwrap();
        assert!(!user.can_authenticate());
        assert!(user.deactivate(now()).is_err());

        user.activate(now()).unwrap();
        assert!(user.can_authenticate());
        assert!(user.activate(now()).is_err());
    }

    #[test]
    fn password_reset_touches_updated_at() {
        let mut user = test_user(Role::Gestion);
        let before = user.updated_at();
        let later = before + chrono::Duration::seconds(5);

        user.set_password_hash("new-digest", later);
        assert_eq!(user.password_hash(), "new-digest");
        assert_eq!(user.updated_at(), later);
    }
}
