//! Credential store boundary.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::Result;

use crate::User;

/// Read/write access to user records, implemented by whatever persistence
/// layer is in use. The auth core needs exactly these operations.
pub trait CredentialStore: Send + Sync {
    fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    fn all_active_users(&self) -> Result<Vec<User>>;

    /// Insert or replace the record keyed by its username.
    fn persist(&self, user: &User) -> Result<()>;
}

/// In-memory credential store for tests and embedding.
#[derive(Default)]
pub struct MemoryCredentialStore {
    users: RwLock<HashMap<String, User>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        let store = Self::new();
        {
            let mut map = store.users.write().unwrap();
            for user in users {
                map.insert(user.username().to_string(), user);
            }
        }
        store
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self.users.read().unwrap().get(username).cloned())
    }

    fn all_active_users(&self) -> Result<Vec<User>> {
        let mut users: Vec<User> = self
            .users
            .read()
            .unwrap()
            .values()
            .filter(|u| u.is_active())
            .cloned()
            .collect();
        users.sort_by(|a, b| a.username().cmp(b.username()));
        Ok(users)
    }

    fn persist(&self, user: &User) -> Result<()> {
        self.users
            .write()
            .unwrap()
            .insert(user.username().to_string(), user.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;
    use chrono::Utc;

    fn user(name: &str, role: Role) -> User {
        User::new(name, "digest", role, Utc::now()).unwrap()
    }

    #[test]
    fn find_by_username_returns_the_persisted_record() {
        let store = MemoryCredentialStore::new();
        store.persist(&user("alice", Role::Gestion)).unwrap();

        let found = store.find_by_username("alice").unwrap().unwrap();
        assert_eq!(found.role(), Role::Gestion);
        assert!(store.find_by_username("nobody").unwrap().is_none());
    }

    #[test]
    fn all_active_users_excludes_deactivated_records() {
        let mut bob = user("bob", Role::Support);
        bob.deactivate(Utc::now()).unwrap();

        let store = MemoryCredentialStore::with_users([user("alice", Role::Admin), bob]);
        let active = store.all_active_users().unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].username(), "alice");
    }

    #[test]
    fn persist_replaces_by_username() {
        let store = MemoryCredentialStore::new();
        store.persist(&user("alice", Role::Support)).unwrap();

        let mut updated = user("alice", Role::Support);
        updated.set_role(Role::Gestion, Role::Admin, Utc::now()).unwrap();
        store.persist(&updated).unwrap();

        let found = store.find_by_username("alice").unwrap().unwrap();
        assert_eq!(found.role(), Role::Gestion);
    }
}
