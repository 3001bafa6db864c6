//! JSON-file persistence for users and CRM records.
//!
//! Each collection lives in one file under the data directory and is read
//! on every operation (the working set is a handful of records; freshness
//! beats caching for a multi-invocation terminal tool). Writes go through
//! write-to-temp-then-rename so a crash can never leave a half-written
//! collection behind.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

use solstice_auth::{CredentialStore, User};
use solstice_contracts::Contract;
use solstice_core::{ContractId, CustomerId, EventId};
use solstice_events::Event;
use solstice_parties::Customer;

fn read_collection<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    match fs::read(path) {
        Ok(bytes) => serde_json::from_slice(&bytes)
            .with_context(|| format!("parsing {}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
    }
}

fn write_collection<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    let tmp = path.with_extension("tmp");
    {
        let mut file =
            fs::File::create(&tmp).with_context(|| format!("creating {}", tmp.display()))?;
        let bytes = serde_json::to_vec_pretty(value)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}

/// Credential store backed by `users.json`.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read(&self) -> Result<BTreeMap<String, User>> {
        read_collection(&self.path)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read()?.is_empty())
    }

    /// Every user, active or not (administrative listing).
    pub fn all_users(&self) -> Result<Vec<User>> {
        Ok(self.read()?.into_values().collect())
    }
}

impl CredentialStore for FileCredentialStore {
    fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self.read()?.remove(username))
    }

    fn all_active_users(&self) -> Result<Vec<User>> {
        Ok(self
            .read()?
            .into_values()
            .filter(|u| u.is_active())
            .collect())
    }

    fn persist(&self, user: &User) -> Result<()> {
        let mut users = self.read()?;
        users.insert(user.username().to_string(), user.clone());
        write_collection(&self.path, &users)
    }
}

/// CRM record collections under one data directory.
pub struct CrmStore {
    root: PathBuf,
}

impl CrmStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn customers_path(&self) -> PathBuf {
        self.root.join("customers.json")
    }

    fn contracts_path(&self) -> PathBuf {
        self.root.join("contracts.json")
    }

    fn events_path(&self) -> PathBuf {
        self.root.join("events.json")
    }

    pub fn customers(&self) -> Result<Vec<Customer>> {
        read_collection(&self.customers_path())
    }

    pub fn find_customer(&self, id: CustomerId) -> Result<Option<Customer>> {
        Ok(self.customers()?.into_iter().find(|c| c.id() == id))
    }

    pub fn upsert_customer(&self, customer: &Customer) -> Result<()> {
        let mut customers = self.customers()?;
        match customers.iter_mut().find(|c| c.id() == customer.id()) {
            Some(slot) => *slot = customer.clone(),
            None => customers.push(customer.clone()),
        }
        write_collection(&self.customers_path(), &customers)
    }

    pub fn contracts(&self) -> Result<Vec<Contract>> {
        read_collection(&self.contracts_path())
    }

    pub fn find_contract(&self, id: ContractId) -> Result<Option<Contract>> {
        Ok(self.contracts()?.into_iter().find(|c| c.id() == id))
    }

    pub fn upsert_contract(&self, contract: &Contract) -> Result<()> {
        let mut contracts = self.contracts()?;
        match contracts.iter_mut().find(|c| c.id() == contract.id()) {
            Some(slot) => *slot = contract.clone(),
            None => contracts.push(contract.clone()),
        }
        write_collection(&self.contracts_path(), &contracts)
    }

    pub fn events(&self) -> Result<Vec<Event>> {
        read_collection(&self.events_path())
    }

    pub fn find_event(&self, id: EventId) -> Result<Option<Event>> {
        Ok(self.events()?.into_iter().find(|e| e.id() == id))
    }

    pub fn upsert_event(&self, event: &Event) -> Result<()> {
        let mut events = self.events()?;
        match events.iter_mut().find(|e| e.id() == event.id()) {
            Some(slot) => *slot = event.clone(),
            None => events.push(event.clone()),
        }
        write_collection(&self.events_path(), &events)
    }

    pub fn delete_event(&self, id: EventId) -> Result<bool> {
        let mut events = self.events()?;
        let before = events.len();
        events.retain(|e| e.id() != id);
        let removed = events.len() < before;
        if removed {
            write_collection(&self.events_path(), &events)?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use solstice_auth::{hash_password, Role};
    use solstice_parties::ContactInfo;

    fn user(name: &str, role: Role) -> User {
        User::new(name, hash_password("pw").unwrap(), role, Utc::now()).unwrap()
    }

    #[test]
    fn credential_store_round_trips_users_through_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("users.json"));

        assert!(store.is_empty().unwrap());
        store.persist(&user("alice", Role::Gestion)).unwrap();
        store.persist(&user("bob", Role::Support)).unwrap();

        let found = store.find_by_username("alice").unwrap().unwrap();
        assert_eq!(found.role(), Role::Gestion);
        assert_eq!(store.all_active_users().unwrap().len(), 2);
    }

    #[test]
    fn deactivated_users_stay_on_disk_but_leave_the_active_listing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("users.json"));

        let mut bob = user("bob", Role::Support);
        store.persist(&bob).unwrap();
        bob.deactivate(Utc::now()).unwrap();
        store.persist(&bob).unwrap();

        assert!(store.all_active_users().unwrap().is_empty());
        assert_eq!(store.all_users().unwrap().len(), 1);
    }

    #[test]
    fn crm_store_upserts_and_finds_customers() {
        let dir = tempfile::tempdir().unwrap();
        let store = CrmStore::new(dir.path());

        let mut customer = Customer::new(
            CustomerId::new(),
            "Kevin Casey",
            None,
            ContactInfo::default(),
            Utc::now(),
        )
        .unwrap();
        store.upsert_customer(&customer).unwrap();

        customer.assign_commercial("carla", Utc::now()).unwrap();
        store.upsert_customer(&customer).unwrap();

        let customers = store.customers().unwrap();
        assert_eq!(customers.len(), 1);
        assert_eq!(customers[0].commercial_contact(), Some("carla"));
        assert!(store.find_customer(customer.id()).unwrap().is_some());
    }

    #[test]
    fn missing_files_read_as_empty_collections() {
        let dir = tempfile::tempdir().unwrap();
        let store = CrmStore::new(dir.path());
        assert!(store.customers().unwrap().is_empty());
        assert!(store.contracts().unwrap().is_empty());
        assert!(store.events().unwrap().is_empty());
    }

    #[test]
    fn delete_event_reports_whether_anything_was_removed() {
        let dir = tempfile::tempdir().unwrap();
        let store = CrmStore::new(dir.path());

        let start = Utc::now() + chrono::Duration::days(1);
        let event = Event::new(
            EventId::new(),
            ContractId::new(),
            "Launch",
            start,
            start + chrono::Duration::hours(2),
            "Paris",
            40,
            Utc::now(),
        )
        .unwrap();
        store.upsert_event(&event).unwrap();

        assert!(store.delete_event(event.id()).unwrap());
        assert!(!store.delete_event(event.id()).unwrap());
    }
}
