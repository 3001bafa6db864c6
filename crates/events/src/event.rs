use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use solstice_core::{ContractId, DomainError, DomainResult, EventId};

/// A CRM event held for a customer under a contract.
///
/// The support contact is the username of the support user running the
/// event on the day; Gestion assigns it after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    id: EventId,
    contract_id: ContractId,
    name: String,
    support_contact: Option<String>,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    location: String,
    attendees: u32,
    notes: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Event {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: EventId,
        contract_id: ContractId,
        name: &str,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        location: &str,
        attendees: u32,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("event name cannot be empty"));
        }
        if ends_at <= starts_at {
            return Err(DomainError::validation("event must end after it starts"));
        }

        Ok(Self {
            id,
            contract_id,
            name: name.to_string(),
            support_contact: None,
            starts_at,
            ends_at,
            location: location.trim().to_string(),
            attendees,
            notes: String::new(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn contract_id(&self) -> ContractId {
        self.contract_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn support_contact(&self) -> Option<&str> {
        self.support_contact.as_deref()
    }

    pub fn starts_at(&self) -> DateTime<Utc> {
        self.starts_at
    }

    pub fn ends_at(&self) -> DateTime<Utc> {
        self.ends_at
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn attendees(&self) -> u32 {
        self.attendees
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Whether the event still has no support user assigned (the common
    /// gestion work-queue filter).
    pub fn needs_support(&self) -> bool {
        self.support_contact.is_none()
    }

    /// Assign the support user running this event.
    pub fn assign_support(&mut self, username: &str, now: DateTime<Utc>) -> DomainResult<()> {
        let username = username.trim();
        if username.is_empty() {
            return Err(DomainError::validation("support contact cannot be empty"));
        }
        self.support_contact = Some(username.to_lowercase());
        self.updated_at = now;
        Ok(())
    }

    pub fn reschedule(
        &mut self,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if ends_at <= starts_at {
            return Err(DomainError::validation("event must end after it starts"));
        }
        self.starts_at = starts_at;
        self.ends_at = ends_at;
        self.updated_at = now;
        Ok(())
    }

    pub fn update_details(
        &mut self,
        location: Option<&str>,
        attendees: Option<u32>,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if let Some(location) = location {
            self.location = location.trim().to_string();
        }
        if let Some(attendees) = attendees {
            self.attendees = attendees;
        }
        if let Some(notes) = notes {
            self.notes = notes.to_string();
        }
        self.updated_at = now;
        Ok(())
    }
}
