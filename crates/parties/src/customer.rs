use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use solstice_core::{CustomerId, DomainError, DomainResult};

/// Contact information for a customer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl ContactInfo {
    fn validate(&self) -> DomainResult<()> {
        if let Some(email) = &self.email {
            if email.trim().is_empty() || !email.contains('@') {
                return Err(DomainError::validation("invalid email format"));
            }
        }
        Ok(())
    }
}

/// A customer record.
///
/// The commercial contact is the username of the salesperson responsible
/// for this customer; it references a user record that is never
/// hard-deleted, so the link stays resolvable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    id: CustomerId,
    full_name: String,
    company: Option<String>,
    contact: ContactInfo,
    commercial_contact: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Customer {
    pub fn new(
        id: CustomerId,
        full_name: &str,
        company: Option<String>,
        contact: ContactInfo,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let full_name = full_name.trim();
        if full_name.is_empty() {
            return Err(DomainError::validation("customer name cannot be empty"));
        }
        contact.validate()?;

        Ok(Self {
            id,
            full_name: full_name.to_string(),
            company,
            contact,
            commercial_contact: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn id(&self) -> CustomerId {
        self.id
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn company(&self) -> Option<&str> {
        self.company.as_deref()
    }

    pub fn contact(&self) -> &ContactInfo {
        &self.contact
    }

    pub fn commercial_contact(&self) -> Option<&str> {
        self.commercial_contact.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn update_details(
        &mut self,
        full_name: Option<&str>,
        company: Option<Option<String>>,
        contact: Option<ContactInfo>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if let Some(name) = full_name {
            let name = name.trim();
            if name.is_empty() {
                return Err(DomainError::validation("customer name cannot be empty"));
            }
            self.full_name = name.to_string();
        }
        if let Some(company) = company {
            self.company = company;
        }
        if let Some(contact) = contact {
            contact.validate()?;
            self.contact = contact;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Assign the responsible salesperson (a commercial user's username).
    pub fn assign_commercial(&mut self, username: &str, now: DateTime<Utc>) -> DomainResult<()> {
        let username = username.trim();
        if username.is_empty() {
            return Err(DomainError::validation("commercial contact cannot be empty"));
        }
        self.commercial_contact = Some(username.to_lowercase());
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

    fn test_customer() -> Customer {
        Customer::new(
            CustomerId::new(),
            "Kevin Casey",
            Some("Cool Startup LLC".to_string()),
            ContactInfo {
                email: Some("kevin@startup.io".to_string()),
                phone: Some("+678 123 456 78".to_string()),
            },
            now(),
        )
        .unwrap()
    }

    #[test]
    fn new_customer_trims_and_keeps_details() {
        let customer = Customer::new(
            CustomerId::new(),
            "  Kevin Casey  ",
            None,
            ContactInfo::default(),
            now(),
        )
        .unwrap();
        assert_eq!(customer.full_name(), "Kevin Casey");
        assert_eq!(customer.commercial_contact(), None);
    }

    #[test]
    fn new_customer_rejects_empty_name_and_bad_email() {
        assert!(Customer::new(CustomerId::new(), "   ", None, ContactInfo::default(), now()).is_err());

        let bad_email = ContactInfo {
            email: Some("not-an-email".to_string()),
            phone: None,
        };
        assert!(Customer::new(CustomerId::new(), "Kevin", None, bad_email, now()).is_err());
    }

    #[test]
    fn update_details_changes_only_what_is_given() {
        let mut customer = test_customer();
        customer
            .update_details(Some("Kevin C. Casey"), None, None, now())
            .unwrap();
        assert_eq!(customer.full_name(), "Kevin C. Casey");
        assert_eq!(customer.company(), Some("Cool Startup LLC"));

        customer.update_details(None, Some(None), None, now()).unwrap();
        assert_eq!(customer.company(), None);
    }

    #[test]
    fn assign_commercial_canonicalizes_the_username() {
        let mut customer = test_customer();
        customer.assign_commercial(" Carla ", now()).unwrap();
        assert_eq!(customer.commercial_contact(), Some("carla"));

        assert!(customer.assign_commercial("   ", now()).is_err());
    }
}
