use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use solstice_core::{ContractId, CustomerId, DomainError, DomainResult};

/// Contract status lifecycle. Signing is monotonic: there is no way back
/// from `Signed`, and permission decisions never depend on this state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractStatus {
    Unsigned,
    Signed,
}

/// A customer contract with payment tracking.
///
/// Amounts are in the smallest currency unit (e.g., cents). The gestion
/// contact is the username of the management user who owns the paperwork.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    id: ContractId,
    customer_id: CustomerId,
    gestion_contact: Option<String>,
    total_amount: u64,
    amount_due: u64,
    status: ContractStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Contract {
    pub fn new(
        id: ContractId,
        customer_id: CustomerId,
        total_amount: u64,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if total_amount == 0 {
            return Err(DomainError::validation("contract amount must be positive"));
        }

        Ok(Self {
            id,
            customer_id,
            gestion_contact: None,
            total_amount,
            amount_due: total_amount,
            status: ContractStatus::Unsigned,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn id(&self) -> ContractId {
        self.id
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn gestion_contact(&self) -> Option<&str> {
        self.gestion_contact.as_deref()
    }

    pub fn total_amount(&self) -> u64 {
        self.total_amount
    }

    pub fn amount_due(&self) -> u64 {
        self.amount_due
    }

    pub fn status(&self) -> ContractStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_signed(&self) -> bool {
        self.status == ContractStatus::Signed
    }

    pub fn is_fully_paid(&self) -> bool {
        self.amount_due == 0
    }

    /// Assign the managing user (a gestion user's username).
    pub fn assign_gestion(&mut self, username: &str, now: DateTime<Utc>) -> DomainResult<()> {
        let username = username.trim();
        if username.is_empty() {
            return Err(DomainError::validation("gestion contact cannot be empty"));
        }
        self.gestion_contact = Some(username.to_lowercase());
        self.updated_at = now;
        Ok(())
    }

    /// Mark the contract as signed. Signing twice is an invariant error.
    pub fn sign(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status == ContractStatus::Signed {
            return Err(DomainError::invariant("contract is already signed"));
        }
        self.status = ContractStatus::Signed;
        self.updated_at = now;
        Ok(())
    }

    /// Record a payment against the outstanding balance.
    ///
    /// The amount must be positive and must not exceed what is due.
    pub fn record_payment(&mut self, amount: u64, now: DateTime<Utc>) -> DomainResult<()> {
        if amount == 0 {
            return Err(DomainError::validation("payment must be positive"));
        }
        if amount > self.amount_due {
            return Err(DomainError::invariant(format!(
                "payment of {amount} exceeds amount due {due}",
                due = self.amount_due
            )));
        }
        self.amount_due -= amount;
        self.updated_at = now;
        Ok(())
    }

    /// Revise the contract total; the outstanding balance moves by the same
    /// delta, and the total can never drop below what was already paid.
    pub fn set_total_amount(&mut self, total_amount: u64, now: DateTime<Utc>) -> DomainResult<()> {
        if total_amount == 0 {
            return Err(DomainError::validation("contract amount must be positive"));
        }
        let paid = self.total_amount - self.amount_due;
        if total_amount < paid {
            return Err(DomainError::invariant(format!(
                "new total {total_amount} is below the {paid} already paid"
            )));
        }
        self.amount_due = total_amount - paid;
        self.total_amount = total_amount;
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

    fn test_contract(total: u64) -> Contract {
        Contract::new(ContractId::new(), CustomerId::new(), total, now()).unwrap()
    }

    #[test]
    fn new_contract_starts_unsigned_with_full_balance_due() {
        let contract = test_contract(150_000);
        assert_eq!(contract.status(), ContractStatus::Unsigned);
        assert_eq!(contract.amount_due(), 150_000);
        assert!(!contract.is_fully_paid());
    }

    #[test]
    fn zero_amount_contract_is_rejected() {
        assert!(Contract::new(ContractId::new(), CustomerId::new(), 0, now()).is_err());
    }

    #[test]
    fn payments_reduce_the_balance_to_zero() {
        let mut contract = test_contract(100_000);
        contract.record_payment(60_000, now()).unwrap();
        assert_eq!(contract.amount_due(), 40_000);

        contract.record_payment(40_000, now()).unwrap();
        assert!(contract.is_fully_paid());
    }

    #[test]
    fn overpayment_and_zero_payment_are_rejected() {
        let mut contract = test_contract(100_000);
        assert!(contract.record_payment(0, now()).is_err());
        assert!(contract.record_payment(100_001, now()).is_err());
        assert_eq!(contract.amount_due(), 100_000);
    }

    #[test]
    fn signing_is_monotonic() {
        let mut contract = test_contract(100_000);
        contract.sign(now()).unwrap();
        assert!(contract.is_signed());
        assert!(contract.sign(now()).is_err());
    }

    #[test]
    fn payments_are_accepted_regardless_of_signed_state() {
        // Permission and workflow state are independent concerns.
        let mut contract = test_contract(100_000);
        contract.record_payment(10_000, now()).unwrap();
        contract.sign(now()).unwrap();
        contract.record_payment(10_000, now()).unwrap();
        assert_eq!(contract.amount_due(), 80_000);
    }

    #[test]
    fn total_revision_keeps_paid_amount_and_moves_the_balance() {
        let mut contract = test_contract(100_000);
        contract.record_payment(30_000, now()).unwrap();

        contract.set_total_amount(120_000, now()).unwrap();
        assert_eq!(contract.amount_due(), 90_000);

        // Cannot revise below what was already paid.
        assert!(contract.set_total_amount(20_000, now()).is_err());
    }

    #[test]
    fn assign_gestion_canonicalizes_the_username() {
        let mut contract = test_contract(100_000);
        contract.assign_gestion(" Greta ", now()).unwrap();
        assert_eq!(contract.gestion_contact(), Some("greta"));
    }
}
