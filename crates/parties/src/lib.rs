//! Parties domain module (customers).
//!
//! Business rules for customer records, implemented purely as deterministic
//! domain logic (no IO, no terminal, no storage).

pub mod customer;

pub use customer::{ContactInfo, Customer};
