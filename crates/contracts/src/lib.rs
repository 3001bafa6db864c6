//! Contracts domain module.
//!
//! Business rules for customer contracts and their payment tracking,
//! implemented purely as deterministic domain logic (no IO, no terminal,
//! no storage).

pub mod contract;

pub use contract::{Contract, ContractStatus};
