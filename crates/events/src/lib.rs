//! Events domain module.
//!
//! Business rules for CRM events (workshops, launches, receptions held for
//! a customer under a contract), implemented purely as deterministic domain
//! logic (no IO, no terminal, no storage).

pub mod event;

pub use event::Event;
