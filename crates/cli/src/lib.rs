//! Terminal client wiring.
//!
//! This crate is structured like:
//! - `config.rs`: environment-driven configuration (fails fast on a missing
//!   secret)
//! - `store.rs`: JSON-file stores (users, customers, contracts, events)
//! - `context.rs`: application wiring (stores + authenticator + guards)
//! - `commands.rs`: command parsing and guarded dispatch
//! - `repl.rs`: the interactive read loop

pub mod commands;
pub mod config;
pub mod context;
pub mod repl;
pub mod store;
