//! `solstice-auth` — authentication and authorization boundary.
//!
//! This crate owns the session-authentication core: password hashing, the
//! signed-token codec, the persisted session, the role/permission model and
//! the guard chain wrapping every privileged operation. It is intentionally
//! decoupled from storage and terminal concerns: both are injected through
//! the [`CredentialStore`] and [`SessionStore`] traits.

pub mod authenticator;
pub mod claims;
pub mod error;
pub mod guard;
pub mod password;
pub mod permissions;
pub mod roles;
pub mod session;
pub mod store;
pub mod token;
pub mod user;

pub use authenticator::{Authenticator, SessionState, REFRESH_GRACE_SECS, TOKEN_TTL_SECS};
pub use claims::AuthClaims;
pub use error::AuthError;
pub use guard::{Guard, GuardChain};
pub use password::{hash_password, verify_password};
pub use permissions::{is_allowed, roles_with, Permission};
pub use roles::Role;
pub use session::{FileSessionStore, MemorySessionStore, SessionStore};
pub use store::{CredentialStore, MemoryCredentialStore};
pub use token::{TokenCodec, TokenError};
pub use user::User;
