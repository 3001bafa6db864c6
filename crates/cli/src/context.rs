//! Application wiring: stores + authenticator + guard evaluation.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;

use solstice_auth::{
    hash_password, AuthClaims, AuthError, Authenticator, CredentialStore, FileSessionStore,
    GuardChain, Role, TokenCodec, User,
};

use crate::config::Config;
use crate::store::{CrmStore, FileCredentialStore};

/// Everything a command handler needs, built once at startup.
///
/// The session is an explicit injected object; handlers reach it only
/// through the authenticator and guard chains.
pub struct AppContext {
    pub auth: Authenticator,
    pub users: Arc<FileCredentialStore>,
    pub crm: CrmStore,
}

impl AppContext {
    /// Wire the application against `config.data_dir`.
    ///
    /// Fails fast on an empty/missing secret. On a first run (no users
    /// file) an initial `admin` user is seeded from
    /// `config.admin_password`.
    pub fn open(config: &Config) -> Result<Self> {
        let codec = TokenCodec::new(&config.secret)?;

        let users = Arc::new(FileCredentialStore::new(config.users_path()));
        let sessions = Arc::new(FileSessionStore::new(config.session_path()));
        let auth = Authenticator::new(users.clone(), sessions, codec);

        let ctx = Self {
            auth,
            users,
            crm: CrmStore::new(&config.data_dir),
        };
        ctx.seed_admin(config)?;
        Ok(ctx)
    }

    fn seed_admin(&self, config: &Config) -> Result<()> {
        if !self.users.is_empty()? {
            return Ok(());
        }
        let Some(password) = config.admin_password.as_deref() else {
            bail!(
                "no users exist yet; set {} to seed the initial admin account",
                crate::config::ADMIN_PASSWORD_VAR
            );
        };

        let admin = User::new("admin", hash_password(password)?, Role::Admin, Utc::now())
            .context("seeding admin user")?;
        self.users.persist(&admin)?;
        tracing::info!("seeded initial admin user");
        Ok(())
    }

    /// Evaluate a guard chain against the current session.
    pub fn guard(&self, chain: &GuardChain) -> Result<AuthClaims, AuthError> {
        chain.check(&self.auth)
    }
}
