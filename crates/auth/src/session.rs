//! Persisted session: the single current token.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};

/// Durable home of the current session token.
///
/// At most one token is stored. `save` must be all-or-nothing; `load` treats
/// an absent or unreadable file as "no session"; `clear` is idempotent.
///
/// Single-writer is assumed (one terminal client per session file). A
/// multi-session server would need locking or per-session keys; that is an
/// extension point, not solved here.
pub trait SessionStore: Send + Sync {
    fn save(&self, token: &str) -> Result<()>;
    fn load(&self) -> Result<Option<String>>;
    fn clear(&self) -> Result<()>;
}

/// Session token persisted to a local file.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    /// Write-to-temp-then-rename: a crash mid-write leaves either the old
    /// token or no token, never a truncated one.
    fn save(&self, token: &str) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating session dir {}", dir.display()))?;
        }

        let tmp = self.path.with_extension("tmp");
        {
            let mut file = fs::File::create(&tmp)
                .with_context(|| format!("creating {}", tmp.display()))?;
            file.write_all(token.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;

        tracing::debug!(path = %self.path.display(), "session token saved");
        Ok(())
    }

    fn load(&self) -> Result<Option<String>> {
        match fs::read(&self.path) {
            Ok(bytes) => {
                let Ok(token) = String::from_utf8(bytes) else {
                    // Corrupt file: no session, not a crash.
                    tracing::warn!(path = %self.path.display(), "session file is not valid UTF-8");
                    return Ok(None);
                };
                let token = token.trim();
                if token.is_empty() {
                    return Ok(None);
                }
                Ok(Some(token.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading {}", self.path.display())),
        }
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("removing {}", self.path.display())),
        }
    }
}

/// In-memory session store for tests and embedding.
#[derive(Default)]
pub struct MemorySessionStore {
    token: Mutex<Option<String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn save(&self, token: &str) -> Result<()> {
        *self.token.lock().unwrap() = Some(token.to_string());
        Ok(())
    }

    fn load(&self) -> Result<Option<String>> {
        Ok(self.token.lock().unwrap().clone())
    }

    fn clear(&self) -> Result<()> {
        *self.token.lock().unwrap() = None;
        Ok(())
    }
}
