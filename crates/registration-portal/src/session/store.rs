use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{Receipt, Session};

/// Error enumeration for session persistence failures.
#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("session storage unavailable: {0}")]
    Io(#[from] std::io::Error),
    #[error("session data is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("session storage unavailable: {0}")]
    Unavailable(String),
}

/// Storage for the active session and the last submitted application.
pub trait SessionStore: Send + Sync {
    fn store_session(&self, session: &Session) -> Result<(), SessionStoreError>;
    fn load_session(&self) -> Result<Option<Session>, SessionStoreError>;
    fn store_receipt(&self, receipt: &Receipt) -> Result<(), SessionStoreError>;
    fn last_receipt(&self) -> Result<Option<Receipt>, SessionStoreError>;
    /// Forget the session and the receipt.
    fn clear(&self) -> Result<(), SessionStoreError>;
}

#[derive(Debug, Default)]
struct MemoryState {
    session: Option<Session>,
    receipt: Option<Receipt>,
}

/// Process-local store for embedded front ends and tests.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    state: Mutex<MemoryState>,
}

impl MemorySessionStore {
    fn with_state<T>(
        &self,
        f: impl FnOnce(&mut MemoryState) -> T,
    ) -> Result<T, SessionStoreError> {
        let mut guard = self
            .state
            .lock()
            .map_err(|_| SessionStoreError::Unavailable("session mutex poisoned".to_string()))?;
        Ok(f(&mut guard))
    }
}

impl SessionStore for MemorySessionStore {
    fn store_session(&self, session: &Session) -> Result<(), SessionStoreError> {
        self.with_state(|state| state.session = Some(session.clone()))
    }

    fn load_session(&self) -> Result<Option<Session>, SessionStoreError> {
        self.with_state(|state| state.session.clone())
    }

    fn store_receipt(&self, receipt: &Receipt) -> Result<(), SessionStoreError> {
        self.with_state(|state| state.receipt = Some(receipt.clone()))
    }

    fn last_receipt(&self) -> Result<Option<Receipt>, SessionStoreError> {
        self.with_state(|state| state.receipt.clone())
    }

    fn clear(&self) -> Result<(), SessionStoreError> {
        self.with_state(|state| *state = MemoryState::default())
    }
}

const SESSION_FILE: &str = "session.json";
const RECEIPT_FILE: &str = "last_application.json";

/// JSON documents in a directory, used by the command-line front end.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write<T: Serialize>(&self, file: &str, value: &T) -> Result<(), SessionStoreError> {
        fs::create_dir_all(&self.dir)?;
        let body = serde_json::to_vec_pretty(value)?;
        let mut handle = open_private(&self.dir.join(file))?;
        handle.write_all(&body)?;
        handle.flush()?;
        Ok(())
    }

    fn read<T: DeserializeOwned>(&self, file: &str) -> Result<Option<T>, SessionStoreError> {
        match fs::read(self.dir.join(file)) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn remove(&self, file: &str) -> Result<(), SessionStoreError> {
        match fs::remove_file(self.dir.join(file)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Owner read/write only; the session document carries the bearer token.
#[cfg(unix)]
fn open_private(path: &Path) -> io::Result<File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // `mode` only applies on creation; tighten files left by older versions.
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

impl SessionStore for FileSessionStore {
    fn store_session(&self, session: &Session) -> Result<(), SessionStoreError> {
        self.write(SESSION_FILE, session)
    }

    fn load_session(&self) -> Result<Option<Session>, SessionStoreError> {
        self.read(SESSION_FILE)
    }

    fn store_receipt(&self, receipt: &Receipt) -> Result<(), SessionStoreError> {
        self.write(RECEIPT_FILE, receipt)
    }

    fn last_receipt(&self) -> Result<Option<Receipt>, SessionStoreError> {
        self.read(RECEIPT_FILE)
    }

    fn clear(&self) -> Result<(), SessionStoreError> {
        self.remove(SESSION_FILE)?;
        self.remove(RECEIPT_FILE)
    }
}
