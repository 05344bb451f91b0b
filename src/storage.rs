//! Local persistence for sessions.
//!
//! Each session lives in its own directory under the storage root:
//!
//! ```text
//! <root>/<uuid>/
//!   session.json     # Session metadata and pipeline state
//! ```

use std::{fs, io, path::PathBuf};

use jiff::Timestamp;
use uuid::Uuid;

use crate::model::Session;

const SESSION_FILE: &str = "session.json";

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("session already exists: {0}")]
    SessionAlreadyExists(Uuid),

    #[error("no session matching '{0}'")]
    NoMatch(String),

    #[error("'{reference}' is ambiguous, matches {} sessions: {}", .ids.len(), .ids.join(", "))]
    Ambiguous { reference: String, ids: Vec<String> },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = core::result::Result<T, StorageError>;

/// Local file-based storage for sessions.
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    /// Creates a new storage instance rooted at the given directory.
    ///
    /// The directory is created if it doesn't exist.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Returns the default storage root: `~/.plcgen/sessions/`.
    pub fn default_root() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".plcgen").join("sessions"))
    }

    /// Writes a new session to disk.
    pub fn create_session(&self, session: &Session) -> Result<()> {
        let dir = self.session_dir(session.id);
        if dir.exists() {
            return Err(StorageError::SessionAlreadyExists(session.id));
        }
        fs::create_dir_all(&dir)?;
        let json = serde_json::to_string_pretty(session)?;
        fs::write(dir.join(SESSION_FILE), json)?;
        Ok(())
    }

    /// Saves a session, stamping `updated_at`.
    pub fn update_session(&self, session: &mut Session) -> Result<()> {
        let path = self.session_dir(session.id).join(SESSION_FILE);
        if !path.exists() {
            return Err(StorageError::SessionNotFound(session.id));
        }
        session.updated_at = Timestamp::now();
        let json = serde_json::to_string_pretty(session)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Loads a single session.
    pub fn load_session(&self, id: Uuid) -> Result<Session> {
        let path = self.session_dir(id).join(SESSION_FILE);
        if !path.exists() {
            return Err(StorageError::SessionNotFound(id));
        }
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Lists all sessions, oldest first.
    pub fn list_sessions(&self) -> Result<Vec<Session>> {
        let mut sessions = Vec::new();
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(sessions),
            Err(e) => return Err(e.into()),
        };
        for entry in entries {
            let entry = entry?;
            let path = entry.path().join(SESSION_FILE);
            if path.is_file() {
                let json = fs::read_to_string(&path)?;
                sessions.push(serde_json::from_str(&json)?);
            }
        }
        sessions.sort_by(|a: &Session, b: &Session| a.created_at.cmp(&b.created_at));
        Ok(sessions)
    }

    /// Resolve a session reference: a full UUID or an unambiguous id prefix.
    pub fn resolve(&self, reference: &str) -> Result<Session> {
        if let Ok(id) = reference.parse::<Uuid>() {
            return self.load_session(id);
        }

        let mut matches: Vec<Session> = self
            .list_sessions()?
            .into_iter()
            .filter(|s| s.id.to_string().starts_with(reference))
            .collect();

        match matches.len() {
            0 => Err(StorageError::NoMatch(reference.to_string())),
            1 => Ok(matches.remove(0)),
            _ => Err(StorageError::Ambiguous {
                reference: reference.to_string(),
                ids: matches.iter().map(Session::short_id).collect(),
            }),
        }
    }

    fn session_dir(&self, id: Uuid) -> PathBuf {
        self.root.join(id.to_string())
    }
}
