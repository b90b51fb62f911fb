//! Persistence for the signed-in session.

use crate::session::Session;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Namespace the session is stored under. Also the default file stem.
pub const SESSION_NAMESPACE: &str = "auth-storage";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    pub namespace: String,
    pub session: Session,
}

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Unexpected storage namespace: {0}")]
    Namespace(String),
}

pub fn load(path: &Path) -> Result<Option<Session>, PersistenceError> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path)?;
    let state = serde_json::from_str::<PersistedState>(&contents)?;
    if state.namespace != SESSION_NAMESPACE {
        return Err(PersistenceError::Namespace(state.namespace));
    }
    Ok(Some(state.session))
}

pub fn save(path: &Path, session: &Session) -> Result<(), PersistenceError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let state = PersistedState {
        namespace: SESSION_NAMESPACE.to_string(),
        session: session.clone(),
    };
    let contents = serde_json::to_string_pretty(&state)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn clear(path: &Path) -> Result<(), PersistenceError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}
