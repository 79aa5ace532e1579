//! File-backed credential and session stores.
//!
//! Two JSON documents in the user's home directory: a credential list and a
//! single active-session record. Missing files read as empty; writes replace
//! the whole document.

use std::fs;
use std::path::{Path, PathBuf};

use common::errors::{AppError, AppResult};
use common::models::{ConnectionProfile, SessionRecord};

const CREDENTIALS_FILE: &str = ".mssqlbridge-credentials.json";
const SESSION_FILE: &str = ".mssqlbridge-session.json";

fn home_path(file_name: &str) -> AppResult<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| AppError::Storage("Could not determine home directory".to_string()))?;
    Ok(home.join(file_name))
}

/// Stores saved connection profiles.
#[derive(Clone, Debug)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Store backed by the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default location in the home directory.
    pub fn default_location() -> AppResult<Self> {
        Ok(Self::new(home_path(CREDENTIALS_FILE)?))
    }

    /// Loads all profiles; a missing file reads as an empty list.
    pub fn load(&self) -> AppResult<Vec<ConnectionProfile>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }

    /// Appends a profile to the list.
    pub fn append(&self, profile: ConnectionProfile) -> AppResult<()> {
        let mut profiles = self.load()?;
        profiles.push(profile);
        self.save_all(&profiles)
    }

    /// Deletes a profile by id. Returns whether anything was removed.
    pub fn delete(&self, id: &str) -> AppResult<bool> {
        let profiles = self.load()?;
        let before = profiles.len();
        let remaining: Vec<ConnectionProfile> =
            profiles.into_iter().filter(|p| p.id != id).collect();
        let removed = remaining.len() != before;
        self.save_all(&remaining)?;
        Ok(removed)
    }

    fn save_all(&self, profiles: &[ConnectionProfile]) -> AppResult<()> {
        let serialized = serde_json::to_string_pretty(profiles)?;
        fs::write(&self.path, serialized)?;
        Ok(())
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Stores the single active-session record.
#[derive(Clone, Debug)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Store backed by the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default location in the home directory.
    pub fn default_location() -> AppResult<Self> {
        Ok(Self::new(home_path(SESSION_FILE)?))
    }

    /// Loads the session record, if one exists.
    pub fn load(&self) -> AppResult<Option<SessionRecord>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Writes the session record.
    pub fn save(&self, record: &SessionRecord) -> AppResult<()> {
        let serialized = serde_json::to_string_pretty(record)?;
        fs::write(&self.path, serialized)?;
        Ok(())
    }

    /// Removes the session record. Missing files are fine.
    pub fn clear(&self) -> AppResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::models::SaveCredentialRequest;

    fn sample_profile(id: &str) -> ConnectionProfile {
        SaveCredentialRequest {
            name: None,
            server: "localhost".into(),
            username: "sa".into(),
            password: "pw".into(),
        }
        .into_profile(id.to_string())
    }

    #[test]
    fn credentials_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("credentials.json"));

        assert!(store.load().unwrap().is_empty());

        store.append(sample_profile("one")).unwrap();
        store.append(sample_profile("two")).unwrap();
        assert_eq!(store.load().unwrap().len(), 2);

        assert!(store.delete("one").unwrap());
        assert!(!store.delete("one").unwrap());
        let remaining = store.load().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "two");
    }

    #[test]
    fn session_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));

        assert!(store.load().unwrap().is_none());

        let record = SessionRecord::started_now("localhost", "sa", Some("dev".into()));
        store.save(&record).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.server, "localhost");
        assert_eq!(loaded.connection_name.as_deref(), Some("dev"));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        // Clearing twice is fine
        store.clear().unwrap();
    }
}
