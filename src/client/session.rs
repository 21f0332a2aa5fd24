//! Durable storage for the last logged-in user.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::ClientError;
use crate::models::User;

/// Fixed application key the session is stored under.
pub const SESSION_KEY: &str = "zikroullah_user";

/// Keeps the logged-in user as a JSON file named after [`SESSION_KEY`].
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!("{}.json", SESSION_KEY)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the saved user. A corrupt file is removed and treated as no session.
    pub async fn load(&self) -> Result<Option<User>, ClientError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice(&bytes) {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                tracing::warn!("Discarding unreadable session: {}", e);
                self.clear().await?;
                Ok(None)
            }
        }
    }

    pub async fn save(&self, user: &User) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec(user)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }

    /// Forget the session (logout).
    pub async fn clear(&self) -> Result<(), ClientError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn user() -> User {
        User {
            id: "u1".into(),
            first_name: "Awa".into(),
            last_name: "Ndiaye".into(),
            phone: "770000001".into(),
            cumulative_score: 12,
        }
    }

    #[tokio::test]
    async fn test_save_load_clear() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::in_dir(dir.path());

        assert!(store.load().await.unwrap().is_none());

        store.save(&user()).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(user()));
        assert!(store
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(SESSION_KEY));

        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
        // Clearing twice is fine
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_corrupt_session_is_discarded() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::in_dir(dir.path());
        tokio::fs::write(store.path(), b"{not json").await.unwrap();

        assert!(store.load().await.unwrap().is_none());
        assert!(!store.path().exists());
    }
}
