//! OAuth token storage: a single token.json file, owner-readable only.

use std::path::{Path, PathBuf};

use super::{GoogleApiError, GoogleToken};

#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the current Google OAuth token.
    pub fn load(&self) -> Result<GoogleToken, GoogleApiError> {
        if !self.path.exists() {
            return Err(GoogleApiError::TokenNotFound(self.path.clone()));
        }
        let content = std::fs::read_to_string(&self.path)?;
        let token: GoogleToken = serde_json::from_str(&content)?;
        Ok(token)
    }

    /// Persist a Google OAuth token.
    pub fn save(&self, token: &GoogleToken) -> Result<(), GoogleApiError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700))?;
                }
            }
        }

        let content = serde_json::to_string_pretty(token)?;
        crate::util::atomic_write_str(&self.path, &content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    /// Remove the stored token. Missing token is not an error.
    pub fn delete(&self) -> Result<(), GoogleApiError> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> GoogleToken {
        GoogleToken {
            access_token: "ya29.stored".to_string(),
            refresh_token: Some("1//stored".to_string()),
            scope: None,
            token_type: Some("Bearer".to_string()),
            expiry_date: Some(1_733_400_000_000),
        }
    }

    #[test]
    fn test_missing_token_is_token_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        assert!(!store.exists());
        assert!(matches!(store.load(), Err(GoogleApiError::TokenNotFound(_))));
    }

    #[test]
    fn test_save_creates_parent_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("google").join("token.json"));

        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap(), sample());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_save_overwrites_previous_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        store.save(&sample()).unwrap();

        let mut newer = sample();
        newer.access_token = "ya29.newer".to_string();
        store.save(&newer).unwrap();
        assert_eq!(store.load().unwrap().access_token, "ya29.newer");
    }

    #[test]
    fn test_delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        store.save(&sample()).unwrap();
        store.delete().unwrap();
        store.delete().unwrap();
        assert!(!store.exists());
    }

    #[test]
    fn test_corrupt_token_is_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        std::fs::write(store.path(), "not json").unwrap();
        assert!(matches!(store.load(), Err(GoogleApiError::Json(_))));
    }
}
