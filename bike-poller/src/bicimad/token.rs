//! Access token and its on-disk slot.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::error::BiciMadError;

/// Default token file, relative to the working directory.
pub const DEFAULT_TOKEN_PATH: &str = "access_token.txt";

/// Opaque bearer credential issued by the EMT login endpoint.
///
/// `Debug` shows only a short prefix so tokens never end up in logs whole.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a token string. Returns `None` for blank input.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.len() == token.len() {
            Some(Self(token))
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(4).collect();
        write!(f, "AccessToken({prefix}…)")
    }
}

/// Single-slot token cache that survives restarts.
///
/// The file holds exactly the token string. Writes go to a sibling
/// temporary file which is then renamed over the slot, so a crash mid-write
/// leaves either the old token or the new one.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the stored token.
    ///
    /// Returns `None` if the file doesn't exist, can't be read, or is blank.
    pub fn load(&self) -> Option<AccessToken> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => AccessToken::new(contents),
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "no stored access token");
                None
            }
        }
    }

    /// Overwrite the slot with `token`.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save(&self, token: &AccessToken) -> Result<(), BiciMadError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| BiciMadError::Store {
                message: format!("failed to create token directory: {}", e),
            })?;
        }

        let tmp = self.tmp_path();
        std::fs::write(&tmp, token.as_str()).map_err(|e| BiciMadError::Store {
            message: format!("failed to write token file: {}", e),
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|e| BiciMadError::Store {
            message: format!("failed to replace token file: {}", e),
        })?;

        Ok(())
    }

    /// Get the token file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_and_load_token() {
        let dir = tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.txt"));
        let token = AccessToken::new("a1b2c3d4-e5f6-7890-abcd-ef0123456789").unwrap();

        store.save(&token).unwrap();

        assert_eq!(store.load(), Some(token));
    }

    #[test]
    fn file_holds_only_the_token() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("token.txt");
        let store = TokenStore::new(&path);

        store.save(&AccessToken::new("abc").unwrap()).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "abc");
        assert!(!dir.path().join("token.txt.tmp").exists());
    }

    #[test]
    fn save_overwrites_previous_token() {
        let dir = tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.txt"));

        store.save(&AccessToken::new("old-token").unwrap()).unwrap();
        store.save(&AccessToken::new("new").unwrap()).unwrap();

        assert_eq!(store.load().unwrap().as_str(), "new");
    }

    #[test]
    fn missing_file_returns_none() {
        let store = TokenStore::new("/nonexistent/path/token.txt");
        assert!(store.load().is_none());
    }

    #[test]
    fn blank_file_returns_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("token.txt");
        std::fs::write(&path, "  \n").unwrap();

        assert!(TokenStore::new(&path).load().is_none());
    }

    #[test]
    fn trailing_newline_is_ignored() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("token.txt");
        std::fs::write(&path, "abc\n").unwrap();

        assert_eq!(TokenStore::new(&path).load().unwrap().as_str(), "abc");
    }

    #[test]
    fn creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("dir").join("token.txt");
        let store = TokenStore::new(&path);

        store.save(&AccessToken::new("abc").unwrap()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn debug_redacts_token() {
        let token = AccessToken::new("abcdefghijkl").unwrap();
        let shown = format!("{token:?}");
        assert!(shown.starts_with("AccessToken(abcd"));
        assert!(!shown.contains("efgh"));
    }
}
