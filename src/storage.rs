use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::api::Credential;

/// Name of the single durable entry holding the raw token
pub const TOKEN_ENTRY: &str = "token";

/// Durable credential storage: one file under the client home directory.
pub struct StorageManager {
    docchat_dir: PathBuf,
    token_path: PathBuf,
}

impl StorageManager {
    pub fn with_root(docchat_dir: impl AsRef<Path>) -> Self {
        let docchat_dir = docchat_dir.as_ref().to_path_buf();
        let token_path = docchat_dir.join(TOKEN_ENTRY);

        StorageManager {
            docchat_dir,
            token_path,
        }
    }

    pub fn ensure_directories(&self) -> Result<()> {
        fs::create_dir_all(&self.docchat_dir).context("Failed to create .docchat directory")?;
        Ok(())
    }

    /// Stored credential, or `None` when the entry is absent or blank.
    pub fn load_token(&self) -> Result<Option<Credential>> {
        match fs::read_to_string(&self.token_path) {
            Ok(content) => {
                let token = content.trim();
                if token.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(Credential::new(token)))
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).context("Failed to read stored credential"),
        }
    }

    pub fn save_token(&self, credential: &Credential) -> Result<()> {
        self.ensure_directories()?;
        let mut file = open_private(&self.token_path).context("Failed to write stored credential")?;
        file.write_all(credential.as_str().as_bytes())
            .context("Failed to write stored credential")?;
        Ok(())
    }

    /// Remove the stored credential. Removing an absent entry is not an error.
    pub fn clear_token(&self) -> Result<()> {
        match fs::remove_file(&self.token_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context("Failed to remove stored credential"),
        }
    }

    pub fn has_token(&self) -> bool {
        self.token_path.exists()
    }
}

/// Open the credential file for overwriting, owner-only before any byte is written.
#[cfg(unix)]
fn open_private(path: &Path) -> io::Result<File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // mode() only applies on creation; tighten a file left by an older write
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> io::Result<File> {
    OpenOptions::new().write(true).create(true).truncate(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn absent_entry_means_no_credential() {
        let temp_dir = TempDir::new().unwrap();
        let storage = StorageManager::with_root(temp_dir.path().join("home"));

        assert_eq!(storage.load_token().unwrap(), None);
        assert!(!storage.has_token());
    }

    #[test]
    fn save_replaces_previous_token() {
        let temp_dir = TempDir::new().unwrap();
        let storage = StorageManager::with_root(temp_dir.path());

        storage.save_token(&Credential::new("first")).unwrap();
        storage.save_token(&Credential::new("second")).unwrap();

        assert_eq!(storage.load_token().unwrap(), Some(Credential::new("second")));
        assert_eq!(fs::read_to_string(temp_dir.path().join(TOKEN_ENTRY)).unwrap(), "second");
    }

    #[test]
    fn clear_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let storage = StorageManager::with_root(temp_dir.path());

        storage.save_token(&Credential::new("abc")).unwrap();
        storage.clear_token().unwrap();
        storage.clear_token().unwrap();

        assert!(!storage.has_token());
        assert_eq!(storage.load_token().unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn token_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let temp_dir = TempDir::new().unwrap();
        let token_path = temp_dir.path().join(TOKEN_ENTRY);
        fs::write(&token_path, "old").unwrap();
        fs::set_permissions(&token_path, fs::Permissions::from_mode(0o644)).unwrap();

        let storage = StorageManager::with_root(temp_dir.path());
        storage.save_token(&Credential::new("fresh")).unwrap();

        let mode = fs::metadata(&token_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(fs::read_to_string(&token_path).unwrap(), "fresh");

        let other = TempDir::new().unwrap();
        let storage = StorageManager::with_root(other.path().join("home"));
        storage.save_token(&Credential::new("new")).unwrap();
        let mode = fs::metadata(other.path().join("home").join(TOKEN_ENTRY))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn blank_entry_is_treated_as_absent() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(TOKEN_ENTRY), "\n").unwrap();

        let storage = StorageManager::with_root(temp_dir.path());
        assert_eq!(storage.load_token().unwrap(), None);
    }
}
