//! A principal directory kept in a local JSON file

use std::{
    io,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use tokio::fs::OpenOptions;

use crate::{
    error::{PersistError, PrincipalResolutionError},
    principal::{DirectoryState, Principal, PrincipalDirectory},
    Username, UsernameRef,
};

/// A directory backed by a local file
///
/// The whole document is read once by [`load`][Self::load] and rewritten
/// on every [`persist`][PrincipalDirectory::persist]. A rewrite goes to a
/// sibling `.tmp` file that is then renamed over the store, so an
/// interrupted write never leaves a truncated store behind. Because it holds
/// refresh and signing secrets, the file is created readable only by its
/// owner on Unix.
#[derive(Debug)]
pub struct FileDirectory {
    path: PathBuf,
    state: DirectoryState,
}

impl FileDirectory {
    /// Reads the directory stored at `path`
    ///
    /// A missing file is an empty directory; nothing is written until the
    /// directory is persisted.
    ///
    /// # Errors
    ///
    /// Returns [`PrincipalResolutionError::Directory`] if the file exists
    /// but cannot be read or parsed.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, PrincipalResolutionError> {
        let path = path.into();
        let state = match read_state(&path).await {
            Ok(state) => state,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no store found, starting empty");
                DirectoryState::default()
            }
            Err(err) => return Err(PrincipalResolutionError::Directory(Box::new(err))),
        };

        Ok(Self { path, state })
    }

    /// The backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Registers an account, returning whether it was new
    pub fn add_account(&mut self, username: impl Into<Username>) -> bool {
        self.state.add_account(username)
    }

    /// The registered accounts
    pub fn accounts(&self) -> impl Iterator<Item = &UsernameRef> {
        self.state.accounts.iter().map(std::ops::Deref::deref)
    }

    /// Looks up the principal created for an account
    #[must_use]
    pub fn principal(&self, username: &UsernameRef) -> Option<&Principal> {
        self.state.principals.get(username)
    }

    async fn write_state(&self) -> Result<(), PersistError> {
        use tokio::io::AsyncWriteExt;

        let data = serde_json::to_vec_pretty(&self.state)?;

        let mut file_opts = OpenOptions::new();

        file_opts.create(true).truncate(true).write(true);

        #[cfg(unix)]
        file_opts.mode(0o600);

        // A leftover from an interrupted write may carry other permissions.
        let staging = self.staging_path();
        match tokio::fs::remove_file(&staging).await {
            Err(err) if err.kind() != io::ErrorKind::NotFound => return Err(err.into()),
            _ => {}
        }

        let mut file = file_opts.open(&staging).await?;
        file.write_all(&data).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&staging, &self.path).await?;
        Ok(())
    }

    fn staging_path(&self) -> PathBuf {
        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        PathBuf::from(staging)
    }
}

async fn read_state(path: &Path) -> Result<DirectoryState, io::Error> {
    let data = tokio::fs::read(path).await?;
    let state = serde_json::from_slice(&data)?;
    Ok(state)
}

#[async_trait]
impl PrincipalDirectory for FileDirectory {
    async fn find_or_create_principal(
        &mut self,
        candidate: Option<&UsernameRef>,
    ) -> Result<&mut Principal, PrincipalResolutionError> {
        self.state.find_or_create_principal(candidate)
    }

    async fn persist(&mut self) -> Result<(), PersistError> {
        self.write_state().await?;
        tracing::debug!(path = %self.path.display(), "persisted store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;

    use super::*;
    use crate::{config::TokenConfig, provision::provision, resolver::ResolutionKind, test};

    #[tokio::test]
    async fn missing_file_is_empty() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("store.json");

        let mut directory = FileDirectory::load(&path).await?;

        assert_eq!(directory.accounts().count(), 0);
        assert!(matches!(
            directory.find_or_create_principal(None).await,
            Err(PrincipalResolutionError::NoUsers)
        ));
        assert!(!path.exists());
        Ok(())
    }

    #[tokio::test]
    async fn malformed_file_is_a_directory_error() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("store.json");
        std::fs::write(&path, b"{ not json")?;

        let result = FileDirectory::load(&path).await;

        assert!(matches!(result, Err(PrincipalResolutionError::Directory(_))));
        Ok(())
    }

    #[tokio::test]
    async fn credential_under_foreign_id_is_refused() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("store.json");

        let mut directory = FileDirectory::load(&path).await?;
        directory.add_account("homeowner");
        provision(&mut directory, &TokenConfig::default()).await?;

        let mut raw: serde_json::Value = serde_json::from_slice(&std::fs::read(&path)?)?;
        raw["principals"]["homeowner"]["credentials"]["0".repeat(32)]["id"] = "someone-else".into();
        std::fs::write(&path, serde_json::to_vec(&raw)?)?;

        let result = FileDirectory::load(&path).await;

        assert!(matches!(result, Err(PrincipalResolutionError::Directory(_))));
        Ok(())
    }

    #[tokio::test]
    async fn credentials_survive_reload() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("store.json");
        let config = TokenConfig::default();

        let mut directory = FileDirectory::load(&path).await?;
        directory.add_account("homeowner");
        directory.persist().await?;
        let first = provision(&mut directory, &config).await?;
        assert_eq!(first.resolution(), ResolutionKind::Created);

        let mut reloaded = FileDirectory::load(&path).await?;
        let principal = reloaded
            .principal(UsernameRef::from_str("homeowner"))
            .expect("principal was persisted");
        assert_eq!(principal.credentials().iter().next(), Some(&test::credential()));

        let second = provision(&mut reloaded, &config).await?;
        assert_eq!(second.resolution(), ResolutionKind::ExistingById);
        assert_eq!(second.token().token().as_str(), test::DEFAULT_TOKEN);

        let reloaded = FileDirectory::load(&path).await?;
        assert_eq!(
            reloaded
                .principal(UsernameRef::from_str("homeowner"))
                .map(|p| p.credentials().len()),
            Some(1)
        );
        Ok(())
    }

    #[tokio::test]
    async fn store_holds_secrets_in_full() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("store.json");

        let mut directory = FileDirectory::load(&path).await?;
        directory.add_account("homeowner");
        provision(&mut directory, &TokenConfig::default()).await?;

        let raw: serde_json::Value = serde_json::from_slice(&std::fs::read(&path)?)?;
        let credential = &raw["principals"]["homeowner"]["credentials"]["0".repeat(32)];
        assert_eq!(credential["signing_secret"], "0".repeat(64));
        assert_eq!(credential["token_type"], "long_lived_access_token");
        assert_eq!(credential["created_at"], "2022-01-01T00:00:00Z");
        Ok(())
    }

    #[tokio::test]
    async fn persist_replaces_store_through_staging_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("store.json");
        let staging = dir.path().join("store.json.tmp");

        let mut directory = FileDirectory::load(&path).await?;
        directory.add_account("homeowner");
        directory.persist().await?;

        std::fs::write(&staging, b"{ \"accounts\": [")?;
        let mut directory = FileDirectory::load(&path).await?;
        assert_eq!(directory.accounts().count(), 1);

        directory.add_account("guest");
        directory.persist().await?;

        assert!(!staging.exists());
        let reloaded = FileDirectory::load(&path).await?;
        assert_eq!(reloaded.accounts().count(), 2);
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn store_is_private_to_owner() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir()?;
        let path = dir.path().join("store.json");

        let mut directory = FileDirectory::load(&path).await?;
        directory.add_account("homeowner");
        directory.persist().await?;

        let mode = std::fs::metadata(&path)?.permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        Ok(())
    }
}
