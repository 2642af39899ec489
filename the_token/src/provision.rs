//! End-to-end provisioning against a host directory
//!
//! Selects a principal, makes sure it holds the configured credential,
//! persists the directory if anything was added, and signs the bearer token.
//! Emitting the token is left to the caller.

use tokio::sync::Mutex;

use crate::{
    config::TokenConfig,
    error::ProvisionError,
    principal::PrincipalDirectory,
    resolver::{CredentialResolver, ResolutionKind},
    signer::{IssuedToken, TokenSigner},
    CredentialId, CredentialIdRef, Username, UsernameRef,
};

/// The outcome of a provisioning run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Provisioned {
    username: Username,
    resolution: ResolutionKind,
    credential_id: CredentialId,
    token: IssuedToken,
}

impl Provisioned {
    /// The principal the credential belongs to
    #[must_use]
    pub fn username(&self) -> &UsernameRef {
        &self.username
    }

    /// How the credential was obtained
    #[must_use]
    pub fn resolution(&self) -> ResolutionKind {
        self.resolution
    }

    /// The id of the credential the token was derived from
    ///
    /// When the credential was found by client label, this differs from the
    /// configured id.
    #[must_use]
    pub fn credential_id(&self) -> &CredentialIdRef {
        &self.credential_id
    }

    /// The signed bearer token
    #[must_use]
    pub fn token(&self) -> &IssuedToken {
        &self.token
    }

    /// Takes the signed bearer token
    #[must_use]
    pub fn into_token(self) -> IssuedToken {
        self.token
    }
}

/// Runs provisioning with the default signer
///
/// # Errors
///
/// See [`provision_with`].
pub async fn provision<D>(
    directory: &mut D,
    config: &TokenConfig,
) -> Result<Provisioned, ProvisionError>
where
    D: PrincipalDirectory + ?Sized,
{
    provision_with(directory, config, &TokenSigner::new()).await
}

/// Runs provisioning, signing with `signer`
///
/// # Errors
///
/// * [`ProvisionError::Principal`] if no principal could be selected
/// * [`ProvisionError::Persist`] if a newly created credential could not be persisted
/// * [`ProvisionError::Signing`] if the credential cannot produce a bearer token
pub async fn provision_with<D>(
    directory: &mut D,
    config: &TokenConfig,
    signer: &TokenSigner,
) -> Result<Provisioned, ProvisionError>
where
    D: PrincipalDirectory + ?Sized,
{
    let principal = match directory
        .find_or_create_principal(config.username.as_deref())
        .await
    {
        Ok(principal) => principal,
        Err(err) => {
            tracing::error!(error = %err, "no user could be selected for creating a token");
            return Err(err.into());
        }
    };
    let username = principal.username().to_owned();
    tracing::info!(user = %principal.name(), "user chosen to create a token");

    let resolution = CredentialResolver::new(config.template()).resolve(principal);
    match resolution.kind() {
        ResolutionKind::ExistingById => tracing::info!(
            credential_id = %resolution.credential().id(),
            user = %username,
            "refresh token with this id already exists"
        ),
        ResolutionKind::ExistingByLabel => tracing::info!(
            client_label = %resolution.credential().client_label(),
            user = %username,
            "refresh token with this client name already exists"
        ),
        ResolutionKind::Created => tracing::info!(
            user = %username,
            "creating refresh and access tokens"
        ),
    }

    if resolution.is_created() {
        directory.persist().await?;
    }

    let kind = resolution.kind();
    let credential = resolution.into_credential();
    let token = signer.sign(&credential)?;

    Ok(Provisioned {
        username,
        resolution: kind,
        credential_id: credential.id().to_owned(),
        token,
    })
}

/// Runs provisioning against a directory shared between tasks
///
/// The lock is held for the whole run, so concurrent callers never both
/// decide to create the same credential.
///
/// # Errors
///
/// See [`provision_with`].
pub async fn provision_locked<D>(
    directory: &Mutex<D>,
    config: &TokenConfig,
) -> Result<Provisioned, ProvisionError>
where
    D: PrincipalDirectory,
{
    let mut directory = directory.lock().await;
    provision(&mut *directory, config).await
}
