//! Find-or-create policy for a principal's long-lived credential
//!
//! Resolution checks, in order, and stops at the first hit:
//!
//! 1. a credential whose id equals the configured id;
//! 2. a credential whose client label equals the configured label;
//! 3. otherwise a new credential is built from the template and inserted.
//!
//! Only the last step mutates the principal. Existing credentials are never
//! updated or removed, so resolving repeatedly with the same template adds at
//! most one record.

use std::fmt;

use crate::{principal::Principal, CredentialTemplate, LongLivedCredential};

/// Which rule produced the credential
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResolutionKind {
    /// A credential with the configured id already existed
    ExistingById,
    /// A credential with the configured client label already existed
    ExistingByLabel,
    /// A new credential was inserted
    Created,
}

impl fmt::Display for ResolutionKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::ExistingById => "existing by id",
            Self::ExistingByLabel => "existing by client label",
            Self::Created => "created",
        })
    }
}

/// The outcome of resolving a principal's credential
#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use]
pub struct Resolution {
    kind: ResolutionKind,
    credential: LongLivedCredential,
}

impl Resolution {
    /// Which rule produced the credential
    #[must_use]
    pub fn kind(&self) -> ResolutionKind {
        self.kind
    }

    /// Whether the principal's credentials were modified
    #[must_use]
    pub fn is_created(&self) -> bool {
        self.kind == ResolutionKind::Created
    }

    /// The resolved credential
    #[must_use]
    pub fn credential(&self) -> &LongLivedCredential {
        &self.credential
    }

    /// Takes the resolved credential
    #[must_use]
    pub fn into_credential(self) -> LongLivedCredential {
        self.credential
    }
}

/// Ensures a principal holds the credential described by a template
#[derive(Clone, Debug)]
pub struct CredentialResolver {
    template: CredentialTemplate,
}

impl CredentialResolver {
    /// A resolver for credentials shaped like `template`
    pub fn new(template: CredentialTemplate) -> Self {
        Self { template }
    }

    /// The template new credentials are built from
    #[must_use]
    pub fn template(&self) -> &CredentialTemplate {
        &self.template
    }

    /// Returns the principal's matching credential, creating it if needed
    ///
    /// Taking the principal mutably makes the lookup and the insert a single
    /// step with respect to any other writer.
    pub fn resolve(&self, principal: &mut Principal) -> Resolution {
        let credentials = principal.credentials();

        if let Some(existing) = credentials.get(&self.template.id) {
            tracing::debug!(credential_id = %existing.id(), "found credential by id");
            return Resolution {
                kind: ResolutionKind::ExistingById,
                credential: existing.clone(),
            };
        }

        if let Some(existing) = credentials.find_by_label(&self.template.client_label) {
            tracing::debug!(
                credential_id = %existing.id(),
                client_label = %existing.client_label(),
                "found credential by client label"
            );
            return Resolution {
                kind: ResolutionKind::ExistingByLabel,
                credential: existing.clone(),
            };
        }

        let credential = self.template.materialize(principal.username());
        tracing::debug!(credential_id = %credential.id(), "materialized new credential");
        principal.credentials_mut().insert(credential.clone());

        Resolution {
            kind: ResolutionKind::Created,
            credential,
        }
    }
}
