//! Long-lived refresh credentials

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    clock::Lifetime, ClientId, ClientIdRef, ClientLabel, ClientLabelRef, CredentialId,
    CredentialIdRef, RefreshSecret, RefreshSecretRef, SigningSecret, SigningSecretRef, Username,
    UsernameRef,
};

/// The kind of a stored refresh credential
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Issued to an interactive login
    Normal,
    /// Issued to a system user
    System,
    /// A long-lived access credential, the only kind created here
    #[default]
    LongLivedAccessToken,
}

/// A durable refresh credential bound to a principal
///
/// Bearer tokens are derived from this record on demand and are never
/// stored alongside it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LongLivedCredential {
    id: CredentialId,
    owner: Username,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    client_id: Option<ClientId>,
    client_label: ClientLabel,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
    token: RefreshSecret,
    #[serde(default)]
    token_type: TokenType,
    signing_secret: SigningSecret,
    bearer_lifetime: Lifetime,
}

impl LongLivedCredential {
    /// The credential's identifier
    #[must_use]
    pub fn id(&self) -> &CredentialIdRef {
        &self.id
    }

    /// The principal the credential is bound to
    #[must_use]
    pub fn owner(&self) -> &UsernameRef {
        &self.owner
    }

    /// The client the credential was issued to, if any
    #[must_use]
    pub fn client_id(&self) -> Option<&ClientIdRef> {
        self.client_id.as_deref()
    }

    /// The human-readable origin tag
    #[must_use]
    pub fn client_label(&self) -> &ClientLabelRef {
        &self.client_label
    }

    /// The fixed creation time, also the issued-at time of derived tokens
    #[must_use]
    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    /// The raw refresh-token value
    #[must_use]
    pub fn token(&self) -> &RefreshSecretRef {
        &self.token
    }

    /// The kind of credential
    #[must_use]
    pub fn token_type(&self) -> TokenType {
        self.token_type
    }

    /// The key used to sign derived bearer tokens
    #[must_use]
    pub fn signing_secret(&self) -> &SigningSecretRef {
        &self.signing_secret
    }

    /// How long derived bearer tokens stay valid, counted from [`created_at`][Self::created_at]
    #[must_use]
    pub fn bearer_lifetime(&self) -> Lifetime {
        self.bearer_lifetime
    }
}

/// Everything needed to materialize a credential, short of its owner
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CredentialTemplate {
    /// Identifier of the credential
    pub id: CredentialId,
    /// Client the credential is issued to
    pub client_id: Option<ClientId>,
    /// Human-readable origin tag, the secondary match key
    pub client_label: ClientLabel,
    /// Fixed creation time
    pub created_at: OffsetDateTime,
    /// Raw refresh-token value
    pub token: RefreshSecret,
    /// Key for signing derived bearer tokens
    pub signing_secret: SigningSecret,
    /// Validity of derived bearer tokens
    pub bearer_lifetime: Lifetime,
}

impl CredentialTemplate {
    /// Builds the long-lived credential for `owner`
    #[must_use]
    pub fn materialize(&self, owner: &UsernameRef) -> LongLivedCredential {
        LongLivedCredential {
            id: self.id.clone(),
            owner: owner.to_owned(),
            client_id: self.client_id.clone(),
            client_label: self.client_label.clone(),
            created_at: self.created_at,
            token: self.token.clone(),
            token_type: TokenType::LongLivedAccessToken,
            signing_secret: self.signing_secret.clone(),
            bearer_lifetime: self.bearer_lifetime,
        }
    }
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;

    use super::*;
    use crate::test;

    #[test]
    fn materialized_credential_copies_template() {
        let template = test::template();
        let credential = template.materialize(UsernameRef::from_str("homeowner"));

        assert_eq!(credential.id(), &*template.id);
        assert_eq!(credential.owner().as_str(), "homeowner");
        assert_eq!(credential.client_id(), None);
        assert_eq!(credential.client_label().as_str(), "TheToken");
        assert_eq!(credential.created_at(), template.created_at);
        assert_eq!(credential.token_type(), TokenType::LongLivedAccessToken);
        assert_eq!(credential.bearer_lifetime(), Lifetime::from_days(3650));
    }

    #[test]
    fn stored_form_uses_rfc3339_and_snake_case() -> Result<()> {
        let credential = test::template().materialize(UsernameRef::from_str("homeowner"));
        let json = serde_json::to_value(&credential)?;

        assert_eq!(json["created_at"], "2022-01-01T00:00:00Z");
        assert_eq!(json["token_type"], "long_lived_access_token");
        assert_eq!(json["bearer_lifetime"], 315_360_000);
        assert!(json.get("client_id").is_none());

        let back: LongLivedCredential = serde_json::from_value(json)?;
        assert_eq!(back, credential);
        Ok(())
    }
}
