//! Provisioning configuration
//!
//! Every value has a default, so an empty section is a complete
//! configuration. The defaults are deliberately fixed strings: identical
//! configuration must always yield the identical bearer token.
//!
//! ```
//! use the_token::config::HostConfig;
//!
//! let host: HostConfig = serde_json::from_str(r#"{
//!     "http": { "server_port": 8123 },
//!     "the_token": { "username": "homeowner", "access_token_expiration_days": 30 }
//! }"#).unwrap();
//!
//! let config = host.the_token;
//! assert_eq!(config.username.as_deref().map(|u| u.as_str()), Some("homeowner"));
//! assert_eq!(config.refresh_token_client_name.as_str(), "TheToken");
//! ```

use serde::{de, Deserialize, Deserializer, Serialize};
use time::{
    format_description::well_known::Rfc3339,
    macros::{datetime, format_description},
    OffsetDateTime, PrimitiveDateTime,
};

use crate::{
    clock::Lifetime,
    error::{invalid_config, ConfigError},
    ClientId, ClientLabel, CredentialId, CredentialTemplate, RefreshSecret, SigningSecret,
    Username,
};

/// A host configuration document
///
/// Only the provisioning section is read; other top-level keys belong to
/// the host and are ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConfig {
    /// The provisioning section
    #[serde(default)]
    pub the_token: TokenConfig,
}

impl HostConfig {
    /// Parses a host document from JSON
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid JSON or the section
    /// holds unknown or mistyped keys.
    pub fn from_json(data: &[u8]) -> Result<Self, ConfigError> {
        Ok(serde_json::from_slice(data)?)
    }

    /// Reads and parses a host document
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not parse.
    #[cfg(feature = "file")]
    #[cfg_attr(docsrs, doc(cfg(feature = "file")))]
    pub async fn load(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let data = tokio::fs::read(path.as_ref()).await?;
        Self::from_json(&data)
    }
}

/// Settings for the credential to provision and the tokens derived from it
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenConfig {
    /// The account to provision for; may be omitted when there is only one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<Username>,

    /// The client the credential is issued to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token_client_id: Option<ClientId>,

    /// The credential's client label, also used to find it again
    #[serde(default = "default_client_name")]
    pub refresh_token_client_name: ClientLabel,

    /// The raw refresh-token value
    #[serde(default = "default_refresh_token")]
    pub refresh_token: RefreshSecret,

    /// The key bearer tokens are signed with
    #[serde(default = "default_jwt_key")]
    pub refresh_token_jwt_key: SigningSecret,

    /// The credential's fixed identifier
    #[serde(default = "default_refresh_token_id")]
    pub refresh_token_id: CredentialId,

    /// The credential's fixed creation time
    ///
    /// RFC 3339 is preferred. A space may separate date and time, and a
    /// timestamp without an offset is taken as UTC.
    #[serde(
        default = "default_created_at",
        serialize_with = "time::serde::rfc3339::serialize",
        deserialize_with = "deserialize_timestamp"
    )]
    pub refresh_token_created_at: OffsetDateTime,

    /// How many days bearer tokens remain valid after creation
    ///
    /// A string holding a whole number is accepted as well.
    #[serde(
        default = "default_expiration_days",
        deserialize_with = "deserialize_days"
    )]
    pub access_token_expiration_days: i64,
}

fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    let naive = format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"
    );

    let raw = raw.trim();
    let normalized = match raw.as_bytes().get(10) {
        Some(b' ') => format!("{}T{}", &raw[..10], &raw[11..]),
        _ => raw.to_owned(),
    };

    OffsetDateTime::parse(&normalized, &Rfc3339).ok().or_else(|| {
        PrimitiveDateTime::parse(&normalized, naive)
            .ok()
            .map(PrimitiveDateTime::assume_utc)
    })
}

fn deserialize_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<OffsetDateTime, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| de::Error::custom(format_args!("'{}' is not a timestamp", raw)))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Days {
    Number(i64),
    Text(String),
}

fn deserialize_days<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    match Days::deserialize(deserializer)? {
        Days::Number(days) => Ok(days),
        Days::Text(raw) => raw
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format_args!("'{}' is not a number of days", raw))),
    }
}

fn default_client_name() -> ClientLabel {
    ClientLabel::from_static("TheToken")
}

fn default_refresh_token() -> RefreshSecret {
    RefreshSecret::new("0".repeat(64))
}

fn default_jwt_key() -> SigningSecret {
    SigningSecret::new("0".repeat(64))
}

fn default_refresh_token_id() -> CredentialId {
    CredentialId::new("0".repeat(32))
}

const fn default_created_at() -> OffsetDateTime {
    datetime!(2022-01-01 00:00:00 UTC)
}

const fn default_expiration_days() -> i64 {
    3650
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            username: None,
            refresh_token_client_id: None,
            refresh_token_client_name: default_client_name(),
            refresh_token: default_refresh_token(),
            refresh_token_jwt_key: default_jwt_key(),
            refresh_token_id: default_refresh_token_id(),
            refresh_token_created_at: default_created_at(),
            access_token_expiration_days: default_expiration_days(),
        }
    }
}

impl TokenConfig {
    /// Checks the values the resolver relies on
    ///
    /// The signing key and the expiration are checked when a token is
    /// signed, not here.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first unusable field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.refresh_token_id.as_str().is_empty() {
            return Err(invalid_config("refresh_token_id", "must not be empty"));
        }

        if self.refresh_token_client_name.as_str().is_empty() {
            return Err(invalid_config("refresh_token_client_name", "must not be empty"));
        }

        if self.refresh_token.as_str().is_empty() {
            return Err(invalid_config("refresh_token", "must not be empty"));
        }

        if matches!(&self.username, Some(u) if u.as_str().is_empty()) {
            return Err(invalid_config("username", "must not be empty when given"));
        }

        Ok(())
    }

    /// The template for the credential this configuration describes
    #[must_use]
    pub fn template(&self) -> CredentialTemplate {
        CredentialTemplate {
            id: self.refresh_token_id.clone(),
            client_id: self.refresh_token_client_id.clone(),
            client_label: self.refresh_token_client_name.clone(),
            created_at: self.refresh_token_created_at,
            token: self.refresh_token.clone(),
            signing_secret: self.refresh_token_jwt_key.clone(),
            bearer_lifetime: Lifetime::from_days(self.access_token_expiration_days),
        }
    }
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;

    use super::*;

    #[test]
    fn empty_section_equals_defaults() -> Result<()> {
        let config: TokenConfig = serde_json::from_str("{}")?;
        assert_eq!(config, TokenConfig::default());
        assert_eq!(config.refresh_token_id.as_str().len(), 32);
        assert_eq!(config.access_token_expiration_days, 3650);
        config.validate()?;
        Ok(())
    }

    #[test]
    fn missing_section_equals_defaults() -> Result<()> {
        let host = HostConfig::from_json(br#"{ "homeassistant": { "name": "Home" } }"#)?;
        assert_eq!(host.the_token, TokenConfig::default());
        Ok(())
    }

    #[test]
    fn parses_every_field() -> Result<()> {
        let host = HostConfig::from_json(
            br#"{
                "the_token": {
                    "username": "homeowner",
                    "refresh_token_client_id": "https://example.com/",
                    "refresh_token_client_name": "Dashboard",
                    "refresh_token": "refresh",
                    "refresh_token_jwt_key": "key",
                    "refresh_token_id": "abc",
                    "refresh_token_created_at": "2023-05-06T07:08:09+02:00",
                    "access_token_expiration_days": 7
                }
            }"#,
        )?;

        let template = host.the_token.template();
        assert_eq!(template.id.as_str(), "abc");
        assert_eq!(
            template.client_id.as_ref().map(|c| c.as_str()),
            Some("https://example.com/")
        );
        assert_eq!(template.client_label.as_str(), "Dashboard");
        assert_eq!(template.created_at, datetime!(2023-05-06 05:08:09 UTC));
        assert_eq!(template.bearer_lifetime, Lifetime::from_days(7));
        Ok(())
    }

    #[test]
    fn unknown_section_keys_are_rejected() {
        let result = HostConfig::from_json(br#"{ "the_token": { "refresh_token_ttl": 3 } }"#);
        assert!(matches!(result, Err(ConfigError::Malformed(_))));
    }

    #[test]
    fn empty_identifier_is_invalid() {
        let config = TokenConfig {
            refresh_token_id: CredentialId::from_static(""),
            ..TokenConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "refresh_token_id",
                ..
            })
        ));
    }

    #[test]
    fn negative_expiration_is_left_to_the_signer() -> Result<()> {
        let config = TokenConfig {
            access_token_expiration_days: -1,
            ..TokenConfig::default()
        };
        config.validate()?;
        assert!(config.template().bearer_lifetime.is_negative());
        Ok(())
    }

    fn invalid_field(config: &TokenConfig) -> Option<&'static str> {
        match config.validate() {
            Err(ConfigError::Invalid { field, .. }) => Some(field),
            _ => None,
        }
    }

    #[test]
    fn empty_values_are_invalid() {
        let empty_name = TokenConfig {
            refresh_token_client_name: ClientLabel::from_static(""),
            ..TokenConfig::default()
        };
        assert_eq!(invalid_field(&empty_name), Some("refresh_token_client_name"));

        let empty_token = TokenConfig {
            refresh_token: RefreshSecret::from_static(""),
            ..TokenConfig::default()
        };
        assert_eq!(invalid_field(&empty_token), Some("refresh_token"));

        let empty_username = TokenConfig {
            username: Some(Username::from_static("")),
            ..TokenConfig::default()
        };
        assert_eq!(invalid_field(&empty_username), Some("username"));
    }

    #[test]
    fn empty_signing_key_is_left_to_the_signer() -> Result<()> {
        let config = TokenConfig {
            refresh_token_jwt_key: SigningSecret::from_static(""),
            ..TokenConfig::default()
        };
        config.validate()?;
        Ok(())
    }

    #[test]
    fn offsetless_timestamps_are_utc() -> Result<()> {
        for raw in [
            "2022-01-01 00:00:00",
            "2022-01-01T00:00:00",
            "2022-01-01 00:00:00.000+00:00",
            "2022-01-01 02:00:00+02:00",
        ] {
            let json = format!(r#"{{ "refresh_token_created_at": "{}" }}"#, raw);
            let config: TokenConfig = serde_json::from_str(&json)?;
            assert_eq!(config.refresh_token_created_at, default_created_at(), "{}", raw);
        }
        Ok(())
    }

    #[test]
    fn unparseable_timestamp_is_rejected() {
        let result: serde_json::Result<TokenConfig> =
            serde_json::from_str(r#"{ "refresh_token_created_at": "new year's day" }"#);
        assert!(result.is_err());
    }

    #[test]
    fn expiration_days_may_be_text() -> Result<()> {
        let config: TokenConfig =
            serde_json::from_str(r#"{ "access_token_expiration_days": "30" }"#)?;
        assert_eq!(config.access_token_expiration_days, 30);

        let result: serde_json::Result<TokenConfig> =
            serde_json::from_str(r#"{ "access_token_expiration_days": "a month" }"#);
        assert!(result.is_err());
        Ok(())
    }

    #[cfg(feature = "file")]
    #[tokio::test]
    async fn loads_host_document_from_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("configuration.json");
        std::fs::write(
            &path,
            br#"{ "the_token": { "username": "homeowner", "refresh_token_id": "abc" } }"#,
        )?;

        let config = HostConfig::load(&path).await?.the_token;

        assert_eq!(config.username.as_deref().map(|u| u.as_str()), Some("homeowner"));
        assert_eq!(config.refresh_token_id.as_str(), "abc");
        Ok(())
    }

    #[cfg(feature = "file")]
    #[tokio::test]
    async fn missing_host_document_is_an_io_error() -> Result<()> {
        let dir = tempfile::tempdir()?;

        let result = HostConfig::load(dir.path().join("absent.json")).await;

        assert!(matches!(result, Err(ConfigError::Io(_))));
        Ok(())
    }
}
