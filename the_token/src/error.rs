//! Common errors

#![allow(missing_copy_implementations)]

use std::{error::Error as StdError, io};

use thiserror::Error;

use crate::{b64::InvalidBase64Data, Username};

/// The provided name could not be matched with supported algorithms
#[derive(Debug, Error)]
#[error("'{alg}' does not match supported algorithms")]
pub struct UnknownAlgorithm {
    alg: String,
}

#[inline]
pub(crate) fn unknown_algorithm(alg: String) -> UnknownAlgorithm {
    UnknownAlgorithm { alg }
}

/// The token is malformed and cannot be parsed out into header, payload, and signature sections
#[derive(Clone, Copy, Debug, Error)]
#[error("malformed JWT")]
pub struct MalformedJwt {
    _p: (),
}

pub(crate) fn malformed_jwt() -> MalformedJwt {
    MalformedJwt { _p: () }
}

/// A token section could not be encoded or decoded
#[derive(Debug, Error)]
#[error("malformed JWT {section}")]
pub struct MalformedSection {
    section: &'static str,
    #[source]
    source: Box<dyn StdError + Send + Sync + 'static>,
}

impl MalformedSection {
    /// The section at fault: `header`, `payload`, or `signature`
    #[must_use]
    pub fn section(&self) -> &'static str {
        self.section
    }
}

pub(crate) fn malformed_header(
    source: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
) -> MalformedSection {
    MalformedSection {
        section: "header",
        source: source.into(),
    }
}

pub(crate) fn malformed_payload(
    source: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
) -> MalformedSection {
    MalformedSection {
        section: "payload",
        source: source.into(),
    }
}

pub(crate) fn malformed_signature(source: InvalidBase64Data) -> MalformedSection {
    MalformedSection {
        section: "signature",
        source: Box::new(source),
    }
}

/// The signature did not match
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Error)]
#[error("signature mismatch")]
pub struct SignatureMismatch {
    _p: (),
}

pub(crate) const fn signature_mismatch() -> SignatureMismatch {
    SignatureMismatch { _p: () }
}

/// An error occurring while signing a bearer token
#[derive(Debug, Error)]
pub enum SigningError {
    /// The credential carries no signing secret
    #[error("signing secret is empty")]
    EmptySecret,

    /// The bearer lifetime would put expiry before issuance
    #[error("bearer lifetime of {secs}s is negative")]
    NegativeLifetime {
        /// The offending lifetime, in seconds
        secs: i64,
    },

    /// The issued-at or expiry time cannot be expressed as a numeric date
    #[error("token timestamps out of range")]
    TimestampOutOfRange,

    /// The header or payload could not be serialized
    #[error(transparent)]
    Encoding(#[from] MalformedSection),
}

impl From<std::convert::Infallible> for SigningError {
    fn from(_: std::convert::Infallible) -> Self {
        unreachable!("infallible result")
    }
}

/// An error occurring while taking apart or checking a compact token
#[derive(Debug, Error)]
pub enum JwtDecodeError {
    /// The token does not have three `.`-separated sections
    #[error(transparent)]
    Malformed(#[from] MalformedJwt),

    /// One section is not valid base64url or JSON
    #[error(transparent)]
    MalformedSection(#[from] MalformedSection),

    /// The signature does not verify under the given key
    #[error(transparent)]
    SignatureMismatch(#[from] SignatureMismatch),
}

/// No principal could be selected to own the credential
#[derive(Debug, Error)]
pub enum PrincipalResolutionError {
    /// The directory has no accounts at all
    #[error("there are no users in the directory")]
    NoUsers,

    /// A username was requested but is not known to the directory
    #[error("user '{requested}' not found, available users: {}", list(.available))]
    UnknownUser {
        /// The requested username
        requested: Username,
        /// The usernames the directory knows
        available: Vec<Username>,
    },

    /// No username was requested and more than one account exists
    #[error(
        "there are several users: {}, please choose one to generate a token for",
        list(.available)
    )]
    Ambiguous {
        /// The usernames the directory knows
        available: Vec<Username>,
    },

    /// The directory could not be read
    #[error("unable to read the principal directory")]
    Directory(#[source] Box<dyn StdError + Send + Sync + 'static>),
}

fn list(names: &[Username]) -> String {
    names
        .iter()
        .map(|n| n.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// The credential store could not be written
#[derive(Debug, Error)]
pub enum PersistError {
    /// The store could not be serialized
    #[error("unable to serialize credential store")]
    Serialize(#[from] serde_json::Error),

    /// The store could not be written to its backing file
    #[error("unable to write credential store")]
    Io(#[from] io::Error),
}

/// The configuration could not be loaded or is unusable
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("unable to read configuration")]
    Io(#[from] io::Error),

    /// The configuration document is not valid
    #[error("malformed configuration")]
    Malformed(#[from] serde_json::Error),

    /// A configuration value is unusable
    #[error("invalid configuration: {field} {reason}")]
    Invalid {
        /// The offending field
        field: &'static str,
        /// What is wrong with it
        reason: &'static str,
    },
}

pub(crate) const fn invalid_config(field: &'static str, reason: &'static str) -> ConfigError {
    ConfigError::Invalid { field, reason }
}

/// An error occurring anywhere in the provisioning flow
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// No principal could be selected
    #[error("no user could be selected for creating a token")]
    Principal(#[from] PrincipalResolutionError),

    /// A newly created credential could not be persisted
    #[error("unable to persist the new credential")]
    Persist(#[from] PersistError),

    /// The bearer token could not be signed
    #[error("unable to sign the bearer token")]
    Signing(#[from] SigningError),
}
