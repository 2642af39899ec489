//! Idempotent provisioning of a long-lived refresh credential and the
//! deterministic bearer token derived from it.
//!
//! Given a principal and a fixed set of identifiers and secret material, this
//! crate ensures that exactly one long-lived credential exists for that
//! principal and signs a compact JSON Web Token ([RFC7519][]) from it using
//! HMAC-SHA-256 ([RFC7518][]). Because every input to the token comes from
//! configuration, including the creation timestamp, repeated runs produce the
//! byte-identical token.
//!
//! [RFC7518]: https://tools.ietf.org/html/rfc7518
//! [RFC7519]: https://tools.ietf.org/html/rfc7519
//!
//! # Example
//!
//! ```
//! use the_token::{config::TokenConfig, principal::Principal, CredentialResolver, TokenSigner};
//!
//! let config = TokenConfig::default();
//! let mut principal = Principal::new("homeowner");
//!
//! let resolver = CredentialResolver::new(config.template());
//! let credential = resolver.resolve(&mut principal).into_credential();
//!
//! let token = TokenSigner::default().sign(&credential).unwrap();
//! assert_eq!(format!("{}", token.token()), "***JWT***");
//! assert_eq!(token.expiry().0, 1_956_355_200);
//! # assert_eq!(principal.credentials().len(), 1);
//! ```
//!
//! The bearer token is a secret. Its `Display` and `Debug` implementations
//! redact it unless the alternate form (`{:#}`) is requested.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

pub mod b64;
mod braids;
pub mod clock;
pub mod config;
pub mod credential;
pub mod error;
pub mod jwa;
pub mod jws;
pub mod jwt;
pub mod principal;
pub mod provision;
pub mod resolver;
pub mod signer;
#[cfg(feature = "file")]
#[cfg_attr(docsrs, doc(cfg(feature = "file")))]
pub mod store;


pub use braids::*;
#[doc(inline)]
pub use credential::{CredentialTemplate, LongLivedCredential, TokenType};
#[doc(inline)]
pub use jwt::{Jwt, JwtRef};
#[doc(inline)]
pub use resolver::{CredentialResolver, Resolution};
#[doc(inline)]
pub use signer::{BearerToken, IssuedToken, TokenSigner, TokenStatus};
