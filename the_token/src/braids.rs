use aliri_braid::braid;
use std::fmt;

macro_rules! limited_reveal {
    ($ty:ty: $hidden:literal, $default:literal) => {
        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                if f.alternate() {
                    f.write_str("\"")?;
                    limited_reveal(&self.0, &mut *f, $default)?;
                    f.write_str("\"")
                } else {
                    f.write_str(concat!("***", $hidden, "***"))
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                if f.alternate() {
                    limited_reveal(&self.0, &mut *f, usize::MAX)
                } else {
                    f.write_str(concat!("***", $hidden, "***"))
                }
            }
        }
    };
}

/// Writes at most `f.width()` characters of `unprotected`, falling back to
/// `default_len`, and marks a truncation with `…`
pub(crate) fn limited_reveal(
    unprotected: &str,
    f: &mut fmt::Formatter,
    default_len: usize,
) -> fmt::Result {
    let max_len = f.width().unwrap_or(default_len);
    if max_len <= 1 {
        f.write_str("…")
    } else if max_len > unprotected.len() {
        f.write_str(unprotected)
    } else {
        match unprotected.char_indices().nth(max_len - 2) {
            Some((idx, c)) if idx + c.len_utf8() < unprotected.len() => {
                f.write_str(&unprotected[0..idx + c.len_utf8()])?;
                f.write_str("…")
            }
            _ => f.write_str(unprotected),
        }
    }
}

/// The identifier of a long-lived credential
///
/// Supplied by configuration rather than generated, so that re-running the
/// provisioning flow finds the credential it created last time.
#[braid(serde)]
pub struct CredentialId;

/// The OAuth2 client ID a credential was issued to
#[braid(serde)]
pub struct ClientId;

/// A human-readable tag naming where a credential came from
#[braid(serde)]
pub struct ClientLabel;

/// The login name of a principal
#[braid(serde)]
pub struct Username;

/// The raw refresh-token value bound into a long-lived credential
#[braid(serde, debug = "owned", display = "owned")]
pub struct RefreshSecret;

limited_reveal!(RefreshSecretRef: "REFRESH TOKEN", 5);

/// Key material used to sign bearer tokens derived from a credential
#[braid(serde, debug = "owned", display = "owned")]
pub struct SigningSecret;

limited_reveal!(SigningSecretRef: "SIGNING SECRET", 0);
