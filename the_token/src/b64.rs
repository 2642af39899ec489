//! URL-safe, unpadded base64 as used by each segment of a compact JWS
//!
//! Data is held in memory in its raw form. Costs of encoding are only
//! incurred when the value is displayed.

use std::{error::Error, fmt};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

/// An error while decoding a value which is not properly formatted
/// base64url data
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InvalidBase64Data {
    source: base64::DecodeError,
}

impl From<base64::DecodeError> for InvalidBase64Data {
    fn from(err: base64::DecodeError) -> Self {
        Self { source: err }
    }
}

impl fmt::Display for InvalidBase64Data {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("invalid base64url data")
    }
}

impl Error for InvalidBase64Data {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

/// An owned byte buffer that displays as URL-safe base64 with no padding
#[derive(Clone, Default, Eq, PartialEq, Hash)]
#[must_use]
pub struct Base64Url(Vec<u8>);

impl Base64Url {
    /// Wraps an already decoded buffer
    ///
    /// To decode a base64url-encoded buffer, use [`from_encoded()`][Self::from_encoded()].
    #[inline]
    pub fn from_raw<T: Into<Vec<u8>>>(raw: T) -> Self {
        Self(raw.into())
    }

    /// Decodes a base64url-encoded value into a new owned buffer
    pub fn from_encoded<T: AsRef<[u8]>>(enc: T) -> Result<Self, InvalidBase64Data> {
        let data = URL_SAFE_NO_PAD.decode(enc)?;
        Ok(Self(data))
    }

    /// The raw bytes
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Unwraps the underlying buffer
    #[inline]
    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }

    /// The length of the base64url-encoding of this buffer
    #[inline]
    #[must_use]
    pub const fn encoded_len(&self) -> usize {
        Self::calc_encoded_len(self.0.len())
    }

    /// Calculates the expected length of the base64url-encoding for a buffer of size `len`
    #[inline]
    #[must_use]
    pub const fn calc_encoded_len(len: usize) -> usize {
        let d = len / 3 * 4;
        let m = len % 3;
        if m > 0 {
            d + m + 1
        } else {
            d
        }
    }
}

impl fmt::Display for Base64Url {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&URL_SAFE_NO_PAD.encode(&self.0))
    }
}

impl fmt::Debug for Base64Url {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "`{}`", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_without_padding() {
        let data = Base64Url::from_raw(&b"{\"alg\":\"HS256\",\"typ\":\"JWT\"}"[..]);
        assert_eq!(data.to_string(), "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9");
        assert_eq!(data.encoded_len(), data.to_string().len());
    }

    #[test]
    fn encoded_len_matches_for_each_remainder() {
        for len in 0..7 {
            let data = Base64Url::from_raw(vec![0xfb; len]);
            assert_eq!(data.encoded_len(), data.to_string().len(), "len {}", len);
        }
    }

    #[test]
    fn rejects_padded_or_standard_alphabet() {
        assert!(Base64Url::from_encoded("ab+/").is_err());
        assert!(Base64Url::from_encoded("YQ==").is_err());
        assert_eq!(Base64Url::from_encoded("YQ").unwrap().as_slice(), b"a");
    }
}
