//! Credential values and Authorization header resolution.
//!
//! A credential is either a bearer token obtained from the directory's
//! `authenticate` action, or an identifier/secret pair resolved to HTTP
//! Basic authentication. Exactly one `Authorization` header is produced
//! per credential.

use crate::error::{Error, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};

/// A credential presented to the directory service.
///
/// Construct with [`Credentials::bearer`] or [`Credentials::password`].
/// Secrets are held as [`SecretString`] and never appear in `Debug`
/// output.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// A time-limited bearer token issued by the `authenticate` action.
    Bearer(SecretString),

    /// A resource identifier and password pair (HTTP Basic).
    Password {
        /// Resource identifier of the authenticating entry.
        id: String,
        /// The password as a UTF-8 string.
        secret: SecretString,
    },
}

impl Credentials {
    /// Create a bearer-token credential.
    #[must_use]
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer(SecretString::from(token.into()))
    }

    /// Create an identifier/password credential.
    #[must_use]
    pub fn password(id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self::Password {
            id: id.into(),
            secret: SecretString::from(secret.into()),
        }
    }

    /// Resolve this credential to its `Authorization` header value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the identifier of a password
    /// credential is empty, or if the resolved value is not a valid
    /// header (a caller contract violation, not a runtime condition).
    pub fn authorization(&self) -> Result<HeaderValue> {
        let value = match self {
            Self::Bearer(token) => format!("Bearer {}", token.expose_secret()),
            Self::Password { id, secret } => {
                if id.is_empty() {
                    return Err(Error::Validation(
                        "You must set the resource identifier and the password".to_string(),
                    ));
                }
                let pair = format!("{id}:{}", secret.expose_secret());
                format!("Basic {}", BASE64.encode(pair))
            }
        };
        let mut header = HeaderValue::from_str(&value).map_err(|err| {
            Error::Validation(format!("credential is not a valid header value: {err}"))
        })?;
        header.set_sensitive(true);
        Ok(header)
    }
}

/// Build the common header set for a directory request.
///
/// Always includes `Accept` and `Content-Type`; adds exactly one
/// `Authorization` header when credentials are supplied.
///
/// # Errors
///
/// Propagates [`Credentials::authorization`] failures.
pub fn common_headers(credentials: Option<&Credentials>) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Some(credentials) = credentials {
        headers.insert(AUTHORIZATION, credentials.authorization()?);
    }
    Ok(headers)
}
