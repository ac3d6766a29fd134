//! Remote API credentials.
//!
//! Two forms are accepted, read from the environment:
//!
//! - `GITHUB_TOKEN`: used as-is.
//! - `GITHUB_APP_ID`, `GITHUB_APP_INSTALLATION_ID` and
//!   `GITHUB_APP_PRIVATE_KEY`: a GitHub App. A short-lived RS256 JWT is
//!   signed with the private key and exchanged for an installation token.
//!
//! A token takes precedence when both forms are present.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use log::debug;
use serde::{Deserialize, Serialize};

use super::github::{build_http_client, error_message, transport_error, with_api_headers};
use crate::error::{Error, Result};

pub const TOKEN_VAR: &str = "GITHUB_TOKEN";
pub const APP_ID_VAR: &str = "GITHUB_APP_ID";
pub const INSTALLATION_ID_VAR: &str = "GITHUB_APP_INSTALLATION_ID";
pub const PRIVATE_KEY_VAR: &str = "GITHUB_APP_PRIVATE_KEY";

/// Where API access comes from.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Token(String),
    App {
        app_id: String,
        installation_id: String,
        private_key: String,
    },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Token(_) => f.write_str("Credentials::Token(..)"),
            Credentials::App {
                app_id,
                installation_id,
                ..
            } => f
                .debug_struct("Credentials::App")
                .field("app_id", app_id)
                .field("installation_id", installation_id)
                .finish_non_exhaustive(),
        }
    }
}

impl Credentials {
    /// Read credentials from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read credentials through `lookup`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = get(TOKEN_VAR) {
            return Ok(Credentials::Token(token));
        }

        match (get(APP_ID_VAR), get(INSTALLATION_ID_VAR), get(PRIVATE_KEY_VAR)) {
            (Some(app_id), Some(installation_id), Some(private_key)) => {
                for (var, value) in [(APP_ID_VAR, &app_id), (INSTALLATION_ID_VAR, &installation_id)] {
                    if value.parse::<u64>().is_err() {
                        return Err(Error::Credentials {
                            message: format!("{} must be numeric, got '{}'", var, value),
                        });
                    }
                }
                Ok(Credentials::App {
                    app_id,
                    installation_id,
                    // Keys stored in single-line secrets carry literal "\n".
                    private_key: private_key.replace("\\n", "\n"),
                })
            }
            (None, None, None) => Err(Error::Credentials {
                message: format!(
                    "no credentials found; set {} or {}, {} and {}",
                    TOKEN_VAR, APP_ID_VAR, INSTALLATION_ID_VAR, PRIVATE_KEY_VAR
                ),
            }),
            (app_id, installation_id, private_key) => {
                let missing: Vec<&str> = [
                    (APP_ID_VAR, app_id.is_none()),
                    (INSTALLATION_ID_VAR, installation_id.is_none()),
                    (PRIVATE_KEY_VAR, private_key.is_none()),
                ]
                .into_iter()
                .filter_map(|(var, absent)| absent.then_some(var))
                .collect();
                Err(Error::Credentials {
                    message: format!("incomplete GitHub App credentials; missing {}", missing.join(", ")),
                })
            }
        }
    }

    /// Produce a bearer token for `api_url`, exchanging App credentials if
    /// needed.
    pub fn resolve_token(&self, api_url: &str, timeout: Duration) -> Result<String> {
        match self {
            Credentials::Token(token) => Ok(token.clone()),
            Credentials::App {
                app_id,
                installation_id,
                private_key,
            } => {
                let jwt = sign_app_jwt(app_id, private_key, unix_now()?)?;
                exchange_installation_token(api_url, installation_id, &jwt, timeout)
            }
        }
    }
}

fn unix_now() -> Result<u64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| Error::Credentials {
            message: e.to_string(),
        })
}

/// Sign the App JWT. Issued a minute in the past to absorb clock drift.
fn sign_app_jwt(app_id: &str, private_key: &str, now: u64) -> Result<String> {
    #[derive(Serialize)]
    struct Claims<'a> {
        iat: u64,
        exp: u64,
        iss: &'a str,
    }

    let key = EncodingKey::from_rsa_pem(private_key.as_bytes()).map_err(|e| Error::Credentials {
        message: format!("invalid {}: {}", PRIVATE_KEY_VAR, e),
    })?;
    let claims = Claims {
        iat: now.saturating_sub(60),
        exp: now + 600,
        iss: app_id,
    };
    jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key).map_err(|e| {
        Error::Credentials {
            message: e.to_string(),
        }
    })
}

fn exchange_installation_token(
    api_url: &str,
    installation_id: &str,
    jwt: &str,
    timeout: Duration,
) -> Result<String> {
    #[derive(Deserialize)]
    struct InstallationToken {
        token: String,
    }

    let operation = format!("exchange token for installation {}", installation_id);
    let endpoint = format!(
        "{}/app/installations/{}/access_tokens",
        api_url.trim_end_matches('/'),
        installation_id
    );
    debug!("remote: {}", operation);

    let response = with_api_headers(build_http_client(timeout)?.post(endpoint))
        .bearer_auth(jwt)
        .send()
        .map_err(|e| transport_error(&operation, e))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .unwrap_or_else(|_| "unable to read token response body".to_string());
        return Err(Error::Credentials {
            message: format!("{} failed ({}): {}", operation, status.as_u16(), error_message(&body)),
        });
    }

    let payload: InstallationToken = response
        .json()
        .map_err(|e| transport_error(&operation, e))?;
    Ok(payload.token)
}
