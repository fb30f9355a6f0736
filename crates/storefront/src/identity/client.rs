//! Identity Toolkit REST client.
//!
//! - `accounts:lookup` resolves an ID token to its account
//! - `projects/{project}/accounts:batchGet` lists accounts (service token)

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::instrument;
use url::Url;

use wovry_core::{IdentityId, IdentitySummary};

use super::{IdentityError, IdentityProvider};
use crate::config::IdentityConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Provider error codes that mean "this token is no good".
const INVALID_TOKEN_CODES: &[&str] = &[
    "INVALID_ID_TOKEN",
    "TOKEN_EXPIRED",
    "USER_NOT_FOUND",
    "USER_DISABLED",
    "CREDENTIAL_TOO_OLD_LOGIN_AGAIN",
];

/// Identity Toolkit client.
#[derive(Clone)]
pub struct IdentityToolkitClient {
    client: reqwest::Client,
    api_base: String,
    api_key: SecretString,
    project_id: String,
    service_token: SecretString,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountsResponse {
    #[serde(default)]
    users: Vec<UserRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserRecord {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    /// Milliseconds since the epoch, as a string.
    #[serde(default)]
    created_at: Option<String>,
    /// Milliseconds since the epoch, as a string.
    #[serde(default)]
    last_login_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

fn parse_millis(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw?.parse::<i64>()
        .ok()
        .and_then(DateTime::from_timestamp_millis)
}

impl From<UserRecord> for IdentitySummary {
    fn from(record: UserRecord) -> Self {
        Self {
            creation_time: parse_millis(record.created_at.as_deref()),
            last_sign_in_time: parse_millis(record.last_login_at.as_deref()),
            uid: IdentityId::new(record.local_id),
            email: record.email,
            display_name: record.display_name,
        }
    }
}

/// The provider's error code, e.g. `TOKEN_EXPIRED` out of `"TOKEN_EXPIRED : ..."`.
fn error_code(body: &str) -> Option<String> {
    let envelope: ErrorEnvelope = serde_json::from_str(body).ok()?;
    envelope
        .error
        .message
        .split([' ', ':'])
        .next()
        .map(str::to_string)
}

impl IdentityToolkitClient {
    /// Create a new Identity Toolkit client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &IdentityConfig) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.clone(),
            api_key: config.api_key.clone(),
            project_id: config.project_id.clone(),
            service_token: config.service_token.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, IdentityError> {
        Url::parse(&format!("{}/v1/{path}", self.api_base))
            .map_err(|e| IdentityError::Parse(format!("invalid identity endpoint: {e}")))
    }
}

#[async_trait]
impl IdentityProvider for IdentityToolkitClient {
    #[instrument(skip_all)]
    async fn verify_token(&self, token: &str) -> Result<IdentityId, IdentityError> {
        if token.trim().is_empty() {
            return Err(IdentityError::InvalidToken);
        }

        let mut url = self.endpoint("accounts:lookup")?;
        url.query_pairs_mut()
            .append_pair("key", self.api_key.expose_secret());

        let response = self
            .client
            .post(url)
            .json(&serde_json::json!({ "idToken": token }))
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::BAD_REQUEST
                && error_code(&body).is_some_and(|code| INVALID_TOKEN_CODES.contains(&code.as_str()))
            {
                return Err(IdentityError::InvalidToken);
            }
            return Err(IdentityError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let accounts: AccountsResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::Parse(e.to_string()))?;

        accounts
            .users
            .into_iter()
            .next()
            .map(|user| IdentityId::new(user.local_id))
            .ok_or(IdentityError::InvalidToken)
    }

    #[instrument(skip(self))]
    async fn list_identities(&self, max: u32) -> Result<Vec<IdentitySummary>, IdentityError> {
        let mut url = self.endpoint(&format!("projects/{}/accounts:batchGet", self.project_id))?;
        url.query_pairs_mut()
            .append_pair("maxResults", &max.to_string());

        let response = self
            .client
            .get(url)
            .bearer_auth(self.service_token.expose_secret())
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(IdentityError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let accounts: AccountsResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::Parse(e.to_string()))?;

        tracing::debug!(count = accounts.users.len(), "Listed identities");
        Ok(accounts
            .users
            .into_iter()
            .take(max as usize)
            .map(IdentitySummary::from)
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_record_to_summary() {
        let response: AccountsResponse = serde_json::from_str(
            r#"{"users":[{
                "localId":"uid-1",
                "email":"asha@example.in",
                "displayName":"Asha",
                "createdAt":"1700000000000",
                "lastLoginAt":"not-a-number"
            }]}"#,
        )
        .unwrap();

        let summary = IdentitySummary::from(response.users.into_iter().next().unwrap());
        assert_eq!(summary.uid.as_str(), "uid-1");
        assert_eq!(summary.display_name.as_deref(), Some("Asha"));
        assert_eq!(summary.creation_time.unwrap().timestamp(), 1_700_000_000);
        assert!(summary.last_sign_in_time.is_none());
    }

    #[test]
    fn test_empty_listing() {
        let response: AccountsResponse = serde_json::from_str("{}").unwrap();
        assert!(response.users.is_empty());
    }

    #[test]
    fn test_error_code() {
        assert_eq!(
            error_code(r#"{"error":{"code":400,"message":"TOKEN_EXPIRED"}}"#).as_deref(),
            Some("TOKEN_EXPIRED")
        );
        assert_eq!(
            error_code(r#"{"error":{"message":"INVALID_ID_TOKEN : bad signature"}}"#).as_deref(),
            Some("INVALID_ID_TOKEN")
        );
        assert_eq!(error_code("<html>"), None);
    }
}
