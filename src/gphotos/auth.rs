//! OAuth token store and access-token refresh.
//!
//! The store is a JSON file at `GPSC_CONFIGPATH` holding a refresh token
//! provisioned out of band, plus a cached access token and its expiry.
//! A missing store or a failed refresh is fatal for the sync loop.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::error::GPhotosError;

const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

/// Refresh this long before the recorded expiry to absorb clock skew.
const EXPIRY_SLACK_SECS: i64 = 60;

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenStore {
    pub refresh_token: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenStore {
    pub fn load(path: &Path) -> Result<Self, GPhotosError> {
        if !path.exists() {
            return Err(GPhotosError::FailedLogin(format!(
                "no token store at {}; provision a refresh token there first",
                path.display()
            )));
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), GPhotosError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Whether the cached access token is still usable at `now`.
    pub fn fresh_token(&self, now: DateTime<Utc>) -> Option<&str> {
        match (&self.access_token, self.expires_at) {
            (Some(token), Some(expires_at))
                if expires_at - Duration::seconds(EXPIRY_SLACK_SECS) > now =>
            {
                Some(token)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    expires_in: i64,
}

/// Return a valid access token, refreshing and persisting the store when the
/// cached one is stale.
pub async fn authenticate(
    http: &reqwest::Client,
    client_id: &str,
    client_secret: &str,
    store_path: &Path,
) -> Result<String, GPhotosError> {
    let mut store = TokenStore::load(store_path)?;

    if let Some(token) = store.fresh_token(Utc::now()) {
        tracing::debug!("cached access token still valid");
        return Ok(token.to_string());
    }

    tracing::info!("refreshing access token");
    let response = http
        .post(TOKEN_ENDPOINT)
        .form(&[
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("refresh_token", store.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(GPhotosError::FailedLogin(format!(
            "token refresh returned {status}: {body}"
        )));
    }

    let refreshed: RefreshResponse = response.json().await?;
    store.access_token = Some(refreshed.access_token.clone());
    store.expires_at = Some(Utc::now() + Duration::seconds(refreshed.expires_in));
    store.save(store_path)?;

    Ok(refreshed.access_token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_store_is_login_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = TokenStore::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, GPhotosError::FailedLogin(_)));
    }

    #[test]
    fn store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        let store = TokenStore {
            refresh_token: "refresh".into(),
            access_token: Some("access".into()),
            expires_at: Some(Utc::now()),
        };
        store.save(&path).unwrap();

        let loaded = TokenStore::load(&path).unwrap();
        assert_eq!(loaded.refresh_token, "refresh");
        assert_eq!(loaded.access_token.as_deref(), Some("access"));
    }

    #[test]
    fn refresh_token_only_store_parses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, r#"{"refresh_token": "r"}"#).unwrap();
        let store = TokenStore::load(&path).unwrap();
        assert!(store.access_token.is_none());
        assert!(store.fresh_token(Utc::now()).is_none());
    }

    #[test]
    fn token_near_expiry_not_fresh() {
        let now = Utc::now();
        let store = TokenStore {
            refresh_token: "r".into(),
            access_token: Some("a".into()),
            expires_at: Some(now + Duration::seconds(EXPIRY_SLACK_SECS / 2)),
        };
        assert!(store.fresh_token(now).is_none());

        let fresh = TokenStore {
            expires_at: Some(now + Duration::seconds(3600)),
            ..store
        };
        assert_eq!(fresh.fresh_token(now), Some("a"));
    }
}
