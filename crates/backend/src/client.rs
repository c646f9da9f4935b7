//! Hosted backend client: auth service plus row-level-secured tables.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use edugate_auth::{
    HodProfile, IdentityVerifier, RemoteSession, SignInError, VerifierError,
};
use edugate_core::UserId;

use crate::config::BackendConfig;
use crate::events::{AuthEvent, AuthEventBus};

const APIKEY_HEADER: &str = "apikey";

#[derive(Debug, Clone)]
struct TokenPair {
    access_token: String,
    refresh_token: Option<String>,
}

/// HTTP client for the hosted backend.
///
/// Auth endpoints live under `/auth/v1`, row-level-secured tables under
/// `/rest/v1` with equality filters. The client holds the token pair from
/// the last sign-in and publishes lifecycle events on the [`AuthEventBus`];
/// it never touches the session store.
pub struct HostedBackendClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    tokens: Mutex<Option<TokenPair>>,
    events: AuthEventBus,
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire DTOs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    user: RemoteUser,
}

#[derive(Debug, Deserialize)]
struct RemoteUser {
    id: UserId,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MembershipRow {
    user_id: UserId,
}

#[derive(Debug, Deserialize)]
struct ProfileRow {
    id: UserId,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    #[serde(default)]
    profile_complete: bool,
}

impl HostedBackendClient {
    pub fn new(config: &BackendConfig, events: AuthEventBus) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            tokens: Mutex::new(None),
            events,
        }
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.base_url, path)
    }

    fn rest_url(&self, path: &str) -> String {
        format!("{}/rest/v1{}", self.base_url, path)
    }

    fn bearer(&self) -> Option<String> {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|t| t.access_token.clone())
    }

    fn set_tokens(&self, tokens: Option<TokenPair>) {
        *self
            .tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = tokens;
    }

    /// Introspect one access token. `Ok(None)` means the token was rejected.
    async fn fetch_user(&self, token: &str) -> Result<Option<RemoteSession>, VerifierError> {
        let res = self
            .http
            .get(self.auth_url("/user"))
            .header(APIKEY_HEADER, &self.api_key)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| VerifierError::Network(e.to_string()))?;

        if res.status() == StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        if !res.status().is_success() {
            return Err(VerifierError::Backend(format!(
                "user introspection returned {}",
                res.status()
            )));
        }

        let user: RemoteUser = res
            .json()
            .await
            .map_err(|e| VerifierError::Backend(e.to_string()))?;

        Ok(Some(RemoteSession {
            user_id: user.id,
            email: user.email.unwrap_or_default(),
        }))
    }

    /// One refresh-token grant attempt. Publishes `TokenRefreshed` when the
    /// backend rotates the pair.
    async fn try_refresh(&self) -> bool {
        let refresh = self
            .tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(|t| t.refresh_token.clone());
        let Some(refresh) = refresh else {
            return false;
        };

        let res = self
            .http
            .post(self.auth_url("/token?grant_type=refresh_token"))
            .header(APIKEY_HEADER, &self.api_key)
            .json(&serde_json::json!({ "refresh_token": refresh }))
            .send()
            .await;

        let res = match res {
            Ok(res) if res.status().is_success() => res,
            Ok(res) => {
                tracing::debug!(status = %res.status(), "token refresh rejected");
                return false;
            }
            Err(err) => {
                tracing::debug!(error = %err, "token refresh failed");
                return false;
            }
        };

        match res.json::<TokenResponse>().await {
            Ok(tok) => {
                self.set_tokens(Some(TokenPair {
                    access_token: tok.access_token,
                    refresh_token: tok.refresh_token,
                }));
                self.events.publish(AuthEvent::TokenRefreshed);
                true
            }
            Err(err) => {
                tracing::debug!(error = %err, "token refresh response unreadable");
                false
            }
        }
    }
}

#[async_trait]
impl IdentityVerifier for HostedBackendClient {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<RemoteSession, SignInError> {
        let res = self
            .http
            .post(self.auth_url("/token?grant_type=password"))
            .header(APIKEY_HEADER, &self.api_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| SignInError::Network(e.to_string()))?;

        let status = res.status();
        if status.is_client_error() {
            // 400/401/422 from the token endpoint all mean rejected
            // credentials; the body is not trusted for more detail.
            return Err(SignInError::Credential);
        }
        if !status.is_success() {
            return Err(SignInError::Network(format!(
                "token endpoint returned {status}"
            )));
        }

        let tok: TokenResponse = res
            .json()
            .await
            .map_err(|e| SignInError::Network(e.to_string()))?;

        let session = RemoteSession {
            user_id: tok.user.id,
            email: tok.user.email.clone().unwrap_or_default(),
        };

        self.set_tokens(Some(TokenPair {
            access_token: tok.access_token,
            refresh_token: tok.refresh_token,
        }));
        self.events.publish(AuthEvent::SignedIn);

        Ok(session)
    }

    async fn current_session(&self) -> Result<Option<RemoteSession>, VerifierError> {
        let Some(token) = self.bearer() else {
            return Ok(None);
        };

        if let Some(session) = self.fetch_user(&token).await? {
            return Ok(Some(session));
        }

        // Access token rejected; one refresh attempt before reporting
        // signed-out.
        if self.try_refresh().await {
            if let Some(token) = self.bearer() {
                if let Some(session) = self.fetch_user(&token).await? {
                    return Ok(Some(session));
                }
            }
        }

        self.set_tokens(None);
        Ok(None)
    }

    async fn is_role_member(&self, user_id: UserId) -> bool {
        let url = self.rest_url(&format!("/hods?select=user_id&user_id=eq.{user_id}"));
        let mut req = self.http.get(url).header(APIKEY_HEADER, &self.api_key);
        if let Some(token) = self.bearer() {
            req = req.bearer_auth(token);
        }

        let res = match req.send().await {
            Ok(res) => res,
            Err(err) => {
                tracing::warn!(error = %err, "allow-list query failed; treating as non-member");
                return false;
            }
        };

        if !res.status().is_success() {
            tracing::warn!(status = %res.status(), "allow-list query rejected; treating as non-member");
            return false;
        }

        let rows: Vec<MembershipRow> = match res.json().await {
            Ok(rows) => rows,
            Err(err) => {
                tracing::warn!(error = %err, "allow-list response unreadable; treating as non-member");
                return false;
            }
        };

        match rows.as_slice() {
            [row] => row.user_id == user_id,
            [] => false,
            _ => {
                // The schema expects uniqueness; duplicates are a data bug.
                tracing::warn!(
                    user = %user_id,
                    rows = rows.len(),
                    "ambiguous allow-list result; treating as non-member"
                );
                false
            }
        }
    }

    async fn fetch_profile(&self, user_id: UserId) -> Result<HodProfile, VerifierError> {
        let url = self.rest_url(&format!(
            "/profiles?select=id,display_name,email,email_verified,profile_complete&id=eq.{user_id}"
        ));
        let mut req = self.http.get(url).header(APIKEY_HEADER, &self.api_key);
        if let Some(token) = self.bearer() {
            req = req.bearer_auth(token);
        }

        let res = req
            .send()
            .await
            .map_err(|e| VerifierError::Network(e.to_string()))?;

        if !res.status().is_success() {
            return Err(VerifierError::Backend(format!(
                "profile query returned {}",
                res.status()
            )));
        }

        let rows: Vec<ProfileRow> = res
            .json()
            .await
            .map_err(|e| VerifierError::Backend(e.to_string()))?;

        let Some(row) = rows.into_iter().next() else {
            return Err(VerifierError::ProfileMissing);
        };

        Ok(HodProfile {
            id: row.id,
            display_name: row.display_name.unwrap_or_default(),
            email: row.email.unwrap_or_default(),
            email_verified: row.email_verified,
            profile_complete: row.profile_complete,
        })
    }

    async fn sign_out(&self) -> Result<(), VerifierError> {
        // Local state is dropped whatever the network says; a failed logout
        // call must not leave this side believing it is signed in.
        let token = self.bearer();
        self.set_tokens(None);
        self.events.publish(AuthEvent::SignedOut);

        if let Some(token) = token {
            let res = self
                .http
                .post(self.auth_url("/logout"))
                .header(APIKEY_HEADER, &self.api_key)
                .bearer_auth(token)
                .send()
                .await
                .map_err(|e| VerifierError::Network(e.to_string()))?;

            let status = res.status();
            if !(status.is_success() || status == StatusCode::UNAUTHORIZED) {
                return Err(VerifierError::Backend(format!("logout returned {status}")));
            }
        }

        Ok(())
    }
}
