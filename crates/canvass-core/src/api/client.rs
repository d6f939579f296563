//! API client for communicating with the Canvass REST API.
//!
//! This module provides the `ApiClient` struct for making authenticated
//! API requests for campaigns, points, withdrawals, profile and region data.
//! Every accessor issues exactly one HTTP call; nothing is cached or retried.

use std::time::Duration;

use reqwest::{header, multipart, Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, warn};
use url::Url;

use crate::auth::Session;
use crate::models::{
    CampaignMessage, CampaignQuery, Constituency, EngagementReceipt, PointsData, ProfileUpdate,
    Region, RegistrationForm, UserBalance, UserRecord, WithdrawalReceipt, WithdrawalRequest,
};
use crate::points::sanitize_points;

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Envelope keys the backend wraps payloads in.
const DATA_KEY: &str = "data";
const USER_KEY: &str = "user";

/// Connection settings for [`ApiClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    base_url: Url,
    timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ApiError::InvalidBaseUrl(format!("{:?}: {}", base_url, e)))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ApiError::InvalidBaseUrl(format!(
                "scheme must be http or https, got {}",
                base_url.scheme()
            )));
        }
        Ok(Self {
            base_url,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Build the `Authorization` header for a session.
///
/// This is the only place a credential header is derived. An empty session
/// yields `None`, so requests made after logout carry no credentials.
pub fn credential_header(session: &Session) -> Option<header::HeaderValue> {
    let token = session.token()?;
    match header::HeaderValue::from_str(&format!("Bearer {}", token)) {
        Ok(mut value) => {
            value.set_sensitive(true);
            Some(value)
        }
        Err(e) => {
            warn!(error = %e, "Session token is not a valid header value");
            None
        }
    }
}

/// API client for the Canvass backend.
///
/// Credentials are read from the session channel on every request, so the
/// client never needs rebuilding when the user logs in or out.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    session: watch::Receiver<Session>,
}

impl ApiClient {
    /// Create a new API client bound to a session channel
    pub fn new(config: &ClientConfig, session: watch::Receiver<Session>) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            session,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// URL for a path made of fixed names and caller-supplied ids.
    ///
    /// Each segment is percent-encoded as a whole, so an id containing `/`,
    /// `?` or `#` cannot reach another endpoint. Ids that are empty or a
    /// dot segment are refused.
    fn segment_url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        if let Some(bad) = segments.iter().find(|s| matches!(s.trim(), "" | "." | "..")) {
            return Err(ApiError::InvalidId((*bad).to_string()));
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Start a request with JSON accept and the current credentials attached.
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.request_to(method, self.endpoint(path))
    }

    fn request_to<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl + std::fmt::Display,
    {
        debug!(%method, url = %url, "Preparing request");
        let builder = self
            .client
            .request(method, url)
            .header(header::ACCEPT, "application/json");

        // Borrow is released before the request is awaited.
        let auth = credential_header(&self.session.borrow());
        match auth {
            Some(value) => builder.header(header::AUTHORIZATION, value),
            None => builder,
        }
    }

    /// Check if response is successful, returning a classified error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), "Request failed");
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Send a request and return the response body as JSON.
    /// Empty bodies (e.g. 204) come back as `Value::Null`.
    async fn send(&self, builder: RequestBuilder) -> Result<Value, ApiError> {
        let response = builder.send().await?;
        let response = Self::check_response(response).await?;
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("Response is not JSON: {}", e)))
    }

    async fn get_value(&self, path: &str) -> Result<Value, ApiError> {
        self.send(self.request(Method::GET, path)).await
    }

    async fn send_json<B: Serialize + ?Sized>(&self, method: Method, path: &str, body: &B) -> Result<Value, ApiError> {
        self.send(self.request(method, path).json(body)).await
    }

    // ===== Session =====

    /// Exchange credentials for a session.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ApiError> {
        let body = serde_json::json!({ "email": email, "password": password });
        let value = self.send_json(Method::POST, "login", &body).await?;
        session_from_auth_response(value)
    }

    /// Create an account. Sent as multipart so an avatar can ride along.
    pub async fn register(&self, form: &RegistrationForm) -> Result<Session, ApiError> {
        let mut multipart = multipart::Form::new();
        for (name, value) in form.text_fields() {
            multipart = multipart.text(name, value);
        }
        if let Some(ref avatar) = form.avatar {
            let part = multipart::Part::bytes(avatar.bytes.clone())
                .file_name(avatar.file_name.clone())
                .mime_str(&avatar.mime_type)?;
            multipart = multipart.part("avatar", part);
        }

        let value = self
            .send(self.request(Method::POST, "register").multipart(multipart))
            .await?;
        session_from_auth_response(value)
    }

    /// Tell the server a token is being discarded.
    ///
    /// Takes the token explicitly because the local session is already
    /// cleared by the time this runs.
    pub async fn notify_logout(&self, token: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.endpoint("logout"))
            .header(header::ACCEPT, "application/json")
            .bearer_auth(token)
            .send()
            .await?;
        Self::check_response(response).await?;
        Ok(())
    }

    // ===== Profile =====

    pub async fn fetch_profile(&self) -> Result<UserRecord, ApiError> {
        let value = self.get_value("user-profile").await?;
        decode(object_payload(value), "user profile")
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserRecord, ApiError> {
        let value = self.send_json(Method::PATCH, "user-profile", update).await?;
        decode(object_payload(value), "updated user profile")
    }

    // ===== Campaign Messages =====

    pub async fn fetch_campaigns(&self, query: &CampaignQuery) -> Result<Vec<CampaignMessage>, ApiError> {
        let builder = self
            .request(Method::GET, "campaign-messages")
            .query(&query.to_pairs());
        let value = self.send(builder).await?;
        let messages: Vec<CampaignMessage> = decode_list(value, "campaign messages");
        debug!(count = messages.len(), scope = %query.scope, "Fetched campaign messages");
        Ok(messages)
    }

    pub async fn like_campaign(&self, id: &str) -> Result<EngagementReceipt, ApiError> {
        let url = self.segment_url(&["campaign-messages", id, "like"])?;
        let value = self.send(self.request_to(Method::POST, url)).await?;
        decode_receipt(value)
    }

    pub async fn share_campaign(&self, id: &str) -> Result<EngagementReceipt, ApiError> {
        let url = self.segment_url(&["campaign-messages", id, "share"])?;
        let value = self.send(self.request_to(Method::POST, url)).await?;
        decode_receipt(value)
    }

    // ===== Points & Withdrawals =====

    pub async fn fetch_points(&self) -> Result<PointsData, ApiError> {
        let value = self.get_value("points").await?;
        Ok(sanitize_points(&value))
    }

    pub async fn fetch_balance(&self) -> Result<UserBalance, ApiError> {
        let value = self.get_value("user-balance").await?;
        decode(data_payload(value), "user balance")
    }

    /// Submit a withdrawal without client-side checks.
    /// Prefer [`crate::points::request_withdrawal`], which validates first.
    pub async fn submit_withdrawal(&self, request: &WithdrawalRequest) -> Result<WithdrawalReceipt, ApiError> {
        let value = self.send_json(Method::POST, "reward-withdrawals", request).await?;
        if value.is_null() {
            return Ok(WithdrawalReceipt::default());
        }
        decode(value, "withdrawal receipt")
    }

    // ===== Regions =====

    pub async fn fetch_regions(&self) -> Result<Vec<Region>, ApiError> {
        let value = self.get_value("regions").await?;
        Ok(decode_list(value, "regions"))
    }

    pub async fn fetch_constituencies(&self, region_id: &str) -> Result<Vec<Constituency>, ApiError> {
        let url = self.segment_url(&["regions", region_id, "constituencies"])?;
        let value = self.send(self.request_to(Method::GET, url)).await?;
        Ok(decode_list(value, "constituencies"))
    }
}

// ============================================================================
// Response normalization
// ============================================================================

fn decode<T: DeserializeOwned>(value: Value, what: &str) -> Result<T, ApiError> {
    serde_json::from_value(value)
        .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse {}: {}", what, e)))
}

/// Strip one `{"data": ...}` envelope if present.
fn data_payload(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key(DATA_KEY) => map.remove(DATA_KEY).unwrap_or(Value::Null),
        other => other,
    }
}

/// Find the user object in a bare, `{"user": ...}` or `{"data": ...}` reply.
fn object_payload(value: Value) -> Value {
    let value = data_payload(value);
    match value {
        Value::Object(mut map) if map.get(USER_KEY).map(Value::is_object).unwrap_or(false) => {
            map.remove(USER_KEY).unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Decode a list that may be bare, enveloped, or paginated
/// (`{"data": {"data": [...]}}`). Anything without an array decodes to
/// an empty list; elements that fail to parse are skipped.
fn decode_list<T: DeserializeOwned>(value: Value, what: &str) -> Vec<T> {
    let mut current = value;
    for _ in 0..3 {
        if let Value::Array(items) = current {
            return decode_items(items, what);
        }
        let enveloped = current
            .as_object()
            .map(|map| map.contains_key(DATA_KEY))
            .unwrap_or(false);
        if !enveloped {
            break;
        }
        current = data_payload(current);
    }
    debug!(what, "Response held no list, treating as empty");
    Vec::new()
}

fn decode_items<T: DeserializeOwned>(items: Vec<Value>, what: &str) -> Vec<T> {
    let total = items.len();
    let parsed: Vec<T> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                debug!(what, error = %e, "Skipping malformed list entry");
                None
            }
        })
        .collect();
    if parsed.len() != total {
        warn!(what, skipped = total - parsed.len(), "Dropped malformed entries");
    }
    parsed
}

fn decode_receipt(value: Value) -> Result<EngagementReceipt, ApiError> {
    match value {
        Value::Null => Ok(EngagementReceipt::default()),
        Value::Object(ref map) if map.get(DATA_KEY).map(Value::is_object).unwrap_or(false) => {
            // Prefer counters inside the envelope, keep the top-level message.
            let message = map.get("message").and_then(Value::as_str).map(str::to_string);
            let mut receipt: EngagementReceipt = decode(data_payload(value), "engagement receipt")?;
            if receipt.message.is_none() {
                receipt.message = message;
            }
            Ok(receipt)
        }
        other => decode(other, "engagement receipt"),
    }
}

/// Pull `{token, user}` out of a login/register reply.
///
/// Accepted shapes: `{"token", "user"}`, `{"access_token", "user"}`,
/// `{"user": {..., "token"}}`, and any of these inside `{"data": ...}`.
pub(crate) fn session_from_auth_response(value: Value) -> Result<Session, ApiError> {
    let root = match value {
        Value::Object(ref map) if map.get(DATA_KEY).map(Value::is_object).unwrap_or(false) => {
            data_payload(value)
        }
        other => other,
    };

    let user: Option<UserRecord> = match root.get(USER_KEY) {
        Some(user) if user.is_object() => Some(decode(user.clone(), "user")?),
        _ => None,
    };

    let token = root
        .get("token")
        .or_else(|| root.get("access_token"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| user.as_ref().and_then(|u| u.token.clone()))
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::InvalidResponse("Authentication response did not include a token".to_string()))?;

    Ok(Session::authenticated(token, user))
}
