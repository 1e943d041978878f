//!
//! src/fetch.rs  Andrew Belles  Oct 12th, 2026
//!
//! Defines methods for hitting the spotify endpoints the job needs and
//! the fetcher that turns a recently-played response into raw items,
//! refreshing the bearer once on a 401
//!

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, header, redirect, RequestBuilder, StatusCode};
use tracing::{debug, info, warn};

use crate::auth::TokenProvider;
use crate::config::{HttpConfig, SpotifyConfig, SpotifyCredentials};
use crate::errors::EtlError;
use crate::types::RawItem;

/// Status and body of a finished request, whatever the status was
#[derive(Debug, Clone)]
pub struct ApiReply {
    pub status: u16,
    pub body: String
}

impl ApiReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == StatusCode::UNAUTHORIZED.as_u16()
    }

    async fn from_response(response: reqwest::Response) -> Result<Self, EtlError> {
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok( Self { status, body } )
    }
}

///
/// The two spotify calls the job makes. Implemented over reqwest by
/// SpotifyClient and by scripted fakes in tests
///
#[async_trait]
pub trait SpotifyApi: Send + Sync {
    /// GET /v1/me/player/recently-played?after={ms}
    async fn recently_played(&self, after_ms: i64, bearer: &str) ->
        Result<ApiReply, EtlError>;

    /// POST /api/token  grant_type=refresh_token
    async fn exchange_refresh_token(&self, credentials: &SpotifyCredentials) ->
        Result<ApiReply, EtlError>;
}

/// Client building functionality
fn client_helper(http: &HttpConfig) -> reqwest::ClientBuilder {
    Client::builder()
        .timeout(http.timeout)
        .connect_timeout(http.connect_timeout)
        .pool_max_idle_per_host(http.pool_max_idle_per_host)
        .pool_idle_timeout(Some(http.pool_idle_timeout))
        .redirect(redirect::Policy::limited(http.max_redirects as usize))
}

pub fn base_client(http: &HttpConfig) -> Result<Client, EtlError> {
    let mut h = header::HeaderMap::new();
    h.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
    client_helper(http)
        .default_headers(h)
        .build()
        .map_err(|e| EtlError::Http(format!("build client: {e}")))
}

#[derive(Clone, Debug)]
pub struct SpotifyClient {
    pub http: Client,
    pub cfg: SpotifyConfig
}

impl SpotifyClient {
    pub fn new(http_config: &HttpConfig, cfg: &SpotifyConfig) ->
        Result<Self, EtlError> {

        let http = base_client(http_config)?;
        Ok( Self {
            http,
            cfg: cfg.clone()
        })
    }

    pub fn token_request(&self, credentials: &SpotifyCredentials) -> RequestBuilder {
        self.http
            .post(self.cfg.token_url.clone())
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", credentials.refresh_token.as_str()),
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
            ])
    }

    /// GET /v1/me/player/recently-played?after=...
    pub fn recently_played_request(&self, after_ms: i64, bearer: &str) ->
        Result<RequestBuilder, EtlError> {
        let url = self.cfg.api_base.join("me/player/recently-played")
            .map_err(|e| EtlError::Config(format!("recently-played url: {e}")))?;
        Ok( self.http
            .get(url)
            .bearer_auth(bearer)
            .query(&[("after", after_ms.to_string())]) )
    }
}

#[async_trait]
impl SpotifyApi for SpotifyClient {
    async fn recently_played(&self, after_ms: i64, bearer: &str) ->
        Result<ApiReply, EtlError> {
        let response = self.recently_played_request(after_ms, bearer)?
            .send()
            .await?;
        ApiReply::from_response(response).await
    }

    async fn exchange_refresh_token(&self, credentials: &SpotifyCredentials) ->
        Result<ApiReply, EtlError> {
        let response = self.token_request(credentials).send().await?;
        ApiReply::from_response(response).await
    }
}

/// Millisecond epoch `days` before now, truncated to whole seconds
pub fn lookback_boundary(now: DateTime<Utc>, days: i64) -> Result<i64, EtlError> {
    Duration::try_days(days)
        .and_then(|d| now.checked_sub_signed(d))
        .map(|start| start.timestamp() * 1000)
        .ok_or_else(|| EtlError::Config(format!("lookback of {days} days is out of range")))
}

///
/// Pulls the recently-played items after a boundary
///
pub struct TrackFetcher {
    api: Arc<dyn SpotifyApi>,
    tokens: Arc<TokenProvider>
}

impl TrackFetcher {
    pub fn new(api: Arc<dyn SpotifyApi>, tokens: Arc<TokenProvider>) -> Self {
        Self { api, tokens }
    }

    /// Items played after `since_ms`, in the order the api returned them.
    /// A 401 triggers exactly one refresh and one retry of the same request
    pub async fn fetch(&self, since_ms: i64) -> Result<Vec<RawItem>, EtlError> {
        let bearer = self.tokens.get_token().await;
        let mut reply = self.api.recently_played(since_ms, &bearer).await?;

        if reply.is_unauthorized() {
            warn!(status = reply.status, "fetch.token.expired");
            let fresh = self.tokens.refresh().await?;
            reply = self.api.recently_played(since_ms, &fresh).await?;
        }

        if !reply.is_success() {
            debug!(status = reply.status, body = %reply.body, "fetch.failed");
            return Err(EtlError::Fetch { status: reply.status });
        }

        let items = items_from_body(&reply.body)?;
        info!(since_ms, items = items.len(), "fetch.done");
        Ok(items)
    }
}

fn items_from_body(body: &str) -> Result<Vec<RawItem>, EtlError> {
    let mut json: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| EtlError::MalformedItem(format!("response body is not json: {e}")))?;

    match json.get_mut("items").map(serde_json::Value::take) {
        Some(serde_json::Value::Array(items)) => Ok(items),
        Some(_) => Err(EtlError::MalformedItem("`items` is not an array".into())),
        None => Err(EtlError::MalformedItem("response has no `items`".into()))
    }
}
