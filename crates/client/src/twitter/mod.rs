//! Twitter timeline client.
//!
//! Fetches the most recent tweets of one account for the feed refresher.
//!
//! ### API
//!
//! - **Endpoint**: `GET https://api.twitter.com/1.1/statuses/user_timeline.json`
//! - **Authentication**: OAuth 1.0a user context, HMAC-SHA1 signed header.
//! - **Parameters**: `user_id` or `screen_name`, `count`, `exclude_replies`,
//!   `tweet_mode=extended`.
//! - **Errors**: 401/403 map to `AuthError`, 429 to `RateLimited`, other
//!   non-success statuses to `HttpError`. The refresher retries all of them.

pub mod error;
pub mod oauth;
pub mod response;

pub use error::TwitterError;
pub use oauth::OAuthCredentials;
pub use response::{ApiTweet, ApiUser, parse_timeline};

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use gemfeed_core::{AccountRef, AppConfig, Error, FetchRequest, Item, TimelineSource};
use reqwest::header;

/// Default base URL for the v1.1 REST API.
const DEFAULT_BASE_URL: &str = "https://api.twitter.com/1.1";

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Default cap on the response body.
const DEFAULT_MAX_BYTES: usize = 5 * 1024 * 1024;

/// Default user agent.
const DEFAULT_USER_AGENT: &str = concat!("gemfeed/", env!("CARGO_PKG_VERSION"));

/// Twitter client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub credentials: OAuthCredentials,
    /// Base URL (default: https://api.twitter.com/1.1).
    pub base_url: String,
    /// Request timeout (default: 20s).
    pub timeout: Duration,
    /// User-agent string (default: gemfeed/0.x).
    pub user_agent: String,
    /// Largest accepted response body (default: 5 MiB).
    pub max_bytes: usize,
}

impl ClientConfig {
    pub fn new(credentials: OAuthCredentials) -> Self {
        Self {
            credentials,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }

    /// Build from the `twitter` section of the application config.
    pub fn from_app_config(config: &AppConfig) -> Self {
        let t = &config.twitter;
        Self::new(OAuthCredentials {
            consumer_key: t.consumer_key.clone(),
            consumer_secret: t.consumer_secret.clone(),
            token: t.access_token.clone(),
            token_secret: t.access_secret.clone(),
        })
    }
}

/// Twitter REST API client.
#[derive(Debug, Clone)]
pub struct TwitterClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl TwitterClient {
    /// Create a new client with the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self, TwitterError> {
        config.credentials.validate()?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| TwitterError::Network(Arc::new(e)))?;

        Ok(Self { http, config })
    }

    /// Full URL of the user timeline endpoint, without query.
    fn timeline_url(&self) -> String {
        format!("{}/statuses/user_timeline.json", self.config.base_url.trim_end_matches('/'))
    }

    /// Query parameters for a timeline request, in the order they are sent.
    pub fn timeline_params(request: &FetchRequest) -> Vec<(&'static str, String)> {
        let mut params = Vec::with_capacity(4);
        match &request.account {
            AccountRef::UserId(id) => params.push(("user_id", id.to_string())),
            AccountRef::ScreenName(name) => params.push(("screen_name", name.clone())),
        }
        params.push(("count", request.max_count.to_string()));
        params.push(("exclude_replies", request.exclude_replies.to_string()));
        params.push(("tweet_mode", "extended".to_string()));
        params
    }

    /// Fetch the most recent items for `request.account`, newest first.
    pub async fn user_timeline(&self, request: &FetchRequest) -> Result<Vec<Item>, TwitterError> {
        let start = Instant::now();
        let base_url = self.timeline_url();
        let params = Self::timeline_params(request);

        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", oauth::encode(k), oauth::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let url = url::Url::parse(&format!("{base_url}?{query}")).map_err(|e| TwitterError::Parse(e.to_string()))?;

        let authorization = self.config.credentials.authorization("GET", &base_url, &params);

        tracing::debug!(account = %request.account, count = request.max_count, "fetching user timeline");

        let http_response = self
            .http
            .get(url)
            .header(header::AUTHORIZATION, authorization)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = http_response.status();
        tracing::debug!("timeline response status: {}", status);

        if status == 401 || status == 403 {
            return Err(TwitterError::AuthError);
        }

        if status == 429 {
            return Err(TwitterError::RateLimited);
        }

        if !status.is_success() {
            return Err(TwitterError::HttpError { status: status.as_u16() });
        }

        let bytes = read_capped(http_response, self.config.max_bytes).await?;
        let items = parse_timeline(&bytes).map_err(|e| TwitterError::Parse(e.to_string()))?;

        tracing::debug!("timeline fetched in {:?}, {} items", start.elapsed(), items.len());

        Ok(items)
    }
}

/// Read the response body, giving up once it exceeds `max_bytes`.
async fn read_capped(mut response: reqwest::Response, max_bytes: usize) -> Result<Vec<u8>, TwitterError> {
    if let Some(len) = response.content_length()
        && len > max_bytes as u64
    {
        return Err(TwitterError::TooLarge { size: len, max: max_bytes });
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        if body.len() + chunk.len() > max_bytes {
            return Err(TwitterError::TooLarge { size: (body.len() + chunk.len()) as u64, max: max_bytes });
        }
        body.extend_from_slice(&chunk);
    }

    Ok(body)
}

#[async_trait]
impl TimelineSource for TwitterClient {
    async fn fetch_recent(&self, request: &FetchRequest) -> Result<Vec<Item>, Error> {
        Ok(self.user_timeline(request).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answer one HTTP request with `response` and return the base URL.
    async fn upstream_once(response: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let _ = socket.write_all(&response).await;
            let _ = socket.shutdown().await;
        });

        format!("http://{addr}/1.1")
    }

    fn client_for(base_url: String, max_bytes: usize) -> TwitterClient {
        let mut config = ClientConfig::new(credentials());
        config.base_url = base_url;
        config.max_bytes = max_bytes;
        TwitterClient::new(config).unwrap()
    }

    fn credentials() -> OAuthCredentials {
        OAuthCredentials {
            consumer_key: "ck".into(),
            consumer_secret: "cs".into(),
            token: "at".into(),
            token_secret: "as".into(),
        }
    }

    #[test]
    fn test_client_new_missing_credentials() {
        let mut creds = credentials();
        creds.consumer_key.clear();
        let result = TwitterClient::new(ClientConfig::new(creds));
        assert!(matches!(result, Err(TwitterError::MissingCredentials("consumer_key"))));
    }

    #[test]
    fn test_config_defaults() {
        let config = ClientConfig::new(credentials());
        assert_eq!(config.base_url, "https://api.twitter.com/1.1");
        assert_eq!(config.timeout, Duration::from_secs(20));
        assert!(config.user_agent.starts_with("gemfeed/"));
        assert_eq!(config.max_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn test_config_from_app_config() {
        let mut app = AppConfig::default();
        app.twitter.consumer_key = "ck".into();
        app.twitter.access_secret = "as".into();

        let config = ClientConfig::from_app_config(&app);
        assert_eq!(config.credentials.consumer_key, "ck");
        assert_eq!(config.credentials.token_secret, "as");
        assert!(config.credentials.validate().is_err());
    }

    #[test]
    fn test_timeline_params_by_user_id() {
        let request = FetchRequest::new(AccountRef::UserId(783214));
        let params = TwitterClient::timeline_params(&request);
        assert_eq!(
            params,
            vec![
                ("user_id", "783214".to_string()),
                ("count", "100".to_string()),
                ("exclude_replies", "true".to_string()),
                ("tweet_mode", "extended".to_string()),
            ]
        );
    }

    #[test]
    fn test_timeline_params_by_screen_name() {
        let request = FetchRequest {
            account: AccountRef::ScreenName("TwitterDev".into()),
            max_count: 20,
            exclude_replies: false,
        };
        let params = TwitterClient::timeline_params(&request);
        assert_eq!(params[0], ("screen_name", "TwitterDev".to_string()));
        assert_eq!(params[1], ("count", "20".to_string()));
        assert_eq!(params[2], ("exclude_replies", "false".to_string()));
    }

    #[test]
    fn test_timeline_url_trims_slash() {
        let mut config = ClientConfig::new(credentials());
        config.base_url = "http://127.0.0.1:9/1.1/".into();
        let client = TwitterClient::new(config).unwrap();
        assert_eq!(client.timeline_url(), "http://127.0.0.1:9/1.1/statuses/user_timeline.json");
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_fetch_failed() {
        let mut config = ClientConfig::new(credentials());
        config.base_url = "http://127.0.0.1:9/1.1".into();
        config.timeout = Duration::from_secs(2);
        let client = TwitterClient::new(config).unwrap();

        let result = client.fetch_recent(&FetchRequest::new(AccountRef::UserId(1))).await;
        assert!(matches!(result, Err(Error::FetchFailed(_))));
    }

    #[tokio::test]
    async fn test_user_timeline_parses_body() {
        let body = r#"[{"id_str":"7","full_text":"hi &amp; bye","user":{"name":"Jane"}}]"#;
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let client = client_for(upstream_once(response.into_bytes()).await, 1024);

        let items = client.user_timeline(&FetchRequest::new(AccountRef::UserId(1))).await.unwrap();
        assert_eq!(items, vec![Item::new("7", "hi & bye", "Jane")]);
    }

    #[tokio::test]
    async fn test_declared_length_over_cap_is_rejected() {
        let mut response = b"HTTP/1.1 200 OK\r\nContent-Length: 64\r\nConnection: close\r\n\r\n".to_vec();
        response.extend(std::iter::repeat_n(b'x', 64));
        let client = client_for(upstream_once(response).await, 16);

        let result = client.user_timeline(&FetchRequest::new(AccountRef::UserId(1))).await;
        assert!(matches!(result, Err(TwitterError::TooLarge { size: 64, max: 16 })));
    }

    #[tokio::test]
    async fn test_chunked_body_over_cap_is_rejected() {
        let mut response = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n".to_vec();
        for _ in 0..4 {
            response.extend(b"10\r\n");
            response.extend(std::iter::repeat_n(b'x', 16));
            response.extend(b"\r\n");
        }
        response.extend(b"0\r\n\r\n");
        let client = client_for(upstream_once(response).await, 40);

        let result = client.user_timeline(&FetchRequest::new(AccountRef::UserId(1))).await;
        assert!(matches!(result, Err(TwitterError::TooLarge { max: 40, .. })));
    }
}
