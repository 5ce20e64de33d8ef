//! OAuth 1.0a request signing (HMAC-SHA1).
//!
//! The signature covers the method, the URL without query, and every
//! query and `oauth_*` parameter, each percent-encoded per RFC 3986 and
//! sorted by key then value.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::Rng;
use rand::distr::Alphanumeric;
use ring::hmac;

use super::TwitterError;

const SIGNATURE_METHOD: &str = "HMAC-SHA1";
const OAUTH_VERSION: &str = "1.0";
const NONCE_LEN: usize = 32;

/// Consumer and access token pair for user-context requests.
#[derive(Clone)]
pub struct OAuthCredentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub token: String,
    pub token_secret: String,
}

impl std::fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("consumer_key", &self.consumer_key)
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

impl OAuthCredentials {
    /// Reject empty values before any request is attempted.
    pub fn validate(&self) -> Result<(), TwitterError> {
        let fields = [
            ("consumer_key", &self.consumer_key),
            ("consumer_secret", &self.consumer_secret),
            ("access_token", &self.token),
            ("access_secret", &self.token_secret),
        ];
        match fields.into_iter().find(|(_, value)| value.is_empty()) {
            Some((name, _)) => Err(TwitterError::MissingCredentials(name)),
            None => Ok(()),
        }
    }

    /// `Authorization` header value for a request, with a fresh nonce and timestamp.
    pub fn authorization(&self, method: &str, base_url: &str, params: &[(&str, String)]) -> String {
        let nonce: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(NONCE_LEN)
            .map(char::from)
            .collect();
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        self.authorization_with(method, base_url, params, &nonce, timestamp)
    }

    pub(crate) fn authorization_with(
        &self, method: &str, base_url: &str, params: &[(&str, String)], nonce: &str, timestamp: u64,
    ) -> String {
        let timestamp = timestamp.to_string();
        let mut oauth = vec![
            ("oauth_consumer_key", self.consumer_key.clone()),
            ("oauth_nonce", nonce.to_string()),
            ("oauth_signature_method", SIGNATURE_METHOD.to_string()),
            ("oauth_timestamp", timestamp),
            ("oauth_token", self.token.clone()),
            ("oauth_version", OAUTH_VERSION.to_string()),
        ];

        let mut signed: Vec<(&str, String)> = params.to_vec();
        signed.extend(oauth.iter().cloned());

        let base = signature_base_string(method, base_url, &signed);
        oauth.push(("oauth_signature", sign(&base, &self.consumer_secret, &self.token_secret)));
        oauth.sort_by(|a, b| a.0.cmp(b.0));

        let fields: Vec<String> = oauth
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
            .collect();
        format!("OAuth {}", fields.join(", "))
    }
}

/// RFC 3986 encoding: everything except `A-Z a-z 0-9 - . _ ~`.
pub(crate) fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

pub(crate) fn signature_base_string(method: &str, base_url: &str, params: &[(&str, String)]) -> String {
    let mut pairs: Vec<(String, String)> = params.iter().map(|(k, v)| (encode(k), encode(v))).collect();
    pairs.sort();

    let param_string = pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}&{}&{}", method.to_ascii_uppercase(), encode(base_url), encode(&param_string))
}

pub(crate) fn sign(base: &str, consumer_secret: &str, token_secret: &str) -> String {
    let signing_key = format!("{}&{}", encode(consumer_secret), encode(token_secret));
    let key = hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, signing_key.as_bytes());
    STANDARD.encode(hmac::sign(&key, base.as_bytes()).as_ref())
}
