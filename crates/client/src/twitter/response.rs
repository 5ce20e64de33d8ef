//! Timeline response types and normalization.

use gemfeed_core::Item;
use serde::Deserialize;

/// One tweet from `statuses/user_timeline`.
#[derive(Debug, Deserialize)]
pub struct ApiTweet {
    pub id_str: String,
    /// Truncated text (default tweet mode).
    #[serde(default)]
    pub text: Option<String>,
    /// Untruncated text, present with `tweet_mode=extended`.
    #[serde(default)]
    pub full_text: Option<String>,
    pub user: ApiUser,
}

/// Author object embedded in every tweet.
#[derive(Debug, Deserialize)]
pub struct ApiUser {
    pub name: String,
}

impl From<ApiTweet> for Item {
    fn from(raw: ApiTweet) -> Self {
        let text = raw.full_text.or(raw.text).unwrap_or_default();
        Item { id: raw.id_str, text: unescape_entities(&text), author: raw.user.name }
    }
}

/// Parse a timeline body into items, keeping upstream (newest-first) order.
pub fn parse_timeline(body: &[u8]) -> Result<Vec<Item>, serde_json::Error> {
    let tweets: Vec<ApiTweet> = serde_json::from_slice(body)?;
    Ok(tweets.into_iter().map(Item::from).collect())
}

/// The API escapes `&`, `<` and `>` in tweet text even in JSON.
fn unescape_entities(text: &str) -> String {
    text.replace("&lt;", "<").replace("&gt;", ">").replace("&amp;", "&")
}
