//! Gemtext page rendering.
//!
//! Every page is `header + content + footer`. The header is the optional
//! logo followed by the navigation menu.

use std::path::Path;

use gemfeed_core::config::UiConfig;
use gemfeed_core::{CacheSnapshot, Item};

/// Number of positions shown on the timeline page.
pub const TIMELINE_LEN: usize = 10;

const MENU: &str = "=> / Last tweet\n=> /timeline Timeline\n=> /select_tweet Tweet selector\n";

const FOOTER: &str = "\n\n=> https://github.com/vegasq/gemini-twitter-mirror Fork me on GitHub\n";

/// Read the logo file. Absence is normal and yields `None`.
pub fn load_logo(path: Option<&Path>) -> Option<String> {
    let path = path?;
    match std::fs::read_to_string(path) {
        Ok(logo) => Some(logo),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "logo file unreadable, rendering without it");
            None
        }
    }
}

/// Static page chrome plus the timeline delimiter.
#[derive(Debug, Clone)]
pub struct PageLayout {
    logo: Option<String>,
    delimiter: String,
}

impl PageLayout {
    pub fn new(logo: Option<String>, delimiter: impl Into<String>) -> Self {
        Self { logo, delimiter: delimiter.into() }
    }

    /// Build from the `ui` config section, reading the logo once.
    pub fn from_config(ui: &UiConfig) -> Self {
        Self::new(load_logo(ui.ascii_logo_file.as_deref()), ui.delimiter.clone())
    }

    fn header(&self) -> String {
        format!("{}\n\n{MENU}\n", self.logo.as_deref().unwrap_or_default())
    }

    /// Surround page content with header and footer.
    pub fn wrap(&self, content: &str) -> String {
        format!("{}{content}{FOOTER}", self.header())
    }

    /// Content of a single-item page: text and author separated by a blank line.
    pub fn item(item: &Item) -> String {
        format!("\n\n{}\n\n{}", item.text, item.author)
    }

    /// Content of the timeline page: up to [`TIMELINE_LEN`] items, each
    /// followed by the delimiter. Positions past the end are skipped.
    pub fn timeline(&self, snapshot: &CacheSnapshot) -> String {
        (0..TIMELINE_LEN)
            .filter_map(|pos| snapshot.item_at(pos).ok())
            .map(|item| format!("{}\n\n{}", Self::item(item), self.delimiter))
            .collect()
    }
}
