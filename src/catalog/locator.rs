use reqwest::Url;

/// Where a song's audio lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioLocator {
    /// Already playable as-is.
    Url(String),
    /// Object storage key that must be signed before a client can use it.
    StorageKey(String),
}

impl AudioLocator {
    /// Classifies a raw catalog value. Blank means the song has no audio.
    pub fn classify(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        match Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {
                Some(Self::Url(raw.to_string()))
            }
            _ => Some(Self::StorageKey(raw.to_string())),
        }
    }
}
