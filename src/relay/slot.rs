use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mailbox entry waiting for the host application
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingSlot {
    /// A content reference, kept as its URI
    Url(String),
    /// Inline content with its declared type
    Content {
        content: String,
        content_type: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotForm {
    Url,
    Content,
}

impl PendingSlot {
    pub fn url(uri: impl Into<String>) -> Self {
        PendingSlot::Url(uri.into())
    }

    pub fn content(content: impl Into<String>, content_type: impl Into<String>) -> Self {
        PendingSlot::Content {
            content: content.into(),
            content_type: content_type.into(),
        }
    }

    /// Log-safe description: the URI for URL slots, only the type and size
    /// for inline content
    pub fn describe(&self) -> String {
        match self {
            PendingSlot::Url(uri) => uri.clone(),
            PendingSlot::Content {
                content,
                content_type,
            } => format!("inline {content_type} ({} bytes)", content.len()),
        }
    }

    pub fn form(&self) -> SlotForm {
        match self {
            PendingSlot::Url(_) => SlotForm::Url,
            PendingSlot::Content { .. } => SlotForm::Content,
        }
    }
}

/// Value persisted under a relay key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredValue {
    pub value: String,
    pub stored_at: DateTime<Utc>,
}

impl StoredValue {
    pub fn now(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            stored_at: Utc::now(),
        }
    }

    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Decode a persisted value.
    ///
    /// Producers that write a bare UTF-8 string (no envelope) are accepted
    /// too; `stored_at` is unknown for those and reported as `None`.
    pub fn decode(bytes: &[u8]) -> Option<(String, Option<DateTime<Utc>>)> {
        if let Ok(stored) = serde_json::from_slice::<StoredValue>(bytes) {
            return Some((stored.value, Some(stored.stored_at)));
        }

        std::str::from_utf8(bytes)
            .ok()
            .map(|raw| (raw.to_string(), None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form() {
        assert_eq!(PendingSlot::url("file:///a").form(), SlotForm::Url);
        assert_eq!(PendingSlot::content("hi", "text/plain").form(), SlotForm::Content);
    }

    #[test]
    fn test_describe_hides_inline_content() {
        let slot = PendingSlot::content("my secret note", "text/plain");
        let description = slot.describe();
        assert_eq!(description, "inline text/plain (14 bytes)");
        assert!(!description.contains("secret"));

        assert_eq!(PendingSlot::url("file:///a").describe(), "file:///a");
    }

    #[test]
    fn test_decode_envelope() {
        let stored = StoredValue::now("file:///tmp/a.txt");
        let bytes = stored.encode().unwrap();

        let (value, stored_at) = StoredValue::decode(&bytes).unwrap();
        assert_eq!(value, "file:///tmp/a.txt");
        assert_eq!(stored_at, Some(stored.stored_at));
    }

    #[test]
    fn test_decode_bare_string() {
        let (value, stored_at) = StoredValue::decode(b"https://example.com").unwrap();
        assert_eq!(value, "https://example.com");
        assert!(stored_at.is_none());
    }

    #[test]
    fn test_decode_rejects_invalid_utf8() {
        assert!(StoredValue::decode(&[0xff, 0xfe]).is_none());
    }
}
