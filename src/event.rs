//! Normalized event records delivered to the host application

use serde::{Deserialize, Serialize};

use crate::content::Extras;

/// Name of the host-facing event stream
pub const RECEIVED_FILES: &str = "receivedFiles";

/// Application that initiated the share, when the platform can tell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceApp {
    pub package_name: String,
    pub application_name: String,
    pub application_icon: String,
}

/// What the sharing side asked for: hand the content over, or open it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ShareAction {
    Send,
    View,
}

impl ShareAction {
    pub const SEND: &str = "SEND";
    pub const VIEW: &str = "VIEW";

    pub fn as_str(self) -> &'static str {
        match self {
            ShareAction::Send => Self::SEND,
            ShareAction::View => Self::VIEW,
        }
    }
}

/// One entry of a multi-item share
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_text: Option<String>,
}

/// One shared item, normalized
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceApp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<ShareAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extras: Option<Extras>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clip_data: Option<Vec<ClipItem>>,
}

/// Emission on the `receivedFiles` stream: `{"data": ...}` or `{"error": "..."}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceivedFiles {
    Data(SharedEvent),
    Error(String),
}

impl ReceivedFiles {
    pub fn data(&self) -> Option<&SharedEvent> {
        match self {
            ReceivedFiles::Data(event) => Some(event),
            ReceivedFiles::Error(_) => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ReceivedFiles::Error(_))
    }
}

/// Best-effort lookup of the sharing application
pub trait SourceAppProvider: Send + Sync {
    fn source_app(&self) -> Option<SourceApp>;
}

/// Provider for platforms that cannot report the sharing application
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSourceApp;

impl SourceAppProvider for NoSourceApp {
    fn source_app(&self) -> Option<SourceApp> {
        None
    }
}

/// Provider that always reports the same application
#[derive(Debug, Clone)]
pub struct FixedSourceApp(pub SourceApp);

impl SourceAppProvider for FixedSourceApp {
    fn source_app(&self) -> Option<SourceApp> {
        Some(self.0.clone())
    }
}
