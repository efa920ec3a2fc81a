use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

use crate::event::{ClipItem, ShareAction};

/// Reference to shared content as handed in by the platform.
///
/// Carries the identity of the content (URI) and the minimal type hints
/// the classifier needs, never the content itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentReference {
    pub uri: String,
    pub scheme: String,
    pub path_extension: String,
    /// Intent of the sharing side, when the platform reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ShareAction>,
    /// Further items of a multi-item share
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clip_data: Vec<ClipItem>,
}

impl ContentReference {
    pub fn new(
        uri: impl Into<String>,
        scheme: impl Into<String>,
        path_extension: impl Into<String>,
    ) -> Self {
        Self {
            uri: uri.into(),
            scheme: scheme.into(),
            path_extension: path_extension.into(),
            action: None,
            clip_data: Vec::new(),
        }
    }

    pub fn with_action(mut self, action: ShareAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn with_clip_data(mut self, clip_data: Vec<ClipItem>) -> Self {
        self.clip_data = clip_data;
        self
    }

    /// Build a reference from a raw URI, deriving scheme and extension.
    ///
    /// Absolute filesystem paths are turned into `file://` URLs. Anything
    /// that does not parse keeps the raw string with an empty scheme; the
    /// dispatcher reports those as inaccessible.
    pub fn from_uri(raw: &str) -> Self {
        let raw = raw.trim();

        let url = Url::parse(raw).ok().or_else(|| {
            let path = Path::new(raw);
            if path.is_absolute() {
                Url::from_file_path(path).ok()
            } else {
                None
            }
        });

        match url {
            Some(url) => {
                let path_extension = if url.cannot_be_a_base() {
                    String::new()
                } else {
                    extension_of(url.path())
                };

                Self::new(url.to_string(), url.scheme(), path_extension)
            }
            None => Self::new(raw, "", extension_of(raw)),
        }
    }

    pub fn parse_uri(&self) -> Option<Url> {
        Url::parse(&self.uri).ok()
    }

    pub fn has_scheme(&self, scheme: &str) -> bool {
        self.scheme.eq_ignore_ascii_case(scheme)
    }

    pub fn has_extension(&self, extension: &str) -> bool {
        self.path_extension.eq_ignore_ascii_case(extension)
    }

    /// Last path component of the URI, percent-decoded for `file://` URLs
    pub fn last_path_component(&self) -> String {
        let Some(url) = self.parse_uri() else {
            return last_segment(&self.uri).to_string();
        };

        if url.scheme() == "file" {
            if let Some(name) = url
                .to_file_path()
                .ok()
                .and_then(|path| path.file_name().map(|name| name.to_string_lossy().into_owned()))
            {
                return name;
            }
        }

        url.path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .map(str::to_string)
            .unwrap_or_else(|| last_segment(url.path()).to_string())
    }
}

fn last_segment(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or_default()
}

fn extension_of(path: &str) -> String {
    let name = last_segment(path);
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_string(),
        _ => String::new(),
    }
}
