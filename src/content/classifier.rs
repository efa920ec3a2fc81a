use mime::Mime;
use std::collections::HashMap;
use std::sync::Arc;

use super::reference::ContentReference;

/// Platform type registry: maps a file extension to a MIME type.
///
/// Implementations return `None` when they have no mapping; callers must
/// not guess in that case.
pub trait TypeRegistry: Send + Sync {
    fn mime_for_extension(&self, extension: &str) -> Option<Mime>;
}

/// Extension table shipped with the crate, plus configured overrides
#[derive(Debug, Clone, Default)]
pub struct BuiltinTypeRegistry {
    overrides: HashMap<String, Mime>,
}

const BUILTIN_TYPES: &[(&str, &str)] = &[
    ("txt", "text/plain"),
    ("text", "text/plain"),
    ("log", "text/plain"),
    ("md", "text/markdown"),
    ("markdown", "text/markdown"),
    ("csv", "text/csv"),
    ("tsv", "text/tab-separated-values"),
    ("htm", "text/html"),
    ("html", "text/html"),
    ("css", "text/css"),
    ("js", "text/javascript"),
    ("xml", "text/xml"),
    ("rtf", "text/rtf"),
    ("vcf", "text/vcard"),
    ("vcard", "text/vcard"),
    ("ics", "text/calendar"),
    ("ical", "text/calendar"),
    ("json", "application/json"),
    ("pdf", "application/pdf"),
    ("zip", "application/zip"),
    ("gz", "application/gzip"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("heic", "image/heic"),
    ("svg", "image/svg+xml"),
    ("bmp", "image/bmp"),
    ("mp3", "audio/mpeg"),
    ("m4a", "audio/mp4"),
    ("wav", "audio/wav"),
    ("mp4", "video/mp4"),
    ("mov", "video/quicktime"),
    ("webm", "video/webm"),
];

impl BuiltinTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose overrides take precedence over the builtin table
    pub fn with_overrides(overrides: HashMap<String, Mime>) -> Self {
        let overrides = overrides
            .into_iter()
            .map(|(ext, mime)| (ext.to_ascii_lowercase(), mime))
            .collect();
        Self { overrides }
    }
}

impl TypeRegistry for BuiltinTypeRegistry {
    fn mime_for_extension(&self, extension: &str) -> Option<Mime> {
        let extension = extension.to_ascii_lowercase();
        if extension.is_empty() {
            return None;
        }

        if let Some(mime) = self.overrides.get(&extension) {
            return Some(mime.clone());
        }

        BUILTIN_TYPES
            .iter()
            .find(|(ext, _)| *ext == extension)
            .and_then(|(_, essence)| essence.parse().ok())
    }
}

/// Reference plus the type information derived from it
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedContent {
    pub reference: ContentReference,
    pub mime_type: Option<Mime>,
    pub is_text: bool,
}

impl ClassifiedContent {
    /// MIME essence (`type/subtype`) without parameters
    pub fn mime_essence(&self) -> Option<String> {
        self.mime_type.as_ref().map(|m| m.essence_str().to_string())
    }
}

#[derive(Clone)]
pub struct Classifier {
    registry: Arc<dyn TypeRegistry>,
}

impl Classifier {
    pub fn new(registry: Arc<dyn TypeRegistry>) -> Self {
        Self { registry }
    }

    /// Resolve the MIME type and text predicate for a reference.
    ///
    /// When the registry has no mapping, a `txt` extension still counts
    /// as text.
    pub fn classify(&self, reference: &ContentReference) -> ClassifiedContent {
        let mime_type = self.registry.mime_for_extension(&reference.path_extension);

        let is_text = match &mime_type {
            Some(mime) => mime.type_() == mime::TEXT,
            None => reference.has_extension("txt"),
        };

        ClassifiedContent {
            reference: reference.clone(),
            mime_type,
            is_text,
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(Arc::new(BuiltinTypeRegistry::new()))
    }
}
