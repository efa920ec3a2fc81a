use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use super::classifier::ClassifiedContent;
use super::resource::ResourceReader;

/// Well-known extras keys
pub mod keys {
    pub const TITLE: &str = "title";
    pub const TEXT: &str = "text";
    pub const CONTACT: &str = "contact";
    pub const EVENT: &str = "event";
    pub const LATITUDE: &str = "latitude";
    pub const LONGITUDE: &str = "longitude";
}

/// Scalar or list value stored in [`Extras`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtraValue {
    Text(String),
    Number(f64),
    Flag(bool),
    List(Vec<String>),
}

impl From<String> for ExtraValue {
    fn from(value: String) -> Self {
        ExtraValue::Text(value)
    }
}

impl From<&str> for ExtraValue {
    fn from(value: &str) -> Self {
        ExtraValue::Text(value.to_string())
    }
}

impl From<f64> for ExtraValue {
    fn from(value: f64) -> Self {
        ExtraValue::Number(value)
    }
}

impl From<bool> for ExtraValue {
    fn from(value: bool) -> Self {
        ExtraValue::Flag(value)
    }
}

impl From<Vec<String>> for ExtraValue {
    fn from(value: Vec<String>) -> Self {
        ExtraValue::List(value)
    }
}

/// Open mapping of kind-specific fields attached to a shared item.
///
/// Serializes as a flat JSON object; absent fields are simply missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Extras(BTreeMap<String, ExtraValue>);

impl Extras {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ExtraValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(ExtraValue::Text(value)) => Some(value),
            _ => None,
        }
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        match self.0.get(key) {
            Some(ExtraValue::Number(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Parse a `geo:` URI into `(latitude, longitude)`.
///
/// URI parameters after `;` or `?` are ignored. Returns `None` when fewer
/// than two components are present or either one is not a finite number.
pub fn parse_geo(uri: &str) -> Option<(f64, f64)> {
    let prefix = uri.get(..4)?;
    if !prefix.eq_ignore_ascii_case("geo:") {
        return None;
    }

    let body = &uri[4..];
    let coords = body.split([';', '?']).next().unwrap_or_default();

    let mut parts = coords.split(',');
    let latitude = parse_coordinate(parts.next()?)?;
    let longitude = parse_coordinate(parts.next()?)?;

    Some((latitude, longitude))
}

fn parse_coordinate(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Builds [`Extras`] for a classified reference
#[derive(Clone)]
pub struct ExtrasExtractor {
    reader: Arc<dyn ResourceReader>,
}

impl ExtrasExtractor {
    pub fn new(reader: Arc<dyn ResourceReader>) -> Self {
        Self { reader }
    }

    /// Assemble the extras for one item.
    ///
    /// Rules apply independently: text content, `vcf` contact, `ics` event
    /// and `geo` coordinates may all land in the same mapping. The resource
    /// is read at most once.
    pub async fn extract(&self, classified: &ClassifiedContent) -> Extras {
        let reference = &classified.reference;
        let mut extras = Extras::new();

        extras.insert(keys::TITLE, reference.last_path_component());

        let is_contact = reference.has_extension("vcf");
        let is_event = reference.has_extension("ics");

        if classified.is_text || is_contact || is_event {
            match self.reader.read_text(reference).await {
                Ok(content) => {
                    if is_contact {
                        extras.insert(keys::CONTACT, content.clone());
                    }
                    if is_event {
                        extras.insert(keys::EVENT, content.clone());
                    }
                    if classified.is_text {
                        extras.insert(keys::TEXT, content);
                    }
                }
                Err(e) => {
                    debug!(uri = %reference.uri, error = %e, "Resource unreadable, omitting content fields");
                }
            }
        }

        if reference.has_scheme("geo") {
            match parse_geo(&reference.uri) {
                Some((latitude, longitude)) => {
                    extras.insert(keys::LATITUDE, latitude);
                    extras.insert(keys::LONGITUDE, longitude);
                }
                None => {
                    debug!(uri = %reference.uri, "Malformed geo URI, omitting coordinates");
                }
            }
        }

        extras
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{Classifier, ContentReference, FsResourceReader};
    use std::fs;
    use tempfile::TempDir;

    fn extractor() -> ExtrasExtractor {
        ExtrasExtractor::new(Arc::new(FsResourceReader::default()))
    }

    #[test]
    fn test_parse_geo() {
        assert_eq!(parse_geo("geo:37.7749,-122.4194"), Some((37.7749, -122.4194)));
        assert_eq!(parse_geo("GEO:1.5,2.5,30"), Some((1.5, 2.5)));
        assert_eq!(parse_geo("geo:48.2,16.3;u=35"), Some((48.2, 16.3)));
        assert_eq!(parse_geo("geo:onlyone"), None);
        assert_eq!(parse_geo("geo:12.0,east"), None);
        assert_eq!(parse_geo("geo:NaN,1.0"), None);
        assert_eq!(parse_geo("http://x"), None);
        assert_eq!(parse_geo("geo"), None);
    }

    #[tokio::test]
    async fn test_geo_extraction() {
        let reference = ContentReference::from_uri("geo:37.7749,-122.4194");
        let classified = Classifier::default().classify(&reference);

        let extras = extractor().extract(&classified).await;
        assert_eq!(extras.number(keys::LATITUDE), Some(37.7749));
        assert_eq!(extras.number(keys::LONGITUDE), Some(-122.4194));
        assert!(extras.contains(keys::TITLE));
    }

    #[tokio::test]
    async fn test_malformed_geo_omits_both() {
        let reference = ContentReference::from_uri("geo:onlyone");
        let classified = Classifier::default().classify(&reference);

        let extras = extractor().extract(&classified).await;
        assert!(!extras.contains(keys::LATITUDE));
        assert!(!extras.contains(keys::LONGITUDE));
    }

    #[tokio::test]
    async fn test_text_file_sets_text_and_title() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("shopping.txt");
        fs::write(&path, "milk\neggs\n").unwrap();

        let reference = ContentReference::from_uri(path.to_str().unwrap());
        let classified = Classifier::default().classify(&reference);

        let extras = extractor().extract(&classified).await;
        assert_eq!(extras.text(keys::TITLE), Some("shopping.txt"));
        assert_eq!(extras.text(keys::TEXT), Some("milk\neggs\n"));
    }

    #[tokio::test]
    async fn test_unreadable_text_keeps_title() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing.txt");

        let reference = ContentReference::from_uri(path.to_str().unwrap());
        let classified = Classifier::default().classify(&reference);

        let extras = extractor().extract(&classified).await;
        assert_eq!(extras.text(keys::TITLE), Some("missing.txt"));
        assert!(!extras.contains(keys::TEXT));
    }

    #[tokio::test]
    async fn test_vcf_sets_contact() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("ada.vcf");
        let card = "BEGIN:VCARD\nVERSION:3.0\nFN:Ada Lovelace\nEND:VCARD\n";
        fs::write(&path, card).unwrap();

        let reference = ContentReference::from_uri(path.to_str().unwrap());
        let classified = Classifier::default().classify(&reference);

        let extras = extractor().extract(&classified).await;
        assert_eq!(extras.text(keys::CONTACT), Some(card));
        assert!(!extras.contains(keys::EVENT));
    }

    #[tokio::test]
    async fn test_ics_sets_event() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("standup.ics");
        let calendar = "BEGIN:VCALENDAR\nBEGIN:VEVENT\nSUMMARY:Standup\nEND:VEVENT\nEND:VCALENDAR\n";
        fs::write(&path, calendar).unwrap();

        let reference = ContentReference::from_uri(path.to_str().unwrap());
        let classified = Classifier::default().classify(&reference);

        let extras = extractor().extract(&classified).await;
        assert_eq!(extras.text(keys::EVENT), Some(calendar));
        assert!(!extras.contains(keys::CONTACT));
    }

    #[tokio::test]
    async fn test_binary_file_only_has_title() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("photo.png");
        fs::write(&path, [0x89, 0x50, 0x4e, 0x47]).unwrap();

        let reference = ContentReference::from_uri(path.to_str().unwrap());
        let classified = Classifier::default().classify(&reference);

        let extras = extractor().extract(&classified).await;
        assert_eq!(extras.len(), 1);
        assert_eq!(extras.text(keys::TITLE), Some("photo.png"));
    }

    #[test]
    fn test_extras_serialize_flat() {
        let mut extras = Extras::new();
        extras.insert(keys::TITLE, "a.txt");
        extras.insert(keys::LATITUDE, 1.5);
        extras.insert("email", vec!["a@b.c".to_string()]);

        let json = serde_json::to_value(&extras).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "title": "a.txt", "latitude": 1.5, "email": ["a@b.c"] })
        );
    }
}
