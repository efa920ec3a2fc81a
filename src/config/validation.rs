use super::models::Config;
use mime::Mime;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("app.bundle_id is required")]
    MissingBundleId,

    #[error("app.bundle_id '{0}' must not contain whitespace or path separators")]
    InvalidBundleId(String),

    #[error("relay key '{field}' must not be empty")]
    EmptyRelayKey { field: String },

    #[error("relay keys must be distinct, '{key}' is used twice")]
    DuplicateRelayKey { key: String },

    #[error("relay.poll_interval_ms must be positive")]
    InvalidPollInterval,

    #[error("extract.read_timeout_ms must be positive")]
    InvalidReadTimeout,

    #[error("extract.extra_types.{extension} = '{value}' is not a valid MIME type")]
    InvalidExtraType { extension: String, value: String },
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_app(config)?;
    validate_relay(config)?;
    validate_extract(config)?;
    Ok(())
}

/// The bundle id becomes a directory name, so it must be a single path component
fn validate_app(config: &Config) -> Result<(), ValidationError> {
    let bundle_id = &config.app.bundle_id;

    if bundle_id.is_empty() {
        return Err(ValidationError::MissingBundleId);
    }

    if bundle_id
        .chars()
        .any(|c| c.is_whitespace() || c == '/' || c == '\\')
        || bundle_id == "."
        || bundle_id == ".."
    {
        return Err(ValidationError::InvalidBundleId(bundle_id.clone()));
    }

    Ok(())
}

fn validate_relay(config: &Config) -> Result<(), ValidationError> {
    let keys = [
        ("url_key", &config.relay.url_key),
        ("content_key", &config.relay.content_key),
        ("content_type_key", &config.relay.content_type_key),
    ];

    let mut seen = HashSet::new();
    for (field, key) in keys {
        if key.is_empty() {
            return Err(ValidationError::EmptyRelayKey {
                field: field.to_string(),
            });
        }
        if !seen.insert(key.as_str()) {
            return Err(ValidationError::DuplicateRelayKey { key: key.clone() });
        }
    }

    if config.relay.poll_interval_ms == 0 {
        return Err(ValidationError::InvalidPollInterval);
    }

    Ok(())
}

fn validate_extract(config: &Config) -> Result<(), ValidationError> {
    if config.extract.read_timeout_ms == 0 {
        return Err(ValidationError::InvalidReadTimeout);
    }

    for (extension, value) in &config.extract.extra_types {
        if value.parse::<Mime>().is_err() {
            return Err(ValidationError::InvalidExtraType {
                extension: extension.clone(),
                value: value.clone(),
            });
        }
    }

    Ok(())
}
