//! Content classification and extraction
//!
//! Turns a raw [`ContentReference`] handed over by the platform into a typed
//! record:
//!
//! - [`Classifier`] resolves a MIME type and the "is text" predicate
//! - [`ExtrasExtractor`] builds the kind-specific [`Extras`] fields
//! - [`ResourceReader`] reads the referenced resource (best-effort)
//!
//! Nothing in here fails a delivery: missing type data becomes `None`, and
//! unreadable or malformed payloads only drop the affected field.

mod classifier;
mod extras;
mod reference;
mod resource;

pub use classifier::{BuiltinTypeRegistry, ClassifiedContent, Classifier, TypeRegistry};
pub use extras::{ExtraValue, Extras, ExtrasExtractor, keys, parse_geo};
pub use reference::ContentReference;
pub use resource::{FsResourceReader, ResourceError, ResourceReader};
