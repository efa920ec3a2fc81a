use serde::Serialize;
use std::path::{Path, PathBuf};

const GROUP_PREFIX: &str = "group.";

/// App group shared by the host application and its extensions.
///
/// The identifier is always `"group." + bundle_id`; the backing store lives
/// in a directory of that name under the configured groups root. A group is
/// provisioned once that directory exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppGroup {
    identifier: String,
    path: PathBuf,
}

/// What `getAppGroup` reports to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppGroupStatus {
    pub identifier: String,
    pub provisioned: bool,
}

impl AppGroup {
    pub fn resolve(bundle_id: &str, groups_root: impl AsRef<Path>) -> Self {
        let identifier = format!("{GROUP_PREFIX}{bundle_id}");
        let path = groups_root.as_ref().join(&identifier);
        Self { identifier, path }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_provisioned(&self) -> bool {
        self.path.is_dir()
    }

    pub fn status(&self) -> AppGroupStatus {
        AppGroupStatus {
            identifier: self.identifier.clone(),
            provisioned: self.is_provisioned(),
        }
    }

    /// Create the group directory; a no-op when it already exists
    pub fn provision(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.path)
    }
}
