use std::sync::Arc;

use crate::error::Result;
use crate::model::FileSnapshot;

/// Synchronous primitives against a single remote file store session.
///
/// All paths are absolute remote paths. Implementations are shared by every
/// running job and must tolerate concurrent calls.
pub trait RemoteStore: Send + Sync {
    /// Create or truncate `path`, write `content`, set `mode`, then stat.
    ///
    /// Stops at the first failure; a partially written file is left in place.
    fn upload(&self, path: &str, content: &str, mode: u32) -> Result<FileSnapshot>;

    /// Remove `path`. Fails with a not-found error if it is absent; callers
    /// decide whether absence counts as success.
    fn delete(&self, path: &str) -> Result<()>;

    /// Content and metadata of `path`, or `Error::NotFound`.
    fn read(&self, path: &str) -> Result<FileSnapshot>;

    /// Change permission bits of `path`.
    fn set_permissions(&self, path: &str, mode: u32) -> Result<()>;

    /// Absolute paths of the plain files directly under `dir`, sorted.
    /// Fails with `Error::NotFound` if `dir` is absent.
    fn list(&self, dir: &str) -> Result<Vec<String>>;
}

/// Opens a [`RemoteStore`] for a request's target configuration.
pub trait Connector: Send + Sync {
    fn connect(&self, target_config: &serde_json::Value) -> Result<Arc<dyn RemoteStore>>;
}

/// Join a directory and an entry name the way native ids are formed.
pub fn join(dir: &str, name: &str) -> String {
    format!("{}/{}", dir.trim_end_matches('/'), name)
}
