//! [`RemoteStore`] backed by a local directory tree.
//!
//! Remote absolute paths are confined under a root directory. Used for
//! offline serving and for exercising the engine without an SFTP server.

use chrono::{DateTime, Utc};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::model::FileSnapshot;
use crate::remote::{self, Connector, RemoteStore};
use crate::resolve::resolve_path;
use crate::validate::format_mode;

#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Open a store rooted at `root`, which must be an existing directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let meta = std::fs::metadata(&root)
            .map_err(|e| Error::Connection(format!("root {}: {e}", root.display())))?;
        if !meta.is_dir() {
            return Err(Error::Connection(format!("root is not a directory: {}", root.display())));
        }
        Ok(Self { root })
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        resolve_path(&self.root, path)
    }

    fn snapshot(&self, path: &str, local: &Path, content: String) -> Result<FileSnapshot> {
        let meta = std::fs::metadata(local)?;
        Ok(FileSnapshot {
            path: path.to_string(),
            content,
            permissions: format_mode(mode_of(&meta)),
            size: meta.len(),
            modified_at: DateTime::<Utc>::from(meta.modified()?),
        })
    }
}

fn not_found(path: &str) -> impl FnOnce(std::io::Error) -> Error + '_ {
    move |e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::NotFound(path.to_string())
        } else {
            Error::Io(e)
        }
    }
}

#[cfg(unix)]
fn mode_of(meta: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode()
}

#[cfg(not(unix))]
fn mode_of(meta: &std::fs::Metadata) -> u32 {
    if meta.permissions().readonly() { 0o444 } else { 0o644 }
}

#[cfg(unix)]
fn chmod(local: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(local, std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn chmod(local: &Path, mode: u32) -> std::io::Result<()> {
    let mut perms = std::fs::metadata(local)?.permissions();
    perms.set_readonly(mode & 0o200 == 0);
    std::fs::set_permissions(local, perms)
}

impl RemoteStore for LocalStore {
    fn upload(&self, path: &str, content: &str, mode: u32) -> Result<FileSnapshot> {
        let local = self.resolve(path)?;
        let mut file = std::fs::File::create(&local)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        drop(file);
        chmod(&local, mode)?;
        self.snapshot(path, &local, content.to_string())
    }

    fn delete(&self, path: &str) -> Result<()> {
        let local = self.resolve(path)?;
        std::fs::remove_file(&local).map_err(not_found(path))
    }

    fn read(&self, path: &str) -> Result<FileSnapshot> {
        let local = self.resolve(path)?;
        let meta = std::fs::metadata(&local).map_err(not_found(path))?;
        if meta.is_dir() {
            return Err(Error::Validation(format!("not a file: {path}")));
        }
        let bytes = std::fs::read(&local).map_err(not_found(path))?;
        let content = String::from_utf8_lossy(&bytes).into_owned();
        self.snapshot(path, &local, content)
    }

    fn set_permissions(&self, path: &str, mode: u32) -> Result<()> {
        let local = self.resolve(path)?;
        chmod(&local, mode).map_err(not_found(path))
    }

    fn list(&self, dir: &str) -> Result<Vec<String>> {
        let local = self.resolve(dir)?;
        std::fs::metadata(&local).map_err(not_found(dir))?;
        let mut paths = Vec::new();
        for entry in WalkDir::new(&local).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| Error::Io(e.into()))?;
            if entry.file_type().is_dir() {
                continue;
            }
            paths.push(remote::join(dir, &entry.file_name().to_string_lossy()));
        }
        Ok(paths)
    }
}

/// Serves every target from one local root; the target config is ignored.
#[derive(Debug, Clone)]
pub struct LocalConnector {
    pub root: PathBuf,
}

impl Connector for LocalConnector {
    fn connect(&self, _target_config: &serde_json::Value) -> Result<Arc<dyn RemoteStore>> {
        Ok(Arc::new(LocalStore::open(&self.root)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, LocalStore) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("upload")).unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn upload_then_read() {
        let (_dir, store) = store();
        let written = store.upload("/upload/a.txt", "hello", 0o600).unwrap();
        assert_eq!(written.size, 5);

        let read = store.read("/upload/a.txt").unwrap();
        assert_eq!(read.content, "hello");
        assert_eq!(read.size, 5);
        #[cfg(unix)]
        assert_eq!(read.permissions, "0600");
    }

    #[test]
    fn upload_truncates_existing_file() {
        let (_dir, store) = store();
        store.upload("/upload/a.txt", "a much longer body", 0o644).unwrap();
        store.upload("/upload/a.txt", "short", 0o644).unwrap();
        assert_eq!(store.read("/upload/a.txt").unwrap().content, "short");
    }

    #[test]
    fn missing_file_is_not_found() {
        let (_dir, store) = store();
        assert!(matches!(store.read("/upload/nope.txt"), Err(Error::NotFound(_))));
        assert!(store.delete("/upload/nope.txt").unwrap_err().is_not_found());
    }

    #[test]
    fn list_skips_directories() {
        let (dir, store) = store();
        store.upload("/upload/b.txt", "b", 0o644).unwrap();
        store.upload("/upload/a.txt", "a", 0o644).unwrap();
        std::fs::create_dir(dir.path().join("upload/nested")).unwrap();

        let listed = store.list("/upload").unwrap();
        assert_eq!(listed, vec!["/upload/a.txt", "/upload/b.txt"]);
        assert!(matches!(store.list("/elsewhere"), Err(Error::NotFound(_))));
    }

    #[test]
    fn open_requires_directory() {
        assert!(LocalStore::open("/definitely/not/here").is_err());
    }
}
