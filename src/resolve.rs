use path_absolutize::Absolutize;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Map an absolute remote path onto `root`, ensuring it stays within root.
///
/// Resolution is lexical (`..` and `.` are folded without touching the
/// filesystem) so it works for paths that do not exist yet.
pub fn resolve_path(root: &Path, remote: &str) -> Result<PathBuf> {
    if !remote.starts_with('/') {
        return Err(Error::Validation(format!("path must be absolute: {remote}")));
    }
    let joined = root.join(remote.trim_start_matches('/'));
    let resolved = joined.absolutize_virtually(root).map_err(|_| {
        Error::Validation(format!("path escapes root: {remote}"))
    })?;
    Ok(resolved.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_paths_land_under_root() {
        let root = Path::new("/srv/store");
        assert_eq!(
            resolve_path(root, "/upload/a.txt").unwrap(),
            PathBuf::from("/srv/store/upload/a.txt")
        );
        assert_eq!(
            resolve_path(root, "/upload/./x/../b.txt").unwrap(),
            PathBuf::from("/srv/store/upload/b.txt")
        );
    }

    #[test]
    fn escapes_are_rejected() {
        let root = Path::new("/srv/store");
        assert!(resolve_path(root, "/../../etc/passwd").is_err());
    }

    #[test]
    fn relative_paths_are_rejected() {
        assert!(resolve_path(Path::new("/srv/store"), "upload/a.txt").is_err());
    }
}
