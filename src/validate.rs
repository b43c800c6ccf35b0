use crate::error::{Error, Result};
use crate::model::FileProperties;

/// Permissions applied when a request omits them.
pub const DEFAULT_PERMISSIONS: &str = "0644";

/// Parse and validate file properties from a request payload.
///
/// `path` is mandatory; `permissions` falls back to [`DEFAULT_PERMISSIONS`]
/// and must be a valid octal mode.
pub fn parse_file_properties(data: &serde_json::Value) -> Result<FileProperties> {
    let mut props: FileProperties = serde_json::from_value(data.clone())
        .map_err(|e| Error::Validation(format!("invalid file properties: {e}")))?;
    if props.path.is_empty() {
        return Err(Error::Validation("file properties missing 'path'".into()));
    }
    if props.permissions.is_empty() {
        props.permissions = DEFAULT_PERMISSIONS.to_string();
    }
    parse_mode(&props.permissions)?;
    Ok(props)
}

/// Parse an octal permission string (`"644"`, `"0755"`) into mode bits.
pub fn parse_mode(permissions: &str) -> Result<u32> {
    let mode = u32::from_str_radix(permissions, 8)
        .map_err(|_| Error::Validation(format!("invalid permissions: {permissions:?}")))?;
    if mode > 0o7777 {
        return Err(Error::Validation(format!("permissions out of range: {permissions:?}")));
    }
    Ok(mode)
}

/// Format permission bits as a 4-digit octal string.
pub fn format_mode(mode: u32) -> String {
    format!("{:04o}", mode & 0o7777)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_path_is_rejected() {
        let err = parse_file_properties(&json!({"content": "hi"})).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn permissions_default_to_0644() {
        let props = parse_file_properties(&json!({"path": "/upload/a.txt"})).unwrap();
        assert_eq!(props.permissions, "0644");
        assert_eq!(props.content, "");
    }

    #[test]
    fn invalid_permissions_are_rejected() {
        assert!(parse_file_properties(&json!({"path": "/a", "permissions": "rw-r--r--"})).is_err());
        assert!(parse_mode("0999").is_err());
        assert!(parse_mode("17777").is_err());
    }

    #[test]
    fn mode_round_trips_through_octal() {
        assert_eq!(parse_mode("644").unwrap(), 0o644);
        assert_eq!(parse_mode("0755").unwrap(), 0o755);
        assert_eq!(format_mode(0o100644), "0644");
        assert_eq!(format_mode(0o600), "0600");
    }
}
