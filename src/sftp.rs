//! [`RemoteStore`] over an SSH/SFTP session.

use chrono::{DateTime, Utc};
use ssh2::{FileStat, Session, Sftp};
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Credentials, Endpoint, parse_target_config};
use crate::error::{Error, Result};
use crate::model::FileSnapshot;
use crate::remote::{self, Connector, RemoteStore};
use crate::validate::format_mode;

/// Applies to TCP connect and SSH handshake only; file operations do not time out.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct SftpStore {
    session: Session,
    sftp: Sftp,
}

impl SftpStore {
    /// Dial, handshake, authenticate with a password and open the SFTP subsystem.
    pub fn connect(endpoint: &Endpoint, credentials: &Credentials) -> Result<Self> {
        let addr = endpoint
            .address()
            .to_socket_addrs()
            .map_err(|e| Error::Connection(format!("resolve {}: {e}", endpoint.address())))?
            .next()
            .ok_or_else(|| Error::Connection(format!("no address for {}", endpoint.host)))?;
        let tcp = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)
            .map_err(|e| Error::Connection(format!("ssh dial failed: {e}")))?;

        let mut session = Session::new().map_err(|e| Error::Connection(e.to_string()))?;
        session.set_tcp_stream(tcp);
        session.set_timeout(CONNECT_TIMEOUT.as_millis() as u32);
        session
            .handshake()
            .map_err(|e| Error::Connection(format!("ssh handshake failed: {e}")))?;
        session
            .userauth_password(&credentials.username, &credentials.password)
            .map_err(|e| Error::Connection(format!("ssh auth failed: {e}")))?;
        session.set_timeout(0);

        let sftp = session
            .sftp()
            .map_err(|e| Error::Connection(format!("sftp client failed: {e}")))?;
        tracing::info!(endpoint = %endpoint.address(), user = %credentials.username, "sftp session established");
        Ok(Self { session, sftp })
    }

    fn stat(&self, path: &str) -> Result<FileStat> {
        self.sftp.stat(Path::new(path)).map_err(|e| classify(e, path))
    }

    fn snapshot(&self, path: &str, content: String) -> Result<FileSnapshot> {
        let stat = self.stat(path)?;
        Ok(FileSnapshot {
            path: path.to_string(),
            content,
            permissions: format_mode(stat.perm.unwrap_or(0)),
            size: stat.size.unwrap_or(0),
            modified_at: stat
                .mtime
                .and_then(|secs| DateTime::<Utc>::from_timestamp(secs as i64, 0))
                .unwrap_or_default(),
        })
    }
}

fn classify(e: ssh2::Error, path: &str) -> Error {
    let err = Error::Ssh(e);
    if err.is_not_found() {
        Error::NotFound(path.to_string())
    } else {
        err
    }
}

fn perm_only(mode: u32) -> FileStat {
    FileStat {
        size: None,
        uid: None,
        gid: None,
        perm: Some(mode),
        atime: None,
        mtime: None,
    }
}

impl RemoteStore for SftpStore {
    fn upload(&self, path: &str, content: &str, mode: u32) -> Result<FileSnapshot> {
        let mut file = self.sftp.create(Path::new(path))?;
        file.write_all(content.as_bytes())?;
        file.flush()?;
        file.close()?;
        self.sftp.setstat(Path::new(path), perm_only(mode))?;
        self.snapshot(path, content.to_string())
    }

    fn delete(&self, path: &str) -> Result<()> {
        self.sftp.unlink(Path::new(path)).map_err(|e| classify(e, path))
    }

    fn read(&self, path: &str) -> Result<FileSnapshot> {
        self.stat(path)?;
        let mut file = self.sftp.open(Path::new(path)).map_err(|e| classify(e, path))?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        self.snapshot(path, String::from_utf8_lossy(&bytes).into_owned())
    }

    fn set_permissions(&self, path: &str, mode: u32) -> Result<()> {
        self.sftp
            .setstat(Path::new(path), perm_only(mode))
            .map_err(|e| classify(e, path))
    }

    fn list(&self, dir: &str) -> Result<Vec<String>> {
        let entries = self.sftp.readdir(Path::new(dir)).map_err(|e| classify(e, dir))?;
        let mut paths: Vec<String> = entries
            .into_iter()
            .filter(|(_, stat)| !stat.is_dir())
            .filter_map(|(entry, _)| {
                entry
                    .file_name()
                    .map(|name| remote::join(dir, &name.to_string_lossy()))
            })
            .collect();
        paths.sort();
        Ok(paths)
    }
}

/// Connects to the server named by the target config, with credentials
/// from the environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct SftpConnector;

impl Connector for SftpConnector {
    fn connect(&self, target_config: &serde_json::Value) -> Result<Arc<dyn RemoteStore>> {
        let cfg = parse_target_config(target_config)?;
        let endpoint = Endpoint::parse(&cfg.url)?;
        let credentials = Credentials::from_env()?;
        Ok(Arc::new(SftpStore::connect(&endpoint, &credentials)?))
    }
}

impl Drop for SftpStore {
    fn drop(&mut self) {
        if let Err(e) = self.session.disconnect(None, "closing", None) {
            tracing::debug!("sftp disconnect failed: {e}");
        }
    }
}
