//! Networked key-value credential cache.
//!
//! Records are stored JSON-encoded in a memcached-style key-value service
//! speaking the text protocol (`get`/`set`/`delete`/`flush_all`). Keys are
//! derived from the configured prefix plus the username, so every identity
//! owns its own slot. Atomicity is whatever the remote store guarantees for
//! a single key; no extra locking is layered on top.

use super::{validate_username, CacheVerdict, CredentialCache, CredentialRecord};
use anyhow::{anyhow, Context, Result};
use secrecy::SecretString;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct NetworkCredentialCache {
    host: String,
    port: u16,
    key_prefix: String,
    lifespan: u64,
    debug: bool,
}

impl NetworkCredentialCache {
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        port: u16,
        key_prefix: impl Into<String>,
        lifespan: u64,
        debug: bool,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            key_prefix: key_prefix.into(),
            lifespan,
            debug,
        }
    }

    fn key(&self, username: &str) -> String {
        format!("{}:{}", self.key_prefix, username)
    }

    async fn connect(&self) -> Result<BufReader<TcpStream>> {
        let stream = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .with_context(|| format!("failed to connect to {}:{}", self.host, self.port))?;
        Ok(BufReader::new(stream))
    }

    async fn fetch(&self, username: &str) -> Result<Option<CredentialRecord>> {
        let key = self.key(username);
        let mut stream = self.connect().await?;
        if self.debug {
            debug!("get {key}");
        }
        stream
            .get_mut()
            .write_all(format!("get {key}\r\n").as_bytes())
            .await?;

        let header = read_line(&mut stream).await?;
        if header == "END" {
            return Ok(None);
        }

        let length: usize = header
            .strip_prefix("VALUE ")
            .and_then(|rest| rest.rsplit(' ').next())
            .and_then(|bytes| bytes.parse().ok())
            .ok_or_else(|| anyhow!("unexpected response: {header}"))?;

        let mut payload = vec![0u8; length + 2];
        stream.read_exact(&mut payload).await?;
        payload.truncate(length);

        let trailer = read_line(&mut stream).await?;
        if trailer != "END" {
            return Err(anyhow!("unexpected trailer: {trailer}"));
        }

        match serde_json::from_slice(&payload) {
            Ok(record) => Ok(Some(record)),
            Err(err) => {
                // A record something else wrote; treat as absent.
                warn!("discarding undecodable cache value for {key}: {err}");
                Ok(None)
            }
        }
    }

    async fn store(&self, username: &str, record: &CredentialRecord) -> Result<()> {
        let key = self.key(username);
        let payload = serde_json::to_vec(record)?;
        let mut stream = self.connect().await?;
        if self.debug {
            debug!("set {key} ({} bytes)", payload.len());
        }
        let mut command = format!("set {key} 0 0 {}\r\n", payload.len()).into_bytes();
        command.extend_from_slice(&payload);
        command.extend_from_slice(b"\r\n");
        stream.get_mut().write_all(&command).await?;

        let reply = read_line(&mut stream).await?;
        if reply != "STORED" {
            return Err(anyhow!("store rejected: {reply}"));
        }
        Ok(())
    }

    async fn delete(&self, username: &str) -> Result<()> {
        let key = self.key(username);
        let mut stream = self.connect().await?;
        if self.debug {
            debug!("delete {key}");
        }
        stream
            .get_mut()
            .write_all(format!("delete {key}\r\n").as_bytes())
            .await?;

        let reply = read_line(&mut stream).await?;
        if reply != "DELETED" && reply != "NOT_FOUND" {
            return Err(anyhow!("delete rejected: {reply}"));
        }
        Ok(())
    }
}

impl CredentialCache for NetworkCredentialCache {
    async fn register(&self, username: &str, credential: &SecretString) -> Result<()> {
        validate_username(username)?;
        debug!("register cache entry: {username}");
        let record = CredentialRecord::new(credential)?;
        self.store(username, &record).await
    }

    async fn authenticate(
        &self,
        username: &str,
        credential: &SecretString,
    ) -> Result<CacheVerdict> {
        let Some(record) = self.fetch(username).await? else {
            return Ok(CacheVerdict::NotPresent);
        };
        if record.is_expired(self.lifespan) {
            info!("deleting timed out cache entry: {username}");
            self.delete(username).await?;
            return Ok(CacheVerdict::NotPresent);
        }
        if record.matches(credential) {
            Ok(CacheVerdict::Match)
        } else {
            Ok(CacheVerdict::Mismatch)
        }
    }

    async fn clear(&self) -> Result<()> {
        let mut stream = self.connect().await?;
        if self.debug {
            debug!("flush_all");
        }
        stream.get_mut().write_all(b"flush_all\r\n").await?;

        let reply = read_line(&mut stream).await?;
        if reply != "OK" {
            return Err(anyhow!("flush rejected: {reply}"));
        }
        Ok(())
    }
}

async fn read_line(stream: &mut BufReader<TcpStream>) -> Result<String> {
    let mut line = String::new();
    let read = stream.read_line(&mut line).await?;
    if read == 0 {
        return Err(anyhow!("connection closed by cache server"));
    }
    Ok(line.trim_end().to_string())
}
