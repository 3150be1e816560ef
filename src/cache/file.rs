//! Flat-file credential cache.
//!
//! One record per line, `username::created::hash`, appended on register and
//! rewritten on delete. The file is shared across concurrent invocations
//! without locking; a half-written or malformed line is skipped, never
//! fatal, and a file that vanishes between check and open is the same as an
//! empty one.

use super::{validate_username, CacheVerdict, CredentialCache, CredentialRecord};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use tracing::{debug, info};

const FIELD_DELIMITER: &str = "::";

#[derive(Debug)]
pub struct FileCredentialCache {
    path: PathBuf,
    lifespan: u64,
}

impl FileCredentialCache {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, lifespan: u64) -> Self {
        Self {
            path: path.into(),
            lifespan,
        }
    }

    /// Scan for the first line whose username field is exactly `username`.
    ///
    /// Matching splits on the field delimiter before comparing: a stored
    /// record for `bob` must never be returned for `bo`.
    fn lookup(&self, username: &str) -> Result<Option<CredentialRecord>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to read cache file {}", self.path.display())
                })
            }
        };

        Ok(contents
            .lines()
            .filter_map(parse_line)
            .find_map(|(user, record)| (user == username).then_some(record)))
    }

    /// Rewrite the file with all records for `username` removed.
    ///
    /// A missing file is a no-op, not an error.
    fn remove(&self, username: &str) -> Result<()> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(()),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to read cache file {}", self.path.display())
                })
            }
        };

        let kept: String = contents
            .lines()
            .filter(|line| parse_username(line) != Some(username))
            .fold(String::new(), |mut out, line| {
                out.push_str(line);
                out.push('\n');
                out
            });

        self.write_file(&kept)
    }

    fn append(&self, line: &str) -> Result<()> {
        let mut file = open_options(true)
            .open(&self.path)
            .with_context(|| format!("failed to open cache file {}", self.path.display()))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("failed to write cache file {}", self.path.display()))
    }

    fn write_file(&self, contents: &str) -> Result<()> {
        let mut file = open_options(false)
            .open(&self.path)
            .with_context(|| format!("failed to open cache file {}", self.path.display()))?;
        file.write_all(contents.as_bytes())
            .with_context(|| format!("failed to write cache file {}", self.path.display()))
    }
}

impl CredentialCache for FileCredentialCache {
    async fn register(&self, username: &str, credential: &SecretString) -> Result<()> {
        validate_username(username)?;
        debug!("register cache entry: {username}");
        let record = CredentialRecord::new(credential)?;
        self.append(&format!(
            "{username}{FIELD_DELIMITER}{created:.6}{FIELD_DELIMITER}{hash}\n",
            created = record.created,
            hash = record.pw_hash,
        ))
    }

    async fn authenticate(
        &self,
        username: &str,
        credential: &SecretString,
    ) -> Result<CacheVerdict> {
        let Some(record) = self.lookup(username)? else {
            return Ok(CacheVerdict::NotPresent);
        };
        if record.is_expired(self.lifespan) {
            info!("deleting timed out cache entry: {username}");
            self.remove(username)?;
            return Ok(CacheVerdict::NotPresent);
        }
        if record.matches(credential) {
            Ok(CacheVerdict::Match)
        } else {
            Ok(CacheVerdict::Mismatch)
        }
    }

    async fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| {
                format!("failed to remove cache file {}", self.path.display())
            }),
        }
    }
}

/// Cache files hold credential hashes; keep them owner-only.
fn open_options(append: bool) -> OpenOptions {
    let mut options = OpenOptions::new();
    options.create(true);
    if append {
        options.append(true);
    } else {
        options.write(true).truncate(true);
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options
}

fn parse_username(line: &str) -> Option<&str> {
    let (user, rest) = line.split_once(FIELD_DELIMITER)?;
    rest.contains(FIELD_DELIMITER).then_some(user)
}

fn parse_line(line: &str) -> Option<(&str, CredentialRecord)> {
    let mut fields = line.trim_end().splitn(3, FIELD_DELIMITER);
    let user = fields.next()?;
    let created: f64 = fields.next()?.parse().ok()?;
    let pw_hash = fields.next()?;
    if user.is_empty() || pw_hash.is_empty() {
        return None;
    }
    Some((
        user,
        CredentialRecord {
            created,
            pw_hash: pw_hash.to_string(),
        },
    ))
}
