//! Configuration file loading.
//!
//! The configuration surface is an ini-style document with a `[dirpam]`
//! primary section plus one section per cache backend:
//!
//! ```text
//! [dirpam]
//! url = https://directory.example.com
//! domain = example.com
//! admin-username = admin
//! admin-password = s3cret
//! group = admins, ops
//! excludes = root, backup
//! prompt = Password:
//! cache = file
//!
//! [file-cache]
//! file = /var/cache/dirpam/cache
//! lifespan = 1800
//! ```
//!
//! Keys and values are case-sensitive. Lines starting with `#` or `;` are
//! comments.

use anyhow::{anyhow, Context, Result};
use secrecy::SecretString;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Primary configuration section.
pub const SECTION_MAIN: &str = "dirpam";

const SECTION_FILE_CACHE: &str = "file-cache";
const SECTION_NETWORK_CACHE: &str = "network-cache";

const DEFAULT_PROMPT: &str = "Password:";

/// Cache backend selection with its backend-specific settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheSettings {
    /// No cache configured; every attempt goes to the directory service.
    None,
    /// Line-oriented flat-file store.
    File { path: PathBuf, lifespan: u64 },
    /// Networked key-value store.
    Network {
        host: String,
        port: u16,
        key_prefix: String,
        debug: bool,
        lifespan: u64,
    },
}

/// Process-wide configuration, loaded once per invocation and immutable for
/// the lifetime of one decision.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Base URL of the directory service.
    pub url: Option<String>,
    pub domain: Option<String>,
    pub admin_username: Option<String>,
    pub admin_password: Option<SecretString>,
    /// Required groups, OR-combined. Empty means no group restriction.
    pub groups: Vec<String>,
    /// Users never authenticated against the directory.
    pub excludes: Vec<String>,
    /// Prompt shown when the host has not already collected a credential.
    pub prompt: String,
    pub cache: CacheSettings,
}

/// Essential settings without which the whole module defers to the next
/// authentication mechanism.
#[derive(Debug, Clone, Copy)]
pub struct Essentials<'a> {
    pub domain: &'a str,
    pub admin_username: &'a str,
    pub admin_password: &'a SecretString,
}

impl AuthConfig {
    /// Load the configuration from an ini-style file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or a recognized key has an
    /// invalid value.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let document = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&document)
    }

    /// Parse a configuration document.
    ///
    /// # Errors
    /// Returns an error if a recognized key has an invalid value, or if the
    /// selected cache backend section is missing or incomplete.
    pub fn parse(document: &str) -> Result<Self> {
        let sections = parse_sections(document);
        let main = sections.get(SECTION_MAIN);

        let get = |key: &str| -> Option<String> {
            main.and_then(|section| section.get(key).cloned())
        };

        let cache = match get("cache").as_deref() {
            None | Some("none") => CacheSettings::None,
            Some("file") => {
                let section = sections
                    .get(SECTION_FILE_CACHE)
                    .with_context(|| format!("missing [{SECTION_FILE_CACHE}] section"))?;
                CacheSettings::File {
                    path: PathBuf::from(
                        section
                            .get("file")
                            .with_context(|| format!("missing file key in [{SECTION_FILE_CACHE}]"))?,
                    ),
                    lifespan: parse_lifespan(section, SECTION_FILE_CACHE)?,
                }
            }
            Some("network") => {
                let section = sections
                    .get(SECTION_NETWORK_CACHE)
                    .with_context(|| format!("missing [{SECTION_NETWORK_CACHE}] section"))?;
                CacheSettings::Network {
                    host: section
                        .get("host")
                        .with_context(|| format!("missing host key in [{SECTION_NETWORK_CACHE}]"))?
                        .clone(),
                    port: section
                        .get("port")
                        .with_context(|| format!("missing port key in [{SECTION_NETWORK_CACHE}]"))?
                        .parse()
                        .context("invalid port")?,
                    key_prefix: section
                        .get("key-prefix")
                        .map_or_else(|| env!("CARGO_PKG_NAME").to_string(), Clone::clone),
                    debug: section.get("debug").is_some_and(|value| parse_bool(value)),
                    lifespan: parse_lifespan(section, SECTION_NETWORK_CACHE)?,
                }
            }
            Some(other) => return Err(anyhow!("unknown cache backend: {other}")),
        };

        Ok(Self {
            url: get("url"),
            domain: get("domain"),
            admin_username: get("admin-username"),
            admin_password: get("admin-password").map(SecretString::from),
            groups: get("group").map(|value| split_list(&value)).unwrap_or_default(),
            excludes: get("excludes")
                .map(|value| split_list(&value))
                .unwrap_or_default(),
            prompt: get("prompt").unwrap_or_else(|| DEFAULT_PROMPT.to_string()),
            cache,
        })
    }

    /// The settings without which the module is considered unconfigured.
    #[must_use]
    pub fn essentials(&self) -> Option<Essentials<'_>> {
        Some(Essentials {
            domain: self.domain.as_deref()?,
            admin_username: self.admin_username.as_deref()?,
            admin_password: self.admin_password.as_ref()?,
        })
    }

    #[must_use]
    pub fn is_excluded(&self, username: &str) -> bool {
        self.excludes.iter().any(|user| user == username)
    }
}

fn parse_lifespan(section: &HashMap<String, String>, name: &str) -> Result<u64> {
    section
        .get("lifespan")
        .with_context(|| format!("missing lifespan key in [{name}]"))?
        .parse()
        .context("invalid lifespan")
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "true" | "yes" | "on" | "1"
    )
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_sections(document: &str) -> HashMap<String, HashMap<String, String>> {
    let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
    let mut current = String::new();

    for line in document.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
            current = name.trim().to_string();
            sections.entry(current.clone()).or_default();
            continue;
        }
        let Some(separator) = line.find(['=', ':']) else {
            continue;
        };
        let (key, value) = line.split_at(separator);
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        sections
            .entry(current.clone())
            .or_default()
            .insert(key.to_string(), value[1..].trim().to_string());
    }

    sections
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    const FULL: &str = r"
[dirpam]
url = https://directory.example.com
domain = example.com
admin-username = admin
admin-password = good-pwd
group = group1, group2
excludes = root, backup
prompt = Example Password:
cache = file

[file-cache]
file = /var/cache/dirpam/cache
lifespan = 1800
";

    #[test]
    #[allow(clippy::unwrap_used)]
    fn parse_full_document() {
        let config = AuthConfig::parse(FULL).unwrap();
        assert_eq!(config.url.as_deref(), Some("https://directory.example.com"));
        assert_eq!(config.domain.as_deref(), Some("example.com"));
        assert_eq!(config.admin_username.as_deref(), Some("admin"));
        assert_eq!(
            config.admin_password.as_ref().unwrap().expose_secret(),
            "good-pwd"
        );
        assert_eq!(config.groups, vec!["group1", "group2"]);
        assert_eq!(config.excludes, vec!["root", "backup"]);
        assert_eq!(config.prompt, "Example Password:");
        assert_eq!(
            config.cache,
            CacheSettings::File {
                path: PathBuf::from("/var/cache/dirpam/cache"),
                lifespan: 1800,
            }
        );
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn parse_network_cache() {
        let config = AuthConfig::parse(
            r"
[dirpam]
cache = network

[network-cache]
host = 127.0.0.1
port = 11211
key-prefix = dirpam
debug = true
lifespan = 600
",
        )
        .unwrap();
        assert_eq!(
            config.cache,
            CacheSettings::Network {
                host: "127.0.0.1".to_string(),
                port: 11211,
                key_prefix: "dirpam".to_string(),
                debug: true,
                lifespan: 600,
            }
        );
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn defaults_apply() {
        let config = AuthConfig::parse("[dirpam]\ndomain = example.com\n").unwrap();
        assert_eq!(config.prompt, "Password:");
        assert_eq!(config.cache, CacheSettings::None);
        assert!(config.groups.is_empty());
        assert!(config.excludes.is_empty());
        assert!(config.essentials().is_none());
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn essentials_require_all_three() {
        let config = AuthConfig::parse(
            "[dirpam]\ndomain = example.com\nadmin-username = admin\nadmin-password = pwd\n",
        )
        .unwrap();
        let essentials = config.essentials().unwrap();
        assert_eq!(essentials.domain, "example.com");
        assert_eq!(essentials.admin_username, "admin");
    }

    #[test]
    fn unknown_cache_backend_is_rejected() {
        let result = AuthConfig::parse("[dirpam]\ncache = sqlite\n");
        assert!(result.is_err());
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn cache_none_disables_caching() {
        let config = AuthConfig::parse("[dirpam]\ncache = none\n").unwrap();
        assert_eq!(config.cache, CacheSettings::None);
    }

    #[test]
    fn file_cache_requires_section() {
        let result = AuthConfig::parse("[dirpam]\ncache = file\n");
        assert!(result.is_err());
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn lifespan_is_required_per_backend_section() {
        let result = AuthConfig::parse("[dirpam]\ncache = file\n\n[file-cache]\nfile = /tmp/c\n");
        assert!(result.unwrap_err().to_string().contains("lifespan"));
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn comments_and_colon_separator() {
        let config = AuthConfig::parse(
            "# comment\n; another\n[dirpam]\ndomain: example.com\nprompt: Token:\n",
        )
        .unwrap();
        assert_eq!(config.domain.as_deref(), Some("example.com"));
        assert_eq!(config.prompt, "Token:");
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn excluded_users_match_exactly() {
        let config = AuthConfig::parse("[dirpam]\nexcludes = root, bob\n").unwrap();
        assert!(config.is_excluded("root"));
        assert!(config.is_excluded("bob"));
        assert!(!config.is_excluded("bo"));
        assert!(!config.is_excluded("bobby"));
    }
}
