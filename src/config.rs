use serde::Deserialize;
use std::collections::HashSet;
use std::{fs, path::{Path, PathBuf}};

use crate::error::ConfigError;

pub const DEFAULT_IMAP_PORT: u16 = 993;
pub const DEFAULT_FOLDER: &str = "INBOX";

const ACCOUNT_KEYS: &[&str] = &["name", "host", "port", "username", "password", "starttls"];
const SOURCE_KEYS: &[&str] = &["name", "type", "account", "folder", "search"];
const TARGET_KEYS: &[&str] = &["name", "type", "url", "token", "bucket", "org"];

#[derive(Clone, Debug)]
pub struct Config {
    pub accounts: Vec<Account>,
    pub sources: Vec<Source>,
    pub targets: Vec<Target>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub starttls: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Source {
    pub name: String,
    pub kind: String,
    pub account: String,
    pub folder: String,
    pub search: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    pub name: String,
    pub kind: String,
    pub params: TargetParams,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TargetParams {
    None,
    InfluxDb(InfluxDbParams),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InfluxDbParams {
    pub url: String,
    pub token: String,
    pub bucket: String,
    pub org: String,
}

impl Target {
    pub fn stdout() -> Self {
        Self {
            name: "stdout".to_string(),
            kind: "stdout".to_string(),
            params: TargetParams::None,
        }
    }
}

// What the file may contain. Everything is optional here so that validation
// can report every missing field at once.

#[derive(Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    accounts: Vec<RawAccount>,
    #[serde(default)]
    sources: Vec<RawSource>,
    #[serde(default)]
    targets: Vec<RawTarget>,
}

#[derive(Deserialize)]
struct RawAccount {
    name: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    username: Option<String>,
    password: Option<String>,
    starttls: Option<bool>,
}

#[derive(Deserialize)]
struct RawSource {
    name: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    account: Option<String>,
    folder: Option<String>,
    search: Option<String>,
}

#[derive(Deserialize)]
struct RawTarget {
    name: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    url: Option<String>,
    token: Option<String>,
    bucket: Option<String>,
    org: Option<String>,
}

impl Config {
    /// `~/.mailstat`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir()
            .ok_or_else(|| ConfigError::single("~/.mailstat", "no home directory"))?;
        Ok(home.join(".mailstat"))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let origin = path.display().to_string();
        let data = fs::read_to_string(path)
            .map_err(|e| ConfigError::single(&origin, format!("cannot read file: {e}")))?;
        Self::parse(&data, &origin)
    }

    /// Parse and validate TOML text. `origin` names the text in errors.
    pub fn parse(data: &str, origin: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(data)
            .map_err(|e| ConfigError::single(origin, e.to_string().trim_end()))?;
        let table: toml::Table = toml::from_str(data)
            .map_err(|e| ConfigError::single(origin, e.to_string().trim_end()))?;

        let mut problems = Vec::new();
        report_unknown_keys(&table, &mut problems);
        let cfg = raw.validate(&mut problems);

        if problems.is_empty() {
            Ok(cfg)
        } else {
            Err(ConfigError::new(origin, problems))
        }
    }
}

fn required(value: Option<String>, what: &str, field: &str, problems: &mut Vec<String>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        Some(_) => {
            problems.push(format!("{what}: `{field}` is empty"));
            String::new()
        }
        None => {
            problems.push(format!("{what}: missing `{field}`"));
            String::new()
        }
    }
}

// `search = ""` is allowed, a missing `search` is not.
fn present(value: Option<String>, what: &str, field: &str, problems: &mut Vec<String>) -> String {
    value.unwrap_or_else(|| {
        problems.push(format!("{what}: missing `{field}`"));
        String::new()
    })
}

fn report_unknown_keys(table: &toml::Table, problems: &mut Vec<String>) {
    for (section, value) in table {
        let known = match section.as_str() {
            "accounts" => ACCOUNT_KEYS,
            "sources" => SOURCE_KEYS,
            "targets" => TARGET_KEYS,
            _ => {
                problems.push(format!("unknown top-level key `{section}`"));
                continue;
            }
        };

        let entries = value.as_array().map(Vec::as_slice).unwrap_or_default();
        for (i, entry) in entries.iter().enumerate() {
            let Some(entry) = entry.as_table() else { continue };
            for key in entry.keys().filter(|k| !known.contains(&k.as_str())) {
                problems.push(format!("{section}[{i}]: unknown key `{key}`"));
            }
        }
    }
}

impl RawConfig {
    fn validate(self, problems: &mut Vec<String>) -> Config {
        let accounts: Vec<Account> = self
            .accounts
            .into_iter()
            .enumerate()
            .map(|(i, a)| a.validate(&format!("accounts[{i}]"), problems))
            .collect();
        report_duplicates("account", accounts.iter().map(|a| a.name.as_str()), problems);

        let sources: Vec<Source> = self
            .sources
            .into_iter()
            .enumerate()
            .map(|(i, s)| s.validate(&format!("sources[{i}]"), problems))
            .collect();
        report_duplicates("source", sources.iter().map(|s| s.name.as_str()), problems);

        let targets = self
            .targets
            .into_iter()
            .enumerate()
            .map(|(i, t)| t.validate(&format!("targets[{i}]"), problems))
            .collect();

        Config { accounts, sources, targets }
    }
}

fn report_duplicates<'a>(
    what: &str,
    names: impl Iterator<Item = &'a str>,
    problems: &mut Vec<String>,
) {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    for name in names.filter(|n| !n.is_empty()) {
        if !seen.insert(name) && reported.insert(name) {
            problems.push(format!("{what} name `{name}` is used more than once"));
        }
    }
}

impl RawAccount {
    fn validate(self, what: &str, problems: &mut Vec<String>) -> Account {
        let port = self.port.unwrap_or(DEFAULT_IMAP_PORT);
        if port == 0 {
            problems.push(format!("{what}: `port` must not be 0"));
        }
        Account {
            name: required(self.name, what, "name", problems),
            host: required(self.host, what, "host", problems),
            port,
            username: required(self.username, what, "username", problems),
            password: required(self.password, what, "password", problems),
            starttls: self.starttls.unwrap_or(false),
        }
    }
}

impl RawSource {
    fn validate(self, what: &str, problems: &mut Vec<String>) -> Source {
        Source {
            name: required(self.name, what, "name", problems),
            kind: required(self.kind, what, "type", problems),
            account: required(self.account, what, "account", problems),
            folder: self
                .folder
                .filter(|f| !f.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_FOLDER.to_string()),
            search: present(self.search, what, "search", problems),
        }
    }
}

impl RawTarget {
    fn validate(self, what: &str, problems: &mut Vec<String>) -> Target {
        let kind = required(self.kind, what, "type", problems);

        let params = match kind.as_str() {
            "influxdb" => TargetParams::InfluxDb(InfluxDbParams {
                url: required(self.url, what, "url", problems),
                token: required(self.token, what, "token", problems),
                bucket: required(self.bucket, what, "bucket", problems),
                org: required(self.org, what, "org", problems),
            }),
            _ => TargetParams::None,
        };

        Target {
            name: self
                .name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| kind.clone()),
            kind,
            params,
        }
    }
}
