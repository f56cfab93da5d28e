use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub mod defaults;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub sources: SourcesConfig,
    pub lookup: LookupConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// Download and assign the first usable candidate on a track change.
    pub auto_download: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Holds the association database (`lrc.db`).
    pub data_dir: PathBuf,
    /// Where downloaded lyrics are written.
    pub lyrics_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Active source ids, in the order results are merged.
    pub enabled: Vec<String>,
    /// Per-request timeout for a single source.
    pub timeout_secs: u64,
    /// Proxy used by every source without an override.
    pub proxy: ProxyConfig,
    pub overrides: HashMap<String, SourceOverride>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceOverride {
    pub proxy: Option<ProxyConfig>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyMode {
    /// Direct connection.
    None,
    /// Honor the `*_PROXY` environment variables.
    #[default]
    System,
    /// Use the configured host and port.
    Manual,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub mode: ProxyMode,
    /// `http`, `https` or `socks5`.
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        let data_dir = match ProjectDirs::from("dev", "lyricdb", "lyricdb") {
            Some(p) => p.data_dir().to_path_buf(),
            None => std::env::temp_dir().join("lyricdb"),
        };
        let lyrics_dir = directories::BaseDirs::new()
            .map(|b| b.home_dir().join(".lyrics"))
            .unwrap_or_else(|| data_dir.join("lyrics"));
        Self {
            data_dir,
            lyrics_dir,
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::ENABLED_SOURCES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            timeout_secs: defaults::SOURCE_TIMEOUT_SECS,
            proxy: ProxyConfig::default(),
            overrides: HashMap::new(),
        }
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            auto_download: true,
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            mode: ProxyMode::System,
            protocol: "http".to_string(),
            host: String::new(),
            port: 8080,
            username: None,
            password: None,
        }
    }
}

impl PathsConfig {
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("lrc.db")
    }
}

impl SourcesConfig {
    /// Proxy settings for one source: its override, else the shared proxy.
    pub fn proxy_for(&self, source_id: &str) -> &ProxyConfig {
        self.overrides
            .get(source_id)
            .and_then(|o| o.proxy.as_ref())
            .unwrap_or(&self.proxy)
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs.max(1))
    }
}

pub fn save(cfg: &Config, override_path: Option<&Path>) -> anyhow::Result<()> {
    let path = match override_path {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };
    write_config(cfg, &path)
}

pub fn default_config_path() -> anyhow::Result<PathBuf> {
    let proj =
        ProjectDirs::from("dev", "lyricdb", "lyricdb").context("ProjectDirs unavailable")?;
    Ok(proj.config_dir().join("config.toml"))
}

pub fn load(override_path: Option<&Path>) -> anyhow::Result<Config> {
    let path = match override_path {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };

    if !path.exists() {
        let cfg = defaults::defaults();
        write_config(&cfg, &path)?;
        return Ok(cfg);
    }

    let raw = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    let cfg = toml::from_str::<Config>(&raw).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}

fn write_config(cfg: &Config, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create dir {}", parent.display()))?;
    }
    let raw = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(path, raw).with_context(|| format!("write {}", path.display()))?;
    // The file may hold proxy credentials.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o600));
    }
    Ok(())
}
