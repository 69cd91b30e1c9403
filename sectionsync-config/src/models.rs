use anyhow::{Context, anyhow, bail};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

pub const CONFIG_PATH_VAR: &str = "SECTIONSYNC_CONFIG_PATH";
pub const CONFIG_JSON_VAR: &str = "SECTIONSYNC_CONFIG_JSON";
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";

const DEFAULT_FILE_CANDIDATES: &[&str] = &[
    "sectionsync.toml",
    "sectionsync.json",
    "config/sectionsync.toml",
    "config/sectionsync.json",
];

/// Source that produced the engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConfigSource {
    #[default]
    Default,
    EnvPath(PathBuf),
    EnvInline,
    File(PathBuf),
}

/// Settings for the section update engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    pub database: DatabaseConfig,
    pub events: EventsConfig,
    pub logging: LoggingConfig,
}

/// Connection settings of the Postgres status store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Postgres connection string. `DATABASE_URL` takes precedence.
    pub url: Option<String>,
    /// Upper bound of pooled connections. Every concurrent section update
    /// holds at most one connection at a time.
    pub max_connections: u32,
    /// Seconds to wait for a free connection before failing.
    pub acquire_timeout_secs: u64,
    /// Apply pending schema migrations on connect.
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
            acquire_timeout_secs: 30,
            run_migrations: true,
        }
    }
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

/// Live status fan-out settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Events buffered per subscriber before the slowest ones start missing
    /// the oldest.
    pub channel_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives used when `RUST_LOG` is not set.
    pub filter: String,
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info,sectionsync_core=info".to_string(),
            ansi: true,
        }
    }
}

impl EngineConfig {
    /// Load `.env`, then the configuration, then apply `DATABASE_URL`.
    pub fn load() -> anyhow::Result<(Self, ConfigSource)> {
        // A missing .env file is normal outside development.
        let _ = dotenvy::dotenv();
        Self::load_from_env()
    }

    /// Load configuration using environment variables.
    /// Evaluation order:
    /// 1) `$SECTIONSYNC_CONFIG_PATH` (TOML or JSON file),
    /// 2) `$SECTIONSYNC_CONFIG_JSON` (inline JSON),
    /// 3) `sectionsync.toml` / `config/sectionsync.toml` (or `.json`),
    /// 4) defaults if none of the above exist.
    pub fn load_from_env() -> anyhow::Result<(Self, ConfigSource)> {
        Self::load_with(|key| env::var(key).ok(), Path::new("."))
    }

    /// [`EngineConfig::load_from_env`] against an arbitrary variable lookup
    /// and base directory for the default file candidates.
    pub fn load_with(
        lookup: impl Fn(&str) -> Option<String>,
        base_dir: &Path,
    ) -> anyhow::Result<(Self, ConfigSource)> {
        let (mut config, source) = Self::resolve(&lookup, base_dir)?;

        if let Some(url) = lookup(DATABASE_URL_VAR)
            && !url.trim().is_empty()
        {
            config.database.url = Some(url);
        }

        config.validate()?;
        Ok((config, source))
    }

    fn resolve(
        lookup: &impl Fn(&str) -> Option<String>,
        base_dir: &Path,
    ) -> anyhow::Result<(Self, ConfigSource)> {
        if let Some(path_str) = lookup(CONFIG_PATH_VAR)
            && !path_str.trim().is_empty()
        {
            let path = PathBuf::from(path_str);
            let config = Self::load_from_file(&path)?;
            return Ok((config, ConfigSource::EnvPath(path)));
        }

        if let Some(raw) = lookup(CONFIG_JSON_VAR)
            && !raw.trim().is_empty()
        {
            let parsed = Self::parse_json(&raw)
                .with_context(|| format!("failed to parse {CONFIG_JSON_VAR}"))?;
            return Ok((parsed, ConfigSource::EnvInline));
        }

        if let Some(path) = Self::find_default_file(base_dir) {
            let config = Self::load_from_file(&path)?;
            return Ok((config, ConfigSource::File(path)));
        }

        Ok((Self::default(), ConfigSource::Default))
    }

    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path).with_context(|| {
            format!("failed to read engine config from {}", path.display())
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::parse_json(&contents).with_context(|| {
                format!("invalid engine config {}", path.display())
            }),
            Some("toml") => toml::from_str(&contents).map_err(|err| {
                anyhow!("invalid engine config {}: {}", path.display(), err)
            }),
            _ => Self::parse_from_str(&contents, &path.display().to_string()),
        }
    }

    pub fn parse_from_str(
        contents: &str,
        origin: &str,
    ) -> anyhow::Result<Self> {
        toml::from_str(contents).or_else(|toml_err| {
            serde_json::from_str(contents).map_err(|json_err| {
                anyhow!(
                    "failed to parse engine config {}: toml error: {}; json error: {}",
                    origin,
                    toml_err,
                    json_err
                )
            })
        })
    }

    pub fn parse_json(raw: &str) -> anyhow::Result<Self> {
        serde_json::from_str(raw)
            .map_err(|err| anyhow!("invalid engine config json: {err}"))
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database.max_connections == 0 {
            bail!("database.max_connections must be at least 1");
        }
        if self.events.channel_capacity == 0 {
            bail!("events.channel_capacity must be at least 1");
        }
        if self.logging.filter.trim().is_empty() {
            bail!("logging.filter must not be empty");
        }
        Ok(())
    }

    fn find_default_file(base_dir: &Path) -> Option<PathBuf> {
        DEFAULT_FILE_CANDIDATES
            .iter()
            .map(|candidate| base_dir.join(candidate))
            .find(|path| path.exists())
    }
}
