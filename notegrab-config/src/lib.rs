//! Loader for notegrab settings with YAML + environment overlays.
//!
//! Sources, lowest precedence first:
//!
//! 1. `<config_dir>/notegrab/notegrab.yaml` (optional)
//! 2. `./notegrab.yaml` (optional), or an explicit file passed by the caller
//! 3. `MISSKEY_*` environment variables, with `__` separating nested keys
//!    (`MISSKEY_API_KEY`, `MISSKEY_COLLECT__PAGE_SIZE`, ...)
//!
//! `${VAR}` placeholders in any string value are expanded after merging.
//!
//! ```yaml
//! instance_host: misskey.example
//! api_key: "${MY_MISSKEY_TOKEN}"
//! username: alice
//! collect:
//!   page_size: 100
//!   page_delay_ms: 1000
//!   local_only: true
//!   output: all_notes.json
//! markov:
//!   model: markov_data.json
//!   max_depth: 10
//! log:
//!   format: json
//! ```
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;
const ENV_PREFIX: &str = "MISSKEY";
const CONFIG_FILE_NAME: &str = "notegrab.yaml";

/// Misskey caps `users/notes` at 100 per request.
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct NotegrabConfig {
    /// Instance domain, e.g. `misskey.io`.
    #[serde(default = "default_instance_host", deserialize_with = "lenient_string")]
    pub instance_host: String,
    /// API token sent as the `i` body field. Required.
    #[serde(default, deserialize_with = "lenient_string")]
    pub api_key: String,
    /// Account whose notes are collected.
    #[serde(default = "default_username", deserialize_with = "lenient_string")]
    pub username: String,
    /// Origin override (scheme + authority). Defaults to `https://<instance_host>`.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub collect: CollectConfig,
    #[serde(default)]
    pub markov: MarkovConfig,
    #[serde(default)]
    pub log: LogSettings,
}

impl NotegrabConfig {
    /// Origin the API client talks to.
    pub fn origin(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}", self.instance_host),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectConfig {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Pause between page requests.
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,
    /// Only notes authored on the instance itself.
    #[serde(default = "default_true")]
    pub local_only: bool,
    #[serde(default = "default_notes_path")]
    pub output: PathBuf,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub auth_style: AuthStyle,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            page_delay_ms: default_page_delay_ms(),
            local_only: true,
            output: default_notes_path(),
            request_timeout_secs: default_request_timeout_secs(),
            auth_style: AuthStyle::default(),
        }
    }
}

/// Where the API token travels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthStyle {
    /// `{"i": "<token>", ...}` in the JSON body.
    #[default]
    Body,
    /// `Authorization: Bearer <token>`.
    Bearer,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarkovConfig {
    /// Notes file the trainer reads.
    #[serde(default = "default_notes_path")]
    pub notes: PathBuf,
    /// Trained model location.
    #[serde(default = "default_model_path")]
    pub model: PathBuf,
    /// Function nesting bound used by the simulator.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for MarkovConfig {
    fn default() -> Self {
        Self {
            notes: default_notes_path(),
            model: default_model_path(),
            max_depth: default_max_depth(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    /// `text` or `json`.
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            format: default_log_format(),
            dir: None,
        }
    }
}

fn default_instance_host() -> String {
    "voskey.icalo.net".into()
}
fn default_username() -> String {
    "white_green".into()
}
fn default_page_size() -> u32 {
    MAX_PAGE_SIZE
}
fn default_page_delay_ms() -> u64 {
    1000
}
fn default_true() -> bool {
    true
}
fn default_notes_path() -> PathBuf {
    PathBuf::from("all_notes.json")
}
fn default_model_path() -> PathBuf {
    PathBuf::from("markov_data.json")
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_max_depth() -> usize {
    10
}
fn default_log_format() -> String {
    "text".into()
}

/// Env parsing turns numeric-looking values into numbers; accept them back as strings.
fn lenient_string<'de, D>(d: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(d)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(de::Error::custom(format!("expected a string, got {other}"))),
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

fn validate(cfg: &NotegrabConfig, require_api_key: bool) -> Result<(), ConfigError> {
    if require_api_key && cfg.api_key.trim().is_empty() {
        return Err(ConfigError::Message(
            "api_key is required (set MISSKEY_API_KEY)".into(),
        ));
    }
    if cfg.instance_host.trim().is_empty() {
        return Err(ConfigError::Message("instance_host must not be empty".into()));
    }
    if cfg.username.trim().is_empty() {
        return Err(ConfigError::Message("username must not be empty".into()));
    }
    if !(1..=MAX_PAGE_SIZE).contains(&cfg.collect.page_size) {
        return Err(ConfigError::Message(format!(
            "collect.page_size must be within 1..={MAX_PAGE_SIZE}, got {}",
            cfg.collect.page_size
        )));
    }
    Ok(())
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct NotegrabConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
    require_api_key: bool,
}

impl Default for NotegrabConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl NotegrabConfigLoader {
    /// Start empty; environment overrides are layered on in [`Self::load`].
    ///
    /// ```
    /// use notegrab_config::NotegrabConfigLoader;
    ///
    /// let cfg = NotegrabConfigLoader::new()
    ///     .with_yaml_str("api_key: abc\nusername: alice")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(cfg.username, "alice");
    /// assert_eq!(cfg.collect.page_size, 100);
    /// assert!(cfg.collect.local_only);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
            require_api_key: true,
        }
    }

    /// Offline commands (`train`, `simulate`) never talk to the instance.
    pub fn require_api_key(mut self, required: bool) -> Self {
        self.require_api_key = required;
        self
    }

    /// Add the user-level and working-directory `notegrab.yaml` files if they exist.
    pub fn with_default_files(self) -> Self {
        let mut loader = self;
        if let Some(dir) = dirs::config_dir() {
            loader = loader.with_optional_file(dir.join("notegrab").join(CONFIG_FILE_NAME));
        }
        loader.with_optional_file(CONFIG_FILE_NAME)
    }

    /// Attach a YAML/TOML/JSON file that must exist; format is inferred by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that is skipped when missing.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources.
    ///
    /// `MISSKEY_`-prefixed environment variables are applied last so they win
    /// over files, then `${VAR}` placeholders are expanded.
    ///
    /// ```
    /// use notegrab_config::NotegrabConfigLoader;
    ///
    /// let err = NotegrabConfigLoader::new()
    ///     .with_yaml_str("collect:\n  page_size: 500\napi_key: abc")
    ///     .load()
    ///     .unwrap_err();
    /// assert!(err.to_string().contains("page_size"));
    /// ```
    pub fn load(self) -> Result<NotegrabConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: NotegrabConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;
        validate(&typed, self.require_api_key)?;
        Ok(typed)
    }
}
