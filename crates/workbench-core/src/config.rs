//! Configuration resolution for Workbench.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (`$XDG_CONFIG_HOME/workbench/settings.json`)
//! 3. Project config (`.workbench/settings.json`)
//! 4. Environment variables
//! 5. CLI arguments (highest priority, applied by the binary)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Storage key under which the session tab list is persisted.
pub const DEFAULT_STORAGE_KEY: &str = "terminal_sessions";

/// Complete Workbench configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub sessions: SessionConfig,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            sessions: SessionConfig::default(),
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Persistent key-value store configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreConfig {
    /// JSON file backing the store. Defaults to `~/.workbench/state.json`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Session multiplexer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Key the ordered session list is stored under.
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
    /// Maximum history entries kept per session (`None` = unbounded).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_limit: Option<usize>,
}

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            storage_key: default_storage_key(),
            history_limit: None,
        }
    }
}

impl Config {
    /// Resolved store file path: configured path or the per-user default.
    pub fn store_path(&self) -> Option<PathBuf> {
        self.store.path.clone().or_else(default_store_path)
    }
}

/// Load configuration with hierarchical resolution.
pub fn load_config(project_dir: Option<&Path>) -> Result<Config> {
    let global = global_config_path();
    resolve_config(global.as_deref(), project_dir, |key| std::env::var(key).ok())
}

/// Layered resolution over explicit sources. Missing files are skipped; a
/// file only overrides the keys it actually sets.
fn resolve_config(
    global_path: Option<&Path>,
    project_dir: Option<&Path>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Config> {
    let mut config = Config::default();

    if let Some(global_path) = global_path
        && global_path.exists()
    {
        let global = load_config_file(global_path)?;
        merge_config(&mut config, global);
    }

    if let Some(dir) = project_dir {
        let project_path = dir.join(".workbench").join("settings.json");
        if project_path.exists() {
            let project = load_config_file(&project_path)?;
            merge_config(&mut config, project);
        }
    }

    apply_env_overrides(&mut config, lookup);

    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("workbench").join("settings.json"))
}

/// Default location of the JSON store: `~/.workbench/state.json`.
pub fn default_store_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".workbench").join("state.json"))
}

/// One settings file as written: every key optional, so absent keys leave
/// lower layers alone.
#[derive(Debug, Default, Deserialize)]
struct ConfigLayer {
    #[serde(default)]
    store: StoreLayer,
    #[serde(default)]
    sessions: SessionLayer,
    log_level: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StoreLayer {
    path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct SessionLayer {
    storage_key: Option<String>,
    history_limit: Option<usize>,
}

fn load_config_file(path: &Path) -> Result<ConfigLayer> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!(
            "Failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!(
            "Failed to parse config file {}: {}",
            path.display(),
            e
        ))
    })
}

fn merge_config(base: &mut Config, layer: ConfigLayer) {
    if let Some(path) = layer.store.path {
        base.store.path = Some(path);
    }
    if let Some(key) = layer.sessions.storage_key {
        base.sessions.storage_key = key;
    }
    if let Some(limit) = layer.sessions.history_limit {
        base.sessions.history_limit = Some(limit);
    }
    if let Some(level) = layer.log_level {
        base.log_level = level;
    }
}

/// Apply `WORKBENCH_*` overrides. `lookup` is `std::env::var` outside tests.
fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(val) = lookup("WORKBENCH_STORE_PATH") {
        config.store.path = Some(PathBuf::from(val));
    }
    if let Some(val) = lookup("WORKBENCH_LOG_LEVEL") {
        config.log_level = val;
    }
    if let Some(val) = lookup("WORKBENCH_STORAGE_KEY")
        && !val.is_empty()
    {
        config.sessions.storage_key = val;
    }
    if let Some(val) = lookup("WORKBENCH_HISTORY_LIMIT")
        && let Ok(n) = val.parse()
    {
        config.sessions.history_limit = Some(n);
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_uses_terminal_sessions_key() {
        let config = Config::default();
        assert_eq!(config.sessions.storage_key, "terminal_sessions");
        assert!(config.sessions.history_limit.is_none());
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{"log_level":"debug"}"#).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.sessions.storage_key, DEFAULT_STORAGE_KEY);
        assert!(config.store.path.is_none());
    }

    #[test]
    fn partial_sessions_block_keeps_default_key() {
        let config: Config =
            serde_json::from_str(r#"{"sessions":{"history_limit":50}}"#).unwrap();
        assert_eq!(config.sessions.storage_key, DEFAULT_STORAGE_KEY);
        assert_eq!(config.sessions.history_limit, Some(50));
    }

    fn layer(json: &str) -> ConfigLayer {
        serde_json::from_str(json).unwrap()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn merge_only_overrides_keys_present_in_layer() {
        let mut config = Config::default();
        merge_config(
            &mut config,
            layer(r#"{"log_level":"debug","sessions":{"storage_key":"g","history_limit":50}}"#),
        );
        merge_config(&mut config, layer(r#"{"store":{"path":"/srv/state.json"}}"#));

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.sessions.storage_key, "g");
        assert_eq!(config.sessions.history_limit, Some(50));
        assert_eq!(config.store.path.as_deref(), Some(Path::new("/srv/state.json")));
    }

    #[test]
    fn project_layer_overrides_global_layer() {
        let dir = tempfile::TempDir::new().unwrap();
        let global = dir.path().join("global.json");
        std::fs::write(
            &global,
            r#"{"log_level":"debug","store":{"path":"/g/state.json"},"sessions":{"history_limit":50}}"#,
        )
        .unwrap();
        let project = dir.path().join("project");
        std::fs::create_dir_all(project.join(".workbench")).unwrap();
        std::fs::write(
            project.join(".workbench").join("settings.json"),
            r#"{"store":{"path":"/p/state.json"},"sessions":{"storage_key":"proj"}}"#,
        )
        .unwrap();

        let config =
            resolve_config(Some(global.as_path()), Some(project.as_path()), no_env).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.store.path.as_deref(), Some(Path::new("/p/state.json")));
        assert_eq!(config.sessions.storage_key, "proj");
        assert_eq!(config.sessions.history_limit, Some(50));
    }

    #[test]
    fn env_overrides_file_layers() {
        let dir = tempfile::TempDir::new().unwrap();
        let global = dir.path().join("global.json");
        std::fs::write(&global, r#"{"log_level":"debug"}"#).unwrap();

        let config = resolve_config(Some(global.as_path()), None, |k| {
            (k == "WORKBENCH_LOG_LEVEL").then(|| "warn".to_string())
        })
        .unwrap();
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn missing_files_yield_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let absent = dir.path().join("absent.json");
        let config = resolve_config(Some(absent.as_path()), Some(dir.path()), no_env).unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.sessions.storage_key, DEFAULT_STORAGE_KEY);
        assert!(config.store.path.is_none());
    }

    #[test]
    fn env_overrides_apply() {
        let vars: HashMap<&str, &str> = [
            ("WORKBENCH_STORE_PATH", "/var/tmp/wb.json"),
            ("WORKBENCH_LOG_LEVEL", "warn"),
            ("WORKBENCH_STORAGE_KEY", "tabs"),
            ("WORKBENCH_HISTORY_LIMIT", "25"),
        ]
        .into_iter()
        .collect();
        let mut config = Config::default();
        apply_env_overrides(&mut config, |k| vars.get(k).map(ToString::to_string));

        assert_eq!(config.store_path().unwrap(), PathBuf::from("/var/tmp/wb.json"));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.sessions.storage_key, "tabs");
        assert_eq!(config.sessions.history_limit, Some(25));
    }

    #[test]
    fn invalid_history_limit_is_ignored() {
        let mut config = Config::default();
        apply_env_overrides(&mut config, |k| {
            (k == "WORKBENCH_HISTORY_LIMIT").then(|| "lots".to_string())
        });
        assert!(config.sessions.history_limit.is_none());
    }

    #[test]
    fn project_config_is_loaded() {
        let dir = tempfile::TempDir::new().unwrap();
        let wb = dir.path().join(".workbench");
        std::fs::create_dir_all(&wb).unwrap();
        std::fs::write(
            wb.join("settings.json"),
            r#"{"store":{"path":"/srv/state.json"},"sessions":{"storage_key":"proj"}}"#,
        )
        .unwrap();

        let config = resolve_config(None, Some(dir.path()), no_env).unwrap();
        assert_eq!(config.sessions.storage_key, "proj");
    }

    #[test]
    fn broken_project_config_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let wb = dir.path().join(".workbench");
        std::fs::create_dir_all(&wb).unwrap();
        std::fs::write(wb.join("settings.json"), "{ nope").unwrap();

        let err = resolve_config(None, Some(dir.path()), no_env).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
