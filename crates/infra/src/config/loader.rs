//! Store configuration from the process environment or a config file
//!
//! [`load`] reads an optional `.env` file first, then builds the config from
//! `KEYWARD_*` variables. When `KEYWARD_STORE_NAME` is unset it falls back to
//! the first `keyward.{toml,json}` or `config.{toml,json}` found in the
//! working directory, its parent, or next to the executable. The format is
//! picked from the file extension.
//!
//! | Variable | Field |
//! |---|---|
//! | `KEYWARD_STORE_NAME` | `name` (required) |
//! | `KEYWARD_TIME_UNIT_MS` | `time_unit_ms` |
//! | `KEYWARD_MAX_TRIES` | `retry.max_tries` |
//! | `KEYWARD_AUTOSAVE_ENABLED` | seed for `AutoSaveEnabled` |
//! | `KEYWARD_AUTOSAVE_INTERVAL` | seed for `AutoSaveInterval` |
//! | `KEYWARD_VERBOSE_LOGGING` | seed for `VerboseLogging` |
//! | `KEYWARD_DEBUG_LOGGING` | seed for `DebugLogging` |
//! | `KEYWARD_STUDIO_ENABLED` | seed for `StudioEnabled` |

use std::path::{Path, PathBuf};
use std::str::FromStr;

use keyward_domain::{KeywardError, Result, RetrySettings, SettingsOverrides, StoreConfig};

pub const STORE_NAME_VAR: &str = "KEYWARD_STORE_NAME";
pub const TIME_UNIT_MS_VAR: &str = "KEYWARD_TIME_UNIT_MS";
pub const MAX_TRIES_VAR: &str = "KEYWARD_MAX_TRIES";
pub const AUTOSAVE_ENABLED_VAR: &str = "KEYWARD_AUTOSAVE_ENABLED";
pub const AUTOSAVE_INTERVAL_VAR: &str = "KEYWARD_AUTOSAVE_INTERVAL";
pub const VERBOSE_LOGGING_VAR: &str = "KEYWARD_VERBOSE_LOGGING";
pub const DEBUG_LOGGING_VAR: &str = "KEYWARD_DEBUG_LOGGING";
pub const STUDIO_ENABLED_VAR: &str = "KEYWARD_STUDIO_ENABLED";

const FILE_STEMS: [&str; 2] = ["keyward", "config"];

/// Environment first, config file second, validated either way
///
/// # Errors
/// `KeywardError::Config` when neither source yields a config, a file does
/// not parse, or a value is out of range.
pub fn load() -> Result<StoreConfig> {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "read .env file"),
        Err(e) => tracing::trace!(error = %e, "no .env file"),
    }

    let config = match load_from_env() {
        Ok(config) => {
            tracing::info!(store = %config.name, "store config taken from environment");
            config
        }
        Err(e) => {
            tracing::debug!(error = %e, "environment incomplete, probing config files");
            load_from_file(None)?
        }
    };

    config.validate()?;
    Ok(config)
}

/// Only `KEYWARD_STORE_NAME` is required. Unset variables keep their defaults
/// and unset seeds leave the setting at its built-in value.
///
/// # Errors
/// `KeywardError::Config` naming the variable that is missing or malformed.
pub fn load_from_env() -> Result<StoreConfig> {
    let name = env_var(STORE_NAME_VAR)?;
    let mut config = StoreConfig::new(name);

    if let Some(time_unit_ms) = env_parse::<u64>(TIME_UNIT_MS_VAR)? {
        config.time_unit_ms = time_unit_ms;
    }
    if let Some(max_tries) = env_parse::<u32>(MAX_TRIES_VAR)? {
        config.retry = RetrySettings { max_tries };
    }

    config.settings = SettingsOverrides {
        auto_save_enabled: env_bool(AUTOSAVE_ENABLED_VAR),
        auto_save_interval: env_parse::<f64>(AUTOSAVE_INTERVAL_VAR)?,
        verbose_logging: env_bool(VERBOSE_LOGGING_VAR),
        debug_logging: env_bool(DEBUG_LOGGING_VAR),
        studio_enabled: env_bool(STUDIO_ENABLED_VAR),
    };

    Ok(config)
}

/// Read `path`, or the first probed candidate when `path` is `None`
///
/// # Errors
/// `KeywardError::Config` when no file is found or its contents do not parse.
pub fn load_from_file(path: Option<PathBuf>) -> Result<StoreConfig> {
    let path = match path {
        Some(explicit) if explicit.exists() => explicit,
        Some(missing) => {
            return Err(KeywardError::Config(format!(
                "config file {} does not exist",
                missing.display()
            )))
        }
        None => probe_config_paths()
            .ok_or_else(|| KeywardError::Config("no keyward or config file found".to_string()))?,
    };

    tracing::info!(path = %path.display(), "reading store config file");
    let contents = std::fs::read_to_string(&path)
        .map_err(|e| KeywardError::Config(format!("cannot read {}: {e}", path.display())))?;

    parse_config(&contents, &path)
}

/// Deserialize `contents` as TOML or JSON according to `path`'s extension.
/// Paths without an extension are read as JSON.
///
/// # Errors
/// `KeywardError::Config` for an unknown extension or malformed contents.
pub fn parse_config(contents: &str, path: &Path) -> Result<StoreConfig> {
    match path.extension().and_then(|e| e.to_str()).unwrap_or("json") {
        "toml" => toml::from_str(contents)
            .map_err(|e| KeywardError::Config(format!("malformed TOML config: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| KeywardError::Config(format!("malformed JSON config: {e}"))),
        other => Err(KeywardError::Config(format!("unsupported config extension `{other}`"))),
    }
}

/// First existing candidate under the working directory, its parent, or the
/// executable's directory
pub fn probe_config_paths() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok();
    let exe_dir = std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf));
    let roots: Vec<PathBuf> = cwd
        .iter()
        .flat_map(|dir| [dir.clone(), dir.join("..")])
        .chain(exe_dir)
        .collect();

    candidates(&roots).into_iter().find(|path| path.exists())
}

fn candidates(roots: &[PathBuf]) -> Vec<PathBuf> {
    roots
        .iter()
        .flat_map(|root| {
            FILE_STEMS.iter().flat_map(move |stem| {
                ["toml", "json"].iter().map(move |ext| root.join(format!("{stem}.{ext}")))
            })
        })
        .collect()
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| KeywardError::Config(format!("{key} is not set")))
}

/// `Ok(None)` when unset, an error naming `key` when set but unparsable
fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Err(_) => Ok(None),
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| KeywardError::Config(format!("{key} has an invalid value: {e}"))),
    }
}

/// `1`, `true`, `yes` and `on` (any case) are true. Anything else set is false.
fn env_bool(key: &str) -> Option<bool> {
    let raw = std::env::var(key).ok()?;
    Some(matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}
