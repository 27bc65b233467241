/// Configuration system for vitalis.
///
/// Provides a layered configuration hierarchy:
///
/// 1. **Built-in defaults**: [`schema::VitalisConfig::default()`]
/// 2. **User global config**: `~/.vitalis/config.toml`
/// 3. **Project local config**: `.vitalis.toml` in the current working directory
/// 4. **Environment variables**: `VITALIS_*` overrides (highest precedence)
///
/// File layers are merged key by key, so a project file that only sets
/// `chat.stream` keeps every other value from the global file.
///
/// # Usage
///
/// ```rust,ignore
/// use vitalis::config;
///
/// let cfg = config::load();
/// let client = ApiClient::from_config(&cfg.api);
/// ```
pub mod schema;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub use schema::VitalisConfig;

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the fully resolved configuration.
///
/// Merges defaults → global TOML → project TOML → env vars. Unreadable or
/// malformed files are skipped.
pub fn load() -> VitalisConfig {
    let mut config = load_layers(&[global_config_path(), project_config_path()]);
    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    config
}

/// Merge the given TOML files over the defaults, in order.
fn load_layers(paths: &[Option<PathBuf>]) -> VitalisConfig {
    let mut merged = toml::Value::Table(toml::map::Map::new());
    for path in paths.iter().flatten() {
        if let Some(layer) = load_toml_file(path) {
            merge_values(&mut merged, layer);
        }
    }
    merged.try_into().unwrap_or_default()
}

/// Read a TOML file as an untyped value. `None` if missing or malformed.
///
/// Layers that do not match the schema are dropped whole, so one bad file
/// cannot poison the others.
fn load_toml_file(path: &Path) -> Option<toml::Value> {
    let content = fs::read_to_string(path).ok()?;
    let value: toml::Value = toml::from_str(&content).ok()?;
    fits_schema(&value).then_some(value)
}

/// Recursively overlay `overlay` onto `base`. Tables merge; anything else
/// replaces.
fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn fits_schema(value: &toml::Value) -> bool {
    value.clone().try_into::<VitalisConfig>().is_ok()
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

/// `~/.vitalis/config.toml`.
fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".vitalis").join("config.toml"))
}

/// `.vitalis.toml` in the current directory.
fn project_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".vitalis.toml"))
}

/// Return the path to the global config file for display/init purposes.
pub fn global_config_file() -> Option<PathBuf> {
    global_config_path()
}

/// Return the path to the project config file for display purposes.
pub fn project_config_file() -> Option<PathBuf> {
    project_config_path()
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides (highest precedence layer).
///
/// Supported variables:
/// - `VITALIS_API_URL`: service base URL
/// - `VITALIS_TIMEOUT_MS`: request timeout, `0` for none
/// - `VITALIS_STREAM`: streaming chat (`1`/`true`/`yes`/`on`)
/// - `VITALIS_STATUS_INTERVAL_SECS`: status poll interval
/// - `VITALIS_STORAGE_DIR`: chat state directory
/// - `VITALIS_LOG`: log filter
fn apply_env_overrides(config: &mut VitalisConfig, var: impl Fn(&str) -> Option<String>) {
    if let Some(val) = var("VITALIS_API_URL")
        && !val.is_empty()
    {
        config.api.base_url = val;
    }
    if let Some(val) = var("VITALIS_TIMEOUT_MS")
        && let Ok(ms) = val.parse::<u64>()
    {
        config.api.timeout_ms = ms;
    }
    if let Some(val) = var("VITALIS_STREAM") {
        config.chat.stream = is_truthy(&val);
    }
    if let Some(val) = var("VITALIS_STATUS_INTERVAL_SECS")
        && let Ok(secs) = val.parse::<u64>()
        && secs > 0
    {
        config.chat.status_interval_secs = secs;
    }
    if let Some(val) = var("VITALIS_STORAGE_DIR")
        && !val.is_empty()
    {
        config.storage.dir = val;
    }
    if let Some(val) = var("VITALIS_LOG")
        && !val.is_empty()
    {
        config.logging.level = val;
    }
}

/// Check if a string value represents a truthy boolean.
pub fn is_truthy(val: &str) -> bool {
    parse_bool(val) == Some(true)
}

/// Strict boolean spelling: `1/true/yes/on` or `0/false/no/off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Config init / set / reset
// ---------------------------------------------------------------------------

/// Write the default annotated config to `~/.vitalis/config.toml`.
///
/// Returns an error if the file already exists and `force` is false.
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;
    write_default(&path, force)?;
    Ok(path)
}

fn write_default(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(path, VitalisConfig::default_toml()).context("failed to write config file")
}

/// Set a dotted key such as `chat.stream` in the global config file.
pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let path = global_config_path().context("could not determine home directory")?;
    set_value_in_file(&path, key, value)
}

/// Update one key in `path`, starting from the defaults if the file is
/// missing. The result must still deserialize as a [`VitalisConfig`].
fn set_value_in_file(path: &Path, key: &str, value: &str) -> Result<()> {
    let mut root: toml::Value = if path.exists() {
        let content = fs::read_to_string(path).context("failed to read config file")?;
        toml::from_str(&content).context("failed to parse config as TOML value")?
    } else {
        toml::Value::try_from(VitalisConfig::default())
            .context("failed to serialize default config")?
    };

    set_toml_value(&mut root, key, value)?;

    if !fits_schema(&root) {
        anyhow::bail!("'{value}' is not a valid value for '{key}'");
    }

    let output = toml::to_string_pretty(&root).context("failed to serialize updated config")?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(path, output).context("failed to write config file")?;
    Ok(())
}

/// Set a value in a TOML value tree using a dotted key path.
///
/// Missing sections are created. The new value takes the type of the value
/// it replaces, or of the built-in default when the key is new.
fn set_toml_value(root: &mut toml::Value, key: &str, raw_value: &str) -> Result<()> {
    let (section, leaf) = key
        .split_once('.')
        .with_context(|| format!("config key must look like 'section.key', got '{key}'"))?;

    let defaults =
        toml::Value::try_from(VitalisConfig::default()).context("failed to serialize defaults")?;
    let template = defaults
        .get(section)
        .and_then(|s| s.get(leaf))
        .with_context(|| format!("unknown config key: '{key}'"))?;

    let table = root
        .as_table_mut()
        .context("config root is not a table")?
        .entry(section)
        .or_insert(toml::Value::Table(toml::map::Map::new()))
        .as_table_mut()
        .with_context(|| format!("expected table at '{section}'"))?;

    let kind = table.get(leaf).unwrap_or(template);
    let new_value = match kind {
        toml::Value::Boolean(_) => {
            let b = parse_bool(raw_value).with_context(|| {
                format!("expected true/false for '{key}', got '{raw_value}'")
            })?;
            toml::Value::Boolean(b)
        }
        toml::Value::Integer(_) => {
            let n: i64 = raw_value
                .parse()
                .with_context(|| format!("expected integer for '{key}', got '{raw_value}'"))?;
            toml::Value::Integer(n)
        }
        _ => toml::Value::String(raw_value.to_string()),
    };

    table.insert(leaf.to_string(), new_value);
    Ok(())
}

/// Reset the global config to defaults (overwrite the file).
pub fn reset_config() -> Result<PathBuf> {
    init_config(true)
}

/// Show the effective (fully resolved) config as TOML.
pub fn show_effective_config() -> Result<String> {
    let config = load();
    toml::to_string_pretty(&config).context("failed to serialize effective config")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
