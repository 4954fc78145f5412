//! Config file discovery, loading, and environment variable overlay.

use crate::{ConfigError, KeyspanConfig};
use keyspan::OverflowSeverity;
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
/// Returns paths in load order (system, user, local/cli).
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/keyspan/config.toml");
    if system.exists() {
        files.push(system);
    }

    // XDG_CONFIG_HOME or ~/.config
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("keyspan/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("keyspan.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Read a TOML file and lay the values it sets over `config`.
pub fn load_into(path: &Path, config: &mut KeyspanConfig) -> Result<(), ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    apply_toml(&contents, path, config)
}

/// Load a single file on top of the defaults.
pub fn load_from_file(path: &Path) -> Result<KeyspanConfig, ConfigError> {
    let mut config = KeyspanConfig::default();
    load_into(path, &mut config)?;
    Ok(config)
}

/// Apply the keys present in a TOML document. Absent keys keep their
/// current value, so files can be stacked.
pub fn apply_toml(
    contents: &str,
    path: &Path,
    config: &mut KeyspanConfig,
) -> Result<(), ConfigError> {
    let table: toml::Table = contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    if let Some(player) = section(&table, "player")? {
        if let Some(v) = player.get("hands") {
            config.player.hands = count(v, "player.hands")?;
        }
        if let Some(v) = player.get("fingers") {
            config.player.fingers = count(v, "player.fingers")?;
        }
        if let Some(v) = player.get("span") {
            config.player.span = number(v, "player.span")?;
        }
        if let Some(v) = player.get("max_notes") {
            config.player.max_notes = Some(count(v, "player.max_notes")?);
        }
    }

    if let Some(piano) = section(&table, "piano")? {
        if let Some(v) = piano.get("lowest_key") {
            config.piano.lowest_key = key(v, "piano.lowest_key")?;
        }
        if let Some(v) = piano.get("highest_key") {
            config.piano.highest_key = key(v, "piano.highest_key")?;
        }
    }

    if let Some(checks) = section(&table, "checks")? {
        if let Some(v) = checks.get("range") {
            config.checks.range = flag(v, "checks.range")?;
        }
        if let Some(v) = checks.get("player") {
            config.checks.player = flag(v, "checks.player")?;
        }
    }

    if let Some(report) = section(&table, "report")? {
        if let Some(v) = report.get("hide_warnings") {
            config.report.hide_warnings = flag(v, "report.hide_warnings")?;
        }
        if let Some(v) = report.get("abort_on_fail") {
            config.report.abort_on_fail = flag(v, "report.abort_on_fail")?;
        }
        if let Some(v) = report.get("finger_overflow") {
            let s = v
                .as_str()
                .ok_or_else(|| ConfigError::invalid("report.finger_overflow", "expected a string"))?;
            config.report.finger_overflow = overflow(s, "report.finger_overflow")?;
        }
        if let Some(v) = report.get("finger_overflow_tolerance") {
            config.report.finger_overflow_tolerance =
                count(v, "report.finger_overflow_tolerance")?;
        }
        if let Some(v) = report.get("note_names") {
            config.report.note_names = flag(v, "report.note_names")?;
        }
        if let Some(v) = report.get("seconds") {
            config.report.seconds = flag(v, "report.seconds")?;
        }
    }

    if let Some(input) = section(&table, "input")? {
        if let Some(v) = input.get("include_drums") {
            config.input.include_drums = flag(v, "input.include_drums")?;
        }
        if let Some(v) = input.get("tracks") {
            config.input.tracks = list(v, "input.tracks")?;
        }
        if let Some(v) = input.get("channels") {
            config.input.channels = list(v, "input.channels")?
                .into_iter()
                .map(|c| {
                    u8::try_from(c)
                        .map_err(|_| ConfigError::invalid("input.channels", "channel out of range"))
                })
                .collect::<Result<_, _>>()?;
        }
    }

    if let Some(logging) = section(&table, "logging")? {
        if let Some(v) = logging.get("level") {
            config.logging.level = v
                .as_str()
                .ok_or_else(|| ConfigError::invalid("logging.level", "expected a string"))?
                .to_string();
        }
    }

    Ok(())
}

fn section<'a>(table: &'a toml::Table, name: &str) -> Result<Option<&'a toml::Table>, ConfigError> {
    match table.get(name) {
        None => Ok(None),
        Some(v) => v
            .as_table()
            .map(Some)
            .ok_or_else(|| ConfigError::invalid(name, "expected a table")),
    }
}

fn count(v: &toml::Value, field: &str) -> Result<usize, ConfigError> {
    v.as_integer()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| ConfigError::invalid(field, "expected a non-negative integer"))
}

fn number(v: &toml::Value, field: &str) -> Result<f64, ConfigError> {
    v.as_float()
        .or_else(|| v.as_integer().map(|n| n as f64))
        .ok_or_else(|| ConfigError::invalid(field, "expected a number"))
}

fn flag(v: &toml::Value, field: &str) -> Result<bool, ConfigError> {
    v.as_bool()
        .ok_or_else(|| ConfigError::invalid(field, "expected true or false"))
}

/// Keys may be written as `"C4"` or `60`.
fn key(v: &toml::Value, field: &str) -> Result<String, ConfigError> {
    match v {
        toml::Value::String(s) => Ok(s.clone()),
        toml::Value::Integer(n) => Ok(n.to_string()),
        _ => Err(ConfigError::invalid(field, "expected a note name or MIDI number")),
    }
}

fn list(v: &toml::Value, field: &str) -> Result<Vec<usize>, ConfigError> {
    v.as_array()
        .ok_or_else(|| ConfigError::invalid(field, "expected an array"))?
        .iter()
        .map(|item| count(item, field))
        .collect()
}

fn overflow(s: &str, field: &str) -> Result<OverflowSeverity, ConfigError> {
    OverflowSeverity::from_str(s).map_err(|e| ConfigError::invalid(field, e.to_string()))
}

fn parsed<T: FromStr>(s: &str, field: &str) -> Result<T, ConfigError> {
    s.trim()
        .parse()
        .map_err(|_| ConfigError::invalid(field, format!("cannot parse {s:?}")))
}

fn truthy(s: &str, field: &str) -> Result<bool, ConfigError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::invalid(field, format!("cannot parse {s:?} as a flag"))),
    }
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(
    config: &mut KeyspanConfig,
    sources: &mut ConfigSources,
) -> Result<(), ConfigError> {
    apply_env_from(env::vars(), config, sources)
}

/// Apply overrides from an explicit set of variables.
pub fn apply_env_from<I>(
    vars: I,
    config: &mut KeyspanConfig,
    sources: &mut ConfigSources,
) -> Result<(), ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut vars: Vec<(String, String)> = vars
        .into_iter()
        .filter(|(k, _)| k.starts_with("KEYSPAN_") || k == "RUST_LOG")
        .collect();
    // RUST_LOG wins over KEYSPAN_LOG_LEVEL
    vars.sort_by_key(|(k, _)| (k == "RUST_LOG", k.clone()));

    for (name, value) in vars {
        match name.as_str() {
            "KEYSPAN_HANDS" => config.player.hands = parsed(&value, &name)?,
            "KEYSPAN_FINGERS" => config.player.fingers = parsed(&value, &name)?,
            "KEYSPAN_SPAN" => config.player.span = parsed(&value, &name)?,
            "KEYSPAN_MAX_NOTES" => config.player.max_notes = Some(parsed(&value, &name)?),
            "KEYSPAN_LOWEST_KEY" => config.piano.lowest_key = value.trim().to_string(),
            "KEYSPAN_HIGHEST_KEY" => config.piano.highest_key = value.trim().to_string(),
            "KEYSPAN_FINGER_OVERFLOW" => {
                config.report.finger_overflow = overflow(value.trim(), &name)?
            }
            "KEYSPAN_ABORT_ON_FAIL" => config.report.abort_on_fail = truthy(&value, &name)?,
            "KEYSPAN_HIDE_WARNINGS" => config.report.hide_warnings = truthy(&value, &name)?,
            "KEYSPAN_LOG_LEVEL" | "RUST_LOG" => config.logging.level = value,
            _ => continue,
        }
        sources.env_overrides.push(name);
    }

    Ok(())
}
