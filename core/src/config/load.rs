use std::path::{Path, PathBuf};

use crate::error::ConfigError;

use super::types::AppConfig;

pub const LOCAL_CONFIG_FILE: &str = "taskflow.toml";

/// Get the default taskflow data directory: ~/.taskflow
pub fn get_taskflow_data_dir() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|home| home.join(".taskflow"))
        .ok_or_else(|| ConfigError::File("Cannot determine home directory".into()))
}

/// Load configuration, highest priority first:
///
/// 1. `explicit` path (from `--config`)
/// 2. `./taskflow.toml`
/// 3. `~/.taskflow/config.toml`
/// 4. built-in defaults
///
/// Environment overrides are applied on top of whichever source was used.
pub fn load_default(explicit: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut cfg = if let Some(path) = explicit {
        load_from_path(path)?
    } else if Path::new(LOCAL_CONFIG_FILE).exists() {
        load_from_path(Path::new(LOCAL_CONFIG_FILE))?
    } else {
        match get_taskflow_data_dir() {
            Ok(dir) if dir.join("config.toml").exists() => load_from_path(&dir.join("config.toml"))?,
            _ => AppConfig::default(),
        }
    };

    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok());
    expand_directories(&mut cfg);
    Ok(cfg)
}

pub fn load_from_path(path: &Path) -> Result<AppConfig, ConfigError> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::File(format!("read {}: {e}", path.display())))?;
    parse_config(&s).map_err(|e| match e {
        ConfigError::File(msg) => ConfigError::File(format!("{}: {msg}", path.display())),
        other => other,
    })
}

pub fn parse_config(s: &str) -> Result<AppConfig, ConfigError> {
    toml::from_str::<AppConfig>(s).map_err(|e| ConfigError::File(e.to_string()))
}

/// Environment variable overrides (highest priority).
///
/// Takes a lookup function so tests do not have to mutate the process environment.
pub fn apply_env_overrides<F>(cfg: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("TASKFLOW_REPORTS_DIR").filter(|v| !v.trim().is_empty()) {
        cfg.reports.directory = v;
    }
    if let Some(v) = lookup("TASKFLOW_DEFAULT_TIMEOUT_MS") {
        match v.trim().parse::<u64>() {
            Ok(ms) => cfg.engine.default_timeout_ms = ms,
            Err(_) => tracing::warn!(value = %v, "ignoring invalid TASKFLOW_DEFAULT_TIMEOUT_MS"),
        }
    }
    if let Some(v) = lookup("TASKFLOW_LOG_LEVEL").filter(|v| !v.trim().is_empty()) {
        cfg.logging.level = v;
    }
}

fn expand_directories(cfg: &mut AppConfig) {
    cfg.reports.directory = expand(&cfg.reports.directory);
    cfg.events_out.path = expand(&cfg.events_out.path);
    if let Some(dir) = cfg.logging.directory.as_mut() {
        *dir = expand(dir);
    }
}

fn expand(s: &str) -> String {
    shellexpand::tilde(s).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SAMPLE: &str = r#"
        [engine]
        default_timeout_ms = 5000
        results_capacity = 16

        [reports]
        directory = "out/reports"

        [[tasks]]
        id = "lint"
        kind = "lint"
        command = "eslint"
        args = ["src"]

        [[tasks]]
        id = "test"
        kind = "test"
        command = "jest"
        timeout_ms = 120000
        max_retries = 2
        dependencies = ["lint"]

        [workflows]
        verify = ["lint", "test"]
    "#;

    #[test]
    fn parses_full_config() {
        let cfg = parse_config(SAMPLE).unwrap();
        assert_eq!(cfg.engine.default_timeout_ms, 5000);
        assert_eq!(cfg.engine.kill_grace_ms, 2_000);
        assert_eq!(cfg.tasks.len(), 2);
        assert_eq!(cfg.tasks[1].max_retries, 2);
        assert_eq!(cfg.workflows["verify"], vec!["lint", "test"]);
        assert!(cfg.reports.enabled);
    }

    #[test]
    fn empty_config_uses_defaults() {
        let cfg = parse_config("").unwrap();
        assert_eq!(cfg.engine.default_timeout_ms, 600_000);
        assert!(cfg.tasks.is_empty());
        assert!(!cfg.events_out.enabled);
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let err = parse_config("[[tasks]]\nid = 3").unwrap_err();
        assert!(matches!(err, ConfigError::File(_)));
    }

    #[test]
    fn env_overrides_win() {
        let mut cfg = parse_config(SAMPLE).unwrap();
        let env: HashMap<&str, &str> = [
            ("TASKFLOW_REPORTS_DIR", "/tmp/r"),
            ("TASKFLOW_DEFAULT_TIMEOUT_MS", "42"),
        ]
        .into_iter()
        .collect();
        apply_env_overrides(&mut cfg, |k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.reports.directory, "/tmp/r");
        assert_eq!(cfg.engine.default_timeout_ms, 42);
        assert_eq!(cfg.logging.level, "warn");
    }

    #[test]
    fn invalid_timeout_override_is_ignored() {
        let mut cfg = AppConfig::default();
        apply_env_overrides(&mut cfg, |k| {
            (k == "TASKFLOW_DEFAULT_TIMEOUT_MS").then(|| "soon".to_string())
        });
        assert_eq!(cfg.engine.default_timeout_ms, 600_000);
    }

    #[test]
    fn loads_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        let cfg = load_default(Some(&path)).unwrap();
        assert_eq!(cfg.tasks[0].id, "lint");
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        let err = load_default(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::File(_)));
    }
}
