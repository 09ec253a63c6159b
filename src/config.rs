use crate::constants::{
    DEFAULT_INPUT_DIR, DEFAULT_INTERMEDIATE_DIR, DEFAULT_LOG_LEVEL, DEFAULT_OUTPUT_DIR,
};
use crate::error::{EtlError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory layout and log settings shared by every stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub input_dir: PathBuf,
    pub intermediate_dir: PathBuf,
    pub output_dir: PathBuf,
    pub log_level: String,
    /// When set, JSON logs are also written here with daily rotation.
    pub log_dir: Option<PathBuf>,
}

/// Optional TOML file shape; every key may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    input_dir: Option<PathBuf>,
    intermediate_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    log_level: Option<String>,
    log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from(DEFAULT_INPUT_DIR),
            intermediate_dir: PathBuf::from(DEFAULT_INTERMEDIATE_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_dir: None,
        }
    }
}

impl Config {
    /// Layers defaults, an optional TOML file (`config_path` or `ETL_CONFIG`),
    /// then the process environment (after loading `.env`).
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        dotenv::dotenv().ok();

        let mut config = Config::default();
        let file_path = config_path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("ETL_CONFIG").ok().map(PathBuf::from));
        if let Some(path) = file_path {
            config.apply_file(&path)?;
        }
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn apply_file(&mut self, path: &Path) -> Result<()> {
        let content = fs::read_to_string(path).map_err(|e| {
            EtlError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let file: FileConfig = toml::from_str(&content)?;

        if let Some(dir) = file.input_dir {
            self.input_dir = dir;
        }
        if let Some(dir) = file.intermediate_dir {
            self.intermediate_dir = dir;
        }
        if let Some(dir) = file.output_dir {
            self.output_dir = dir;
        }
        if let Some(level) = file.log_level {
            self.log_level = level;
        }
        if file.log_dir.is_some() {
            self.log_dir = file.log_dir;
        }
        Ok(())
    }

    /// Applies environment overrides through `lookup`; blank values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("INPUT_DIR") {
            self.input_dir = PathBuf::from(v);
        }
        if let Some(v) = get("INTERMEDIATE_DIR") {
            self.intermediate_dir = PathBuf::from(v);
        }
        if let Some(v) = get("OUTPUT_DIR") {
            self.output_dir = PathBuf::from(v);
        }
        if let Some(v) = get("LOG_LEVEL") {
            self.log_level = v;
        }
        if let Some(v) = get("LOG_DIR") {
            self.log_dir = Some(PathBuf::from(v));
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.tracing_level().map(|_| ())
    }

    /// Maps LOG_LEVEL (Python-style names included) onto a tracing filter level.
    pub fn tracing_level(&self) -> Result<&'static str> {
        match self.log_level.trim().to_ascii_uppercase().as_str() {
            "TRACE" => Ok("trace"),
            "DEBUG" => Ok("debug"),
            "INFO" => Ok("info"),
            "WARN" | "WARNING" => Ok("warn"),
            "ERROR" | "CRITICAL" => Ok("error"),
            other => Err(EtlError::Config(format!("Unknown LOG_LEVEL '{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn defaults_match_data_layout() {
        let config = Config::default();
        assert_eq!(config.input_dir, PathBuf::from("data/input"));
        assert_eq!(config.intermediate_dir, PathBuf::from("data/intermediate"));
        assert_eq!(config.output_dir, PathBuf::from("data/output"));
        assert_eq!(config.tracing_level().unwrap(), "info");
    }

    #[test]
    fn env_overrides_file_and_blank_values_are_ignored() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("etl.toml");
        fs::write(
            &path,
            "input_dir = \"/srv/in\"\noutput_dir = \"/srv/out\"\nlog_level = \"debug\"\n",
        )
        .unwrap();

        let mut config = Config::default();
        config.apply_file(&path).unwrap();

        let env: HashMap<&str, &str> = [("OUTPUT_DIR", "/env/out"), ("LOG_LEVEL", "  ")]
            .into_iter()
            .collect();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.input_dir, PathBuf::from("/srv/in"));
        assert_eq!(config.output_dir, PathBuf::from("/env/out"));
        assert_eq!(config.intermediate_dir, PathBuf::from("data/intermediate"));
        assert_eq!(config.tracing_level().unwrap(), "debug");
    }

    #[test]
    fn unknown_keys_in_file_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("etl.toml");
        fs::write(&path, "inputdir = \"typo\"\n").unwrap();

        let mut config = Config::default();
        assert!(matches!(config.apply_file(&path), Err(EtlError::Toml(_))));
    }

    #[test]
    fn python_style_levels_are_accepted() {
        let mut config = Config::default();
        config.log_level = "warning".to_string();
        assert_eq!(config.tracing_level().unwrap(), "warn");
        config.log_level = "CRITICAL".to_string();
        assert_eq!(config.tracing_level().unwrap(), "error");
        config.log_level = "loud".to_string();
        assert!(config.validate().is_err());
    }
}
