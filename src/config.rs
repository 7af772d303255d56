//! Configuration for artifact lookup, emulator timeouts and trace output.
//!
//! Resolution order: an explicit file, then `./emulator-dispatch.toml` when
//! present, then defaults. `EMULATOR_DISPATCH_ARTIFACTS` and
//! `EMULATOR_DISPATCH_TIMEOUT_SECS` override whatever the file says.

use crate::runtime::executor::WrapOptions;
use crate::runtime::loader::ArtifactStore;
use crate::trace::{TraceError, TraceLog};
use crate::{DispatchError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_CONFIG_FILE: &str = "emulator-dispatch.toml";
pub const ARTIFACTS_ENV: &str = "EMULATOR_DISPATCH_ARTIFACTS";
pub const TIMEOUT_ENV: &str = "EMULATOR_DISPATCH_TIMEOUT_SECS";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub artifacts: ArtifactsConfig,
    pub emulator: EmulatorConfig,
    pub trace: TraceConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    pub dir: PathBuf,
    pub abi_extension: String,
    pub bytecode_extension: String,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("artifacts"),
            abi_extension: "abi".to_string(),
            bytecode_extension: "bin".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmulatorConfig {
    /// Zero disables the timeout.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    pub output: Option<PathBuf>,
}

impl Config {
    /// Load configuration, applying environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "Reading configuration");
        let raw = std::fs::read_to_string(path).map_err(|e| {
            DispatchError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::parse(&raw)
            .map_err(|e| DispatchError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn parse(raw: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(dir) = var(ARTIFACTS_ENV) {
            self.artifacts.dir = PathBuf::from(dir);
        }
        if let Some(secs) = var(TIMEOUT_ENV) {
            self.emulator.timeout_secs = secs.trim().parse().map_err(|e| {
                DispatchError::Config(format!("{TIMEOUT_ENV}='{secs}' is not a number: {e}"))
            })?;
        }
        Ok(())
    }

    pub fn artifact_store(&self) -> ArtifactStore {
        ArtifactStore::new(&self.artifacts.dir).with_extensions(
            self.artifacts.abi_extension.clone(),
            self.artifacts.bytecode_extension.clone(),
        )
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.emulator.timeout_secs > 0).then(|| Duration::from_secs(self.emulator.timeout_secs))
    }

    /// Wrap options derived from this configuration; no trace sink attached.
    pub fn wrap_options(&self) -> WrapOptions {
        WrapOptions {
            trace_sink: None,
            timeout: self.timeout(),
        }
    }

    /// Write `log` to `[trace] output`. Returns false when no output is set.
    pub fn write_trace(&self, log: &TraceLog) -> std::result::Result<bool, TraceError> {
        match &self.trace.output {
            Some(path) => log.write_json(path).map(|()| true),
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_when_empty() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.artifacts.dir, PathBuf::from("artifacts"));
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn parses_partial_file() {
        let config = Config::parse(
            r#"
            [artifacts]
            dir = "tests/integration/solidity_files/output"

            [emulator]
            timeout_secs = 30
            "#,
        )
        .unwrap();
        assert_eq!(config.artifacts.abi_extension, "abi");
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
        assert!(config
            .artifact_store()
            .abi_path("Counter")
            .ends_with("output/Counter.abi"));
    }

    #[test]
    fn env_overrides_file() {
        let env: HashMap<&str, &str> = [(ARTIFACTS_ENV, "/tmp/out"), (TIMEOUT_ENV, "5")].into();
        let mut config = Config::default();
        config
            .apply_env(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.artifacts.dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.wrap_options().timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn bad_timeout_is_a_config_error() {
        let mut config = Config::default();
        let err = config
            .apply_env(|k| (k == TIMEOUT_ENV).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, DispatchError::Config(_)));
    }

    #[test]
    fn trace_output_is_optional() {
        let log = TraceLog::new();
        assert!(!Config::default().write_trace(&log).unwrap());

        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.trace.output = Some(dir.path().join("trace.json"));
        assert!(config.write_trace(&log).unwrap());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("trace.json")).unwrap(),
            "[]"
        );
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        assert!(matches!(
            Config::load(Some(Path::new("/definitely/not/here.toml"))),
            Err(DispatchError::Config(_))
        ));
    }
}
