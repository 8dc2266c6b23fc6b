// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use pdedit_app::{OverTotalPolicy, Panel};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

pub const APP_NAME: &str = "pdedit";
const CONFIG_VERSION: i64 = 1;
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub cash: Cash,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            ui: Ui::default(),
            cash: Cash::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ui {
    pub tab_ease_up: Option<bool>,
    pub start_panel: Option<String>,
}

impl Default for Ui {
    fn default() -> Self {
        Self {
            tab_ease_up: Some(true),
            start_panel: Some(Panel::Results.label().to_owned()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Cash {
    pub over_total: Option<String>,
}

impl Default for Cash {
    fn default() -> Self {
        Self {
            over_total: Some(OverTotalPolicy::ClampToZero.as_str().to_owned()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    pub level: Option<String>,
    pub path: Option<String>,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: Some(DEFAULT_LOG_LEVEL.to_owned()),
            path: None,
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("PDEDIT_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set PDEDIT_CONFIG_PATH to the config file")
        })?;
        Ok(config_root.join(APP_NAME).join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is not versioned. Add `version = 1` and put values under [ui], [cash], and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(panel) = &self.ui.start_panel
            && Panel::parse(panel).is_none()
        {
            bail!(
                "ui.start_panel in {} must be \"results\" or \"management\", got {:?}",
                path.display(),
                panel
            );
        }

        if let Some(policy) = &self.cash.over_total
            && OverTotalPolicy::parse(policy).is_none()
        {
            bail!(
                "cash.over_total in {} must be \"clamp\" or \"keep\", got {:?}",
                path.display(),
                policy
            );
        }

        if let Some(level) = &self.log.level {
            EnvFilter::try_new(level).with_context(|| {
                format!(
                    "log.level in {} is not a valid filter: {:?}; use a level such as info or debug",
                    path.display(),
                    level
                )
            })?;
        }

        if let Some(log_path) = &self.log.path
            && log_path.trim().is_empty()
        {
            bail!(
                "log.path in {} is empty; remove it to use the default location",
                path.display()
            );
        }

        Ok(())
    }

    pub fn tab_ease_up(&self) -> bool {
        self.ui.tab_ease_up.unwrap_or(true)
    }

    pub fn start_panel(&self) -> Panel {
        self.ui
            .start_panel
            .as_deref()
            .and_then(Panel::parse)
            .unwrap_or(Panel::Results)
    }

    pub fn over_total(&self) -> OverTotalPolicy {
        self.cash
            .over_total
            .as_deref()
            .and_then(OverTotalPolicy::parse)
            .unwrap_or_default()
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.log.path {
            return Ok(PathBuf::from(path));
        }
        let data_root = dirs::data_dir().ok_or_else(|| {
            anyhow!("cannot resolve data directory; set [log].path in the config file")
        })?;
        Ok(data_root.join(APP_NAME).join("pdedit.log"))
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# pdedit config\n# Place this file at: {}\n\nversion = 1\n\n[ui]\n# Tab into a cell with a single input starts editing it\ntab_ease_up = true\n# \"results\" or \"management\"\nstart_panel = \"results\"\n\n[cash]\n# When a cash edit exceeds the item total: \"clamp\" sets the other share to 0,\n# \"keep\" leaves it and lets validation flag the item\nover_total = \"clamp\"\n\n[log]\n# Overridden by the PDEDIT_LOG environment variable\nlevel = \"{}\"\n# Optional. Default is the platform data dir (for example ~/.local/share/pdedit/pdedit.log)\n# path = \"/absolute/path/to/pdedit.log\"\n",
            path.display(),
            DEFAULT_LOG_LEVEL,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::Config;
    use anyhow::Result;
    use pdedit_app::{OverTotalPolicy, Panel};
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    fn write_config(content: &str) -> Result<(tempfile::TempDir, PathBuf)> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(&path, content)?;
        Ok((temp, path))
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        match ENV_LOCK.get_or_init(|| Mutex::new(())).lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[test]
    fn missing_config_uses_defaults() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let config = Config::load(&temp.path().join("missing.toml"))?;
        assert_eq!(config.version, 1);
        assert!(config.tab_ease_up());
        assert_eq!(config.start_panel(), Panel::Results);
        assert_eq!(config.over_total(), OverTotalPolicy::ClampToZero);
        assert_eq!(config.log_level(), "info");
        Ok(())
    }

    #[test]
    fn unversioned_config_is_rejected_with_actionable_message() -> Result<()> {
        let (_temp, path) = write_config("[ui]\ntab_ease_up = false\n")?;
        let error = Config::load(&path).expect_err("unversioned config should fail");
        let message = error.to_string();
        assert!(message.contains("version = 1"));
        assert!(message.contains("[ui], [cash], and [log]"));
        Ok(())
    }

    #[test]
    fn v1_config_parses() -> Result<()> {
        let (_temp, path) = write_config(
            "version = 1\n[ui]\ntab_ease_up = false\nstart_panel = \"management\"\n[cash]\nover_total = \"keep\"\n[log]\nlevel = \"pdedit_app=debug\"\npath = \"/tmp/pdedit-test.log\"\n",
        )?;
        let config = Config::load(&path)?;
        assert!(!config.tab_ease_up());
        assert_eq!(config.start_panel(), Panel::Management);
        assert_eq!(config.over_total(), OverTotalPolicy::Keep);
        assert_eq!(config.log_level(), "pdedit_app=debug");
        assert_eq!(config.log_path()?, PathBuf::from("/tmp/pdedit-test.log"));
        Ok(())
    }

    #[test]
    fn partial_sections_fall_back_to_defaults() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[cash]\n")?;
        let config = Config::load(&path)?;
        assert_eq!(config.over_total(), OverTotalPolicy::ClampToZero);
        assert!(config.tab_ease_up());
        Ok(())
    }

    #[test]
    fn malformed_config_returns_parse_error() -> Result<()> {
        let (_temp, path) = write_config("{{not toml")?;
        let error = Config::load(&path).expect_err("malformed config should fail");
        assert!(error.to_string().contains("parse TOML config"));
        Ok(())
    }

    #[test]
    fn unsupported_config_version_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 2\n")?;
        let error = Config::load(&path).expect_err("v2 config should fail");
        assert!(error.to_string().contains("unsupported config version 2"));
        Ok(())
    }

    #[test]
    fn unknown_enum_values_are_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[cash]\nover_total = \"round\"\n")?;
        let error = Config::load(&path).expect_err("unknown policy should fail");
        assert!(error.to_string().contains("\"clamp\" or \"keep\""));

        let (_temp, path) = write_config("version = 1\n[ui]\nstart_panel = \"dashboard\"\n")?;
        let error = Config::load(&path).expect_err("unknown panel should fail");
        assert!(error.to_string().contains("ui.start_panel"));
        Ok(())
    }

    #[test]
    fn invalid_log_level_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[log]\nlevel = \"=[\"\n")?;
        let error = Config::load(&path).expect_err("bad filter should fail");
        assert!(error.to_string().contains("log.level"));
        Ok(())
    }

    #[test]
    fn default_path_honors_env_override() -> Result<()> {
        let _guard = env_lock();
        let temp = tempfile::tempdir()?;
        let override_path = temp.path().join("custom-config.toml");
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("PDEDIT_CONFIG_PATH", &override_path);
        }
        let resolved = Config::default_path()?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("PDEDIT_CONFIG_PATH");
        }
        assert_eq!(resolved, override_path);
        Ok(())
    }

    #[test]
    fn default_path_uses_config_toml_suffix_when_no_env_override() -> Result<()> {
        let _guard = env_lock();
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::remove_var("PDEDIT_CONFIG_PATH");
        }
        let path = Config::default_path()?;
        assert!(path.ends_with("pdedit/config.toml"));
        Ok(())
    }

    #[test]
    fn log_path_defaults_to_data_dir() -> Result<()> {
        let path = Config::default().log_path()?;
        assert!(path.ends_with("pdedit/pdedit.log"), "got {}", path.display());
        Ok(())
    }

    #[test]
    fn example_config_round_trips() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        let example = Config::example_config(&path);
        assert!(example.contains("version = 1"));
        assert!(example.contains("[ui]"));
        assert!(example.contains("[cash]"));
        assert!(example.contains("[log]"));

        std::fs::write(&path, example)?;
        let config = Config::load(&path)?;
        assert_eq!(config.over_total(), OverTotalPolicy::ClampToZero);
        Ok(())
    }
}
