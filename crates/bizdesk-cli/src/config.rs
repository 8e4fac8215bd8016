// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use bizdesk_app::{AccessRole, ResourceKind, TenantContext};
use bizdesk_tui::UiOptions;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const APP_NAME: &str = "bizdesk";
pub const TOKEN_ENV: &str = "BIZDESK_API_TOKEN";
const CONFIG_PATH_ENV: &str = "BIZDESK_CONFIG_PATH";
const CONFIG_VERSION: i64 = 1;
const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";
const DEFAULT_TIMEOUT: &str = "5s";
const DEFAULT_ROLE: &str = "member";
const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEMO_TENANT: &str = "demo";
const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];
const MIN_PANEL_WIDTH: i64 = 12;
const MIN_PANEL_HEIGHT: i64 = 4;
const MAX_PANEL_CELLS: i64 = 500;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub api: Api,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            api: Api::default(),
            ui: Ui::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Api {
    pub base_url: Option<String>,
    pub tenant_id: Option<String>,
    pub token: Option<String>,
    pub role: Option<String>,
    pub timeout: Option<String>,
}

impl Default for Api {
    fn default() -> Self {
        Self {
            base_url: Some(DEFAULT_BASE_URL.to_owned()),
            tenant_id: None,
            token: None,
            role: Some(DEFAULT_ROLE.to_owned()),
            timeout: Some(DEFAULT_TIMEOUT.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ui {
    pub start_tab: Option<String>,
    pub panel_width: Option<i64>,
    pub panel_height: Option<i64>,
}

impl Default for Ui {
    fn default() -> Self {
        let defaults = UiOptions::default();
        Self {
            start_tab: Some(defaults.start_tab.label().to_owned()),
            panel_width: Some(i64::from(defaults.panel_width)),
            panel_height: Some(i64::from(defaults.panel_height)),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Log {
    pub level: Option<String>,
    pub file: Option<String>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set {CONFIG_PATH_ENV} to the config file")
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
                    "config file {} has no version. Add `version = 1` and put values under [api], [ui], and [log]",
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
        bizdesk_api::validate_base_url(self.base_url())
            .with_context(|| format!("invalid [api].base_url in {}", path.display()))?;

        if let Some(tenant_id) = &self.api.tenant_id
            && tenant_id.trim().is_empty()
        {
            bail!(
                "api.tenant_id in {} must not be blank; remove it or set your workspace id",
                path.display()
            );
        }

        if let Some(role) = &self.api.role
            && AccessRole::parse(role).is_none()
        {
            bail!(
                "api.role in {} must be one of viewer, member, manager, admin, owner; got {:?}",
                path.display(),
                role
            );
        }

        if let Some(timeout) = &self.api.timeout {
            let parsed = parse_duration(timeout)?;
            if parsed <= Duration::ZERO {
                bail!(
                    "api.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        if let Some(start_tab) = &self.ui.start_tab
            && ResourceKind::parse(start_tab).is_none()
        {
            bail!(
                "ui.start_tab in {} must be members, goals, or items; got {:?}",
                path.display(),
                start_tab
            );
        }
        check_panel_cells(path, "ui.panel_width", self.ui.panel_width, MIN_PANEL_WIDTH)?;
        check_panel_cells(path, "ui.panel_height", self.ui.panel_height, MIN_PANEL_HEIGHT)?;

        if let Some(level) = &self.log.level
            && !LOG_LEVELS.contains(&level.as_str())
        {
            bail!(
                "log.level in {} must be one of {}; got {:?}",
                path.display(),
                LOG_LEVELS.join(", "),
                level
            );
        }

        Ok(())
    }

    pub fn base_url(&self) -> &str {
        self.api.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    /// The configured token, falling back to the environment.
    pub fn api_token(&self) -> Option<String> {
        self.api
            .token
            .clone()
            .or_else(|| env::var(TOKEN_ENV).ok())
            .map(|token| token.trim().to_owned())
            .filter(|token| !token.is_empty())
    }

    pub fn api_timeout(&self) -> Result<Duration> {
        parse_duration(self.api.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn role(&self) -> AccessRole {
        self.api
            .role
            .as_deref()
            .and_then(AccessRole::parse)
            .unwrap_or(AccessRole::Member)
    }

    /// Demo mode runs without a tenant id and falls back to a fixed one.
    pub fn tenant_context(&self, demo: bool) -> Result<TenantContext> {
        let tenant_id = match self.api.tenant_id.as_deref().map(str::trim) {
            Some(tenant_id) => tenant_id.to_owned(),
            None if demo => DEMO_TENANT.to_owned(),
            None => bail!(
                "no workspace selected -- set [api].tenant_id, pass --tenant <id>, or run with --demo"
            ),
        };
        Ok(TenantContext::new(tenant_id, self.role()))
    }

    pub fn ui_options(&self) -> UiOptions {
        let defaults = UiOptions::default();
        let cells = |value: Option<i64>, fallback: u16| {
            value
                .and_then(|value| u16::try_from(value).ok())
                .unwrap_or(fallback)
        };
        UiOptions {
            start_tab: self
                .ui
                .start_tab
                .as_deref()
                .and_then(ResourceKind::parse)
                .unwrap_or(defaults.start_tab),
            panel_width: cells(self.ui.panel_width, defaults.panel_width),
            panel_height: cells(self.ui.panel_height, defaults.panel_height),
        }
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_file(&self) -> Option<PathBuf> {
        self.log
            .file
            .as_deref()
            .map(str::trim)
            .filter(|file| !file.is_empty())
            .map(PathBuf::from)
    }

    pub fn example_config(path: &Path) -> String {
        let ui = UiOptions::default();
        format!(
            "# bizdesk config\n# Place this file at: {}\n\nversion = 1\n\n[api]\nbase_url = \"{}\"\n# Your workspace id, sent as X-Tenant-ID.\ntenant_id = \"acme\"\n# Optional. {} is used when unset.\n# token = \"...\"\n# viewer, member, manager, admin, or owner\nrole = \"{}\"\ntimeout = \"{}\"\n\n[ui]\nstart_tab = \"{}\"\npanel_width = {}\npanel_height = {}\n\n[log]\nlevel = \"{}\"\n# Logs are only written when a file is set.\n# file = \"/tmp/bizdesk.log\"\n",
            path.display(),
            DEFAULT_BASE_URL,
            TOKEN_ENV,
            DEFAULT_ROLE,
            DEFAULT_TIMEOUT,
            ui.start_tab.label(),
            ui.panel_width,
            ui.panel_height,
            DEFAULT_LOG_LEVEL,
        )
    }
}

fn check_panel_cells(path: &Path, key: &str, value: Option<i64>, min: i64) -> Result<()> {
    if let Some(value) = value
        && !(min..=MAX_PANEL_CELLS).contains(&value)
    {
        bail!(
            "{key} in {} must be between {min} and {MAX_PANEL_CELLS} cells, got {value}",
            path.display()
        );
    }
    Ok(())
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins * 60));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 5s)")
}

#[cfg(test)]
mod tests {
    use super::{Config, TOKEN_ENV, parse_duration};
    use anyhow::Result;
    use bizdesk_app::{AccessRole, ResourceKind};
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};
    use std::time::Duration;

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
        assert_eq!(config.base_url(), "http://localhost:8000/api");
        assert_eq!(config.api_timeout()?, Duration::from_secs(5));
        assert_eq!(config.role(), AccessRole::Member);
        assert_eq!(config.ui_options().start_tab, ResourceKind::Members);
        assert!(config.log_file().is_none());
        Ok(())
    }

    #[test]
    fn full_config_parses() -> Result<()> {
        let (_temp, path) = write_config(
            "version = 1\n[api]\nbase_url = \"https://biz.example.com/api\"\ntenant_id = \"acme\"\nrole = \"admin\"\ntimeout = \"750ms\"\n[ui]\nstart_tab = \"goals\"\npanel_width = 40\npanel_height = 10\n[log]\nlevel = \"debug\"\nfile = \"/tmp/bizdesk.log\"\n",
        )?;
        let config = Config::load(&path)?;
        let context = config.tenant_context(false)?;
        assert_eq!(context.tenant_id, "acme");
        assert_eq!(context.role, AccessRole::Admin);
        assert_eq!(config.api_timeout()?, Duration::from_millis(750));

        let ui = config.ui_options();
        assert_eq!(ui.start_tab, ResourceKind::Goals);
        assert_eq!((ui.panel_width, ui.panel_height), (40, 10));
        assert_eq!(config.log_level(), "debug");
        assert_eq!(config.log_file(), Some(PathBuf::from("/tmp/bizdesk.log")));
        Ok(())
    }

    #[test]
    fn unversioned_config_is_rejected_with_actionable_message() -> Result<()> {
        let (_temp, path) = write_config("[api]\ntenant_id = \"acme\"\n")?;
        let error = Config::load(&path).expect_err("unversioned config should fail");
        let message = error.to_string();
        assert!(message.contains("version = 1"));
        assert!(message.contains("[api], [ui], and [log]"));
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
    fn malformed_config_returns_parse_error() -> Result<()> {
        let (_temp, path) = write_config("{{not toml")?;
        let error = Config::load(&path).expect_err("malformed config should fail");
        assert!(error.to_string().contains("parse TOML config"));
        Ok(())
    }

    #[test]
    fn invalid_base_url_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[api]\nbase_url = \"ftp://files\"\n")?;
        let error = Config::load(&path).expect_err("ftp base url should fail");
        assert!(format!("{error:#}").contains("http or https"));
        Ok(())
    }

    #[test]
    fn non_positive_timeout_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[api]\ntimeout = \"0s\"\n")?;
        let error = Config::load(&path).expect_err("zero timeout should fail");
        assert!(error.to_string().contains("must be positive"));
        Ok(())
    }

    #[test]
    fn panel_sizes_are_validated() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[ui]\npanel_width = 0\n")?;
        let error = Config::load(&path).expect_err("zero panel width should fail");
        assert!(error.to_string().contains("ui.panel_width"));

        let (_temp, path) = write_config("version = 1\n[ui]\npanel_height = -3\n")?;
        let error = Config::load(&path).expect_err("negative panel height should fail");
        assert!(error.to_string().contains("ui.panel_height"));
        Ok(())
    }

    #[test]
    fn unknown_enum_values_are_rejected() -> Result<()> {
        for content in [
            "version = 1\n[ui]\nstart_tab = \"dashboard\"\n",
            "version = 1\n[api]\nrole = \"superuser\"\n",
            "version = 1\n[log]\nlevel = \"loud\"\n",
        ] {
            let (_temp, path) = write_config(content)?;
            let error = Config::load(&path).expect_err("unknown value should fail");
            assert!(error.to_string().contains("must be"), "{error}");
        }
        Ok(())
    }

    #[test]
    fn tenant_is_required_outside_demo() -> Result<()> {
        let config = Config::default();
        let error = config
            .tenant_context(false)
            .expect_err("missing tenant should fail");
        assert!(error.to_string().contains("[api].tenant_id"));
        assert_eq!(config.tenant_context(true)?.tenant_id, "demo");
        Ok(())
    }

    #[test]
    fn token_falls_back_to_env() -> Result<()> {
        let _guard = env_lock();
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var(TOKEN_ENV, " from-env ");
        }
        let from_env = Config::default().api_token();
        let (_temp, path) = write_config("version = 1\n[api]\ntoken = \"from-file\"\n")?;
        let from_file = Config::load(&path)?.api_token();
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var(TOKEN_ENV);
        }
        assert_eq!(from_env.as_deref(), Some("from-env"));
        assert_eq!(from_file.as_deref(), Some("from-file"));
        Ok(())
    }

    #[test]
    fn default_path_honors_env_override() -> Result<()> {
        let _guard = env_lock();
        let temp = tempfile::tempdir()?;
        let override_path = temp.path().join("custom-config.toml");
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("BIZDESK_CONFIG_PATH", &override_path);
        }
        let resolved = Config::default_path();
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("BIZDESK_CONFIG_PATH");
        }
        assert_eq!(resolved?, override_path);
        Ok(())
    }

    #[test]
    fn timeout_parses_ms_seconds_and_minutes() -> Result<()> {
        assert_eq!(parse_duration("500ms")?, Duration::from_millis(500));
        assert_eq!(parse_duration("5s")?, Duration::from_secs(5));
        assert_eq!(parse_duration("2m")?, Duration::from_secs(120));
        assert!(parse_duration("soon").is_err());
        Ok(())
    }

    #[test]
    fn example_config_loads_cleanly() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(&path, Config::example_config(&path))?;
        let config = Config::load(&path)?;
        assert_eq!(config.tenant_context(false)?.tenant_id, "acme");
        for section in ["[api]", "[ui]", "[log]"] {
            assert!(Config::example_config(&path).contains(section));
        }
        Ok(())
    }
}
