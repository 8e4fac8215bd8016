// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use crate::config::Config;

pub const LOG_ENV: &str = "BIZDESK_LOG";

/// Installs the global subscriber when `[log].file` is set. The terminal
/// belongs to the TUI, so without a file nothing is logged.
pub fn init(config: &Config) -> Result<()> {
    let Some(path) = config.log_file() else {
        return Ok(());
    };
    let file = open_log_file(&path)?;
    let filter = env_filter(config.log_level());

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true);
    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .try_init()
        .map_err(|error| anyhow!("install log subscriber: {error}"))?;

    tracing::info!(path = %path.display(), "logging initialized");
    Ok(())
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level))
}

fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| {
            format!(
                "open log file {} -- fix [log].file or remove it to disable logging",
                path.display()
            )
        })
}
