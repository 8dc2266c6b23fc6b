// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use std::env;
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub const LOG_ENV: &str = "PDEDIT_LOG";

/// A non-blank `PDEDIT_LOG` wins over the configured level.
pub fn select_directives<'a>(env_value: Option<&'a str>, configured: &'a str) -> &'a str {
    match env_value.map(str::trim) {
        Some(value) if !value.is_empty() => value,
        _ => configured,
    }
}

/// Log to a file only; the terminal belongs to the editor.
pub fn init_logging(path: &Path, level: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| {
            format!(
                "open log file {}; set [log].path to a writable location",
                path.display()
            )
        })?;

    let env_value = env::var(LOG_ENV).ok();
    let directives = select_directives(env_value.as_deref(), level);
    let filter = EnvFilter::try_new(directives)
        .with_context(|| format!("invalid log filter {directives:?}"))?;

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(Mutex::new(file));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .try_init()
        .context("install tracing subscriber")?;

    Ok(())
}
