// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use pdedit_app::Intervention;
use pdedit_testkit::InterventionFaker;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Reads and writes one intervention document as JSON on disk.
pub struct JsonFileRuntime {
    path: PathBuf,
}

impl JsonFileRuntime {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl pdedit_tui::AppRuntime for JsonFileRuntime {
    fn load_intervention(&mut self) -> Result<Intervention> {
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("read intervention file {}", self.path.display()))?;
        let intervention: Intervention = serde_json::from_str(&raw)
            .with_context(|| format!("parse intervention JSON {}", self.path.display()))?;
        info!(path = %self.path.display(), id = intervention.id.get(), "loaded intervention");
        Ok(intervention)
    }

    fn save_intervention(&mut self, intervention: &Intervention) -> Result<()> {
        let mut body =
            serde_json::to_string_pretty(intervention).context("serialize intervention")?;
        body.push('\n');

        // a failed write leaves the existing document untouched
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, body)
            .with_context(|| format!("write intervention file {}", staging.display()))?;
        fs::rename(&staging, &self.path).with_context(|| {
            format!(
                "replace {} with {}",
                self.path.display(),
                staging.display()
            )
        })?;
        info!(path = %self.path.display(), "saved intervention");
        Ok(())
    }

    fn source_label(&self) -> String {
        self.path.display().to_string()
    }
}

/// Generated document kept in memory; saves only replace the copy.
pub struct DemoRuntime {
    seed: u64,
    saved: Option<Intervention>,
}

impl DemoRuntime {
    pub fn new(seed: u64) -> Self {
        Self { seed, saved: None }
    }
}

impl pdedit_tui::AppRuntime for DemoRuntime {
    fn load_intervention(&mut self) -> Result<Intervention> {
        if let Some(saved) = &self.saved {
            return Ok(saved.clone());
        }
        Ok(InterventionFaker::new(self.seed).intervention())
    }

    fn save_intervention(&mut self, intervention: &Intervention) -> Result<()> {
        self.saved = Some(intervention.clone());
        Ok(())
    }

    fn source_label(&self) -> String {
        format!("demo (seed {})", self.seed)
    }
}
