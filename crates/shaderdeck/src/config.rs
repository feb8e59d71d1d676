use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use renderer::{GpuPowerPreference, PresentPreference};
use serde::{Deserialize, Serialize};

/// User configuration read from `config.toml`. Every field is optional in the
/// file; missing ones take the defaults below.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Effect selected for new sessions and for runs without a project.
    pub default_effect: Option<String>,
    pub preview: PreviewConfig,
    pub export: ExportConfig,
    pub fonts: FontConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub width: u32,
    pub height: u32,
    pub high_performance: bool,
    pub vsync: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Output directory; defaults to `<data>/exports`.
    pub directory: Option<PathBuf>,
    pub fetch_fonts: bool,
    pub stamp: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    pub timeout_secs: u64,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            high_performance: false,
            vsync: true,
        }
    }
}

impl Default for FontConfig {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

impl PreviewConfig {
    pub fn power(&self) -> GpuPowerPreference {
        if self.high_performance {
            GpuPowerPreference::High
        } else {
            GpuPowerPreference::Low
        }
    }

    pub fn present(&self) -> PresentPreference {
        if self.vsync {
            PresentPreference::Vsync
        } else {
            PresentPreference::Immediate
        }
    }
}

impl FontConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl AppConfig {
    /// Reads the config file, treating a missing file as all defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file; using defaults");
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        Ok(config)
    }
}
