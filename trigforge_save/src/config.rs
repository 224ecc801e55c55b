//! Optional `trigforge.toml` settings.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use trigforge_script::CompilerOptions;

use crate::export::{DEFAULT_MARKER_GROUP, ExportOptions};
use crate::save_paths::SavePaths;

pub const CONFIG_FILE: &str = "trigforge.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the container files; detected when unset.
    pub save_dir: Option<PathBuf>,
    /// Level to export into; the first level when unset.
    pub level: Option<String>,
    pub replace_past_objects: bool,
    pub marker_group: u32,
    pub loop_delay: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            save_dir: None,
            level: None,
            replace_past_objects: true,
            marker_group: DEFAULT_MARKER_GROUP,
            loop_delay: CompilerOptions::default().loop_delay,
        }
    }
}

impl Config {
    /// Load settings from `path`.
    ///
    /// # Errors
    /// Read or TOML parse failures.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Load `trigforge.toml` from `dir`, falling back to defaults when absent.
    ///
    /// # Errors
    /// Read or parse failures of a file that does exist.
    pub fn load_or_default(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            debug!("no {} in {}, using defaults", CONFIG_FILE, dir.display());
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    pub fn save_paths(&self) -> SavePaths {
        match &self.save_dir {
            Some(dir) => SavePaths::new(dir),
            None => SavePaths::detect(),
        }
    }

    pub fn compiler_options(&self) -> CompilerOptions {
        CompilerOptions {
            loop_delay: self.loop_delay,
            marker_group: self.replace_past_objects.then_some(self.marker_group),
        }
    }

    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            level: self.level.clone(),
            replace_past_objects: self.replace_past_objects,
            marker_group: self.marker_group,
        }
    }
}
