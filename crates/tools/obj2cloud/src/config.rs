//! Tool settings: TOML file, then environment overrides

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use voxcloud::{ConvertOptions, GridSpec, PointFormat};

pub const THREADS_ENV: &str = "OBJ2CLOUD_THREADS";
pub const LABELS_ENV: &str = "OBJ2CLOUD_LABELS";
pub const OUTPUT_ENV: &str = "OBJ2CLOUD_OUTPUT";

/// Settings for the `obj2cloud` tool, loaded from an optional TOML file.
///
/// ```toml
/// threads = 8
/// output_dir = "clouds"
/// format = "binary"
/// grid = [110, 110, 110]
/// labels = "labels.txt"
///
/// [convert]
/// boundary_padding = 0.05
/// color_source = "ambient"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Worker threads, 0 = one per core
    #[serde(default)]
    pub threads: usize,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub format: PointFormat,
    #[serde(default = "default_grid")]
    pub grid: GridSpec,
    #[serde(default)]
    pub labels: Option<PathBuf>,
    #[serde(default)]
    pub convert: ConvertOptions,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_grid() -> GridSpec {
    GridSpec::LEGACY_DEFAULT
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            output_dir: default_output_dir(),
            format: PointFormat::default(),
            grid: default_grid(),
            labels: None,
            convert: ConvertOptions::default(),
        }
    }
}

impl BatchConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = toml::from_str(&text)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config
            .convert
            .validate()
            .with_context(|| format!("Invalid conversion options in {}", path.display()))?;
        Ok(config)
    }

    /// Config file (or defaults), then environment overrides.
    pub fn resolve(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    pub fn apply_env(&mut self) -> anyhow::Result<()> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        if let Some(threads) = lookup(THREADS_ENV) {
            self.threads = threads
                .trim()
                .parse()
                .with_context(|| format!("{THREADS_ENV} must be a thread count, got '{threads}'"))?;
        }
        if let Some(labels) = lookup(LABELS_ENV) {
            self.labels = Some(PathBuf::from(labels));
        }
        if let Some(output) = lookup(OUTPUT_ENV) {
            self.output_dir = PathBuf::from(output);
        }
        Ok(())
    }
}
