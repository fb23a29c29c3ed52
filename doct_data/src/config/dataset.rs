//! Dataset-level configuration.

use std::path::PathBuf;

use burn::config::Config;

use super::ShapeConfig;

/// Configuration for a [`ShapeDataset`](crate::dataset::ShapeDataset).
#[derive(Config, Debug)]
pub struct DatasetConfig {
    /// Root directory holding one record directory per shape.
    pub location: String,

    /// Text file listing shape ids, one per line.
    pub filelist: String,

    /// Load every raw record at construction and keep it in memory.
    #[config(default = false)]
    pub in_memory: bool,

    /// Base seed for per-sample random draws.
    #[config(default = 0)]
    pub seed: u64,

    /// Per-shape configuration.
    #[config(default = "ShapeConfig::new()")]
    pub shape: ShapeConfig,
}

impl DatasetConfig {
    /// Root directory as a path.
    pub fn location_path(&self) -> PathBuf {
        PathBuf::from(&self.location)
    }

    /// File list as a path.
    pub fn filelist_path(&self) -> PathBuf {
        PathBuf::from(&self.filelist)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.location.is_empty() {
            return Err("location must not be empty".to_string());
        }
        if self.filelist.is_empty() {
            return Err("filelist must not be empty".to_string());
        }
        self.shape.validate()
    }
}
