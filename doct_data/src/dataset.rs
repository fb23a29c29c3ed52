//! A burn dataset over a directory of shape records.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use burn::data::dataset::Dataset;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::DatasetConfig;
use crate::error::{DataError, Result};
use crate::loader::ShapeLoader;
use crate::raw::RawShape;
use crate::sample::TrainingSample;
use crate::transform::ShapeTransform;

/// Shapes listed in a file list, loaded and transformed on access.
pub struct ShapeDataset {
    location: PathBuf,
    ids: Vec<String>,
    loader: ShapeLoader,
    transform: ShapeTransform,
    cache: Option<Vec<Arc<RawShape>>>,
    seed: u64,
    draws: AtomicU64,
}

impl ShapeDataset {
    /// Read the file list and set up loading.
    ///
    /// With `in_memory`, every raw record is loaded here and the first
    /// failure aborts construction.
    pub fn new(config: DatasetConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|message| DataError::InvalidConfig { message })?;

        let location = config.location_path();
        let ids = read_filelist(config.filelist_path())?;
        let loader = ShapeLoader::new(&config.shape);
        let transform = ShapeTransform::new(config.shape)?;

        let cache = if config.in_memory {
            let records = ids
                .iter()
                .map(|id| loader.load(location.join(id)).map(Arc::new))
                .collect::<Result<Vec<_>>>()?;
            log::info!(
                "cached {} raw shapes from {}",
                records.len(),
                location.display()
            );
            Some(records)
        } else {
            None
        };

        log::info!(
            "shape dataset: {} shapes under {}",
            ids.len(),
            location.display()
        );

        Ok(Self {
            location,
            ids,
            loader,
            transform,
            cache,
            seed: config.seed,
            draws: AtomicU64::new(0),
        })
    }

    /// Shape ids in file-list order.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Transform applied to every record.
    pub fn transform(&self) -> &ShapeTransform {
        &self.transform
    }

    /// True if raw records are held in memory.
    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    /// Record directory of shape `index`.
    pub fn shape_path(&self, index: usize) -> Option<PathBuf> {
        self.ids.get(index).map(|id| self.location.join(id))
    }

    /// Raw record of shape `index`, from the cache or from disk.
    pub fn raw(&self, index: usize) -> Result<Arc<RawShape>> {
        if let Some(cache) = &self.cache {
            return cache
                .get(index)
                .cloned()
                .ok_or(DataError::IndexOutOfRange {
                    index,
                    len: self.ids.len(),
                });
        }
        let path = self.shape_path(index).ok_or(DataError::IndexOutOfRange {
            index,
            len: self.ids.len(),
        })?;
        Ok(Arc::new(self.loader.load(path)?))
    }

    /// Load and transform shape `index` with an explicit RNG.
    pub fn sample<R: Rng + ?Sized>(&self, index: usize, rng: &mut R) -> Result<TrainingSample> {
        let raw = self.raw(index)?;
        self.transform.apply(&raw, index, rng)
    }

    /// RNG for one `get` call.
    fn call_rng(&self, index: usize) -> StdRng {
        let draw = self.draws.fetch_add(1, Ordering::Relaxed);
        StdRng::seed_from_u64(mix_seed(self.seed, index as u64, draw))
    }
}

impl Dataset<TrainingSample> for ShapeDataset {
    fn get(&self, index: usize) -> Option<TrainingSample> {
        if index >= self.ids.len() {
            return None;
        }
        let mut rng = self.call_rng(index);
        match self.sample(index, &mut rng) {
            Ok(sample) => Some(sample),
            Err(e) => {
                log::error!("failed to load shape {} ({}): {}", index, self.ids[index], e);
                None
            }
        }
    }

    fn len(&self) -> usize {
        self.ids.len()
    }
}

/// Build the training dataset for a shape collection.
pub fn build_shapenet_dataset(config: DatasetConfig) -> Result<ShapeDataset> {
    ShapeDataset::new(config)
}

/// Read shape ids from a file list.
///
/// One id per line, taken as the first whitespace-separated token; blank
/// lines and lines starting with `#` are skipped.
pub fn read_filelist<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| DataError::FileList {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_whitespace().next())
        .map(String::from)
        .collect())
}

/// SplitMix64 finalizer over the seed, index and draw counter.
fn mix_seed(seed: u64, index: u64, draw: u64) -> u64 {
    let mut z = seed
        ^ index.wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ draw.wrapping_mul(0xD1B5_4A32_D192_ED03);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
