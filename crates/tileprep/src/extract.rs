//! The extraction orchestrator: composes reprojection, rasterization,
//! tiling, filtering and caching into the end-to-end pipeline over a
//! dataset descriptor.

use std::path::{Path, PathBuf};

use geo::raster::RasterNum;

use crate::config::{CachePaths, DatasetDescriptor, DatasetEntry};
use crate::tiles::{create_tiles, remove_empty_tiles, BandStack, Tile};
use crate::{bitmap, cachefile, reproject, Error, Result};

/// Tiled feature and label sequences of a train/test split, parallel and
/// position-paired per raster.
pub struct SplitTiles<T: RasterNum> {
    pub features_train: Vec<Tile<T>>,
    pub labels_train: Vec<Tile<u8>>,
    pub features_test: Vec<Tile<T>>,
    pub labels_test: Vec<Tile<u8>>,
}

/// Runs the tiled feature/label extraction over dataset entries. The cache
/// directory tree is the only state shared between entries; its keys are
/// scoped to the raster identity, so entries never interfere.
pub struct TileExtractor {
    paths: CachePaths,
    tile_size: usize,
}

impl TileExtractor {
    pub fn new(paths: CachePaths, tile_size: usize) -> Result<Self> {
        if tile_size == 0 {
            return Err(Error::InvalidArgument("Tile size must be positive".into()));
        }

        paths.ensure_directories()?;
        Ok(TileExtractor { paths, tile_size })
    }

    pub fn tile_size(&self) -> usize {
        self.tile_size
    }

    pub fn paths(&self) -> &CachePaths {
        &self.paths
    }

    /// Extracts both splits of a dataset descriptor. Train and test are
    /// processed independently and never mixed.
    pub fn preprocess_data<T: RasterNum>(&self, dataset: &DatasetDescriptor) -> Result<SplitTiles<T>> {
        let (features_train, labels_train) = self.extract_split(&dataset.train)?;
        let (features_test, labels_test) = self.extract_split(&dataset.test)?;

        Ok(SplitTiles {
            features_train,
            labels_train,
            features_test,
            labels_test,
        })
    }

    /// Accumulates the tile pairs of every entry of one split into flat
    /// feature and label sequences. The first failing entry aborts the run.
    pub fn extract_split<T: RasterNum>(&self, entries: &[DatasetEntry]) -> Result<(Vec<Tile<T>>, Vec<Tile<u8>>)> {
        let mut features = Vec::new();
        let mut labels = Vec::new();

        for entry in entries {
            let (mut entry_features, mut entry_labels) = self.tiled_features_and_labels(&entry.raster, &entry.polygons)?;
            features.append(&mut entry_features);
            labels.append(&mut entry_labels);
        }

        Ok((features, labels))
    }

    /// The per-raster pipeline: tile-cache probe, then reprojection,
    /// rasterization, tiling, empty-tile filtering and the final cache
    /// write.
    pub fn tiled_features_and_labels<T: RasterNum>(
        &self,
        raster_path: &Path,
        polygon_paths: &[PathBuf],
    ) -> Result<(Vec<Tile<T>>, Vec<Tile<u8>>)> {
        let cache_path = self.tile_cache_path(raster_path)?;

        if let Some((features, labels)) = cachefile::read_tile_cache::<T>(&cache_path, self.tile_size)? {
            log::info!("Loaded {} tile pairs from '{}'", features.len(), cache_path.display());
            return Ok((features, labels));
        }
        log::info!("No tile cache for '{}', computing tiles", raster_path.display());

        let (georef, bands) = reproject::reproject_to_wgs84::<T>(raster_path, &self.paths)?;
        let feature_stack = BandStack::from_bands(georef.rows(), georef.columns(), &bands)?;

        let water_bitmap = bitmap::create_bitmap(&georef, polygon_paths, raster_path, &self.paths)?;

        let feature_tiles = create_tiles(&feature_stack, self.tile_size, raster_path);
        let label_tiles = create_tiles(&water_bitmap, self.tile_size, raster_path);
        let (features, labels) = remove_empty_tiles(feature_tiles, label_tiles);

        cachefile::write_tile_cache(&cache_path, &features, &labels)?;
        log::info!("Stored {} tile pairs at '{}'", features.len(), cache_path.display());

        Ok((features, labels))
    }

    fn tile_cache_path(&self, raster_path: &Path) -> Result<PathBuf> {
        let name = geo::fs::file_stem(raster_path)?;
        Ok(self.paths.tiles_dir.join(format!("{name}_{}.cache", self.tile_size)))
    }
}
