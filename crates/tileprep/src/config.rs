//! Pipeline configuration: the cache directory layout and the dataset
//! descriptor consumed by the extraction orchestrator.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;

/// Directory layout of every cache tier, passed explicitly into the
/// orchestrator. Each field names one cache role.
#[derive(Debug, Clone)]
pub struct CachePaths {
    /// Serialized tiled feature/label sets.
    pub tiles_dir: PathBuf,
    /// Rasterized water bitmaps (single band uint8 GeoTIFFs, burn value 255).
    pub water_bitmaps_dir: PathBuf,
    /// Rasters reprojected into geographic coordinates.
    pub wgs84_dir: PathBuf,
    /// Geometry collections transformed into raster pixel space.
    pub water_polygons_dir: PathBuf,
    /// In-progress checkpoints of the coordinate transform.
    pub checkpoints_dir: PathBuf,
}

impl CachePaths {
    /// The default layout: every cache tier in its own directory below a
    /// single base directory.
    pub fn rooted_at(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        CachePaths {
            tiles_dir: base.join("tiles"),
            water_bitmaps_dir: base.join("water_bitmaps"),
            wgs84_dir: base.join("wgs84"),
            water_polygons_dir: base.join("water_polygons"),
            checkpoints_dir: base.join("water_polygons").join("checkpoints"),
        }
    }

    pub fn ensure_directories(&self) -> Result {
        for dir in [
            &self.tiles_dir,
            &self.water_bitmaps_dir,
            &self.wgs84_dir,
            &self.water_polygons_dir,
            &self.checkpoints_dir,
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

/// One raster together with the vector files holding its ground truth.
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetEntry {
    pub raster: PathBuf,
    pub polygons: Vec<PathBuf>,
}

/// The train/test split description, the sole external configuration
/// surface of the orchestrator.
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetDescriptor {
    pub train: Vec<DatasetEntry>,
    pub test: Vec<DatasetEntry>,
}

impl DatasetDescriptor {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Runtime(format!("Failed to read dataset descriptor '{}' ({e})", path.display())))?;
        serde_json::from_str(&content)
            .map_err(|e| crate::Error::Runtime(format!("Invalid dataset descriptor '{}' ({e})", path.display())))
    }
}
