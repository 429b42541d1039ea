//! Creation of the binary water bitmap for a raster from vector polygons.

use std::path::{Path, PathBuf};

use geo::raster::algo;
use geo::{geotiff, vector, GeoReference, Geometry};

use crate::tiles::BandStack;
use crate::{CachePaths, Error, Result};

/// The value burned into bitmap cells covered by a water polygon. Cached
/// bitmap files keep this raw value; in-memory bitmaps are normalized to 1.
pub const WATER_BURN_VALUE: u8 = 255;

/// Path of the cached water bitmap of a raster.
pub fn bitmap_path(raster_path: &Path, paths: &CachePaths) -> Result<PathBuf> {
    let name = geo::fs::file_stem(raster_path)?;
    Ok(paths.water_bitmaps_dir.join(format!("{name}_water.tif")))
}

/// Produces the water bitmap aligned to `georef`: a single-channel band
/// stack with value 1 on water and 0 elsewhere.
///
/// A previously rasterized bitmap file is loaded and normalized without any
/// recomputation. On a cache miss the polygon geometries of all shapefiles
/// are combined and burned into a grid with the exact shape and transform
/// of the raster; the raw burned grid is persisted to the cache before
/// normalization so the cache keeps the canonical single band uint8 format.
pub fn create_bitmap(georef: &GeoReference, shapefile_paths: &[PathBuf], raster_path: &Path, paths: &CachePaths) -> Result<BandStack<u8>> {
    let cache_file = bitmap_path(raster_path, paths)?;

    if cache_file.exists() {
        log::info!("Loading water bitmap from '{}'", cache_file.display());
        return load_cached_bitmap(&cache_file, georef);
    }
    log::info!("No cached water bitmap for '{}', rasterizing", raster_path.display());

    let mut geometries: Vec<Geometry<f64>> = Vec::new();
    for shapefile_path in shapefile_paths {
        log::debug!("Loading shapefile '{}'", shapefile_path.display());
        geometries.extend(vector::io::read_polygons(shapefile_path)?);
    }

    // A raster without any matching polygons burns to an all-zero bitmap,
    // which is valid.
    let burned = algo::rasterize(&geometries, georef, WATER_BURN_VALUE)?;

    geotiff::write_bands(&cache_file, georef, &[burned.as_slice()])?;
    log::info!("Wrote water bitmap to '{}'", cache_file.display());

    let (_, mut data) = burned.into_raw_parts();
    normalize(&mut data);
    BandStack::from_bands(georef.rows(), georef.columns(), &[data])
}

fn load_cached_bitmap(cache_file: &Path, georef: &GeoReference) -> Result<BandStack<u8>> {
    let (cached_georef, mut bands) = geotiff::read_bands::<u8>(cache_file)?;

    if cached_georef.size() != georef.size() || bands.len() != 1 {
        return Err(Error::Runtime(format!(
            "Cached water bitmap '{}' does not match the raster grid",
            cache_file.display()
        )));
    }

    let mut data = bands.remove(0);
    normalize(&mut data);
    BandStack::from_bands(georef.rows(), georef.columns(), &[data])
}

fn normalize(data: &mut [u8]) {
    for value in data.iter_mut() {
        if *value == WATER_BURN_VALUE {
            *value = 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{CellSize, Point, RasterSize};
    use shapefile::{Polygon, PolygonRing, ShapeWriter};

    fn georef_6x6() -> GeoReference {
        GeoReference::with_top_left_origin(
            "EPSG:4326",
            RasterSize::with_rows_cols(6, 6),
            Point::new(0.0, 6.0),
            CellSize::square(1.0),
            None,
        )
    }

    fn write_square_shapefile(path: &Path) -> Result {
        let mut writer =
            ShapeWriter::from_path(path).map_err(|e| Error::Runtime(format!("Failed to create shapefile ({e})")))?;
        let square = Polygon::with_rings(vec![PolygonRing::Outer(vec![
            shapefile::Point::new(2.0, 2.0),
            shapefile::Point::new(2.0, 4.0),
            shapefile::Point::new(4.0, 4.0),
            shapefile::Point::new(4.0, 2.0),
            shapefile::Point::new(2.0, 2.0),
        ])]);
        writer
            .write_shape(&square)
            .map_err(|e| Error::Runtime(format!("Failed to write shapefile geometry ({e})")))?;
        Ok(())
    }

    #[test]
    fn bitmap_values_are_binary_after_cache_round_trip() -> Result {
        let tmp = tempfile::tempdir()?;
        let paths = CachePaths::rooted_at(tmp.path());
        paths.ensure_directories()?;

        let shp = tmp.path().join("water.shp");
        write_square_shapefile(&shp)?;

        let raster_path = Path::new("/input/scene.tif");
        let georef = georef_6x6();

        let computed = create_bitmap(&georef, &[shp.clone()], raster_path, &paths)?;
        assert!(paths.water_bitmaps_dir.join("scene_water.tif").exists());

        // The cached file keeps the raw burn value.
        let (_, raw_bands) = geotiff::read_bands::<u8>(&paths.water_bitmaps_dir.join("scene_water.tif"))?;
        assert!(raw_bands[0].iter().all(|&v| v == 0 || v == WATER_BURN_VALUE));
        assert!(raw_bands[0].iter().any(|&v| v == WATER_BURN_VALUE));

        // The second call is served from the cache and normalizes to {0, 1}.
        let cached = create_bitmap(&georef, &[shp], raster_path, &paths)?;
        assert_eq!(computed, cached);
        assert!(cached.as_slice().iter().all(|&v| v == 0 || v == 1));
        assert_eq!(
            cached.as_slice().iter().filter(|&&v| v == 1).count(),
            raw_bands[0].iter().filter(|&&v| v == WATER_BURN_VALUE).count()
        );
        Ok(())
    }

    #[test]
    fn no_polygons_yield_all_zero_bitmap() -> Result {
        let tmp = tempfile::tempdir()?;
        let paths = CachePaths::rooted_at(tmp.path());
        paths.ensure_directories()?;

        let bitmap = create_bitmap(&georef_6x6(), &[], Path::new("/input/empty.tif"), &paths)?;
        assert!(bitmap.as_slice().iter().all(|&v| v == 0));
        assert_eq!(bitmap.shape(), (6, 6, 1));
        Ok(())
    }

    #[test]
    fn missing_shapefile_fails() -> Result {
        let tmp = tempfile::tempdir()?;
        let paths = CachePaths::rooted_at(tmp.path());
        paths.ensure_directories()?;

        let result = create_bitmap(
            &georef_6x6(),
            &[PathBuf::from("/nonexistent/water.shp")],
            Path::new("/input/scene.tif"),
            &paths,
        );
        assert!(result.is_err());
        Ok(())
    }
}
