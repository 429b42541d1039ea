//! Reprojection of source rasters into the canonical geographic CRS.

use std::path::{Path, PathBuf};

use geo::raster::{algo, DenseRaster, RasterNum};
use geo::{crs, geotiff, GeoReference};

use crate::{CachePaths, Result};

/// Path of the reprojected copy of a raster.
pub fn wgs84_path(raster_path: &Path, paths: &CachePaths) -> Result<PathBuf> {
    let name = geo::fs::file_stem(raster_path)?;
    Ok(paths.wgs84_dir.join(format!("{name}_wgs84.tif")))
}

/// Reprojects every band of the raster into EPSG:4326 with nearest-neighbor
/// sampling and writes the result to the wgs84 cache location, named after
/// the source file. Returns the reprojected georeference and band data.
///
/// Unlike the other cache tiers there is no hit check: the reprojected file
/// is rewritten on every invocation. Callers that can satisfy a request
/// from a higher cache tier never reach this function.
pub fn reproject_to_wgs84<T: RasterNum>(raster_path: &Path, paths: &CachePaths) -> Result<(GeoReference, Vec<Vec<T>>)> {
    let (src_georef, src_bands) = geotiff::read_bands::<T>(raster_path)?;

    let target_georef = algo::warp_georeference(&src_georef, crs::epsg::WGS84)?;
    log::debug!(
        "Reprojecting '{}' from {} to EPSG:4326 ({} -> {})",
        raster_path.display(),
        src_georef.projection(),
        src_georef.size(),
        target_georef.size()
    );

    let mut warped_bands = Vec::with_capacity(src_bands.len());
    for band in src_bands {
        let src_raster = DenseRaster::new(src_georef.clone(), band)?;
        let warped = algo::warp(&src_raster, &target_georef)?;
        warped_bands.push(warped.into_raw_parts().1);
    }

    let out_path = wgs84_path(raster_path, paths)?;
    let band_slices: Vec<&[T]> = warped_bands.iter().map(Vec::as_slice).collect();
    geotiff::write_bands(&out_path, &target_georef, &band_slices)?;
    log::info!("Wrote reprojected raster to '{}'", out_path.display());

    Ok((target_georef, warped_bands))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{CellSize, Point, RasterSize};

    #[test]
    fn reprojection_writes_the_cache_raster() -> Result {
        let tmp = tempfile::tempdir()?;
        let paths = CachePaths::rooted_at(tmp.path());
        paths.ensure_directories()?;

        let georef = GeoReference::with_top_left_origin(
            "EPSG:4326",
            RasterSize::with_rows_cols(6, 6),
            Point::new(0.0, 6.0),
            CellSize::square(1.0),
            None,
        );
        let band: Vec<u8> = (0..36).collect();
        let input = tmp.path().join("scene.tif");
        geotiff::write_bands(&input, &georef, &[&band])?;

        let (target, bands) = reproject_to_wgs84::<u8>(&input, &paths)?;

        assert_eq!(target.projection(), "EPSG:4326");
        assert_eq!(target.size(), georef.size());
        assert_eq!(bands.len(), 1);
        assert_eq!(bands[0], band);
        assert!(paths.wgs84_dir.join("scene_wgs84.tif").exists());
        Ok(())
    }

    #[test]
    fn missing_source_raster_fails() {
        let paths = CachePaths::rooted_at("/tmp/unused");
        assert!(reproject_to_wgs84::<u8>(Path::new("/nonexistent/scene.tif"), &paths).is_err());
    }
}
