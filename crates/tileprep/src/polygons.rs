//! Transformation of lon/lat polygon coordinates into raster pixel space,
//! checkpointed so an interrupted run over a large geometry collection
//! resumes near where it left off.
//!
//! The batch is a forward-only resumable job: not started, in progress at
//! index k, completed. After every 1/20th of the collection the whole
//! in-progress collection plus the next index is persisted; a crash loses at
//! most that much progress. On completion the result is persisted to a
//! permanent cache keyed by shapefile name and raster CRS, and the
//! checkpoint is discarded.

use std::path::{Path, PathBuf};

use geo::srs::CoordinateTransformer;
use geo::{crs, GeoReference, GeoTransform, Geometry};
use geo_types::{Coord, LineString, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};

use crate::{CachePaths, Error, Result};

const CHECKPOINT_FRACTION: usize = 20;

#[derive(Serialize, Deserialize)]
struct TransformCheckpoint {
    geometries: Vec<Geometry<f64>>,
    index: usize,
}

/// Maps one (longitude, latitude) coordinate into fractional pixel
/// coordinates of the target raster.
pub fn lon_lat_to_pixel(lon: f64, lat: f64, transformer: &CoordinateTransformer, inverse: &GeoTransform) -> Result<(f64, f64)> {
    let world = transformer.transform_point(geo::Point::new(lon, lat))?;
    let pixel = inverse.apply(world.x(), world.y());
    Ok((pixel.x(), pixel.y()))
}

fn cache_key(shapefile_path: &Path, georef: &GeoReference) -> Result<String> {
    let name = geo::fs::file_stem(shapefile_path)?;
    let crs_id = geo::fs::sanitize_filename(georef.projection(), '_');
    Ok(format!("{name}_{crs_id}"))
}

fn polygon_cache_path(shapefile_path: &Path, georef: &GeoReference, paths: &CachePaths) -> Result<PathBuf> {
    Ok(paths
        .water_polygons_dir
        .join(format!("{}_water_polygons.json", cache_key(shapefile_path, georef)?)))
}

fn checkpoint_path(shapefile_path: &Path, georef: &GeoReference, paths: &CachePaths) -> Result<PathBuf> {
    Ok(paths
        .checkpoints_dir
        .join(format!("{}_checkpoint.cache", cache_key(shapefile_path, georef)?)))
}

/// Transforms every coordinate of the collection from (lon, lat) into the
/// pixel space of the target raster, one geometry at a time.
///
/// A completed result in the polygon cache is returned immediately. An
/// existing checkpoint resumes the batch from its saved index; an unreadable
/// checkpoint restarts from the beginning and is never fatal.
pub fn transform_to_pixel_space(
    geometries: Vec<Geometry<f64>>,
    georef: &GeoReference,
    shapefile_path: &Path,
    paths: &CachePaths,
) -> Result<Vec<Geometry<f64>>> {
    let cache_path = polygon_cache_path(shapefile_path, georef, paths)?;
    if let Some(cached) = read_geometry_file(&cache_path) {
        log::info!("Loaded transformed polygons from '{}'", cache_path.display());
        return Ok(cached);
    }

    let transformer = CoordinateTransformer::new(&crs::epsg::WGS84.to_string(), georef.projection())?;
    let inverse = georef.geo_transform().invert()?;

    let ckpt_path = checkpoint_path(shapefile_path, georef, paths)?;
    let (mut geometries, start_index) = resume_or_start(geometries, &ckpt_path);
    let total = geometries.len();
    let checkpoint_interval = (total / CHECKPOINT_FRACTION).max(1);

    log::info!(
        "Transforming {} geometries into pixel space of {} (starting at {start_index})",
        total,
        georef.projection()
    );

    for index in start_index..total {
        if index % checkpoint_interval == 0 && index > start_index {
            write_checkpoint(&ckpt_path, &geometries, index)?;
            log::debug!("Wrote checkpoint at geometry {index}/{total}");
        }

        geometries[index] = transform_geometry(&geometries[index], &transformer, &inverse)?;
    }

    write_geometry_file(&cache_path, &geometries)?;
    if let Err(e) = std::fs::remove_file(&ckpt_path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            return Err(e.into());
        }
    }

    Ok(geometries)
}

/// Loads checkpointed progress when available. Corrupt or missing
/// checkpoints degrade to a fresh start over the input collection.
fn resume_or_start(geometries: Vec<Geometry<f64>>, ckpt_path: &Path) -> (Vec<Geometry<f64>>, usize) {
    match std::fs::read_to_string(ckpt_path) {
        Ok(content) => match serde_json::from_str::<TransformCheckpoint>(&content) {
            Ok(checkpoint) if checkpoint.geometries.len() == geometries.len() && checkpoint.index <= geometries.len() => {
                log::info!("Resuming coordinate transform at index {}", checkpoint.index);
                (checkpoint.geometries, checkpoint.index)
            }
            _ => {
                log::warn!("Ignoring unusable checkpoint '{}'", ckpt_path.display());
                (geometries, 0)
            }
        },
        Err(_) => (geometries, 0),
    }
}

fn write_checkpoint(ckpt_path: &Path, geometries: &[Geometry<f64>], index: usize) -> Result {
    geo::fs::create_directory_for_file(ckpt_path)?;
    let checkpoint = TransformCheckpoint {
        geometries: geometries.to_vec(),
        index,
    };
    let content = serde_json::to_string(&checkpoint).map_err(|e| Error::Runtime(format!("Failed to encode checkpoint ({e})")))?;
    std::fs::write(ckpt_path, content)?;
    Ok(())
}

fn read_geometry_file(path: &Path) -> Option<Vec<Geometry<f64>>> {
    let content = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&content).ok()
}

fn write_geometry_file(path: &Path, geometries: &[Geometry<f64>]) -> Result {
    geo::fs::create_directory_for_file(path)?;
    let content = serde_json::to_string(geometries).map_err(|e| Error::Runtime(format!("Failed to encode polygons ({e})")))?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Polygons transform ring by ring; multi-polygons recurse one level deeper
/// through their parts. Other geometry types pass through untouched.
fn transform_geometry(geometry: &Geometry<f64>, transformer: &CoordinateTransformer, inverse: &GeoTransform) -> Result<Geometry<f64>> {
    match geometry {
        Geometry::Polygon(polygon) => Ok(Geometry::Polygon(transform_polygon(polygon, transformer, inverse)?)),
        Geometry::MultiPolygon(multi) => {
            let parts = multi
                .0
                .iter()
                .map(|polygon| transform_polygon(polygon, transformer, inverse))
                .collect::<Result<Vec<_>>>()?;
            Ok(Geometry::MultiPolygon(MultiPolygon(parts)))
        }
        other => {
            log::debug!("Leaving non-polygon geometry untransformed");
            Ok(other.clone())
        }
    }
}

fn transform_polygon(polygon: &Polygon<f64>, transformer: &CoordinateTransformer, inverse: &GeoTransform) -> Result<Polygon<f64>> {
    let exterior = transform_ring(polygon.exterior(), transformer, inverse)?;
    let interiors = polygon
        .interiors()
        .iter()
        .map(|ring| transform_ring(ring, transformer, inverse))
        .collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn transform_ring(ring: &LineString<f64>, transformer: &CoordinateTransformer, inverse: &GeoTransform) -> Result<LineString<f64>> {
    let coords = ring
        .coords()
        .map(|coord| {
            let (x, y) = lon_lat_to_pixel(coord.x, coord.y, transformer, inverse)?;
            Ok(Coord { x, y })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(LineString::new(coords))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{CellSize, Point, RasterSize};
    use geo_types::polygon;

    fn georef_6x6() -> GeoReference {
        GeoReference::with_top_left_origin(
            "EPSG:4326",
            RasterSize::with_rows_cols(6, 6),
            Point::new(0.0, 6.0),
            CellSize::square(1.0),
            None,
        )
    }

    fn sample_geometries(count: usize) -> Vec<Geometry<f64>> {
        (0..count)
            .map(|i| {
                let offset = i as f64 * 0.1;
                if i % 3 == 0 {
                    Geometry::MultiPolygon(MultiPolygon(vec![
                        polygon![
                            (x: offset, y: 1.0),
                            (x: offset + 0.5, y: 1.0),
                            (x: offset + 0.5, y: 1.5),
                            (x: offset, y: 1.0),
                        ],
                        polygon![
                            (x: offset, y: 3.0),
                            (x: offset + 0.5, y: 3.0),
                            (x: offset + 0.5, y: 3.5),
                            (x: offset, y: 3.0),
                        ],
                    ]))
                } else {
                    Geometry::Polygon(polygon![
                        (x: offset, y: 2.0),
                        (x: offset + 0.5, y: 2.0),
                        (x: offset + 0.5, y: 2.5),
                        (x: offset, y: 2.0),
                    ])
                }
            })
            .collect()
    }

    #[test]
    fn pixel_mapping_on_identity_crs() -> Result {
        let georef = georef_6x6();
        let transformer = CoordinateTransformer::new("EPSG:4326", georef.projection())?;
        let inverse = georef.geo_transform().invert()?;

        let (x, y) = lon_lat_to_pixel(2.0, 4.0, &transformer, &inverse)?;
        approx::assert_relative_eq!(x, 2.0, epsilon = 1e-9);
        approx::assert_relative_eq!(y, 2.0, epsilon = 1e-9);
        Ok(())
    }

    #[test]
    fn completed_transform_writes_cache_and_drops_checkpoint() -> Result {
        let tmp = tempfile::tempdir()?;
        let paths = CachePaths::rooted_at(tmp.path());
        paths.ensure_directories()?;

        let georef = georef_6x6();
        let shp = Path::new("/input/water.shp");

        let result = transform_to_pixel_space(sample_geometries(8), &georef, shp, &paths)?;
        assert_eq!(result.len(), 8);

        let cache = paths.water_polygons_dir.join("water_EPSG_4326_water_polygons.json");
        assert!(cache.exists());
        assert!(!paths.checkpoints_dir.join("water_EPSG_4326_checkpoint.cache").exists());

        // The second run is a pure cache read.
        let again = transform_to_pixel_space(sample_geometries(8), &georef, shp, &paths)?;
        assert_eq!(result, again);
        Ok(())
    }

    #[test]
    fn resume_from_checkpoint_matches_single_pass() -> Result {
        let tmp = tempfile::tempdir()?;
        let georef = georef_6x6();
        let shp = Path::new("/input/water.shp");
        let input = sample_geometries(10);

        // Uninterrupted reference run.
        let reference_paths = CachePaths::rooted_at(tmp.path().join("reference"));
        reference_paths.ensure_directories()?;
        let expected = transform_to_pixel_space(input.clone(), &georef, shp, &reference_paths)?;

        // Simulate an interruption after 4 geometries: the checkpoint holds
        // the partially transformed collection and the resume index.
        let resumed_paths = CachePaths::rooted_at(tmp.path().join("resumed"));
        resumed_paths.ensure_directories()?;

        let transformer = CoordinateTransformer::new("EPSG:4326", georef.projection())?;
        let inverse = georef.geo_transform().invert()?;
        let mut partial = input.clone();
        for geometry in partial.iter_mut().take(4) {
            *geometry = transform_geometry(geometry, &transformer, &inverse)?;
        }
        write_checkpoint(
            &checkpoint_path(shp, &georef, &resumed_paths)?,
            &partial,
            4,
        )?;

        let resumed = transform_to_pixel_space(input, &georef, shp, &resumed_paths)?;
        assert_eq!(expected, resumed);
        Ok(())
    }

    #[test]
    fn corrupt_checkpoint_restarts_from_scratch() -> Result {
        let tmp = tempfile::tempdir()?;
        let paths = CachePaths::rooted_at(tmp.path());
        paths.ensure_directories()?;

        let georef = georef_6x6();
        let shp = Path::new("/input/water.shp");

        let ckpt = checkpoint_path(shp, &georef, &paths)?;
        std::fs::write(&ckpt, b"definitely not json")?;

        let reference_paths = CachePaths::rooted_at(tmp.path().join("reference"));
        reference_paths.ensure_directories()?;
        let expected = transform_to_pixel_space(sample_geometries(5), &georef, shp, &reference_paths)?;

        let result = transform_to_pixel_space(sample_geometries(5), &georef, shp, &paths)?;
        assert_eq!(expected, result);
        Ok(())
    }

    #[test]
    fn multi_polygon_parts_all_transform() -> Result {
        let georef = georef_6x6();
        let transformer = CoordinateTransformer::new("EPSG:4326", georef.projection())?;
        let inverse = georef.geo_transform().invert()?;

        let multi = &sample_geometries(1)[0];
        let transformed = transform_geometry(multi, &transformer, &inverse)?;

        match transformed {
            Geometry::MultiPolygon(multi) => {
                assert_eq!(multi.0.len(), 2);
                // y = 1.0 maps to pixel row 5.0 in the 6x6 grid.
                let first = multi.0[0].exterior().coords().next().expect("ring has coordinates");
                approx::assert_relative_eq!(first.y, 5.0, epsilon = 1e-9);
            }
            other => panic!("Expected a multi polygon, got {other:?}"),
        }
        Ok(())
    }
}
