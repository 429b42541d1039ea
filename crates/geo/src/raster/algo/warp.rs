//! Raster reprojection with nearest-neighbor sampling.
//!
//! The target grid is derived from the source grid by sampling points along
//! the edges of the source bounding box and matching the pixel count of the
//! source diagonal, so the reprojected raster represents the source content
//! without resolution loss.

use crate::raster::{DenseRaster, RasterNum};
use crate::srs::CoordinateTransformer;
use crate::{crs::Epsg, Cell, CellSize, GeoReference, Point, RasterSize, Rect, Result};

const EDGE_SAMPLE_COUNT: usize = 21;

/// Transform a bounding box by sampling points along its edges and taking the
/// bounding box of all transformed points. More accurate than transforming
/// the four corners when the transformation bends the edges.
fn warp_bounding_box(bbox: &Rect, coord_trans: &CoordinateTransformer) -> Result<Rect> {
    let mut points = Vec::with_capacity(EDGE_SAMPLE_COUNT * 4);

    let mut add_edge = |start: Point, end: Point| {
        for i in 0..EDGE_SAMPLE_COUNT {
            let t = i as f64 / (EDGE_SAMPLE_COUNT - 1) as f64;
            points.push(Point::new(
                start.x() + t * (end.x() - start.x()),
                start.y() + t * (end.y() - start.y()),
            ));
        }
    };

    add_edge(bbox.top_left(), bbox.top_right());
    add_edge(bbox.top_right(), bbox.bottom_right());
    add_edge(bbox.bottom_right(), bbox.bottom_left());
    add_edge(bbox.bottom_left(), bbox.top_left());

    coord_trans.transform_points_in_place(&mut points)?;

    let (min_x, max_x, min_y, max_y) = points.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY),
        |(min_x, max_x, min_y, max_y), p| (min_x.min(p.x()), max_x.max(p.x()), min_y.min(p.y()), max_y.max(p.y())),
    );

    Ok(Rect::from_nw_se(Point::new(min_x, max_y), Point::new(max_x, min_y)))
}

fn euclidean_distance(a: Point, b: Point) -> f64 {
    ((a.x() - b.x()).powi(2) + (a.y() - b.y()).powi(2)).sqrt()
}

/// Target resolution that keeps the pixel count along the source diagonal,
/// so no source detail is collapsed.
fn optimal_resolution(georef: &GeoReference, coord_trans: &CoordinateTransformer) -> Result<f64> {
    let src_bbox = georef.bounding_box();
    let src_diagonal = euclidean_distance(src_bbox.top_left(), src_bbox.bottom_right());
    let src_diagonal_pixels = src_diagonal / georef.cell_size().x().abs();

    let dst_tl = coord_trans.transform_point(src_bbox.top_left())?;
    let dst_br = coord_trans.transform_point(src_bbox.bottom_right())?;
    let dst_diagonal = euclidean_distance(dst_tl, dst_br);

    Ok(dst_diagonal / src_diagonal_pixels)
}

/// Computes the georeference a raster will have after reprojection to the
/// given EPSG: extent from edge-sampled bounding box warping, square cells at
/// the diagonal-preserving resolution.
pub fn warp_georeference(georef: &GeoReference, target_epsg: Epsg) -> Result<GeoReference> {
    let coord_trans = CoordinateTransformer::new(georef.projection(), &target_epsg.to_string())?;

    let bbox = warp_bounding_box(&georef.bounding_box(), &coord_trans)?;
    let resolution = optimal_resolution(georef, &coord_trans)?;

    let rows = (bbox.height() / resolution).round() as usize;
    let cols = (bbox.width() / resolution).round() as usize;

    Ok(GeoReference::with_top_left_origin(
        target_epsg.to_string(),
        RasterSize::with_rows_cols(rows, cols),
        bbox.top_left(),
        CellSize::square(resolution),
        georef.nodata(),
    ))
}

/// Reprojects a band into the target grid with nearest-neighbor sampling.
/// Sample values are copied verbatim so class-valued rasters stay
/// interpretable; cells without a source counterpart stay zero.
pub fn warp<T: RasterNum>(src: &DenseRaster<T>, target_georef: &GeoReference) -> Result<DenseRaster<T>> {
    let mut dst = DenseRaster::<T>::zeros(target_georef.clone());

    // Maps target cell centers back into the source grid.
    let coord_trans = CoordinateTransformer::new(target_georef.projection(), src.metadata().projection())?;

    let cols = target_georef.columns();
    let src_inverse = src.metadata().geo_transform().invert()?;

    let mut points = Vec::with_capacity(cols);
    for (row, row_slice) in dst.as_mut_slice().chunks_mut(cols).enumerate() {
        points.clear();
        points.extend((0..cols).map(|col| target_georef.cell_center(Cell::from_row_col(row as i64, col as i64))));
        coord_trans.transform_points_in_place(&mut points)?;

        for (col, point) in points.iter().enumerate() {
            let pixel = src_inverse.apply(point.x(), point.y());
            let src_cell = Cell::from_row_col(pixel.y().floor() as i64, pixel.x().floor() as i64);
            if let Some(value) = src.cell_value(src_cell) {
                row_slice[col] = value;
            }
        }
    }

    Ok(dst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs;
    use approx::assert_relative_eq;

    fn source_raster() -> DenseRaster<u8> {
        let meta = GeoReference::with_top_left_origin(
            "EPSG:4326",
            RasterSize::with_rows_cols(6, 6),
            Point::new(0.0, 6.0),
            CellSize::square(1.0),
            None,
        );

        let mut raster = DenseRaster::zeros(meta);
        for row in 2..4 {
            for col in 2..4 {
                raster.set_value_at(row, col, 120);
            }
        }
        raster
    }

    #[test]
    fn georeference_between_identical_crs_keeps_grid() -> Result {
        let src = source_raster();
        let georef = warp_georeference(src.metadata(), crs::epsg::WGS84)?;

        assert_eq!(georef.size(), src.size());
        assert_relative_eq!(georef.cell_size().x(), 1.0, epsilon = 1e-9);
        assert_relative_eq!(georef.top_left().x(), 0.0, epsilon = 1e-9);
        assert_relative_eq!(georef.top_left().y(), 6.0, epsilon = 1e-9);
        Ok(())
    }

    #[test]
    fn nearest_neighbor_preserves_class_values() -> Result {
        let src = source_raster();
        let target = warp_georeference(src.metadata(), crs::epsg::WGS84)?;
        let warped = warp(&src, &target)?;

        // Only the original class values appear in the output.
        assert!(warped.as_slice().iter().all(|&v| v == 0 || v == 120));
        assert_eq!(
            warped.as_slice().iter().filter(|&&v| v == 120).count(),
            src.as_slice().iter().filter(|&&v| v == 120).count()
        );
        Ok(())
    }

    #[test]
    fn warp_to_projected_crs_changes_projection() -> Result {
        let src = source_raster();
        let target = warp_georeference(src.metadata(), crs::epsg::WGS84_WEB_MERCATOR)?;

        assert_eq!(target.projection(), "EPSG:3857");
        assert!(!target.size().is_empty());

        let warped = warp(&src, &target)?;
        assert!(warped.as_slice().iter().any(|&v| v == 120));
        Ok(())
    }
}
