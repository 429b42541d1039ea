//! Burns vector polygon geometries into a raster grid.
//!
//! Follows the usual geometry-to-raster burn semantics: a cell receives the
//! burn value when its center lies inside any of the geometries. Overlapping
//! polygons are idempotent under a single burn value, so geometry order does
//! not matter. Interior rings (holes) are honored through the even-odd rule.

use geo_types::{Geometry, LineString, MultiPolygon, Polygon};

use crate::raster::{DenseRaster, RasterNum};
use crate::{GeoReference, GeoTransform, Result};

/// Burns all geometries into a fresh raster with the exact shape and
/// transform of `georef`. Cells not covered by any geometry keep the
/// background value zero. An empty geometry collection yields an all-zero
/// raster, which is valid.
pub fn rasterize<T: RasterNum>(geometries: &[Geometry<f64>], georef: &GeoReference, burn_value: T) -> Result<DenseRaster<T>> {
    let mut raster = DenseRaster::<T>::zeros(georef.clone());
    let inverse = georef.geo_transform().invert()?;

    for geometry in geometries {
        match geometry {
            Geometry::Polygon(polygon) => burn_polygon(&mut raster, polygon, &inverse, burn_value),
            Geometry::MultiPolygon(multi) => burn_multi_polygon(&mut raster, multi, &inverse, burn_value),
            _ => {
                log::debug!("Skipping non-polygon geometry during rasterization");
            }
        }
    }

    Ok(raster)
}

fn burn_multi_polygon<T: RasterNum>(raster: &mut DenseRaster<T>, multi: &MultiPolygon<f64>, inverse: &GeoTransform, burn_value: T) {
    for polygon in &multi.0 {
        burn_polygon(raster, polygon, inverse, burn_value);
    }
}

fn burn_polygon<T: RasterNum>(raster: &mut DenseRaster<T>, polygon: &Polygon<f64>, inverse: &GeoTransform, burn_value: T) {
    // All rings participate in the even-odd fill: a cell center inside an
    // interior ring crosses an even number of edges and stays unburned.
    let mut edges = Vec::new();
    collect_ring_edges(polygon.exterior(), inverse, &mut edges);
    for interior in polygon.interiors() {
        collect_ring_edges(interior, inverse, &mut edges);
    }

    if edges.is_empty() {
        return;
    }

    let rows = raster.rows();
    let cols = raster.columns();
    let mut intersections = Vec::new();

    for row in 0..rows {
        let center_y = row as f64 + 0.5;

        intersections.clear();
        for &((x1, y1), (x2, y2)) in &edges {
            let (y_min, y_max) = if y1 < y2 { (y1, y2) } else { (y2, y1) };
            // Half-open interval so a scanline through a shared vertex
            // crosses exactly one of the two adjoining edges.
            if center_y >= y_min && center_y < y_max {
                intersections.push(x1 + (center_y - y1) * (x2 - x1) / (y2 - y1));
            }
        }

        intersections.sort_by(|a, b| a.total_cmp(b));

        for span in intersections.chunks_exact(2) {
            let (x_start, x_end) = (span[0], span[1]);

            // First column whose center (col + 0.5) is >= x_start.
            let mut col = (x_start - 0.5).ceil().max(0.0) as usize;
            while col < cols && (col as f64 + 0.5) < x_end {
                raster.set_value_at(row, col, burn_value);
                col += 1;
            }
        }
    }
}

/// Converts the ring's world coordinates to fractional pixel coordinates and
/// collects its non-horizontal edges.
fn collect_ring_edges(ring: &LineString<f64>, inverse: &GeoTransform, edges: &mut Vec<((f64, f64), (f64, f64))>) {
    let pixels: Vec<(f64, f64)> = ring
        .coords()
        .map(|c| {
            let p = inverse.apply(c.x, c.y);
            (p.x(), p.y())
        })
        .collect();

    for pair in pixels.windows(2) {
        if pair[0].1 != pair[1].1 {
            edges.push((pair[0], pair[1]));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CellSize, Point, RasterSize};
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

    #[test]
    fn square_burns_expected_block() -> Result {
        // World square x/y in [2, 4] covers pixel rows 2-3, cols 2-3.
        let square: Geometry<f64> = polygon![
            (x: 2.0, y: 2.0),
            (x: 4.0, y: 2.0),
            (x: 4.0, y: 4.0),
            (x: 2.0, y: 4.0),
            (x: 2.0, y: 2.0),
        ]
        .into();

        let raster = rasterize(&[square], &georef_6x6(), 255u8)?;

        for row in 0..6 {
            for col in 0..6 {
                let expected = if (2..4).contains(&row) && (2..4).contains(&col) { 255 } else { 0 };
                assert_eq!(raster.value_at(row, col), expected, "cell ({row}, {col})");
            }
        }
        Ok(())
    }

    #[test]
    fn hole_stays_unburned() -> Result {
        let with_hole: Geometry<f64> = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (6.0, 0.0), (6.0, 6.0), (0.0, 6.0), (0.0, 0.0)]),
            vec![LineString::from(vec![
                (2.0, 2.0),
                (4.0, 2.0),
                (4.0, 4.0),
                (2.0, 4.0),
                (2.0, 2.0),
            ])],
        )
        .into();

        let raster = rasterize(&[with_hole], &georef_6x6(), 255u8)?;

        assert_eq!(raster.value_at(0, 0), 255);
        assert_eq!(raster.value_at(2, 2), 0);
        assert_eq!(raster.value_at(3, 3), 0);
        assert_eq!(raster.value_at(4, 4), 255);
        Ok(())
    }

    #[test]
    fn overlapping_polygons_are_idempotent() -> Result {
        let a: Geometry<f64> = polygon![
            (x: 1.0, y: 1.0),
            (x: 4.0, y: 1.0),
            (x: 4.0, y: 4.0),
            (x: 1.0, y: 4.0),
            (x: 1.0, y: 1.0),
        ]
        .into();
        let b: Geometry<f64> = polygon![
            (x: 2.0, y: 2.0),
            (x: 5.0, y: 2.0),
            (x: 5.0, y: 5.0),
            (x: 2.0, y: 5.0),
            (x: 2.0, y: 2.0),
        ]
        .into();

        let once = rasterize(&[a.clone(), b.clone()], &georef_6x6(), 255u8)?;
        let swapped = rasterize(&[b, a], &georef_6x6(), 255u8)?;

        assert_eq!(once.as_slice(), swapped.as_slice());
        assert!(once.as_slice().iter().any(|&v| v == 255));
        Ok(())
    }

    #[test]
    fn no_geometries_yield_all_zero() -> Result {
        let raster = rasterize::<u8>(&[], &georef_6x6(), 255)?;
        assert!(raster.as_slice().iter().all(|&v| v == 0));
        Ok(())
    }

    #[test]
    fn multi_polygon_burns_every_part() -> Result {
        let multi: Geometry<f64> = MultiPolygon(vec![
            polygon![
                (x: 0.0, y: 5.0),
                (x: 1.0, y: 5.0),
                (x: 1.0, y: 6.0),
                (x: 0.0, y: 6.0),
                (x: 0.0, y: 5.0),
            ],
            polygon![
                (x: 5.0, y: 0.0),
                (x: 6.0, y: 0.0),
                (x: 6.0, y: 1.0),
                (x: 5.0, y: 1.0),
                (x: 5.0, y: 0.0),
            ],
        ])
        .into();

        let raster = rasterize(&[multi], &georef_6x6(), 255u8)?;
        assert_eq!(raster.value_at(0, 0), 255);
        assert_eq!(raster.value_at(5, 5), 255);
        assert_eq!(raster.as_slice().iter().filter(|&&v| v == 255).count(), 2);
        Ok(())
    }
}
