//! Reads polygon geometries from vector files.

use std::path::Path;

use geo_types::{Geometry, MultiPolygon};

use crate::vector::VectorFileFormat;
use crate::{Error, Result};

/// Loads the polygon geometries of a vector file. Only the geometry of each
/// feature is kept, attribute fields are not read at all. The format is
/// selected by file extension; ESRI shapefiles are the only supported
/// format.
pub fn read_polygons(path: &Path) -> Result<Vec<Geometry<f64>>> {
    match VectorFileFormat::guess_from_path(path) {
        VectorFileFormat::ShapeFile => read_shapefile_polygons(path),
        VectorFileFormat::Unknown => Err(Error::InvalidArgument(format!(
            "Unsupported vector format: '{}'",
            path.display()
        ))),
    }
}

fn read_shapefile_polygons(path: &Path) -> Result<Vec<Geometry<f64>>> {
    let shapes = shapefile::read_shapes_as::<_, shapefile::Polygon>(path)
        .map_err(|e| Error::Runtime(format!("Failed to read shapefile '{}' ({e})", path.display())))?;

    log::debug!("Loaded {} polygon features from '{}'", shapes.len(), path.display());

    shapes
        .into_iter()
        .map(|shape| {
            // A shapefile polygon may carry multiple outer rings, the
            // conversion classifies rings by winding order.
            let multi: MultiPolygon<f64> = shape
                .try_into()
                .map_err(|e| Error::Runtime(format!("Invalid polygon in '{}' ({e})", path.display())))?;
            Ok(Geometry::MultiPolygon(multi))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shapefile::{Point, Polygon, PolygonRing, ShapeWriter};

    fn write_square_shapefile(path: &Path) -> Result {
        let mut writer =
            ShapeWriter::from_path(path).map_err(|e| Error::Runtime(format!("Failed to create shapefile ({e})")))?;

        let square = Polygon::with_rings(vec![PolygonRing::Outer(vec![
            Point::new(2.0, 2.0),
            Point::new(2.0, 4.0),
            Point::new(4.0, 4.0),
            Point::new(4.0, 2.0),
            Point::new(2.0, 2.0),
        ])]);
        writer
            .write_shape(&square)
            .map_err(|e| Error::Runtime(format!("Failed to write shapefile geometry ({e})")))?;

        Ok(())
    }

    #[test]
    fn shapefile_round_trip() -> Result {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("square.shp");
        write_square_shapefile(&path)?;

        let geometries = read_polygons(&path)?;
        assert_eq!(geometries.len(), 1);

        match &geometries[0] {
            Geometry::MultiPolygon(multi) => {
                assert_eq!(multi.0.len(), 1);
                assert_eq!(multi.0[0].exterior().coords().count(), 5);
            }
            other => panic!("Expected a multi polygon, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn missing_shapefile_is_an_error() {
        assert!(read_polygons(Path::new("/nonexistent/water.shp")).is_err());
    }

    #[test]
    fn unsupported_format_is_an_error() {
        assert!(read_polygons(Path::new("water.gpkg")).is_err());
    }
}
