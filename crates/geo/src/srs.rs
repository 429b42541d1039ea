//! Spatial reference system handling and coordinate transformations,
//! backed by the pure Rust proj4rs projection library.

use proj4rs::transform::transform;
use proj4rs::Proj;

use crate::crs::Epsg;
use crate::{Error, Point, Result};

/// A parsed spatial reference, created from an EPSG code or a proj4 string.
#[derive(Debug, Clone)]
pub struct SpatialReference {
    srs: Proj,
    epsg: Option<Epsg>,
    proj_str: String,
}

impl SpatialReference {
    pub fn from_epsg(epsg: Epsg) -> Result<Self> {
        let proj_str = crs_definitions::from_code(epsg.code() as u16)
            .map(|def| def.proj4.to_string())
            .ok_or_else(|| Error::Runtime(format!("No proj4 definition known for {epsg}")))?;

        Ok(Self {
            srs: Proj::from_proj_string(&proj_str)?,
            epsg: Some(epsg),
            proj_str,
        })
    }

    /// Parses an `EPSG:<code>` definition or a raw proj4 string.
    pub fn from_definition(def: &str) -> Result<Self> {
        if def.is_empty() {
            return Err(Error::InvalidArgument("Empty projection definition".into()));
        }

        if let Some(code) = def.strip_prefix("EPSG:") {
            let code = code
                .parse::<u32>()
                .map_err(|_| Error::InvalidArgument(format!("Invalid EPSG definition: {def}")))?;
            return Self::from_epsg(Epsg::from(code));
        }

        Ok(Self {
            srs: Proj::from_proj_string(def)?,
            epsg: None,
            proj_str: def.to_string(),
        })
    }

    pub fn is_geographic(&self) -> bool {
        self.srs.is_latlong()
    }

    pub fn epsg(&self) -> Option<Epsg> {
        self.epsg
    }

    pub fn to_proj(&self) -> &str {
        &self.proj_str
    }

    fn proj(&self) -> &Proj {
        &self.srs
    }
}

/// Transforms points from one spatial reference to another. Geographic
/// references use degrees on the outside, the radian conversions required by
/// the projection backend happen internally.
pub struct CoordinateTransformer {
    source: SpatialReference,
    target: SpatialReference,
}

impl CoordinateTransformer {
    pub fn new(source_srs: &str, target_srs: &str) -> Result<Self> {
        Ok(CoordinateTransformer {
            source: SpatialReference::from_definition(source_srs)?,
            target: SpatialReference::from_definition(target_srs)?,
        })
    }

    pub fn from_epsg(source_epsg: Epsg, target_epsg: Epsg) -> Result<Self> {
        Ok(CoordinateTransformer {
            source: SpatialReference::from_epsg(source_epsg)?,
            target: SpatialReference::from_epsg(target_epsg)?,
        })
    }

    pub fn source(&self) -> &SpatialReference {
        &self.source
    }

    pub fn target(&self) -> &SpatialReference {
        &self.target
    }

    pub fn transform_point(&self, point: Point) -> Result<Point> {
        let mut p = point;
        self.transform_point_in_place(&mut p)?;
        Ok(p)
    }

    pub fn transform_point_in_place(&self, point: &mut Point) -> Result<()> {
        if self.source.is_geographic() {
            *point = point.to_radians();
        }
        transform(self.source.proj(), self.target.proj(), point)?;
        if self.target.is_geographic() {
            *point = point.to_degrees();
        }
        Ok(())
    }

    pub fn transform_points_in_place(&self, points: &mut [Point]) -> Result<()> {
        for point in points.iter_mut() {
            self.transform_point_in_place(point)?;
        }
        Ok(())
    }
}
