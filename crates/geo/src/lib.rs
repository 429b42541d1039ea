#![warn(clippy::unwrap_used)]

//! Geospatial primitives for the tile preparation pipeline: raster and
//! vector data structures, GeoTIFF reading/writing, spatial reference
//! handling and the reprojection/rasterization algorithms built on top.

pub type Result<T = ()> = std::result::Result<T, Error>;

mod cell;
pub mod crs;
mod error;
pub mod fs;
mod geotransform;
mod georeference;
pub mod geotiff;
pub mod raster;
mod rastersize;
mod rect;
pub mod srs;
pub mod vector;

pub use cell::Cell;
#[doc(inline)]
pub use error::Error;
pub use geotransform::GeoTransform;
pub use georeference::CellSize;
pub use georeference::GeoReference;
pub use rastersize::RasterSize;
pub use rect::Rect;

pub type Point<T = f64> = geo_types::Point<T>;
pub type Geometry<T = f64> = geo_types::Geometry<T>;
