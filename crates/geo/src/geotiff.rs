//! GeoTIFF reading and writing using the pure Rust tiff crate.
//!
//! Spatial metadata travels in the standard GeoTIFF tags: ModelPixelScale,
//! ModelTiepoint, the GeoKey directory for the EPSG code and the GDAL nodata
//! tag. Multi-band rasters are written as one grayscale image directory per
//! band; reading accepts both that planar layout and interleaved gray/RGB
//! files.

mod reader;
mod writer;

pub use reader::{probe_data_type, read_bands, read_geo_reference};
pub use writer::write_bands;
