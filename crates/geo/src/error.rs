use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid path: {0}")]
    InvalidPath(std::path::PathBuf),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Runtime error: {0}")]
    Runtime(String),
    #[error("Raster dimensions do not match ({}x{}) <-> ({}x{})", .size1.0, .size1.1, .size2.0, .size2.1)]
    SizeMismatch {
        size1: (usize, usize),
        size2: (usize, usize),
    },
    #[error("IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Tiff error: {0}")]
    TiffError(#[from] tiff::TiffError),
    #[error("Projection error: {0}")]
    ProjectionError(#[from] proj4rs::errors::Error),
    #[error("Shapefile error: {0}")]
    ShapefileError(#[from] shapefile::Error),
}
