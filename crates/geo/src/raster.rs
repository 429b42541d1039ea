pub mod algo;
mod denseraster;

pub use denseraster::DenseRaster;

use crate::{Error, Result};

/// Sample type of raster data as stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayDataType {
    Uint8,
    Uint16,
    Uint32,
    Float32,
    Float64,
}

impl ArrayDataType {
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            ArrayDataType::Uint8 => 1,
            ArrayDataType::Uint16 => 2,
            ArrayDataType::Uint32 | ArrayDataType::Float32 => 4,
            ArrayDataType::Float64 => 8,
        }
    }

    pub fn to_tag(&self) -> u8 {
        match self {
            ArrayDataType::Uint8 => 1,
            ArrayDataType::Uint16 => 2,
            ArrayDataType::Uint32 => 3,
            ArrayDataType::Float32 => 4,
            ArrayDataType::Float64 => 5,
        }
    }

    pub fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            1 => Ok(ArrayDataType::Uint8),
            2 => Ok(ArrayDataType::Uint16),
            3 => Ok(ArrayDataType::Uint32),
            4 => Ok(ArrayDataType::Float32),
            5 => Ok(ArrayDataType::Float64),
            _ => Err(Error::InvalidArgument(format!("Unknown sample type tag: {tag}"))),
        }
    }
}

impl std::fmt::Display for ArrayDataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ArrayDataType::Uint8 => "uint8",
            ArrayDataType::Uint16 => "uint16",
            ArrayDataType::Uint32 => "uint32",
            ArrayDataType::Float32 => "float32",
            ArrayDataType::Float64 => "float64",
        };
        f.write_str(name)
    }
}

/// Numeric sample types a raster band can hold.
pub trait RasterNum: Copy + PartialEq + num::NumCast + num::Zero + bytemuck::Pod + 'static {
    const TYPE: ArrayDataType;
}

impl RasterNum for u8 {
    const TYPE: ArrayDataType = ArrayDataType::Uint8;
}

impl RasterNum for u16 {
    const TYPE: ArrayDataType = ArrayDataType::Uint16;
}

impl RasterNum for u32 {
    const TYPE: ArrayDataType = ArrayDataType::Uint32;
}

impl RasterNum for f32 {
    const TYPE: ArrayDataType = ArrayDataType::Float32;
}

impl RasterNum for f64 {
    const TYPE: ArrayDataType = ArrayDataType::Float64;
}
