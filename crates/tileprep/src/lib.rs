#![warn(clippy::unwrap_used)]

//! Tiled feature/label extraction pipeline for water segmentation training
//! data.
//!
//! A satellite raster is reprojected into geographic coordinates, the
//! authoritative water polygons are burned into a pixel-aligned binary
//! bitmap, both are partitioned into fixed-size tiles, tiles without any
//! feature signal are dropped and the resulting tile pairs are cached so a
//! repeated run with the same inputs is a pure cache read.

pub mod bitmap;
mod cachefile;
pub mod config;
pub mod extract;
pub mod polygons;
pub mod reproject;
pub mod tiles;

pub type Error = geo::Error;
pub type Result<T = ()> = geo::Result<T>;

pub use config::{CachePaths, DatasetDescriptor, DatasetEntry};
pub use extract::TileExtractor;
pub use tiles::{create_tiles, image_from_tiles, remove_empty_tiles, BandStack, Tile};
