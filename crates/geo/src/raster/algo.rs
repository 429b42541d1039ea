pub mod rasterize;
pub mod warp;

pub use rasterize::rasterize;
pub use warp::{warp, warp_georeference};
