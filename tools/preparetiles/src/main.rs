use std::path::PathBuf;

use clap::Parser;
use env_logger::{Env, TimestampPrecision};
use geo::raster::ArrayDataType;
use tileprep::{CachePaths, DatasetDescriptor, TileExtractor};

pub type Result<T> = tileprep::Result<T>;

#[derive(Parser, Debug)]
#[clap(name = "preparetiles", about = "Prepare tiled water-segmentation training data")]
pub struct Opt {
    /// Dataset descriptor (json with train/test raster and polygon paths)
    #[clap(long = "dataset", short = 'd')]
    pub dataset: PathBuf,

    /// Base directory for all cached artifacts
    #[clap(long = "working-dir", short = 'w')]
    pub working_dir: PathBuf,

    /// Tile edge length in pixels
    #[clap(long = "tile-size", short = 't', default_value = "64")]
    pub tile_size: usize,
}

fn main() -> Result<()> {
    let opt = Opt::parse();

    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp(Some(TimestampPrecision::Millis))
        .init();

    let descriptor = DatasetDescriptor::from_file(&opt.dataset)?;
    let extractor = TileExtractor::new(CachePaths::rooted_at(&opt.working_dir), opt.tile_size)?;

    // The pipeline is generic over the raster sample type, dispatch on the
    // dtype of the first raster of the dataset.
    let probe = descriptor
        .train
        .first()
        .or_else(|| descriptor.test.first())
        .ok_or_else(|| tileprep::Error::InvalidArgument("Dataset descriptor contains no entries".into()))?;

    match geo::geotiff::probe_data_type(&probe.raster)? {
        ArrayDataType::Uint8 => run::<u8>(&extractor, &descriptor),
        ArrayDataType::Uint16 => run::<u16>(&extractor, &descriptor),
        ArrayDataType::Uint32 => run::<u32>(&extractor, &descriptor),
        ArrayDataType::Float32 => run::<f32>(&extractor, &descriptor),
        ArrayDataType::Float64 => run::<f64>(&extractor, &descriptor),
    }
}

fn run<T: geo::raster::RasterNum>(extractor: &TileExtractor, descriptor: &DatasetDescriptor) -> Result<()> {
    let tiles = extractor.preprocess_data::<T>(descriptor)?;

    log::info!(
        "Extracted {} train and {} test tile pairs (tile size {})",
        tiles.features_train.len(),
        tiles.features_test.len(),
        extractor.tile_size()
    );

    Ok(())
}
