//! Tiling of band stacks into fixed-size training samples and the inverse
//! reassembly, plus the filter that drops tile pairs without feature signal.

use std::path::{Path, PathBuf};

use geo::raster::RasterNum;

/// A height x width x channels sample block with interleaved channel
/// storage. The tiling input for both feature imagery (multi channel) and
/// label bitmaps (single channel).
#[derive(Debug, Clone, PartialEq)]
pub struct BandStack<T: RasterNum> {
    rows: usize,
    cols: usize,
    channels: usize,
    data: Vec<T>,
}

impl<T: RasterNum> BandStack<T> {
    pub fn zeros(rows: usize, cols: usize, channels: usize) -> Self {
        BandStack {
            rows,
            cols,
            channels,
            data: vec![T::zero(); rows * cols * channels],
        }
    }

    /// Stacks per-band sample buffers into one interleaved block. All bands
    /// must have `rows * cols` samples.
    pub fn from_bands(rows: usize, cols: usize, bands: &[Vec<T>]) -> crate::Result<Self> {
        let channels = bands.len();
        if channels == 0 {
            return Err(crate::Error::InvalidArgument("Cannot stack zero bands".into()));
        }
        for band in bands {
            if band.len() != rows * cols {
                return Err(crate::Error::SizeMismatch {
                    size1: (rows, cols),
                    size2: (band.len(), 1),
                });
            }
        }

        let mut data = Vec::with_capacity(rows * cols * channels);
        for pixel in 0..rows * cols {
            for band in bands {
                data.push(band[pixel]);
            }
        }

        Ok(BandStack {
            rows,
            cols,
            channels,
            data,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        (self.rows, self.cols, self.channels)
    }

    fn row_slice(&self, row: usize, col: usize, width: usize) -> &[T] {
        let start = (row * self.cols + col) * self.channels;
        &self.data[start..start + width * self.channels]
    }

    fn row_slice_mut(&mut self, row: usize, col: usize, width: usize) -> &mut [T] {
        let start = (row * self.cols + col) * self.channels;
        &mut self.data[start..start + width * self.channels]
    }
}

/// One fixed-size tile cut from a band stack, tagged with its top-left pixel
/// position and the path of the raster it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile<T: RasterNum> {
    pub data: Vec<T>,
    pub size: usize,
    pub channels: usize,
    pub row: usize,
    pub col: usize,
    pub source: PathBuf,
}

impl<T: RasterNum> Tile<T> {
    pub fn position(&self) -> (usize, usize) {
        (self.row, self.col)
    }
}

/// Partitions a band stack into non-overlapping square tiles in row-major
/// order. Incomplete tiles at the right and bottom edges are dropped so
/// every produced tile has the exact same shape; the inverse reassembly
/// therefore needs no padding logic. The operation is deterministic:
/// identical input yields the identical tile sequence.
pub fn create_tiles<T: RasterNum>(image: &BandStack<T>, tile_size: usize, source: &Path) -> Vec<Tile<T>> {
    assert!(tile_size > 0, "tile size must be positive");

    let tile_rows = image.rows() / tile_size;
    let tile_cols = image.cols() / tile_size;
    let mut tiles = Vec::with_capacity(tile_rows * tile_cols);

    for tile_row in 0..tile_rows {
        for tile_col in 0..tile_cols {
            let row = tile_row * tile_size;
            let col = tile_col * tile_size;

            let mut data = Vec::with_capacity(tile_size * tile_size * image.channels());
            for r in row..row + tile_size {
                data.extend_from_slice(image.row_slice(r, col, tile_size));
            }

            tiles.push(Tile {
                data,
                size: tile_size,
                channels: image.channels(),
                row,
                col,
                source: source.to_path_buf(),
            });
        }
    }

    tiles
}

/// Exact inverse of [`create_tiles`]: writes every tile back at its recorded
/// offset into a zeroed band stack of the given shape. Regions not covered
/// by any tile (filtered tiles, dropped edges) stay zero.
pub fn image_from_tiles<T: RasterNum>(tiles: &[Tile<T>], tile_size: usize, output_shape: (usize, usize, usize)) -> BandStack<T> {
    let (rows, cols, channels) = output_shape;
    let mut image = BandStack::zeros(rows, cols, channels);

    for tile in tiles {
        debug_assert_eq!(tile.size, tile_size);
        debug_assert_eq!(tile.channels, channels);

        for r in 0..tile_size {
            let src_start = r * tile_size * channels;
            image
                .row_slice_mut(tile.row + r, tile.col, tile_size)
                .copy_from_slice(&tile.data[src_start..src_start + tile_size * channels]);
        }
    }

    image
}

/// Drops every tile pair whose feature tile carries no signal, i.e. is
/// element-wise equal to the all-zero reference tile of the same shape. The
/// paired label tile is removed with it, so the sequences stay parallel.
/// Single pass, order preserved.
pub fn remove_empty_tiles<T: RasterNum>(features: Vec<Tile<T>>, labels: Vec<Tile<u8>>) -> (Vec<Tile<T>>, Vec<Tile<u8>>) {
    assert_eq!(features.len(), labels.len(), "feature/label sequences must be parallel");

    let empty_tile: Vec<T> = match features.first() {
        Some(tile) => vec![T::zero(); tile.size * tile.size * tile.channels],
        None => return (features, labels),
    };

    let mut kept_features = Vec::with_capacity(features.len());
    let mut kept_labels = Vec::with_capacity(labels.len());

    for (feature, label) in features.into_iter().zip(labels) {
        if feature.data != empty_tile {
            kept_features.push(feature);
            kept_labels.push(label);
        }
    }

    (kept_features, kept_labels)
}
