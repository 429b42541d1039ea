//! Binary container for cached tile pairs.
//!
//! Layout: a u32 signature, a fixed header (tile size, feature sample type,
//! feature channel count, pair count, source path), then one record per
//! tile pair holding the position, the feature samples and the label
//! samples. Header fields are little-endian, sample payloads are raw
//! machine-order bytes; the cache is a local artifact, not an interchange
//! format.

use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use geo::raster::{ArrayDataType, RasterNum};

use crate::tiles::Tile;
use crate::{Error, Result};

const TILE_CACHE_SIGNATURE: u32 = u32::from_le_bytes(*b"WTC1");

/// Serializes parallel feature/label tile sequences. Both sequences must be
/// the same length with pairwise identical positions.
pub fn write_tile_cache<T: RasterNum>(path: &Path, features: &[Tile<T>], labels: &[Tile<u8>]) -> Result {
    assert_eq!(features.len(), labels.len(), "feature/label sequences must be parallel");

    geo::fs::create_directory_for_file(path)?;
    let mut writer = BufWriter::new(File::create(path)?);

    let (tile_size, channels, source) = match features.first() {
        Some(tile) => (tile.size, tile.channels, tile.source.clone()),
        None => (0, 0, PathBuf::new()),
    };

    writer.write_all(&TILE_CACHE_SIGNATURE.to_le_bytes())?;
    writer.write_all(&(tile_size as u32).to_le_bytes())?;
    writer.write_all(&[T::TYPE.to_tag()])?;
    writer.write_all(&(channels as u32).to_le_bytes())?;
    writer.write_all(&(features.len() as u32).to_le_bytes())?;

    let source_bytes = source.to_string_lossy().into_owned().into_bytes();
    writer.write_all(&(source_bytes.len() as u32).to_le_bytes())?;
    writer.write_all(&source_bytes)?;

    for (feature, label) in features.iter().zip(labels) {
        debug_assert_eq!(feature.position(), label.position());

        writer.write_all(&(feature.row as u32).to_le_bytes())?;
        writer.write_all(&(feature.col as u32).to_le_bytes())?;
        writer.write_all(bytemuck::cast_slice(&feature.data))?;
        writer.write_all(&label.data)?;
    }

    writer.flush()?;
    Ok(())
}

/// Deserializes a tile cache file. A missing file is a cache miss and
/// returns `None`; a present file with an unexpected signature, sample type
/// or tile size is corrupt and fails.
pub fn read_tile_cache<T: RasterNum>(path: &Path, expected_tile_size: usize) -> Result<Option<(Vec<Tile<T>>, Vec<Tile<u8>>)>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut reader = BufReader::new(file);

    let corrupt = |what: &str| Error::Runtime(format!("Corrupt tile cache '{}': {what}", path.display()));

    if read_u32(&mut reader)? != TILE_CACHE_SIGNATURE {
        return Err(corrupt("unrecognized signature"));
    }

    let tile_size = read_u32(&mut reader)? as usize;
    let data_type = ArrayDataType::from_tag(read_u8(&mut reader)?)?;
    let channels = read_u32(&mut reader)? as usize;
    let count = read_u32(&mut reader)? as usize;

    let source_len = read_u32(&mut reader)? as usize;
    let mut source_bytes = vec![0u8; source_len];
    reader.read_exact(&mut source_bytes)?;
    let source = PathBuf::from(String::from_utf8(source_bytes).map_err(|_| corrupt("source path is not valid utf-8"))?);

    if count > 0 && tile_size != expected_tile_size {
        return Err(corrupt("tile size mismatch"));
    }
    if count > 0 && data_type != T::TYPE {
        return Err(corrupt("sample type mismatch"));
    }

    let mut features = Vec::with_capacity(count);
    let mut labels = Vec::with_capacity(count);

    for _ in 0..count {
        let row = read_u32(&mut reader)? as usize;
        let col = read_u32(&mut reader)? as usize;

        let mut feature_data = vec![T::zero(); tile_size * tile_size * channels];
        reader.read_exact(bytemuck::cast_slice_mut(&mut feature_data))?;

        let mut label_data = vec![0u8; tile_size * tile_size];
        reader.read_exact(&mut label_data)?;

        features.push(Tile {
            data: feature_data,
            size: tile_size,
            channels,
            row,
            col,
            source: source.clone(),
        });
        labels.push(Tile {
            data: label_data,
            size: tile_size,
            channels: 1,
            row,
            col,
            source: source.clone(),
        });
    }

    Ok(Some((features, labels)))
}

fn read_u32(reader: &mut impl Read) -> Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u8(reader: &mut impl Read) -> Result<u8> {
    let mut buf = [0u8; 1];
    reader.read_exact(&mut buf)?;
    Ok(buf[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile_pair(row: usize, col: usize) -> (Tile<u16>, Tile<u8>) {
        let feature = Tile {
            data: (0..12u16).map(|v| v + row as u16).collect(),
            size: 2,
            channels: 3,
            row,
            col,
            source: PathBuf::from("/input/s2.tif"),
        };
        let label = Tile {
            data: vec![0, 1, 1, 0],
            size: 2,
            channels: 1,
            row,
            col,
            source: PathBuf::from("/input/s2.tif"),
        };
        (feature, label)
    }

    #[test]
    fn round_trip() -> Result {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("s2_2.cache");

        let (f0, l0) = tile_pair(0, 0);
        let (f1, l1) = tile_pair(2, 4);
        write_tile_cache(&path, &[f0.clone(), f1.clone()], &[l0.clone(), l1.clone()])?;

        let (features, labels) = read_tile_cache::<u16>(&path, 2)?.expect("cache file exists");
        assert_eq!(features, vec![f0, f1]);
        assert_eq!(labels, vec![l0, l1]);
        Ok(())
    }

    #[test]
    fn missing_file_is_a_cache_miss() -> Result {
        let tmp = tempfile::tempdir()?;
        assert!(read_tile_cache::<u16>(&tmp.path().join("absent.cache"), 2)?.is_none());
        Ok(())
    }

    #[test]
    fn empty_tile_set_round_trips() -> Result {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("empty.cache");

        write_tile_cache::<u16>(&path, &[], &[])?;
        let (features, labels) = read_tile_cache::<u16>(&path, 2)?.expect("cache file exists");
        assert!(features.is_empty());
        assert!(labels.is_empty());
        Ok(())
    }

    #[test]
    fn sample_type_mismatch_fails() -> Result {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("s2_2.cache");

        let (f0, l0) = tile_pair(0, 0);
        write_tile_cache(&path, &[f0], &[l0])?;

        assert!(read_tile_cache::<u8>(&path, 2).is_err());
        Ok(())
    }

    #[test]
    fn garbage_file_is_corrupt() -> Result {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("junk.cache");
        std::fs::write(&path, b"not a tile cache")?;

        assert!(read_tile_cache::<u16>(&path, 2).is_err());
        Ok(())
    }
}
