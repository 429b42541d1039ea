use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;

use crate::raster::{ArrayDataType, RasterNum};
use crate::{crs, CellSize, Error, GeoReference, Point, RasterSize, Result};

fn open_decoder(path: &Path) -> Result<Decoder<BufReader<File>>> {
    let file = File::open(path).map_err(|e| Error::Runtime(format!("Failed to open raster '{}' ({e})", path.display())))?;
    Ok(Decoder::new(BufReader::new(file))?.with_limits(Limits::unlimited()))
}

/// Reads the spatial reference information of the first image directory.
pub fn read_geo_reference(path: &Path) -> Result<GeoReference> {
    let mut decoder = open_decoder(path)?;
    geo_reference_from_decoder(&mut decoder, path)
}

fn geo_reference_from_decoder<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>, path: &Path) -> Result<GeoReference> {
    let (width, height) = decoder.dimensions()?;

    let pixel_scale = decoder
        .get_tag_f64_vec(Tag::ModelPixelScaleTag)
        .map_err(|_| Error::Runtime(format!("No pixel scale in raster '{}'", path.display())))?;
    if pixel_scale.len() < 2 {
        return Err(Error::Runtime("ModelPixelScale must have at least 2 values".into()));
    }

    let tie_points = decoder
        .get_tag_f64_vec(Tag::ModelTiepointTag)
        .map_err(|_| Error::Runtime(format!("No tie points in raster '{}'", path.display())))?;
    if tie_points.len() != 6 {
        return Err(Error::Runtime("ModelTiepoint must have 6 values".into()));
    }

    let cell_size = CellSize::new(pixel_scale[0], -pixel_scale[1]);
    let top_left = Point::new(
        tie_points[3] - tie_points[0] * cell_size.x(),
        tie_points[4] - tie_points[1] * cell_size.y(),
    );

    let nodata = match decoder.get_tag_ascii_string(Tag::GdalNodata) {
        Ok(nodata_str) => nodata_str.trim_end_matches('\0').parse::<f64>().ok(),
        Err(_) => None,
    };

    let projection = match read_epsg(decoder)? {
        Some(epsg) => epsg.to_string(),
        None => String::new(),
    };

    Ok(GeoReference::with_top_left_origin(
        projection,
        RasterSize::with_rows_cols(height as usize, width as usize),
        top_left,
        cell_size,
        nodata,
    ))
}

/// Extracts the EPSG code from the GeoKey directory. Only inline projected
/// (3072) and geographic (2048) keys are supported.
fn read_epsg<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Result<Option<crs::Epsg>> {
    let key_dir = match decoder.get_tag_u32_vec(Tag::GeoKeyDirectoryTag) {
        Ok(dir) => dir,
        Err(_) => return Ok(None),
    };

    if key_dir.len() < 4 {
        return Ok(None);
    }
    if key_dir[0] != 1 {
        return Err(Error::Runtime(format!("Unexpected geokey directory version: {}", key_dir[0])));
    }

    let mut projected = None;
    let mut geographic = None;

    for key in key_dir[4..].chunks_exact(4) {
        match key[0] {
            2048 if key[1] == 0 && key[2] == 1 => geographic = Some(crs::Epsg::from(key[3])),
            3072 if key[1] == 0 && key[2] == 1 => projected = Some(crs::Epsg::from(key[3])),
            _ => {}
        }
    }

    Ok(projected.or(geographic))
}

/// Reads the sample type of a raster without decoding its data, so callers
/// can dispatch the generic read on the file's actual dtype.
pub fn probe_data_type(path: &Path) -> Result<ArrayDataType> {
    let mut decoder = open_decoder(path)?;

    let bits = decoder
        .get_tag_u32_vec(Tag::BitsPerSample)
        .map_err(|_| Error::Runtime(format!("No sample size information in raster '{}'", path.display())))?;
    let bits = *bits.first().ok_or_else(|| Error::Runtime("Empty BitsPerSample tag".into()))?;

    let sample_format = match decoder.find_tag(Tag::SampleFormat)? {
        Some(value) => value.into_u32_vec()?.first().copied().unwrap_or(1),
        None => 1,
    };

    match (sample_format, bits) {
        (1, 8) => Ok(ArrayDataType::Uint8),
        (1, 16) => Ok(ArrayDataType::Uint16),
        (1, 32) => Ok(ArrayDataType::Uint32),
        (3, 32) => Ok(ArrayDataType::Float32),
        (3, 64) => Ok(ArrayDataType::Float64),
        (format, bits) => Err(Error::Runtime(format!(
            "Unsupported sample type (format {format}, {bits} bits) in raster '{}'",
            path.display()
        ))),
    }
}

/// Reads all bands of a raster. Every image directory contributes its
/// samples: a directory with multiple samples per pixel (interleaved
/// gray/RGB data) is split into one band per sample, additional directories
/// (the planar layout written by [`super::write_bands`]) are appended in
/// order. Fails when the file holds zero bands or a different sample type
/// than `T`.
pub fn read_bands<T: RasterNum>(path: &Path) -> Result<(GeoReference, Vec<Vec<T>>)> {
    let mut decoder = open_decoder(path)?;
    let georef = geo_reference_from_decoder(&mut decoder, path)?;

    let mut bands = Vec::new();
    loop {
        let samples_per_pixel = match decoder.find_tag(Tag::SamplesPerPixel)? {
            Some(value) => value.into_u32_vec()?.first().copied().unwrap_or(1) as usize,
            None => 1,
        };

        let samples = decode_samples::<T>(&mut decoder, path)?;
        if samples_per_pixel > 1 {
            bands.extend(deinterleave(&samples, samples_per_pixel));
        } else {
            bands.push(samples);
        }

        if !decoder.more_images() {
            break;
        }
        decoder.next_image()?;
    }

    if bands.is_empty() {
        return Err(Error::Runtime(format!("Raster '{}' contains no bands", path.display())));
    }

    let cell_count = georef.size().cell_count();
    for band in &bands {
        if band.len() != cell_count {
            return Err(Error::SizeMismatch {
                size1: (georef.rows(), georef.columns()),
                size2: (band.len(), 1),
            });
        }
    }

    Ok((georef, bands))
}

fn decode_samples<T: RasterNum>(decoder: &mut Decoder<BufReader<File>>, path: &Path) -> Result<Vec<T>> {
    fn convert<T: RasterNum, S: RasterNum>(buf: Vec<S>, path: &Path) -> Result<Vec<T>> {
        if S::TYPE != T::TYPE {
            return Err(Error::Runtime(format!(
                "Raster '{}' holds {} samples, expected {}",
                path.display(),
                S::TYPE,
                T::TYPE
            )));
        }

        Ok(bytemuck::cast_slice(&buf).to_vec())
    }

    match decoder.read_image()? {
        DecodingResult::U8(buf) => convert::<T, u8>(buf, path),
        DecodingResult::U16(buf) => convert::<T, u16>(buf, path),
        DecodingResult::U32(buf) => convert::<T, u32>(buf, path),
        DecodingResult::F32(buf) => convert::<T, f32>(buf, path),
        DecodingResult::F64(buf) => convert::<T, f64>(buf, path),
        _ => Err(Error::Runtime(format!("Unsupported sample type in raster '{}'", path.display()))),
    }
}

fn deinterleave<T: RasterNum>(samples: &[T], channels: usize) -> Vec<Vec<T>> {
    let mut bands = vec![Vec::with_capacity(samples.len() / channels); channels];
    for chunk in samples.chunks_exact(channels) {
        for (band, &sample) in bands.iter_mut().zip(chunk) {
            band.push(sample);
        }
    }
    bands
}
