use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use tiff::encoder::{colortype, DirectoryEncoder, ImageEncoder, TiffEncoder, TiffKindStandard, TiffValue};
use tiff::tags::Tag;

use crate::raster::{ArrayDataType, RasterNum};
use crate::{fs, Error, GeoReference, Result};

/// Writes a raster as a GeoTIFF, one grayscale image directory per band.
/// Every band must match the georeference's cell count; the sample type on
/// disk is the sample type of `T`. The spatial tags are attached to the
/// first directory.
pub fn write_bands<T: RasterNum>(path: impl AsRef<Path>, georef: &GeoReference, bands: &[&[T]]) -> Result<()> {
    let path = path.as_ref();

    if bands.is_empty() {
        return Err(Error::InvalidArgument(format!(
            "Refusing to write raster '{}' with zero bands",
            path.display()
        )));
    }

    let cell_count = georef.size().cell_count();
    for band in bands {
        if band.len() != cell_count {
            return Err(Error::SizeMismatch {
                size1: (georef.rows(), georef.columns()),
                size2: (band.len(), 1),
            });
        }
    }

    fs::create_directory_for_file(path)?;

    let file = File::create(path).map_err(|e| Error::Runtime(format!("Failed to create raster '{}' ({e})", path.display())))?;
    let mut encoder = TiffEncoder::new(BufWriter::new(file))?;

    let width = georef.columns() as u32;
    let height = georef.rows() as u32;

    for (index, band) in bands.iter().enumerate() {
        // The spatial tags describe the whole raster, they go into the
        // first directory only.
        let spatial = if index == 0 { Some(georef) } else { None };

        match T::TYPE {
            ArrayDataType::Uint8 => {
                let image = encoder.new_image::<colortype::Gray8>(width, height)?;
                write_band_data(image, spatial, bytemuck::cast_slice(band))?;
            }
            ArrayDataType::Uint16 => {
                let image = encoder.new_image::<colortype::Gray16>(width, height)?;
                write_band_data(image, spatial, bytemuck::cast_slice(band))?;
            }
            ArrayDataType::Uint32 => {
                let image = encoder.new_image::<colortype::Gray32>(width, height)?;
                write_band_data(image, spatial, bytemuck::cast_slice(band))?;
            }
            ArrayDataType::Float32 => {
                let image = encoder.new_image::<colortype::Gray32Float>(width, height)?;
                write_band_data(image, spatial, bytemuck::cast_slice(band))?;
            }
            ArrayDataType::Float64 => {
                let image = encoder.new_image::<colortype::Gray64Float>(width, height)?;
                write_band_data(image, spatial, bytemuck::cast_slice(band))?;
            }
        }
    }

    Ok(())
}

fn write_band_data<'a, W, C>(
    mut image: ImageEncoder<'a, W, C, TiffKindStandard>,
    georef: Option<&GeoReference>,
    data: &[C::Inner],
) -> Result<()>
where
    W: Write + Seek,
    C: colortype::ColorType,
    [C::Inner]: TiffValue,
{
    if let Some(georef) = georef {
        write_spatial_tags(image.encoder(), georef)?;
    }

    image.write_data(data)?;
    Ok(())
}

fn write_spatial_tags<W: Write + Seek>(encoder: &mut DirectoryEncoder<W, TiffKindStandard>, georef: &GeoReference) -> Result<()> {
    let cell_size = georef.cell_size();
    let pixel_scale = [cell_size.x().abs(), cell_size.y().abs(), 0.0];
    encoder.write_tag(Tag::ModelPixelScaleTag, &pixel_scale[..])?;

    // Tie the raster coordinate (0, 0, 0) to the top-left model coordinate.
    let top_left = georef.top_left();
    let tie_points = [0.0, 0.0, 0.0, top_left.x(), top_left.y(), 0.0];
    encoder.write_tag(Tag::ModelTiepointTag, &tie_points[..])?;

    if let Some(nodata) = georef.nodata() {
        encoder.write_tag(Tag::GdalNodata, nodata.to_string().as_str())?;
    }

    if !georef.projection().is_empty() {
        write_geo_keys(encoder, georef)?;
    }

    Ok(())
}

fn write_geo_keys<W: Write + Seek>(encoder: &mut DirectoryEncoder<W, TiffKindStandard>, georef: &GeoReference) -> Result<()> {
    let epsg = match georef.epsg() {
        Some(epsg) => epsg,
        None => {
            log::debug!("Projection '{}' has no EPSG code, skipping geokeys", georef.projection());
            return Ok(());
        }
    };

    let code = u16::try_from(epsg.code()).map_err(|_| Error::Runtime(format!("EPSG code out of geokey range: {epsg}")))?;
    let geographic = georef.spatial_reference()?.is_geographic();

    // version, revision, minor revision, key count followed by the inline
    // keys: model type (1024), raster type pixel-is-area (1025) and the
    // geographic (2048) or projected (3072) CRS code.
    let (model_type, crs_key) = if geographic { (2u16, 2048u16) } else { (1u16, 3072u16) };
    let geo_keys: [u16; 16] = [
        1, 1, 0, 3, //
        1024, 0, 1, model_type, //
        1025, 0, 1, 1, //
        crs_key, 0, 1, code,
    ];
    encoder.write_tag(Tag::GeoKeyDirectoryTag, &geo_keys[..])?;

    Ok(())
}
