use crate::{srs::SpatialReference, Cell, GeoTransform, Point, RasterSize, Rect, Result};

/// Horizontal and vertical extent of a single raster cell in world units.
/// The y size is negative for the usual north-up rasters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CellSize {
    x: f64,
    y: f64,
}

impl CellSize {
    pub const fn new(x: f64, y: f64) -> Self {
        CellSize { x, y }
    }

    pub const fn square(size: f64) -> Self {
        CellSize { x: size, y: -size }
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }
}

/// Spatial metadata of a raster: its projection, grid size, affine transform
/// and optional nodata value. Everything needed to go back and forth between
/// cell space and world coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoReference {
    projection: String,
    raster_size: RasterSize,
    geo_transform: GeoTransform,
    nodata: Option<f64>,
}

impl GeoReference {
    pub fn new(
        projection: impl Into<String>,
        raster_size: RasterSize,
        geo_transform: GeoTransform,
        nodata: Option<f64>,
    ) -> Self {
        GeoReference {
            projection: projection.into(),
            raster_size,
            geo_transform,
            nodata,
        }
    }

    pub fn with_top_left_origin(
        projection: impl Into<String>,
        raster_size: RasterSize,
        top_left: Point,
        cell_size: CellSize,
        nodata: Option<f64>,
    ) -> Self {
        Self::new(
            projection,
            raster_size,
            GeoTransform::from_top_left_and_cell_size(top_left, cell_size),
            nodata,
        )
    }

    pub fn size(&self) -> RasterSize {
        self.raster_size
    }

    pub fn rows(&self) -> usize {
        self.raster_size.rows
    }

    pub fn columns(&self) -> usize {
        self.raster_size.cols
    }

    pub fn projection(&self) -> &str {
        &self.projection
    }

    pub fn nodata(&self) -> Option<f64> {
        self.nodata
    }

    pub fn set_nodata(&mut self, nodata: Option<f64>) {
        self.nodata = nodata;
    }

    pub fn geo_transform(&self) -> GeoTransform {
        self.geo_transform
    }

    pub fn cell_size(&self) -> CellSize {
        CellSize::new(self.geo_transform.cell_size_x(), self.geo_transform.cell_size_y())
    }

    pub fn top_left(&self) -> Point {
        self.geo_transform.top_left()
    }

    /// EPSG code of the projection when it is expressed as an `EPSG:` definition.
    pub fn epsg(&self) -> Option<crate::crs::Epsg> {
        self.projection
            .strip_prefix("EPSG:")
            .and_then(|code| code.parse::<u32>().ok())
            .map(crate::crs::Epsg::from)
    }

    pub fn spatial_reference(&self) -> Result<SpatialReference> {
        SpatialReference::from_definition(&self.projection)
    }

    pub fn bounding_box(&self) -> Rect {
        let top_left = self.geo_transform.apply(0.0, 0.0);
        let bottom_right = self
            .geo_transform
            .apply(self.raster_size.cols as f64, self.raster_size.rows as f64);
        Rect::from_nw_se(top_left, bottom_right)
    }

    pub fn cell_center(&self, cell: Cell) -> Point {
        self.geo_transform.cell_center(cell)
    }

    /// The cell containing the given world coordinate. The result may lie
    /// outside of the grid, check with [`GeoReference::is_cell_on_map`].
    pub fn point_to_cell(&self, point: Point) -> Result<Cell> {
        let (col, row) = self.geo_transform.point_to_pixel(point)?;
        Ok(Cell::from_row_col(row.floor() as i64, col.floor() as i64))
    }

    pub fn is_cell_on_map(&self, cell: Cell) -> bool {
        cell.is_on_grid(self.raster_size)
    }

    /// Copy of this reference with a different grid size and transform but
    /// the same projection and nodata.
    pub fn resized(&self, raster_size: RasterSize, geo_transform: GeoTransform) -> Self {
        GeoReference::new(self.projection.clone(), raster_size, geo_transform, self.nodata)
    }
}
