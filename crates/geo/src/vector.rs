pub mod io;

use std::path::Path;

/// Vector file formats recognized by the reader, guessed from the file
/// extension at open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorFileFormat {
    ShapeFile,
    Unknown,
}

impl VectorFileFormat {
    pub fn guess_from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("shp") || ext.eq_ignore_ascii_case("dbf") => VectorFileFormat::ShapeFile,
            _ => VectorFileFormat::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_guess_from_path() {
        assert_eq!(
            VectorFileFormat::guess_from_path(Path::new("water.shp")),
            VectorFileFormat::ShapeFile
        );
        assert_eq!(
            VectorFileFormat::guess_from_path(Path::new("water.DBF")),
            VectorFileFormat::ShapeFile
        );
        assert_eq!(VectorFileFormat::guess_from_path(Path::new("water.csv")), VectorFileFormat::Unknown);
        assert_eq!(VectorFileFormat::guess_from_path(Path::new("water")), VectorFileFormat::Unknown);
    }
}
