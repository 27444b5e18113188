use crate::GridSpec;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GridError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("cannot access raster {}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed raster {}: {msg}", path.display())]
    Format { path: PathBuf, msg: String },

    #[error("expected {expected} samples, got {actual}")]
    Dimensions { expected: usize, actual: usize },

    #[error("grids are not co-registered: {0} vs {1}")]
    Misaligned(Box<GridSpec>, Box<GridSpec>),

    #[error("spatial reference mismatch: {0} vs {1}")]
    Srs(String, String),

    #[error("unsupported raster format {}", .0.display())]
    UnsupportedFormat(PathBuf),
}
