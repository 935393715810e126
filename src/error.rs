use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Nested rows of different lengths
    #[error("setting an array element with a sequence: row {row} has {found} elements, expected {expected}")]
    RaggedRows { row: usize, expected: usize, found: usize },

    #[error("cannot reshape array of size {len} into shape {shape:?}")]
    ShapeMismatch { shape: Vec<usize>, len: usize },

    #[error("expected a 2-dimensional array, got {0} dimension(s)")]
    UnsupportedDims(usize),

    #[error("Incompatible sizes for matrix multiplication: {left:?} x {right:?}")]
    IncompatibleSizes { left: (usize, usize), right: (usize, usize) },

    #[error("frame has no pixels")]
    EmptyFrame,

    #[error("background model has not seen a frame yet")]
    NotInitialized,

    #[error("invalid background subtractor parameters: {0}")]
    InvalidParams(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}
