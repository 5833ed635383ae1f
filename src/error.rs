use thiserror::Error;

pub type Result<T> = std::result::Result<T, MatrixError>;

/// Everything that can go wrong while loading the digits table or operating on it
#[derive(Debug, Error)]
pub enum MatrixError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("download of '{url}' failed: {reason}")]
    Http { url: String, reason: String },

    #[error("line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error("line {line}, column {column}: pixel value {value} outside [0, 255]")]
    PixelOutOfRange { line: usize, column: usize, value: f64 },

    #[error("line {line}: label {value} is not a digit")]
    LabelOutOfRange { line: usize, value: f64 },

    #[error("expected {expected} values, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("incompatible dimensions {left:?} and {right:?}")]
    DimensionMismatch {
        left: (usize, usize),
        right: (usize, usize),
    },

    #[error("matrix is {nrows}x{ncols}, expected a square matrix")]
    NotSquare { nrows: usize, ncols: usize },

    #[error("matrix is singular")]
    Singular,

    #[error("{nrows}x{ncols} system has fewer rows than columns")]
    Underdetermined { nrows: usize, ncols: usize },

    #[error("empty input")]
    Empty,
}
