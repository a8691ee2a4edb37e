// error.rs
use std::io;
use thiserror::Error;

/// Failure to turn a percentage into a byte count.
#[derive(Error, Debug)]
pub enum EstimationError {
    #[error("no input file selected")]
    NoFile,
    #[error("cannot read input file: {0}")]
    Unreadable(#[from] io::Error),
}

#[derive(Error, Debug)]
pub enum CompressError {
    #[error("A target size is required.")]
    TargetSizeRequired,
    #[error("No input image selected.")]
    NoInput,
    #[error(transparent)]
    Estimation(#[from] EstimationError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),
}
