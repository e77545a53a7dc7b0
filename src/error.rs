use thiserror::Error;

/// Errors surfaced by the plate reading pipeline.
///
/// Unreadable plates are not errors; they reconcile to an empty reading.
/// Nothing in the pipeline retries: a failure is either absorbed as an
/// empty result or returned to the immediate caller.
#[derive(Error, Debug)]
pub enum OcrError {
    /// The source image could not be loaded or decoded.
    #[error("image load")]
    ImageLoad(#[source] image::ImageError),

    /// A cropped plate image could not be written to disk.
    #[error("image save")]
    ImageSave(#[source] image::ImageError),

    /// Error indicating invalid input.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// Error from the ONNX Runtime session.
    #[error(transparent)]
    Session(#[from] ort::Error),

    /// Error from tensor reshaping.
    #[error("tensor shape")]
    Tensor(#[from] ndarray::ShapeError),

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),

    /// Result record serialization error.
    #[error("serialize results")]
    Json(#[from] serde_json::Error),
}

impl OcrError {
    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        OcrError::InvalidInput {
            message: message.into(),
        }
    }
}
