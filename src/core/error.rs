// Copyright @yucwang 2026

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid resolution {width}x{height}")]
    InvalidResolution { width: usize, height: usize },
    #[error("invalid camera: {0}")]
    InvalidCamera(String),
    #[error("invalid render job: {0}")]
    InvalidJob(String),
    #[error("renderer has not been initialized")]
    NotInitialized,
    #[error("a render run is still in flight")]
    RenderInFlight,
    #[error("failed to spawn worker thread: {0}")]
    ThreadSpawn(#[from] std::io::Error),
}

pub type RenderResult<T> = Result<T, RenderError>;
