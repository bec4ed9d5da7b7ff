use thiserror::Error;

/// Errors surfaced by the evolution engine.
///
/// `Config` covers everything that makes a run invalid before it starts
/// (missing target, zero population, mismatched parents). I/O and decode
/// failures are fatal for a run; checkpoint write failures are handled by
/// the reporting stage and never reach the caller.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration: {0}")]
    Config(String),

    #[error("image: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("serialization: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, Error>;
