use thiserror::Error;

/// Every failure the facade can surface, each carrying its cause.
#[derive(Debug, Error)]
pub enum Error {
    #[error("classification failed: {0}")]
    Classification(#[from] vdelta_types::ClassificationError),

    #[error("diff failed: {0}")]
    DiffComputation(#[from] vdelta_diff::DiffError),

    #[error("apply failed: {0}")]
    Apply(#[from] vdelta_patch::ApplyError),

    #[error("codec error: {0}")]
    Codec(#[from] vdelta_types::CodecError),
}

pub type Result<T> = std::result::Result<T, Error>;
