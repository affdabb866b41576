use thiserror::Error;

/// Failure to turn a byte buffer into a [`Program`](crate::format::Program).
///
/// A load either fully succeeds or returns one of these; nothing is partially
/// constructed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("not an IFF container: expected 'FORM', found {found:?}")]
    InvalidHeader { found: String },

    #[error("unsupported form type: expected 'AVFS', found {found:?}")]
    UnsupportedForm { found: String },

    #[error("chunk {chunk:?} declares {declared} bytes but only {available} remain")]
    Truncated {
        chunk: String,
        declared: usize,
        available: usize,
    },

    #[error("required chunk {0:?} is missing")]
    MissingChunk(&'static str),

    #[error("chunk {chunk:?} has odd size {size}, expected whole 16-bit words")]
    OddChunkSize { chunk: &'static str, size: usize },

    #[error("function {index} starts at word 0x{offset:X}, which is not a record boundary")]
    InvalidFunctionOffset { index: usize, offset: usize },

    #[error("malformed instruction at word 0x{offset:X}: {reason}")]
    MalformedInstruction { offset: usize, reason: String },
}

/// Returned by the host when an animation resource cannot be opened.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OpenError {
    #[error("animation resource not found: {0}")]
    NotFound(String),

    #[error("failed to open animation {path}: {reason}")]
    Failed { path: String, reason: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlotError {
    #[error("animation slot {0} is out of range")]
    OutOfRange(usize),

    #[error("animation slot {0} is already open")]
    AlreadyOpen(usize),

    #[error("animation slot {0} is not open")]
    NotOpen(usize),

    #[error(transparent)]
    Open(#[from] OpenError),
}
