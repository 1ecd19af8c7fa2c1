use thiserror::Error;

/// Main error type for the FRIED codec.
#[derive(Error, Debug)]
pub enum FriedError {
    /// The stream does not start with the expected format tag.
    #[error("Bad signature: stream is not FRIED002")]
    BadSignature,
    /// Zero channels, or more than the format allows.
    #[error("Unsupported channel count: {0}")]
    TooManyChannels(usize),
    /// The channel types do not form one of the accepted layouts.
    #[error("Unsupported channel layout: {0}")]
    UnsupportedChannelLayout(String),
    /// A header field is out of range or inconsistent with the geometry.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),
    /// A length, count, or entropy-coded segment runs past the available bytes.
    #[error("Truncated stream: {0}")]
    Truncated(&'static str),
    /// A chunk's declared byte length disagrees with what its channels used.
    #[error("Chunk length mismatch: declared {expected} bytes, decoded {actual}")]
    ChunkLengthMismatch { expected: usize, actual: usize },
    /// The payload is internally inconsistent.
    #[error("Corrupt payload: {0}")]
    Corrupt(String),
    /// Decoding would need more working memory than the configured budget.
    #[error("Image too large: decoding needs {bytes} bytes, limit is {limit}")]
    ImageTooLarge { bytes: usize, limit: usize },
    /// The allocator refused a buffer.
    #[error("Allocation of {bytes} bytes failed for {context}")]
    AllocationFailed { bytes: usize, context: &'static str },
    /// The encoder ran out of room in its pre-sized output buffer.
    #[error("Encoded data exceeds the output buffer")]
    OutputOverflow,
    /// An invalid argument was provided
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// An I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The file wrapper could not load or save an image.
    #[error("Image error: {0}")]
    Image(#[from] ::image::ImageError),
}

/// A specialized `Result` type for FRIED operations.
pub type Result<T> = std::result::Result<T, FriedError>;
