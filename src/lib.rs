//! # FRIED image codec
//!
//! A Rust implementation of the FRIED lossy still-image format. Pixels are
//! converted to luma/chroma planes, run through an integer lapped transform
//! inside a sliding 32-row window, quantized, and packed chunk by chunk with
//! an adaptive run-length/Golomb-Rice coder.
//!
//! This library is organized into several modules:
//! - `utils`: error handling and fallible allocation
//! - `format`: stream and channel headers, padded geometry
//! - `image`: pixel colorspace conversion
//! - `codec`: bit I/O, RLGR entropy coding, quantization, transforms, and the
//!   stripe scheduler that drives them
//! - `io`: file-based wrapper over the `image` crate
//! - `ffi`: C ABI entry points

// Re-export commonly used types at the crate root
pub use utils::error::{FriedError, Result};

pub mod utils {
    pub mod alloc;
    pub mod error;
}

pub mod format {
    pub mod header;
}

pub mod image {
    pub mod pixel;
}

pub mod codec {
    pub mod bitbuffer;
    pub mod chunk;
    pub mod constants;
    pub mod decoder;
    pub mod encoder;
    pub mod quant;
    pub mod reorder;
    pub mod rlgr;
    pub mod transform;
    pub mod window;

    #[cfg(test)]
    mod tests;
}

pub mod io {
    pub mod file;
}

pub mod ffi {
    pub mod fried_ffi;
}

// Public API exports
pub use codec::decoder::{DecodedImage, decode, decode_with_limit};
pub use codec::encoder::{EncodeFlags, EncodeParams, encode};
pub use format::header::{ChannelSetup, ChannelType, FRIED_FILE_VERSION};
pub use utils::alloc::DEFAULT_MAX_MEMORY;

/// Returns the stream tag this build reads and writes.
pub fn supported_file_version() -> &'static str {
    "FRIED002"
}

/// Builds the process-wide lookup tables (Golomb decode tables and
/// quantizer scale tables). Calling it is optional; the tables are also
/// built on first use. Safe to call any number of times from any thread.
pub fn init() {
    codec::rlgr::golomb_tables();
    codec::quant::quant_tables();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init();
        init();
        let a = codec::quant::quant_tables() as *const _;
        let b = codec::quant::quant_tables() as *const _;
        assert_eq!(a, b);
    }

    #[test]
    fn test_version() {
        assert_eq!(supported_file_version().as_bytes(), &FRIED_FILE_VERSION[..]);
    }
}
