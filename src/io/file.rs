// src/io/file.rs
//! File conversion between FRIED streams and the formats the `image` crate
//! understands.

use std::fs;
use std::path::Path;

use ::image::RgbaImage;
use log::info;

use crate::codec::decoder::decode;
use crate::codec::encoder::{EncodeFlags, EncodeParams, encode};
use crate::image::pixel;
use crate::utils::error::{FriedError, Result};

/// Reads any image `image` can open and writes it as a color + alpha FRIED
/// stream at the given quantizer.
pub fn encode_file(input: &Path, output: &Path, quality: u8) -> Result<usize> {
    let rgba = ::image::open(input)?.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut bgra = rgba.into_raw();
    pixel::swap_red_blue(&mut bgra);

    let params = EncodeParams { flags: EncodeFlags::SAVE_ALPHA, quality };
    let stream = encode(&bgra, width, height, &params)?;
    fs::write(output, &stream)?;
    info!("{} -> {}: {} bytes", input.display(), output.display(), stream.len());
    Ok(stream.len())
}

/// Decodes a FRIED file and saves it in the format implied by the output
/// extension.
pub fn decode_file(input: &Path, output: &Path) -> Result<()> {
    let data = fs::read(input)?;
    let image = decode(&data)?;
    let rgba = RgbaImage::from_raw(image.width, image.height, image.to_rgba())
        .ok_or_else(|| FriedError::InvalidArgument("decoded pixel buffer does not match its size".into()))?;
    rgba.save(output)?;
    info!("{} -> {}: {}x{}", input.display(), output.display(), image.width, image.height);
    Ok(())
}
