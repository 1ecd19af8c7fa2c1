// src/format/header.rs
//! Stream header, channel descriptors, and the padded geometry they imply.
//!
//! All multi-byte integers are little-endian. The stream header is the
//! 8-byte tag followed by width, height, and chunk width (`i32` each) and a
//! one-byte channel count; it is followed by one 10-byte descriptor per
//! channel (type, quantizer, stripe offset, chunk offset).

use crate::utils::error::{FriedError, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};
use std::ops::Deref;

/// Format tag at the start of every stream.
pub const FRIED_FILE_VERSION: &[u8; 8] = b"FRIED002";
/// Size of the fixed stream header in bytes.
pub const FILE_HEADER_SIZE: usize = 21;
/// Size of one channel descriptor in bytes.
pub const CHANNEL_HEADER_SIZE: usize = 10;
/// Upper bound on the channel count.
pub const MAX_CHANNELS: usize = 16;
/// Widest chunk the format allows.
pub const MAX_CHUNK_WIDTH: usize = 512;
/// Largest accepted width or height; keeps padded sizes inside `i32`.
pub const MAX_DIMENSION: u32 = (i32::MAX - 31) as u32;

/// Rounds a dimension up to a multiple of 32.
pub const fn pad32(v: usize) -> usize {
    (v + 31) & !31
}

/// Channel kinds as stored in the descriptor's type byte.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelType {
    Y = 1,
    Co = 2,
    Cg = 3,
    Alpha = 4,
}

impl TryFrom<u8> for ChannelType {
    type Error = FriedError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(ChannelType::Y),
            2 => Ok(ChannelType::Co),
            3 => Ok(ChannelType::Cg),
            4 => Ok(ChannelType::Alpha),
            other => Err(FriedError::UnsupportedChannelLayout(format!(
                "unknown channel type {other}"
            ))),
        }
    }
}

/// The channel combinations a stream may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelSetup {
    /// Luma only.
    Gray,
    /// Luma plus alpha.
    GrayAlpha,
    /// Luma and two chroma planes.
    Color,
    /// Luma, two chroma planes, and alpha.
    ColorAlpha,
}

impl ChannelSetup {
    pub fn from_types(types: &[ChannelType]) -> Result<Self> {
        use ChannelType::*;
        match types {
            [Y] => Ok(ChannelSetup::Gray),
            [Y, Alpha] => Ok(ChannelSetup::GrayAlpha),
            [Y, Co, Cg] => Ok(ChannelSetup::Color),
            [Y, Co, Cg, Alpha] => Ok(ChannelSetup::ColorAlpha),
            other => Err(FriedError::UnsupportedChannelLayout(format!("{other:?}"))),
        }
    }

    /// Channel types in stream order.
    pub fn channel_types(self) -> &'static [ChannelType] {
        use ChannelType::*;
        match self {
            ChannelSetup::Gray => &[Y],
            ChannelSetup::GrayAlpha => &[Y, Alpha],
            ChannelSetup::Color => &[Y, Co, Cg],
            ChannelSetup::ColorAlpha => &[Y, Co, Cg, Alpha],
        }
    }

    pub fn channel_count(self) -> usize {
        self.channel_types().len()
    }

    pub fn is_color(self) -> bool {
        matches!(self, ChannelSetup::Color | ChannelSetup::ColorAlpha)
    }

    pub fn has_alpha(self) -> bool {
        matches!(self, ChannelSetup::GrayAlpha | ChannelSetup::ColorAlpha)
    }

    /// Interleaved bytes per pixel at the API boundary: gray images are
    /// (gray, alpha) pairs, color images are BGRA quads.
    pub fn bytes_per_pixel(self) -> usize {
        if self.is_color() { 4 } else { 2 }
    }
}

/// One channel descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelHeader {
    pub channel_type: ChannelType,
    pub quantizer: u8,
    /// Offset of this channel inside a window row (`channel * padded_width`).
    pub stripe_offset: i32,
    /// Offset of this channel inside a chunk buffer (`channel * chunk_width * 16`).
    pub chunk_offset: i32,
}

/// Ordered channel descriptors, bounded by [`MAX_CHANNELS`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelList(Vec<ChannelHeader>);

impl ChannelList {
    pub fn new() -> Self {
        Self(Vec::with_capacity(4))
    }

    pub fn push(&mut self, header: ChannelHeader) -> Result<()> {
        if self.0.len() == MAX_CHANNELS {
            return Err(FriedError::TooManyChannels(MAX_CHANNELS + 1));
        }
        self.0.push(header);
        Ok(())
    }

    pub fn types(&self) -> Vec<ChannelType> {
        self.0.iter().map(|c| c.channel_type).collect()
    }
}

impl Deref for ChannelList {
    type Target = [ChannelHeader];

    fn deref(&self) -> &[ChannelHeader] {
        &self.0
    }
}

/// Image dimensions padded to whole 32×32 blocks, plus the chunk width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub width: usize,
    pub height: usize,
    pub padded_width: usize,
    pub padded_height: usize,
    pub chunk_width: usize,
}

impl Geometry {
    pub fn new(width: usize, height: usize) -> Self {
        let padded_width = pad32(width);
        Self {
            width,
            height,
            padded_width,
            padded_height: pad32(height),
            chunk_width: padded_width.min(MAX_CHUNK_WIDTH),
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.padded_width.div_ceil(self.chunk_width)
    }

    pub fn stripe_count(&self) -> usize {
        self.padded_height / 16
    }
}

/// The parsed or to-be-written stream header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHeader {
    pub width: i32,
    pub height: i32,
    pub chunk_width: i32,
    pub channels: ChannelList,
}

fn truncated(what: &'static str) -> impl Fn(io::Error) -> FriedError {
    move |e| match e.kind() {
        io::ErrorKind::UnexpectedEof => FriedError::Truncated(what),
        _ => FriedError::Io(e),
    }
}

impl StreamHeader {
    /// Builds the header for an image, deriving chunk width and offsets.
    pub fn new(width: u32, height: u32, setup: ChannelSetup, quantizer: u8) -> Result<Self> {
        if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(FriedError::InvalidArgument(format!(
                "image dimensions {width}x{height} out of range"
            )));
        }
        let geometry = Geometry::new(width as usize, height as usize);
        let mut channels = ChannelList::new();
        for (index, &channel_type) in setup.channel_types().iter().enumerate() {
            channels.push(ChannelHeader {
                channel_type,
                quantizer,
                stripe_offset: (index * geometry.padded_width) as i32,
                chunk_offset: (index * geometry.chunk_width * 16) as i32,
            })?;
        }
        Ok(Self {
            width: width as i32,
            height: height as i32,
            chunk_width: geometry.chunk_width as i32,
            channels,
        })
    }

    pub fn geometry(&self) -> Geometry {
        let mut geometry = Geometry::new(self.width as usize, self.height as usize);
        geometry.chunk_width = self.chunk_width as usize;
        geometry
    }

    pub fn setup(&self) -> Result<ChannelSetup> {
        ChannelSetup::from_types(&self.channels.types())
    }

    /// Bytes occupied by the header and all channel descriptors.
    pub fn encoded_len(&self) -> usize {
        FILE_HEADER_SIZE + CHANNEL_HEADER_SIZE * self.channels.len()
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(FRIED_FILE_VERSION)?;
        w.write_i32::<LittleEndian>(self.width)?;
        w.write_i32::<LittleEndian>(self.height)?;
        w.write_i32::<LittleEndian>(self.chunk_width)?;
        w.write_u8(self.channels.len() as u8)?;
        for channel in self.channels.iter() {
            w.write_u8(channel.channel_type as u8)?;
            w.write_u8(channel.quantizer)?;
            w.write_i32::<LittleEndian>(channel.stripe_offset)?;
            w.write_i32::<LittleEndian>(channel.chunk_offset)?;
        }
        Ok(())
    }

    /// Parses and validates a header, returning it with the number of bytes
    /// it occupied.
    pub fn parse(data: &[u8]) -> Result<(Self, usize)> {
        if data.len() < FILE_HEADER_SIZE {
            return Err(FriedError::Truncated("stream header"));
        }
        if &data[..8] != FRIED_FILE_VERSION {
            return Err(FriedError::BadSignature);
        }

        let mut rd = &data[8..];
        let width = rd.read_i32::<LittleEndian>().map_err(truncated("stream header"))?;
        let height = rd.read_i32::<LittleEndian>().map_err(truncated("stream header"))?;
        let chunk_width = rd.read_i32::<LittleEndian>().map_err(truncated("stream header"))?;
        let count = rd.read_u8().map_err(truncated("stream header"))? as usize;
        if count == 0 || count > MAX_CHANNELS {
            return Err(FriedError::TooManyChannels(count));
        }

        let mut channels = ChannelList::new();
        for _ in 0..count {
            let mut desc = [0u8; CHANNEL_HEADER_SIZE];
            rd.read_exact(&mut desc).map_err(truncated("channel descriptor"))?;
            let mut fields = &desc[2..];
            channels.push(ChannelHeader {
                channel_type: ChannelType::try_from(desc[0])?,
                quantizer: desc[1],
                stripe_offset: fields.read_i32::<LittleEndian>()?,
                chunk_offset: fields.read_i32::<LittleEndian>()?,
            })?;
        }

        let header = Self { width, height, chunk_width, channels };
        header.validate()?;
        let consumed = header.encoded_len();
        Ok((header, consumed))
    }

    fn validate(&self) -> Result<()> {
        self.setup()?;
        if self.width <= 0
            || self.height <= 0
            || self.width as u32 > MAX_DIMENSION
            || self.height as u32 > MAX_DIMENSION
        {
            return Err(FriedError::InvalidHeader(format!(
                "image dimensions {}x{} out of range",
                self.width, self.height
            )));
        }
        let cw = self.chunk_width;
        if cw <= 0 || cw % 16 != 0 || cw as usize > MAX_CHUNK_WIDTH {
            return Err(FriedError::InvalidHeader(format!("chunk width {cw}")));
        }

        let geometry = self.geometry();
        for (index, channel) in self.channels.iter().enumerate() {
            let stripe = index * geometry.padded_width;
            let chunk = index * geometry.chunk_width * 16;
            if channel.stripe_offset as i64 != stripe as i64
                || channel.chunk_offset as i64 != chunk as i64
            {
                return Err(FriedError::InvalidHeader(format!(
                    "channel {index} offsets ({}, {}) do not match the geometry",
                    channel.stripe_offset, channel.chunk_offset
                )));
            }
        }
        Ok(())
    }
}
