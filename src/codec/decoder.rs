// src/codec/decoder.rs

use super::chunk::{ChannelPlan, ChunkDecoder};
use super::transform::{idct4x4, iwht4x4, lbt_post4, lbt_post4x4};
use super::constants::STRIPE_ROWS;
use super::window::{StripeWindow, WINDOW_ROWS};
use crate::format::header::{ChannelSetup, Geometry, StreamHeader};
use crate::image::pixel;
use crate::utils::alloc::{DEFAULT_MAX_MEMORY, MemoryBudget, try_alloc_vec};
use crate::utils::error::{FriedError, Result};
use log::{debug, info, warn};

/// A decoded image with interleaved pixels.
///
/// Color images are BGRA (4 bytes per pixel); gray images are (gray,
/// alpha) pairs. Alpha is 255 when the stream carries none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub setup: ChannelSetup,
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    pub fn bytes_per_pixel(&self) -> usize {
        self.setup.bytes_per_pixel()
    }

    /// The pixels as tightly packed RGBA.
    pub fn to_rgba(&self) -> Vec<u8> {
        if self.setup.is_color() {
            let mut rgba = self.pixels.clone();
            pixel::swap_red_blue(&mut rgba);
            rgba
        } else {
            pixel::gray_alpha_to_rgba(&self.pixels)
        }
    }
}

/// Decodes a complete FRIED stream. Bytes after the last stripe are ignored.
///
/// Working memory is capped at [`DEFAULT_MAX_MEMORY`]; see
/// [`decode_with_limit`].
pub fn decode(data: &[u8]) -> Result<DecodedImage> {
    decode_with_limit(data, DEFAULT_MAX_MEMORY)
}

/// Decodes a stream, refusing headers whose window and output buffers
/// would need more than `max_memory` bytes.
pub fn decode_with_limit(data: &[u8], max_memory: usize) -> Result<DecodedImage> {
    let (header, header_len) = StreamHeader::parse(data).inspect_err(|e| warn!("FRIED decode: {e}"))?;
    let setup = header.setup()?;
    let geometry = header.geometry();

    // Every stripe needs at least a length and a count byte per channel in
    // each chunk; reject hopeless inputs before allocating for them.
    let floor = geometry.stripe_count() * geometry.chunk_count() * (2 + header.channels.len());
    if data.len() - header_len < floor {
        warn!(
            "FRIED decode: {} payload bytes cannot hold {} stripes",
            data.len() - header_len,
            geometry.stripe_count()
        );
        return Err(FriedError::Truncated("stripe data"));
    }

    let chans = header.channels.len();
    let mut budget = MemoryBudget::new(max_memory);
    budget
        .add::<i16>(geometry.padded_width.saturating_mul(chans).saturating_mul(WINDOW_ROWS))
        .add::<i16>(2 * STRIPE_ROWS * geometry.chunk_width)
        .add::<u8>(geometry.width.saturating_mul(geometry.height).saturating_mul(setup.bytes_per_pixel()));
    budget.check().inspect_err(|e| warn!("FRIED decode: {e}"))?;

    info!(
        "FRIED decode: {}x{} (padded {}x{}), {:?}",
        geometry.width, geometry.height, geometry.padded_width, geometry.padded_height, setup
    );

    let mut session = DecodeSession::new(&header, geometry, setup)?;
    session.run(&data[header_len..]).inspect_err(|e| warn!("FRIED decode: {e}"))?;

    Ok(DecodedImage {
        width: geometry.width as u32,
        height: geometry.height as u32,
        setup,
        pixels: session.pixels,
    })
}

struct DecodeSession {
    geometry: Geometry,
    setup: ChannelSetup,
    offsets: Vec<usize>,
    window: StripeWindow<i16>,
    chunks: ChunkDecoder,
    pixels: Vec<u8>,
}

impl DecodeSession {
    fn new(header: &StreamHeader, geometry: Geometry, setup: ChannelSetup) -> Result<Self> {
        let plans: Vec<ChannelPlan> = header.channels.iter().map(ChannelPlan::from).collect();
        Ok(Self {
            geometry,
            setup,
            offsets: plans.iter().map(|p| p.stripe_offset).collect(),
            window: StripeWindow::new(geometry.padded_width * plans.len())?,
            chunks: ChunkDecoder::new(geometry, plans),
            pixels: try_alloc_vec(geometry.width * geometry.height * setup.bytes_per_pixel(), "decoded pixels")?,
        })
    }

    /// Mirrors the encoder's schedule: stripes are decoded one ahead into
    /// window rows 16..32 and rows leave the window once every filter
    /// touching them has run.
    fn run(&mut self, data: &[u8]) -> Result<usize> {
        let rows = self.geometry.padded_height;
        let width = self.geometry.padded_width;
        let mut pos = 0;
        let mut stripe = 0;
        let mut slot = 16;
        let mut phase = 2;

        for row in 0..rows {
            if row == 0 {
                pos += self.load_stripe(stripe, &data[pos..])?;
                stripe += 1;
                for i in 0..self.offsets.len() {
                    inverse_first_band(&mut self.window, self.offsets[i], width);
                }
            }

            if slot == 16 {
                self.window.flip();
                slot = 0;
                if row != rows - 16 {
                    pos += self.load_stripe(stripe, &data[pos..])?;
                    stripe += 1;
                    for i in 0..self.offsets.len() {
                        inverse_macroblocks(&mut self.window, self.offsets[i], width, 16);
                    }
                }
            }

            if phase == 4 && row != rows - 2 {
                for i in 0..self.offsets.len() {
                    inverse_band(&mut self.window, self.offsets[i], width, slot, row == rows - 6);
                }
                phase = 0;
            }

            self.store_row(row, slot);
            phase += 1;
            slot += 1;
        }
        Ok(pos)
    }

    fn load_stripe(&mut self, stripe: usize, data: &[u8]) -> Result<usize> {
        let n = self.chunks.decode_stripe(data, &mut self.window)?;
        debug!("stripe {stripe}: {n} bytes");
        Ok(n)
    }

    fn store_row(&mut self, row: usize, slot: usize) {
        let Geometry { width, height, padded_width, .. } = self.geometry;
        if row >= height {
            return;
        }
        let stride = width * self.setup.bytes_per_pixel();
        let dst = &mut self.pixels[row * stride..(row + 1) * stride];
        pixel::inverse_row(self.setup, self.window.row(slot), width, padded_width, dst);
    }
}

/// First stripe: macroblock inverse, the first block row, and the
/// horizontal post-filter of the top two image rows.
fn inverse_first_band(w: &mut StripeWindow<i16>, base: usize, width: usize) {
    inverse_macroblocks(w, base, width, 16);

    w.map_block(16, base, 1, idct4x4);
    w.scale_corner(16, base);
    let mut col = 4;
    while col < width {
        w.map_block(16, base + col, 1, idct4x4);
        w.map_row4(16, base + col - 2, lbt_post4);
        w.map_row4(17, base + col - 2, lbt_post4);
        col += 4;
    }
    w.scale_corner(16, base + width - 2);
}

fn inverse_macroblocks(w: &mut StripeWindow<i16>, base: usize, width: usize, top: usize) {
    for col in (0..width).step_by(16) {
        w.map_block(top, base + col, 4, iwht4x4);
    }
}

/// Inverse DCT of the block row starting two rows below `slot`, then the
/// lapped post-filter of the 4-row band at `slot`. `bottom` also finishes
/// the last two image rows.
fn inverse_band(w: &mut StripeWindow<i16>, base: usize, width: usize, slot: usize, bottom: bool) {
    let blocks = slot + 2;
    let tail = slot + 4;

    w.map_block(blocks, base, 1, idct4x4);
    for c in 0..2 {
        w.map_col4(slot, base + c, lbt_post4);
    }
    if bottom {
        w.scale_corner(tail, base);
    }

    let mut col = 4;
    while col < width {
        w.map_block(blocks, base + col, 1, idct4x4);
        w.map_block(slot, base + col - 2, 1, lbt_post4x4);
        if bottom {
            w.map_row4(tail, base + col - 2, lbt_post4);
            w.map_row4(tail + 1, base + col - 2, lbt_post4);
        }
        col += 4;
    }

    for c in width - 2..width {
        w.map_col4(slot, base + c, lbt_post4);
    }
    if bottom {
        w.scale_corner(tail, base + width - 2);
    }
}
