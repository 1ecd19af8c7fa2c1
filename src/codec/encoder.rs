// src/codec/encoder.rs

use super::chunk::{ChannelPlan, ChunkEncoder};
use super::transform::{fdct4x4, fwht4x4, lbt_pre4, lbt_pre4x4};
use super::window::StripeWindow;
use crate::format::header::{ChannelSetup, Geometry, StreamHeader};
use crate::image::pixel;
use crate::utils::error::{FriedError, Result};
use bitflags::bitflags;
use log::{debug, info};

bitflags! {
    /// Channel selection for [`encode`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct EncodeFlags: u32 {
        /// Input is (gray, alpha) pairs and only luma is coded.
        const GRAYSCALE  = 1 << 0;
        /// Code the alpha channel as well.
        const SAVE_ALPHA = 1 << 1;
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EncodeParams {
    pub flags: EncodeFlags,
    /// Quantizer byte: `q & 7` picks the step mantissa, `q >> 3` doubles the
    /// step that many times. 0 is the finest setting.
    pub quality: u8,
}

impl Default for EncodeParams {
    fn default() -> Self {
        Self { flags: EncodeFlags::empty(), quality: 31 }
    }
}

impl EncodeParams {
    pub fn channel_setup(&self) -> ChannelSetup {
        let gray = self.flags.contains(EncodeFlags::GRAYSCALE);
        let alpha = self.flags.contains(EncodeFlags::SAVE_ALPHA);
        match (gray, alpha) {
            (true, false) => ChannelSetup::Gray,
            (true, true) => ChannelSetup::GrayAlpha,
            (false, false) => ChannelSetup::Color,
            (false, true) => ChannelSetup::ColorAlpha,
        }
    }
}

/// Encodes interleaved pixels into a complete FRIED stream.
///
/// Color input is BGRA (4 bytes per pixel); with [`EncodeFlags::GRAYSCALE`]
/// input is (gray, alpha) pairs (2 bytes per pixel). Rows are tightly packed.
pub fn encode(pixels: &[u8], width: u32, height: u32, params: &EncodeParams) -> Result<Vec<u8>> {
    let setup = params.channel_setup();
    let header = StreamHeader::new(width, height, setup, params.quality)?;
    let geometry = header.geometry();

    let expected = geometry.width * geometry.height * setup.bytes_per_pixel();
    if pixels.len() != expected {
        return Err(FriedError::InvalidArgument(format!(
            "pixel buffer holds {} bytes, a {width}x{height} {setup:?} image needs {expected}",
            pixels.len()
        )));
    }

    info!(
        "FRIED encode: {}x{} (padded {}x{}), {:?}, quality {}",
        width, height, geometry.padded_width, geometry.padded_height, setup, params.quality
    );

    let chans = setup.channel_count();
    let capacity = header.encoded_len()
        + geometry.padded_width * geometry.padded_height * chans * 3
        + (1 << 20);
    let mut out = Vec::with_capacity(capacity);
    header.write_to(&mut out)?;
    let header_len = out.len();
    out.resize(capacity, 0);

    let mut session = EncodeSession::new(&header, geometry, setup, pixels)?;
    let written = session.run(&mut out[header_len..])?;
    out.truncate(header_len + written);

    info!("FRIED encode: {} bytes", out.len());
    Ok(out)
}

/// Row-by-row encoder state for one image.
struct EncodeSession<'a> {
    geometry: Geometry,
    setup: ChannelSetup,
    pixels: &'a [u8],
    offsets: Vec<usize>,
    window: StripeWindow<i32>,
    chunks: ChunkEncoder,
}

impl<'a> EncodeSession<'a> {
    fn new(header: &StreamHeader, geometry: Geometry, setup: ChannelSetup, pixels: &'a [u8]) -> Result<Self> {
        let plans: Vec<ChannelPlan> = header.channels.iter().map(ChannelPlan::from).collect();
        Ok(Self {
            geometry,
            setup,
            pixels,
            offsets: plans.iter().map(|p| p.stripe_offset).collect(),
            window: StripeWindow::new(geometry.padded_width * plans.len())?,
            chunks: ChunkEncoder::new(geometry, plans),
        })
    }

    /// Pulls every padded row through the window, emitting a stripe each
    /// time 16 rows are fully transformed.
    fn run(&mut self, out: &mut [u8]) -> Result<usize> {
        let rows = self.geometry.padded_height;
        let mut pos = 0;
        let mut stripe = 0;
        let mut slot = 0;
        // Rows since the last vertical band; the first band fires at row 5.
        let mut phase = -1;

        for row in 0..rows {
            self.load_row(row, slot);

            if phase == 4 {
                for i in 0..self.offsets.len() {
                    forward_band(&mut self.window, self.offsets[i], self.geometry.padded_width, slot, row == 5);
                }
                phase = 0;
            }

            if slot == 31 {
                for i in 0..self.offsets.len() {
                    forward_macroblocks(&mut self.window, self.offsets[i], self.geometry.padded_width, 0);
                }
                pos += self.emit_stripe(stripe, &mut out[pos..])?;
                stripe += 1;
                self.window.flip();
                slot = 15;
            }

            if row == rows - 1 {
                for i in 0..self.offsets.len() {
                    forward_last_band(&mut self.window, self.offsets[i], self.geometry.padded_width, slot);
                }
                pos += self.emit_stripe(stripe, &mut out[pos..])?;
            }

            phase += 1;
            slot += 1;
        }
        Ok(pos)
    }

    fn emit_stripe(&mut self, stripe: usize, out: &mut [u8]) -> Result<usize> {
        let n = self.chunks.encode_stripe(&self.window, out)?;
        debug!("stripe {stripe}: {n} bytes");
        Ok(n)
    }

    fn load_row(&mut self, row: usize, slot: usize) {
        let Geometry { width, height, padded_width, .. } = self.geometry;
        let dst = self.window.row_mut(slot);
        if row < height {
            let stride = width * self.setup.bytes_per_pixel();
            let src = &self.pixels[row * stride..(row + 1) * stride];
            pixel::forward_row(self.setup, src, width, padded_width, dst);
        } else {
            dst.fill(0);
        }
    }
}

/// Lapped pre-filtering of the 4-row band ending at `slot`, then the DCT
/// of the block row two rows above it. `top` also filters the first two
/// image rows horizontally.
fn forward_band(w: &mut StripeWindow<i32>, base: usize, width: usize, slot: usize, top: bool) {
    let above = slot - 5;
    let band = slot - 3;

    for c in 0..2 {
        w.map_col4(band, base + c, lbt_pre4);
    }
    let mut col = 0;
    while col < width - 4 {
        if top {
            w.map_row4(above, base + col + 2, lbt_pre4);
            w.map_row4(above + 1, base + col + 2, lbt_pre4);
        }
        w.map_block(band, base + col + 2, 1, lbt_pre4x4);
        w.map_block(above, base + col, 1, fdct4x4);
        col += 4;
    }
    for c in col + 2..col + 4 {
        w.map_col4(band, base + c, lbt_pre4);
    }
    w.map_block(above, base + col, 1, fdct4x4);
}

/// Walsh-Hadamard transform over the block DCs of each macroblock in the
/// stripe starting at `top`.
fn forward_macroblocks(w: &mut StripeWindow<i32>, base: usize, width: usize, top: usize) {
    for col in (0..width).step_by(16) {
        w.map_block(top, base + col, 4, fwht4x4);
    }
}

/// Final rows of the image: horizontal filtering of the last two rows, the
/// last block row, and the last stripe's macroblocks.
fn forward_last_band(w: &mut StripeWindow<i32>, base: usize, width: usize, slot: usize) {
    let blocks = slot - 3;
    let mut col = 0;
    while col < width - 4 {
        w.map_row4(slot - 1, base + col + 2, lbt_pre4);
        w.map_row4(slot, base + col + 2, lbt_pre4);
        w.map_block(blocks, base + col, 1, fdct4x4);
        col += 4;
    }
    w.map_block(blocks, base + col, 1, fdct4x4);
    forward_macroblocks(w, base, width, slot - 15);
}
