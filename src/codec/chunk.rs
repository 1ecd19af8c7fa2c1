// src/codec/chunk.rs
//! Chunk-level coefficient coding.
//!
//! A stripe is cut into chunks of up to `chunk_width` columns. Each chunk is
//! a little-endian `u16` byte length (counting itself) followed by one
//! record per channel: a coefficient count, the RLGR-coded low band
//! (group 0, macroblock DCs delta-coded), and the RLGR-coded remainder.
//!
//! The count is rounded up to a multiple of 8 and stored divided by 4,
//! in one byte when it is below 1016 (low bit clear), otherwise as a
//! `u16` with the low bit set.

use super::constants::{AC_SEED, DC_SEED, MACROBLOCK, STRIPE_ROWS};
use super::window::StripeWindow;
use super::{quant, reorder, rlgr};
use crate::format::header::{ChannelHeader, Geometry};
use crate::utils::error::{FriedError, Result};
use log::{trace, warn};

const LONG_COUNT_THRESHOLD: usize = 127 * 8;

/// A channel as the chunk coder sees it.
#[derive(Debug, Clone, Copy)]
pub struct ChannelPlan {
    pub stripe_offset: usize,
    pub quantizer: u8,
}

impl From<&ChannelHeader> for ChannelPlan {
    fn from(h: &ChannelHeader) -> Self {
        Self { stripe_offset: h.stripe_offset as usize, quantizer: h.quantizer }
    }
}

#[inline]
fn seeds(quantizer: u8) -> (u32, u32) {
    let shift = (quantizer >> 3) as u32;
    (DC_SEED >> shift, AC_SEED >> shift)
}

fn put(out: &mut [u8], pos: &mut usize, bytes: &[u8]) -> Result<()> {
    let dst = out
        .get_mut(*pos..*pos + bytes.len())
        .ok_or(FriedError::OutputOverflow)?;
    dst.copy_from_slice(bytes);
    *pos += bytes.len();
    Ok(())
}

/// Encodes stripes from window rows 0..16.
pub struct ChunkEncoder {
    geometry: Geometry,
    channels: Vec<ChannelPlan>,
    spatial: Vec<i32>,
    coeffs: Vec<i32>,
}

impl ChunkEncoder {
    pub fn new(geometry: Geometry, channels: Vec<ChannelPlan>) -> Self {
        let size = STRIPE_ROWS * geometry.chunk_width;
        Self { geometry, channels, spatial: vec![0; size], coeffs: vec![0; size] }
    }

    /// Writes every chunk of the stripe to `out`, returning the bytes used.
    pub fn encode_stripe(&mut self, window: &StripeWindow<i32>, out: &mut [u8]) -> Result<usize> {
        let Geometry { padded_width, chunk_width, .. } = self.geometry;
        let mut pos = 0;

        for chunk in 0..self.geometry.chunk_count() {
            let x0 = chunk * chunk_width;
            let cwidth = chunk_width.min(padded_width - x0);
            let start = pos;
            put(out, &mut pos, &[0, 0])?;

            for i in 0..self.channels.len() {
                let plan = self.channels[i];
                pos += self.encode_channel(window, plan, x0, cwidth, &mut out[pos..])?;
            }

            let len = u16::try_from(pos - start).map_err(|_| {
                warn!("chunk {chunk} needs {} bytes, more than a chunk can hold", pos - start);
                FriedError::OutputOverflow
            })?;
            out[start..start + 2].copy_from_slice(&len.to_le_bytes());
            trace!("chunk {chunk}: {} bytes", len);
        }
        Ok(pos)
    }

    fn encode_channel(
        &mut self,
        window: &StripeWindow<i32>,
        plan: ChannelPlan,
        x0: usize,
        cwidth: usize,
        out: &mut [u8],
    ) -> Result<usize> {
        let spatial = &mut self.spatial[..STRIPE_ROWS * cwidth];
        let coeffs = &mut self.coeffs[..STRIPE_ROWS * cwidth];
        let from = plan.stripe_offset + x0;
        for (r, dst) in spatial.chunks_exact_mut(cwidth).enumerate() {
            dst.copy_from_slice(&window.row(r)[from..from + cwidth]);
        }

        reorder::scan(spatial, coeffs, cwidth);
        let count = quant::quantize(plan.quantizer, coeffs, cwidth);

        // Macroblock DCs are coded as differences from their left neighbour.
        let dc_count = count.min(cwidth / MACROBLOCK);
        for n in (1..dc_count).rev() {
            coeffs[n] = (coeffs[n] - coeffs[n - 1]) as i16 as i32;
        }

        let padded = (count + 7) & !7;
        trace!("channel at {}, column {x0}: {count} coefficients", plan.stripe_offset);
        let mut pos = 0;
        if padded < LONG_COUNT_THRESHOLD {
            put(out, &mut pos, &[(padded >> 2) as u8])?;
        } else {
            put(out, &mut pos, &(((padded >> 2) + 1) as u16).to_le_bytes())?;
        }

        if padded > 0 {
            let (dc_seed, ac_seed) = seeds(plan.quantizer);
            let low = padded.min(cwidth);
            pos += rlgr::encode(&mut out[pos..], &coeffs[..low], dc_seed)?;
            if padded > cwidth {
                pos += rlgr::encode(&mut out[pos..], &coeffs[cwidth..padded], ac_seed)?;
            }
        }
        Ok(pos)
    }
}

/// Decodes stripes into window rows 16..32.
pub struct ChunkDecoder {
    geometry: Geometry,
    channels: Vec<ChannelPlan>,
    spatial: Vec<i16>,
    coeffs: Vec<i16>,
}

impl ChunkDecoder {
    pub fn new(geometry: Geometry, channels: Vec<ChannelPlan>) -> Self {
        let size = STRIPE_ROWS * geometry.chunk_width;
        Self { geometry, channels, spatial: vec![0; size], coeffs: vec![0; size] }
    }

    /// Reads every chunk of one stripe from the front of `data`, returning
    /// the bytes consumed.
    pub fn decode_stripe(&mut self, data: &[u8], window: &mut StripeWindow<i16>) -> Result<usize> {
        let Geometry { padded_width, chunk_width, .. } = self.geometry;
        let mut pos = 0;

        for chunk in 0..self.geometry.chunk_count() {
            let x0 = chunk * chunk_width;
            let cwidth = chunk_width.min(padded_width - x0);

            let header = data
                .get(pos..pos + 2)
                .ok_or(FriedError::Truncated("chunk length"))?;
            let len = u16::from_le_bytes([header[0], header[1]]) as usize;
            let end = pos + len;
            if len < 2 || end > data.len() {
                warn!("chunk {chunk} claims {len} bytes, {} available", data.len() - pos);
                return Err(FriedError::Truncated("chunk extends past end of stream"));
            }
            let body = &data[..end];
            let start = pos;
            pos += 2;

            for i in 0..self.channels.len() {
                let plan = self.channels[i];
                pos += self.decode_channel(&body[pos..], window, plan, x0, cwidth)?;
            }

            if pos != end {
                let used = pos - start;
                warn!("chunk {chunk} declared {len} bytes, decoded {used}");
                return Err(FriedError::ChunkLengthMismatch { expected: len, actual: used });
            }
            trace!("chunk {chunk}: {len} bytes");
        }
        Ok(pos)
    }

    fn decode_channel(
        &mut self,
        data: &[u8],
        window: &mut StripeWindow<i16>,
        plan: ChannelPlan,
        x0: usize,
        cwidth: usize,
    ) -> Result<usize> {
        let size = STRIPE_ROWS * cwidth;
        let first = *data.first().ok_or(FriedError::Truncated("coefficient count"))?;
        let (count, mut pos) = if first & 1 == 0 {
            (first as usize * 4, 1)
        } else {
            let second = *data.get(1).ok_or(FriedError::Truncated("coefficient count"))?;
            ((u16::from_le_bytes([first, second]) & !1) as usize * 4, 2)
        };
        if count > size {
            return Err(FriedError::Corrupt(format!(
                "coefficient count {count} exceeds chunk size {size}"
            )));
        }

        trace!("channel at {}, column {x0}: {count} coefficients", plan.stripe_offset);

        let coeffs = &mut self.coeffs[..size];
        coeffs.fill(0);
        if count > 0 {
            let (dc_seed, ac_seed) = seeds(plan.quantizer);
            let low = count.min(cwidth);
            pos += rlgr::decode(&data[pos..], &mut coeffs[..low], dc_seed)?;
            if count > cwidth {
                pos += rlgr::decode(&data[pos..], &mut coeffs[cwidth..count], ac_seed)?;
            }
        }

        let dc_count = count.min(cwidth / MACROBLOCK);
        for n in 1..dc_count {
            coeffs[n] = coeffs[n].wrapping_add(coeffs[n - 1]);
        }
        quant::dequantize(plan.quantizer, coeffs, count, cwidth);

        let spatial = &mut self.spatial[..size];
        reorder::unscan(coeffs, spatial, cwidth);
        let to = plan.stripe_offset + x0;
        for (r, src) in spatial.chunks_exact(cwidth).enumerate() {
            window.row_mut(STRIPE_ROWS + r)[to..to + cwidth].copy_from_slice(src);
        }
        Ok(pos)
    }
}
