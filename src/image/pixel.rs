// src/image/pixel.rs
//! Row-level conversion between interleaved 8-bit pixels and the planar
//! signed samples the transform works on.
//!
//! Forward conversion centers each byte on zero and scales by 4. Color
//! input is BGRA and goes through a reversible YCoCg variant with green
//! doubled. Reconstructed samples carry an extra 4× gain from the lapped
//! post filters, so inverse conversion divides by 16 before re-centering.

use crate::format::header::ChannelSetup;

#[inline]
fn center(v: u8) -> i32 {
    (v as i32 - 128) << 2
}

#[inline]
fn clamp_pixel(v: i32) -> u8 {
    ((v >> 4) + 128).clamp(0, 255) as u8
}

/// Converts one image row into a window row laid out as consecutive
/// channel planes of `padded_width` samples each. Samples past `width`
/// are zeroed.
pub fn forward_row(
    setup: ChannelSetup,
    src: &[u8],
    width: usize,
    padded_width: usize,
    dst: &mut [i32],
) {
    let chans = setup.channel_count();
    let dst = &mut dst[..chans * padded_width];
    dst.fill(0);

    if setup.is_color() {
        let px: &[[u8; 4]] = bytemuck::cast_slice(&src[..width * 4]);
        let (y, rest) = dst.split_at_mut(padded_width);
        let (co, rest) = rest.split_at_mut(padded_width);
        let (cg, rest) = rest.split_at_mut(padded_width);
        for (x, &[b, g, r, a]) in px.iter().enumerate() {
            let (b, g, r) = (center(b), center(g) << 1, center(r));
            y[x] = (r + g + b + 2) >> 2;
            co[x] = (r - b) >> 1;
            cg[x] = (g - r - b + 2) >> 2;
            if setup.has_alpha() {
                rest[x] = center(a);
            }
        }
    } else {
        let px: &[[u8; 2]] = bytemuck::cast_slice(&src[..width * 2]);
        let (y, rest) = dst.split_at_mut(padded_width);
        for (x, &[gray, a]) in px.iter().enumerate() {
            y[x] = center(gray);
            if setup.has_alpha() {
                rest[x] = center(a);
            }
        }
    }
}

/// Converts a reconstructed window row back to interleaved pixels.
/// Alpha is 255 when the stream carries no alpha plane.
pub fn inverse_row(
    setup: ChannelSetup,
    src: &[i16],
    width: usize,
    padded_width: usize,
    dst: &mut [u8],
) {
    let plane = |ch: usize| &src[ch * padded_width..ch * padded_width + width];

    if setup.is_color() {
        let px: &mut [[u8; 4]] = bytemuck::cast_slice_mut(&mut dst[..width * 4]);
        let (y, co, cg) = (plane(0), plane(1), plane(2));
        for x in 0..width {
            let (y, co, cg) = (y[x] as i32, co[x] as i32, cg[x] as i32);
            let g = y + cg;
            let t = y - cg;
            let r = t + co;
            let b = t - co;
            let a = if setup.has_alpha() { clamp_pixel(plane(3)[x] as i32) } else { 255 };
            px[x] = [clamp_pixel(b), clamp_pixel(g), clamp_pixel(r), a];
        }
    } else {
        let px: &mut [[u8; 2]] = bytemuck::cast_slice_mut(&mut dst[..width * 2]);
        let y = plane(0);
        for x in 0..width {
            let a = if setup.has_alpha() { clamp_pixel(plane(1)[x] as i32) } else { 255 };
            px[x] = [clamp_pixel(y[x] as i32), a];
        }
    }
}

/// Swaps the red and blue bytes of every 4-byte pixel (RGBA <-> BGRA).
pub fn swap_red_blue(data: &mut [u8]) {
    let px: &mut [[u8; 4]] = bytemuck::cast_slice_mut(data);
    for p in px {
        p.swap(0, 2);
    }
}

/// Expands (gray, alpha) pairs to RGBA quads.
pub fn gray_alpha_to_rgba(data: &[u8]) -> Vec<u8> {
    let px: &[[u8; 2]] = bytemuck::cast_slice(data);
    px.iter().flat_map(|&[g, a]| [g, g, g, a]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Forward conversion, 4× lapped gain, inverse conversion.
    fn through_planes(setup: ChannelSetup, src: &[u8], width: usize) -> Vec<u8> {
        let padded = 32;
        let mut planes = vec![0i32; setup.channel_count() * padded];
        forward_row(setup, src, width, padded, &mut planes);
        let scaled: Vec<i16> = planes.iter().map(|&v| (v * 4) as i16).collect();
        let mut out = vec![0u8; width * setup.bytes_per_pixel()];
        inverse_row(setup, &scaled, width, padded, &mut out);
        out
    }

    #[test]
    fn test_color_conversion_is_exact() {
        let mut src = Vec::new();
        for i in 0..16u32 {
            let v = (i * 17) as u8;
            src.extend_from_slice(&[v, 255 - v, v.wrapping_mul(3), 200]);
        }
        src.extend_from_slice(&[0, 0, 0, 0]);
        src.extend_from_slice(&[255, 255, 255, 255]);
        let out = through_planes(ChannelSetup::ColorAlpha, &src, 18);
        assert_eq!(out, src);
    }

    #[test]
    fn test_gray_conversion_is_exact() {
        let src: Vec<u8> = (0..20u8).flat_map(|i| [i * 12, 255 - i]).collect();
        assert_eq!(through_planes(ChannelSetup::GrayAlpha, &src, 20), src);
    }

    #[test]
    fn test_missing_alpha_is_opaque() {
        let src = [10u8, 20, 30, 0, 40, 50, 60, 7];
        let out = through_planes(ChannelSetup::Color, &src, 2);
        assert_eq!(out, [10, 20, 30, 255, 40, 50, 60, 255]);

        let src = [99u8, 3];
        let out = through_planes(ChannelSetup::Gray, &src, 1);
        assert_eq!(out, [99, 255]);
    }

    #[test]
    fn test_forward_pads_with_zero() {
        let mut dst = vec![7i32; 2 * 32];
        forward_row(ChannelSetup::GrayAlpha, &[255, 255], 1, 32, &mut dst);
        assert_eq!(dst[0], 127 * 4);
        assert_eq!(dst[32], 127 * 4);
        assert!(dst[1..32].iter().all(|&v| v == 0));
        assert!(dst[33..].iter().all(|&v| v == 0));
    }

    #[test]
    fn test_inverse_clamps() {
        let mut out = [0u8; 2];
        inverse_row(ChannelSetup::Gray, &[i16::MAX], 1, 1, &mut out);
        assert_eq!(out[0], 255);
        inverse_row(ChannelSetup::Gray, &[i16::MIN], 1, 1, &mut out);
        assert_eq!(out[0], 0);
    }

    #[test]
    fn test_swizzles() {
        let mut px = [1u8, 2, 3, 4, 5, 6, 7, 8];
        swap_red_blue(&mut px);
        assert_eq!(px, [3, 2, 1, 4, 7, 6, 5, 8]);
        assert_eq!(gray_alpha_to_rgba(&[9, 10]), vec![9, 9, 9, 10]);
    }
}
