// src/codec/quant.rs
//! Scalar quantization of reordered chunk coefficients.
//!
//! A quantizer byte splits into a 3-bit level (`q & 7`) that picks a
//! mantissa table and a shift (`q >> 3`) that scales the step by a power of
//! two. Each of the sixteen coefficient groups of a chunk uses its own
//! factor so that differently normed basis functions get matched steps.

use super::constants::{BASIS_NORMS, ZIGZAG};
use std::sync::OnceLock;

/// Forward and inverse scale factors for every level and grid position.
pub struct QuantTables {
    /// Reconstruction multipliers (Q4 step sizes).
    pub rescale: [[i32; 16]; 8],
    /// Forward multipliers in Q14, approximately `2^14 / step`.
    pub descale: [[i32; 16]; 8],
}

impl QuantTables {
    fn build() -> Self {
        let mut rescale = [[0i32; 16]; 8];
        let mut descale = [[0i32; 16]; 8];
        for level in 0..8 {
            let base = 16.0 * (level as f64 / 8.0).exp2();
            for y in 0..4 {
                for x in 0..4 {
                    let step = base * BASIS_NORMS[x] as f64 * BASIS_NORMS[y] as f64;
                    let r = (step + 0.5) as i32;
                    rescale[level][y * 4 + x] = r;
                    descale[level][y * 4 + x] = (524_288 + r) / (2 * r);
                }
            }
        }
        Self { rescale, descale }
    }
}

static QUANT_TABLES: OnceLock<QuantTables> = OnceLock::new();

/// Process-wide quantizer tables, built on first use.
pub fn quant_tables() -> &'static QuantTables {
    QUANT_TABLES.get_or_init(QuantTables::build)
}

#[inline]
fn quantize_one(x: i32, factor: i32, shift: u32, rounding: i64) -> i32 {
    let p = (x as i64 * factor as i64 + 8192) >> 14;
    let p = if p >= 0 {
        p + rounding
    } else {
        p - (rounding - (1i64 << shift) + 1)
    };
    (p >> shift) as i32
}

/// Quantizes a reordered chunk of `16 * cwidth` coefficients in place and
/// returns one past the index of the last non-zero result (0 if all zero).
pub fn quantize(quantizer: u8, coeffs: &mut [i32], cwidth: usize) -> usize {
    let tables = quant_tables();
    let shift = (quantizer >> 3) as u32;
    let factors = &tables.descale[(quantizer & 7) as usize];
    // Rounds to nearest with a dead zone of 1/16 step on each side.
    let rounding = ((1i64 << shift) >> 1) - ((1024i64 << shift) >> 14);

    for (group, row) in coeffs.chunks_exact_mut(cwidth).take(16).enumerate() {
        let factor = factors[ZIGZAG[group]];
        for c in row.iter_mut() {
            *c = quantize_one(*c, factor, shift, rounding);
        }
    }

    coeffs.iter().rposition(|&c| c != 0).map_or(0, |i| i + 1)
}

/// Reconstructs the first `count` quantized coefficients of a chunk in
/// place. Coefficients past `count` are left untouched.
pub fn dequantize(quantizer: u8, coeffs: &mut [i16], count: usize, cwidth: usize) {
    let tables = quant_tables();
    let shift = (quantizer >> 3) as u32;
    let factors = &tables.rescale[(quantizer & 7) as usize];

    let mut remaining = count.min(coeffs.len());
    for (group, row) in coeffs.chunks_exact_mut(cwidth).take(16).enumerate() {
        if remaining == 0 {
            break;
        }
        let n = remaining.min(cwidth);
        let factor = factors[ZIGZAG[group]];
        for c in &mut row[..n] {
            let v = *c as i32 * factor;
            *c = if shift < 4 {
                v >> (4 - shift)
            } else {
                v.wrapping_shl(shift - 4)
            } as i16;
        }
        remaining -= n;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_values() {
        let t = quant_tables();
        assert_eq!(t.rescale[0][0], 16);
        assert_eq!(t.descale[0][0], 16384);
        assert_eq!(t.rescale[0][1], 21);
        assert_eq!(t.rescale[0][4], 21);
        // Level 7 is 2^(7/8) above level 0.
        assert_eq!(t.rescale[7][0], 29);
        for level in 0..8 {
            for i in 0..16 {
                let r = t.rescale[level][i];
                assert!(r >= 16);
                assert_eq!(t.descale[level][i], (524_288 + r) / (2 * r));
            }
        }
    }

    #[test]
    fn test_finest_level_keeps_low_band_exact() {
        let cwidth = 32;
        let mut coeffs = vec![0i32; 16 * cwidth];
        for (i, c) in coeffs[..cwidth].iter_mut().enumerate() {
            *c = i as i32 * 37 - 600;
        }
        let original = coeffs.clone();
        let count = quantize(0, &mut coeffs, cwidth);
        assert_eq!(count, cwidth);
        assert_eq!(coeffs[..cwidth], original[..cwidth]);

        let mut restored: Vec<i16> = coeffs.iter().map(|&c| c as i16).collect();
        dequantize(0, &mut restored, count, cwidth);
        for (r, o) in restored.iter().zip(&original) {
            assert_eq!(*r as i32, *o);
        }
    }

    #[test]
    fn test_count_marks_last_nonzero() {
        let cwidth = 16;
        let mut coeffs = vec![0i32; 16 * cwidth];
        assert_eq!(quantize(31, &mut coeffs, cwidth), 0);

        coeffs[5 * cwidth + 3] = 5000;
        assert_eq!(quantize(9, &mut coeffs, cwidth), 5 * cwidth + 4);
    }

    #[test]
    fn test_dead_zone() {
        // Small values vanish at coarse settings regardless of sign.
        let cwidth = 16;
        let mut coeffs = vec![3i32; 16 * cwidth];
        coeffs[cwidth..].iter_mut().step_by(2).for_each(|c| *c = -3);
        assert_eq!(quantize(40, &mut coeffs, cwidth), 0);
    }

    #[test]
    fn test_reconstruction_error_is_bounded() {
        let cwidth = 32;
        let tables = quant_tables();
        for quantizer in [0u8, 5, 8, 17, 31, 42] {
            let shift = (quantizer >> 3) as u32;
            let mut coeffs: Vec<i32> = (0..16 * cwidth as i32).map(|i| (i * 7919) % 4001 - 2000).collect();
            let original = coeffs.clone();
            let count = quantize(quantizer, &mut coeffs, cwidth);
            let mut restored: Vec<i16> = coeffs.iter().map(|&c| c as i16).collect();
            dequantize(quantizer, &mut restored, count, cwidth);
            for (i, (r, o)) in restored.iter().zip(&original).enumerate() {
                let group = i / cwidth;
                let step = (tables.rescale[(quantizer & 7) as usize][ZIGZAG[group]] << shift) / 16;
                let err = (*r as i32 - o).abs();
                assert!(err <= step + 1, "q {quantizer} i {i}: {o} -> {r} (step {step})");
            }
        }
    }

    #[test]
    fn test_coded_count_falls_as_quantizer_grows() {
        let cwidth = 32;
        let source: Vec<i32> = (0..16 * cwidth as i32).map(|i| ((i * 2654435) % 2001) - 1000).collect();
        let counts_at = |q: u8| {
            let mut c = source.clone();
            let coded = quantize(q, &mut c, cwidth);
            // Everything past the coded count is zero and the last coded one is not.
            assert!(c[coded..].iter().all(|&v| v == 0), "q{q}");
            assert!(coded == 0 || c[coded - 1] != 0, "q{q}");
            (c.iter().filter(|&&v| v != 0).count(), coded)
        };
        for range in [0u8..=7, 8..=127] {
            let counts: Vec<(usize, usize)> = range.map(counts_at).collect();
            assert!(counts.windows(2).all(|w| w[1].0 <= w[0].0), "nonzero {counts:?}");
            assert!(counts.windows(2).all(|w| w[1].1 <= w[0].1), "coded {counts:?}");
            assert!(counts.iter().all(|&(nonzero, coded)| nonzero <= coded));
        }
    }

    #[test]
    fn test_dequantize_stops_at_count() {
        let cwidth = 16;
        let mut coeffs = vec![10i16; 16 * cwidth];
        dequantize(0, &mut coeffs, cwidth + 3, cwidth);
        // Group 0 has unit step at level 0, group 1 does not.
        assert!(coeffs[..cwidth].iter().all(|&c| c == 10));
        assert!(coeffs[cwidth..cwidth + 3].iter().all(|&c| c == 13));
        assert!(coeffs[cwidth + 3..].iter().all(|&c| c == 10));
    }
}
