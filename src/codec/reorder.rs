// src/codec/reorder.rs
//! Coefficient ordering between the spatial 16×`cwidth` chunk layout and
//! the frequency-grouped scan layout the quantizer and entropy coder use.
//!
//! The scan layout is sixteen groups of `cwidth` entries. Group 0 holds the
//! macroblock DCs followed by the fifteen macroblock-level AC bands (each
//! band one entry per macroblock). Groups 1..16 hold the fifteen block-level
//! AC bands, one entry per 4×4 block. Both directions are driven by the same
//! enumeration, so they are inverse permutations by construction.

use super::constants::{BLOCK_ORDER, MACROBLOCK, ZIGZAG};

/// Calls `f(scan_index, row, col)` for every position of a chunk
/// `cwidth` samples wide (a multiple of 16).
fn for_each_position(cwidth: usize, mut f: impl FnMut(usize, usize, usize)) {
    let macroblocks = cwidth / MACROBLOCK;

    for mb in 0..macroblocks {
        let x0 = mb * MACROBLOCK;

        // Macroblock DC and the block DCs in band order.
        for (band, &pos) in ZIGZAG.iter().enumerate() {
            f(band * macroblocks + mb, (pos / 4) * 4, x0 + (pos % 4) * 4);
        }

        // Block-level AC coefficients.
        for (n, &corner) in BLOCK_ORDER.iter().enumerate() {
            let block = mb * 16 + n;
            let (by, bx) = ((corner >> 4) as usize, x0 + (corner & 0xf) as usize);
            for (band, &pos) in ZIGZAG[1..].iter().enumerate() {
                f(cwidth * (band + 1) + block, by + pos / 4, bx + pos % 4);
            }
        }
    }
}

/// Gathers a spatial chunk (16 rows of `cwidth`) into scan order.
pub fn scan<T: Copy>(spatial: &[T], out: &mut [T], cwidth: usize) {
    for_each_position(cwidth, |index, row, col| {
        out[index] = spatial[row * cwidth + col];
    });
}

/// Scatters scan-ordered coefficients back into a spatial chunk.
pub fn unscan<T: Copy>(coeffs: &[T], spatial: &mut [T], cwidth: usize) {
    for_each_position(cwidth, |index, row, col| {
        spatial[row * cwidth + col] = coeffs[index];
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_is_a_permutation() {
        for cwidth in (16..=512).step_by(16) {
            let mut seen = vec![0u8; 16 * cwidth];
            for_each_position(cwidth, |index, row, col| {
                assert!(row < 16 && col < cwidth);
                seen[index] += 1;
            });
            assert!(seen.iter().all(|&n| n == 1), "cwidth {cwidth}");
        }
    }

    #[test]
    fn test_unscan_inverts_scan() {
        for cwidth in [16usize, 32, 96, 512] {
            let spatial: Vec<u32> = (0..16 * cwidth as u32).collect();
            let mut coeffs = vec![0u32; spatial.len()];
            let mut back = vec![u32::MAX; spatial.len()];
            scan(&spatial, &mut coeffs, cwidth);
            unscan(&coeffs, &mut back, cwidth);
            assert_eq!(back, spatial);
        }
    }

    #[test]
    fn test_low_band_layout() {
        let cwidth = 32;
        let mut spatial = vec![0i32; 16 * cwidth];
        // Macroblock DCs
        spatial[0] = 1;
        spatial[16] = 2;
        // First macroblock-level AC: the block DC one block row down
        spatial[4 * cwidth] = 3;
        // First block-level AC of the first block: one row down
        spatial[cwidth] = 4;
        let mut coeffs = vec![0i32; spatial.len()];
        scan(&spatial, &mut coeffs, cwidth);
        assert_eq!(&coeffs[..3], &[1, 2, 3]);
        assert_eq!(coeffs[cwidth], 4);
    }
}
