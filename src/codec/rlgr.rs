// src/codec/rlgr.rs
//! Adaptive run-length / Golomb-Rice (RLGR) coding of signed coefficients.
//!
//! The coder keeps two adaptive parameters, both scaled by 8 so they can
//! move in fractional steps:
//!
//! - `kp` selects the mode. Below 8 every value is Golomb coded on its own
//!   (signs folded into the low bit); from 8 up, runs of zeros are coded
//!   with run length `1 << (kp >> 3)` and a non-zero value ends a run.
//! - `krp` is the Golomb-Rice parameter; `krp >> 3` low bits follow a
//!   unary quotient.
//!
//! Encoder and decoder adapt identically, so the stream carries no side
//! information beyond the initial seed derived from the quantizer.

use super::bitbuffer::{BitReader, BitWriter};
use crate::utils::error::{FriedError, Result};
use log::warn;
use std::sync::OnceLock;

/// Upper bound on both scaled parameters (23 in unscaled units).
const PARAM_MAX: i32 = 191;
/// Longest unary prefix emitted in a single `put_bits` call.
const UNARY_CHUNK: u32 = 24;
/// The table fast path handles Rice parameters below this (scaled) value.
const TABLE_KRP_LIMIT: i32 = 48;

/// Derives the initial (kp, krp) pair from the seed.
fn initial_state(xminit: u32) -> (i32, i32) {
    let mut x = xminit + 1;
    if x <= 2 {
        (1 << 3, 2 << 3)
    } else {
        let mut kr = 0;
        while x > 1 {
            x >>= 1;
            kr += 1;
        }
        (0, kr << 3)
    }
}

/// Adapts the Rice parameter after a value with unary quotient `q`.
#[inline]
fn adapt_rice(krp: &mut i32, q: u32) {
    match q {
        0 => *krp = (*krp - 2).max(0),
        1 => {}
        _ => *krp = (*krp + q.min(UNARY_CHUNK) as i32).min(PARAM_MAX),
    }
}

fn gr_encode(w: &mut BitWriter<'_>, krp: &mut i32, val: u32) {
    let kr = (*krp >> 3) as u32;
    let quotient = val >> kr;

    let mut ones = quotient;
    while ones > 0 {
        let n = ones.min(UNARY_CHUNK);
        w.put_bits((1 << n) - 1, n);
        ones -= n;
    }
    w.put_bits(0, 1);
    w.put_bits(val, kr);

    adapt_rice(krp, quotient);
}

/// Encodes `values` into `out`, returning the number of bytes written.
///
/// `xminit` seeds the adaptive state; the decoder must use the same seed.
pub fn encode(out: &mut [u8], values: &[i32], xminit: u32) -> Result<usize> {
    let mut w = BitWriter::new(out);
    let (mut kp, mut krp) = initial_state(xminit);
    let mut run = 0u32;

    for &x in values {
        let magnitude = x.unsigned_abs();
        let sign = (x < 0) as u32;
        let k = (kp >> 3) as u32;

        if k > 0 {
            if magnitude == 0 {
                run += 1;
                if run == 1 << k {
                    w.put_bits(0, 1);
                    run = 0;
                    kp = (kp + 4).min(PARAM_MAX);
                }
            } else {
                w.put_bits(1, 1);
                w.put_bits(run, k);
                w.put_bits(sign, 1);
                gr_encode(&mut w, &mut krp, magnitude - 1);
                kp = (kp - 5).max(0);
                run = 0;
            }
        } else {
            gr_encode(&mut w, &mut krp, (magnitude << 1) - sign);
            if magnitude == 0 {
                kp += 3;
            } else {
                kp = 0;
            }
        }
    }

    // A partial run is closed with a single zero bit.
    if run > 0 {
        w.put_bits(0, 1);
    }
    w.flush();

    if w.overflowed() {
        return Err(FriedError::OutputOverflow);
    }
    Ok(w.bytes_written())
}

/// One precomputed Golomb-Rice decode step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GolombEntry {
    pub value: u16,
    /// Bits consumed, including the unary prefix and its terminator.
    pub len: u8,
    /// Unary quotient, which drives the parameter adaptation.
    pub quotient: u8,
}

/// Decode tables for Rice parameters 0..6, indexed by the next `k + 4`
/// bits. Only windows whose unary quotient is 0, 1, or 2 are tabulated
/// (`14 << k` entries); anything longer takes the bit-by-bit path.
pub struct GolombTables {
    tables: [Vec<GolombEntry>; 6],
}

impl GolombTables {
    fn build() -> Self {
        Self { tables: std::array::from_fn(|k| build_table(k as u32)) }
    }

    /// Looks up the entry for a `k + 4`-bit window, if it is tabulated.
    #[inline]
    pub fn lookup(&self, k: usize, window: u32) -> Option<GolombEntry> {
        self.tables.get(k)?.get(window as usize).copied()
    }
}

fn build_table(k: u32) -> Vec<GolombEntry> {
    let mask = (1u32 << k) - 1;
    (0..14u32 << k)
        .map(|i| {
            // Leading 4 bits of the window: 0xxx, 10xx, 110x
            let (quotient, shift) = match i >> k {
                0..=7 => (0, 3),
                8..=11 => (1, 2),
                _ => (2, 1),
            };
            GolombEntry {
                value: (((i >> shift) & mask) + (quotient << k)) as u16,
                len: (k + 1 + quotient) as u8,
                quotient: quotient as u8,
            }
        })
        .collect()
}

static GOLOMB_TABLES: OnceLock<GolombTables> = OnceLock::new();

/// Process-wide decode tables, built on first use.
pub fn golomb_tables() -> &'static GolombTables {
    GOLOMB_TABLES.get_or_init(GolombTables::build)
}

fn gr_decode(r: &mut BitReader<'_>, krp: &mut i32, tables: &GolombTables) -> u32 {
    if *krp < TABLE_KRP_LIMIT {
        let k = (*krp >> 3) as u32;
        if let Some(entry) = tables.lookup(k as usize, r.peek_bits(k + 4)) {
            r.skip_bits(entry.len as u32);
            adapt_rice(krp, entry.quotient as u32);
            return entry.value as u32;
        }
    }
    gr_decode_slow(r, krp)
}

/// Bit-by-bit Golomb-Rice decode.
fn gr_decode_slow(r: &mut BitReader<'_>, krp: &mut i32) -> u32 {
    let low_bits = (*krp >> 3) as u32;

    let quotient = match r.peek_bits(3) {
        0..=3 => {
            r.skip_bits(1);
            0
        }
        4 | 5 => {
            r.skip_bits(2);
            1
        }
        6 => {
            r.skip_bits(3);
            2
        }
        _ => {
            r.skip_bits(3);
            let mut high = 3u32;
            loop {
                match r.peek_bits(4) {
                    0..=7 => {
                        r.skip_bits(1);
                        break;
                    }
                    8..=11 => {
                        high += 1;
                        r.skip_bits(2);
                        break;
                    }
                    12 | 13 => {
                        high += 2;
                        r.skip_bits(3);
                        break;
                    }
                    14 => {
                        high += 3;
                        r.skip_bits(4);
                        break;
                    }
                    _ => {
                        high += 4;
                        r.skip_bits(4);
                    }
                }
            }
            high
        }
    };

    adapt_rice(krp, quotient);
    (quotient << low_bits) | r.get_bits(low_bits)
}

/// Decodes exactly `out.len()` values from `data`, returning the number of
/// bytes consumed. Positions skipped by zero runs are left at zero.
///
/// Fails with [`FriedError::Truncated`] when decoding had to read past the
/// end of `data`.
pub fn decode(data: &[u8], out: &mut [i16], xminit: u32) -> Result<usize> {
    let tables = golomb_tables();
    let mut r = BitReader::new(data);
    let (mut kp, mut krp) = initial_state(xminit);
    let n = out.len();
    out.fill(0);

    let mut i = 0usize;
    while i < n {
        if kp < 8 {
            let u = gr_decode(&mut r, &mut krp, tables);
            if u != 0 {
                out[i] = (((u >> 1) as i32) ^ -((u & 1) as i32)) as i16;
                kp = 0;
            } else {
                kp += 3;
            }
            i += 1;
        } else {
            let k = (kp >> 3) as u32;
            if r.get_bits(1) == 0 {
                // A complete run of zeros.
                i = i.saturating_add(1 << k);
                kp = (kp + 4).min(PARAM_MAX);
            } else {
                let run = r.get_bits(k) as usize;
                let sign = r.get_bits(1);
                let magnitude = gr_decode(&mut r, &mut krp, tables).wrapping_add(1) as i32;
                i = i.saturating_add(run);
                if i < n {
                    out[i] = if sign == 1 { magnitude.wrapping_neg() } else { magnitude } as i16;
                    i += 1;
                    kp = (kp - 5).max(0);
                }
            }
        }
    }

    if r.is_overrun() {
        warn!(
            "RLGR segment needs {} bytes, only {} available",
            r.bytes_read(),
            data.len()
        );
        return Err(FriedError::Truncated("entropy-coded segment"));
    }
    Ok(r.bytes_read())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic generator for coefficient-like test data.
    struct Lcg(u32);

    impl Lcg {
        fn next(&mut self) -> u32 {
            self.0 = self.0.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            self.0 >> 8
        }
    }

    fn roundtrip(values: &[i32], xminit: u32) -> usize {
        let mut buf = vec![0u8; values.len() * 16 + 65536];
        let written = encode(&mut buf, values, xminit).unwrap();
        let mut decoded = vec![0i16; values.len()];
        let consumed = decode(&buf[..written], &mut decoded, xminit).unwrap();
        assert_eq!(consumed, written, "xminit {xminit}");
        let decoded: Vec<i32> = decoded.iter().map(|&v| v as i32).collect();
        assert_eq!(decoded, values, "xminit {xminit}");
        written
    }

    #[test]
    fn test_initial_state() {
        assert_eq!(initial_state(0), (8, 16));
        assert_eq!(initial_state(1), (8, 16));
        assert_eq!(initial_state(2), (0, 8));
        assert_eq!(initial_state(625), (0, 9 << 3));
        assert_eq!(initial_state(94), (0, 6 << 3));
    }

    #[test]
    fn test_all_zero_is_compact() {
        let zeros = vec![0i32; 4096];
        let written = roundtrip(&zeros, 625);
        assert!(written < 64, "{written} bytes for a zero block");
    }

    #[test]
    fn test_roundtrip_sparse_and_dense() {
        let mut rng = Lcg(7);
        let sparse: Vec<i32> = (0..2000)
            .map(|_| match rng.next() % 50 {
                0 => (rng.next() % 200) as i32 - 100,
                1 => -1,
                _ => 0,
            })
            .collect();
        let dense: Vec<i32> = (0..2000).map(|_| (rng.next() % 61) as i32 - 30).collect();
        let large: Vec<i32> = (0..500).map(|_| (rng.next() % 60000) as i32 - 30000).collect();

        for xminit in [0, 1, 2, 5, 39, 94, 625] {
            roundtrip(&sparse, xminit);
            roundtrip(&dense, xminit);
            roundtrip(&large, xminit);
        }
    }

    #[test]
    fn test_roundtrip_edges() {
        roundtrip(&[], 625);
        roundtrip(&[i16::MIN as i32 + 1, i16::MAX as i32, 0, -1, 1], 0);
        // A run that ends exactly at the segment boundary.
        let mut tail = vec![0i32; 63];
        tail.push(5);
        roundtrip(&tail, 1);
        // Partial run at the end.
        let mut head = vec![9i32];
        head.extend(std::iter::repeat_n(0, 37));
        roundtrip(&head, 1);
    }

    #[test]
    fn test_truncated_segment_fails() {
        let mut rng = Lcg(99);
        let values: Vec<i32> = (0..512).map(|_| (rng.next() % 400) as i32 - 200).collect();
        let mut buf = vec![0u8; 4096];
        let written = encode(&mut buf, &values, 94).unwrap();
        let mut decoded = vec![0i16; values.len()];
        assert!(matches!(
            decode(&buf[..written / 2], &mut decoded, 94),
            Err(FriedError::Truncated(_))
        ));
    }

    #[test]
    fn test_encode_overflow() {
        let values = vec![1000i32; 256];
        let mut buf = [0u8; 8];
        assert!(matches!(
            encode(&mut buf, &values, 0),
            Err(FriedError::OutputOverflow)
        ));
    }

    #[test]
    fn test_table_matches_slow_path() {
        let tables = golomb_tables();
        for krp in 0..TABLE_KRP_LIMIT {
            let k = (krp >> 3) as u32;
            for window in 0..(16u32 << k) {
                // Place the window at the top of a 4-byte buffer, ones below it.
                let word = (window << (32 - (k + 4))) | ((1u32 << (32 - (k + 4))) - 1);
                let bytes = word.to_be_bytes();

                let mut fast_krp = krp;
                let mut fast = BitReader::new(&bytes);
                let fast_val = gr_decode(&mut fast, &mut fast_krp, tables);

                let mut slow_krp = krp;
                let mut slow = BitReader::new(&bytes);
                let slow_val = gr_decode_slow(&mut slow, &mut slow_krp);

                assert_eq!(fast_val, slow_val, "krp {krp} window {window:b}");
                assert_eq!(fast_krp, slow_krp, "krp {krp} window {window:b}");
                assert_eq!(fast.peek_bits(32), slow.peek_bits(32));
            }
        }
    }

    #[test]
    fn test_table_sizes() {
        let tables = golomb_tables();
        for k in 0..6usize {
            assert!(tables.lookup(k, (14 << k) - 1).is_some());
            assert!(tables.lookup(k, 14 << k).is_none());
        }
        assert!(tables.lookup(6, 0).is_none());
    }

    #[test]
    fn test_rice_adaptation_clamps() {
        let mut krp = 1;
        adapt_rice(&mut krp, 0);
        assert_eq!(krp, 0);
        adapt_rice(&mut krp, 1);
        assert_eq!(krp, 0);
        let mut krp = 190;
        adapt_rice(&mut krp, 1000);
        assert_eq!(krp, PARAM_MAX);
        let mut krp = 10;
        adapt_rice(&mut krp, 100);
        assert_eq!(krp, 34);
    }
}
