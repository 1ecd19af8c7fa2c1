// src/codec/constants.rs

/// Visiting order of the sixteen positions of a 4×4 grid (`row * 4 + col`).
///
/// Entry 0 is the DC position. Entries 1..16 order the AC positions both
/// inside a 4×4 block and across the block DCs of a macroblock, and entry
/// `n` also picks the quantizer factor for coefficient group `n`.
pub const ZIGZAG: [usize; 16] = [0, 4, 1, 2, 5, 8, 12, 9, 6, 3, 7, 10, 13, 14, 11, 15];

/// Relative norms of the four basis rows of the 4-point transform.
pub const BASIS_NORMS: [f32; 4] = [1.0000, 1.3260, 1.0000, 1.5104];

/// Order of the sixteen 4×4 blocks inside a 16×16 macroblock, given as
/// `(row << 4) | col` sample offsets of each block's top-left corner.
pub const BLOCK_ORDER: [u8; 16] = [
    0x00, 0x04, 0x44, 0x40, 0x80, 0xc0, 0xc4, 0x84, 0x88, 0xc8, 0xcc, 0x8c, 0x4c, 0x48, 0x08, 0x0c,
];

/// Rows per stripe.
pub const STRIPE_ROWS: usize = 16;
/// Macroblock edge length.
pub const MACROBLOCK: usize = 16;

/// RLGR seeds for the low-frequency and high-frequency segments of a chunk,
/// before scaling down by the quantizer's shift.
pub const DC_SEED: u32 = 625;
pub const AC_SEED: u32 = 94;
