// src/codec/transform.rs
//! Integer lifting transforms.
//!
//! Everything here works on 4-sample vectors or 4×4 matrices of `i32` and is
//! built from lifting steps, so the block transforms invert exactly. The
//! lapped pre/post filters are the exception: the pre filter halves its
//! output, and the post filter returns the input at 4× scale with a small
//! rounding error that the pixel conversion absorbs.

/// A 4×4 sample block, `m[row][col]`.
pub type Block4 = [[i32; 4]; 4];

/// Forward 4-point DCT approximation. Output order is (DC, 1, 2, 3).
#[inline]
pub fn ndct4([mut a, mut b, mut c, mut d]: [i32; 4]) -> [i32; 4] {
    a += d;
    c -= b;
    d = 2 * d - a;
    b += (c - a) >> 1;
    a += b;
    c -= (d >> 1) - (d >> 3);
    d += (c >> 1) - (c >> 3);
    [a, d, b, c]
}

/// Inverse of [`ndct4`].
#[inline]
pub fn indct4([mut a, mut d, mut b, mut c]: [i32; 4]) -> [i32; 4] {
    d -= (c >> 1) - (c >> 3);
    c += (d >> 1) - (d >> 3);
    a -= b;
    b -= (c - a) >> 1;
    c += b;
    let d0 = (a + d) >> 1;
    a -= d0;
    [a, b, c, d0]
}

/// Forward 4-point Walsh-Hadamard transform.
#[inline]
pub fn wht4([mut a, mut b, mut c, mut d]: [i32; 4]) -> [i32; 4] {
    a += d;
    c -= b;
    let t = (c - a) >> 1;
    d += t;
    b += t;
    c -= d;
    a += b;
    [a, d, b, c]
}

/// Inverse of [`wht4`].
#[inline]
pub fn iwht4([mut a, mut d, mut b, mut c]: [i32; 4]) -> [i32; 4] {
    a -= b;
    c += d;
    let t = (c - a) >> 1;
    b -= t;
    d -= t;
    c += b;
    a -= d;
    [a, b, c, d]
}

/// Lifting rotation used at the center of the lapped filter.
#[inline]
pub fn rot_pp(mut u: i32, mut v: i32) -> (i32, i32) {
    v -= u;
    u <<= 1;
    u += v >> 1;
    v += u >> 1;
    (u, v)
}

/// Exact inverse of [`rot_pp`].
#[inline]
pub fn irot_pp(mut u: i32, mut v: i32) -> (i32, i32) {
    v -= u >> 1;
    u -= v >> 1;
    u >>= 1;
    v += u;
    (u, v)
}

/// 1-D lapped pre-filter across a block boundary (`a b | c d`).
#[inline]
pub fn lbt_pre4([mut a, mut b, mut c, mut d]: [i32; 4]) -> [i32; 4] {
    d -= a;
    c -= b;
    a += a + d;
    b += b + c;
    (c, d) = rot_pp(c, d);
    a -= d - 1;
    b -= c;
    c += c + b + 1;
    d += d + a;
    [a >> 1, b >> 1, c >> 1, d >> 1]
}

// Post-filter at 2× scale; the 2-D filter runs it twice for a total of 4×.
#[inline]
fn lbt_post4_core([mut a, mut b, mut c, mut d]: [i32; 4]) -> [i32; 4] {
    d -= a;
    c -= b;
    a += a + d;
    b += b + c;
    (c, d) = irot_pp(c, d);
    a -= d;
    b -= c;
    c += c + b;
    d += d + a;
    [a, b, c, d]
}

/// 1-D lapped post-filter; returns the filtered samples at 4× scale.
#[inline]
pub fn lbt_post4(x: [i32; 4]) -> [i32; 4] {
    lbt_post4_core(x).map(|v| v << 1)
}

#[inline]
fn map_rows(m: &mut Block4, f: fn([i32; 4]) -> [i32; 4]) {
    for row in m.iter_mut() {
        *row = f(*row);
    }
}

#[inline]
fn map_cols(m: &mut Block4, f: fn([i32; 4]) -> [i32; 4]) {
    for c in 0..4 {
        let out = f([m[0][c], m[1][c], m[2][c], m[3][c]]);
        for (r, v) in out.into_iter().enumerate() {
            m[r][c] = v;
        }
    }
}

#[inline]
fn transpose(m: &mut Block4) {
    for r in 0..4 {
        for c in r + 1..4 {
            let t = m[r][c];
            m[r][c] = m[c][r];
            m[c][r] = t;
        }
    }
}

/// Forward 4×4 DCT. The coefficient block is stored transposed; only
/// [`idct4x4`] needs to agree on that.
pub fn fdct4x4(m: &mut Block4) {
    transpose(m);
    map_rows(m, ndct4);
    map_cols(m, ndct4);
}

pub fn idct4x4(m: &mut Block4) {
    map_cols(m, indct4);
    map_rows(m, indct4);
    transpose(m);
}

/// Forward 4×4 WHT: rows first, then columns.
pub fn fwht4x4(m: &mut Block4) {
    map_rows(m, wht4);
    map_cols(m, wht4);
}

pub fn iwht4x4(m: &mut Block4) {
    map_cols(m, iwht4);
    map_rows(m, iwht4);
}

/// 2-D lapped pre-filter: horizontal, then vertical.
pub fn lbt_pre4x4(m: &mut Block4) {
    map_rows(m, lbt_pre4);
    map_cols(m, lbt_pre4);
}

/// 2-D lapped post-filter: vertical, then horizontal, 4× overall gain.
pub fn lbt_post4x4(m: &mut Block4) {
    map_cols(m, lbt_post4_core);
    map_rows(m, lbt_post4_core);
}
