// src/codec/window.rs
//! The 32-row sliding window both schedulers work in.
//!
//! The window holds two 16-row stripes. Rows are addressed relative to a
//! base slot, so "retiring" the top stripe is a single XOR of the base
//! instead of a copy. Each row holds every channel plane back to back.

use super::transform::Block4;
use crate::utils::alloc::try_alloc_vec;
use crate::utils::error::Result;

pub const WINDOW_ROWS: usize = 32;

/// Storage type of window samples.
pub trait Sample: Copy + Default {
    fn to_i32(self) -> i32;
    fn from_i32(v: i32) -> Self;
}

impl Sample for i32 {
    #[inline]
    fn to_i32(self) -> i32 {
        self
    }

    #[inline]
    fn from_i32(v: i32) -> Self {
        v
    }
}

impl Sample for i16 {
    #[inline]
    fn to_i32(self) -> i32 {
        self as i32
    }

    #[inline]
    fn from_i32(v: i32) -> Self {
        v as i16
    }
}

pub struct StripeWindow<T> {
    data: Vec<T>,
    stride: usize,
    base: usize,
}

impl<T: Sample> StripeWindow<T> {
    /// Creates a zeroed window whose rows are `stride` samples long.
    pub fn new(stride: usize) -> Result<Self> {
        let data = try_alloc_vec(stride.saturating_mul(WINDOW_ROWS), "stripe window")?;
        Ok(Self { data, stride, base: 0 })
    }

    #[inline]
    fn offset(&self, row: usize) -> usize {
        ((self.base + row) % WINDOW_ROWS) * self.stride
    }

    pub fn row(&self, row: usize) -> &[T] {
        let start = self.offset(row);
        &self.data[start..start + self.stride]
    }

    pub fn row_mut(&mut self, row: usize) -> &mut [T] {
        let start = self.offset(row);
        &mut self.data[start..start + self.stride]
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> i32 {
        self.data[self.offset(row) + col].to_i32()
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, v: i32) {
        let at = self.offset(row) + col;
        self.data[at] = T::from_i32(v);
    }

    /// Swaps the two stripes: rows 16..32 become rows 0..16.
    pub fn flip(&mut self) {
        self.base ^= 16;
    }

    /// Applies a 4-sample filter along a row, at `cols..cols + 4`.
    pub fn map_row4(&mut self, row: usize, col: usize, f: fn([i32; 4]) -> [i32; 4]) {
        let out = f(std::array::from_fn(|i| self.get(row, col + i)));
        for (i, v) in out.into_iter().enumerate() {
            self.set(row, col + i, v);
        }
    }

    /// Applies a 4-sample filter down a column, at `rows..rows + 4`.
    pub fn map_col4(&mut self, row: usize, col: usize, f: fn([i32; 4]) -> [i32; 4]) {
        let out = f(std::array::from_fn(|i| self.get(row + i, col)));
        for (i, v) in out.into_iter().enumerate() {
            self.set(row + i, col, v);
        }
    }

    /// Applies a 4×4 transform to the grid of samples at
    /// `(row + r * step, col + c * step)`.
    pub fn map_block(&mut self, row: usize, col: usize, step: usize, f: fn(&mut Block4)) {
        let mut m: Block4 =
            std::array::from_fn(|r| std::array::from_fn(|c| self.get(row + r * step, col + c * step)));
        f(&mut m);
        for (r, line) in m.iter().enumerate() {
            for (c, &v) in line.iter().enumerate() {
                self.set(row + r * step, col + c * step, v);
            }
        }
    }

    /// Multiplies the 2×2 samples at `(row, col)` by 4.
    pub fn scale_corner(&mut self, row: usize, col: usize) {
        for r in row..row + 2 {
            for c in col..col + 2 {
                let v = self.get(r, c);
                self.set(r, c, v << 2);
            }
        }
    }
}
