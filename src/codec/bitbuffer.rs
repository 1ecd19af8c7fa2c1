// src/codec/bitbuffer.rs
//! MSB-first bit packing over caller-provided byte slices.

/// Writes bits most-significant first into a fixed byte slice.
///
/// Writes past the end of the slice are dropped and remembered; callers
/// check [`BitWriter::overflowed`] once at the end instead of on every call.
pub struct BitWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
    acc: u64,
    nbits: u32,
    overflow: bool,
}

impl<'a> BitWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0, acc: 0, nbits: 0, overflow: false }
    }

    /// Appends the low `nbits` bits of `value` (`nbits <= 32`).
    #[inline]
    pub fn put_bits(&mut self, value: u32, nbits: u32) {
        debug_assert!(nbits <= 32);
        if nbits == 0 {
            return;
        }
        let masked = value as u64 & ((1u64 << nbits) - 1);
        self.acc = (self.acc << nbits) | masked;
        self.nbits += nbits;
        while self.nbits >= 8 {
            self.nbits -= 8;
            let byte = (self.acc >> self.nbits) as u8;
            self.emit(byte);
        }
        self.acc &= (1u64 << self.nbits) - 1;
    }

    #[inline]
    fn emit(&mut self, byte: u8) {
        match self.buf.get_mut(self.pos) {
            Some(slot) => {
                *slot = byte;
                self.pos += 1;
            }
            None => self.overflow = true,
        }
    }

    /// Pads the final partial byte with zero bits.
    pub fn flush(&mut self) {
        if self.nbits > 0 {
            self.put_bits(0, 8 - self.nbits);
        }
    }

    pub fn bytes_written(&self) -> usize {
        self.pos
    }

    pub fn overflowed(&self) -> bool {
        self.overflow
    }
}

/// Reads bits most-significant first from a byte slice.
///
/// Past the end of the slice the reader yields zero bits, so decoding never
/// faults on short input; [`BitReader::is_overrun`] reports whether any of
/// those phantom bits were actually consumed.
pub struct BitReader<'a> {
    data: &'a [u8],
    /// Bytes pulled into the accumulator, phantom bytes included.
    pos: usize,
    acc: u64,
    fill: u32,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        let mut reader = Self { data, pos: 0, acc: 0, fill: 0 };
        reader.refill();
        reader
    }

    // Keeps at least 57 bits buffered, so any peek of up to 32 bits is valid.
    #[inline]
    fn refill(&mut self) {
        while self.fill <= 56 {
            let byte = self.data.get(self.pos).copied().unwrap_or(0);
            self.acc = (self.acc << 8) | byte as u64;
            self.pos += 1;
            self.fill += 8;
        }
    }

    /// Returns the next `n` bits (`n <= 32`) without consuming them.
    #[inline]
    pub fn peek_bits(&self, n: u32) -> u32 {
        debug_assert!(n <= 32);
        if n == 0 {
            return 0;
        }
        ((self.acc >> (self.fill - n)) & ((1u64 << n) - 1)) as u32
    }

    #[inline]
    pub fn skip_bits(&mut self, n: u32) {
        debug_assert!(n <= 32);
        self.fill -= n;
        self.refill();
    }

    #[inline]
    pub fn get_bits(&mut self, n: u32) -> u32 {
        let v = self.peek_bits(n);
        self.skip_bits(n);
        v
    }

    /// Whole bytes touched by consumed bits, counting a partial byte as one.
    pub fn bytes_read(&self) -> usize {
        let consumed_bits = self.pos * 8 - self.fill as usize;
        consumed_bits.div_ceil(8)
    }

    /// True once consumption has reached past the end of the input.
    pub fn is_overrun(&self) -> bool {
        self.bytes_read() > self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitvec::prelude::*;

    #[test]
    fn test_writer_matches_msb0_bit_order() {
        let fields: &[(u32, u32)] = &[
            (1, 1),
            (0, 1),
            (0b101, 3),
            (0x3ff, 10),
            (0, 5),
            (0xdead_beef, 32),
            (0x15, 7),
        ];
        let mut buf = [0u8; 16];
        let mut w = BitWriter::new(&mut buf);
        let mut expected: BitVec<u8, Msb0> = BitVec::new();
        for &(value, n) in fields {
            w.put_bits(value, n);
            for i in (0..n).rev() {
                expected.push((value >> i) & 1 == 1);
            }
        }
        w.flush();
        while expected.len() % 8 != 0 {
            expected.push(false);
        }
        let written = w.bytes_written();
        assert_eq!(written, expected.len() / 8);
        assert_eq!(&buf[..written], expected.as_raw_slice());
    }

    #[test]
    fn test_reader_reads_back_fields() {
        // Every width 1..=32 with zero, all-ones, and a few random values.
        let mut fields = Vec::new();
        let mut seed = 0x1234_5678u32;
        for n in 1..=32u32 {
            let mask = if n == 32 { u32::MAX } else { (1 << n) - 1 };
            fields.push((0, n));
            fields.push((mask, n));
            for _ in 0..4 {
                seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                fields.push((seed & mask, n));
            }
        }
        let total_bits: u32 = fields.iter().map(|f| f.1).sum();
        let mut buf = vec![0u8; total_bits.div_ceil(8) as usize];
        let written = {
            let mut w = BitWriter::new(&mut buf);
            for &(v, n) in &fields {
                w.put_bits(v, n);
            }
            w.flush();
            assert!(!w.overflowed());
            w.bytes_written()
        };
        assert_eq!(written, buf.len());

        let mut r = BitReader::new(&buf[..written]);
        for &(v, n) in &fields {
            assert_eq!(r.peek_bits(n), v);
            assert_eq!(r.get_bits(n), v);
        }
        assert_eq!(r.bytes_read(), written);
        assert!(!r.is_overrun());
    }

    #[test]
    fn test_writer_overflow_is_flagged() {
        let mut buf = [0u8; 2];
        let mut w = BitWriter::new(&mut buf);
        w.put_bits(0xffff, 16);
        assert!(!w.overflowed());
        w.put_bits(1, 1);
        w.flush();
        assert!(w.overflowed());
        assert_eq!(w.bytes_written(), 2);
    }

    #[test]
    fn test_reader_zero_fills_and_reports_overrun() {
        let data = [0xffu8];
        let mut r = BitReader::new(&data);
        assert_eq!(r.get_bits(4), 0xf);
        assert_eq!(r.bytes_read(), 1);
        assert!(!r.is_overrun());
        assert_eq!(r.get_bits(8), 0xf0);
        assert_eq!(r.bytes_read(), 2);
        assert!(r.is_overrun());
    }

    #[test]
    fn test_empty_reader() {
        let r = BitReader::new(&[]);
        assert_eq!(r.peek_bits(32), 0);
        assert_eq!(r.bytes_read(), 0);
        assert!(!r.is_overrun());
    }
}
