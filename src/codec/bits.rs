//! Bit-granular stream I/O backing the adaptive codec.
//!
//! Bits are packed most-significant-first into 32-bit words. On top of the
//! fixed-width primitive the module provides the two variable-length codes
//! the adaptive codec relies on: the classical truncated (phased-in) binary
//! code for a value drawn from an arbitrary range, and the Golomb-Rice code
//! for unbounded non-negative integers. Writer and reader must traverse the
//! stream in lockstep; any divergence here corrupts every downstream pixel,
//! so the layout is normative and covered by exhaustive self-consistency
//! tests.

use byteorder::{BigEndian, ByteOrder};

use crate::utils::error::{CodecError, Result};

fn mask(n_bits: u32) -> u32 {
    if n_bits >= 32 {
        u32::MAX
    } else {
        (1u32 << n_bits) - 1
    }
}

/// Number of bits in the minimal binary code for a value in `[0, range)`.
fn code_width(range: u32) -> u32 {
    u32::BITS - (range - 1).leading_zeros()
}

/// Accumulates bits most-significant-first into a flat array of 32-bit words.
#[derive(Debug, Default)]
pub struct BitWriter {
    words: Vec<u32>,
    acc: u32,
    used: u32,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of bits written so far.
    pub fn bit_len(&self) -> u64 {
        self.words.len() as u64 * 32 + self.used as u64
    }

    /// Append the low `n_bits` of `value`, most significant bit first.
    /// `n_bits` may be 0..=32.
    pub fn write(&mut self, n_bits: u32, value: u32) {
        debug_assert!(n_bits <= 32);
        let value = value & mask(n_bits);
        let mut remaining = n_bits;
        while remaining > 0 {
            let room = 32 - self.used;
            let take = remaining.min(room);
            let chunk = (value >> (remaining - take)) & mask(take);
            self.acc |= chunk << (room - take);
            self.used += take;
            remaining -= take;
            if self.used == 32 {
                self.words.push(self.acc);
                self.acc = 0;
                self.used = 0;
            }
        }
    }

    /// Encode `value ∈ [0, range)` with the truncated (phased-in) binary
    /// code: with `b = ceil(log2(range))` and `cut = 2^b - range`, the first
    /// `cut` values take `b-1` bits, the rest take `b` bits offset by `cut`.
    /// A range of 1 carries no bits at all.
    pub fn write_truncated(&mut self, range: u32, value: u32) {
        debug_assert!(value < range.max(1));
        if range <= 1 {
            return;
        }
        let b = code_width(range);
        let cut = (1u32 << b) - range;
        if value < cut {
            self.write(b - 1, value);
        } else {
            self.write(b, value + cut);
        }
    }

    /// Golomb-Rice encode a non-negative integer with parameter `m >= 1`:
    /// quotient in unary (one-bits terminated by a zero), remainder
    /// truncated-binary over `[0, m)`.
    pub fn write_golomb(&mut self, m: u32, value: u32) {
        debug_assert!(m >= 1);
        let quotient = value / m;
        for _ in 0..quotient {
            self.write(1, 1);
        }
        self.write(1, 0);
        self.write_truncated(m, value % m);
    }

    /// Finish the stream, zero-padding the final partial word.
    pub fn result(mut self) -> Vec<u32> {
        if self.used > 0 {
            self.words.push(self.acc);
        }
        self.words
    }
}

/// Reads bits most-significant-first from a flat array of 32-bit words.
///
/// Running off the end of the words is reported as
/// [`CodecError::TruncatedStream`].
#[derive(Debug)]
pub struct BitReader<'a> {
    words: &'a [u32],
    pos: usize,
    acc: u32,
    avail: u32,
}

impl<'a> BitReader<'a> {
    pub fn new(words: &'a [u32]) -> Self {
        Self {
            words,
            pos: 0,
            acc: 0,
            avail: 0,
        }
    }

    /// Consume and return `n_bits` (0..=32) in writer order.
    pub fn read(&mut self, n_bits: u32) -> Result<u32> {
        debug_assert!(n_bits <= 32);
        let mut out = 0u32;
        let mut remaining = n_bits;
        while remaining > 0 {
            if self.avail == 0 {
                self.acc = *self.words.get(self.pos).ok_or(CodecError::TruncatedStream)?;
                self.pos += 1;
                self.avail = 32;
            }
            let take = remaining.min(self.avail);
            let chunk = (self.acc >> (self.avail - take)) & mask(take);
            out = if take == 32 { chunk } else { (out << take) | chunk };
            self.avail -= take;
            remaining -= take;
        }
        Ok(out)
    }

    /// Inverse of [`BitWriter::write_truncated`].
    pub fn read_truncated(&mut self, range: u32) -> Result<u32> {
        if range <= 1 {
            return Ok(0);
        }
        let b = code_width(range);
        let cut = (1u32 << b) - range;
        let mut value = self.read(b - 1)?;
        if value >= cut {
            value = (value << 1) | self.read(1)?;
            value -= cut;
        }
        Ok(value)
    }

    /// Inverse of [`BitWriter::write_golomb`]. A corrupt stream can declare
    /// an absurd quotient; the result saturates and is caught by the
    /// caller's range checks.
    pub fn read_golomb(&mut self, m: u32) -> Result<u32> {
        debug_assert!(m >= 1);
        let mut quotient = 0u32;
        while self.read(1)? == 1 {
            quotient = quotient.saturating_add(1);
        }
        let remainder = self.read_truncated(m)?;
        Ok(quotient.saturating_mul(m).saturating_add(remainder))
    }
}

/// Serialize an encoded word array to bytes, big-endian.
pub fn words_to_bytes(words: &[u32]) -> Vec<u8> {
    let mut bytes = vec![0u8; words.len() * 4];
    for (chunk, &word) in bytes.chunks_exact_mut(4).zip(words) {
        BigEndian::write_u32(chunk, word);
    }
    bytes
}

/// Reassemble a big-endian byte buffer into encoded words. The length must
/// be a multiple of 4.
pub fn bytes_to_words(bytes: &[u8]) -> Result<Vec<u32>> {
    if bytes.len() % 4 != 0 {
        return Err(CodecError::TruncatedStream);
    }
    Ok(bytes.chunks_exact(4).map(BigEndian::read_u32).collect())
}
