//! Size-Prefixed Frame Reader
//!
//! Stream IPC mengirim buffer size-prefixed berurutan:
//! `[len][payload][len][payload]...`
//! Reader ini memotong stream menjadi frame utuh tanpa copy.

use super::scalar::read_scalar;
use super::SIZE_PREFIX;

/// Zero-copy iterator atas frame size-prefixed
pub struct FrameReader<'a> {
    buffer: &'a [u8],
    read_pos: usize,
}

impl<'a> FrameReader<'a> {
    #[inline(always)]
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            read_pos: 0,
        }
    }

    /// Frame berikutnya, termasuk prefix-nya, siap untuk
    /// `size_prefixed_root_as_*`. `None` jika frame belum lengkap.
    #[inline(always)]
    pub fn next_frame(&mut self) -> Option<&'a [u8]> {
        if self.read_pos + SIZE_PREFIX > self.buffer.len() {
            return None;
        }

        let len = read_scalar::<u32>(self.buffer, self.read_pos) as usize;
        let end = self.read_pos + SIZE_PREFIX + len;
        if end > self.buffer.len() {
            // Frame parsial, tunggu bytes berikutnya
            return None;
        }

        let frame = &self.buffer[self.read_pos..end];
        self.read_pos = end;
        Some(frame)
    }

    /// Bytes yang sudah dikonsumsi sebagai frame utuh
    #[inline(always)]
    pub fn consumed(&self) -> usize {
        self.read_pos
    }

    /// Sisa bytes (frame parsial) yang belum dikonsumsi
    #[inline(always)]
    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.read_pos)
    }
}

impl<'a> Iterator for FrameReader<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        self.next_frame()
    }
}
