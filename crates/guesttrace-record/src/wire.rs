//! Little-endian cursor helpers over fixed buffers.

use crate::error::RecordError;
use crate::layout::{MAX_RECORD_SIZE, TEXT_CAPACITY};
use crate::text::FixedText;

/// Sequential writer over a record buffer.
///
/// Layouts are fixed at compile time and always fit `MAX_RECORD_SIZE`, so
/// writes past the end are impossible for well-formed layouts; they are
/// ignored rather than allowed to panic.
pub(crate) struct Writer<'a> {
    buf: &'a mut [u8; MAX_RECORD_SIZE],
    pos: usize,
}

impl<'a> Writer<'a> {
    pub(crate) fn new(buf: &'a mut [u8; MAX_RECORD_SIZE], pos: usize) -> Self {
        Self { buf, pos }
    }

    fn put(&mut self, src: &[u8]) {
        let end = self.pos.saturating_add(src.len());
        if let Some(dst) = self.buf.get_mut(self.pos..end) {
            dst.copy_from_slice(src);
        }
        self.pos = end;
    }

    pub(crate) fn u8(&mut self, v: u8) {
        self.put(&[v]);
    }

    pub(crate) fn u16(&mut self, v: u16) {
        self.put(&v.to_le_bytes());
    }

    pub(crate) fn u32(&mut self, v: u32) {
        self.put(&v.to_le_bytes());
    }

    pub(crate) fn i32(&mut self, v: i32) {
        self.put(&v.to_le_bytes());
    }

    pub(crate) fn u64(&mut self, v: u64) {
        self.put(&v.to_le_bytes());
    }

    pub(crate) fn text(&mut self, text: &FixedText) {
        self.put(text.as_wire());
    }

    pub(crate) fn zeros(&mut self, n: usize) {
        self.pos = self.pos.saturating_add(n);
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }
}

/// Sequential reader over a decoded record.
pub(crate) struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(bytes: &'a [u8], pos: usize) -> Self {
        Self { bytes, pos }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], RecordError> {
        let end = self.pos.saturating_add(N);
        let chunk = self
            .bytes
            .get(self.pos..end)
            .ok_or(RecordError::Truncated {
                needed: end,
                available: self.bytes.len(),
            })?;
        let mut out = [0u8; N];
        out.copy_from_slice(chunk);
        self.pos = end;
        Ok(out)
    }

    pub(crate) fn u8(&mut self) -> Result<u8, RecordError> {
        self.take::<1>().map(|[b]| b)
    }

    pub(crate) fn u16(&mut self) -> Result<u16, RecordError> {
        self.take().map(u16::from_le_bytes)
    }

    pub(crate) fn u32(&mut self) -> Result<u32, RecordError> {
        self.take().map(u32::from_le_bytes)
    }

    pub(crate) fn i32(&mut self) -> Result<i32, RecordError> {
        self.take().map(i32::from_le_bytes)
    }

    pub(crate) fn u64(&mut self) -> Result<u64, RecordError> {
        self.take().map(u64::from_le_bytes)
    }

    pub(crate) fn text(&mut self) -> Result<FixedText, RecordError> {
        self.take::<TEXT_CAPACITY>().map(FixedText::from_wire)
    }

    pub(crate) fn skip(&mut self, n: usize) -> Result<(), RecordError> {
        let end = self.pos.saturating_add(n);
        if end > self.bytes.len() {
            return Err(RecordError::Truncated {
                needed: end,
                available: self.bytes.len(),
            });
        }
        self.pos = end;
        Ok(())
    }
}
