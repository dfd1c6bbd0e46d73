//! Fixed-capacity, nul-terminated text fields.

use core::fmt;

use crate::layout::TEXT_CAPACITY;

/// A 32-byte nul-terminated text field.
///
/// At most `TEXT_CAPACITY - 1` content bytes are kept. Copying stops at the
/// first embedded nul, and a cut never splits a UTF-8 character, so the stored
/// prefix is always valid UTF-8. ASCII input longer than 31 bytes keeps
/// exactly its first 31 bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedText {
    bytes: [u8; TEXT_CAPACITY],
}

impl FixedText {
    /// The empty string.
    pub const EMPTY: FixedText = FixedText {
        bytes: [0; TEXT_CAPACITY],
    };

    /// Maximum number of content bytes.
    pub const MAX_LEN: usize = TEXT_CAPACITY - 1;

    /// Build a field from `text`, silently truncating.
    #[must_use]
    pub fn new(text: &str) -> Self {
        Self::truncating(text).0
    }

    /// Build a field from `text` and report whether it was truncated.
    #[must_use]
    pub fn truncating(text: &str) -> (Self, bool) {
        let content = match text.find('\0') {
            Some(nul) => text.get(..nul).unwrap_or_default(),
            None => text,
        };

        let mut keep = content.len().min(Self::MAX_LEN);
        while !content.is_char_boundary(keep) {
            keep -= 1;
        }

        let mut bytes = [0u8; TEXT_CAPACITY];
        let src = content.as_bytes().get(..keep).unwrap_or_default();
        if let Some(dst) = bytes.get_mut(..keep) {
            dst.copy_from_slice(src);
        }

        (Self { bytes }, keep < content.len())
    }

    /// Rebuild a field from raw wire bytes.
    ///
    /// The last byte is forced to nul so a malformed buffer can never be
    /// read past its capacity.
    #[must_use]
    pub fn from_wire(mut bytes: [u8; TEXT_CAPACITY]) -> Self {
        if let Some(last) = bytes.last_mut() {
            *last = 0;
        }
        Self { bytes }
    }

    /// Raw 32-byte wire representation.
    #[inline]
    #[must_use]
    pub const fn as_wire(&self) -> &[u8; TEXT_CAPACITY] {
        &self.bytes
    }

    /// Number of content bytes before the terminator.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(Self::MAX_LEN)
    }

    /// True if the field holds no content.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.first().is_none_or(|&b| b == 0)
    }

    /// Content as a string slice.
    ///
    /// Fields decoded from foreign bytes may contain invalid UTF-8; only the
    /// longest valid prefix is returned in that case.
    #[must_use]
    pub fn as_str(&self) -> &str {
        let content = self.bytes.get(..self.len()).unwrap_or_default();
        match core::str::from_utf8(content) {
            Ok(s) => s,
            Err(e) => content
                .get(..e.valid_up_to())
                .and_then(|valid| core::str::from_utf8(valid).ok())
                .unwrap_or_default(),
        }
    }
}

impl Default for FixedText {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for FixedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl fmt::Display for FixedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for FixedText {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}
