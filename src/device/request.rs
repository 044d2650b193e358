//! # Sized Register Requests
//!
//! Configuration Space registers are read with naturally sized accesses of at most a dword. This
//! module provides the offset-size pair that describes such an access. See [`Request`] for a
//! starting point.

use std::ops::Range;

/// The size of register requests.
///
/// We don't use plain integers here to prevent use with illegal
/// sizes. [`RequestSize`] can be converted into a [`usize`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum RequestSize {
    Size1 = 1,
    Size2 = 2,
    Size4 = 4,
}

impl From<RequestSize> for usize {
    fn from(r: RequestSize) -> Self {
        r as Self
    }
}

/// The offset-size pair for a Configuration Space read.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Request {
    /// The byte offset into the Configuration Space.
    pub offset: u16,

    /// The size of this request.
    pub size: RequestSize,
}

impl Request {
    /// Create a new request from offset and size.
    #[must_use]
    pub const fn new(offset: u16, size: RequestSize) -> Self {
        Self { offset, size }
    }

    /// The bytes touched by this request.
    ///
    /// Offsets are 16-bit, so the range cannot wrap around.
    #[must_use]
    pub fn range(&self) -> Range<usize> {
        let start = usize::from(self.offset);

        start..start + usize::from(self.size)
    }
}
