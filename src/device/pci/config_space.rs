//! # PCI Configuration Space Access
//!
//! This module contains [`ConfigSpaceView`], a read-only window onto a snapshot of one function's
//! Configuration Space. All capability decoding goes through it.

use tracing::warn;

use crate::device::request::{Request, RequestSize};

use super::constants::config_space::{
    self, command, mask::CAPABILITIES_POINTER as CAPABILITY_POINTER_MASK, offset, status,
};

/// Fold a sequence of at most four bytes into a little-endian value.
///
/// Requests are at most a dword wide, which keeps the shift in range.
fn fold_iter_le(it: impl Iterator<Item = u8>) -> u32 {
    it.take(4)
        .enumerate()
        .fold(0, |acc, (pos, byte)| acc | (u32::from(byte) << (pos * 8)))
}

/// An immutable view onto the Configuration Space of a single PCI function.
///
/// The view borrows a caller-owned buffer. This is usually 256 bytes for conventional PCI
/// functions or 4096 bytes when the PCI Express extended space is available. Shorter buffers are
/// accepted, but any access past their end fails.
///
/// PCI Configuration Space is little-endian regardless of the host byte order, so all multi-byte
/// accessors assemble their values byte by byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigSpaceView<'a> {
    data: &'a [u8],
}

impl<'a> ConfigSpaceView<'a> {
    /// Create a view onto a Configuration Space snapshot.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// The number of bytes visible through this view.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the view contains no bytes at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether the snapshot reaches beyond the conventional 256 byte space.
    #[must_use]
    pub const fn has_extended_space(&self) -> bool {
        self.data.len() > config_space::SIZE
    }

    /// Restrict the view to its first `len` bytes.
    ///
    /// Views that are already shorter stay unchanged.
    #[must_use]
    pub fn limit(&self, len: usize) -> Self {
        Self::new(&self.data[..len.min(self.data.len())])
    }

    /// Read a little-endian value.
    ///
    /// Returns `None` if any byte of the request lies outside of the view.
    #[must_use]
    pub fn read(&self, req: Request) -> Option<u32> {
        let bytes = self.data.get(req.range())?;

        Some(fold_iter_le(bytes.iter().copied()))
    }

    /// Read a byte at the given offset.
    #[must_use]
    pub fn u8_at(&self, offset: u16) -> Option<u8> {
        self.read(Request::new(offset, RequestSize::Size1))
            .map(|v| v as u8)
    }

    /// Read a little-endian 16-bit value at the given offset.
    #[must_use]
    pub fn u16_le_at(&self, offset: u16) -> Option<u16> {
        self.read(Request::new(offset, RequestSize::Size2))
            .map(|v| v as u16)
    }

    /// Read a little-endian 32-bit value at the given offset.
    #[must_use]
    pub fn u32_le_at(&self, offset: u16) -> Option<u32> {
        self.read(Request::new(offset, RequestSize::Size4))
    }

    /// Borrow `len` raw bytes starting at `offset`.
    ///
    /// Callers that keep the bytes beyond the lifetime of the view must copy them.
    #[must_use]
    pub fn bytes_at(&self, offset: u16, len: usize) -> Option<&'a [u8]> {
        let start = usize::from(offset);
        let end = start.checked_add(len)?;

        self.data.get(start..end)
    }

    /// Returns true if `len` bytes starting at `offset` are inside the view.
    #[must_use]
    pub fn contains(&self, offset: u16, len: usize) -> bool {
        self.bytes_at(offset, len).is_some()
    }

    /// Read the capabilities pointer from the fixed header.
    ///
    /// Returns `None` if the function does not announce a capability list in its status register
    /// or if the header is not part of the view. The two reserved low bits of the pointer are
    /// masked off as the PCI specification requires.
    #[must_use]
    pub fn capabilities_pointer(&self) -> Option<u8> {
        let status = self.u16_le_at(offset::STATUS as u16)?;

        if status & status::CAPABILITIES == 0 {
            return None;
        }

        let raw = self.u8_at(offset::CAPABILITIES_POINTER as u16)?;

        if raw & !CAPABILITY_POINTER_MASK != 0 {
            warn!("Capabilities pointer {raw:#04x} has reserved bits set");
        }

        Some(raw & CAPABILITY_POINTER_MASK)
    }

    /// Whether the Bus Master Enable bit is set in the command register.
    #[must_use]
    pub fn bus_master_enabled(&self) -> Option<bool> {
        self.u16_le_at(offset::COMMAND as u16)
            .map(|command| command & command::BUS_MASTER != 0)
    }
}

impl<'a> From<&'a [u8]> for ConfigSpaceView<'a> {
    fn from(data: &'a [u8]) -> Self {
        Self::new(data)
    }
}
