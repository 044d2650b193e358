//! # PCI Capability Headers
//!
//! Every capability starts with a small header that names its type and links to the next
//! capability. Conventional capabilities use a two byte header, PCI Express extended capabilities
//! a single dword. This module models both shapes.

use std::fmt;

use super::{
    config_space::ConfigSpaceView,
    constants::config_space::{extended_header, standard_header},
};

/// The two independently rooted capability lists of a PCI function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainKind {
    /// The list in the first 256 bytes, rooted at the capabilities pointer.
    Standard,

    /// The PCI Express extended list, rooted at offset `0x100`.
    Extended,
}

impl fmt::Display for ChainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => write!(f, "standard"),
            Self::Extended => write!(f, "extended"),
        }
    }
}

/// The header of a conventional PCI capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandardCapabilityHeader {
    /// The Configuration Space offset of the header.
    pub offset: u8,

    /// The capability ID.
    pub id: u8,

    /// The offset of the next capability or 0 at the end of the list.
    pub next: u8,
}

impl StandardCapabilityHeader {
    /// Read the header located at `offset`.
    ///
    /// Returns `None` if the header does not fit into the view.
    #[must_use]
    pub fn read(view: &ConfigSpaceView<'_>, offset: u8) -> Option<Self> {
        let base = u16::from(offset);

        Some(Self {
            offset,
            id: view.u8_at(base + standard_header::ID)?,
            next: view.u8_at(base + standard_header::NEXT)?,
        })
    }
}

/// The header of a PCI Express extended capability.
///
/// The header is a single dword: the capability ID in bits 15:0, the capability version in bits
/// 19:16 and the offset of the next capability in bits 31:20.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtendedCapabilityHeader {
    /// The Configuration Space offset of the header.
    pub offset: u16,

    /// The extended capability ID.
    pub id: u16,

    /// The 4-bit capability version.
    pub version: u8,

    /// The 12-bit offset of the next capability or 0 at the end of the list.
    pub next: u16,
}

impl ExtendedCapabilityHeader {
    /// Split a raw header dword into its fields.
    #[must_use]
    pub const fn from_dword(offset: u16, dword: u32) -> Self {
        Self {
            offset,
            id: (dword & extended_header::ID_MASK) as u16,
            version: ((dword >> extended_header::VERSION_SHIFT) & extended_header::VERSION_MASK)
                as u8,
            next: ((dword >> extended_header::NEXT_SHIFT) & extended_header::NEXT_MASK) as u16,
        }
    }

    /// Read the header located at `offset`.
    ///
    /// Returns `None` if the header does not fit into the view.
    #[must_use]
    pub fn read(view: &ConfigSpaceView<'_>, offset: u16) -> Option<Self> {
        view.u32_le_at(offset)
            .map(|dword| Self::from_dword(offset, dword))
    }

    /// Whether this header carries neither an ID nor a link.
    ///
    /// At the root of the extended list this means the function has no extended capabilities.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        self.id == 0 && self.next == 0
    }
}
