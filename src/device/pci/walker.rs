//! # Capability Chain Walkers
//!
//! Capabilities form linked lists inside the Configuration Space. The links are under control of
//! the device (or whoever produced the snapshot), so following them blindly can loop forever or
//! leave the capability region. The walkers in this module follow a list lazily and stop at the
//! first link that is misaligned, out of bounds or points to an already visited capability.
//!
//! A walker yields `Ok(header)` for every capability it visits. If the list ends because of a
//! broken link, the last item is the corresponding [`ChainError`]. Walkers are cheap to clone, so
//! a walk can be restarted from any point.

use std::{iter::FusedIterator, ops::Range};

use tracing::{debug, trace};

use super::{
    capability::{ExtendedCapabilityHeader, StandardCapabilityHeader},
    config_space::ConfigSpaceView,
    constants::config_space::{capability_list, extended_header, mask, standard_header},
};

/// An error that terminates the walk of a capability list.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainError {
    /// A link points to an offset that is not dword aligned.
    #[error("Capability offset {offset:#x} is not dword aligned")]
    AlignmentViolation {
        /// The offending offset.
        offset: u16,
    },

    /// A link points outside of the capability region or past the end of the snapshot.
    #[error("Capability offset {offset:#x} is out of bounds")]
    OutOfBounds {
        /// The offending offset.
        offset: u16,
    },

    /// A link points to a capability that was already visited or the list is implausibly long.
    #[error("Capability list loops back to offset {offset:#x}")]
    CycleDetected {
        /// The offset that would have been visited again.
        offset: u16,
    },
}

impl ChainError {
    /// The offset of the link that terminated the walk.
    #[must_use]
    pub const fn offset(&self) -> u16 {
        match self {
            Self::AlignmentViolation { offset }
            | Self::OutOfBounds { offset }
            | Self::CycleDetected { offset } => *offset,
        }
    }
}

/// A set of dword offsets inside the 4 KiB Configuration Space.
#[derive(Debug, Clone, Default)]
struct VisitedOffsets {
    bits: [u64; 16],
}

impl VisitedOffsets {
    /// Mark an offset as visited. Returns false if it was visited before.
    fn insert(&mut self, offset: u16) -> bool {
        let dword = usize::from(offset / 4);
        let (word, bit) = (dword / 64, dword % 64);
        let mask = 1u64 << bit;

        let fresh = self.bits[word] & mask == 0;
        self.bits[word] |= mask;
        fresh
    }
}

/// The bookkeeping shared by both walkers.
#[derive(Debug, Clone)]
struct ChainCursor {
    /// The offsets capability headers may live at.
    bounds: Range<u16>,

    /// The size of a header in bytes. A header must fit completely into the snapshot.
    header_size: u16,

    /// The offset of the next header to visit. `None` once the walk is over.
    pending: Option<u16>,

    visited: VisitedOffsets,
    yielded: usize,
}

impl ChainCursor {
    fn new(bounds: Range<u16>, header_size: u16, root: Option<u16>) -> Self {
        Self {
            bounds,
            header_size,
            pending: root,
            visited: VisitedOffsets::default(),
            yielded: 0,
        }
    }

    /// Take the pending offset, if it is safe to visit.
    ///
    /// After an error the cursor is exhausted.
    fn claim(&mut self, view_len: usize) -> Option<Result<u16, ChainError>> {
        let offset = self.pending.take()?;

        let fits_view = usize::from(offset) + usize::from(self.header_size) <= view_len;

        let verdict = if offset & mask::CAPABILITY_ALIGNMENT != 0 {
            Err(ChainError::AlignmentViolation { offset })
        } else if !self.bounds.contains(&offset) || !fits_view {
            Err(ChainError::OutOfBounds { offset })
        } else if self.yielded == capability_list::MAX_ENTRIES || !self.visited.insert(offset) {
            Err(ChainError::CycleDetected { offset })
        } else {
            self.yielded += 1;
            Ok(offset)
        };

        if let Err(error) = verdict {
            debug!("Stopping capability walk: {error}");
        }

        Some(verdict)
    }

    /// Schedule the next offset to visit. A zero link ends the walk.
    fn link(&mut self, next: u16) {
        self.pending = (next != 0).then_some(next);
    }
}

/// A lazy walk over the standard capability list. Created by [`walk_standard`].
#[derive(Debug, Clone)]
pub struct StandardWalker<'a> {
    view: ConfigSpaceView<'a>,
    cursor: ChainCursor,
}

/// Walk the standard capability list starting at `root`.
///
/// `root` is the capabilities pointer from the fixed header. A value of zero yields an empty walk.
/// See [`ConfigSpaceView::capabilities_pointer`] for a way to obtain it.
#[must_use]
pub fn walk_standard(view: ConfigSpaceView<'_>, root: u8) -> StandardWalker<'_> {
    StandardWalker {
        view,
        cursor: ChainCursor::new(
            capability_list::STANDARD_START..capability_list::STANDARD_END,
            standard_header::SIZE,
            (root != capability_list::END_OF_LIST).then_some(root.into()),
        ),
    }
}

impl Iterator for StandardWalker<'_> {
    type Item = Result<StandardCapabilityHeader, ChainError>;

    fn next(&mut self) -> Option<Self::Item> {
        let offset = match self.cursor.claim(self.view.len())? {
            Ok(offset) => offset,
            Err(error) => return Some(Err(error)),
        };

        // The cursor only hands out offsets below 0x100 that fit the view, so neither of these
        // fail in practice.
        let Some(header) = u8::try_from(offset)
            .ok()
            .and_then(|offset| StandardCapabilityHeader::read(&self.view, offset))
        else {
            return Some(Err(ChainError::OutOfBounds { offset }));
        };

        trace!(
            "standard capability {:#04x} at {:#04x}, next {:#04x}",
            header.id,
            header.offset,
            header.next
        );

        self.cursor.link(header.next.into());
        Some(Ok(header))
    }
}

impl FusedIterator for StandardWalker<'_> {}

/// A lazy walk over the PCI Express extended capability list. Created by [`walk_extended`].
#[derive(Debug, Clone)]
pub struct ExtendedWalker<'a> {
    view: ConfigSpaceView<'a>,
    cursor: ChainCursor,
}

/// Walk the extended capability list from its fixed root at offset `0x100`.
///
/// The walk is empty if the snapshot does not contain the extended space or if the function
/// reports no extended capabilities.
#[must_use]
pub fn walk_extended(view: ConfigSpaceView<'_>) -> ExtendedWalker<'_> {
    walk_extended_from(view, capability_list::EXTENDED_ROOT)
}

/// Walk the extended capability list starting at an arbitrary `root`.
///
/// Extended capabilities only live in `0x100..0x1000`. A `root` outside of this region ends the
/// walk with [`ChainError::OutOfBounds`]. Everyone else should use [`walk_extended`].
#[must_use]
pub fn walk_extended_from(view: ConfigSpaceView<'_>, root: u16) -> ExtendedWalker<'_> {
    let bounds = capability_list::EXTENDED_ROOT..capability_list::EXTENDED_END;

    // A missing header, an all-zero header or the all-ones pattern of an unreachable extended
    // space all mean that there is nothing to walk.
    let has_capabilities = !bounds.contains(&root)
        || view.u32_le_at(root).is_some_and(|dword| {
            dword != capability_list::ABSENT_HEADER
                && !ExtendedCapabilityHeader::from_dword(root, dword).is_null()
        });

    if !has_capabilities {
        trace!("no extended capabilities at {root:#05x}");
    }

    ExtendedWalker {
        view,
        cursor: ChainCursor::new(bounds, extended_header::SIZE, has_capabilities.then_some(root)),
    }
}

impl Iterator for ExtendedWalker<'_> {
    type Item = Result<ExtendedCapabilityHeader, ChainError>;

    fn next(&mut self) -> Option<Self::Item> {
        let offset = match self.cursor.claim(self.view.len())? {
            Ok(offset) => offset,
            Err(error) => return Some(Err(error)),
        };

        let Some(header) = ExtendedCapabilityHeader::read(&self.view, offset) else {
            return Some(Err(ChainError::OutOfBounds { offset }));
        };

        trace!(
            "extended capability {:#06x} v{} at {:#05x}, next {:#05x}",
            header.id,
            header.version,
            header.offset,
            header.next
        );

        self.cursor.link(header.next);
        Some(Ok(header))
    }
}

impl FusedIterator for ExtendedWalker<'_> {}
