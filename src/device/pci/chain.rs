//! # Capability Chain Decoding
//!
//! This module combines the [walkers](super::walker) and the [decoders](super::decode) into a
//! complete decoded capability list. Use [`decode_chain`] for a single list or
//! [`DeviceCapabilities::decode`] for both lists of a function.
//!
//! Problems are handled with two different granularities:
//!
//! - A capability that cannot be decoded becomes a [`CapabilityRecord::Malformed`] entry. Its link
//!   to the next capability is still followed.
//! - A broken link ends the list. Everything decoded up to that point is kept and the
//!   [`ChainError`] is reported alongside.
//!
//! ## Example
//!
//! ```rust
//! use pcicaps::device::pci::{
//!     chain::{decode_chain, DeviceCapabilities},
//!     capability::ChainKind,
//!     config_space::ConfigSpaceView,
//!     image::ConfigImageBuilder,
//! };
//!
//! let image = ConfigImageBuilder::new(0x8086, 0x1234)
//!     .pcie()
//!     .extended_capability(0x0003, 1, &[0xEF, 0xBE, 0xAD, 0xDE, 0x78, 0x56, 0x34, 0x12])
//!     .build();
//! let view = ConfigSpaceView::new(&image);
//!
//! let chain = decode_chain(view, 0x100, ChainKind::Extended);
//! assert!(chain.is_complete());
//! assert_eq!(chain.serial_number().map(|dsn| dsn.serial()), Some(0x1234_5678_DEAD_BEEF));
//!
//! let caps = DeviceCapabilities::decode(view);
//! assert!(caps.standard.is_empty());
//! assert_eq!(caps.extended, chain);
//! ```

use tracing::debug;

use super::{
    capability::ChainKind,
    config_space::ConfigSpaceView,
    decode::{decode_extended, decode_standard, DecodeError},
    record::{
        AdvancedErrorReporting, BridgeSubsystemId, CapabilityRecord, DeviceSerialNumber,
        PowerManagement, ResizableBar, SataIndexData, VendorSpecific, VendorSpecificExtended,
    },
    walker::{walk_extended_from, walk_standard, ChainError},
};

/// The decoded capabilities of one capability list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedChain {
    records: Vec<CapabilityRecord>,
    error: Option<ChainError>,
}

impl DecodedChain {
    /// All records in list order.
    #[must_use]
    pub fn records(&self) -> &[CapabilityRecord] {
        &self.records
    }

    /// The error that cut the list short, if any.
    #[must_use]
    pub const fn error(&self) -> Option<ChainError> {
        self.error
    }

    /// Whether the list was walked until its regular end.
    ///
    /// Records of a complete list can still be malformed.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// The number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the list contains no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over all records in list order.
    #[must_use]
    pub fn iter(&self) -> std::slice::Iter<'_, CapabilityRecord> {
        self.records.iter()
    }

    /// Split into the records and the terminating error.
    #[must_use]
    pub fn into_parts(self) -> (Vec<CapabilityRecord>, Option<ChainError>) {
        (self.records, self.error)
    }

    /// Return the first record for which `f` returns something.
    fn find<'a, T>(&'a self, f: impl Fn(&'a CapabilityRecord) -> Option<&'a T>) -> Option<&'a T> {
        self.records.iter().find_map(f)
    }

    /// The first Power Management capability.
    #[must_use]
    pub fn power_management(&self) -> Option<&PowerManagement> {
        self.find(|record| match record {
            CapabilityRecord::PowerManagement(pm) => Some(pm),
            _ => None,
        })
    }

    /// The first Bridge Subsystem Vendor ID capability.
    #[must_use]
    pub fn bridge_subsystem_id(&self) -> Option<&BridgeSubsystemId> {
        self.find(|record| match record {
            CapabilityRecord::BridgeSubsystemId(ssvid) => Some(ssvid),
            _ => None,
        })
    }

    /// The first SATA capability.
    #[must_use]
    pub fn sata(&self) -> Option<&SataIndexData> {
        self.find(|record| match record {
            CapabilityRecord::SataIndexData(sata) => Some(sata),
            _ => None,
        })
    }

    /// All vendor-specific standard capabilities.
    #[must_use]
    pub fn vendor_specific(&self) -> impl Iterator<Item = &VendorSpecific> {
        self.records.iter().filter_map(|record| match record {
            CapabilityRecord::VendorSpecific(vendor) => Some(vendor),
            _ => None,
        })
    }

    /// The Advanced Error Reporting capability.
    #[must_use]
    pub fn advanced_error_reporting(&self) -> Option<&AdvancedErrorReporting> {
        self.find(|record| match record {
            CapabilityRecord::AdvancedErrorReporting(aer) => Some(aer),
            _ => None,
        })
    }

    /// The Resizable BAR capability.
    #[must_use]
    pub fn resizable_bar(&self) -> Option<&ResizableBar> {
        self.find(|record| match record {
            CapabilityRecord::ResizableBar(rebar) => Some(rebar),
            _ => None,
        })
    }

    /// The Device Serial Number capability.
    #[must_use]
    pub fn serial_number(&self) -> Option<&DeviceSerialNumber> {
        self.find(|record| match record {
            CapabilityRecord::DeviceSerialNumber(dsn) => Some(dsn),
            _ => None,
        })
    }

    /// All vendor-specific extended capabilities.
    #[must_use]
    pub fn vendor_specific_extended(&self) -> impl Iterator<Item = &VendorSpecificExtended> {
        self.records.iter().filter_map(|record| match record {
            CapabilityRecord::VendorSpecificExtended(vsec) => Some(vsec),
            _ => None,
        })
    }

    /// All capabilities that could not be decoded.
    #[must_use]
    pub fn malformed(&self) -> impl Iterator<Item = &DecodeError> {
        self.records.iter().filter_map(|record| match record {
            CapabilityRecord::Malformed { error, .. } => Some(error),
            _ => None,
        })
    }
}

impl<'a> IntoIterator for &'a DecodedChain {
    type Item = &'a CapabilityRecord;
    type IntoIter = std::slice::Iter<'a, CapabilityRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Drain a walk, decoding every header it yields.
fn collect_chain<H>(
    walk: impl Iterator<Item = Result<H, ChainError>>,
    decode: impl Fn(&H) -> Result<CapabilityRecord, DecodeError>,
    locate: impl Fn(&H) -> (u16, u16),
) -> DecodedChain {
    let mut chain = DecodedChain::default();

    for item in walk {
        match item {
            Ok(header) => {
                let record = decode(&header).unwrap_or_else(|error| {
                    let (offset, tag) = locate(&header);
                    CapabilityRecord::Malformed { offset, tag, error }
                });

                chain.records.push(record);
            }
            Err(error) => {
                chain.error = Some(error);
                break;
            }
        }
    }

    chain
}

/// Decode one capability list.
///
/// For [`ChainKind::Standard`], `root` is the capabilities pointer. For [`ChainKind::Extended`],
/// it is the location of the first extended capability, which is `0x100` for all PCI Express
/// functions.
#[must_use]
pub fn decode_chain(view: ConfigSpaceView<'_>, root: u16, kind: ChainKind) -> DecodedChain {
    let chain = match kind {
        ChainKind::Standard => match u8::try_from(root) {
            Ok(root) => collect_chain(
                walk_standard(view, root),
                |header| decode_standard(&view, header),
                |header| (header.offset.into(), header.id.into()),
            ),
            Err(_) => DecodedChain {
                records: Vec::new(),
                error: Some(ChainError::OutOfBounds { offset: root }),
            },
        },
        ChainKind::Extended => collect_chain(
            walk_extended_from(view, root),
            |header| decode_extended(&view, header),
            |header| (header.offset, header.id),
        ),
    };

    if let Some(error) = chain.error {
        debug!(
            "{kind} capability list cut short after {} records: {error}",
            chain.len()
        );
    }

    chain
}

/// Both capability lists of a single PCI function.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceCapabilities {
    /// The standard capability list.
    pub standard: DecodedChain,

    /// The PCI Express extended capability list.
    pub extended: DecodedChain,
}

impl DeviceCapabilities {
    /// Decode both capability lists of a function.
    ///
    /// The capabilities pointer is taken from the fixed header. The extended list is only
    /// decoded if the snapshot covers the extended space.
    #[must_use]
    pub fn decode(view: ConfigSpaceView<'_>) -> Self {
        Self::decode_with_pointer(view, view.capabilities_pointer().unwrap_or(0))
    }

    /// Decode both capability lists of a function with an explicit capabilities pointer.
    #[must_use]
    pub fn decode_with_pointer(view: ConfigSpaceView<'_>, capabilities_pointer: u8) -> Self {
        Self {
            standard: decode_chain(view, capabilities_pointer.into(), ChainKind::Standard),
            extended: if view.has_extended_space() {
                decode_chain(
                    view,
                    super::constants::config_space::capability_list::EXTENDED_ROOT,
                    ChainKind::Extended,
                )
            } else {
                DecodedChain::default()
            },
        }
    }

    /// The chain of the given kind.
    #[must_use]
    pub const fn chain(&self, kind: ChainKind) -> &DecodedChain {
        match kind {
            ChainKind::Standard => &self.standard,
            ChainKind::Extended => &self.extended,
        }
    }
}
