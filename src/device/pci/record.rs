//! # Decoded Capability Records
//!
//! [`CapabilityRecord`] is the closed set of capability shapes this crate understands, plus
//! pass-through variants for unknown and broken capabilities. Records own all their data. They
//! never borrow from the snapshot they were decoded from.

use std::fmt;

use super::{constants::config_space::power_management, decode::DecodeError};

/// Bridge Subsystem Vendor ID capability (PCI-to-PCI Bridge Architecture Specification).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeSubsystemId {
    /// The subsystem vendor ID.
    pub subsystem_vendor_id: u16,

    /// The subsystem ID.
    pub subsystem_id: u16,
}

/// The power states of a PCI function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum PowerState {
    D0,
    D1,
    D2,
    D3Hot,
}

/// PCI Power Management Interface capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerManagement {
    /// Power Management Capabilities (PMC).
    pub capabilities: u16,

    /// Power Management Control/Status (PMCSR).
    pub control_status: u16,

    /// PMCSR PCI-to-PCI bridge support extensions.
    pub bridge_extensions: u8,

    /// The optional data register.
    pub data: u8,

    /// The Bus Master Enable bit of the command register at the time of decoding.
    ///
    /// Functions lose their command register when they transition from D3hot to D0. Capturing
    /// the bit alongside the power state allows restoring it afterwards.
    pub bus_master: bool,
}

impl PowerManagement {
    /// The version of the power management interface the function complies with.
    #[must_use]
    pub const fn version(&self) -> u8 {
        (self.capabilities & 0x7) as u8
    }

    /// The power states from which the function can assert PME#, one bit per state.
    #[must_use]
    pub const fn pme_support(&self) -> u8 {
        (self.capabilities >> 11) as u8
    }

    /// The current power state.
    #[must_use]
    pub const fn power_state(&self) -> PowerState {
        match self.control_status & power_management::POWER_STATE_MASK {
            0 => PowerState::D0,
            1 => PowerState::D1,
            2 => PowerState::D2,
            _ => PowerState::D3Hot,
        }
    }
}

/// Serial ATA Capability for the Index-Data Pair access mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SataIndexData {
    /// Major revision of the SATA capability.
    pub revision_major: u8,

    /// Minor revision of the SATA capability.
    pub revision_minor: u8,

    /// Which BAR holds the Index-Data Pair. Encoded as in the SATA capability register.
    pub bar_location: u8,

    /// The offset of the Index-Data Pair inside the BAR, in dwords.
    pub bar_offset: u32,
}

/// Vendor-specific standard capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorSpecific {
    /// The capability length as declared by the device, including the generic header.
    pub declared_length: u8,

    /// Everything after the generic two byte header, starting with the length byte.
    pub data: Vec<u8>,
}

/// Advanced Error Reporting extended capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvancedErrorReporting {
    /// The raw extended capability header.
    pub header: u32,
    /// Uncorrectable Error Status Register.
    pub uncorrectable_status: u32,
    /// Uncorrectable Error Mask Register.
    pub uncorrectable_mask: u32,
    /// Uncorrectable Error Severity Register.
    pub uncorrectable_severity: u32,
    /// Correctable Error Status Register.
    pub correctable_status: u32,
    /// Correctable Error Mask Register.
    pub correctable_mask: u32,
    /// Advanced Error Capabilities and Control Register.
    pub capabilities_control: u32,
    /// Header Log Register.
    pub header_log: [u32; 4],
    /// Root Error Command Register.
    pub root_error_command: u32,
    /// Root Error Status Register.
    pub root_error_status: u32,
    /// Correctable Error Source Identification.
    pub correctable_source_id: u16,
    /// ERR_FATAL/NONFATAL Source Identification.
    pub error_source_id: u16,
    /// TLP Prefix Log Register.
    pub tlp_prefix_log: [u32; 4],
}

impl AdvancedErrorReporting {
    /// Whether any unmasked uncorrectable error is logged.
    #[must_use]
    pub const fn has_uncorrectable_errors(&self) -> bool {
        self.uncorrectable_status & !self.uncorrectable_mask != 0
    }

    /// Whether any unmasked correctable error is logged.
    #[must_use]
    pub const fn has_correctable_errors(&self) -> bool {
        self.correctable_status & !self.correctable_mask != 0
    }

    /// The bit position of the first reported uncorrectable error.
    #[must_use]
    pub const fn first_error_pointer(&self) -> u8 {
        (self.capabilities_control & 0x1f) as u8
    }
}

/// A single entry of the Resizable BAR capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizableBarEntry {
    /// The Resizable BAR Capability Register. Bit `n` (starting at 4) announces support for a
    /// BAR size of `2^(n - 4)` MiB.
    pub size_vector: u32,

    /// The index of the BAR this entry controls.
    pub control_index: u8,

    /// The currently programmed BAR size as `log2` of the size in MiB.
    pub control_size: u8,
}

impl ResizableBarEntry {
    /// The currently programmed BAR size in bytes.
    #[must_use]
    pub const fn current_size(&self) -> u64 {
        (1 << 20) << self.control_size
    }

    /// Whether the BAR supports a size of `2^log2_mib` MiB.
    #[must_use]
    pub const fn supports_size(&self, log2_mib: u8) -> bool {
        log2_mib < 28 && self.size_vector & (1 << (log2_mib + 4)) != 0
    }
}

/// Resizable BAR extended capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizableBar {
    /// The number of resizable BARs as announced by the first entry.
    pub num_bars: u8,

    /// The capability dword of the first entry. It is kept even if `num_bars` is zero.
    pub vector: u32,

    /// Exactly `num_bars` entries.
    pub entries: Vec<ResizableBarEntry>,
}

/// Device Serial Number extended capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceSerialNumber {
    /// The lower dword of the serial number.
    pub low: u32,

    /// The upper dword of the serial number.
    pub high: u32,
}

impl DeviceSerialNumber {
    /// The full 64-bit serial number.
    #[must_use]
    pub const fn serial(&self) -> u64 {
        ((self.high as u64) << 32) | self.low as u64
    }
}

/// Vendor-specific extended capability (VSEC).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorSpecificExtended {
    /// The vendor-defined VSEC ID.
    pub vsec_id: u16,

    /// The raw VSEC length (bits 15:4) and revision (bits 3:0).
    pub length_and_revision: u16,

    /// Everything after the eight byte header.
    pub data: Vec<u8>,
}

impl VendorSpecificExtended {
    /// The length of the capability in bytes, including all headers.
    #[must_use]
    pub const fn length(&self) -> u16 {
        self.length_and_revision >> 4
    }

    /// The vendor-defined VSEC revision.
    #[must_use]
    pub const fn revision(&self) -> u8 {
        (self.length_and_revision & 0xf) as u8
    }
}

/// A decoded capability.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum CapabilityRecord {
    BridgeSubsystemId(BridgeSubsystemId),
    PowerManagement(PowerManagement),
    SataIndexData(SataIndexData),
    VendorSpecific(VendorSpecific),
    AdvancedErrorReporting(AdvancedErrorReporting),
    ResizableBar(ResizableBar),
    DeviceSerialNumber(DeviceSerialNumber),
    VendorSpecificExtended(VendorSpecificExtended),

    /// A capability whose ID we don't know. It is passed through as is.
    RawOpaque {
        /// The capability ID.
        tag: u16,
        /// The offset of the capability header.
        offset: u16,
    },

    /// A known capability whose content could not be decoded.
    Malformed {
        /// The offset of the capability header.
        offset: u16,
        /// The capability ID.
        tag: u16,
        /// What went wrong.
        error: DecodeError,
    },
}

impl CapabilityRecord {
    /// Returns true if this record could not be decoded.
    #[must_use]
    pub const fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }
}

/// Format a payload as space separated hex bytes.
fn hex_bytes(data: &[u8]) -> String {
    data.iter()
        .map(|byte| format!("{byte:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

impl fmt::Display for CapabilityRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BridgeSubsystemId(ssvid) => write!(
                f,
                "Bridge subsystem ID: vendor {:#06x} subsystem {:#06x}",
                ssvid.subsystem_vendor_id, ssvid.subsystem_id
            ),
            Self::PowerManagement(pm) => write!(
                f,
                "Power management v{}: {:?}, PMC {:#06x}, PMCSR {:#06x}, bus master {}",
                pm.version(),
                pm.power_state(),
                pm.capabilities,
                pm.control_status,
                if pm.bus_master { "on" } else { "off" }
            ),
            Self::SataIndexData(sata) => write!(
                f,
                "SATA index-data pair r{}.{}: BAR location {:#x}, offset {:#x}",
                sata.revision_major, sata.revision_minor, sata.bar_location, sata.bar_offset
            ),
            Self::VendorSpecific(vendor) => write!(
                f,
                "Vendor specific ({} bytes): {}",
                vendor.declared_length,
                hex_bytes(&vendor.data)
            ),
            Self::AdvancedErrorReporting(aer) => write!(
                f,
                "Advanced error reporting: uncorrectable {:#010x}/{:#010x}, correctable {:#010x}/{:#010x}",
                aer.uncorrectable_status,
                aer.uncorrectable_mask,
                aer.correctable_status,
                aer.correctable_mask
            ),
            Self::ResizableBar(rebar) => {
                write!(f, "Resizable BAR ({} BARs):", rebar.num_bars)?;
                for entry in &rebar.entries {
                    write!(
                        f,
                        " BAR{} {} MiB (sizes {:#x})",
                        entry.control_index,
                        entry.current_size() >> 20,
                        entry.size_vector >> 4
                    )?;
                }
                Ok(())
            }
            Self::DeviceSerialNumber(dsn) => {
                write!(f, "Device serial number: {:016x}", dsn.serial())
            }
            Self::VendorSpecificExtended(vsec) => write!(
                f,
                "Vendor specific extended ID {:#06x} rev {} ({} bytes): {}",
                vsec.vsec_id,
                vsec.revision(),
                vsec.length(),
                hex_bytes(&vsec.data)
            ),
            Self::RawOpaque { tag, offset } => {
                write!(f, "Unknown capability {tag:#06x} at {offset:#05x}")
            }
            Self::Malformed { error, .. } => write!(f, "Malformed capability: {error}"),
        }
    }
}
