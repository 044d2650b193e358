//! # PCI Constants
//!
//! This module collects PCI related constants. All definitions are derived from the PCI
//! Spec, either the "PCI Local Bus Specification" or newer "PCI Express Base Specification"
//! documents.

// Allow missing docs to avoid duplicating the PCI spec for all constants.
#![allow(missing_docs)]

/// Constants related to the configuration space.
pub mod config_space {

    /// The size of the conventional configuration space of a single PCI function in bytes.
    pub const SIZE: usize = 256;

    /// The size of the PCI Express extended configuration space in bytes.
    pub const EXTENDED_SIZE: usize = 4096;

    /// The size of the fixed type 0/1 header that precedes the capabilities.
    pub const HEADER_SIZE: usize = 0x40;

    /// Masks for various configuration space fields.
    pub mod mask {
        pub const CAPABILITIES_POINTER: u8 = 0xfc;
        pub const CAPABILITY_ALIGNMENT: u16 = 0x3;
    }

    /// The offsets of various fields in the configuration space.
    pub mod offset {
        pub const VENDOR: usize = 0x0;
        pub const DEVICE: usize = 0x2;
        pub const COMMAND: usize = 0x4;
        pub const STATUS: usize = 0x6;
        pub const CAPABILITIES_POINTER: usize = 0x34;
    }

    /// Command Register Constants.
    pub mod command {
        pub const BUS_MASTER: u16 = 1 << 2;
    }

    /// Status Register Constants.
    pub mod status {
        /// The device has a list of capabilities starting at
        /// [`CAPABILITIES_POINTER`](super::offset::CAPABILITIES_POINTER).
        pub const CAPABILITIES: u16 = 1 << 4;
    }

    /// IDs for standard PCI Capabilities.
    pub mod capability_id {
        pub const POWER_MANAGEMENT: u8 = 0x01;
        pub const MSI: u8 = 0x05;
        pub const VENDOR_SPECIFIC: u8 = 0x09;
        pub const BRIDGE_SUBSYSTEM_ID: u8 = 0x0D;
        pub const PCI_EXPRESS: u8 = 0x10;
        pub const MSI_X: u8 = 0x11;
        pub const SATA: u8 = 0x12;
    }

    /// IDs for PCI Express Extended Capabilities.
    pub mod extended_capability_id {
        pub const ADVANCED_ERROR_REPORTING: u16 = 0x0001;
        pub const DEVICE_SERIAL_NUMBER: u16 = 0x0003;
        pub const VENDOR_SPECIFIC: u16 = 0x000B;
        pub const RESIZABLE_BAR: u16 = 0x0015;
    }

    /// Markers for iterating the list of capabilities.
    pub mod capability_list {
        pub const END_OF_LIST: u8 = 0;

        /// The first offset a standard capability may live at.
        pub const STANDARD_START: u16 = 0x40;
        /// One past the last offset a standard capability may live at.
        pub const STANDARD_END: u16 = 0x100;

        /// The fixed location of the first extended capability.
        pub const EXTENDED_ROOT: u16 = 0x100;
        /// One past the last offset an extended capability may live at.
        pub const EXTENDED_END: u16 = 0x1000;

        /// The maximum number of capabilities we follow in a single chain.
        ///
        /// A 256 byte space fits at most 64 records of the 4 byte minimum size. Longer chains can
        /// only be produced by a loop.
        pub const MAX_ENTRIES: usize = 64;

        /// The header dword read from an absent function or unreachable extended space.
        pub const ABSENT_HEADER: u32 = 0xFFFF_FFFF;
    }

    /// Layout of the generic standard capability header.
    pub mod standard_header {
        pub const ID: u16 = 0;
        pub const NEXT: u16 = 1;
        pub const SIZE: u16 = 2;
    }

    /// Layout of the generic extended capability header dword.
    pub mod extended_header {
        pub const SIZE: u16 = 4;

        pub const ID_MASK: u32 = 0xffff;
        pub const VERSION_SHIFT: u32 = 16;
        pub const VERSION_MASK: u32 = 0xf;
        pub const NEXT_SHIFT: u32 = 20;
        pub const NEXT_MASK: u32 = 0xfff;
    }

    /// Bridge Subsystem Vendor ID capability.
    pub mod bridge_ssvid {
        pub const SIZE: u16 = 8;
        pub const SUBSYSTEM_VENDOR_ID: u16 = 4;
        pub const SUBSYSTEM_ID: u16 = 6;
    }

    /// PCI Power Management Interface capability.
    pub mod power_management {
        pub const SIZE: u16 = 8;
        pub const CAPABILITIES: u16 = 2;
        pub const CONTROL_STATUS: u16 = 4;
        pub const BRIDGE_EXTENSIONS: u16 = 6;
        pub const DATA: u16 = 7;

        /// Mask of the power state field in the control/status register.
        pub const POWER_STATE_MASK: u16 = 0x3;
    }

    /// Serial ATA Index-Data Pair configuration capability.
    pub mod sata {
        pub const SIZE: u16 = 8;
        pub const REVISION: u16 = 2;
        pub const BAR_INFO: u16 = 4;

        pub const REVISION_MINOR_MASK: u8 = 0xf;
        pub const REVISION_MAJOR_SHIFT: u8 = 4;
        pub const BAR_LOCATION_MASK: u32 = 0xf;
        pub const BAR_OFFSET_SHIFT: u32 = 4;
        pub const BAR_OFFSET_MASK: u32 = 0xf_ffff;
    }

    /// Vendor-specific standard capability.
    pub mod vendor {
        pub const LENGTH: u16 = 2;
        /// The declared length covers the generic two byte header.
        pub const HEADER_SIZE: u16 = super::standard_header::SIZE;
    }

    /// Advanced Error Reporting extended capability.
    pub mod aer {
        pub const SIZE: u16 = 0x48;

        pub const UNCORRECTABLE_STATUS: u16 = 0x04;
        pub const UNCORRECTABLE_MASK: u16 = 0x08;
        pub const UNCORRECTABLE_SEVERITY: u16 = 0x0C;
        pub const CORRECTABLE_STATUS: u16 = 0x10;
        pub const CORRECTABLE_MASK: u16 = 0x14;
        pub const CAPABILITIES_CONTROL: u16 = 0x18;
        pub const HEADER_LOG: u16 = 0x1C;
        pub const ROOT_ERROR_COMMAND: u16 = 0x2C;
        pub const ROOT_ERROR_STATUS: u16 = 0x30;
        pub const CORRECTABLE_SOURCE_ID: u16 = 0x34;
        pub const ERROR_SOURCE_ID: u16 = 0x36;
        pub const TLP_PREFIX_LOG: u16 = 0x38;

        /// Number of dwords in the header log and the TLP prefix log.
        pub const LOG_DWORDS: usize = 4;
    }

    /// Resizable BAR extended capability.
    pub mod resizable_bar {
        /// The offset of the first entry.
        pub const ENTRIES: u16 = 4;
        pub const ENTRY_SIZE: u16 = 8;
        pub const ENTRY_CONTROL: u16 = 4;
        pub const MAX_ENTRIES: u8 = 6;

        pub const CONTROL_INDEX_MASK: u32 = 0x7;
        pub const CONTROL_COUNT_SHIFT: u32 = 5;
        pub const CONTROL_COUNT_MASK: u32 = 0x7;
        pub const CONTROL_SIZE_SHIFT: u32 = 8;
        pub const CONTROL_SIZE_MASK: u32 = 0x3f;
    }

    /// Device Serial Number extended capability.
    pub mod serial_number {
        pub const SIZE: u16 = 12;
        pub const LOW: u16 = 4;
        pub const HIGH: u16 = 8;
    }

    /// Vendor-specific extended capability.
    pub mod vendor_extended {
        pub const ID: u16 = 4;
        pub const LENGTH_REVISION: u16 = 6;
        /// The extended header plus the vendor-specific header.
        pub const HEADER_SIZE: u16 = 8;

        pub const REVISION_MASK: u16 = 0xf;
        pub const LENGTH_SHIFT: u16 = 4;
    }
}
