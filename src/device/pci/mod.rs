//! # PCI Capability Decoding
//!
//! PCI functions advertise optional features through two linked lists of capabilities in their
//! Configuration Space: the standard list in the first 256 bytes and, for PCI Express functions,
//! the extended list starting at offset `0x100`. This module walks both lists and decodes the
//! capabilities it knows about into typed [records](record::CapabilityRecord).
//!
//! The pieces build on each other:
//!
//! - [`config_space::ConfigSpaceView`] gives bounds-checked little-endian access to a snapshot.
//! - [`walker`] follows the links of a list and refuses to leave the capability region or to loop.
//! - [`decode`] turns a single capability into a record.
//! - [`chain`] combines both into a [`chain::DecodedChain`].
//!
//! ## Example
//!
//! Snapshots usually come from `/sys/bus/pci/devices/*/config`. For this example, we synthesize
//! one with the [image builder](image::ConfigImageBuilder).
//!
//! ```rust
//! use pcicaps::device::pci::{
//!     chain::DeviceCapabilities, config_space::ConfigSpaceView, image::ConfigImageBuilder,
//! };
//!
//! let image = ConfigImageBuilder::new(0x8086, 0x1234)
//!     .capability(0x01, &[0x03, 0x00, 0x00, 0x00, 0x00, 0x00])
//!     .build();
//!
//! let caps = DeviceCapabilities::decode(ConfigSpaceView::new(&image));
//! let pm = caps.standard.power_management().unwrap();
//! assert_eq!(pm.version(), 3);
//! assert!(caps.extended.is_empty());
//! ```

pub mod capability;
pub mod chain;
pub mod config_space;
pub mod constants;
pub mod decode;
pub mod image;
pub mod record;
pub mod walker;
