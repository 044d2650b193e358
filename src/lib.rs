//! # pcicaps
//!
//! A decoder for the capability lists of PCI and PCI Express functions. See [`device::pci`] for
//! an overview.

pub mod device;
