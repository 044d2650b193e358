//! # Device Configuration Decoding
//!
//! This module contains everything needed to make sense of a PCI function's Configuration
//! Space. It works on plain byte snapshots and should never depend on hypervisor, x86 or Linux
//! specific parts.

#![deny(missing_docs)]
#![deny(rustdoc::all)]
#![deny(clippy::must_use_candidate)]
#![deny(missing_debug_implementations)]

pub mod pci;
pub mod request;
