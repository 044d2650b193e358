//! # Configuration Space Images
//!
//! This module synthesizes raw Configuration Space snapshots. It is the write-side counterpart to
//! the decoders: capabilities are placed into the free space of the image and chained
//! automatically, both in the conventional and in the PCI Express extended space. Use
//! [`ConfigImageBuilder`] to construct an image.
//!
//! Images are plain byte vectors and can be inspected with
//! [`ConfigSpaceView`](super::config_space::ConfigSpaceView).

use super::constants::config_space::{
    self, capability_list, extended_header, mask::CAPABILITIES_POINTER as CAPABILITY_POINTER_MASK,
    offset, standard_header, status,
};

/// The offset at which we start to allocate capabilities.
const INITIAL_CAPABILITY_OFFSET: u16 = capability_list::STANDARD_START;

/// The offset at which we start to allocate extended capabilities.
const INITIAL_EXTENDED_CAPABILITY_OFFSET: u16 = capability_list::EXTENDED_ROOT;

/// Round an offset up to the next dword boundary.
const fn align_dword(offset: usize) -> usize {
    (offset + 3) & !3
}

/// A builder for Configuration Space images.
#[derive(Debug, Clone)]
pub struct ConfigImageBuilder {
    data: Vec<u8>,

    /// The offset in the Configuration Space where we add the next capability.
    ///
    /// This has to be a 4-byte aligned address as mandated by the PCI specification.
    next_capability_offset: u16,

    /// The offset where the capability pointer needs to be updated when we add a capability.
    last_capability_pointer: u16,

    /// The offset where we add the next extended capability.
    next_extended_offset: u16,

    /// The header of the previously added extended capability, if any.
    last_extended_header: Option<u16>,
}

impl ConfigImageBuilder {
    /// Create a builder for a conventional 256 byte image.
    ///
    /// All registers not explicitly set are zero.
    #[must_use]
    pub fn new(vendor: u16, device: u16) -> Self {
        Self {
            data: vec![0; config_space::SIZE],
            next_capability_offset: INITIAL_CAPABILITY_OFFSET,
            last_capability_pointer: offset::CAPABILITIES_POINTER as u16,
            next_extended_offset: INITIAL_EXTENDED_CAPABILITY_OFFSET,
            last_extended_header: None,
        }
        .u16_le_at(offset::VENDOR, vendor)
        .u16_le_at(offset::DEVICE, device)
    }

    /// Grow the image to the full 4 KiB PCI Express Configuration Space.
    #[must_use]
    pub fn pcie(mut self) -> Self {
        self.data.resize(config_space::EXTENDED_SIZE, 0);
        self
    }

    /// Place a byte at the given position.
    #[must_use]
    pub fn u8_at(mut self, pos: usize, value: u8) -> Self {
        self.data[pos] = value;
        self
    }

    /// Place a 16-bit value at the given position in little-endian order.
    #[must_use]
    pub fn u16_le_at(self, pos: usize, value: u16) -> Self {
        self.bytes_at(pos, &value.to_le_bytes())
    }

    /// Place a 32-bit value at the given position in little-endian order.
    #[must_use]
    pub fn u32_le_at(self, pos: usize, value: u32) -> Self {
        self.bytes_at(pos, &value.to_le_bytes())
    }

    /// Place raw bytes at the given position.
    #[must_use]
    pub fn bytes_at(mut self, pos: usize, bytes: &[u8]) -> Self {
        assert!(
            pos + bytes.len() <= self.data.len(),
            "Not enough space for {} bytes at {pos:#x}",
            bytes.len()
        );

        self.data[pos..(pos + bytes.len())].copy_from_slice(bytes);
        self
    }

    /// Configure the command register.
    #[must_use]
    pub fn command(self, command: u16) -> Self {
        self.u16_le_at(offset::COMMAND, command)
    }

    /// Add a PCI capability to the conventional Configuration Space.
    ///
    /// The given `body` must not contain the generic PCI Capability header (ID and next
    /// pointer). These fields will be added automatically.
    #[must_use]
    pub fn capability(mut self, capability_id: u8, body: &[u8]) -> Self {
        let cap_offset = self.next_capability_offset;
        assert_eq!(cap_offset & !u16::from(CAPABILITY_POINTER_MASK), 0);

        let header_size = usize::from(standard_header::SIZE);
        let end = usize::from(cap_offset) + header_size + body.len();
        assert!(end <= config_space::SIZE, "Capability does not fit");

        // The next capability must start at an aligned address.
        self.next_capability_offset = align_dword(end) as u16;

        let pointer = usize::from(self.last_capability_pointer);
        self = self
            // Extend the capability pointer list to include the new capability.
            .u8_at(pointer, cap_offset as u8)
            // Add the capability header. The next pointer stays zero until we add another
            // capability.
            .u8_at(usize::from(cap_offset), capability_id)
            .u8_at(usize::from(cap_offset) + 1, capability_list::END_OF_LIST)
            .bytes_at(usize::from(cap_offset) + header_size, body);

        self.last_capability_pointer = cap_offset + standard_header::NEXT;
        self
    }

    /// Add a PCI Express extended capability.
    ///
    /// The given `body` must not contain the extended capability header dword. It will be added
    /// automatically.
    #[must_use]
    pub fn extended_capability(mut self, capability_id: u16, version: u8, body: &[u8]) -> Self {
        assert!(
            self.data.len() == config_space::EXTENDED_SIZE,
            "Extended capabilities need a PCI Express image"
        );
        assert!(u32::from(version) <= extended_header::VERSION_MASK);

        let cap_offset = self.next_extended_offset;
        let header_size = usize::from(extended_header::SIZE);
        let end = usize::from(cap_offset) + header_size + body.len();
        assert!(end <= config_space::EXTENDED_SIZE, "Capability does not fit");

        self.next_extended_offset = align_dword(end) as u16;

        if let Some(previous) = self.last_extended_header {
            let pos = usize::from(previous);
            let dword = u32::from_le_bytes([
                self.data[pos],
                self.data[pos + 1],
                self.data[pos + 2],
                self.data[pos + 3],
            ]);
            let linked = dword | (u32::from(cap_offset) << extended_header::NEXT_SHIFT);
            self = self.u32_le_at(pos, linked);
        }

        let header =
            u32::from(capability_id) | (u32::from(version) << extended_header::VERSION_SHIFT);

        self.last_extended_header = Some(cap_offset);
        self.u32_le_at(usize::from(cap_offset), header)
            .bytes_at(usize::from(cap_offset) + header_size, body)
    }

    /// Create the finalized image.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        let has_capabilities = self.next_capability_offset != INITIAL_CAPABILITY_OFFSET;
        let mut data = self.data;

        if has_capabilities {
            let status_pos = offset::STATUS;
            let status = u16::from_le_bytes([data[status_pos], data[status_pos + 1]])
                | status::CAPABILITIES;
            data[status_pos..(status_pos + 2)].copy_from_slice(&status.to_le_bytes());
        }

        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_vendor_id_are_set() {
        let image = ConfigImageBuilder::new(0xDEAD, 0xBEEF).build();

        assert_eq!(image.len(), config_space::SIZE);
        assert_eq!(&image[offset::VENDOR..offset::VENDOR + 2], &[0xAD, 0xDE]);
        assert_eq!(&image[offset::DEVICE..offset::DEVICE + 2], &[0xEF, 0xBE]);
    }

    #[test]
    fn expose_no_capabilities_by_default() {
        let image = ConfigImageBuilder::new(0, 0).build();

        assert_eq!(image[offset::STATUS] & status::CAPABILITIES as u8, 0);
        assert_eq!(image[offset::CAPABILITIES_POINTER], 0);
    }

    #[test]
    fn pcie_images_are_four_kib() {
        let image = ConfigImageBuilder::new(0, 0).pcie().build();

        assert_eq!(image.len(), config_space::EXTENDED_SIZE);
    }

    #[test]
    fn capabilities_are_correctly_chained() {
        let image = ConfigImageBuilder::new(0, 0)
            .capability(0x12, &[0xDD, 0xCC, 0xBB, 0xAA])
            .capability(0x23, &[0x22, 0x11])
            .build();

        assert_ne!(image[offset::STATUS] & status::CAPABILITIES as u8, 0);

        let cap_1_ptr = usize::from(image[offset::CAPABILITIES_POINTER]);
        assert_eq!(cap_1_ptr, 0x40);
        assert_eq!(image[cap_1_ptr], 0x12);
        assert_eq!(&image[cap_1_ptr + 2..cap_1_ptr + 6], &[0xDD, 0xCC, 0xBB, 0xAA]);

        let cap_2_ptr = usize::from(image[cap_1_ptr + 1]);
        assert_eq!(cap_2_ptr, 0x48);
        assert_eq!(image[cap_2_ptr], 0x23);
        assert_eq!(image[cap_2_ptr + 1], 0);
        assert_eq!(&image[cap_2_ptr + 2..cap_2_ptr + 4], &[0x22, 0x11]);
    }

    #[test]
    fn extended_capabilities_are_correctly_chained() {
        let image = ConfigImageBuilder::new(0, 0)
            .pcie()
            .extended_capability(0x0003, 1, &[0; 8])
            .extended_capability(0x000B, 2, &[0; 4])
            .build();

        let first = u32::from_le_bytes(image[0x100..0x104].try_into().unwrap());
        assert_eq!(first, 0x10C1_0003);

        let second = u32::from_le_bytes(image[0x10C..0x110].try_into().unwrap());
        assert_eq!(second, 0x0002_000B);
    }

    #[test]
    #[should_panic]
    fn extended_capabilities_need_pcie_image() {
        let _ = ConfigImageBuilder::new(0, 0).extended_capability(0x0003, 1, &[]);
    }

    #[test]
    #[should_panic]
    fn oversized_capabilities_are_rejected() {
        let _ = ConfigImageBuilder::new(0, 0).capability(0x09, &[0; 0xC0]);
    }
}
