//! # Capability Record Decoders
//!
//! This module turns a capability header plus the surrounding snapshot into a
//! [`CapabilityRecord`]. Each known capability ID maps to a decode routine through a static
//! table. IDs without a routine become [`CapabilityRecord::RawOpaque`].
//!
//! All fields are read individually at their specified offsets. A field that lies outside the
//! snapshot makes the record [`DecodeError::TruncatedCapability`]. Decoding never looks at more
//! than the one capability it was given, except for the Bus Master Enable bit that is captured for
//! the power management capability.

use tracing::trace;

use super::{
    capability::{ExtendedCapabilityHeader, StandardCapabilityHeader},
    config_space::ConfigSpaceView,
    constants::config_space::{
        self, aer, bridge_ssvid, capability_id, extended_capability_id, power_management,
        resizable_bar, sata, serial_number, vendor, vendor_extended,
    },
    record::{
        AdvancedErrorReporting, BridgeSubsystemId, CapabilityRecord, DeviceSerialNumber,
        PowerManagement, ResizableBar, ResizableBarEntry, SataIndexData, VendorSpecific,
        VendorSpecificExtended,
    },
};

/// An error that prevents decoding a single capability.
///
/// These errors are local to one capability. The list it is part of can still be walked.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The capability extends past the end of the snapshot or declares an impossible length.
    #[error("Capability {tag:#06x} at {offset:#05x} is truncated")]
    TruncatedCapability {
        /// The offset of the capability header.
        offset: u16,
        /// The capability ID.
        tag: u16,
    },

    /// A field holds a value that the PCI specification does not allow.
    #[error("Capability {tag:#06x} at {offset:#05x} has invalid {field}: {value:#x}")]
    InvalidFieldValue {
        /// The offset of the capability header.
        offset: u16,
        /// The capability ID.
        tag: u16,
        /// The name of the offending field.
        field: &'static str,
        /// The value found in the field.
        value: u32,
    },
}

/// Reads the fields of a single capability relative to its header.
#[derive(Debug, Clone, Copy)]
struct FieldReader<'a> {
    view: ConfigSpaceView<'a>,
    offset: u16,
    tag: u16,
}

impl FieldReader<'_> {
    const fn truncated(&self) -> DecodeError {
        DecodeError::TruncatedCapability {
            offset: self.offset,
            tag: self.tag,
        }
    }

    const fn invalid(&self, field: &'static str, value: u32) -> DecodeError {
        DecodeError::InvalidFieldValue {
            offset: self.offset,
            tag: self.tag,
            field,
            value,
        }
    }

    fn u8(&self, field: u16) -> Result<u8, DecodeError> {
        self.offset
            .checked_add(field)
            .and_then(|pos| self.view.u8_at(pos))
            .ok_or_else(|| self.truncated())
    }

    fn u16(&self, field: u16) -> Result<u16, DecodeError> {
        self.offset
            .checked_add(field)
            .and_then(|pos| self.view.u16_le_at(pos))
            .ok_or_else(|| self.truncated())
    }

    fn u32(&self, field: u16) -> Result<u32, DecodeError> {
        self.offset
            .checked_add(field)
            .and_then(|pos| self.view.u32_le_at(pos))
            .ok_or_else(|| self.truncated())
    }

    fn u32_array<const N: usize>(&self, field: u16) -> Result<[u32; N], DecodeError> {
        let mut values = [0; N];

        for (pos, value) in (field..).step_by(4).zip(values.iter_mut()) {
            *value = self.u32(pos)?;
        }

        Ok(values)
    }

    /// Copy `len` bytes out of the capability.
    fn bytes(&self, field: u16, len: u16) -> Result<Vec<u8>, DecodeError> {
        self.offset
            .checked_add(field)
            .and_then(|pos| self.view.bytes_at(pos, len.into()))
            .map(<[u8]>::to_vec)
            .ok_or_else(|| self.truncated())
    }

    /// Make sure the complete fixed-size capability is part of the snapshot.
    fn require(&self, size: u16) -> Result<(), DecodeError> {
        if self.view.contains(self.offset, size.into()) {
            Ok(())
        } else {
            Err(self.truncated())
        }
    }
}

type DecodeFn = fn(&FieldReader<'_>) -> Result<CapabilityRecord, DecodeError>;

/// Decode routines for standard capabilities.
static STANDARD_DECODERS: &[(u8, DecodeFn)] = &[
    (capability_id::POWER_MANAGEMENT, decode_power_management),
    (capability_id::VENDOR_SPECIFIC, decode_vendor_specific),
    (capability_id::BRIDGE_SUBSYSTEM_ID, decode_bridge_ssvid),
    (capability_id::SATA, decode_sata),
];

/// Decode routines for extended capabilities.
static EXTENDED_DECODERS: &[(u16, DecodeFn)] = &[
    (
        extended_capability_id::ADVANCED_ERROR_REPORTING,
        decode_advanced_error_reporting,
    ),
    (
        extended_capability_id::DEVICE_SERIAL_NUMBER,
        decode_serial_number,
    ),
    (
        extended_capability_id::VENDOR_SPECIFIC,
        decode_vendor_specific_extended,
    ),
    (extended_capability_id::RESIZABLE_BAR, decode_resizable_bar),
];

fn dispatch<T: PartialEq>(
    table: &[(T, DecodeFn)],
    id: &T,
    reader: &FieldReader<'_>,
) -> Result<CapabilityRecord, DecodeError> {
    let result = table
        .iter()
        .find(|(candidate, _)| candidate == id)
        .map_or(
            Ok(CapabilityRecord::RawOpaque {
                tag: reader.tag,
                offset: reader.offset,
            }),
            |(_, decode)| decode(reader),
        );

    match &result {
        Ok(record) => trace!("decoded {record}"),
        Err(error) => trace!("failed to decode capability: {error}"),
    }

    result
}

/// Decode the standard capability described by `header`.
///
/// Standard capabilities live in the first 256 bytes, so none of their fields may reach into the
/// extended space even if the snapshot contains it.
pub fn decode_standard(
    view: &ConfigSpaceView<'_>,
    header: &StandardCapabilityHeader,
) -> Result<CapabilityRecord, DecodeError> {
    let reader = FieldReader {
        view: view.limit(config_space::SIZE),
        offset: header.offset.into(),
        tag: header.id.into(),
    };

    dispatch(STANDARD_DECODERS, &header.id, &reader)
}

/// Decode the extended capability described by `header`.
pub fn decode_extended(
    view: &ConfigSpaceView<'_>,
    header: &ExtendedCapabilityHeader,
) -> Result<CapabilityRecord, DecodeError> {
    let reader = FieldReader {
        view: *view,
        offset: header.offset,
        tag: header.id,
    };

    dispatch(EXTENDED_DECODERS, &header.id, &reader)
}

fn decode_bridge_ssvid(r: &FieldReader<'_>) -> Result<CapabilityRecord, DecodeError> {
    r.require(bridge_ssvid::SIZE)?;

    Ok(CapabilityRecord::BridgeSubsystemId(BridgeSubsystemId {
        subsystem_vendor_id: r.u16(bridge_ssvid::SUBSYSTEM_VENDOR_ID)?,
        subsystem_id: r.u16(bridge_ssvid::SUBSYSTEM_ID)?,
    }))
}

fn decode_power_management(r: &FieldReader<'_>) -> Result<CapabilityRecord, DecodeError> {
    r.require(power_management::SIZE)?;

    Ok(CapabilityRecord::PowerManagement(PowerManagement {
        capabilities: r.u16(power_management::CAPABILITIES)?,
        control_status: r.u16(power_management::CONTROL_STATUS)?,
        bridge_extensions: r.u8(power_management::BRIDGE_EXTENSIONS)?,
        data: r.u8(power_management::DATA)?,
        bus_master: r.view.bus_master_enabled().ok_or_else(|| r.truncated())?,
    }))
}

fn decode_sata(r: &FieldReader<'_>) -> Result<CapabilityRecord, DecodeError> {
    r.require(sata::SIZE)?;

    let revision = r.u8(sata::REVISION)?;
    let bar_info = r.u32(sata::BAR_INFO)?;

    Ok(CapabilityRecord::SataIndexData(SataIndexData {
        revision_major: revision >> sata::REVISION_MAJOR_SHIFT,
        revision_minor: revision & sata::REVISION_MINOR_MASK,
        bar_location: (bar_info & sata::BAR_LOCATION_MASK) as u8,
        bar_offset: (bar_info >> sata::BAR_OFFSET_SHIFT) & sata::BAR_OFFSET_MASK,
    }))
}

fn decode_vendor_specific(r: &FieldReader<'_>) -> Result<CapabilityRecord, DecodeError> {
    let declared_length = r.u8(vendor::LENGTH)?;
    let payload_length = u16::from(declared_length)
        .checked_sub(vendor::HEADER_SIZE)
        .ok_or_else(|| r.truncated())?;

    Ok(CapabilityRecord::VendorSpecific(VendorSpecific {
        declared_length,
        data: r.bytes(vendor::HEADER_SIZE, payload_length)?,
    }))
}

fn decode_advanced_error_reporting(r: &FieldReader<'_>) -> Result<CapabilityRecord, DecodeError> {
    r.require(aer::SIZE)?;

    Ok(CapabilityRecord::AdvancedErrorReporting(
        AdvancedErrorReporting {
            header: r.u32(0)?,
            uncorrectable_status: r.u32(aer::UNCORRECTABLE_STATUS)?,
            uncorrectable_mask: r.u32(aer::UNCORRECTABLE_MASK)?,
            uncorrectable_severity: r.u32(aer::UNCORRECTABLE_SEVERITY)?,
            correctable_status: r.u32(aer::CORRECTABLE_STATUS)?,
            correctable_mask: r.u32(aer::CORRECTABLE_MASK)?,
            capabilities_control: r.u32(aer::CAPABILITIES_CONTROL)?,
            header_log: r.u32_array::<{ aer::LOG_DWORDS }>(aer::HEADER_LOG)?,
            root_error_command: r.u32(aer::ROOT_ERROR_COMMAND)?,
            root_error_status: r.u32(aer::ROOT_ERROR_STATUS)?,
            correctable_source_id: r.u16(aer::CORRECTABLE_SOURCE_ID)?,
            error_source_id: r.u16(aer::ERROR_SOURCE_ID)?,
            tlp_prefix_log: r.u32_array::<{ aer::LOG_DWORDS }>(aer::TLP_PREFIX_LOG)?,
        },
    ))
}

fn decode_resizable_bar(r: &FieldReader<'_>) -> Result<CapabilityRecord, DecodeError> {
    let first_control = r.u32(resizable_bar::ENTRIES + resizable_bar::ENTRY_CONTROL)?;
    let num_bars = ((first_control >> resizable_bar::CONTROL_COUNT_SHIFT)
        & resizable_bar::CONTROL_COUNT_MASK) as u8;

    if num_bars > resizable_bar::MAX_ENTRIES {
        return Err(r.invalid("number of resizable BARs", num_bars.into()));
    }

    // Only the announced entries are decoded. The remaining slots may not even exist.
    let entries = (0..u16::from(num_bars))
        .map(|index| {
            let entry = resizable_bar::ENTRIES + index * resizable_bar::ENTRY_SIZE;
            let control = r.u32(entry + resizable_bar::ENTRY_CONTROL)?;

            Ok(ResizableBarEntry {
                size_vector: r.u32(entry)?,
                control_index: (control & resizable_bar::CONTROL_INDEX_MASK) as u8,
                control_size: ((control >> resizable_bar::CONTROL_SIZE_SHIFT)
                    & resizable_bar::CONTROL_SIZE_MASK) as u8,
            })
        })
        .collect::<Result<Vec<_>, DecodeError>>()?;

    Ok(CapabilityRecord::ResizableBar(ResizableBar {
        num_bars,
        vector: r.u32(resizable_bar::ENTRIES)?,
        entries,
    }))
}

fn decode_serial_number(r: &FieldReader<'_>) -> Result<CapabilityRecord, DecodeError> {
    r.require(serial_number::SIZE)?;

    Ok(CapabilityRecord::DeviceSerialNumber(DeviceSerialNumber {
        low: r.u32(serial_number::LOW)?,
        high: r.u32(serial_number::HIGH)?,
    }))
}

fn decode_vendor_specific_extended(r: &FieldReader<'_>) -> Result<CapabilityRecord, DecodeError> {
    let vsec_id = r.u16(vendor_extended::ID)?;
    let length_and_revision = r.u16(vendor_extended::LENGTH_REVISION)?;
    let payload_length = (length_and_revision >> vendor_extended::LENGTH_SHIFT)
        .checked_sub(vendor_extended::HEADER_SIZE)
        .ok_or_else(|| r.truncated())?;

    Ok(CapabilityRecord::VendorSpecificExtended(
        VendorSpecificExtended {
            vsec_id,
            length_and_revision,
            data: r.bytes(vendor_extended::HEADER_SIZE, payload_length)?,
        },
    ))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::device::pci::{
        constants::config_space::{command, extended_header},
        image::ConfigImageBuilder,
    };

    fn standard(image: &[u8], offset: u8) -> Result<CapabilityRecord, DecodeError> {
        let view = ConfigSpaceView::new(image);
        let header = StandardCapabilityHeader::read(&view, offset).unwrap();

        decode_standard(&view, &header)
    }

    fn extended(image: &[u8], offset: u16) -> Result<CapabilityRecord, DecodeError> {
        let view = ConfigSpaceView::new(image);
        let header = ExtendedCapabilityHeader::read(&view, offset).unwrap();

        decode_extended(&view, &header)
    }

    #[test]
    fn bridge_ssvid_is_decoded() {
        let image = ConfigImageBuilder::new(0, 0)
            .capability(
                capability_id::BRIDGE_SUBSYSTEM_ID,
                &[0, 0, 0x86, 0x80, 0x34, 0x12],
            )
            .build();

        assert_eq!(
            standard(&image, 0x40),
            Ok(CapabilityRecord::BridgeSubsystemId(BridgeSubsystemId {
                subsystem_vendor_id: 0x8086,
                subsystem_id: 0x1234,
            }))
        );
    }

    #[test]
    fn power_management_captures_bus_master() {
        let body = [0x03, 0xC8, 0x03, 0x01, 0x40, 0x7F];

        let image = ConfigImageBuilder::new(0, 0)
            .command(command::BUS_MASTER)
            .capability(capability_id::POWER_MANAGEMENT, &body)
            .build();

        assert_eq!(
            standard(&image, 0x40),
            Ok(CapabilityRecord::PowerManagement(PowerManagement {
                capabilities: 0xC803,
                control_status: 0x0103,
                bridge_extensions: 0x40,
                data: 0x7F,
                bus_master: true,
            }))
        );

        let image = ConfigImageBuilder::new(0, 0)
            .capability(capability_id::POWER_MANAGEMENT, &body)
            .build();

        assert!(matches!(
            standard(&image, 0x40),
            Ok(CapabilityRecord::PowerManagement(PowerManagement {
                bus_master: false,
                ..
            }))
        ));
    }

    #[test]
    fn sata_revision_and_bar_info_are_split() {
        let image = ConfigImageBuilder::new(0, 0)
            .capability(capability_id::SATA, &[0x10, 0x00, 0x4F, 0x00, 0x00, 0x00])
            .build();

        assert_eq!(
            standard(&image, 0x40),
            Ok(CapabilityRecord::SataIndexData(SataIndexData {
                revision_major: 1,
                revision_minor: 0,
                bar_location: 0xF,
                bar_offset: 0x4,
            }))
        );
    }

    #[test]
    fn vendor_payload_length_excludes_the_header() {
        let image = ConfigImageBuilder::new(0, 0)
            .capability(capability_id::VENDOR_SPECIFIC, &[0x06, 0xAA, 0xBB, 0xCC])
            .build();

        assert_eq!(
            standard(&image, 0x40),
            Ok(CapabilityRecord::VendorSpecific(VendorSpecific {
                declared_length: 6,
                data: vec![0x06, 0xAA, 0xBB, 0xCC],
            }))
        );
    }

    #[test]
    fn vendor_minimal_length_has_no_payload() {
        let image = ConfigImageBuilder::new(0, 0)
            .capability(capability_id::VENDOR_SPECIFIC, &[0x02])
            .build();

        assert_eq!(
            standard(&image, 0x40),
            Ok(CapabilityRecord::VendorSpecific(VendorSpecific {
                declared_length: 2,
                data: vec![],
            }))
        );
    }

    #[test]
    fn vendor_length_below_header_size_is_truncated() {
        for length in [0, 1] {
            let image = ConfigImageBuilder::new(0, 0)
                .capability(capability_id::VENDOR_SPECIFIC, &[length])
                .build();

            assert_eq!(
                standard(&image, 0x40),
                Err(DecodeError::TruncatedCapability {
                    offset: 0x40,
                    tag: capability_id::VENDOR_SPECIFIC.into(),
                })
            );
        }
    }

    #[test]
    fn vendor_payload_may_not_leave_the_standard_space() {
        // A payload reaching into the extended space must be rejected even though the snapshot
        // contains it.
        let image = ConfigImageBuilder::new(0, 0)
            .pcie()
            .u8_at(0xF0, capability_id::VENDOR_SPECIFIC)
            .u8_at(0xF2, 0x20)
            .build();

        assert_eq!(
            standard(&image, 0xF0),
            Err(DecodeError::TruncatedCapability {
                offset: 0xF0,
                tag: capability_id::VENDOR_SPECIFIC.into(),
            })
        );
    }

    #[test]
    fn fixed_records_at_the_end_are_truncated() {
        let image = ConfigImageBuilder::new(0, 0)
            .u8_at(0xFC, capability_id::POWER_MANAGEMENT)
            .build();

        assert_eq!(
            standard(&image, 0xFC),
            Err(DecodeError::TruncatedCapability {
                offset: 0xFC,
                tag: capability_id::POWER_MANAGEMENT.into(),
            })
        );
    }

    #[test]
    fn unknown_standard_ids_are_passed_through() {
        let image = ConfigImageBuilder::new(0, 0)
            .capability(capability_id::MSI_X, &[0; 10])
            .build();

        assert_eq!(
            standard(&image, 0x40),
            Ok(CapabilityRecord::RawOpaque {
                tag: capability_id::MSI_X.into(),
                offset: 0x40,
            })
        );
    }

    #[test]
    fn serial_number_is_decoded() {
        let mut body = Vec::new();
        body.extend_from_slice(&0xDEAD_BEEFu32.to_le_bytes());
        body.extend_from_slice(&0x1234_5678u32.to_le_bytes());

        let image = ConfigImageBuilder::new(0, 0)
            .pcie()
            .extended_capability(extended_capability_id::DEVICE_SERIAL_NUMBER, 1, &body)
            .build();

        assert_eq!(
            extended(&image, 0x100),
            Ok(CapabilityRecord::DeviceSerialNumber(DeviceSerialNumber {
                low: 0xDEAD_BEEF,
                high: 0x1234_5678,
            }))
        );
    }

    #[test]
    fn aer_fields_are_read_from_their_offsets() {
        // Fill every dword after the header with its own offset to catch misplaced fields.
        let body: Vec<u8> = (1..(aer::SIZE / 4))
            .flat_map(|dword| u32::from(dword * 4).to_le_bytes())
            .collect();

        let image = ConfigImageBuilder::new(0, 0)
            .pcie()
            .extended_capability(extended_capability_id::ADVANCED_ERROR_REPORTING, 2, &body)
            .build();

        assert_eq!(
            extended(&image, 0x100),
            Ok(CapabilityRecord::AdvancedErrorReporting(
                AdvancedErrorReporting {
                    header: 0x0002_0001,
                    uncorrectable_status: 0x04,
                    uncorrectable_mask: 0x08,
                    uncorrectable_severity: 0x0C,
                    correctable_status: 0x10,
                    correctable_mask: 0x14,
                    capabilities_control: 0x18,
                    header_log: [0x1C, 0x20, 0x24, 0x28],
                    root_error_command: 0x2C,
                    root_error_status: 0x30,
                    correctable_source_id: 0x34,
                    error_source_id: 0,
                    tlp_prefix_log: [0x38, 0x3C, 0x40, 0x44],
                }
            ))
        );
    }

    #[test]
    fn aer_past_the_end_is_truncated() {
        let image = ConfigImageBuilder::new(0, 0)
            .pcie()
            .u32_le_at(0xFF0, u32::from(extended_capability_id::ADVANCED_ERROR_REPORTING))
            .build();

        assert_eq!(
            extended(&image, 0xFF0),
            Err(DecodeError::TruncatedCapability {
                offset: 0xFF0,
                tag: extended_capability_id::ADVANCED_ERROR_REPORTING,
            })
        );
    }

    #[test]
    fn fixed_standard_records_past_the_end_are_truncated() {
        for id in [capability_id::BRIDGE_SUBSYSTEM_ID, capability_id::SATA] {
            let image = ConfigImageBuilder::new(0, 0).u8_at(0xFC, id).build();

            assert_eq!(
                standard(&image, 0xFC),
                Err(DecodeError::TruncatedCapability {
                    offset: 0xFC,
                    tag: id.into(),
                })
            );
        }
    }

    #[test]
    fn serial_number_past_the_end_is_truncated() {
        let image = ConfigImageBuilder::new(0, 0)
            .pcie()
            .u32_le_at(0xFF8, u32::from(extended_capability_id::DEVICE_SERIAL_NUMBER))
            .build();

        assert_eq!(
            extended(&image, 0xFF8),
            Err(DecodeError::TruncatedCapability {
                offset: 0xFF8,
                tag: extended_capability_id::DEVICE_SERIAL_NUMBER,
            })
        );
    }

    #[test]
    fn vsec_payload_past_the_end_is_truncated() {
        // The declared length of 0x20 bytes is valid, but only 0x10 bytes are left.
        let image = ConfigImageBuilder::new(0, 0)
            .pcie()
            .u32_le_at(0xFF0, u32::from(extended_capability_id::VENDOR_SPECIFIC))
            .u16_le_at(0xFF4, 0x23)
            .u16_le_at(0xFF6, 0x0201)
            .build();

        assert_eq!(
            extended(&image, 0xFF0),
            Err(DecodeError::TruncatedCapability {
                offset: 0xFF0,
                tag: extended_capability_id::VENDOR_SPECIFIC,
            })
        );
    }

    fn rebar_body(num_bars: u32) -> Vec<u8> {
        (0..u32::from(resizable_bar::MAX_ENTRIES))
            .flat_map(|index| {
                let size_vector = 0x10 << index;
                let mut control = index | (index << resizable_bar::CONTROL_SIZE_SHIFT);
                if index == 0 {
                    control |= num_bars << resizable_bar::CONTROL_COUNT_SHIFT;
                }

                [size_vector, control]
            })
            .flat_map(u32::to_le_bytes)
            .collect()
    }

    #[test]
    fn resizable_bar_decodes_announced_entries_only() {
        let image = ConfigImageBuilder::new(0, 0)
            .pcie()
            .extended_capability(extended_capability_id::RESIZABLE_BAR, 1, &rebar_body(3))
            .build();

        assert_eq!(
            extended(&image, 0x100),
            Ok(CapabilityRecord::ResizableBar(ResizableBar {
                num_bars: 3,
                vector: 0x10,
                entries: (0..3)
                    .map(|index| ResizableBarEntry {
                        size_vector: 0x10 << index,
                        control_index: index,
                        control_size: index,
                    })
                    .collect(),
            }))
        );
    }

    #[test]
    fn resizable_bar_count_above_six_is_invalid() {
        let image = ConfigImageBuilder::new(0, 0)
            .pcie()
            .extended_capability(extended_capability_id::RESIZABLE_BAR, 1, &rebar_body(7))
            .build();

        assert_eq!(
            extended(&image, 0x100),
            Err(DecodeError::InvalidFieldValue {
                offset: 0x100,
                tag: extended_capability_id::RESIZABLE_BAR,
                field: "number of resizable BARs",
                value: 7,
            })
        );
    }

    #[test]
    fn resizable_bar_ignores_missing_unannounced_slots() {
        // Only a single entry fits before the end of the snapshot.
        let body = rebar_body(1);
        let image = ConfigImageBuilder::new(0, 0)
            .pcie()
            .u32_le_at(0xFF4, u32::from(extended_capability_id::RESIZABLE_BAR))
            .bytes_at(0xFF8, &body[..8])
            .build();

        assert!(matches!(
            extended(&image, 0xFF4),
            Ok(CapabilityRecord::ResizableBar(ResizableBar { num_bars: 1, .. }))
        ));
    }

    #[test]
    fn vsec_payload_follows_the_vsec_header() {
        let image = ConfigImageBuilder::new(0, 0)
            .pcie()
            .extended_capability(
                extended_capability_id::VENDOR_SPECIFIC,
                1,
                &[0x23, 0x00, 0xC1, 0x00, 0xA0, 0xA1, 0xA2, 0xA3],
            )
            .build();

        assert_eq!(
            extended(&image, 0x100),
            Ok(CapabilityRecord::VendorSpecificExtended(
                VendorSpecificExtended {
                    vsec_id: 0x23,
                    length_and_revision: 0x00C1,
                    data: vec![0xA0, 0xA1, 0xA2, 0xA3],
                }
            ))
        );
    }

    #[test]
    fn vsec_length_below_header_size_is_truncated() {
        let image = ConfigImageBuilder::new(0, 0)
            .pcie()
            .extended_capability(
                extended_capability_id::VENDOR_SPECIFIC,
                1,
                &[0x23, 0x00, 0x71, 0x00],
            )
            .build();

        assert_eq!(
            extended(&image, 0x100),
            Err(DecodeError::TruncatedCapability {
                offset: 0x100,
                tag: extended_capability_id::VENDOR_SPECIFIC,
            })
        );
    }

    #[test]
    fn unknown_extended_ids_are_passed_through() {
        let image = ConfigImageBuilder::new(0, 0)
            .pcie()
            .u32_le_at(0x100, 0x0001_0019)
            .build();

        assert_eq!(
            extended(&image, 0x100),
            Ok(CapabilityRecord::RawOpaque {
                tag: 0x0019,
                offset: 0x100,
            })
        );
    }

    #[test]
    fn header_layout_constants_are_consistent() {
        assert_eq!(
            ExtendedCapabilityHeader::from_dword(0, 0xFFFF_FFFF).next,
            extended_header::NEXT_MASK as u16
        );
    }

    proptest! {
        #[test]
        fn vendor_payload_is_declared_length_minus_two(length in 2u8..=0x40) {
            let image = ConfigImageBuilder::new(0, 0)
                .capability(capability_id::VENDOR_SPECIFIC, &[length])
                .build();

            match standard(&image, 0x40) {
                Ok(CapabilityRecord::VendorSpecific(vendor)) => {
                    prop_assert_eq!(vendor.declared_length, length);
                    prop_assert_eq!(vendor.data.len(), usize::from(length) - 2);
                }
                other => prop_assert!(false, "unexpected result {:?}", other),
            }
        }

        #[test]
        fn decoding_arbitrary_data_never_panics(
            data in prop::collection::vec(any::<u8>(), 0..=config_space::EXTENDED_SIZE),
            offset in 0u16..0x1000,
        ) {
            let view = ConfigSpaceView::new(&data);

            if let Some(header) = ExtendedCapabilityHeader::read(&view, offset) {
                let _ = decode_extended(&view, &header);
            }
            if let Some(header) = u8::try_from(offset)
                .ok()
                .and_then(|offset| StandardCapabilityHeader::read(&view, offset))
            {
                let _ = decode_standard(&view, &header);
            }
        }
    }
}
