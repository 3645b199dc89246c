/*++

Licensed under the Apache-2.0 license.

File Name:

    cert.rs

Abstract:

    File contains the interface for decoding version specific VDPA entries
    and the CERT30 implementation.

--*/

use frts_drivers::{FrtsError, FrtsResult};
use frts_image_types::{VDPA_MAJOR_TYPE_INTERNAL_BLOCK, VDPA_MINOR_TYPE_NORMAL};

/// Fields of a VDPA entry needed to resolve DIRT tables
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct VdpaRecord {
    pub major_type: u8,
    pub minor_type: u8,
    pub dirt_id: u16,

    /// Offset relative to the firmware image start
    pub offset_start: u32,
    pub byte_size: u32,
}

impl VdpaRecord {
    /// Whether the entry describes a regular table inside the firmware image
    pub fn is_internal_normal(&self) -> bool {
        self.major_type == VDPA_MAJOR_TYPE_INTERNAL_BLOCK
            && self.minor_type == VDPA_MINOR_TYPE_NORMAL
    }
}

/// Decoder for one CERT variant of the VDPA entry array
pub trait CertVariantParser {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Size of one entry in bytes
    fn entry_size(&self) -> u32;

    /// Largest entry count accepted for this variant
    fn max_entry_count(&self) -> u32;

    /// Decode entry `index` of `entries`
    ///
    /// # Arguments
    ///
    /// * `entries` - VDPA entry array
    /// * `index` - Entry index
    fn parse_entry(&self, entries: &[u8], index: u32) -> FrtsResult<VdpaRecord>;
}

cfg_if::cfg_if! {
    if #[cfg(feature = "cert30")] {
        use frts_image_types::{
            VdpaEntryCert30, VDPA_CERT30_MAX_ENTRY_COUNT, VDPA_ENTRY_CERT30_BYTE_SIZE,
        };

        /// CERT30 VDPA entry decoder
        #[derive(Debug, Default, Clone, Copy)]
        pub struct Cert30Parser;

        impl CertVariantParser for Cert30Parser {
            fn name(&self) -> &'static str {
                "CERT30"
            }

            fn entry_size(&self) -> u32 {
                VDPA_ENTRY_CERT30_BYTE_SIZE as u32
            }

            fn max_entry_count(&self) -> u32 {
                VDPA_CERT30_MAX_ENTRY_COUNT
            }

            fn parse_entry(&self, entries: &[u8], index: u32) -> FrtsResult<VdpaRecord> {
                let entry = (index as usize)
                    .checked_mul(VDPA_ENTRY_CERT30_BYTE_SIZE)
                    .and_then(|start| entries.get(start..))
                    .and_then(VdpaEntryCert30::read_from_prefix)
                    .ok_or(FrtsError::FRTS_VDPA_ENTRY_TRUNCATED)?;

                let entry_type = entry.entry_type();
                Ok(VdpaRecord {
                    major_type: entry_type.major_type(),
                    minor_type: entry_type.minor_type(),
                    dirt_id: entry_type.dirt_id(),
                    offset_start: entry.offset_start(),
                    byte_size: entry.size().byte_size(),
                })
            }
        }

        /// Parser for the CERT variant this firmware is built for
        pub fn active_cert_parser() -> FrtsResult<&'static dyn CertVariantParser> {
            Ok(&Cert30Parser)
        }
    } else {
        /// Parser for the CERT variant this firmware is built for
        pub fn active_cert_parser() -> FrtsResult<&'static dyn CertVariantParser> {
            Err(FrtsError::FRTS_CERT_VARIANT_NOT_SUPPORTED)
        }
    }
}
