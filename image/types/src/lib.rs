/*++

Licensed under the Apache-2.0 license.

File Name:

   lib.rs

Abstract:

    File contains data structures for the FRTS region: the boot-time
    configuration, the image descriptor wire format and the metadata
    derived from it.

--*/

#![cfg_attr(not(feature = "std"), no_std)]

mod dirt;
mod vdpa;

use core::ops::Range;

use frts_error::{FrtsError, FrtsResult};
use getset::{CopyGetters, Setters};
use memoffset::span_of;
use zerocopy::{AsBytes, FromBytes};

pub use dirt::{DirtEntry, DirtId, DirtTable, DIRT_COUNT};
pub use vdpa::{
    VdpaEntryCert30, VdpaEntrySize, VdpaEntryType, VDPA_CERT30_MAX_ENTRY_COUNT,
    VDPA_ENTRY_CERT30_BYTE_SIZE, VDPA_MAJOR_TYPE_EXTERNAL_BLOCK, VDPA_MAJOR_TYPE_INTERNAL_BLOCK,
    VDPA_MINOR_TYPE_NORMAL, VDPA_MINOR_TYPE_SIGNATURE, VDPA_SIG_HASH_BYTE_SIZE,
};

/// "FRTS" in little-endian byte order.
pub const FRTS_DESC_IDENTIFIER: u32 = 0x5354_5246;
pub const FRTS_DESC_VERSION_1: u8 = 1;
pub const FRTS_DESC_V1_BYTE_SIZE: usize = core::mem::size_of::<FrtsImageDescriptor>();
pub const FRTS_DESC_PREFIX_BYTE_SIZE: usize = core::mem::size_of::<FrtsImageDescriptorPrefix>();

bitflags::bitflags! {
    /// Image descriptor flags
    pub struct FrtsDescFlags : u32 {
        /// Set by the FRTS copy step once the region is fully populated
        const COPY_COMPLETE = 0b0001;
    }
}

/// FRTS configuration version
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FrtsConfigVersion {
    /// FRTS is not configured on this boot
    #[default]
    Invalid,

    V1,
}

/// Memory that holds the FRTS region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrtsMediaType {
    FrameBuffer = 0,
    SystemMemory = 1,
}

impl TryFrom<u8> for FrtsMediaType {
    type Error = FrtsError;

    fn try_from(value: u8) -> FrtsResult<Self> {
        match value {
            0 => Ok(Self::FrameBuffer),
            1 => Ok(Self::SystemMemory),
            _ => Err(FrtsError::FRTS_CONFIG_MEDIA_TYPE_INVALID),
        }
    }
}

impl From<FrtsMediaType> for u8 {
    fn from(value: FrtsMediaType) -> u8 {
        value as u8
    }
}

/// Write protected region identifier
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WprId(pub u8);

impl WprId {
    /// No write protection
    pub const UNPROTECTED: WprId = WprId(0);

    /// Video protected region; writable by untrusted engines
    pub const VPR: WprId = WprId(1);

    pub const WPR1: WprId = WprId(2);
    pub const WPR2: WprId = WprId(3);
}

/// FRTS configuration handed over by the bootstrap stage
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrtsConfig {
    pub version: FrtsConfigVersion,

    /// Raw media type; decoded with `FrtsMediaType::try_from`
    pub media_type: u8,

    pub wpr_id: WprId,

    /// Start of the FRTS window
    pub offset: u64,

    /// Size of the FRTS window in bytes
    pub size: u64,
}

impl FrtsConfig {
    pub fn is_enabled(&self) -> bool {
        self.version != FrtsConfigVersion::Invalid
    }

    pub fn media_type(&self) -> FrtsResult<FrtsMediaType> {
        FrtsMediaType::try_from(self.media_type)
    }
}

/// Leading part of the image descriptor that may be read before the
/// descriptor size is trusted
#[repr(C)]
#[derive(AsBytes, FromBytes, Default, Debug, Clone, Copy, CopyGetters, Setters)]
pub struct FrtsImageDescriptorPrefix {
    #[getset(get_copy = "pub", set = "pub")]
    identifier: u32,

    #[getset(get_copy = "pub", set = "pub")]
    version_field: u32,

    #[getset(get_copy = "pub", set = "pub")]
    size: u32,
}

impl FrtsImageDescriptorPrefix {
    /// Descriptor version carried in the low byte of the version field
    pub fn version(&self) -> u8 {
        self.version_field as u8
    }
}

/// Version 1 image descriptor located at the start of the FRTS window
#[repr(C)]
#[derive(AsBytes, FromBytes, Default, Debug, Clone, Copy, CopyGetters, Setters)]
pub struct FrtsImageDescriptor {
    /// Identifier; must be `FRTS_DESC_IDENTIFIER`
    #[getset(get_copy = "pub", set = "pub")]
    identifier: u32,

    /// Version in the low byte
    #[getset(get_copy = "pub", set = "pub")]
    version_field: u32,

    /// Size of this structure
    #[getset(get_copy = "pub", set = "pub")]
    size: u32,

    #[getset(get_copy = "pub", set = "pub")]
    flag: u32,

    #[getset(get_copy = "pub", set = "pub")]
    vdpa_header_offset: u32,

    #[getset(get_copy = "pub", set = "pub")]
    vdpa_entry_offset: u32,

    #[getset(get_copy = "pub", set = "pub")]
    vdpa_entry_count: u32,

    #[getset(get_copy = "pub", set = "pub")]
    vdpa_entry_size: u32,

    #[getset(get_copy = "pub", set = "pub")]
    fw_image_offset: u32,

    #[getset(get_copy = "pub", set = "pub")]
    fw_image_size: u32,
}

impl FrtsImageDescriptor {
    /// Returns the `Range<u32>` of the fields that are read before the size is verified
    pub fn prefix_range() -> Range<u32> {
        let span = span_of!(FrtsImageDescriptor, identifier..=size);
        span.start as u32..span.end as u32
    }

    pub fn version(&self) -> u8 {
        self.version_field as u8
    }

    pub fn flags(&self) -> FrtsDescFlags {
        FrtsDescFlags::from_bits_truncate(self.flag)
    }

    /// Layout described by this descriptor; not yet verified
    pub fn metadata(&self) -> FrtsMetadata {
        FrtsMetadata {
            vdpa_entry_offset: self.vdpa_entry_offset,
            vdpa_entry_count: self.vdpa_entry_count,
            vdpa_entry_size: self.vdpa_entry_size,
            image_offset: self.fw_image_offset,
            image_size: self.fw_image_size,
        }
    }
}

/// Region layout relative to the FRTS window start
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrtsMetadata {
    pub vdpa_entry_offset: u32,
    pub vdpa_entry_count: u32,
    pub vdpa_entry_size: u32,
    pub image_offset: u32,
    pub image_size: u32,
}
