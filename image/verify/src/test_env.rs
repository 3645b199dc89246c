// Licensed under the Apache-2.0 license

//! In-memory platform used by the unit tests of this crate.

use frts_drivers::{
    align_up, arena_size, AccessBackend, DmaAccess, DmaEngine, DmaIndex, FrtsError, FrtsResult,
    TableBufferSpec,
};
use frts_image_types::{
    DirtId, FrtsConfig, FrtsConfigVersion, FrtsDescFlags, FrtsImageDescriptor, FrtsMediaType,
    VdpaEntryCert30, VdpaEntrySize, VdpaEntryType, WprId, FRTS_DESC_IDENTIFIER,
    FRTS_DESC_V1_BYTE_SIZE, FRTS_DESC_VERSION_1, VDPA_ENTRY_CERT30_BYTE_SIZE,
    VDPA_MAJOR_TYPE_INTERNAL_BLOCK, VDPA_MINOR_TYPE_NORMAL,
};
use zerocopy::AsBytes;

use crate::{FrtsVerificationEnv, WprRegion};

pub const WINDOW_BASE: u64 = 0x10_0000;
pub const WINDOW_SIZE: u64 = 0x4000;
pub const ALIGN: u32 = 256;

pub const LAYOUT: &[TableBufferSpec] = &[
    TableBufferSpec::new(DirtId(0x3), 512),
    TableBufferSpec::new(DirtId(0xA), 1024),
];

pub type TestAccess = DmaAccess<FakeDma, { arena_size(LAYOUT) }>;

pub struct TestEnv {
    pub enforced: bool,
    pub wpr_region: FrtsResult<WprRegion>,
    pub wpr_secure: bool,
    pub boot_status: Vec<u32>,
    pub errors: Vec<u32>,
}

impl Default for TestEnv {
    fn default() -> Self {
        Self {
            enforced: false,
            wpr_region: Ok(WprRegion {
                offset: WINDOW_BASE,
                size: WINDOW_SIZE,
            }),
            wpr_secure: true,
            boot_status: Vec::new(),
            errors: Vec::new(),
        }
    }
}

impl FrtsVerificationEnv for TestEnv {
    fn enforced_security(&self) -> bool {
        self.enforced
    }

    fn wpr_region(&self, _wpr_id: WprId) -> FrtsResult<WprRegion> {
        self.wpr_region
    }

    fn wpr_read_secure(&self, _wpr_id: WprId) -> FrtsResult<bool> {
        Ok(self.wpr_secure)
    }

    fn set_boot_status(&mut self, status: u32) {
        self.boot_status.push(status);
    }

    fn report_error(&mut self, code: u32) {
        self.errors.push(code);
    }
}

/// FRTS window backed by a byte vector; records every transfer.
#[derive(Default)]
pub struct FakeDma {
    pub mem: Vec<u8>,
    pub reads: Vec<(DmaIndex, u64, usize)>,
    pub deny: bool,
}

impl FakeDma {
    pub fn new(mem: Vec<u8>) -> Self {
        Self {
            mem,
            ..Default::default()
        }
    }
}

impl DmaEngine for FakeDma {
    fn check_read_access(&self, _index: DmaIndex, _addr: u64, _size: u64) -> FrtsResult<()> {
        if self.deny {
            return Err(FrtsError::FRTS_DMA_ACCESS_DENIED);
        }
        Ok(())
    }

    fn read(&mut self, index: DmaIndex, addr: u64, dst: &mut [u8]) -> FrtsResult<()> {
        self.reads.push((index, addr, dst.len()));
        let start = (addr - WINDOW_BASE) as usize;
        let src = self
            .mem
            .get(start..start + dst.len())
            .ok_or(FrtsError::FRTS_DMA_TRANSFER_FAILED)?;
        dst.copy_from_slice(src);
        Ok(())
    }
}

pub fn config() -> FrtsConfig {
    FrtsConfig {
        version: FrtsConfigVersion::V1,
        media_type: FrtsMediaType::FrameBuffer.into(),
        wpr_id: WprId::WPR2,
        offset: WINDOW_BASE,
        size: WINDOW_SIZE,
    }
}

pub fn entry(dirt_id: u16, offset: u32, size: u32) -> VdpaEntryCert30 {
    entry_of_type(
        VDPA_MAJOR_TYPE_INTERNAL_BLOCK,
        VDPA_MINOR_TYPE_NORMAL,
        dirt_id,
        offset,
        size,
    )
}

pub fn entry_of_type(
    major: u8,
    minor: u8,
    dirt_id: u16,
    offset: u32,
    size: u32,
) -> VdpaEntryCert30 {
    let mut entry_type = VdpaEntryType::default();
    entry_type.set_major_type(major);
    entry_type.set_minor_type(minor);
    entry_type.set_dirt_id(dirt_id);
    entry_type.set_struct_version(1);
    let mut entry_size = VdpaEntrySize::default();
    entry_size.set_byte_size(size);
    VdpaEntryCert30::new(entry_type, offset, entry_size, 0, 0, &[0u8; 32])
}

/// Well-formed descriptor for `entry_count` CERT30 entries and an image of `image_size` bytes
pub fn descriptor(entry_count: u32, image_size: u32) -> FrtsImageDescriptor {
    let align = ALIGN as u64;
    let vdpa_offset = align_up(FRTS_DESC_V1_BYTE_SIZE as u64, align).unwrap() as u32;
    let entries_len = entry_count * VDPA_ENTRY_CERT30_BYTE_SIZE as u32;
    let image_offset = vdpa_offset + align_up(entries_len as u64, align).unwrap() as u32;

    let mut desc = FrtsImageDescriptor::default();
    desc.set_identifier(FRTS_DESC_IDENTIFIER)
        .set_version_field(FRTS_DESC_VERSION_1 as u32)
        .set_size(FRTS_DESC_V1_BYTE_SIZE as u32)
        .set_flag(FrtsDescFlags::COPY_COMPLETE.bits())
        .set_vdpa_entry_offset(vdpa_offset)
        .set_vdpa_entry_count(entry_count)
        .set_vdpa_entry_size(VDPA_ENTRY_CERT30_BYTE_SIZE as u32)
        .set_fw_image_offset(image_offset)
        .set_fw_image_size(image_size);
    desc
}

/// Lay out `desc` and `entries` in a window; image bytes follow a counting pattern
pub fn window(desc: &FrtsImageDescriptor, entries: &[VdpaEntryCert30]) -> Vec<u8> {
    let mut mem: Vec<u8> = (0..WINDOW_SIZE as usize).map(|i| (i % 251) as u8).collect();
    mem[..FRTS_DESC_V1_BYTE_SIZE].copy_from_slice(desc.as_bytes());
    let mut offset = desc.vdpa_entry_offset() as usize;
    for entry in entries {
        mem[offset..offset + VDPA_ENTRY_CERT30_BYTE_SIZE].copy_from_slice(entry.as_bytes());
        offset += VDPA_ENTRY_CERT30_BYTE_SIZE;
    }
    mem
}

pub fn access(mem: Vec<u8>) -> TestAccess {
    DmaAccess::new(FakeDma::new(mem), LAYOUT).unwrap()
}

pub fn opened_access(mem: Vec<u8>) -> TestAccess {
    let mut access = access(mem);
    access
        .open(DmaIndex::UcodeFrameBuffer, &config())
        .unwrap();
    access
}
