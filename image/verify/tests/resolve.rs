// Licensed under the Apache-2.0 license

//! End to end FRTS discovery against an in-memory platform.

#![cfg(feature = "cert30")]

use frts_drivers::memory_layout::FRTS_DMA_ALIGN;
use frts_drivers::{
    align_up, DmaAccess, DmaEngine, DmaIndex, DmaWindow, FrtsError, FrtsErrorKind,
    FrtsResult,
};
use frts_image_types::*;
use frts_image_verify::*;
use zerocopy::AsBytes;

const WINDOW_BASE: u64 = 0x80_0000;
const WINDOW_SIZE: u64 = 0x8000;
const ALIGN: u64 = FRTS_DMA_ALIGN as u64;

struct Platform {
    enforced: bool,
    wpr_id: WprId,
    wpr_region: WprRegion,
    wpr_secure: bool,
    boot_status: Vec<u32>,
    errors: Vec<u32>,
}

impl Default for Platform {
    fn default() -> Self {
        Self {
            enforced: false,
            wpr_id: WprId::WPR2,
            wpr_region: WprRegion {
                offset: WINDOW_BASE,
                size: WINDOW_SIZE,
            },
            wpr_secure: true,
            boot_status: Vec::new(),
            errors: Vec::new(),
        }
    }
}

impl FrtsVerificationEnv for Platform {
    fn enforced_security(&self) -> bool {
        self.enforced
    }

    fn wpr_region(&self, wpr_id: WprId) -> FrtsResult<WprRegion> {
        if wpr_id != self.wpr_id {
            return Err(FrtsError::FRTS_WPR_QUERY_FAILED);
        }
        Ok(self.wpr_region)
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

/// FRTS window in a byte vector; every transfer is recorded
struct WindowDma {
    mem: Vec<u8>,
    reads: Vec<(DmaIndex, u64, usize)>,
}

impl DmaEngine for WindowDma {
    fn check_read_access(&self, _index: DmaIndex, _addr: u64, _size: u64) -> FrtsResult<()> {
        Ok(())
    }

    fn read(&mut self, index: DmaIndex, addr: u64, dst: &mut [u8]) -> FrtsResult<()> {
        assert_eq!(addr % ALIGN, 0, "unaligned transfer at {addr:#x}");
        self.reads.push((index, addr, dst.len()));
        let start = (addr - WINDOW_BASE) as usize;
        dst.copy_from_slice(&self.mem[start..start + dst.len()]);
        Ok(())
    }
}

struct Image {
    desc: FrtsImageDescriptor,
    entries: Vec<VdpaEntryCert30>,
}

impl Image {
    fn new(entries: Vec<VdpaEntryCert30>, image_size: u32) -> Self {
        Self::with_entry_size(entries, VDPA_ENTRY_CERT30_BYTE_SIZE as u32, image_size)
    }

    /// Consistent layout for `entries.len()` entries of `entry_size` bytes
    fn with_entry_size(entries: Vec<VdpaEntryCert30>, entry_size: u32, image_size: u32) -> Self {
        let count = entries.len() as u32;
        let vdpa_offset = align_up(FRTS_DESC_V1_BYTE_SIZE as u64, ALIGN).unwrap() as u32;
        let image_offset =
            vdpa_offset + align_up((count * entry_size) as u64, ALIGN).unwrap() as u32;

        let mut desc = FrtsImageDescriptor::default();
        desc.set_identifier(FRTS_DESC_IDENTIFIER)
            .set_version_field(FRTS_DESC_VERSION_1 as u32)
            .set_size(FRTS_DESC_V1_BYTE_SIZE as u32)
            .set_flag(FrtsDescFlags::COPY_COMPLETE.bits())
            .set_vdpa_header_offset(0)
            .set_vdpa_entry_offset(vdpa_offset)
            .set_vdpa_entry_count(count)
            .set_vdpa_entry_size(entry_size)
            .set_fw_image_offset(image_offset)
            .set_fw_image_size(image_size);
        Self { desc, entries }
    }

    fn image_offset(&self) -> usize {
        self.desc.fw_image_offset() as usize
    }

    fn window(&self) -> Vec<u8> {
        let mut mem: Vec<u8> = (0..WINDOW_SIZE as usize)
            .map(|i| (i as u8) ^ ((i >> 8) as u8))
            .collect();
        mem[..FRTS_DESC_V1_BYTE_SIZE].copy_from_slice(self.desc.as_bytes());
        let mut offset = self.desc.vdpa_entry_offset() as usize;
        for entry in &self.entries {
            mem[offset..offset + VDPA_ENTRY_CERT30_BYTE_SIZE].copy_from_slice(entry.as_bytes());
            offset += VDPA_ENTRY_CERT30_BYTE_SIZE;
        }
        mem
    }
}

fn entry_of_type(major: u8, minor: u8, dirt_id: u16, offset: u32, size: u32) -> VdpaEntryCert30 {
    let mut entry_type = VdpaEntryType::default();
    entry_type.set_major_type(major);
    entry_type.set_minor_type(minor);
    entry_type.set_dirt_id(dirt_id);
    entry_type.set_struct_version(3);
    let mut entry_size = VdpaEntrySize::default();
    entry_size.set_byte_size(size);
    entry_size.set_instance(1);
    VdpaEntryCert30::new(entry_type, offset, entry_size, 0, 0, &[0x5A; 32])
}

fn table_entry(dirt_id: u16, offset: u32, size: u32) -> VdpaEntryCert30 {
    entry_of_type(
        VDPA_MAJOR_TYPE_INTERNAL_BLOCK,
        VDPA_MINOR_TYPE_NORMAL,
        dirt_id,
        offset,
        size,
    )
}

fn config() -> FrtsConfig {
    FrtsConfig {
        version: FrtsConfigVersion::V1,
        media_type: FrtsMediaType::FrameBuffer.into(),
        wpr_id: WprId::WPR2,
        offset: WINDOW_BASE,
        size: WINDOW_SIZE,
    }
}

type Resolver = FrtsResolver<DmaAccess<WindowDma>>;

fn construct(
    config: &FrtsConfig,
    platform: &mut Platform,
    mem: Vec<u8>,
) -> FrtsResult<Option<Resolver>> {
    let access = DmaAccess::with_default_layout(WindowDma {
        mem,
        reads: Vec::new(),
    })?;
    FrtsResolver::construct(config, platform, access)
}

fn resolve(image: &Image) -> Resolver {
    construct(&config(), &mut Platform::default(), image.window())
        .unwrap()
        .unwrap()
}

fn resolve_err(image: &Image) -> FrtsError {
    let mut platform = Platform::default();
    let err = construct(&config(), &mut platform, image.window())
        .err()
        .unwrap();
    assert_eq!(platform.errors, [u32::from(err)]);
    err
}

#[test]
fn test_completeness() {
    let entries = vec![
        table_entry(DirtId::PERFORMANCE_TABLE.0, 0x000, 0x300),
        table_entry(DirtId::MEMORY_CLOCK_TABLE.0, 0x310, 0x44),
        table_entry(DirtId::POWER_POLICY_TABLE.0, 0x400, 0x10),
        entry_of_type(VDPA_MAJOR_TYPE_EXTERNAL_BLOCK, VDPA_MINOR_TYPE_NORMAL, 0x5, 0, 0x10),
        table_entry(DirtId::MEMORY_TRAINING_TABLE.0, 0x800, 0x7FF),
        table_entry(DirtId::MEMORY_TRAINING_PATTERN_TABLE.0, 0x1000, 0x1000),
    ];
    let image = Image::new(entries, 0x3000);
    let mem = image.window();
    let resolver = resolve(&image);

    let base = image.image_offset();
    let expected = [
        (DirtId::PERFORMANCE_TABLE, 0x000, 0x300),
        (DirtId::MEMORY_CLOCK_TABLE, 0x310, 0x44),
        (DirtId::POWER_POLICY_TABLE, 0x400, 0x10),
        (DirtId::MEMORY_TRAINING_TABLE, 0x800, 0x7FF),
        (DirtId::MEMORY_TRAINING_PATTERN_TABLE, 0x1000, 0x1000),
    ];
    let resolved: Vec<(DirtId, DirtEntry)> = resolver.dirt_table().iter().collect();
    assert_eq!(resolved.len(), expected.len());
    for (id, offset, size) in expected {
        assert_eq!(
            resolver.dirt_table().get(id),
            Some(DirtEntry { offset, size }),
            "DIRT {:#x}",
            id.0
        );
    }

    // Tables with a buffer in this build are cached byte for byte
    for (id, offset, size) in expected {
        let start = base + offset as usize;
        match id {
            DirtId::POWER_POLICY_TABLE => assert_eq!(resolver.lookup(id), None),
            _ => assert_eq!(
                resolver.lookup(id),
                Some(&mem[start..start + size as usize])
            ),
        }
    }
    assert_eq!(resolver.lookup(DirtId(0x5)), None);
}

#[test]
fn test_fail_closed_entry_size() {
    let entries = vec![table_entry(0x1, 0, 0x10)];
    let image = Image::with_entry_size(entries, 44, 0x1000);
    let err = resolve_err(&image);
    assert_eq!(err, FrtsError::FRTS_VDPA_ENTRY_SIZE_MISMATCH);
    assert_eq!(err.kind(), FrtsErrorKind::InvalidState);
}

#[test]
fn test_fail_closed_entry_count() {
    let entries = vec![table_entry(0x1, 0, 0x10); 65];
    let image = Image::new(entries, 0x1000);
    let err = resolve_err(&image);
    assert_eq!(err, FrtsError::FRTS_VDPA_ENTRY_COUNT_EXCEEDED);
    assert_eq!(err.kind(), FrtsErrorKind::InvalidState);
}

#[test]
fn test_max_entry_count_accepted() {
    let mut entries = vec![entry_of_type(VDPA_MAJOR_TYPE_EXTERNAL_BLOCK, 0, 0x1, 0, 0x10); 63];
    entries.push(table_entry(0x2, 0x40, 0x40));
    let image = Image::new(entries, 0x1000);
    let resolver = resolve(&image);
    assert_eq!(resolver.dirt_table().populated_count(), 1);
}

#[test]
fn test_alignment_law() {
    for offset in (0u64..0x1400).step_by(0x37) {
        for size in [0u32, 1, 0xFF, 0x100, 0x101, 0x1FF, 0x3F1] {
            let window = DmaWindow::covering(offset, size).unwrap();
            assert_eq!(window.aligned_start % ALIGN, 0);
            assert_eq!(window.transfer_size as u64 % ALIGN, 0);
            assert!(window.aligned_start <= offset);
            assert!(window.end() >= offset + size as u64);
            assert_eq!(window.aligned_start + window.pre_pad as u64, offset);
            assert!((window.pre_pad as u64) < ALIGN);
        }
    }
}

#[test]
fn test_duplicate_dirt_id_last_entry_wins() {
    let entries = vec![
        table_entry(0xA, 0x100, 0x80),
        table_entry(0x3, 0x200, 0x20),
        table_entry(0xA, 0x600, 0x40),
    ];
    let image = Image::new(entries, 0x1000);
    let mem = image.window();
    let resolver = resolve(&image);

    assert_eq!(
        resolver.dirt_table().get(DirtId(0xA)),
        Some(DirtEntry {
            offset: 0x600,
            size: 0x40
        })
    );
    let start = image.image_offset() + 0x600;
    assert_eq!(
        resolver.lookup(DirtId(0xA)),
        Some(&mem[start..start + 0x40])
    );
}

#[test]
fn test_fetch_is_stable() {
    let image = Image::new(vec![table_entry(0xA, 0x123, 0x99)], 0x1000);
    let mut resolver = resolve(&image);
    let reads = resolver.access().engine().reads.len();

    let (first_ptr, first) = {
        let table = resolver.fetch(DirtId(0xA)).unwrap().unwrap();
        (table.as_ptr() as usize, table.to_vec())
    };
    let (second_ptr, second) = {
        let table = resolver.fetch(DirtId(0xA)).unwrap().unwrap();
        (table.as_ptr() as usize, table.to_vec())
    };
    assert_eq!(first_ptr, second_ptr);
    assert_eq!(first, second);
    assert_eq!(resolver.access().engine().reads.len(), reads);
}

#[test]
fn test_scenario_a_metadata_layout() {
    let platform = Platform::default();
    let verifier = FrtsVerifier::new(&platform);
    let mut metadata = FrtsMetadata {
        vdpa_entry_offset: 256,
        vdpa_entry_count: 3,
        vdpa_entry_size: 44,
        image_offset: 512,
        image_size: 4096,
    };
    assert_eq!(
        verifier.verify_metadata_layout(64, &metadata, WINDOW_SIZE),
        Ok(())
    );

    metadata.image_offset = 500;
    let err = verifier
        .verify_metadata_layout(64, &metadata, WINDOW_SIZE)
        .unwrap_err();
    assert_eq!(err, FrtsError::FRTS_META_IMAGE_OFFSET_MISMATCH);
    assert_eq!(err.kind(), FrtsErrorKind::InvalidState);
}

#[test]
fn test_scenario_b_single_table_transfer() {
    let image = Image::new(vec![table_entry(0xA, 1024, 256)], 0x800);
    let mem = image.window();
    let resolver = resolve(&image);

    assert_eq!(
        resolver.dirt_table().get(DirtId(0xA)),
        Some(DirtEntry {
            offset: 1024,
            size: 256
        })
    );

    // Descriptor prefix, full descriptor, VDPA array, then the table
    let reads = &resolver.access().engine().reads;
    assert_eq!(reads.len(), 4);
    let (index, addr, len) = reads[3];
    let absolute = image.image_offset() as u64 + 1024;
    assert_eq!(index, DmaIndex::UcodeFrameBuffer);
    assert_eq!(addr, WINDOW_BASE + absolute / ALIGN * ALIGN);
    assert!(len >= 256);
    assert_eq!(len as u64 % ALIGN, 0);

    let start = absolute as usize;
    assert_eq!(
        resolver.lookup(DirtId(0xA)),
        Some(&mem[start..start + 256])
    );
}

#[test]
fn test_unaligned_table_lands_on_table_start() {
    let image = Image::new(vec![table_entry(0xB, 0x2F1, 0x30)], 0x800);
    let mem = image.window();
    let resolver = resolve(&image);

    let absolute = image.image_offset() as u64 + 0x2F1;
    let (_, addr, len) = resolver.access().engine().reads[3];
    assert_eq!(addr, WINDOW_BASE + absolute / ALIGN * ALIGN);
    assert_eq!(len as u64, 2 * ALIGN);

    let start = absolute as usize;
    assert_eq!(
        resolver.lookup(DirtId(0xB)),
        Some(&mem[start..start + 0x30])
    );
}

#[test]
fn test_empty_vdpa_array() {
    let image = Image::new(Vec::new(), 0x100);
    let resolver = resolve(&image);
    assert_eq!(resolver.dirt_table().populated_count(), 0);
    assert_eq!(resolver.state(), FrtsState::DirtResolved);
    assert_eq!(resolver.access().engine().reads.len(), 2);
}

#[test]
fn test_dirt_id_past_count_is_skipped() {
    let entries = vec![
        table_entry(DIRT_COUNT as u16, 0, 0x10),
        table_entry(DIRT_COUNT as u16 - 1, 0, 0x10),
    ];
    let image = Image::new(entries, 0x100);
    let resolver = resolve(&image);
    assert_eq!(resolver.dirt_table().populated_count(), 1);
    assert!(resolver
        .dirt_table()
        .is_populated(DirtId(DIRT_COUNT as u16 - 1)));
    assert_eq!(resolver.dirt_table().get(DirtId(DIRT_COUNT as u16)), None);
}

#[test]
fn test_disabled() {
    let mut platform = Platform::default();
    let config = FrtsConfig::default();
    let resolver = construct(&config, &mut platform, Vec::new()).unwrap();
    assert!(resolver.is_none());
    assert_eq!(platform.boot_status, [u32::from(FrtsBootStatus::Disabled)]);
    assert!(platform.errors.is_empty());
}

#[test]
fn test_boot_status_sequence() {
    let image = Image::new(vec![table_entry(0x1, 0, 0x100)], 0x100);
    let mut platform = Platform {
        enforced: true,
        ..Default::default()
    };
    construct(&config(), &mut platform, image.window())
        .unwrap()
        .unwrap();
    let expected: Vec<u32> = [
        FrtsBootStatus::ConfigAccepted,
        FrtsBootStatus::SecureAccessVerified,
        FrtsBootStatus::DescriptorValidated,
        FrtsBootStatus::MetadataVerified,
        FrtsBootStatus::VdpaEntriesLoaded,
        FrtsBootStatus::DirtResolved,
    ]
    .into_iter()
    .map(u32::from)
    .collect();
    assert_eq!(platform.boot_status, expected);
}

fn secure_err(platform: &mut Platform, config: &FrtsConfig) -> FrtsError {
    platform.enforced = true;
    let image = Image::new(vec![table_entry(0x1, 0, 0x10)], 0x100);
    let err = construct(config, platform, image.window()).err().unwrap();
    assert_eq!(platform.errors, [u32::from(err)]);
    assert!(!platform
        .boot_status
        .contains(&u32::from(FrtsBootStatus::SecureAccessVerified)));
    err
}

#[test]
fn test_secure_sysmem_denied() {
    let config = FrtsConfig {
        media_type: FrtsMediaType::SystemMemory.into(),
        ..config()
    };
    let err = secure_err(&mut Platform::default(), &config);
    assert_eq!(err, FrtsError::FRTS_SECURE_MEDIA_TYPE_DENIED);
    assert_eq!(err.kind(), FrtsErrorKind::PermissionDenied);
}

#[test]
fn test_secure_unprotected_wpr_ids() {
    for (wpr_id, expected) in [
        (WprId::UNPROTECTED, FrtsError::FRTS_SECURE_WPR_ID_UNPROTECTED),
        (WprId::VPR, FrtsError::FRTS_SECURE_WPR_ID_VPR),
    ] {
        let config = FrtsConfig { wpr_id, ..config() };
        let err = secure_err(&mut Platform::default(), &config);
        assert_eq!(err, expected);
        assert_eq!(err.kind(), FrtsErrorKind::PermissionDenied);
    }
}

#[test]
fn test_secure_window_outside_wpr() {
    let mut platform = Platform {
        wpr_region: WprRegion {
            offset: WINDOW_BASE + ALIGN,
            size: WINDOW_SIZE,
        },
        ..Default::default()
    };
    let err = secure_err(&mut platform, &config());
    assert_eq!(err, FrtsError::FRTS_SECURE_WINDOW_OUTSIDE_WPR);
    assert_eq!(err.kind(), FrtsErrorKind::SecurityViolation);
}

#[test]
fn test_secure_wpr_not_secure() {
    let mut platform = Platform {
        wpr_secure: false,
        ..Default::default()
    };
    let err = secure_err(&mut platform, &config());
    assert_eq!(err, FrtsError::FRTS_SECURE_WPR_NOT_SECURE);
    assert_eq!(err.kind(), FrtsErrorKind::SecurityViolation);
}

#[test]
fn test_secure_wpr_query_failure() {
    let mut platform = Platform {
        wpr_id: WprId::WPR1,
        ..Default::default()
    };
    let err = secure_err(&mut platform, &config());
    assert_eq!(err, FrtsError::FRTS_WPR_QUERY_FAILED);
    assert_eq!(err.kind(), FrtsErrorKind::Dma);
}

#[test]
fn test_unenforced_skips_secure_checks() {
    let image = Image::new(Vec::new(), 0x100);
    let config = FrtsConfig {
        wpr_id: WprId::UNPROTECTED,
        ..config()
    };
    let mut platform = Platform::default();
    assert!(construct(&config, &mut platform, image.window())
        .unwrap()
        .is_some());
}

#[test]
fn test_descriptor_failures() {
    let cases: [(fn(&mut FrtsImageDescriptor), FrtsError); 5] = [
        (
            |desc| {
                desc.set_identifier(u32::from_le_bytes(*b"FRTX"));
            },
            FrtsError::FRTS_DESC_IDENTIFIER_MISMATCH,
        ),
        (
            |desc| {
                desc.set_version_field(0x0102);
            },
            FrtsError::FRTS_DESC_VERSION_UNSUPPORTED,
        ),
        (
            |desc| {
                desc.set_size(64);
            },
            FrtsError::FRTS_DESC_SIZE_MISMATCH,
        ),
        (
            |desc| {
                desc.set_flag(0b0010);
            },
            FrtsError::FRTS_DESC_COPY_INCOMPLETE,
        ),
        (
            |desc| {
                desc.set_fw_image_size(0x10);
            },
            FrtsError::FRTS_META_IMAGE_END_MISALIGNED,
        ),
    ];

    for (corrupt, expected) in cases {
        let mut image = Image::new(vec![table_entry(0x1, 0, 0x10)], 0x100);
        corrupt(&mut image.desc);
        let err = resolve_err(&image);
        assert_eq!(err, expected);
        assert_eq!(err.kind(), FrtsErrorKind::InvalidState);
    }
}

#[test]
fn test_image_beyond_window() {
    let image = Image::new(Vec::new(), WINDOW_SIZE as u32);
    assert_eq!(resolve_err(&image), FrtsError::FRTS_META_IMAGE_TOO_LARGE);
}

#[test]
fn test_table_outside_image() {
    let image = Image::new(vec![table_entry(0x1, 0xF0, 0x20)], 0x100);
    let err = resolve_err(&image);
    assert_eq!(err, FrtsError::FRTS_TABLE_OUT_OF_IMAGE);
    assert_eq!(err.kind(), FrtsErrorKind::InvalidState);
}

#[test]
fn test_table_larger_than_buffer() {
    let image = Image::new(vec![table_entry(0x2, 0, 0x401)], 0x800);
    assert_eq!(resolve_err(&image), FrtsError::FRTS_TABLE_TOO_LARGE);
}

#[test]
fn test_window_config_errors() {
    for (offset, size, expected) in [
        (WINDOW_BASE, 0, FrtsError::FRTS_CONFIG_WINDOW_EMPTY),
        (
            WINDOW_BASE,
            memory_layout_max() + ALIGN,
            FrtsError::FRTS_CONFIG_WINDOW_TOO_LARGE,
        ),
        (WINDOW_BASE + 0x10, WINDOW_SIZE, FrtsError::FRTS_CONFIG_WINDOW_MISALIGNED),
        (u64::MAX - 0xFF, WINDOW_SIZE, FrtsError::FRTS_CONFIG_WINDOW_OVERFLOW),
    ] {
        let config = FrtsConfig {
            offset,
            size,
            ..config()
        };
        let mut platform = Platform::default();
        let err = construct(&config, &mut platform, Vec::new()).err().unwrap();
        assert_eq!(err, expected);
        assert_eq!(err.kind(), FrtsErrorKind::InvalidArgument);
    }
}

fn memory_layout_max() -> u64 {
    frts_drivers::memory_layout::FRTS_MAX_SIZE
}
