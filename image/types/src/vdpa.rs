/*++

Licensed under the Apache-2.0 license.

File Name:

   vdpa.rs

Abstract:

    File contains the CERT30 VDPA entry wire format.

--*/

use bitfield::bitfield;

pub const VDPA_ENTRY_CERT30_BYTE_SIZE: usize = 52;
pub const VDPA_CERT30_MAX_ENTRY_COUNT: u32 = 64;
pub const VDPA_SIG_HASH_BYTE_SIZE: usize = 32;

pub const VDPA_MAJOR_TYPE_INTERNAL_BLOCK: u8 = 0x01;
pub const VDPA_MAJOR_TYPE_EXTERNAL_BLOCK: u8 = 0x02;

pub const VDPA_MINOR_TYPE_NORMAL: u8 = 0x00;
pub const VDPA_MINOR_TYPE_SIGNATURE: u8 = 0x01;

const TYPE_WORD_OFFSET: usize = 0;
const OFFSET_START_OFFSET: usize = 4;
const SIZE_WORD_OFFSET: usize = 8;
const FLAGS_OFFSET: usize = 12;
const FLAGS1_OFFSET: usize = 16;
const SIG_HASH_OFFSET: usize = 20;

bitfield! {
    /// Packed `type` word of a VDPA entry
    #[derive(Default, Clone, Copy, PartialEq, Eq)]
    pub struct VdpaEntryType(u32);
    impl Debug;

    pub u8, major_type, set_major_type: 7, 0;
    pub u8, minor_type, set_minor_type: 15, 8;

    /// Data ID Reference Table id of the covered block
    pub u16, dirt_id, set_dirt_id: 27, 16;

    pub u8, struct_version, set_struct_version: 31, 28;
}

bitfield! {
    /// Packed `size` word of a VDPA entry
    #[derive(Default, Clone, Copy, PartialEq, Eq)]
    pub struct VdpaEntrySize(u32);
    impl Debug;

    pub u32, byte_size, set_byte_size: 19, 0;
    pub u8, instance, set_instance: 23, 20;
    pub u8, code_type, set_code_type: 31, 24;
}

/// CERT30 VDPA entry.
///
/// Kept as raw bytes; every field is decoded from little-endian words on
/// access so the in-memory layout of this struct never matters.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct VdpaEntryCert30 {
    raw: [u8; VDPA_ENTRY_CERT30_BYTE_SIZE],
}

impl VdpaEntryCert30 {
    pub fn new(
        entry_type: VdpaEntryType,
        offset_start: u32,
        size: VdpaEntrySize,
        flags: u32,
        flags1: u32,
        sig_hash: &[u8; VDPA_SIG_HASH_BYTE_SIZE],
    ) -> Self {
        let mut raw = [0u8; VDPA_ENTRY_CERT30_BYTE_SIZE];
        raw[TYPE_WORD_OFFSET..][..4].copy_from_slice(&entry_type.0.to_le_bytes());
        raw[OFFSET_START_OFFSET..][..4].copy_from_slice(&offset_start.to_le_bytes());
        raw[SIZE_WORD_OFFSET..][..4].copy_from_slice(&size.0.to_le_bytes());
        raw[FLAGS_OFFSET..][..4].copy_from_slice(&flags.to_le_bytes());
        raw[FLAGS1_OFFSET..][..4].copy_from_slice(&flags1.to_le_bytes());
        raw[SIG_HASH_OFFSET..].copy_from_slice(sig_hash);
        Self { raw }
    }

    /// Copy an entry out of `bytes`; `None` if fewer than
    /// `VDPA_ENTRY_CERT30_BYTE_SIZE` bytes are available.
    pub fn read_from_prefix(bytes: &[u8]) -> Option<Self> {
        let raw = bytes.get(..VDPA_ENTRY_CERT30_BYTE_SIZE)?.try_into().ok()?;
        Some(Self { raw })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    fn word(&self, offset: usize) -> u32 {
        let mut word = [0u8; 4];
        word.copy_from_slice(&self.raw[offset..offset + 4]);
        u32::from_le_bytes(word)
    }

    pub fn entry_type(&self) -> VdpaEntryType {
        VdpaEntryType(self.word(TYPE_WORD_OFFSET))
    }

    pub fn offset_start(&self) -> u32 {
        self.word(OFFSET_START_OFFSET)
    }

    pub fn size(&self) -> VdpaEntrySize {
        VdpaEntrySize(self.word(SIZE_WORD_OFFSET))
    }

    pub fn flags(&self) -> u32 {
        self.word(FLAGS_OFFSET)
    }

    pub fn flags1(&self) -> u32 {
        self.word(FLAGS1_OFFSET)
    }

    pub fn sig_hash(&self) -> &[u8] {
        &self.raw[SIG_HASH_OFFSET..]
    }
}

impl core::fmt::Debug for VdpaEntryCert30 {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VdpaEntryCert30")
            .field("entry_type", &self.entry_type())
            .field("offset_start", &self.offset_start())
            .field("size", &self.size())
            .field("flags", &self.flags())
            .field("flags1", &self.flags1())
            .finish()
    }
}
