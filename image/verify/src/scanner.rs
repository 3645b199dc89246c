/*++

Licensed under the Apache-2.0 license.

File Name:

    scanner.rs

Abstract:

    This file walks the VDPA entry array and builds the DIRT table.

--*/

use frts_drivers::memory_layout::FRTS_DMA_ALIGN;
use frts_drivers::{align_up, cprintln, AccessBackend, FrtsError, FrtsResult};
use frts_image_types::{DirtEntry, DirtId, DirtTable, FrtsMetadata, DIRT_COUNT};

use crate::cert::CertVariantParser;

/// VDPA Scanner
pub struct VdpaScanner<'a> {
    /// Decoder for the active CERT variant
    parser: &'a dyn CertVariantParser,
}

impl<'a> VdpaScanner<'a> {
    /// Create a new instance `VdpaScanner`
    ///
    /// # Arguments
    ///
    /// * `parser` - CERT variant parser
    pub fn new(parser: &'a dyn CertVariantParser) -> Self {
        Self { parser }
    }

    /// Load the VDPA entry array and resolve it into a DIRT table
    ///
    /// # Arguments
    ///
    /// * `metadata` - Verified region metadata
    /// * `access` - Opened access backend
    pub fn scan<A: AccessBackend>(
        &self,
        metadata: &FrtsMetadata,
        access: &mut A,
    ) -> FrtsResult<DirtTable> {
        self.load_entries(metadata, access)?;
        self.resolve(metadata, access)
    }

    /// Verify the entry geometry against the active variant and read the
    /// whole VDPA array in one transfer
    ///
    /// # Returns
    ///
    /// * `u32` - Number of bytes transferred
    pub fn load_entries<A: AccessBackend>(
        &self,
        metadata: &FrtsMetadata,
        access: &mut A,
    ) -> FrtsResult<u32> {
        if metadata.vdpa_entry_size != self.parser.entry_size() {
            return Err(FrtsError::FRTS_VDPA_ENTRY_SIZE_MISMATCH);
        }
        if metadata.vdpa_entry_count > self.parser.max_entry_count() {
            return Err(FrtsError::FRTS_VDPA_ENTRY_COUNT_EXCEEDED);
        }

        let len = (metadata.vdpa_entry_count as u64)
            .checked_mul(metadata.vdpa_entry_size as u64)
            .and_then(|len| align_up(len, FRTS_DMA_ALIGN as u64))
            .and_then(|len| u32::try_from(len).ok())
            .ok_or(FrtsError::FRTS_META_ARITHMETIC_OVERFLOW)?;
        access.read_vdpa_entries(metadata.vdpa_entry_offset, len)?;
        Ok(len)
    }

    /// Populate a DIRT table from the loaded VDPA array, fetching each
    /// resolved table as it is found
    ///
    /// A later entry for the same DIRT id replaces the earlier one.
    pub fn resolve<A: AccessBackend>(
        &self,
        metadata: &FrtsMetadata,
        access: &mut A,
    ) -> FrtsResult<DirtTable> {
        let mut table = DirtTable::new();

        for index in 0..metadata.vdpa_entry_count {
            let record = self.parser.parse_entry(access.vdpa_entries(), index)?;
            if !record.is_internal_normal() {
                continue;
            }

            // Ids past the known range belong to newer images
            if record.dirt_id as usize >= DIRT_COUNT {
                continue;
            }

            let id = DirtId(record.dirt_id);
            let entry = DirtEntry {
                offset: record.offset_start,
                size: record.byte_size,
            };
            if table.is_populated(id) {
                cprintln!("[frts] DIRT {} replaced by VDPA entry {}", id.0, index);
            }
            table.set(id, entry);
            access.fetch_table(metadata, id, entry.offset, entry.size)?;
        }

        Ok(table)
    }
}
