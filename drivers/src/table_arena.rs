/*++

Licensed under the Apache-2.0 license.

File Name:

    table_arena.rs

Abstract:

    File contains the fixed pool of table buffers, one per DIRT id this
    firmware knows how to consume.

--*/

use frts_error::{FrtsError, FrtsResult};
use frts_image_types::{DirtId, DIRT_COUNT};

use crate::memory_layout::FRTS_DMA_ALIGN;

/// Buffer reserved for one DIRT table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableBufferSpec {
    pub id: DirtId,

    /// Largest table this build accepts for `id`
    pub max_size: u32,
}

impl TableBufferSpec {
    pub const fn new(id: DirtId, max_size: u32) -> Self {
        Self { id, max_size }
    }

    /// Bytes reserved in the pool
    ///
    /// An aligned transfer of a `max_size` table starting up to one
    /// alignment unit early ends at most at `align_up(max_size) + FRTS_DMA_ALIGN`.
    pub const fn capacity(&self) -> usize {
        let align = FRTS_DMA_ALIGN as usize;
        (self.max_size as usize + align - 1) / align * align + align
    }
}

/// Pool size needed to hold every buffer in `layout`
pub const fn arena_size(layout: &[TableBufferSpec]) -> usize {
    let mut size = 0;
    let mut i = 0;
    while i < layout.len() {
        size += layout[i].capacity();
        i += 1;
    }
    size
}

/// Tables consumed by this firmware build
pub const DEFAULT_TABLE_LAYOUT: &[TableBufferSpec] = &[
    TableBufferSpec::new(DirtId::PERFORMANCE_TABLE, 2048),
    TableBufferSpec::new(DirtId::MEMORY_CLOCK_TABLE, 1024),
    TableBufferSpec::new(DirtId::MEMORY_TWEAK_TABLE, 1024),
    TableBufferSpec::new(DirtId::MEMORY_TRAINING_TABLE, 2048),
    TableBufferSpec::new(DirtId::MEMORY_INFORMATION_TABLE, 1024),
    TableBufferSpec::new(DirtId::MEMORY_TRAINING_PATTERN_TABLE, 4096),
];

pub const DEFAULT_ARENA_SIZE: usize = arena_size(DEFAULT_TABLE_LAYOUT);

pub type DefaultTableArena = TableArena<DEFAULT_ARENA_SIZE>;

/// Location of a fetched table inside its buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedTable {
    /// Offset relative to the firmware image start
    pub relative_offset: u32,
    pub size: u32,

    /// Bytes the transfer started ahead of the table
    pub pre_pad: u32,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    base: usize,
    capacity: usize,
    max_size: usize,
}

/// Fixed-capacity table buffers carved out of one pool
pub struct TableArena<const N: usize> {
    pool: [u8; N],
    slots: [Option<Slot>; DIRT_COUNT],
    cached: [Option<CachedTable>; DIRT_COUNT],
}

impl<const N: usize> TableArena<N> {
    /// Create an arena holding one buffer per entry in `layout`
    ///
    /// # Arguments
    ///
    /// * `layout` - Buffers to reserve
    pub fn new(layout: &[TableBufferSpec]) -> FrtsResult<Self> {
        let mut slots = [None; DIRT_COUNT];
        let mut base = 0usize;
        for spec in layout {
            let index = spec.id.index().ok_or(FrtsError::FRTS_TABLE_LAYOUT_INVALID)?;
            if slots[index].is_some() {
                return Err(FrtsError::FRTS_TABLE_LAYOUT_INVALID);
            }
            let capacity = spec.capacity();
            let end = base
                .checked_add(capacity)
                .filter(|end| *end <= N)
                .ok_or(FrtsError::FRTS_TABLE_LAYOUT_TOO_LARGE)?;
            slots[index] = Some(Slot {
                base,
                capacity,
                max_size: spec.max_size as usize,
            });
            base = end;
        }

        Ok(Self {
            pool: [0u8; N],
            slots,
            cached: [None; DIRT_COUNT],
        })
    }

    fn slot(&self, id: DirtId) -> Option<Slot> {
        self.slots[id.index()?]
    }

    /// Buffer capacity reserved for `id`, `None` if this build has no buffer for it
    pub fn capacity(&self, id: DirtId) -> Option<usize> {
        self.slot(id).map(|slot| slot.capacity)
    }

    /// Largest table accepted for `id`
    pub fn max_table_size(&self, id: DirtId) -> Option<usize> {
        self.slot(id).map(|slot| slot.max_size)
    }

    /// Whole buffer for `id`; invalidates any cached table in it
    pub fn buffer_mut(&mut self, id: DirtId) -> Option<&mut [u8]> {
        let slot = self.slot(id)?;
        self.cached[id.index()?] = None;
        Some(&mut self.pool[slot.base..slot.base + slot.capacity])
    }

    /// Mark the buffer for `id` as holding `table`
    pub fn set_cached(&mut self, id: DirtId, table: CachedTable) -> FrtsResult<()> {
        let slot = self.slot(id).ok_or(FrtsError::FRTS_TABLE_LAYOUT_INVALID)?;
        let end = table.pre_pad as usize + table.size as usize;
        if end > slot.capacity {
            return Err(FrtsError::FRTS_ACCESS_BUFFER_TOO_SMALL);
        }
        if let Some(index) = id.index() {
            self.cached[index] = Some(table);
        }
        Ok(())
    }

    pub fn cached(&self, id: DirtId) -> Option<CachedTable> {
        self.cached[id.index()?]
    }

    /// Bytes of the cached table for `id`, starting exactly at the table
    pub fn table(&self, id: DirtId) -> Option<&[u8]> {
        let slot = self.slot(id)?;
        let table = self.cached(id)?;
        let start = slot.base + table.pre_pad as usize;
        self.pool.get(start..start + table.size as usize)
    }
}
