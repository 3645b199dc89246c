/*++

Licensed under the Apache-2.0 license.

File Name:

    access.rs

Abstract:

    File contains the FRTS access backend interface and its DMA
    implementation. The backend owns the fixed buffers that cache the
    descriptor, the VDPA entry array and the resolved tables.

--*/

use frts_error::{FrtsError, FrtsResult};
use frts_image_types::{DirtId, FrtsConfig, FrtsMetadata};

use crate::bounded_address::FrtsMemDesc;
use crate::cprintln;
use crate::dma::{DmaEngine, DmaIndex, DmaWindow};
use crate::memory_layout::{DESC_BUFFER_SIZE, VDPA_BUFFER_SIZE};
use crate::table_arena::{
    CachedTable, TableArena, TableBufferSpec, DEFAULT_ARENA_SIZE, DEFAULT_TABLE_LAYOUT,
};

/// Read access to the FRTS window
pub trait AccessBackend {
    /// Confirm the platform lets `index` read the window in `config`
    fn check_read_access(&self, index: DmaIndex, config: &FrtsConfig) -> FrtsResult<()>;

    /// Bind the backend to the window in `config`
    fn open(&mut self, index: DmaIndex, config: &FrtsConfig) -> FrtsResult<()>;

    /// Read the first `len` descriptor bytes into the descriptor cache
    fn read_descriptor(&mut self, len: usize) -> FrtsResult<&[u8]>;

    /// Cached descriptor bytes from the last `read_descriptor`
    fn descriptor(&self) -> &[u8];

    /// Read `len` bytes of VDPA entries at window offset `offset`
    fn read_vdpa_entries(&mut self, offset: u32, len: u32) -> FrtsResult<()>;

    /// Cached VDPA entry bytes from the last `read_vdpa_entries`
    fn vdpa_entries(&self) -> &[u8];

    /// Fetch and cache the table `id` located `relative_offset` bytes into
    /// the firmware image.
    ///
    /// Returns `None` when this build reserves no buffer for `id`. A failed
    /// transfer leaves no table cached for `id`, even if one was cached
    /// before the call.
    fn fetch_table(
        &mut self,
        metadata: &FrtsMetadata,
        id: DirtId,
        relative_offset: u32,
        size: u32,
    ) -> FrtsResult<Option<&[u8]>>;

    /// Cached bytes of table `id`
    fn table(&self, id: DirtId) -> Option<&[u8]>;
}

/// DMA backed FRTS access
pub struct DmaAccess<E: DmaEngine, const N: usize = DEFAULT_ARENA_SIZE> {
    engine: E,
    mem_desc: Option<FrtsMemDesc>,
    desc_buf: [u8; DESC_BUFFER_SIZE],
    desc_len: usize,
    vdpa_buf: [u8; VDPA_BUFFER_SIZE],
    vdpa_len: usize,
    tables: TableArena<N>,
}

impl<E: DmaEngine> DmaAccess<E> {
    /// Create an access backend with buffers for `DEFAULT_TABLE_LAYOUT`
    pub fn with_default_layout(engine: E) -> FrtsResult<Self> {
        Self::new(engine, DEFAULT_TABLE_LAYOUT)
    }
}

impl<E: DmaEngine, const N: usize> DmaAccess<E, N> {
    /// Create an access backend
    ///
    /// # Arguments
    ///
    /// * `engine` - Platform DMA engine
    /// * `layout` - Table buffers to reserve
    pub fn new(engine: E, layout: &[TableBufferSpec]) -> FrtsResult<Self> {
        Ok(Self {
            engine,
            mem_desc: None,
            desc_buf: [0u8; DESC_BUFFER_SIZE],
            desc_len: 0,
            vdpa_buf: [0u8; VDPA_BUFFER_SIZE],
            vdpa_len: 0,
            tables: TableArena::new(layout)?,
        })
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn mem_desc(&self) -> Option<&FrtsMemDesc> {
        self.mem_desc.as_ref()
    }

    fn opened(&self) -> FrtsResult<FrtsMemDesc> {
        self.mem_desc.ok_or(FrtsError::FRTS_ACCESS_NOT_OPEN)
    }
}

impl<E: DmaEngine, const N: usize> AccessBackend for DmaAccess<E, N> {
    fn check_read_access(&self, index: DmaIndex, config: &FrtsConfig) -> FrtsResult<()> {
        self.engine
            .check_read_access(index, config.offset, config.size)
    }

    fn open(&mut self, index: DmaIndex, config: &FrtsConfig) -> FrtsResult<()> {
        self.mem_desc = Some(FrtsMemDesc::new(index, config)?);
        self.desc_len = 0;
        self.vdpa_len = 0;
        Ok(())
    }

    fn read_descriptor(&mut self, len: usize) -> FrtsResult<&[u8]> {
        let mem_desc = self.opened()?;
        if len > DESC_BUFFER_SIZE {
            return Err(FrtsError::FRTS_ACCESS_BUFFER_TOO_SMALL);
        }
        let addr = mem_desc.absolute(0, len as u64)?;

        self.desc_len = 0;
        self.engine
            .read(mem_desc.index(), addr, &mut self.desc_buf[..len])?;
        self.desc_len = len;
        Ok(&self.desc_buf[..len])
    }

    fn descriptor(&self) -> &[u8] {
        &self.desc_buf[..self.desc_len]
    }

    fn read_vdpa_entries(&mut self, offset: u32, len: u32) -> FrtsResult<()> {
        let mem_desc = self.opened()?;
        let len = len as usize;
        if len > VDPA_BUFFER_SIZE {
            return Err(FrtsError::FRTS_ACCESS_BUFFER_TOO_SMALL);
        }
        let addr = mem_desc.absolute(offset as u64, len as u64)?;

        self.vdpa_len = 0;
        if len != 0 {
            self.engine
                .read(mem_desc.index(), addr, &mut self.vdpa_buf[..len])?;
        }
        self.vdpa_len = len;
        Ok(())
    }

    fn vdpa_entries(&self) -> &[u8] {
        &self.vdpa_buf[..self.vdpa_len]
    }

    fn fetch_table(
        &mut self,
        metadata: &FrtsMetadata,
        id: DirtId,
        relative_offset: u32,
        size: u32,
    ) -> FrtsResult<Option<&[u8]>> {
        let mem_desc = self.opened()?;
        let Some(max_size) = self.tables.max_table_size(id) else {
            return Ok(None);
        };
        if size as usize > max_size {
            return Err(FrtsError::FRTS_TABLE_TOO_LARGE);
        }
        let table_end = relative_offset
            .checked_add(size)
            .ok_or(FrtsError::FRTS_TABLE_OUT_OF_IMAGE)?;
        if table_end > metadata.image_size {
            return Err(FrtsError::FRTS_TABLE_OUT_OF_IMAGE);
        }

        if let Some(cached) = self.tables.cached(id) {
            if cached.relative_offset == relative_offset && cached.size == size {
                return Ok(self.tables.table(id));
            }
        }

        if size == 0 {
            self.tables.set_cached(
                id,
                CachedTable {
                    relative_offset,
                    size,
                    pre_pad: 0,
                },
            )?;
            return Ok(self.tables.table(id));
        }

        let offset = metadata.image_offset as u64 + relative_offset as u64;
        let window = DmaWindow::covering(offset, size)?;
        let addr = mem_desc.absolute(window.aligned_start, window.transfer_size as u64)?;

        let buf = self
            .tables
            .buffer_mut(id)
            .ok_or(FrtsError::FRTS_TABLE_LAYOUT_INVALID)?;
        let dst = buf
            .get_mut(..window.transfer_size as usize)
            .ok_or(FrtsError::FRTS_ACCESS_BUFFER_TOO_SMALL)?;
        self.engine.read(mem_desc.index(), addr, dst)?;

        self.tables.set_cached(
            id,
            CachedTable {
                relative_offset,
                size,
                pre_pad: window.pre_pad,
            },
        )?;
        cprintln!(
            "[frts] DIRT {} cached: {} bytes at image offset {}",
            id.0,
            size,
            relative_offset
        );
        Ok(self.tables.table(id))
    }

    fn table(&self, id: DirtId) -> Option<&[u8]> {
        self.tables.table(id)
    }
}
