// Licensed under the Apache-2.0 license

use frts_error::{FrtsError, FrtsResult};
use frts_image_types::FrtsConfig;

use crate::dma::DmaIndex;
use crate::memory_layout::{FRTS_DMA_ALIGN, FRTS_MAX_SIZE};

/// Bounded memory descriptor for the FRTS window.
///
/// Every offset handed to the access layer is relative to the window
/// start and is checked against the window size before a transfer is
/// issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrtsMemDesc {
    index: DmaIndex,
    base: u64,
    size: u64,
}

impl FrtsMemDesc {
    /// Create a descriptor for the window configured in `config`
    ///
    /// # Arguments
    ///
    /// * `index` - DMA channel the window is read through
    /// * `config` - FRTS configuration
    pub fn new(index: DmaIndex, config: &FrtsConfig) -> FrtsResult<Self> {
        Self::validate_window(config.offset, config.size)?;
        Ok(Self {
            index,
            base: config.offset,
            size: config.size,
        })
    }

    pub fn validate_window(base: u64, size: u64) -> FrtsResult<()> {
        if size == 0 {
            return Err(FrtsError::FRTS_CONFIG_WINDOW_EMPTY);
        }
        if size > FRTS_MAX_SIZE {
            return Err(FrtsError::FRTS_CONFIG_WINDOW_TOO_LARGE);
        }
        if base % FRTS_DMA_ALIGN as u64 != 0 {
            return Err(FrtsError::FRTS_CONFIG_WINDOW_MISALIGNED);
        }
        base.checked_add(size)
            .ok_or(FrtsError::FRTS_CONFIG_WINDOW_OVERFLOW)?;
        Ok(())
    }

    pub fn index(&self) -> DmaIndex {
        self.index
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Translate a window relative range into an absolute address
    ///
    /// # Arguments
    ///
    /// * `offset` - Offset from the window start
    /// * `len` - Length of the range in bytes
    pub fn absolute(&self, offset: u64, len: u64) -> FrtsResult<u64> {
        let end = offset
            .checked_add(len)
            .ok_or(FrtsError::FRTS_DMA_OUT_OF_BOUNDS)?;
        if end > self.size {
            return Err(FrtsError::FRTS_DMA_OUT_OF_BOUNDS);
        }
        Ok(self.base + offset)
    }
}
