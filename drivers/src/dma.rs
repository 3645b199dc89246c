/*++

Licensed under the Apache-2.0 license.

File Name:

    dma.rs

Abstract:

    File contains the DMA channel selection, the platform DMA interface
    and the aligned transfer window computation.

--*/

use frts_error::{FrtsError, FrtsResult};
use frts_image_types::FrtsMediaType;

use crate::memory_layout::FRTS_DMA_ALIGN;

/// DMA channel used to read the FRTS window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaIndex {
    /// The engine's own ucode channel into the frame buffer
    UcodeFrameBuffer,

    /// Coherent system memory channel
    CoherentSysmem,
}

impl From<FrtsMediaType> for DmaIndex {
    fn from(media_type: FrtsMediaType) -> Self {
        match media_type {
            FrtsMediaType::FrameBuffer => DmaIndex::UcodeFrameBuffer,
            FrtsMediaType::SystemMemory => DmaIndex::CoherentSysmem,
        }
    }
}

/// Platform DMA primitive
pub trait DmaEngine {
    /// Confirm that `index` may read `size` bytes starting at `addr`
    ///
    /// # Arguments
    ///
    /// * `index` - DMA channel
    /// * `addr` - Start address of the window
    /// * `size` - Window size in bytes
    fn check_read_access(&self, index: DmaIndex, addr: u64, size: u64) -> FrtsResult<()>;

    /// Synchronously read `dst.len()` bytes starting at `addr`
    ///
    /// # Arguments
    ///
    /// * `index` - DMA channel
    /// * `addr` - Source address
    /// * `dst` - Destination buffer
    fn read(&mut self, index: DmaIndex, addr: u64, dst: &mut [u8]) -> FrtsResult<()>;
}

impl<T: DmaEngine + ?Sized> DmaEngine for &mut T {
    fn check_read_access(&self, index: DmaIndex, addr: u64, size: u64) -> FrtsResult<()> {
        (**self).check_read_access(index, addr, size)
    }

    fn read(&mut self, index: DmaIndex, addr: u64, dst: &mut [u8]) -> FrtsResult<()> {
        (**self).read(index, addr, dst)
    }
}

/// Round `value` up to a multiple of `align`, which must be a power of two.
pub const fn align_up(value: u64, align: u64) -> Option<u64> {
    match value.checked_add(align - 1) {
        Some(sum) => Some(sum & !(align - 1)),
        None => None,
    }
}

/// Round `value` down to a multiple of `align`, which must be a power of two.
pub const fn align_down(value: u64, align: u64) -> u64 {
    value & !(align - 1)
}

/// Aligned transfer that covers an unaligned byte range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmaWindow {
    /// Transfer start, aligned down to `FRTS_DMA_ALIGN`
    pub aligned_start: u64,

    /// Bytes between `aligned_start` and the requested start
    pub pre_pad: u32,

    /// Transfer length, a multiple of `FRTS_DMA_ALIGN`
    pub transfer_size: u32,
}

impl DmaWindow {
    /// Compute the single aligned transfer covering `[offset, offset + size)`
    ///
    /// # Arguments
    ///
    /// * `offset` - Start of the requested range
    /// * `size` - Size of the requested range in bytes
    pub fn covering(offset: u64, size: u32) -> FrtsResult<Self> {
        let align = FRTS_DMA_ALIGN as u64;
        let aligned_start = align_down(offset, align);
        let pre_pad = offset - aligned_start;
        let transfer_size = align_up(pre_pad + size as u64, align)
            .and_then(|len| u32::try_from(len).ok())
            .ok_or(FrtsError::FRTS_DMA_OUT_OF_BOUNDS)?;
        aligned_start
            .checked_add(transfer_size as u64)
            .ok_or(FrtsError::FRTS_DMA_OUT_OF_BOUNDS)?;

        Ok(Self {
            aligned_start,
            pre_pad: pre_pad as u32,
            transfer_size,
        })
    }

    pub fn end(&self) -> u64 {
        self.aligned_start + self.transfer_size as u64
    }
}
