/*++

Licensed under the Apache-2.0 license.

File Name:

    verifier.rs

Abstract:

    This file contains the FRTS descriptor, metadata and secure access checks.

--*/

use crate::*;
use frts_drivers::memory_layout::{FRTS_DMA_ALIGN, FRTS_MAX_SIZE};
use frts_drivers::{align_up, AccessBackend, DmaIndex, FrtsError};
use frts_image_types::*;
use zerocopy::FromBytes;

/// FRTS Verifier
pub struct FrtsVerifier<'a, Env: FrtsVerificationEnv> {
    /// Verification Environment
    env: &'a Env,
}

impl<'a, Env: FrtsVerificationEnv> FrtsVerifier<'a, Env> {
    /// Create a new instance `FrtsVerifier`
    ///
    /// # Arguments
    ///
    /// * `env` - Environment
    pub fn new(env: &'a Env) -> Self {
        Self { env }
    }

    /// Pick the DMA channel for the configured media and confirm it may read the window
    ///
    /// # Arguments
    ///
    /// * `config` - FRTS configuration
    /// * `access` - Access backend
    pub fn select_channel<A: AccessBackend>(
        &self,
        config: &FrtsConfig,
        access: &A,
    ) -> FrtsResult<DmaIndex> {
        let index = DmaIndex::from(config.media_type()?);
        access.check_read_access(index, config)?;
        Ok(index)
    }

    /// Verify the FRTS window is inside a write protected region that only
    /// admits secure readers
    ///
    /// # Arguments
    ///
    /// * `config` - FRTS configuration
    pub fn verify_secure_access(&self, config: &FrtsConfig) -> FrtsResult<()> {
        if !matches!(config.media_type(), Ok(FrtsMediaType::FrameBuffer)) {
            return Err(FrtsError::FRTS_SECURE_MEDIA_TYPE_DENIED);
        }

        // Neither id protects the window against untrusted writers
        if config.wpr_id == WprId::UNPROTECTED {
            return Err(FrtsError::FRTS_SECURE_WPR_ID_UNPROTECTED);
        }
        if config.wpr_id == WprId::VPR {
            return Err(FrtsError::FRTS_SECURE_WPR_ID_VPR);
        }

        let region = self.env.wpr_region(config.wpr_id)?;
        if !region.contains(config.offset, config.size) {
            return Err(FrtsError::FRTS_SECURE_WINDOW_OUTSIDE_WPR);
        }

        if !self.env.wpr_read_secure(config.wpr_id)? {
            return Err(FrtsError::FRTS_SECURE_WPR_NOT_SECURE);
        }

        Ok(())
    }

    /// Read and verify the image descriptor
    ///
    /// Only the leading fields are read until the reported size has been
    /// checked against the known structure size.
    ///
    /// # Arguments
    ///
    /// * `access` - Opened access backend
    ///
    /// # Returns
    ///
    /// * `FrtsImageDescriptor` - Verified descriptor
    pub fn verify_descriptor<A: AccessBackend>(
        &self,
        access: &mut A,
    ) -> FrtsResult<FrtsImageDescriptor> {
        let prefix_len = FrtsImageDescriptor::prefix_range().end as usize;
        let prefix = FrtsImageDescriptorPrefix::read_from_prefix(access.read_descriptor(prefix_len)?)
            .ok_or(FrtsError::FRTS_DESC_SIZE_MISMATCH)?;
        Self::verify_descriptor_header(prefix.identifier(), prefix.version(), prefix.size())?;

        let desc = FrtsImageDescriptor::read_from(access.read_descriptor(prefix.size() as usize)?)
            .ok_or(FrtsError::FRTS_DESC_SIZE_MISMATCH)?;

        // The window may have changed between the two reads
        Self::verify_descriptor_header(desc.identifier(), desc.version(), desc.size())?;

        if !desc.flags().contains(FrtsDescFlags::COPY_COMPLETE) {
            return Err(FrtsError::FRTS_DESC_COPY_INCOMPLETE);
        }

        Ok(desc)
    }

    fn verify_descriptor_header(identifier: u32, version: u8, size: u32) -> FrtsResult<()> {
        if identifier != FRTS_DESC_IDENTIFIER {
            return Err(FrtsError::FRTS_DESC_IDENTIFIER_MISMATCH);
        }

        if version != FRTS_DESC_VERSION_1 {
            return Err(FrtsError::FRTS_DESC_VERSION_UNSUPPORTED);
        }

        if size as usize != FRTS_DESC_V1_BYTE_SIZE {
            return Err(FrtsError::FRTS_DESC_SIZE_MISMATCH);
        }

        Ok(())
    }

    /// Extract and verify the region layout described by `desc`
    ///
    /// # Arguments
    ///
    /// * `desc` - Verified descriptor
    /// * `window_size` - Size of the configured FRTS window
    pub fn verify_metadata(
        &self,
        desc: &FrtsImageDescriptor,
        window_size: u64,
    ) -> FrtsResult<FrtsMetadata> {
        let metadata = desc.metadata();
        self.verify_metadata_layout(desc.size(), &metadata, window_size)?;
        Ok(metadata)
    }

    /// Verify the VDPA array and firmware image are packed behind a
    /// descriptor of `desc_size` bytes at aligned offsets
    ///
    /// # Arguments
    ///
    /// * `desc_size` - Descriptor size in bytes
    /// * `metadata` - Layout to verify
    /// * `window_size` - Size of the configured FRTS window
    pub fn verify_metadata_layout(
        &self,
        desc_size: u32,
        metadata: &FrtsMetadata,
        window_size: u64,
    ) -> FrtsResult<()> {
        let align = FRTS_DMA_ALIGN as u64;

        let vdpa_offset = align_up(desc_size as u64, align)
            .ok_or(FrtsError::FRTS_META_ARITHMETIC_OVERFLOW)?;
        if metadata.vdpa_entry_offset as u64 != vdpa_offset {
            return Err(FrtsError::FRTS_META_VDPA_OFFSET_MISMATCH);
        }

        let image_offset = (metadata.vdpa_entry_count as u64)
            .checked_mul(metadata.vdpa_entry_size as u64)
            .and_then(|len| align_up(len, align))
            .and_then(|len| vdpa_offset.checked_add(len))
            .ok_or(FrtsError::FRTS_META_ARITHMETIC_OVERFLOW)?;
        if metadata.image_offset as u64 != image_offset {
            return Err(FrtsError::FRTS_META_IMAGE_OFFSET_MISMATCH);
        }

        let image_end = image_offset
            .checked_add(metadata.image_size as u64)
            .ok_or(FrtsError::FRTS_META_ARITHMETIC_OVERFLOW)?;
        if image_end % align != 0 {
            return Err(FrtsError::FRTS_META_IMAGE_END_MISALIGNED);
        }
        if image_end > FRTS_MAX_SIZE || image_end > window_size {
            return Err(FrtsError::FRTS_META_IMAGE_TOO_LARGE);
        }

        Ok(())
    }
}
