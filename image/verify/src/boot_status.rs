// Licensed under the Apache-2.0 license
use core::convert::From;

const FRTS_BOOT_STATUS_BASE: u32 = 0x600;

/// Statuses used to log FRTS discovery progress.
#[repr(u32)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FrtsBootStatus {
    ConfigAccepted = FRTS_BOOT_STATUS_BASE,
    SecureAccessVerified = FRTS_BOOT_STATUS_BASE + 1,
    DescriptorValidated = FRTS_BOOT_STATUS_BASE + 2,
    MetadataVerified = FRTS_BOOT_STATUS_BASE + 3,
    VdpaEntriesLoaded = FRTS_BOOT_STATUS_BASE + 4,
    DirtResolved = FRTS_BOOT_STATUS_BASE + 5,

    // FRTS not configured for this boot
    Disabled = FRTS_BOOT_STATUS_BASE + 6,
}

impl From<FrtsBootStatus> for u32 {
    /// Converts to this type from the input type.
    fn from(status: FrtsBootStatus) -> u32 {
        status as u32
    }
}
