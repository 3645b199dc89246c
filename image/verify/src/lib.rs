/*++

Licensed under the Apache-2.0 license.

File Name:

   lib.rs

Abstract:

    FRTS verification and DIRT resolution library.

--*/
#![cfg_attr(not(feature = "std"), no_std)]

mod boot_status;
mod cert;
mod resolver;
mod scanner;
mod verifier;

#[cfg(test)]
mod test_env;

use frts_drivers::FrtsResult;
use frts_image_types::WprId;

pub use boot_status::FrtsBootStatus;
pub use cert::{active_cert_parser, CertVariantParser, VdpaRecord};
#[cfg(feature = "cert30")]
pub use cert::Cert30Parser;
pub use resolver::{FrtsResolver, FrtsState};
pub use scanner::VdpaScanner;
pub use verifier::FrtsVerifier;

/// Range covered by a write protected region
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WprRegion {
    pub offset: u64,
    pub size: u64,
}

impl WprRegion {
    /// Whether `[offset, offset + size)` lies entirely inside this region
    pub fn contains(&self, offset: u64, size: u64) -> bool {
        let (Some(end), Some(region_end)) = (
            offset.checked_add(size),
            self.offset.checked_add(self.size),
        ) else {
            return false;
        };
        offset >= self.offset && end <= region_end
    }
}

/// FRTS Verification Environment
pub trait FrtsVerificationEnv {
    /// Whether firmware runs in an enforced-security execution mode
    fn enforced_security(&self) -> bool;

    /// Get the configured range of a write protected region
    fn wpr_region(&self, wpr_id: WprId) -> FrtsResult<WprRegion>;

    /// Whether the region's access control only admits secure readers for this engine
    fn wpr_read_secure(&self, wpr_id: WprId) -> FrtsResult<bool>;

    /// Record a boot status code
    fn set_boot_status(&mut self, status: u32);

    /// Record the error code that terminated FRTS resolution
    fn report_error(&mut self, code: u32);
}
